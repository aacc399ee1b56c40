//! Session snapshot and its persistence adapters

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::{ChatMessage, GeneratedSlice, PipelineStage, ProductData, SliceCollection};

/// File name of the persisted session
pub const SESSION_FILE: &str = "session.json";

/// Everything the CLI needs to pick up where the last invocation stopped
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    /// Product of the latest build
    pub product: Option<ProductData>,
    pub slices: SliceCollection,
    pub focus: usize,
    pub stage: PipelineStage,
    /// Message of the last failed run
    pub last_error: Option<String>,
    pub chat: Vec<ChatMessage>,
}

impl Session {
    /// Slice under focus, if any
    pub fn focused(&self) -> Option<&GeneratedSlice> {
        self.slices.get(self.focus)
    }

    /// Repair a session read back from storage
    ///
    /// A run cannot survive the process, so an in-flight stage becomes
    /// `error`; the focus is clamped to the slice count. This also fires when
    /// another process opens the file while a build is still running.
    pub fn normalized(mut self) -> Self {
        if self.stage.is_in_flight() {
            warn!(stage = %self.stage, "Session was saved mid-run, marking as interrupted");
            self.stage = PipelineStage::Error;
            self.last_error = Some("Generation was interrupted".to_string());
        }
        self.focus = self.slices.clamp_index(self.focus);
        self
    }
}

/// Storage adapter for the session snapshot
pub trait SessionPersistence: Send + Sync {
    /// Read the stored session, `None` if nothing was stored yet
    fn load(&self) -> Result<Option<Session>>;

    /// Replace the stored session
    fn save(&self, session: &Session) -> Result<()>;
}

/// Keeps the session as `<dir>/session.json`
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create session directory")?;
        let path = dir.join(SESSION_FILE);
        debug!(?path, "FileSessionPersistence::open: called");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionPersistence {
    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&self.path).context(format!("Failed to read {}", self.path.display()))?;
        let session = serde_json::from_str(&content).context(format!("Failed to parse {}", self.path.display()))?;
        Ok(Some(session))
    }

    fn save(&self, session: &Session) -> Result<()> {
        let content = serde_json::to_string_pretty(session)?;
        // Replace atomically via a sibling temp file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).context(format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).context(format!("Failed to replace {}", self.path.display()))
    }
}

/// In-process adapter for tests and one-shot runs
#[derive(Default)]
pub struct MemorySessionPersistence {
    slot: Mutex<Option<Session>>,
}

impl MemorySessionPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: Mutex::new(Some(session)),
        }
    }
}

impl SessionPersistence for MemorySessionPersistence {
    fn load(&self) -> Result<Option<Session>> {
        let slot = self.slot.lock().map_err(|_| eyre::eyre!("Session slot lock poisoned"))?;
        Ok(slot.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| eyre::eyre!("Session slot lock poisoned"))?;
        *slot = Some(session.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SectionType;
    use tempfile::TempDir;

    fn sample() -> Session {
        Session {
            product: Some(ProductData::new("Buds", "BT 5.3", vec![])),
            slices: SliceCollection::new()
                .appended(GeneratedSlice::new(None, "Hero", "Loud", "Clear", SectionType::Hero)),
            focus: 0,
            stage: PipelineStage::Completed,
            last_error: None,
            chat: vec![ChatMessage::user("hi")],
        }
    }

    #[test]
    fn test_file_round_trip() {
        let temp = TempDir::new().unwrap();
        let persistence = FileSessionPersistence::open(temp.path()).unwrap();
        assert!(persistence.load().unwrap().is_none());

        persistence.save(&sample()).unwrap();
        assert!(temp.path().join(SESSION_FILE).exists());
        assert_eq!(persistence.load().unwrap(), Some(sample()));
    }

    #[test]
    fn test_file_corrupt_content_is_an_error() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(SESSION_FILE), "{ nope").unwrap();
        let persistence = FileSessionPersistence::open(temp.path()).unwrap();
        assert!(persistence.load().is_err());
    }

    #[test]
    fn test_normalized_marks_interrupted_run() {
        let session = Session {
            stage: PipelineStage::Generating,
            focus: 9,
            ..sample()
        }
        .normalized();

        assert_eq!(session.stage, PipelineStage::Error);
        assert!(session.last_error.is_some());
        assert_eq!(session.focus, 0);
    }

    #[test]
    fn test_normalized_keeps_settled_stage() {
        let session = sample().normalized();
        assert_eq!(session.stage, PipelineStage::Completed);
        assert!(session.last_error.is_none());
        assert_eq!(session.focused().unwrap().copy, "Loud");
    }

    #[test]
    fn test_memory_persistence() {
        let persistence = MemorySessionPersistence::new();
        assert!(persistence.load().unwrap().is_none());
        persistence.save(&sample()).unwrap();
        assert_eq!(persistence.load().unwrap().unwrap().chat.len(), 1);
    }
}
