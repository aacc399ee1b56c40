//! Core KnowledgeStore implementation

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::KNOWLEDGE_KEY;

/// The persisted knowledge record
///
/// List fields only ever grow; `total_projects` goes up by one per save.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrainKnowledge {
    /// Strategies that produced a good page
    #[serde(default)]
    pub successful_strategies: Vec<String>,
    /// Critiques raised against past pages
    #[serde(default)]
    pub failed_points: Vec<String>,
    /// Number of saves so far
    #[serde(default)]
    pub total_projects: u64,
    /// Free-form references (links, competitor pages, notes)
    #[serde(default)]
    pub references: Vec<String>,
}

/// Storage adapter for the serialized knowledge record
///
/// A backend holds at most one document under [`KNOWLEDGE_KEY`].
pub trait KnowledgeBackend: Send + Sync {
    /// Read the raw document, `None` if nothing was stored yet
    fn load(&self) -> Result<Option<String>>;

    /// Replace the raw document
    fn store(&self, content: &str) -> Result<()>;
}

/// Backend keeping the record as `<dir>/brain_knowledge.json`
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    /// Open or create the backing directory
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).context("Failed to create knowledge directory")?;
        let path = dir.join(format!("{}.json", KNOWLEDGE_KEY));
        debug!(?path, "Opened knowledge file backend");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KnowledgeBackend for FileBackend {
    fn load(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            fs::read_to_string(&self.path).context(format!("Failed to read {}", self.path.display()))?;
        Ok(Some(content))
    }

    fn store(&self, content: &str) -> Result<()> {
        fs::write(&self.path, content).context(format!("Failed to write {}", self.path.display()))
    }
}

/// In-process backend, used by tests and dry runs
#[derive(Default)]
pub struct MemoryBackend {
    slot: Mutex<Option<String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the backend with a raw document
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(content.into())),
        }
    }
}

impl KnowledgeBackend for MemoryBackend {
    fn load(&self) -> Result<Option<String>> {
        let slot = self.slot.lock().map_err(|_| eyre::eyre!("Memory backend lock poisoned"))?;
        Ok(slot.clone())
    }

    fn store(&self, content: &str) -> Result<()> {
        let mut slot = self.slot.lock().map_err(|_| eyre::eyre!("Memory backend lock poisoned"))?;
        *slot = Some(content.to_string());
        Ok(())
    }
}

/// The knowledge log
pub struct KnowledgeStore {
    backend: Box<dyn KnowledgeBackend>,
}

impl KnowledgeStore {
    pub fn new(backend: impl KnowledgeBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
        }
    }

    /// Open the file-backed store in `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(FileBackend::open(dir)?))
    }

    /// Current record; missing or unreadable content yields the empty record
    pub fn get(&self) -> BrainKnowledge {
        match self.backend.load() {
            Ok(Some(content)) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!(error = %e, "Stored knowledge is not valid JSON, starting empty");
                BrainKnowledge::default()
            }),
            Ok(None) => BrainKnowledge::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load knowledge, starting empty");
                BrainKnowledge::default()
            }
        }
    }

    /// Record one finished project: append both notes and bump the counter
    ///
    /// Read-modify-write without locking; concurrent writers race and the
    /// last one wins.
    pub fn save(&self, improvement: &str, critique: &str) -> Result<BrainKnowledge> {
        let mut current = self.get();
        current.successful_strategies.push(improvement.to_string());
        current.failed_points.push(critique.to_string());
        current.total_projects += 1;
        self.write(&current)?;
        info!(total_projects = current.total_projects, "Knowledge saved");
        Ok(current)
    }

    /// Append a reference without counting a project
    pub fn add_reference(&self, reference: &str) -> Result<BrainKnowledge> {
        let mut current = self.get();
        current.references.push(reference.to_string());
        self.write(&current)?;
        debug!(references = current.references.len(), "Reference added");
        Ok(current)
    }

    fn write(&self, knowledge: &BrainKnowledge) -> Result<()> {
        let content = serde_json::to_string(knowledge)?;
        self.backend.store(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_store_returns_default() {
        let store = KnowledgeStore::new(MemoryBackend::new());
        assert_eq!(store.get(), BrainKnowledge::default());
    }

    #[test]
    fn test_save_appends_and_counts() {
        let store = KnowledgeStore::new(MemoryBackend::new());
        store.save("hero first", "specs too long").unwrap();
        let knowledge = store.save("bold copy", "weak contrast").unwrap();

        assert_eq!(knowledge.successful_strategies, vec!["hero first", "bold copy"]);
        assert_eq!(knowledge.failed_points, vec!["specs too long", "weak contrast"]);
        assert_eq!(knowledge.total_projects, 2);
        assert_eq!(store.get(), knowledge);
    }

    #[test]
    fn test_corrupt_content_falls_back_to_default() {
        let store = KnowledgeStore::new(MemoryBackend::with_content("{not json"));
        assert_eq!(store.get(), BrainKnowledge::default());

        // The next save overwrites the corrupt document
        let knowledge = store.save("a", "b").unwrap();
        assert_eq!(knowledge.total_projects, 1);
    }

    #[test]
    fn test_reads_original_camel_case_record() {
        let raw = r#"{"successfulStrategies":["x"],"failedPoints":[],"totalProjects":7,"references":["r"]}"#;
        let store = KnowledgeStore::new(MemoryBackend::with_content(raw));
        let knowledge = store.get();
        assert_eq!(knowledge.total_projects, 7);
        assert_eq!(knowledge.successful_strategies, vec!["x"]);
        assert_eq!(knowledge.references, vec!["r"]);
    }

    #[test]
    fn test_add_reference_keeps_counter() {
        let store = KnowledgeStore::new(MemoryBackend::new());
        let knowledge = store.add_reference("https://example.com/page").unwrap();
        assert_eq!(knowledge.references.len(), 1);
        assert_eq!(knowledge.total_projects, 0);
    }

    #[test]
    fn test_file_backend_persists_across_instances() {
        let temp = TempDir::new().unwrap();
        {
            let store = KnowledgeStore::open(temp.path()).unwrap();
            store.save("s", "c").unwrap();
        }
        let store = KnowledgeStore::open(temp.path()).unwrap();
        assert_eq!(store.get().total_projects, 1);
        assert!(temp.path().join("brain_knowledge.json").exists());
    }
}
