//! KnowledgeStore - persisted page-building knowledge log
//!
//! Keeps a single append-only record of the strategies that worked, the
//! critiques raised against past pages, collected references, and a count of
//! finished projects. The record is stored under one fixed key through a
//! pluggable backend.
//!
//! # Layout
//!
//! ```text
//! ~/.local/share/pageforge/knowledge/
//! └── brain_knowledge.json
//! ```
//!
//! # Example
//!
//! ```ignore
//! use knowledgestore::{FileBackend, KnowledgeStore};
//!
//! let store = KnowledgeStore::new(FileBackend::open("/tmp/ks")?);
//! store.save("Lead with the hero shot", "Spec page too dense")?;
//! assert_eq!(store.get().total_projects, 1);
//! ```

pub mod cli;
pub mod config;
mod store;

pub use store::{BrainKnowledge, FileBackend, KnowledgeBackend, KnowledgeStore, MemoryBackend};

/// Fixed key the knowledge record is stored under
pub const KNOWLEDGE_KEY: &str = "brain_knowledge";
