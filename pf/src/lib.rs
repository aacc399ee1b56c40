//! PageForge - AI product detail-page builder
//!
//! Turns a product name, spec text and photos into a vertical stack of
//! marketing slides: a planner decides the sections, each section gets a
//! generated image and short copy, and a chat assistant edits the copy of
//! the focused slide afterwards.
//!
//! # Core Concepts
//!
//! - **Plan, then render**: one plan call, then image and text calls per section, in order
//! - **Incremental results**: every finished slide lands in the session as soon as it exists
//! - **One owner of state**: an actor holds slides, focus, stage and chat log
//! - **Patches from chat**: the assistant edits slides through an embedded `[UPDATE_CONTENT: {...}]` directive
//!
//! # Modules
//!
//! - [`domain`] - Product input, plans, slides, stages and chat messages
//! - [`llm`] - Backend client trait and the Gemini implementation
//! - [`pipeline`] - Planner, section renderer and the build orchestrator
//! - [`state`] - Session actor and its persistence
//! - [`agent`] - Chat agent and the session-bound chat exchange
//! - [`directive`] - Update-directive parser
//! - [`export`] - PNG rendering of finished slides
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod directive;
pub mod domain;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod repl;
pub mod sanitize;
pub mod state;

// Re-export commonly used types
pub use agent::{ChatAgent, ChatContext, ChatError, ChatReply, ChatSession};
pub use config::{Config, ExportConfig, LlmConfig, StorageConfig};
pub use directive::Directive;
pub use domain::{
    ChatMessage, ChatRole, DesignPlan, GeneratedSlice, ImageData, PipelineStage, ProductData, SectionDescriptor,
    SectionType, SliceCollection, SliceField, SlicePatch,
};
pub use export::{ExportError, Exporter};
pub use llm::{GeminiClient, GenerateRequest, GenerateResponse, LlmClient, LlmError, create_client};
pub use pipeline::{Pipeline, PipelineError, PipelineModels};
pub use sanitize::sanitize;
pub use state::{Session, StateError, StateEvent, StateManager};
