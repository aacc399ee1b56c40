//! Slide-generation pipeline
//!
//! Plan once, then render each planned section (image, then text) in order,
//! appending every finished slice to the state manager as it lands.

use thiserror::Error;

mod orchestrator;
pub mod planner;
pub mod renderer;

pub use orchestrator::Pipeline;
pub use planner::generate_plan;
pub use renderer::{SliceText, finalize_text, generate_image, render_section};

use crate::config::LlmConfig;
use crate::domain::PipelineStage;
use crate::llm::LlmError;
use crate::state::StateError;

/// Errors from a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Product input is unusable; nothing was sent and no state changed
    #[error("{0}")]
    Validation(String),

    /// A backend call failed or returned something unusable
    #[error("{operation} failed: {message}")]
    ExternalService { operation: &'static str, message: String },

    #[error("A build is already running ({0})")]
    Busy(PipelineStage),

    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: PipelineStage, to: PipelineStage },

    #[error("State error: {0}")]
    State(StateError),
}

impl PipelineError {
    pub(crate) fn service(operation: &'static str, error: LlmError) -> Self {
        PipelineError::ExternalService {
            operation,
            message: error.to_string(),
        }
    }
}

impl From<StateError> for PipelineError {
    fn from(error: StateError) -> Self {
        match error {
            StateError::Busy(stage) => PipelineError::Busy(stage),
            StateError::InvalidTransition { from, to } => PipelineError::InvalidTransition { from, to },
            other => PipelineError::State(other),
        }
    }
}

/// Model identifiers per pipeline capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineModels {
    pub plan: String,
    pub image: String,
    pub text: String,
}

impl From<&LlmConfig> for PipelineModels {
    fn from(config: &LlmConfig) -> Self {
        Self {
            plan: config.plan_model.clone(),
            image: config.image_model.clone(),
            text: config.text_model.clone(),
        }
    }
}
