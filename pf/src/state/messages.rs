//! State manager messages
//!
//! Commands and responses for the actor pattern.

use thiserror::Error;
use tokio::sync::oneshot;

use super::Session;
use crate::domain::{ChatMessage, GeneratedSlice, PipelineStage, ProductData, SliceCollection, SliceField, SlicePatch};

/// Errors from state operations
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Slice index {index} out of range (have {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("A run is already in progress ({0})")]
    Busy(PipelineStage),

    #[error("Invalid stage transition: {from} -> {to}")]
    InvalidTransition { from: PipelineStage, to: PipelineStage },

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Channel error")]
    ChannelError,
}

/// Response from state operations
pub type StateResponse<T> = Result<T, StateError>;

/// Commands sent to the StateManager actor
#[derive(Debug)]
pub enum StateCommand {
    // Reads
    Snapshot {
        reply: oneshot::Sender<Session>,
    },
    Slices {
        reply: oneshot::Sender<SliceCollection>,
    },
    ChatHistory {
        reply: oneshot::Sender<Vec<ChatMessage>>,
    },

    // Slice operations
    Append {
        slice: GeneratedSlice,
        reply: oneshot::Sender<StateResponse<usize>>,
    },
    SetFocus {
        index: usize,
        reply: oneshot::Sender<usize>,
    },
    PatchField {
        index: usize,
        field: SliceField,
        value: String,
        reply: oneshot::Sender<StateResponse<GeneratedSlice>>,
    },
    PatchFields {
        index: usize,
        patch: SlicePatch,
        reply: oneshot::Sender<StateResponse<GeneratedSlice>>,
    },
    Clear {
        reply: oneshot::Sender<()>,
    },

    // Run lifecycle
    BeginRun {
        product: ProductData,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    SetStage {
        stage: PipelineStage,
        reply: oneshot::Sender<StateResponse<()>>,
    },
    RecordFailure {
        message: String,
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Chat log
    PushChat {
        message: ChatMessage,
        reply: oneshot::Sender<()>,
    },

    // Persistence
    Flush {
        reply: oneshot::Sender<StateResponse<()>>,
    },

    // Shutdown
    Shutdown,
}
