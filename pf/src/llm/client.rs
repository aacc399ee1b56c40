//! LlmClient trait definition

use async_trait::async_trait;

use super::{GenerateRequest, GenerateResponse, LlmError};

/// Stateless generative client - each call is independent
///
/// Conversation history, when needed, travels inside the request.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single request and wait for the full response
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}
