//! Conversational patch agent
//!
//! [`ChatAgent`] turns one user message plus the focused slide into a model
//! reply and an optional patch. [`ChatSession`] wires it to the state
//! manager: it logs both sides of the exchange and applies the patch to the
//! focused slide.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::directive;
use crate::domain::{ChatMessage, ChatRole, GeneratedSlice, SlicePatch, history_window};
use crate::llm::{Content, GenerateRequest, LlmClient, LlmError};
use crate::state::{StateError, StateManager};

const SYSTEM_INSTRUCTION: &str = "당신은 상세페이지 마스터 에디터입니다.\n\
    사용자가 특정 페이지의 문구를 수정을 요청하면 \
    [UPDATE_CONTENT: {\"copy\": \"새문구\", \"description\": \"새설명\"}] 형식으로 답변에 포함시키세요.\n\
    문구는 항상 짧고 강렬해야 합니다.";

/// Errors from a chat exchange
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,

    #[error("The assistant is still answering the previous message")]
    Busy,

    #[error("Chat request failed: {0}")]
    Service(#[from] LlmError),

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// What the agent sees besides the message itself
#[derive(Debug, Clone, Copy)]
pub struct ChatContext<'a> {
    /// Zero-based index of the focused slide
    pub slice_index: usize,
    pub current_slice: Option<&'a GeneratedSlice>,
    /// Prior messages, oldest first; only the trailing window is sent
    pub history: &'a [ChatMessage],
}

/// Model reply with the directive removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
    pub action: Option<SlicePatch>,
}

/// Stateless chat client for slide edits
#[derive(Clone)]
pub struct ChatAgent {
    llm: Arc<dyn LlmClient>,
    model: String,
}

impl ChatAgent {
    pub fn new(llm: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            llm,
            model: model.into(),
        }
    }

    /// Build the request for `message` in `context`
    pub fn request(&self, message: &str, context: &ChatContext<'_>) -> GenerateRequest {
        let mut contents: Vec<Content> = history_window(context.history)
            .iter()
            .map(|m| match m.role {
                ChatRole::User => Content::user_text(&m.text),
                ChatRole::Model => Content::model_text(&m.text),
            })
            .collect();

        let copy = context.current_slice.map(|s| s.copy.as_str()).unwrap_or_default();
        contents.push(Content::user_text(format!(
            "[현재 {}페이지 문구: {}] {}",
            context.slice_index + 1,
            copy,
            message
        )));

        GenerateRequest::new(&self.model, contents).with_system(SYSTEM_INSTRUCTION)
    }

    /// Send one message and split the reply into text and patch
    pub async fn send(&self, message: &str, context: &ChatContext<'_>) -> Result<ChatReply, ChatError> {
        debug!(slice_index = context.slice_index, history = context.history.len(), "send: called");
        let response = self.llm.generate(self.request(message, context)).await?;
        let (text, action) = directive::extract(&response.text_content());
        debug!(has_action = action.is_some(), "send: reply parsed");
        Ok(ChatReply { text, action })
    }
}

/// Resets the busy flag when dropped
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Chat bound to a session's state
#[derive(Clone)]
pub struct ChatSession {
    agent: ChatAgent,
    state: StateManager,
    busy: Arc<AtomicBool>,
}

impl ChatSession {
    pub fn new(agent: ChatAgent, state: StateManager) -> Self {
        Self {
            agent,
            state,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// One exchange: log the user message, ask the agent, log the reply and
    /// apply its patch to the focused slide
    ///
    /// On backend failure only the user message stays in the log.
    pub async fn exchange(&self, message: &str) -> Result<ChatReply, ChatError> {
        debug!("exchange: called");
        let message = message.trim();
        if message.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        let _guard = BusyGuard::acquire(&self.busy).ok_or(ChatError::Busy)?;

        let session = self.state.snapshot().await?;
        self.state.push_chat(ChatMessage::user(message)).await?;

        let context = ChatContext {
            slice_index: session.focus,
            current_slice: session.focused(),
            history: &session.chat,
        };
        let reply = match self.agent.send(message, &context).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Chat request failed");
                return Err(e);
            }
        };

        self.state.push_chat(ChatMessage::model(&reply.text)).await?;

        if let Some(patch) = &reply.action {
            if session.slices.is_empty() {
                warn!("Reply carried an update but there are no slides to apply it to");
            } else {
                self.state.patch_fields(session.focus, patch.clone()).await?;
                info!(page = session.focus + 1, "Applied chat update");
            }
        }
        Ok(reply)
    }
}
