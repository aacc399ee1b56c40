//! Request/response types for generative calls
//!
//! Shaped after the Gemini `generateContent` API but free of wire details;
//! the provider client does the mapping.

use serde_json::Value;
use tracing::debug;

use crate::domain::ImageData;

/// Author of a content turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One piece of a content turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    InlineData(ImageData),
}

/// A content turn: role plus ordered parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self { role: Role::User, parts }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        Self::user(vec![Part::Text(text.into())])
    }

    pub fn model_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// What the caller expects back
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    /// Free text
    Text,
    /// JSON constrained by a response schema
    Json(Value),
    /// An image with the given aspect ratio, e.g. "9:16"
    Image { aspect_ratio: String },
}

/// Everything needed for one backend call
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    /// Model identifier
    pub model: String,

    /// Optional system instruction
    pub system_instruction: Option<String>,

    /// Conversation, oldest first
    pub contents: Vec<Content>,

    /// Expected response shape
    pub response: ResponseFormat,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self {
            model: model.into(),
            system_instruction: None,
            contents,
            response: ResponseFormat::Text,
        }
    }

    pub fn with_system(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = Some(instruction.into());
        self
    }

    pub fn with_response(mut self, response: ResponseFormat) -> Self {
        self.response = response;
        self
    }

    /// Number of inline image parts across all contents
    pub fn image_count(&self) -> usize {
        self.contents
            .iter()
            .flat_map(|c| &c.parts)
            .filter(|p| matches!(p, Part::InlineData(_)))
            .count()
    }
}

/// Parts of the first candidate, in order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    pub parts: Vec<Part>,
}

impl GenerateResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part::Text(text.into())],
        }
    }

    pub fn image(image: ImageData) -> Self {
        Self {
            parts: vec![Part::InlineData(image)],
        }
    }

    /// All text parts concatenated
    pub fn text_content(&self) -> String {
        let text: String = self
            .parts
            .iter()
            .filter_map(|p| match p {
                Part::Text(t) => Some(t.as_str()),
                Part::InlineData(_) => None,
            })
            .collect();
        debug!(len = text.len(), "GenerateResponse::text_content: called");
        text
    }

    /// The first inline image, if any
    pub fn first_image(&self) -> Option<&ImageData> {
        self.parts.iter().find_map(|p| match p {
            Part::InlineData(image) => Some(image),
            Part::Text(_) => None,
        })
    }
}
