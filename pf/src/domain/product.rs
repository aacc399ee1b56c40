//! Product input

use std::io;
use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// An inline image: MIME type plus base64 payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    pub mime_type: String,
    /// Base64 (standard alphabet) encoded bytes
    pub data: String,
}

impl ImageData {
    /// Encode raw bytes
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Read an image file, inferring the MIME type from its extension
    pub fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "ImageData::from_path: called");
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        let mime_type = match ext.as_str() {
            "png" => "image/png",
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Unsupported image extension '{}' for {}", other, path.display()),
                ));
            }
        };
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(mime_type, &bytes))
    }

    /// Parse a `data:<mime>;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let mime_type = header.strip_suffix(";base64")?;
        if mime_type.is_empty() || data.is_empty() {
            return None;
        }
        Some(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }

    /// Decode the payload back to bytes
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.data)
    }
}

/// User-supplied product description
///
/// Passed by reference through a pipeline run and never mutated by it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductData {
    pub name: String,
    pub specs: String,
    pub images: Vec<ImageData>,
}

impl ProductData {
    pub fn new(name: impl Into<String>, specs: impl Into<String>, images: Vec<ImageData>) -> Self {
        Self {
            name: name.into(),
            specs: specs.into(),
            images,
        }
    }

    /// Check the preconditions for building a page
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Enter a product name before building the page".to_string());
        }
        if self.images.is_empty() {
            return Err("Add at least one product image before building the page".to_string());
        }
        Ok(())
    }

    /// Image handed to the image model as a visual reference
    pub fn reference_image(&self) -> Option<&ImageData> {
        self.images.first()
    }
}
