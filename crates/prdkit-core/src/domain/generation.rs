//! Generation request and event types.
//!
//! The request is serialized verbatim as the body of the upstream
//! `/api/generate` call. Each line of the upstream response decodes into
//! one [`GenerationEvent`].

use serde::{Deserialize, Serialize};

/// Sampling temperature used for PRD generation.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Inference options forwarded to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// A single generation request.
///
/// Immutable once built. Ownership moves into the backend client when the
/// connection is opened.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// Target model identifier.
    pub model: String,
    /// Fully rendered prompt.
    pub prompt: String,
    /// Ask the backend for a streamed response.
    pub stream: bool,
    /// Inference options.
    pub options: GenerationOptions,
}

impl GenerationRequest {
    /// Build a streaming request.
    #[must_use]
    pub fn streaming(
        model: impl Into<String>,
        prompt: impl Into<String>,
        options: GenerationOptions,
    ) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            stream: true,
            options,
        }
    }
}

/// One decoded line of the backend stream.
///
/// Both fields default when absent, so a valid JSON object of the wrong
/// shape decodes to an event that carries no text and does not terminate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerationEvent {
    /// Text fragment, if any.
    #[serde(default)]
    pub response: Option<String>,
    /// Terminal marker.
    #[serde(default)]
    pub done: bool,
}

impl GenerationEvent {
    /// Decode one frame.
    pub fn from_line(line: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(line)
    }

    /// The text fragment to forward, if present and non-empty.
    pub fn text(&self) -> Option<&str> {
        self.response.as_deref().filter(|text| !text.is_empty())
    }
}
