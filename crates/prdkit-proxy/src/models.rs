//! Wire and API data models.
//!
//! Upstream Ollama shapes and the small JSON bodies of the web API. Domain
//! types live in `prdkit-core`; this module handles the HTTP layer mapping.

use serde::{Deserialize, Serialize};

// =============================================================================
// Ollama Types
// =============================================================================

/// Response from Ollama's `GET /api/tags`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaTagsResponse {
    #[serde(default)]
    pub models: Vec<OllamaTag>,
}

/// One locally available model.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaTag {
    /// Tagged name, e.g. `llama3.2:latest`.
    pub name: String,
}

// =============================================================================
// Web API Types
// =============================================================================

/// Response from `GET /api/ping`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub status: String,
    pub model: String,
}

/// Request to `POST /api/guided-chat`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuidedChatRequest {
    /// Conversation so far, rendered as plain text.
    #[serde(default)]
    pub history: String,
}

/// Request to `POST /api/parse-brain-dump`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrainDumpRequest {
    /// Free-text transcript to extract form fields from.
    #[serde(default, rename = "brainDump")]
    pub brain_dump: String,
}

/// JSON error body: `{ "error": "..." }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
