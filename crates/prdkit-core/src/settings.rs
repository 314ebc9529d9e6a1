//! Defaults and startup model selection.
//!
//! The model to target is resolved once at startup and then passed by value
//! into every relay session. Nothing mutates it afterwards.

use std::fmt;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::ports::ModelCatalogPort;

/// Default port for the web server.
pub const DEFAULT_PORT: u16 = 3008;

/// Default Ollama-compatible generate endpoint.
pub const DEFAULT_GENERATE_URL: &str = "http://localhost:11434/api/generate";

/// Model used when the backend has it (or cannot be asked).
pub const DEFAULT_PREFERRED_MODEL: &str = "llama3.2";

/// Model used when the backend is reachable but lacks the preferred one.
pub const DEFAULT_FALLBACK_MODEL: &str = "mistral";

/// Time allowed for the first byte and between bytes. Loading a local model
/// can take minutes before the first token.
pub const DEFAULT_BACKEND_TIMEOUT: Duration = Duration::from_secs(300);

/// Which model to prefer and what to fall back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPreference {
    pub preferred: String,
    pub fallback: String,
}

impl Default for ModelPreference {
    fn default() -> Self {
        Self {
            preferred: DEFAULT_PREFERRED_MODEL.to_string(),
            fallback: DEFAULT_FALLBACK_MODEL.to_string(),
        }
    }
}

/// How a [`ModelSelection`] was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelSource {
    /// The backend lists the preferred model.
    Preferred,
    /// The backend is reachable but lacks the preferred model.
    Fallback,
    /// The backend could not be asked; the preferred model is assumed.
    Unverified,
}

/// The model every session targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub name: String,
    pub source: ModelSource,
}

impl fmt::Display for ModelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl ModelPreference {
    /// Pick a model from a backend listing.
    ///
    /// Listed names carry tags (`llama3.2:latest`), so a substring match
    /// against the preferred name counts as present.
    pub fn select(&self, available: &[String]) -> ModelSelection {
        if available.iter().any(|name| name.contains(&self.preferred)) {
            ModelSelection {
                name: self.preferred.clone(),
                source: ModelSource::Preferred,
            }
        } else {
            ModelSelection {
                name: self.fallback.clone(),
                source: ModelSource::Fallback,
            }
        }
    }

    /// Selection used when the backend cannot be probed.
    pub fn unverified(&self) -> ModelSelection {
        ModelSelection {
            name: self.preferred.clone(),
            source: ModelSource::Unverified,
        }
    }

    /// Probe the backend and choose a model. Never fails.
    pub async fn resolve(&self, catalog: &dyn ModelCatalogPort) -> ModelSelection {
        match catalog.list_model_names().await {
            Ok(available) => {
                let selection = self.select(&available);
                match selection.source {
                    ModelSource::Preferred => {
                        info!(model = %selection.name, "Using preferred model");
                    }
                    _ => warn!(
                        preferred = %self.preferred,
                        fallback = %selection.name,
                        "Preferred model not found, falling back"
                    ),
                }
                selection
            }
            Err(e) => {
                error!(
                    model = %self.preferred,
                    "Could not reach backend to verify models: {e}"
                );
                self.unverified()
            }
        }
    }
}
