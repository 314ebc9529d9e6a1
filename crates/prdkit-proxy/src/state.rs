//! Shared application state for the web server.

use std::sync::Arc;

use prdkit_core::{BackendStreamPort, GenerationOptions, GenerationRequest, ModelSelection};

/// Number of text fragments buffered per response before the relay waits
/// for the client.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// State handed to every handler. Cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Backend that generation requests are relayed to.
    pub backend: Arc<dyn BackendStreamPort>,
    /// Model chosen at startup.
    pub model: Arc<ModelSelection>,
    /// Sampling options sent with every request.
    pub options: GenerationOptions,
    /// Per-response channel capacity.
    pub channel_capacity: usize,
}

impl AppState {
    pub fn new(backend: Arc<dyn BackendStreamPort>, model: ModelSelection) -> Self {
        Self {
            backend,
            model: Arc::new(model),
            options: GenerationOptions::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Build the upstream request for `prompt` against the selected model.
    pub fn generation_request(&self, prompt: String) -> GenerationRequest {
        GenerationRequest::streaming(self.model.name.clone(), prompt, self.options)
    }
}
