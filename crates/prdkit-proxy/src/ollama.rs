//! Ollama backend client.
//!
//! Implements the backend stream and model catalog ports over reqwest.
//! `/api/generate` is streamed chunk by chunk; `/api/tags` is read once at
//! startup to pick a model.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream;
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use prdkit_core::{
    BackendError, BackendStreamPort, ByteStream, DEFAULT_BACKEND_TIMEOUT, GenerationRequest,
    ModelCatalogPort,
};

use crate::models::{ErrorResponse, OllamaTagsResponse};

/// Default timeout for the startup model probe.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Derive the `/api/tags` URL from a `/api/generate` URL.
///
/// `http://host:11434/api/generate` becomes `http://host:11434/api/tags`.
/// Any other path gets `/api/tags` appended to its origin-relative base.
pub fn tags_url_for(generate_url: &str) -> String {
    let trimmed = generate_url.trim_end_matches('/');
    match trimmed.strip_suffix("/generate") {
        Some(base) => format!("{base}/tags"),
        None => format!("{trimmed}/api/tags"),
    }
}

/// HTTP client for an Ollama-compatible server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    generate_url: String,
    tags_url: String,
    timeout: Duration,
    probe_timeout: Duration,
}

impl OllamaClient {
    /// Create a client for `generate_url` with the default timeout.
    pub fn new(generate_url: impl Into<String>) -> Result<Self, BackendError> {
        let generate_url = generate_url.into();
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| BackendError::Transport(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            tags_url: tags_url_for(&generate_url),
            generate_url,
            timeout: DEFAULT_BACKEND_TIMEOUT,
            probe_timeout: PROBE_TIMEOUT,
        })
    }

    /// Override the time allowed for the response head and between chunks.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the time allowed for the model listing.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Override the model listing URL.
    #[must_use]
    pub fn with_tags_url(mut self, tags_url: impl Into<String>) -> Self {
        self.tags_url = tags_url.into();
        self
    }

    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }

    pub fn tags_url(&self) -> &str {
        &self.tags_url
    }
}

/// Map a reqwest failure onto the backend error taxonomy.
fn classify(error: &reqwest::Error, timeout: Duration) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout)
    } else if error.is_connect() {
        BackendError::Connect(error.to_string())
    } else if error.is_decode() {
        BackendError::InvalidResponse(error.to_string())
    } else {
        BackendError::Transport(error.to_string())
    }
}

/// Turn a non-success response into a `Status` error, unwrapping Ollama's
/// `{"error": "..."}` body when present.
async fn status_error(response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorResponse>(&body)
        .map(|parsed| parsed.error)
        .unwrap_or(body);
    BackendError::Status { status, body }
}

/// Stream the response body chunk by chunk.
///
/// Each read gets the full idle timeout. The stream ends quietly once
/// `cancel` fires, dropping the response and with it the connection.
fn chunk_stream(
    response: reqwest::Response,
    idle: Duration,
    cancel: CancellationToken,
) -> ByteStream {
    stream::unfold(Some(response), move |state| {
        let cancel = cancel.clone();
        async move {
            let mut response = state?;
            tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = tokio::time::timeout(idle, response.chunk()) => match next {
                    Err(_) => Some((Err(BackendError::Timeout(idle)), None)),
                    Ok(Err(e)) => Some((Err(classify(&e, idle)), None)),
                    Ok(Ok(Some(chunk))) => Some((Ok(chunk), Some(response))),
                    Ok(Ok(None)) => None,
                },
            }
        }
    })
    .boxed()
}

#[async_trait]
impl BackendStreamPort for OllamaClient {
    async fn open(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<ByteStream, BackendError> {
        debug!(
            url = %self.generate_url,
            model = %request.model,
            prompt_len = request.prompt.len(),
            "Sending generation request"
        );

        let send = self.client.post(&self.generate_url).json(&request).send();
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(BackendError::Cancelled),
            sent = tokio::time::timeout(self.timeout, send) => match sent {
                Err(_) => return Err(BackendError::Timeout(self.timeout)),
                Ok(Err(e)) => return Err(classify(&e, self.timeout)),
                Ok(Ok(response)) => response,
            },
        };

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        debug!(status = %response.status(), "Backend stream opened");
        Ok(chunk_stream(response, self.timeout, cancel))
    }
}

#[async_trait]
impl ModelCatalogPort for OllamaClient {
    async fn list_model_names(&self) -> Result<Vec<String>, BackendError> {
        let response = self
            .client
            .get(&self.tags_url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| classify(&e, self.probe_timeout))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }
}
