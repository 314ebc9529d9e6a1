//! Scripted port implementations for tests.
//!
//! Enabled inside this crate's own tests and, for other crates, through the
//! `test-utils` feature.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use tokio_util::sync::CancellationToken;

use super::backend::{BackendError, BackendStreamPort, ByteStream};
use super::model_catalog::ModelCatalogPort;
use crate::domain::GenerationRequest;

/// One step of a scripted backend response.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Deliver these bytes as one chunk.
    Chunk(Bytes),
    /// Fail the stream with this error.
    Fail(BackendError),
}

/// Backend that replays a fixed list of chunks for every request.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    open_error: Option<BackendError>,
    steps: Vec<ScriptStep>,
    hold_open: bool,
    echo_chunk: Option<usize>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedBackend {
    /// Replay `chunks` and then end the stream.
    pub fn chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        Self {
            steps: chunks
                .into_iter()
                .map(|chunk| ScriptStep::Chunk(chunk.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Answer each request with its own prompt as a single `response`
    /// event plus a `done` event, cut into chunks of `chunk_size` bytes.
    ///
    /// Chunk boundaries fall wherever the size lands, including inside
    /// JSON tokens and multi-byte characters.
    pub fn echo_prompt(chunk_size: usize) -> Self {
        Self {
            echo_chunk: Some(chunk_size.max(1)),
            ..Self::default()
        }
    }

    /// Refuse every request before any byte is produced.
    pub fn failing_open(error: BackendError) -> Self {
        Self {
            open_error: Some(error),
            ..Self::default()
        }
    }

    /// Fail the stream after the scripted chunks.
    #[must_use]
    pub fn then_fail(mut self, error: BackendError) -> Self {
        self.steps.push(ScriptStep::Fail(error));
        self
    }

    /// Keep the stream open after the scripted chunks until cancelled.
    #[must_use]
    pub fn then_hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl BackendStreamPort for ScriptedBackend {
    async fn open(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<ByteStream, BackendError> {
        let steps = match self.echo_chunk {
            Some(size) => echo_steps(&request.prompt, size),
            None => self.steps.clone(),
        };
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        let items = steps.into_iter().map(|step| match step {
            ScriptStep::Chunk(bytes) => Ok(bytes),
            ScriptStep::Fail(error) => Err(error),
        });
        let scripted = stream::iter(items);
        let body = if self.hold_open {
            scripted.chain(stream::pending()).boxed()
        } else {
            scripted.boxed()
        };

        Ok(body.take_until(cancel.cancelled_owned()).boxed())
    }
}

fn echo_steps(prompt: &str, size: usize) -> Vec<ScriptStep> {
    let body = Bytes::from(format!(
        "{}\n{{\"done\":true}}\n",
        serde_json::json!({ "response": prompt })
    ));
    (0..body.len())
        .step_by(size)
        .map(|start| ScriptStep::Chunk(body.slice(start..(start + size).min(body.len()))))
        .collect()
}

/// Catalog that returns a fixed listing.
#[derive(Debug, Clone)]
pub struct ScriptedCatalog {
    listing: Result<Vec<String>, BackendError>,
}

impl ScriptedCatalog {
    /// Catalog containing `names`.
    pub fn with_models<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            listing: Ok(names.into_iter().map(Into::into).collect()),
        }
    }

    /// Catalog whose listing always fails.
    pub const fn unreachable(error: BackendError) -> Self {
        Self {
            listing: Err(error),
        }
    }
}

#[async_trait]
impl ModelCatalogPort for ScriptedCatalog {
    async fn list_model_names(&self) -> Result<Vec<String>, BackendError> {
        self.listing.clone()
    }
}
