//! Backend stream port.
//!
//! Abstracts the inference server that turns a [`GenerationRequest`] into a
//! chunked byte stream. The relay consumes this port; the proxy crate
//! implements it over HTTP.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::domain::GenerationRequest;

/// Raw byte chunks as they arrive from the backend.
///
/// Lazy and non-restartable. It ends with `None` on a normal end of stream;
/// an `Err` item is always the last one.
pub type ByteStream = BoxStream<'static, Result<Bytes, BackendError>>;

/// Errors raised while talking to the inference backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Connection refused, DNS failure or similar.
    #[error("Failed to connect to inference backend: {0}")]
    Connect(String),

    /// No response or no further bytes within the configured timeout.
    #[error("Inference backend timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with a non-success status.
    #[error("Inference backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The body stream failed after it had started.
    #[error("Inference stream failed: {0}")]
    Transport(String),

    /// The backend answered with a body that could not be understood.
    #[error("Unexpected response from inference backend: {0}")]
    InvalidResponse(String),

    /// The caller cancelled the request before it completed.
    #[error("Request cancelled")]
    Cancelled,
}

impl BackendError {
    /// Returns true if the backend was never reached.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout(_))
    }
}

/// Port for issuing one streaming generation request.
#[async_trait]
pub trait BackendStreamPort: Send + Sync + fmt::Debug {
    /// Open one upstream connection and return its body as a byte stream.
    ///
    /// Exactly one connection is opened per call. It is released when the
    /// returned stream ends or is dropped. `cancel` is the downstream
    /// client's cancellation signal; once it fires the implementation must
    /// stop reading and end the stream.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the connection cannot be established, the
    /// backend does not answer within the timeout, or answers with a
    /// non-success status.
    async fn open(
        &self,
        request: GenerationRequest,
        cancel: CancellationToken,
    ) -> Result<ByteStream, BackendError>;
}
