//! Output sinks for relay sessions.
//!
//! A sink is the downstream side of one relay session. The relay writes text
//! fragments to it and closes it exactly once, with either [`OutputSink::end`]
//! or [`OutputSink::reject`].

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use prdkit_core::BackendError;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

/// The downstream side of a sink has gone away.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("output sink closed")]
pub struct SinkClosed;

/// Downstream response channel for one relay session.
#[async_trait]
pub trait OutputSink: Send {
    /// Forward one text fragment, waiting until the sink accepts it.
    async fn write(&mut self, text: &str) -> Result<(), SinkClosed>;

    /// Close the output normally.
    async fn end(&mut self);

    /// Close the output with a failure status. Only called when nothing has
    /// been written yet.
    async fn reject(&mut self, error: BackendError);

    /// Whether any text has been accepted.
    fn has_sent_data(&self) -> bool;

    /// Fires when the downstream consumer goes away.
    fn cancellation(&self) -> CancellationToken;
}

/// Item delivered to the HTTP side of a [`ChannelSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// Text fragment for the response body.
    Text(Bytes),
    /// The session failed before any text; answer with an error status.
    Failure(BackendError),
}

/// Create a bounded sink/receiver pair.
///
/// `capacity` is the number of fragments buffered before `write` waits.
/// Dropping the receiver cancels the sink's token.
pub fn channel(capacity: usize) -> (ChannelSink, RelayReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let cancel = CancellationToken::new();
    let sink = ChannelSink {
        tx: Some(tx),
        sent: false,
        cancel: cancel.clone(),
    };
    let receiver = RelayReceiver {
        rx,
        _cancel_on_drop: cancel.drop_guard(),
    };
    (sink, receiver)
}

/// Sink feeding an HTTP response body through a bounded channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: Option<mpsc::Sender<RelayFrame>>,
    sent: bool,
    cancel: CancellationToken,
}

#[async_trait]
impl OutputSink for ChannelSink {
    async fn write(&mut self, text: &str) -> Result<(), SinkClosed> {
        let tx = self.tx.as_ref().ok_or(SinkClosed)?;
        tx.send(RelayFrame::Text(Bytes::copy_from_slice(text.as_bytes())))
            .await
            .map_err(|_| SinkClosed)?;
        self.sent = true;
        Ok(())
    }

    async fn end(&mut self) {
        self.tx = None;
    }

    async fn reject(&mut self, error: BackendError) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(RelayFrame::Failure(error)).await;
        }
    }

    fn has_sent_data(&self) -> bool {
        self.sent
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Receiving half of [`channel`].
///
/// Yields frames until the sink closes. Dropping it (for example when the
/// HTTP client disconnects and the body is dropped) cancels the session.
#[derive(Debug)]
pub struct RelayReceiver {
    rx: mpsc::Receiver<RelayFrame>,
    _cancel_on_drop: DropGuard,
}

impl Stream for RelayReceiver {
    type Item = RelayFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// Sink that buffers all text in memory.
///
/// Used for non-streaming endpoints that need the whole generation before
/// answering.
#[derive(Debug, Default)]
pub struct CollectSink {
    text: String,
    ends: usize,
    rejection: Option<BackendError>,
    rejections: usize,
    cancel: CancellationToken,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink that is cancelled when `cancel` fires.
    pub fn with_cancellation(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Self::default()
        }
    }

    /// All text written so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Consume the sink and return its text.
    pub fn into_text(self) -> String {
        self.text
    }

    /// The failure passed to `reject`, if any.
    pub const fn rejection(&self) -> Option<&BackendError> {
        self.rejection.as_ref()
    }

    /// Total number of `end` and `reject` calls.
    pub const fn close_count(&self) -> usize {
        self.ends + self.rejections
    }

    /// Whether the sink has been closed.
    pub const fn is_closed(&self) -> bool {
        self.close_count() > 0
    }
}

#[async_trait]
impl OutputSink for CollectSink {
    async fn write(&mut self, text: &str) -> Result<(), SinkClosed> {
        if self.is_closed() {
            return Err(SinkClosed);
        }
        self.text.push_str(text);
        Ok(())
    }

    async fn end(&mut self) {
        self.ends += 1;
    }

    async fn reject(&mut self, error: BackendError) {
        self.rejections += 1;
        self.rejection = Some(error);
    }

    fn has_sent_data(&self) -> bool {
        !self.text.is_empty()
    }

    fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
