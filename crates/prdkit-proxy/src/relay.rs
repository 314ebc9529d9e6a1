//! Relay session: upstream NDJSON in, plain text out.
//!
//! One session per client request. The session opens the backend stream,
//! frames it into lines, forwards each event's `response` text and closes
//! the output sink exactly once.
//!
//! ```text
//! Opening ──open ok──▶ Streaming ──done / end / error / cancel──▶ Closing ──▶ Closed
//!    └────────────open failed / cancelled─────────────────────────▲
//! ```

use std::sync::Arc;

use futures_util::StreamExt;
use prdkit_core::{BackendError, BackendStreamPort, GenerationEvent, GenerationRequest};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::frame::FrameDecoder;
use crate::sink::OutputSink;

/// Appended to the output when the backend fails after text was forwarded.
pub const IN_BAND_ERROR_MARKER: &str = "\n[Error during generation]";

/// Lifecycle of a relay session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Waiting for the backend connection.
    Opening,
    /// Forwarding events.
    Streaming,
    /// Closing the output sink.
    Closing,
    /// Output sink closed; nothing more is written.
    Closed,
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The backend sent an event with `done: true`.
    Completed,
    /// The backend stream ended without a `done` event.
    EndOfStream,
    /// The backend failed before any text was forwarded.
    FailedBeforeOutput(BackendError),
    /// The backend failed after text was forwarded.
    FailedMidStream(BackendError),
    /// The downstream consumer went away.
    Cancelled,
}

impl RelayOutcome {
    /// Returns true for the two successful endings.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed | Self::EndOfStream)
    }
}

enum LineStep {
    Continue,
    Done,
    SinkGone,
}

/// State for proxying one generation request.
pub struct RelaySession<S> {
    backend: Arc<dyn BackendStreamPort>,
    sink: S,
    decoder: FrameDecoder,
    state: SessionState,
    cancel: CancellationToken,
    forwarded_bytes: usize,
}

impl<S: OutputSink> RelaySession<S> {
    /// Create a session writing to `sink`.
    ///
    /// The sink's cancellation token is handed to the backend when the
    /// stream is opened.
    pub fn new(backend: Arc<dyn BackendStreamPort>, sink: S) -> Self {
        let cancel = sink.cancellation();
        Self {
            backend,
            sink,
            decoder: FrameDecoder::new(),
            state: SessionState::Opening,
            cancel,
            forwarded_bytes: 0,
        }
    }

    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Run the session to completion and hand the sink back.
    pub async fn run(mut self, request: GenerationRequest) -> (RelayOutcome, S) {
        let model = request.model.clone();
        let outcome = self.pump(request).await;
        self.close(&outcome).await;

        match &outcome {
            RelayOutcome::Completed | RelayOutcome::EndOfStream => info!(
                model = %model,
                bytes = self.forwarded_bytes,
                outcome = ?outcome,
                "Generation finished"
            ),
            RelayOutcome::Cancelled => info!(
                model = %model,
                bytes = self.forwarded_bytes,
                "Client went away, upstream request aborted"
            ),
            RelayOutcome::FailedBeforeOutput(e) | RelayOutcome::FailedMidStream(e) => error!(
                model = %model,
                bytes = self.forwarded_bytes,
                "Generation failed: {e}"
            ),
        }

        (outcome, self.sink)
    }

    /// Drive the backend stream until a terminal condition. Never closes the
    /// sink.
    async fn pump(&mut self, request: GenerationRequest) -> RelayOutcome {
        let cancel = self.cancel.clone();
        debug!(model = %request.model, "Opening backend stream");

        let opened = tokio::select! {
            biased;
            () = cancel.cancelled() => return RelayOutcome::Cancelled,
            opened = self.backend.open(request, cancel.clone()) => opened,
        };
        let mut upstream = match opened {
            Ok(upstream) => upstream,
            Err(BackendError::Cancelled) => return RelayOutcome::Cancelled,
            Err(e) => return self.failure(e),
        };
        self.state = SessionState::Streaming;

        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => return RelayOutcome::Cancelled,
                next = upstream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    let lines = match self.decoder.push(&chunk) {
                        Ok(lines) => lines,
                        Err(e) => {
                            return self.failure(BackendError::InvalidResponse(e.to_string()));
                        }
                    };
                    for line in lines {
                        match self.forward_line(&line).await {
                            LineStep::Continue => {}
                            LineStep::Done => return RelayOutcome::Completed,
                            LineStep::SinkGone => return RelayOutcome::Cancelled,
                        }
                    }
                }
                Some(Err(BackendError::Cancelled)) => return RelayOutcome::Cancelled,
                Some(Err(e)) => return self.failure(e),
                None => break,
            }
        }

        if cancel.is_cancelled() {
            return RelayOutcome::Cancelled;
        }

        // Best effort on an unterminated final line.
        if let Some(tail) = std::mem::take(&mut self.decoder).finish() {
            debug!(bytes = tail.len(), "Decoding unterminated final line");
            match self.forward_line(&tail).await {
                LineStep::Continue => {}
                LineStep::Done => return RelayOutcome::Completed,
                LineStep::SinkGone => return RelayOutcome::Cancelled,
            }
        }

        RelayOutcome::EndOfStream
    }

    async fn forward_line(&mut self, line: &[u8]) -> LineStep {
        let event = match GenerationEvent::from_line(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(
                    line = %String::from_utf8_lossy(line),
                    "Dropping undecodable frame: {e}"
                );
                return LineStep::Continue;
            }
        };

        if let Some(text) = event.text() {
            if self.sink.write(text).await.is_err() {
                return LineStep::SinkGone;
            }
            self.forwarded_bytes += text.len();
        }

        if event.done {
            LineStep::Done
        } else {
            LineStep::Continue
        }
    }

    fn failure(&self, error: BackendError) -> RelayOutcome {
        if self.sink.has_sent_data() {
            RelayOutcome::FailedMidStream(error)
        } else {
            RelayOutcome::FailedBeforeOutput(error)
        }
    }

    async fn close(&mut self, outcome: &RelayOutcome) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closing;

        match outcome {
            RelayOutcome::FailedBeforeOutput(e) => self.sink.reject(e.clone()).await,
            RelayOutcome::FailedMidStream(_) => {
                let _ = self.sink.write(IN_BAND_ERROR_MARKER).await;
                self.sink.end().await;
            }
            RelayOutcome::Completed | RelayOutcome::EndOfStream | RelayOutcome::Cancelled => {
                self.sink.end().await;
            }
        }

        self.state = SessionState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectSink;
    use prdkit_core::GenerationOptions;
    use prdkit_core::ports::testing::ScriptedBackend;

    fn request() -> GenerationRequest {
        GenerationRequest::streaming("llama3.2", "prompt", GenerationOptions::default())
    }

    async fn relay(backend: ScriptedBackend) -> (RelayOutcome, CollectSink) {
        RelaySession::new(Arc::new(backend), CollectSink::new())
            .run(request())
            .await
    }

    #[tokio::test]
    async fn test_new_session_is_opening() {
        let session = RelaySession::new(Arc::new(ScriptedBackend::chunks(["x"])), CollectSink::new());
        assert_eq!(session.state(), SessionState::Opening);
    }

    #[tokio::test]
    async fn test_done_event_completes_and_ignores_rest() {
        let backend = ScriptedBackend::chunks([
            "{\"response\":\"a\"}\n{\"response\":\"b\",\"done\":true}\n{\"response\":\"c\"}\n",
            "{\"response\":\"d\"}\n",
        ]);
        let (outcome, sink) = relay(backend).await;

        assert_eq!(outcome, RelayOutcome::Completed);
        assert_eq!(sink.text(), "ab");
        assert_eq!(sink.close_count(), 1);
    }

    #[tokio::test]
    async fn test_end_of_stream_closes_once() {
        let backend = ScriptedBackend::chunks(["{\"response\":\"a\"}\n"]);
        let (outcome, sink) = relay(backend).await;

        assert_eq!(outcome, RelayOutcome::EndOfStream);
        assert_eq!(sink.text(), "a");
        assert_eq!(sink.close_count(), 1);
    }

    #[tokio::test]
    async fn test_truncated_tail_is_dropped() {
        let backend = ScriptedBackend::chunks(["{\"response\":\"a\"}\n{\"response\":\"trunc"]);
        let (outcome, sink) = relay(backend).await;

        assert_eq!(outcome, RelayOutcome::EndOfStream);
        assert_eq!(sink.text(), "a");
        assert_eq!(sink.close_count(), 1);
    }

    #[tokio::test]
    async fn test_done_in_tail_counts_as_completed() {
        let backend = ScriptedBackend::chunks(["{\"response\":\"z\",\"done\":true}"]);
        let (outcome, sink) = relay(backend).await;

        assert_eq!(outcome, RelayOutcome::Completed);
        assert_eq!(sink.text(), "z");
    }

    #[tokio::test]
    async fn test_open_failure_rejects() {
        let backend = ScriptedBackend::failing_open(BackendError::Connect("refused".into()));
        let (outcome, sink) = relay(backend).await;

        assert_eq!(
            outcome,
            RelayOutcome::FailedBeforeOutput(BackendError::Connect("refused".into()))
        );
        assert_eq!(sink.rejection(), Some(&BackendError::Connect("refused".into())));
        assert_eq!(sink.close_count(), 1);
        assert!(sink.text().is_empty());
    }

    #[tokio::test]
    async fn test_error_after_non_text_events_still_rejects() {
        let backend = ScriptedBackend::chunks(["{\"done\":false}\n"])
            .then_fail(BackendError::Transport("reset".into()));
        let (outcome, sink) = relay(backend).await;

        assert!(matches!(outcome, RelayOutcome::FailedBeforeOutput(_)));
        assert!(sink.rejection().is_some());
        assert_eq!(sink.close_count(), 1);
    }

    #[tokio::test]
    async fn test_mid_stream_error_appends_marker() {
        let backend = ScriptedBackend::chunks(["{\"response\":\"Hello\"}\n"])
            .then_fail(BackendError::Transport("reset".into()));
        let (outcome, sink) = relay(backend).await;

        assert!(matches!(outcome, RelayOutcome::FailedMidStream(_)));
        assert_eq!(sink.text(), format!("Hello{IN_BAND_ERROR_MARKER}"));
        assert!(sink.rejection().is_none());
        assert_eq!(sink.close_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_stops_held_stream() {
        let backend = ScriptedBackend::chunks(["{\"response\":\"partial\"}\n"]).then_hold_open();
        let cancel = CancellationToken::new();
        let session = RelaySession::new(
            Arc::new(backend),
            CollectSink::with_cancellation(cancel.clone()),
        );

        let handle = tokio::spawn(session.run(request()));
        tokio::task::yield_now().await;
        cancel.cancel();

        let (outcome, sink) = handle.await.unwrap();
        assert_eq!(outcome, RelayOutcome::Cancelled);
        assert_eq!(sink.close_count(), 1);
    }

    #[tokio::test]
    async fn test_endless_line_fails_the_session() {
        let backend = ScriptedBackend::chunks([
            "{\"response\":\"a\"}\n",
            "{\"response\":\"",
            "xxxxxxxx",
        ])
        .then_hold_open();
        let mut session = RelaySession::new(Arc::new(backend), CollectSink::new());
        session.decoder = FrameDecoder::with_max_pending(16);

        let (outcome, sink) = session.run(request()).await;

        assert!(matches!(
            outcome,
            RelayOutcome::FailedMidStream(BackendError::InvalidResponse(_))
        ));
        assert_eq!(sink.text(), format!("a{IN_BAND_ERROR_MARKER}"));
        assert_eq!(sink.close_count(), 1);
    }

    #[test]
    fn test_outcome_success() {
        assert!(RelayOutcome::Completed.is_success());
        assert!(RelayOutcome::EndOfStream.is_success());
        assert!(!RelayOutcome::Cancelled.is_success());
        assert!(!RelayOutcome::FailedMidStream(BackendError::Cancelled).is_success());
    }
}
