//! Behavioral tests for the relay session.
//!
//! Every ending of a session (done event, plain end of stream, upstream
//! error, client going away) must close the output exactly once, and the
//! forwarded text must not depend on how the upstream body was chunked.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::future::join_all;
use prdkit_core::ports::testing::ScriptedBackend;
use prdkit_core::{BackendError, GenerationOptions, GenerationRequest};
use prdkit_proxy::sink::{self, CollectSink, RelayFrame, RelayReceiver};
use prdkit_proxy::{IN_BAND_ERROR_MARKER, OutputSink, RelayOutcome, RelaySession};
use tokio_test::assert_ok;

const SCENARIO: &str = "{\"response\":\"Hello\"}\n{\"response\":\" world\",\"done\":true}\n";

fn request() -> GenerationRequest {
    GenerationRequest::streaming("llama3.2", "Write a PRD", GenerationOptions::default())
}

async fn collect_text(receiver: RelayReceiver) -> String {
    receiver
        .fold(String::new(), |mut text, frame| async move {
            match frame {
                RelayFrame::Text(bytes) => text.push_str(std::str::from_utf8(&bytes).unwrap()),
                RelayFrame::Failure(e) => panic!("unexpected failure: {e}"),
            }
            text
        })
        .await
}

async fn relay(backend: ScriptedBackend) -> (RelayOutcome, CollectSink) {
    RelaySession::new(Arc::new(backend), CollectSink::new())
        .run(request())
        .await
}

#[tokio::test]
async fn any_three_way_chunking_yields_same_text() {
    let bytes = SCENARIO.as_bytes();

    for first in 0..=bytes.len() {
        for second in first..=bytes.len() {
            let chunks = vec![
                bytes[..first].to_vec(),
                bytes[first..second].to_vec(),
                bytes[second..].to_vec(),
            ];
            let (outcome, sink) = relay(ScriptedBackend::chunks(chunks)).await;

            assert_eq!(outcome, RelayOutcome::Completed, "split at {first}/{second}");
            assert_eq!(sink.text(), "Hello world", "split at {first}/{second}");
            assert_eq!(sink.close_count(), 1);
        }
    }
}

#[tokio::test]
async fn byte_at_a_time_yields_same_text() {
    let chunks: Vec<Vec<u8>> = SCENARIO.bytes().map(|b| vec![b]).collect();
    let (outcome, sink) = relay(ScriptedBackend::chunks(chunks)).await;

    assert_eq!(outcome, RelayOutcome::Completed);
    assert_eq!(sink.text(), "Hello world");
}

#[tokio::test]
async fn split_event_scenario_stops_at_done() {
    let backend = ScriptedBackend::chunks([
        "{\"response\":\"Hel",
        "lo\"}\n{\"respon",
        "se\":\" world\",\"done\":true}\n",
        "{\"response\":\" ignored\"}\n",
    ]);
    let (outcome, sink) = relay(backend).await;

    assert_eq!(outcome, RelayOutcome::Completed);
    assert_eq!(sink.text(), "Hello world");
    assert_eq!(sink.close_count(), 1);
}

#[tokio::test]
async fn every_ending_closes_exactly_once() {
    let endings = [
        ScriptedBackend::chunks(["{\"response\":\"a\",\"done\":true}\n"]),
        ScriptedBackend::chunks(["{\"response\":\"a\"}\n"]),
        ScriptedBackend::chunks(["{\"response\":\"a\",\"done\":true}\n"])
            .then_fail(BackendError::Transport("reset".into())),
        ScriptedBackend::chunks(["{\"response\":\"a\"}\n"])
            .then_fail(BackendError::Transport("reset".into())),
        ScriptedBackend::chunks(Vec::<&str>::new())
            .then_fail(BackendError::Transport("reset".into())),
        ScriptedBackend::failing_open(BackendError::Connect("refused".into())),
        ScriptedBackend::chunks(Vec::<&str>::new()),
    ];

    for backend in endings {
        let (outcome, sink) = relay(backend).await;
        assert_eq!(sink.close_count(), 1, "outcome {outcome:?}");
    }
}

#[tokio::test]
async fn malformed_lines_are_skipped() {
    let backend = ScriptedBackend::chunks([
        "not json at all\n{\"response\":\"a\"}\n{\"response\":\n",
        "[1,2,3]\n{\"response\":\"b\"}\n{\"done\":true}\n",
    ]);
    let (outcome, sink) = relay(backend).await;

    assert_eq!(outcome, RelayOutcome::Completed);
    assert_eq!(sink.text(), "ab");
}

#[tokio::test]
async fn events_without_text_forward_nothing() {
    let backend = ScriptedBackend::chunks([
        "{\"response\":\"\"}\n{\"model\":\"llama3.2\"}\n{\"response\":null}\n{\"done\":true}\n",
    ]);
    let (outcome, sink) = relay(backend).await;

    assert_eq!(outcome, RelayOutcome::Completed);
    assert!(sink.text().is_empty());
    assert_eq!(sink.close_count(), 1);
}

#[tokio::test]
async fn unterminated_final_line_is_salvaged() {
    let backend = ScriptedBackend::chunks(["{\"response\":\"a\"}\n{\"response\":\"z\"}"]);
    let (outcome, sink) = relay(backend).await;

    assert_eq!(outcome, RelayOutcome::EndOfStream);
    assert_eq!(sink.text(), "az");
    assert_eq!(sink.close_count(), 1);
}

#[tokio::test]
async fn immediate_failure_is_a_single_structured_error() {
    let (sink, receiver) = sink::channel(4);
    let backend = Arc::new(ScriptedBackend::failing_open(BackendError::Connect(
        "connection refused".into(),
    )));
    let session = RelaySession::new(backend, sink);

    let (outcome, _sink) = session.run(request()).await;
    let frames: Vec<RelayFrame> = receiver.collect().await;

    assert!(matches!(outcome, RelayOutcome::FailedBeforeOutput(_)));
    assert_eq!(
        frames,
        vec![RelayFrame::Failure(BackendError::Connect(
            "connection refused".into()
        ))]
    );
}

#[tokio::test]
async fn failure_after_text_appends_marker() {
    let backend = ScriptedBackend::chunks(["{\"response\":\"Hello\"}\n"])
        .then_fail(BackendError::Transport("connection reset".into()));
    let (outcome, sink) = relay(backend).await;

    assert_eq!(
        outcome,
        RelayOutcome::FailedMidStream(BackendError::Transport("connection reset".into()))
    );
    assert_eq!(sink.text(), format!("Hello{IN_BAND_ERROR_MARKER}"));
    assert!(sink.rejection().is_none());
    assert_eq!(sink.close_count(), 1);
}

#[tokio::test]
async fn partial_line_is_never_forwarded_and_disconnect_cancels() {
    let backend = Arc::new(ScriptedBackend::chunks(["{\"response\":\"Hel"]).then_hold_open());
    let (sink, mut receiver) = sink::channel(4);
    let cancel = sink.cancellation();

    let handle = tokio::spawn(RelaySession::new(backend, sink).run(request()));

    let waited = tokio::time::timeout(Duration::from_millis(50), receiver.next()).await;
    assert!(waited.is_err(), "no frame expected for an incomplete line");

    drop(receiver);
    assert!(cancel.is_cancelled());

    let (outcome, _sink) = assert_ok!(handle.await);
    assert_eq!(outcome, RelayOutcome::Cancelled);
}

#[tokio::test]
async fn slow_reader_receives_fragments_in_order() {
    let chunks: Vec<String> = (0..20)
        .map(|i| format!("{{\"response\":\"{i},\"}}\n"))
        .collect();
    let backend = Arc::new(ScriptedBackend::chunks(chunks));
    let (sink, receiver) = sink::channel(1);

    let handle = tokio::spawn(RelaySession::new(backend, sink).run(request()));

    let mut text = String::new();
    let mut frames = receiver;
    while let Some(frame) = frames.next().await {
        tokio::task::yield_now().await;
        match frame {
            RelayFrame::Text(bytes) => text.push_str(std::str::from_utf8(&bytes).unwrap()),
            RelayFrame::Failure(e) => panic!("unexpected failure: {e}"),
        }
    }

    let expected: String = (0..20).map(|i| format!("{i},")).collect();
    assert_eq!(text, expected);

    let (outcome, _sink) = assert_ok!(handle.await);
    assert_eq!(outcome, RelayOutcome::EndOfStream);
}

#[tokio::test]
async fn request_is_sent_as_a_stream() {
    let backend = Arc::new(ScriptedBackend::chunks([common::ndjson(&["ok"])]));
    let (outcome, sink) = RelaySession::new(backend.clone(), CollectSink::new())
        .run(request())
        .await;

    assert!(outcome.is_success());
    assert_eq!(sink.into_text(), "ok");

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].stream);
    assert_eq!(requests[0].model, "llama3.2");
}

#[tokio::test]
async fn concurrent_sessions_keep_their_own_text() {
    let backend = Arc::new(ScriptedBackend::echo_prompt(3));
    let prompts = [
        "alpha draft",
        "beta \u{e9}t\u{e9} draft",
        "gamma {\"braces\"} draft\nsecond line",
    ];

    let (handles, receivers): (Vec<_>, Vec<_>) = prompts
        .iter()
        .map(|prompt| {
            let (sink, receiver) = sink::channel(1);
            let request =
                GenerationRequest::streaming("llama3.2", *prompt, GenerationOptions::default());
            let handle = tokio::spawn(RelaySession::new(backend.clone(), sink).run(request));
            (handle, receiver)
        })
        .unzip();

    let texts = join_all(receivers.into_iter().map(collect_text)).await;
    assert_eq!(texts, prompts);

    for handle in handles {
        let (outcome, _sink) = assert_ok!(handle.await);
        assert_eq!(outcome, RelayOutcome::Completed);
    }
    assert_eq!(backend.requests().len(), prompts.len());
}

#[tokio::test]
async fn concurrent_sessions_each_close_once() {
    let backend = Arc::new(ScriptedBackend::echo_prompt(5));
    let prompts = ["first PRD", "second PRD", "third PRD", "fourth PRD"];

    let runs = prompts.iter().map(|prompt| {
        let request =
            GenerationRequest::streaming("llama3.2", *prompt, GenerationOptions::default());
        RelaySession::new(backend.clone(), CollectSink::new()).run(request)
    });
    let results = join_all(runs).await;

    for ((outcome, sink), prompt) in results.into_iter().zip(prompts) {
        assert_eq!(outcome, RelayOutcome::Completed);
        assert_eq!(sink.text(), prompt);
        assert_eq!(sink.close_count(), 1);
    }
}
