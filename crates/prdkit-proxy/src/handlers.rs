//! HTTP handlers for the web API.
//!
//! Streaming endpoints wait for the relay's first frame before committing
//! to a status: a failure before any text becomes a JSON error response,
//! anything else becomes a `200` plain-text stream.

use std::future;
use std::sync::Arc;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use futures_util::{StreamExt, stream};
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use prdkit_core::prompt::{brain_dump_prompt, guided_chat_prompt, prd_prompt};
use prdkit_core::{PrdForm, ValidationError};

use crate::error::HttpError;
use crate::models::{BrainDumpRequest, GuidedChatRequest, PingResponse};
use crate::relay::{RelayOutcome, RelaySession};
use crate::sink::{self, CollectSink, RelayFrame};
use crate::state::AppState;

/// Liveness plus the model requests are sent to.
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
        model: state.model.name.clone(),
    })
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

/// Generate a PRD from the form and stream it back.
pub async fn generate(State(state): State<AppState>, body: Bytes) -> Result<Response, HttpError> {
    debug!("POST /api/generate");

    let form: PrdForm = parse_body(&body)?;
    if let Err(e) = form.validate() {
        warn!("Rejecting generation request: {e}");
        return Err(e.into());
    }

    info!(
        feature = %form.feature_name,
        model = %state.model,
        "Generating PRD"
    );
    Ok(stream_generation(&state, prd_prompt(&form)).await)
}

/// Continue a requirements-elicitation conversation.
pub async fn guided_chat(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, HttpError> {
    debug!("POST /api/guided-chat");

    let request: GuidedChatRequest = parse_body(&body)?;
    if request.history.trim().is_empty() {
        return Err(ValidationError::EmptyField("Conversation history").into());
    }

    info!(
        history_len = request.history.len(),
        model = %state.model,
        "Continuing guided chat"
    );
    Ok(stream_generation(&state, guided_chat_prompt(&request.history)).await)
}

/// Extract form fields from a free-text brain dump.
///
/// Runs a full generation, then parses the first JSON object in the
/// model's output.
pub async fn parse_brain_dump(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<PrdForm>, HttpError> {
    debug!("POST /api/parse-brain-dump");

    let request: BrainDumpRequest = parse_body(&body)?;
    if request.brain_dump.trim().is_empty() {
        return Err(ValidationError::EmptyField("Brain dump").into());
    }

    let generation = state.generation_request(brain_dump_prompt(&request.brain_dump));
    let (outcome, sink) = RelaySession::new(Arc::clone(&state.backend), CollectSink::new())
        .run(generation)
        .await;

    match outcome {
        RelayOutcome::Completed | RelayOutcome::EndOfStream => {}
        RelayOutcome::FailedBeforeOutput(e) => return Err(e.into()),
        RelayOutcome::FailedMidStream(e) => {
            return Err(HttpError::BadGateway(format!(
                "Generation failed part way through: {e}"
            )));
        }
        RelayOutcome::Cancelled => {
            return Err(HttpError::Internal("Generation was cancelled".to_string()));
        }
    }

    let Some(form) = extract_form(sink.text()) else {
        warn!(
            output_len = sink.text().len(),
            "Model output did not contain a usable JSON object"
        );
        return Err(HttpError::BadGateway(
            "Could not extract fields from the model output.".to_string(),
        ));
    };

    info!(feature = %form.feature_name, "Parsed brain dump");
    Ok(Json(form))
}

/// Parse the first JSON object in model output as a form.
///
/// Models often wrap JSON in prose or code fences. Each `{` is tried in
/// turn and only the first complete object is read, so anything after it
/// is ignored.
pub fn extract_form(output: &str) -> Option<PrdForm> {
    output.match_indices('{').find_map(|(start, _)| {
        serde_json::Deserializer::from_str(&output[start..])
            .into_iter::<PrdForm>()
            .next()?
            .ok()
    })
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Failed to parse request body: {e}");
        HttpError::BadRequest(format!("Invalid request body: {e}"))
    })
}

/// Spawn a relay session for `prompt` and turn its output into a response.
async fn stream_generation(state: &AppState, prompt: String) -> Response {
    let request = state.generation_request(prompt);
    let (sink, mut receiver) = sink::channel(state.channel_capacity);
    tokio::spawn(RelaySession::new(Arc::clone(&state.backend), sink).run(request));

    match receiver.next().await {
        Some(RelayFrame::Failure(e)) => HttpError::from(e).into_response(),
        None => streaming_response(Body::empty()),
        Some(RelayFrame::Text(first)) => {
            // A failure frame can only be the first frame.
            let rest = receiver.filter_map(|frame| {
                future::ready(match frame {
                    RelayFrame::Text(text) => Some(text),
                    RelayFrame::Failure(_) => None,
                })
            });
            let body = stream::once(future::ready(first))
                .chain(rest)
                .map(Ok::<Bytes, std::io::Error>);
            streaming_response(Body::from_stream(body))
        }
    }
}

fn streaming_response(body: Body) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::X_CONTENT_TYPE_OPTIONS, "nosniff")
        .header("x-accel-buffering", "no") // Disable nginx buffering
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
