//! API request handlers.

mod analyze;
mod gong;
mod health;
mod research;

pub use analyze::analyze;
pub use gong::{gong_calls, gong_transcript, gong_users};
pub use health::health;
pub use research::research;

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Response, StatusCode, header},
};
use tokio::sync::mpsc;
use tokio_stream::{StreamExt, wrappers::ReceiverStream};
use tracing::Instrument;

use crate::agent::{AgentQuery, QueryOptions};
use crate::relay::{FRAME_CHANNEL_CAPACITY, Translator, relay};

use super::error::{ApiError, ApiResult};

/// Gate message for the streaming endpoints.
pub(crate) const AGENT_UNCONFIGURED: &str = "ANTHROPIC_API_KEY is not configured";

/// Start a relay for one query and wrap its frames in a streaming response.
///
/// The relay task runs detached; once the headers below are committed, all
/// failures surface in-band on the stream. `setup_error` covers the one
/// failure still possible here, before the body is handed to the client.
pub(crate) fn stream_response(
    agent: Arc<dyn AgentQuery>,
    prompt: String,
    options: QueryOptions,
    translator: Translator,
    setup_error: &'static str,
) -> ApiResult<Response<Body>> {
    let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
    tokio::spawn(relay(agent, prompt, options, translator, tx).in_current_span());

    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    let body = Body::from_stream(stream);

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no") // Disable nginx buffering if present
        .body(body)
        .map_err(|_| ApiError::internal(setup_error))
}
