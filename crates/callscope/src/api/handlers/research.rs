//! POST /api/research: stream a competitive-research agent conversation.

use axum::{body::Body, extract::State, http::Response};
use bytes::Bytes;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::agent::QueryOptions;
use crate::prompts::{self, ChatMessage};
use crate::relay::Translator;

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;
use super::{AGENT_UNCONFIGURED, stream_response};

/// 400 when the messages field is missing or not an array.
pub const MESSAGES_REQUIRED: &str = "Messages array is required";
/// 400 when no message in the conversation has the user role.
pub const NO_USER_MESSAGE: &str = "No user message found";
/// 500 for failures before the stream opens.
pub const RESEARCH_FAILED: &str = "Failed to process research request";
/// In-band message when the agent reports a failure result.
pub(crate) const RESEARCH_FAILURE: &str = "Research query did not complete successfully";

#[instrument(skip_all, fields(stream_id = %Uuid::new_v4()))]
pub async fn research(State(state): State<AppState>, body: Bytes) -> ApiResult<Response<Body>> {
    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::internal(RESEARCH_FAILED))?;

    // Tolerate malformed items: missing fields read as empty strings rather
    // than rejecting the whole conversation.
    let messages: Vec<ChatMessage> = payload
        .get("messages")
        .and_then(Value::as_array)
        .ok_or(ApiError::BadRequest(MESSAGES_REQUIRED))?
        .iter()
        .map(|item| ChatMessage {
            role: field(item, "role"),
            content: field(item, "content"),
        })
        .collect();

    let prompt =
        prompts::research_prompt(&messages).ok_or(ApiError::BadRequest(NO_USER_MESSAGE))?;

    if !state.agent_available() {
        return Err(ApiError::Unconfigured(AGENT_UNCONFIGURED));
    }

    let model = payload
        .get("model")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or(&state.agent_config.research_model);

    info!(message_count = messages.len(), model, "starting research query");

    stream_response(
        state.agent.clone(),
        prompt,
        QueryOptions::research(model),
        Translator::new(RESEARCH_FAILURE),
        RESEARCH_FAILED,
    )
}

fn field(item: &Value, key: &str) -> String {
    item.get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
