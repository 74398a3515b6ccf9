//! POST /api/analyze: stream an agent analysis of one transcript.

use axum::{body::Body, extract::State, http::Response};
use bytes::Bytes;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::agent::QueryOptions;
use crate::prompts;
use crate::relay::Translator;

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;
use super::{AGENT_UNCONFIGURED, stream_response};

/// 400 when the transcript field is missing, wrong-typed, or empty.
pub const TRANSCRIPT_REQUIRED: &str = "Transcript is required";
/// 500 for failures before the stream opens.
pub const ANALYZE_FAILED: &str = "Failed to process transcript. Check server logs for details.";
/// In-band message when the agent reports a failure result.
pub(crate) const ANALYSIS_FAILURE: &str = "Analysis did not complete successfully";

#[instrument(skip_all, fields(stream_id = %Uuid::new_v4()))]
pub async fn analyze(State(state): State<AppState>, body: Bytes) -> ApiResult<Response<Body>> {
    let payload: Value =
        serde_json::from_slice(&body).map_err(|_| ApiError::internal(ANALYZE_FAILED))?;
    let transcript = payload
        .get("transcript")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or(ApiError::BadRequest(TRANSCRIPT_REQUIRED))?;

    if !state.agent_available() {
        return Err(ApiError::Unconfigured(AGENT_UNCONFIGURED));
    }

    info!(
        transcript_chars = transcript.len(),
        "starting transcript analysis"
    );

    stream_response(
        state.agent.clone(),
        prompts::analysis_prompt(transcript),
        QueryOptions::analysis(),
        Translator::new(ANALYSIS_FAILURE),
        ANALYZE_FAILED,
    )
}
