//! GET /api/gong/{users,calls,transcript}: proxy endpoints for call data.
//!
//! Thin reshaping layer over the Gong REST API. Upstream rejections pass
//! through with their original status; the fixed per-endpoint messages and
//! response shapes are part of the frontend contract.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::gong::{
    CallDetailsEnvelope, CallsResponse, TranscriptPayload, TranscriptResponse, UsersResponse,
    format_transcript,
};

use super::super::error::{ApiError, ApiResult};
use super::super::state::AppState;

/// 500 when either credential half is missing.
pub const GONG_CREDENTIALS_REQUIRED: &str = "GONG_ACCESS_KEY and GONG_ACCESS_KEY_SECRET are required";
pub const USER_ID_REQUIRED: &str = "userId parameter is required";
pub const CALL_ID_REQUIRED: &str = "callId parameter is required";

pub const USERS_FETCH_FAILED: &str = "Failed to fetch users from Gong API";
pub const CALLS_FETCH_FAILED: &str = "Failed to fetch calls from Gong API";
pub const CALL_DETAILS_FETCH_FAILED: &str = "Failed to fetch call details from Gong API";
pub const TRANSCRIPT_FETCH_FAILED: &str = "Failed to fetch transcript from Gong API";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallsQuery {
    user_id: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptQuery {
    call_id: Option<String>,
}

/// List active Gong users.
pub async fn gong_users(State(state): State<AppState>) -> ApiResult<Json<UsersResponse>> {
    if !state.gong.is_configured() {
        error!("gong api credentials not configured");
        return Err(ApiError::Unconfigured(GONG_CREDENTIALS_REQUIRED));
    }

    info!("fetching gong users");

    let upstream = state
        .gong
        .fetch_users()
        .await
        .map_err(|e| ApiError::gong(e, USERS_FETCH_FAILED))?;

    let total_users = upstream.users.len();
    let response = UsersResponse::from_upstream(upstream);
    info!(
        total_users,
        active_users = response.users.len(),
        "fetched gong users"
    );

    Ok(Json(response))
}

/// List a user's calls from the recent window.
pub async fn gong_calls(
    State(state): State<AppState>,
    Query(query): Query<CallsQuery>,
) -> ApiResult<Json<CallsResponse>> {
    if !state.gong.is_configured() {
        error!("gong api credentials not configured");
        return Err(ApiError::Unconfigured(GONG_CREDENTIALS_REQUIRED));
    }

    // The limit is logged for parity with the frontend's request but does
    // not cap the upstream window.
    let limit = query.limit.unwrap_or_else(|| "10".to_string());
    let Some(user_id) = query.user_id.filter(|id| !id.is_empty()) else {
        warn!("missing userId parameter in request");
        return Err(ApiError::BadRequest(USER_ID_REQUIRED));
    };

    info!(user_id = %user_id, limit = %limit, "fetching gong calls");

    let upstream = state
        .gong
        .fetch_recent_calls(&user_id)
        .await
        .map_err(|e| ApiError::gong(e, CALLS_FETCH_FAILED))?;

    let response = CallsResponse::from_upstream(upstream);
    info!(
        user_id = %user_id,
        calls = response.calls.len(),
        total_records = response.total,
        "fetched gong calls"
    );

    Ok(Json(response))
}

/// Fetch one call's transcript, formatted for reading, plus the raw payloads.
pub async fn gong_transcript(
    State(state): State<AppState>,
    Query(query): Query<TranscriptQuery>,
) -> ApiResult<Json<TranscriptResponse>> {
    if !state.gong.is_configured() {
        error!("gong api credentials not configured");
        return Err(ApiError::Unconfigured(GONG_CREDENTIALS_REQUIRED));
    }

    let Some(call_id) = query.call_id.filter(|id| !id.is_empty()) else {
        warn!("missing callId parameter in request");
        return Err(ApiError::BadRequest(CALL_ID_REQUIRED));
    };

    info!(call_id = %call_id, "fetching gong transcript");

    let details = state
        .gong
        .fetch_call_details(&call_id)
        .await
        .map_err(|e| ApiError::gong(e, CALL_DETAILS_FETCH_FAILED))?;
    let raw_transcript = state
        .gong
        .fetch_transcript(&call_id)
        .await
        .map_err(|e| ApiError::gong(e, TRANSCRIPT_FETCH_FAILED))?;

    // Typed views for formatting; the raw payloads pass through untouched.
    let envelope: CallDetailsEnvelope =
        serde_json::from_value(details.clone()).unwrap_or_default();
    let segments: TranscriptPayload =
        serde_json::from_value(raw_transcript.clone()).unwrap_or_default();

    let transcript = format_transcript(envelope.calls.first(), &segments.transcript);
    let call_details = details.get("calls").and_then(|calls| calls.get(0)).cloned();

    info!(
        call_id = %call_id,
        transcript_chars = transcript.len(),
        segment_count = segments.transcript.len(),
        "fetched gong transcript"
    );

    Ok(Json(TranscriptResponse {
        call_id,
        transcript,
        raw_transcript,
        call_details,
    }))
}
