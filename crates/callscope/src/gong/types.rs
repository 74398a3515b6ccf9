//! Gong API payloads and the reshaped responses this server returns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Upstream payloads
// ============================================================================

/// A Gong workspace user.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GongUser {
    pub id: String,
    pub email_address: String,
    pub first_name: String,
    pub last_name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GongUsersResponse {
    #[serde(default)]
    pub users: Vec<GongUser>,
}

/// One call from `/calls/extensive`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GongCall {
    pub meta_data: CallMetaData,
    #[serde(default)]
    pub parties: Vec<CallParty>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallMetaData {
    pub id: String,
    pub title: String,
    /// RFC 3339 start timestamp.
    pub started: String,
    /// Call length in seconds.
    pub duration: i64,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallParty {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub affiliation: Option<String>,
}

impl CallParty {
    /// Speaker label: name, falling back to email, falling back to a fixed
    /// placeholder. Empty strings fall through like absent values.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email_address.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or("Unknown Speaker")
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsInfo {
    pub total_records: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GongCallsResponse {
    #[serde(default)]
    pub calls: Vec<GongCall>,
    pub records: RecordsInfo,
}

/// Typed view of `GET /calls/extensive?callIds=..`, used next to the raw
/// payload that passes through to the caller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallDetailsEnvelope {
    #[serde(default)]
    pub calls: Vec<GongCall>,
}

/// Typed view of `GET /calls/transcript?callId=..`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscriptPayload {
    #[serde(default)]
    pub transcript: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    pub speaker_id: String,
    #[serde(default)]
    pub sentences: Vec<Sentence>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sentence {
    /// Offset of the sentence start, in seconds.
    pub start: f64,
    pub text: String,
}

// ============================================================================
// Reshaped responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersResponse {
    pub users: Vec<ActiveUser>,
}

impl UsersResponse {
    /// Keep only active users, with first and last name joined.
    pub fn from_upstream(upstream: GongUsersResponse) -> Self {
        let users = upstream
            .users
            .into_iter()
            .filter(|user| user.active)
            .map(|user| ActiveUser {
                id: user.id,
                name: format!("{} {}", user.first_name, user.last_name),
                email: user.email_address,
            })
            .collect();
        Self { users }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySummary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallSummary {
    pub id: String,
    pub title: String,
    /// Start date as `YYYY-MM-DD`, in UTC.
    pub date: String,
    pub duration: i64,
    pub url: String,
    pub started: String,
    pub parties: Vec<PartySummary>,
}

impl CallSummary {
    pub fn from_call(call: GongCall) -> Self {
        let date = utc_date(&call.meta_data.started);
        Self {
            id: call.meta_data.id,
            title: call.meta_data.title,
            date,
            duration: call.meta_data.duration,
            url: call.meta_data.url,
            started: call.meta_data.started,
            parties: call
                .parties
                .into_iter()
                .map(|party| PartySummary {
                    name: party.name,
                    email: party.email_address,
                    affiliation: party.affiliation,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallsResponse {
    pub calls: Vec<CallSummary>,
    pub total: i64,
}

impl CallsResponse {
    pub fn from_upstream(upstream: GongCallsResponse) -> Self {
        Self {
            total: upstream.records.total_records,
            calls: upstream
                .calls
                .into_iter()
                .map(CallSummary::from_call)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResponse {
    pub call_id: String,
    pub transcript: String,
    pub raw_transcript: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_details: Option<Value>,
}

/// Date part of an RFC 3339 timestamp, converted to UTC. Falls back to the
/// text before `T` when the timestamp does not parse.
fn utc_date(started: &str) -> String {
    match DateTime::parse_from_rfc3339(started) {
        Ok(dt) => dt.with_timezone(&Utc).format("%Y-%m-%d").to_string(),
        Err(_) => started.split('T').next().unwrap_or(started).to_string(),
    }
}
