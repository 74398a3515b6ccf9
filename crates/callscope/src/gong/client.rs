//! HTTP client for the Gong REST API.

use base64::Engine;
use chrono::{SecondsFormat, Utc};
use reqwest::{header, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::GongConfig;

use super::types::{GongCallsResponse, GongUsersResponse};

/// Window queried for a user's recent calls.
const RECENT_CALLS_WINDOW_DAYS: i64 = 30;

#[derive(Debug, Error)]
pub enum GongError {
    /// Non-OK upstream status. Handlers pass it through to the caller.
    #[error("gong api returned {status}")]
    Upstream { status: StatusCode, body: String },
    #[error("gong api request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Client holding connection settings and the precomputed auth header.
#[derive(Debug, Clone)]
pub struct GongClient {
    http: reqwest::Client,
    base_url: String,
    auth_header: Option<String>,
}

impl GongClient {
    pub fn new(config: &GongConfig) -> Self {
        let auth_header = config.credentials().map(|(key, secret)| {
            let encoded =
                base64::engine::general_purpose::STANDARD.encode(format!("{key}:{secret}"));
            format!("Basic {encoded}")
        });
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            auth_header,
        }
    }

    /// False when either credential half is missing.
    pub fn is_configured(&self) -> bool {
        self.auth_header.is_some()
    }

    /// `GET /users`, all workspace users.
    pub async fn fetch_users(&self) -> Result<GongUsersResponse, GongError> {
        let response = self
            .send(self.http.get(format!("{}/users", self.base_url)))
            .await?;
        Ok(response.json().await?)
    }

    /// `POST /calls/extensive` for one primary user over the recent window,
    /// with parties and topics exposed.
    pub async fn fetch_recent_calls(&self, user_id: &str) -> Result<GongCallsResponse, GongError> {
        let to = Utc::now();
        let from = to - chrono::Duration::days(RECENT_CALLS_WINDOW_DAYS);
        let body = json!({
            "filter": {
                "fromDateTime": from.to_rfc3339_opts(SecondsFormat::Millis, true),
                "toDateTime": to.to_rfc3339_opts(SecondsFormat::Millis, true),
                "primaryUsers": [user_id],
            },
            "contentSelector": {
                "exposedFields": {
                    "parties": true,
                    "content": {
                        "topics": true,
                    },
                },
            },
        });
        let response = self
            .send(
                self.http
                    .post(format!("{}/calls/extensive", self.base_url))
                    .json(&body),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// `GET /calls/extensive?callIds=..`, returned raw for passthrough.
    pub async fn fetch_call_details(&self, call_id: &str) -> Result<Value, GongError> {
        let response = self
            .send(
                self.http
                    .get(format!("{}/calls/extensive", self.base_url))
                    .query(&[("callIds", call_id)]),
            )
            .await?;
        Ok(response.json().await?)
    }

    /// `GET /calls/transcript?callId=..`, returned raw for passthrough.
    pub async fn fetch_transcript(&self, call_id: &str) -> Result<Value, GongError> {
        let response = self
            .send(
                self.http
                    .get(format!("{}/calls/transcript", self.base_url))
                    .query(&[("callId", call_id)]),
            )
            .await?;
        Ok(response.json().await?)
    }

    async fn send(&self, req: RequestBuilder) -> Result<reqwest::Response, GongError> {
        let mut req = req.header(header::CONTENT_TYPE, "application/json");
        if let Some(auth) = &self.auth_header {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(%status, "gong api request failed");
            return Err(GongError::Upstream { status, body });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: &str, secret: &str) -> GongClient {
        GongClient::new(&GongConfig {
            base_url: "https://api.gong.io/v2/".to_string(),
            access_key: key.to_string(),
            access_key_secret: secret.to_string(),
        })
    }

    #[test]
    fn auth_header_is_base64_of_key_and_secret() {
        let client = client("AKEY", "ASECRET");
        assert!(client.is_configured());
        // base64("AKEY:ASECRET")
        assert_eq!(
            client.auth_header.as_deref(),
            Some("Basic QUtFWTpBU0VDUkVU")
        );
    }

    #[test]
    fn missing_credential_half_means_unconfigured() {
        assert!(!client("AKEY", "").is_configured());
        assert!(!client("", "ASECRET").is_configured());
    }

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client = client("AKEY", "ASECRET");
        assert_eq!(client.base_url, "https://api.gong.io/v2");
    }
}
