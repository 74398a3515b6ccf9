//! Test utilities and common setup.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::Query,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use callscope::agent::{
    AgentError, AgentMessage, AgentMessageStream, AgentQuery, QueryOptions, ScriptStep,
    ScriptedAgent,
};
use callscope::api::{AppState, create_router};
use callscope::config::{AgentConfig, GongConfig};
use callscope::gong::GongClient;

/// Agent configuration that passes the API key gate.
pub fn configured_agent() -> AgentConfig {
    AgentConfig {
        api_key: "test-api-key".to_string(),
        ..AgentConfig::default()
    }
}

/// Gong client with no credentials. Requests gate before reaching it.
fn unconfigured_gong() -> GongClient {
    GongClient::new(&GongConfig::default())
}

/// App replaying a scripted agent response, with no Gong credentials.
pub fn scripted_app(steps: Vec<ScriptStep>) -> Router {
    let state = AppState::new(
        Arc::new(ScriptedAgent::new(steps)),
        unconfigured_gong(),
        configured_agent(),
    );
    create_router(state, &[])
}

/// App whose agent must never be reached, for gate and validation tests.
pub fn gated_app(agent_config: AgentConfig) -> Router {
    let state = AppState::new(Arc::new(PanicAgent), unconfigured_gong(), agent_config);
    create_router(state, &[])
}

/// App recording every agent query before replaying a canned response.
pub fn recording_app(agent: RecordingAgent) -> Router {
    let state = AppState::new(Arc::new(agent), unconfigured_gong(), configured_agent());
    create_router(state, &[])
}

/// App with Gong credentials aimed at the given upstream base URL.
pub fn gong_app(base_url: &str) -> Router {
    let gong = GongClient::new(&GongConfig {
        base_url: base_url.to_string(),
        access_key: "test-access-key".to_string(),
        access_key_secret: "test-access-secret".to_string(),
    });
    let state = AppState::new(Arc::new(PanicAgent), gong, configured_agent());
    create_router(state, &[])
}

/// Bind a router to an ephemeral local port and serve it in the background.
pub async fn spawn_server(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    addr
}

// ============================================================================
// Agent doubles
// ============================================================================

/// [`AgentQuery`] that fails the test if anything reaches it.
pub struct PanicAgent;

#[async_trait]
impl AgentQuery for PanicAgent {
    async fn query(
        &self,
        _prompt: &str,
        _options: QueryOptions,
    ) -> Result<AgentMessageStream, AgentError> {
        unreachable!("the agent must not be queried");
    }
}

/// [`AgentQuery`] recording each query, then replaying a short success.
#[derive(Clone, Default)]
pub struct RecordingAgent {
    queries: Arc<Mutex<Vec<(String, QueryOptions)>>>,
}

impl RecordingAgent {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `(prompt, options)` pair seen so far, in call order.
    pub fn queries(&self) -> Vec<(String, QueryOptions)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentQuery for RecordingAgent {
    async fn query(
        &self,
        prompt: &str,
        options: QueryOptions,
    ) -> Result<AgentMessageStream, AgentError> {
        self.queries
            .lock()
            .unwrap()
            .push((prompt.to_string(), options.clone()));
        ScriptedAgent::new(vec![
            AgentMessage::text_delta("ok").into(),
            AgentMessage::success_result().into(),
        ])
        .query(prompt, options)
        .await
    }
}

// ============================================================================
// Fake Gong upstream
// ============================================================================

/// Upstream serving canned Gong payloads for user `u1` and call `c1`.
pub fn fake_gong_router() -> Router {
    Router::new()
        .route("/users", get(fake_users))
        .route(
            "/calls/extensive",
            get(fake_call_details).post(fake_recent_calls),
        )
        .route("/calls/transcript", get(fake_transcript))
}

/// Upstream that rejects every request with one fixed status and body.
pub fn rejecting_gong_router(status: StatusCode, body: &'static str) -> Router {
    Router::new().fallback(move || async move { (status, body) })
}

fn canned_call() -> Value {
    json!({
        "metaData": {
            "id": "c1",
            "title": "Renewal discussion",
            "started": "2026-03-01T03:30:00+05:00",
            "duration": 1800,
            "url": "https://app.gong.io/call?id=c1",
            "primaryUserId": "u1",
            "direction": "Outbound"
        },
        "parties": [
            {
                "id": "s1",
                "name": "Ada Seller",
                "emailAddress": "ada@corp.example",
                "affiliation": "Internal"
            },
            {
                "id": "s2",
                "emailAddress": "buyer@client.example",
                "affiliation": "External"
            }
        ]
    })
}

async fn fake_users() -> Json<Value> {
    Json(json!({
        "users": [
            {
                "id": "u1",
                "emailAddress": "ada@corp.example",
                "firstName": "Ada",
                "lastName": "Seller",
                "active": true
            },
            {
                "id": "u2",
                "emailAddress": "bob@corp.example",
                "firstName": "Bob",
                "lastName": "Closer",
                "active": false
            },
            {
                "id": "u3",
                "emailAddress": "cleo@corp.example",
                "firstName": "Cleo",
                "lastName": "Rep",
                "active": true
            }
        ]
    }))
}

async fn fake_recent_calls() -> Json<Value> {
    Json(json!({
        "requestId": "req-calls",
        "records": {
            "totalRecords": 7,
            "currentPageSize": 2,
            "currentPageNumber": 1
        },
        "calls": [
            canned_call(),
            {
                "metaData": {
                    "id": "c2",
                    "title": "Pricing follow-up",
                    "started": "2026-03-02T10:00:00Z",
                    "duration": 900,
                    "url": "https://app.gong.io/call?id=c2"
                },
                "parties": []
            }
        ]
    }))
}

async fn fake_call_details(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("callIds").map(String::as_str) == Some("c1") {
        Json(json!({"requestId": "req-details", "calls": [canned_call()]})).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({"requestId": "req-details", "errors": ["call not found"]})),
        )
            .into_response()
    }
}

async fn fake_transcript(Query(params): Query<HashMap<String, String>>) -> Response {
    if params.get("callId").map(String::as_str) != Some("c1") {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"requestId": "req-transcript", "errors": ["call not found"]})),
        )
            .into_response();
    }
    Json(json!({
        "callId": "c1",
        "transcript": [
            {
                "speakerId": "s1",
                "topic": "Intro",
                "sentences": [
                    {"start": 0, "end": 2, "text": "Hi there."},
                    {"start": 4, "end": 6, "text": "Ready to review the renewal?"}
                ]
            },
            {
                "speakerId": "s2",
                "topic": "Intro",
                "sentences": [
                    {"start": 9, "end": 11, "text": "Yes, let's do it."}
                ]
            },
            {
                "speakerId": "ghost",
                "sentences": [
                    {"start": 15, "end": 16, "text": "Can everyone hear me?"}
                ]
            }
        ]
    }))
    .into_response()
}
