//! Messages read from the agent CLI's `--output-format stream-json` output.
//!
//! The CLI prints one JSON object per stdout line. The enum below covers
//! exactly the message types the relay consumes; a line that parses to no
//! variant is logged and skipped by the reader loop in
//! [`CliAgent`](crate::agent::CliAgent).

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Messages
// ============================================================================

/// A single line of the CLI's stream-json output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    /// Session bookkeeping printed when the CLI starts up.
    System {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtype: Option<String>,
    },
    /// Tool results echoed back into the conversation.
    User {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
    },
    /// A completed assistant turn with its content blocks.
    Assistant { message: AssistantPayload },
    /// Partial streaming event wrapping a provider-level delta.
    StreamEvent { event: ProviderEvent },
    /// Progress heartbeat emitted while a tool call runs.
    ToolProgress {
        tool_name: String,
        elapsed_time_seconds: f64,
    },
    /// Terminal turn outcome. Exactly one is printed per query on success.
    Result {
        subtype: String,
        #[serde(default)]
        is_error: bool,
    },
}

impl AgentMessage {
    /// Parse a single stream-json line from the CLI.
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// True for a `result` message reporting a successful turn.
    pub fn is_success_result(&self) -> bool {
        matches!(
            self,
            AgentMessage::Result { subtype, is_error }
                if subtype == kind::RESULT_SUCCESS && !is_error
        )
    }
}

// ============================================================================
// Assistant payload
// ============================================================================

/// Body of an `assistant` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantPayload {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

/// One content block of an assistant turn.
///
/// Blocks are kept as kind-tagged structs rather than a closed enum: the
/// CLI grows new block types (thinking, server tool results) and an
/// unrecognized block must not poison the whole assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub kind: String,
    /// Tool name, present when `kind` is `tool_use`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Block text, present when `kind` is `text`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Provider event carried inside a `stream_event` message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEvent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<ContentDelta>,
}

/// Delta payload of a `content_block_delta` provider event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDelta {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

// ============================================================================
// Wire kind constants
// ============================================================================

/// String discriminants used inside message payloads.
pub mod kind {
    /// Provider event carrying a streaming delta.
    pub const CONTENT_BLOCK_DELTA: &str = "content_block_delta";
    /// Delta holding a chunk of assistant text.
    pub const TEXT_DELTA: &str = "text_delta";
    /// Assistant content block invoking a tool.
    pub const TOOL_USE: &str = "tool_use";
    /// `result` subtype for a turn that ran to completion.
    pub const RESULT_SUCCESS: &str = "success";
}

// ============================================================================
// Constructors
// ============================================================================

impl AgentMessage {
    /// Build a `stream_event` carrying a text delta.
    pub fn text_delta(text: impl Into<String>) -> Self {
        AgentMessage::StreamEvent {
            event: ProviderEvent {
                kind: kind::CONTENT_BLOCK_DELTA.to_string(),
                delta: Some(ContentDelta {
                    kind: kind::TEXT_DELTA.to_string(),
                    text: Some(text.into()),
                }),
            },
        }
    }

    /// Build an assistant message whose content is a single `tool_use` block.
    pub fn tool_use(tool: impl Into<String>) -> Self {
        AgentMessage::Assistant {
            message: AssistantPayload {
                content: vec![ContentBlock {
                    kind: kind::TOOL_USE.to_string(),
                    name: Some(tool.into()),
                    text: None,
                }],
            },
        }
    }

    /// Build a `tool_progress` heartbeat.
    pub fn tool_progress(tool: impl Into<String>, elapsed: f64) -> Self {
        AgentMessage::ToolProgress {
            tool_name: tool.into(),
            elapsed_time_seconds: elapsed,
        }
    }

    /// Build a successful `result` message.
    pub fn success_result() -> Self {
        AgentMessage::Result {
            subtype: kind::RESULT_SUCCESS.to_string(),
            is_error: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_system_init_line() {
        let line = r#"{"type":"system","subtype":"init","session_id":"abc","tools":[]}"#;
        let msg = AgentMessage::parse(line).unwrap();
        assert!(matches!(msg, AgentMessage::System { subtype: Some(s) } if s == "init"));
    }

    #[test]
    fn parses_stream_event_text_delta() {
        let line = r#"{"type":"stream_event","event":{"type":"content_block_delta","index":0,"delta":{"type":"text_delta","text":"Hello"}}}"#;
        let msg = AgentMessage::parse(line).unwrap();
        let AgentMessage::StreamEvent { event } = msg else {
            panic!("expected stream_event");
        };
        assert_eq!(event.kind, kind::CONTENT_BLOCK_DELTA);
        let delta = event.delta.unwrap();
        assert_eq!(delta.kind, kind::TEXT_DELTA);
        assert_eq!(delta.text.as_deref(), Some("Hello"));
    }

    #[test]
    fn parses_assistant_with_mixed_blocks() {
        let line = r#"{"type":"assistant","message":{"role":"assistant","content":[{"type":"text","text":"Searching"},{"type":"tool_use","id":"t1","name":"WebSearch","input":{}}]}}"#;
        let msg = AgentMessage::parse(line).unwrap();
        let AgentMessage::Assistant { message } = msg else {
            panic!("expected assistant");
        };
        assert_eq!(message.content.len(), 2);
        assert_eq!(message.content[0].kind, "text");
        assert_eq!(message.content[1].kind, kind::TOOL_USE);
        assert_eq!(message.content[1].name.as_deref(), Some("WebSearch"));
    }

    #[test]
    fn unknown_assistant_block_kind_still_parses() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"hmm"}]}}"#;
        let msg = AgentMessage::parse(line).unwrap();
        let AgentMessage::Assistant { message } = msg else {
            panic!("expected assistant");
        };
        assert_eq!(message.content[0].kind, "thinking");
        assert!(message.content[0].name.is_none());
    }

    #[test]
    fn parses_tool_progress() {
        let line = r#"{"type":"tool_progress","tool_name":"WebSearch","elapsed_time_seconds":3.5}"#;
        let msg = AgentMessage::parse(line).unwrap();
        let AgentMessage::ToolProgress {
            tool_name,
            elapsed_time_seconds,
        } = msg
        else {
            panic!("expected tool_progress");
        };
        assert_eq!(tool_name, "WebSearch");
        assert_eq!(elapsed_time_seconds, 3.5);
    }

    #[test]
    fn parses_result_and_classifies_success() {
        let ok = AgentMessage::parse(
            r#"{"type":"result","subtype":"success","is_error":false,"result":"done"}"#,
        )
        .unwrap();
        assert!(ok.is_success_result());

        let err = AgentMessage::parse(
            r#"{"type":"result","subtype":"error_max_turns","is_error":true}"#,
        )
        .unwrap();
        assert!(!err.is_success_result());

        // subtype success but flagged as error still counts as a failure
        let flagged =
            AgentMessage::parse(r#"{"type":"result","subtype":"success","is_error":true}"#)
                .unwrap();
        assert!(!flagged.is_success_result());
    }

    #[test]
    fn result_is_error_defaults_to_false() {
        let msg = AgentMessage::parse(r#"{"type":"result","subtype":"success"}"#).unwrap();
        assert!(msg.is_success_result());
    }

    #[test]
    fn unrecognized_message_type_is_an_error() {
        assert!(AgentMessage::parse(r#"{"type":"keepalive"}"#).is_err());
        assert!(AgentMessage::parse("not json at all").is_err());
    }
}
