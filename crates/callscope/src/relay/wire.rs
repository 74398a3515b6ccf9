//! Wire protocol for the analysis event stream.
//!
//! Every event is framed as a Server-Sent Events `data:` line: the literal
//! prefix `data: `, the event serialized as JSON, then a blank line. The
//! stream always terminates with the literal `[DONE]` sentinel, which is not
//! JSON and must be recognized by readers instead of parsed.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Terminal marker, written as the last frame of every stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// SSE line prefix for every frame.
pub const DATA_PREFIX: &str = "data: ";

/// A single event on the wire.
///
/// The serialized form is the SSE payload the client parses, so the shape
/// here is a compatibility contract: tag field `type`, snake_case tags,
/// payload fields in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// Incremental fragment of the answer text.
    TextDelta { text: String },
    /// The agent started a tool invocation.
    ToolStart { tool: String },
    /// Heartbeat for a long-running tool invocation.
    ToolProgress { tool: String, elapsed: f64 },
    /// The upstream query completed successfully.
    Done,
    /// The upstream query failed. `message` is a fixed human-readable
    /// string; failure details stay in the server log.
    Error { message: String },
}

impl WireEvent {
    pub fn text_delta(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    pub fn tool_start(tool: impl Into<String>) -> Self {
        Self::ToolStart { tool: tool.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Encode one event as a complete SSE frame.
///
/// Frames are written to the sink whole, never split, so readers observe
/// either a full `data:` line or nothing.
pub fn encode_frame(event: &WireEvent) -> Result<Bytes, serde_json::Error> {
    let json = serde_json::to_string(event)?;
    Ok(Bytes::from(format!("{DATA_PREFIX}{json}\n\n")))
}

/// The closing `data: [DONE]` frame.
pub fn sentinel_frame() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}
