//! Translator from agent messages to wire events.
//!
//! One agent message produces zero or more wire events:
//!
//! 1. Streaming text deltas pass through as `text_delta`.
//! 2. A completed assistant turn contributes one `tool_start` per
//!    `tool_use` block, in content order.
//! 3. Tool heartbeats pass through as `tool_progress`.
//! 4. A terminal result maps to `done` on success, or to `error` carrying
//!    the route's fixed failure message. The result subtype is logged,
//!    never forwarded.
//! 5. System bookkeeping and echoed tool results translate to nothing.

use tracing::warn;

use crate::agent::message::{kind, AgentMessage};

use super::wire::WireEvent;

/// Translates agent messages for one route.
///
/// Routes differ only in the fixed message their failed results surface as.
#[derive(Debug, Clone, Copy)]
pub struct Translator {
    failure_message: &'static str,
}

impl Translator {
    pub fn new(failure_message: &'static str) -> Self {
        Self { failure_message }
    }

    /// Translate a single agent message into wire events.
    pub fn translate(&self, message: &AgentMessage) -> Vec<WireEvent> {
        match message {
            AgentMessage::StreamEvent { event } => {
                if event.kind == kind::CONTENT_BLOCK_DELTA
                    && let Some(delta) = &event.delta
                    && delta.kind == kind::TEXT_DELTA
                    && let Some(text) = &delta.text
                {
                    vec![WireEvent::text_delta(text)]
                } else {
                    vec![]
                }
            }
            AgentMessage::Assistant { message } => message
                .content
                .iter()
                .filter(|block| block.kind == kind::TOOL_USE)
                .filter_map(|block| block.name.as_deref())
                .map(WireEvent::tool_start)
                .collect(),
            AgentMessage::ToolProgress {
                tool_name,
                elapsed_time_seconds,
            } => vec![WireEvent::ToolProgress {
                tool: tool_name.clone(),
                elapsed: *elapsed_time_seconds,
            }],
            AgentMessage::Result { subtype, is_error } => {
                if subtype == kind::RESULT_SUCCESS && !is_error {
                    vec![WireEvent::Done]
                } else {
                    warn!(subtype, is_error, "agent turn did not complete");
                    vec![WireEvent::error(self.failure_message)]
                }
            }
            AgentMessage::System { .. } | AgentMessage::User { .. } => vec![],
        }
    }
}
