//! Upstream agent integration: stream-json message types, the CLI
//! subprocess client, and the scripted dev-mode agent.

pub mod client;
pub mod message;
pub mod mock;

pub use client::{AgentError, AgentMessageStream, AgentQuery, CliAgent, QueryOptions, ToolPolicy};
pub use message::{AgentMessage, AssistantPayload, ContentBlock, ContentDelta, ProviderEvent};
pub use mock::{ScriptStep, ScriptedAgent};
