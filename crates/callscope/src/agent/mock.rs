//! Scripted agent for dev mode and tests.
//!
//! Serves a canned message sequence without spawning anything, so the
//! server can run end to end with no CLI binary and no API key.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::client::{AgentError, AgentMessageStream, AgentQuery, QueryOptions};
use super::message::AgentMessage;

/// One step of a scripted response.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Yield this message.
    Message(AgentMessage),
    /// Yield a stream error with this reason.
    Fail(String),
}

impl From<AgentMessage> for ScriptStep {
    fn from(msg: AgentMessage) -> Self {
        ScriptStep::Message(msg)
    }
}

/// [`AgentQuery`] that replays a fixed script for every query.
#[derive(Debug, Clone)]
pub struct ScriptedAgent {
    steps: Vec<ScriptStep>,
    delay: Duration,
}

impl ScriptedAgent {
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            delay: Duration::ZERO,
        }
    }

    /// Pause between steps, to make dev-mode output feel like streaming.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Default dev-mode script: a short markdown analysis plus a clean result.
    pub fn canned_analysis() -> Self {
        let chunks = [
            "## Summary\n\n",
            "This is scripted development output. ",
            "Set an API key and disable dev mode to run the real agent.\n\n",
            "## Key Points\n\n",
            "- The server, stream relay, and client are all live\n",
            "- Only the agent itself is simulated\n",
        ];
        let mut steps: Vec<ScriptStep> = chunks
            .iter()
            .map(|text| AgentMessage::text_delta(*text).into())
            .collect();
        steps.push(AgentMessage::success_result().into());
        Self::new(steps).with_delay(Duration::from_millis(150))
    }
}

#[async_trait]
impl AgentQuery for ScriptedAgent {
    async fn query(
        &self,
        _prompt: &str,
        _options: QueryOptions,
    ) -> Result<AgentMessageStream, AgentError> {
        let steps = self.steps.clone();
        let delay = self.delay;
        let (tx, rx) = mpsc::channel(super::client::MESSAGE_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            for step in steps {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let item = match step {
                    ScriptStep::Message(msg) => Ok(msg),
                    ScriptStep::Fail(reason) => {
                        Err(AgentError::Io(std::io::Error::other(reason)))
                    }
                };
                if tx.send(item).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}
