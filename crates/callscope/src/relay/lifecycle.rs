//! Stream lifecycle: pumps one agent query into a framed byte channel.
//!
//! The pump guarantees the response ends with exactly one `[DONE]` frame
//! and that the channel closes on every exit path. Closing is scoped: the
//! pump owns the sending half, so returning from [`relay`] is what closes
//! the response body. No branch closes anything by hand.
//!
//! A failed frame write means the client went away; the pump then stops
//! pulling upstream messages instead of draining an unread stream.

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::agent::{AgentError, AgentQuery, QueryOptions};

use super::translate::Translator;
use super::wire::{self, WireEvent};

/// Fixed message for failures inside an already-started stream.
pub const STREAM_ERROR_MESSAGE: &str = "Stream error occurred";

/// Capacity of the frame channel behind each streaming response.
pub const FRAME_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Frame sink
// ============================================================================

#[derive(Debug, Error)]
pub enum SinkError {
    /// The receiving half is gone, meaning the client disconnected.
    #[error("frame receiver dropped")]
    Closed,
    #[error("failed to encode wire event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sending half of one streaming response.
#[derive(Debug, Clone)]
pub struct FrameSink {
    tx: mpsc::Sender<Bytes>,
}

impl FrameSink {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// Encode one event and write its frame.
    pub async fn send_event(&self, event: &WireEvent) -> Result<(), SinkError> {
        let frame = wire::encode_frame(event)?;
        self.tx.send(frame).await.map_err(|_| SinkError::Closed)
    }

    /// Write the terminal `[DONE]` frame.
    pub async fn send_sentinel(&self) -> Result<(), SinkError> {
        self.tx
            .send(wire::sentinel_frame())
            .await
            .map_err(|_| SinkError::Closed)
    }
}

// ============================================================================
// Relay pump
// ============================================================================

/// Why the pump stopped before upstream exhaustion.
#[derive(Debug, Error)]
enum PumpError {
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Upstream(#[from] AgentError),
}

/// Run one agent query and relay its events into `tx` as SSE frames.
///
/// Spawned per streaming request, after response headers are committed.
/// Failures past that point cannot change the HTTP status, so every
/// failure surfaces in-band: a best-effort `error` event, then the
/// sentinel, then channel close by scope end.
pub async fn relay(
    agent: Arc<dyn AgentQuery>,
    prompt: String,
    options: QueryOptions,
    translator: Translator,
    tx: mpsc::Sender<Bytes>,
) {
    let sink = FrameSink::new(tx);
    match pump(agent, &prompt, options, translator, &sink).await {
        Ok(()) => {}
        Err(PumpError::Sink(SinkError::Closed)) => {
            debug!("client disconnected, stopping relay");
        }
        Err(e) => {
            error!("stream relay failed: {e}");
            let _ = sink
                .send_event(&WireEvent::error(STREAM_ERROR_MESSAGE))
                .await;
        }
    }
    let _ = sink.send_sentinel().await;
}

/// Start the query and forward every translated event in upstream order.
///
/// Each frame is written before the next upstream message is requested,
/// so the client observes events exactly as the agent produced them.
async fn pump(
    agent: Arc<dyn AgentQuery>,
    prompt: &str,
    options: QueryOptions,
    translator: Translator,
    sink: &FrameSink,
) -> Result<(), PumpError> {
    let mut upstream = agent.query(prompt, options).await?;
    while let Some(item) = upstream.recv().await {
        let message = item?;
        for event in translator.translate(&message) {
            sink.send_event(&event).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::agent::{AgentMessage, AgentMessageStream, ScriptStep, ScriptedAgent};

    use super::*;

    const FAILURE: &str = "Analysis did not complete successfully";

    async fn run_relay(agent: ScriptedAgent) -> Vec<String> {
        let (tx, mut rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        relay(
            Arc::new(agent),
            "prompt".to_string(),
            QueryOptions::analysis(),
            Translator::new(FAILURE),
            tx,
        )
        .await;

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(String::from_utf8(frame.to_vec()).unwrap());
        }
        frames
    }

    fn assert_single_trailing_sentinel(frames: &[String]) {
        let sentinels = frames
            .iter()
            .filter(|f| f.as_str() == "data: [DONE]\n\n")
            .count();
        assert_eq!(sentinels, 1);
        assert_eq!(frames.last().unwrap(), "data: [DONE]\n\n");
    }

    #[tokio::test]
    async fn successful_run_ends_with_done_then_sentinel() {
        let frames = run_relay(ScriptedAgent::new(vec![
            AgentMessage::text_delta("Hello ").into(),
            AgentMessage::text_delta("world").into(),
            AgentMessage::success_result().into(),
        ]))
        .await;

        assert_eq!(
            frames,
            vec![
                "data: {\"type\":\"text_delta\",\"text\":\"Hello \"}\n\n",
                "data: {\"type\":\"text_delta\",\"text\":\"world\"}\n\n",
                "data: {\"type\":\"done\"}\n\n",
                "data: [DONE]\n\n",
            ]
        );
        assert_single_trailing_sentinel(&frames);
    }

    #[tokio::test]
    async fn failed_result_surfaces_route_message_before_sentinel() {
        let frames = run_relay(ScriptedAgent::new(vec![
            AgentMessage::text_delta("partial").into(),
            AgentMessage::Result {
                subtype: "error_during_execution".to_string(),
                is_error: true,
            }
            .into(),
        ]))
        .await;

        assert_eq!(
            frames[1],
            "data: {\"type\":\"error\",\"message\":\"Analysis did not complete successfully\"}\n\n"
        );
        assert_single_trailing_sentinel(&frames);
    }

    #[tokio::test]
    async fn upstream_failure_surfaces_stream_error_then_sentinel() {
        let frames = run_relay(ScriptedAgent::new(vec![
            AgentMessage::text_delta("partial").into(),
            ScriptStep::Fail("process blew up".to_string()),
        ]))
        .await;

        assert_eq!(
            frames,
            vec![
                "data: {\"type\":\"text_delta\",\"text\":\"partial\"}\n\n",
                "data: {\"type\":\"error\",\"message\":\"Stream error occurred\"}\n\n",
                "data: [DONE]\n\n",
            ]
        );
    }

    #[tokio::test]
    async fn exhaustion_without_result_emits_only_sentinel() {
        let frames = run_relay(ScriptedAgent::new(vec![
            AgentMessage::text_delta("trailing").into(),
        ]))
        .await;

        assert_eq!(
            frames,
            vec![
                "data: {\"type\":\"text_delta\",\"text\":\"trailing\"}\n\n",
                "data: [DONE]\n\n",
            ]
        );
    }

    #[tokio::test]
    async fn empty_upstream_still_closes_with_sentinel() {
        let frames = run_relay(ScriptedAgent::new(vec![])).await;
        assert_eq!(frames, vec!["data: [DONE]\n\n"]);
    }

    /// Agent that counts how many messages the consumer let it deliver.
    struct CountingAgent {
        total: usize,
        delivered: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AgentQuery for CountingAgent {
        async fn query(
            &self,
            _prompt: &str,
            _options: QueryOptions,
        ) -> Result<AgentMessageStream, AgentError> {
            let total = self.total;
            let delivered = self.delivered.clone();
            let (tx, rx) = mpsc::channel(1);
            tokio::spawn(async move {
                for i in 0..total {
                    if tx.send(Ok(AgentMessage::text_delta(i.to_string()))).await.is_err() {
                        return;
                    }
                    delivered.fetch_add(1, Ordering::SeqCst);
                }
            });
            Ok(rx)
        }
    }

    #[tokio::test]
    async fn disconnect_stops_upstream_consumption() {
        let delivered = Arc::new(AtomicUsize::new(0));
        let agent = CountingAgent {
            total: 500,
            delivered: delivered.clone(),
        };

        let (tx, rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        drop(rx);
        relay(
            Arc::new(agent),
            "prompt".to_string(),
            QueryOptions::analysis(),
            Translator::new(FAILURE),
            tx,
        )
        .await;

        // The first frame write fails, so the pump must give up long
        // before the agent's 500 messages are drained.
        assert!(delivered.load(Ordering::SeqCst) < 10);
    }
}
