//! Client for the agent CLI subprocess.
//!
//! Each query spawns one short-lived CLI process in print mode and reads
//! its stream-json stdout. Three tasks run per query: a stdin writer that
//! delivers the prompt and closes the pipe, a stdout reader that owns the
//! child process and forwards parsed messages, and a stderr drain. The
//! child is killed once the message consumer goes away.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::AgentConfig;

use super::message::AgentMessage;

/// Capacity of the per-query message channel.
pub(crate) const MESSAGE_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent binary could not be started.
    #[error("failed to spawn agent process `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    /// A spawned process was missing one of its standard pipes.
    #[error("agent process has no {0}")]
    MissingPipe(&'static str),
    /// Reading from the agent process failed.
    #[error("agent i/o error: {0}")]
    Io(#[from] std::io::Error),
    /// The process exited abnormally without printing a terminal result.
    #[error("agent process exited with {status} before reporting a result")]
    ProcessFailed { status: ExitStatus },
}

// ============================================================================
// Query options
// ============================================================================

/// Which tools the agent may use during a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolPolicy {
    /// Every tool disallowed. The agent can only produce text.
    None,
    /// The CLI's default toolset (web search, file access, shell).
    Preset,
}

/// Per-query agent parameters.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub max_turns: u32,
    pub tools: ToolPolicy,
    /// Model override. `None` keeps the CLI's configured default.
    pub model: Option<String>,
    pub include_partial_messages: bool,
}

impl QueryOptions {
    /// Options for single-shot transcript analysis: text only, no tools.
    pub fn analysis() -> Self {
        Self {
            max_turns: 5,
            tools: ToolPolicy::None,
            model: None,
            include_partial_messages: true,
        }
    }

    /// Options for multi-turn research with the full toolset.
    pub fn research(model: impl Into<String>) -> Self {
        Self {
            max_turns: 15,
            tools: ToolPolicy::Preset,
            model: Some(model.into()),
            include_partial_messages: true,
        }
    }
}

// ============================================================================
// Query trait
// ============================================================================

/// Stream of messages produced by one agent query.
///
/// An `Err` item models mid-stream failure; the channel closing models the
/// end of the sequence.
pub type AgentMessageStream = mpsc::Receiver<Result<AgentMessage, AgentError>>;

/// Seam between the HTTP handlers and the agent process.
#[async_trait]
pub trait AgentQuery: Send + Sync {
    async fn query(
        &self,
        prompt: &str,
        options: QueryOptions,
    ) -> Result<AgentMessageStream, AgentError>;
}

// ============================================================================
// CLI implementation
// ============================================================================

/// Production [`AgentQuery`] backed by the agent CLI binary.
#[derive(Debug, Clone)]
pub struct CliAgent {
    binary: String,
    api_key: Option<String>,
    cwd: Option<PathBuf>,
}

impl CliAgent {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            api_key: config.configured_api_key().map(str::to_string),
            cwd: config.working_dir(),
        }
    }

    /// Map [`QueryOptions`] to CLI flags.
    ///
    /// Permission checks are always bypassed: queries run unattended and
    /// there is no one at the other end to approve a prompt.
    fn build_args(options: &QueryOptions) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--max-turns".to_string(),
            options.max_turns.to_string(),
        ];
        if let Some(model) = &options.model {
            args.push("--model".to_string());
            args.push(model.clone());
        }
        if options.include_partial_messages {
            args.push("--include-partial-messages".to_string());
        }
        args.push("--permission-mode".to_string());
        args.push("bypassPermissions".to_string());
        args.push("--dangerously-skip-permissions".to_string());
        if options.tools == ToolPolicy::None {
            args.push("--disallowedTools".to_string());
            args.push("*".to_string());
        }
        args
    }

    /// Forward parsed stdout lines until EOF, then reap the child.
    ///
    /// Owns the child so that dropping this task (or breaking out of the
    /// loop) tears the process down via kill-on-drop.
    async fn read_stream(
        mut child: Child,
        stdout: ChildStdout,
        tx: mpsc::Sender<Result<AgentMessage, AgentError>>,
    ) {
        let mut lines = BufReader::new(stdout).lines();
        let mut saw_result = false;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match AgentMessage::parse(trimmed) {
                        Ok(msg) => {
                            if matches!(msg, AgentMessage::Result { .. }) {
                                saw_result = true;
                            }
                            if tx.send(Ok(msg)).await.is_err() {
                                debug!("agent message consumer dropped, stopping reader");
                                let _ = child.kill().await;
                                return;
                            }
                        }
                        Err(e) => {
                            let snippet: String = trimmed.chars().take(200).collect();
                            warn!("failed to parse agent message: {e}, line: {snippet}");
                        }
                    }
                }
                Ok(None) => {
                    // stdout closed. A non-zero exit with no terminal result
                    // means the turn never completed; surface it in-stream.
                    match child.wait().await {
                        Ok(status) if !status.success() && !saw_result => {
                            let _ = tx.send(Err(AgentError::ProcessFailed { status })).await;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            let _ = tx.send(Err(AgentError::Io(e))).await;
                        }
                    }
                    return;
                }
                Err(e) => {
                    let _ = tx.send(Err(AgentError::Io(e))).await;
                    let _ = child.kill().await;
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl AgentQuery for CliAgent {
    async fn query(
        &self,
        prompt: &str,
        options: QueryOptions,
    ) -> Result<AgentMessageStream, AgentError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::build_args(&options));
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        if let Some(key) = &self.api_key {
            cmd.env("ANTHROPIC_API_KEY", key);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| AgentError::Spawn {
            binary: self.binary.clone(),
            source,
        })?;
        debug!(
            binary = %self.binary,
            pid = child.id().unwrap_or(0),
            "spawned agent process"
        );

        // The prompt goes over stdin. Transcripts routinely exceed what an
        // argv entry can carry.
        let mut stdin = child
            .stdin
            .take()
            .ok_or(AgentError::MissingPipe("stdin"))?;
        let prompt = prompt.to_string();
        tokio::spawn(async move {
            if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
                warn!("failed to write prompt to agent stdin: {e}");
                return;
            }
            if let Err(e) = stdin.shutdown().await {
                warn!("failed to close agent stdin: {e}");
            }
        });

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.trim().is_empty() {
                        debug!("agent stderr: {line}");
                    }
                }
            });
        }

        let stdout = child
            .stdout
            .take()
            .ok_or(AgentError::MissingPipe("stdout"))?;
        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_CAPACITY);
        tokio::spawn(Self::read_stream(child, stdout, tx));

        Ok(rx)
    }
}
