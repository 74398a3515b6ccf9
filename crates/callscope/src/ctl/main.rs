//! callscopectl - Terminal client for the Callscope server
//!
//! Browses Gong users and calls through the server's proxy endpoints and
//! consumes the analysis/research streams the way the browser does: text
//! deltas print as they arrive, tool activity goes to stderr.

use std::io::{self, Read as _, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use futures::StreamExt;

use callscope::gong::{CallsResponse, TranscriptResponse, UsersResponse};
use callscope::relay::{
    DisplayBuffer, FrameDecoder, ReaderEvent, WireEvent, REQUEST_FAILED_APOLOGY,
};

const DEFAULT_SERVER_URL: &str = "http://localhost:8080";

fn main() -> ExitCode {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "Error: {err:?}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

#[tokio::main]
async fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let client = CallscopeClient::new(&cli.server);

    match cli.command {
        Command::Status => handle_status(&client, cli.json).await,
        Command::Users => handle_users(&client, cli.json).await,
        Command::Calls { user_id, limit } => handle_calls(&client, &user_id, limit, cli.json).await,
        Command::Transcript { call_id } => handle_transcript(&client, &call_id, cli.json).await,
        Command::Analyze { call_id, file } => handle_analyze(&client, call_id, file).await,
        Command::Research { question, model } => handle_research(&client, &question, model).await,
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "callscopectl",
    author,
    version,
    about = "Terminal client for the Callscope server - browse calls and stream analyses."
)]
struct Cli {
    /// Callscope server URL
    #[arg(long, short = 's', default_value = DEFAULT_SERVER_URL, env = "CALLSCOPE_SERVER_URL")]
    server: String,

    /// Output machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Check server status
    Status,

    /// List active Gong users
    Users,

    /// List recent calls for a user
    Calls {
        /// Gong user ID
        user_id: String,
        /// Maximum number of calls to request
        #[arg(long)]
        limit: Option<u32>,
    },

    /// Print the formatted transcript of a call
    Transcript {
        /// Gong call ID
        call_id: String,
    },

    /// Stream an analysis of a call transcript
    Analyze {
        /// Gong call ID, or "-" to read a transcript from stdin
        call_id: Option<String>,
        /// Read the transcript from a file instead of Gong
        #[arg(long, value_name = "PATH", conflicts_with = "call_id")]
        file: Option<PathBuf>,
    },

    /// Ask the competitive research assistant a question
    Research {
        /// The question to ask
        question: String,
        /// Model override for this query
        #[arg(long)]
        model: Option<String>,
    },
}

/// HTTP client for the Callscope server.
struct CallscopeClient {
    base_url: String,
    client: reqwest::Client,
}

impl CallscopeClient {
    fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .get(&url)
            .send()
            .await
            .context("sending request to server")
    }

    async fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .post(&url)
            .header("Accept", "text/event-stream")
            .json(body)
            .send()
            .await
            .context("sending request to server")
    }
}

async fn handle_status(client: &CallscopeClient, json: bool) -> Result<()> {
    let response = client.get("/api/health").await?;

    if response.status().is_success() {
        if json {
            println!("{}", response.text().await?);
        } else {
            println!("Server is running at {}", client.base_url);
        }
    } else if json {
        println!(
            r#"{{"status": "error", "code": {}}}"#,
            response.status().as_u16()
        );
    } else {
        println!("Server returned error: {}", response.status());
    }
    Ok(())
}

async fn handle_users(client: &CallscopeClient, json: bool) -> Result<()> {
    let response = client.get("/api/gong/users").await?;
    if !response.status().is_success() {
        let body = response.text().await?;
        bail!("Failed to list users: {body}");
    }

    let body = response.text().await?;
    if json {
        println!("{body}");
        return Ok(());
    }

    let users: UsersResponse = serde_json::from_str(&body).context("parsing users response")?;
    println!("{:<20} {:<28} {:<32}", "ID", "NAME", "EMAIL");
    println!("{}", "-".repeat(80));
    for user in users.users {
        println!("{:<20} {:<28} {:<32}", user.id, user.name, user.email);
    }
    Ok(())
}

async fn handle_calls(
    client: &CallscopeClient,
    user_id: &str,
    limit: Option<u32>,
    json: bool,
) -> Result<()> {
    let mut path = format!("/api/gong/calls?userId={user_id}");
    if let Some(limit) = limit {
        path.push_str(&format!("&limit={limit}"));
    }

    let response = client.get(&path).await?;
    if !response.status().is_success() {
        let body = response.text().await?;
        bail!("Failed to list calls: {body}");
    }

    let body = response.text().await?;
    if json {
        println!("{body}");
        return Ok(());
    }

    let calls: CallsResponse = serde_json::from_str(&body).context("parsing calls response")?;
    println!("{:<20} {:<12} {:>5}  {}", "ID", "DATE", "MINS", "TITLE");
    println!("{}", "-".repeat(72));
    let shown = calls.calls.len();
    for call in calls.calls {
        println!(
            "{:<20} {:<12} {:>5}  {}",
            call.id,
            call.date,
            call.duration / 60,
            call.title,
        );
    }
    println!("{shown} of {} call(s)", calls.total);
    Ok(())
}

async fn handle_transcript(client: &CallscopeClient, call_id: &str, json: bool) -> Result<()> {
    let response = client
        .get(&format!("/api/gong/transcript?callId={call_id}"))
        .await?;
    if !response.status().is_success() {
        let body = response.text().await?;
        bail!("Failed to fetch transcript: {body}");
    }

    if json {
        println!("{}", response.text().await?);
        return Ok(());
    }

    let transcript: TranscriptResponse = response
        .json()
        .await
        .context("parsing transcript response")?;
    println!("{}", transcript.transcript);
    Ok(())
}

async fn handle_analyze(
    client: &CallscopeClient,
    call_id: Option<String>,
    file: Option<PathBuf>,
) -> Result<()> {
    let transcript = read_transcript_source(client, call_id, file).await?;
    let body = serde_json::json!({ "transcript": transcript });
    stream_answer(client, "/api/analyze", &body).await
}

async fn handle_research(
    client: &CallscopeClient,
    question: &str,
    model: Option<String>,
) -> Result<()> {
    let mut body = serde_json::json!({
        "messages": [{ "role": "user", "content": question }]
    });
    if let Some(model) = model {
        body["model"] = serde_json::Value::String(model);
    }
    stream_answer(client, "/api/research", &body).await
}

/// Resolve the transcript for `analyze`: a file, stdin (`-`), or the
/// server's Gong proxy.
async fn read_transcript_source(
    client: &CallscopeClient,
    call_id: Option<String>,
    file: Option<PathBuf>,
) -> Result<String> {
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .with_context(|| format!("reading transcript from {}", path.display()));
    }

    match call_id.as_deref() {
        Some("-") => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("reading transcript from stdin")?;
            Ok(text)
        }
        Some(id) => {
            let response = client
                .get(&format!("/api/gong/transcript?callId={id}"))
                .await?;
            if !response.status().is_success() {
                let body = response.text().await?;
                bail!("Failed to fetch transcript: {body}");
            }
            let transcript: TranscriptResponse = response
                .json()
                .await
                .context("parsing transcript response")?;
            Ok(transcript.transcript)
        }
        None => bail!("provide a call ID, --file <path>, or '-' to read stdin"),
    }
}

/// POST a streaming request and render the answer: deltas print as they
/// arrive, tool activity goes to stderr, and the final output is the
/// display buffer's terminal state.
async fn stream_answer(
    client: &CallscopeClient,
    path: &str,
    body: &serde_json::Value,
) -> Result<()> {
    let response = match client.post_json(path, body).await {
        Ok(response) if response.status().is_success() => response,
        Ok(response) => {
            let detail = response.text().await.unwrap_or_default();
            let _ = writeln!(io::stderr(), "request failed: {detail}");
            println!("{REQUEST_FAILED_APOLOGY}");
            return Ok(());
        }
        Err(err) => {
            let _ = writeln!(io::stderr(), "request failed: {err:#}");
            println!("{REQUEST_FAILED_APOLOGY}");
            return Ok(());
        }
    };

    let mut decoder = FrameDecoder::new();
    let mut buffer = DisplayBuffer::new();
    let mut saw_error = false;
    let mut printed_any = false;
    let mut stdout = io::stdout();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("reading response stream")?;
        for event in decoder.feed(&chunk) {
            let ReaderEvent::Event(event) = event else {
                // [DONE]; the body ends right after.
                continue;
            };
            match &event {
                WireEvent::TextDelta { text } => {
                    print!("{text}");
                    stdout.flush().ok();
                    printed_any = true;
                }
                WireEvent::ToolStart { tool } => {
                    let _ = writeln!(io::stderr(), "[tool] {tool}");
                }
                WireEvent::ToolProgress { tool, elapsed } => {
                    let _ = writeln!(io::stderr(), "[tool] {tool} running ({elapsed:.0}s)");
                }
                WireEvent::Error { message } => {
                    let _ = writeln!(io::stderr(), "stream error: {message}");
                    saw_error = true;
                }
                WireEvent::Done => {}
            }
            buffer.apply(&event);
        }
    }

    if saw_error {
        // The buffer replaced the partial answer with the apology.
        if printed_any {
            println!();
        }
        println!("{}", buffer.text());
    } else {
        println!();
    }
    Ok(())
}
