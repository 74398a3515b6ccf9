use std::env;
use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use tokio::net::TcpListener;
use tracing::{info, warn};

use callscope::api::{AppState, create_router};
use callscope::config::{self, APP_NAME, AppConfig};

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_serve(config: AppConfig, cmd: ServeCommand) -> Result<()> {
    handle_serve(config, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load_config(cli.common.config.as_deref())?;
    init_logging(&cli.common, &config);

    match cli.command {
        Command::Serve(cmd) => async_serve(config, cmd),
        Command::Config { command } => handle_config(&cli.common, &config, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Callscope - sales call analysis server.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", env = "CALLSCOPE_CONFIG", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -v)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Emit JSON log lines
    #[arg(long = "log-json", global = true)]
    log_json: bool,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeCommand),
    /// Inspect and manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct ServeCommand {
    /// Host address to bind to (overrides config)
    #[arg(long)]
    host: Option<String>,
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Write the default configuration file
    Init {
        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
    /// Output the effective configuration with secrets redacted
    Show,
    /// Print the resolved config file path
    Path,
}

fn init_logging(common: &CommonOpts, config: &AppConfig) {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    if common.quiet {
        log::set_max_level(log::LevelFilter::Off);
        return;
    }

    let level = effective_log_level(common, config);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("callscope={level},tower_http={level}")));

    if common.log_json || config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .ok();
    } else {
        let disable_color = env::var_os("NO_COLOR").is_some() || !io::stderr().is_terminal();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_ansi(!disable_color))
            .try_init()
            .ok();
    }

    // Compatibility with log-crate users in dependencies.
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    builder.filter_level(level.parse().unwrap_or(log::LevelFilter::Info));
    builder.try_init().ok();
}

fn effective_log_level(common: &CommonOpts, config: &AppConfig) -> String {
    if common.trace {
        "trace".to_string()
    } else if common.debug {
        "debug".to_string()
    } else {
        match common.verbose {
            0 => config.logging.level.clone(),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    }
}

async fn handle_serve(mut config: AppConfig, cmd: ServeCommand) -> Result<()> {
    if let Some(host) = cmd.host {
        config.server.host = host;
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }

    if config.agent.dev_mode {
        info!("dev mode enabled, serving scripted agent output");
    } else if !config.agent.is_configured() {
        warn!("agent API key is not configured; analysis endpoints will refuse requests");
    }
    if config.gong.credentials().is_none() {
        warn!("Gong credentials are not configured; call-data endpoints will refuse requests");
    }

    let state = AppState::from_config(&config);
    let app = create_router(state, &config.server.cors_origins);

    let addr: SocketAddr = config
        .server
        .bind_addr()
        .parse()
        .context("invalid address")?;

    info!("Listening on http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .context("binding to address")?;

    let shutdown_signal = async {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }

        info!("Shutdown signal received");
    };

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal)
    .await
    .context("running server")?;

    Ok(())
}

fn handle_config(common: &CommonOpts, config: &AppConfig, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Init { force } => {
            let path = resolve_config_path(common)?;
            if path.exists() && !force {
                return Err(anyhow!(
                    "config file already exists at {}; pass --force to overwrite",
                    path.display()
                ));
            }
            config::write_default_config(&path)?;
            println!("Wrote default config to {}", path.display());
            Ok(())
        }
        ConfigCommand::Show => {
            let shown = config::redacted(config);
            let body = toml::to_string_pretty(&shown).context("serializing configuration")?;
            print!("{body}");
            Ok(())
        }
        ConfigCommand::Path => {
            let path = resolve_config_path(common)?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

fn resolve_config_path(common: &CommonOpts) -> Result<PathBuf> {
    match &common.config {
        Some(path) => Ok(path.clone()),
        None => config::default_config_path(),
    }
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}
