//! Application configuration.
//!
//! A single [`AppConfig`] is built once at startup from defaults, an optional
//! TOML file, and the environment, then injected into the server and the
//! upstream clients. Nothing reads the process environment after load.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "callscope";

/// Value shipped in example configs; treated the same as an empty key.
pub const API_KEY_PLACEHOLDER: &str = "your-anthropic-api-key";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server configuration.
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    /// Agent subprocess configuration.
    pub agent: AgentConfig,
    /// Gong API access configuration.
    pub gong: GongConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (default: 127.0.0.1).
    pub host: String,
    /// Bind port (default: 8080).
    pub port: u16,
    /// Allowed CORS origins. Empty means the permissive localhost
    /// development defaults.
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,
    /// Emit JSON log lines instead of human-readable text.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Configuration for the agent CLI subprocess.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent CLI binary, on PATH or an absolute path. `~` is expanded.
    pub binary: String,
    /// API key passed to the agent process. Empty or the placeholder value
    /// counts as unconfigured.
    pub api_key: String,
    /// Model used for research queries when the request does not name one.
    pub research_model: String,
    /// Working directory for the agent process. Empty means the server's
    /// own working directory.
    pub cwd: String,
    /// Serve scripted agent output instead of spawning a subprocess.
    pub dev_mode: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            binary: "claude".to_string(),
            api_key: String::new(),
            research_model: "claude-sonnet-4-5-20250929".to_string(),
            cwd: String::new(),
            dev_mode: false,
        }
    }
}

impl AgentConfig {
    /// The API key, when one is actually configured.
    pub fn configured_api_key(&self) -> Option<&str> {
        if self.api_key.is_empty() || self.api_key == API_KEY_PLACEHOLDER {
            None
        } else {
            Some(&self.api_key)
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured_api_key().is_some()
    }

    /// Working directory override for the agent process, if set.
    pub fn working_dir(&self) -> Option<PathBuf> {
        if self.cwd.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.cwd))
        }
    }
}

/// Gong API access configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GongConfig {
    /// Gong REST API base URL.
    pub base_url: String,
    pub access_key: String,
    pub access_key_secret: String,
}

impl Default for GongConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.gong.io/v2".to_string(),
            access_key: String::new(),
            access_key_secret: String::new(),
        }
    }
}

impl GongConfig {
    /// Both credential halves, when both are present.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        if self.access_key.is_empty() || self.access_key_secret.is_empty() {
            None
        } else {
            Some((&self.access_key, &self.access_key_secret))
        }
    }
}

/// Load configuration from `path` (or the default location), the
/// environment, and built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let config_file = match path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    let env_prefix = env_prefix();
    let built = Config::builder()
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 8080_i64)?
        .set_default("logging.level", "info")?
        .add_source(
            File::from(config_file.as_path())
                .format(FileFormat::Toml)
                .required(false),
        )
        .add_source(Environment::with_prefix(env_prefix.as_str()).separator("__"))
        .build()?;

    let mut config: AppConfig = built.try_deserialize()?;

    apply_env_overrides(&mut config);

    if !config.agent.binary.is_empty() {
        let expanded = expand_str_path(&config.agent.binary)?;
        config.agent.binary = expanded.display().to_string();
    }
    if !config.agent.cwd.is_empty() {
        let expanded = expand_str_path(&config.agent.cwd)?;
        config.agent.cwd = expanded.display().to_string();
    }

    Ok(config)
}

/// Variables carried over from the original deployment. They outrank both
/// the config file and the prefixed environment source.
fn apply_env_overrides(config: &mut AppConfig) {
    if let Some(key) = non_empty_var("ANTHROPIC_API_KEY") {
        config.agent.api_key = key;
    }
    if let Some(key) = non_empty_var("GONG_ACCESS_KEY").or_else(|| non_empty_var("GONG_API_KEY")) {
        config.gong.access_key = key;
    }
    if let Some(secret) = non_empty_var("GONG_ACCESS_KEY_SECRET") {
        config.gong.access_key_secret = secret;
    }
    if let Some(url) = non_empty_var("GONG_API_BASE_URL") {
        config.gong.base_url = url;
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {parent:?}"))?;
    }

    let config = AppConfig::default();
    let toml = toml::to_string_pretty(&config).context("serializing default config to TOML")?;
    let mut body = default_config_header(path);
    body.push_str(&toml);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> String {
    let mut buffer = String::new();
    buffer.push_str("# Configuration for ");
    buffer.push_str(APP_NAME);
    buffer.push('\n');
    buffer.push_str("# File: ");
    buffer.push_str(&path.display().to_string());
    buffer.push('\n');
    buffer.push('\n');
    buffer
}

/// Effective configuration with secrets blanked, for display.
pub fn redacted(config: &AppConfig) -> AppConfig {
    let mut shown = config.clone();
    if !shown.agent.api_key.is_empty() {
        shown.agent.api_key = "[redacted]".to_string();
    }
    if !shown.gong.access_key.is_empty() {
        shown.gong.access_key = "[redacted]".to_string();
    }
    if !shown.gong.access_key_secret.is_empty() {
        shown.gong.access_key_secret = "[redacted]".to_string();
    }
    shown
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(default_config_dir()?.join("config.toml"))
}

fn default_config_dir() -> Result<PathBuf> {
    if let Some(dir) = env::var_os("XDG_CONFIG_HOME").filter(|v| !v.is_empty()) {
        let mut path = PathBuf::from(dir);
        path.push(APP_NAME);
        return Ok(path);
    }

    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_NAME);
        return Ok(dir);
    }

    dirs::home_dir()
        .map(|home| home.join(".config").join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}

fn env_prefix() -> String {
    APP_NAME
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
