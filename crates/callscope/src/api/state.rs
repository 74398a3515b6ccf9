//! Application state shared across handlers.

use std::sync::Arc;

use crate::agent::{AgentQuery, CliAgent, ScriptedAgent};
use crate::config::{AgentConfig, AppConfig};
use crate::gong::GongClient;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Agent backing the streaming endpoints.
    pub agent: Arc<dyn AgentQuery>,
    /// Gong API client.
    pub gong: Arc<GongClient>,
    /// Agent configuration, for the credential gate and model defaults.
    pub agent_config: AgentConfig,
}

impl AppState {
    /// Create application state with an explicit agent implementation.
    pub fn new(agent: Arc<dyn AgentQuery>, gong: GongClient, agent_config: AgentConfig) -> Self {
        Self {
            agent,
            gong: Arc::new(gong),
            agent_config,
        }
    }

    /// Create application state from configuration.
    ///
    /// Dev mode swaps the CLI subprocess for scripted output so the whole
    /// stack runs without credentials.
    pub fn from_config(config: &AppConfig) -> Self {
        let agent: Arc<dyn AgentQuery> = if config.agent.dev_mode {
            Arc::new(ScriptedAgent::canned_analysis())
        } else {
            Arc::new(CliAgent::new(&config.agent))
        };
        Self::new(agent, GongClient::new(&config.gong), config.agent.clone())
    }

    /// Whether the streaming endpoints can serve a query.
    pub fn agent_available(&self) -> bool {
        self.agent_config.dev_mode || self.agent_config.is_configured()
    }
}
