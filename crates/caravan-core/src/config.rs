//! Layered runtime configuration
//!
//! Values come from `config/default.toml` overlaid with `CARAVAN_`-prefixed
//! environment variables (`CARAVAN_SERVER__PORT=9000` sets `server.port`).

use crate::error::{Error, Result};
use serde::Deserialize;

/// MCP server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Port the SSE server binds to
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8900
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Agent defaults
#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    /// Model override for all agents
    #[serde(default)]
    pub model: Option<String>,
    /// Tool-round limit
    #[serde(default = "default_max_rounds")]
    pub max_rounds: usize,
    /// Directory holding declarative agent specs
    #[serde(default = "default_specs_dir")]
    pub specs_dir: String,
}

fn default_max_rounds() -> usize {
    8
}

fn default_specs_dir() -> String {
    "config/agents".to_string()
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            model: None,
            max_rounds: default_max_rounds(),
            specs_dir: default_specs_dir(),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,
    /// Agent settings
    #[serde(default)]
    pub agent: AgentSettings,
}

impl Settings {
    /// Load from `config/default.toml` plus `CARAVAN_` environment overrides
    pub fn load() -> Result<Self> {
        Self::load_from("config/default")
    }

    /// Load from a specific base file (extension inferred)
    pub fn load_from(path: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("CARAVAN").separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::Config(e.to_string()))
    }
}
