//! Agent Gate configuration management

use crate::agent::AgentOptions;
use crate::error::{Error, Result};
use crate::session::StaticTokenIdentity;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Main Agent Gate configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentGateConfig {
    /// Agent list storage
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session defaults
    #[serde(default)]
    pub session: SessionConfig,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Credentials used for session calls
    #[serde(default)]
    pub auth: IdentityConfig,
}

impl AgentGateConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Collaborators for every agent the host builds
    pub fn agent_options(&self) -> Result<AgentOptions> {
        let options = AgentOptions::default().with_http(self.http.build_client()?);
        Ok(match &self.auth.access_token_env {
            Some(var) => {
                options.with_identity(Arc::new(StaticTokenIdentity::from_env(var)))
            }
            None => options,
        })
    }
}

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file holding the agent list
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: dirs_next::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".agent-gate")
                .join("storage.json"),
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Locales sent when creating a session
    pub locales: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            locales: vec!["en".to_string()],
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Connect timeout in seconds (None = no timeout)
    pub connect_timeout_secs: Option<u64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("agent-gate/{}", env!("CARGO_PKG_VERSION")),
            connect_timeout_secs: None,
        }
    }
}

impl HttpConfig {
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(&self.user_agent);
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        Ok(builder.build()?)
    }
}

/// Identity configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Environment variable holding a bearer token (None = anonymous calls)
    pub access_token_env: Option<String>,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            access_token_env: Some("AGENT_GATE_TOKEN".to_string()),
        }
    }
}
