//! Service configuration
//!
//! Loaded from an optional YAML file, then overridden by environment
//! variables:
//!
//! | Variable             | Field                 |
//! |----------------------|-----------------------|
//! | `NOTEGRAPH_HOST`     | `server.host`         |
//! | `NOTEGRAPH_PORT`     | `server.port`         |
//! | `NOTEGRAPH_DATA_DIR` | `storage.data_dir`    |
//! | `ASSEMBLY_AI_KEY`    | `assemblyai.api_key`  |
//! | `OPENAI_API_KEY`     | `openai.api_key`      |
//! | `OPENAI_MODEL`       | `openai.model`        |

use crate::collaborators::{ASSEMBLYAI_BASE_URL, OPENAI_BASE_URL, OPENAI_MODEL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },

    #[error("Missing API key for {service} (set {var})")]
    MissingApiKey {
        service: &'static str,
        var: &'static str,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub assemblyai: AssemblyAiConfig,
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted audio upload, in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_bytes: 10 << 20,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// File locations. Relative paths resolve against `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub graph_file: PathBuf,
    pub database_file: PathBuf,
    pub recordings_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            graph_file: PathBuf::from("knowledge_graph.txt"),
            database_file: PathBuf::from("notegraph.db"),
            recordings_dir: PathBuf::from("recordings"),
        }
    }
}

impl StorageConfig {
    pub fn graph_path(&self) -> PathBuf {
        self.data_dir.join(&self.graph_file)
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    pub fn recordings_path(&self) -> PathBuf {
        self.data_dir.join(&self.recordings_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyAiConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

impl Default for AssemblyAiConfig {
    fn default() -> Self {
        Self {
            base_url: ASSEMBLYAI_BASE_URL.to_string(),
            api_key: None,
            poll_interval_ms: 3000,
            max_polls: 200,
        }
    }
}

impl AssemblyAiConfig {
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        require_key(self.api_key.as_deref(), "assemblyai", "ASSEMBLY_AI_KEY")
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.to_string(),
            api_key: None,
            model: OPENAI_MODEL.to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        require_key(self.api_key.as_deref(), "openai", "OPENAI_API_KEY")
    }
}

impl Config {
    /// Load from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_overrides(|var| std::env::var(var).ok())
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Apply overrides from `lookup` (normally the environment).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(host) = get("NOTEGRAPH_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("NOTEGRAPH_PORT") {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                var: "NOTEGRAPH_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(dir) = get("NOTEGRAPH_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(key) = get("ASSEMBLY_AI_KEY") {
            self.assemblyai.api_key = Some(key);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai.api_key = Some(key);
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.openai.model = model;
        }
        Ok(self)
    }
}

fn require_key<'a>(
    key: Option<&'a str>,
    service: &'static str,
    var: &'static str,
) -> Result<&'a str, ConfigError> {
    key.filter(|k| !k.trim().is_empty())
        .ok_or(ConfigError::MissingApiKey { service, var })
}

/// Default data directory (~/.local/share/notegraph)
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_default().join(".local/share"))
        .join("notegraph")
}
