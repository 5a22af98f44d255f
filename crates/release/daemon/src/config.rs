//! Configuration for the release daemon

use release_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Release engine configuration
    #[serde(default)]
    pub engine: EngineSection,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Seed data for the in-memory collaborators
    #[serde(default)]
    pub fixtures: FixturesConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    pub listen_addr: SocketAddr,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub enable_cors: bool,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            enable_cors: true,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Engine configuration plus daemon-side switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    #[serde(flatten)]
    pub engine: EngineConfig,

    /// Run the document worker and render documents after finalize
    #[serde(default = "default_true")]
    pub generate_documents: bool,

    /// Capacity of the document queue
    #[serde(default = "default_document_queue")]
    pub document_queue_capacity: usize,

    /// Seconds between sweeps for released releases missing documents
    #[serde(default = "default_document_sweep")]
    pub document_sweep_interval_secs: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            generate_documents: true,
            document_queue_capacity: default_document_queue(),
            document_sweep_interval_secs: default_document_sweep(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Where seed data comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixturesConfig {
    /// JSON fixtures file; the built-in demo data is used when absent
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Load the built-in demo data when no file is given
    #[serde(default = "default_true")]
    pub demo: bool,
}

impl Default for FixturesConfig {
    fn default() -> Self {
        Self {
            path: None,
            demo: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout() -> u64 {
    30
}

fn default_document_queue() -> usize {
    64
}

fn default_document_sweep() -> u64 {
    60
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `RELEASE_`-prefixed environment variables (`RELEASE_SERVER__LISTEN_ADDR`)
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("RELEASE")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
