//! Configuration management for RAX File Manager
//!
//! Values come from an optional `config.toml` with environment overrides
//! (`RAX_FM_SERVER_ROOT`, `RAX_FM_PORT`, ...). Everything is read once at
//! startup; changing a value requires a restart.

use config::{Config, Environment, File};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::transfer::DEFAULT_CHUNK_SIZE;

/// Complete server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    // ═══ NETWORK ═══
    /// IP address to bind the HTTP listener
    pub bind_address: String,

    /// Port for the HTTP listener
    pub port: u16,

    // ═══ STORAGE ═══
    /// Root directory every operation is confined to
    pub server_root: String,

    /// Where uploads are spooled before placement; system temp dir when unset
    pub staging_dir: Option<String>,

    // ═══ TRANSFER ═══
    /// Maximum size of a single uploaded file in MB
    pub max_file_size_mb: u64,

    /// Read size for streamed downloads
    pub stream_chunk_size: usize,

    // ═══ PRESENTATION ═══
    /// Name of the first breadcrumb
    pub root_label: String,

    /// Send `Access-Control-Allow-Origin: *`
    pub allow_any_origin: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            server_root: "./files".to_string(),
            staging_dir: None,
            max_file_size_mb: 100,
            stream_chunk_size: DEFAULT_CHUNK_SIZE,
            root_label: "Root".to_string(),
            allow_any_origin: true,
        }
    }
}

impl ServerConfig {
    /// Load configuration from config.toml with environment overrides
    pub fn load() -> Result<Self, config::ConfigError> {
        // Try production path first, then development path
        let config_paths = [
            "rax-file-manager/config", // Docker production: /app/rax-file-manager/config.toml
            "config",                  // Local development: ./config.toml
        ];

        let mut builder = Config::builder();
        for config_path in config_paths {
            builder = builder.add_source(File::with_name(config_path).required(false));
        }

        let config: ServerConfig = builder
            .add_source(Environment::with_prefix("RAX_FM").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validation for all configuration values
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.port == 0 {
            return Err(config::ConfigError::Message("port cannot be 0".into()));
        }

        if self.server_root.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "server_root cannot be empty".into(),
            ));
        }

        if self.max_file_size_mb == 0 {
            return Err(config::ConfigError::Message(
                "max_file_size_mb must be greater than 0".into(),
            ));
        }

        if self.stream_chunk_size == 0 {
            return Err(config::ConfigError::Message(
                "stream_chunk_size must be greater than 0".into(),
            ));
        }

        self.socket_addr()?;
        Ok(())
    }

    /// Bind address and port as a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, config::ConfigError> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .map_err(|e| config::ConfigError::Message(format!("invalid bind address: {e}")))
    }

    /// Get server root as PathBuf
    pub fn server_root_path(&self) -> PathBuf {
        PathBuf::from(&self.server_root)
    }

    /// Directory uploads are spooled into
    pub fn staging_path(&self) -> PathBuf {
        self.staging_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Get maximum file size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}
