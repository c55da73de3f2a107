//! Server configuration: CLI args merged over an optional TOML file.

use std::path::PathBuf;

/// Errors that can occur when loading server configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

/// TOML config file structure (all fields optional).
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    bind_addr: Option<String>,
    log_level: Option<String>,
    rooms: Option<Vec<String>>,
}

/// Fully resolved server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to listen on.
    pub bind_addr: String,
    /// Log level filter.
    pub log_level: String,
    /// Rooms to create at startup.
    pub rooms: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            log_level: "info".to_string(),
            rooms: vec!["general".to_string(), "random".to_string()],
        }
    }
}

impl ServerConfig {
    /// Load configuration: CLI > file > defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an explicitly given config file cannot be
    /// read or parsed.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
                        path: path.clone(),
                        source: e,
                    })?;
                toml::from_str(&contents)?
            }
            None => ConfigFile::default(),
        };

        let defaults = Self::default();
        Ok(Self {
            bind_addr: cli
                .bind
                .clone()
                .or(file.bind_addr)
                .unwrap_or(defaults.bind_addr),
            log_level: cli
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or(defaults.log_level),
            rooms: file.rooms.unwrap_or(defaults.rooms),
        })
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "RoomChat development server")]
pub struct ServerCliArgs {
    /// Address to listen on.
    #[arg(long, env = "ROOMCHAT_BIND")]
    pub bind: Option<String>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, env = "ROOMCHAT_SERVER_LOG")]
    pub log_level: Option<String>,

    /// Path to config file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
