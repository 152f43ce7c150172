//! Relay configuration: TOML file, then CLI overrides, then validation.

use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ConfigError;

/// Listener and transport settings. The coordinator itself has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address to bind.
    pub bind: String,
    /// Port to listen on.
    pub port: u16,
    /// Origins allowed to open a WebSocket. `"*"` allows any.
    pub allowed_origins: Vec<String>,
    /// Per-connection outbound queue length.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 5000,
            allowed_origins: vec!["*".into()],
            channel_capacity: 256,
        }
    }
}

impl RelayConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| ConfigError::ValidationError(format!("bind address: {e}")))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Whether a handshake carrying `origin` may proceed.
    ///
    /// Requests without an `Origin` header (non-browser clients) always pass.
    pub fn allows_origin(&self, origin: Option<&str>) -> bool {
        let Some(origin) = origin else {
            return true;
        };
        self.allowed_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed.eq_ignore_ascii_case(origin))
    }
}

/// Load config from a TOML file. Missing fields take their defaults.
pub fn load_from_path(path: &Path) -> Result<RelayConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: RelayConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Check every field, collecting all problems into one error.
pub fn validate(config: &RelayConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    if config.port == 0 {
        errors.push("port must be non-zero".into());
    }
    if !(1..=65536).contains(&config.channel_capacity) {
        errors.push(format!(
            "channel_capacity must be between 1 and 65536, got {}",
            config.channel_capacity
        ));
    }
    if config.allowed_origins.is_empty() {
        errors.push("allowed_origins must not be empty".into());
    }
    if let Err(e) = config.socket_addr() {
        errors.push(e.to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}
