//! Client configuration: defaults, then config file, then environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use gntp_core::{IconMode, DEFAULT_PORT};
use serde::Deserialize;

/// Connection and presentation settings. Built once, never mutated by the client.
/// File: ~/.config/gntp/config.toml or /etc/gntp/config.toml.
/// Env overrides: GNTP_HOST, GNTP_PORT, GNTP_APP_NAME, GNTP_ICON_MODE, GNTP_TIMEOUT_SECS, GNTP_DEBUG.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Daemon host (default localhost).
    #[serde(default = "default_host")]
    pub host: String,
    /// Daemon port (default 23053).
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_application_name")]
    pub application_name: String,
    #[serde(default)]
    pub icon_mode: IconMode,
    /// Connect and exchange deadline in seconds (default 10).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Log full packets and responses.
    #[serde(default)]
    pub debug: bool,
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_application_name() -> String {
    "gntp-send".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            application_name: default_application_name(),
            icon_mode: IconMode::default(),
            timeout_secs: default_timeout_secs(),
            debug: false,
        }
    }
}

impl ClientConfig {
    pub fn new(application_name: impl Into<String>) -> Self {
        Self {
            application_name: application_name.into(),
            ..Self::default()
        }
    }

    /// Parse an options table. Unknown keys are rejected.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// `host:port` of the daemon.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Apply environment overrides through `var`. Unparsable values are ignored.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(h) = var("GNTP_HOST").filter(|h| !h.is_empty()) {
            self.host = h;
        }
        if let Some(p) = var("GNTP_PORT").and_then(|s| s.parse::<u16>().ok()) {
            self.port = p;
        }
        if let Some(n) = var("GNTP_APP_NAME").filter(|n| !n.is_empty()) {
            self.application_name = n;
        }
        if let Some(m) = var("GNTP_ICON_MODE").and_then(|s| s.parse::<IconMode>().ok()) {
            self.icon_mode = m;
        }
        if let Some(t) = var("GNTP_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
            self.timeout_secs = t;
        }
        if let Some(d) = var("GNTP_DEBUG").and_then(|s| parse_flag(&s)) {
            self.debug = d;
        }
    }
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> ClientConfig {
    let mut c = load_file().unwrap_or_default();
    c.apply_env(|k| std::env::var(k).ok());
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/gntp/config.toml"));
    }
    out.push(PathBuf::from("/etc/gntp/config.toml"));
    out
}

fn load_file() -> Option<ClientConfig> {
    let path = config_paths().into_iter().find(|p| p.exists())?;
    match ClientConfig::from_file(&path) {
        Ok(c) => Some(c),
        Err(e) => {
            log::warn!("ignoring config file: {}", e);
            None
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
