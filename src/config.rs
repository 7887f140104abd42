//! Process configuration.
//!
//! Values come from environment variables, optionally layered over a YAML
//! file named by `CONFIG`:
//!
//! ```yaml
//! mode: proxy
//! listen_addr: "0.0.0.0:8888"
//! target: "localhost:8000"
//! timeouts:
//!   dial_ms: 5000
//!   idle_ms: 30000
//!   total_ms: 120000
//!   read_request_ms: 30000
//!   drain_ms: 10000
//! ```
//!
//! `MODE`, `LISTEN` and `TARGET` override the file.

use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

pub const DEFAULT_TARGET: &str = "localhost:8000";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MODE must be 'server' or 'proxy'")]
    MissingMode,

    #[error("MODE must be 'server' or 'proxy', got '{0}'")]
    InvalidMode(String),

    #[error("invalid target '{0}': expected host:port or http://host[:port]")]
    InvalidTarget(String),

    #[error("unsupported target scheme '{0}': only plain http backends can be relayed")]
    UnsupportedScheme(String),

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Which role the process plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The "Hello from the server!" origin.
    Server,
    /// The hijacking relay.
    Proxy,
}

impl Mode {
    pub fn default_listen(&self) -> &'static str {
        match self {
            Mode::Server => "0.0.0.0:8000",
            Mode::Proxy => "0.0.0.0:8888",
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "server" => Ok(Mode::Server),
            "proxy" => Ok(Mode::Proxy),
            other => Err(ConfigError::InvalidMode(other.to_string())),
        }
    }
}

/// Deadlines applied to client and backend sockets, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connecting to the backend.
    pub dial_ms: u64,
    /// Longest gap between bytes while relaying in either direction.
    pub idle_ms: u64,
    /// Whole exchange after hijack: request and body write plus response copy.
    pub total_ms: u64,
    /// Waiting for a complete request head from the client.
    pub read_request_ms: u64,
    /// How long `stop` lets in-flight connections finish.
    pub drain_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            dial_ms: 5_000,
            idle_ms: 30_000,
            total_ms: 120_000,
            read_request_ms: 30_000,
            drain_ms: 10_000,
        }
    }
}

impl TimeoutConfig {
    pub fn dial(&self) -> Duration {
        Duration::from_millis(self.dial_ms)
    }

    pub fn idle(&self) -> Duration {
        Duration::from_millis(self.idle_ms)
    }

    pub fn total(&self) -> Duration {
        Duration::from_millis(self.total_ms)
    }

    pub fn read_request(&self) -> Duration {
        Duration::from_millis(self.read_request_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_millis(self.drain_ms)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    mode: Option<Mode>,
    listen_addr: Option<String>,
    target: Option<String>,
    timeouts: TimeoutConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub mode: Mode,
    pub listen_addr: String,
    /// Backend address as `host:port`.
    pub target: String,
    pub timeouts: TimeoutConfig,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup` instead of the real environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match lookup("CONFIG") {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|source| ConfigError::Read { path, source })?;
                serde_yaml::from_str(&raw)?
            }
            None => FileConfig::default(),
        };

        Self::resolve(file, lookup)
    }

    /// Parses a YAML document, ignoring the environment.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = serde_yaml::from_str(yaml)?;
        Self::resolve(file, |_| None)
    }

    fn resolve<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mode = match lookup("MODE") {
            Some(raw) => raw.parse()?,
            None => file.mode.ok_or(ConfigError::MissingMode)?,
        };

        let listen_addr = lookup("LISTEN")
            .or(file.listen_addr)
            .unwrap_or_else(|| mode.default_listen().to_string());

        let target = lookup("TARGET")
            .or(file.target)
            .unwrap_or_else(|| DEFAULT_TARGET.to_string());

        Ok(Self {
            mode,
            listen_addr,
            target: normalize_target(&target)?,
            timeouts: file.timeouts,
        })
    }
}

/// Reduces a target to the `host:port` form the forwarder dials.
pub fn normalize_target(raw: &str) -> Result<String, ConfigError> {
    let raw = raw.trim();

    if raw.contains("://") {
        let url = url::Url::parse(raw).map_err(|_| ConfigError::InvalidTarget(raw.to_string()))?;

        if url.scheme() != "http" {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| ConfigError::InvalidTarget(raw.to_string()))?;
        let port = url.port_or_known_default().unwrap_or(80);

        if !matches!(url.path(), "" | "/") {
            tracing::warn!(url = raw, "Ignoring path in target URL");
        }

        return Ok(format!("{host}:{port}"));
    }

    match raw.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(raw.to_string())
        }
        _ => Err(ConfigError::InvalidTarget(raw.to_string())),
    }
}
