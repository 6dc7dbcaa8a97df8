use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

use super::errors::ConfigError;

/// Default upper bound on an encoded event.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 128 * 1024;

/// Where the dnstap collector listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DnstapTarget {
    Unix(PathBuf),
    Tcp(SocketAddr),
}

impl fmt::Display for DnstapTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DnstapTarget::Unix(path) => write!(f, "unix:{}", path.display()),
            DnstapTarget::Tcp(addr) => write!(f, "tcp:{}", addr),
        }
    }
}

/// dnstap logging configuration (`[dnstap]` section)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct DnstapConfig {
    /// Master switch. When false, applying this section changes nothing.
    #[serde(default)]
    pub enabled: bool,

    /// Path of the collector's Unix socket
    #[serde(default)]
    pub socket_path: Option<String>,

    /// TCP address of the collector (e.g. "127.0.0.1:6000").
    /// Takes precedence over `socket_path`.
    #[serde(default)]
    pub ip: Option<String>,

    /// Use the Frame Streams READY/ACCEPT handshake
    #[serde(default = "default_true")]
    pub bidirectional: bool,

    #[serde(default)]
    pub send_identity: bool,

    #[serde(default)]
    pub send_version: bool,

    /// Identity override. Empty or absent: the local host name.
    #[serde(default)]
    pub identity: Option<String>,

    /// Version override. Empty or absent: this package's name and version.
    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub log_resolver_query_messages: bool,

    #[serde(default)]
    pub log_resolver_response_messages: bool,

    #[serde(default)]
    pub log_client_query_messages: bool,

    #[serde(default)]
    pub log_client_response_messages: bool,

    #[serde(default)]
    pub log_forwarder_query_messages: bool,

    #[serde(default)]
    pub log_forwarder_response_messages: bool,

    /// Frames buffered per worker queue before submissions are rejected
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Seconds to wait before reopening a failed collector connection
    #[serde(default = "default_reopen_interval_secs")]
    pub reopen_interval_secs: u64,

    /// Upper bound on how long written frames may sit unflushed
    #[serde(default = "default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,

    /// Largest encoded event accepted for delivery, in bytes
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,
}

impl Default for DnstapConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            socket_path: None,
            ip: None,
            bidirectional: default_true(),
            send_identity: false,
            send_version: false,
            identity: None,
            version: None,
            log_resolver_query_messages: false,
            log_resolver_response_messages: false,
            log_client_query_messages: false,
            log_client_response_messages: false,
            log_forwarder_query_messages: false,
            log_forwarder_response_messages: false,
            queue_capacity: default_queue_capacity(),
            reopen_interval_secs: default_reopen_interval_secs(),
            flush_timeout_ms: default_flush_timeout_ms(),
            max_frame_size: default_max_frame_size(),
        }
    }
}

impl DnstapConfig {
    /// Resolve the collector target. `ip` wins over `socket_path`.
    pub fn target(&self) -> Result<DnstapTarget, ConfigError> {
        if let Some(ip) = non_empty(&self.ip) {
            let addr = ip.parse::<SocketAddr>().map_err(|e| {
                ConfigError::Validation(format!("dnstap.ip '{}' is not a socket address: {}", ip, e))
            })?;
            return Ok(DnstapTarget::Tcp(addr));
        }

        match non_empty(&self.socket_path) {
            Some(path) => Ok(DnstapTarget::Unix(PathBuf::from(path))),
            None => Err(ConfigError::Validation(
                "dnstap is enabled but neither dnstap.socket_path nor dnstap.ip is set".to_string(),
            )),
        }
    }

    /// Identity override, if one was given.
    pub fn identity_override(&self) -> Option<&str> {
        non_empty(&self.identity)
    }

    /// Version override, if one was given.
    pub fn version_override(&self) -> Option<&str> {
        non_empty(&self.version)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.enabled {
            return Ok(());
        }

        self.target()?;

        if self.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "dnstap.queue_capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_frame_size == 0 {
            return Err(ConfigError::Validation(
                "dnstap.max_frame_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    512
}

fn default_reopen_interval_secs() -> u64 {
    5
}

fn default_flush_timeout_ms() -> u64 {
    1000
}

fn default_max_frame_size() -> usize {
    DEFAULT_MAX_FRAME_SIZE
}
