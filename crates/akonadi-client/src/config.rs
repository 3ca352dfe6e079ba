use std::{env, path::PathBuf, time::Duration};

use akonadi_proto::default_socket_path;
use thiserror::Error;

const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Invalid client configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?} is not a non-negative integer")]
    InvalidNumber { var: &'static str, value: String },
}

/// When to try again after losing the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay after a failed connect or a broken socket.
    pub transport_delay: Duration,
    /// Delay after the server rejected hello or login.
    pub handshake_delay: Duration,
    /// Consecutive handshake failures tolerated before giving up; `None` retries forever.
    pub max_handshake_failures: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            transport_delay: DEFAULT_RECONNECT_DELAY,
            handshake_delay: DEFAULT_RECONNECT_DELAY,
            max_handshake_failures: None,
        }
    }
}

/// Settings shared by every session created from one client context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server socket path.
    pub socket_path: PathBuf,
    pub reconnect: ReconnectPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

impl ClientConfig {
    /// Builds a config from platform defaults and `AKONADI_*` overrides.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(ms) = read_number("AKONADI_RECONNECT_DELAY_MS")? {
            config.reconnect.transport_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = read_number("AKONADI_HANDSHAKE_RETRY_DELAY_MS")? {
            config.reconnect.handshake_delay = Duration::from_millis(ms);
        }
        if let Some(limit) = read_number("AKONADI_MAX_HANDSHAKE_FAILURES")? {
            config.reconnect.max_handshake_failures =
                Some(u32::try_from(limit).unwrap_or(u32::MAX));
        }

        Ok(config)
    }

    pub fn with_socket_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.socket_path = path.into();
        self
    }
}

fn read_number(var: &'static str) -> Result<Option<u64>, ConfigError> {
    let Some(raw) = env::var_os(var) else {
        return Ok(None);
    };
    let value = raw.to_string_lossy();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidNumber {
            var,
            value: value.into_owned(),
        })
}
