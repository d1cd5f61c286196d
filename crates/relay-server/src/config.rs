//! Configuration for the relay hub.
//!
//! Layers, later wins:
//!
//! 1. built-in defaults,
//! 2. an optional TOML file (`--config relay.toml`),
//! 3. environment variables,
//! 4. command-line flags (applied by `main`).
//!
//! Environment variables:
//!
//! - `RELAY_PRIMARY_ADDR`          (default: "127.0.0.1")
//! - `RELAY_FALLBACK_ADDR`         (default: "0.0.0.0")
//! - `RELAY_TCP_PORT`              (default: "8080")
//! - `RELAY_ALT_TCP_PORTS`         (default: "8083,8084")
//! - `RELAY_WS_PORT`               (default: "8081")
//! - `RELAY_ALT_WS_PORTS`          (default: "8085,8086,8087")
//! - `RELAY_HTTP_ENABLED`          (default: "true")
//! - `RELAY_HTTP_PORT`             (default: "5000")
//! - `RELAY_ALT_HTTP_PORTS`        (default: "")
//! - `RELAY_CONNECTION_TIMEOUT_MS` (default: "3000")
//! - `RELAY_BIND_TIMEOUT_MS`       (default: "1000")
//! - `RELAY_OUTBOUND_BUFFER`       (default: "256")
//! - `RELAY_MAX_LINE_BYTES`        (default: "65536")
//! - `RELAY_STATUS_INTERVAL_SECS`  (default: "30", "0" disables)

use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::bind::{BindPlan, ListenerKind};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Relay hub configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Address tried first for every listener.
    pub primary_addr: String,

    /// Address tried when every port failed on `primary_addr`.
    pub fallback_addr: String,

    pub tcp_port: u16,
    pub alt_tcp_ports: Vec<u16>,

    pub ws_port: u16,
    pub alt_ws_ports: Vec<u16>,

    /// Whether to run the HTTP command ingress at all.
    pub http_enabled: bool,
    pub http_port: u16,
    pub alt_http_ports: Vec<u16>,

    /// WebSocket handshake deadline and shutdown drain deadline.
    pub connection_timeout_ms: u64,

    /// Deadline for a single bind attempt during port resolution.
    pub bind_timeout_ms: u64,

    /// Frames queued per peer before further frames to it are dropped.
    pub outbound_buffer: usize,

    /// Longest accepted TCP line.
    pub max_line_bytes: usize,

    /// Period of the status log line; `0` disables it.
    pub status_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            primary_addr: "127.0.0.1".to_string(),
            fallback_addr: "0.0.0.0".to_string(),
            tcp_port: 8080,
            alt_tcp_ports: vec![8083, 8084],
            ws_port: 8081,
            alt_ws_ports: vec![8085, 8086, 8087],
            http_enabled: true,
            http_port: 5000,
            alt_http_ports: Vec::new(),
            connection_timeout_ms: 3000,
            bind_timeout_ms: 1000,
            outbound_buffer: 256,
            max_line_bytes: 64 * 1024,
            status_interval_secs: 30,
        }
    }
}

impl Config {
    /// Defaults overridden by environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env()
    }

    /// Load a TOML file; fields it omits keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `RELAY_*` environment variables on top of `self`.
    pub fn with_env(self) -> Result<Self, ConfigError> {
        self.with_lookup(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn with_lookup<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("RELAY_PRIMARY_ADDR") {
            self.primary_addr = v;
        }
        if let Some(v) = lookup("RELAY_FALLBACK_ADDR") {
            self.fallback_addr = v;
        }
        read_var(&lookup, "RELAY_TCP_PORT", &mut self.tcp_port)?;
        read_ports(&lookup, "RELAY_ALT_TCP_PORTS", &mut self.alt_tcp_ports)?;
        read_var(&lookup, "RELAY_WS_PORT", &mut self.ws_port)?;
        read_ports(&lookup, "RELAY_ALT_WS_PORTS", &mut self.alt_ws_ports)?;
        read_var(&lookup, "RELAY_HTTP_ENABLED", &mut self.http_enabled)?;
        read_var(&lookup, "RELAY_HTTP_PORT", &mut self.http_port)?;
        read_ports(&lookup, "RELAY_ALT_HTTP_PORTS", &mut self.alt_http_ports)?;
        read_var(&lookup, "RELAY_CONNECTION_TIMEOUT_MS", &mut self.connection_timeout_ms)?;
        read_var(&lookup, "RELAY_BIND_TIMEOUT_MS", &mut self.bind_timeout_ms)?;
        read_var(&lookup, "RELAY_OUTBOUND_BUFFER", &mut self.outbound_buffer)?;
        read_var(&lookup, "RELAY_MAX_LINE_BYTES", &mut self.max_line_bytes)?;
        read_var(&lookup, "RELAY_STATUS_INTERVAL_SECS", &mut self.status_interval_secs)?;

        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("outbound_buffer", self.outbound_buffer as u64),
            ("max_line_bytes", self.max_line_bytes as u64),
            ("bind_timeout_ms", self.bind_timeout_ms),
        ];
        for (key, value) in nonzero {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: "0".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_millis(self.connection_timeout_ms)
    }

    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_timeout_ms)
    }

    /// Port resolution plan for one listener.
    pub fn bind_plan(&self, kind: ListenerKind) -> BindPlan {
        let (port, alt_ports) = match kind {
            ListenerKind::Tcp => (self.tcp_port, &self.alt_tcp_ports),
            ListenerKind::WebSocket => (self.ws_port, &self.alt_ws_ports),
            ListenerKind::Http => (self.http_port, &self.alt_http_ports),
        };
        BindPlan {
            kind,
            primary_addr: self.primary_addr.clone(),
            fallback_addr: self.fallback_addr.clone(),
            port,
            alt_ports: alt_ports.clone(),
            attempt_timeout: self.bind_timeout(),
        }
    }
}

fn read_var<T, F>(lookup: &F, key: &str, slot: &mut T) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *slot = raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(())
}

fn read_ports<F>(lookup: &F, key: &str, slot: &mut Vec<u16>) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(key) {
        *slot = parse_ports(&raw).map_err(|reason| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
            reason,
        })?;
    }
    Ok(())
}

/// Parse `"8083, 8084"` into ports. Empty input means no alternates.
pub fn parse_ports(raw: &str) -> Result<Vec<u16>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u16>().map_err(|e| format!("{:?}: {}", p, e)))
        .collect()
}
