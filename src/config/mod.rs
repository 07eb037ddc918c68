// SPDX-License-Identifier: MIT
// Copyright (c) 2025 Jesof

//! Configuration module for the dashboard application
//!
//! Loads the YAML configuration for each command from an explicit file or the
//! default search paths. Command-line flags and `DASHBOARD_*` environment
//! variables are layered on top by the CLI.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;


/// Default configuration values
pub mod defaults {
    pub const CLUSTER_NAME: &str = "default";
    pub const BIND_ADDRESS: &str = "localhost";
    pub const WEB_PORT: u16 = 8080;
    pub const METRICS_PORT: u16 = 8888;
    pub const TRUSTED_PROXIES: [&str; 2] = ["127.0.0.1", "::1"];

    pub const HEADERS_TIMEOUT_SECS: u64 = 2;
    pub const READ_TIMEOUT_SECS: u64 = 5;
    pub const WRITE_TIMEOUT_SECS: u64 = 10;
    pub const IDLE_TIMEOUT_SECS: u64 = 30;
    pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
    /// Metrics stops after web is already down, so it gets a short, fixed deadline
    pub const METRICS_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

    pub const ENDPOINT_URI: &str = "http://localhost:8080";
}

/// Default configuration file names for each command
pub mod files {
    pub const SERVE: &str = "serve.yaml";
    pub const SEND: &str = "send.yaml";
}

/// Environment variable names used by the application
pub mod env_vars {
    pub const CONFIG: &str = "DASHBOARD_CONFIG";
    pub const LOGGING_LEVEL: &str = "DASHBOARD_LOGGING_LEVEL";
    pub const LOGGING_JSON: &str = "DASHBOARD_LOGGING_JSON";
    pub const CLUSTER_NAME: &str = "DASHBOARD_CLUSTER_NAME";
    pub const BIND_ADDRESS: &str = "DASHBOARD_ENDPOINTS_BIND_ADDRESS";
    pub const WEB_PORT: &str = "DASHBOARD_ENDPOINTS_BIND_PORT_WEB";
    pub const METRICS_PORT: &str = "DASHBOARD_ENDPOINTS_BIND_PORT_METRICS";
    pub const PROXIES: &str = "DASHBOARD_ENDPOINTS_PROXIES";
    pub const HEADERS_TIMEOUT: &str = "DASHBOARD_ENDPOINTS_TIMEOUTS_HEADERS";
    pub const READ_TIMEOUT: &str = "DASHBOARD_ENDPOINTS_TIMEOUTS_READ";
    pub const WRITE_TIMEOUT: &str = "DASHBOARD_ENDPOINTS_TIMEOUTS_WRITE";
    pub const IDLE_TIMEOUT: &str = "DASHBOARD_ENDPOINTS_TIMEOUTS_IDLE";
    pub const SHUTDOWN_TIMEOUT: &str = "DASHBOARD_ENDPOINTS_TIMEOUTS_SHUTDOWN";
    pub const ENDPOINT_URI: &str = "DASHBOARD_ENDPOINT_URI";
}

/// Errors raised while loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The explicitly requested file, or the file found in the search paths,
    /// does not exist
    #[error("unable to find the configuration file: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read
    #[error("unable to read configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but is not valid configuration
    #[error("unable to process configuration file {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// A configuration document together with the file it was read from
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub config: T,
    pub source: Option<PathBuf>,
}

/// Directories searched for a configuration file when none is given
#[must_use]
pub fn search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(2);
    if let Some(home) = std::env::var_os("HOME") {
        paths.push(PathBuf::from(home).join(".config").join("dashboard"));
    }
    paths.push(PathBuf::from("/etc/dashboard"));
    paths
}

/// Load a configuration document
///
/// With `explicit` set, that file must exist and parse. Otherwise `name` is
/// looked up in each of `search`; a file missing from every search path is not
/// an error and yields the defaults.
pub fn load<T>(
    name: &str,
    explicit: Option<&Path>,
    search: &[PathBuf],
) -> Result<Loaded<T>, ConfigError>
where
    T: DeserializeOwned + Default,
{
    if let Some(path) = explicit {
        let config = read(path)?;
        return Ok(Loaded {
            config,
            source: Some(path.to_path_buf()),
        });
    }

    for dir in search {
        let path = dir.join(name);
        match read(&path) {
            Ok(config) => {
                return Ok(Loaded {
                    config,
                    source: Some(path),
                });
            }
            Err(ConfigError::NotFound { .. }) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(Loaded {
        config: T::default(),
        source: None,
    })
}

fn read<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound {
                path: path.to_path_buf(),
            });
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if content.trim().is_empty() {
        return Ok(T::default());
    }

    serde_yaml::from_str(&content).map_err(|source| ConfigError::Load {
        path: path.to_path_buf(),
        source,
    })
}

/// Configuration for `dashboard serve`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServeConfig {
    pub cluster: ClusterConfig,
    pub endpoints: EndpointsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub name: String,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        ClusterConfig {
            name: defaults::CLUSTER_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointsConfig {
    pub bind: BindConfig,
    /// IPs or CIDRs trusted to supply the client address in forwarding headers
    pub proxies: Vec<String>,
    pub timeouts: TimeoutsConfig,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        EndpointsConfig {
            bind: BindConfig::default(),
            proxies: defaults::TRUSTED_PROXIES
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            timeouts: TimeoutsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BindConfig {
    pub address: String,
    pub port: PortsConfig,
}

impl Default for BindConfig {
    fn default() -> Self {
        BindConfig {
            address: defaults::BIND_ADDRESS.to_string(),
            port: PortsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PortsConfig {
    pub web: u16,
    pub metrics: u16,
}

impl Default for PortsConfig {
    fn default() -> Self {
        PortsConfig {
            web: defaults::WEB_PORT,
            metrics: defaults::METRICS_PORT,
        }
    }
}

/// Timeouts in whole seconds; zero disables the timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub headers: u64,
    pub read: u64,
    pub write: u64,
    pub idle: u64,
    pub shutdown: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        TimeoutsConfig {
            headers: defaults::HEADERS_TIMEOUT_SECS,
            read: defaults::READ_TIMEOUT_SECS,
            write: defaults::WRITE_TIMEOUT_SECS,
            idle: defaults::IDLE_TIMEOUT_SECS,
            shutdown: defaults::SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl TimeoutsConfig {
    #[must_use]
    pub fn shutdown(&self) -> Duration {
        Duration::from_secs(self.shutdown)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            json: true,
            level: "info".to_string(),
        }
    }
}

/// Configuration for `dashboard send`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SendConfig {
    #[serde(rename = "endpoint-uri")]
    pub endpoint_uri: String,
    pub logging: LoggingConfig,
}

impl Default for SendConfig {
    fn default() -> Self {
        SendConfig {
            endpoint_uri: defaults::ENDPOINT_URI.to_string(),
            logging: LoggingConfig {
                json: false,
                level: "warning".to_string(),
            },
        }
    }
}
