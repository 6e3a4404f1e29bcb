//! Distributor configuration.
//!
//! Configuration can be built in code, loaded from a JSON file, or adjusted
//! through `FEEDBUS_*` environment variables. The defaults give the plain
//! open bus: listen on every interface, no heartbeat, unbounded write
//! queues, no advertisements, and every role allowed on every feed.

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::roles::{DistributorRole, FeedRole, InteractorRole, RoleSet};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The config file is not valid JSON for this schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Complete distributor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistributorConfig {
    /// Address to listen on.
    pub address: IpAddr,
    /// Port to listen on (default: 9090).
    pub port: u16,
    /// Heartbeat publish interval in milliseconds (0 = disabled).
    pub heartbeat_interval_ms: u64,
    /// Per-connection outbound queue capacity (0 = unbounded).
    pub write_queue_capacity: usize,
    /// Broadcast connection and disconnection advertisements.
    pub advertise_interactors: bool,
    /// Globally allowed roles.
    pub allow: RoleSet,
    /// Globally denied roles.
    pub deny: RoleSet,
    /// Per-feed role overrides. A feed listed here requires authorization.
    pub feed_roles: Vec<FeedRoleConfig>,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 9090,
            heartbeat_interval_ms: 0,
            write_queue_capacity: 0,
            advertise_interactors: false,
            allow: RoleSet::all(),
            deny: RoleSet::EMPTY,
            feed_roles: Vec::new(),
        }
    }
}

/// Role overrides for one feed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedRoleConfig {
    /// The feed name.
    pub feed: String,
    /// Roles allowed on this feed.
    pub allow: RoleSet,
    /// Roles denied on this feed.
    pub deny: RoleSet,
    /// Whether authorizers are expected to grant per-topic entitlements.
    pub requires_entitlement: bool,
    /// Per-(address, user) overrides within this feed.
    pub interactor_roles: Vec<InteractorRoleConfig>,
}

/// Role overrides for one principal on one feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractorRoleConfig {
    /// The connection's remote IP address.
    pub address: IpAddr,
    /// The connection's user name.
    pub user: String,
    /// Roles allowed for this principal.
    #[serde(default)]
    pub allow: RoleSet,
    /// Roles denied for this principal.
    #[serde(default)]
    pub deny: RoleSet,
}

impl DistributorConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Override scalar settings from `FEEDBUS_*` environment variables.
    ///
    /// Invalid values are logged and ignored rather than failing startup.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(address) = std::env::var("FEEDBUS_ADDRESS") {
            match address.parse() {
                Ok(parsed) => self.address = parsed,
                Err(_) => warn!("FEEDBUS_ADDRESS is not a valid IP address: {}", address),
            }
        }
        if let Ok(port) = std::env::var("FEEDBUS_PORT") {
            match port.parse() {
                Ok(parsed) => self.port = parsed,
                Err(_) => warn!("FEEDBUS_PORT is not a valid port: {}", port),
            }
        }
        if let Ok(interval) = std::env::var("FEEDBUS_HEARTBEAT_MS") {
            match interval.parse() {
                Ok(parsed) => self.heartbeat_interval_ms = parsed,
                Err(_) => warn!("FEEDBUS_HEARTBEAT_MS is not a valid interval: {}", interval),
            }
        }
        if let Ok(capacity) = std::env::var("FEEDBUS_WRITE_QUEUE_CAPACITY") {
            match capacity.parse() {
                Ok(parsed) => self.write_queue_capacity = parsed,
                Err(_) => warn!("FEEDBUS_WRITE_QUEUE_CAPACITY is not a valid size: {}", capacity),
            }
        }
        if let Ok(advertise) = std::env::var("FEEDBUS_ADVERTISE") {
            match advertise.parse() {
                Ok(parsed) => self.advertise_interactors = parsed,
                Err(_) => warn!("FEEDBUS_ADVERTISE is not a valid bool: {}", advertise),
            }
        }
    }

    /// The socket address to bind.
    #[must_use]
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.port)
    }

    /// The heartbeat interval, or `None` when heartbeats are disabled.
    #[must_use]
    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }

    /// Build the immutable access policy from this configuration.
    #[must_use]
    pub fn to_distributor_role(&self) -> DistributorRole {
        let mut feed_roles = HashMap::new();
        for feed_config in &self.feed_roles {
            let mut feed_role = FeedRole::new(
                feed_config.allow,
                feed_config.deny,
                feed_config.requires_entitlement,
            );
            for interactor_config in &feed_config.interactor_roles {
                feed_role.add_interactor_role(
                    interactor_config.address,
                    interactor_config.user.clone(),
                    InteractorRole::new(interactor_config.allow, interactor_config.deny),
                );
            }
            feed_roles.insert(feed_config.feed.clone(), feed_role);
        }
        DistributorRole::new(self.allow, self.deny, feed_roles)
    }
}
