//! # Broker Configuration
//!
//! YAML configuration for the RabbitMQ service broker.
//!
//! This crate parses `broker.yaml` files, substitutes environment variables,
//! validates the zone list and turns it into an immutable [`ZoneRegistry`]
//! that the orchestrators receive at construction time.

#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub mod parser;
pub mod registry;

pub use registry::ZoneRegistry;

/// Default AMQP port of a zone's data plane
pub const DEFAULT_AMQP_PORT: u16 = 5672;

/// Default port of a zone's management API
pub const DEFAULT_MANAGEMENT_PORT: u16 = 15672;

/// Default per-request timeout against a management API, in seconds
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 10;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Zone reference not found
    #[error("Zone '{0}' not found")]
    UnknownZone(String),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Global settings
    #[serde(default, skip_serializing_if = "Settings::is_default")]
    pub settings: Settings,

    /// Cross-zone replication tuning
    #[serde(default)]
    pub replication: ReplicationSettings,

    /// Catalog override; the built-in catalog is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Catalog>,

    /// Broker clusters, in declaration order
    pub zones: Vec<Zone>,
}

/// Global settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Default log level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Per-request timeout against management APIs in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout: Option<u64>,
}

impl Settings {
    /// Check if settings are default (all None)
    fn is_default(&self) -> bool {
        self == &Settings::default()
    }

    /// Effective per-request timeout
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT))
    }
}

/// Parameters of the federation upstreams and policies wired between zones
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReplicationSettings {
    /// Queue/exchange name pattern the routing policy applies to
    pub routing_pattern: String,
    /// Maximum number of federation hops
    pub max_hops: u32,
    /// Upstream queue expiry in milliseconds
    pub expires: u64,
    /// Reconnect delay in seconds
    pub reconnect_delay: u32,
    /// Acknowledgement mode of the link
    pub ack_mode: String,
    /// Prefetch count of the link
    pub prefetch_count: u32,
}

impl Default for ReplicationSettings {
    fn default() -> Self {
        Self {
            routing_pattern: r"^ps\.".to_string(),
            max_hops: 1,
            expires: 36_000_000,
            reconnect_delay: 5,
            ack_mode: "on-confirm".to_string(),
            prefetch_count: 1,
        }
    }
}

/// One independently administered broker cluster
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct Zone {
    /// Unique zone name
    pub name: String,

    /// Data-plane host
    pub host: String,

    /// Data-plane AMQP port
    #[serde(default = "default_amqp_port")]
    pub port: u16,

    /// Management API host
    pub mgmt_host: String,

    /// Management API port
    #[serde(default = "default_management_port")]
    pub mgmt_port: u16,

    /// Operator account on the management API
    pub mgmt_user: String,

    /// Operator password on the management API
    pub mgmt_pass: String,

    /// Enable tracing on namespaces created in this zone
    #[serde(default)]
    pub trace: bool,
}

fn default_amqp_port() -> u16 {
    DEFAULT_AMQP_PORT
}

fn default_management_port() -> u16 {
    DEFAULT_MANAGEMENT_PORT
}

impl Zone {
    /// Base URL of the zone's management API
    pub fn management_url(&self) -> String {
        format!("http://{}:{}", self.mgmt_host, self.mgmt_port)
    }

    /// Data-plane address as `host:port`
    pub fn data_plane_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Zone")
            .field("name", &self.name)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("mgmt_host", &self.mgmt_host)
            .field("mgmt_port", &self.mgmt_port)
            .field("mgmt_user", &self.mgmt_user)
            .field("mgmt_pass", &"<redacted>")
            .field("trace", &self.trace)
            .finish()
    }
}

/// Offerable services, as published to the marketplace
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    /// Services offered by this broker
    pub services: Vec<CatalogService>,
}

/// A single offerable service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogService {
    /// Service identifier
    pub id: String,
    /// Service name
    pub name: String,
    /// Human readable description
    pub description: String,
    /// Whether instances of the service can be bound
    pub bindable: bool,
    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Plans of the service
    pub plans: Vec<Plan>,
}

/// A service plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    /// Plan identifier
    pub id: String,
    /// Plan name
    pub name: String,
    /// Human readable description
    pub description: String,
}
