//! The management seam the orchestrators talk to.
//!
//! [`AdminApi`] is the per-zone set of administrative operations and
//! [`AdminConnector`] builds one for a zone and a credential pair. Only the
//! `put_*`, `delete_*`, `*_exists` and `set_*` primitives are implemented by
//! backends; the `create_*` operations layer the conflict check on top.

use crate::error::{AdminError, Result};
use async_trait::async_trait;
use broker_config::Zone;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Tags given to users created through the broker
pub const USER_TAGS: &str = "management,policymaker,monitoring";

/// Username and password for a management API
#[derive(Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    /// Username
    pub username: String,
    /// Password
    pub password: String,
}

impl AdminCredentials {
    /// Create a credential pair
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The operator account configured for a zone
    pub fn operator(zone: &Zone) -> Self {
        Self::new(&zone.mgmt_user, &zone.mgmt_pass)
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Federation upstream: where a namespace pulls replicated messages from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct UpstreamDefinition {
    /// AMQP URI of the source namespace
    pub uri: String,
    /// Maximum number of federation hops
    pub max_hops: u32,
    /// Upstream queue expiry in milliseconds
    pub expires: u64,
    /// Reconnect delay in seconds
    pub reconnect_delay: u32,
    /// Acknowledgement mode
    pub ack_mode: String,
    /// Prefetch count
    pub prefetch_count: u32,
}

/// Policy applying a definition to matching queues and exchanges
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct RoutingPolicy {
    /// Name pattern the policy matches
    pub pattern: String,
    /// `all`, `queues` or `exchanges`
    pub apply_to: String,
    /// Priority among matching policies
    pub priority: i32,
    /// Policy body
    pub definition: serde_json::Value,
}

/// Administrative operations against exactly one zone
///
/// Implementations never retry and never recover errors: every outcome is
/// returned classified as an [`AdminError`].
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// Management endpoint this client talks to
    fn endpoint(&self) -> &str;

    /// Whether a namespace exists; absence is `Ok(false)`
    async fn namespace_exists(&self, name: &str) -> Result<bool>;

    /// Declaratively create or update a namespace
    async fn put_namespace(&self, name: &str, tracing: bool) -> Result<()>;

    /// Delete a namespace; `Gone` when absent
    async fn delete_namespace(&self, name: &str) -> Result<()>;

    /// Whether a user exists; absence is `Ok(false)`
    async fn user_exists(&self, username: &str) -> Result<bool>;

    /// Declaratively create or update a user, replacing its password
    async fn put_user(&self, username: &str, password: &str) -> Result<()>;

    /// Delete a user; `Gone` when absent
    async fn delete_user(&self, username: &str) -> Result<()>;

    /// Grant configure, write and read on everything in `namespace`
    async fn grant_full_access(&self, username: &str, namespace: &str) -> Result<()>;

    /// Upsert a federation upstream inside `namespace`
    async fn set_replication_upstream(
        &self,
        namespace: &str,
        link: &str,
        definition: &UpstreamDefinition,
    ) -> Result<()>;

    /// Delete a federation upstream; `Gone` when absent
    async fn delete_replication_upstream(&self, namespace: &str, link: &str) -> Result<()>;

    /// Upsert a policy inside `namespace`
    async fn set_routing_policy(
        &self,
        namespace: &str,
        policy: &str,
        definition: &RoutingPolicy,
    ) -> Result<()>;

    /// Delete a policy; `Gone` when absent
    async fn delete_routing_policy(&self, namespace: &str, policy: &str) -> Result<()>;

    /// Create a namespace, failing with `Conflict` if it already exists
    ///
    /// The existence check and the creation are two calls; concurrent
    /// creators can both pass the check.
    async fn create_namespace(&self, name: &str, tracing: bool) -> Result<()> {
        if self.namespace_exists(name).await? {
            return Err(AdminError::conflict(format!(
                "Virtual host already exists: [{}]",
                name
            )));
        }
        self.put_namespace(name, tracing).await
    }

    /// Create a user, failing with `Conflict` if it already exists
    async fn create_user(&self, username: &str, password: &str) -> Result<()> {
        if self.user_exists(username).await? {
            return Err(AdminError::conflict(format!(
                "User already exists: [{}]",
                username
            )));
        }
        self.put_user(username, password).await
    }
}

/// Builds [`AdminApi`] clients for zones
pub trait AdminConnector: Send + Sync {
    /// Client for `zone`'s management endpoint authenticated as `credentials`
    fn connect(&self, zone: &Zone, credentials: &AdminCredentials) -> Result<Arc<dyn AdminApi>>;

    /// Client for `zone` authenticated as its configured operator account
    fn connect_operator(&self, zone: &Zone) -> Result<Arc<dyn AdminApi>> {
        self.connect(zone, &AdminCredentials::operator(zone))
    }
}
