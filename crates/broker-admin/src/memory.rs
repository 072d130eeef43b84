//! In-memory broker clusters for tests.
//!
//! [`MemoryCluster`] keeps one [`ZoneState`] per zone name and mimics the
//! management API semantics the orchestrators rely on: deleting a namespace
//! drops its permissions, upstreams and policies; deleting a user drops its
//! permissions; deletes of absent entities are `Gone`. Faults can be queued
//! per operation and whole zones can be made unreachable.
//!
//! A client is only served when it authenticates as the zone's operator or
//! as a user that exists in that zone; anyone else gets the `Transport`
//! error a 401 produces over HTTP. Passwords are not checked. Every call
//! yields to the executor once before touching state, so concurrent
//! operations interleave the way network calls do.

use crate::api::{AdminApi, AdminConnector, AdminCredentials, RoutingPolicy, UpstreamDefinition};
use crate::error::{AdminError, Result};
use async_trait::async_trait;
use broker_config::Zone;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Management operation, used to target injected faults and to record calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `namespace_exists`
    NamespaceExists,
    /// `put_namespace`
    PutNamespace,
    /// `delete_namespace`
    DeleteNamespace,
    /// `user_exists`
    UserExists,
    /// `put_user`
    PutUser,
    /// `delete_user`
    DeleteUser,
    /// `grant_full_access`
    GrantFullAccess,
    /// `set_replication_upstream`
    SetUpstream,
    /// `delete_replication_upstream`
    DeleteUpstream,
    /// `set_routing_policy`
    SetPolicy,
    /// `delete_routing_policy`
    DeletePolicy,
}

/// A recorded management call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Operation performed
    pub operation: Operation,
    /// Primary subject (namespace or username)
    pub subject: String,
    /// User the client authenticated as
    pub caller: String,
}

/// State of one in-memory zone
#[derive(Debug, Default)]
pub struct ZoneState {
    namespaces: HashMap<String, bool>,
    users: HashMap<String, String>,
    permissions: HashSet<(String, String)>,
    upstreams: HashMap<(String, String), UpstreamDefinition>,
    policies: HashMap<(String, String), RoutingPolicy>,
    unreachable: bool,
    faults: HashMap<Operation, VecDeque<AdminError>>,
    calls: Vec<Call>,
}

/// A set of in-memory zones shared by every client a [`MemoryConnector`] hands out
#[derive(Debug, Default)]
pub struct MemoryCluster {
    zones: Mutex<HashMap<String, ZoneState>>,
}

impl MemoryCluster {
    /// Create an empty cluster set
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ZoneState>> {
        // A panicking test thread must not hide the state from the others.
        self.zones.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn with_zone<R>(&self, zone: &str, f: impl FnOnce(&mut ZoneState) -> R) -> R {
        let mut zones = self.lock();
        f(zones.entry(zone.to_string()).or_default())
    }

    /// Make every call against `zone` fail with a `Transport` error
    pub fn set_unreachable(&self, zone: &str, unreachable: bool) {
        self.with_zone(zone, |state| state.unreachable = unreachable);
    }

    /// Fail the next call of `operation` against `zone` with `error`
    pub fn fail_next(&self, zone: &str, operation: Operation, error: AdminError) {
        self.with_zone(zone, |state| {
            state.faults.entry(operation).or_default().push_back(error)
        });
    }

    /// Seed a namespace directly
    pub fn insert_namespace(&self, zone: &str, name: &str) {
        self.with_zone(zone, |state| {
            state.namespaces.insert(name.to_string(), false);
        });
    }

    /// Seed a user directly
    pub fn insert_user(&self, zone: &str, username: &str, password: &str) {
        self.with_zone(zone, |state| {
            state
                .users
                .insert(username.to_string(), password.to_string());
        });
    }

    /// Whether `name` exists in `zone`
    pub fn has_namespace(&self, zone: &str, name: &str) -> bool {
        self.with_zone(zone, |state| state.namespaces.contains_key(name))
    }

    /// Tracing flag of a namespace, if it exists
    pub fn namespace_tracing(&self, zone: &str, name: &str) -> Option<bool> {
        self.with_zone(zone, |state| state.namespaces.get(name).copied())
    }

    /// Whether `username` exists in `zone`
    pub fn has_user(&self, zone: &str, username: &str) -> bool {
        self.with_zone(zone, |state| state.users.contains_key(username))
    }

    /// Current password of a user, if it exists
    pub fn user_password(&self, zone: &str, username: &str) -> Option<String> {
        self.with_zone(zone, |state| state.users.get(username).cloned())
    }

    /// Number of users in `zone`
    pub fn user_count(&self, zone: &str) -> usize {
        self.with_zone(zone, |state| state.users.len())
    }

    /// Whether `username` holds full access on `namespace`
    pub fn has_full_access(&self, zone: &str, username: &str, namespace: &str) -> bool {
        self.with_zone(zone, |state| {
            state
                .permissions
                .contains(&(username.to_string(), namespace.to_string()))
        })
    }

    /// Upstream `link` inside `namespace`, if set
    pub fn upstream(&self, zone: &str, namespace: &str, link: &str) -> Option<UpstreamDefinition> {
        self.with_zone(zone, |state| {
            state
                .upstreams
                .get(&(namespace.to_string(), link.to_string()))
                .cloned()
        })
    }

    /// Policy inside `namespace`, if set
    pub fn policy(&self, zone: &str, namespace: &str, policy: &str) -> Option<RoutingPolicy> {
        self.with_zone(zone, |state| {
            state
                .policies
                .get(&(namespace.to_string(), policy.to_string()))
                .cloned()
        })
    }

    /// Every call made against `zone`, in order
    pub fn calls(&self, zone: &str) -> Vec<Call> {
        self.with_zone(zone, |state| state.calls.clone())
    }

    /// Operations (without subjects) made against `zone`, in order
    pub fn operations(&self, zone: &str) -> Vec<Operation> {
        self.calls(zone).into_iter().map(|c| c.operation).collect()
    }

    /// Record a call, then either fail it or run `f` on the zone state
    fn invoke<R>(
        &self,
        zone: &str,
        operator: &str,
        caller: &str,
        operation: Operation,
        subject: &str,
        f: impl FnOnce(&mut ZoneState) -> Result<R>,
    ) -> Result<R> {
        self.with_zone(zone, |state| {
            state.calls.push(Call {
                operation,
                subject: subject.to_string(),
                caller: caller.to_string(),
            });
            if state.unreachable {
                return Err(AdminError::transport(format!(
                    "Connection refused: zone '{}' is unreachable",
                    zone
                )));
            }
            if caller != operator && !state.users.contains_key(caller) {
                return Err(AdminError::transport(format!(
                    "Unexpected response received: [401] for user [{}] on zone '{}'",
                    caller, zone
                )));
            }
            if let Some(error) = state
                .faults
                .get_mut(&operation)
                .and_then(VecDeque::pop_front)
            {
                return Err(error);
            }
            f(state)
        })
    }
}

/// Client bound to one zone of a [`MemoryCluster`]
pub struct MemoryAdmin {
    cluster: Arc<MemoryCluster>,
    zone: String,
    endpoint: String,
    operator: String,
    caller: String,
}

impl MemoryAdmin {
    async fn invoke<R>(
        &self,
        operation: Operation,
        subject: &str,
        f: impl FnOnce(&mut ZoneState) -> Result<R>,
    ) -> Result<R> {
        smol::future::yield_now().await;
        self.cluster
            .invoke(&self.zone, &self.operator, &self.caller, operation, subject, f)
    }
}

fn not_found(what: &str, name: &str) -> AdminError {
    AdminError::gone(format!("{} not found: [{}]", what, name))
}

#[async_trait]
impl AdminApi for MemoryAdmin {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        self.invoke(Operation::NamespaceExists, name, |state| {
            Ok(state.namespaces.contains_key(name))
        })
        .await
    }

    async fn put_namespace(&self, name: &str, tracing: bool) -> Result<()> {
        self.invoke(Operation::PutNamespace, name, |state| {
            state.namespaces.insert(name.to_string(), tracing);
            Ok(())
        })
        .await
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        self.invoke(Operation::DeleteNamespace, name, |state| {
            state
                .namespaces
                .remove(name)
                .ok_or_else(|| not_found("Virtual host", name))?;
            state.permissions.retain(|(_, ns)| ns != name);
            state.upstreams.retain(|(ns, _), _| ns != name);
            state.policies.retain(|(ns, _), _| ns != name);
            Ok(())
        })
        .await
    }

    async fn user_exists(&self, username: &str) -> Result<bool> {
        self.invoke(Operation::UserExists, username, |state| {
            Ok(state.users.contains_key(username))
        })
        .await
    }

    async fn put_user(&self, username: &str, password: &str) -> Result<()> {
        self.invoke(Operation::PutUser, username, |state| {
            state
                .users
                .insert(username.to_string(), password.to_string());
            Ok(())
        })
        .await
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        self.invoke(Operation::DeleteUser, username, |state| {
            state
                .users
                .remove(username)
                .ok_or_else(|| not_found("User", username))?;
            state.permissions.retain(|(user, _)| user != username);
            Ok(())
        })
        .await
    }

    async fn grant_full_access(&self, username: &str, namespace: &str) -> Result<()> {
        self.invoke(Operation::GrantFullAccess, username, |state| {
            if !state.namespaces.contains_key(namespace) {
                return Err(not_found("Virtual host", namespace));
            }
            if !state.users.contains_key(username) {
                return Err(not_found("User", username));
            }
            state
                .permissions
                .insert((username.to_string(), namespace.to_string()));
            Ok(())
        })
        .await
    }

    async fn set_replication_upstream(
        &self,
        namespace: &str,
        link: &str,
        definition: &UpstreamDefinition,
    ) -> Result<()> {
        self.invoke(Operation::SetUpstream, namespace, |state| {
            if !state.namespaces.contains_key(namespace) {
                return Err(not_found("Virtual host", namespace));
            }
            state.upstreams.insert(
                (namespace.to_string(), link.to_string()),
                definition.clone(),
            );
            Ok(())
        })
        .await
    }

    async fn delete_replication_upstream(&self, namespace: &str, link: &str) -> Result<()> {
        self.invoke(Operation::DeleteUpstream, namespace, |state| {
            state
                .upstreams
                .remove(&(namespace.to_string(), link.to_string()))
                .map(|_| ())
                .ok_or_else(|| not_found("Federation upstream", link))
        })
        .await
    }

    async fn set_routing_policy(
        &self,
        namespace: &str,
        policy: &str,
        definition: &RoutingPolicy,
    ) -> Result<()> {
        self.invoke(Operation::SetPolicy, namespace, |state| {
            if !state.namespaces.contains_key(namespace) {
                return Err(not_found("Virtual host", namespace));
            }
            state.policies.insert(
                (namespace.to_string(), policy.to_string()),
                definition.clone(),
            );
            Ok(())
        })
        .await
    }

    async fn delete_routing_policy(&self, namespace: &str, policy: &str) -> Result<()> {
        self.invoke(Operation::DeletePolicy, namespace, |state| {
            state
                .policies
                .remove(&(namespace.to_string(), policy.to_string()))
                .map(|_| ())
                .ok_or_else(|| not_found("Policy", policy))
        })
        .await
    }
}

/// Connector handing out [`MemoryAdmin`] clients over a shared [`MemoryCluster`]
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    cluster: Arc<MemoryCluster>,
}

impl MemoryConnector {
    /// Create a connector over `cluster`
    pub fn new(cluster: Arc<MemoryCluster>) -> Self {
        Self { cluster }
    }

    /// The shared cluster
    pub fn cluster(&self) -> &Arc<MemoryCluster> {
        &self.cluster
    }
}

impl AdminConnector for MemoryConnector {
    fn connect(&self, zone: &Zone, credentials: &AdminCredentials) -> Result<Arc<dyn AdminApi>> {
        Ok(Arc::new(MemoryAdmin {
            cluster: Arc::clone(&self.cluster),
            zone: zone.name.clone(),
            endpoint: zone.management_url(),
            operator: zone.mgmt_user.clone(),
            caller: credentials.username.clone(),
        }))
    }
}
