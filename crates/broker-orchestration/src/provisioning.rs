//! Creation and teardown of service instances.
//!
//! Provisioning walks `Unprovisioned → NamespaceCreated → AdminUserCreated →
//! PermissionsGranted → Provisioned` on the home zone. A failure before
//! `Provisioned` undoes the steps already taken, newest first, and returns
//! the original error. Once the instance is provisioned, federation is
//! wired from every peer zone back to the home zone; that part is best
//! effort and reports per-zone outcomes instead of failing.
//!
//! Peers are reached as the instance's management user, which only exists
//! on the home zone once provisioning creates it. A peer is therefore linked
//! only when a user of that name and the instance namespace are already
//! present there; otherwise the peer rejects the call and its report is
//! `Failed`.

use crate::compensation::{Created, Rollback, absorb_gone};
use crate::naming;
use crate::password::generate_password;
use broker_admin::{
    AdminConnector, AdminCredentials, AdminError, Result, RoutingPolicy, UpstreamDefinition,
};
use broker_config::{ReplicationSettings, Zone, ZoneRegistry};
use futures::future::join_all;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome of wiring or unwiring replication on one peer zone
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReplicationOutcome {
    /// Upstream and policy are in place
    Linked,
    /// Upstream and policy are absent
    Unlinked,
    /// The zone could not be (un)wired; the instance itself is unaffected
    Failed {
        /// Error returned by the peer zone
        error: String,
    },
}

/// Replication outcome for one peer zone
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicationReport {
    /// Peer zone name
    pub zone: String,
    /// What happened there
    #[serde(flatten)]
    pub outcome: ReplicationOutcome,
}

impl ReplicationReport {
    fn from_result(zone: &Zone, result: Result<()>, on_success: ReplicationOutcome) -> Self {
        let outcome = match result {
            Ok(()) => on_success,
            Err(err) => ReplicationOutcome::from(&err),
        };
        Self {
            zone: zone.name.clone(),
            outcome,
        }
    }

    /// Whether this zone failed
    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, ReplicationOutcome::Failed { .. })
    }
}

/// A successfully provisioned instance
#[derive(Debug, Clone, PartialEq)]
pub struct Provisioned {
    /// Management UI login URL for the instance's management user
    pub dashboard_url: String,
    /// Management user created for the instance
    pub username: String,
    /// Per-peer replication outcomes
    pub replication: Vec<ReplicationReport>,
}

impl Provisioned {
    /// Peer zones whose replication wiring failed
    pub fn warnings(&self) -> impl Iterator<Item = &ReplicationReport> {
        self.replication.iter().filter(|r| r.is_failed())
    }
}

/// A successfully deprovisioned instance
#[derive(Debug, Clone, PartialEq)]
pub struct Deprovisioned {
    /// Per-peer replication teardown outcomes
    pub teardown: Vec<ReplicationReport>,
}

impl Deprovisioned {
    /// Peer zones whose replication teardown failed
    pub fn warnings(&self) -> impl Iterator<Item = &ReplicationReport> {
        self.teardown.iter().filter(|r| r.is_failed())
    }
}

/// Runs provision and deprovision for service instances
pub struct ProvisioningOrchestrator {
    registry: Arc<ZoneRegistry>,
    connector: Arc<dyn AdminConnector>,
    replication: ReplicationSettings,
}

impl ProvisioningOrchestrator {
    /// Create an orchestrator over `registry`, reaching zones through `connector`
    pub fn new(
        registry: Arc<ZoneRegistry>,
        connector: Arc<dyn AdminConnector>,
        replication: ReplicationSettings,
    ) -> Self {
        Self {
            registry,
            connector,
            replication,
        }
    }

    /// Provision `instance_id` on `home_zone`
    ///
    /// Fails with `Conflict` if the namespace or the management user already
    /// exists; a duplicate provision is never reported as success.
    pub async fn provision(&self, instance_id: &str, home_zone: &str) -> Result<Provisioned> {
        naming::validate_instance_id(instance_id)?;
        let home = self.registry.require(home_zone)?;
        let admin = self.connector.connect_operator(home)?;
        let namespace = naming::namespace(instance_id);
        let mut rollback = Rollback::new();

        admin.create_namespace(namespace, home.trace).await?;
        rollback.record(Created::Namespace(namespace.to_string()));
        info!(
            instance = instance_id,
            zone = %home.name,
            endpoint = admin.endpoint(),
            "Virtual host created"
        );

        let username = naming::management_user(instance_id);
        let password = generate_password();
        if let Err(err) = admin.create_user(&username, &password).await {
            warn!(instance = instance_id, error = %err, "Management user creation failed");
            rollback.run(admin.as_ref(), instance_id).await;
            return Err(err);
        }
        rollback.record(Created::User(username.clone()));
        info!(instance = instance_id, user = %username, "Management user created");

        if let Err(err) = admin.grant_full_access(&username, namespace).await {
            warn!(instance = instance_id, error = %err, "Permission grant failed");
            rollback.run(admin.as_ref(), instance_id).await;
            return Err(err);
        }
        info!(instance = instance_id, user = %username, "All permissions granted");

        let credentials = AdminCredentials::new(username, password);
        let replication = self.link_peers(instance_id, home, &credentials).await;

        let dashboard_url = dashboard_url(home, &credentials);
        info!(instance = instance_id, zone = %home.name, "Instance provisioned");

        Ok(Provisioned {
            dashboard_url,
            username: credentials.username,
            replication,
        })
    }

    /// Deprovision `instance_id` from `home_zone`
    ///
    /// Absent resources count as deleted, so deprovisioning an unknown
    /// instance succeeds. Federation definitions left on peer zones are
    /// removed afterwards on a best-effort basis.
    pub async fn deprovision(&self, instance_id: &str, home_zone: &str) -> Result<Deprovisioned> {
        naming::validate_instance_id(instance_id)?;
        let home = self.registry.require(home_zone)?;
        let admin = self.connector.connect_operator(home)?;

        let username = naming::management_user(instance_id);
        absorb_gone(admin.delete_user(&username).await)?;
        info!(instance = instance_id, user = %username, "Management user deleted");

        absorb_gone(admin.delete_namespace(naming::namespace(instance_id)).await)?;
        info!(instance = instance_id, zone = %home.name, "Virtual host deleted");

        let teardown = self.unlink_peers(instance_id, home).await;
        Ok(Deprovisioned { teardown })
    }

    /// Upstream definition on a peer pointing back at the home zone's namespace
    pub fn upstream_for(
        &self,
        instance_id: &str,
        home: &Zone,
        credentials: &AdminCredentials,
    ) -> UpstreamDefinition {
        UpstreamDefinition {
            uri: format!(
                "amqp://{}:{}@{}/{}",
                credentials.username,
                credentials.password,
                home.data_plane_address(),
                naming::namespace(instance_id)
            ),
            max_hops: self.replication.max_hops,
            expires: self.replication.expires,
            reconnect_delay: self.replication.reconnect_delay,
            ack_mode: self.replication.ack_mode.clone(),
            prefetch_count: self.replication.prefetch_count,
        }
    }

    /// Policy federating everything that matches the routing pattern
    pub fn routing_policy(&self) -> RoutingPolicy {
        RoutingPolicy {
            pattern: self.replication.routing_pattern.clone(),
            apply_to: "all".to_string(),
            priority: 0,
            definition: json!({ "federation-upstream-set": "all" }),
        }
    }

    async fn link_peers(
        &self,
        instance_id: &str,
        home: &Zone,
        credentials: &AdminCredentials,
    ) -> Vec<ReplicationReport> {
        let upstream = self.upstream_for(instance_id, home, credentials);
        let policy = self.routing_policy();

        let links = self.registry.peers_of(&home.name).map(|peer| {
            let upstream = &upstream;
            let policy = &policy;
            async move {
                let result = self
                    .link_peer(instance_id, peer, credentials, upstream, policy)
                    .await;
                if let Err(err) = &result {
                    warn!(
                        instance = instance_id,
                        zone = %peer.name,
                        error = %err,
                        "Replication link not established"
                    );
                } else {
                    info!(instance = instance_id, zone = %peer.name, "Replication link established");
                }
                ReplicationReport::from_result(peer, result, ReplicationOutcome::Linked)
            }
        });

        join_all(links).await
    }

    async fn link_peer(
        &self,
        instance_id: &str,
        peer: &Zone,
        credentials: &AdminCredentials,
        upstream: &UpstreamDefinition,
        policy: &RoutingPolicy,
    ) -> Result<()> {
        let namespace = naming::namespace(instance_id);
        let admin = self.connector.connect(peer, credentials)?;
        admin
            .set_replication_upstream(namespace, &naming::replication_link(instance_id), upstream)
            .await?;
        admin
            .set_routing_policy(namespace, &naming::routing_policy(instance_id), policy)
            .await
    }

    async fn unlink_peers(&self, instance_id: &str, home: &Zone) -> Vec<ReplicationReport> {
        let unlinks = self.registry.peers_of(&home.name).map(|peer| async move {
            let result = self.unlink_peer(instance_id, peer).await;
            if let Err(err) = &result {
                warn!(
                    instance = instance_id,
                    zone = %peer.name,
                    error = %err,
                    "Replication link not removed"
                );
            }
            ReplicationReport::from_result(peer, result, ReplicationOutcome::Unlinked)
        });

        join_all(unlinks).await
    }

    async fn unlink_peer(&self, instance_id: &str, peer: &Zone) -> Result<()> {
        let namespace = naming::namespace(instance_id);
        // The management user is gone by now; peers are cleaned up as operator.
        let admin = self.connector.connect_operator(peer)?;
        absorb_gone(
            admin
                .delete_routing_policy(namespace, &naming::routing_policy(instance_id))
                .await,
        )?;
        absorb_gone(
            admin
                .delete_replication_upstream(namespace, &naming::replication_link(instance_id))
                .await,
        )
    }
}

/// Login URL of the management UI for `credentials` on `zone`
pub fn dashboard_url(zone: &Zone, credentials: &AdminCredentials) -> String {
    format!(
        "http://{}:{}/#/login/{}/{}",
        zone.host, zone.mgmt_port, credentials.username, credentials.password
    )
}

impl From<&AdminError> for ReplicationOutcome {
    fn from(err: &AdminError) -> Self {
        Self::Failed {
            error: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> Zone {
        Zone {
            name: "z1".to_string(),
            host: "h1".to_string(),
            port: 5672,
            mgmt_host: "m1".to_string(),
            mgmt_port: 15672,
            mgmt_user: "admin".to_string(),
            mgmt_pass: "admin".to_string(),
            trace: false,
        }
    }

    #[test]
    fn test_dashboard_url() {
        let creds = AdminCredentials::new("m-inst-42", "pw");
        assert_eq!(
            dashboard_url(&zone(), &creds),
            "http://h1:15672/#/login/m-inst-42/pw"
        );
    }

    #[test]
    fn test_report_serialization() {
        let report = ReplicationReport {
            zone: "z2".to_string(),
            outcome: ReplicationOutcome::from(&AdminError::transport("refused")),
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["zone"], "z2");
        assert_eq!(value["status"], "failed");
        assert!(value["error"].as_str().unwrap().contains("refused"));
        assert!(report.is_failed());
    }
}
