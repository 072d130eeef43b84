//! Shared fixtures for orchestration tests

#![allow(dead_code)]

use broker_admin::memory::{MemoryCluster, MemoryConnector};
use broker_config::{Config, ReplicationSettings, Settings, Zone, ZoneRegistry};
use broker_orchestration::{BindingOrchestrator, ProvisioningOrchestrator, ServiceBroker};
use std::sync::Arc;

/// A zone named `name` whose data plane lives on `host`
pub fn zone(name: &str, host: &str) -> Zone {
    Zone {
        name: name.to_string(),
        host: host.to_string(),
        port: 5672,
        mgmt_host: format!("mgmt-{}", host),
        mgmt_port: 15672,
        mgmt_user: "admin".to_string(),
        mgmt_pass: "admin".to_string(),
        trace: false,
    }
}

/// Configuration over `zones` with default settings
pub fn config(zones: Vec<Zone>) -> Config {
    Config {
        version: "1.0".to_string(),
        settings: Settings::default(),
        replication: ReplicationSettings::default(),
        catalog: None,
        zones,
    }
}

/// Orchestrators and the in-memory cluster behind them
pub struct Harness {
    pub cluster: Arc<MemoryCluster>,
    pub provisioning: ProvisioningOrchestrator,
    pub binding: BindingOrchestrator,
}

impl Harness {
    pub fn new(zones: Vec<Zone>) -> Self {
        let cluster = MemoryCluster::new();
        let connector = Arc::new(MemoryConnector::new(cluster.clone()));
        let registry = Arc::new(ZoneRegistry::new(zones).unwrap());
        Self {
            provisioning: ProvisioningOrchestrator::new(
                registry.clone(),
                connector.clone(),
                ReplicationSettings::default(),
            ),
            binding: BindingOrchestrator::new(registry, connector),
            cluster,
        }
    }

    pub fn single_zone() -> Self {
        Self::new(vec![zone("z1", "h1")])
    }

    pub fn three_zones() -> Self {
        Self::new(vec![zone("z1", "h1"), zone("z2", "h2"), zone("z3", "h3")])
    }
}

/// A service broker over `zones` and the in-memory cluster behind it
pub fn broker(zones: Vec<Zone>) -> (Arc<MemoryCluster>, ServiceBroker) {
    let cluster = MemoryCluster::new();
    let connector = Arc::new(MemoryConnector::new(cluster.clone()));
    let broker = ServiceBroker::new(&config(zones), connector).unwrap();
    (cluster, broker)
}
