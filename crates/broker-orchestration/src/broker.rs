//! The broker facade used by transports.
//!
//! [`ServiceBroker`] receives already-parsed lifecycle requests, resolves
//! the zone, serialises work per instance and hands off to the
//! orchestrators. [`ServiceBroker::handle`] additionally renders the outcome
//! as an [`ApiResponse`].

use crate::binding::{BindingOrchestrator, Bound};
use crate::catalog::CatalogProvider;
use crate::guard::InstanceGuard;
use crate::provisioning::{Deprovisioned, Provisioned, ProvisioningOrchestrator};
use crate::response::{self, ApiResponse};
use broker_admin::{AdminConnector, AdminError, Result};
use broker_config::{Catalog, Config, ConfigError, ZoneRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Create a service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionRequest {
    /// Platform-assigned instance identifier
    pub instance_id: String,
    /// Home zone; the first configured zone when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// Delete a service instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeprovisionRequest {
    /// Platform-assigned instance identifier
    pub instance_id: String,
    /// Home zone; the first configured zone when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// Issue credentials for an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindRequest {
    /// Platform-assigned instance identifier
    pub instance_id: String,
    /// Platform-assigned binding identifier
    pub binding_id: String,
    /// Zone to bind in; the first configured zone when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// Revoke credentials of an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnbindRequest {
    /// Platform-assigned instance identifier
    pub instance_id: String,
    /// Platform-assigned binding identifier
    pub binding_id: String,
    /// Zone to unbind in; the first configured zone when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

/// Any request a transport can hand to [`ServiceBroker::handle`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleRequest {
    /// Read the catalog
    Catalog,
    /// See [`ProvisionRequest`]
    Provision(ProvisionRequest),
    /// See [`DeprovisionRequest`]
    Deprovision(DeprovisionRequest),
    /// See [`BindRequest`]
    Bind(BindRequest),
    /// See [`UnbindRequest`]
    Unbind(UnbindRequest),
}

/// Stateless lifecycle engine over a fixed set of zones
pub struct ServiceBroker {
    registry: Arc<ZoneRegistry>,
    provisioning: ProvisioningOrchestrator,
    binding: BindingOrchestrator,
    catalog: CatalogProvider,
    guard: InstanceGuard,
}

impl ServiceBroker {
    /// Build a broker from validated configuration
    pub fn new(
        config: &Config,
        connector: Arc<dyn AdminConnector>,
    ) -> std::result::Result<Self, ConfigError> {
        let registry = Arc::new(ZoneRegistry::try_from(config)?);
        Ok(Self {
            provisioning: ProvisioningOrchestrator::new(
                Arc::clone(&registry),
                Arc::clone(&connector),
                config.replication.clone(),
            ),
            binding: BindingOrchestrator::new(Arc::clone(&registry), connector),
            catalog: CatalogProvider::from_config(config.catalog.clone()),
            guard: InstanceGuard::new(),
            registry,
        })
    }

    /// Configured zones
    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    /// Offered services and plans
    pub fn catalog(&self) -> &Catalog {
        self.catalog.catalog()
    }

    /// Provision an instance on its home zone
    pub async fn provision(&self, request: &ProvisionRequest) -> Result<Provisioned> {
        let zone = self.zone_name(request.zone.as_deref())?;
        let _lock = self.guard.lock(&request.instance_id).await;
        info!(instance = %request.instance_id, zone = %zone, "Provisioning");

        let provisioned = self
            .provisioning
            .provision(&request.instance_id, &zone)
            .await?;
        for report in provisioned.warnings() {
            warn!(
                instance = %request.instance_id,
                zone = %report.zone,
                "Provisioned without replication from this zone"
            );
        }
        Ok(provisioned)
    }

    /// Deprovision an instance from its home zone
    pub async fn deprovision(&self, request: &DeprovisionRequest) -> Result<Deprovisioned> {
        let zone = self.zone_name(request.zone.as_deref())?;
        let _lock = self.guard.lock(&request.instance_id).await;
        info!(instance = %request.instance_id, zone = %zone, "Deprovisioning");

        self.provisioning
            .deprovision(&request.instance_id, &zone)
            .await
    }

    /// Bind an instance
    pub async fn bind(&self, request: &BindRequest) -> Result<Bound> {
        let zone = self.zone_name(request.zone.as_deref())?;
        let _lock = self.guard.lock(&request.instance_id).await;
        info!(
            instance = %request.instance_id,
            binding = %request.binding_id,
            zone = %zone,
            "Binding"
        );

        self.binding
            .bind(&request.instance_id, &request.binding_id, &zone)
            .await
    }

    /// Unbind an instance
    pub async fn unbind(&self, request: &UnbindRequest) -> Result<()> {
        let zone = self.zone_name(request.zone.as_deref())?;
        let _lock = self.guard.lock(&request.instance_id).await;
        info!(
            instance = %request.instance_id,
            binding = %request.binding_id,
            zone = %zone,
            "Unbinding"
        );

        self.binding
            .unbind(&request.instance_id, &request.binding_id, &zone)
            .await
    }

    /// Run a request and render its outcome
    pub async fn handle(&self, request: &LifecycleRequest) -> ApiResponse {
        let response = match request {
            LifecycleRequest::Catalog => response::catalog(self.catalog()),
            LifecycleRequest::Provision(req) => {
                response::render(self.provision(req).await, response::provisioned)
            }
            LifecycleRequest::Deprovision(req) => {
                response::render(self.deprovision(req).await, |_| response::empty())
            }
            LifecycleRequest::Bind(req) => response::render(self.bind(req).await, response::bound),
            LifecycleRequest::Unbind(req) => {
                response::render(self.unbind(req).await, |_| response::empty())
            }
        };

        if !response.is_success() {
            warn!(status = response.status, body = %response.body, "Request failed");
        }
        response
    }

    fn zone_name(&self, requested: Option<&str>) -> Result<String> {
        match requested {
            Some(name) => self
                .registry
                .require(name)
                .map(|zone| zone.name.clone())
                .map_err(AdminError::from),
            None => Ok(self.registry.default_zone().name.clone()),
        }
    }
}
