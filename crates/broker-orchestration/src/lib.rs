//! # Broker Orchestration
//!
//! Provisioning and binding orchestration for RabbitMQ service instances
//! spread over one or more zones.
//!
//! An instance is a vhost on its home zone plus a management user holding
//! full access to it; peer zones federate the vhost from the home zone. A
//! binding is the shared tenant user of the instance. No state is kept
//! locally: every remote name derives from the instance identifier (see
//! [`naming`]), and the broker clusters are the system of record.
//!
//! ## Example
//!
//! ```rust,no_run
//! use broker_admin::HttpConnector;
//! use broker_orchestration::{ProvisionRequest, ServiceBroker};
//! use std::sync::Arc;
//!
//! # async fn example(config: broker_config::Config) -> anyhow::Result<()> {
//! let connector = Arc::new(HttpConnector::new(config.settings.request_timeout()));
//! let broker = ServiceBroker::new(&config, connector)?;
//!
//! let provisioned = broker
//!     .provision(&ProvisionRequest {
//!         instance_id: "inst-42".to_string(),
//!         zone: None,
//!     })
//!     .await?;
//! println!("{}", provisioned.dashboard_url);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod binding;
mod broker;
mod catalog;
mod compensation;
mod guard;
pub mod naming;
mod password;
mod provisioning;
pub mod response;

pub use binding::{BindingOrchestrator, Bound, Credentials};
pub use broker::{
    BindRequest, DeprovisionRequest, LifecycleRequest, ProvisionRequest, ServiceBroker,
    UnbindRequest,
};
pub use catalog::CatalogProvider;
pub use guard::{InstanceGuard, InstanceLock};
pub use password::{PASSWORD_LENGTH, generate_password};
pub use provisioning::{
    Deprovisioned, Provisioned, ProvisioningOrchestrator, ReplicationOutcome, ReplicationReport,
    dashboard_url,
};
pub use response::ApiResponse;

pub use broker_admin::{AdminError, ErrorKind};
