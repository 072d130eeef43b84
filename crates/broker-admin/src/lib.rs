//! # Broker Admin
//!
//! Thin, honest mapping from administrative intents to RabbitMQ management
//! API calls against one zone.
//!
//! Every operation returns a classified [`AdminError`] on failure:
//! `Conflict` when an entity already exists, `Gone` when it does not exist
//! where it had to, `Transport` for everything the network or the remote
//! API did unexpectedly, and `Internal` for configuration mistakes. Nothing
//! in this crate retries.
//!
//! ## Example
//!
//! ```rust,no_run
//! use broker_admin::{AdminConnector, HttpConnector};
//! use std::time::Duration;
//!
//! # async fn example(zone: broker_config::Zone) -> broker_admin::Result<()> {
//! let connector = HttpConnector::new(Duration::from_secs(10));
//! let admin = connector.connect_operator(&zone)?;
//!
//! if !admin.namespace_exists("inst-42").await? {
//!     admin.create_namespace("inst-42", false).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unsafe_code)]

mod api;
mod error;
mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use api::{
    AdminApi, AdminConnector, AdminCredentials, RoutingPolicy, USER_TAGS, UpstreamDefinition,
};
pub use error::{AdminError, ErrorKind, Result};
pub use http::{HttpAdminClient, HttpConnector, classify};
