//! Reverse-order cleanup of resources created by a failed operation.

use broker_admin::{AdminApi, Result};
use tracing::{debug, error, info};

/// A remote resource created during the current operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Created {
    Namespace(String),
    User(String),
}

/// Resources created so far, undone newest first on failure
#[derive(Debug, Default)]
pub(crate) struct Rollback {
    created: Vec<Created>,
}

impl Rollback {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, resource: Created) {
        self.created.push(resource);
    }

    /// Delete every recorded resource in reverse creation order
    ///
    /// Failures are logged and skipped: the caller returns the error that
    /// triggered the rollback, never one raised here.
    pub(crate) async fn run(self, admin: &dyn AdminApi, instance_id: &str) {
        for resource in self.created.into_iter().rev() {
            let result = match &resource {
                Created::Namespace(name) => admin.delete_namespace(name).await,
                Created::User(name) => admin.delete_user(name).await,
            };
            match result {
                Ok(()) => info!(instance = instance_id, ?resource, "Rolled back"),
                Err(err) if err.is_gone() => {
                    debug!(instance = instance_id, ?resource, "Already absent during rollback")
                }
                Err(err) => error!(
                    instance = instance_id,
                    ?resource,
                    endpoint = admin.endpoint(),
                    error = %err,
                    "Rollback step failed, resource left behind"
                ),
            }
        }
    }
}

/// Treat an absent entity as already deleted
pub(crate) fn absorb_gone(result: Result<()>) -> Result<()> {
    match result {
        Err(err) if err.is_gone() => Ok(()),
        other => other,
    }
}
