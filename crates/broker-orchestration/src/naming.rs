//! Derivation of remote resource names from instance identifiers.
//!
//! Nothing is stored locally: every remote resource belonging to an
//! instance is found again from its identifier alone, which lets an operator
//! inspect or repair an instance by looking at the broker cluster.
//!
//! | Resource | Name |
//! |---|---|
//! | namespace (vhost) | `<instance>` |
//! | management user | `m-<instance>` |
//! | tenant (binding) user | `u-<instance>` |
//! | federation upstream | `f-<instance>` |
//! | federation policy | `p-<instance>` |
//!
//! Derived names are embedded verbatim in AMQP URIs and dashboard URLs, so
//! instance identifiers are restricted to URI-unreserved characters
//! (see [`validate_instance_id`]).

use broker_admin::{AdminError, Result};

/// Prefix of management-scoped users
pub const MANAGEMENT_PREFIX: &str = "m-";

/// Prefix of tenant binding users
pub const TENANT_PREFIX: &str = "u-";

/// Prefix of federation upstreams
pub const UPSTREAM_PREFIX: &str = "f-";

/// Prefix of federation policies
pub const POLICY_PREFIX: &str = "p-";

/// Reject identifiers that are empty or contain anything but ASCII letters,
/// digits, `-`, `_`, `.` and `~`
pub fn validate_instance_id(instance_id: &str) -> Result<()> {
    let unreserved = |c: char| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~');
    if instance_id.is_empty() || !instance_id.chars().all(unreserved) {
        return Err(AdminError::internal(format!(
            "Invalid instance id '{}': only ASCII letters, digits, '-', '_', '.' and '~' are allowed",
            instance_id
        )));
    }
    Ok(())
}

/// Namespace of an instance
pub fn namespace(instance_id: &str) -> &str {
    instance_id
}

/// Management user of an instance
pub fn management_user(instance_id: &str) -> String {
    format!("{}{}", MANAGEMENT_PREFIX, instance_id)
}

/// Tenant user shared by every binding of an instance
pub fn tenant_user(instance_id: &str) -> String {
    format!("{}{}", TENANT_PREFIX, instance_id)
}

/// Federation upstream wiring an instance's namespace across zones
pub fn replication_link(instance_id: &str) -> String {
    format!("{}{}", UPSTREAM_PREFIX, instance_id)
}

/// Policy applying the federation upstream
pub fn routing_policy(instance_id: &str) -> String {
    format!("{}{}", POLICY_PREFIX, instance_id)
}
