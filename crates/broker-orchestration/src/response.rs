//! Rendering of lifecycle outcomes for the marketplace protocol.
//!
//! `Conflict` and `Gone` are expected outcomes and map to 409 and 410 with
//! an empty body. Everything else is a 500 carrying only the error message.

use crate::binding::Bound;
use crate::provisioning::Provisioned;
use broker_admin::{AdminError, ErrorKind, Result};
use broker_config::Catalog;
use serde::Serialize;
use serde_json::{Value, json};

/// Transport-agnostic response: an HTTP-style status and a JSON body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    /// Status code
    pub status: u16,
    /// JSON body
    pub body: Value,
}

impl ApiResponse {
    /// Create a response
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Whether the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// 200 with the catalog
pub fn catalog(catalog: &Catalog) -> ApiResponse {
    ApiResponse::new(200, json!(catalog))
}

/// 201 with the dashboard URL
pub fn provisioned(provisioned: &Provisioned) -> ApiResponse {
    ApiResponse::new(201, json!({ "dashboard_url": provisioned.dashboard_url }))
}

/// 201 with the issued credentials and their zone
pub fn bound(bound: &Bound) -> ApiResponse {
    ApiResponse::new(
        201,
        json!({
            "credentials": {
                "uri": bound.credentials.uri,
                "host": bound.credentials.host,
            },
            "zone": bound.zone,
        }),
    )
}

/// 200 with an empty object
pub fn empty() -> ApiResponse {
    ApiResponse::new(200, json!({}))
}

/// Map a classified error to its response
pub fn error(err: &AdminError) -> ApiResponse {
    match err.kind() {
        ErrorKind::Conflict => ApiResponse::new(409, json!({})),
        ErrorKind::Gone => ApiResponse::new(410, json!({})),
        ErrorKind::Transport | ErrorKind::Internal => {
            ApiResponse::new(500, json!({ "description": err.message() }))
        }
    }
}

/// Render `result` with `ok` on success and [`error`] otherwise
pub fn render<T>(result: Result<T>, ok: impl FnOnce(&T) -> ApiResponse) -> ApiResponse {
    match result {
        Ok(value) => ok(&value),
        Err(err) => error(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Credentials;
    use broker_config::Zone;

    #[test]
    fn test_error_statuses() {
        assert_eq!(error(&AdminError::conflict("dup")).status, 409);
        assert_eq!(error(&AdminError::gone("missing")).status, 410);
        assert_eq!(error(&AdminError::conflict("dup")).body, json!({}));

        let transport = error(&AdminError::transport("connection refused"));
        assert_eq!(transport.status, 500);
        assert_eq!(transport.body["description"], "connection refused");
        assert!(!transport.is_success());

        assert_eq!(error(&AdminError::internal("bad zone")).status, 500);
    }

    #[test]
    fn test_provisioned_body() {
        let response = provisioned(&Provisioned {
            dashboard_url: "http://h1:15672/#/login/m-a/pw".to_string(),
            username: "m-a".to_string(),
            replication: vec![],
        });
        assert_eq!(response.status, 201);
        assert_eq!(
            response.body,
            json!({ "dashboard_url": "http://h1:15672/#/login/m-a/pw" })
        );
    }

    #[test]
    fn test_bound_body() {
        let zone = Zone {
            name: "z1".to_string(),
            host: "h1".to_string(),
            port: 5672,
            mgmt_host: "m1".to_string(),
            mgmt_port: 15672,
            mgmt_user: "admin".to_string(),
            mgmt_pass: "admin".to_string(),
            trace: false,
        };
        let response = bound(&Bound {
            binding_id: "b1".to_string(),
            zone: "z1".to_string(),
            credentials: Credentials::new(&zone, "a", "u-a".to_string(), "pw".to_string()),
        });

        assert_eq!(response.status, 201);
        assert_eq!(response.body["zone"], "z1");
        assert_eq!(response.body["credentials"]["uri"], "amqp://u-a:pw@h1:5672/a");
        assert_eq!(response.body["credentials"]["host"], "h1");
    }

    #[test]
    fn test_render() {
        assert_eq!(render(Ok(()), |_| empty()).status, 200);
        assert_eq!(
            render::<()>(Err(AdminError::gone("x")), |_| empty()).status,
            410
        );
    }
}
