//! RabbitMQ management HTTP API backend.

use crate::api::{
    AdminApi, AdminConnector, AdminCredentials, RoutingPolicy, USER_TAGS, UpstreamDefinition,
};
use crate::error::{AdminError, Result};
use async_trait::async_trait;
use broker_config::Zone;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Client for one zone's management API
pub struct HttpAdminClient {
    client: Client,
    base: Url,
    endpoint: String,
    credentials: AdminCredentials,
}

impl HttpAdminClient {
    /// Create a client for `endpoint` (e.g. `http://mgmt:15672`)
    ///
    /// Every request made by the client is bounded by `timeout`; expiry is
    /// reported as a `Transport` error.
    pub fn new(endpoint: &str, credentials: AdminCredentials, timeout: Duration) -> Result<Self> {
        let base = Url::parse(endpoint).map_err(|e| {
            AdminError::internal(format!("Invalid management endpoint '{}': {}", endpoint, e))
        })?;
        if base.cannot_be_a_base() {
            return Err(AdminError::internal(format!(
                "Management endpoint '{}' cannot carry a path",
                endpoint
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AdminError::internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            endpoint: endpoint.to_string(),
            credentials,
        })
    }

    /// URL of `/api/<segments...>`, each segment percent-encoded
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                AdminError::internal(format!(
                    "Management endpoint '{}' cannot carry a path",
                    self.endpoint
                ))
            })?;
            path.pop_if_empty().push("api").extend(segments);
        }
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<serde_json::Value>,
    ) -> Result<StatusCode> {
        let url = self.url(segments)?;
        debug!(method = %method, url = %url, "Management request");

        let mut request = self
            .client
            .request(method, url)
            .basic_auth(&self.credentials.username, Some(&self.credentials.password));
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        Ok(response.status())
    }

    async fn exists(&self, segments: &[&str]) -> Result<bool> {
        let status = self.send(Method::GET, segments, None).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        classify(status, &segments.join("/")).map(|_| true)
    }

    async fn put<T: Serialize + ?Sized>(&self, segments: &[&str], body: &T) -> Result<()> {
        let body = serde_json::to_value(body)
            .map_err(|e| AdminError::internal(format!("Failed to encode request body: {}", e)))?;
        let status = self.send(Method::PUT, segments, Some(body)).await?;
        classify(status, &segments.join("/"))
    }

    async fn delete(&self, segments: &[&str]) -> Result<()> {
        let status = self.send(Method::DELETE, segments, None).await?;
        classify(status, &segments.join("/"))
    }
}

/// Map a management API status to an outcome
pub fn classify(status: StatusCode, entity: &str) -> Result<()> {
    match status {
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
            Ok(())
        }
        StatusCode::NOT_FOUND => Err(AdminError::gone(format!("Entity not found: [{}]", entity))),
        other => Err(AdminError::transport(format!(
            "Unexpected response received: [{}] for [{}]",
            other.as_u16(),
            entity
        ))),
    }
}

#[async_trait]
impl AdminApi for HttpAdminClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn namespace_exists(&self, name: &str) -> Result<bool> {
        self.exists(&["vhosts", name]).await
    }

    async fn put_namespace(&self, name: &str, tracing: bool) -> Result<()> {
        self.put(&["vhosts", name], &json!({ "tracing": tracing }))
            .await
    }

    async fn delete_namespace(&self, name: &str) -> Result<()> {
        self.delete(&["vhosts", name]).await
    }

    async fn user_exists(&self, username: &str) -> Result<bool> {
        self.exists(&["users", username]).await
    }

    async fn put_user(&self, username: &str, password: &str) -> Result<()> {
        self.put(
            &["users", username],
            &json!({ "password": password, "tags": USER_TAGS }),
        )
        .await
    }

    async fn delete_user(&self, username: &str) -> Result<()> {
        self.delete(&["users", username]).await
    }

    async fn grant_full_access(&self, username: &str, namespace: &str) -> Result<()> {
        self.put(
            &["permissions", namespace, username],
            &json!({ "configure": ".*", "write": ".*", "read": ".*" }),
        )
        .await
    }

    async fn set_replication_upstream(
        &self,
        namespace: &str,
        link: &str,
        definition: &UpstreamDefinition,
    ) -> Result<()> {
        self.put(
            &["parameters", "federation-upstream", namespace, link],
            &json!({ "value": definition }),
        )
        .await
    }

    async fn delete_replication_upstream(&self, namespace: &str, link: &str) -> Result<()> {
        self.delete(&["parameters", "federation-upstream", namespace, link])
            .await
    }

    async fn set_routing_policy(
        &self,
        namespace: &str,
        policy: &str,
        definition: &RoutingPolicy,
    ) -> Result<()> {
        self.put(&["policies", namespace, policy], definition).await
    }

    async fn delete_routing_policy(&self, namespace: &str, policy: &str) -> Result<()> {
        self.delete(&["policies", namespace, policy]).await
    }
}

/// Connector producing [`HttpAdminClient`]s with a shared request timeout
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    /// Create a connector whose clients time out after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl AdminConnector for HttpConnector {
    fn connect(&self, zone: &Zone, credentials: &AdminCredentials) -> Result<Arc<dyn AdminApi>> {
        let client =
            HttpAdminClient::new(&zone.management_url(), credentials.clone(), self.timeout)?;
        Ok(Arc::new(client))
    }
}
