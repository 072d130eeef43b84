//! Static description of the offered service.

use broker_config::{Catalog, CatalogService, Plan};

/// Serves the catalog published to the marketplace
#[derive(Debug, Clone)]
pub struct CatalogProvider {
    catalog: Catalog,
}

impl CatalogProvider {
    /// Provider serving `catalog`
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Provider serving the configured catalog, or the built-in one
    pub fn from_config(catalog: Option<Catalog>) -> Self {
        catalog.map(Self::new).unwrap_or_else(Self::builtin)
    }

    /// One RabbitMQ service with a single default plan
    pub fn builtin() -> Self {
        Self::new(Catalog {
            services: vec![CatalogService {
                id: "rabbitmq".to_string(),
                name: "rabbitmq".to_string(),
                description: "RabbitMQ Message Broker".to_string(),
                bindable: true,
                tags: vec!["rabbitmq".to_string(), "messaging".to_string()],
                plans: vec![Plan {
                    id: "default".to_string(),
                    name: "default".to_string(),
                    description: "Default RabbitMQ plan represented as a unique broker's vhost."
                        .to_string(),
                }],
            }],
        })
    }

    /// The catalog
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl Default for CatalogProvider {
    fn default() -> Self {
        Self::builtin()
    }
}
