//! Immutable registry of configured zones.

use crate::{ConfigError, Result, Zone, parser::validate_zones};

/// Read-only, ordered set of zones resolved once at startup
#[derive(Debug, Clone)]
pub struct ZoneRegistry {
    zones: Vec<Zone>,
}

impl ZoneRegistry {
    /// Build a registry from a zone list, rejecting empty lists and duplicate names
    pub fn new(zones: Vec<Zone>) -> Result<Self> {
        validate_zones(&zones)?;
        Ok(Self { zones })
    }

    /// Look up a zone by name
    pub fn get(&self, name: &str) -> Option<&Zone> {
        self.zones.iter().find(|zone| zone.name == name)
    }

    /// Look up a zone by name, failing when it is not configured
    pub fn require(&self, name: &str) -> Result<&Zone> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnknownZone(name.to_string()))
    }

    /// First declared zone; the implicit home zone of single-zone deployments
    pub fn default_zone(&self) -> &Zone {
        // Non-emptiness is checked in `new`.
        &self.zones[0]
    }

    /// Every zone except `name`, in declaration order
    pub fn peers_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Zone> + 'a {
        self.zones.iter().filter(move |zone| zone.name != name)
    }

    /// All zones in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// Number of configured zones
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Always false for a constructed registry
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }
}

impl TryFrom<&crate::Config> for ZoneRegistry {
    type Error = ConfigError;

    fn try_from(config: &crate::Config) -> Result<Self> {
        Self::new(config.zones.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone(name: &str) -> Zone {
        Zone {
            name: name.to_string(),
            host: format!("{}-amqp", name),
            port: 5672,
            mgmt_host: format!("{}-mgmt", name),
            mgmt_port: 15672,
            mgmt_user: "admin".to_string(),
            mgmt_pass: "admin".to_string(),
            trace: false,
        }
    }

    #[test]
    fn test_lookup_and_peers() {
        let registry = ZoneRegistry::new(vec![zone("a"), zone("b"), zone("c")]).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.default_zone().name, "a");
        assert_eq!(registry.get("b").unwrap().host, "b-amqp");
        assert!(registry.get("d").is_none());

        let peers: Vec<_> = registry.peers_of("b").map(|z| z.name.as_str()).collect();
        assert_eq!(peers, vec!["a", "c"]);
    }

    #[test]
    fn test_require_unknown_zone() {
        let registry = ZoneRegistry::new(vec![zone("a")]).unwrap();
        assert!(matches!(
            registry.require("nope"),
            Err(ConfigError::UnknownZone(name)) if name == "nope"
        ));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        assert!(ZoneRegistry::new(vec![]).is_err());
        assert!(ZoneRegistry::new(vec![zone("a"), zone("a")]).is_err());
    }
}
