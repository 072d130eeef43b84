//! Configuration parser with environment variable substitution

use crate::{Config, ConfigError, Result, Zone};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// Parse a YAML configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parse YAML configuration from a string, resolving `${VAR}` from the process environment
pub fn parse_str(content: &str) -> Result<Config> {
    parse_with(content, |name| std::env::var(name).ok())
}

/// Parse YAML configuration from a string, resolving `${VAR}` from `env` only
pub fn parse_str_with_env(content: &str, env: &HashMap<String, String>) -> Result<Config> {
    parse_with(content, |name| env.get(name).cloned())
}

fn parse_with(content: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(content)?;
    for zone in &mut config.zones {
        resolve_zone(zone, &lookup)?;
    }
    validate_config(&config)?;
    Ok(config)
}

fn resolve_zone(zone: &mut Zone, lookup: &impl Fn(&str) -> Option<String>) -> Result<()> {
    for field in [
        &mut zone.name,
        &mut zone.host,
        &mut zone.mgmt_host,
        &mut zone.mgmt_user,
        &mut zone.mgmt_pass,
    ] {
        *field = substitute_with(field, lookup)?;
    }
    Ok(())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    // Check version
    if config.version != "1.0" {
        return Err(ConfigError::ValidationError(format!(
            "Unsupported version: {}, expected 1.0",
            config.version
        )));
    }

    if config.settings.request_timeout == Some(0) {
        return Err(ConfigError::ValidationError(
            "request_timeout must be greater than zero".to_string(),
        ));
    }

    validate_zones(&config.zones)
}

/// Validate a zone list: non-empty, unique names, usable endpoints
pub fn validate_zones(zones: &[Zone]) -> Result<()> {
    if zones.is_empty() {
        return Err(ConfigError::ValidationError(
            "At least one zone must be configured".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for zone in zones {
        if zone.name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "Zone name must not be empty".to_string(),
            ));
        }
        if !seen.insert(zone.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "Duplicate zone name '{}'",
                zone.name
            )));
        }
        if zone.host.trim().is_empty() || zone.mgmt_host.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Zone '{}' must define both host and mgmt_host",
                zone.name
            )));
        }
        if zone.port == 0 || zone.mgmt_port == 0 {
            return Err(ConfigError::ValidationError(format!(
                "Zone '{}' has a zero port",
                zone.name
            )));
        }
    }

    Ok(())
}

/// Substitute environment variables in a string
///
/// Supports `${VAR}` and `${VAR:-default}`.
pub fn substitute_env_vars(input: &str) -> Result<String> {
    substitute_with(input, &|name: &str| std::env::var(name).ok())
}

fn substitute_with(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> Result<String> {
    let mut result = input.to_string();
    let mut errors = Vec::new();

    for cap in ENV_VAR.captures_iter(input) {
        let full_match = &cap[0];
        let var_expr = &cap[1];

        // Handle default values: ${VAR:-default}
        let (var_name, default_value) = match var_expr.find(":-") {
            Some(pos) => (&var_expr[..pos], Some(&var_expr[pos + 2..])),
            None => (var_expr, None),
        };

        match (lookup(var_name), default_value) {
            (Some(value), _) => result = result.replace(full_match, &value),
            (None, Some(default)) => result = result.replace(full_match, default),
            (None, None) => errors.push(var_name.to_string()),
        }
    }

    if !errors.is_empty() {
        return Err(ConfigError::EnvVarNotFound(errors.join(", ")));
    }

    Ok(result)
}
