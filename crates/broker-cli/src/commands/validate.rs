use anyhow::{Context, Result};
use broker_config::{ZoneRegistry, parser};
use std::path::Path;

pub fn run(config_path: &Path) -> Result<()> {
    println!("Validating {}...", config_path.display());

    let config = parser::parse_file(config_path).context("Failed to parse configuration")?;
    let registry = ZoneRegistry::try_from(&config).context("Invalid zone list")?;

    println!("✓ Configuration valid");
    println!("  Version: {}", config.version);
    println!("  Default zone: {}", registry.default_zone().name);
    for zone in registry.iter() {
        println!(
            "  Zone '{}': data plane {}, management {}",
            zone.name,
            zone.data_plane_address(),
            zone.management_url()
        );
    }
    match &config.catalog {
        Some(catalog) => println!("  Services: {}", catalog.services.len()),
        None => println!("  Services: built-in catalog"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_accepts_good_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
version: "1.0"
zones:
  - name: z1
    host: h1
    mgmt_host: m1
    mgmt_user: admin
    mgmt_pass: secret
"#
        )
        .unwrap();

        assert!(run(file.path()).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_zone_list() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "version: \"1.0\"\nzones: []\n").unwrap();

        assert!(run(file.path()).is_err());
    }

    #[test]
    fn test_validate_rejects_missing_file() {
        assert!(run(Path::new("/nonexistent/broker.yaml")).is_err());
    }
}
