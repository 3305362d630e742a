//! Site fixture files.
//!
//! A fixture is a YAML (or JSON) document with a top-level `sites` list. It
//! stands in for the upstream site provider in offline runs.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::types::Site;
use crate::ConfigError;

#[derive(Debug, Deserialize)]
pub struct SitesFile {
    pub sites: Vec<Site>,
}

/// Load and validate a sites fixture from disk.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_sites(path: &Path) -> Result<SitesFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SitesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_sites(&content)
}

/// Parse and validate a sites fixture from an in-memory document.
///
/// # Errors
///
/// Returns `ConfigError::SitesFileParse` on malformed YAML/JSON and
/// `ConfigError::Validation` on blank or duplicate ids and out-of-range
/// coordinates.
pub fn parse_sites(content: &str) -> Result<SitesFile, ConfigError> {
    let sites_file: SitesFile = serde_yaml::from_str(content)?;
    validate_sites(&sites_file)?;
    Ok(sites_file)
}

fn validate_sites(sites_file: &SitesFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for site in &sites_file.sites {
        if site.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "site id must be non-empty".to_string(),
            ));
        }

        if !site.coordinate.is_valid() {
            return Err(ConfigError::Validation(format!(
                "site '{}' has out-of-range coordinate ({}, {})",
                site.id, site.coordinate.lat, site.coordinate.lon
            )));
        }

        if !seen_ids.insert(site.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate site id: '{}'",
                site.id
            )));
        }
    }

    Ok(())
}
