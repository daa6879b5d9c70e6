//! Catalog file loading

use super::types::{CategoryPattern, EndpointCatalog};
use crate::error::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::info;

/// Load endpoint entries from a JSON file
///
/// The file holds an array of `{"Name", "URL", "FilterableFields"}` objects.
pub fn load_catalog(
    path: impl AsRef<Path>,
    patterns: Vec<CategoryPattern>,
) -> Result<EndpointCatalog> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read endpoint catalog '{}': {}",
            path.display(),
            e
        ))
    })?;

    let catalog = EndpointCatalog::from_json_str(&content, patterns)?;
    info!(
        "Loaded {} endpoints from {}",
        catalog.entries().len(),
        path.display()
    );
    Ok(catalog)
}
