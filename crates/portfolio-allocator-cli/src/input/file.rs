use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

use portfolio_allocator_core::market_data::MarketAssumptions;
use portfolio_allocator_core::AllocatorError;

/// Read a JSON file and deserialise into a typed struct.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T, Box<dyn std::error::Error>> {
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;
    let value: T = serde_json::from_str(&contents).map_err(|e| AllocatorError::InvalidInput {
        field: canonical.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(value)
}

/// Load a market assumption table from JSON, or YAML when the extension is
/// `.yaml`/`.yml`. The built-in table is used when `path` is `None`.
pub fn read_assumptions(path: Option<&str>) -> Result<MarketAssumptions, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(MarketAssumptions::default());
    };
    let canonical = resolve_path(path)?;
    let contents = fs::read_to_string(&canonical)
        .map_err(|e| format!("Failed to read '{}': {}", canonical.display(), e))?;

    let is_yaml = matches!(
        canonical.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if !is_yaml {
        return Ok(MarketAssumptions::from_json(&contents)?);
    }
    let assumptions: MarketAssumptions =
        serde_yaml::from_str(&contents).map_err(|e| AllocatorError::InvalidInput {
            field: canonical.display().to_string(),
            reason: e.to_string(),
        })?;
    assumptions.validate()?;
    Ok(assumptions)
}

/// Resolve and validate the path, preventing directory traversal.
fn resolve_path(path: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let p = Path::new(path);
    let canonical = if p.is_absolute() {
        p.to_path_buf()
    } else {
        std::env::current_dir()?.join(p)
    };

    if !canonical.exists() {
        return Err(format!("File not found: {}", canonical.display()).into());
    }

    if !canonical.is_file() {
        return Err(format!("Not a file: {}", canonical.display()).into());
    }

    Ok(canonical)
}
