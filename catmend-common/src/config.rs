//! Configuration file loading
//!
//! TOML file settings sit below command-line and environment overrides,
//! which the binaries resolve themselves. A missing TOML file is never
//! fatal; callers fall back to defaults with a warning.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default configuration file path for the platform
/// (`~/.config/catmend/<file_name>` on Linux, the platform equivalent
/// elsewhere).
pub fn default_config_path(file_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("catmend").join(file_name))
}

/// Parse a TOML configuration file into `T`.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("failed to read {}: {}", path.display(), e))
    })?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
}

/// Load a TOML configuration file, falling back to `T::default()` when the
/// file does not exist. A present-but-unparsable file is still an error.
pub fn load_toml_or_default<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match default_config_path("enrich.toml") {
            Some(p) => p,
            None => return Ok(T::default()),
        },
    };

    if !path.exists() {
        warn!(
            path = %path.display(),
            "Config file not found, using compiled defaults"
        );
        return Ok(T::default());
    }

    load_toml(&path)
}
