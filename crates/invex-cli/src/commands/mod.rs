//! Subcommands.

pub mod batch;
pub mod config;
pub mod extract;
pub mod patterns;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use invex_core::registry::{self, EmptyStore, JsonPatternStore, PatternRegistry};
use invex_core::{InvexConfig, InvoiceEngine};

/// Platform configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// Load the configuration: an explicit path must exist, the platform file is
/// used when present, defaults otherwise.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<InvexConfig> {
    if let Some(path) = config_path {
        return Ok(InvexConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Using configuration at {}", default_path.display());
        Ok(InvexConfig::from_file(&default_path)?)
    } else {
        Ok(InvexConfig::default())
    }
}

/// Load the process-wide pattern registry from the configured store.
pub fn load_registry(config: &InvexConfig) -> Arc<PatternRegistry> {
    match &config.patterns.store_path {
        Some(path) => registry::init_global(&JsonPatternStore::new(path)),
        None => registry::init_global(&EmptyStore),
    }
}

/// Engine over the process-wide registry.
pub fn build_engine(config: InvexConfig) -> InvoiceEngine {
    let registry = load_registry(&config);
    InvoiceEngine::with_registry(config, registry)
}
