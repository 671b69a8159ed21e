//! Configuration
//!
//! Settings come from a file (TOML, YAML or JSON by extension) and are
//! then overridden by environment variables.

mod env_loader;
mod file_loader;
mod model;

pub use env_loader::{apply_env, apply_env_with};
pub use file_loader::{default_config_path, load_from_file};
pub use model::{
    CompatibilityConfig, GateConfig, LoggingConfig, StoreBackend, StoreConfig, TallyConfig,
    ThreadConfig,
};

use crate::error::TallyResult;
use std::path::Path;

/// Load configuration from `path` (or the default location) and the environment
pub fn load_config(path: Option<&Path>) -> TallyResult<TallyConfig> {
    let mut config = match path {
        Some(path) => load_from_file(path)?,
        None => match default_config_path() {
            Some(path) => load_from_file(&path)?,
            None => TallyConfig::default(),
        },
    };
    apply_env(&mut config)?;
    Ok(config)
}
