//! Environment variable-based configuration overrides

use super::model::{StoreBackend, TallyConfig};
use crate::error::{TallyError, TallyResult};
use std::env;
use std::path::PathBuf;

/// Apply overrides from the process environment
///
/// Recognized variables:
/// - `USE_KV=false` forces the in-memory store
/// - `KV_REST_API_URL` / `KV_REST_API_TOKEN` configure the remote store
///   (`REDIS_URL` is accepted as the URL when the former is unset)
/// - `TALLY_MAPPING_PATH`, `TALLY_MEMORY_CAPACITY`, `TALLY_LOG_LEVEL`, `TALLY_LOG_FORMAT`
pub fn apply_env(config: &mut TallyConfig) -> TallyResult<()> {
    apply_env_with(config, |name| env::var(name).ok())
}

/// Apply overrides using an arbitrary variable lookup
pub fn apply_env_with<F>(config: &mut TallyConfig, lookup: F) -> TallyResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(url) = var("KV_REST_API_URL").or_else(|| var("REDIS_URL")) {
        config.store.rest_url = Some(url);
    }
    if let Some(token) = var("KV_REST_API_TOKEN") {
        config.store.rest_token = Some(token);
    }

    if let Some(use_kv) = var("USE_KV") {
        match use_kv.trim().to_ascii_lowercase().as_str() {
            "false" | "0" | "no" => config.store.backend = StoreBackend::Memory,
            "true" | "1" | "yes" => {
                if config.store.backend == StoreBackend::Memory {
                    config.store.backend = StoreBackend::Auto;
                }
            }
            other => {
                return Err(TallyError::config_with_context(
                    format!("Invalid USE_KV value '{}'", other),
                    "expected true or false",
                ));
            }
        }
    }

    if let Some(capacity) = var("TALLY_MEMORY_CAPACITY") {
        config.store.memory_capacity = capacity
            .parse()
            .map_err(|_| TallyError::config("Invalid TALLY_MEMORY_CAPACITY value"))?;
    }

    if let Some(path) = var("TALLY_MAPPING_PATH") {
        config.compatibility.mapping_path = Some(PathBuf::from(path));
    }

    if let Some(level) = var("TALLY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = var("TALLY_LOG_FORMAT") {
        config.logging.format = format;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_rest_settings_from_env() {
        let mut config = TallyConfig::default();
        apply_env_with(
            &mut config,
            lookup(&[
                ("KV_REST_API_URL", "https://kv.example.com"),
                ("KV_REST_API_TOKEN", "secret"),
            ]),
        )
        .unwrap();
        assert!(config.store.has_rest());
        assert_eq!(config.store.backend, StoreBackend::Auto);
    }

    #[test]
    fn test_redis_url_alias() {
        let mut config = TallyConfig::default();
        apply_env_with(&mut config, lookup(&[("REDIS_URL", "https://redis.example.com")])).unwrap();
        assert_eq!(config.store.rest_url.as_deref(), Some("https://redis.example.com"));
        assert!(!config.store.has_rest());
    }

    #[test]
    fn test_use_kv_false_forces_memory() {
        let mut config = TallyConfig::default();
        apply_env_with(
            &mut config,
            lookup(&[
                ("USE_KV", "false"),
                ("KV_REST_API_URL", "https://kv.example.com"),
                ("KV_REST_API_TOKEN", "secret"),
            ]),
        )
        .unwrap();
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = TallyConfig::default();
        assert!(apply_env_with(&mut config, lookup(&[("USE_KV", "maybe")])).is_err());
        assert!(apply_env_with(&mut config, lookup(&[("TALLY_MEMORY_CAPACITY", "lots")])).is_err());
    }

    #[test]
    fn test_mapping_and_logging_overrides() {
        let mut config = TallyConfig::default();
        apply_env_with(
            &mut config,
            lookup(&[
                ("TALLY_MAPPING_PATH", "/srv/mapping.json"),
                ("TALLY_LOG_LEVEL", "debug"),
                ("TALLY_MEMORY_CAPACITY", "250"),
            ]),
        )
        .unwrap();
        assert_eq!(
            config.compatibility.mapping_path,
            Some(PathBuf::from("/srv/mapping.json"))
        );
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.store.memory_capacity, 250);
    }
}
