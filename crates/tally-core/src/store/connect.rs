//! Backend selection with fallback

use super::backend::KeyValueStore;
use super::memory::MemoryStore;
use super::rest::RestStore;
use crate::config::{StoreBackend, StoreConfig};
use crate::error::{TallyError, TallyResult};
use std::sync::Arc;

/// Build the store handle for this process
///
/// `Auto` prefers the remote store and falls back to memory when it is not
/// configured or does not answer a ping. `Rest` fails instead of falling back.
pub async fn connect(config: &StoreConfig) -> TallyResult<Arc<dyn KeyValueStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(memory(config)),
        StoreBackend::Rest => {
            let store = connect_rest(config).await?;
            Ok(Arc::new(store))
        }
        StoreBackend::Auto => {
            if !config.has_rest() {
                tracing::info!("No remote key-value store configured, using in-memory store");
                return Ok(memory(config));
            }
            match connect_rest(config).await {
                Ok(store) => Ok(Arc::new(store)),
                Err(e) => {
                    tracing::warn!(
                        "Remote key-value store unavailable: {}. Falling back to in-memory store.",
                        e
                    );
                    Ok(memory(config))
                }
            }
        }
    }
}

fn memory(config: &StoreConfig) -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::with_sweeper(
        config.memory_capacity,
        config.sweep_interval,
    ))
}

async fn connect_rest(config: &StoreConfig) -> TallyResult<RestStore> {
    let (Some(url), Some(token)) = (config.rest_url.as_deref(), config.rest_token.as_deref())
    else {
        return Err(TallyError::config_with_context(
            "Remote key-value store selected but not configured",
            "set KV_REST_API_URL and KV_REST_API_TOKEN",
        ));
    };

    tracing::info!("Connecting to remote key-value store at {}", url);
    let store = RestStore::new(url, token, config.request_timeout)?;
    store.ping().await?;
    Ok(store)
}
