//! Shared state for command handlers

use anyhow::{Context, anyhow};
use std::sync::Arc;
use tally_core::compat::IndexLoader;
use tally_core::config::TallyConfig;
use tally_core::store::{CacheStore, connect};
use tally_core::thread::ThreadCacheManager;

/// Connected store and thread manager built from configuration
pub struct AppContext {
    pub config: TallyConfig,
    pub store: CacheStore,
    pub threads: ThreadCacheManager,
}

impl AppContext {
    pub async fn connect(config: TallyConfig) -> anyhow::Result<Self> {
        let backend = connect(&config.store)
            .await
            .context("Failed to connect to the key-value store")?;
        let store = CacheStore::new(backend);
        let threads = ThreadCacheManager::new(store.clone()).with_config(config.thread.clone());
        Ok(Self {
            config,
            store,
            threads,
        })
    }

    pub fn index_loader(&self) -> anyhow::Result<Arc<IndexLoader>> {
        index_loader(&self.config)
    }
}

/// Lazy loader for the configured topic mapping
pub fn index_loader(config: &TallyConfig) -> anyhow::Result<Arc<IndexLoader>> {
    let path = config.compatibility.mapping_path.clone().ok_or_else(|| {
        anyhow!("No topic mapping configured; pass --mapping or set TALLY_MAPPING_PATH")
    })?;
    Ok(Arc::new(IndexLoader::new(
        path,
        config.compatibility.forced_non_comparable.clone(),
    )))
}
