pub mod cache;
pub mod estimator;
pub mod model_store;
pub mod predictor;
pub mod proximity;
pub mod synth;

use crate::config::Config;
use std::sync::Arc;
use std::time::Duration;

use cache::{MemoryResultCache, RedisResultCache, ResultCache, PURGE_INTERVAL};
use model_store::{FileModelStore, ModelStore};
use predictor::{EtaModel, TrainConfig};

/// Shared request context: the single model plus its collaborators.
pub struct AppState {
    pub config: Config,
    pub model: Arc<EtaModel>,
    pub cache: Arc<dyn ResultCache>,
    pub train_config: TrainConfig,
    pub cache_ttl: Duration,
}

impl AppState {
    /// Wires the Redis cache and file model store, then tries to load a model.
    ///
    /// Must run inside a tokio runtime when the in-process cache is selected.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let cache: Arc<dyn ResultCache> = match &config.redis_url {
            Some(url) => Arc::new(RedisResultCache::new(url)?),
            None => {
                tracing::warn!("REDIS_URL not set; using in-process result cache");
                let memory = Arc::new(MemoryResultCache::new());
                memory.spawn_purger(PURGE_INTERVAL);
                memory
            }
        };
        let store: Arc<dyn ModelStore> = Arc::new(FileModelStore::new(&config.model_path));

        let model = Arc::new(EtaModel::new(store));
        model.load_from_store();

        Ok(Self::with_parts(config, model, cache))
    }

    /// Assembles state from already-built parts.
    pub fn with_parts(config: Config, model: Arc<EtaModel>, cache: Arc<dyn ResultCache>) -> Self {
        let train_config = config.train_config();
        let cache_ttl = Duration::from_secs(config.cache_ttl_secs);
        Self {
            config,
            model,
            cache,
            train_config,
            cache_ttl,
        }
    }
}
