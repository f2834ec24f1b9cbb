//! Model backends and the registry that keeps at most one of each tier
//! loaded, unloading after a period of disuse.

use std::collections::HashMap;
use std::env;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use kg_core::CoreResult;
use parking_lot::Mutex;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelTier {
    Extract,
    Reason,
}

/// Injectable so tests and the orchestrator's dry-run mode never need a
/// real model loaded (grounded in the teacher's `LLMProvider` seam).
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn generate(&self, prompt: &str, tier: ModelTier) -> CoreResult<String>;
}

/// Echoes the prompt back with a tier tag; stands in for a real backend in
/// tests and offline demos.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoBackend;

#[async_trait]
impl ModelBackend for EchoBackend {
    async fn generate(&self, prompt: &str, tier: ModelTier) -> CoreResult<String> {
        Ok(format!("[{tier:?}] {prompt}"))
    }
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub extract_model_path: Option<String>,
    pub reason_model_path: Option<String>,
}

impl ModelConfig {
    /// `KG_EXTRACT_MODEL_PATH` / `KG_REASON_MODEL_PATH` (spec §6), mirroring
    /// how the teacher's LLM client reads provider config from the
    /// environment rather than a required config file.
    pub fn from_env() -> Self {
        Self {
            extract_model_path: env::var("KG_EXTRACT_MODEL_PATH").ok(),
            reason_model_path: env::var("KG_REASON_MODEL_PATH").ok(),
        }
    }
}

struct LoadedModel {
    backend: std::sync::Arc<dyn ModelBackend>,
    last_used: Instant,
}

/// Idle-unload timeout: a tier's backend is dropped if unused this long
/// (spec §4.8).
pub const IDLE_UNLOAD_AFTER: Duration = Duration::from_secs(5 * 60);

pub struct ModelRegistry {
    loaded: Mutex<HashMap<ModelTier, LoadedModel>>,
    factory: Box<dyn Fn(ModelTier) -> std::sync::Arc<dyn ModelBackend> + Send + Sync>,
}

impl ModelRegistry {
    pub fn new(factory: Box<dyn Fn(ModelTier) -> std::sync::Arc<dyn ModelBackend> + Send + Sync>) -> Self {
        Self {
            loaded: Mutex::new(HashMap::new()),
            factory,
        }
    }

    pub fn with_echo_backend() -> Self {
        Self::new(Box::new(|_tier| std::sync::Arc::new(EchoBackend)))
    }

    /// Returns the backend for `tier`, loading it via the factory if it
    /// isn't already resident or has gone idle long enough to be unloaded.
    pub fn backend_for(&self, tier: ModelTier) -> std::sync::Arc<dyn ModelBackend> {
        let mut loaded = self.loaded.lock();
        self.evict_idle(&mut loaded);
        if let Some(entry) = loaded.get_mut(&tier) {
            entry.last_used = Instant::now();
            return entry.backend.clone();
        }
        info!(?tier, "loading model backend");
        let backend = (self.factory)(tier);
        loaded.insert(
            tier,
            LoadedModel {
                backend: backend.clone(),
                last_used: Instant::now(),
            },
        );
        backend
    }

    fn evict_idle(&self, loaded: &mut HashMap<ModelTier, LoadedModel>) {
        loaded.retain(|tier, entry| {
            let keep = entry.last_used.elapsed() < IDLE_UNLOAD_AFTER;
            if !keep {
                info!(?tier, "unloading idle model backend");
            }
            keep
        });
    }

    pub fn loaded_tiers(&self) -> Vec<ModelTier> {
        self.loaded.lock().keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn echo_backend_tags_output_with_tier() {
        let out = EchoBackend.generate("hello", ModelTier::Reason).await.unwrap();
        assert!(out.contains("Reason"));
        assert!(out.contains("hello"));
    }

    #[test]
    fn registry_reuses_loaded_backend() {
        let registry = ModelRegistry::with_echo_backend();
        registry.backend_for(ModelTier::Extract);
        registry.backend_for(ModelTier::Extract);
        assert_eq!(registry.loaded_tiers().len(), 1);
    }

    #[test]
    fn registry_tracks_distinct_tiers_independently() {
        let registry = ModelRegistry::with_echo_backend();
        registry.backend_for(ModelTier::Extract);
        registry.backend_for(ModelTier::Reason);
        assert_eq!(registry.loaded_tiers().len(), 2);
    }

    #[test]
    fn config_from_env_reads_expected_variables() {
        std::env::set_var("KG_EXTRACT_MODEL_PATH", "/models/extract.gguf");
        let config = ModelConfig::from_env();
        assert_eq!(config.extract_model_path.as_deref(), Some("/models/extract.gguf"));
        std::env::remove_var("KG_EXTRACT_MODEL_PATH");
    }
}
