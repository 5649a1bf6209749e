use std::fmt;
use std::sync::Arc;

use crate::env::{EnvSource, ProcessEnv, SelectorConfig};

use super::cache::{BackendCache, CacheStats};
use super::key::{AttentionParams, FeatureFlags, PlatformQuery, ResolutionKey};
use super::overrides::OverrideState;
use super::platform::PlatformResolver;
use super::registry::{
    BackendHandle, BackendRegistry, BLOCK_SPARSE_QUALNAME, PLACEHOLDER_QUALNAME,
};
use super::variant::BackendVariant;
use super::{SelectionError, SelectionResult};

/// Reads the attention backend override from `env`.
///
/// Returns `None` when the variable is unset or names something that is not an in-tree variant;
/// the latter is logged and otherwise ignored.
pub fn env_attention_backend(
    env: &dyn EnvSource,
    config: &SelectorConfig,
) -> Option<BackendVariant> {
    let name = config.attention_backend(env)?;
    let variant = BackendVariant::from_name(&name);
    if variant.is_none() {
        tracing::debug!(
            var = %config.attention_backend_var,
            value = %name,
            "ignoring unrecognized attention backend override"
        );
    }
    variant
}

/// Resolves and memoizes attention backends for one platform.
pub struct BackendSelector {
    platform: Arc<dyn PlatformResolver>,
    registry: Arc<BackendRegistry>,
    overrides: Arc<OverrideState>,
    env: Arc<dyn EnvSource>,
    config: SelectorConfig,
    cache: BackendCache,
}

impl BackendSelector {
    /// Creates a selector wired to the process-wide override state, registry and environment.
    pub fn new(platform: Arc<dyn PlatformResolver>) -> Self {
        Self::builder(platform).build()
    }

    pub fn builder(platform: Arc<dyn PlatformResolver>) -> BackendSelectorBuilder {
        BackendSelectorBuilder {
            platform,
            registry: None,
            overrides: None,
            env: None,
            config: SelectorConfig::default(),
        }
    }

    /// Selects the backend for `params`.
    ///
    /// Feature flags are read from the environment now and become part of the cache key.
    pub fn attention_backend(&self, params: &AttentionParams) -> SelectionResult<BackendHandle> {
        let flags = FeatureFlags::snapshot(self.env.as_ref(), &self.config);
        let key = params.clone().into_key(flags);
        self.resolve_backend(&key)
    }

    /// Memoized resolution. A key resolved once keeps its backend until [`Self::clear_cache`],
    /// even if overrides change in between.
    pub fn resolve_backend(&self, key: &ResolutionKey) -> SelectionResult<BackendHandle> {
        let (backend, hit) = self
            .cache
            .get_or_try_insert_with(key, || self.resolve_uncached(key))?;
        if hit {
            tracing::trace!(backend = backend.name(), "attention backend cache hit");
        }
        Ok(backend)
    }

    /// Forced override if set, otherwise the recognized environment override.
    pub fn selected_variant(&self) -> Option<BackendVariant> {
        self.overrides
            .get()
            .or_else(|| env_attention_backend(self.env.as_ref(), &self.config))
    }

    pub fn overrides(&self) -> &Arc<OverrideState> {
        &self.overrides
    }

    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::debug!(
            device = self.platform.device_name(),
            "cleared attention backend cache"
        );
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn resolve_uncached(&self, key: &ResolutionKey) -> SelectionResult<BackendHandle> {
        if key.is_blocksparse {
            tracing::info!("using block-sparse flash attention backend");
            return self.registry.create(BLOCK_SPARSE_QUALNAME);
        }

        if key.is_attention_free {
            return self.registry.create(PLACEHOLDER_QUALNAME);
        }

        let selected = self.selected_variant();
        let query = PlatformQuery::new(key, selected);
        let device = self.platform.device_name();
        let qualname = self
            .platform
            .resolve_implementation(&query)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| {
                SelectionError::configuration(device, format!("unsupported request ({query})"))
            })?;

        let backend = self.registry.create(&qualname)?;
        tracing::info!(
            device,
            selected = ?selected,
            backend = backend.name(),
            "selected attention backend"
        );
        Ok(backend)
    }
}

impl fmt::Debug for BackendSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendSelector")
            .field("device", &self.platform.device_name())
            .field("config", &self.config)
            .field("cache", &self.cache.stats())
            .finish_non_exhaustive()
    }
}

pub struct BackendSelectorBuilder {
    platform: Arc<dyn PlatformResolver>,
    registry: Option<Arc<BackendRegistry>>,
    overrides: Option<Arc<OverrideState>>,
    env: Option<Arc<dyn EnvSource>>,
    config: SelectorConfig,
}

impl BackendSelectorBuilder {
    pub fn registry(mut self, registry: Arc<BackendRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Uses a private override state instead of the process-wide one.
    pub fn overrides(mut self, overrides: Arc<OverrideState>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = Some(env);
        self
    }

    pub fn config(mut self, config: SelectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> BackendSelector {
        BackendSelector {
            platform: self.platform,
            registry: self.registry.unwrap_or_else(BackendRegistry::global),
            overrides: self.overrides.unwrap_or_else(OverrideState::global),
            env: self.env.unwrap_or_else(|| Arc::new(ProcessEnv)),
            config: self.config,
            cache: BackendCache::new(),
        }
    }
}
