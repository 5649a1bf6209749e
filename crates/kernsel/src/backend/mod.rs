//! Attention backend selection.
//!
//! [`BackendSelector`] walks a fixed precedence chain (block-sparse, attention-free, forced
//! override, environment override, platform default), asks a [`PlatformResolver`] for the
//! implementation name and memoizes the loaded handle per [`ResolutionKey`].

pub mod cache;
pub mod key;
pub mod overrides;
pub mod platform;
pub mod registry;
pub mod selector;
pub mod variant;

use thiserror::Error;

pub use cache::{BackendCache, CacheStats};
pub use key::{
    AttentionParams, DType, FeatureFlags, KvCacheDType, PlatformQuery, ResolutionKey,
    UnknownKvCacheDType,
};
pub use overrides::{
    forced_override, set_forced_override, with_scoped_override, OverrideGuard, OverrideState,
};
pub use platform::PlatformResolver;
pub use registry::{
    AttentionBackend, BackendFactory, BackendHandle, BackendRegistry, InTreeBackend,
    BLOCK_SPARSE_QUALNAME, PLACEHOLDER_QUALNAME,
};
pub use selector::{env_attention_backend, BackendSelector, BackendSelectorBuilder};
pub use variant::{BackendVariant, UnknownBackendName};

/// Fatal failures of backend selection. Neither variant is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("invalid attention backend for {device}: {reason}")]
    Configuration { device: String, reason: String },
    #[error("no backend implementation registered under '{qualname}'")]
    Load { qualname: String },
}

impl SelectionError {
    pub fn configuration(device: impl Into<String>, reason: impl Into<String>) -> Self {
        SelectionError::Configuration {
            device: device.into(),
            reason: reason.into(),
        }
    }

    pub fn load(qualname: impl Into<String>) -> Self {
        SelectionError::Load {
            qualname: qualname.into(),
        }
    }
}

pub type SelectionResult<T> = Result<T, SelectionError>;
