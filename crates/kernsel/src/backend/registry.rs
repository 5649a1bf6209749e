//! Static registry of attention backend implementations.
//!
//! Platforms answer selection requests with a qualified implementation name; the registry turns
//! that name into a handle. Every in-tree variant is registered when the registry is built, and
//! out-of-tree backends can add their own factories under new names.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use super::variant::BackendVariant;
use super::{SelectionError, SelectionResult};

/// Shared handle to a resolved backend implementation.
pub type BackendHandle = Arc<dyn AttentionBackend>;

/// Factory producing a backend handle.
pub type BackendFactory = Box<dyn Fn() -> BackendHandle + Send + Sync>;

/// Qualified name of the fixed block-sparse backend.
pub const BLOCK_SPARSE_QUALNAME: &str = BackendVariant::BlockSparseFlashAttn.qualname();
/// Qualified name of the fixed placeholder backend used by attention-free models.
pub const PLACEHOLDER_QUALNAME: &str = BackendVariant::NoAttention.qualname();

static GLOBAL_REGISTRY: Lazy<Arc<BackendRegistry>> =
    Lazy::new(|| Arc::new(BackendRegistry::with_builtins()));

/// Resolved attention implementation. Kernels live behind this handle, outside this crate.
pub trait AttentionBackend: Send + Sync + fmt::Debug {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// Qualified name the backend was registered under.
    fn qualname(&self) -> &str;

    /// In-tree variant this backend implements; `None` for out-of-tree backends.
    fn variant(&self) -> Option<BackendVariant> {
        None
    }
}

/// Descriptor for an in-tree backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InTreeBackend {
    variant: BackendVariant,
}

impl InTreeBackend {
    pub const fn new(variant: BackendVariant) -> Self {
        Self { variant }
    }
}

impl AttentionBackend for InTreeBackend {
    fn name(&self) -> &str {
        self.variant.as_str()
    }

    fn qualname(&self) -> &str {
        self.variant.qualname()
    }

    fn variant(&self) -> Option<BackendVariant> {
        Some(self.variant)
    }
}

/// Registry mapping qualified names to backend factories.
pub struct BackendRegistry {
    factories: RwLock<HashMap<String, BackendFactory>>,
}

impl BackendRegistry {
    /// Creates a registry without any backends.
    pub fn empty() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a registry seeded with every in-tree backend.
    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        for variant in BackendVariant::ALL {
            registry.register(variant.qualname(), move || {
                Arc::new(InTreeBackend::new(variant)) as BackendHandle
            });
        }
        registry
    }

    /// Returns the process-wide registry.
    pub fn global() -> Arc<BackendRegistry> {
        Arc::clone(&*GLOBAL_REGISTRY)
    }

    /// Registers `factory` under `qualname`, replacing any previous registration.
    pub fn register<F>(&self, qualname: impl Into<String>, factory: F)
    where
        F: Fn() -> BackendHandle + Send + Sync + 'static,
    {
        let qualname = qualname.into();
        tracing::trace!(qualname = %qualname, "registering attention backend");
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(qualname, Box::new(factory));
    }

    /// Instantiates the backend registered under `qualname`.
    pub fn create(&self, qualname: &str) -> SelectionResult<BackendHandle> {
        let factories = self.factories.read().unwrap_or_else(PoisonError::into_inner);
        let factory = factories
            .get(qualname)
            .ok_or_else(|| SelectionError::load(qualname))?;
        Ok(factory())
    }

    pub fn contains(&self, qualname: &str) -> bool {
        self.factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(qualname)
    }

    /// Registered names in sorted order.
    pub fn qualnames(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("qualnames", &self.qualnames())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct OutOfTree;

    impl AttentionBackend for OutOfTree {
        fn name(&self) -> &str {
            "OUT_OF_TREE"
        }

        fn qualname(&self) -> &str {
            "plugin::attn::OutOfTreeBackend"
        }
    }

    #[test]
    fn builtins_cover_every_variant() {
        let registry = BackendRegistry::with_builtins();
        for variant in BackendVariant::ALL {
            let backend = registry.create(variant.qualname()).expect("builtin registered");
            assert_eq!(backend.variant(), Some(variant));
            assert_eq!(backend.name(), variant.as_str());
            assert_eq!(backend.qualname(), variant.qualname());
        }
        assert!(registry.contains(BLOCK_SPARSE_QUALNAME));
        assert!(registry.contains(PLACEHOLDER_QUALNAME));
    }

    #[test]
    fn unknown_name_is_a_load_error() {
        let registry = BackendRegistry::empty();
        let err = registry.create("nowhere::Backend").unwrap_err();
        assert!(matches!(err, SelectionError::Load { ref qualname } if qualname == "nowhere::Backend"));
    }

    #[test]
    fn out_of_tree_backends_can_register() {
        let registry = BackendRegistry::with_builtins();
        registry.register("plugin::attn::OutOfTreeBackend", || {
            Arc::new(OutOfTree) as BackendHandle
        });
        let backend = registry
            .create("plugin::attn::OutOfTreeBackend")
            .expect("plugin registered");
        assert_eq!(backend.name(), "OUT_OF_TREE");
        assert_eq!(backend.variant(), None);
        assert_eq!(registry.qualnames().len(), BackendVariant::ALL.len() + 1);
    }
}
