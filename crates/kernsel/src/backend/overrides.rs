//! Forced backend overrides.
//!
//! An [`OverrideState`] is an explicit context object: selectors hold an `Arc` to one, so
//! independent pipelines can pin backends without seeing each other's overrides. A process-wide
//! default instance backs the free functions at the bottom of this module.
//!
//! Scoped overrides are RAII guards that restore the value observed at entry when dropped, which
//! covers early returns, `?` propagation and panic unwinding alike. Interleaving scoped overrides
//! on one instance from several threads is not coordinated here; callers that share an instance
//! across threads must serialize their scopes.

use std::sync::{Arc, Mutex, PoisonError};

use once_cell::sync::Lazy;

use super::variant::BackendVariant;

static GLOBAL_OVERRIDES: Lazy<Arc<OverrideState>> = Lazy::new(|| Arc::new(OverrideState::new()));

/// Slot holding at most one forced backend variant.
#[derive(Debug, Default)]
pub struct OverrideState {
    forced: Mutex<Option<BackendVariant>>,
}

impl OverrideState {
    pub const fn new() -> Self {
        Self {
            forced: Mutex::new(None),
        }
    }

    /// Returns the process-wide default instance.
    pub fn global() -> Arc<OverrideState> {
        Arc::clone(&*GLOBAL_OVERRIDES)
    }

    /// Replaces the forced variant. `None` re-enables automatic selection.
    pub fn set(&self, variant: Option<BackendVariant>) {
        let previous = self.replace(variant);
        if previous != variant {
            tracing::debug!(
                previous = ?previous,
                forced = ?variant,
                "attention backend override changed"
            );
        }
    }

    /// Returns the currently forced variant, if any.
    pub fn get(&self) -> Option<BackendVariant> {
        *self.forced.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Installs `variant` until the returned guard is dropped.
    #[must_use = "the override is reverted as soon as the guard is dropped"]
    pub fn scoped(&self, variant: BackendVariant) -> OverrideGuard<'_> {
        let previous = self.replace(Some(variant));
        tracing::trace!(previous = ?previous, forced = %variant, "entering scoped backend override");
        OverrideGuard {
            state: self,
            previous,
        }
    }

    /// Runs `body` with `variant` forced, restoring the prior override afterwards.
    pub fn with_scoped<T, F>(&self, variant: BackendVariant, body: F) -> T
    where
        F: FnOnce() -> T,
    {
        let _guard = self.scoped(variant);
        body()
    }

    fn replace(&self, variant: Option<BackendVariant>) -> Option<BackendVariant> {
        let mut slot = self.forced.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, variant)
    }
}

/// Restores the override observed when the scope was entered.
#[derive(Debug)]
pub struct OverrideGuard<'a> {
    state: &'a OverrideState,
    previous: Option<BackendVariant>,
}

impl OverrideGuard<'_> {
    /// The override that will be reinstated on drop.
    pub fn previous(&self) -> Option<BackendVariant> {
        self.previous
    }
}

impl Drop for OverrideGuard<'_> {
    fn drop(&mut self) {
        self.state.replace(self.previous);
        tracing::trace!(restored = ?self.previous, "leaving scoped backend override");
    }
}

/// Forces every selector using the global override state onto `variant`.
pub fn set_forced_override(variant: Option<BackendVariant>) {
    GLOBAL_OVERRIDES.set(variant);
}

/// Returns the globally forced variant, or `None` when auto-selection is active.
pub fn forced_override() -> Option<BackendVariant> {
    GLOBAL_OVERRIDES.get()
}

/// Runs `body` with `variant` forced on the global override state.
pub fn with_scoped_override<T, F>(variant: BackendVariant, body: F) -> T
where
    F: FnOnce() -> T,
{
    GLOBAL_OVERRIDES.with_scoped(variant, body)
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;

    #[test]
    fn set_and_clear() {
        let state = OverrideState::new();
        assert_eq!(state.get(), None);
        state.set(Some(BackendVariant::Xformers));
        assert_eq!(state.get(), Some(BackendVariant::Xformers));
        state.set(None);
        assert_eq!(state.get(), None);
    }

    #[test]
    fn nested_scopes_restore_layer_by_layer() {
        let state = OverrideState::new();
        state.set(Some(BackendVariant::TorchSdpa));

        state.with_scoped(BackendVariant::FlashAttn, || {
            assert_eq!(state.get(), Some(BackendVariant::FlashAttn));
            state.with_scoped(BackendVariant::Xformers, || {
                assert_eq!(state.get(), Some(BackendVariant::Xformers));
            });
            assert_eq!(state.get(), Some(BackendVariant::FlashAttn));
        });

        assert_eq!(state.get(), Some(BackendVariant::TorchSdpa));
    }

    #[test]
    fn scope_restores_after_error_return() {
        let state = OverrideState::new();

        let result: Result<(), &str> = state.with_scoped(BackendVariant::Flashinfer, || {
            assert_eq!(state.get(), Some(BackendVariant::Flashinfer));
            Err("body failed")
        });

        assert_eq!(result, Err("body failed"));
        assert_eq!(state.get(), None);
    }

    #[test]
    fn scope_restores_after_panic() {
        let state = OverrideState::new();
        state.set(Some(BackendVariant::RocmFlash));

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            state.with_scoped(BackendVariant::FlashAttn, || {
                panic!("boom");
            })
        }));

        assert!(outcome.is_err());
        assert_eq!(state.get(), Some(BackendVariant::RocmFlash));
    }

    #[test]
    fn guard_reports_previous_value() {
        let state = OverrideState::new();
        let outer = state.scoped(BackendVariant::Xformers);
        assert_eq!(outer.previous(), None);
        {
            let inner = state.scoped(BackendVariant::FlashAttn);
            assert_eq!(inner.previous(), Some(BackendVariant::Xformers));
        }
        assert_eq!(state.get(), Some(BackendVariant::Xformers));
        drop(outer);
        assert_eq!(state.get(), None);
    }

    #[test]
    fn independent_states_do_not_interfere() {
        let a = OverrideState::new();
        let b = OverrideState::new();
        a.with_scoped(BackendVariant::Pallas, || {
            assert_eq!(b.get(), None);
        });
    }
}
