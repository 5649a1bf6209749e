//! Environment-style configuration consumed by the backend selector.
//!
//! Values are read through an [`EnvSource`] on every resolution so that changes made between
//! calls are observed; memoization happens later, keyed on the snapshot taken here.

use std::collections::HashMap;
use std::env;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};

/// Variable naming the attention backend override (e.g. `FLASH_ATTN`).
pub const ATTENTION_BACKEND_VAR: &str = "KERNSEL_ATTENTION_BACKEND";
/// Variable toggling the v1 engine feature flag.
pub const USE_V1_VAR: &str = "KERNSEL_USE_V1";

/// Read-only view of string-valued configuration variables.
pub trait EnvSource: Send + Sync {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads variables from the current process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

/// In-memory environment, mutable through a shared reference.
///
/// Used by hosts that load configuration from elsewhere and by tests that must not touch the
/// process environment.
#[derive(Debug, Default)]
pub struct MapEnv {
    vars: RwLock<HashMap<String, String>>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value.into());
    }

    pub fn remove(&self, name: &str) -> Option<String> {
        self.vars
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }
}

impl EnvSource for MapEnv {
    fn var(&self, name: &str) -> Option<String> {
        self.vars
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}

/// Names of the variables the selector consults and the defaults used when they are unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub attention_backend_var: String,
    pub use_v1_var: String,
    pub default_use_v1: bool,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            attention_backend_var: ATTENTION_BACKEND_VAR.to_string(),
            use_v1_var: USE_V1_VAR.to_string(),
            default_use_v1: false,
        }
    }
}

impl SelectorConfig {
    /// Returns the raw attention backend override, ignoring blank values.
    ///
    /// The value is returned as written; surrounding whitespace is not stripped.
    pub fn attention_backend(&self, env: &dyn EnvSource) -> Option<String> {
        env.var(&self.attention_backend_var)
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns the current value of the v1 feature flag.
    pub fn use_v1(&self, env: &dyn EnvSource) -> bool {
        match env.var(&self.use_v1_var) {
            Some(value) if !value.trim().is_empty() => parse_bool(&value),
            _ => self.default_use_v1,
        }
    }
}

pub(crate) fn parse_bool(value: &str) -> bool {
    let normalized = value.trim().to_ascii_lowercase();
    matches!(normalized.as_str(), "1" | "true" | "yes" | "on")
}
