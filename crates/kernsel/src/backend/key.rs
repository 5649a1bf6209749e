use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::env::{EnvSource, SelectorConfig};

use super::variant::BackendVariant;

/// Activation dtype of the attention computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F16,
    Bf16,
    F32,
    F64,
}

impl DType {
    pub const fn as_str(self) -> &'static str {
        match self {
            DType::F16 => "f16",
            DType::Bf16 => "bf16",
            DType::F32 => "f32",
            DType::F64 => "f64",
        }
    }

    /// Returns `true` for the 16-bit floating point formats.
    pub fn is_half(self) -> bool {
        matches!(self, DType::F16 | DType::Bf16)
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage dtype of the KV cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KvCacheDType {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "fp8")]
    Fp8,
    #[serde(rename = "fp8_e4m3")]
    Fp8E4m3,
    #[serde(rename = "fp8_e5m2")]
    Fp8E5m2,
}

impl KvCacheDType {
    pub const fn as_str(self) -> &'static str {
        match self {
            KvCacheDType::Auto => "auto",
            KvCacheDType::Fp8 => "fp8",
            KvCacheDType::Fp8E4m3 => "fp8_e4m3",
            KvCacheDType::Fp8E5m2 => "fp8_e5m2",
        }
    }

    pub fn is_fp8(self) -> bool {
        !matches!(self, KvCacheDType::Auto)
    }
}

impl fmt::Display for KvCacheDType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a name that is not a known KV cache dtype.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown kv cache dtype '{0}'")]
pub struct UnknownKvCacheDType(pub String);

impl FromStr for KvCacheDType {
    type Err = UnknownKvCacheDType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "auto" => Ok(KvCacheDType::Auto),
            "fp8" => Ok(KvCacheDType::Fp8),
            "fp8_e4m3" => Ok(KvCacheDType::Fp8E4m3),
            "fp8_e5m2" => Ok(KvCacheDType::Fp8E5m2),
            other => Err(UnknownKvCacheDType(other.to_string())),
        }
    }
}

/// Snapshot of the volatile feature flags that influence backend choice.
///
/// Taken once per public selection call and stored inside [`ResolutionKey`], so a flag flip
/// between calls produces a different key instead of a stale cache hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeatureFlags {
    pub use_v1: bool,
}

impl FeatureFlags {
    pub fn snapshot(env: &dyn EnvSource, config: &SelectorConfig) -> Self {
        FeatureFlags {
            use_v1: config.use_v1(env),
        }
    }
}

/// Workload description supplied by callers of the selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttentionParams {
    pub head_size: usize,
    pub dtype: DType,
    pub kv_cache_dtype: Option<KvCacheDType>,
    pub block_size: usize,
    pub is_attention_free: bool,
    pub is_blocksparse: bool,
    pub use_mla: bool,
}

impl AttentionParams {
    pub fn new(head_size: usize, dtype: DType, block_size: usize) -> Self {
        Self {
            head_size,
            dtype,
            kv_cache_dtype: None,
            block_size,
            is_attention_free: false,
            is_blocksparse: false,
            use_mla: false,
        }
    }

    pub fn with_kv_cache_dtype(mut self, kv_cache_dtype: KvCacheDType) -> Self {
        self.kv_cache_dtype = Some(kv_cache_dtype);
        self
    }

    pub fn attention_free(mut self, value: bool) -> Self {
        self.is_attention_free = value;
        self
    }

    pub fn blocksparse(mut self, value: bool) -> Self {
        self.is_blocksparse = value;
        self
    }

    pub fn mla(mut self, value: bool) -> Self {
        self.use_mla = value;
        self
    }

    /// Combines the workload with a feature-flag snapshot into a cache key.
    pub fn into_key(self, flags: FeatureFlags) -> ResolutionKey {
        ResolutionKey {
            head_size: self.head_size,
            dtype: self.dtype,
            kv_cache_dtype: self.kv_cache_dtype,
            block_size: self.block_size,
            is_attention_free: self.is_attention_free,
            is_blocksparse: self.is_blocksparse,
            flags,
            use_mla: self.use_mla,
        }
    }
}

/// Every input that affects backend choice. Equal keys must resolve to the same backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionKey {
    pub head_size: usize,
    pub dtype: DType,
    pub kv_cache_dtype: Option<KvCacheDType>,
    pub block_size: usize,
    pub is_attention_free: bool,
    pub is_blocksparse: bool,
    pub flags: FeatureFlags,
    pub use_mla: bool,
}

/// Request handed to a platform resolver once the selected variant is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformQuery {
    pub selected: Option<BackendVariant>,
    pub head_size: usize,
    pub dtype: DType,
    pub kv_cache_dtype: Option<KvCacheDType>,
    pub block_size: usize,
    pub use_v1: bool,
    pub use_mla: bool,
}

impl PlatformQuery {
    pub fn new(key: &ResolutionKey, selected: Option<BackendVariant>) -> Self {
        Self {
            selected,
            head_size: key.head_size,
            dtype: key.dtype,
            kv_cache_dtype: key.kv_cache_dtype,
            block_size: key.block_size,
            use_v1: key.flags.use_v1,
            use_mla: key.use_mla,
        }
    }

    pub fn kv_cache_is_fp8(&self) -> bool {
        self.kv_cache_dtype.is_some_and(KvCacheDType::is_fp8)
    }
}

impl fmt::Display for PlatformQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.selected {
            Some(variant) => write!(f, "selected={variant}")?,
            None => write!(f, "selected=auto")?,
        }
        write!(
            f,
            " head_size={} dtype={} kv_cache_dtype={} block_size={} use_v1={} use_mla={}",
            self.head_size,
            self.dtype,
            self.kv_cache_dtype.map_or("auto", KvCacheDType::as_str),
            self.block_size,
            self.use_v1,
            self.use_mla
        )
    }
}
