use kernsel::backend::{BackendVariant, DType, PlatformQuery, PlatformResolver};

/// Head sizes served by the flash attention kernels.
pub const FLASH_ATTN_HEAD_SIZES: [usize; 8] = [32, 64, 96, 128, 160, 192, 224, 256];

/// Block size required by the FlashMLA kernels.
pub const FLASHMLA_BLOCK_SIZE: usize = 64;

/// Simulated NVIDIA device with a fixed compute capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CudaPlatform {
    capability: (u32, u32),
}

impl CudaPlatform {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self {
            capability: (major, minor),
        }
    }

    pub fn capability(&self) -> (u32, u32) {
        self.capability
    }

    fn has_capability(&self, major: u32, minor: u32) -> bool {
        self.capability >= (major, minor)
    }

    fn resolve_mla(&self, query: &PlatformQuery) -> BackendVariant {
        let wants_flashmla = matches!(query.selected, None | Some(BackendVariant::FlashMla));
        if wants_flashmla && self.supports_flashmla(query) {
            return BackendVariant::FlashMla;
        }
        if query.selected == Some(BackendVariant::FlashMla) {
            tracing::warn!(
                block_size = query.block_size,
                capability = ?self.capability,
                "FlashMLA unsupported for this request; using Triton MLA"
            );
        }
        BackendVariant::TritonMla
    }

    fn supports_flashmla(&self, query: &PlatformQuery) -> bool {
        self.has_capability(9, 0) && query.block_size == FLASHMLA_BLOCK_SIZE
    }

    /// Reason flash attention cannot serve `query`, if any.
    fn flash_attn_blocker(&self, query: &PlatformQuery) -> Option<&'static str> {
        if !self.has_capability(8, 0) {
            Some("compute capability below 8.0")
        } else if !query.dtype.is_half() {
            Some("dtype is not f16 or bf16")
        } else if query.kv_cache_is_fp8() {
            Some("fp8 kv cache")
        } else if query.block_size % 16 != 0 {
            Some("block size is not a multiple of 16")
        } else if !FLASH_ATTN_HEAD_SIZES.contains(&query.head_size) {
            Some("unsupported head size")
        } else {
            None
        }
    }

    fn resolve_variant(&self, query: &PlatformQuery) -> Option<BackendVariant> {
        if query.dtype == DType::F64 {
            return None;
        }
        if query.use_mla {
            return Some(self.resolve_mla(query));
        }
        if query.use_v1 {
            return Some(BackendVariant::FlashAttnVllmV1);
        }

        match query.selected {
            Some(BackendVariant::Flashinfer) => return Some(BackendVariant::Flashinfer),
            Some(BackendVariant::Xformers) => return Some(BackendVariant::Xformers),
            None | Some(BackendVariant::FlashAttn) => {}
            Some(_) => return None,
        }

        match self.flash_attn_blocker(query) {
            Some(reason) => {
                tracing::info!(reason, "cannot use flash attention; using xformers");
                Some(BackendVariant::Xformers)
            }
            None => Some(BackendVariant::FlashAttn),
        }
    }
}

impl Default for CudaPlatform {
    fn default() -> Self {
        Self::new(8, 0)
    }
}

impl PlatformResolver for CudaPlatform {
    fn device_name(&self) -> &str {
        "cuda"
    }

    fn resolve_implementation(&self, query: &PlatformQuery) -> Option<String> {
        self.resolve_variant(query)
            .map(|variant| variant.qualname().to_string())
    }
}

#[cfg(test)]
mod tests {
    use kernsel::backend::{AttentionParams, FeatureFlags, KvCacheDType};

    use super::*;

    fn query(params: AttentionParams, selected: Option<BackendVariant>) -> PlatformQuery {
        PlatformQuery::new(&params.into_key(FeatureFlags::default()), selected)
    }

    fn resolve(platform: CudaPlatform, query: &PlatformQuery) -> Option<BackendVariant> {
        platform.resolve_variant(query)
    }

    #[test]
    fn ampere_defaults_to_flash_attn() {
        let q = query(AttentionParams::new(128, DType::Bf16, 16), None);
        assert_eq!(resolve(CudaPlatform::new(8, 0), &q), Some(BackendVariant::FlashAttn));
    }

    #[test]
    fn flash_attn_falls_back_to_xformers() {
        let platform = CudaPlatform::new(8, 6);
        let cases = [
            AttentionParams::new(128, DType::F32, 16),
            AttentionParams::new(80, DType::F16, 16),
            AttentionParams::new(128, DType::F16, 8),
            AttentionParams::new(128, DType::F16, 16).with_kv_cache_dtype(KvCacheDType::Fp8),
        ];
        for params in cases {
            let q = query(params, None);
            assert_eq!(resolve(platform, &q), Some(BackendVariant::Xformers), "{q}");
        }

        let turing = query(AttentionParams::new(128, DType::F16, 16), None);
        assert_eq!(resolve(CudaPlatform::new(7, 5), &turing), Some(BackendVariant::Xformers));
    }

    #[test]
    fn explicit_selections() {
        let platform = CudaPlatform::new(9, 0);
        let params = AttentionParams::new(128, DType::F16, 16);
        for variant in [BackendVariant::Flashinfer, BackendVariant::Xformers] {
            let q = query(params.clone(), Some(variant));
            assert_eq!(resolve(platform, &q), Some(variant));
        }
        let q = query(params.clone(), Some(BackendVariant::FlashAttn));
        assert_eq!(resolve(platform, &q), Some(BackendVariant::FlashAttn));

        let q = query(params, Some(BackendVariant::RocmFlash));
        assert_eq!(resolve(platform, &q), None);
    }

    #[test]
    fn mla_prefers_flashmla_on_hopper() {
        let params = AttentionParams::new(576, DType::Bf16, 64).mla(true);
        let q = query(params.clone(), None);
        assert_eq!(resolve(CudaPlatform::new(9, 0), &q), Some(BackendVariant::FlashMla));
        assert_eq!(resolve(CudaPlatform::new(8, 0), &q), Some(BackendVariant::TritonMla));

        let small_blocks = query(AttentionParams::new(576, DType::Bf16, 16).mla(true), None);
        assert_eq!(
            resolve(CudaPlatform::new(9, 0), &small_blocks),
            Some(BackendVariant::TritonMla)
        );

        let triton = query(params, Some(BackendVariant::TritonMla));
        assert_eq!(resolve(CudaPlatform::new(9, 0), &triton), Some(BackendVariant::TritonMla));
    }

    #[test]
    fn v1_engine_uses_v1_flash_attn() {
        let params = AttentionParams::new(128, DType::F16, 16);
        let q = PlatformQuery::new(&params.into_key(FeatureFlags { use_v1: true }), None);
        assert_eq!(resolve(CudaPlatform::default(), &q), Some(BackendVariant::FlashAttnVllmV1));
    }

    #[test]
    fn f64_is_unsupported() {
        let q = query(AttentionParams::new(128, DType::F64, 16), None);
        assert_eq!(CudaPlatform::default().resolve_implementation(&q), None);
    }
}
