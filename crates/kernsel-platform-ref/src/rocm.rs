use kernsel::backend::{BackendVariant, DType, PlatformQuery, PlatformResolver};

/// Simulated AMD device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RocmPlatform;

impl RocmPlatform {
    fn resolve_variant(query: &PlatformQuery) -> Option<BackendVariant> {
        if query.dtype == DType::F64 {
            return None;
        }
        if query.use_mla {
            return Some(BackendVariant::TritonMla);
        }
        if query.use_v1 {
            return Some(BackendVariant::TritonAttnVllmV1);
        }
        if query.selected == Some(BackendVariant::TorchSdpa) {
            tracing::warn!("SDPA is not supported on rocm; using ROCm flash attention");
        }
        Some(BackendVariant::RocmFlash)
    }
}

impl PlatformResolver for RocmPlatform {
    fn device_name(&self) -> &str {
        "rocm"
    }

    fn resolve_implementation(&self, query: &PlatformQuery) -> Option<String> {
        Self::resolve_variant(query).map(|variant| variant.qualname().to_string())
    }
}

#[cfg(test)]
mod tests {
    use kernsel::backend::{AttentionParams, FeatureFlags};

    use super::*;

    #[test]
    fn defaults_and_feature_paths() {
        let params = AttentionParams::new(128, DType::F16, 16);
        let plain = PlatformQuery::new(&params.clone().into_key(FeatureFlags::default()), None);
        assert_eq!(RocmPlatform::resolve_variant(&plain), Some(BackendVariant::RocmFlash));

        let sdpa = PlatformQuery::new(
            &params.clone().into_key(FeatureFlags::default()),
            Some(BackendVariant::TorchSdpa),
        );
        assert_eq!(RocmPlatform::resolve_variant(&sdpa), Some(BackendVariant::RocmFlash));

        let v1 = PlatformQuery::new(&params.clone().into_key(FeatureFlags { use_v1: true }), None);
        assert_eq!(RocmPlatform::resolve_variant(&v1), Some(BackendVariant::TritonAttnVllmV1));

        let mla = PlatformQuery::new(&params.mla(true).into_key(FeatureFlags::default()), None);
        assert_eq!(RocmPlatform::resolve_variant(&mla), Some(BackendVariant::TritonMla));
    }

    #[test]
    fn f64_is_unsupported() {
        let q = PlatformQuery::new(
            &AttentionParams::new(64, DType::F64, 16).into_key(FeatureFlags::default()),
            None,
        );
        assert_eq!(RocmPlatform.resolve_implementation(&q), None);
    }
}
