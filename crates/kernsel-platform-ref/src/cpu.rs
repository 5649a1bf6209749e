use kernsel::backend::{BackendVariant, DType, PlatformQuery, PlatformResolver};

/// Host CPU. Only the SDPA backend is available.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuPlatform;

impl CpuPlatform {
    pub fn supports_dtype(dtype: DType) -> bool {
        matches!(dtype, DType::F32 | DType::Bf16)
    }
}

impl PlatformResolver for CpuPlatform {
    fn device_name(&self) -> &str {
        "cpu"
    }

    fn resolve_implementation(&self, query: &PlatformQuery) -> Option<String> {
        if query.use_mla || query.use_v1 {
            return None;
        }
        if !Self::supports_dtype(query.dtype) {
            tracing::debug!(dtype = %query.dtype, "cpu attention does not support dtype");
            return None;
        }
        if let Some(selected) = query.selected {
            if selected != BackendVariant::TorchSdpa {
                tracing::info!(
                    selected = %selected,
                    "cannot use selected backend on cpu; using SDPA"
                );
            }
        }
        Some(BackendVariant::TorchSdpa.qualname().to_string())
    }
}
