use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// In-tree attention kernel families.
///
/// Names round-trip through [`BackendVariant::as_str`] / [`BackendVariant::from_name`] using the
/// canonical upper-snake spelling, which is also what the environment override expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendVariant {
    FlashAttn,
    FlashAttnVllmV1,
    TritonAttnVllmV1,
    Xformers,
    RocmFlash,
    TorchSdpa,
    Flashinfer,
    TritonMla,
    #[serde(rename = "FLASHMLA")]
    FlashMla,
    HpuAttn,
    Pallas,
    PallasVllmV1,
    Ipex,
    BlockSparseFlashAttn,
    NoAttention,
}

impl BackendVariant {
    pub const ALL: [BackendVariant; 15] = [
        BackendVariant::FlashAttn,
        BackendVariant::FlashAttnVllmV1,
        BackendVariant::TritonAttnVllmV1,
        BackendVariant::Xformers,
        BackendVariant::RocmFlash,
        BackendVariant::TorchSdpa,
        BackendVariant::Flashinfer,
        BackendVariant::TritonMla,
        BackendVariant::FlashMla,
        BackendVariant::HpuAttn,
        BackendVariant::Pallas,
        BackendVariant::PallasVllmV1,
        BackendVariant::Ipex,
        BackendVariant::BlockSparseFlashAttn,
        BackendVariant::NoAttention,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            BackendVariant::FlashAttn => "FLASH_ATTN",
            BackendVariant::FlashAttnVllmV1 => "FLASH_ATTN_VLLM_V1",
            BackendVariant::TritonAttnVllmV1 => "TRITON_ATTN_VLLM_V1",
            BackendVariant::Xformers => "XFORMERS",
            BackendVariant::RocmFlash => "ROCM_FLASH",
            BackendVariant::TorchSdpa => "TORCH_SDPA",
            BackendVariant::Flashinfer => "FLASHINFER",
            BackendVariant::TritonMla => "TRITON_MLA",
            BackendVariant::FlashMla => "FLASHMLA",
            BackendVariant::HpuAttn => "HPU_ATTN",
            BackendVariant::Pallas => "PALLAS",
            BackendVariant::PallasVllmV1 => "PALLAS_VLLM_V1",
            BackendVariant::Ipex => "IPEX",
            BackendVariant::BlockSparseFlashAttn => "BLOCK_SPARSE_FLASH_ATTN",
            BackendVariant::NoAttention => "NO_ATTENTION",
        }
    }

    /// Qualified name under which the in-tree implementation is registered.
    pub const fn qualname(self) -> &'static str {
        match self {
            BackendVariant::FlashAttn => "kernsel::backends::flash_attn::FlashAttentionBackend",
            BackendVariant::FlashAttnVllmV1 => {
                "kernsel::backends::v1::flash_attn::FlashAttentionBackend"
            }
            BackendVariant::TritonAttnVllmV1 => {
                "kernsel::backends::v1::triton_attn::TritonAttentionBackend"
            }
            BackendVariant::Xformers => "kernsel::backends::xformers::XFormersBackend",
            BackendVariant::RocmFlash => "kernsel::backends::rocm_flash_attn::RocmFlashAttentionBackend",
            BackendVariant::TorchSdpa => "kernsel::backends::torch_sdpa::TorchSdpaBackend",
            BackendVariant::Flashinfer => "kernsel::backends::flashinfer::FlashInferBackend",
            BackendVariant::TritonMla => "kernsel::backends::triton_mla::TritonMlaBackend",
            BackendVariant::FlashMla => "kernsel::backends::flashmla::FlashMlaBackend",
            BackendVariant::HpuAttn => "kernsel::backends::hpu_attn::HpuAttentionBackend",
            BackendVariant::Pallas => "kernsel::backends::pallas::PallasAttentionBackend",
            BackendVariant::PallasVllmV1 => "kernsel::backends::v1::pallas::PallasAttentionBackend",
            BackendVariant::Ipex => "kernsel::backends::ipex_attn::IpexAttnBackend",
            BackendVariant::BlockSparseFlashAttn => {
                "kernsel::backends::blocksparse_attn::BlocksparseFlashAttentionBackend"
            }
            BackendVariant::NoAttention => {
                "kernsel::backends::placeholder_attn::PlaceholderAttentionBackend"
            }
        }
    }

    /// Maps a backend name onto an in-tree variant.
    ///
    /// Matching is exact and case-sensitive. Unknown names (typos or out-of-tree backends) yield
    /// `None` rather than an error.
    pub fn from_name(name: &str) -> Option<BackendVariant> {
        BackendVariant::ALL
            .into_iter()
            .find(|variant| variant.as_str() == name)
    }
}

impl fmt::Display for BackendVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a name that is not an in-tree variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attention backend '{0}'")]
pub struct UnknownBackendName(pub String);

impl FromStr for BackendVariant {
    type Err = UnknownBackendName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BackendVariant::from_name(s).ok_or_else(|| UnknownBackendName(s.to_string()))
    }
}
