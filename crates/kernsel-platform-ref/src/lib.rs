//! Simulated platform resolvers.
//!
//! These implement the selection rules of real devices without touching hardware, for tests and
//! for hosts that need a deterministic platform.

pub mod cpu;
pub mod cuda;
pub mod rocm;

use std::sync::Arc;

use kernsel::backend::PlatformResolver;

pub use cpu::CpuPlatform;
pub use cuda::CudaPlatform;
pub use rocm::RocmPlatform;

/// Looks up a reference platform by device name (`cpu`, `cuda`, `rocm`).
pub fn platform_by_name(name: &str) -> Option<Arc<dyn PlatformResolver>> {
    match name.trim().to_ascii_lowercase().as_str() {
        "cpu" => Some(Arc::new(CpuPlatform)),
        "cuda" => Some(Arc::new(CudaPlatform::default())),
        "rocm" => Some(Arc::new(RocmPlatform)),
        _ => None,
    }
}
