use super::key::PlatformQuery;

/// Device-specific resolver mapping a selection request onto an implementation.
///
/// Implementations inspect the selected variant (or pick a default when it is `None`) together
/// with the workload shape and return the qualified name of the backend to load. Returning `None`
/// means the device cannot serve the request at all; the selector reports that as a
/// configuration error.
pub trait PlatformResolver: Send + Sync {
    /// Short device label used in errors and logs (e.g. `cuda`, `cpu`).
    fn device_name(&self) -> &str;

    fn resolve_implementation(&self, query: &PlatformQuery) -> Option<String>;
}
