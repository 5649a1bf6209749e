pub mod backend;
pub mod env;
pub mod passes;

pub use kernsel_macros::pass_source;

pub use backend::{
    forced_override, set_forced_override, with_scoped_override, AttentionBackend,
    AttentionParams, BackendHandle, BackendRegistry, BackendSelector, BackendVariant, DType,
    KvCacheDType, OverrideState, PlatformQuery, PlatformResolver, ResolutionKey, SelectionError,
    SelectionResult,
};
pub use env::{EnvSource, MapEnv, ProcessEnv, SelectorConfig};
pub use passes::{
    digest_of_mapping, digest_of_source, CallablePass, GraphPass, IdentityResult, PassDigest,
    PassIdentityError, PassOutcome, PassPipeline, SourceArg,
};
