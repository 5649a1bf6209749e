//! Graph passes and their content-derived identities.
//!
//! A compiler cache keys compiled artifacts on [`PassDigest`]s. Passes derive their digest from
//! source captured at compile time by `#[pass_source]`, from an explicit versioned uuid, or from
//! the canonical serialization of their configuration.

pub mod callable;
pub mod canonical_json;
pub mod digest;
pub mod identity;
pub mod pipeline;

use thiserror::Error;

pub use callable::{CallablePass, CallablePassBuilder};
pub use canonical_json::to_canonical_string;
pub use digest::{digest_of_mapping, digest_of_source, PassDigest, SourceArg, DIGEST_HEX_LEN};
pub use identity::{GraphPass, PassOutcome};
pub use pipeline::PassPipeline;

#[derive(Debug, Error)]
pub enum PassIdentityError {
    #[error("source text unavailable for pass '{pass}'; supply an explicit uuid")]
    SourceUnavailable { pass: String },
    #[error("failed to serialize pass configuration: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("'{value}' is not a 64-character lowercase hex digest")]
    InvalidDigest { value: String },
}

impl PassIdentityError {
    pub fn source_unavailable(pass: impl Into<String>) -> Self {
        PassIdentityError::SourceUnavailable { pass: pass.into() }
    }

    pub fn invalid_digest(value: impl Into<String>) -> Self {
        PassIdentityError::InvalidDigest {
            value: value.into(),
        }
    }
}

pub type IdentityResult<T> = Result<T, PassIdentityError>;
