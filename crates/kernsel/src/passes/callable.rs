use std::borrow::Cow;
use std::fmt;

use serde::Serialize;
use serde_json::json;

use super::digest::{digest_of_mapping, digest_of_source, PassDigest, SourceArg};
use super::identity::{GraphPass, PassOutcome};
use super::{IdentityResult, PassIdentityError};

/// Wraps a plain function or closure as a [`GraphPass`].
///
/// The identity is fixed when the pass is built and returned as-is from every
/// [`GraphPass::uuid`] call.
pub struct CallablePass<F> {
    name: Cow<'static, str>,
    source: Option<&'static str>,
    uuid: PassDigest,
    callable: F,
}

enum IdentitySpec {
    Explicit(PassDigest),
    Source(&'static str),
    Versioned(u32),
    Config(IdentityResult<PassDigest>),
}

/// Builder for [`CallablePass`]. The last identity option set wins.
pub struct CallablePassBuilder<F> {
    name: Option<Cow<'static, str>>,
    identity: Option<IdentitySpec>,
    callable: F,
}

impl<F> CallablePass<F> {
    pub fn builder(callable: F) -> CallablePassBuilder<F> {
        CallablePassBuilder {
            name: None,
            identity: None,
            callable,
        }
    }

    /// Wraps `callable` using the source captured for it by `#[pass_source]`.
    pub fn from_source(
        name: impl Into<Cow<'static, str>>,
        source: &'static str,
        callable: F,
    ) -> IdentityResult<Self> {
        Self::builder(callable).name(name).source(source).build()
    }

    /// Wraps `callable` under an explicit identity.
    pub fn with_uuid(name: impl Into<Cow<'static, str>>, uuid: PassDigest, callable: F) -> Self {
        CallablePass {
            name: name.into(),
            source: None,
            uuid,
            callable,
        }
    }

    pub fn callable(&self) -> &F {
        &self.callable
    }
}

impl<F> CallablePassBuilder<F> {
    pub fn name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Derives the identity from captured source text.
    pub fn source(mut self, source: &'static str) -> Self {
        self.identity = Some(IdentitySpec::Source(source));
        self
    }

    /// Uses `uuid` verbatim.
    pub fn uuid(mut self, uuid: PassDigest) -> Self {
        self.identity = Some(IdentitySpec::Explicit(uuid));
        self
    }

    /// Derives the identity from the pass name and a version the author bumps on behavior
    /// changes.
    pub fn versioned(mut self, version: u32) -> Self {
        self.identity = Some(IdentitySpec::Versioned(version));
        self
    }

    /// Derives the identity from the canonical serialization of the pass configuration.
    pub fn config<C>(mut self, config: &C) -> Self
    where
        C: Serialize + ?Sized,
    {
        self.identity = Some(IdentitySpec::Config(digest_of_mapping(config)));
        self
    }

    pub fn build(self) -> IdentityResult<CallablePass<F>> {
        let name = self
            .name
            .unwrap_or_else(|| Cow::Borrowed(std::any::type_name::<F>()));
        let mut source = None;
        let uuid = match self.identity {
            Some(IdentitySpec::Explicit(uuid)) => uuid,
            Some(IdentitySpec::Source(text)) => {
                source = Some(text);
                digest_of_source([SourceArg::object(&name, Some(text))])?
            }
            Some(IdentitySpec::Versioned(version)) => {
                digest_of_mapping(&json!({ "pass": name, "version": version }))?
            }
            Some(IdentitySpec::Config(result)) => result?,
            None => return Err(PassIdentityError::source_unavailable(name)),
        };
        tracing::trace!(pass = %name, uuid = %uuid, "built callable pass");
        Ok(CallablePass {
            name,
            source,
            uuid,
            callable: self.callable,
        })
    }
}

impl<G, F, R> GraphPass<G> for CallablePass<F>
where
    G: ?Sized,
    F: Fn(&mut G) -> R + Send + Sync,
    R: Into<PassOutcome>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, graph: &mut G) -> PassOutcome {
        (self.callable)(graph).into()
    }

    fn source_text(&self) -> Option<&'static str> {
        self.source
    }

    fn uuid(&self) -> IdentityResult<PassDigest> {
        Ok(self.uuid.clone())
    }
}

impl<F> fmt::Debug for CallablePass<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallablePass")
            .field("name", &self.name)
            .field("uuid", &self.uuid)
            .finish_non_exhaustive()
    }
}
