use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use super::digest::{digest_of_source, PassDigest};
use super::identity::{GraphPass, PassOutcome};
use super::IdentityResult;

/// Ordered list of passes applied to one graph.
///
/// The pipeline is itself a pass; its identity combines member identities in order, so
/// reordering, adding or changing a pass produces a different cache key.
pub struct PassPipeline<G: ?Sized> {
    name: Cow<'static, str>,
    passes: Vec<Arc<dyn GraphPass<G>>>,
}

impl<G: ?Sized> PassPipeline<G> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            passes: Vec::new(),
        }
    }

    pub fn push(&mut self, pass: Arc<dyn GraphPass<G>>) {
        self.passes.push(pass);
    }

    pub fn with_pass(mut self, pass: Arc<dyn GraphPass<G>>) -> Self {
        self.push(pass);
        self
    }

    pub fn passes(&self) -> &[Arc<dyn GraphPass<G>>] {
        &self.passes
    }

    pub fn len(&self) -> usize {
        self.passes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    /// Member identities in execution order.
    pub fn member_uuids(&self) -> IdentityResult<Vec<PassDigest>> {
        self.passes.iter().map(|pass| pass.uuid()).collect()
    }
}

impl<G: ?Sized> GraphPass<G> for PassPipeline<G> {
    fn name(&self) -> &str {
        &self.name
    }

    fn run(&self, graph: &mut G) -> PassOutcome {
        let mut total = PassOutcome::default();
        for (index, pass) in self.passes.iter().enumerate() {
            let outcome = pass.run(graph);
            tracing::debug!(
                pipeline = %self.name,
                index,
                pass = pass.name(),
                changed = outcome.changed,
                rewrites = outcome.rewrites_applied,
                "ran graph pass"
            );
            total = total.merge(outcome);
        }
        total
    }

    fn uuid(&self) -> IdentityResult<PassDigest> {
        let members = self.member_uuids()?;
        digest_of_source(members.iter().map(PassDigest::as_str))
    }
}

impl<G: ?Sized> fmt::Debug for PassPipeline<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.passes.iter().map(|pass| pass.name()).collect();
        f.debug_struct("PassPipeline")
            .field("name", &self.name)
            .field("passes", &names)
            .finish()
    }
}
