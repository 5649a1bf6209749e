use super::digest::{digest_of_source, PassDigest, SourceArg};
use super::IdentityResult;

/// Result returned by a [`GraphPass`] after it runs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassOutcome {
    /// Whether the pass changed the graph.
    pub changed: bool,
    /// Number of rewrites the pass applied.
    pub rewrites_applied: usize,
}

impl PassOutcome {
    pub fn changed(rewrites_applied: usize) -> Self {
        PassOutcome {
            changed: rewrites_applied > 0,
            rewrites_applied,
        }
    }

    /// Merges two run results, accumulating statistics.
    pub fn merge(self, other: PassOutcome) -> PassOutcome {
        PassOutcome {
            changed: self.changed || other.changed,
            rewrites_applied: self.rewrites_applied + other.rewrites_applied,
        }
    }
}

impl From<()> for PassOutcome {
    fn from(_: ()) -> Self {
        PassOutcome::default()
    }
}

impl From<bool> for PassOutcome {
    fn from(changed: bool) -> Self {
        PassOutcome {
            changed,
            rewrites_applied: 0,
        }
    }
}

/// Unit of graph-rewriting logic with a stable identity.
///
/// The default [`GraphPass::uuid`] hashes the source captured for the implementing type, so
/// implementations either carry `#[pass_source]` on their impl block or override `uuid`.
/// Editing anything inside a captured impl block changes the digest, including edits that do not
/// change behavior.
pub trait GraphPass<G: ?Sized>: Send + Sync {
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn run(&self, graph: &mut G) -> PassOutcome;

    /// Source text of the implementation, when captured.
    fn source_text(&self) -> Option<&'static str> {
        None
    }

    fn source_arg(&self) -> SourceArg<'_> {
        SourceArg::object(self.name(), self.source_text())
    }

    /// Cache identity of this pass.
    fn uuid(&self) -> IdentityResult<PassDigest> {
        digest_of_source([self.source_arg()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::PassIdentityError;

    struct Uncaptured;

    impl GraphPass<Vec<u32>> for Uncaptured {
        fn run(&self, graph: &mut Vec<u32>) -> PassOutcome {
            graph.clear();
            true.into()
        }
    }

    struct Captured;

    impl GraphPass<Vec<u32>> for Captured {
        fn name(&self) -> &str {
            "captured"
        }

        fn run(&self, graph: &mut Vec<u32>) -> PassOutcome {
            graph.sort_unstable();
            PassOutcome::default()
        }

        fn source_text(&self) -> Option<&'static str> {
            Some("abc")
        }
    }

    #[test]
    fn default_uuid_hashes_captured_source() {
        let uuid = Captured.uuid().unwrap();
        assert_eq!(uuid, digest_of_source(["abc"]).unwrap());
    }

    #[test]
    fn uncaptured_pass_has_no_fallback_identity() {
        let err = Uncaptured.uuid().unwrap_err();
        match err {
            PassIdentityError::SourceUnavailable { pass } => {
                assert!(pass.ends_with("Uncaptured"), "{pass}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn outcomes_merge() {
        let merged = PassOutcome::changed(2)
            .merge(PassOutcome::default())
            .merge(PassOutcome::changed(3));
        assert_eq!(
            merged,
            PassOutcome {
                changed: true,
                rewrites_applied: 5
            }
        );
        assert!(!PassOutcome::from(()).changed);
    }

    #[test]
    fn run_mutates_the_graph() {
        let mut graph = vec![3, 1, 2];
        Captured.run(&mut graph);
        assert_eq!(graph, vec![1, 2, 3]);
        assert!(Uncaptured.run(&mut graph).changed);
        assert!(graph.is_empty());
    }
}
