use std::collections::HashMap;
use std::fmt;

use crate::models::{HierarchyPrefix, NoteContext};

/// Strategy that picks one canonical target for an ambiguous flat tag.
///
/// Implementations return the index of the chosen candidate. `None`, or an
/// index past the end, falls back to the first candidate.
pub trait AmbiguityResolver: Send + Sync {
    fn resolve(&self, candidates: &[String], context: &NoteContext<'_>) -> Option<usize>;
}

impl<F> AmbiguityResolver for F
where
    F: Fn(&[String], &NoteContext<'_>) -> Option<usize> + Send + Sync,
{
    fn resolve(&self, candidates: &[String], context: &NoteContext<'_>) -> Option<usize> {
        self(candidates, context)
    }
}

/// Resolvers keyed by the lower-cased ambiguous tag.
///
/// Constructed explicitly and owned by a normalizer; there is no global
/// registry.
#[derive(Default)]
pub struct ResolverRegistry {
    resolvers: HashMap<String, Box<dyn AmbiguityResolver>>,
}

impl ResolverRegistry {
    /// Creates an empty registry. Every ambiguous tag resolves to its first candidate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the resolvers for `architecture`,
    /// `integration` and `documentation`.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register("architecture", resolve_architecture);
        registry.register("integration", resolve_integration);
        registry.register("documentation", resolve_documentation);
        registry
    }

    /// Registers (or replaces) the resolver for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, resolver: impl AmbiguityResolver + 'static) {
        self.resolvers
            .insert(tag.into().to_lowercase(), Box::new(resolver));
    }

    /// Picks a candidate for `tag`. Returns `None` only when `candidates` is empty.
    pub fn resolve<'c>(
        &self,
        tag: &str,
        candidates: &'c [String],
        context: &NoteContext<'_>,
    ) -> Option<&'c str> {
        let index = self
            .resolvers
            .get(tag)
            .and_then(|resolver| resolver.resolve(candidates, context))
            .filter(|&i| i < candidates.len())
            .unwrap_or(0);
        candidates.get(index).map(String::as_str)
    }
}

impl fmt::Debug for ResolverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.resolvers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("ResolverRegistry")
            .field("tags", &tags)
            .finish()
    }
}

/// Index of the first candidate under `prefix`.
pub fn candidate_with_prefix(candidates: &[String], prefix: HierarchyPrefix) -> Option<usize> {
    candidates
        .iter()
        .position(|c| c.split('/').next() == Some(prefix.as_str()))
}

fn resolve_architecture(candidates: &[String], context: &NoteContext<'_>) -> Option<usize> {
    if context.is_decision_record() || context.mentions("decision") {
        candidate_with_prefix(candidates, HierarchyPrefix::Activity)
    } else {
        None
    }
}

fn resolve_integration(candidates: &[String], context: &NoteContext<'_>) -> Option<usize> {
    if context.is_decision_record() || context.mentions("integration pattern") {
        candidate_with_prefix(candidates, HierarchyPrefix::Activity)
    } else {
        candidate_with_prefix(candidates, HierarchyPrefix::Domain)
    }
}

fn resolve_documentation(candidates: &[String], _context: &NoteContext<'_>) -> Option<usize> {
    candidate_with_prefix(candidates, HierarchyPrefix::Activity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(tags: &[&str]) -> Vec<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    fn pick_second(_: &[String], _: &NoteContext<'_>) -> Option<usize> {
        Some(1)
    }

    fn pick_ninth(_: &[String], _: &NoteContext<'_>) -> Option<usize> {
        Some(9)
    }

    #[test]
    fn unregistered_tag_takes_first_candidate() {
        let registry = ResolverRegistry::builtin();
        let options = candidates(&["domain/operations", "activity/operations"]);
        let picked = registry.resolve("operations", &options, &NoteContext::default());
        assert_eq!(picked, Some("domain/operations"));
    }

    #[test]
    fn integration_prefers_domain_without_signal() {
        let registry = ResolverRegistry::builtin();
        let options = candidates(&["activity/integration", "domain/integration"]);
        let picked = registry.resolve("integration", &options, &NoteContext::default());
        assert_eq!(picked, Some("domain/integration"));
    }

    #[test]
    fn integration_pattern_mention_selects_activity() {
        let registry = ResolverRegistry::builtin();
        let options = candidates(&["activity/integration", "domain/integration"]);
        let ctx = NoteContext::new(Some("Page"), Some("an integration pattern for events"));
        assert_eq!(
            registry.resolve("integration", &options, &ctx),
            Some("activity/integration")
        );
    }

    #[test]
    fn architecture_in_decision_record_selects_activity() {
        let registry = ResolverRegistry::builtin();
        let options = candidates(&["domain/engineering", "activity/architecture"]);
        let ctx = NoteContext::new(Some("Adr"), None);
        assert_eq!(
            registry.resolve("architecture", &options, &ctx),
            Some("activity/architecture")
        );
        assert_eq!(
            registry.resolve("architecture", &options, &NoteContext::default()),
            Some("domain/engineering")
        );
    }

    #[test]
    fn out_of_range_index_falls_back_to_first() {
        let mut registry = ResolverRegistry::new();
        registry.register("data", pick_ninth);
        let options = candidates(&["domain/data", "audience/data"]);
        assert_eq!(
            registry.resolve("data", &options, &NoteContext::default()),
            Some("domain/data")
        );
    }

    #[test]
    fn custom_resolver_replaces_builtin() {
        let mut registry = ResolverRegistry::builtin();
        registry.register("Documentation", pick_second);
        let options = candidates(&["activity/documentation", "domain/documentation"]);
        assert_eq!(
            registry.resolve("documentation", &options, &NoteContext::default()),
            Some("domain/documentation")
        );
    }

    #[test]
    fn empty_candidates_resolve_to_none() {
        let registry = ResolverRegistry::builtin();
        assert_eq!(
            registry.resolve("architecture", &[], &NoteContext::default()),
            None
        );
    }
}
