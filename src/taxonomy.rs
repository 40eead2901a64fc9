//! The taxonomy rule table and ambiguity resolvers.
//!
//! A [`RuleTable`] holds the enumerated hierarchy prefixes with their known
//! values, the approved flat tags, the migration mappings for legacy flat
//! tags and renamed prefixes, the ambiguous flat tags with their ordered
//! candidates, and per-note-type coverage expectations.
//!
//! Tables are validated on construction and immutable afterwards. A table
//! that would reject every hierarchical tag, or whose migration targets are
//! not themselves canonical, is refused before any note is read.
//!
//! # Examples
//!
//! ```
//! use tagvault::models::HierarchyPrefix;
//! use tagvault::taxonomy::{PrefixRule, RuleTable, RuleTableSpec};
//!
//! let mut spec = RuleTableSpec::default();
//! spec.prefixes.insert(HierarchyPrefix::Domain, PrefixRule::closed(["data", "security"]));
//! spec.prefix_renames.insert("old-scope/".into(), "domain/".into());
//!
//! let table = RuleTable::from_spec(spec).unwrap();
//! assert_eq!(table.renamed_prefix("old-scope"), Some(HierarchyPrefix::Domain));
//! ```

mod defaults;
mod loader;
mod resolver;
mod rules;

pub use defaults::builtin_spec;
pub use resolver::{AmbiguityResolver, ResolverRegistry, candidate_with_prefix};
pub use rules::{
    CoverageRule, MAX_LEVELS, Openness, PrefixRule, RuleTable, RuleTableError, RuleTableSpec,
    ValueCheck,
};
