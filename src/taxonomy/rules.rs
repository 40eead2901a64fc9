use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Disposition, HierarchyPrefix, NormalizedResult};
use crate::normalizer::TagNormalizer;

use super::resolver::ResolverRegistry;

/// Maximum number of `/`-separated segments in a hierarchical tag.
pub const MAX_LEVELS: usize = 3;

/// Errors raised while loading or validating a rule table.
///
/// Any of these means the table cannot be trusted, so callers must stop
/// before touching a single note.
#[derive(Debug, Error)]
pub enum RuleTableError {
    /// No hierarchy prefixes configured; every hierarchical tag would be rejected.
    #[error("rule table defines no hierarchy prefixes")]
    EmptyPrefixSet,

    /// A renamed prefix points at a prefix the table does not define.
    #[error("prefix rename '{from}/' targets unknown prefix '{to}/'")]
    RenameTargetUnknown { from: String, to: String },

    /// A rename key is itself a valid prefix, which would rewrite canonical tags.
    #[error("prefix rename '{from}/' shadows a valid prefix")]
    RenameShadowsPrefix { from: String },

    /// A rename target is also a rename key.
    #[error("prefix rename '{from}/' -> '{to}/' chains into another rename")]
    RenameChain { from: String, to: String },

    /// A migration or ambiguity target is not a canonical hierarchical tag.
    #[error("target '{target}' for '{source_tag}' is not canonical: {reason}")]
    InvalidTarget {
        source_tag: String,
        target: String,
        reason: String,
    },

    /// An ambiguous tag lists no candidates.
    #[error("ambiguous tag '{tag}' has no candidate targets")]
    NoCandidates { tag: String },

    /// An approved flat tag is not lowercase or contains a separator.
    #[error("approved flat tag '{tag}' must be lowercase and contain no '/'")]
    InvalidFlatTag { tag: String },

    #[error("failed to read rules file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in rules file: {0}")]
    Yaml(#[source] serde_yaml::Error),

    #[error("invalid JSON in rules file: {0}")]
    Json(#[source] serde_json::Error),

    #[error(
        "unsupported rules file format: {} (expected .yaml, .yml or .json)",
        path.display()
    )]
    UnsupportedFormat { path: PathBuf },
}

/// Whether a prefix accepts values outside its known list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Openness {
    /// Unknown values are accepted with an informational notice.
    Open,
    /// Unknown values are rejected, provided the known list is non-empty.
    #[default]
    Closed,
}

/// Known leaf values for one prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixRule {
    #[serde(default)]
    pub openness: Openness,
    #[serde(default)]
    pub values: BTreeSet<String>,
}

/// Result of looking up a leaf value under a prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueCheck {
    Known,
    /// Not listed; the prefix is open.
    UnknownOpen,
    /// Not listed; the prefix is closed and its list is non-empty.
    UnknownClosed,
    /// Closed prefix with an empty list: nothing to check against.
    Unchecked,
}

impl PrefixRule {
    pub fn open<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            openness: Openness::Open,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn closed<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            openness: Openness::Closed,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn check(&self, value: &str) -> ValueCheck {
        if self.values.contains(value) {
            return ValueCheck::Known;
        }
        match self.openness {
            Openness::Open => ValueCheck::UnknownOpen,
            Openness::Closed if self.values.is_empty() => ValueCheck::Unchecked,
            Openness::Closed => ValueCheck::UnknownClosed,
        }
    }
}

/// Prefixes a note of a given type is expected to carry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRule {
    #[serde(default)]
    pub required: Vec<HierarchyPrefix>,
    #[serde(default)]
    pub recommended: Vec<HierarchyPrefix>,
}

/// Serializable form of a rule table, as found in a rules file.
///
/// Convert with [`RuleTable::from_spec`], which normalizes keys and
/// validates the result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleTableSpec {
    pub prefixes: BTreeMap<HierarchyPrefix, PrefixRule>,
    pub approved_flat: BTreeSet<String>,
    pub flat_migrations: BTreeMap<String, String>,
    pub prefix_renames: BTreeMap<String, String>,
    pub ambiguous: BTreeMap<String, Vec<String>>,
    pub coverage: BTreeMap<String, CoverageRule>,
}

/// The immutable taxonomy consulted by the normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleTable {
    prefixes: BTreeMap<HierarchyPrefix, PrefixRule>,
    approved_flat: BTreeSet<String>,
    flat_migrations: BTreeMap<String, String>,
    prefix_renames: BTreeMap<String, HierarchyPrefix>,
    ambiguous: BTreeMap<String, Vec<String>>,
    coverage: BTreeMap<String, CoverageRule>,
}

impl RuleTable {
    /// Builds and validates a table from its serializable form.
    ///
    /// Mapping keys are lower-cased; rename keys and targets may be written
    /// with or without a trailing `/`.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleTableError`] describing the first inconsistency found.
    pub fn from_spec(spec: RuleTableSpec) -> Result<Self, RuleTableError> {
        if spec.prefixes.is_empty() {
            return Err(RuleTableError::EmptyPrefixSet);
        }

        let mut prefix_renames = BTreeMap::new();
        for (from, to) in &spec.prefix_renames {
            let from = trim_prefix(from);
            let to_name = trim_prefix(to);
            let target = to_name
                .parse::<HierarchyPrefix>()
                .ok()
                .filter(|p| spec.prefixes.contains_key(p))
                .ok_or_else(|| RuleTableError::RenameTargetUnknown {
                    from: from.clone(),
                    to: to_name.clone(),
                })?;
            prefix_renames.insert(from, target);
        }

        let table = Self {
            prefixes: spec.prefixes,
            approved_flat: spec.approved_flat,
            flat_migrations: lowercase_keys(spec.flat_migrations),
            prefix_renames,
            ambiguous: lowercase_keys(spec.ambiguous),
            coverage: spec.coverage,
        };
        table.validate()?;
        Ok(table)
    }

    /// Returns the serializable form of this table.
    pub fn to_spec(&self) -> RuleTableSpec {
        RuleTableSpec {
            prefixes: self.prefixes.clone(),
            approved_flat: self.approved_flat.clone(),
            flat_migrations: self.flat_migrations.clone(),
            prefix_renames: self
                .prefix_renames
                .iter()
                .map(|(from, to)| (from.clone(), to.as_str().to_string()))
                .collect(),
            ambiguous: self.ambiguous.clone(),
            coverage: self.coverage.clone(),
        }
    }

    fn validate(&self) -> Result<(), RuleTableError> {
        for (from, to) in &self.prefix_renames {
            if from.parse::<HierarchyPrefix>().is_ok_and(|p| self.prefixes.contains_key(&p)) {
                return Err(RuleTableError::RenameShadowsPrefix { from: from.clone() });
            }
            if self.prefix_renames.contains_key(to.as_str()) {
                return Err(RuleTableError::RenameChain {
                    from: from.clone(),
                    to: to.to_string(),
                });
            }
        }

        for tag in &self.approved_flat {
            if tag.contains('/') || *tag != tag.to_lowercase() || tag.trim().is_empty() {
                return Err(RuleTableError::InvalidFlatTag { tag: tag.clone() });
            }
        }

        // Targets must already be canonical, or a second migration pass
        // would rewrite them again.
        let normalizer = TagNormalizer::with_resolvers(self, ResolverRegistry::new());
        let check = |source: &str, target: &str| -> Result<(), RuleTableError> {
            let invalid = |reason: String| RuleTableError::InvalidTarget {
                source_tag: source.to_string(),
                target: target.to_string(),
                reason,
            };
            if !target.contains('/') {
                return Err(invalid("target must be hierarchical".to_string()));
            }
            match normalizer.normalize(target, None, None) {
                NormalizedResult::Accepted(accepted)
                    if accepted.tag == target
                        && accepted.disposition == Disposition::Hierarchical =>
                {
                    Ok(())
                }
                NormalizedResult::Accepted(accepted) => Err(invalid(format!(
                    "normalizes to '{}'",
                    accepted.tag
                ))),
                NormalizedResult::Rejected(rejection) => Err(invalid(rejection.to_string())),
            }
        };

        for (source, target) in &self.flat_migrations {
            check(source, target)?;
        }
        for (source, candidates) in &self.ambiguous {
            if candidates.is_empty() {
                return Err(RuleTableError::NoCandidates {
                    tag: source.clone(),
                });
            }
            for candidate in candidates {
                check(source, candidate)?;
            }
        }

        Ok(())
    }

    pub fn prefix_rule(&self, prefix: HierarchyPrefix) -> Option<&PrefixRule> {
        self.prefixes.get(&prefix)
    }

    pub fn has_prefix(&self, prefix: HierarchyPrefix) -> bool {
        self.prefixes.contains_key(&prefix)
    }

    /// Comma-separated list of configured prefixes, sorted.
    pub fn valid_prefix_list(&self) -> String {
        self.prefixes
            .keys()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn prefixes(&self) -> impl Iterator<Item = (&HierarchyPrefix, &PrefixRule)> {
        self.prefixes.iter()
    }

    /// New prefix for a renamed one. `old` must be lower-cased.
    pub fn renamed_prefix(&self, old: &str) -> Option<HierarchyPrefix> {
        self.prefix_renames.get(old).copied()
    }

    /// Canonical target for a legacy flat tag. `tag` must be lower-cased.
    pub fn flat_migration(&self, tag: &str) -> Option<&str> {
        self.flat_migrations.get(tag).map(String::as_str)
    }

    /// Ordered candidates for an ambiguous flat tag. `tag` must be lower-cased.
    pub fn ambiguous_candidates(&self, tag: &str) -> Option<&[String]> {
        self.ambiguous.get(tag).map(Vec::as_slice)
    }

    pub fn is_approved_flat(&self, tag: &str) -> bool {
        self.approved_flat.contains(tag)
    }

    pub fn coverage_rule(&self, note_type: &str) -> Option<&CoverageRule> {
        self.coverage.get(note_type)
    }
}

fn trim_prefix(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_lowercase()
}

fn lowercase_keys<V>(map: BTreeMap<String, V>) -> BTreeMap<String, V> {
    map.into_iter()
        .map(|(k, v)| (k.trim().to_lowercase(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_spec() -> RuleTableSpec {
        let mut spec = RuleTableSpec::default();
        spec.prefixes.insert(
            HierarchyPrefix::Domain,
            PrefixRule::closed(["data", "security"]),
        );
        spec.prefixes
            .insert(HierarchyPrefix::Technology, PrefixRule::open(["ai"]));
        spec
    }

    #[test]
    fn empty_prefix_set_fails_fast() {
        let err = RuleTable::from_spec(RuleTableSpec::default()).unwrap_err();
        assert!(matches!(err, RuleTableError::EmptyPrefixSet));
    }

    #[test]
    fn rename_keys_accept_trailing_slash() {
        let mut spec = minimal_spec();
        spec.prefix_renames
            .insert("Old-Scope/".to_string(), "domain/".to_string());
        let table = RuleTable::from_spec(spec).unwrap();
        assert_eq!(
            table.renamed_prefix("old-scope"),
            Some(HierarchyPrefix::Domain)
        );
    }

    #[test]
    fn rename_to_unconfigured_prefix_is_rejected() {
        let mut spec = minimal_spec();
        spec.prefix_renames
            .insert("scope".to_string(), "audience".to_string());
        let err = RuleTable::from_spec(spec).unwrap_err();
        assert!(matches!(err, RuleTableError::RenameTargetUnknown { .. }));
    }

    #[test]
    fn rename_shadowing_valid_prefix_is_rejected() {
        let mut spec = minimal_spec();
        spec.prefix_renames
            .insert("technology".to_string(), "domain".to_string());
        let err = RuleTable::from_spec(spec).unwrap_err();
        assert!(matches!(err, RuleTableError::RenameShadowsPrefix { .. }));
    }

    #[test]
    fn non_canonical_flat_target_is_rejected() {
        let mut spec = minimal_spec();
        spec.flat_migrations
            .insert("urgent".to_string(), "domain/urgent".to_string());
        let err = RuleTable::from_spec(spec).unwrap_err();
        assert!(matches!(err, RuleTableError::InvalidTarget { .. }));
    }

    #[test]
    fn uppercase_flat_target_is_rejected() {
        let mut spec = minimal_spec();
        spec.flat_migrations
            .insert("ai".to_string(), "Technology/AI".to_string());
        assert!(RuleTable::from_spec(spec).is_err());
    }

    #[test]
    fn flat_target_must_be_hierarchical() {
        let mut spec = minimal_spec();
        spec.flat_migrations
            .insert("ai".to_string(), "artificial-intelligence".to_string());
        assert!(RuleTable::from_spec(spec).is_err());
    }

    #[test]
    fn ambiguous_entry_needs_candidates() {
        let mut spec = minimal_spec();
        spec.ambiguous.insert("data".to_string(), Vec::new());
        let err = RuleTable::from_spec(spec).unwrap_err();
        assert!(matches!(err, RuleTableError::NoCandidates { .. }));
    }

    #[test]
    fn mapping_keys_are_lowercased() {
        let mut spec = minimal_spec();
        spec.flat_migrations
            .insert("AI".to_string(), "technology/ai".to_string());
        let table = RuleTable::from_spec(spec).unwrap();
        assert_eq!(table.flat_migration("ai"), Some("technology/ai"));
    }

    #[test]
    fn approved_flat_tags_must_be_lowercase() {
        let mut spec = minimal_spec();
        spec.approved_flat.insert("MOC".to_string());
        let err = RuleTable::from_spec(spec).unwrap_err();
        assert!(matches!(err, RuleTableError::InvalidFlatTag { .. }));
    }

    #[test]
    fn closed_prefix_with_empty_list_is_unchecked() {
        assert_eq!(
            PrefixRule::closed(Vec::<String>::new()).check("anything"),
            ValueCheck::Unchecked
        );
        assert_eq!(
            PrefixRule::closed(["low"]).check("urgent"),
            ValueCheck::UnknownClosed
        );
        assert_eq!(PrefixRule::open(["ai"]).check("newtool"), ValueCheck::UnknownOpen);
        assert_eq!(PrefixRule::open(["ai"]).check("ai"), ValueCheck::Known);
    }

    #[test]
    fn spec_round_trips_through_table() {
        let mut spec = minimal_spec();
        spec.prefix_renames
            .insert("old-scope".to_string(), "domain".to_string());
        let table = RuleTable::from_spec(spec.clone()).unwrap();
        assert_eq!(table.to_spec(), spec);
    }
}
