//! Tag normalization and validation against a [`RuleTable`].
//!
//! [`TagNormalizer::normalize`] is a pure function of the raw tag, the note
//! context and the rule table. Run statistics live in a separate
//! [`NormalizeStats`] value that callers pass in explicitly.

use serde::Serialize;

use crate::models::{
    AcceptedTag, Disposition, HierarchyPrefix, NormalizedResult, NoteContext, Notice,
    RejectReason, Rejection,
};
use crate::taxonomy::{MAX_LEVELS, ResolverRegistry, RuleTable, ValueCheck};

/// Normalizes raw tags against a rule table.
///
/// # Examples
///
/// ```
/// use tagvault::normalizer::TagNormalizer;
/// use tagvault::taxonomy::RuleTable;
///
/// let table = RuleTable::builtin().unwrap();
/// let normalizer = TagNormalizer::new(&table);
///
/// assert_eq!(normalizer.normalize("AI", None, None).tag(), Some("technology/ai"));
/// assert_eq!(normalizer.normalize("Domain/Data", None, None).tag(), Some("domain/data"));
/// assert!(normalizer.normalize("{{ProjectName}}", None, None).tag().is_none());
/// ```
#[derive(Debug)]
pub struct TagNormalizer<'a> {
    table: &'a RuleTable,
    resolvers: ResolverRegistry,
}

impl<'a> TagNormalizer<'a> {
    /// Creates a normalizer with the built-in ambiguity resolvers.
    pub fn new(table: &'a RuleTable) -> Self {
        Self::with_resolvers(table, ResolverRegistry::builtin())
    }

    /// Creates a normalizer with a caller-supplied resolver registry.
    pub fn with_resolvers(table: &'a RuleTable, resolvers: ResolverRegistry) -> Self {
        Self { table, resolvers }
    }

    pub fn table(&self) -> &'a RuleTable {
        self.table
    }

    /// Classifies one raw tag. Never panics on malformed input.
    ///
    /// `note_content` is matched case-insensitively by the resolvers.
    pub fn normalize(
        &self,
        raw: &str,
        note_type: Option<&str>,
        note_content: Option<&str>,
    ) -> NormalizedResult {
        let context = NoteContext::new(note_type, note_content);
        match self.classify(raw, &context) {
            Ok(accepted) => NormalizedResult::Accepted(accepted),
            Err(rejection) => NormalizedResult::Rejected(rejection),
        }
    }

    /// Same as [`normalize`](Self::normalize), recording the outcome in `stats`.
    pub fn normalize_counted(
        &self,
        raw: &str,
        context: &NoteContext<'_>,
        stats: &mut NormalizeStats,
    ) -> NormalizedResult {
        let result = match self.classify(raw, context) {
            Ok(accepted) => NormalizedResult::Accepted(accepted),
            Err(rejection) => NormalizedResult::Rejected(rejection),
        };
        stats.record(&result);
        result
    }

    fn classify(&self, raw: &str, context: &NoteContext<'_>) -> Result<AcceptedTag, Rejection> {
        if raw.trim().is_empty() {
            return Err(Rejection::new(RejectReason::Empty, "empty tag"));
        }

        let mut notices = Vec::new();
        let trimmed = raw.trim();
        let stripped = trimmed.trim_start_matches('#');
        if stripped.len() != trimmed.len() {
            notices.push(Notice::HashStripped);
        }
        let tag = stripped.trim();
        if tag.is_empty() {
            return Err(Rejection::new(RejectReason::Empty, "tag is only '#' markers"));
        }

        if tag.contains("{{") || tag.contains("}}") {
            return Err(Rejection::new(
                RejectReason::TemplateVariable,
                format!("unresolved template placeholder in '{tag}'"),
            ));
        }

        if tag.starts_with("./") || tag.contains(":tags:") {
            return Err(Rejection::new(
                RejectReason::Contamination,
                format!("'{tag}' looks like a file path or grep artifact"),
            ));
        }

        if tag.contains('/') {
            self.classify_hierarchical(tag, notices)
        } else {
            Ok(self.classify_flat(tag, context, notices))
        }
    }

    fn classify_hierarchical(
        &self,
        tag: &str,
        mut notices: Vec<Notice>,
    ) -> Result<AcceptedTag, Rejection> {
        let mut segments: Vec<String> = tag.split('/').map(str::to_string).collect();

        let old_prefix = segments[0].to_lowercase();
        if let Some(renamed) = self.table.renamed_prefix(&old_prefix) {
            segments[0] = renamed.as_str().to_string();
            notices.push(Notice::HierarchyMigrated {
                from: old_prefix,
                to: renamed,
            });
        }

        let lowered: Vec<String> = segments.iter().map(|s| s.to_lowercase()).collect();
        if lowered != segments {
            notices.push(Notice::CaseNormalized);
        }
        let normalized = lowered.join("/");

        if lowered.len() > MAX_LEVELS {
            return Err(Rejection::new(
                RejectReason::TooManyLevels,
                format!("'{normalized}' has {} levels (max {MAX_LEVELS})", lowered.len()),
            ));
        }

        let prefix = lowered[0]
            .parse::<HierarchyPrefix>()
            .ok()
            .filter(|p| self.table.has_prefix(*p))
            .ok_or_else(|| {
                Rejection::new(
                    RejectReason::UnknownPrefix,
                    format!(
                        "unknown tag prefix '{}' in '{normalized}'. Valid: {}",
                        lowered[0],
                        self.table.valid_prefix_list()
                    ),
                )
            })?;

        let value = lowered.get(1).map(String::as_str).unwrap_or("");
        if !value.is_empty()
            && let Some(rule) = self.table.prefix_rule(prefix)
        {
            match rule.check(value) {
                ValueCheck::UnknownClosed => {
                    let known: Vec<&str> = rule.values.iter().map(String::as_str).collect();
                    return Err(Rejection::new(
                        RejectReason::UnknownValue,
                        format!(
                            "unknown value '{value}' for {prefix}/. Known: {}",
                            known.join(", ")
                        ),
                    ));
                }
                ValueCheck::UnknownOpen => notices.push(Notice::UnknownOpenValue {
                    prefix,
                    value: value.to_string(),
                }),
                ValueCheck::Known | ValueCheck::Unchecked => {}
            }
        }

        Ok(AcceptedTag::new(normalized, Disposition::Hierarchical).with_notices(notices))
    }

    fn classify_flat(
        &self,
        tag: &str,
        context: &NoteContext<'_>,
        mut notices: Vec<Notice>,
    ) -> AcceptedTag {
        let lowered = tag.to_lowercase();
        if lowered != tag {
            notices.push(Notice::CaseNormalized);
        }

        if let Some(target) = self.table.flat_migration(&lowered) {
            return AcceptedTag::new(target, Disposition::Mapped).with_notices(notices);
        }

        if let Some(candidates) = self.table.ambiguous_candidates(&lowered)
            && let Some(target) = self.resolvers.resolve(&lowered, candidates, context)
        {
            return AcceptedTag::new(target, Disposition::Resolved).with_notices(notices);
        }

        if self.table.is_approved_flat(&lowered) {
            return AcceptedTag::new(lowered, Disposition::ApprovedFlat).with_notices(notices);
        }

        AcceptedTag::new(lowered, Disposition::Orphan).with_notices(notices)
    }
}

/// Per-rule counters accumulated over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NormalizeStats {
    pub tags_seen: usize,
    pub accepted: usize,
    pub rejected: usize,

    pub inline_prefix_removed: usize,
    pub hierarchy_migrated: usize,
    pub case_normalized: usize,
    pub open_value_notices: usize,

    pub hierarchical: usize,
    pub flat_to_hierarchical: usize,
    pub context_dependent: usize,
    pub approved_flat: usize,
    pub orphan_flat_tags: usize,

    pub empty_tags: usize,
    pub template_variables: usize,
    pub contamination: usize,
    pub too_many_levels: usize,
    pub unknown_prefix: usize,
    pub unknown_value: usize,
}

impl NormalizeStats {
    /// Adds another set of counters into this one.
    pub fn merge(&mut self, other: &Self) {
        self.tags_seen += other.tags_seen;
        self.accepted += other.accepted;
        self.rejected += other.rejected;
        self.inline_prefix_removed += other.inline_prefix_removed;
        self.hierarchy_migrated += other.hierarchy_migrated;
        self.case_normalized += other.case_normalized;
        self.open_value_notices += other.open_value_notices;
        self.hierarchical += other.hierarchical;
        self.flat_to_hierarchical += other.flat_to_hierarchical;
        self.context_dependent += other.context_dependent;
        self.approved_flat += other.approved_flat;
        self.orphan_flat_tags += other.orphan_flat_tags;
        self.empty_tags += other.empty_tags;
        self.template_variables += other.template_variables;
        self.contamination += other.contamination;
        self.too_many_levels += other.too_many_levels;
        self.unknown_prefix += other.unknown_prefix;
        self.unknown_value += other.unknown_value;
    }

    pub fn record(&mut self, result: &NormalizedResult) {
        self.tags_seen += 1;
        match result {
            NormalizedResult::Accepted(accepted) => {
                self.accepted += 1;
                match accepted.disposition {
                    Disposition::Hierarchical => self.hierarchical += 1,
                    Disposition::Mapped => self.flat_to_hierarchical += 1,
                    Disposition::Resolved => self.context_dependent += 1,
                    Disposition::ApprovedFlat => self.approved_flat += 1,
                    Disposition::Orphan => self.orphan_flat_tags += 1,
                }
                for notice in &accepted.notices {
                    match notice {
                        Notice::HashStripped => self.inline_prefix_removed += 1,
                        Notice::HierarchyMigrated { .. } => self.hierarchy_migrated += 1,
                        Notice::CaseNormalized => self.case_normalized += 1,
                        Notice::UnknownOpenValue { .. } => self.open_value_notices += 1,
                    }
                }
            }
            NormalizedResult::Rejected(rejection) => {
                self.rejected += 1;
                match rejection.reason {
                    RejectReason::Empty => self.empty_tags += 1,
                    RejectReason::TemplateVariable => self.template_variables += 1,
                    RejectReason::Contamination => self.contamination += 1,
                    RejectReason::TooManyLevels => self.too_many_levels += 1,
                    RejectReason::UnknownPrefix => self.unknown_prefix += 1,
                    RejectReason::UnknownValue => self.unknown_value += 1,
                }
            }
        }
    }
}
