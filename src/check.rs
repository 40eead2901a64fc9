//! Non-mutating validation of the tags stored in one note.
//!
//! Unlike a migration, a check reports what is wrong with the tags as they
//! are written and never rewrites anything. Findings are advisory; the CLI
//! only turns warnings into a failing exit code under `--strict`.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::frontmatter::{self, FrontmatterError, TagsField};
use crate::models::{Disposition, HierarchyPrefix, NormalizedResult, Notice};
use crate::normalizer::TagNormalizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Info,
}

/// One observation about a note's tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    /// The stored tag this is about, `None` for note-level findings.
    pub tag: Option<String>,
    pub message: String,
}

impl Finding {
    fn warning(tag: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            tag: tag.map(String::from),
            message: message.into(),
        }
    }

    fn info(tag: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            tag: tag.map(String::from),
            message: message.into(),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of checking one note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub note_type: Option<String>,
    pub tags: Vec<String>,
    pub findings: Vec<Finding>,
}

impl CheckReport {
    pub fn warnings(&self) -> impl Iterator<Item = &Finding> {
        self.findings
            .iter()
            .filter(|f| f.severity == Severity::Warning)
    }

    pub fn infos(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity == Severity::Info)
    }

    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }
}

/// Validates stored tags against the rule table behind a normalizer.
///
/// # Examples
///
/// ```
/// use tagvault::check::TaxonomyChecker;
/// use tagvault::normalizer::TagNormalizer;
/// use tagvault::taxonomy::RuleTable;
///
/// let table = RuleTable::builtin().unwrap();
/// let normalizer = TagNormalizer::new(&table);
/// let checker = TaxonomyChecker::new(&normalizer);
///
/// let report = checker.check("---\ntags: [AI]\n---\n").unwrap();
/// assert!(report.has_warnings());
/// ```
#[derive(Debug)]
pub struct TaxonomyChecker<'n, 't> {
    normalizer: &'n TagNormalizer<'t>,
}

impl<'n, 't> TaxonomyChecker<'n, 't> {
    pub fn new(normalizer: &'n TagNormalizer<'t>) -> Self {
        Self { normalizer }
    }

    /// Checks the note text. Notes without front matter or without tags
    /// produce an empty report.
    ///
    /// # Errors
    ///
    /// Returns an error if the front matter is present but does not parse.
    pub fn check(&self, text: &str) -> Result<CheckReport, FrontmatterError> {
        let Some(block) = frontmatter::split_frontmatter(text) else {
            return Ok(CheckReport::default());
        };
        let fields = frontmatter::parse_fields(block.yaml)?;
        let TagsField::Present(tags) = fields.tags else {
            return Ok(CheckReport {
                note_type: fields.note_type,
                ..CheckReport::default()
            });
        };

        let note_type = fields.note_type.as_deref();
        let mut findings = Vec::new();
        let mut present = BTreeSet::new();

        for raw in &tags {
            let result = self.normalizer.normalize(raw, note_type, Some(text));
            if let Some(prefix) = result.tag().and_then(prefix_of) {
                present.insert(prefix);
            }
            self.check_tag(raw, &result, &mut findings);
        }

        if let Some(note_type) = note_type {
            self.check_coverage(note_type, &present, &mut findings);
        }

        Ok(CheckReport {
            note_type: fields.note_type,
            tags,
            findings,
        })
    }

    fn check_tag(&self, raw: &str, result: &NormalizedResult, findings: &mut Vec<Finding>) {
        let stored = raw.trim();
        if stored.starts_with('#') {
            findings.push(Finding::warning(
                Some(raw),
                format!("Tag should not have # prefix in frontmatter: {stored}"),
            ));
        }
        if stored.chars().any(char::is_uppercase) {
            findings.push(Finding::warning(
                Some(raw),
                format!("Tag should be lowercase: {stored} -> {}", stored.to_lowercase()),
            ));
        }

        let accepted = match result {
            NormalizedResult::Rejected(rejection) => {
                findings.push(Finding::warning(
                    Some(raw),
                    format!("Invalid tag '{stored}': {}", rejection.detail),
                ));
                return;
            }
            NormalizedResult::Accepted(accepted) => accepted,
        };

        let spelled = stored.trim_start_matches('#').trim().to_lowercase();
        match accepted.disposition {
            Disposition::Mapped | Disposition::Resolved => findings.push(Finding::warning(
                Some(raw),
                format!(
                    "Tag should be hierarchical (use prefix/value): {stored} -> {}",
                    accepted.tag
                ),
            )),
            Disposition::Orphan => findings.push(Finding::warning(
                Some(raw),
                format!("Tag should be hierarchical (use prefix/value): {stored}"),
            )),
            Disposition::Hierarchical if accepted.tag != spelled => {
                findings.push(Finding::warning(
                    Some(raw),
                    format!("Tag {stored} should be written as {}", accepted.tag),
                ));
            }
            Disposition::Hierarchical | Disposition::ApprovedFlat => {}
        }

        for notice in &accepted.notices {
            if let Notice::UnknownOpenValue { .. } = notice {
                findings.push(Finding::info(Some(raw), format!("Note: {notice}")));
            }
        }
    }

    fn check_coverage(
        &self,
        note_type: &str,
        present: &BTreeSet<HierarchyPrefix>,
        findings: &mut Vec<Finding>,
    ) {
        let Some(rule) = self.normalizer.table().coverage_rule(note_type) else {
            return;
        };

        for prefix in rule.required.iter().filter(|p| !present.contains(*p)) {
            findings.push(Finding::warning(
                None,
                format!("Missing required tag prefix for {note_type}: {prefix}/"),
            ));
        }

        let missing: Vec<String> = rule
            .recommended
            .iter()
            .filter(|p| !present.contains(*p))
            .map(|p| format!("{p}/"))
            .collect();
        if !missing.is_empty() {
            findings.push(Finding::info(
                None,
                format!("Consider adding tags: {}", missing.join(", ")),
            ));
        }
    }
}

fn prefix_of(tag: &str) -> Option<HierarchyPrefix> {
    let (prefix, _) = tag.split_once('/')?;
    prefix.parse().ok()
}
