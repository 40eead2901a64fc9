use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use serde::Serialize;

use crate::models::{Disposition, NormalizedResult, RejectReason};
use crate::normalizer::NormalizeStats;

/// Number of change records shown by the text rendering unless overridden.
pub const DEFAULT_CHANGES_SHOWN: usize = 20;

/// One note whose tag list differs after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeRecord {
    pub file: String,
    pub before: Vec<String>,
    pub after: Vec<String>,
}

/// A tag dropped from a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedTag {
    pub file: String,
    pub tag: String,
    pub reason: RejectReason,
    pub detail: String,
}

/// A note that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteError {
    pub file: String,
    pub message: String,
}

/// Per-file outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileStats {
    pub processed: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub no_frontmatter: usize,
    pub no_tags_field: usize,
    pub empty_tags: usize,
    pub parse_errors: usize,
    pub io_errors: usize,
}

/// Aggregate result of a migration pass. Dry runs and real runs produce
/// the same shape so their outputs can be compared directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub files: FileStats,
    pub tags: NormalizeStats,
    pub changes: Vec<ChangeRecord>,
    pub rejected: Vec<RejectedTag>,
    /// Orphan flat tags and how many notes carry them.
    pub orphans: BTreeMap<String, usize>,
    /// Ambiguous tags, keyed `raw -> resolved`, with occurrence counts.
    pub resolved: BTreeMap<String, usize>,
    pub errors: Vec<NoteError>,
}

impl MigrationReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Self::default()
        }
    }

    /// Folds one note's normalization results into the review lists.
    pub(crate) fn absorb_results(&mut self, file: &str, results: &[(String, NormalizedResult)]) {
        for (raw, result) in results {
            match result {
                NormalizedResult::Accepted(accepted) => match accepted.disposition {
                    Disposition::Orphan => {
                        *self.orphans.entry(accepted.tag.clone()).or_default() += 1;
                    }
                    Disposition::Resolved => {
                        let source = raw.trim().trim_start_matches('#').to_lowercase();
                        let key = format!("{source} -> {}", accepted.tag);
                        *self.resolved.entry(key).or_default() += 1;
                    }
                    _ => {}
                },
                NormalizedResult::Rejected(rejection) => self.rejected.push(RejectedTag {
                    file: file.to_string(),
                    tag: raw.clone(),
                    reason: rejection.reason,
                    detail: rejection.detail.clone(),
                }),
            }
        }
    }

    pub(crate) fn record_error(&mut self, file: &str, message: impl Into<String>) {
        self.errors.push(NoteError {
            file: file.to_string(),
            message: message.into(),
        });
    }

    /// Renders the human-readable summary, listing at most `max_changes`
    /// change records.
    pub fn render(&self, max_changes: usize) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_summary(&mut out, max_changes);
        out
    }

    fn write_summary(&self, out: &mut String, max_changes: usize) -> fmt::Result {
        let banner = "=".repeat(70);
        let mode = if self.dry_run { "DRY RUN - " } else { "" };
        writeln!(out, "{banner}")?;
        writeln!(out, "{mode}Tag Migration Summary")?;
        writeln!(out, "{banner}")?;
        writeln!(out)?;

        let f = &self.files;
        writeln!(out, "Files:")?;
        writeln!(out, "  Processed:          {:>6}", f.processed)?;
        writeln!(out, "  Changed:            {:>6}", f.changed)?;
        writeln!(out, "  Unchanged:          {:>6}", f.unchanged)?;
        writeln!(out, "  No front matter:    {:>6}", f.no_frontmatter)?;
        writeln!(out, "  No tags field:      {:>6}", f.no_tags_field)?;
        writeln!(out, "  Empty tags:         {:>6}", f.empty_tags)?;
        writeln!(out, "  Parse errors:       {:>6}", f.parse_errors)?;
        writeln!(out, "  I/O errors:         {:>6}", f.io_errors)?;
        writeln!(out)?;

        let t = &self.tags;
        writeln!(out, "Tags:")?;
        writeln!(out, "  Seen:               {:>6}", t.tags_seen)?;
        writeln!(out, "  Flat -> hierarchy:  {:>6}", t.flat_to_hierarchical)?;
        writeln!(out, "  Prefix migrated:    {:>6}", t.hierarchy_migrated)?;
        writeln!(out, "  Case normalized:    {:>6}", t.case_normalized)?;
        writeln!(out, "  Inline # removed:   {:>6}", t.inline_prefix_removed)?;
        writeln!(out, "  Context-dependent:  {:>6}", t.context_dependent)?;
        writeln!(out, "  Orphan flat tags:   {:>6}", t.orphan_flat_tags)?;
        writeln!(out, "  Rejected:           {:>6}", t.rejected)?;
        if t.rejected > 0 {
            writeln!(
                out,
                "    empty {}, template {}, contamination {}, too deep {}, unknown prefix {}, unknown value {}",
                t.empty_tags,
                t.template_variables,
                t.contamination,
                t.too_many_levels,
                t.unknown_prefix,
                t.unknown_value
            )?;
        }

        if !self.changes.is_empty() {
            writeln!(out)?;
            let shown = self.changes.len().min(max_changes);
            writeln!(
                out,
                "{} files with changes (showing {shown}):",
                self.changes.len()
            )?;
            for change in self.changes.iter().take(max_changes) {
                writeln!(out)?;
                writeln!(out, "  {}", change.file)?;
                writeln!(out, "    Before: {:?}", change.before)?;
                writeln!(out, "    After:  {:?}", change.after)?;
            }
        }

        if !self.orphans.is_empty() {
            writeln!(out)?;
            writeln!(out, "Orphan flat tags (review):")?;
            for (tag, count) in &self.orphans {
                writeln!(out, "  {tag} ({count})")?;
            }
        }

        if !self.resolved.is_empty() {
            writeln!(out)?;
            writeln!(out, "Ambiguous tags resolved:")?;
            for (mapping, count) in &self.resolved {
                writeln!(out, "  {mapping} ({count})")?;
            }
        }

        if !self.errors.is_empty() {
            writeln!(out)?;
            writeln!(out, "Errors:")?;
            for error in &self.errors {
                writeln!(out, "  {}: {}", error.file, error.message)?;
            }
        }

        writeln!(out)?;
        writeln!(out, "{banner}")?;
        if self.dry_run {
            writeln!(out, "DRY RUN COMPLETE - no files were modified")?;
        } else {
            writeln!(out, "MIGRATION COMPLETE - modified {} files", f.changed)?;
        }
        writeln!(out, "{banner}")?;
        Ok(())
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_CHANGES_SHOWN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(dry_run: bool) -> MigrationReport {
        let mut report = MigrationReport::new(dry_run);
        report.files.processed = 3;
        report.files.changed = 1;
        report.changes.push(ChangeRecord {
            file: "Notes/a.md".to_string(),
            before: vec!["AI".to_string()],
            after: vec!["technology/ai".to_string()],
        });
        report
    }

    #[test]
    fn dry_run_banner_states_nothing_was_written() {
        let text = sample(true).to_string();
        assert!(text.contains("DRY RUN - Tag Migration Summary"));
        assert!(text.contains("no files were modified"));
        assert!(text.contains("Notes/a.md"));
    }

    #[test]
    fn real_run_reports_modified_count() {
        let text = sample(false).to_string();
        assert!(text.contains("MIGRATION COMPLETE - modified 1 files"));
    }

    #[test]
    fn change_list_is_truncated() {
        let mut report = sample(true);
        for i in 0..5 {
            report.changes.push(ChangeRecord {
                file: format!("n{i}.md"),
                before: Vec::new(),
                after: Vec::new(),
            });
        }
        let text = report.render(2);
        assert!(text.contains("6 files with changes (showing 2)"));
        assert!(text.contains("n0.md"));
        assert!(!text.contains("n1.md"));
    }

    #[test]
    fn json_contains_change_records() {
        let json = serde_json::to_value(sample(true)).unwrap();
        assert_eq!(json["dry_run"], true);
        assert_eq!(json["changes"][0]["after"][0], "technology/ai");
        assert_eq!(json["files"]["changed"], 1);
    }
}
