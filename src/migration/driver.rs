use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::frontmatter::{self, FrontmatterError, TagsField};
use crate::models::{NormalizedResult, NoteContext};
use crate::normalizer::{NormalizeStats, TagNormalizer};
use crate::vault::relative_display;

use super::report::{ChangeRecord, MigrationReport};

/// Errors that stop a single note from being migrated.
///
/// These never abort a batch; the driver counts them and moves on.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {source}", path.display())]
    Frontmatter {
        path: PathBuf,
        #[source]
        source: FrontmatterError,
    },
}

/// What a single note needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteStatus {
    NoFrontmatter,
    NoTagsField,
    EmptyTags,
    Unchanged,
    Changed { before: Vec<String>, after: Vec<String> },
}

/// The computed migration for one note, before anything is persisted.
#[derive(Debug, Clone)]
pub struct NotePlan {
    pub status: NoteStatus,
    /// Full note text with the tags field rewritten, present only when changed.
    pub rewritten: Option<String>,
    pub results: Vec<(String, NormalizedResult)>,
    pub stats: NormalizeStats,
}

impl NotePlan {
    fn skipped(status: NoteStatus) -> Self {
        Self {
            status,
            rewritten: None,
            results: Vec::new(),
            stats: NormalizeStats::default(),
        }
    }
}

/// Drives a migration pass over a set of notes.
///
/// Notes are processed one at a time. A failure in one note is recorded in
/// the report and has no effect on any other note.
///
/// # Examples
///
/// ```no_run
/// use std::path::PathBuf;
/// use tagvault::migration::Migrator;
/// use tagvault::normalizer::TagNormalizer;
/// use tagvault::taxonomy::RuleTable;
///
/// let table = RuleTable::builtin().unwrap();
/// let normalizer = TagNormalizer::new(&table);
/// let notes = vec![PathBuf::from("vault/Decisions/adr-001.md")];
///
/// let report = Migrator::new(&normalizer, true).migrate(&notes);
/// println!("{report}");
/// ```
#[derive(Debug)]
pub struct Migrator<'n, 't> {
    normalizer: &'n TagNormalizer<'t>,
    dry_run: bool,
    root: Option<PathBuf>,
}

impl<'n, 't> Migrator<'n, 't> {
    pub fn new(normalizer: &'n TagNormalizer<'t>, dry_run: bool) -> Self {
        Self {
            normalizer,
            dry_run,
            root: None,
        }
    }

    /// Reports file paths relative to `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Migrates every note in order and returns the aggregate report.
    pub fn migrate(&self, notes: &[PathBuf]) -> MigrationReport {
        let mut report = MigrationReport::new(self.dry_run);
        let total = notes.len();

        for (i, path) in notes.iter().enumerate() {
            if (i + 1) % 100 == 0 {
                info!("processing {}/{total}", i + 1);
            }
            self.migrate_one(path, &mut report);
        }

        info!(
            processed = report.files.processed,
            changed = report.files.changed,
            dry_run = self.dry_run,
            "migration pass finished"
        );
        report
    }

    fn display_path(&self, path: &Path) -> String {
        match &self.root {
            Some(root) => relative_display(root, path),
            None => path.to_string_lossy().into_owned(),
        }
    }

    fn migrate_one(&self, path: &Path, report: &mut MigrationReport) {
        let file = self.display_path(path);
        report.files.processed += 1;

        let plan = match self.migrate_note(path) {
            Ok(plan) => plan,
            Err(err) => {
                match &err {
                    MigrationError::Frontmatter { .. } => report.files.parse_errors += 1,
                    MigrationError::Read { .. } | MigrationError::Write { .. } => {
                        report.files.io_errors += 1
                    }
                }
                warn!(file = %file, error = %err, "skipping note");
                report.record_error(&file, error_chain(&err));
                return;
            }
        };

        report.tags.merge(&plan.stats);
        report.absorb_results(&file, &plan.results);

        match plan.status {
            NoteStatus::NoFrontmatter => report.files.no_frontmatter += 1,
            NoteStatus::NoTagsField => report.files.no_tags_field += 1,
            NoteStatus::EmptyTags => report.files.empty_tags += 1,
            NoteStatus::Unchanged => report.files.unchanged += 1,
            NoteStatus::Changed { before, after } => {
                debug!(file = %file, ?before, ?after, "tags changed");
                report.files.changed += 1;
                report.changes.push(ChangeRecord {
                    file,
                    before,
                    after,
                });
            }
        }
    }

    /// Reads, plans and (unless dry-run) persists one note.
    ///
    /// # Errors
    ///
    /// Returns an error if the note cannot be read, its front matter cannot
    /// be parsed or rewritten, or the rewritten note cannot be written.
    pub fn migrate_note(&self, path: &Path) -> Result<NotePlan, MigrationError> {
        let text = std::fs::read_to_string(path).map_err(|source| MigrationError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let plan = self
            .plan(&text)
            .map_err(|source| MigrationError::Frontmatter {
                path: path.to_path_buf(),
                source,
            })?;

        if !self.dry_run
            && let Some(rewritten) = &plan.rewritten
        {
            write_atomic(path, rewritten).map_err(|source| MigrationError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }

        Ok(plan)
    }

    /// Computes the migration for one note's text without touching disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the front matter does not parse or the tags field
    /// cannot be rewritten.
    pub fn plan(&self, text: &str) -> Result<NotePlan, FrontmatterError> {
        let Some(block) = frontmatter::split_frontmatter(text) else {
            return Ok(NotePlan::skipped(NoteStatus::NoFrontmatter));
        };
        let fields = frontmatter::parse_fields(block.yaml)?;
        let before = match fields.tags {
            TagsField::Missing => return Ok(NotePlan::skipped(NoteStatus::NoTagsField)),
            TagsField::Empty => return Ok(NotePlan::skipped(NoteStatus::EmptyTags)),
            TagsField::Present(tags) => tags,
        };

        let context = NoteContext::new(fields.note_type.as_deref(), Some(text));
        let mut stats = NormalizeStats::default();
        let mut results = Vec::with_capacity(before.len());
        for raw in &before {
            let result = self.normalizer.normalize_counted(raw, &context, &mut stats);
            results.push((raw.clone(), result));
        }

        let after = dedup_first_seen(results.iter().filter_map(|(_, r)| r.tag()));

        if after == before {
            return Ok(NotePlan {
                status: NoteStatus::Unchanged,
                rewritten: None,
                results,
                stats,
            });
        }

        let rewritten = frontmatter::replace_tags(text, &after)?;
        Ok(NotePlan {
            status: NoteStatus::Changed { before, after },
            rewritten: Some(rewritten),
            results,
            stats,
        })
    }
}

/// Keeps the first occurrence of each tag, preserving order.
pub fn dedup_first_seen<'a>(tags: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    tags.into_iter()
        .filter(|tag| seen.insert(*tag))
        .map(String::from)
        .collect()
}

fn write_atomic(path: &Path, contents: &str) -> std::io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let permissions = std::fs::metadata(path)?.permissions();

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    std::fs::set_permissions(tmp.path(), permissions)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::RuleTable;

    fn plan(text: &str) -> NotePlan {
        let table = RuleTable::builtin().unwrap();
        let normalizer = TagNormalizer::new(&table);
        Migrator::new(&normalizer, true).plan(text).unwrap()
    }

    #[test]
    fn dedup_keeps_first_occurrence_order() {
        let out = dedup_first_seen(["domain/data", "domain/data", "domain/cloud"]);
        assert_eq!(out, vec!["domain/data", "domain/cloud"]);
    }

    #[test]
    fn adr_note_is_migrated() {
        let text = "---\ntype: Adr\ntags: [\"#Architecture\", ai, domain/Security]\n---\nBody\n";
        let plan = plan(text);
        assert_eq!(
            plan.status,
            NoteStatus::Changed {
                before: vec![
                    "#Architecture".to_string(),
                    "ai".to_string(),
                    "domain/Security".to_string()
                ],
                after: vec![
                    "activity/architecture".to_string(),
                    "technology/ai".to_string(),
                    "domain/security".to_string()
                ],
            }
        );
        let rewritten = plan.rewritten.unwrap();
        assert!(rewritten.contains("tags: [activity/architecture, technology/ai, domain/security]"));
        assert!(rewritten.ends_with("---\nBody\n"));
    }

    #[test]
    fn rejected_tags_are_dropped() {
        let plan = plan("---\ntags: [\"{{ProjectName}}\", moc]\n---\n");
        match plan.status {
            NoteStatus::Changed { after, .. } => assert_eq!(after, vec!["moc"]),
            other => panic!("unexpected status {other:?}"),
        }
        assert_eq!(plan.stats.template_variables, 1);
    }

    #[test]
    fn canonical_tags_are_unchanged() {
        let plan = plan("---\ntags:\n  - domain/data\n  - moc\n---\n");
        assert_eq!(plan.status, NoteStatus::Unchanged);
        assert!(plan.rewritten.is_none());
    }

    #[test]
    fn skips_are_classified() {
        assert_eq!(plan("no front matter").status, NoteStatus::NoFrontmatter);
        assert_eq!(plan("---\ntitle: x\n---\n").status, NoteStatus::NoTagsField);
        assert_eq!(plan("---\ntags: []\n---\n").status, NoteStatus::EmptyTags);
    }

    #[test]
    fn duplicate_after_mapping_is_a_change() {
        let plan = plan("---\ntags: [ai, technology/ai]\n---\n");
        match plan.status {
            NoteStatus::Changed { after, .. } => assert_eq!(after, vec!["technology/ai"]),
            other => panic!("unexpected status {other:?}"),
        }
    }
}
