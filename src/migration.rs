//! Bulk migration of note tags to canonical form.
//!
//! A pass reads every note, normalizes its `tags` field, drops rejected tags,
//! deduplicates in first-seen order and rewrites only the `tags` lines of
//! notes whose list changed. Each note is independent: a note that cannot be
//! read or parsed is counted and skipped.
//!
//! Dry runs go through the same code path and produce the same report, they
//! just never write.

mod backup;
mod driver;
mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

pub use backup::create_backup;
pub use driver::{MigrationError, Migrator, NotePlan, NoteStatus, dedup_first_seen};
pub use report::{
    ChangeRecord, DEFAULT_CHANGES_SHOWN, FileStats, MigrationReport, NoteError, RejectedTag,
};

use crate::config::{AppConfig, is_backup_path};
use crate::normalizer::TagNormalizer;
use crate::vault::discover_notes;

/// Options for [`migrate_vault`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrateOptions {
    pub dry_run: bool,
    /// Copy every note aside before writing. Ignored for dry runs.
    pub backup: bool,
}

/// Outcome of [`migrate_vault`].
#[derive(Debug, Clone)]
pub struct VaultMigration {
    pub report: MigrationReport,
    /// Where the notes were copied, when a backup was taken.
    pub backup: Option<PathBuf>,
}

/// Discovers every note under the configured vault and migrates them.
///
/// When a backup is requested it is taken in full before the first note is
/// touched.
///
/// # Errors
///
/// Returns an error if the vault cannot be walked or the backup fails. No
/// note has been modified when this returns an error.
pub fn migrate_vault(
    config: &AppConfig,
    normalizer: &TagNormalizer<'_>,
    options: MigrateOptions,
) -> Result<VaultMigration> {
    let root = &config.vault_root;
    let notes: Vec<PathBuf> = discover_notes(root, &config.skip_dirs)?
        .into_iter()
        .filter(|p| !is_backup_path(config, p))
        .collect();
    info!(root = %root.display(), notes = notes.len(), "discovered notes");

    let backup = if options.backup && !options.dry_run {
        let dir = create_backup(root, &notes, &config.backup_dir)
            .context("Backup failed, no notes were modified")?;
        Some(dir)
    } else {
        None
    };

    let report = Migrator::new(normalizer, options.dry_run)
        .with_root(root)
        .migrate(&notes);

    Ok(VaultMigration { report, backup })
}
