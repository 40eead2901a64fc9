use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use time::OffsetDateTime;
use time::macros::format_description;
use tracing::info;

/// Copies every note into a fresh timestamped directory under `backup_root`,
/// keeping paths relative to `vault_root`.
///
/// The copy completes fully or returns an error; callers must not mutate any
/// note when this fails.
///
/// # Errors
///
/// Returns an error if the backup directory cannot be created or any note
/// cannot be copied.
pub fn create_backup(vault_root: &Path, notes: &[PathBuf], backup_root: &Path) -> Result<PathBuf> {
    let stamp = OffsetDateTime::now_utc()
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .context("Failed to format backup timestamp")?;

    std::fs::create_dir_all(backup_root).with_context(|| {
        format!("Failed to create backup directory: {}", backup_root.display())
    })?;
    let target = unique_dir(backup_root, &format!("tags_backup_{stamp}"))?;
    info!(path = %target.display(), notes = notes.len(), "creating backup");

    for note in notes {
        let relative = note.strip_prefix(vault_root).with_context(|| {
            format!(
                "Note {} is outside the vault {}",
                note.display(),
                vault_root.display()
            )
        })?;
        let dest = target.join(relative);
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::copy(note, &dest)
            .with_context(|| format!("Failed to back up {}", note.display()))?;
    }

    info!(path = %target.display(), "backup complete");
    Ok(target)
}

/// Creates `base/name`, or `base/name_N` if a backup from the same second exists.
fn unique_dir(base: &Path, name: &str) -> Result<PathBuf> {
    for attempt in 0..100 {
        let candidate = if attempt == 0 {
            base.join(name)
        } else {
            base.join(format!("{name}_{attempt}"))
        };
        match std::fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("Failed to create backup directory: {}", candidate.display())
                });
            }
        }
    }
    anyhow::bail!("Too many backups named {name} in {}", base.display())
}
