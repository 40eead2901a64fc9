//! Locating notes inside a vault directory.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::warn;
use walkdir::WalkDir;

/// Directory names never descended into.
pub const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    ".obsidian",
    "node_modules",
    ".backups",
    "Attachments",
    ".claude",
];

/// Finds every `.md` file under `root`, pruning directories named in
/// `skip_dirs`. The result is sorted so runs are reproducible.
///
/// Unreadable entries are logged and skipped.
///
/// # Errors
///
/// Returns an error if `root` itself is not a readable directory.
pub fn discover_notes(root: &Path, skip_dirs: &BTreeSet<String>) -> Result<Vec<PathBuf>> {
    let metadata = std::fs::metadata(root)
        .with_context(|| format!("Failed to read vault directory: {}", root.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("Vault path is not a directory: {}", root.display());
    }

    let walker = WalkDir::new(root).follow_links(false).into_iter();
    let mut notes = Vec::new();
    for entry in walker.filter_entry(|e| {
        e.depth() == 0
            || !e.file_type().is_dir()
            || !e
                .file_name()
                .to_str()
                .is_some_and(|name| skip_dirs.contains(name))
    }) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable vault entry");
                continue;
            }
        };
        if entry.file_type().is_file()
            && entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("md"))
        {
            notes.push(entry.into_path());
        }
    }

    notes.sort();
    Ok(notes)
}

/// Path of `path` relative to `root`, falling back to `path` itself.
pub fn relative_display(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn skip_set() -> BTreeSet<String> {
        DEFAULT_SKIP_DIRS.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn finds_markdown_and_prunes_skipped_dirs() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("Projects/Alpha")).unwrap();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::create_dir_all(root.join(".backups/old")).unwrap();
        fs::write(root.join("index.md"), "# index").unwrap();
        fs::write(root.join("Projects/Alpha/plan.MD"), "plan").unwrap();
        fs::write(root.join("Projects/Alpha/data.csv"), "a,b").unwrap();
        fs::write(root.join(".obsidian/workspace.md"), "x").unwrap();
        fs::write(root.join(".backups/old/index.md"), "x").unwrap();

        let notes = discover_notes(root, &skip_set()).unwrap();
        let rel: Vec<String> = notes.iter().map(|p| relative_display(root, p)).collect();
        assert_eq!(rel, vec!["Projects/Alpha/plan.MD", "index.md"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover_notes(&dir.path().join("nope"), &skip_set()).is_err());
    }

    #[test]
    fn file_root_is_an_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("note.md");
        fs::write(&file, "x").unwrap();
        assert!(discover_notes(&file, &skip_set()).is_err());
    }
}
