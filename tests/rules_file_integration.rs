//! Loading a rules file and using it for checks and migrations.
//!
//! These tests only use types exported from the `tagvault` crate, never the
//! CLI definitions in main.rs.

use std::fs;

use serial_test::serial;
use tagvault::check::{Severity, TaxonomyChecker};
use tagvault::config::{AppConfigBuilder, BACKUP_DIR_ENV, ConfigError, ROOT_ENV, RULES_ENV};
use tagvault::migration::{MigrateOptions, migrate_vault};
use tagvault::taxonomy::{RuleTable, RuleTableError, builtin_spec};
use tagvault::TagNormalizer;
use tempfile::TempDir;

const RULES_YAML: &str = "\
prefixes:
  domain:
    openness: closed
    values: [data, security]
  project:
    openness: open
approved_flat: [moc]
flat_migrations:
  sec: domain/security
prefix_renames:
  area/: domain/
coverage:
  Project:
    required: [project]
    recommended: [domain]
";

fn clear_env() {
    unsafe {
        std::env::remove_var(ROOT_ENV);
        std::env::remove_var(RULES_ENV);
        std::env::remove_var(BACKUP_DIR_ENV);
    }
}

#[test]
#[serial]
fn vault_migrates_with_rules_from_environment() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let vault = dir.path().join("vault");
    fs::create_dir_all(&vault).unwrap();
    let rules = dir.path().join("taxonomy.yaml");
    fs::write(&rules, RULES_YAML).unwrap();
    let note = vault.join("n.md");
    fs::write(&note, "---\ntags: [Sec, area/Data, moc, ai]\n---\n").unwrap();

    unsafe {
        std::env::set_var(ROOT_ENV, &vault);
        std::env::set_var(RULES_ENV, &rules);
    }
    let config = AppConfigBuilder::new().build().unwrap();
    clear_env();

    let table = config.load_rule_table().unwrap();
    let normalizer = TagNormalizer::new(&table);
    let run = migrate_vault(&config, &normalizer, MigrateOptions::default()).unwrap();

    assert_eq!(run.report.files.changed, 1);
    assert_eq!(run.report.orphans.get("ai"), Some(&1));
    assert_eq!(
        fs::read_to_string(&note).unwrap(),
        "---\ntags: [domain/security, domain/data, moc, ai]\n---\n"
    );
}

#[test]
#[serial]
fn coverage_rules_come_from_the_rules_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("taxonomy.yaml");
    fs::write(&rules, RULES_YAML).unwrap();

    let config = AppConfigBuilder::new()
        .vault_root(dir.path())
        .rules_path(&rules)
        .build()
        .unwrap();
    let table = config.load_rule_table().unwrap();
    let normalizer = TagNormalizer::new(&table);
    let checker = TaxonomyChecker::new(&normalizer);

    let report = checker
        .check("---\ntype: Project\ntags: [domain/data]\n---\n")
        .unwrap();
    let warnings: Vec<&str> = report.warnings().map(|f| f.message.as_str()).collect();
    assert_eq!(warnings, vec!["Missing required tag prefix for Project: project/"]);
    assert!(report.findings.iter().all(|f| f.severity == Severity::Warning));
}

#[test]
#[serial]
fn invalid_rules_file_fails_before_any_note_is_read() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("taxonomy.yaml");
    fs::write(
        &rules,
        "prefixes:\n  domain:\n    values: [data]\nflat_migrations:\n  x: domain/unknown\n",
    )
    .unwrap();

    let config = AppConfigBuilder::new()
        .vault_root(dir.path())
        .rules_path(&rules)
        .build()
        .unwrap();
    match config.load_rule_table() {
        Err(ConfigError::Rules {
            source: RuleTableError::InvalidTarget { .. },
            ..
        }) => {}
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn builtin_spec_round_trips_through_json_rules_file() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("taxonomy.json");
    fs::write(&rules, serde_json::to_string_pretty(&builtin_spec()).unwrap()).unwrap();

    let loaded = RuleTable::load(&rules).unwrap();
    assert_eq!(loaded, RuleTable::builtin().unwrap());
}
