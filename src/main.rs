use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use tagvault::check::{CheckReport, Severity, TaxonomyChecker};
use tagvault::config::{AppConfig, AppConfigBuilder, ConfigError};
use tagvault::logging::init_logging;
use tagvault::migration::{DEFAULT_CHANGES_SHOWN, MigrateOptions, migrate_vault};
use tagvault::models::NormalizedResult;
use tagvault::normalizer::TagNormalizer;
use tagvault::taxonomy::{Openness, RuleTable};
use thiserror::Error;
use tracing::warn;

// ANSI color codes for terminal output
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// tagvault - hierarchical tag taxonomy for markdown vaults
#[derive(Parser)]
#[command(name = "tagvault")]
#[command(about = "Normalize, validate and migrate hierarchical tags in markdown notes")]
#[command(version)]
struct Cli {
    /// Increase log detail on stderr (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Taxonomy rules file (YAML or JSON); defaults to the built-in table
    #[arg(long, value_name = "FILE", global = true)]
    rules: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Rewrite every note's tags to canonical form
    Migrate(MigrateCommand),
    /// Validate the tags stored in individual notes
    Check(CheckCommand),
    /// Show how raw tags would be normalized
    Normalize(NormalizeCommand),
    /// Print the active rule table
    Rules(RulesCommand),
}

#[derive(Parser)]
struct MigrateCommand {
    /// Vault directory (defaults to TAGVAULT_ROOT or the current directory)
    #[arg(long, value_name = "DIR")]
    vault: Option<PathBuf>,

    /// Report what would change without writing any note
    #[arg(long)]
    dry_run: bool,

    /// Copy every note to a timestamped backup directory first
    #[arg(long)]
    backup: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Number of change records listed in the text report
    #[arg(long, value_name = "N", default_value_t = DEFAULT_CHANGES_SHOWN)]
    changes: usize,
}

#[derive(Parser)]
struct CheckCommand {
    /// Notes to check
    #[arg(value_name = "FILE", required = true)]
    files: Vec<PathBuf>,

    /// Exit with status 1 when any warning is found
    #[arg(long)]
    strict: bool,

    /// Print the findings as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct NormalizeCommand {
    /// Raw tags to normalize
    #[arg(value_name = "TAG", required = true)]
    tags: Vec<String>,

    /// Note type used to resolve ambiguous tags (e.g. Adr)
    #[arg(long = "type", value_name = "TYPE")]
    note_type: Option<String>,

    /// Note text used to resolve ambiguous tags
    #[arg(long, value_name = "TEXT")]
    context: Option<String>,
}

#[derive(Parser)]
struct RulesCommand {
    /// Print the rule table as JSON
    #[arg(long)]
    json: bool,
}

/// A failure caused by the invocation rather than by the program.
#[derive(Debug, Error)]
#[error("{0}")]
struct UserError(String);

fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Migrate(cmd) => handle_migrate(cmd, cli.rules.as_deref()),
        Commands::Check(cmd) => handle_check(cmd, cli.rules.as_deref()),
        Commands::Normalize(cmd) => handle_normalize(cmd, cli.rules.as_deref()),
        Commands::Rules(cmd) => handle_rules(cmd, cli.rules.as_deref()),
    };

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are bad arguments, missing or invalid rules files and strict
/// check failures. Everything else, such as I/O failures while walking the
/// vault or taking a backup, is internal.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        cause.is::<UserError>()
            || matches!(
                cause.downcast_ref::<ConfigError>(),
                Some(ConfigError::RulesNotFound(_) | ConfigError::Rules { .. })
            )
    })
}

fn build_config(vault: Option<&Path>, rules: Option<&Path>) -> Result<AppConfig> {
    let mut builder = AppConfigBuilder::new();
    if let Some(vault) = vault {
        builder = builder.vault_root(vault);
    }
    if let Some(rules) = rules {
        builder = builder.rules_path(rules);
    }
    Ok(builder.build()?)
}

fn handle_migrate(cmd: &MigrateCommand, rules: Option<&Path>) -> Result<()> {
    let config = build_config(cmd.vault.as_deref(), rules)?;
    if !config.vault_root.is_dir() {
        return Err(UserError(format!(
            "Vault directory not found: {}",
            config.vault_root.display()
        ))
        .into());
    }
    let table = config.load_rule_table()?;
    let normalizer = TagNormalizer::new(&table);

    if cmd.backup && cmd.dry_run {
        warn!("--backup has no effect with --dry-run");
    }
    let options = MigrateOptions {
        dry_run: cmd.dry_run,
        backup: cmd.backup,
    };
    let run = migrate_vault(&config, &normalizer, options)?;

    if cmd.json {
        let json =
            serde_json::to_string_pretty(&run.report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        if let Some(dir) = &run.backup {
            println!("Backup created: {}", dir.display());
            println!();
        }
        print!("{}", run.report.render(cmd.changes));
    }
    Ok(())
}

fn handle_check(cmd: &CheckCommand, rules: Option<&Path>) -> Result<()> {
    let config = build_config(None, rules)?;
    let table = config.load_rule_table()?;
    let normalizer = TagNormalizer::new(&table);
    let checker = TaxonomyChecker::new(&normalizer);

    let mut reports = Vec::with_capacity(cmd.files.len());
    let mut unreadable = 0usize;
    for file in &cmd.files {
        let outcome = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file.display()))
            .and_then(|text| {
                checker
                    .check(&text)
                    .with_context(|| format!("Failed to parse front matter in {}", file.display()))
            });
        match outcome {
            Ok(report) => reports.push((file.as_path(), report)),
            Err(e) => {
                unreadable += 1;
                eprintln!("{RED}error{RESET}: {e:#}");
            }
        }
    }

    if cmd.json {
        let entries: Vec<serde_json::Value> = reports
            .iter()
            .map(|(file, report)| {
                serde_json::json!({ "file": file.display().to_string(), "report": report })
            })
            .collect();
        let json = serde_json::to_string_pretty(&entries).context("Failed to serialize findings")?;
        println!("{json}");
    } else {
        for (file, report) in &reports {
            print_check_report(file, report);
        }
    }

    if unreadable > 0 {
        return Err(UserError(format!("{unreadable} file(s) could not be checked")).into());
    }
    let warnings: usize = reports.iter().map(|(_, r)| r.warnings().count()).sum();
    if cmd.strict && warnings > 0 {
        return Err(UserError(format!("tag check found {warnings} warning(s)")).into());
    }
    Ok(())
}

fn print_check_report(file: &Path, report: &CheckReport) {
    if report.is_clean() {
        return;
    }
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string());
    println!("{BOLD}Tag validation for {name}:{RESET}");
    for finding in &report.findings {
        match finding.severity {
            Severity::Warning => println!("   {YELLOW}warning{RESET}: {finding}"),
            Severity::Info => println!("   {DIM}info{RESET}: {finding}"),
        }
    }
}

fn handle_normalize(cmd: &NormalizeCommand, rules: Option<&Path>) -> Result<()> {
    let config = build_config(None, rules)?;
    let table = config.load_rule_table()?;
    let normalizer = TagNormalizer::new(&table);
    for raw in &cmd.tags {
        let result = normalizer.normalize(raw, cmd.note_type.as_deref(), cmd.context.as_deref());
        println!("{}", format_result(raw, &result));
    }
    Ok(())
}

fn format_result(raw: &str, result: &NormalizedResult) -> String {
    match result {
        NormalizedResult::Accepted(accepted) => {
            let mut line = format!(
                "{raw} -> {GREEN}{}{RESET} ({:?})",
                accepted.tag, accepted.disposition
            );
            for notice in &accepted.notices {
                line.push_str(&format!("\n    {DIM}{notice}{RESET}"));
            }
            line
        }
        NormalizedResult::Rejected(rejection) => {
            format!("{raw} -> {RED}rejected{RESET} {rejection}")
        }
    }
}

fn handle_rules(cmd: &RulesCommand, rules: Option<&Path>) -> Result<()> {
    let config = build_config(None, rules)?;
    let table = config.load_rule_table()?;

    if cmd.json {
        let json =
            serde_json::to_string_pretty(&table.to_spec()).context("Failed to serialize rules")?;
        println!("{json}");
        return Ok(());
    }

    match &config.rules_path {
        Some(path) => println!("{BOLD}Rules{RESET} {}", path.display()),
        None => println!("{BOLD}Rules{RESET} built-in"),
    }
    print_rule_table(&table);
    Ok(())
}

fn print_rule_table(table: &RuleTable) {
    let spec = table.to_spec();

    println!();
    println!("{BOLD}Prefixes{RESET}");
    for (prefix, rule) in table.prefixes() {
        let openness = match rule.openness {
            Openness::Open => "open",
            Openness::Closed => "closed",
        };
        let values: Vec<&str> = rule.values.iter().map(String::as_str).collect();
        if values.is_empty() {
            println!("  {prefix}/ ({openness})");
        } else {
            println!("  {prefix}/ ({openness}): {}", values.join(", "));
        }
    }

    println!();
    println!("{BOLD}Approved flat tags{RESET}");
    let approved: Vec<&str> = spec.approved_flat.iter().map(String::as_str).collect();
    println!("  {}", approved.join(", "));

    println!();
    println!("{BOLD}Prefix renames{RESET}");
    for (from, to) in &spec.prefix_renames {
        println!("  {from}/ -> {to}/");
    }

    println!();
    println!("{BOLD}Flat migrations{RESET}");
    for (from, to) in &spec.flat_migrations {
        println!("  {from} -> {to}");
    }

    println!();
    println!("{BOLD}Ambiguous tags{RESET}");
    for (tag, candidates) in &spec.ambiguous {
        println!("  {tag} -> {}", candidates.join(" | "));
    }

    println!();
    println!("{BOLD}Coverage{RESET}");
    for (note_type, rule) in &spec.coverage {
        let join = |prefixes: &[tagvault::HierarchyPrefix]| {
            prefixes
                .iter()
                .map(|p| format!("{p}/"))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!(
            "  {note_type}: required [{}] recommended [{}]",
            join(rule.required.as_slice()),
            join(rule.recommended.as_slice())
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn migrate_flags_parse() {
        let cli = Cli::try_parse_from([
            "tagvault", "-vv", "migrate", "--vault", "/v", "--dry-run", "--json", "--changes", "5",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Migrate(cmd) => {
                assert_eq!(cmd.vault, Some(PathBuf::from("/v")));
                assert!(cmd.dry_run);
                assert!(!cmd.backup);
                assert!(cmd.json);
                assert_eq!(cmd.changes, 5);
            }
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn migrate_changes_defaults_to_twenty() {
        let cli = Cli::try_parse_from(["tagvault", "migrate"]).unwrap();
        match cli.command {
            Commands::Migrate(cmd) => assert_eq!(cmd.changes, DEFAULT_CHANGES_SHOWN),
            _ => panic!("expected migrate"),
        }
    }

    #[test]
    fn rules_flag_is_global() {
        let cli = Cli::try_parse_from(["tagvault", "check", "a.md", "--rules", "t.yaml"]).unwrap();
        assert_eq!(cli.rules, Some(PathBuf::from("t.yaml")));
    }

    #[test]
    fn check_requires_a_file() {
        assert!(Cli::try_parse_from(["tagvault", "check"]).is_err());
    }

    #[test]
    fn normalize_accepts_type_and_context() {
        let cli = Cli::try_parse_from([
            "tagvault", "normalize", "architecture", "--type", "Adr", "--context", "A decision",
        ])
        .unwrap();
        match cli.command {
            Commands::Normalize(cmd) => {
                assert_eq!(cmd.tags, vec!["architecture"]);
                assert_eq!(cmd.note_type.as_deref(), Some("Adr"));
                assert_eq!(cmd.context.as_deref(), Some("A decision"));
            }
            _ => panic!("expected normalize"),
        }
    }

    #[test]
    fn user_errors_are_classified() {
        let strict: anyhow::Error = UserError("tag check found 1 warning(s)".into()).into();
        assert!(is_user_error(&strict));

        let missing: anyhow::Error = ConfigError::RulesNotFound(PathBuf::from("x.yaml")).into();
        assert!(is_user_error(&missing.context("loading rules")));

        let io = anyhow::anyhow!("Failed to read vault directory");
        assert!(!is_user_error(&io));
    }

    #[test]
    fn rejected_result_is_formatted_with_reason() {
        let table = RuleTable::builtin().unwrap();
        let normalizer = TagNormalizer::new(&table);
        let result = normalizer.normalize("{{ProjectName}}", None, None);
        let line = format_result("{{ProjectName}}", &result);
        assert!(line.contains("rejected"));
        assert!(line.contains("template_variable"));
    }
}
