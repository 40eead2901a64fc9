pub mod check;
pub mod config;
pub mod frontmatter;
pub mod logging;
pub mod migration;
pub mod models;
pub mod normalizer;
pub mod taxonomy;
pub mod vault;

pub use check::{CheckReport, TaxonomyChecker};
pub use config::{AppConfig, AppConfigBuilder};
pub use migration::{MigrationReport, Migrator};
pub use models::{HierarchyPrefix, NormalizedResult, RejectReason};
pub use normalizer::{NormalizeStats, TagNormalizer};
pub use taxonomy::{ResolverRegistry, RuleTable};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_table_accessible_from_crate_root() {
        let table = RuleTable::builtin();
        assert!(table.is_ok());
    }

    #[test]
    fn types_accessible_from_crate_root() {
        let table = RuleTable::builtin().unwrap();
        let normalizer = TagNormalizer::new(&table);

        let result = normalizer.normalize("criticality/urgent", None, None);
        assert_eq!(
            result.rejection().map(|r| r.reason),
            Some(RejectReason::UnknownValue)
        );

        assert_eq!(HierarchyPrefix::Domain.to_string(), "domain");

        let report = MigrationReport::new(true);
        assert!(report.dry_run);
    }
}
