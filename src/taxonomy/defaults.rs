//! Built-in taxonomy used when no rules file is configured.

use crate::models::HierarchyPrefix;

use super::rules::{CoverageRule, PrefixRule, RuleTableSpec};

const ACTIVITY: &[&str] = &[
    "architecture",
    "implementation",
    "research",
    "evaluation",
    "operations",
    "delivery",
    "governance",
    "documentation",
    "modernisation",
    "integration",
    "compliance",
    "planning",
];

const DOMAIN: &[&str] = &[
    "engineering",
    "data",
    "integration",
    "cloud",
    "security",
    "aviation",
    "operations",
    "hr",
    "finance",
    "supply-chain",
    "maintenance",
    "planning",
    "documentation",
    "tooling",
    "platform",
    "identity",
    "analytics",
    "compliance",
    "infrastructure",
];

const TECHNOLOGY: &[&str] = &[
    // platforms and cloud
    "aws", "azure", "gcp", "sap", "btp", "salesforce",
    // data and integration
    "kafka", "snowflake", "databricks", "mq", "api", "kong", "apigee",
    // ai and ml
    "bedrock", "openai", "langchain", "ai", "ml",
    // databases
    "oracle", "postgresql", "mysql", "redis", "dynamodb", "mongodb",
    // infrastructure
    "kubernetes", "docker", "terraform", "lambda", "ecs",
    // applications
    "erp", "crm", "mdm", "saas",
    // languages
    "python", "javascript", "typescript", "java", "go", "rust", "dotnet",
];

const TYPE: &[&str] = &[
    "adr",
    "system",
    "scenario",
    "integration",
    "data-source",
    "hld",
    "lld",
    "runbook",
    "policy",
    "guardrail",
    "diagram",
    "canvas",
];

const CRITICALITY: &[&str] = &["critical", "high", "medium", "low"];

const STATUS: &[&str] = &["draft", "review", "approved", "deprecated", "archived", "synced"];

const AUDIENCE: &[&str] = &[
    "executive",
    "architect",
    "developer",
    "operations",
    "security",
    "data",
    "product",
    "business",
];

const APPROVED_FLAT: &[&str] = &["notion-import", "pdf-import", "moc", "daily", "video", "automation"];

/// Legacy flat tags with exactly one canonical home.
const FLAT_MIGRATIONS: &[(&str, &str)] = &[
    ("ai", "technology/ai"),
    ("ml", "technology/ml"),
    ("machine-learning", "technology/ml"),
    ("genai", "technology/ai"),
    ("llm", "technology/ai"),
    ("aws", "technology/aws"),
    ("azure", "technology/azure"),
    ("gcp", "technology/gcp"),
    ("sap", "technology/sap"),
    ("salesforce", "technology/salesforce"),
    ("kafka", "technology/kafka"),
    ("snowflake", "technology/snowflake"),
    ("databricks", "technology/databricks"),
    ("kubernetes", "technology/kubernetes"),
    ("k8s", "technology/kubernetes"),
    ("docker", "technology/docker"),
    ("terraform", "technology/terraform"),
    ("python", "technology/python"),
    ("typescript", "technology/typescript"),
    ("javascript", "technology/javascript"),
    ("rust", "technology/rust"),
    ("java", "technology/java"),
    ("postgres", "technology/postgresql"),
    ("postgresql", "technology/postgresql"),
    ("security", "domain/security"),
    ("cybersecurity", "domain/security"),
    ("data", "domain/data"),
    ("cloud", "domain/cloud"),
    ("finance", "domain/finance"),
    ("hr", "domain/hr"),
    ("analytics", "domain/analytics"),
    ("identity", "domain/identity"),
    ("iam", "domain/identity"),
    ("infrastructure", "domain/infrastructure"),
    ("platform", "domain/platform"),
    ("engineering", "domain/engineering"),
    ("research", "activity/research"),
    ("governance", "activity/governance"),
    ("implementation", "activity/implementation"),
    ("evaluation", "activity/evaluation"),
    ("delivery", "activity/delivery"),
    ("modernisation", "activity/modernisation"),
    ("modernization", "activity/modernisation"),
    ("adr", "type/adr"),
    ("hld", "type/hld"),
    ("lld", "type/lld"),
    ("runbook", "type/runbook"),
    ("policy", "type/policy"),
    ("guardrail", "type/guardrail"),
    ("diagram", "type/diagram"),
    ("draft", "status/draft"),
    ("deprecated", "status/deprecated"),
    ("archived", "status/archived"),
    ("executive", "audience/executive"),
];

/// Legacy hierarchy prefixes and the prefix that replaced them.
const PREFIX_RENAMES: &[(&str, HierarchyPrefix)] = &[
    ("area", HierarchyPrefix::Domain),
    ("scope", HierarchyPrefix::Domain),
    ("tech", HierarchyPrefix::Technology),
    ("tool", HierarchyPrefix::Technology),
    ("kind", HierarchyPrefix::Type),
    ("priority", HierarchyPrefix::Criticality),
    ("state", HierarchyPrefix::Status),
];

/// Flat tags that belong under more than one prefix, first candidate is the default.
const AMBIGUOUS: &[(&str, &[&str])] = &[
    ("architecture", &["activity/architecture", "domain/engineering"]),
    ("integration", &["activity/integration", "domain/integration"]),
    ("documentation", &["activity/documentation", "domain/documentation"]),
    ("operations", &["domain/operations", "activity/operations"]),
    ("compliance", &["domain/compliance", "activity/compliance"]),
    ("planning", &["activity/planning", "domain/planning"]),
];

/// Returns the built-in rules in serializable form.
pub fn builtin_spec() -> RuleTableSpec {
    use HierarchyPrefix::*;

    let mut spec = RuleTableSpec::default();

    spec.prefixes.insert(Activity, PrefixRule::closed(ACTIVITY.iter().copied()));
    spec.prefixes.insert(Domain, PrefixRule::closed(DOMAIN.iter().copied()));
    spec.prefixes.insert(Project, PrefixRule::open(Vec::<String>::new()));
    spec.prefixes
        .insert(Technology, PrefixRule::open(TECHNOLOGY.iter().copied()));
    spec.prefixes.insert(Type, PrefixRule::closed(TYPE.iter().copied()));
    spec.prefixes
        .insert(Criticality, PrefixRule::closed(CRITICALITY.iter().copied()));
    spec.prefixes.insert(Status, PrefixRule::closed(STATUS.iter().copied()));
    spec.prefixes.insert(Vendor, PrefixRule::open(Vec::<String>::new()));
    spec.prefixes
        .insert(Audience, PrefixRule::closed(AUDIENCE.iter().copied()));

    spec.approved_flat = APPROVED_FLAT.iter().map(|t| t.to_string()).collect();
    spec.flat_migrations = FLAT_MIGRATIONS
        .iter()
        .map(|(from, to)| (from.to_string(), to.to_string()))
        .collect();
    spec.prefix_renames = PREFIX_RENAMES
        .iter()
        .map(|(from, to)| (from.to_string(), to.as_str().to_string()))
        .collect();
    spec.ambiguous = AMBIGUOUS
        .iter()
        .map(|(tag, candidates)| {
            (
                tag.to_string(),
                candidates.iter().map(|c| c.to_string()).collect(),
            )
        })
        .collect();

    spec.coverage.insert(
        "Adr".to_string(),
        CoverageRule {
            required: vec![Activity],
            recommended: vec![Technology, Domain],
        },
    );
    spec.coverage.insert(
        "Project".to_string(),
        CoverageRule {
            required: vec![Project],
            recommended: vec![Domain],
        },
    );
    spec.coverage.insert(
        "System".to_string(),
        CoverageRule {
            required: vec![Type],
            recommended: vec![Domain, Technology, Criticality],
        },
    );
    spec.coverage.insert(
        "Page".to_string(),
        CoverageRule {
            required: Vec::new(),
            recommended: vec![Activity, Domain],
        },
    );
    spec.coverage.insert(
        "Meeting".to_string(),
        CoverageRule {
            required: Vec::new(),
            recommended: vec![Project, Domain],
        },
    );

    spec
}
