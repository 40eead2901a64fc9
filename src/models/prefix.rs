use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// First segment of a hierarchical tag.
///
/// The set is closed: a hierarchical tag whose prefix is not one of these
/// variants is rejected by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HierarchyPrefix {
    Activity,
    Audience,
    Criticality,
    Domain,
    Project,
    Status,
    Technology,
    Type,
    Vendor,
}

impl HierarchyPrefix {
    /// Every prefix, in alphabetical order of its tag spelling.
    pub const ALL: [HierarchyPrefix; 9] = [
        Self::Activity,
        Self::Audience,
        Self::Criticality,
        Self::Domain,
        Self::Project,
        Self::Status,
        Self::Technology,
        Self::Type,
        Self::Vendor,
    ];

    /// Returns the spelling used inside tags (e.g. `"domain"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Activity => "activity",
            Self::Domain => "domain",
            Self::Project => "project",
            Self::Technology => "technology",
            Self::Type => "type",
            Self::Criticality => "criticality",
            Self::Status => "status",
            Self::Vendor => "vendor",
            Self::Audience => "audience",
        }
    }
}

impl fmt::Display for HierarchyPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a known prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown hierarchy prefix '{0}'")]
pub struct UnknownPrefix(pub String);

impl FromStr for HierarchyPrefix {
    type Err = UnknownPrefix;

    /// Parses an already lower-cased prefix. Matching is exact.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|prefix| prefix.as_str() == s)
            .ok_or_else(|| UnknownPrefix(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_prefix_from_its_spelling() {
        for prefix in HierarchyPrefix::ALL {
            assert_eq!(prefix.as_str().parse::<HierarchyPrefix>(), Ok(prefix));
        }
    }

    #[test]
    fn parsing_is_case_sensitive() {
        assert!("Domain".parse::<HierarchyPrefix>().is_err());
        assert!("old-scope".parse::<HierarchyPrefix>().is_err());
    }

    #[test]
    fn unknown_prefix_is_a_std_error() {
        let err = "colour".parse::<HierarchyPrefix>().unwrap_err();
        assert_eq!(err, UnknownPrefix("colour".to_string()));
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert_eq!(boxed.to_string(), "unknown hierarchy prefix 'colour'");
    }

    #[test]
    fn all_is_sorted_by_spelling() {
        let names: Vec<&str> = HierarchyPrefix::ALL.iter().map(|p| p.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn serializes_as_lowercase_name() {
        let json = serde_json::to_string(&HierarchyPrefix::Criticality).unwrap();
        assert_eq!(json, r#""criticality""#);
    }
}
