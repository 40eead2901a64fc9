use serde::{Deserialize, Serialize};
use std::fmt;

use super::HierarchyPrefix;

/// Outcome of normalizing one raw tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "lowercase")]
pub enum NormalizedResult {
    Accepted(AcceptedTag),
    Rejected(Rejection),
}

impl NormalizedResult {
    /// Returns the canonical tag when accepted.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Accepted(accepted) => Some(&accepted.tag),
            Self::Rejected(_) => None,
        }
    }

    /// Returns the rejection when the tag was dropped.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted(_) => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// A tag that survived normalization, with how it got there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedTag {
    pub tag: String,
    pub disposition: Disposition,
    pub notices: Vec<Notice>,
}

impl AcceptedTag {
    pub(crate) fn new(tag: impl Into<String>, disposition: Disposition) -> Self {
        Self {
            tag: tag.into(),
            disposition,
            notices: Vec::new(),
        }
    }

    pub(crate) fn with_notices(mut self, notices: Vec<Notice>) -> Self {
        self.notices = notices;
        self
    }

    /// True when the tag is a flat tag with no known classification.
    pub fn is_orphan(&self) -> bool {
        self.disposition == Disposition::Orphan
    }

    pub fn has_notice(&self, notice: &Notice) -> bool {
        self.notices.contains(notice)
    }
}

/// Which rule produced an accepted tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Hierarchical tag that passed prefix and value checks.
    Hierarchical,
    /// Flat tag rewritten through the flat-to-hierarchical mapping.
    Mapped,
    /// Ambiguous flat tag resolved from note type and content.
    Resolved,
    /// Flat tag on the approved list.
    ApprovedFlat,
    /// Flat tag kept as-is for human review.
    Orphan,
}

/// Non-blocking observations attached to an accepted tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notice {
    /// One or more leading `#` markers were removed.
    HashStripped,
    /// The prefix was renamed through the prefix migration mapping.
    HierarchyMigrated { from: String, to: HierarchyPrefix },
    /// The tag contained uppercase characters.
    CaseNormalized,
    /// An open prefix carried a value outside its known list.
    UnknownOpenValue {
        prefix: HierarchyPrefix,
        value: String,
    },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HashStripped => write!(f, "removed inline '#' prefix"),
            Self::HierarchyMigrated { from, to } => {
                write!(f, "renamed prefix '{from}/' to '{to}/'")
            }
            Self::CaseNormalized => write!(f, "converted to lowercase"),
            Self::UnknownOpenValue { prefix, value } => {
                write!(f, "'{value}' is not in known {prefix}/ values (may be new)")
            }
        }
    }
}

/// Why a tag was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    Empty,
    TemplateVariable,
    Contamination,
    TooManyLevels,
    UnknownPrefix,
    UnknownValue,
}

impl RejectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TemplateVariable => "template_variable",
            Self::Contamination => "contamination",
            Self::TooManyLevels => "too_many_levels",
            Self::UnknownPrefix => "unknown_prefix",
            Self::UnknownValue => "unknown_value",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rejected tag: the reason plus a human-readable detail line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub reason: RejectReason,
    pub detail: String,
}

impl Rejection {
    pub(crate) fn new(reason: RejectReason, detail: impl Into<String>) -> Self {
        Self {
            reason,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.reason, self.detail)
    }
}
