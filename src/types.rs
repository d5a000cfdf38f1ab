/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Keyword that selects every organization.
pub const ALL_ORGANIZATIONS: &str = "All";

/// Row filter on the organization field. Matching is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrgFilter {
    All,
    Exact(String),
}

impl OrgFilter {
    /// `None`, blank, and `"All"` select everything; anything else is an exact match.
    pub fn parse(value: Option<&str>) -> Self {
        match value {
            None => OrgFilter::All,
            Some(v) if v.is_empty() || v == ALL_ORGANIZATIONS => OrgFilter::All,
            Some(v) => OrgFilter::Exact(v.to_string()),
        }
    }

    pub fn matches(&self, organization: &str) -> bool {
        match self {
            OrgFilter::All => true,
            OrgFilter::Exact(org) => org == organization,
        }
    }
}

impl fmt::Display for OrgFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrgFilter::All => f.write_str(ALL_ORGANIZATIONS),
            OrgFilter::Exact(org) => f.write_str(org),
        }
    }
}
