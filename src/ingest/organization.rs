//! Deriving a row's organization when the upload has no explicit organization column.

use serde::{Deserialize, Serialize};

pub const DESCRIPTION_COLUMN: &str = "description";
pub const ROLE_COLUMN: &str = "user_role";
pub const INVITER_COLUMN: &str = "invited_by_email";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrgRuleKind {
    /// Exact match on `user_role`.
    Role,
    /// Case-insensitive substring of `description`.
    Keyword,
    /// Case-insensitive match on `invited_by_email`.
    Inviter,
}

/// One override rule, written `kind:pattern=Organization` in `ORG_RULES`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgRule {
    pub kind: OrgRuleKind,
    pub pattern: String,
    pub organization: String,
}

impl OrgRule {
    pub fn new(kind: OrgRuleKind, pattern: &str, organization: &str) -> Self {
        Self {
            kind,
            pattern: pattern.to_string(),
            organization: organization.to_string(),
        }
    }

    /// Built-in rules used when `ORG_RULES` is unset.
    ///
    /// Older deployments also sent two specific inviter addresses to `FM` and
    /// matched the role spelled `Adminstrator`. Neither is built in; set
    /// `ORG_RULES` to e.g. `role:Manager=Stake;keyword:stake=Stake;inviter:someone@example.org=FM;role:Adminstrator=FM`
    /// to get that routing back.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(OrgRuleKind::Role, "Manager", "Stake"),
            Self::new(OrgRuleKind::Keyword, "stake", "Stake"),
            Self::new(OrgRuleKind::Role, "Administrator", "FM"),
        ]
    }

    /// Parse a `;`-separated rule list such as `role:Manager=Stake;inviter:a@b.org=FM`.
    pub fn parse_list(rules: &str) -> Result<Vec<Self>, String> {
        rules.split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Self::parse)
            .collect()
    }

    fn parse(item: &str) -> Result<Self, String> {
        let (kind, rest) = item
            .split_once(':')
            .ok_or_else(|| format!("rule '{}' is missing a kind prefix", item))?;
        let (pattern, organization) = rest
            .rsplit_once('=')
            .ok_or_else(|| format!("rule '{}' is missing '=Organization'", item))?;

        let kind = match kind.trim().to_ascii_lowercase().as_str() {
            "role" => OrgRuleKind::Role,
            "keyword" => OrgRuleKind::Keyword,
            "inviter" => OrgRuleKind::Inviter,
            other => return Err(format!("unknown rule kind '{}'", other)),
        };
        let (pattern, organization) = (pattern.trim(), organization.trim());
        if pattern.is_empty() || organization.is_empty() {
            return Err(format!("rule '{}' has an empty pattern or organization", item));
        }
        Ok(Self::new(kind, pattern, organization))
    }

    fn matches(&self, fields: &RowFields<'_>) -> bool {
        match self.kind {
            OrgRuleKind::Role => fields.role.map(str::trim) == Some(self.pattern.as_str()),
            OrgRuleKind::Keyword => fields
                .description
                .to_lowercase()
                .contains(&self.pattern.to_lowercase()),
            OrgRuleKind::Inviter => fields
                .inviter
                .map(|v| v.trim().eq_ignore_ascii_case(&self.pattern))
                .unwrap_or(false),
        }
    }
}

/// The handful of row values organization rules look at.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowFields<'a> {
    pub description: &'a str,
    pub role: Option<&'a str>,
    pub inviter: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct OrganizationResolver {
    blank_label: String,
    rules: Vec<OrgRule>,
}

impl OrganizationResolver {
    pub fn new(blank_label: impl Into<String>, rules: Vec<OrgRule>) -> Self {
        Self {
            blank_label: blank_label.into(),
            rules,
        }
    }

    pub fn from_config(config: &crate::config::OrganizationConfig) -> Self {
        Self::new(config.blank_label.clone(), config.rules.clone())
    }

    pub fn blank_label(&self) -> &str {
        &self.blank_label
    }

    /// Blank description first, then the first matching rule, then the
    /// description's leading token.
    pub fn derive(&self, fields: &RowFields<'_>) -> String {
        let description = fields.description.trim();
        if description.is_empty() {
            return self.blank_label.clone();
        }

        if let Some(rule) = self.rules.iter().find(|r| r.matches(fields)) {
            return rule.organization.clone();
        }

        description
            .split_whitespace()
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| self.blank_label.clone())
    }

    /// Explicit values win; blank explicit values fall back to the blank label.
    pub fn explicit(&self, value: Option<&str>) -> String {
        match value.map(str::trim) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => self.blank_label.clone(),
        }
    }
}

impl Default for OrganizationResolver {
    fn default() -> Self {
        Self::new("(blank org)", OrgRule::defaults())
    }
}
