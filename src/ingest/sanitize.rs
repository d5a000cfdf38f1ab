//! Mapping raw CSV headers onto safe Postgres column identifiers.

use std::collections::{HashMap, HashSet};

/// Columns every `users_data` row carries; CSV headers may not shadow them.
pub const FIXED_COLUMNS: &[&str] = &["id", "batch_id", "uploaded_at", "organization"];

/// Sanitized header that supplies the row's organization instead of becoming a column.
pub const ORGANIZATION_COLUMN: &str = "organization";

const MAX_IDENTIFIER_LEN: usize = 55;

/// Turn an arbitrary header into `[a-z0-9_]+`, not starting with a digit.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_underscore = false;

    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_underscore && !out.is_empty() {
                out.push('_');
            }
            pending_underscore = false;
            out.push(c);
        } else {
            pending_underscore = true;
        }
    }

    if out.is_empty() {
        out.push_str("column");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "c_");
    }
    out.truncate(MAX_IDENTIFIER_LEN);
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Where each CSV header lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderTarget {
    /// A dynamic column in `users_data`.
    Column(String),
    /// The explicit organization source.
    Organization,
}

/// Header-position → target mapping for one CSV file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMapping {
    /// One entry per CSV header position.
    pub targets: Vec<HeaderTarget>,
    /// Distinct dynamic columns in first-appearance order, with the raw header that produced each.
    pub columns: Vec<(String, String)>,
}

impl HeaderMapping {
    /// Build the mapping. Identical (trimmed) headers share a target so the
    /// last value in a row wins; distinct headers that sanitize to the same
    /// identifier get `_2`, `_3`, ... in header order.
    pub fn build(headers: &[String]) -> Self {
        let mut by_raw: HashMap<&str, HeaderTarget> = HashMap::new();
        let mut taken: HashSet<String> = HashSet::new();
        let mut targets = Vec::with_capacity(headers.len());
        let mut columns = Vec::new();

        for raw in headers {
            let key = raw.trim();
            if let Some(existing) = by_raw.get(key) {
                targets.push(existing.clone());
                continue;
            }

            let mut name = sanitize_identifier(key);
            let target = if name == ORGANIZATION_COLUMN && !taken.contains(ORGANIZATION_COLUMN) {
                taken.insert(name);
                HeaderTarget::Organization
            } else {
                if FIXED_COLUMNS.contains(&name.as_str()) {
                    name.push_str("_csv");
                }
                let name = disambiguate(name, &taken);
                taken.insert(name.clone());
                columns.push((name.clone(), key.to_string()));
                HeaderTarget::Column(name)
            };

            by_raw.insert(key, target.clone());
            targets.push(target);
        }

        Self { targets, columns }
    }

    #[cfg(test)]
    pub fn has_organization(&self) -> bool {
        self.targets.iter().any(|t| *t == HeaderTarget::Organization)
    }

    /// Position of the last header mapped to `column`; later positions win.
    pub fn position_of(&self, column: &str) -> Option<usize> {
        self.targets
            .iter()
            .rposition(|t| matches!(t, HeaderTarget::Column(c) if c == column))
    }
}

fn disambiguate(name: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&name) {
        return name;
    }
    (2..)
        .map(|n| format!("{}_{}", name, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sanitizes_common_headers() {
        assert_eq!(sanitize_identifier("First name"), "first_name");
        assert_eq!(sanitize_identifier("  Invited by e-mail  "), "invited_by_e_mail");
        assert_eq!(sanitize_identifier("Accepted site invitation?"), "accepted_site_invitation");
        assert_eq!(sanitize_identifier("__weird__"), "weird");
        assert_eq!(sanitize_identifier("2024 total"), "c_2024_total");
        assert_eq!(sanitize_identifier("!!!"), "column");
        assert_eq!(sanitize_identifier(""), "column");
    }

    #[test]
    fn sanitized_names_are_bounded() {
        let long = "x".repeat(200);
        assert_eq!(sanitize_identifier(&long).len(), MAX_IDENTIFIER_LEN);
    }

    #[test]
    fn colliding_headers_are_suffixed_in_order() {
        let mapping = HeaderMapping::build(&headers(&["First Name", "first_name", "FIRST-NAME"]));
        let names: Vec<_> = mapping.columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["first_name", "first_name_2", "first_name_3"]);
    }

    #[test]
    fn identical_headers_share_a_column() {
        let mapping = HeaderMapping::build(&headers(&["Email", "Name", "Email"]));
        assert_eq!(mapping.columns.len(), 2);
        assert_eq!(mapping.targets[0], mapping.targets[2]);
        assert_eq!(mapping.position_of("email"), Some(2));
    }

    #[test]
    fn fixed_columns_are_not_shadowed() {
        let mapping = HeaderMapping::build(&headers(&["ID", "Uploaded At", "Organization"]));
        let names: Vec<_> = mapping.columns.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["id_csv", "uploaded_at_csv"]);
        assert!(mapping.has_organization());
    }

    #[test]
    fn second_organization_header_becomes_a_column() {
        let mapping = HeaderMapping::build(&headers(&["Organization", "organization "]));
        // Trimmed raw headers differ by case only, so they are distinct headers.
        assert_eq!(mapping.targets[0], HeaderTarget::Organization);
        assert_eq!(mapping.targets[1], HeaderTarget::Column("organization_csv".to_string()));
    }

    #[test]
    fn mapping_is_deterministic() {
        let h = headers(&["A b", "a-b", "A_B", "c"]);
        assert_eq!(HeaderMapping::build(&h), HeaderMapping::build(&h));
    }
}
