use serde::Serialize;

use super::csv_table::CsvTable;
use super::organization::{
    OrganizationResolver, RowFields, DESCRIPTION_COLUMN, INVITER_COLUMN, ROLE_COLUMN,
};
use super::sanitize::{HeaderMapping, HeaderTarget};

/// A column this upload introduces to `users_data`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewColumn {
    pub name: String,
    /// Raw CSV header that first produced the column; used for display.
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRow {
    pub organization: String,
    /// Aligned with `NormalizedBatch::columns`.
    pub values: Vec<Option<String>>,
}

/// One upload, aligned to the union of known and new columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedBatch {
    pub columns: Vec<String>,
    pub new_columns: Vec<NewColumn>,
    pub rows: Vec<NormalizedRow>,
}

impl NormalizedBatch {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[cfg(test)]
    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row)?.values.get(idx)?.as_deref()
    }
}

/// Map parsed CSV rows onto the table schema.
///
/// Columns already in `existing` keep their order; unseen columns follow in
/// header order and are reported in `new_columns`. Cells for columns absent
/// from the file, and empty cells, are `None`. A file with no data rows
/// produces an empty batch with no new columns.
pub fn normalize(
    table: &CsvTable,
    existing: &[String],
    resolver: &OrganizationResolver,
) -> NormalizedBatch {
    if table.is_empty() {
        return NormalizedBatch::default();
    }

    let mapping = HeaderMapping::build(&table.headers);

    let mut columns: Vec<String> = existing.to_vec();
    let mut new_columns = Vec::new();
    for (name, label) in &mapping.columns {
        if !columns.contains(name) {
            columns.push(name.clone());
            new_columns.push(NewColumn {
                name: name.clone(),
                label: label.clone(),
            });
        }
    }

    // Source position for each output column; `None` when the file lacks it.
    let sources: Vec<Option<usize>> = columns.iter().map(|c| mapping.position_of(c)).collect();
    let org_position = mapping
        .targets
        .iter()
        .rposition(|t| *t == HeaderTarget::Organization);

    let description_at = mapping.position_of(DESCRIPTION_COLUMN);
    let role_at = mapping.position_of(ROLE_COLUMN);
    let inviter_at = mapping.position_of(INVITER_COLUMN);

    let rows = table
        .rows
        .iter()
        .map(|raw| {
            let cell = |pos: Option<usize>| {
                pos.and_then(|p| raw.get(p))
                    .map(String::as_str)
                    .filter(|v| !v.is_empty())
            };

            let organization = match org_position {
                Some(_) => resolver.explicit(cell(org_position)),
                None => resolver.derive(&RowFields {
                    description: cell(description_at).unwrap_or_default(),
                    role: cell(role_at),
                    inviter: cell(inviter_at),
                }),
            };

            let values = sources.iter().map(|pos| cell(*pos).map(str::to_string)).collect();

            NormalizedRow { organization, values }
        })
        .collect();

    NormalizedBatch {
        columns,
        new_columns,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(csv: &str) -> CsvTable {
        CsvTable::parse(csv.as_bytes()).unwrap()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn unseen_headers_become_new_columns() {
        let batch = normalize(
            &table("First name,Last name,Email\nAda,Lovelace,ada@example.com\n"),
            &[],
            &OrganizationResolver::default(),
        );
        assert_eq!(batch.new_columns.len(), 3);
        assert_eq!(batch.columns, names(&["first_name", "last_name", "email"]));
        assert_eq!(batch.new_columns[0].label, "First name");
    }

    #[test]
    fn known_columns_are_reused_and_missing_ones_are_null() {
        let existing = names(&["email", "phone"]);
        let batch = normalize(
            &table("Email,Ward\nada@example.com,1st\n"),
            &existing,
            &OrganizationResolver::default(),
        );
        assert_eq!(batch.columns, names(&["email", "phone", "ward"]));
        assert_eq!(batch.new_columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(), vec!["ward"]);
        assert_eq!(batch.rows[0].values, vec![Some("ada@example.com".to_string()), None, Some("1st".to_string())]);
    }

    #[test]
    fn duplicate_headers_take_the_last_value() {
        let batch = normalize(
            &table("Email,Name,Email\nfirst@example.com,Ada,second@example.com\n"),
            &[],
            &OrganizationResolver::default(),
        );
        assert_eq!(batch.columns, names(&["email", "name"]));
        assert_eq!(batch.value(0, "email"), Some("second@example.com"));
    }

    #[test]
    fn empty_cells_are_null() {
        let batch = normalize(&table("a,b\n,x\n"), &[], &OrganizationResolver::default());
        assert_eq!(batch.rows[0].values, vec![None, Some("x".to_string())]);
    }

    #[test]
    fn empty_file_is_a_no_op() {
        let batch = normalize(&table("a,b\n"), &names(&["z"]), &OrganizationResolver::default());
        assert!(batch.is_empty());
        assert!(batch.new_columns.is_empty());
        assert!(batch.columns.is_empty());
    }

    #[test]
    fn explicit_organization_column_is_used_verbatim() {
        let batch = normalize(
            &table("Organization,Description\nPrimary,Stake clerk\n,EQ\n"),
            &[],
            &OrganizationResolver::default(),
        );
        assert_eq!(batch.columns, names(&["description"]));
        assert_eq!(batch.rows[0].organization, "Primary");
        assert_eq!(batch.rows[1].organization, "(blank org)");
    }

    #[test]
    fn organization_is_derived_from_description_and_role() {
        let batch = normalize(
            &table("Description,User role\nRS Secretary,Member\nEQ President,Manager\n,Member\n"),
            &[],
            &OrganizationResolver::default(),
        );
        let orgs: Vec<_> = batch.rows.iter().map(|r| r.organization.as_str()).collect();
        assert_eq!(orgs, vec!["RS", "Stake", "(blank org)"]);
    }

    #[test]
    fn n_unique_headers_add_exactly_n_columns() {
        let existing = names(&["email"]);
        let csv = "Alpha,Beta,Gamma,Delta\n1,2,3,4\n5,6,7,8\n";
        let batch = normalize(&table(csv), &existing, &OrganizationResolver::default());
        assert_eq!(batch.new_columns.len(), 4);
        assert_eq!(batch.columns.len(), existing.len() + 4);
        assert!(batch.rows.iter().all(|r| r.values.len() == batch.columns.len()));
        assert!(batch.rows.iter().all(|r| r.values[0].is_none()));
    }
}
