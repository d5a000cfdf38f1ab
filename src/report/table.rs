//! Projection of stored rows into the columns a report shows.

use std::cmp::Ordering;

use crate::config::ReportConfig;
use crate::database::models::{DataRow, KnownColumn};
use crate::ingest::sanitize::ORGANIZATION_COLUMN;
use crate::types::OrgFilter;

pub const ORGANIZATION_LABEL: &str = "Org";
pub const ACTIVATION_LABEL: &str = "Has Used";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportColumn {
    pub name: String,
    pub label: String,
}

/// Rows as display strings, aligned with `columns`. Nulls are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn from_rows(rows: &[DataRow], columns: Vec<ReportColumn>) -> Self {
        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|c| row.get(&c.name).unwrap_or_default().to_string())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.label.as_str()).collect()
    }
}

pub fn report_title(filter: &OrgFilter) -> String {
    match filter {
        OrgFilter::All => "User Data Report - All Organizations".to_string(),
        OrgFilter::Exact(org) => format!("User Data Report - {} Organization", org),
    }
}

/// Columns for a PDF report: the requested (or configured) names that exist,
/// always led by the organization. Falls back to every known column when none
/// of the wanted names exist.
pub fn select_columns(
    known: &[KnownColumn],
    requested: Option<&[String]>,
    config: &ReportConfig,
) -> Vec<ReportColumn> {
    let wanted = requested
        .filter(|r| !r.is_empty())
        .unwrap_or(config.default_columns.as_slice());

    let mut picked: Vec<&KnownColumn> = Vec::new();
    for name in wanted {
        if let Some(column) = known.iter().find(|k| &k.name == name) {
            if !picked.iter().any(|p| p.name == column.name) {
                picked.push(column);
            }
        }
    }
    if picked.is_empty() {
        picked = known.iter().collect();
    }

    let mut columns = vec![organization_column()];
    columns.extend(picked.into_iter().map(|k| ReportColumn {
        name: k.name.clone(),
        label: if k.name == config.activation_column {
            ACTIVATION_LABEL.to_string()
        } else {
            k.label.clone()
        },
    }));
    columns
}

/// Organization plus every known column, with their original header labels.
pub fn export_columns(known: &[KnownColumn]) -> Vec<ReportColumn> {
    let mut columns = vec![organization_column()];
    columns.extend(known.iter().map(|k| ReportColumn {
        name: k.name.clone(),
        label: k.label.clone(),
    }));
    columns
}

/// Stable sort on `column`; rows without a value go last.
pub fn sort_rows(rows: &mut [DataRow], column: &str) {
    rows.sort_by(|a, b| match (a.get(column), b.get(column)) {
        (Some(x), Some(y)) => x.cmp(y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn organization_column() -> ReportColumn {
    ReportColumn {
        name: ORGANIZATION_COLUMN.to_string(),
        label: ORGANIZATION_LABEL.to_string(),
    }
}
