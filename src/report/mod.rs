//! PDF and CSV renditions of a filtered view of `users_data`.

pub mod error;
pub mod export;
pub mod layout;
pub mod pdf;
pub mod stats;
pub mod table;

use crate::config::ReportConfig;
use crate::database::models::{DataRow, KnownColumn};
use crate::types::OrgFilter;

pub use error::RenderError;
pub use layout::ReportOptions;
pub use stats::ActivationStats;
pub use table::{ReportColumn, ReportTable};

/// A rendered report ready to download or attach.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub title: String,
    pub file_name: String,
    pub row_count: usize,
    pub bytes: Vec<u8>,
}

/// Applies the configured column selection and sort order before rendering.
#[derive(Debug, Clone)]
pub struct ReportBuilder {
    config: ReportConfig,
}

impl ReportBuilder {
    pub fn new(config: ReportConfig) -> Self {
        Self { config }
    }

    pub fn pdf(
        &self,
        mut rows: Vec<DataRow>,
        known: &[KnownColumn],
        filter: &OrgFilter,
        requested: Option<&[String]>,
    ) -> Result<RenderedReport, RenderError> {
        if known.iter().any(|k| k.name == self.config.sort_column) {
            table::sort_rows(&mut rows, &self.config.sort_column);
        }
        let columns = table::select_columns(known, requested, &self.config);
        let table = ReportTable::from_rows(&rows, columns);

        let options = ReportOptions::new(table::report_title(filter));
        let bytes = pdf::render(&table, &options)?;
        tracing::info!("Rendered {} ({} rows)", options.title, table.len());

        Ok(RenderedReport {
            file_name: file_name(filter, "pdf"),
            title: options.title,
            row_count: table.len(),
            bytes,
        })
    }

    pub fn csv(
        &self,
        rows: &[DataRow],
        known: &[KnownColumn],
        filter: &OrgFilter,
    ) -> Result<RenderedReport, RenderError> {
        let table = ReportTable::from_rows(rows, table::export_columns(known));
        Ok(RenderedReport {
            title: table::report_title(filter),
            file_name: file_name(filter, "csv"),
            row_count: table.len(),
            bytes: export::to_csv(&table)?,
        })
    }
}

/// `user_data_report_<org>.<ext>`, with the organization reduced to a safe token.
pub fn file_name(filter: &OrgFilter, extension: &str) -> String {
    let org: String = filter
        .to_string()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("user_data_report_{}.{}", org, extension)
}
