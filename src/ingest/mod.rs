//! Schema Adapter: CSV parsing, header sanitization and row normalization.

pub mod csv_table;
pub mod error;
pub mod normalize;
pub mod organization;
pub mod sanitize;
pub mod service;

pub use csv_table::CsvTable;
pub use error::IngestionError;
pub use normalize::{normalize, NewColumn, NormalizedBatch, NormalizedRow};
pub use organization::{OrgRule, OrganizationResolver};
pub use service::{Ingestor, UploadSummary};
