//! Strict CSV parsing into an in-memory table of raw strings.

use super::error::IngestionError;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parsed CSV: trimmed headers plus rows of raw cell values, one cell per header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Parse an uploaded file. Any record whose field count differs from the
    /// header row rejects the whole file.
    pub fn parse(bytes: &[u8]) -> Result<Self, IngestionError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Self::default());
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(bytes);

        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect::<Vec<_>>();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            // Blank trailing lines are skipped by the reader; a row of empty cells is kept.
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { headers, rows })
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}
