use super::error::RenderError;
use super::table::ReportTable;

/// CSV of `table`: one header row of labels, then one record per row.
pub fn to_csv(table: &ReportTable) -> Result<Vec<u8>, RenderError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(table.labels())?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| RenderError::Csv(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::table::ReportColumn;

    #[test]
    fn writes_labels_then_rows() {
        let table = ReportTable {
            columns: vec![
                ReportColumn { name: "organization".into(), label: "Org".into() },
                ReportColumn { name: "description".into(), label: "Description".into() },
            ],
            rows: vec![
                vec!["RS".into(), "RS Secretary, acting".into()],
                vec!["(blank org)".into(), String::new()],
            ],
        };
        let csv = String::from_utf8(to_csv(&table).unwrap()).unwrap();
        assert_eq!(
            csv,
            "Org,Description\nRS,\"RS Secretary, acting\"\n(blank org),\n"
        );
    }
}
