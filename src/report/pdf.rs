use printpdf::{BuiltinFont, Line, Mm, PdfDocument, Point};
use tracing::debug;

use super::error::RenderError;
use super::layout::{layout, ReportLayout, ReportOptions, PAGE_HEIGHT_MM, PAGE_WIDTH_MM};
use super::table::ReportTable;

const LAYER: &str = "Report";

/// Render `table` into PDF bytes.
pub fn render(table: &ReportTable, options: &ReportOptions) -> Result<Vec<u8>, RenderError> {
    let plan = layout(table, options);
    let bytes = emit(&plan)?;
    debug!(
        "Rendered '{}': {} rows on {} pages ({} bytes)",
        plan.title,
        table.len(),
        plan.page_count(),
        bytes.len()
    );
    Ok(bytes)
}

fn emit(plan: &ReportLayout) -> Result<Vec<u8>, RenderError> {
    let (doc, first_page, first_layer) =
        PdfDocument::new(plan.title.as_str(), Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    for (index, page) in plan.pages.iter().enumerate() {
        let (page_index, layer_index) = if index == 0 {
            (first_page, first_layer)
        } else {
            doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER)
        };
        let layer = doc.get_page(page_index).get_layer(layer_index);

        for item in &page.items {
            let font = if item.bold { &bold } else { &regular };
            layer.use_text(item.text.as_str(), item.size_pt, Mm(item.x_mm), Mm(item.y_mm), font);
        }

        for rule in &page.rules {
            layer.set_outline_thickness(0.5);
            layer.add_line(Line {
                points: vec![
                    (Point::new(Mm(rule.x1_mm), Mm(rule.y_mm)), false),
                    (Point::new(Mm(rule.x2_mm), Mm(rule.y_mm)), false),
                ],
                is_closed: false,
            });
        }
    }

    doc.save_to_bytes().map_err(pdf_error)
}

fn pdf_error(err: impl std::fmt::Display) -> RenderError {
    RenderError::Pdf(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::table::ReportColumn;

    fn table(rows: usize) -> ReportTable {
        ReportTable {
            columns: vec![
                ReportColumn { name: "organization".into(), label: "Org".into() },
                ReportColumn { name: "email".into(), label: "Email".into() },
            ],
            rows: (0..rows)
                .map(|i| vec!["RS".to_string(), format!("member{}@example.org", i)])
                .collect(),
        }
    }

    #[test]
    fn renders_a_pdf_for_empty_tables() {
        let bytes = render(&table(0), &ReportOptions::new("User Data Report - RS Organization")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn renders_multi_page_reports() {
        let bytes = render(&table(200), &ReportOptions::new("User Data Report - All Organizations")).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 1000);
    }
}
