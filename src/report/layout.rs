//! Page plan for PDF reports, independent of the PDF backend.
//!
//! All coordinates are millimetres from the bottom-left corner of a US Letter
//! portrait page. The plan is a pure function of its input, so the same table
//! and options always produce the same pages with the same text placement.

use chrono::NaiveDateTime;

use super::table::ReportTable;

pub const PAGE_WIDTH_MM: f32 = 215.9;
pub const PAGE_HEIGHT_MM: f32 = 279.4;
pub const MARGIN_MM: f32 = 15.0;

pub const TITLE_SIZE_PT: f32 = 16.0;
pub const TEXT_SIZE_PT: f32 = 9.0;
pub const LINE_PITCH_MM: f32 = 5.0;

/// Title, timestamp and column header above the first body line.
const HEADER_BLOCK_MM: f32 = 26.0;
/// Footer text plus clearance below the last body line.
const FOOTER_BLOCK_MM: f32 = 10.0;
const CELL_PADDING_MM: f32 = 1.5;
/// Average Helvetica glyph advance as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.5;
const PT_TO_MM: f32 = 25.4 / 72.0;
const MIN_WEIGHT: usize = 4;

pub const NO_DATA_NOTICE: &str = "No data for this selection.";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub title: String,
    pub generated_at: NaiveDateTime,
}

impl ReportOptions {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            generated_at: chrono::Local::now().naive_local(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextItem {
    pub text: String,
    pub x_mm: f32,
    pub y_mm: f32,
    pub size_pt: f32,
    pub bold: bool,
}

/// Horizontal rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub x1_mm: f32,
    pub x2_mm: f32,
    pub y_mm: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub items: Vec<TextItem>,
    pub rules: Vec<Rule>,
    /// Indices into `ReportTable::rows` placed on this page.
    pub rows: std::ops::Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub title: String,
    pub pages: Vec<PagePlan>,
}

impl ReportLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

pub fn printable_width() -> f32 {
    PAGE_WIDTH_MM - 2.0 * MARGIN_MM
}

/// Body lines that fit between the header block and the footer.
pub fn rows_per_page() -> usize {
    let usable = PAGE_HEIGHT_MM - 2.0 * MARGIN_MM - HEADER_BLOCK_MM - FOOTER_BLOCK_MM;
    ((usable / LINE_PITCH_MM).floor() as usize).max(1)
}

/// Widths proportional to `max(label length, 4)`, summing to `total`.
pub fn column_widths(labels: &[&str], total: f32) -> Vec<f32> {
    let weights: Vec<usize> = labels
        .iter()
        .map(|l| l.chars().count().max(MIN_WEIGHT))
        .collect();
    let sum: usize = weights.iter().sum();
    if sum == 0 {
        return Vec::new();
    }
    weights
        .iter()
        .map(|w| total * (*w as f32) / (sum as f32))
        .collect()
}

/// Cut `text` to the characters that fit `width_mm`, ending in `...` when cut.
pub fn fit_text(text: &str, width_mm: f32, size_pt: f32) -> String {
    let glyph_mm = size_pt * AVG_GLYPH_EM * PT_TO_MM;
    let capacity = (((width_mm - CELL_PADDING_MM).max(0.0)) / glyph_mm).floor() as usize;

    let len = text.chars().count();
    if len <= capacity {
        return text.to_string();
    }
    if capacity <= 3 {
        return "...".chars().take(capacity.max(1)).collect();
    }
    let mut cut: String = text.chars().take(capacity - 3).collect();
    cut.push_str("...");
    cut
}

pub fn layout(table: &ReportTable, options: &ReportOptions) -> ReportLayout {
    let per_page = rows_per_page();
    let page_count = table.len().div_ceil(per_page).max(1);

    let labels = table.labels();
    let widths = column_widths(&labels, printable_width());
    let offsets: Vec<f32> = widths
        .iter()
        .scan(MARGIN_MM, |x, w| {
            let start = *x;
            *x += w;
            Some(start)
        })
        .collect();

    let generated = format!(
        "Generated on: {}",
        options.generated_at.format("%Y-%m-%d %H:%M:%S")
    );

    let top = PAGE_HEIGHT_MM - MARGIN_MM;
    let title_y = top - 6.0;
    let generated_y = top - 12.0;
    let header_y = top - 20.0;
    let body_top = top - HEADER_BLOCK_MM;
    let footer_y = MARGIN_MM;
    let right = PAGE_WIDTH_MM - MARGIN_MM;

    let mut pages = Vec::with_capacity(page_count);
    for index in 0..page_count {
        let start = index * per_page;
        let end = (start + per_page).min(table.len());
        let mut page = PagePlan {
            rows: start..end,
            ..PagePlan::default()
        };

        page.items.push(text(&options.title, MARGIN_MM, title_y, TITLE_SIZE_PT, true));
        page.items.push(text(&generated, MARGIN_MM, generated_y, TEXT_SIZE_PT, false));

        for ((label, x), w) in labels.iter().zip(&offsets).zip(&widths) {
            page.items.push(text(&fit_text(label, *w, TEXT_SIZE_PT), *x, header_y, TEXT_SIZE_PT, true));
        }
        page.rules.push(Rule {
            x1_mm: MARGIN_MM,
            x2_mm: right,
            y_mm: header_y - 1.5,
        });

        if table.is_empty() {
            page.items.push(text(NO_DATA_NOTICE, MARGIN_MM, body_top, TEXT_SIZE_PT, false));
        }

        for (line, row) in table.rows[start..end].iter().enumerate() {
            let y = body_top - line as f32 * LINE_PITCH_MM;
            for ((cell, x), w) in row.iter().zip(&offsets).zip(&widths) {
                if cell.is_empty() {
                    continue;
                }
                page.items.push(text(&fit_text(cell, *w, TEXT_SIZE_PT), *x, y, TEXT_SIZE_PT, false));
            }
        }

        page.rules.push(Rule {
            x1_mm: MARGIN_MM,
            x2_mm: right,
            y_mm: footer_y + 5.0,
        });
        page.items.push(text(
            &format!("Page {} of {}", index + 1, page_count),
            MARGIN_MM,
            footer_y,
            TEXT_SIZE_PT,
            false,
        ));
        if index + 1 == page_count {
            page.items.push(text(
                &format!("Total Records: {}", table.len()),
                right - 40.0,
                footer_y,
                TEXT_SIZE_PT,
                true,
            ));
        }

        pages.push(page);
    }

    ReportLayout {
        title: options.title.clone(),
        pages,
    }
}

fn text(value: &str, x_mm: f32, y_mm: f32, size_pt: f32, bold: bool) -> TextItem {
    TextItem {
        text: value.to_string(),
        x_mm,
        y_mm,
        size_pt,
        bold,
    }
}
