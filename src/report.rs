//! PDF report: filter summary, statistics, data preview and the chart.
//!
//! Layout is fixed: every page carries the title and chart type at the top
//! and the generation timestamp at the bottom. Body lines flow down the page
//! and continue on a new one when they run out of room.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use printpdf::{
    BuiltinFont, ColorBits, ColorSpace, Image, ImageTransform, ImageXObject, IndirectFontRef,
    Mm, PdfDocument, PdfDocumentReference, PdfLayerReference, Px,
};
use thiserror::Error;

use crate::chart::raster::RasterChart;
use crate::chart::ChartKind;
use crate::data::model::Table;
use crate::data::stats::{format_measure, SummaryStats};

pub const REPORT_TITLE: &str = "Data Analysis Report";

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 10.0;
/// Lowest y a body line may use; the footer sits below.
const BODY_BOTTOM: f32 = 20.0;
/// First body line below the header.
const BODY_TOP: f32 = PAGE_H - 32.0;
const PT_TO_MM: f32 = 0.3528;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("PDF generation failed: {0}")]
    Pdf(#[from] printpdf::Error),
    #[error("could not write report: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything that goes into one report.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    /// The filtered table.
    pub table: &'a Table,
    /// Columns shown in the preview; all columns when empty.
    pub columns: &'a [String],
    pub chart_kind: ChartKind,
    pub chart: Option<&'a RasterChart>,
    pub numeric_column: Option<&'a str>,
    pub stats: Option<&'a SummaryStats>,
    /// Row count before any filter.
    pub total_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    pub preview_rows: usize,
    pub line_width: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            preview_rows: 20,
            line_width: 90,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Heading,
    Body,
}

/// One line of the report body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLine {
    pub style: LineStyle,
    pub text: String,
}

impl ReportLine {
    fn heading(text: impl Into<String>) -> Self {
        Self {
            style: LineStyle::Heading,
            text: text.into(),
        }
    }

    fn body(text: impl Into<String>) -> Self {
        Self {
            style: LineStyle::Body,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Text lines of the report body, in order. The chart follows them.
pub fn body_lines(input: &ReportInput<'_>, settings: &ReportSettings) -> Vec<ReportLine> {
    let mut lines = vec![
        ReportLine::body(format!("Total rows: {}", input.total_rows)),
        ReportLine::body(format!("Rows after filters: {}", input.table.len())),
    ];

    match (input.numeric_column, input.stats) {
        (Some(column), Some(stats)) => {
            lines.push(ReportLine::heading(format!(
                "Summary statistics for column: {column}"
            )));
            for (label, value) in stats.entries() {
                lines.push(ReportLine::body(format!("{label}: {}", format_measure(value))));
            }
        }
        (Some(column), None) => {
            lines.push(ReportLine::heading(format!(
                "Summary statistics for column: {column}"
            )));
            lines.push(ReportLine::body("No numeric values after filtering."));
        }
        (None, _) => lines.push(ReportLine::body("No numeric column selected.")),
    }

    lines.push(ReportLine::heading(format!(
        "Data preview (up to {} rows)",
        settings.preview_rows
    )));
    let preview = if input.columns.is_empty() {
        input.table.head(settings.preview_rows)
    } else {
        input.table.project(input.columns).head(settings.preview_rows)
    };
    for row in 0..preview.len() {
        let text = preview
            .columns()
            .iter()
            .map(|c| format!("{}: {}", c.name, c.values[row]))
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(ReportLine::body(truncate(&text, settings.line_width)));
    }
    lines
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

// ---------------------------------------------------------------------------
// PDF writer
// ---------------------------------------------------------------------------

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    italic: IndirectFontRef,
}

/// Tracks the current page and the next free line position.
struct Pager {
    doc: PdfDocumentReference,
    fonts: Fonts,
    layer: PdfLayerReference,
    y: f32,
    chart_label: String,
    footer: String,
}

impl Pager {
    fn new(chart_kind: ChartKind, generated_at: NaiveDateTime) -> Result<Self, ReportError> {
        let (doc, page, layer) = PdfDocument::new(REPORT_TITLE, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        let fonts = Fonts {
            regular: doc.add_builtin_font(BuiltinFont::Helvetica)?,
            bold: doc.add_builtin_font(BuiltinFont::HelveticaBold)?,
            italic: doc.add_builtin_font(BuiltinFont::HelveticaOblique)?,
        };
        let layer = doc.get_page(page).get_layer(layer);
        let pager = Self {
            doc,
            fonts,
            layer,
            y: BODY_TOP,
            chart_label: format!("Chart type: {chart_kind}"),
            footer: format!("Generated on {}", generated_at.format("%d/%m/%Y %H:%M:%S")),
        };
        pager.decorate();
        Ok(pager)
    }

    /// Header and footer of the current page.
    fn decorate(&self) {
        self.centered(REPORT_TITLE, 14.0, PAGE_H - 15.0, &self.fonts.bold);
        self.centered(&self.chart_label, 10.0, PAGE_H - 23.0, &self.fonts.regular);
        self.centered(&self.footer, 8.0, 8.0, &self.fonts.italic);
    }

    fn centered(&self, text: &str, size: f32, y: f32, font: &IndirectFontRef) {
        // Helvetica averages about half an em per character.
        let width = text.chars().count() as f32 * size * 0.5 * PT_TO_MM;
        let x = ((PAGE_W - width) / 2.0).max(MARGIN);
        self.layer.use_text(text, size, Mm(x), Mm(y), font);
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = BODY_TOP;
        self.decorate();
    }

    /// Move down by `height`, starting a new page if it does not fit.
    fn reserve(&mut self, height: f32) {
        if self.y - height < BODY_BOTTOM {
            self.new_page();
        }
        self.y -= height;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn line(&mut self, line: &ReportLine) {
        let (font, size, height) = match line.style {
            LineStyle::Heading => (&self.fonts.bold, 11.0, 10.0),
            LineStyle::Body => (&self.fonts.regular, 10.0, 8.0),
        };
        let font = font.clone();
        self.reserve(height);
        self.layer
            .use_text(line.text.as_str(), size, Mm(MARGIN), Mm(self.y + 2.0), &font);
    }

    /// Embed the chart scaled to the printable width.
    fn image(&mut self, chart: &RasterChart) {
        let printable = PAGE_W - 2.0 * MARGIN;
        let dpi = chart.width as f32 * 25.4 / printable;
        let height = chart.height as f32 * 25.4 / dpi;
        self.reserve(height);

        let xobject = ImageXObject {
            width: Px(chart.width as usize),
            height: Px(chart.height as usize),
            color_space: ColorSpace::Rgb,
            bits_per_component: ColorBits::Bit8,
            interpolate: true,
            image_data: chart.pixels.clone(),
            image_filter: None,
            smask: None,
            clipping_bbox: None,
        };
        Image::from(xobject).add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN)),
                translate_y: Some(Mm(self.y)),
                dpi: Some(dpi),
                ..Default::default()
            },
        );
    }

    fn save(self, path: &Path) -> Result<(), ReportError> {
        let file = File::create(path)?;
        self.doc.save(&mut BufWriter::new(file))?;
        Ok(())
    }
}

/// Render the report to `path` and return the path written.
pub fn write_report(
    input: &ReportInput<'_>,
    settings: &ReportSettings,
    path: &Path,
) -> Result<PathBuf, ReportError> {
    write_report_at(input, settings, path, Local::now().naive_local())
}

fn write_report_at(
    input: &ReportInput<'_>,
    settings: &ReportSettings,
    path: &Path,
    generated_at: NaiveDateTime,
) -> Result<PathBuf, ReportError> {
    let mut pager = Pager::new(input.chart_kind, generated_at)?;

    for (i, line) in body_lines(input, settings).iter().enumerate() {
        if line.style == LineStyle::Heading && i > 0 {
            pager.gap(4.0);
        }
        pager.line(line);
    }

    if let Some(chart) = input.chart {
        pager.gap(5.0);
        pager.line(&ReportLine::heading("Generated chart"));
        pager.image(chart);
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    pager.save(path)?;
    log::info!("Report written to {}", path.display());
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column};

    fn table(rows: usize) -> Table {
        Table::new(vec![
            Column::new("Categoria", (0..rows).map(|i| CellValue::Text(format!("cat-{i}"))).collect()),
            Column::new("Valor", (0..rows).map(|i| CellValue::Integer(i as i64)).collect()),
        ])
        .unwrap()
    }

    fn input<'a>(
        table: &'a Table,
        columns: &'a [String],
        stats: Option<&'a SummaryStats>,
        chart: Option<&'a RasterChart>,
    ) -> ReportInput<'a> {
        ReportInput {
            table,
            columns,
            chart_kind: ChartKind::Histogram,
            chart,
            numeric_column: Some("Valor"),
            stats,
            total_rows: 50,
        }
    }

    #[test]
    fn body_summarises_filters_and_statistics() {
        let t = table(3);
        let stats = SummaryStats::compute(&[0.0, 1.0, 2.0]).unwrap();
        let lines = body_lines(&input(&t, &[], Some(&stats), None), &ReportSettings::default());
        let texts: Vec<&str> = lines.iter().map(|l| l.text.as_str()).collect();

        assert_eq!(texts[0], "Total rows: 50");
        assert_eq!(texts[1], "Rows after filters: 3");
        assert_eq!(texts[2], "Summary statistics for column: Valor");
        assert_eq!(lines[2].style, LineStyle::Heading);
        assert_eq!(texts[3], "Mean: 1.00");
        assert_eq!(texts[5], "Standard deviation: 1.00");
        assert_eq!(texts[8], "Data preview (up to 20 rows)");
        assert_eq!(texts[9], "Categoria: cat-0 | Valor: 0");
        assert_eq!(lines.len(), 12);
    }

    #[test]
    fn preview_is_limited_projected_and_truncated() {
        let t = table(30);
        let columns = vec!["Valor".to_string()];
        let settings = ReportSettings {
            preview_rows: 5,
            line_width: 6,
        };
        let lines = body_lines(&input(&t, &columns, None, None), &settings);
        let preview: Vec<&str> = lines
            .iter()
            .skip_while(|l| !l.text.starts_with("Data preview"))
            .skip(1)
            .map(|l| l.text.as_str())
            .collect();
        assert_eq!(preview.len(), 5);
        assert_eq!(preview[0], "Val...");
    }

    #[test]
    fn missing_numeric_column_is_stated() {
        let t = table(1);
        let mut inp = input(&t, &[], None, None);
        inp.numeric_column = None;
        let lines = body_lines(&inp, &ReportSettings::default());
        assert!(lines.iter().any(|l| l.text == "No numeric column selected."));
    }

    #[test]
    fn writes_a_pdf_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.pdf");
        let t = table(60);
        let stats = SummaryStats::compute(&[1.0, 2.0]).unwrap();
        let chart = RasterChart::blank(80, 40);

        let written = write_report(
            &input(&t, &[], Some(&stats), Some(&chart)),
            &ReportSettings {
                preview_rows: 60,
                line_width: 90,
            },
            &path,
        )
        .unwrap();

        assert_eq!(written, path);
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn footer_uses_day_first_timestamp() {
        let at = chrono::NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        let pager = Pager::new(ChartKind::Pie, at).unwrap();
        assert_eq!(pager.footer, "Generated on 09/03/2024 14:05:00");
        assert_eq!(pager.chart_label, "Chart type: Pie chart");
    }
}
