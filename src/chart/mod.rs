//! Chart data preparation.
//!
//! `build_chart` validates a chart request against the table and turns the
//! selected columns into plain series. Drawing lives in `ui::plot` (on
//! screen) and `chart::raster` (off screen, for PNG and PDF).

pub mod raster;

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::data::model::{CellValue, ColumnType, Table};
use crate::data::outliers::Fences;

/// Columns a chart may use.
pub const MAX_CHART_COLUMNS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartKind {
    #[default]
    Bar,
    Line,
    Pie,
    Histogram,
    Scatter,
    Boxplot,
}

impl ChartKind {
    pub const ALL: [ChartKind; 6] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Histogram,
        ChartKind::Scatter,
        ChartKind::Boxplot,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar chart",
            ChartKind::Line => "Line chart",
            ChartKind::Pie => "Pie chart",
            ChartKind::Histogram => "Histogram",
            ChartKind::Scatter => "Scatter plot",
            ChartKind::Boxplot => "Boxplot",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the user asked to plot: a kind and up to two columns, in order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("Select one or two columns for the chart.")]
    ColumnCount(usize),
    #[error("Column '{0}' does not exist.")]
    UnknownColumn(String),
    #[error("For a bar chart with two columns, the second must be numeric.")]
    BarValueNotNumeric,
    #[error("For a line chart, select only numeric columns.")]
    LineNotNumeric,
    #[error("A pie chart accepts only one categorical column.")]
    PieColumnCount,
    #[error("For a histogram, select a numeric column.")]
    HistogramNotNumeric,
    #[error("For a scatter plot, select two numeric columns.")]
    ScatterNotNumericPair,
    #[error("For a boxplot, select a numeric column.")]
    BoxplotNotNumeric,
    #[error("Column '{0}' has no values to plot.")]
    NoData(String),
}

// ---------------------------------------------------------------------------
// Chart payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    /// `[x, y]` pairs; x is the row position for line charts.
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub label: String,
    pub count: usize,
    /// Share of the total, in `[0, 1]`.
    pub fraction: f64,
}

impl Slice {
    pub fn percent_label(&self) -> String {
        format!("{:.1}%", self.fraction * 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Quartiles, whiskers and fliers of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub fliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    Bar {
        x_label: String,
        y_label: String,
        bars: Vec<(String, f64)>,
    },
    Line {
        series: Vec<Series>,
    },
    Pie {
        column: String,
        slices: Vec<Slice>,
    },
    Histogram {
        column: String,
        bins: Vec<Bin>,
    },
    Scatter {
        x_label: String,
        y_label: String,
        points: Vec<[f64; 2]>,
    },
    Boxplot {
        column: String,
        summary: BoxSummary,
    },
}

impl ChartData {
    pub fn kind(&self) -> ChartKind {
        match self {
            ChartData::Bar { .. } => ChartKind::Bar,
            ChartData::Line { .. } => ChartKind::Line,
            ChartData::Pie { .. } => ChartKind::Pie,
            ChartData::Histogram { .. } => ChartKind::Histogram,
            ChartData::Scatter { .. } => ChartKind::Scatter,
            ChartData::Boxplot { .. } => ChartKind::Boxplot,
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Validate `request` against `table` and compute what to draw.
pub fn build_chart(
    table: &Table,
    request: &ChartRequest,
    histogram_bins: usize,
) -> Result<ChartData, ChartError> {
    let cols = &request.columns;
    if cols.is_empty() || cols.len() > MAX_CHART_COLUMNS {
        return Err(ChartError::ColumnCount(cols.len()));
    }
    for name in cols {
        if table.column(name).is_none() {
            return Err(ChartError::UnknownColumn(name.clone()));
        }
    }

    let data = match request.kind {
        ChartKind::Bar => {
            if cols.len() == 1 {
                ChartData::Bar {
                    x_label: cols[0].clone(),
                    y_label: "count".to_string(),
                    bars: value_counts(table, &cols[0])
                        .into_iter()
                        .map(|(label, n)| (label, n as f64))
                        .collect(),
                }
            } else {
                if !is_numeric(table, &cols[1]) {
                    return Err(ChartError::BarValueNotNumeric);
                }
                ChartData::Bar {
                    x_label: cols[0].clone(),
                    y_label: cols[1].clone(),
                    bars: grouped_sums(table, &cols[0], &cols[1]),
                }
            }
        }
        ChartKind::Line => {
            if !cols.iter().all(|c| is_numeric(table, c)) {
                return Err(ChartError::LineNotNumeric);
            }
            let series = cols
                .iter()
                .map(|c| Series {
                    name: c.clone(),
                    points: numeric_cells(table, c)
                        .into_iter()
                        .enumerate()
                        .filter_map(|(i, v)| v.map(|y| [i as f64, y]))
                        .collect(),
                })
                .collect();
            ChartData::Line { series }
        }
        ChartKind::Pie => {
            if cols.len() != 1 {
                return Err(ChartError::PieColumnCount);
            }
            let counts = value_counts(table, &cols[0]);
            let total: usize = counts.iter().map(|(_, n)| n).sum();
            let slices = counts
                .into_iter()
                .map(|(label, count)| Slice {
                    label,
                    count,
                    fraction: count as f64 / total as f64,
                })
                .collect();
            ChartData::Pie {
                column: cols[0].clone(),
                slices,
            }
        }
        ChartKind::Histogram => {
            if !is_numeric(table, &cols[0]) {
                return Err(ChartError::HistogramNotNumeric);
            }
            let values = present_values(table, &cols[0]);
            if values.is_empty() {
                return Err(ChartError::NoData(cols[0].clone()));
            }
            ChartData::Histogram {
                column: cols[0].clone(),
                bins: histogram(&values, histogram_bins.max(1)),
            }
        }
        ChartKind::Scatter => {
            if cols.len() != 2 || !cols.iter().all(|c| is_numeric(table, c)) {
                return Err(ChartError::ScatterNotNumericPair);
            }
            let xs = numeric_cells(table, &cols[0]);
            let ys = numeric_cells(table, &cols[1]);
            let points = xs
                .into_iter()
                .zip(ys)
                .filter_map(|(x, y)| Some([x?, y?]))
                .collect();
            ChartData::Scatter {
                x_label: cols[0].clone(),
                y_label: cols[1].clone(),
                points,
            }
        }
        ChartKind::Boxplot => {
            if !is_numeric(table, &cols[0]) {
                return Err(ChartError::BoxplotNotNumeric);
            }
            let values = present_values(table, &cols[0]);
            let summary =
                box_summary(&values).ok_or_else(|| ChartError::NoData(cols[0].clone()))?;
            ChartData::Boxplot {
                column: cols[0].clone(),
                summary,
            }
        }
    };

    log::debug!("Built {} from {:?}", request.kind, cols);
    Ok(data)
}

/// A column is numeric when its non-null cells are all numbers. An all-null
/// column counts too, so an emptied filter result keeps its charts valid.
fn is_numeric(table: &Table, name: &str) -> bool {
    table
        .column(name)
        .is_some_and(|c| matches!(c.column_type(), ColumnType::Number | ColumnType::Empty))
}

fn numeric_cells(table: &Table, name: &str) -> Vec<Option<f64>> {
    table.numeric_values(name).unwrap_or_default()
}

fn present_values(table: &Table, name: &str) -> Vec<f64> {
    numeric_cells(table, name).into_iter().flatten().collect()
}

/// Non-null value frequencies: most frequent first, ties in value order.
fn value_counts(table: &Table, name: &str) -> Vec<(String, usize)> {
    let mut counts: BTreeMap<&CellValue, usize> = BTreeMap::new();
    if let Some(col) = table.column(name) {
        for v in col.values.iter().filter(|v| !v.is_null()) {
            *counts.entry(v).or_default() += 1;
        }
    }
    let mut ordered: Vec<(&CellValue, usize)> = counts.into_iter().collect();
    // Stable sort keeps value order among equal counts.
    ordered.sort_by(|a, b| b.1.cmp(&a.1));
    ordered
        .into_iter()
        .map(|(v, n)| (v.to_string(), n))
        .collect()
}

/// Sum of `value` per distinct `key`, keys in value order; null keys dropped.
fn grouped_sums(table: &Table, key: &str, value: &str) -> Vec<(String, f64)> {
    let (Some(keys), Some(values)) = (table.column(key), table.numeric_values(value)) else {
        return Vec::new();
    };
    let mut sums: BTreeMap<&CellValue, f64> = BTreeMap::new();
    for (k, v) in keys.values.iter().zip(values) {
        if k.is_null() {
            continue;
        }
        *sums.entry(k).or_default() += v.unwrap_or(0.0);
    }
    sums.into_iter().map(|(k, s)| (k.to_string(), s)).collect()
}

/// Equal-width bins over `[min, max]`; the last bin includes `max`.
pub fn histogram(values: &[f64], bins: usize) -> Vec<Bin> {
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() || !hi.is_finite() {
        return Vec::new();
    }
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bins as f64;
    let mut out: Vec<Bin> = (0..bins)
        .map(|i| Bin {
            start: lo + width * i as f64,
            end: if i + 1 == bins { hi } else { lo + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for &v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
        out[idx].count += 1;
    }
    out
}

/// Box-and-whisker summary; whiskers stop at the last value inside the fences.
pub fn box_summary(values: &[f64]) -> Option<BoxSummary> {
    let fences = Fences::from_values(values)?;
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    sorted.sort_by(f64::total_cmp);

    let inside = || sorted.iter().copied().filter(|&v| !fences.is_outlier(v));
    let whisker_low = inside().next().unwrap_or(fences.q1);
    let whisker_high = inside().last().unwrap_or(fences.q3);
    let fliers = sorted
        .iter()
        .copied()
        .filter(|&v| fences.is_outlier(v))
        .collect();

    Some(BoxSummary {
        q1: fences.q1,
        median: crate::data::stats::percentile(&sorted, 50.0),
        q3: fences.q3,
        whisker_low,
        whisker_high,
        fliers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn table() -> Table {
        Table::new(vec![
            Column::new("Categoria", vec![text("B"), text("A"), text("B"), text("C"), CellValue::Null]),
            Column::new(
                "Valor",
                vec![
                    CellValue::Integer(10),
                    CellValue::Integer(12),
                    CellValue::Float(11.5),
                    CellValue::Null,
                    CellValue::Integer(1000),
                ],
            ),
            Column::new("Qtd", (1..=5).map(CellValue::Integer).collect()),
        ])
        .unwrap()
    }

    fn request(kind: ChartKind, cols: &[&str]) -> ChartRequest {
        ChartRequest {
            kind,
            columns: cols.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn pie_with_two_columns_is_rejected() {
        let err = build_chart(&table(), &request(ChartKind::Pie, &["Categoria", "Valor"]), 20)
            .unwrap_err();
        assert_eq!(err, ChartError::PieColumnCount);
    }

    #[test]
    fn scatter_needs_two_numeric_columns() {
        let t = table();
        assert_eq!(
            build_chart(&t, &request(ChartKind::Scatter, &["Categoria", "Valor"]), 20),
            Err(ChartError::ScatterNotNumericPair)
        );
        assert_eq!(
            build_chart(&t, &request(ChartKind::Scatter, &["Valor"]), 20),
            Err(ChartError::ScatterNotNumericPair)
        );
    }

    #[test]
    fn scatter_skips_rows_with_a_null() {
        let chart = build_chart(&table(), &request(ChartKind::Scatter, &["Valor", "Qtd"]), 20).unwrap();
        let ChartData::Scatter { points, .. } = chart else {
            panic!("expected scatter");
        };
        assert_eq!(points.len(), 4);
        assert_eq!(points[3], [1000.0, 5.0]);
    }

    #[test]
    fn histogram_on_numeric_column() {
        let chart = build_chart(&table(), &request(ChartKind::Histogram, &["Valor"]), 20).unwrap();
        let ChartData::Histogram { bins, .. } = chart else {
            panic!("expected histogram");
        };
        assert_eq!(bins.len(), 20);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 4);
        assert_eq!(bins[19].count, 1);
        assert_eq!(bins[19].end, 1000.0);
    }

    #[test]
    fn histogram_rejects_text() {
        assert_eq!(
            build_chart(&table(), &request(ChartKind::Histogram, &["Categoria"]), 20),
            Err(ChartError::HistogramNotNumeric)
        );
    }

    #[test]
    fn histogram_of_a_constant_is_widened() {
        let bins = histogram(&[3.0, 3.0], 4);
        assert_eq!(bins[0].start, 2.5);
        assert_eq!(bins[3].end, 3.5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn bar_counts_sorted_by_frequency() {
        let chart = build_chart(&table(), &request(ChartKind::Bar, &["Categoria"]), 20).unwrap();
        assert_eq!(
            chart,
            ChartData::Bar {
                x_label: "Categoria".into(),
                y_label: "count".into(),
                bars: vec![("B".into(), 2.0), ("A".into(), 1.0), ("C".into(), 1.0)],
            }
        );
    }

    #[test]
    fn bar_with_two_columns_sums_by_group() {
        let t = table();
        let chart = build_chart(&t, &request(ChartKind::Bar, &["Categoria", "Valor"]), 20).unwrap();
        let ChartData::Bar { bars, .. } = chart else {
            panic!("expected bar");
        };
        assert_eq!(
            bars,
            vec![("A".into(), 12.0), ("B".into(), 21.5), ("C".into(), 0.0)]
        );
        assert_eq!(
            build_chart(&t, &request(ChartKind::Bar, &["Valor", "Categoria"]), 20),
            Err(ChartError::BarValueNotNumeric)
        );
    }

    #[test]
    fn line_requires_numeric_columns() {
        let t = table();
        assert_eq!(
            build_chart(&t, &request(ChartKind::Line, &["Valor", "Categoria"]), 20),
            Err(ChartError::LineNotNumeric)
        );
        let ChartData::Line { series } =
            build_chart(&t, &request(ChartKind::Line, &["Valor", "Qtd"]), 20).unwrap()
        else {
            panic!("expected line");
        };
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].points.len(), 4);
        assert_eq!(series[0].points[3], [4.0, 1000.0]);
    }

    #[test]
    fn pie_fractions_sum_to_one() {
        let ChartData::Pie { slices, .. } =
            build_chart(&table(), &request(ChartKind::Pie, &["Categoria"]), 20).unwrap()
        else {
            panic!("expected pie");
        };
        let total: f64 = slices.iter().map(|s| s.fraction).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(slices[0].percent_label(), "50.0%");
    }

    #[test]
    fn boxplot_whiskers_and_fliers() {
        let summary = box_summary(&[10.0, 12.0, 11.0, 1000.0, 9.0]).unwrap();
        assert_eq!(summary.q1, 10.0);
        assert_eq!(summary.median, 11.0);
        assert_eq!(summary.q3, 12.0);
        assert_eq!(summary.whisker_low, 9.0);
        assert_eq!(summary.whisker_high, 12.0);
        assert_eq!(summary.fliers, vec![1000.0]);
    }

    #[test]
    fn column_count_and_existence_are_checked() {
        let t = table();
        assert_eq!(
            build_chart(&t, &request(ChartKind::Bar, &[]), 20),
            Err(ChartError::ColumnCount(0))
        );
        assert_eq!(
            build_chart(&t, &request(ChartKind::Bar, &["Valor", "Qtd", "Categoria"]), 20),
            Err(ChartError::ColumnCount(3))
        );
        assert_eq!(
            build_chart(&t, &request(ChartKind::Bar, &["Nope"]), 20),
            Err(ChartError::UnknownColumn("Nope".into()))
        );
    }
}
