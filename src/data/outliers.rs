//! IQR with Tukey fences.
//!
//! Q1 - k*IQR and Q3 + k*IQR as fences (k = 1.5).

use super::model::Table;
use super::stats::percentile;

/// Fence multiplier for Tukey's rule.
pub const TUKEY_K: f64 = 1.5;

/// Quartiles and the fences derived from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl Fences {
    /// Fences of the given values; `None` when there is no finite value.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);

        let q1 = percentile(&sorted, 25.0);
        let q3 = percentile(&sorted, 75.0);
        let iqr = q3 - q1;
        Some(Fences {
            q1,
            q3,
            iqr,
            lower: q1 - TUKEY_K * iqr,
            upper: q3 + TUKEY_K * iqr,
        })
    }

    /// Strictly outside either fence.
    pub fn is_outlier(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Rows of a table flagged by the IQR rule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutlierSet {
    pub column: String,
    pub fences: Option<Fences>,
    /// Row positions in the input table, ascending.
    pub rows: Vec<usize>,
    /// The flagged rows as a table with every column of the input.
    pub table: Table,
}

impl OutlierSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Flag rows whose `column` value lies outside the IQR fences.
///
/// Null cells are never outliers. A column without any numeric value gives
/// an empty set and no fences.
pub fn detect_outliers(table: &Table, column: &str) -> OutlierSet {
    let values = table.numeric_values(column).unwrap_or_default();
    let present: Vec<f64> = values.iter().flatten().copied().collect();

    let fences = Fences::from_values(&present);
    let rows: Vec<usize> = match &fences {
        Some(f) => values
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_some_and(|x| f.is_outlier(x)))
            .map(|(i, _)| i)
            .collect(),
        None => Vec::new(),
    };

    if !rows.is_empty() {
        log::info!("{} outlier(s) detected in '{column}'", rows.len());
    }
    OutlierSet {
        column: column.to_string(),
        fences,
        table: table.select_rows(&rows),
        rows,
    }
}
