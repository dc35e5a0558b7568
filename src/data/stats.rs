use super::model::Table;

/// Summary statistics of one numeric column.
///
/// Values are kept at full precision; rounding is a presentation concern.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation (N−1); NaN for fewer than two values.
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SummaryStats {
    /// Compute statistics from values, ignoring non-finite entries.
    pub fn compute(values: &[f64]) -> Option<Self> {
        let mut vals: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if vals.is_empty() {
            return None;
        }
        vals.sort_by(f64::total_cmp);

        let count = vals.len();
        let mean = vals.iter().sum::<f64>() / count as f64;
        let std_dev = if count < 2 {
            f64::NAN
        } else {
            let ss: f64 = vals.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        };

        Some(SummaryStats {
            count,
            mean,
            median: percentile(&vals, 50.0),
            std_dev,
            min: vals[0],
            max: vals[count - 1],
        })
    }

    /// Label / value pairs in display order.
    pub fn entries(&self) -> [(&'static str, f64); 5] {
        [
            ("Mean", self.mean),
            ("Median", self.median),
            ("Standard deviation", self.std_dev),
            ("Minimum", self.min),
            ("Maximum", self.max),
        ]
    }
}

/// Statistics of `column`, or `None` when it is missing or has no numeric value.
pub fn summarize(table: &Table, column: &str) -> Option<SummaryStats> {
    let values: Vec<f64> = table.numeric_values(column)?.into_iter().flatten().collect();
    SummaryStats::compute(&values)
}

/// Percentile of an ascending slice using linear interpolation.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = (p / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;

    if upper >= sorted.len() {
        sorted[sorted.len() - 1]
    } else {
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Two-decimal rendering used by the dashboard and the report.
pub fn format_measure(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column};

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn sample_statistics() {
        let stats = SummaryStats::compute(&[10.0, 12.0, 11.0, 1000.0, 9.0]).unwrap();
        assert!(approx(stats.mean, 208.4));
        assert!(approx(stats.median, 11.0));
        assert!(approx(stats.min, 9.0));
        assert!(approx(stats.max, 1000.0));
        // sqrt(sum((x - 208.4)^2) / 4)
        assert!((stats.std_dev - 442.519_265_117_350_6).abs() < 1e-6);
    }

    #[test]
    fn even_count_median_interpolates() {
        let stats = SummaryStats::compute(&[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert!(approx(stats.median, 2.5));
    }

    #[test]
    fn constant_column_has_zero_spread() {
        let stats = SummaryStats::compute(&[7.0, 7.0, 7.0]).unwrap();
        assert_eq!(stats.std_dev, 0.0);
    }

    #[test]
    fn single_value_std_dev_is_nan() {
        let stats = SummaryStats::compute(&[7.0]).unwrap();
        assert!(stats.std_dev.is_nan());
        assert_eq!(stats.mean, 7.0);
    }

    #[test]
    fn nulls_are_ignored_and_all_null_is_none() {
        let table = Table::new(vec![
            Column::new("v", vec![CellValue::Integer(2), CellValue::Null, CellValue::Float(4.0)]),
            Column::new("empty", vec![CellValue::Null; 3]),
        ])
        .unwrap();
        let stats = summarize(&table, "v").unwrap();
        assert_eq!(stats.count, 2);
        assert!(approx(stats.mean, 3.0));
        assert!(summarize(&table, "empty").is_none());
        assert!(summarize(&table, "missing").is_none());
    }

    #[test]
    fn formatting_rounds_to_two_places() {
        assert_eq!(format_measure(208.4), "208.40");
        assert_eq!(format_measure(2.0 / 3.0), "0.67");
        assert_eq!(format_measure(f64::NAN), "NaN");
    }
}
