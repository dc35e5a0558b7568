use std::fmt;

use chrono::NaiveDate;

/// A non-fatal notice that a step was skipped or degraded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    /// Some cells of a date column could not be read as dates and became null.
    UnparseableDates { column: String, count: usize },
    /// The date column has no valid date at all; date filtering is off.
    NoValidDates { column: String },
    /// Start date after end date; date filtering is off.
    InvertedDateRange { start: NaiveDate, end: NaiveDate },
    NoCategoricalColumn,
    /// Nothing selected in the category filter; the result is empty.
    EmptyCategorySelection { column: String },
    NoNumericColumn,
    /// The selected numeric column has no value left after filtering.
    NoNumericValues { column: String },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::UnparseableDates { column, count } => write!(
                f,
                "{count} value(s) in column '{column}' could not be read as dates and were left empty."
            ),
            Advisory::NoValidDates { column } => {
                write!(f, "No valid date found in column '{column}'.")
            }
            Advisory::InvertedDateRange { start, end } => write!(
                f,
                "The start date ({start}) cannot be after the end date ({end})."
            ),
            Advisory::NoCategoricalColumn => {
                write!(f, "No categorical column available for filtering.")
            }
            Advisory::EmptyCategorySelection { column } => {
                write!(f, "No value selected for '{column}': no rows match.")
            }
            Advisory::NoNumericColumn => {
                write!(f, "No numeric column available for statistical analysis.")
            }
            Advisory::NoNumericValues { column } => {
                write!(f, "Column '{column}' has no numeric values after filtering.")
            }
        }
    }
}

/// Collects advisories next to the data path so callers can show them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Advisories(Vec<Advisory>);

impl Advisories {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, advisory: Advisory) {
        log::warn!("{advisory}");
        self.0.push(advisory);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Advisory> {
        self.0.iter()
    }

    #[cfg(test)]
    pub fn contains(&self, advisory: &Advisory) -> bool {
        self.0.contains(advisory)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
