use std::collections::BTreeSet;

use chrono::NaiveDate;

use super::advisory::{Advisories, Advisory};
use super::model::{CellValue, Table};

// ---------------------------------------------------------------------------
// Filter predicates
// ---------------------------------------------------------------------------

/// Inclusive calendar range selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }
}

/// Which values of one categorical column are kept.
/// An empty set means nothing is selected, so no row passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFilter {
    pub column: String,
    pub allowed: BTreeSet<CellValue>,
}

impl CategoryFilter {
    /// Initialise with every observed value selected (i.e., keep everything).
    pub fn all_values(table: &Table, column: &str) -> Self {
        Self {
            column: column.to_string(),
            allowed: table.unique_values(column),
        }
    }
}

/// Min/max of the non-null dates of a column, or `None` without any date.
pub fn date_bounds(table: &Table, column: &str) -> Option<DateRange> {
    let col = table.column(column)?;
    let mut dates = col.values.iter().filter_map(CellValue::as_date);
    let first = dates.next()?;
    let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
    Some(DateRange::new(min, max))
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Apply the date range, then the category filter, keeping row order.
///
/// A row passes the date range when its date lies in `[start, end]`; rows
/// with a null date are outside every range. Preconditions that do not hold
/// (no valid date, inverted range) skip the date step with an advisory.
pub fn filter(
    table: &Table,
    date_column: Option<&str>,
    date_range: Option<&DateRange>,
    category: Option<&CategoryFilter>,
    advisories: &mut Advisories,
) -> Table {
    let mut indices: Vec<usize> = (0..table.len()).collect();

    if let (Some(column), Some(range)) = (date_column, date_range) {
        if let Some(dates) = date_cells(table, column, advisories) {
            if range.is_inverted() {
                advisories.push(Advisory::InvertedDateRange {
                    start: range.start,
                    end: range.end,
                });
            } else {
                indices.retain(|&i| dates[i].as_date().is_some_and(|d| range.contains(d)));
            }
        }
    }

    if let Some(category) = category {
        if let Some(col) = table.column(&category.column) {
            if category.allowed.is_empty() {
                advisories.push(Advisory::EmptyCategorySelection {
                    column: category.column.clone(),
                });
            }
            indices.retain(|&i| category.allowed.contains(&col.values[i]));
        }
    }

    log::debug!("Filter kept {} of {} rows", indices.len(), table.len());
    if indices.len() == table.len() {
        return table.clone();
    }
    table.select_rows(&indices)
}

/// Cells of the date column when it holds at least one valid date.
fn date_cells<'a>(
    table: &'a Table,
    column: &str,
    advisories: &mut Advisories,
) -> Option<&'a [CellValue]> {
    let col = table.column(column)?;
    if col.values.iter().any(|v| v.as_date().is_some()) {
        Some(&col.values)
    } else {
        advisories.push(Advisory::NoValidDates {
            column: column.to_string(),
        });
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn table() -> Table {
        Table::new(vec![
            Column::new(
                "Data",
                vec![
                    CellValue::Date(date(2023, 1, 1)),
                    CellValue::Date(date(2023, 3, 1)),
                    CellValue::Date(date(2023, 6, 1)),
                    CellValue::Date(date(2023, 9, 1)),
                    CellValue::Date(date(2023, 12, 31)),
                ],
            ),
            Column::new("Cat", vec![text("A"), text("B"), text("A"), text("B"), text("A")]),
            Column::new("Id", (0..5).map(CellValue::Integer).collect()),
        ])
        .unwrap()
    }

    fn ids(table: &Table) -> Vec<CellValue> {
        table.column("Id").unwrap().values.clone()
    }

    #[test]
    fn full_bounds_are_identity() {
        let t = table();
        let bounds = date_bounds(&t, "Data").unwrap();
        assert_eq!(bounds, DateRange::new(date(2023, 1, 1), date(2023, 12, 31)));

        let mut advisories = Advisories::new();
        let out = filter(&t, Some("Data"), Some(&bounds), None, &mut advisories);
        assert_eq!(out, t);
        assert!(advisories.is_empty());
    }

    #[test]
    fn range_is_inclusive_on_both_ends() {
        let t = table();
        let range = DateRange::new(date(2023, 3, 1), date(2023, 9, 1));
        let out = filter(&t, Some("Data"), Some(&range), None, &mut Advisories::new());
        assert_eq!(ids(&out), vec![CellValue::Integer(1), CellValue::Integer(2), CellValue::Integer(3)]);
    }

    #[test]
    fn inverted_range_is_skipped_with_advisory() {
        let t = table();
        let range = DateRange::new(date(2023, 9, 1), date(2023, 3, 1));
        let mut advisories = Advisories::new();
        let out = filter(&t, Some("Data"), Some(&range), None, &mut advisories);
        assert_eq!(out, t);
        assert!(advisories.contains(&Advisory::InvertedDateRange {
            start: date(2023, 9, 1),
            end: date(2023, 3, 1)
        }));
    }

    #[test]
    fn no_valid_dates_skips_date_step() {
        let t = Table::new(vec![
            Column::new("Data", vec![CellValue::Null, CellValue::Null]),
            Column::new("Id", vec![CellValue::Integer(0), CellValue::Integer(1)]),
        ])
        .unwrap();
        assert_eq!(date_bounds(&t, "Data"), None);

        let range = DateRange::new(date(2023, 1, 1), date(2023, 1, 2));
        let mut advisories = Advisories::new();
        let out = filter(&t, Some("Data"), Some(&range), None, &mut advisories);
        assert_eq!(out.len(), 2);
        assert!(advisories.contains(&Advisory::NoValidDates { column: "Data".into() }));
    }

    #[test]
    fn null_dates_fall_outside_any_range() {
        let t = Table::new(vec![Column::new(
            "Data",
            vec![CellValue::Date(date(2023, 1, 1)), CellValue::Null],
        )])
        .unwrap();
        let bounds = date_bounds(&t, "Data").unwrap();
        let out = filter(&t, Some("Data"), Some(&bounds), None, &mut Advisories::new());
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn default_category_selection_is_identity() {
        let t = table();
        let all = CategoryFilter::all_values(&t, "Cat");
        let out = filter(&t, None, None, Some(&all), &mut Advisories::new());
        assert_eq!(out, t);
    }

    #[test]
    fn category_filter_keeps_order() {
        let t = table();
        let mut only_a = CategoryFilter::all_values(&t, "Cat");
        only_a.allowed.remove(&text("B"));
        let out = filter(&t, None, None, Some(&only_a), &mut Advisories::new());
        assert_eq!(ids(&out), vec![CellValue::Integer(0), CellValue::Integer(2), CellValue::Integer(4)]);
    }

    #[test]
    fn empty_selection_yields_empty_table() {
        let t = table();
        let none = CategoryFilter {
            column: "Cat".into(),
            allowed: BTreeSet::new(),
        };
        let mut advisories = Advisories::new();
        let out = filter(&t, None, None, Some(&none), &mut advisories);
        assert!(out.is_empty());
        assert_eq!(out.columns().len(), 3);
        assert!(advisories.contains(&Advisory::EmptyCategorySelection { column: "Cat".into() }));
    }

    #[test]
    fn filtering_is_idempotent() {
        let t = table();
        let range = DateRange::new(date(2023, 2, 1), date(2023, 12, 1));
        let mut cat = CategoryFilter::all_values(&t, "Cat");
        cat.allowed.remove(&text("A"));

        let once = filter(&t, Some("Data"), Some(&range), Some(&cat), &mut Advisories::new());
        let twice = filter(&once, Some("Data"), Some(&range), Some(&cat), &mut Advisories::new());
        assert_eq!(once, twice);
        assert_eq!(ids(&once), vec![CellValue::Integer(1), CellValue::Integer(3)]);
    }
}
