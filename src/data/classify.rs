use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime};

use super::advisory::{Advisories, Advisory};
use super::model::{CellValue, ColumnType, Table};

/// Substring that marks a column as a date column ("data" = date).
pub const DATE_TOKEN: &str = "data";

/// Year-first formats, unambiguous in any column.
const ISO_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

const ISO_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const MONTH_FIRST_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%m.%d.%Y",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// How a column writes year-last dates such as `01/02/2023`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateOrder {
    /// `mm/dd/yyyy`; assumed when nothing in the column says otherwise.
    #[default]
    MonthFirst,
    /// `dd/mm/yyyy`
    DayFirst,
}

impl DateOrder {
    /// Order implied by a single text value, if it is unambiguous.
    fn of_value(s: &str) -> Option<Self> {
        let date_part = s.trim().split([' ', 'T']).next()?;
        let parts: Vec<&str> = date_part.split(['/', '-', '.']).collect();
        let [first, second, year] = parts.as_slice() else {
            return None;
        };
        if year.len() != 4 {
            return None;
        }
        let first: u32 = first.parse().ok()?;
        let second: u32 = second.parse().ok()?;
        match (first > 12, second > 12) {
            (true, false) => Some(DateOrder::DayFirst),
            (false, true) => Some(DateOrder::MonthFirst),
            _ => None,
        }
    }

    /// The first unambiguous text cell decides for the whole column.
    pub fn infer(values: &[CellValue]) -> Self {
        values
            .iter()
            .filter_map(|v| match v {
                CellValue::Text(s) => Self::of_value(s),
                _ => None,
            })
            .next()
            .unwrap_or_default()
    }

    fn formats(self) -> &'static [&'static str] {
        match self {
            DateOrder::MonthFirst => MONTH_FIRST_FORMATS,
            DateOrder::DayFirst => DAY_FIRST_FORMATS,
        }
    }
}

/// Role a column plays in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Date,
    Categorical,
    Numeric,
    Other,
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnRole::Date => "date",
            ColumnRole::Categorical => "categorical",
            ColumnRole::Numeric => "numeric",
            ColumnRole::Other => "other",
        };
        f.write_str(name)
    }
}

/// Result of classifying every column of a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    /// Role per column, in table order.
    pub roles: Vec<(String, ColumnRole)>,
    /// First column whose name carries the date token, valid dates or not.
    pub date_column: Option<String>,
}

impl Classification {
    pub fn role_of(&self, column: &str) -> Option<ColumnRole> {
        self.roles
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, role)| *role)
    }

    fn with_role(&self, role: ColumnRole) -> Vec<String> {
        self.roles
            .iter()
            .filter(|(_, r)| *r == role)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.with_role(ColumnRole::Categorical)
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.with_role(ColumnRole::Numeric)
    }
}

/// Whether a column name marks a date column.
pub fn is_date_name(name: &str) -> bool {
    name.to_lowercase().contains(DATE_TOKEN)
}

/// Classify every column and normalise date-named columns in place.
///
/// Cells of a date-named column that cannot be read as a calendar date become
/// null and an advisory records how many were lost.
pub fn classify(table: &mut Table, advisories: &mut Advisories) -> Classification {
    let date_named: Vec<String> = table
        .column_names()
        .filter(|name| is_date_name(name))
        .map(str::to_string)
        .collect();

    for name in &date_named {
        let Some(cells) = table.column_mut(name) else {
            continue;
        };
        let order = DateOrder::infer(cells);
        log::debug!("Column '{name}' read as {order:?} dates");
        let mut lost = 0;
        for cell in cells.iter_mut() {
            *cell = match coerce_date(cell, order) {
                Some(date) => CellValue::Date(date),
                None => {
                    if !cell.is_null() {
                        lost += 1;
                    }
                    CellValue::Null
                }
            };
        }
        if lost > 0 {
            advisories.push(Advisory::UnparseableDates {
                column: name.clone(),
                count: lost,
            });
        }
    }

    let roles: Vec<(String, ColumnRole)> = table
        .columns()
        .iter()
        .map(|column| {
            let role = if is_date_name(&column.name) {
                if column.non_null_count() > 0 {
                    ColumnRole::Date
                } else {
                    ColumnRole::Other
                }
            } else {
                match column.column_type() {
                    ColumnType::Text => ColumnRole::Categorical,
                    ColumnType::Number => ColumnRole::Numeric,
                    _ => ColumnRole::Other,
                }
            };
            (column.name.clone(), role)
        })
        .collect();

    for (column, role) in &roles {
        log::debug!("Column '{column}' classified as {role}");
    }
    Classification {
        date_column: date_named.into_iter().next(),
        roles,
    }
}

/// Read a cell as a calendar date, dropping any time of day.
pub fn coerce_date(value: &CellValue, order: DateOrder) -> Option<NaiveDate> {
    match value {
        CellValue::Date(d) => Some(*d),
        CellValue::Text(s) => parse_date_str(s, order),
        CellValue::Integer(i) => from_serial_days(*i as f64),
        CellValue::Float(f) => from_serial_days(*f),
        CellValue::Bool(_) | CellValue::Null => None,
    }
}

/// Parses a date or datetime string: year-first formats, then the year-last
/// formats of the given order.
pub fn parse_date_str(s: &str, order: DateOrder) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    ISO_DATE_FORMATS
        .iter()
        .chain(order.formats())
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| {
            ISO_DATETIME_FORMATS
                .iter()
                .chain(order.formats())
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Spreadsheet serial day number (1900 date system) to a date.
fn from_serial_days(serial: f64) -> Option<NaiveDate> {
    // 2958465 is 9999-12-31.
    if !serial.is_finite() || !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.trunc() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn sales_table() -> Table {
        Table::new(vec![
            Column::new(
                "Data_Venda",
                vec![text("2023-01-01"), text("15/06/2023"), text("not a date"), CellValue::Null],
            ),
            Column::new("Categoria", vec![text("A"), text("B"), text("A"), text("B")]),
            Column::new(
                "Valor",
                vec![
                    CellValue::Integer(10),
                    CellValue::Float(12.5),
                    CellValue::Integer(11),
                    CellValue::Null,
                ],
            ),
            Column::new("Ativo", vec![CellValue::Bool(true); 4]),
        ])
        .unwrap()
    }

    #[test]
    fn roles_are_assigned_by_name_and_type() {
        let mut table = sales_table();
        let mut advisories = Advisories::new();
        let classification = classify(&mut table, &mut advisories);

        assert_eq!(classification.date_column.as_deref(), Some("Data_Venda"));
        assert_eq!(classification.role_of("Data_Venda"), Some(ColumnRole::Date));
        assert_eq!(classification.role_of("Categoria"), Some(ColumnRole::Categorical));
        assert_eq!(classification.role_of("Valor"), Some(ColumnRole::Numeric));
        assert_eq!(classification.role_of("Ativo"), Some(ColumnRole::Other));
    }

    #[test]
    fn unparseable_dates_become_null_with_advisory() {
        let mut table = sales_table();
        let mut advisories = Advisories::new();
        classify(&mut table, &mut advisories);

        let dates = &table.column("Data_Venda").unwrap().values;
        assert_eq!(dates[0], CellValue::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()));
        assert_eq!(dates[1], CellValue::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()));
        assert_eq!(dates[2], CellValue::Null);
        assert_eq!(dates[3], CellValue::Null);
        assert!(advisories.contains(&Advisory::UnparseableDates {
            column: "Data_Venda".into(),
            count: 1
        }));
    }

    #[test]
    fn date_named_text_is_never_categorical() {
        let mut table = Table::new(vec![Column::new(
            "data de entrega",
            vec![text("soon"), text("later")],
        )])
        .unwrap();
        let mut advisories = Advisories::new();
        let classification = classify(&mut table, &mut advisories);

        assert_eq!(classification.role_of("data de entrega"), Some(ColumnRole::Other));
        assert_eq!(classification.date_column.as_deref(), Some("data de entrega"));
        assert!(classification.categorical_columns().is_empty());
    }

    #[test]
    fn only_first_date_column_is_selected() {
        let mut table = Table::new(vec![
            Column::new("DataPedido", vec![text("2023-01-01")]),
            Column::new("DataEntrega", vec![text("2023-02-01")]),
        ])
        .unwrap();
        let classification = classify(&mut table, &mut Advisories::new());
        assert_eq!(classification.date_column.as_deref(), Some("DataPedido"));
        assert_eq!(classification.role_of("DataEntrega"), Some(ColumnRole::Date));
    }

    #[test]
    fn serial_numbers_are_spreadsheet_days() {
        assert_eq!(
            coerce_date(&CellValue::Integer(44927), DateOrder::default()),
            NaiveDate::from_ymd_opt(2023, 1, 1)
        );
        assert_eq!(coerce_date(&CellValue::Integer(-3), DateOrder::default()), None);
    }

    #[test]
    fn datetime_strings_keep_only_the_date() {
        assert_eq!(
            parse_date_str("2023-03-04 17:30:00", DateOrder::DayFirst),
            NaiveDate::from_ymd_opt(2023, 3, 4)
        );
        assert_eq!(
            parse_date_str("12/31/2023 08:15", DateOrder::MonthFirst),
            NaiveDate::from_ymd_opt(2023, 12, 31)
        );
        assert_eq!(parse_date_str("   ", DateOrder::MonthFirst), None);
    }

    fn classify_dates(values: &[&str]) -> (Vec<CellValue>, Advisories) {
        let mut table = Table::new(vec![Column::new(
            "Data_Venda",
            values.iter().map(|v| text(v)).collect(),
        )])
        .unwrap();
        let mut advisories = Advisories::new();
        classify(&mut table, &mut advisories);
        (table.column("Data_Venda").unwrap().values.clone(), advisories)
    }

    fn date(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn month_first_column_is_read_month_first() {
        let (values, advisories) = classify_dates(&["01/02/2023", "12/31/2023"]);
        assert_eq!(values, vec![date(2023, 1, 2), date(2023, 12, 31)]);
        assert!(advisories.is_empty());
    }

    #[test]
    fn ambiguous_column_defaults_to_month_first() {
        let (values, advisories) = classify_dates(&["01/02/2023", "03/04/2023"]);
        assert_eq!(values, vec![date(2023, 1, 2), date(2023, 3, 4)]);
        assert!(advisories.is_empty());
    }

    #[test]
    fn first_unambiguous_value_sets_the_order() {
        let (values, advisories) = classify_dates(&["01/02/2023", "25/12/2023", "2023-07-01"]);
        assert_eq!(values, vec![date(2023, 2, 1), date(2023, 12, 25), date(2023, 7, 1)]);
        assert!(advisories.is_empty());
    }

    #[test]
    fn values_against_the_column_order_are_lost() {
        let (values, advisories) = classify_dates(&["25/12/2023", "12/31/2023"]);
        assert_eq!(values, vec![date(2023, 12, 25), CellValue::Null]);
        assert!(advisories.contains(&Advisory::UnparseableDates {
            column: "Data_Venda".into(),
            count: 1
        }));
    }

    #[test]
    fn order_of_single_values() {
        assert_eq!(DateOrder::of_value("13/01/2023"), Some(DateOrder::DayFirst));
        assert_eq!(DateOrder::of_value("01-13-2023"), Some(DateOrder::MonthFirst));
        assert_eq!(DateOrder::of_value("05.06.2023"), None);
        assert_eq!(DateOrder::of_value("2023-01-13"), None);
        assert_eq!(DateOrder::of_value("13/01/2023 10:00"), Some(DateOrder::DayFirst));
    }
}
