use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CellValue – a single cell of the uploaded table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring what a spreadsheet cell can hold.
/// Using `BTreeMap` / `BTreeSet` downstream so `CellValue` must be `Ord`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so we can put CellValue in BTreeSet --

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) | Float(_) => 2,
                Date(_) => 3,
                Text(_) => 4,
            }
        }
        let da = discriminant(self);
        let db = discriminant(other);
        if da != db {
            return da.cmp(&db);
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            // Mixed numeric cells compare by value, ties broken by variant.
            (Integer(a), Float(b)) => (*a as f64).total_cmp(b).then(std::cmp::Ordering::Less),
            (Float(a), Integer(b)) => a.total_cmp(&(*b as f64)).then(std::cmp::Ordering::Greater),
            (Date(a), Date(b)) => a.cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => std::cmp::Ordering::Equal,
        }
    }
}

impl std::hash::Hash for CellValue {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => f.to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Date(d) => d.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64` when it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// ColumnType – semantic type of a whole column
// ---------------------------------------------------------------------------

/// Semantic type of a column, derived from its non-null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Number,
    Text,
    Date,
    Boolean,
    /// Only null cells.
    Empty,
    /// Non-text values of different kinds (e.g. numbers and dates).
    Mixed,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnType::Number => "number",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
            ColumnType::Empty => "empty",
            ColumnType::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Column / Table
// ---------------------------------------------------------------------------

/// One named column of cells.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Derive the semantic type from the non-null cells.
    ///
    /// Any text cell makes the column textual, like an `object` column in a
    /// dataframe; integers and floats together are still numeric.
    pub fn column_type(&self) -> ColumnType {
        let mut seen_number = false;
        let mut seen_date = false;
        let mut seen_bool = false;
        for value in &self.values {
            match value {
                CellValue::Text(_) => return ColumnType::Text,
                CellValue::Integer(_) | CellValue::Float(_) => seen_number = true,
                CellValue::Date(_) => seen_date = true,
                CellValue::Bool(_) => seen_bool = true,
                CellValue::Null => {}
            }
        }
        match (seen_number, seen_date, seen_bool) {
            (false, false, false) => ColumnType::Empty,
            (true, false, false) => ColumnType::Number,
            (false, true, false) => ColumnType::Date,
            (false, false, true) => ColumnType::Boolean,
            _ => ColumnType::Mixed,
        }
    }

    pub fn non_null_count(&self) -> usize {
        self.values.iter().filter(|v| !v.is_null()).count()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("column '{column}' has {found} rows, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
}

/// The uploaded table: named columns, rows aligned by position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    row_count: usize,
}

impl Table {
    /// Build a table, checking that every column has the same row count.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let row_count = columns.first().map(|c| c.values.len()).unwrap_or(0);
        let mut names = BTreeSet::new();
        for col in &columns {
            if col.values.len() != row_count {
                return Err(TableError::RaggedColumn {
                    column: col.name.clone(),
                    expected: row_count,
                    found: col.values.len(),
                });
            }
            if !names.insert(col.name.as_str()) {
                return Err(TableError::DuplicateColumn(col.name.clone()));
            }
        }
        Ok(Self { columns, row_count })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.row_count
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Mutable cells of a column. A slice, so the row count cannot change.
    pub fn column_mut(&mut self, name: &str) -> Option<&mut [CellValue]> {
        self.columns
            .iter_mut()
            .find(|c| c.name == name)
            .map(|c| c.values.as_mut_slice())
    }

    /// Sorted set of distinct values of a column (null included).
    pub fn unique_values(&self, name: &str) -> BTreeSet<CellValue> {
        self.column(name)
            .map(|c| c.values.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Numeric view of a column: `None` for null or non-numeric cells.
    pub fn numeric_values(&self, name: &str) -> Option<Vec<Option<f64>>> {
        self.column(name)
            .map(|c| c.values.iter().map(CellValue::as_f64).collect())
    }

    /// Build a new table holding the given rows, in the given order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: indices.iter().map(|&i| c.values[i].clone()).collect(),
            })
            .collect();
        Table {
            columns,
            row_count: indices.len(),
        }
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> Table {
        let indices: Vec<usize> = (0..self.row_count.min(n)).collect();
        self.select_rows(&indices)
    }

    /// Keep only the named columns (unknown names are skipped).
    pub fn project(&self, names: &[String]) -> Table {
        let columns = names
            .iter()
            .filter_map(|n| self.column(n).cloned())
            .collect();
        Table {
            columns,
            row_count: self.row_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    #[test]
    fn ragged_columns_are_rejected() {
        let err = Table::new(vec![
            Column::new("a", vec![CellValue::Integer(1), CellValue::Integer(2)]),
            Column::new("b", vec![CellValue::Integer(1)]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            TableError::RaggedColumn {
                column: "b".into(),
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = Table::new(vec![
            Column::new("a", vec![CellValue::Null]),
            Column::new("a", vec![CellValue::Null]),
        ])
        .unwrap_err();
        assert_eq!(err, TableError::DuplicateColumn("a".into()));
    }

    #[test]
    fn column_type_follows_values() {
        let num = Column::new("n", vec![CellValue::Integer(1), CellValue::Float(2.5), CellValue::Null]);
        let txt = Column::new("t", vec![CellValue::Integer(1), text("x")]);
        let empty = Column::new("e", vec![CellValue::Null, CellValue::Null]);
        let mixed = Column::new(
            "m",
            vec![
                CellValue::Integer(1),
                CellValue::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()),
            ],
        );
        assert_eq!(num.column_type(), ColumnType::Number);
        assert_eq!(txt.column_type(), ColumnType::Text);
        assert_eq!(empty.column_type(), ColumnType::Empty);
        assert_eq!(mixed.column_type(), ColumnType::Mixed);
    }

    #[test]
    fn select_rows_preserves_requested_order() {
        let table = Table::new(vec![Column::new(
            "v",
            vec![text("a"), text("b"), text("c")],
        )])
        .unwrap();
        let picked = table.select_rows(&[0, 2]);
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.column("v").unwrap().values, vec![text("a"), text("c")]);
    }

    #[test]
    fn mixed_numbers_order_by_value() {
        let mut set = BTreeSet::new();
        set.insert(CellValue::Float(2.5));
        set.insert(CellValue::Integer(3));
        set.insert(CellValue::Integer(1));
        let ordered: Vec<_> = set.into_iter().collect();
        assert_eq!(
            ordered,
            vec![CellValue::Integer(1), CellValue::Float(2.5), CellValue::Integer(3)]
        );
    }

    #[test]
    fn column_mut_edits_cells_in_place() {
        let mut table = Table::new(vec![Column::new("v", vec![text("a"), text("b")])]).unwrap();
        for cell in table.column_mut("v").unwrap() {
            *cell = CellValue::Null;
        }
        assert_eq!(table.column("v").unwrap().values, vec![CellValue::Null; 2]);
        assert_eq!(table.len(), 2);
        assert!(table.column_mut("missing").is_none());
    }
}
