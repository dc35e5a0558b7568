use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use calamine::{open_workbook_auto, Data, DataType as _, Reader};
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{CellValue, Column, Table};

/// Extensions offered in the open dialog.
pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "ods"];
pub const OTHER_EXTENSIONS: &[&str] = &["csv", "json", "parquet", "pq"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.xlsx` / `.xlsm` / `.xls` / `.ods` – first sheet, header row (recommended)
/// * `.csv`     – header row, values typed by guessing
/// * `.json`    – `[{ "col": value, ... }, ...]`
/// * `.parquet` – flat scalar columns
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => load_spreadsheet(path),
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

/// Assemble row-major cells under a header into a table, padding short rows.
fn table_from_rows(headers: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Table> {
    let mut seen: Vec<String> = Vec::with_capacity(headers.len());
    let mut columns: Vec<Column> = Vec::with_capacity(headers.len());
    for (i, h) in headers.into_iter().enumerate() {
        let base = if h.trim().is_empty() {
            format!("column_{}", i + 1)
        } else {
            h.trim().to_string()
        };
        // Repeated headers get a numeric suffix: "Valor", "Valor.1", ...
        let mut name = base.clone();
        let mut n = 0;
        while seen.contains(&name) {
            n += 1;
            name = format!("{base}.{n}");
        }
        seen.push(name.clone());
        columns.push(Column::new(name, Vec::with_capacity(rows.len())));
    }

    for row in rows {
        let mut cells = row.into_iter();
        for column in &mut columns {
            column.values.push(cells.next().unwrap_or(CellValue::Null));
        }
    }

    Table::new(columns).context("building table")
}

// ---------------------------------------------------------------------------
// Spreadsheet loader
// ---------------------------------------------------------------------------

/// First worksheet; the first row holds the column names.
fn load_spreadsheet(path: &Path) -> Result<Table> {
    let mut workbook = open_workbook_auto(path).context("opening spreadsheet")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("Spreadsheet has no worksheet")?
        .context("reading first worksheet")?;

    let mut rows = range.rows();
    let headers: Vec<String> = rows
        .next()
        .context("Spreadsheet has no header row")?
        .iter()
        .map(|c| c.as_string().unwrap_or_else(|| c.to_string()))
        .collect();

    let body: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .filter(|row: &Vec<CellValue>| row.iter().any(|c| !c.is_null()))
        .collect();

    table_from_rows(headers, body)
}

fn spreadsheet_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) if s.trim().is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_date()
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        rows.push(record.iter().map(guess_cell_type).collect());
    }

    table_from_rows(headers, rows)
}

fn guess_cell_type(s: &str) -> CellValue {
    let s = s.trim();
    if s.is_empty() {
        return CellValue::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return CellValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return CellValue::Float(f);
    }
    if s == "true" || s == "false" {
        return CellValue::Bool(s == "true");
    }
    CellValue::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "Data_Venda": "2023-01-01", "Categoria": "A", "Valor": 10 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let records = root.as_array().context("Expected top-level JSON array")?;

    // Column order is the order of first appearance.
    let mut headers: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            headers
                .iter()
                .map(|h| obj.get(h).map(json_to_cell).unwrap_or(CellValue::Null))
                .collect()
        })
        .collect();

    table_from_rows(headers, rows)
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::Text(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::Text(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with flat scalar columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let headers: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut rows = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            rows.push(
                batch
                    .columns()
                    .iter()
                    .map(|col| extract_cell(col, row))
                    .collect(),
            );
        }
    }

    table_from_rows(headers, rows)
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| CellValue::Text(s.value(row).to_string()))
            .unwrap_or(CellValue::Null),
        DataType::LargeUtf8 => CellValue::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| CellValue::Integer(a.value(row) as i64))
            .unwrap_or(CellValue::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| CellValue::Integer(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| CellValue::Float(a.value(row) as f64))
            .unwrap_or(CellValue::Null),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| CellValue::Float(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| CellValue::Bool(a.value(row)))
            .unwrap_or(CellValue::Null),
        DataType::Date32 => any
            .downcast_ref::<Date32Array>()
            .and_then(|a| date_from_epoch_days(a.value(row)))
            .map(CellValue::Date)
            .unwrap_or(CellValue::Null),
        _ => {
            let formatter = arrow::util::display::ArrayFormatter::try_new(
                col.as_ref(),
                &arrow::util::display::FormatOptions::default(),
            );
            match formatter {
                Ok(f) => CellValue::Text(f.value(row).to_string()),
                Err(_) => CellValue::Text(format!("{:?}", col.data_type())),
            }
        }
    }
}

fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1970, 1, 1)?.checked_add_signed(chrono::Duration::days(days as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(suffix)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn csv_cells_are_typed() {
        let file = write_temp(
            ".csv",
            "Data_Venda,Categoria,Valor\n2023-01-01,A,10\n2023-02-01,B,12.5\n,A,\n",
        );
        let table = load_file(file.path()).unwrap();
        assert_eq!(table.len(), 3);
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["Data_Venda", "Categoria", "Valor"]);
        assert_eq!(
            table.column("Valor").unwrap().values,
            vec![CellValue::Integer(10), CellValue::Float(12.5), CellValue::Null]
        );
        assert_eq!(table.column("Data_Venda").unwrap().values[2], CellValue::Null);
    }

    #[test]
    fn csv_short_rows_are_padded() {
        let file = write_temp(".csv", "a,b\n1\n2,x\n");
        let table = load_file(file.path()).unwrap();
        assert_eq!(
            table.column("b").unwrap().values,
            vec![CellValue::Null, CellValue::Text("x".into())]
        );
    }

    #[test]
    fn json_columns_follow_first_appearance() {
        let file = write_temp(
            ".json",
            r#"[{"Categoria": "A", "Valor": 10}, {"Valor": 2.5, "Extra": true}]"#,
        );
        let table = load_file(file.path()).unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["Categoria", "Valor", "Extra"]);
        assert_eq!(table.column("Categoria").unwrap().values[1], CellValue::Null);
        assert_eq!(table.column("Extra").unwrap().values[1], CellValue::Bool(true));
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let file = write_temp(".txt", "hello");
        let err = load_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file extension"));
    }

    #[test]
    fn empty_headers_get_positional_names() {
        let table = table_from_rows(
            vec!["".into(), "b".into()],
            vec![vec![CellValue::Integer(1), CellValue::Integer(2)]],
        )
        .unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["column_1", "b"]);
    }

    fn date(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn xlsx_first_sheet_is_read() {
        use rust_xlsxwriter::{Format, Workbook};

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendas.xlsx");
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("dd/mm/yyyy");
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Data_Venda").unwrap();
        sheet.write_string(0, 1, "Categoria").unwrap();
        sheet.write_string(0, 2, "Valor").unwrap();
        // 44927 is 2023-01-01.
        sheet.write_number_with_format(1, 0, 44927.0, &date_format).unwrap();
        sheet.write_string(1, 1, "A").unwrap();
        sheet.write_number(1, 2, 10.0).unwrap();
        sheet.write_number_with_format(2, 0, 44928.0, &date_format).unwrap();
        sheet.write_number(2, 2, 12.5).unwrap();
        // Row 3 left blank.
        sheet.write_string(4, 0, "lixo").unwrap();
        sheet.write_string(4, 1, "B").unwrap();
        workbook.save(&path).unwrap();

        let table = load_file(&path).unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["Data_Venda", "Categoria", "Valor"]);
        assert_eq!(table.len(), 3);
        assert_eq!(
            table.column("Data_Venda").unwrap().values,
            vec![date(2023, 1, 1), date(2023, 1, 2), CellValue::Text("lixo".into())]
        );
        assert_eq!(
            table.column("Categoria").unwrap().values,
            vec![CellValue::Text("A".into()), CellValue::Null, CellValue::Text("B".into())]
        );
        assert_eq!(
            table.column("Valor").unwrap().values,
            vec![CellValue::Float(10.0), CellValue::Float(12.5), CellValue::Null]
        );
    }

    #[test]
    fn parquet_columns_keep_their_types() {
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vendas.parquet");
        let schema = Arc::new(Schema::new(vec![
            Field::new("Data_Venda", DataType::Date32, true),
            Field::new("Categoria", DataType::Utf8, false),
            Field::new("Quantidade", DataType::Int64, false),
            Field::new("Valor", DataType::Float64, true),
        ]));
        // 19358 days after 1970-01-01 is 2023-01-01.
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(Date32Array::from(vec![Some(19358), None])),
                Arc::new(StringArray::from(vec!["A", "B"])),
                Arc::new(Int64Array::from(vec![3, 4])),
                Arc::new(Float64Array::from(vec![Some(10.5), None])),
            ],
        )
        .unwrap();
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        let names: Vec<&str> = table.column_names().collect();
        assert_eq!(names, vec!["Data_Venda", "Categoria", "Quantidade", "Valor"]);
        assert_eq!(
            table.column("Data_Venda").unwrap().values,
            vec![date(2023, 1, 1), CellValue::Null]
        );
        assert_eq!(
            table.column("Categoria").unwrap().values,
            vec![CellValue::Text("A".into()), CellValue::Text("B".into())]
        );
        assert_eq!(
            table.column("Quantidade").unwrap().values,
            vec![CellValue::Integer(3), CellValue::Integer(4)]
        );
        assert_eq!(
            table.column("Valor").unwrap().values,
            vec![CellValue::Float(10.5), CellValue::Null]
        );
    }
}
