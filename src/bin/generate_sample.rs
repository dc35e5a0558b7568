//! Writes a sample sales workbook (`sample_sales.xlsx`) and the same rows as
//! Parquet (`sample_sales.parquet`) for trying out the dashboard.

use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use parquet::arrow::ArrowWriter;
use rust_xlsxwriter::{Format, Workbook};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

struct Sale {
    date: NaiveDate,
    category: &'static str,
    region: &'static str,
    quantity: i64,
    value: f64,
}

const CATEGORIES: [(&str, f64); 4] = [
    ("Eletrônicos", 850.0),
    ("Vestuário", 120.0),
    ("Alimentos", 45.0),
    ("Livros", 60.0),
];
const REGIONS: [&str; 4] = ["Norte", "Sul", "Leste", "Oeste"];

fn generate_sales(rng: &mut SimpleRng, start: NaiveDate, days: i64, rows: usize) -> Vec<Sale> {
    (0..rows)
        .map(|i| {
            let (category, base) = CATEGORIES[rng.below(CATEGORIES.len())];
            let quantity = 1 + rng.below(10) as i64;
            let mut value = (base * quantity as f64 * rng.gauss(1.0, 0.15)).max(1.0);
            // A handful of unusually large orders.
            if i % 47 == 13 {
                value *= 12.0;
            }
            Sale {
                date: start + Duration::days(rng.below(days as usize) as i64),
                category,
                region: REGIONS[rng.below(REGIONS.len())],
                quantity,
                value: (value * 100.0).round() / 100.0,
            }
        })
        .collect()
}

/// Spreadsheet serial day (1900 date system).
fn serial_day(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default();
    (date - epoch).num_days() as f64
}

fn write_xlsx(sales: &[Sale], path: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let date_format = Format::new().set_num_format("dd/mm/yyyy");
    let money = Format::new().set_num_format("#,##0.00");

    let sheet = workbook.add_worksheet();
    for (col, name) in ["Data_Venda", "Categoria", "Regiao", "Quantidade", "Valor"]
        .iter()
        .enumerate()
    {
        sheet.write_string_with_format(0, col as u16, *name, &header)?;
    }
    for (i, sale) in sales.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_number_with_format(row, 0, serial_day(sale.date), &date_format)?;
        sheet.write_string(row, 1, sale.category)?;
        sheet.write_string(row, 2, sale.region)?;
        sheet.write_number(row, 3, sale.quantity as f64)?;
        sheet.write_number_with_format(row, 4, sale.value, &money)?;
    }
    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(1, 14)?;

    workbook.save(path).with_context(|| format!("writing {path}"))?;
    Ok(())
}

fn write_parquet(sales: &[Sale], path: &str) -> Result<()> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).context("epoch date")?;
    let dates = Date32Array::from(
        sales
            .iter()
            .map(|s| (s.date - epoch).num_days() as i32)
            .collect::<Vec<_>>(),
    );
    let categories = StringArray::from(sales.iter().map(|s| s.category).collect::<Vec<_>>());
    let regions = StringArray::from(sales.iter().map(|s| s.region).collect::<Vec<_>>());
    let quantities = Int64Array::from(sales.iter().map(|s| s.quantity).collect::<Vec<_>>());
    let values = Float64Array::from(sales.iter().map(|s| s.value).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("Data_Venda", DataType::Date32, false),
        Field::new("Categoria", DataType::Utf8, false),
        Field::new("Regiao", DataType::Utf8, false),
        Field::new("Quantidade", DataType::Int64, false),
        Field::new("Valor", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(dates),
            Arc::new(categories),
            Arc::new(regions),
            Arc::new(quantities),
            Arc::new(values),
        ],
    )
    .context("Failed to create RecordBatch")?;

    let file = std::fs::File::create(path).context("Failed to create output file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("Failed to create writer")?;
    writer.write(&batch).context("Failed to write batch")?;
    writer.close().context("Failed to close writer")?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).context("start date")?;
    let sales = generate_sales(&mut rng, start, 365, 240);

    write_xlsx(&sales, "sample_sales.xlsx")?;
    write_parquet(&sales, "sample_sales.parquet")?;

    println!(
        "Wrote {} sales to sample_sales.xlsx and sample_sales.parquet",
        sales.len()
    );
    Ok(())
}
