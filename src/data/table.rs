use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, BooleanArray, Float32Array, Float64Array, Int32Array, Int64Array,
    StringArray, UInt32Array, UInt64Array,
};
use arrow::datatypes::DataType;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

// ---------------------------------------------------------------------------
// Cell – a single value of a tabular input
// ---------------------------------------------------------------------------

/// A dynamically-typed cell.  CSV cells always arrive as `Text`; Parquet
/// cells keep their physical type.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Null => write!(f, "<null>"),
        }
    }
}

impl Cell {
    /// Numeric view of the cell.  Empty and null cells read as NaN, the way a
    /// dataframe library reads missing values.  `None` means "not a number".
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Float(v) => Some(*v),
            Cell::Integer(i) => Some(*i as f64),
            Cell::Null => Some(f64::NAN),
            Cell::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Some(f64::NAN);
                }
                s.parse::<f64>().ok()
            }
            Cell::Bool(_) => None,
        }
    }

    /// Non-negative integer view; accepts integral floats such as `3.0`.
    pub fn as_count(&self) -> Option<u64> {
        match self {
            Cell::Integer(i) => u64::try_from(*i).ok(),
            Cell::Text(s) => {
                let s = s.trim();
                if let Ok(n) = s.parse::<u64>() {
                    return Some(n);
                }
                s.parse::<f64>().ok().and_then(float_to_count)
            }
            Cell::Float(v) => float_to_count(*v),
            Cell::Null | Cell::Bool(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Integer(i) => Some(i.to_string()),
            Cell::Float(v) => Some(v.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Null => None,
        }
    }
}

fn float_to_count(v: f64) -> Option<u64> {
    if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 {
        Some(v as u64)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Table – header plus rows, independent of the file format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Index of a required column.  A missing column is a schema violation.
    pub fn require(&self, name: &str, table: &str) -> Result<usize> {
        match self.columns.iter().position(|c| c == name) {
            Some(idx) => Ok(idx),
            None => bail!("{table} missing required column '{name}'"),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, comma separated
/// * `.parquet` – flat columns (strings, ints, floats, bools)
pub fn read_table(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => read_parquet(path),
        "csv" => read_csv(path),
        other => bail!("Unsupported table extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV reader
// ---------------------------------------------------------------------------

pub fn read_csv(path: &Path) -> Result<Table> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("opening CSV {}", path.display()))?;
    let columns: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        let row = (0..columns.len())
            .map(|i| Cell::Text(record.get(i).unwrap_or("").to_string()))
            .collect();
        rows.push(row);
    }

    Ok(Table { columns, rows })
}

// ---------------------------------------------------------------------------
// Parquet reader
// ---------------------------------------------------------------------------

/// Load a flat Parquet table as written by Pandas (`df.to_parquet()`) or
/// Polars (`df.write_parquet()`).
pub fn read_parquet(path: &Path) -> Result<Table> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening parquet file {}", path.display()))?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let columns: Vec<String> = builder
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
            let cells = (0..batch.num_columns())
                .map(|c| extract_cell(batch.column(c), row))
                .collect();
            rows.push(cells);
        }
    }

    Ok(Table { columns, rows })
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Cell {
    if col.is_null(row) {
        return Cell::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|a| Cell::Text(a.value(row).to_string()))
            .unwrap_or(Cell::Null),
        DataType::LargeUtf8 => Cell::Text(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| Cell::Integer(a.value(row) as i64))
            .unwrap_or(Cell::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| Cell::Integer(a.value(row)))
            .unwrap_or(Cell::Null),
        DataType::UInt32 => any
            .downcast_ref::<UInt32Array>()
            .map(|a| Cell::Integer(a.value(row) as i64))
            .unwrap_or(Cell::Null),
        DataType::UInt64 => any
            .downcast_ref::<UInt64Array>()
            .and_then(|a| i64::try_from(a.value(row)).ok())
            .map(Cell::Integer)
            .unwrap_or(Cell::Null),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| Cell::Float(a.value(row) as f64))
            .unwrap_or(Cell::Null),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| Cell::Float(a.value(row)))
            .unwrap_or(Cell::Null),
        DataType::Boolean => any
            .downcast_ref::<BooleanArray>()
            .map(|a| Cell::Bool(a.value(row)))
            .unwrap_or(Cell::Null),
        other => Cell::Text(format!("{other:?}")),
    }
}
