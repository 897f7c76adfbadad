//! The two in-memory representations a benchmark case can materialize into.

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A materialized query result, in whichever representation the access
/// method produced.
pub enum TabularFrame {
    /// Columnar-native: Apache Arrow record batches.
    Columnar(Vec<RecordBatch>),
    /// Row-oriented: named columns over rows of decoded SQL values.
    Rows(RowFrame),
}

impl TabularFrame {
    pub fn row_count(&self) -> u64 {
        match self {
            TabularFrame::Columnar(batches) => {
                batches.iter().map(|batch| batch.num_rows() as u64).sum()
            }
            TabularFrame::Rows(frame) => frame.rows.len() as u64,
        }
    }

    pub fn column_count(&self) -> usize {
        match self {
            TabularFrame::Columnar(batches) => {
                batches.first().map_or(0, |batch| batch.num_columns())
            }
            TabularFrame::Rows(frame) => frame.columns.len(),
        }
    }
}

/// A labelled row-major frame.
pub struct RowFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RowFrame {
    pub fn new(columns: Vec<String>) -> Self {
        RowFrame { columns, rows: Vec::new() }
    }

    pub fn empty() -> Self {
        RowFrame::new(Vec::new())
    }

    /// Panics if the row width does not match the column labels.
    pub fn push_row(&mut self, row: Vec<Cell>) {
        assert_eq!(row.len(), self.columns.len(), "row width mismatch");
        self.rows.push(row);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }
}

/// One decoded SQL value. NULL of any type collapses into [Cell::Null].
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    TinyInt(u8),
    SmallInt(i16),
    Int(i32),
    BigInt(i64),
    Real(f32),
    Float(f64),
    Decimal(Decimal),
    Text(String),
    Bytes(Vec<u8>),
    Guid(Uuid),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    DateTimeTz(DateTime<Utc>),
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }
}
