//! Conversion of tiberius result data into the two target representations.
//!
//! The Arrow side mirrors how the result schema is inferred from TDS column
//! metadata and how rows are fed through Arrow's own builder machinery; the
//! row side decodes each wire value into a small owned [Cell].

use std::sync::Arc;

use arrow::array::{
    make_builder, ArrayBuilder, ArrayRef, BinaryBuilder, BooleanBuilder, Date32Builder,
    Float32Builder, Float64Builder, Int16Builder, Int32Builder, Int64Builder, NullBuilder,
    StringBuilder, Time64MicrosecondBuilder, TimestampMicrosecondBuilder, UInt8Builder,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use futures::StreamExt;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tiberius::{Column, ColumnData, ColumnType, FromSql, QueryItem, QueryStream, Row};

use crate::errors::BenchError;
use crate::frame::{Cell, RowFrame};

/// Rows per record batch.
const BATCH_ROWS: usize = 1024;

/// Drain a query stream into record batches.
pub async fn collect_batches(mut stream: QueryStream<'_>) -> Result<Vec<RecordBatch>, BenchError> {
    let schema = {
        let columns = stream.columns().await?;
        schema_from_columns(columns)?
    };

    // The first stream item is the metadata that columns() peeked at.
    if let Some(item) = stream.next().await {
        item?;
    }

    let mut writer = BatchWriter::new(schema, BATCH_ROWS);
    while let Some(item) = stream.next().await {
        match item? {
            QueryItem::Row(row) => writer.append_row(row)?,
            QueryItem::Metadata(_) => return Err(BenchError::MultipleResultSets),
        }
    }
    writer.finish()
}

/// Materialize already-fetched row tuples into a labelled row frame.
pub fn rows_to_frame(rows: Vec<Row>) -> Result<RowFrame, BenchError> {
    let Some(first) = rows.first() else {
        return Ok(RowFrame::empty());
    };

    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    let mut frame = RowFrame::new(columns);
    for row in rows {
        let mut cells = Vec::with_capacity(row.len());
        for data in row {
            cells.push(cell_from_data(data)?);
        }
        frame.push_row(cells);
    }
    Ok(frame)
}

/// Infer the Arrow schema of a result set from its TDS column metadata.
/// Every field is nullable; the driver cannot know better.
pub fn schema_from_columns(columns: Option<&[Column]>) -> Result<SchemaRef, BenchError> {
    let Some(columns) = columns else {
        return Err(BenchError::NoResultSets);
    };

    let fields: Vec<Field> = columns
        .iter()
        .map(|column| Field::new(column.name(), arrow_type_of(column.column_type()), true))
        .collect();

    Ok(Arc::new(Schema::new(fields)))
}

/// The Arrow type a SQL Server column decodes into.
///
/// Variable-width integer and float columns (`intn`, `floatn`) are widened to
/// the largest member of their family, since the width of the stored value
/// can differ per row. Decimals are widened to Float64, which can lose
/// precision on extreme scales; acceptable for a throughput benchmark.
pub fn arrow_type_of(column_type: ColumnType) -> DataType {
    use ColumnType::*;

    match column_type {
        Null => DataType::Null,
        Bit | Bitn => DataType::Boolean,

        Int1 => DataType::UInt8,
        Int2 => DataType::Int16,
        Int4 => DataType::Int32,
        Int8 | Intn => DataType::Int64,

        Float4 => DataType::Float32,
        Float8 | Floatn => DataType::Float64,
        Money | Money4 => DataType::Float64,
        Decimaln | Numericn => DataType::Float64,

        Datetime | Datetime4 | Datetimen | Datetime2 | DatetimeOffsetn => {
            DataType::Timestamp(TimeUnit::Microsecond, None)
        }
        Daten => DataType::Date32,
        Timen => DataType::Time64(TimeUnit::Microsecond),

        Guid => DataType::Utf8,
        BigVarChar | BigChar | NVarchar | NChar | Text | NText | Xml => DataType::Utf8,

        BigVarBin | BigBinary | Image | Udt | SSVariant => DataType::Binary,
    }
}

/// Receives rows and feeds them into per-field [ArrayBuilder]s, flushing a
/// [RecordBatch] whenever the current one fills up.
pub struct BatchWriter {
    schema: SchemaRef,
    batch_rows: usize,
    builders: Vec<Box<dyn ArrayBuilder>>,
    rows_in_batch: usize,
    batches: Vec<RecordBatch>,
}

impl BatchWriter {
    pub fn new(schema: SchemaRef, batch_rows: usize) -> Self {
        let builders = schema
            .fields()
            .iter()
            .map(|field| make_builder(field.data_type(), batch_rows))
            .collect();

        BatchWriter {
            schema,
            batch_rows,
            builders,
            rows_in_batch: 0,
            batches: Vec::new(),
        }
    }

    pub fn append_row(
        &mut self,
        row: impl IntoIterator<Item = ColumnData<'static>>,
    ) -> Result<(), BenchError> {
        let schema = self.schema.clone();
        for ((field, data), builder) in schema
            .fields()
            .iter()
            .zip(row)
            .zip(self.builders.iter_mut())
        {
            append_value(builder.as_mut(), field.as_ref(), data)?;
        }

        self.rows_in_batch += 1;
        if self.rows_in_batch >= self.batch_rows {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), BenchError> {
        if self.rows_in_batch == 0 {
            return Ok(());
        }
        let columns: Vec<ArrayRef> = self
            .builders
            .iter_mut()
            .map(|builder| builder.finish())
            .collect();
        self.batches
            .push(RecordBatch::try_new(self.schema.clone(), columns)?);
        self.rows_in_batch = 0;
        Ok(())
    }

    pub fn finish(mut self) -> Result<Vec<RecordBatch>, BenchError> {
        self.flush()?;
        Ok(self.batches)
    }
}

/// Append one wire value to the builder of its field.
fn append_value(
    builder: &mut dyn ArrayBuilder,
    field: &Field,
    data: ColumnData<'static>,
) -> Result<(), BenchError> {
    let any = builder.as_any_mut();

    match field.data_type() {
        DataType::Null => {
            any.downcast_mut::<NullBuilder>().unwrap().append_null();
        }
        DataType::Boolean => {
            let value = match data {
                ColumnData::Bit(value) => value,
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<BooleanBuilder>().unwrap().append_option(value);
        }
        DataType::UInt8 => {
            let value = match data {
                ColumnData::U8(value) => value,
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<UInt8Builder>().unwrap().append_option(value);
        }
        DataType::Int16 => {
            let value = match data {
                ColumnData::I16(value) => value,
                ColumnData::U8(value) => value.map(i16::from),
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<Int16Builder>().unwrap().append_option(value);
        }
        DataType::Int32 => {
            let value = match data {
                ColumnData::I32(value) => value,
                ColumnData::I16(value) => value.map(i32::from),
                ColumnData::U8(value) => value.map(i32::from),
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<Int32Builder>().unwrap().append_option(value);
        }
        DataType::Int64 => {
            let value = match data {
                ColumnData::I64(value) => value,
                ColumnData::I32(value) => value.map(i64::from),
                ColumnData::I16(value) => value.map(i64::from),
                ColumnData::U8(value) => value.map(i64::from),
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<Int64Builder>().unwrap().append_option(value);
        }
        DataType::Float32 => {
            let value = match data {
                ColumnData::F32(value) => value,
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<Float32Builder>().unwrap().append_option(value);
        }
        DataType::Float64 => {
            let value = match data {
                ColumnData::F64(value) => value,
                ColumnData::F32(value) => value.map(f64::from),
                numeric @ ColumnData::Numeric(_) => {
                    Decimal::from_sql(&numeric)?.and_then(|decimal| decimal.to_f64())
                }
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<Float64Builder>().unwrap().append_option(value);
        }
        DataType::Utf8 => {
            let value: Option<String> = match data {
                ColumnData::String(value) => value.map(|text| text.into_owned()),
                ColumnData::Guid(value) => value.map(|guid| guid.to_string()),
                ColumnData::Xml(value) => value.map(|xml| xml.into_owned().into_string()),
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<StringBuilder>().unwrap().append_option(value);
        }
        DataType::Binary => {
            let value = match data {
                ColumnData::Binary(value) => value.map(|bytes| bytes.into_owned()),
                other => return Err(mismatch(field, &other)),
            };
            any.downcast_mut::<BinaryBuilder>().unwrap().append_option(value);
        }
        DataType::Date32 => {
            let value = NaiveDate::from_sql(&data)?
                .map(|date| date.signed_duration_since(unix_epoch_date()).num_days() as i32);
            any.downcast_mut::<Date32Builder>().unwrap().append_option(value);
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            let value = NaiveTime::from_sql(&data)?.map(|time| {
                i64::from(time.num_seconds_from_midnight()) * 1_000_000
                    + i64::from(time.nanosecond()) / 1_000
            });
            any.downcast_mut::<Time64MicrosecondBuilder>()
                .unwrap()
                .append_option(value);
        }
        DataType::Timestamp(TimeUnit::Microsecond, None) => {
            let value = match data {
                tz @ ColumnData::DateTimeOffset(_) => {
                    DateTime::<Utc>::from_sql(&tz)?.map(|instant| instant.timestamp_micros())
                }
                naive => NaiveDateTime::from_sql(&naive)?
                    .map(|instant| instant.and_utc().timestamp_micros()),
            };
            any.downcast_mut::<TimestampMicrosecondBuilder>()
                .unwrap()
                .append_option(value);
        }
        other => {
            return Err(BenchError::DataSchemaMismatch(format!(
                "no builder for arrow type {other}"
            )))
        }
    }
    Ok(())
}

/// Decode one wire value into an owned [Cell].
pub fn cell_from_data(data: ColumnData<'static>) -> Result<Cell, BenchError> {
    Ok(match data {
        ColumnData::Bit(value) => value.map_or(Cell::Null, Cell::Bool),
        ColumnData::U8(value) => value.map_or(Cell::Null, Cell::TinyInt),
        ColumnData::I16(value) => value.map_or(Cell::Null, Cell::SmallInt),
        ColumnData::I32(value) => value.map_or(Cell::Null, Cell::Int),
        ColumnData::I64(value) => value.map_or(Cell::Null, Cell::BigInt),
        ColumnData::F32(value) => value.map_or(Cell::Null, Cell::Real),
        ColumnData::F64(value) => value.map_or(Cell::Null, Cell::Float),
        ColumnData::String(value) => value.map_or(Cell::Null, |text| Cell::Text(text.into_owned())),
        ColumnData::Guid(value) => value.map_or(Cell::Null, Cell::Guid),
        ColumnData::Binary(value) => {
            value.map_or(Cell::Null, |bytes| Cell::Bytes(bytes.into_owned()))
        }
        ColumnData::Xml(value) => {
            value.map_or(Cell::Null, |xml| Cell::Text(xml.into_owned().into_string()))
        }
        numeric @ ColumnData::Numeric(_) => {
            Decimal::from_sql(&numeric)?.map_or(Cell::Null, Cell::Decimal)
        }
        date @ ColumnData::Date(_) => NaiveDate::from_sql(&date)?.map_or(Cell::Null, Cell::Date),
        time @ ColumnData::Time(_) => NaiveTime::from_sql(&time)?.map_or(Cell::Null, Cell::Time),
        naive @ (ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_)) => {
            NaiveDateTime::from_sql(&naive)?.map_or(Cell::Null, Cell::DateTime)
        }
        tz @ ColumnData::DateTimeOffset(_) => {
            DateTime::<Utc>::from_sql(&tz)?.map_or(Cell::Null, Cell::DateTimeTz)
        }
    })
}

fn unix_epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()
}

fn data_kind(data: &ColumnData<'_>) -> &'static str {
    match data {
        ColumnData::U8(_) => "tinyint",
        ColumnData::I16(_) => "smallint",
        ColumnData::I32(_) => "int",
        ColumnData::I64(_) => "bigint",
        ColumnData::F32(_) => "real",
        ColumnData::F64(_) => "float",
        ColumnData::Bit(_) => "bit",
        ColumnData::String(_) => "string",
        ColumnData::Guid(_) => "guid",
        ColumnData::Binary(_) => "binary",
        ColumnData::Numeric(_) => "numeric",
        ColumnData::Xml(_) => "xml",
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            "datetime"
        }
        ColumnData::Date(_) => "date",
        ColumnData::Time(_) => "time",
        ColumnData::DateTimeOffset(_) => "datetimeoffset",
    }
}

fn mismatch(field: &Field, data: &ColumnData<'_>) -> BenchError {
    BenchError::DataSchemaMismatch(format!(
        "column {} ({}) cannot accept a {} value",
        field.name(),
        field.data_type(),
        data_kind(data)
    ))
}
