//! Parquet encoding/decoding for [`Table`].
//!
//! Every column is written as a nullable UTF-8 column, in header order. Sheet
//! cells are text, so no type inference is attempted.

use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use error_stack::{report, ResultExt};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use thiserror::Error;
use tracing::instrument;

use super::{Column, Table};

pub const CONTENT_TYPE: &str = "application/vnd.apache.parquet";

#[derive(Error, Debug)]
pub enum ParquetError {
    #[error("Failed to build record batch")]
    Batch,
    #[error("Failed to write parquet")]
    Write,
    #[error("Failed to read parquet")]
    Read,
    #[error("Column `{0}` is not a string column")]
    UnexpectedType(String),
}

fn schema(table: &Table) -> Arc<Schema> {
    Arc::new(Schema::new(
        table
            .column_names()
            .map(|name| Field::new(name, DataType::Utf8, true))
            .collect::<Vec<_>>(),
    ))
}

fn writer_properties() -> WriterProperties {
    let created_by = KeyValue {
        key: "created_by".to_string(),
        value: Some(concat!("gsheet-to-s3 ", env!("CARGO_PKG_VERSION")).to_string()),
    };
    WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_key_value_metadata(Some(vec![created_by]))
        .build()
}

/// Serializes the table into an in-memory parquet file.
#[instrument(skip(table), fields(shape = ?table.shape()))]
pub fn encode(table: &Table) -> error_stack::Result<Bytes, ParquetError> {
    let schema = schema(table);
    let arrays: Vec<ArrayRef> = table
        .columns()
        .iter()
        .map(|c| Arc::new(StringArray::from(c.values.clone())) as ArrayRef)
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).change_context(ParquetError::Batch)?;

    let mut cursor = Cursor::new(Vec::<u8>::new());
    let mut writer = ArrowWriter::try_new(&mut cursor, schema, Some(writer_properties()))
        .change_context(ParquetError::Write)
        .attach_printable("parquet writer init failed")?;
    writer
        .write(&batch)
        .change_context(ParquetError::Write)?;
    writer
        .close()
        .change_context(ParquetError::Write)
        .attach_printable("parquet close failed")?;

    Ok(Bytes::from(cursor.into_inner()))
}

/// Reads back a file produced by [`encode`].
pub fn decode(bytes: Bytes) -> error_stack::Result<Table, ParquetError> {
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(bytes).change_context(ParquetError::Read)?;
    let schema = builder.schema().clone();
    let reader = builder.build().change_context(ParquetError::Read)?;

    let mut columns: Vec<Column> = schema
        .fields()
        .iter()
        .map(|f| Column {
            name: f.name().clone(),
            values: Vec::new(),
        })
        .collect();

    for batch in reader {
        let batch = batch.change_context(ParquetError::Read)?;
        for (index, column) in columns.iter_mut().enumerate() {
            let array = batch
                .column(index)
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| report!(ParquetError::UnexpectedType(column.name.clone())))?;
            column.values.extend(
                (0..array.len()).map(|i| (!array.is_null(i)).then(|| array.value(i).to_string())),
            );
        }
    }

    Ok(Table::from_columns(columns))
}
