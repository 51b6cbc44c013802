pub mod parquet_codec;

use std::collections::HashSet;

use error_stack::report;
use serde::Deserialize;
use strum::{Display, EnumString};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::sheets::raw_sheet::RawSheet;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TableError {
    #[error("Sheet has no header row")]
    MissingHeader,
    #[error("Header row is blank")]
    EmptyHeader,
    #[error("Duplicate column name `{0}` in header")]
    DuplicateColumn(String),
    #[error("Row {row} has {len} cells, header has {expected}")]
    ShortRow {
        row: usize,
        len: usize,
        expected: usize,
    },
}

/// What to do with data rows that have fewer cells than the header.
///
/// The Sheets API trims trailing empty cells, so short rows are common.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ShortRowPolicy {
    /// Fill the missing trailing cells with nulls.
    #[default]
    Pad,
    /// Fail the whole table.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<String>>,
}

/// Column-major table. All columns have the same length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Builds a table from already-aligned columns.
    pub(crate) fn from_columns(columns: Vec<Column>) -> Self {
        if let Some(first) = columns.first() {
            debug_assert!(
                columns.iter().all(|c| c.values.len() == first.values.len()),
                "columns must have the same length"
            );
        }
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        (self.num_rows(), self.num_columns())
    }

    pub fn row(&self, index: usize) -> Option<Vec<Option<&str>>> {
        if index >= self.num_rows() {
            return None;
        }
        Some(
            self.columns
                .iter()
                .map(|c| c.values[index].as_deref())
                .collect(),
        )
    }
}

/// Turns a fetched sheet into a table keyed by its first row.
///
/// Returns `Ok(None)` when the sheet has a header but no data rows.
#[instrument(skip(sheet), fields(rows = sheet.rows().len()))]
pub fn build_table(
    sheet: &RawSheet,
    policy: ShortRowPolicy,
) -> error_stack::Result<Option<Table>, TableError> {
    let (header, data) = sheet
        .rows()
        .split_first()
        .ok_or(report!(TableError::MissingHeader))?;

    // a blank first row comes back as []
    if header.iter().all(String::is_empty) {
        return Err(report!(TableError::EmptyHeader)
            .attach_printable("the range must start at the header row"));
    }

    let mut seen = HashSet::with_capacity(header.len());
    for name in header {
        if !seen.insert(name.as_str()) {
            return Err(report!(TableError::DuplicateColumn(name.clone())));
        }
    }

    if data.is_empty() {
        warn!("No data found below the header row");
        return Ok(None);
    }

    let width = header.len();
    let mut columns: Vec<Column> = header
        .iter()
        .map(|name| Column {
            name: name.clone(),
            values: Vec::with_capacity(data.len()),
        })
        .collect();

    for (index, row) in data.iter().enumerate() {
        if row.len() < width && policy == ShortRowPolicy::Reject {
            return Err(report!(TableError::ShortRow {
                // header is sheet row 1
                row: index + 2,
                len: row.len(),
                expected: width,
            }));
        }
        for (i, column) in columns.iter_mut().enumerate() {
            column.values.push(row.get(i).cloned());
        }
    }

    Ok(Some(Table { columns }))
}
