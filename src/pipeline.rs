use error_stack::ResultExt;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::AppConfig;
use crate::sheets::{SheetFetchError, SpreadsheetRead};
use crate::storage::{ObjectStore, TableWriter, UploadSummary};
use crate::table::build_table;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Failed to fetch the spreadsheet range")]
    Fetch,
    #[error("Sheet does not have a usable table shape")]
    Table,
    #[error("Failed to write the table to the object store")]
    Write,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// The range had a header but no data rows; nothing was written.
    NoData,
    Uploaded(UploadSummary),
}

/// One run of the job: fetch the range, build the table, upload it.
#[instrument(skip_all, fields(spreadsheet_id = %config.spreadsheet_id, range = %config.range_id))]
pub async fn run(
    config: &AppConfig,
    sheets: &dyn SpreadsheetRead,
    store: &dyn ObjectStore,
) -> error_stack::Result<PipelineOutcome, PipelineError> {
    info!("Getting google sheet...");
    let sheet = config
        .retry
        .run("read_range", SheetFetchError::is_transient, || {
            sheets.read_range(&config.spreadsheet_id, &config.range_id)
        })
        .await
        .change_context(PipelineError::Fetch)?;

    info!("Creating table");
    let Some(table) = build_table(&sheet, config.short_rows).change_context(PipelineError::Table)?
    else {
        warn!("No data found, skipping upload");
        return Ok(PipelineOutcome::NoData);
    };
    info!(shape = ?table.shape(), "Table size");

    let destination = config.destination();
    info!("Writing to {destination}");
    let summary = TableWriter::new(store, &destination, config.retry.clone())
        .write(&table)
        .await
        .change_context(PipelineError::Write)?;

    Ok(PipelineOutcome::Uploaded(summary))
}
