use async_trait::async_trait;
use thiserror::Error;

use super::raw_sheet::RawSheet;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFetchError {
    #[error("Failed to authenticate with the Sheets API")]
    Auth,
    #[error("Transient failure talking to the Sheets API")]
    Transport,
    #[error("Sheets API rejected the request")]
    Rejected,
}

impl SheetFetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SheetFetchError::Transport)
    }
}

/// Reads a rectangular range of cell values.
#[async_trait]
pub trait SpreadsheetRead: Send + Sync {
    /// `range` is in A1 notation, e.g. `Sheet1!A1:Z`.
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> error_stack::Result<RawSheet, SheetFetchError>;
}
