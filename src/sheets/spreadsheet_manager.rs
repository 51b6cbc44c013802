use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use error_stack::{report, ResultExt};
use google_sheets4::Sheets;
use tracing::{info, instrument};

use super::{
    auth::{self, LogFlowDelegate, SPREADSHEETS_READONLY},
    credential_store::CredentialStore,
    http_client::{self, HttpsConnector},
    raw_sheet::RawSheet,
    spreadsheet_read::{SheetFetchError, SpreadsheetRead},
};

pub struct SpreadsheetManager {
    hub: Sheets<HttpsConnector>,
}

impl Debug for SpreadsheetManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SpreadsheetManager")
    }
}

impl SpreadsheetManager {
    #[instrument(name = "SpreadsheetManager::new", skip(store))]
    pub async fn new(
        client_secret_path: &Path,
        store: Arc<dyn CredentialStore>,
    ) -> error_stack::Result<Self, SheetFetchError> {
        let client = http_client::http_client()
            .change_context(SheetFetchError::Transport)
            .attach_printable("Could not load the native TLS root certificates")?;
        let secret = auth::read_client_secret(client_secret_path)
            .await
            .change_context(SheetFetchError::Auth)?;
        let auth = auth::auth(secret, store, client.clone(), Box::new(LogFlowDelegate))
            .await
            .change_context(SheetFetchError::Auth)?;

        Ok(SpreadsheetManager {
            hub: Sheets::new(client, auth),
        })
    }
}

fn is_retryable_status(code: u16) -> bool {
    code == 429 || (500..600).contains(&code)
}

/// Sorts an API client error into the fetch error kinds.
pub(crate) fn classify(error: &google_sheets4::Error) -> SheetFetchError {
    use google_sheets4::Error;

    match error {
        Error::HttpError(_) | Error::Io(_) => SheetFetchError::Transport,
        Error::Failure(response) if is_retryable_status(response.status().as_u16()) => {
            SheetFetchError::Transport
        }
        Error::BadRequest(body) => {
            let code = body["error"]["code"].as_u64().unwrap_or_default();
            if u16::try_from(code).map_or(false, is_retryable_status) {
                SheetFetchError::Transport
            } else {
                SheetFetchError::Rejected
            }
        }
        Error::MissingToken(_) => SheetFetchError::Auth,
        _ => SheetFetchError::Rejected,
    }
}

#[async_trait]
impl SpreadsheetRead for SpreadsheetManager {
    #[instrument(skip(self))]
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> error_stack::Result<RawSheet, SheetFetchError> {
        let (response, value_range) = self
            .hub
            .spreadsheets()
            .values_get(spreadsheet_id, range)
            .add_scope(SPREADSHEETS_READONLY)
            .doit()
            .await
            .map_err(|e| {
                let kind = classify(&e);
                report!(e).change_context(kind)
            })
            .attach_printable_lazy(|| format!("Failed to fetch values for range {range}"))?;

        let sheet = RawSheet::from(value_range);
        info!(status = %response.status(), rows = sheet.rows().len(), "Fetched range");
        Ok(sheet)
    }
}
