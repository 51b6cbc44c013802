pub mod auth;
pub mod credential_store;
pub mod http_client;
pub mod raw_sheet;
pub mod spreadsheet_manager;
pub mod spreadsheet_read;

pub use credential_store::{Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use raw_sheet::RawSheet;
pub use spreadsheet_manager::SpreadsheetManager;
pub use spreadsheet_read::{SheetFetchError, SpreadsheetRead};
