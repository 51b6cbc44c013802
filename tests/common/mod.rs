#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use error_stack::report;
use gsheet_to_s3::sheets::{RawSheet, SheetFetchError, SpreadsheetRead};
use gsheet_to_s3::storage::{ObjectStore, StorageError};
use gsheet_to_s3::AppConfig;

pub fn config() -> AppConfig {
    AppConfig::from_json_str(
        r#"{
            "spreadsheet_id": "sheet-123",
            "range_id": "Data!A1:Z",
            "data_bucket_name": "exports",
            "data_object_name": "daily/data.parquet",
            "retry": { "max_attempts": 3, "initial_delay_ms": 1, "max_delay_ms": 2 }
        }"#,
    )
    .unwrap()
}

pub fn raw_sheet(rows: &[&[&str]]) -> RawSheet {
    RawSheet::new(
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
}

// --- Mock Sheets API ---

#[derive(Clone, Default)]
pub struct MockSheets {
    responses: Arc<Mutex<VecDeque<Result<RawSheet, SheetFetchError>>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockSheets {
    pub fn returning(sheet: RawSheet) -> Self {
        let mock = Self::default();
        mock.push(Ok(sheet));
        mock
    }

    /// Responses are served in order; the last one repeats.
    pub fn push(&self, response: Result<RawSheet, SheetFetchError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn get_calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpreadsheetRead for MockSheets {
    async fn read_range(
        &self,
        spreadsheet_id: &str,
        range: &str,
    ) -> error_stack::Result<RawSheet, SheetFetchError> {
        self.calls
            .lock()
            .unwrap()
            .push((spreadsheet_id.to_string(), range.to_string()));

        let mut responses = self.responses.lock().unwrap();
        let response = if responses.len() > 1 {
            responses.pop_front().unwrap()
        } else {
            responses.front().cloned().expect("MockSheets: no response programmed")
        };
        response.map_err(|e| report!(e))
    }
}

// --- Mock object store ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    HeadBucket(String),
    CreateBucket { bucket: String, region: String },
    PutObject { url: String, content_type: String },
}

#[derive(Clone, Default)]
pub struct MockObjectStore {
    pub head_error: Option<StorageError>,
    pub create_error: Option<StorageError>,
    /// Errors returned by successive `put_object` calls before it succeeds.
    pub put_errors: Arc<Mutex<VecDeque<StorageError>>>,
    pub calls: Arc<Mutex<Vec<StoreCall>>>,
    pub objects: Arc<Mutex<Vec<(String, Bytes)>>>,
}

impl MockObjectStore {
    pub fn with_existing_bucket() -> Self {
        Self::default()
    }

    pub fn with_missing_bucket() -> Self {
        Self {
            head_error: Some(StorageError::NotFound),
            ..Self::default()
        }
    }

    pub fn with_head_error(error: StorageError) -> Self {
        Self {
            head_error: Some(error),
            ..Self::default()
        }
    }

    pub fn fail_puts(&self, errors: &[StorageError]) {
        self.put_errors.lock().unwrap().extend(errors.iter().copied());
    }

    pub fn get_calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn objects(&self) -> Vec<(String, Bytes)> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MockObjectStore {
    async fn head_bucket(&self, bucket: &str) -> error_stack::Result<(), StorageError> {
        self.calls
            .lock()
            .unwrap()
            .push(StoreCall::HeadBucket(bucket.to_string()));
        match self.head_error {
            Some(e) => Err(report!(e)),
            None => Ok(()),
        }
    }

    async fn create_bucket(
        &self,
        bucket: &str,
        region: &str,
    ) -> error_stack::Result<(), StorageError> {
        self.calls.lock().unwrap().push(StoreCall::CreateBucket {
            bucket: bucket.to_string(),
            region: region.to_string(),
        });
        match self.create_error {
            Some(e) => Err(report!(e)),
            None => Ok(()),
        }
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> error_stack::Result<(), StorageError> {
        let url = format!("s3://{bucket}/{key}");
        self.calls.lock().unwrap().push(StoreCall::PutObject {
            url: url.clone(),
            content_type: content_type.to_string(),
        });
        if let Some(e) = self.put_errors.lock().unwrap().pop_front() {
            return Err(report!(e));
        }
        self.objects.lock().unwrap().push((url, body));
        Ok(())
    }
}
