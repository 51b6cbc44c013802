//! # Pipeline Integration Tests

mod common;

use common::{config, raw_sheet, MockObjectStore, MockSheets, StoreCall};
use gsheet_to_s3::sheets::SheetFetchError;
use gsheet_to_s3::storage::{BucketStatus, StorageError};
use gsheet_to_s3::table::{parquet_codec, ShortRowPolicy};
use gsheet_to_s3::{run, PipelineError, PipelineOutcome};

#[tokio::test]
async fn test_sheet_is_uploaded_as_parquet() {
    let sheets = MockSheets::returning(raw_sheet(&[
        &["date", "amount"],
        &["2024-01-01", "10"],
        &["2024-01-02", "12", "ignored"],
    ]));
    let store = MockObjectStore::with_existing_bucket();

    let outcome = run(&config(), &sheets, &store).await.unwrap();

    let PipelineOutcome::Uploaded(summary) = outcome else {
        panic!("expected an upload");
    };
    assert_eq!(summary.url, "s3://exports/daily/data.parquet");
    assert_eq!(summary.bucket, BucketStatus::Existed);
    assert_eq!((summary.rows, summary.columns), (2, 2));

    assert_eq!(
        sheets.get_calls(),
        vec![("sheet-123".to_string(), "Data!A1:Z".to_string())]
    );

    let objects = store.objects();
    assert_eq!(objects.len(), 1);
    let table = parquet_codec::decode(objects[0].1.clone()).unwrap();
    assert_eq!(
        table.column_names().collect::<Vec<_>>(),
        vec!["date", "amount"]
    );
    assert_eq!(table.row(1).unwrap(), vec![Some("2024-01-02"), Some("12")]);
}

#[tokio::test]
async fn test_missing_bucket_is_created_once_before_upload() {
    let sheets = MockSheets::returning(raw_sheet(&[&["a", "b"], &["1", "2"]]));
    let store = MockObjectStore::with_missing_bucket();

    let outcome = run(&config(), &sheets, &store).await.unwrap();

    assert!(matches!(
        outcome,
        PipelineOutcome::Uploaded(ref s) if s.bucket == BucketStatus::Created
    ));
    assert_eq!(
        store.get_calls(),
        vec![
            StoreCall::HeadBucket("exports".to_string()),
            StoreCall::CreateBucket {
                bucket: "exports".to_string(),
                region: "eu-west-1".to_string(),
            },
            StoreCall::PutObject {
                url: "s3://exports/daily/data.parquet".to_string(),
                content_type: parquet_codec::CONTENT_TYPE.to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn test_header_only_sheet_never_writes() {
    let sheets = MockSheets::returning(raw_sheet(&[&["a", "b"]]));
    let store = MockObjectStore::with_missing_bucket();

    let outcome = run(&config(), &sheets, &store).await.unwrap();

    assert_eq!(outcome, PipelineOutcome::NoData);
    assert!(store.get_calls().is_empty());
}

#[tokio::test]
async fn test_empty_range_is_a_table_error() {
    let sheets = MockSheets::returning(raw_sheet(&[]));
    let store = MockObjectStore::with_existing_bucket();

    let report = run(&config(), &sheets, &store).await.unwrap_err();

    assert_eq!(*report.current_context(), PipelineError::Table);
    assert!(store.get_calls().is_empty());
}

#[tokio::test]
async fn test_blank_header_row_fails_before_any_bucket_change() {
    let sheets = MockSheets::returning(raw_sheet(&[&[], &["1", "2"], &["3", "4"]]));
    let store = MockObjectStore::with_missing_bucket();

    let report = run(&config(), &sheets, &store).await.unwrap_err();

    assert_eq!(*report.current_context(), PipelineError::Table);
    assert!(store.get_calls().is_empty());
}

#[tokio::test]
async fn test_permission_denied_is_not_treated_as_missing_bucket() {
    let sheets = MockSheets::returning(raw_sheet(&[&["a"], &["1"]]));
    let store = MockObjectStore::with_head_error(StorageError::PermissionDenied);

    let report = run(&config(), &sheets, &store).await.unwrap_err();

    assert_eq!(*report.current_context(), PipelineError::Write);
    assert_eq!(
        store.get_calls(),
        vec![StoreCall::HeadBucket("exports".to_string())]
    );
}

#[tokio::test]
async fn test_short_rows_rejected_when_configured() {
    let sheets = MockSheets::returning(raw_sheet(&[&["a", "b"], &["1"]]));
    let store = MockObjectStore::with_existing_bucket();
    let mut config = config();
    config.short_rows = ShortRowPolicy::Reject;

    let report = run(&config, &sheets, &store).await.unwrap_err();

    assert_eq!(*report.current_context(), PipelineError::Table);
    assert!(store.objects().is_empty());
}

#[tokio::test]
async fn test_transient_fetch_failure_is_retried() {
    let sheets = MockSheets::default();
    sheets.push(Err(SheetFetchError::Transport));
    sheets.push(Ok(raw_sheet(&[&["a"], &["1"]])));
    let store = MockObjectStore::with_existing_bucket();

    let outcome = run(&config(), &sheets, &store).await.unwrap();

    assert!(matches!(outcome, PipelineOutcome::Uploaded(_)));
    assert_eq!(sheets.get_calls().len(), 2);
}

#[tokio::test]
async fn test_rejected_fetch_is_not_retried() {
    let sheets = MockSheets::default();
    sheets.push(Err(SheetFetchError::Rejected));
    let store = MockObjectStore::with_existing_bucket();

    let report = run(&config(), &sheets, &store).await.unwrap_err();

    assert_eq!(*report.current_context(), PipelineError::Fetch);
    assert_eq!(sheets.get_calls().len(), 1);
    assert!(store.get_calls().is_empty());
}

#[tokio::test]
async fn test_transient_upload_failure_is_retried_then_overwrites() {
    let sheets = MockSheets::returning(raw_sheet(&[&["a"], &["1"]]));
    let store = MockObjectStore::with_existing_bucket();
    store.fail_puts(&[StorageError::Transient]);

    run(&config(), &sheets, &store).await.unwrap();

    let puts = store
        .get_calls()
        .into_iter()
        .filter(|c| matches!(c, StoreCall::PutObject { .. }))
        .count();
    assert_eq!(puts, 2);
    assert_eq!(store.objects().len(), 1);
}

#[tokio::test]
async fn test_upload_gives_up_after_max_attempts() {
    let sheets = MockSheets::returning(raw_sheet(&[&["a"], &["1"]]));
    let store = MockObjectStore::with_existing_bucket();
    store.fail_puts(&[StorageError::Transient; 5]);

    let report = run(&config(), &sheets, &store).await.unwrap_err();

    assert_eq!(*report.current_context(), PipelineError::Write);
    assert_eq!(store.get_calls().len(), 1 + 3);
}
