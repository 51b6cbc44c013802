//! Copies a Google Sheets range into S3 as a Parquet file.
//!
//! The job reads one range with the Sheets API, uses its first row as column
//! names, and uploads the resulting table to `s3://<bucket>/<object>`, creating
//! the bucket if it does not exist. See [`pipeline::run`].

pub mod config;
pub mod pipeline;
pub mod prettyprint;
pub mod retry;
pub mod sheets;
pub mod storage;
pub mod table;

pub use config::AppConfig;
pub use pipeline::{run, PipelineError, PipelineOutcome};
