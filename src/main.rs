use std::process::ExitCode;
use std::sync::Arc;

use error_stack::ResultExt;
use gsheet_to_s3::prettyprint::prettyprint::PrettyFormatter;
use gsheet_to_s3::sheets::{FileCredentialStore, SpreadsheetManager};
use gsheet_to_s3::storage::S3ObjectStore;
use gsheet_to_s3::{AppConfig, PipelineOutcome};
use thiserror::Error;
use tracing::{error, info, instrument, Level};
use tracing_subscriber::{filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, Registry};

#[derive(Error, Debug)]
enum MainError {
    #[error("Could not load configuration")]
    Config,
    #[error("Could not set up the Sheets client")]
    Sheets,
    #[error("Export failed")]
    Pipeline,
}

fn setup_tracing() {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(PrettyFormatter::new(true))
        .with_writer(std::io::stderr);

    Registry::default()
        .with(
            Targets::new()
                .with_target("gsheet_to_s3", level)
                .with_default(Level::WARN),
        )
        .with(stderr_layer)
        .init();
}

#[instrument]
async fn run() -> error_stack::Result<PipelineOutcome, MainError> {
    let config_path = AppConfig::path_from_env();
    info!("Loading config from {}", config_path.display());
    let config = AppConfig::load(&config_path).change_context(MainError::Config)?;

    let credentials = Arc::new(FileCredentialStore::new(config.token_path.clone()));
    let sheets = SpreadsheetManager::new(&config.client_secret_path, credentials)
        .await
        .change_context(MainError::Sheets)?;
    let store = S3ObjectStore::from_env(&config.bucket_region).await;

    gsheet_to_s3::run(&config, &sheets, &store)
        .await
        .change_context(MainError::Pipeline)
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_tracing();

    match run().await {
        Ok(PipelineOutcome::Uploaded(summary)) => {
            info!("✅ Uploaded {} ({} rows)", summary.url, summary.rows);
            ExitCode::SUCCESS
        }
        Ok(PipelineOutcome::NoData) => {
            info!("Nothing to upload");
            ExitCode::SUCCESS
        }
        Err(report) => {
            error!("❌ {:?}", report);
            ExitCode::FAILURE
        }
    }
}
