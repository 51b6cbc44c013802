use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use error_stack::{report, ResultExt};
use serde::Deserialize;
use serde_path_to_error::{Deserializer as PathDeserializer, Segment, Track};
use thiserror::Error;
use tracing::instrument;

use crate::retry::RetryPolicy;
use crate::storage::Destination;
use crate::table::ShortRowPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "creds/config.json";
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";
const ENV_PREFIX: &str = "GSHEET_TO_S3";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file")]
    Read,
    #[error("Invalid config field `{0}`")]
    InvalidField(String),
}

/// Everything one run of the job needs, read once from a JSON file.
#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    pub spreadsheet_id: Box<str>,
    pub range_id: Box<str>,
    pub data_bucket_name: Box<str>,
    pub data_object_name: Box<str>,
    #[serde(default = "default_token_path")]
    pub token_path: PathBuf,
    #[serde(default = "default_client_secret_path")]
    pub client_secret_path: PathBuf,
    #[serde(default = "default_bucket_region")]
    pub bucket_region: Box<str>,
    #[serde(default)]
    pub short_rows: ShortRowPolicy,
    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_token_path() -> PathBuf {
    PathBuf::from("creds/token.json")
}

fn default_client_secret_path() -> PathBuf {
    PathBuf::from("creds/credentials.json")
}

fn default_bucket_region() -> Box<str> {
    "eu-west-1".into()
}

/// `GSHEET_TO_S3__RETRY__MAX_ATTEMPTS=5` overrides `retry.max_attempts`.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}

impl AppConfig {
    /// Path taken from `CONFIG_PATH`, falling back to [`DEFAULT_CONFIG_PATH`].
    pub fn path_from_env() -> PathBuf {
        std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    #[instrument]
    pub fn load(path: &Path) -> error_stack::Result<Self, ConfigError> {
        let source = File::from(path).format(FileFormat::Json);
        Self::from_builder(Config::builder().add_source(source), environment())
            .attach_printable_lazy(|| format!("config file: {}", path.display()))
    }

    pub fn from_json_str(json: &str) -> error_stack::Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder().add_source(File::from_str(json, FileFormat::Json)),
            environment(),
        )
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        environment: Environment,
    ) -> error_stack::Result<Self, ConfigError> {
        let config = builder
            .add_source(environment)
            .build()
            .change_context(ConfigError::Read)?;

        let mut track = Track::new();
        let path_de = PathDeserializer::new(config, &mut track);
        AppConfig::deserialize(path_de).map_err(|e| {
            let path_str = track
                .path()
                .iter()
                .map(|seg| match seg {
                    Segment::Seq { index } => format!("[{}]", index),
                    Segment::Map { key } => format!(".{}", key),
                    Segment::Enum { variant } => format!("::{}", variant),
                    Segment::Unknown => String::from("<?>"),
                })
                .collect::<String>();
            report!(ConfigError::InvalidField(
                path_str.trim_start_matches('.').to_string()
            ))
            .attach_printable(e.to_string())
        })
    }

    pub fn destination(&self) -> Destination {
        Destination::new(
            self.data_bucket_name.as_ref(),
            self.data_object_name.as_ref(),
            self.bucket_region.as_ref(),
        )
    }
}
