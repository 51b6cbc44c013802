pub mod app_config;

pub use app_config::{AppConfig, ConfigError, DEFAULT_CONFIG_PATH};
