use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod app_config;
pub mod config;
pub mod csv_import;
pub mod influence;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};

/// A persisted TED talk record.
///
/// `date` is always the first day of the talk's month — only month and year
/// are meaningful, day-of-month is a normalization artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Talk {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub views: i64,
    pub likes: i64,
    pub link: String,
}

/// A talk parsed from CSV, not yet persisted. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTalk {
    pub title: String,
    pub author: String,
    pub date: NaiveDate,
    pub views: i64,
    pub likes: i64,
    pub link: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
