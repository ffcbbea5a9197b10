use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MigratorError {
    #[error("URL:[{url}], StatusCode:[{status}], [{body}]")]
    Transport {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed: {message}")]
    Http { url: String, message: String },

    #[error("failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("failed to decode tree node: {0}")]
    Decode(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn {stage} worker: {message}")]
    Spawn { stage: String, message: String },
}

impl MigratorError {
    pub fn http(url: &str, err: impl std::fmt::Display) -> Self {
        MigratorError::Http {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    /// Startup errors abort the process; everything else is reported and dropped.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MigratorError::ConfigRead(_)
                | MigratorError::ConfigParse { .. }
                | MigratorError::InvalidConfig(_)
                | MigratorError::Spawn { .. }
                | MigratorError::ClientBuild(_)
        )
    }
}
