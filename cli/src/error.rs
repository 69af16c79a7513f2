//! Error types for the sweep CLI.

use std::path::PathBuf;

/// All errors that can occur while running a sweep from the command line.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("input error: {0}")]
    Input(String),

    #[error("failed to read input file {path}: {source}")]
    InputRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse input JSON: {0}")]
    InputParse(#[from] serde_json::Error),

    #[error("failed to write report {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read report {path}: {source}")]
    ReportRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse report {path}: {source}")]
    ReportParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("sweep failed: {0}")]
    Engine(#[from] nanosweep::ConcatError),
}

pub type Result<T> = std::result::Result<T, Error>;
