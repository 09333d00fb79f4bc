use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("invalid JSON file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no input file found; pass --file or set COST_TRACKER_FILE")]
    NoSource,
    #[error("no valid data was processed; check the JSON file")]
    EmptyResult,
    #[error("no data available for {0}")]
    NoDataForMonth(String),
}

pub type Result<T> = std::result::Result<T, TrackerError>;

/// Why a single record (or a whole group) was left out of the table.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("top-level value is {0}; expected an array or an object")]
    UnsupportedShape(&'static str),
    #[error("invalid data format: expected a list of records, found {0}")]
    GroupNotList(&'static str),
    #[error("invalid record format: expected an object, found {0}")]
    NotAnObject(&'static str),
    #[error("missing or invalid timestamp")]
    MissingTimestamp,
    #[error("invalid timestamp format: {0}")]
    BadTimestamp(String),
    #[error("invalid cost value for model {model}: {value}")]
    BadCost { model: String, value: String },
}
