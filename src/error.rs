//! Error types for dataprep

use thiserror::Error;

/// Result type alias for dataprep operations
pub type Result<T> = std::result::Result<T, DataPrepError>;

/// Main error type for loading, cleaning, encoding and saving tables
#[derive(Error, Debug)]
pub enum DataPrepError {
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Error while reading {format} file '{path}', make sure your file is valid: {cause}")]
    SourceRead {
        format: String,
        path: String,
        cause: String,
    },

    #[error("Error while writing {format} file '{path}', make sure the destination is valid: {cause}")]
    SourceWrite {
        format: String,
        path: String,
        cause: String,
    },

    #[error("Invalid strategy '{strategy}' for {kind} column '{column}', allowed: {allowed}")]
    InvalidStrategy {
        column: String,
        kind: String,
        strategy: String,
        allowed: String,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Column '{0}' has no non-missing values")]
    EmptyColumn(String),

    #[error("Invalid {kind} selector '{input}', expected one of: {expected}")]
    InvalidSelector {
        kind: String,
        input: String,
        expected: String,
    },

    #[error("Missing parameter '{name}' required to read {format} sources")]
    MissingParameter { format: String, name: String },

    #[error("Column already exists: {0}")]
    DuplicateColumn(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for DataPrepError {
    fn from(err: polars::error::PolarsError) -> Self {
        DataPrepError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for DataPrepError {
    fn from(err: serde_json::Error) -> Self {
        DataPrepError::ConfigError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_read_message_names_format() {
        let err = DataPrepError::SourceRead {
            format: "parquet".to_string(),
            path: "data.parquet".to_string(),
            cause: "bad magic".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("parquet file 'data.parquet'"));
        assert!(msg.contains("make sure your file is valid"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DataPrepError = io_err.into();
        assert!(matches!(err, DataPrepError::IoError(_)));
    }

    #[test]
    fn test_error_display() {
        let err = DataPrepError::ColumnNotFound("age".to_string());
        assert_eq!(err.to_string(), "Column not found: age");
    }
}
