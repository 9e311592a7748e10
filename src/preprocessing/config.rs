//! Cleaning configuration

use super::{ColumnType, EncoderType, ImputeStrategy};
use crate::error::{DataPrepError, Result};
use crate::io::FileFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Configuration for a cleaning run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleaningConfig {
    /// Strategy for handling missing numeric values
    pub numeric_strategy: ImputeStrategy,

    /// Strategy for handling missing categorical values (mode or drop)
    pub categorical_strategy: ImputeStrategy,

    /// Columns removed right after loading
    pub drop_columns: Vec<String>,

    /// Encoder applied to categorical columns without an override
    pub default_encoding: EncoderType,

    /// Per-column encoder overrides
    pub encodings: HashMap<String, EncoderType>,

    /// Output format; the output file name gets its canonical extension
    pub output_format: Option<FileFormat>,

    /// Output file name without extension
    pub output_name: Option<String>,

    /// Table name for SQL sources
    pub table: Option<String>,

    /// Group path for HDF5 sources
    pub key: Option<String>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            numeric_strategy: ImputeStrategy::Mean,
            categorical_strategy: ImputeStrategy::Mode,
            drop_columns: Vec::new(),
            default_encoding: EncoderType::OneHot,
            encodings: HashMap::new(),
            output_format: None,
            output_name: None,
            table: None,
            key: None,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Builder method to set numeric strategy
    pub fn with_numeric_strategy(mut self, strategy: ImputeStrategy) -> Self {
        self.numeric_strategy = strategy;
        self
    }

    /// Builder method to set categorical strategy
    pub fn with_categorical_strategy(mut self, strategy: ImputeStrategy) -> Self {
        self.categorical_strategy = strategy;
        self
    }

    /// Builder method to set columns dropped after loading
    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    /// Builder method to set the default encoder
    pub fn with_default_encoding(mut self, encoding: EncoderType) -> Self {
        self.default_encoding = encoding;
        self
    }

    /// Builder method to override the encoder for one column
    pub fn with_encoding(mut self, column: impl Into<String>, encoding: EncoderType) -> Self {
        self.encodings.insert(column.into(), encoding);
        self
    }

    /// Builder method to set output format and name
    pub fn with_output(mut self, format: FileFormat, name: impl Into<String>) -> Self {
        self.output_format = Some(format);
        self.output_name = Some(name.into());
        self
    }

    /// Builder method to set the SQL table name
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Encoder for a given column
    pub fn encoding_for(&self, column: &str) -> &EncoderType {
        self.encodings.get(column).unwrap_or(&self.default_encoding)
    }

    /// Check the strategies against the column kinds they apply to
    pub fn validate(&self) -> Result<()> {
        if !self.categorical_strategy.is_allowed_for(ColumnType::Categorical) {
            return Err(DataPrepError::InvalidStrategy {
                column: "*".to_string(),
                kind: "categorical".to_string(),
                strategy: self.categorical_strategy.to_string(),
                allowed: "drop, mode".to_string(),
            });
        }
        if let Some(format) = self.output_format {
            if !format.is_writable() {
                return Err(DataPrepError::ConfigError(format!(
                    "{} is a load-only format",
                    format
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert_eq!(config.numeric_strategy, ImputeStrategy::Mean);
        assert_eq!(config.categorical_strategy, ImputeStrategy::Mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_pattern() {
        let config = CleaningConfig::new()
            .with_numeric_strategy(ImputeStrategy::Max)
            .with_categorical_strategy(ImputeStrategy::Drop)
            .with_encoding("city", EncoderType::Label)
            .with_output(FileFormat::Parquet, "out");

        assert_eq!(config.numeric_strategy, ImputeStrategy::Max);
        assert_eq!(config.encoding_for("city"), &EncoderType::Label);
        assert_eq!(config.encoding_for("other"), &EncoderType::OneHot);
        assert_eq!(config.output_format, Some(FileFormat::Parquet));
    }

    #[test]
    fn test_categorical_fill_rejected() {
        let config = CleaningConfig::new().with_categorical_strategy(ImputeStrategy::Mean);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            DataPrepError::InvalidStrategy { ref kind, ref strategy, .. }
                if kind == "categorical" && strategy == "mean"
        ));
    }

    #[test]
    fn test_from_json_file_with_partial_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"numeric_strategy": "zero", "encodings": {{"size": {{"ordinal": {{"low": 0, "high": 1}}}}}}}}"#
        )
        .unwrap();

        let config = CleaningConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.numeric_strategy, ImputeStrategy::Zero);
        assert_eq!(config.categorical_strategy, ImputeStrategy::Mode);
        assert!(matches!(config.encoding_for("size"), EncoderType::Ordinal(m) if m.len() == 2));
    }
}
