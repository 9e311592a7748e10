//! Data cleaning pipeline

use super::{
    columns_of_kind, config::CleaningConfig, encoder::Encoder, imputer::Imputer,
    stats::{summarize, ColumnSummary}, ColumnType,
};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use std::time::Instant;
use tracing::info;

/// Outcome of a full cleaning run
#[derive(Debug, Clone)]
pub struct CleaningReport {
    /// The cleaned table
    pub table: DataFrame,
    /// Per-column summary taken before missing values were handled
    pub summary: Vec<ColumnSummary>,
    /// Columns removed at the user's request
    pub dropped_columns: Vec<String>,
    /// Rows removed by drop strategies
    pub dropped_rows: usize,
    /// Columns that went through an encoder
    pub encoded_columns: Vec<String>,
    /// Wall time of the run in seconds
    pub elapsed_secs: f64,
}

/// Runs drop-columns, summary, imputation and encoding in order
#[derive(Debug, Clone)]
pub struct CleaningPipeline {
    config: CleaningConfig,
}

impl CleaningPipeline {
    /// Create a pipeline from a validated configuration
    pub fn new(config: CleaningConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CleaningConfig {
        &self.config
    }

    /// Remove the configured columns. Fails if any of them is absent.
    pub fn drop_columns(&self, df: &mut DataFrame) -> Result<Vec<String>> {
        let mut dropped = Vec::new();
        for name in &self.config.drop_columns {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            df.drop_in_place(name)
                .map_err(|_| DataPrepError::ColumnNotFound(name.to_string()))?;
            dropped.push(name.to_string());
        }
        if !dropped.is_empty() {
            info!(columns = ?dropped, "dropped columns");
        }
        Ok(dropped)
    }

    /// Fill, then drop, following the numeric and categorical strategies.
    ///
    /// Every fill value is computed before any drop pass runs, so drop passes
    /// on one kind never change the statistics used for the other.
    pub fn handle_missing(&self, mut df: DataFrame) -> Result<DataFrame> {
        let numeric = columns_of_kind(&df, ColumnType::Numeric);
        let categorical = columns_of_kind(&df, ColumnType::Categorical);

        let numeric_imputer = Imputer::new(self.config.numeric_strategy);
        let categorical_imputer = Imputer::new(self.config.categorical_strategy);

        if self.config.numeric_strategy.is_fill() {
            numeric_imputer.impute_columns(&mut df, &numeric)?;
        }
        if self.config.categorical_strategy.is_fill() {
            categorical_imputer.impute_columns(&mut df, &categorical)?;
        }
        if !self.config.numeric_strategy.is_fill() {
            numeric_imputer.impute_columns(&mut df, &numeric)?;
        }
        if !self.config.categorical_strategy.is_fill() {
            categorical_imputer.impute_columns(&mut df, &categorical)?;
        }

        Ok(df)
    }

    /// Encode the given columns with their configured encoders
    pub fn encode(&self, mut df: DataFrame, columns: &[String]) -> Result<DataFrame> {
        for column in columns {
            let encoder = Encoder::new(self.config.encoding_for(column).clone());
            df = encoder.encode(df, column)?;
        }
        Ok(df)
    }

    /// Run every stage on `df`
    pub fn run(&self, mut df: DataFrame) -> Result<CleaningReport> {
        let start = Instant::now();

        let dropped_columns = self.drop_columns(&mut df)?;
        let summary = summarize(&df);

        let rows_before = df.height();
        let df = self.handle_missing(df)?;
        let dropped_rows = rows_before - df.height();

        let encoded_columns = columns_of_kind(&df, ColumnType::Categorical);
        let df = self.encode(df, &encoded_columns)?;

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            rows = df.height(),
            cols = df.width(),
            dropped_rows,
            encoded = encoded_columns.len(),
            elapsed_secs,
            "cleaning finished"
        );

        Ok(CleaningReport {
            table: df,
            summary,
            dropped_columns,
            dropped_rows,
            encoded_columns,
            elapsed_secs,
        })
    }
}
