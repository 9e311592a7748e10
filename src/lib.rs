//! dataprep - tabular data cleaning toolkit
//!
//! Loads a table from one of several file formats, reports per-column summary
//! statistics, resolves missing values with a per-kind strategy, encodes
//! categorical columns and writes the result back out.
//!
//! # Modules
//!
//! - [`io`] - format detection, loading and saving
//! - [`preprocessing`] - column classification, statistics, imputation, encoding
//!   and the cleaning pipeline
//! - [`cli`] - command-line interface and interactive session

pub mod error;
pub mod io;
pub mod preprocessing;
pub mod cli;

pub use error::{DataPrepError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{DataPrepError, Result};
    pub use crate::io::{DataLoader, DataSaver, FileFormat};
    pub use crate::preprocessing::{
        classify, CleaningConfig, CleaningPipeline, CleaningReport, ColumnSummary, ColumnType,
        Encoder, EncoderType, ImputeStrategy, Imputer, ModeValue,
    };
}
