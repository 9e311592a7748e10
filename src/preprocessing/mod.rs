//! Data preprocessing module
//!
//! Provides the cleaning building blocks:
//! - Column classification (numeric vs categorical)
//! - Summary statistics (mean, min, max, mode)
//! - Missing value imputation and row dropping
//! - Categorical encoding (Label, OneHot, Ordinal)
//! - The cleaning pipeline that chains them

mod config;
mod imputer;
mod encoder;
mod pipeline;
pub mod stats;

pub use config::CleaningConfig;
pub use imputer::{drop_missing, ImputeStrategy, Imputer};
pub use encoder::{label_encode, one_hot_encode, ordinal_encode, Encoder, EncoderType};
pub use pipeline::{CleaningPipeline, CleaningReport};
pub use stats::{summarize, ColumnSummary, ModeValue};

use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Semantic kind of a column, inferred from its values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Categorical,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::Numeric => write!(f, "numeric"),
            ColumnType::Categorical => write!(f, "categorical"),
        }
    }
}

/// Check if dtype is numeric
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Classify a column as numeric or categorical.
///
/// Numeric dtypes are numeric. A text column is numeric when every non-null
/// value parses as a number, which makes an all-null text column numeric too.
/// Everything else (text, booleans, dates) is categorical.
pub fn classify(series: &Series) -> ColumnType {
    let dtype = series.dtype();
    if is_numeric_dtype(dtype) {
        return ColumnType::Numeric;
    }

    if matches!(dtype, DataType::String) {
        if let Ok(ca) = series.str() {
            let all_numeric = ca
                .into_iter()
                .flatten()
                .all(|s| s.trim().parse::<f64>().is_ok());
            if all_numeric {
                return ColumnType::Numeric;
            }
        }
    }

    if matches!(dtype, DataType::Null) {
        return ColumnType::Numeric;
    }

    ColumnType::Categorical
}

/// Parse a text cell as a number; blanks and NaN count as missing
pub(crate) fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Coerce a column to numbers. Non-coercible entries and NaN become `None`.
pub(crate) fn numeric_values(series: &Series) -> Vec<Option<f64>> {
    match series.dtype() {
        DataType::String => match series.str() {
            Ok(ca) => ca.into_iter().map(|v| v.and_then(parse_number)).collect(),
            Err(_) => vec![None; series.len()],
        },
        DataType::Boolean => match series.bool() {
            Ok(ca) => ca
                .into_iter()
                .map(|v| v.map(|b| if b { 1.0 } else { 0.0 }))
                .collect(),
            Err(_) => vec![None; series.len()],
        },
        _ => match series.cast(&DataType::Float64) {
            Ok(casted) => match casted.f64() {
                Ok(ca) => ca.into_iter().map(|v| v.filter(|x| !x.is_nan())).collect(),
                Err(_) => vec![None; series.len()],
            },
            Err(_) => vec![None; series.len()],
        },
    }
}

/// Per-row missingness for a column of the given kind.
///
/// Numeric columns treat null, NaN and non-coercible entries as missing;
/// categorical columns only nulls.
pub(crate) fn missing_flags(series: &Series, kind: ColumnType) -> Vec<bool> {
    match kind {
        ColumnType::Numeric => numeric_values(series).iter().map(Option::is_none).collect(),
        ColumnType::Categorical => series.is_null().into_iter().map(|v| v.unwrap_or(true)).collect(),
    }
}

/// Number of missing entries in a column
pub fn missing_count(series: &Series) -> usize {
    missing_flags(series, classify(series))
        .into_iter()
        .filter(|m| *m)
        .count()
}

/// Render a column as optional strings, casting non-text dtypes.
///
/// Booleans render as `True`/`False`.
pub(crate) fn string_values(series: &Series) -> Result<Vec<Option<String>>> {
    if let DataType::Boolean = series.dtype() {
        return Ok(series
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| if b { "True" } else { "False" }.to_string()))
            .collect());
    }

    let casted;
    let text = if matches!(series.dtype(), DataType::String) {
        series
    } else {
        casted = series.cast(&DataType::String)?;
        &casted
    };

    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Fetch a column as a series, mapping absence to `ColumnNotFound`
pub(crate) fn column_series(df: &DataFrame, name: &str) -> Result<Series> {
    df.column(name)
        .map(|c| c.as_materialized_series().clone())
        .map_err(|_| DataPrepError::ColumnNotFound(name.to_string()))
}

/// Names of the columns classified as `kind`, in table order
pub fn columns_of_kind(df: &DataFrame, kind: ColumnType) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| classify(c.as_materialized_series()) == kind)
        .map(|c| c.name().to_string())
        .collect()
}
