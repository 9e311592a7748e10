//! Per-column summary statistics

use super::{classify, numeric_values, string_values, ColumnType};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;

/// Most frequent value of a column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModeValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl std::fmt::Display for ModeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModeValue::Number(v) => write!(f, "{}", v),
            ModeValue::Text(v) => write!(f, "{}", v),
            ModeValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Arithmetic mean of the coercible, non-missing values
pub fn mean(series: &Series) -> Option<f64> {
    let values: Vec<f64> = numeric_values(series).into_iter().flatten().collect();
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Smallest coercible, non-missing value
pub fn min(series: &Series) -> Option<f64> {
    numeric_values(series)
        .into_iter()
        .flatten()
        .reduce(f64::min)
}

/// Largest coercible, non-missing value
pub fn max(series: &Series) -> Option<f64> {
    numeric_values(series)
        .into_iter()
        .flatten()
        .reduce(f64::max)
}

/// Most frequent non-missing value.
///
/// Ties go to the value seen first in column order. Numeric columns compare
/// coerced numbers, booleans compare as booleans, anything else compares by
/// its text rendering.
pub fn mode(series: &Series) -> Result<ModeValue> {
    let found = match (classify(series), series.dtype()) {
        (ColumnType::Numeric, _) => {
            // -0.0 and 0.0 share a bucket
            let keys = numeric_values(series)
                .into_iter()
                .map(|v| v.map(|x| if x == 0.0 { 0.0f64.to_bits() } else { x.to_bits() }));
            most_frequent(keys).map(|bits| ModeValue::Number(f64::from_bits(bits)))
        }
        (ColumnType::Categorical, DataType::Boolean) => {
            let ca = series.bool()?;
            most_frequent(ca.into_iter()).map(ModeValue::Bool)
        }
        (ColumnType::Categorical, _) => {
            most_frequent(string_values(series)?.into_iter()).map(ModeValue::Text)
        }
    };

    found.ok_or_else(|| DataPrepError::EmptyColumn(series.name().to_string()))
}

fn most_frequent<K, I>(values: I) -> Option<K>
where
    K: Eq + Hash,
    I: Iterator<Item = Option<K>>,
{
    // value -> (count, first position)
    let mut counts: HashMap<K, (usize, usize)> = HashMap::new();
    for (idx, value) in values.enumerate() {
        if let Some(key) = value {
            counts.entry(key).and_modify(|e| e.0 += 1).or_insert((1, idx));
        }
    }

    counts
        .into_iter()
        .max_by(|(_, (count_a, first_a)), (_, (count_b, first_b))| {
            count_a.cmp(count_b).then(first_b.cmp(first_a))
        })
        .map(|(key, _)| key)
}

/// Summary of a single column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub kind: ColumnType,
    pub count: usize,
    pub missing: usize,
    pub distinct: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mode: Option<ModeValue>,
}

impl ColumnSummary {
    /// Compute the summary of one column. Undefined statistics are `None`.
    pub fn from_series(series: &Series) -> Self {
        let kind = classify(series);
        let missing = super::missing_flags(series, kind)
            .into_iter()
            .filter(|m| *m)
            .count();

        let distinct = match kind {
            ColumnType::Numeric => numeric_values(series)
                .into_iter()
                .flatten()
                .map(f64::to_bits)
                .collect::<HashSet<_>>()
                .len(),
            ColumnType::Categorical => string_values(series)
                .map(|values| values.into_iter().flatten().collect::<HashSet<_>>().len())
                .unwrap_or(0),
        };

        let (mean, min, max) = match kind {
            ColumnType::Numeric => (mean(series), min(series), max(series)),
            ColumnType::Categorical => (None, None, None),
        };

        Self {
            name: series.name().to_string(),
            kind,
            count: series.len() - missing,
            missing,
            distinct,
            mean,
            min,
            max,
            mode: mode(series).ok(),
        }
    }
}

/// Summarize every column of a table, in column order
pub fn summarize(df: &DataFrame) -> Vec<ColumnSummary> {
    df.get_columns()
        .iter()
        .map(|c| ColumnSummary::from_series(c.as_materialized_series()))
        .collect()
}
