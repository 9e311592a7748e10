//! Categorical encoding implementations

use super::{column_series, string_values};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info, warn};

/// Type of encoder to use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderType {
    /// Label encoding: one integer code per distinct value, in first-seen order
    Label,
    /// One-hot encoding: one indicator column per distinct value
    OneHot,
    /// Ordinal encoding with an explicit value -> code mapping
    Ordinal(BTreeMap<String, i64>),
}

impl EncoderType {
    /// Parse a menu index (`1` = label, `2` = one-hot) or an encoder name.
    ///
    /// Ordinal encoding needs a mapping and is not selectable here.
    pub fn from_selector(input: &str) -> Result<Self> {
        match input.trim().to_lowercase().as_str() {
            "1" | "label" => Ok(EncoderType::Label),
            "2" | "onehot" | "one-hot" | "one_hot" => Ok(EncoderType::OneHot),
            _ => Err(DataPrepError::InvalidSelector {
                kind: "encoding".to_string(),
                input: input.to_string(),
                expected: "1=label, 2=onehot".to_string(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EncoderType::Label => "label",
            EncoderType::OneHot => "onehot",
            EncoderType::Ordinal(_) => "ordinal",
        }
    }
}

impl std::fmt::Display for EncoderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Categorical encoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encoder {
    encoder_type: EncoderType,
}

impl Encoder {
    /// Create a new encoder
    pub fn new(encoder_type: EncoderType) -> Self {
        Self { encoder_type }
    }

    pub fn encoder_type(&self) -> &EncoderType {
        &self.encoder_type
    }

    /// Encode one column, returning the transformed table
    pub fn encode(&self, mut df: DataFrame, column: &str) -> Result<DataFrame> {
        match &self.encoder_type {
            EncoderType::Label => {
                label_encode(&mut df, column)?;
                Ok(df)
            }
            EncoderType::OneHot => one_hot_encode(&df, column),
            EncoderType::Ordinal(mapping) => {
                ordinal_encode(&mut df, column, mapping)?;
                Ok(df)
            }
        }
    }
}

/// Distinct non-missing values in first-seen order
fn distinct_in_order(values: &[Option<String>]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for value in values.iter().flatten() {
        if seen.insert(value.as_str()) {
            ordered.push(value.clone());
        }
    }
    ordered
}

/// Replace `column` with integer codes `0..n`, assigned in first-seen order.
///
/// Missing entries stay missing. The column keeps its name and position.
pub fn label_encode(df: &mut DataFrame, column: &str) -> Result<()> {
    let series = column_series(df, column)?;
    let values = string_values(&series)?;

    let mapping: HashMap<String, i64> = distinct_in_order(&values)
        .into_iter()
        .enumerate()
        .map(|(code, value)| (value, code as i64))
        .collect();

    let codes: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.as_ref().and_then(|s| mapping.get(s).copied()))
        .collect();

    df.with_column(Series::new(column.into(), codes))?;
    debug!(column, ?mapping, "label mapping");
    info!(column, categories = mapping.len(), "label encoded");
    Ok(())
}

/// Replace `column` with one `{column}_{value}` indicator per distinct value.
///
/// Indicators are appended after the remaining columns in first-seen order.
/// Rows where the original is missing get 0 in every indicator.
pub fn one_hot_encode(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = column_series(df, column)?;
    let values = string_values(&series)?;
    let categories = distinct_in_order(&values);

    let existing: HashSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();

    let mut result = df.drop(column)?;

    for category in &categories {
        let new_col_name = format!("{}_{}", column, category);
        if existing.contains(&new_col_name) {
            return Err(DataPrepError::DuplicateColumn(new_col_name));
        }

        let indicator: Vec<i32> = values
            .iter()
            .map(|v| if v.as_deref() == Some(category.as_str()) { 1 } else { 0 })
            .collect();

        result.with_column(Series::new(new_col_name.into(), indicator))?;
    }

    info!(column, categories = categories.len(), "one-hot encoded");
    Ok(result)
}

/// Replace `column` with codes from an explicit `mapping`.
///
/// Values absent from the mapping become missing.
pub fn ordinal_encode(
    df: &mut DataFrame,
    column: &str,
    mapping: &BTreeMap<String, i64>,
) -> Result<()> {
    let series = column_series(df, column)?;
    let values = string_values(&series)?;

    let mut unmapped = 0usize;
    let codes: Vec<Option<i64>> = values
        .iter()
        .map(|v| {
            let code = v.as_ref().and_then(|s| mapping.get(s).copied());
            if v.is_some() && code.is_none() {
                unmapped += 1;
            }
            code
        })
        .collect();

    if unmapped > 0 {
        warn!(column, unmapped, "values without an ordinal code were set to missing");
    }

    df.with_column(Series::new(column.into(), codes))?;
    info!(column, codes = mapping.len(), "ordinal encoded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn city_df() -> DataFrame {
        df!(
            "id" => &[1i64, 2, 3],
            "city" => &["A", "B", "A"]
        )
        .unwrap()
    }

    #[test]
    fn test_label_encoding_first_seen_order() {
        let mut df = df!("category" => &["b", "a", "c", "a", "b"]).unwrap();
        label_encode(&mut df, "category").unwrap();

        let col = df.column("category").unwrap().i64().unwrap();
        let codes: Vec<_> = col.into_iter().collect();
        assert_eq!(codes, vec![Some(0), Some(1), Some(2), Some(1), Some(0)]);
    }

    #[test]
    fn test_label_encoding_keeps_missing() {
        let mut df = df!("c" => &[Some("x"), None, Some("y")]).unwrap();
        label_encode(&mut df, "c").unwrap();

        let col = df.column("c").unwrap().i64().unwrap();
        assert_eq!(col.get(0), Some(0));
        assert_eq!(col.get(1), None);
        assert_eq!(col.get(2), Some(1));
    }

    #[test]
    fn test_onehot_encoding() {
        let df = city_df();
        let result = one_hot_encode(&df, "city").unwrap();

        assert!(result.column("city").is_err());
        let names: Vec<String> = result
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["id", "city_A", "city_B"]);

        let a: Vec<_> = result.column("city_A").unwrap().i32().unwrap().into_iter().collect();
        let b: Vec<_> = result.column("city_B").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(a, vec![Some(1), Some(0), Some(1)]);
        assert_eq!(b, vec![Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn test_onehot_boolean_indicator_names() {
        let df = df!("flag" => &[Some(true), None, Some(false)]).unwrap();
        let result = one_hot_encode(&df, "flag").unwrap();

        let names: Vec<String> = result
            .get_column_names()
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["flag_True", "flag_False"]);

        let t: Vec<_> = result.column("flag_True").unwrap().i32().unwrap().into_iter().collect();
        assert_eq!(t, vec![Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn test_onehot_rejects_name_collision() {
        let df = df!(
            "city" => &["A", "B"],
            "city_A" => &[0i32, 1]
        )
        .unwrap();
        let err = one_hot_encode(&df, "city").unwrap_err();
        assert!(matches!(err, DataPrepError::DuplicateColumn(name) if name == "city_A"));
    }

    #[test]
    fn test_ordinal_encoding() {
        let mut df = df!("size" => &["low", "high", "mid", "huge"]).unwrap();
        let mapping: BTreeMap<String, i64> = [("low", 0), ("mid", 1), ("high", 2)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        ordinal_encode(&mut df, "size", &mapping).unwrap();

        let codes: Vec<_> = df.column("size").unwrap().i64().unwrap().into_iter().collect();
        assert_eq!(codes, vec![Some(0), Some(2), Some(1), None]);
    }

    #[test]
    fn test_encoder_missing_column() {
        let df = city_df();
        let err = Encoder::new(EncoderType::Label).encode(df, "nope").unwrap_err();
        assert!(matches!(err, DataPrepError::ColumnNotFound(_)));
    }

    #[test]
    fn test_encoder_selector() {
        assert_eq!(EncoderType::from_selector("1").unwrap(), EncoderType::Label);
        assert_eq!(EncoderType::from_selector("One-Hot").unwrap(), EncoderType::OneHot);
        assert!(matches!(
            EncoderType::from_selector("3"),
            Err(DataPrepError::InvalidSelector { .. })
        ));
    }
}
