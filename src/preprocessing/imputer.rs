//! Missing value imputation strategies

use super::stats::{self, ModeValue};
use super::{classify, column_series, missing_flags, numeric_values, string_values, ColumnType};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::{debug, info, warn};

/// Strategy for resolving missing values in a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImputeStrategy {
    /// Drop rows where the column is missing
    Drop,
    /// Replace with mode / most frequent value
    Mode,
    /// Replace with mean (numeric only)
    Mean,
    /// Replace with 0 (numeric only)
    Zero,
    /// Replace with minimum (numeric only)
    Min,
    /// Replace with maximum (numeric only)
    Max,
}

impl ImputeStrategy {
    /// All strategies, indexed by their menu selector
    pub const ALL: [ImputeStrategy; 6] = [
        ImputeStrategy::Drop,
        ImputeStrategy::Mode,
        ImputeStrategy::Mean,
        ImputeStrategy::Zero,
        ImputeStrategy::Min,
        ImputeStrategy::Max,
    ];

    const CATEGORICAL: [ImputeStrategy; 2] = [ImputeStrategy::Drop, ImputeStrategy::Mode];

    /// Menu index of the strategy
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ImputeStrategy::Drop => "drop",
            ImputeStrategy::Mode => "mode",
            ImputeStrategy::Mean => "mean",
            ImputeStrategy::Zero => "zero",
            ImputeStrategy::Min => "min",
            ImputeStrategy::Max => "max",
        }
    }

    /// Human readable menu label
    pub fn label(self) -> &'static str {
        match self {
            ImputeStrategy::Drop => "Drop row",
            ImputeStrategy::Mode => "Fill with mode",
            ImputeStrategy::Mean => "Fill with mean",
            ImputeStrategy::Zero => "Fill with zero",
            ImputeStrategy::Min => "Fill with minimum",
            ImputeStrategy::Max => "Fill with maximum",
        }
    }

    /// Strategies permitted for a column kind
    pub fn allowed_for(kind: ColumnType) -> &'static [ImputeStrategy] {
        match kind {
            ColumnType::Numeric => &Self::ALL,
            ColumnType::Categorical => &Self::CATEGORICAL,
        }
    }

    pub fn is_allowed_for(self, kind: ColumnType) -> bool {
        Self::allowed_for(kind).contains(&self)
    }

    /// Whether the strategy fills values rather than dropping rows
    pub fn is_fill(self) -> bool {
        self != ImputeStrategy::Drop
    }

    /// Parse a menu index (`0` = drop .. `5` = max) or a strategy name
    pub fn from_selector(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let invalid = || DataPrepError::InvalidSelector {
            kind: "strategy".to_string(),
            input: input.to_string(),
            expected: Self::ALL
                .iter()
                .map(|s| format!("{}={}", s.index(), s.name()))
                .collect::<Vec<_>>()
                .join(", "),
        };

        if let Ok(idx) = trimmed.parse::<usize>() {
            return Self::ALL.get(idx).copied().ok_or_else(invalid);
        }

        match trimmed.to_lowercase().as_str() {
            "drop" | "null" | "none" => Ok(ImputeStrategy::Drop),
            "mode" | "most_frequent" => Ok(ImputeStrategy::Mode),
            "mean" | "average" => Ok(ImputeStrategy::Mean),
            "zero" => Ok(ImputeStrategy::Zero),
            "min" | "minimum" => Ok(ImputeStrategy::Min),
            "max" | "maximum" => Ok(ImputeStrategy::Max),
            _ => Err(invalid()),
        }
    }
}

impl std::fmt::Display for ImputeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ImputeStrategy {
    type Err = DataPrepError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_selector(s)
    }
}

/// Imputer for handling missing values in one column at a time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
}

#[derive(Debug, Clone)]
enum ImputeValue {
    Numeric(f64),
    String(String),
    Bool(bool),
}

impl Imputer {
    /// Create a new imputer with the specified strategy
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self { strategy }
    }

    pub fn strategy(&self) -> ImputeStrategy {
        self.strategy
    }

    /// Resolve missing values of `column` in place.
    ///
    /// Fill strategies replace missing entries with a value computed from the
    /// column before any replacement. `Drop` filters the table's rows.
    pub fn impute(&self, df: &mut DataFrame, column: &str) -> Result<()> {
        let series = column_series(df, column)?;
        let kind = classify(&series);

        if !self.strategy.is_allowed_for(kind) {
            return Err(DataPrepError::InvalidStrategy {
                column: column.to_string(),
                kind: kind.to_string(),
                strategy: self.strategy.to_string(),
                allowed: ImputeStrategy::allowed_for(kind)
                    .iter()
                    .map(|s| s.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        if self.strategy == ImputeStrategy::Drop {
            *df = drop_missing(df, column)?;
            return Ok(());
        }

        let missing = missing_flags(&series, kind).into_iter().filter(|m| *m).count();
        if missing == 0 {
            debug!(column, "no missing values to fill");
            return Ok(());
        }

        let fill_value = self.compute_fill_value(&series, kind)?;
        let filled = Self::fill_series(&series, kind, &fill_value)?;
        df.with_column(filled)?;

        info!(column, strategy = %self.strategy, missing, "filled missing values");
        Ok(())
    }

    /// Impute several columns in order.
    ///
    /// A column with no values to compute a fill from is left missing and
    /// logged instead of failing the whole batch.
    pub fn impute_columns(&self, df: &mut DataFrame, columns: &[String]) -> Result<()> {
        for column in columns {
            match self.impute(df, column) {
                Err(DataPrepError::EmptyColumn(name)) => {
                    warn!(column = %name, strategy = %self.strategy, "no values to fill from, column left missing");
                }
                other => other?,
            }
        }
        Ok(())
    }

    fn compute_fill_value(&self, series: &Series, kind: ColumnType) -> Result<ImputeValue> {
        let undefined = || DataPrepError::EmptyColumn(series.name().to_string());

        match self.strategy {
            ImputeStrategy::Mean => stats::mean(series).map(ImputeValue::Numeric).ok_or_else(undefined),
            ImputeStrategy::Min => stats::min(series).map(ImputeValue::Numeric).ok_or_else(undefined),
            ImputeStrategy::Max => stats::max(series).map(ImputeValue::Numeric).ok_or_else(undefined),
            ImputeStrategy::Zero => Ok(ImputeValue::Numeric(0.0)),
            ImputeStrategy::Mode => Ok(match stats::mode(series)? {
                ModeValue::Number(v) => ImputeValue::Numeric(v),
                ModeValue::Bool(v) => ImputeValue::Bool(v),
                ModeValue::Text(v) => ImputeValue::String(v),
            }),
            ImputeStrategy::Drop => Err(DataPrepError::InvalidStrategy {
                column: series.name().to_string(),
                kind: kind.to_string(),
                strategy: self.strategy.to_string(),
                allowed: "a fill strategy".to_string(),
            }),
        }
    }

    fn fill_series(series: &Series, kind: ColumnType, fill_value: &ImputeValue) -> Result<Series> {
        let name = series.name().clone();

        match (kind, fill_value) {
            (ColumnType::Numeric, ImputeValue::Numeric(val)) => {
                let filled: Float64Chunked = numeric_values(series)
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(*val)))
                    .collect();
                Ok(filled.with_name(name).into_series())
            }
            (ColumnType::Categorical, ImputeValue::Bool(val)) => {
                let filled: BooleanChunked = series
                    .bool()?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or(*val)))
                    .collect();
                Ok(filled.with_name(name).into_series())
            }
            (ColumnType::Categorical, ImputeValue::String(val)) => {
                let filled: StringChunked = string_values(series)?
                    .into_iter()
                    .map(|opt| Some(opt.unwrap_or_else(|| val.clone())))
                    .collect();
                Ok(filled.with_name(name).into_series())
            }
            (kind, value) => Err(DataPrepError::DataError(format!(
                "cannot fill {} column '{}' with {:?}",
                kind, name, value
            ))),
        }
    }
}

/// Return a copy of the table without the rows where `column` is missing.
///
/// Rows missing only in other columns are kept.
pub fn drop_missing(df: &DataFrame, column: &str) -> Result<DataFrame> {
    let series = column_series(df, column)?;
    let kind = classify(&series);

    let keep: Vec<bool> = missing_flags(&series, kind).into_iter().map(|m| !m).collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    let result = df.filter(&mask)?;

    if dropped > 0 {
        info!(column, dropped, remaining = result.height(), "dropped rows with missing values");
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_strategy_selector_by_index() {
        assert_eq!(ImputeStrategy::from_selector("0").unwrap(), ImputeStrategy::Drop);
        assert_eq!(ImputeStrategy::from_selector("2").unwrap(), ImputeStrategy::Mean);
        assert_eq!(ImputeStrategy::from_selector(" 5 ").unwrap(), ImputeStrategy::Max);
    }

    #[test]
    fn test_strategy_selector_by_name() {
        assert_eq!("Mode".parse::<ImputeStrategy>().unwrap(), ImputeStrategy::Mode);
        assert_eq!(ImputeStrategy::from_selector("minimum").unwrap(), ImputeStrategy::Min);
    }

    #[test]
    fn test_strategy_selector_rejects_bad_input() {
        for input in ["6", "-1", "abc", ""] {
            let err = ImputeStrategy::from_selector(input).unwrap_err();
            assert!(matches!(err, DataPrepError::InvalidSelector { .. }), "input {input:?}");
        }
    }

    #[test]
    fn test_strategy_serialize() {
        let json = serde_json::to_string(&ImputeStrategy::Mean).unwrap();
        assert_eq!(json, "\"mean\"");
    }

    #[test]
    fn test_mean_imputation() {
        let mut df = df!("age" => &[Some(25.0), None, Some(30.0)]).unwrap();

        Imputer::new(ImputeStrategy::Mean).impute(&mut df, "age").unwrap();

        let col = df.column("age").unwrap().f64().unwrap();
        assert_relative_eq!(col.get(0).unwrap(), 25.0);
        assert_relative_eq!(col.get(1).unwrap(), 27.5);
        assert_relative_eq!(col.get(2).unwrap(), 30.0);
    }

    #[test]
    fn test_min_max_zero_imputation() {
        let base = df!("x" => &[Some(4i64), None, Some(-1), Some(9)]).unwrap();

        for (strategy, expected) in [
            (ImputeStrategy::Min, -1.0),
            (ImputeStrategy::Max, 9.0),
            (ImputeStrategy::Zero, 0.0),
        ] {
            let mut df = base.clone();
            Imputer::new(strategy).impute(&mut df, "x").unwrap();
            let col = df.column("x").unwrap().f64().unwrap();
            assert_eq!(col.get(1), Some(expected), "strategy {strategy}");
            assert_eq!(col.get(0), Some(4.0));
        }
    }

    #[test]
    fn test_mode_imputation_categorical() {
        let mut df = df!("city" => &[Some("A"), None, Some("B"), Some("A")]).unwrap();

        Imputer::new(ImputeStrategy::Mode).impute(&mut df, "city").unwrap();

        let col = df.column("city").unwrap().str().unwrap();
        let values: Vec<_> = col.into_iter().collect();
        assert_eq!(values, vec![Some("A"), Some("A"), Some("B"), Some("A")]);
    }

    #[test]
    fn test_mode_imputation_uses_original_column() {
        // two missing slots must both receive the same pre-computed mode
        let mut df = df!("n" => &[Some(1.0), Some(2.0), Some(2.0), None, None]).unwrap();
        Imputer::new(ImputeStrategy::Mode).impute(&mut df, "n").unwrap();

        let col = df.column("n").unwrap().f64().unwrap();
        assert_eq!(col.get(3), Some(2.0));
        assert_eq!(col.get(4), Some(2.0));
        assert_eq!(col.null_count(), 0);
    }

    #[test]
    fn test_numeric_only_strategy_rejected_for_categorical() {
        for strategy in [ImputeStrategy::Mean, ImputeStrategy::Zero, ImputeStrategy::Min, ImputeStrategy::Max] {
            let mut df = df!("city" => &[Some("A"), None]).unwrap();
            let err = Imputer::new(strategy).impute(&mut df, "city").unwrap_err();
            assert!(matches!(err, DataPrepError::InvalidStrategy { .. }), "strategy {strategy}");
        }
    }

    #[test]
    fn test_fill_on_all_missing_column_fails() {
        let mut df = df!("x" => &[None::<f64>, None]).unwrap();
        let err = Imputer::new(ImputeStrategy::Mean).impute(&mut df, "x").unwrap_err();
        assert!(matches!(err, DataPrepError::EmptyColumn(_)));
    }

    #[test]
    fn test_drop_is_per_column() {
        let df = df!(
            "a" => &[Some(1.0), None, Some(3.0)],
            "b" => &[None, Some("y"), Some("z")]
        )
        .unwrap();

        let result = drop_missing(&df, "a").unwrap();
        assert_eq!(result.height(), 2);
        // row 0 is missing in b but present in a, so it stays
        assert_eq!(result.column("a").unwrap().f64().unwrap().get(0), Some(1.0));
    }

    #[test]
    fn test_drop_strategy_in_place() {
        let mut df = df!("a" => &[Some(1.0), None, Some(f64::NAN), Some(4.0)]).unwrap();
        Imputer::new(ImputeStrategy::Drop).impute(&mut df, "a").unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_missing_column() {
        let mut df = df!("a" => &[1.0]).unwrap();
        let err = Imputer::new(ImputeStrategy::Mean).impute(&mut df, "nope").unwrap_err();
        assert!(matches!(err, DataPrepError::ColumnNotFound(_)));
    }
}
