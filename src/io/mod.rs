//! Format detection, loading and saving
//!
//! Delimited text, JSON, Parquet and Feather go through polars. Excel, pickle,
//! Stata, HTML, SQLite and HDF5 have their own small codecs in this module.

mod data_loader;
mod excel;
mod hdf;
mod html;
mod pickle;
mod sql;
mod stata;

pub use data_loader::{DataLoader, DataSaver};

use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Csv,
    Tsv,
    Excel,
    Json,
    Parquet,
    Pickle,
    Feather,
    Stata,
    Html,
    Sql,
    Hdf5,
}

impl FileFormat {
    /// Formats offered when saving, in menu order (selector `1` is CSV)
    pub const SAVE_MENU: [FileFormat; 8] = [
        FileFormat::Csv,
        FileFormat::Excel,
        FileFormat::Json,
        FileFormat::Parquet,
        FileFormat::Pickle,
        FileFormat::Feather,
        FileFormat::Stata,
        FileFormat::Html,
    ];

    /// Resolve a format from a file extension or format name
    pub fn from_extension(ext: &str) -> Result<Self> {
        match ext.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "tsv" => Ok(FileFormat::Tsv),
            "xlsx" | "xls" | "excel" => Ok(FileFormat::Excel),
            "json" => Ok(FileFormat::Json),
            "parquet" | "pq" => Ok(FileFormat::Parquet),
            "pickle" | "pkl" => Ok(FileFormat::Pickle),
            "feather" | "ipc" | "arrow" => Ok(FileFormat::Feather),
            "stata" | "dta" => Ok(FileFormat::Stata),
            "html" | "htm" => Ok(FileFormat::Html),
            "sql" | "db" | "sqlite" | "sqlite3" => Ok(FileFormat::Sql),
            "hdf5" | "h5" | "hdf" => Ok(FileFormat::Hdf5),
            other => Err(DataPrepError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Resolve a format from the path's extension
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| DataPrepError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }

    /// Resolve a save selector: a menu number (`1`..`8`) or a format name
    pub fn from_selector(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if let Ok(idx) = trimmed.parse::<usize>() {
            return idx
                .checked_sub(1)
                .and_then(|i| Self::SAVE_MENU.get(i))
                .copied()
                .ok_or_else(|| DataPrepError::InvalidSelector {
                    kind: "file format".to_string(),
                    input: input.to_string(),
                    expected: Self::SAVE_MENU
                        .iter()
                        .enumerate()
                        .map(|(i, f)| format!("{}={}", i + 1, f))
                        .collect::<Vec<_>>()
                        .join(", "),
                });
        }
        Self::from_extension(trimmed)
    }

    pub fn name(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Tsv => "tsv",
            FileFormat::Excel => "excel",
            FileFormat::Json => "json",
            FileFormat::Parquet => "parquet",
            FileFormat::Pickle => "pickle",
            FileFormat::Feather => "feather",
            FileFormat::Stata => "stata",
            FileFormat::Html => "html",
            FileFormat::Sql => "sql",
            FileFormat::Hdf5 => "hdf5",
        }
    }

    /// Extension used when saving
    pub fn extension(self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Tsv => "tsv",
            FileFormat::Excel => "xlsx",
            FileFormat::Json => "json",
            FileFormat::Parquet => "parquet",
            FileFormat::Pickle => "pkl",
            FileFormat::Feather => "feather",
            FileFormat::Stata => "dta",
            FileFormat::Html => "html",
            FileFormat::Sql => "db",
            FileFormat::Hdf5 => "h5",
        }
    }

    /// Menu label
    pub fn label(self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Tsv => "TSV",
            FileFormat::Excel => "Excel",
            FileFormat::Json => "JSON",
            FileFormat::Parquet => "Parquet",
            FileFormat::Pickle => "Pickle",
            FileFormat::Feather => "Feather",
            FileFormat::Stata => "Stata",
            FileFormat::Html => "HTML",
            FileFormat::Sql => "SQLite",
            FileFormat::Hdf5 => "HDF5",
        }
    }

    /// SQL and HDF5 sources can only be read
    pub fn is_writable(self) -> bool {
        !matches!(self, FileFormat::Sql | FileFormat::Hdf5)
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FileFormat {
    type Err = DataPrepError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_selector(s)
    }
}

/// A loosely typed cell read by one of the non-polars codecs
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum CellValue {
    Empty,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl CellValue {
    /// Interpret a text cell: blanks and `NaN` are empty, numbers and
    /// booleans are recognized, anything else stays text.
    pub(crate) fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
            return CellValue::Empty;
        }
        if let Ok(v) = trimmed.parse::<i64>() {
            return CellValue::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            return CellValue::Float(v);
        }
        match trimmed {
            "true" | "True" | "TRUE" => CellValue::Bool(true),
            "false" | "False" | "FALSE" => CellValue::Bool(false),
            _ => CellValue::Text(trimmed.to_string()),
        }
    }

    pub(crate) fn render(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Int(v) => Some(v.to_string()),
            CellValue::Float(v) => Some(v.to_string()),
            CellValue::Bool(v) => Some(v.to_string()),
            CellValue::Text(v) => Some(v.clone()),
        }
    }
}

/// Build a typed series from cells.
///
/// All-integer cells give `Int64`, integers mixed with floats give `Float64`,
/// all-boolean cells give `Boolean`, anything mixed with text gives `String`.
/// A column of empty cells is `Float64` nulls.
pub(crate) fn build_column(name: &str, cells: &[CellValue]) -> Series {
    let filled = || cells.iter().filter(|c| **c != CellValue::Empty);

    if filled().all(|c| matches!(c, CellValue::Int(_))) && filled().next().is_some() {
        let values: Vec<Option<i64>> = cells
            .iter()
            .map(|c| match c {
                CellValue::Int(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    if filled().all(|c| matches!(c, CellValue::Int(_) | CellValue::Float(_))) {
        let values: Vec<Option<f64>> = cells
            .iter()
            .map(|c| match c {
                CellValue::Int(v) => Some(*v as f64),
                CellValue::Float(v) if !v.is_nan() => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    if filled().all(|c| matches!(c, CellValue::Bool(_))) {
        let values: Vec<Option<bool>> = cells
            .iter()
            .map(|c| match c {
                CellValue::Bool(v) => Some(*v),
                _ => None,
            })
            .collect();
        return Series::new(name.into(), values);
    }

    let values: Vec<Option<String>> = cells.iter().map(CellValue::render).collect();
    Series::new(name.into(), values)
}

/// Cells of a series: integers, floats and booleans keep their kind,
/// everything else is rendered as text.
pub(crate) fn series_cells(series: &Series) -> Result<Vec<CellValue>> {
    let cells = match series.dtype() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let casted = series.cast(&DataType::Int64)?;
            casted
                .i64()?
                .into_iter()
                .map(|v| v.map_or(CellValue::Empty, CellValue::Int))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let casted = series.cast(&DataType::Float64)?;
            casted
                .f64()?
                .into_iter()
                .map(|v| match v {
                    Some(x) if !x.is_nan() => CellValue::Float(x),
                    _ => CellValue::Empty,
                })
                .collect()
        }
        DataType::Boolean => series
            .bool()?
            .into_iter()
            .map(|v| v.map_or(CellValue::Empty, CellValue::Bool))
            .collect(),
        _ => {
            let casted = series.cast(&DataType::String)?;
            casted
                .str()?
                .into_iter()
                .map(|v| v.map_or(CellValue::Empty, |s| CellValue::Text(s.to_string())))
                .collect()
        }
    };
    Ok(cells)
}

/// Assemble a table from named cell columns
pub(crate) fn frame_from_cells(names: &[String], columns: &[Vec<CellValue>]) -> Result<DataFrame> {
    let columns: Vec<Column> = names
        .iter()
        .zip(columns)
        .map(|(name, cells)| build_column(name, cells).into_column())
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Normalize missingness after a load: float `NaN` becomes null and
/// categorical/enum columns become plain strings.
pub(crate) fn normalize(df: DataFrame) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(df.width());

    for col in df.get_columns() {
        let series = col.as_materialized_series();
        let normalized = match series.dtype() {
            DataType::Float64 => {
                let ca: Float64Chunked = series
                    .f64()?
                    .into_iter()
                    .map(|v| v.filter(|x| !x.is_nan()))
                    .collect();
                ca.with_name(series.name().clone()).into_series()
            }
            DataType::Float32 => {
                let ca: Float32Chunked = series
                    .f32()?
                    .into_iter()
                    .map(|v| v.filter(|x| !x.is_nan()))
                    .collect();
                ca.with_name(series.name().clone()).into_series()
            }
            DataType::Categorical(..) | DataType::Enum(..) => series.cast(&DataType::String)?,
            _ => series.clone(),
        };
        columns.push(normalized.into_column());
    }

    Ok(DataFrame::new(columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path("data.csv").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_path("Data.XLSX").unwrap(), FileFormat::Excel);
        assert_eq!(FileFormat::from_path("x.pkl").unwrap(), FileFormat::Pickle);
        assert_eq!(FileFormat::from_path("x.dta").unwrap(), FileFormat::Stata);
        assert_eq!(FileFormat::from_path("x.sqlite").unwrap(), FileFormat::Sql);
    }

    #[test]
    fn test_unknown_extension_is_unsupported() {
        assert!(matches!(
            FileFormat::from_path("notes.docx"),
            Err(DataPrepError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            FileFormat::from_path("no_extension"),
            Err(DataPrepError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_format_selector() {
        assert_eq!(FileFormat::from_selector("1").unwrap(), FileFormat::Csv);
        assert_eq!(FileFormat::from_selector("8").unwrap(), FileFormat::Html);
        assert_eq!(FileFormat::from_selector("parquet").unwrap(), FileFormat::Parquet);
        assert!(matches!(
            FileFormat::from_selector("0"),
            Err(DataPrepError::InvalidSelector { .. })
        ));
        assert!(matches!(
            FileFormat::from_selector("9"),
            Err(DataPrepError::InvalidSelector { .. })
        ));
        assert!(matches!(
            FileFormat::from_selector("yaml"),
            Err(DataPrepError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_cell_parse() {
        assert_eq!(CellValue::parse(""), CellValue::Empty);
        assert_eq!(CellValue::parse("NaN"), CellValue::Empty);
        assert_eq!(CellValue::parse("42"), CellValue::Int(42));
        assert_eq!(CellValue::parse("2.5"), CellValue::Float(2.5));
        assert_eq!(CellValue::parse("True"), CellValue::Bool(true));
        assert_eq!(CellValue::parse(" Paris "), CellValue::Text("Paris".to_string()));
    }

    #[test]
    fn test_build_column_types() {
        let ints = build_column("a", &[CellValue::Int(1), CellValue::Empty]);
        assert_eq!(ints.dtype(), &DataType::Int64);

        let floats = build_column("b", &[CellValue::Int(1), CellValue::Float(0.5)]);
        assert_eq!(floats.dtype(), &DataType::Float64);

        let mixed = build_column("c", &[CellValue::Int(1), CellValue::Text("x".into())]);
        assert_eq!(mixed.dtype(), &DataType::String);

        let empty = build_column("d", &[CellValue::Empty, CellValue::Empty]);
        assert_eq!(empty.dtype(), &DataType::Float64);
        assert_eq!(empty.null_count(), 2);
    }

    #[test]
    fn test_normalize_nan_to_null() {
        let df = df!("x" => &[Some(1.0), Some(f64::NAN), None]).unwrap();
        let df = normalize(df).unwrap();
        assert_eq!(df.column("x").unwrap().null_count(), 2);
    }
}
