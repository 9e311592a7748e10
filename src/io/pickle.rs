//! Pickle files holding a list of `(name, values)` column pairs

use super::{frame_from_cells, series_cells, CellValue};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use serde_pickle::{DeOptions, HashableValue, SerOptions, Value};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

fn pickle_err(err: serde_pickle::Error) -> DataPrepError {
    DataPrepError::DataError(err.to_string())
}

fn to_value(cell: CellValue) -> Value {
    match cell {
        CellValue::Empty => Value::None,
        CellValue::Int(v) => Value::I64(v),
        CellValue::Float(v) => Value::F64(v),
        CellValue::Bool(v) => Value::Bool(v),
        CellValue::Text(s) => Value::String(s),
    }
}

fn to_cell(value: &Value) -> CellValue {
    match value {
        Value::None => CellValue::Empty,
        Value::I64(v) => CellValue::Int(*v),
        Value::F64(v) if v.is_nan() => CellValue::Empty,
        Value::F64(v) => CellValue::Float(*v),
        Value::Bool(v) => CellValue::Bool(*v),
        Value::String(s) => CellValue::Text(s.clone()),
        Value::Int(big) => CellValue::Text(big.to_string()),
        Value::Bytes(b) => CellValue::Text(String::from_utf8_lossy(b).into_owned()),
        other => CellValue::Text(format!("{:?}", other)),
    }
}

fn column_name(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::I64(v) => Ok(v.to_string()),
        other => Err(DataPrepError::DataError(format!(
            "column names must be strings, found {:?}",
            other
        ))),
    }
}

fn hashable_name(value: &HashableValue) -> Result<String> {
    match value {
        HashableValue::String(s) => Ok(s.clone()),
        HashableValue::I64(v) => Ok(v.to_string()),
        other => Err(DataPrepError::DataError(format!(
            "column names must be strings, found {:?}",
            other
        ))),
    }
}

fn column_values(value: &Value) -> Result<Vec<CellValue>> {
    match value {
        Value::List(items) | Value::Tuple(items) => Ok(items.iter().map(to_cell).collect()),
        other => Err(DataPrepError::DataError(format!(
            "column values must be a list, found {:?}",
            other
        ))),
    }
}

/// Read a pickled table.
///
/// Accepts a list of `(name, values)` pairs, or a dict of name to values
/// (whose columns come back in key order).
pub(crate) fn read(path: &Path) -> Result<DataFrame> {
    let reader = BufReader::new(File::open(path)?);
    let value = serde_pickle::value_from_reader(reader, DeOptions::new()).map_err(pickle_err)?;

    let mut names = Vec::new();
    let mut columns = Vec::new();

    match &value {
        Value::List(pairs) | Value::Tuple(pairs) => {
            for pair in pairs {
                match pair {
                    Value::Tuple(items) | Value::List(items) if items.len() == 2 => {
                        names.push(column_name(&items[0])?);
                        columns.push(column_values(&items[1])?);
                    }
                    other => {
                        return Err(DataPrepError::DataError(format!(
                            "expected a (name, values) pair, found {:?}",
                            other
                        )))
                    }
                }
            }
        }
        Value::Dict(map) => {
            for (key, values) in map {
                names.push(hashable_name(key)?);
                columns.push(column_values(values)?);
            }
        }
        _ => {
            return Err(DataPrepError::DataError(
                "pickle does not contain a table".to_string(),
            ))
        }
    }

    if let Some(first) = columns.first() {
        let rows = first.len();
        if let Some((name, _)) = names.iter().zip(&columns).find(|(_, c)| c.len() != rows) {
            return Err(DataPrepError::DataError(format!(
                "column '{}' has a different length than the first column",
                name
            )));
        }
    }

    frame_from_cells(&names, &columns)
}

/// Write the table as a list of `(name, values)` pairs
pub(crate) fn write(df: &DataFrame, path: &Path) -> Result<()> {
    let mut pairs = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let values = series_cells(series)?.into_iter().map(to_value).collect();
        pairs.push(Value::Tuple(vec![
            Value::String(series.name().to_string()),
            Value::List(values),
        ]));
    }

    let mut writer = BufWriter::new(File::create(path)?);
    serde_pickle::value_to_writer(&mut writer, &Value::List(pairs), SerOptions::new())
        .map_err(pickle_err)?;
    Ok(())
}
