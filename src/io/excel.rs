//! Excel workbooks: calamine for reading, rust_xlsxwriter for writing

use super::{frame_from_cells, series_cells, CellValue};
use crate::error::{DataPrepError, Result};
use calamine::{open_workbook_auto, Data, Reader};
use polars::prelude::*;
use rust_xlsxwriter::Workbook;
use std::path::Path;

/// Largest row count a worksheet holds, header included
const MAX_ROWS: usize = 1_048_576;
/// Largest column count a worksheet holds
const MAX_COLS: usize = 16_384;

/// Integral floats up to this magnitude are read back as integers
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

fn xlsx_err(err: impl std::fmt::Display) -> DataPrepError {
    DataPrepError::DataError(err.to_string())
}

fn cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::Int(v) => CellValue::Int(*v),
        Data::Float(v) if v.is_nan() => CellValue::Empty,
        Data::Float(v) if v.fract() == 0.0 && v.abs() <= MAX_EXACT_INT => CellValue::Int(*v as i64),
        Data::Float(v) => CellValue::Float(*v),
        Data::Bool(v) => CellValue::Bool(*v),
        Data::String(s) if s.is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        other => CellValue::Text(other.to_string()),
    }
}

/// Read one worksheet; the first row holds the column names
pub(crate) fn read(path: &Path, sheet: Option<&str>) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto(path).map_err(xlsx_err)?;

    let sheet_name = match sheet {
        Some(name) => name.to_string(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DataPrepError::DataError("workbook has no worksheets".to_string()))?,
    };
    let range = workbook.worksheet_range(&sheet_name).map_err(xlsx_err)?;

    let mut rows = range.rows();
    let names: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("Unnamed: {}", i),
                other => other.to_string(),
            })
            .collect(),
        None => return Ok(DataFrame::empty()),
    };

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (i, column) in columns.iter_mut().enumerate() {
            column.push(row.get(i).map_or(CellValue::Empty, cell_value));
        }
    }

    frame_from_cells(&names, &columns)
}

/// Write the table to the first worksheet with a header row
pub(crate) fn write(df: &DataFrame, path: &Path) -> Result<()> {
    if df.height() + 1 > MAX_ROWS || df.width() > MAX_COLS {
        return Err(DataPrepError::DataError(format!(
            "{} rows x {} columns exceeds the worksheet limits",
            df.height(),
            df.width()
        )));
    }

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col_idx, column) in df.get_columns().iter().enumerate() {
        let col = col_idx as u16;
        let series = column.as_materialized_series();
        worksheet
            .write_string(0, col, series.name().as_str())
            .map_err(xlsx_err)?;

        for (row_idx, cell) in series_cells(series)?.into_iter().enumerate() {
            let row = row_idx as u32 + 1;
            match cell {
                CellValue::Empty => {}
                CellValue::Int(v) => {
                    worksheet.write_number(row, col, v as f64).map_err(xlsx_err)?;
                }
                CellValue::Float(v) => {
                    worksheet.write_number(row, col, v).map_err(xlsx_err)?;
                }
                CellValue::Bool(v) => {
                    worksheet.write_boolean(row, col, v).map_err(xlsx_err)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(row, col, s).map_err(xlsx_err)?;
                }
            }
        }
    }

    workbook.save(path).map_err(xlsx_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_excel_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.xlsx");
        let df = df!(
            "id" => &[1i64, 2, 3],
            "score" => &[Some(1.5), None, Some(3.25)],
            "city" => &[Some("Paris"), None, Some("Lyon")]
        )
        .unwrap();

        write(&df, &path).unwrap();
        let loaded = read(&path, None).unwrap();

        assert_eq!(loaded.shape(), (3, 3));
        assert_eq!(loaded.column("id").unwrap().dtype(), &DataType::Int64);
        assert_eq!(loaded.column("score").unwrap().null_count(), 1);
        assert_eq!(loaded.column("city").unwrap().null_count(), 1);
        let city = loaded.column("city").unwrap().str().unwrap().get(2);
        assert_eq!(city, Some("Lyon"));
    }

    #[test]
    fn test_cell_value_integral_float() {
        assert_eq!(cell_value(&Data::Float(4.0)), CellValue::Int(4));
        assert_eq!(cell_value(&Data::Float(4.5)), CellValue::Float(4.5));
        assert_eq!(cell_value(&Data::String(String::new())), CellValue::Empty);
    }
}
