//! SQLite tables

use super::{frame_from_cells, CellValue};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::warn;

fn sql_err(err: rusqlite::Error) -> DataPrepError {
    DataPrepError::DataError(err.to_string())
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Read every row of `table`
pub(crate) fn read(path: &Path, table: &str) -> Result<DataFrame> {
    if !path.exists() {
        return Err(DataPrepError::DataError(format!(
            "database '{}' does not exist",
            path.display()
        )));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(sql_err)?;

    let query = format!("SELECT * FROM {}", quote_identifier(table));
    let mut stmt = conn.prepare(&query).map_err(sql_err)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); names.len()];
    let mut blobs = 0usize;
    let mut rows = stmt.query([]).map_err(sql_err)?;
    while let Some(row) = rows.next().map_err(sql_err)? {
        for (i, column) in columns.iter_mut().enumerate() {
            let cell = match row.get_ref(i).map_err(sql_err)? {
                ValueRef::Null => CellValue::Empty,
                ValueRef::Integer(v) => CellValue::Int(v),
                ValueRef::Real(v) if v.is_nan() => CellValue::Empty,
                ValueRef::Real(v) => CellValue::Float(v),
                ValueRef::Text(t) => CellValue::Text(String::from_utf8_lossy(t).into_owned()),
                ValueRef::Blob(_) => {
                    blobs += 1;
                    CellValue::Empty
                }
            };
            column.push(cell);
        }
    }

    if blobs > 0 {
        warn!(table, blobs, "binary values were read as missing");
    }

    frame_from_cells(&names, &columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_db(path: &Path) {
        let conn = Connection::open(path).unwrap();
        conn.execute_batch(
            "CREATE TABLE people (name TEXT, age INTEGER, score REAL);
             INSERT INTO people VALUES ('ana', 31, 2.5);
             INSERT INTO people VALUES ('bo', NULL, 3.0);
             INSERT INTO people VALUES (NULL, 40, NULL);",
        )
        .unwrap();
    }

    #[test]
    fn test_read_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.db");
        create_db(&path);

        let df = read(&path, "people").unwrap();
        assert_eq!(df.shape(), (3, 3));
        assert_eq!(df.column("age").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("age").unwrap().null_count(), 1);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("name").unwrap().null_count(), 1);
    }

    #[test]
    fn test_unknown_table_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("people.db");
        create_db(&path);

        assert!(read(&path, "missing").is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
