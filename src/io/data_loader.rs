//! Data loading and saving

use super::{excel, hdf, html, normalize, pickle, sql, stata, FileFormat};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Default number of rows used for CSV schema inference
const DEFAULT_INFER_SCHEMA_LENGTH: usize = 1000;

/// Tokens read as missing in delimited text
const NULL_TOKENS: [&str; 6] = ["", "NA", "N/A", "NaN", "nan", "null"];

/// Data loader for the supported file formats
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Table to read from SQL sources
    table: Option<String>,
    /// Group to read from HDF5 sources
    key: Option<String>,
    /// Worksheet to read from Excel sources; the first sheet when unset
    sheet: Option<String>,
    /// Rows used to infer CSV column types
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            table: None,
            key: None,
            sheet: None,
            infer_schema_length: DEFAULT_INFER_SCHEMA_LENGTH,
        }
    }

    /// Set the SQL table name
    pub fn with_table(mut self, table: Option<String>) -> Self {
        self.table = table;
        self
    }

    /// Set the HDF5 group
    pub fn with_key(mut self, key: Option<String>) -> Self {
        self.key = key;
        self
    }

    /// Set the Excel worksheet
    pub fn with_sheet(mut self, sheet: Option<String>) -> Self {
        self.sheet = sheet;
        self
    }

    /// Set the number of rows used for schema inference
    pub fn with_infer_schema_length(mut self, rows: usize) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Detect the format from the extension and load
    pub fn load(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let format = FileFormat::from_path(path)?;
        self.load_as(path, format)
    }

    /// Load `path` as `format`.
    ///
    /// Codec failures are reported as `SourceRead` naming the format. Float
    /// `NaN` is turned into null and categorical columns into plain text.
    pub fn load_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<DataFrame> {
        let path = path.as_ref();
        let start = Instant::now();

        if format == FileFormat::Sql && self.table.is_none() {
            return Err(DataPrepError::MissingParameter {
                format: format.name().to_string(),
                name: "table".to_string(),
            });
        }

        let df = self
            .read(path, format)
            .and_then(normalize)
            .map_err(|err| match err {
                DataPrepError::UnsupportedFormat(_) | DataPrepError::MissingParameter { .. } => err,
                other => DataPrepError::SourceRead {
                    format: format.name().to_string(),
                    path: path.display().to_string(),
                    cause: cause_of(other),
                },
            })?;

        info!(
            path = %path.display(),
            format = %format,
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "loaded table"
        );
        Ok(df)
    }

    fn read(&self, path: &Path, format: FileFormat) -> Result<DataFrame> {
        match format {
            FileFormat::Csv => self.load_delimited(path, b','),
            FileFormat::Tsv => self.load_delimited(path, b'\t'),
            FileFormat::Json => {
                let file = File::open(path)?;
                Ok(JsonReader::new(file)
                    .with_json_format(JsonFormat::Json)
                    .infer_schema_len(std::num::NonZeroUsize::new(self.infer_schema_length))
                    .finish()?)
            }
            FileFormat::Parquet => {
                let file = File::open(path)?;
                Ok(ParquetReader::new(file).finish()?)
            }
            FileFormat::Feather => {
                let file = File::open(path)?;
                Ok(IpcReader::new(file).finish()?)
            }
            FileFormat::Excel => excel::read(path, self.sheet.as_deref()),
            FileFormat::Pickle => pickle::read(path),
            FileFormat::Stata => stata::read(path),
            FileFormat::Html => html::read(path),
            FileFormat::Sql => {
                let table = self.table.as_deref().unwrap_or_default();
                sql::read(path, table)
            }
            FileFormat::Hdf5 => hdf::read(path, self.key.as_deref()),
        }
    }

    fn load_delimited(&self, path: &Path, separator: u8) -> Result<DataFrame> {
        let null_values = NullValues::AllColumns(NULL_TOKENS.iter().map(|t| (*t).into()).collect());
        let parse_opts = CsvParseOptions::default()
            .with_separator(separator)
            .with_null_values(Some(null_values));

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(parse_opts)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))?
            .finish()?;
        debug!(path = %path.display(), "parsed delimited text");
        Ok(df)
    }
}

/// Save tables to the writable formats
pub struct DataSaver;

impl DataSaver {
    /// Write `df` to `path` as `format`
    pub fn save(df: &mut DataFrame, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let path = path.as_ref();
        if !format.is_writable() {
            return Err(DataPrepError::UnsupportedFormat(format!(
                "{} (load-only)",
                format.name()
            )));
        }

        Self::write(df, path, format).map_err(|err| DataPrepError::SourceWrite {
            format: format.name().to_string(),
            path: path.display().to_string(),
            cause: cause_of(err),
        })?;

        info!(
            path = %path.display(),
            format = %format,
            rows = df.height(),
            cols = df.width(),
            "saved table"
        );
        Ok(())
    }

    /// Write `df` to `base` with the format's extension appended.
    ///
    /// Returns the path written.
    pub fn save_with_base(df: &mut DataFrame, base: &str, format: FileFormat) -> Result<PathBuf> {
        let path = PathBuf::from(format!("{}.{}", base, format.extension()));
        Self::save(df, &path, format)?;
        Ok(path)
    }

    fn write(df: &mut DataFrame, path: &Path, format: FileFormat) -> Result<()> {
        match format {
            FileFormat::Csv | FileFormat::Tsv => {
                let separator = if format == FileFormat::Tsv { b'\t' } else { b',' };
                let mut file = File::create(path)?;
                CsvWriter::new(&mut file)
                    .include_header(true)
                    .with_separator(separator)
                    .finish(df)?;
                Ok(())
            }
            FileFormat::Json => {
                let mut file = File::create(path)?;
                JsonWriter::new(&mut file)
                    .with_json_format(JsonFormat::Json)
                    .finish(df)?;
                Ok(())
            }
            FileFormat::Parquet => {
                let file = File::create(path)?;
                ParquetWriter::new(file).finish(df)?;
                Ok(())
            }
            FileFormat::Feather => {
                let mut file = File::create(path)?;
                IpcWriter::new(&mut file).finish(df)?;
                Ok(())
            }
            FileFormat::Excel => excel::write(df, path),
            FileFormat::Pickle => pickle::write(df, path),
            FileFormat::Stata => stata::write(df, path),
            FileFormat::Html => html::write(df, path),
            FileFormat::Sql | FileFormat::Hdf5 => {
                Err(DataPrepError::UnsupportedFormat(format.name().to_string()))
            }
        }
    }
}

/// Innermost message of a codec error, without the outer variant prefix
fn cause_of(err: DataPrepError) -> String {
    match err {
        DataPrepError::DataError(msg) => msg,
        DataPrepError::IoError(e) => e.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn sample_df() -> DataFrame {
        df!(
            "age" => &[Some(25.0), None, Some(30.0)],
            "city" => &[Some("Paris"), Some("Lyon"), None]
        )
        .unwrap()
    }

    #[test]
    fn test_load_csv_with_missing_tokens() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "age,city").unwrap();
        writeln!(file, "25,Paris").unwrap();
        writeln!(file, "NaN,").unwrap();
        writeln!(file, "30,NA").unwrap();

        let df = DataLoader::new().load(file.path()).unwrap();
        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.column("age").unwrap().null_count(), 1);
        assert_eq!(df.column("city").unwrap().null_count(), 2);
    }

    #[test]
    fn test_csv_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut df = sample_df();

        let path = DataSaver::save_with_base(
            &mut df,
            dir.path().join("out").to_str().unwrap(),
            FileFormat::Csv,
        )
        .unwrap();
        assert!(path.to_string_lossy().ends_with("out.csv"));

        let loaded = DataLoader::new().load(&path).unwrap();
        assert_eq!(loaded.shape(), (3, 2));
        assert_eq!(loaded.column("age").unwrap().null_count(), 1);
        assert_eq!(loaded.column("city").unwrap().null_count(), 1);
    }

    #[test]
    fn test_sql_requires_table() {
        let err = DataLoader::new().load("data.db").unwrap_err();
        assert!(matches!(
            err,
            DataPrepError::MissingParameter { ref name, .. } if name == "table"
        ));
    }

    #[test]
    fn test_save_load_only_format_rejected() {
        let dir = TempDir::new().unwrap();
        let mut df = sample_df();
        let err = DataSaver::save(&mut df, dir.path().join("x.db"), FileFormat::Sql).unwrap_err();
        assert!(matches!(err, DataPrepError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_corrupt_parquet_names_format() {
        let mut file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        file.write_all(b"this is not parquet").unwrap();

        let err = DataLoader::new().load(file.path()).unwrap_err();
        match err {
            DataPrepError::SourceRead { format, .. } => assert_eq!(format, "parquet"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
