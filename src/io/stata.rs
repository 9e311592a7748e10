//! Stata `.dta` files
//!
//! Writes format 114 in little-endian byte order. Reads formats 113, 114 and
//! 115 in either byte order. Value labels and `strL` are not supported.

use super::{frame_from_cells, series_cells, CellValue};
use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use std::collections::HashSet;
use std::path::Path;

const FORMAT_114: u8 = 114;
const BYTE_ORDER_HILO: u8 = 1;
const BYTE_ORDER_LOHI: u8 = 2;

const TYPE_BYTE: u8 = 251;
const TYPE_INT: u8 = 252;
const TYPE_LONG: u8 = 253;
const TYPE_FLOAT: u8 = 254;
const TYPE_DOUBLE: u8 = 255;
const MAX_STR_WIDTH: usize = 244;

const NAME_LEN: usize = 33;
const LABEL_LEN: usize = 81;
const TIMESTAMP_LEN: usize = 18;
const FORMAT_LEN: usize = 49;
const FORMAT_LEN_113: usize = 12;
const MAX_NAME_CHARS: usize = 32;

// Largest non-missing values per storage type
const MAX_BYTE: i8 = 100;
const MAX_INT: i16 = 32_740;
const MAX_LONG: i32 = 2_147_483_620;
const MAX_FLOAT: f32 = 1.701_411_7e38;
const MAX_DOUBLE: f64 = 8.988_465_674_311_579e307;

const MISSING_BYTE: i8 = 101;
const MISSING_LONG: i32 = 2_147_483_621;
const MISSING_DOUBLE_BITS: u64 = 0x7fe0_0000_0000_0000;

// ─── Writing ──────────────────────────────────────────────────────────────────

/// How one column is stored
enum StataColumn {
    Long(Vec<Option<i32>>),
    Double(Vec<Option<f64>>),
    Byte(Vec<Option<i8>>),
    Str(usize, Vec<Option<String>>),
}

impl StataColumn {
    fn type_code(&self) -> u8 {
        match self {
            StataColumn::Long(_) => TYPE_LONG,
            StataColumn::Double(_) => TYPE_DOUBLE,
            StataColumn::Byte(_) => TYPE_BYTE,
            StataColumn::Str(width, _) => *width as u8,
        }
    }

    fn display_format(&self) -> String {
        match self {
            StataColumn::Long(_) => "%12.0g".to_string(),
            StataColumn::Double(_) => "%10.0g".to_string(),
            StataColumn::Byte(_) => "%8.0g".to_string(),
            StataColumn::Str(width, _) => format!("%{}s", width),
        }
    }

    fn from_cells(name: &str, cells: Vec<CellValue>) -> Result<Self> {
        let fits_long = |v: i64| v > -(MAX_LONG as i64) && v <= MAX_LONG as i64;

        if cells.iter().all(|c| matches!(c, CellValue::Empty | CellValue::Int(_)))
            && cells.iter().all(|c| !matches!(c, CellValue::Int(v) if !fits_long(*v)))
            && cells.iter().any(|c| matches!(c, CellValue::Int(_)))
        {
            let values = cells
                .iter()
                .map(|c| match c {
                    CellValue::Int(v) => Some(*v as i32),
                    _ => None,
                })
                .collect();
            return Ok(StataColumn::Long(values));
        }

        if cells
            .iter()
            .all(|c| matches!(c, CellValue::Empty | CellValue::Int(_) | CellValue::Float(_)))
        {
            let values = cells
                .iter()
                .map(|c| match c {
                    CellValue::Int(v) => Some(*v as f64),
                    CellValue::Float(v) => Some(*v),
                    _ => None,
                })
                .collect();
            return Ok(StataColumn::Double(values));
        }

        if cells.iter().all(|c| matches!(c, CellValue::Empty | CellValue::Bool(_))) {
            let values = cells
                .iter()
                .map(|c| match c {
                    CellValue::Bool(v) => Some(*v as i8),
                    _ => None,
                })
                .collect();
            return Ok(StataColumn::Byte(values));
        }

        let values: Vec<Option<String>> = cells.iter().map(CellValue::render).collect();
        let width = values
            .iter()
            .flatten()
            .map(|s| s.len())
            .max()
            .unwrap_or(1)
            .max(1);
        if width > MAX_STR_WIDTH {
            return Err(DataPrepError::DataError(format!(
                "column '{}' holds text longer than {} bytes",
                name, MAX_STR_WIDTH
            )));
        }
        Ok(StataColumn::Str(width, values))
    }
}

/// Turn a column name into a valid, unique Stata variable name
fn sanitize_name(name: &str, taken: &mut HashSet<String>) -> String {
    let base = base_name(name);
    let mut candidate = base.clone();
    let mut suffix = 1;
    while taken.contains(&candidate) {
        let tail = format!("_{}", suffix);
        let keep = MAX_NAME_CHARS.saturating_sub(tail.len()).min(base.len());
        candidate = format!("{}{}", &base[..keep], tail);
        suffix += 1;
    }
    taken.insert(candidate.clone());
    candidate
}

fn base_name(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() || cleaned.starts_with(|c: char| c.is_ascii_digit()) {
        cleaned.insert(0, '_');
    }
    cleaned.truncate(MAX_NAME_CHARS);
    cleaned
}

/// Text padded with zeros to `width`, cut to at most `max_len` bytes
fn put_padded(buf: &mut Vec<u8>, text: &str, max_len: usize, width: usize) {
    let mut end = text.len().min(max_len);
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    buf.extend_from_slice(&text.as_bytes()[..end]);
    buf.resize(buf.len() + width - end, 0);
}

/// Null-terminated text in a fixed-width field
fn put_fixed(buf: &mut Vec<u8>, text: &str, width: usize) {
    put_padded(buf, text, width - 1, width);
}

/// Write the table as a format 114 dataset
pub(crate) fn write(df: &DataFrame, path: &Path) -> Result<()> {
    let nvar = u16::try_from(df.width())
        .map_err(|_| DataPrepError::DataError("too many columns for a .dta file".to_string()))?;
    let nobs = u32::try_from(df.height())
        .map_err(|_| DataPrepError::DataError("too many rows for a .dta file".to_string()))?;

    let mut taken = HashSet::new();
    let mut names = Vec::with_capacity(df.width());
    let mut labels = Vec::with_capacity(df.width());
    let mut columns = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let original = series.name().to_string();
        names.push(sanitize_name(&original, &mut taken));
        columns.push(StataColumn::from_cells(&original, series_cells(series)?)?);
        labels.push(original);
    }

    let mut buf = Vec::new();

    // header
    buf.extend_from_slice(&[FORMAT_114, BYTE_ORDER_LOHI, 1, 0]);
    buf.extend_from_slice(&nvar.to_le_bytes());
    buf.extend_from_slice(&nobs.to_le_bytes());
    put_fixed(&mut buf, "Written by dataprep", LABEL_LEN);
    let stamp = chrono::Local::now().format("%d %b %Y %H:%M").to_string();
    put_fixed(&mut buf, &stamp, TIMESTAMP_LEN);

    // descriptors
    buf.extend(columns.iter().map(StataColumn::type_code));
    for name in &names {
        put_fixed(&mut buf, name, NAME_LEN);
    }
    buf.resize(buf.len() + 2 * (names.len() + 1), 0);
    for column in &columns {
        put_fixed(&mut buf, &column.display_format(), FORMAT_LEN);
    }
    buf.resize(buf.len() + NAME_LEN * names.len(), 0);

    for label in &labels {
        put_fixed(&mut buf, label, LABEL_LEN);
    }

    // no expansion fields
    buf.extend_from_slice(&[0u8; 5]);

    for row in 0..df.height() {
        for column in &columns {
            match column {
                StataColumn::Long(values) => {
                    let v = values[row].unwrap_or(MISSING_LONG);
                    buf.extend_from_slice(&v.to_le_bytes());
                }
                StataColumn::Double(values) => {
                    let bits = values[row]
                        .filter(|v| v.is_finite() && v.abs() <= MAX_DOUBLE)
                        .map_or(MISSING_DOUBLE_BITS, f64::to_bits);
                    buf.extend_from_slice(&bits.to_le_bytes());
                }
                StataColumn::Byte(values) => {
                    let v = values[row].unwrap_or(MISSING_BYTE);
                    buf.push(v as u8);
                }
                StataColumn::Str(width, values) => {
                    put_padded(&mut buf, values[row].as_deref().unwrap_or(""), *width, *width);
                }
            }
        }
    }

    std::fs::write(path, buf)?;
    Ok(())
}

// ─── Reading ──────────────────────────────────────────────────────────────────

/// Cursor over the file bytes with the dataset's byte order
struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
    little_endian: bool,
}

impl<'a> ByteReader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| DataPrepError::DataError("unexpected end of .dta file".to_string()))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16> {
        let b = self.array::<2>()?;
        Ok(if self.little_endian { u16::from_le_bytes(b) } else { u16::from_be_bytes(b) })
    }

    fn i16(&mut self) -> Result<i16> {
        let b = self.array::<2>()?;
        Ok(if self.little_endian { i16::from_le_bytes(b) } else { i16::from_be_bytes(b) })
    }

    fn u32(&mut self) -> Result<u32> {
        let b = self.array::<4>()?;
        Ok(if self.little_endian { u32::from_le_bytes(b) } else { u32::from_be_bytes(b) })
    }

    fn i32(&mut self) -> Result<i32> {
        let b = self.array::<4>()?;
        Ok(if self.little_endian { i32::from_le_bytes(b) } else { i32::from_be_bytes(b) })
    }

    fn f32(&mut self) -> Result<f32> {
        let b = self.array::<4>()?;
        Ok(if self.little_endian { f32::from_le_bytes(b) } else { f32::from_be_bytes(b) })
    }

    fn f64(&mut self) -> Result<f64> {
        let b = self.array::<8>()?;
        Ok(if self.little_endian { f64::from_le_bytes(b) } else { f64::from_be_bytes(b) })
    }

    /// Null-terminated text in a fixed-width field
    fn fixed_str(&mut self, width: usize) -> Result<String> {
        let raw = self.take(width)?;
        let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
        Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
    }
}

fn read_cell(reader: &mut ByteReader<'_>, type_code: u8) -> Result<CellValue> {
    let cell = match type_code {
        TYPE_BYTE => {
            let v = reader.u8()? as i8;
            if v > MAX_BYTE { CellValue::Empty } else { CellValue::Int(v as i64) }
        }
        TYPE_INT => {
            let v = reader.i16()?;
            if v > MAX_INT { CellValue::Empty } else { CellValue::Int(v as i64) }
        }
        TYPE_LONG => {
            let v = reader.i32()?;
            if v > MAX_LONG { CellValue::Empty } else { CellValue::Int(v as i64) }
        }
        TYPE_FLOAT => {
            let v = reader.f32()?;
            if v.is_nan() || v > MAX_FLOAT { CellValue::Empty } else { CellValue::Float(v as f64) }
        }
        TYPE_DOUBLE => {
            let v = reader.f64()?;
            if v.is_nan() || v > MAX_DOUBLE { CellValue::Empty } else { CellValue::Float(v) }
        }
        width @ 1..=244 => {
            let s = reader.fixed_str(width as usize)?;
            if s.is_empty() { CellValue::Empty } else { CellValue::Text(s) }
        }
        other => {
            return Err(DataPrepError::DataError(format!(
                "unsupported variable type code {}",
                other
            )))
        }
    };
    Ok(cell)
}

/// Read a format 113, 114 or 115 dataset.
///
/// A variable label is used as the column name when it sanitizes to the
/// variable name, which restores names changed on write.
pub(crate) fn read(path: &Path) -> Result<DataFrame> {
    let bytes = std::fs::read(path)?;
    let mut reader = ByteReader { buf: &bytes, pos: 0, little_endian: true };

    let version = reader.u8()?;
    if !(113..=115).contains(&version) {
        return Err(DataPrepError::DataError(format!(
            "unsupported .dta format {}, expected 113 to 115",
            version
        )));
    }
    reader.little_endian = match reader.u8()? {
        BYTE_ORDER_LOHI => true,
        BYTE_ORDER_HILO => false,
        other => {
            return Err(DataPrepError::DataError(format!("invalid byte order flag {}", other)))
        }
    };
    reader.take(2)?;
    let nvar = reader.u16()? as usize;
    let nobs = reader.u32()? as usize;
    reader.take(LABEL_LEN + TIMESTAMP_LEN)?;

    let types = reader.take(nvar)?.to_vec();
    let names = (0..nvar)
        .map(|_| reader.fixed_str(NAME_LEN))
        .collect::<Result<Vec<_>>>()?;
    reader.take(2 * (nvar + 1))?;
    let fmt_len = if version == 113 { FORMAT_LEN_113 } else { FORMAT_LEN };
    reader.take(fmt_len * nvar)?;
    reader.take(NAME_LEN * nvar)?;
    let labels = (0..nvar)
        .map(|_| reader.fixed_str(LABEL_LEN))
        .collect::<Result<Vec<_>>>()?;

    loop {
        let kind = reader.u8()?;
        let len = reader.u32()? as usize;
        if kind == 0 {
            break;
        }
        reader.take(len)?;
    }

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::with_capacity(nobs); nvar];
    for _ in 0..nobs {
        for (column, type_code) in columns.iter_mut().zip(&types) {
            column.push(read_cell(&mut reader, *type_code)?);
        }
    }

    let names: Vec<String> = names
        .into_iter()
        .zip(labels)
        .map(|(name, label)| {
            if !label.is_empty() && base_name(&label) == name {
                label
            } else {
                name
            }
        })
        .collect();

    frame_from_cells(&names, &columns)
}
