//! HDF5 groups, read as one column per one-dimensional dataset
//!
//! Needs the `hdf5` cargo feature and a system HDF5 library.

use crate::error::{DataPrepError, Result};
use polars::prelude::*;
use std::path::Path;

#[cfg(feature = "hdf5")]
pub(crate) fn read(path: &Path, key: Option<&str>) -> Result<DataFrame> {
    use super::{frame_from_cells, CellValue};
    use hdf5::types::{TypeDescriptor, VarLenAscii, VarLenUnicode};

    fn h5_err(err: hdf5::Error) -> DataPrepError {
        DataPrepError::DataError(err.to_string())
    }

    let file = hdf5::File::open(path).map_err(h5_err)?;
    let group = file.group(key.unwrap_or("/")).map_err(h5_err)?;

    let mut names = Vec::new();
    let mut columns = Vec::new();
    for name in group.member_names().map_err(h5_err)? {
        let Ok(dataset) = group.dataset(&name) else {
            continue;
        };
        if dataset.ndim() != 1 {
            tracing::warn!(dataset = %name, "skipping dataset that is not one-dimensional");
            continue;
        }

        let descriptor = dataset.dtype().and_then(|t| t.to_descriptor()).map_err(h5_err)?;
        let cells: Vec<CellValue> = match descriptor {
            TypeDescriptor::Integer(_) | TypeDescriptor::Unsigned(_) => dataset
                .read_raw::<i64>()
                .map_err(h5_err)?
                .into_iter()
                .map(CellValue::Int)
                .collect(),
            TypeDescriptor::Float(_) => dataset
                .read_raw::<f64>()
                .map_err(h5_err)?
                .into_iter()
                .map(|v| if v.is_nan() { CellValue::Empty } else { CellValue::Float(v) })
                .collect(),
            TypeDescriptor::Boolean => dataset
                .read_raw::<bool>()
                .map_err(h5_err)?
                .into_iter()
                .map(CellValue::Bool)
                .collect(),
            TypeDescriptor::VarLenUnicode => dataset
                .read_raw::<VarLenUnicode>()
                .map_err(h5_err)?
                .iter()
                .map(|s| CellValue::parse(s.as_str()))
                .collect(),
            TypeDescriptor::VarLenAscii => dataset
                .read_raw::<VarLenAscii>()
                .map_err(h5_err)?
                .iter()
                .map(|s| CellValue::parse(s.as_str()))
                .collect(),
            other => {
                tracing::warn!(dataset = %name, dtype = ?other, "skipping dataset with unsupported type");
                continue;
            }
        };

        names.push(name);
        columns.push(cells);
    }

    frame_from_cells(&names, &columns)
}

#[cfg(not(feature = "hdf5"))]
pub(crate) fn read(_path: &Path, _key: Option<&str>) -> Result<DataFrame> {
    Err(DataPrepError::UnsupportedFormat(
        "hdf5 (rebuild with `--features hdf5`)".to_string(),
    ))
}

#[cfg(all(test, not(feature = "hdf5")))]
mod tests {
    use super::*;

    #[test]
    fn test_hdf5_requires_feature() {
        let err = read(Path::new("data.h5"), None).unwrap_err();
        assert!(matches!(err, DataPrepError::UnsupportedFormat(msg) if msg.contains("--features hdf5")));
    }
}
