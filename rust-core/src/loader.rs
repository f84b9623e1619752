//! CSV loading and writing.

use crate::error::LoadError;
use crate::models::{Dataset, Value};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::info;

/// Read a CSV file with a header row into a [`Dataset`].
pub fn read_csv(path: impl AsRef<Path>) -> Result<Dataset, LoadError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    let dataset = parse_csv(BufReader::new(file), path)?;
    info!(
        path = %path.display(),
        rows = dataset.len(),
        columns = dataset.columns().len(),
        "dataset loaded"
    );
    Ok(dataset)
}

fn parse_csv<R: Read>(reader: R, path: &Path) -> Result<Dataset, LoadError> {
    let parse_err = |source: csv::Error| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_reader(reader);
    let headers = reader.headers().map_err(parse_err)?.clone();
    if headers.is_empty() {
        return Err(LoadError::Empty(path.to_path_buf()));
    }
    let columns: Vec<String> = headers.iter().map(|h| h.trim().to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_err)?;
        rows.push(record.iter().map(Value::from_cell).collect());
    }
    Ok(Dataset::new(columns, rows)?)
}

/// Write a dataset as CSV with a header row. Missing cells are written empty.
pub fn write_csv(dataset: &Dataset, path: impl AsRef<Path>) -> Result<(), LoadError> {
    let path = path.as_ref();
    let write_err = |source: csv::Error| LoadError::Write {
        path: path.to_path_buf(),
        source,
    };
    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    writer.write_record(dataset.columns()).map_err(write_err)?;
    for row in dataset.rows() {
        writer
            .write_record(row.iter().map(cell_text))
            .map_err(write_err)?;
    }
    writer.flush().map_err(|e| LoadError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), rows = dataset.len(), "dataset written");
    Ok(())
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Number(v) => v.to_string(),
        Value::Text(s) => s.clone(),
        Value::Missing => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_csv() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "UDI,Type,Air temperature [K],Torque [Nm]").unwrap();
        writeln!(file, "1,M,298.1,42.8").unwrap();
        writeln!(file, "2,L,298.2,").unwrap();
        writeln!(file, "3,L,298.1,46.3").unwrap();

        let ds = read_csv(file.path()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.columns()[2], "Air temperature [K]");
        assert_eq!(ds.column_type(1), Some(ColumnType::NonNumeric));
        assert_eq!(ds.column_type(3), Some(ColumnType::Numeric));
        assert!(ds.value(1, 3).unwrap().is_missing());
    }

    #[test]
    fn test_missing_file() {
        let err = read_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[test]
    fn test_empty_file() {
        let file = NamedTempFile::new().unwrap();
        let err = read_csv(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Empty(_)));
    }

    #[test]
    fn test_ragged_file_is_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2,3").unwrap();
        let err = read_csv(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        let ds = read_csv(file.path()).unwrap();
        assert!(ds.is_empty());
        assert_eq!(ds.columns().len(), 2);
    }

    #[test]
    fn test_write_then_read() {
        let mut src = NamedTempFile::new().unwrap();
        writeln!(src, "id,v").unwrap();
        writeln!(src, "a,1.5").unwrap();
        writeln!(src, "b,").unwrap();
        let ds = read_csv(src.path()).unwrap();

        let out = NamedTempFile::new().unwrap();
        write_csv(&ds, out.path()).unwrap();
        let text = std::fs::read_to_string(out.path()).unwrap();
        assert_eq!(text, "id,v\na,1.5\nb,\n");
    }
}
