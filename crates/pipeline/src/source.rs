//! CSV input.
//!
//! Every row becomes a [`RawRecord`] keyed by the (trimmed) header names.
//! Values are trimmed strings; empty cells become `null` so validators see
//! them as absent.

use std::io;
use std::path::{Path, PathBuf};

use libris_core::types::RawRecord;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("cannot open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed CSV in {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Read every row of the CSV file at `path`.
pub fn read_file(path: &Path) -> Result<Vec<RawRecord>, SourceError> {
    let file = std::fs::File::open(path).map_err(|e| SourceError::Open {
        path: path.to_path_buf(),
        source: csv::Error::from(e),
    })?;
    read_records(file).map_err(|source| SourceError::Malformed {
        path: path.to_path_buf(),
        source,
    })
}

/// Read every row from any CSV reader.
pub fn read_records<R: io::Read>(reader: R) -> Result<Vec<RawRecord>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(header, value)| (header.to_string(), cell(value)))
            .collect();
        records.push(record);
    }
    Ok(records)
}

fn cell(value: &str) -> Value {
    if value.is_empty() {
        Value::Null
    } else {
        Value::String(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn cells_are_trimmed_and_empty_is_null() {
        let csv = "name , phone,contact_email\n  Central Library ,, desk@central.org \n";
        let records = read_records(csv.as_bytes()).unwrap();

        assert_eq!(records.len(), 1);
        let row = &records[0];
        assert_eq!(row["name"], Value::String("Central Library".into()));
        assert_eq!(row["phone"], Value::Null);
        assert_eq!(row["contact_email"], Value::String("desk@central.org".into()));
    }

    #[test]
    fn quoted_commas_stay_in_one_cell() {
        let csv = "title,authors\n\"Programming, Second Edition\",\"1;2\"\n";
        let records = read_records(csv.as_bytes()).unwrap();
        assert_eq!(records[0]["title"], Value::String("Programming, Second Edition".into()));
        assert_eq!(records[0]["authors"], Value::String("1;2".into()));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let csv = "a,b\n1,2,3\n";
        assert!(read_records(csv.as_bytes()).is_err());
    }

    #[test]
    fn missing_file_reports_path() {
        let err = read_file(Path::new("/nonexistent/libraries.csv")).unwrap_err();
        assert_matches!(err, SourceError::Open { .. });
        assert!(err.to_string().contains("libraries.csv"));
    }
}
