use crate::config::SourceConfig;
use crate::error::{EtlError, Result};
use crate::pipeline::ingestion::fingerprint::source_sha256;
use csv::ReaderBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// The source file as read: header plus data rows, untouched
#[derive(Debug, Clone)]
pub struct RawTable {
    /// Column names from the header row, trimmed
    pub headers: Vec<String>,
    /// Each data row, one string per column, in file order
    pub rows: Vec<Vec<String>>,
    /// Where the rows came from
    pub path: PathBuf,
    /// SHA-256 of the source bytes
    pub source_sha256: String,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Read the configured source file into a [`RawTable`].
#[instrument(skip(source), fields(path = %source.path.display()))]
pub fn extract(source: &SourceConfig) -> Result<RawTable> {
    let bytes = fs::read(&source.path).map_err(|e| EtlError::SourceRead {
        path: source.path.clone(),
        row: None,
        message: e.to_string(),
    })?;
    let table = extract_from_bytes(&bytes, source.delimiter, &source.path)?;
    info!(
        rows = table.len(),
        columns = table.headers.len(),
        sha256 = %table.source_sha256,
        "Extracted source"
    );
    Ok(table)
}

/// Parse delimited bytes. Rows with a different number of cells than the
/// header are rejected rather than padded.
pub fn extract_from_bytes(bytes: &[u8], delimiter: char, path: &Path) -> Result<RawTable> {
    let delimiter = u8::try_from(delimiter).map_err(|_| EtlError::SourceRead {
        path: path.to_path_buf(),
        row: None,
        message: format!("delimiter '{delimiter}' is not a single byte"),
    })?;

    let mut rdr = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let read_error = |e: csv::Error| EtlError::SourceRead {
        path: path.to_path_buf(),
        // csv counts the header as record 0
        row: e
            .position()
            .and_then(|p| (p.record() as usize).checked_sub(1)),
        message: e.to_string(),
    };

    let headers: Vec<String> = rdr
        .headers()
        .map_err(read_error)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    if headers.iter().all(String::is_empty) {
        return Err(EtlError::SourceRead {
            path: path.to_path_buf(),
            row: None,
            message: "no header row".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(read_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!("Parsed {} data rows from {}", rows.len(), path.display());

    Ok(RawTable {
        headers,
        rows,
        path: path.to_path_buf(),
        source_sha256: source_sha256(bytes),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn keeps_rows_and_columns_verbatim() {
        let content = " user_id ,day,extra\n1, 2024-01-01 ,x\n2,,y\n";
        let table = extract_from_bytes(content.as_bytes(), ',', Path::new("mem.csv")).unwrap();

        assert_eq!(table.headers, vec!["user_id", "day", "extra"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0], vec!["1", " 2024-01-01 ", "x"]);
        assert_eq!(table.rows[1], vec!["2", "", "y"]);
    }

    #[test]
    fn honours_delimiter() {
        let content = "user_id;day\n1;2024-01-01\n";
        let table = extract_from_bytes(content.as_bytes(), ';', Path::new("mem.csv")).unwrap();
        assert_eq!(table.headers, vec!["user_id", "day"]);
        assert_eq!(table.rows[0], vec!["1", "2024-01-01"]);
    }

    #[test]
    fn ragged_row_is_a_source_read_error() {
        let content = "a,b,c\n1,2,3\n4,5\n";
        let err = extract_from_bytes(content.as_bytes(), ',', Path::new("ragged.csv")).unwrap_err();
        match err {
            EtlError::SourceRead { row, path, .. } => {
                assert!(row.is_some());
                assert_eq!(path, PathBuf::from("ragged.csv"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_source_is_a_source_read_error() {
        for content in ["", "\n"] {
            let err =
                extract_from_bytes(content.as_bytes(), ',', Path::new("empty.csv")).unwrap_err();
            assert!(matches!(err, EtlError::SourceRead { row: None, .. }), "{content:?}");
        }
    }

    #[test]
    fn missing_file_is_a_source_read_error() {
        let source = SourceConfig {
            path: PathBuf::from("/definitely/not/here.csv"),
            ..SourceConfig::default()
        };
        assert!(matches!(extract(&source), Err(EtlError::SourceRead { row: None, .. })));
    }

    #[test]
    fn reads_from_disk() -> anyhow::Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "user_id,project_id")?;
        writeln!(file, "1,10")?;
        let source = SourceConfig {
            path: file.path().to_path_buf(),
            ..SourceConfig::default()
        };
        let table = extract(&source)?;
        assert_eq!(table.rows, vec![vec!["1".to_string(), "10".to_string()]]);
        assert_eq!(table.source_sha256.len(), 64);
        Ok(())
    }
}
