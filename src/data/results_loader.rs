use std::fs;
use std::path::Path;

use csv::ReaderBuilder;

use crate::oracle::ContingencyTable;
use crate::utils::logging::{self, FileIOType, OperationCategory};

#[derive(Debug)]
pub enum ResultsLoadError {
    IoError(std::io::Error),
    CsvError(csv::Error),
    Empty(String),
}

impl From<std::io::Error> for ResultsLoadError {
    fn from(err: std::io::Error) -> Self {
        ResultsLoadError::IoError(err)
    }
}

impl From<csv::Error> for ResultsLoadError {
    fn from(err: csv::Error) -> Self {
        ResultsLoadError::CsvError(err)
    }
}

impl std::fmt::Display for ResultsLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultsLoadError::IoError(e) => write!(f, "IO error: {}", e),
            ResultsLoadError::CsvError(e) => write!(f, "CSV error: {}", e),
            ResultsLoadError::Empty(s) => write!(f, "Results file is empty: {}", s),
        }
    }
}

impl std::error::Error for ResultsLoadError {}

/// Read a contingency-results CSV exported by a real simulation engine into a
/// raw table. This is the ingestion path for the extract-only CLI mode; the
/// in-process synthetic oracle hands its tables over directly without a file.
/// The engine writes Latin-1; the lossy decode keeps the loading columns
/// intact (headers with mangled accents still end in the element suffix the
/// extractor keys on).
pub fn load_contingency_results(path: impl AsRef<Path>) -> Result<ContingencyTable, ResultsLoadError> {
    let _timing = logging::start_timing(
        "load_contingency_results",
        OperationCategory::FileIO { subcategory: FileIOType::DataLoad },
    );

    let path = path.as_ref();
    let raw = fs::read(path)?;
    let decoded = String::from_utf8_lossy(&raw);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(decoded.as_bytes());

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.to_string())
        .collect();
    if columns.is_empty() {
        return Err(ResultsLoadError::Empty(path.display().to_string()));
    }

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        rows.push(record.iter().map(|v| v.to_string()).collect());
    }
    if rows.is_empty() {
        return Err(ResultsLoadError::Empty(path.display().to_string()));
    }

    Ok(ContingencyTable::new(columns, rows))
}
