use std::fs::File;

use csv::ReaderBuilder;
use tracing::debug;

use crate::oracle::synthetic::SyntheticBus;
use crate::utils::logging::{self, FileIOType, OperationCategory};

#[derive(Debug)]
pub enum SubstationLoadError {
    IoError(std::io::Error),
    CsvError(csv::Error),
    MissingField(String),
    InvalidNumber(String),
}

impl From<std::io::Error> for SubstationLoadError {
    fn from(err: std::io::Error) -> Self {
        SubstationLoadError::IoError(err)
    }
}

impl From<csv::Error> for SubstationLoadError {
    fn from(err: csv::Error) -> Self {
        SubstationLoadError::CsvError(err)
    }
}

impl std::fmt::Display for SubstationLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubstationLoadError::IoError(e) => write!(f, "IO error: {}", e),
            SubstationLoadError::CsvError(e) => write!(f, "CSV error: {}", e),
            SubstationLoadError::MissingField(s) => write!(f, "Missing field: {}", s),
            SubstationLoadError::InvalidNumber(s) => write!(f, "Invalid number: {}", s),
        }
    }
}

impl std::error::Error for SubstationLoadError {}

fn parse_field(record: &csv::StringRecord, index: usize, name: &str) -> Result<String, SubstationLoadError> {
    record
        .get(index)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SubstationLoadError::MissingField(name.to_string()))
}

fn parse_number(value: &str, name: &str) -> Result<f64, SubstationLoadError> {
    value
        .parse()
        .map_err(|_| SubstationLoadError::InvalidNumber(format!("{}: '{}'", name, value)))
}

/// Load the substation worklist with its synthetic-network parameters from a
/// CSV file with columns `substation,critical_line,base_loading_pct,
/// sensitivity_pct_per_mw`. Order is preserved; it becomes the report order.
pub fn load_substations(path: &str) -> Result<Vec<SyntheticBus>, SubstationLoadError> {
    let _timing = logging::start_timing(
        "load_substations",
        OperationCategory::FileIO { subcategory: FileIOType::DataLoad },
    );

    let file = File::open(path)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut buses = Vec::new();
    for result in reader.records() {
        let record = result?;
        let name = parse_field(&record, 0, "substation")?;
        let critical_line = parse_field(&record, 1, "critical_line")?;
        let base_loading = parse_number(&parse_field(&record, 2, "base_loading_pct")?, "base_loading_pct")?;
        let sensitivity = parse_number(
            &parse_field(&record, 3, "sensitivity_pct_per_mw")?,
            "sensitivity_pct_per_mw",
        )?;
        debug!(substation = %name, base_loading, sensitivity, "loaded substation");
        buses.push(SyntheticBus::new(name, critical_line, base_loading, sensitivity));
    }

    Ok(buses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "hostcap_substations_{}_{}.csv",
            std::process::id(),
            contents.len()
        ));
        let mut file = File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_rows_in_order() {
        let path = write_temp(
            "substation,critical_line,base_loading_pct,sensitivity_pct_per_mw\n\
             Alpha 110,Alpha - Beta 1,62.5,4.0\n\
             Beta 220,Beta - Gamma 2,55.0,2.5\n",
        );
        let buses = load_substations(path.to_str().unwrap()).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(buses.len(), 2);
        assert_eq!(buses[0].name, "Alpha 110");
        assert_eq!(buses[1].critical_line, "Beta - Gamma 2");
        assert!((buses[1].sensitivity_pct_per_mw - 2.5).abs() < 1e-9);
    }

    #[test]
    fn bad_number_is_reported() {
        let path = write_temp(
            "substation,critical_line,base_loading_pct,sensitivity_pct_per_mw\n\
             Alpha 110,Alpha - Beta 1,not-a-number,4.0\n",
        );
        let result = load_substations(path.to_str().unwrap());
        std::fs::remove_file(&path).ok();
        assert!(matches!(result, Err(SubstationLoadError::InvalidNumber(_))));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(
            load_substations("/nonexistent/substations.csv"),
            Err(SubstationLoadError::IoError(_))
        ));
    }
}
