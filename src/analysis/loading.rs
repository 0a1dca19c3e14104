use tracing::debug;

use crate::config::constants::{LINE_ELEMENT_SUFFIX, PATH_SEPARATOR, STUDY_CASE_MARKER};
use crate::oracle::ContingencyTable;
use crate::utils::logging::{self, OperationCategory};

/// Cleaned loading entry for one in-scope line.
#[derive(Debug, Clone, PartialEq)]
pub struct LineLoading {
    pub line: String,
    pub loading_pct: f64,
}

#[derive(Debug)]
pub enum ExtractError {
    /// The table carried no summary row at all.
    EmptyTable,
    /// Every entry was dropped by the cleaning rules. Distinct from a clean
    /// result with low loadings: the study has nothing in scope to say.
    NoInScopeLines,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::EmptyTable => write!(f, "Contingency export contained no rows"),
            ExtractError::NoInScopeLines => {
                write!(f, "All result entries were filtered out; no in-scope lines")
            }
        }
    }
}

impl std::error::Error for ExtractError {}

/// Reduce a raw contingency export to a ranked list of in-scope line loadings.
///
/// Only the final row (the per-element maximum over all contingency cases) is
/// consumed. Entries are dropped when their value is a non-numeric placeholder,
/// when their path names a study-case container instead of a network element,
/// or when the cleaned name belongs to an excluded voltage class. The rest are
/// sorted descending by loading; the sort is stable, so equal loadings keep
/// their original column order.
pub fn extract_line_loadings(
    table: &ContingencyTable,
    excluded_voltage_classes: &[String],
) -> Result<Vec<LineLoading>, ExtractError> {
    let _timing = logging::start_timing("extract_line_loadings", OperationCategory::ResultProcessing);

    let last_row = table.last_row().ok_or(ExtractError::EmptyTable)?;

    let mut loadings: Vec<LineLoading> = Vec::new();
    for (column, raw_value) in table.columns.iter().zip(last_row.iter()) {
        let loading_pct: f64 = match raw_value.trim().parse() {
            // "NaN"/"inf" parse as f64 but would poison the sort and the
            // threshold comparisons, so they are dropped with the placeholders.
            Ok(value) if f64::is_finite(value) => value,
            // Placeholder for elements with no defined limit ("----" etc.)
            _ => continue,
        };
        if column.to_lowercase().contains(STUDY_CASE_MARKER) {
            continue;
        }
        let name = column
            .rsplit(PATH_SEPARATOR)
            .next()
            .unwrap_or(column)
            .trim_end_matches(LINE_ELEMENT_SUFFIX)
            .to_string();
        let name_lower = name.to_lowercase();
        if excluded_voltage_classes
            .iter()
            .any(|class| name_lower.contains(&class.to_lowercase()))
        {
            debug!(line = %name, "dropping excluded voltage class");
            continue;
        }
        loadings.push(LineLoading {
            line: name,
            loading_pct,
        });
    }

    if loadings.is_empty() {
        return Err(ExtractError::NoInScopeLines);
    }

    loadings.sort_by(|a, b| {
        b.loading_pct
            .partial_cmp(&a.loading_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(loadings)
}
