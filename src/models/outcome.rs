use serde::{Deserialize, Serialize};

/// Terminal result of one substation's capacity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SearchStatus {
    /// A line exceeded the overload threshold; the last safe power level is recorded.
    Completed {
        max_safe_power_mw: f64,
        critical_line: String,
        max_loading_pct: f64,
    },
    /// The iteration ceiling was reached without any line exceeding the threshold.
    CeilingReached {
        power_mw: f64,
        critical_line: String,
        max_loading_pct: f64,
    },
    /// The injection bus could not be located in the network model.
    SubstationNotFound,
    /// The target network sheet could not be located.
    SheetNotFound,
    /// Every result entry was filtered out; the study scope is empty, which is
    /// distinct from "no overload".
    NoInScopeLines,
    /// The oracle kept failing (non-convergence, malformed export) past the retry budget.
    OracleFailed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub substation: String,
    pub status: SearchStatus,
}

impl SearchOutcome {
    pub fn new(substation: impl Into<String>, status: SearchStatus) -> Self {
        Self {
            substation: substation.into(),
            status,
        }
    }

    /// Maximum safe power in MW, when the search produced one.
    pub fn max_power_mw(&self) -> Option<f64> {
        match &self.status {
            SearchStatus::Completed { max_safe_power_mw, .. } => Some(*max_safe_power_mw),
            SearchStatus::CeilingReached { power_mw, .. } => Some(*power_mw),
            _ => None,
        }
    }

    pub fn critical_line(&self) -> Option<&str> {
        match &self.status {
            SearchStatus::Completed { critical_line, .. }
            | SearchStatus::CeilingReached { critical_line, .. } => Some(critical_line),
            _ => None,
        }
    }

    pub fn max_loading_pct(&self) -> Option<f64> {
        match &self.status {
            SearchStatus::Completed { max_loading_pct, .. }
            | SearchStatus::CeilingReached { max_loading_pct, .. } => Some(*max_loading_pct),
            _ => None,
        }
    }

    /// Short status label used in the report table and CSV export.
    pub fn status_label(&self) -> &'static str {
        match &self.status {
            SearchStatus::Completed { .. } => "completed",
            SearchStatus::CeilingReached { .. } => "ceiling reached",
            SearchStatus::SubstationNotFound => "substation not found",
            SearchStatus::SheetNotFound => "sheet not found",
            SearchStatus::NoInScopeLines => "no in-scope lines",
            SearchStatus::OracleFailed(_) => "oracle failed",
        }
    }
}
