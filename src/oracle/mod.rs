pub mod synthetic;

use crate::config::constants::{
    CONTINGENCY_MAX_LOADING_PCT, CONTINGENCY_VOLTAGE_MAX_PU, CONTINGENCY_VOLTAGE_MIN_PU,
    CONTINGENCY_VOLTAGE_STEP_LIMIT,
};
use crate::models::generator::GeneratorSetting;

/// Options passed to the N-1 contingency study.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyOptions {
    pub include_linearization: bool,
    pub max_loading_percent: f64,
    pub voltage_min: f64,
    pub voltage_max: f64,
    pub voltage_step_limit: u32,
}

impl Default for ContingencyOptions {
    fn default() -> Self {
        Self {
            include_linearization: false,
            max_loading_percent: CONTINGENCY_MAX_LOADING_PCT,
            voltage_min: CONTINGENCY_VOLTAGE_MIN_PU,
            voltage_max: CONTINGENCY_VOLTAGE_MAX_PU,
            voltage_step_limit: CONTINGENCY_VOLTAGE_STEP_LIMIT,
        }
    }
}

/// Raw tabular contingency export: rows are contingency cases, columns are
/// network elements, and the final row holds the maximum loading of each
/// element across all cases. Values stay as strings because elements without
/// a defined limit carry a non-numeric placeholder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContingencyTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ContingencyTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// The maximum-over-all-contingencies summary row.
    pub fn last_row(&self) -> Option<&[String]> {
        self.rows.last().map(|row| row.as_slice())
    }
}

/// Opaque handle to a generator injection created in the external network model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionHandle {
    pub substation: String,
    pub id: u64,
}

#[derive(Debug)]
pub enum OracleError {
    SubstationNotFound(String),
    SheetNotFound(String),
    /// The simulation failed to reach a stable solution. Transient; retry.
    NonConvergent,
    /// The result export could not be interpreted.
    MalformedResults(String),
    StaleHandle(String),
    IoError(std::io::Error),
}

impl From<std::io::Error> for OracleError {
    fn from(err: std::io::Error) -> Self {
        OracleError::IoError(err)
    }
}

impl std::fmt::Display for OracleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OracleError::SubstationNotFound(s) => write!(f, "Substation not found: {}", s),
            OracleError::SheetNotFound(s) => write!(f, "Network sheet not found: {}", s),
            OracleError::NonConvergent => write!(f, "Simulation did not converge"),
            OracleError::MalformedResults(s) => write!(f, "Malformed simulation results: {}", s),
            OracleError::StaleHandle(s) => write!(f, "Stale injection handle: {}", s),
            OracleError::IoError(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for OracleError {}

impl OracleError {
    /// Transient failures are worth retrying with the same setting; the rest
    /// terminate the substation's search immediately.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OracleError::NonConvergent | OracleError::MalformedResults(_)
        )
    }
}

/// The external power-system simulation engine, reduced to the calls the
/// capacity search needs. All calls are blocking and side-effecting; the
/// search owns the oracle exclusively for the duration of a batch, which is
/// what keeps the loop deterministic given a fixed response sequence.
pub trait SimulationOracle {
    /// Attach a generator at the named substation on the given network sheet.
    fn create_injection(
        &mut self,
        substation: &str,
        sheet: &str,
        setting: &GeneratorSetting,
    ) -> Result<InjectionHandle, OracleError>;

    /// Push an updated operating point to an existing injection.
    fn update_injection(
        &mut self,
        handle: &InjectionHandle,
        setting: &GeneratorSetting,
    ) -> Result<(), OracleError>;

    /// Remove the injection and its connection point from the network model.
    fn delete_injection(&mut self, handle: InjectionHandle) -> Result<(), OracleError>;

    fn run_power_flow(&mut self) -> Result<(), OracleError>;

    fn run_contingency_analysis(&mut self, options: &ContingencyOptions)
        -> Result<(), OracleError>;

    fn export_contingency_results(&mut self) -> Result<ContingencyTable, OracleError>;
}
