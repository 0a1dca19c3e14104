// Search defaults
pub const DEFAULT_START_POWER_MW: f64 = 1.0;
pub const DEFAULT_POWER_FACTOR: f64 = 0.95;
pub const DEFAULT_OVERLOAD_THRESHOLD_PCT: f64 = 110.0;  // loading above this ends the search
pub const DEFAULT_INCONVERGENCE_JUMP_PCT: f64 = 10.0;   // loading jump that flags a spurious solution
pub const POWER_STEP_MW: f64 = 1.0;

// Safety bounds on the search loop
pub const DEFAULT_MAX_ITERATIONS: usize = 500;
pub const DEFAULT_MAX_ORACLE_RETRIES: usize = 3;

// Contingency study setup (N-1, AC)
pub const CONTINGENCY_MAX_LOADING_PCT: f64 = 50.0;
pub const CONTINGENCY_VOLTAGE_MIN_PU: f64 = 0.9;
pub const CONTINGENCY_VOLTAGE_MAX_PU: f64 = 1.1;
pub const CONTINGENCY_VOLTAGE_STEP_LIMIT: u32 = 5;

// Result-table conventions of the simulation engine's CSV export
pub const LINE_ELEMENT_SUFFIX: &str = ".ElmLne";
pub const STUDY_CASE_MARKER: &str = "study cases";
pub const PATH_SEPARATOR: char = '\\';
pub const NO_LIMIT_PLACEHOLDER: &str = "----";

// Distribution-level voltage classes excluded from a transmission study
pub const DEFAULT_EXCLUDED_VOLTAGE_CLASSES: [&str; 3] = ["69 kV", "34.5 kV", "4.16 kV"];

// Default sheet of the network model that receives the injected generator
pub const DEFAULT_NETWORK_SHEET: &str = "Grid";
