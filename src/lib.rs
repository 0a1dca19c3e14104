// Module declarations for the hosting-capacity search

// Core search logic
pub mod core {
    pub mod batch;
    pub mod search;
    #[cfg(test)]
    pub(crate) mod test_oracle;
}

// Configuration modules
pub mod config {
    pub mod constants;
    pub mod search_config;
}

// Model definitions
pub mod models {
    pub mod generator;
    pub mod outcome;
}

// Simulation oracle interface and the built-in synthetic engine
pub mod oracle;

// Data loaders
pub mod data {
    pub mod results_loader;
    pub mod substations_loader;
}

// Result extraction and reporting
pub mod analysis {
    pub mod loading;
    pub mod reporting;
}

// Utility functions
pub mod utils {
    pub mod csv_export;
    pub mod logging;
}

// CLI interface
pub mod cli {
    pub mod cli;
}

// Re-export commonly used items
pub use crate::analysis::loading::{extract_line_loadings, LineLoading};
pub use crate::config::search_config::SearchConfig;
pub use crate::core::batch::run_batch;
pub use crate::core::search::run_capacity_search;
pub use crate::models::outcome::{SearchOutcome, SearchStatus};
pub use crate::oracle::{SimulationOracle, ContingencyTable};
