use clap::Parser;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[arg(short, long, help = "CSV file with the substation worklist")]
    substations: Option<String>,

    #[arg(short, long, help = "JSON search configuration file")]
    config: Option<String>,

    #[arg(short, long, default_value = "results")]
    output_dir: String,

    #[arg(long, default_value_t = false)]
    enable_csv_export: bool,

    #[arg(long, default_value_t = false)]
    enable_timing: bool,

    #[arg(long, help = "Random seed for the synthetic oracle's inconvergence spikes")]
    seed: Option<u64>,

    #[arg(long, default_value_t = false)]
    debug_logging: bool,

    #[arg(long, help = "Override the starting injection power in MW")]
    start_power: Option<f64>,

    #[arg(long, help = "Override the generator power factor")]
    power_factor: Option<f64>,

    #[arg(long, help = "Override the overload threshold in percent")]
    overload_threshold: Option<f64>,

    #[arg(long, help = "Clean and rank an engine-exported results CSV, then exit")]
    extract: Option<String>,

    #[arg(long, help = "Override the iteration ceiling")]
    max_iterations: Option<usize>,
}

// Getter methods for all fields
impl Args {
    pub fn substations(&self) -> Option<&str> {
        self.substations.as_deref()
    }

    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn output_dir(&self) -> &str {
        &self.output_dir
    }

    pub fn enable_csv_export(&self) -> bool {
        self.enable_csv_export
    }

    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    pub fn start_power(&self) -> Option<f64> {
        self.start_power
    }

    pub fn power_factor(&self) -> Option<f64> {
        self.power_factor
    }

    pub fn overload_threshold(&self) -> Option<f64> {
        self.overload_threshold
    }

    pub fn extract(&self) -> Option<&str> {
        self.extract.as_deref()
    }

    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }
}
