use std::error::Error;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use hostcap::analysis::loading::extract_line_loadings;
use hostcap::analysis::reporting::{print_report_table, print_search_summary};
use hostcap::cli::cli::Args;
use hostcap::config::search_config::SearchConfig;
use hostcap::core::batch::run_batch;
use hostcap::data::{results_loader, substations_loader};
use hostcap::oracle::synthetic::{SyntheticBus, SyntheticOracle};
use hostcap::utils::csv_export::ReportExporter;
use hostcap::utils::logging;

// Spike odds of the synthetic oracle when a seed is supplied
const SYNTHETIC_SPIKE_PROBABILITY: f64 = 0.05;

fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    // Parse command line arguments
    let args = Args::parse();

    logging::init_logging(args.enable_timing(), args.debug_logging());

    println!("Hostcap - Substation Hosting Capacity Search");
    println!(
        "Debug logging: {}, CSV export: {}, Timing: {}",
        if args.debug_logging() { "enabled" } else { "disabled" },
        if args.enable_csv_export() { "enabled" } else { "disabled" },
        if args.enable_timing() { "enabled" } else { "disabled" }
    );

    // Assemble and validate the configuration before anything touches the oracle
    let mut config = match args.config() {
        Some(path) => SearchConfig::from_file(path)?,
        None => SearchConfig::default(),
    };
    if let Some(start_power) = args.start_power() {
        config.start_power_mw = start_power;
    }
    if let Some(power_factor) = args.power_factor() {
        config.power_factor = power_factor;
    }
    if let Some(threshold) = args.overload_threshold() {
        config.overload_threshold_pct = threshold;
    }
    if let Some(max_iterations) = args.max_iterations() {
        config.max_iterations = max_iterations;
    }
    config.validate()?;

    // Extract-only mode: clean and rank a results file written by a real
    // engine export instead of driving the search loop.
    if let Some(path) = args.extract() {
        let table = results_loader::load_contingency_results(path)?;
        let loadings = extract_line_loadings(&table, &config.excluded_voltage_classes)?;
        println!("Ranked line loadings from {}:", path);
        for entry in &loadings {
            println!("  {:<40} {:>8.2} %", entry.line, entry.loading_pct);
        }
        logging::print_timing_report();
        return Ok(());
    }

    let buses = load_network(&args);
    let substations: Vec<String> = buses.iter().map(|b| b.name.clone()).collect();
    println!("Processing {} substations", substations.len());

    let mut oracle = SyntheticOracle::new(buses, &config.network_sheet);
    if let Some(seed) = args.seed() {
        oracle = oracle.with_spikes(seed, SYNTHETIC_SPIKE_PROBABILITY);
    }

    let report = run_batch(&mut oracle, &substations, &config)?;

    for (outcome, (_, steps)) in report.outcomes.iter().zip(report.step_traces.iter()) {
        print_search_summary(outcome, steps);
    }
    print_report_table(&report.outcomes);

    if args.enable_csv_export() {
        let exporter = ReportExporter::new(args.output_dir(), args.debug_logging())?;
        exporter.export_capacity_report(&report.outcomes)?;
        for (substation, steps) in &report.step_traces {
            exporter.export_step_trace(substation, steps)?;
        }
        println!("Results exported to: {}", exporter.output_dir().display());
    }

    logging::print_timing_report();

    Ok(())
}

// Load the synthetic network, falling back to built-in buses when no worklist
// file is given or it cannot be read
fn load_network(args: &Args) -> Vec<SyntheticBus> {
    if let Some(path) = args.substations() {
        match substations_loader::load_substations(path) {
            Ok(buses) => {
                println!("Successfully loaded {} substations from {}", buses.len(), path);
                return buses;
            }
            Err(e) => {
                eprintln!(
                    "Failed to load substations from {}: {}. Using fallback network.",
                    path, e
                );
            }
        }
    }

    // When a seed is given the fallback parameters are deterministic but varied
    if let Some(seed) = args.seed() {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut buses = Vec::new();
        for (name, line) in [
            ("Alpha 110", "Alpha - Beta 1"),
            ("Beta 220", "Beta - Gamma 2"),
            ("Gamma 110", "Gamma - Delta 1"),
            ("Delta 220", "Delta - Alpha 3"),
        ] {
            let base = rng.gen_range(45.0..75.0);
            let sensitivity = rng.gen_range(1.5..6.0);
            buses.push(SyntheticBus::new(name, line, base, sensitivity));
        }
        buses
    } else {
        vec![
            SyntheticBus::new("Alpha 110", "Alpha - Beta 1", 62.0, 4.0),
            SyntheticBus::new("Beta 220", "Beta - Gamma 2", 55.0, 2.5),
            SyntheticBus::new("Gamma 110", "Gamma - Delta 1", 70.0, 5.5),
            SyntheticBus::new("Delta 220", "Delta - Alpha 3", 48.0, 1.75),
        ]
    }
}
