use crate::core::search::StepRecord;
use crate::models::outcome::{SearchOutcome, SearchStatus};

pub fn print_search_summary(outcome: &SearchOutcome, steps: &[StepRecord]) {
    println!("\nSubstation '{}'", outcome.substation);
    println!("----------------------------------------");
    match &outcome.status {
        SearchStatus::Completed {
            max_safe_power_mw,
            critical_line,
            max_loading_pct,
        } => {
            println!("  Maximum safe power: {:.0} MW", max_safe_power_mw);
            println!("  Critical line: {}", critical_line);
            println!("  Maximum loading: {:.2}%", max_loading_pct);
            println!("  Search steps: {}", steps.len());
        }
        SearchStatus::CeilingReached {
            power_mw,
            critical_line,
            max_loading_pct,
        } => {
            println!("  Iteration ceiling reached at {:.0} MW without overload", power_mw);
            println!("  Worst line so far: {} at {:.2}%", critical_line, max_loading_pct);
        }
        SearchStatus::SubstationNotFound => println!("  Skipped: substation not found"),
        SearchStatus::SheetNotFound => println!("  Skipped: network sheet not found"),
        SearchStatus::NoInScopeLines => {
            println!("  Failed: every result entry was filtered out of scope")
        }
        SearchStatus::OracleFailed(reason) => println!("  Failed: {}", reason),
    }
}

/// Final report table, one row per substation in supply order.
pub fn print_report_table(outcomes: &[SearchOutcome]) {
    println!("\nHosting Capacity Report");
    println!("=======================================================================");
    println!(
        "{:<24} {:>14} {:<20} {:>16}",
        "Substation", "Max Power (MW)", "Critical Line", "Max Loading (%)"
    );
    println!("-----------------------------------------------------------------------");
    for outcome in outcomes {
        match (
            outcome.max_power_mw(),
            outcome.critical_line(),
            outcome.max_loading_pct(),
        ) {
            (Some(power), Some(line), Some(loading)) => {
                println!(
                    "{:<24} {:>14.0} {:<20} {:>16.2}",
                    outcome.substation, power, line, loading
                );
            }
            _ => {
                println!(
                    "{:<24} {:>14} {:<20} {:>16}",
                    outcome.substation,
                    "-",
                    outcome.status_label(),
                    "-"
                );
            }
        }
    }
    println!("=======================================================================");
}
