use std::error::Error;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use crate::config::search_config::SearchConfig;
use crate::core::search::{run_capacity_search, StepRecord};
use crate::models::outcome::{SearchOutcome, SearchStatus};
use crate::oracle::SimulationOracle;
use crate::utils::logging::{self, OperationCategory};

/// Outcomes plus per-substation step traces, in supply order.
pub struct BatchReport {
    pub outcomes: Vec<SearchOutcome>,
    pub step_traces: Vec<(String, Vec<StepRecord>)>,
}

/// Run the capacity search once per substation, strictly sequentially.
///
/// Substations are processed in supply order and independently: a failure on
/// one is recorded in its outcome and never aborts the batch. The search
/// itself guarantees injection teardown on every path, so no transient network
/// state leaks from one substation into the next. Only configuration errors
/// are fatal, and those are raised before the oracle is touched.
pub fn run_batch(
    oracle: &mut dyn SimulationOracle,
    substations: &[String],
    config: &SearchConfig,
) -> Result<BatchReport, Box<dyn Error + Send + Sync>> {
    config.validate()?;

    let _timing = logging::start_timing("run_batch", OperationCategory::Search);

    let progress = ProgressBar::new(substations.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut outcomes = Vec::with_capacity(substations.len());
    let mut step_traces = Vec::with_capacity(substations.len());

    for substation in substations {
        progress.set_message(substation.clone());

        let (outcome, steps) = match run_capacity_search(oracle, substation, config) {
            Ok((outcome, steps)) => (outcome, steps),
            Err(err) => {
                // Unexpected oracle breakage; the substation is reported as
                // failed and the batch moves on.
                error!(substation = %substation, error = %err, "capacity search failed");
                (
                    SearchOutcome::new(
                        substation.clone(),
                        SearchStatus::OracleFailed(err.to_string()),
                    ),
                    Vec::new(),
                )
            }
        };

        info!(
            substation = %substation,
            status = outcome.status_label(),
            max_power_mw = outcome.max_power_mw(),
            "substation search finished"
        );
        outcomes.push(outcome);
        step_traces.push((substation.clone(), steps));
        progress.inc(1);
    }

    progress.finish_with_message("batch complete");
    Ok(BatchReport {
        outcomes,
        step_traces,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_oracle::{OracleCall, ScriptedOracle, ScriptedResponse};

    fn config() -> SearchConfig {
        SearchConfig {
            excluded_voltage_classes: Vec::new(),
            ..SearchConfig::default()
        }
    }

    #[test]
    fn outcomes_keep_supply_order_and_failures_do_not_abort() {
        // Only S2 exists in the scripted network; S1 and S3 are skipped but
        // still reported, in order.
        let mut oracle = ScriptedOracle::new(
            "S2",
            vec![
                ScriptedResponse::loading("L", 105.0),
                ScriptedResponse::loading("L", 112.0),
            ],
        );
        let substations = vec!["S1".to_string(), "S2".to_string(), "S3".to_string()];
        let report = run_batch(&mut oracle, &substations, &config()).unwrap();

        let names: Vec<_> = report.outcomes.iter().map(|o| o.substation.as_str()).collect();
        assert_eq!(names, vec!["S1", "S2", "S3"]);
        assert_eq!(report.outcomes[0].status, SearchStatus::SubstationNotFound);
        assert!(matches!(
            report.outcomes[1].status,
            SearchStatus::Completed { .. }
        ));
        assert_eq!(report.outcomes[2].status, SearchStatus::SubstationNotFound);
    }

    #[test]
    fn no_injection_survives_between_substations() {
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![ScriptedResponse::loading("L", 115.0)],
        );
        let substations = vec!["S1".to_string(), "S1-again".to_string()];
        let report = run_batch(&mut oracle, &substations, &config()).unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert!(!oracle.has_active_injection());

        // Every successful create is paired with a delete before the next create.
        let mut depth = 0i32;
        for call in oracle.calls() {
            match call {
                OracleCall::Create => {
                    assert_eq!(depth, 0, "injection leaked into the next search");
                    depth += 1;
                }
                OracleCall::Delete => depth -= 1,
                _ => {}
            }
        }
    }

    #[test]
    fn invalid_config_fails_before_any_oracle_call() {
        let mut oracle = ScriptedOracle::new("S1", vec![]);
        let bad = SearchConfig {
            power_factor: 0.0,
            ..SearchConfig::default()
        };
        let result = run_batch(&mut oracle, &["S1".to_string()], &bad);
        assert!(result.is_err());
        assert!(oracle.calls().is_empty());
    }
}
