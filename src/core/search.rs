use std::error::Error;

use tracing::{debug, info, warn};

use crate::analysis::loading::{extract_line_loadings, ExtractError, LineLoading};
use crate::config::constants::POWER_STEP_MW;
use crate::config::search_config::SearchConfig;
use crate::models::generator::GeneratorSetting;
use crate::models::outcome::{SearchOutcome, SearchStatus};
use crate::oracle::{ContingencyOptions, InjectionHandle, OracleError, SimulationOracle};
use crate::utils::logging::{self, OperationCategory, OracleCallType};

/// One evaluated iteration of a substation's search, kept for the step trace.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub iteration: usize,
    pub power_mw: f64,
    pub max_loading_pct: f64,
    pub critical_line: String,
    pub backoff: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SearchState {
    Stepping,
    BackoffRetry,
}

/// Drive the oracle toward the maximum safe injection at one substation.
///
/// Starting from `start_power_mw`, each iteration runs the N-1 contingency
/// study and reads the worst in-scope line loading. The power rises one step
/// per iteration until a line exceeds the overload threshold; the recorded
/// maximum safe power is then one step below the overloading level. A loading
/// jump larger than the inconvergence threshold that also lands above the
/// overload threshold is treated as a spurious divergent solution: the search
/// nudges the power up, re-runs the power flow only, and tries again without
/// updating its last-known reading.
///
/// The injection is removed on every exit path before this function returns.
pub fn run_capacity_search(
    oracle: &mut dyn SimulationOracle,
    substation: &str,
    config: &SearchConfig,
) -> Result<(SearchOutcome, Vec<StepRecord>), Box<dyn Error + Send + Sync>> {
    let _timing = logging::start_timing("run_capacity_search", OperationCategory::Search);

    let mut setting = GeneratorSetting::new(config.start_power_mw, config.power_factor);
    info!(
        substation,
        start_power_mw = setting.active_power_mw,
        power_factor = setting.power_factor,
        "starting capacity search"
    );

    let handle = {
        let _timing = logging::start_timing(
            "create_injection",
            OperationCategory::OracleCall { subcategory: OracleCallType::InjectionManagement },
        );
        match oracle.create_injection(substation, &config.network_sheet, &setting) {
            Ok(handle) => handle,
            Err(OracleError::SubstationNotFound(name)) => {
                warn!(substation = %name, "substation not found; skipping");
                return Ok((
                    SearchOutcome::new(substation, SearchStatus::SubstationNotFound),
                    Vec::new(),
                ));
            }
            Err(OracleError::SheetNotFound(name)) => {
                warn!(sheet = %name, "network sheet not found; skipping");
                return Ok((
                    SearchOutcome::new(substation, SearchStatus::SheetNotFound),
                    Vec::new(),
                ));
            }
            Err(other) => return Err(other.into()),
        }
    };

    let mut steps = Vec::new();
    let result = step_loop(oracle, &handle, &mut setting, substation, config, &mut steps);

    // Teardown happens on every path so no transient state leaks into the
    // next substation's search.
    let cleanup = {
        let _timing = logging::start_timing(
            "delete_injection",
            OperationCategory::OracleCall { subcategory: OracleCallType::InjectionManagement },
        );
        oracle.delete_injection(handle)
    };

    match result {
        Ok(status) => {
            cleanup?;
            Ok((SearchOutcome::new(substation, status), steps))
        }
        Err(err) => {
            if let Err(cleanup_err) = cleanup {
                warn!(substation, error = %cleanup_err, "failed to remove injection after error");
            }
            Err(err)
        }
    }
}

fn step_loop(
    oracle: &mut dyn SimulationOracle,
    handle: &InjectionHandle,
    setting: &mut GeneratorSetting,
    substation: &str,
    config: &SearchConfig,
    steps: &mut Vec<StepRecord>,
) -> Result<SearchStatus, Box<dyn Error + Send + Sync>> {
    let options = ContingencyOptions::default();
    let mut state = SearchState::Stepping;
    let mut last_max_loading: Option<f64> = None;
    let mut iteration: usize = 0;

    // The injection starts with a plain power flow so the model is solved
    // before the first contingency study.
    run_power_flow(oracle)?;

    loop {
        match state {
            SearchState::Stepping => {
                iteration += 1;

                let worst = match run_study(oracle, config, &options)? {
                    Ok(worst) => worst,
                    Err(status) => return Ok(status),
                };
                steps.push(StepRecord {
                    iteration,
                    power_mw: setting.active_power_mw,
                    max_loading_pct: worst.loading_pct,
                    critical_line: worst.line.clone(),
                    backoff: false,
                });
                info!(
                    substation,
                    power_mw = setting.active_power_mw,
                    max_loading_pct = worst.loading_pct,
                    critical_line = %worst.line,
                    "evaluated injection level"
                );

                // A jump past the inconvergence threshold that also lands above
                // the overload threshold is a divergent solution, not a result.
                if let Some(last) = last_max_loading {
                    if worst.loading_pct - last > config.inconvergence_jump_pct
                        && worst.loading_pct > config.overload_threshold_pct
                    {
                        // The ceiling applies here too, otherwise an oracle
                        // that keeps producing divergent solutions would loop
                        // forever through recovery passes.
                        if iteration >= config.max_iterations {
                            warn!(
                                substation,
                                iterations = iteration,
                                power_mw = setting.active_power_mw,
                                "iteration ceiling reached during inconvergence recovery"
                            );
                            return Ok(SearchStatus::CeilingReached {
                                power_mw: setting.active_power_mw,
                                critical_line: worst.line,
                                max_loading_pct: worst.loading_pct,
                            });
                        }
                        warn!(
                            substation,
                            last_loading_pct = last,
                            loading_pct = worst.loading_pct,
                            "loading jump suggests inconvergence; nudging power and retrying"
                        );
                        state = SearchState::BackoffRetry;
                        continue;
                    }
                }

                last_max_loading = Some(worst.loading_pct);

                if worst.loading_pct > config.overload_threshold_pct {
                    let max_safe_power_mw = setting.active_power_mw - POWER_STEP_MW;
                    info!(
                        substation,
                        max_safe_power_mw,
                        critical_line = %worst.line,
                        max_loading_pct = worst.loading_pct,
                        "overload threshold exceeded; search complete"
                    );
                    return Ok(SearchStatus::Completed {
                        max_safe_power_mw,
                        critical_line: worst.line,
                        max_loading_pct: worst.loading_pct,
                    });
                }

                if iteration >= config.max_iterations {
                    warn!(
                        substation,
                        iterations = iteration,
                        power_mw = setting.active_power_mw,
                        "iteration ceiling reached without overload"
                    );
                    return Ok(SearchStatus::CeilingReached {
                        power_mw: setting.active_power_mw,
                        critical_line: worst.line,
                        max_loading_pct: worst.loading_pct,
                    });
                }

                setting.step();
                push_setting(oracle, handle, setting)?;
                run_power_flow(oracle)?;
            }
            SearchState::BackoffRetry => {
                // Recovery nudge: one more power step, power flow only, and no
                // update of the last-known reading. The next stepping pass
                // re-runs the full study. The pass still counts toward the
                // iteration ceiling and gets its own number in the trace.
                iteration += 1;
                setting.step();
                push_setting(oracle, handle, setting)?;
                run_power_flow(oracle)?;
                steps.push(StepRecord {
                    iteration,
                    power_mw: setting.active_power_mw,
                    max_loading_pct: last_max_loading.unwrap_or(0.0),
                    critical_line: String::new(),
                    backoff: true,
                });
                state = SearchState::Stepping;
            }
        }
    }
}

/// Run the contingency study and extract the worst in-scope loading, retrying
/// transient oracle failures up to the configured budget. A non-convergent run
/// is never read as a loading value.
fn run_study(
    oracle: &mut dyn SimulationOracle,
    config: &SearchConfig,
    options: &ContingencyOptions,
) -> Result<Result<LineLoading, SearchStatus>, Box<dyn Error + Send + Sync>> {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match run_study_once(oracle, config, options) {
            Ok(Some(worst)) => return Ok(Ok(worst)),
            Ok(None) => return Ok(Err(SearchStatus::NoInScopeLines)),
            Err(err) if err.is_transient() => {
                if attempts > config.max_oracle_retries {
                    warn!(error = %err, attempts, "oracle retry budget exhausted");
                    return Ok(Err(SearchStatus::OracleFailed(err.to_string())));
                }
                debug!(error = %err, attempt = attempts, "transient oracle failure; retrying");
            }
            Err(other) => return Err(other.into()),
        }
    }
}

fn run_study_once(
    oracle: &mut dyn SimulationOracle,
    config: &SearchConfig,
    options: &ContingencyOptions,
) -> Result<Option<LineLoading>, OracleError> {
    {
        let _timing = logging::start_timing(
            "run_contingency_analysis",
            OperationCategory::OracleCall { subcategory: OracleCallType::Contingency },
        );
        oracle.run_contingency_analysis(options)?;
    }
    let table = {
        let _timing = logging::start_timing(
            "export_contingency_results",
            OperationCategory::OracleCall { subcategory: OracleCallType::ResultExport },
        );
        oracle.export_contingency_results()?
    };
    match extract_line_loadings(&table, &config.excluded_voltage_classes) {
        Ok(mut ranked) => Ok(Some(ranked.remove(0))),
        Err(ExtractError::NoInScopeLines) => Ok(None),
        Err(ExtractError::EmptyTable) => Err(OracleError::MalformedResults(
            "contingency export contained no rows".to_string(),
        )),
    }
}

fn push_setting(
    oracle: &mut dyn SimulationOracle,
    handle: &InjectionHandle,
    setting: &GeneratorSetting,
) -> Result<(), OracleError> {
    let _timing = logging::start_timing(
        "update_injection",
        OperationCategory::OracleCall { subcategory: OracleCallType::InjectionManagement },
    );
    oracle.update_injection(handle, setting)
}

fn run_power_flow(oracle: &mut dyn SimulationOracle) -> Result<(), OracleError> {
    let _timing = logging::start_timing(
        "run_power_flow",
        OperationCategory::OracleCall { subcategory: OracleCallType::PowerFlow },
    );
    oracle.run_power_flow()
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
    fn search_completes_at_the_last_safe_level() {
        // Loading 80/90/105/115 at 1/2/3/4 MW; threshold 110.
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![
                ScriptedResponse::loading("Alpha - Beta 1", 80.0),
                ScriptedResponse::loading("Alpha - Beta 1", 90.0),
                ScriptedResponse::loading("Alpha - Beta 1", 105.0),
                ScriptedResponse::loading("Alpha - Beta 1", 115.0),
            ],
        );
        let (outcome, steps) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        assert_eq!(
            outcome.status,
            SearchStatus::Completed {
                max_safe_power_mw: 3.0,
                critical_line: "Alpha - Beta 1".to_string(),
                max_loading_pct: 115.0,
            }
        );
        assert_eq!(steps.len(), 4);
        assert!(!oracle.has_active_injection());
    }

    #[test]
    fn power_rises_one_unit_per_stepping_pass() {
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![
                ScriptedResponse::loading("L", 50.0),
                ScriptedResponse::loading("L", 60.0),
                ScriptedResponse::loading("L", 105.0),
                ScriptedResponse::loading("L", 112.0),
            ],
        );
        let (_, steps) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        let powers: Vec<f64> = steps.iter().map(|s| s.power_mw).collect();
        assert_eq!(powers, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn unknown_substation_is_skipped_without_retries() {
        let mut oracle = ScriptedOracle::new("Elsewhere", vec![]);
        let (outcome, steps) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        assert_eq!(outcome.status, SearchStatus::SubstationNotFound);
        assert!(steps.is_empty());
        // No study was attempted.
        assert!(!oracle
            .calls()
            .iter()
            .any(|c| matches!(c, OracleCall::Contingency)));
    }

    #[test]
    fn spike_is_not_recorded_as_the_terminating_overload() {
        // 90, then a divergent 140 (delta 50 > 10, above 110), then stable
        // readings below the threshold, then a genuine overload at 111.
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![
                ScriptedResponse::loading("L", 90.0),
                ScriptedResponse::loading("L", 140.0),
                ScriptedResponse::loading("L", 105.0),
                ScriptedResponse::loading("L", 111.0),
            ],
        );
        let (outcome, steps) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        match &outcome.status {
            SearchStatus::Completed { max_loading_pct, .. } => {
                assert!((max_loading_pct - 111.0).abs() < 1e-9);
            }
            other => panic!("expected completion, got {:?}", other),
        }
        // The spike pass is visible in the trace as a backoff step.
        assert!(steps.iter().any(|s| s.backoff));
    }

    #[test]
    fn backoff_pass_reruns_power_flow_without_a_contingency_study() {
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![
                ScriptedResponse::loading("L", 90.0),
                ScriptedResponse::loading("L", 140.0),
                ScriptedResponse::loading("L", 108.0),
                ScriptedResponse::loading("L", 115.0),
            ],
        );
        let (_, _) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        let calls = oracle.calls();
        // Find the backoff sequence after the spiked export: update, power
        // flow, and then straight into the next contingency study.
        let spike_export = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, OracleCall::Export))
            .nth(1)
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(calls[spike_export + 1], OracleCall::Update);
        assert_eq!(calls[spike_export + 2], OracleCall::PowerFlow);
        assert_eq!(calls[spike_export + 3], OracleCall::Contingency);
    }

    #[test]
    fn second_spike_after_backoff_terminates_the_search() {
        // After the backoff pass the reading is still far above the last-known
        // value (120 - 90 = 30 > 10 and above the threshold), so the rule
        // fires again; then the readings settle and a genuine overload ends it.
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![
                ScriptedResponse::loading("L", 90.0),
                ScriptedResponse::loading("L", 140.0),
                ScriptedResponse::loading("L", 120.0),
                ScriptedResponse::loading("L", 105.0),
                ScriptedResponse::loading("L", 112.0),
            ],
        );
        let (outcome, steps) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        match &outcome.status {
            SearchStatus::Completed { max_loading_pct, .. } => {
                assert!((max_loading_pct - 112.0).abs() < 1e-9);
            }
            other => panic!("expected completion, got {:?}", other),
        }
        assert_eq!(steps.iter().filter(|s| s.backoff).count(), 2);
    }

    #[test]
    fn ceiling_reached_without_overload() {
        let responses: Vec<_> = (0..10)
            .map(|_| ScriptedResponse::loading("L", 50.0))
            .collect();
        let mut oracle = ScriptedOracle::new("S1", responses);
        let cfg = SearchConfig {
            max_iterations: 5,
            ..config()
        };
        let (outcome, steps) = run_capacity_search(&mut oracle, "S1", &cfg).unwrap();
        assert_eq!(
            outcome.status,
            SearchStatus::CeilingReached {
                power_mw: 5.0,
                critical_line: "L".to_string(),
                max_loading_pct: 50.0,
            }
        );
        assert_eq!(steps.len(), 5);
        assert!(!oracle.has_active_injection());
    }

    #[test]
    fn perpetual_spikes_cannot_outrun_the_iteration_ceiling() {
        // Every reading after the first jumps far past the frozen last-known
        // value, so the recovery rule fires on every study. The ceiling must
        // still end the search instead of letting it nudge forever.
        let mut responses = vec![ScriptedResponse::loading("L", 90.0)];
        responses.extend((0..30).map(|_| ScriptedResponse::loading("L", 140.0)));
        let mut oracle = ScriptedOracle::new("S1", responses);
        let cfg = SearchConfig {
            max_iterations: 5,
            ..config()
        };
        let (outcome, steps) = run_capacity_search(&mut oracle, "S1", &cfg).unwrap();
        assert_eq!(
            outcome.status,
            SearchStatus::CeilingReached {
                power_mw: 4.0,
                critical_line: "L".to_string(),
                max_loading_pct: 140.0,
            }
        );
        let studies = oracle
            .calls()
            .iter()
            .filter(|c| matches!(c, OracleCall::Contingency))
            .count();
        assert_eq!(studies, 3);
        assert!(steps.len() <= cfg.max_iterations + 1);
        assert!(!oracle.has_active_injection());
    }

    #[test]
    fn trace_numbers_every_pass_exactly_once() {
        // Backoff passes get their own iteration numbers so the exported
        // step trace never carries duplicates.
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![
                ScriptedResponse::loading("L", 90.0),
                ScriptedResponse::loading("L", 140.0),
                ScriptedResponse::loading("L", 105.0),
                ScriptedResponse::loading("L", 111.0),
            ],
        );
        let (_, steps) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        let iterations: Vec<usize> = steps.iter().map(|s| s.iteration).collect();
        assert_eq!(iterations, vec![1, 2, 3, 4, 5]);
        assert!(steps[2].backoff);
    }

    #[test]
    fn transient_failures_within_budget_are_retried() {
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![
                ScriptedResponse::non_convergent(),
                ScriptedResponse::non_convergent(),
                ScriptedResponse::loading("L", 120.0),
            ],
        );
        let (outcome, _) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        assert!(matches!(outcome.status, SearchStatus::Completed { .. }));
    }

    #[test]
    fn exhausted_retry_budget_fails_the_substation() {
        let responses: Vec<_> = (0..10).map(|_| ScriptedResponse::non_convergent()).collect();
        let mut oracle = ScriptedOracle::new("S1", responses);
        let (outcome, _) = run_capacity_search(&mut oracle, "S1", &config()).unwrap();
        assert!(matches!(outcome.status, SearchStatus::OracleFailed(_)));
        // The injection is removed even on the failure path.
        assert!(!oracle.has_active_injection());
    }

    #[test]
    fn all_lines_filtered_surfaces_the_empty_scope() {
        let mut oracle = ScriptedOracle::new(
            "S1",
            vec![ScriptedResponse::loading("Feeder 34.5 kV", 120.0)],
        );
        let cfg = SearchConfig::default(); // default exclusions apply
        let (outcome, _) = run_capacity_search(&mut oracle, "S1", &cfg).unwrap();
        assert_eq!(outcome.status, SearchStatus::NoInScopeLines);
        assert!(!oracle.has_active_injection());
    }
}
