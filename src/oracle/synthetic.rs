use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::config::constants::{LINE_ELEMENT_SUFFIX, NO_LIMIT_PLACEHOLDER};
use crate::models::generator::GeneratorSetting;
use crate::oracle::{
    ContingencyOptions, ContingencyTable, InjectionHandle, OracleError, SimulationOracle,
};

/// One candidate bus of the synthetic network, with a linear loading response:
/// the bus's critical line loads at `base_loading_pct` plus
/// `sensitivity_pct_per_mw` for every injected MW.
#[derive(Debug, Clone)]
pub struct SyntheticBus {
    pub name: String,
    pub critical_line: String,
    pub base_loading_pct: f64,
    pub sensitivity_pct_per_mw: f64,
}

impl SyntheticBus {
    pub fn new(
        name: impl Into<String>,
        critical_line: impl Into<String>,
        base_loading_pct: f64,
        sensitivity_pct_per_mw: f64,
    ) -> Self {
        Self {
            name: name.into(),
            critical_line: critical_line.into(),
            base_loading_pct,
            sensitivity_pct_per_mw,
        }
    }
}

/// Deterministic stand-in for the external simulation engine. Loading grows
/// linearly with injected power, which satisfies the termination conditions
/// of the search; a seeded RNG can add occasional divergent spikes to
/// exercise the backoff path the way a real engine's inconvergence would.
pub struct SyntheticOracle {
    buses: HashMap<String, SyntheticBus>,
    sheet: String,
    active: Option<(InjectionHandle, GeneratorSetting)>,
    next_id: u64,
    contingency_run: bool,
    rng: Option<StdRng>,
    spike_probability: f64,
    spike_pending: bool,
}

impl SyntheticOracle {
    pub fn new(buses: Vec<SyntheticBus>, sheet: impl Into<String>) -> Self {
        let buses = buses.into_iter().map(|b| (b.name.clone(), b)).collect();
        Self {
            buses,
            sheet: sheet.into(),
            active: None,
            next_id: 0,
            contingency_run: false,
            rng: None,
            spike_probability: 0.0,
            spike_pending: false,
        }
    }

    /// Enable seeded inconvergence spikes with the given per-study probability.
    pub fn with_spikes(mut self, seed: u64, probability: f64) -> Self {
        self.rng = Some(StdRng::seed_from_u64(seed));
        self.spike_probability = probability;
        self
    }

    /// True while a generator injection is attached to the network model.
    pub fn has_active_injection(&self) -> bool {
        self.active.is_some()
    }

    fn format_line_path(line: &str) -> String {
        format!(
            "Network Model\\Network Data\\Grid\\{}{}",
            line, LINE_ELEMENT_SUFFIX
        )
    }

    fn loading_for(&self, bus: &SyntheticBus, setting: &GeneratorSetting, spiked: bool) -> f64 {
        let mut loading = bus.base_loading_pct + bus.sensitivity_pct_per_mw * setting.active_power_mw;
        if spiked {
            // A divergent solution reads far above the genuine loading.
            loading += 25.0;
        }
        loading
    }
}

impl SimulationOracle for SyntheticOracle {
    fn create_injection(
        &mut self,
        substation: &str,
        sheet: &str,
        setting: &GeneratorSetting,
    ) -> Result<InjectionHandle, OracleError> {
        if sheet != self.sheet {
            return Err(OracleError::SheetNotFound(sheet.to_string()));
        }
        if !self.buses.contains_key(substation) {
            return Err(OracleError::SubstationNotFound(substation.to_string()));
        }
        self.next_id += 1;
        let handle = InjectionHandle {
            substation: substation.to_string(),
            id: self.next_id,
        };
        debug!(substation, id = handle.id, "creating synthetic injection");
        self.active = Some((handle.clone(), setting.clone()));
        Ok(handle)
    }

    fn update_injection(
        &mut self,
        handle: &InjectionHandle,
        setting: &GeneratorSetting,
    ) -> Result<(), OracleError> {
        match &mut self.active {
            Some((active, stored)) if active == handle => {
                *stored = setting.clone();
                Ok(())
            }
            _ => Err(OracleError::StaleHandle(handle.substation.clone())),
        }
    }

    fn delete_injection(&mut self, handle: InjectionHandle) -> Result<(), OracleError> {
        match self.active.take() {
            Some((active, _)) if active == handle => Ok(()),
            other => {
                self.active = other;
                Err(OracleError::StaleHandle(handle.substation))
            }
        }
    }

    fn run_power_flow(&mut self) -> Result<(), OracleError> {
        // The linear model always converges on a plain power flow.
        Ok(())
    }

    fn run_contingency_analysis(
        &mut self,
        _options: &ContingencyOptions,
    ) -> Result<(), OracleError> {
        self.contingency_run = true;
        self.spike_pending = match &mut self.rng {
            Some(rng) => rng.gen_bool(self.spike_probability),
            None => false,
        };
        Ok(())
    }

    fn export_contingency_results(&mut self) -> Result<ContingencyTable, OracleError> {
        if !self.contingency_run {
            return Err(OracleError::MalformedResults(
                "no contingency study has been run".to_string(),
            ));
        }
        let (substation, setting) = match &self.active {
            Some((handle, setting)) => (handle.substation.clone(), setting.clone()),
            None => {
                return Err(OracleError::MalformedResults(
                    "no active injection".to_string(),
                ))
            }
        };
        let bus = self
            .buses
            .get(&substation)
            .cloned()
            .ok_or(OracleError::SubstationNotFound(substation))?;

        let spiked = std::mem::take(&mut self.spike_pending);
        let loading = self.loading_for(&bus, &setting, spiked);

        // The export carries the same clutter a real engine produces: a study
        // case column, an unrated element, an excluded distribution feeder,
        // and the in-scope lines.
        let columns = vec![
            "All Calculations\\Study Cases\\Base Case.IntCase".to_string(),
            Self::format_line_path(&bus.critical_line),
            Self::format_line_path("Parallel Corridor"),
            Self::format_line_path("Feeder 34.5 kV North"),
            Self::format_line_path("Unrated Tie"),
        ];
        let secondary = (loading * 0.6).max(0.0);
        let make_row = |scale: f64| {
            vec![
                "1".to_string(),
                format!("{:.4}", loading * scale),
                format!("{:.4}", secondary * scale),
                format!("{:.4}", 140.0 * scale),
                NO_LIMIT_PLACEHOLDER.to_string(),
            ]
        };
        let rows = vec![make_row(0.7), make_row(0.9), make_row(1.0)];
        Ok(ContingencyTable::new(columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oracle_with_one_bus() -> SyntheticOracle {
        SyntheticOracle::new(
            vec![SyntheticBus::new("Alpha 110", "Alpha - Beta 1", 60.0, 5.0)],
            "Grid",
        )
    }

    #[test]
    fn unknown_substation_is_rejected() {
        let mut oracle = oracle_with_one_bus();
        let setting = GeneratorSetting::new(1.0, 0.95);
        assert!(matches!(
            oracle.create_injection("Nowhere", "Grid", &setting),
            Err(OracleError::SubstationNotFound(_))
        ));
    }

    #[test]
    fn unknown_sheet_is_rejected() {
        let mut oracle = oracle_with_one_bus();
        let setting = GeneratorSetting::new(1.0, 0.95);
        assert!(matches!(
            oracle.create_injection("Alpha 110", "Missing Sheet", &setting),
            Err(OracleError::SheetNotFound(_))
        ));
    }

    #[test]
    fn loading_grows_linearly_with_power() {
        let mut oracle = oracle_with_one_bus();
        let mut setting = GeneratorSetting::new(1.0, 0.95);
        let handle = oracle
            .create_injection("Alpha 110", "Grid", &setting)
            .unwrap();
        oracle
            .run_contingency_analysis(&ContingencyOptions::default())
            .unwrap();
        let table = oracle.export_contingency_results().unwrap();
        let first: f64 = table.last_row().unwrap()[1].parse().unwrap();
        assert!((first - 65.0).abs() < 1e-6);

        setting.step();
        oracle.update_injection(&handle, &setting).unwrap();
        oracle
            .run_contingency_analysis(&ContingencyOptions::default())
            .unwrap();
        let table = oracle.export_contingency_results().unwrap();
        let second: f64 = table.last_row().unwrap()[1].parse().unwrap();
        assert!((second - 70.0).abs() < 1e-6);
    }

    #[test]
    fn delete_clears_the_active_injection() {
        let mut oracle = oracle_with_one_bus();
        let setting = GeneratorSetting::new(1.0, 0.95);
        let handle = oracle
            .create_injection("Alpha 110", "Grid", &setting)
            .unwrap();
        assert!(oracle.has_active_injection());
        oracle.delete_injection(handle).unwrap();
        assert!(!oracle.has_active_injection());
    }

    #[test]
    fn export_without_contingency_study_is_malformed() {
        let mut oracle = oracle_with_one_bus();
        let setting = GeneratorSetting::new(1.0, 0.95);
        oracle
            .create_injection("Alpha 110", "Grid", &setting)
            .unwrap();
        assert!(matches!(
            oracle.export_contingency_results(),
            Err(OracleError::MalformedResults(_))
        ));
    }
}
