use serde::{Deserialize, Serialize};

use crate::config::constants::POWER_STEP_MW;

/// Operating point of the static generator injected for one substation's search.
///
/// The reactive limits are derived from the power triangle: the apparent power
/// rating follows from the fixed power factor, and the reactive capability is
/// symmetric around zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorSetting {
    pub active_power_mw: f64,
    pub power_factor: f64,
    pub apparent_power_mva: f64,
    pub reactive_max_mvar: f64,
    pub reactive_min_mvar: f64,
}

impl GeneratorSetting {
    /// Build a setting at the given active power, deriving the apparent power
    /// and reactive limits. `power_factor` must already be validated to (0, 1].
    pub fn new(active_power_mw: f64, power_factor: f64) -> Self {
        let mut setting = Self {
            active_power_mw,
            power_factor,
            apparent_power_mva: 0.0,
            reactive_max_mvar: 0.0,
            reactive_min_mvar: 0.0,
        };
        setting.recompute_derived();
        setting
    }

    /// Advance the operating point by one power step and refresh the derived limits.
    pub fn step(&mut self) {
        self.active_power_mw += POWER_STEP_MW;
        self.recompute_derived();
    }

    fn recompute_derived(&mut self) {
        self.apparent_power_mva = self.active_power_mw / self.power_factor;
        let q_squared =
            self.apparent_power_mva * self.apparent_power_mva - self.active_power_mw * self.active_power_mw;
        self.reactive_max_mvar = q_squared.max(0.0).sqrt();
        self.reactive_min_mvar = -self.reactive_max_mvar;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn apparent_power_follows_power_factor() {
        let setting = GeneratorSetting::new(19.0, 0.95);
        assert!((setting.apparent_power_mva - 20.0).abs() < 1e-9);
    }

    #[test]
    fn reactive_limits_match_power_triangle() {
        // Independent reference: Q = P * tan(acos(pf)).
        for &(p, pf) in &[(1.0, 0.95), (5.0, 0.9), (42.0, 0.8), (100.0, 0.99)] {
            let setting = GeneratorSetting::new(p, pf);
            let reference = p * f64::acos(pf).tan();
            assert!(
                (setting.reactive_max_mvar - reference).abs() < 1e-9,
                "P={} pf={}: got {}, reference {}",
                p,
                pf,
                setting.reactive_max_mvar,
                reference
            );
        }
    }

    #[test]
    fn step_increases_power_by_one_unit() {
        let mut setting = GeneratorSetting::new(1.0, 0.95);
        setting.step();
        assert!((setting.active_power_mw - 2.0).abs() < 1e-9);
        // Derived values track the new operating point.
        assert!((setting.apparent_power_mva - 2.0 / 0.95).abs() < 1e-9);
    }

    #[test]
    fn unity_power_factor_has_no_reactive_capability() {
        let setting = GeneratorSetting::new(10.0, 1.0);
        assert_eq!(setting.reactive_max_mvar, 0.0);
        assert_eq!(setting.reactive_min_mvar, 0.0);
    }

    proptest! {
        #[test]
        fn reactive_limits_are_symmetric(
            active in 0.1f64..1000.0,
            pf in 0.05f64..1.0,
        ) {
            let setting = GeneratorSetting::new(active, pf);
            prop_assert!((setting.reactive_max_mvar + setting.reactive_min_mvar).abs() < 1e-9);
            prop_assert!(setting.reactive_max_mvar >= 0.0);
            prop_assert!((setting.apparent_power_mva - active / pf).abs() < 1e-6);
        }
    }
}
