//! Scripted stand-in for the simulation engine, used by the search and batch
//! tests: canned per-study responses plus a full call log.

use crate::config::constants::LINE_ELEMENT_SUFFIX;
use crate::models::generator::GeneratorSetting;
use crate::oracle::{
    ContingencyOptions, ContingencyTable, InjectionHandle, OracleError, SimulationOracle,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleCall {
    Create,
    Update,
    Delete,
    PowerFlow,
    Contingency,
    Export,
}

#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    Loading { line: String, loading_pct: f64 },
    NonConvergent,
}

impl ScriptedResponse {
    pub fn loading(line: &str, loading_pct: f64) -> Self {
        ScriptedResponse::Loading {
            line: line.to_string(),
            loading_pct,
        }
    }

    pub fn non_convergent() -> Self {
        ScriptedResponse::NonConvergent
    }
}

pub struct ScriptedOracle {
    known_substation: String,
    responses: Vec<ScriptedResponse>,
    next_response: usize,
    calls: Vec<OracleCall>,
    active: Option<InjectionHandle>,
    next_id: u64,
    pending_failure: bool,
}

impl ScriptedOracle {
    pub fn new(known_substation: &str, responses: Vec<ScriptedResponse>) -> Self {
        Self {
            known_substation: known_substation.to_string(),
            responses,
            next_response: 0,
            calls: Vec::new(),
            active: None,
            next_id: 0,
            pending_failure: false,
        }
    }

    pub fn calls(&self) -> &[OracleCall] {
        &self.calls
    }

    pub fn has_active_injection(&self) -> bool {
        self.active.is_some()
    }
}

impl SimulationOracle for ScriptedOracle {
    fn create_injection(
        &mut self,
        substation: &str,
        _sheet: &str,
        _setting: &GeneratorSetting,
    ) -> Result<InjectionHandle, OracleError> {
        self.calls.push(OracleCall::Create);
        if substation != self.known_substation {
            return Err(OracleError::SubstationNotFound(substation.to_string()));
        }
        self.next_id += 1;
        let handle = InjectionHandle {
            substation: substation.to_string(),
            id: self.next_id,
        };
        self.active = Some(handle.clone());
        Ok(handle)
    }

    fn update_injection(
        &mut self,
        handle: &InjectionHandle,
        _setting: &GeneratorSetting,
    ) -> Result<(), OracleError> {
        self.calls.push(OracleCall::Update);
        if self.active.as_ref() != Some(handle) {
            return Err(OracleError::StaleHandle(handle.substation.clone()));
        }
        Ok(())
    }

    fn delete_injection(&mut self, handle: InjectionHandle) -> Result<(), OracleError> {
        self.calls.push(OracleCall::Delete);
        if self.active.as_ref() != Some(&handle) {
            return Err(OracleError::StaleHandle(handle.substation));
        }
        self.active = None;
        Ok(())
    }

    fn run_power_flow(&mut self) -> Result<(), OracleError> {
        self.calls.push(OracleCall::PowerFlow);
        Ok(())
    }

    fn run_contingency_analysis(
        &mut self,
        _options: &ContingencyOptions,
    ) -> Result<(), OracleError> {
        self.calls.push(OracleCall::Contingency);
        if let Some(ScriptedResponse::NonConvergent) = self.responses.get(self.next_response) {
            self.next_response += 1;
            self.pending_failure = true;
        }
        Ok(())
    }

    fn export_contingency_results(&mut self) -> Result<ContingencyTable, OracleError> {
        self.calls.push(OracleCall::Export);
        if self.pending_failure {
            self.pending_failure = false;
            return Err(OracleError::NonConvergent);
        }
        match self.responses.get(self.next_response) {
            Some(ScriptedResponse::Loading { line, loading_pct }) => {
                self.next_response += 1;
                Ok(ContingencyTable::new(
                    vec![format!("Grid\\{}{}", line, LINE_ELEMENT_SUFFIX)],
                    vec![vec![format!("{}", loading_pct)]],
                ))
            }
            _ => Err(OracleError::MalformedResults(
                "scripted responses exhausted".to_string(),
            )),
        }
    }
}
