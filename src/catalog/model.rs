//! Process definition model — the declarative phase/step template.
//!
//! Shape: a `process` list of `{id, phases: [{id, name?, steps: [{id, name}]}]}`.
//! Step order within a phase defines before/at/after positioning relative to
//! an observed step; phase order defines the advancement ratchet.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Top-level process definition document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessDefinition {
    #[serde(default)]
    pub process: Vec<ProcessSpec>,
}

/// One process type: an ordered list of phases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessSpec {
    pub id: String,
    #[serde(default)]
    pub phases: Vec<PhaseSpec>,
}

/// A named stage within a process, containing an ordered list of steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// The smallest trackable unit of progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepSpec {
    pub id: String,
    pub name: String,
}

impl ProcessDefinition {
    /// Structural validation. Runs once at load; the reconcile core assumes
    /// a valid definition afterwards and never re-checks.
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut process_ids = HashSet::new();
        for process in &self.process {
            if process.id.trim().is_empty() {
                return Err(invalid("process id must be non-empty"));
            }
            if !process_ids.insert(process.id.as_str()) {
                return Err(invalid(&format!("duplicate process id \"{}\"", process.id)));
            }

            let mut phase_ids = HashSet::new();
            for phase in &process.phases {
                if phase.id.trim().is_empty() {
                    return Err(invalid(&format!(
                        "process \"{}\" has a phase with an empty id",
                        process.id
                    )));
                }
                if !phase_ids.insert(phase.id.as_str()) {
                    return Err(invalid(&format!(
                        "process \"{}\" has duplicate phase id \"{}\"",
                        process.id, phase.id
                    )));
                }
                if phase.steps.is_empty() {
                    return Err(invalid(&format!(
                        "phase \"{}/{}\" must declare at least one step",
                        process.id, phase.id
                    )));
                }

                let mut step_ids = HashSet::new();
                for step in &phase.steps {
                    if step.id.trim().is_empty() {
                        return Err(invalid(&format!(
                            "phase \"{}/{}\" has a step with an empty id",
                            process.id, phase.id
                        )));
                    }
                    if !step_ids.insert(step.id.as_str()) {
                        return Err(invalid(&format!(
                            "phase \"{}/{}\" has duplicate step id \"{}\"",
                            process.id, phase.id, step.id
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> CatalogError {
    CatalogError::Invalid {
        reason: reason.to_string(),
    }
}
