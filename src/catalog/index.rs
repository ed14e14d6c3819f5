//! Read-only lookup index over a validated process definition.
//!
//! Built once per reconciliation run and shared by reference into the
//! matcher, transformer and driver; never mutated.

use std::collections::HashMap;

use super::model::{PhaseSpec, ProcessDefinition, StepSpec};

/// Ordered phase/step lookups for the reconcile core.
///
/// Unknown processes and phases are expected outcomes, not errors: lookups
/// return empty slices or `None` and callers fall back per their contracts.
#[derive(Debug)]
pub struct ProcessIndex {
    processes: HashMap<String, ProcessEntry>,
}

#[derive(Debug)]
struct ProcessEntry {
    phase_order: Vec<String>,
    phases: HashMap<String, PhaseSpec>,
}

impl ProcessIndex {
    /// Build the index from a validated definition.
    pub fn new(definition: &ProcessDefinition) -> Self {
        let processes = definition
            .process
            .iter()
            .map(|process| {
                let phase_order = process.phases.iter().map(|p| p.id.clone()).collect();
                let phases = process
                    .phases
                    .iter()
                    .map(|p| (p.id.clone(), p.clone()))
                    .collect();
                (
                    process.id.clone(),
                    ProcessEntry {
                        phase_order,
                        phases,
                    },
                )
            })
            .collect();
        Self { processes }
    }

    /// Ordered phase ids for a process; empty if the process is unknown.
    pub fn process_phases(&self, process_id: &str) -> &[String] {
        self.processes
            .get(process_id)
            .map(|entry| entry.phase_order.as_slice())
            .unwrap_or(&[])
    }

    /// Full phase spec, or `None` if process or phase is unknown.
    pub fn phase(&self, process_id: &str, phase_id: &str) -> Option<&PhaseSpec> {
        self.processes.get(process_id)?.phases.get(phase_id)
    }

    /// Ordered steps for a phase; empty if process or phase is unknown.
    pub fn phase_steps(&self, process_id: &str, phase_id: &str) -> &[StepSpec] {
        self.phase(process_id, phase_id)
            .map(|phase| phase.steps.as_slice())
            .unwrap_or(&[])
    }

    /// Position of a phase in its process's declared order, or `None` if
    /// the phase (or process) is absent.
    pub fn phase_index(&self, process_id: &str, phase_id: &str) -> Option<usize> {
        self.processes
            .get(process_id)?
            .phase_order
            .iter()
            .position(|id| id == phase_id)
    }
}
