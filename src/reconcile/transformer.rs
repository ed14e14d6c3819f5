//! Instance creation and functional update against the phase template.
//!
//! `create` builds a brand-new instance from one observation; `update`
//! returns a mutated copy of an existing one (the input is never aliased or
//! touched). Phase advancement is a one-way ratchet: a later phase forces
//! prior steps completed and appends the new phase's steps; an earlier phase
//! falls through to step-level handling and never rewinds `phase_id`.

use chrono::{DateTime, Utc};
use serde_json::Map;
use tracing::debug;

use crate::catalog::{PhaseSpec, ProcessIndex};
use crate::model::{
    GenericContext, Instance, InstanceContext, InstanceMetadata, LatestNormalization,
    NormalizedStep, Observation, ProjectContext, RecruitingContext, StepRecord, StepTiming,
    STATUS_COMPLETED, STATUS_PENDING,
};

/// At most this many evidence entries are snapshotted into metadata.
const EVIDENCE_SNAPSHOT_LIMIT: usize = 3;

// ── Create ──────────────────────────────────────────────────────────

/// Build a brand-new instance from an observation.
///
/// When the observed (process, phase) resolves in the index, the whole phase
/// is seeded around the observed step; otherwise the instance starts with a
/// single synthetic step so it is never left without one.
pub fn create(
    observation: &Observation,
    index: &ProcessIndex,
    instance_id: &str,
    now: DateTime<Utc>,
) -> Instance {
    let norm = &observation.normalized_step;
    let timestamp = observation.state.last_updated_at;

    let steps = match index.phase(&norm.process_id, &norm.phase_id) {
        Some(phase) => seed_phase_steps(phase, norm.step_id.as_deref(), &norm.step_status, timestamp),
        None => vec![synthetic_step(norm, timestamp)],
    };

    Instance {
        instance_id: instance_id.to_string(),
        instance_name: build_instance_name(observation),
        process_id: norm.process_id.clone(),
        phase_id: norm.phase_id.clone(),
        context: build_context(observation),
        steps,
        metadata: InstanceMetadata {
            source_instance_key: Some(observation.instance_key.clone()),
            source_thread_ids: (!observation.thread_ids.is_empty())
                .then(|| observation.thread_ids.clone()),
            parsed_confidence: observation.state.confidence,
            normalization_confidence: Some(norm.confidence),
            normalization_reasoning: norm.reasoning.clone(),
            last_reconciled: Some(now),
            ..Default::default()
        },
    }
}

fn build_instance_name(observation: &Observation) -> String {
    let client = observation
        .candidate_client
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("Unknown Client");
    let role_fallback = if observation.normalized_step.process_id == "project-management" {
        "Unknown Project"
    } else {
        "Unknown Role"
    };
    let role = observation
        .candidate_role
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or(role_fallback);
    format!("{role} - {client}")
}

/// Context shape is a function of the process type; role and client text is
/// stored as extracted, not normalized.
fn build_context(observation: &Observation) -> InstanceContext {
    let role = observation.candidate_role.clone();
    let client = observation.candidate_client.clone();
    match observation.normalized_step.process_id.as_str() {
        "recruiting" => InstanceContext::Recruiting(RecruitingContext {
            job_title: role,
            client_company: client,
            department: Some("Engineering".into()),
            seniority_level: None,
            location: Some("Remote".into()),
            employment_type: Some("Full-time".into()),
            urgency: Some("medium".into()),
        }),
        "project-management" => InstanceContext::Project(ProjectContext {
            project_name: role,
            client_company: client,
            department: Some("Engineering".into()),
            project_type: None,
        }),
        _ => InstanceContext::Generic(GenericContext {
            client_company: client,
            description: role,
        }),
    }
}

/// Single best-effort step for an unresolvable (process, phase).
fn synthetic_step(norm: &NormalizedStep, timestamp: Option<DateTime<Utc>>) -> StepRecord {
    let name = norm
        .reasoning
        .clone()
        .unwrap_or_else(|| "Unknown step".to_string());
    StepRecord {
        step_number: 1,
        step_id: norm.step_id.clone().unwrap_or_else(|| "unknown".to_string()),
        step_name: name.clone(),
        step_description: Some(name),
        status: norm.step_status.clone(),
        completion_status: norm.step_status.clone(),
        timing: StepTiming {
            started_at: timestamp,
            completed_at: None,
            deadline: None,
        },
        owner: Map::new(),
    }
}

// ── Phase seeding ───────────────────────────────────────────────────

/// Build the step sequence for a phase, positioned around the observed step.
///
/// Steps before the observed one are assumed completed (timestamps unknown,
/// left unset), the observed step takes the observation's status and
/// timestamp, steps after it are pending. An observed step absent from the
/// template falls back to the first step taking the status — a single
/// best-effort placement.
fn seed_phase_steps(
    phase: &PhaseSpec,
    current_step_id: Option<&str>,
    current_status: &str,
    timestamp: Option<DateTime<Utc>>,
) -> Vec<StepRecord> {
    let mut steps = Vec::with_capacity(phase.steps.len());
    let mut found_current = false;

    for (i, spec) in phase.steps.iter().enumerate() {
        let is_current = current_step_id == Some(spec.id.as_str());
        let (status, started_at, completed_at) = if is_current {
            found_current = true;
            let completed_at = if current_status == STATUS_COMPLETED {
                timestamp
            } else {
                None
            };
            (current_status, timestamp, completed_at)
        } else if found_current {
            (STATUS_PENDING, None, None)
        } else {
            (STATUS_COMPLETED, None, None)
        };

        steps.push(StepRecord {
            step_number: (i + 1) as u32,
            step_id: spec.id.clone(),
            step_name: spec.name.clone(),
            step_description: Some(spec.name.clone()),
            status: status.to_string(),
            completion_status: status.to_string(),
            timing: StepTiming {
                started_at,
                completed_at,
                deadline: None,
            },
            owner: Map::new(),
        });
    }

    if !found_current && let Some(first) = steps.first_mut() {
        first.set_status(current_status);
        first.timing.started_at = timestamp;
    }

    steps
}

// ── Update ──────────────────────────────────────────────────────────

/// Produce an updated copy of an existing instance from an observation.
///
/// The input instance is never mutated. Metadata is always refreshed, even
/// when the observation caused no phase or step change.
pub fn update(
    existing: &Instance,
    observation: &Observation,
    index: &ProcessIndex,
    now: DateTime<Utc>,
) -> Instance {
    let mut updated = existing.clone();
    let norm = &observation.normalized_step;
    let timestamp = observation.state.last_updated_at;

    let current_idx = index.phase_index(&updated.process_id, &updated.phase_id);
    let new_idx = index.phase_index(&updated.process_id, &norm.phase_id);

    match (current_idx, new_idx) {
        (Some(current), Some(new)) if new > current => {
            advance_phase(&mut updated, norm, index, timestamp);
        }
        (Some(current), Some(new)) if new < current => {
            // One-way ratchet: regression falls through to step handling.
            debug!(
                instance_id = %updated.instance_id,
                current_phase = %updated.phase_id,
                observed_phase = %norm.phase_id,
                "Ignoring phase regression"
            );
            apply_step_update(&mut updated, norm, timestamp);
        }
        _ => {
            // Same phase, or one side unresolvable.
            apply_step_update(&mut updated, norm, timestamp);
        }
    }

    let meta = &mut updated.metadata;
    meta.last_reconciled = Some(now);
    meta.latest_source_key = Some(observation.instance_key.clone());
    meta.latest_normalization = Some(LatestNormalization {
        phase_id: norm.phase_id.clone(),
        step_id: norm.step_id.clone(),
        step_status: norm.step_status.clone(),
        confidence: norm.confidence,
        reasoning: norm.reasoning.clone(),
    });
    let evidence: Vec<_> = observation
        .evidence
        .iter()
        .take(EVIDENCE_SNAPSHOT_LIMIT)
        .cloned()
        .collect();
    if !evidence.is_empty() {
        meta.latest_evidence = evidence;
    }

    updated
}

/// Advance to a later phase: everything accumulated so far is retroactively
/// completed, then the new phase's steps are seeded and appended with
/// continued numbering. Prior steps are never renumbered or overwritten.
fn advance_phase(
    updated: &mut Instance,
    norm: &NormalizedStep,
    index: &ProcessIndex,
    timestamp: Option<DateTime<Utc>>,
) {
    updated.phase_id = norm.phase_id.clone();

    for step in &mut updated.steps {
        if !step.is_completed() {
            step.set_status(STATUS_COMPLETED);
        }
    }

    if let Some(phase) = index.phase(&updated.process_id, &norm.phase_id) {
        let mut new_steps =
            seed_phase_steps(phase, norm.step_id.as_deref(), &norm.step_status, timestamp);
        let start = updated.steps.len() as u32;
        for (i, step) in new_steps.iter_mut().enumerate() {
            step.step_number = start + 1 + i as u32;
        }
        updated.steps.extend(new_steps);
    }
}

/// Step-level update within the current phase: mutate the matching step in
/// place, or append a new one if the step id is unseen. An observation
/// without a step id only refreshes metadata.
fn apply_step_update(
    updated: &mut Instance,
    norm: &NormalizedStep,
    timestamp: Option<DateTime<Utc>>,
) {
    let Some(step_id) = norm.step_id.as_deref() else {
        return;
    };

    if let Some(step) = updated.steps.iter_mut().find(|s| s.step_id == step_id) {
        step.set_status(&norm.step_status);
        if step.timing.started_at.is_none() {
            step.timing.started_at = timestamp;
        }
        if norm.step_status == STATUS_COMPLETED {
            step.timing.completed_at = timestamp;
        }
    } else {
        let completed_at = if norm.step_status == STATUS_COMPLETED {
            timestamp
        } else {
            None
        };
        updated.steps.push(StepRecord {
            step_number: updated.steps.len() as u32 + 1,
            step_id: step_id.to_string(),
            step_name: step_id.to_string(),
            step_description: norm.reasoning.clone(),
            status: norm.step_status.clone(),
            completion_status: norm.step_status.clone(),
            timing: StepTiming {
                started_at: timestamp,
                completed_at,
                deadline: None,
            },
            owner: Map::new(),
        });
    }
}
