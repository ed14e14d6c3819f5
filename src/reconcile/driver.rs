//! Reconciliation driver — gating, chronological ordering, id allocation
//! and orchestration of matcher + transformer over one batch.
//!
//! The whole batch is a sequential fold over the sorted observations: each
//! decision depends on the instance collection as left by the previous one,
//! so there is exactly one writer and no concurrency inside a run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::catalog::ProcessIndex;
use crate::config::ReconcileOptions;
use crate::model::{Instance, Observation};

use super::matcher;
use super::report::{CreatedEntry, ReconcileReport, SkipEntry, UpdateEntry};
use super::transformer;

/// Sentinel process id emitted upstream when classification failed.
const UNKNOWN_PROCESS: &str = "unknown";

/// Drives one reconciliation batch under a fixed set of options.
pub struct Reconciler {
    options: ReconcileOptions,
}

impl Reconciler {
    pub fn new(options: ReconcileOptions) -> Self {
        Self { options }
    }

    /// Reconcile a batch against the existing collection at `Utc::now()`.
    pub fn reconcile(
        &self,
        observations: Vec<Observation>,
        existing: Vec<Instance>,
        index: &ProcessIndex,
    ) -> (Vec<Instance>, ReconcileReport) {
        self.reconcile_at(observations, existing, index, Utc::now())
    }

    /// Reconcile with an explicit clock. `now` stamps `last_reconciled` and
    /// scopes new instance ids to today's date.
    pub fn reconcile_at(
        &self,
        mut observations: Vec<Observation>,
        mut instances: Vec<Instance>,
        index: &ProcessIndex,
        now: DateTime<Utc>,
    ) -> (Vec<Instance>, ReconcileReport) {
        // Chronological order is load-bearing: phase/step advancement is
        // order-sensitive and not commutative. The sort is stable, so ties
        // and missing timestamps (epoch sentinel) keep input order.
        observations.sort_by_key(|o| o.state.last_updated_at.unwrap_or(DateTime::UNIX_EPOCH));

        info!(
            observations = observations.len(),
            existing = instances.len(),
            min_confidence = self.options.min_confidence,
            match_threshold = self.options.match_threshold,
            "Reconciliation starting"
        );

        let mut report = ReconcileReport {
            total_processed: observations.len(),
            ..Default::default()
        };
        let mut ids = IdAllocator::new(now, &instances);

        for observation in &observations {
            let norm = &observation.normalized_step;

            if norm.confidence < self.options.min_confidence {
                skip(
                    &mut report,
                    observation,
                    format!(
                        "confidence {:.2} < {}",
                        norm.confidence, self.options.min_confidence
                    ),
                );
                continue;
            }

            if norm.process_id.is_empty() || norm.process_id == UNKNOWN_PROCESS {
                skip(&mut report, observation, "process_id is unknown".to_string());
                continue;
            }

            match matcher::find_best_match(observation, &instances, self.options.match_threshold) {
                Some(matched) if self.options.update_existing => {
                    let updated = transformer::update(matched, observation, index, now);
                    report.updates.push(UpdateEntry {
                        instance_id: matched.instance_id.clone(),
                        instance_name: matched.instance_name.clone(),
                        before_phase: matched.phase_id.clone(),
                        after_phase: updated.phase_id.clone(),
                        step_id: norm.step_id.clone(),
                        step_status: norm.step_status.clone(),
                        confidence: norm.confidence,
                    });
                    debug!(
                        instance_id = %updated.instance_id,
                        phase = %updated.phase_id,
                        "Updated existing instance"
                    );
                    replace_by_id(&mut instances, updated);
                }
                Some(_) => {
                    skip(
                        &mut report,
                        observation,
                        "match found but update disabled".to_string(),
                    );
                }
                None if self.options.create_new_instances => {
                    let new_id = ids.allocate();
                    let created = transformer::create(observation, index, &new_id, now);
                    report.new_instances.push(CreatedEntry {
                        instance_id: created.instance_id.clone(),
                        instance_name: created.instance_name.clone(),
                        process_id: created.process_id.clone(),
                        phase_id: created.phase_id.clone(),
                        step_id: norm.step_id.clone(),
                        step_status: norm.step_status.clone(),
                        confidence: norm.confidence,
                        reasoning: norm.reasoning.clone(),
                    });
                    debug!(instance_id = %created.instance_id, "Created new instance");
                    instances.push(created);
                }
                None => {
                    skip(
                        &mut report,
                        observation,
                        "no match and create disabled".to_string(),
                    );
                }
            }
        }

        info!(
            updated = report.updated_count(),
            created = report.created_count(),
            skipped = report.skipped_count(),
            "Reconciliation complete"
        );

        (instances, report)
    }
}

fn skip(report: &mut ReconcileReport, observation: &Observation, reason: String) {
    debug!(instance_key = %observation.instance_key, reason = %reason, "Skipping observation");
    report.skipped.push(SkipEntry {
        instance_key: observation.instance_key.clone(),
        reason,
    });
}

fn replace_by_id(instances: &mut [Instance], updated: Instance) {
    if let Some(slot) = instances
        .iter_mut()
        .find(|i| i.instance_id == updated.instance_id)
    {
        *slot = updated;
    }
}

/// Allocates dataset-unique instance ids: `YYYYMMDD_NNN`, scanning upward
/// past ids already present in the dataset or handed out earlier in the run.
struct IdAllocator {
    prefix: String,
    taken: HashSet<String>,
    next: u32,
}

impl IdAllocator {
    fn new(now: DateTime<Utc>, instances: &[Instance]) -> Self {
        Self {
            prefix: now.format("%Y%m%d").to_string(),
            taken: instances.iter().map(|i| i.instance_id.clone()).collect(),
            next: 1,
        }
    }

    fn allocate(&mut self) -> String {
        loop {
            let candidate = format!("{}_{:03}", self.prefix, self.next);
            self.next += 1;
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}
