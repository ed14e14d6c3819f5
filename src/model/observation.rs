//! Observation records — the normalized input stream.
//!
//! One observation is one timestamped, confidence-scored assertion about a
//! process instance ("entity X is at phase/step Y with status Z"), produced
//! upstream by the step classifier. Observations are immutable; the driver
//! imposes its own chronological order on them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel emitted by the upstream classifier when it could not commit to a
/// process or phase.
const UNKNOWN_ID: &str = "unknown";

/// One normalized observation about a process instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observation {
    /// Stable key of the upstream conversation grouping (e.g. a thread).
    pub instance_key: String,
    /// Client company as extracted, free text.
    #[serde(default)]
    pub candidate_client: Option<String>,
    /// Role or project text as extracted, free text.
    #[serde(default)]
    pub candidate_role: Option<String>,
    /// Structured classification of the free-form step text.
    pub normalized_step: NormalizedStep,
    /// Upstream extraction state.
    #[serde(default)]
    pub state: ObservationState,
    /// Evidence references. Opaque to the core: stored, never interpreted.
    #[serde(default)]
    pub evidence: Vec<serde_json::Value>,
    /// Source thread references, carried into created-instance metadata.
    #[serde(default)]
    pub thread_ids: Vec<String>,
}

/// Structured (process, phase, step, status) tuple from the classifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedStep {
    #[serde(default = "unknown_id")]
    pub process_id: String,
    #[serde(default = "unknown_id")]
    pub phase_id: String,
    #[serde(default)]
    pub step_id: Option<String>,
    #[serde(default = "default_step_status")]
    pub step_status: String,
    /// Classifier confidence in this tuple, [0, 1].
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

fn unknown_id() -> String {
    UNKNOWN_ID.to_string()
}

fn default_step_status() -> String {
    "in_progress".to_string()
}

/// Extraction-time state of the observation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationState {
    /// When the underlying communication was last updated. Missing
    /// timestamps sort first (epoch sentinel) in the driver.
    #[serde(default)]
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Upstream parse confidence, distinct from the classifier confidence.
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Top-level observation document: `{ "instances": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservationBatch {
    #[serde(default)]
    pub instances: Vec<Observation>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_observation_gets_safe_defaults() {
        let obs: Observation = serde_json::from_str(
            r#"{"instance_key": "thread:1", "normalized_step": {}}"#,
        )
        .unwrap();

        assert_eq!(obs.normalized_step.process_id, "unknown");
        assert_eq!(obs.normalized_step.phase_id, "unknown");
        assert_eq!(obs.normalized_step.step_status, "in_progress");
        assert_eq!(obs.normalized_step.confidence, 0.0);
        assert!(obs.normalized_step.step_id.is_none());
        assert!(obs.candidate_client.is_none());
        assert!(obs.state.last_updated_at.is_none());
        assert!(obs.evidence.is_empty());
        assert!(obs.thread_ids.is_empty());
    }

    #[test]
    fn full_observation_round_trips() {
        let obs: Observation = serde_json::from_str(
            r#"{
                "instance_key": "thread:42",
                "candidate_client": "Altum Inc",
                "candidate_role": "AI Engineer",
                "normalized_step": {
                    "process_id": "hiring",
                    "phase_id": "sourcing",
                    "step_id": "intake",
                    "step_status": "completed",
                    "confidence": 0.92,
                    "reasoning": "Intake call confirmed done"
                },
                "state": {
                    "last_updated_at": "2026-01-19T00:00:00Z",
                    "confidence": 0.8
                },
                "evidence": [{"message_id": "m1"}],
                "thread_ids": ["thread:42"]
            }"#,
        )
        .unwrap();

        assert_eq!(obs.normalized_step.step_id.as_deref(), Some("intake"));
        assert_eq!(
            obs.state.last_updated_at.unwrap().to_rfc3339(),
            "2026-01-19T00:00:00+00:00"
        );
        assert_eq!(obs.evidence.len(), 1);

        let json = serde_json::to_value(&obs).unwrap();
        assert_eq!(json["normalized_step"]["process_id"], "hiring");
        assert_eq!(json["thread_ids"][0], "thread:42");
    }

    #[test]
    fn batch_tolerates_missing_instances_key() {
        let batch: ObservationBatch = serde_json::from_str("{}").unwrap();
        assert!(batch.instances.is_empty());
    }
}
