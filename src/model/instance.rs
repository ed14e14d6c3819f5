//! Canonical instance records — the persistent dataset entries.
//!
//! An instance is the append-only record of one real-world process occurrence
//! (one candidate's hiring pipeline, one project engagement). It is created
//! exactly once, then only ever mutated: phase advanced, steps appended or
//! updated in place, metadata refreshed. Steps are never removed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Step statuses with first-class meaning. Any other status string passes
/// through untouched.
pub const STATUS_COMPLETED: &str = "completed";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_PENDING: &str = "pending";

// ── Instance ────────────────────────────────────────────────────────

/// One canonical process instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Immutable id, `YYYYMMDD_NNN`, unique within the dataset.
    pub instance_id: String,
    /// Derived display string; may be refreshed.
    pub instance_name: String,
    /// Immutable once set. Matching on process is exact, never fuzzy.
    pub process_id: String,
    /// Monotonically non-decreasing along the process's phase order.
    pub phase_id: String,
    /// Process-type-specific context block.
    pub context: InstanceContext,
    /// Append-only step history. `step_number` is dense 1..N in append
    /// order and is not a stable identifier; `step_id` is.
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    /// Provenance and reconciliation bookkeeping.
    #[serde(default)]
    pub metadata: InstanceMetadata,
}

// ── Context ─────────────────────────────────────────────────────────

/// Process-type-specific context. The shape is a function of `process_id`
/// at creation time; `Other` keeps entries from older datasets
/// round-trippable when their context matches none of the declared shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstanceContext {
    Recruiting(RecruitingContext),
    Project(ProjectContext),
    Generic(GenericContext),
    Other(Map<String, Value>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecruitingContext {
    pub job_title: Option<String>,
    pub client_company: Option<String>,
    pub department: Option<String>,
    pub seniority_level: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub urgency: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectContext {
    pub project_name: Option<String>,
    pub client_company: Option<String>,
    pub department: Option<String>,
    pub project_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenericContext {
    pub client_company: Option<String>,
    pub description: Option<String>,
}

impl InstanceContext {
    /// Client company text, regardless of shape.
    pub fn client_company(&self) -> Option<&str> {
        match self {
            Self::Recruiting(c) => c.client_company.as_deref(),
            Self::Project(c) => c.client_company.as_deref(),
            Self::Generic(c) => c.client_company.as_deref(),
            Self::Other(map) => map.get("client_company").and_then(Value::as_str),
        }
    }

    /// Role-ish text used to reinforce matching: job title, then project
    /// name. Generic descriptions deliberately do not participate.
    pub fn role_text(&self) -> Option<&str> {
        match self {
            Self::Recruiting(c) => c.job_title.as_deref(),
            Self::Project(c) => c.project_name.as_deref(),
            Self::Generic(_) => None,
            Self::Other(map) => map
                .get("job_title")
                .and_then(Value::as_str)
                .or_else(|| map.get("project_name").and_then(Value::as_str)),
        }
    }
}

// ── Steps ───────────────────────────────────────────────────────────

/// One trackable unit of progress inside an instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based sequence position at (re)build time. Not stable across
    /// appends; use `step_id` to identify a step within an instance+phase.
    pub step_number: u32,
    pub step_id: String,
    pub step_name: String,
    #[serde(default)]
    pub step_description: Option<String>,
    pub status: String,
    pub completion_status: String,
    #[serde(default)]
    pub timing: StepTiming,
    /// Free-form ownership block, passed through untouched.
    #[serde(default)]
    pub owner: Map<String, Value>,
}

impl StepRecord {
    /// Set both status fields together; they are never allowed to diverge.
    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.completion_status = status.to_string();
    }

    pub fn is_completed(&self) -> bool {
        self.status == STATUS_COMPLETED
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StepTiming {
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deadline: Option<DateTime<Utc>>,
}

// ── Metadata ────────────────────────────────────────────────────────

/// Provenance of an instance and of the latest reconciliation that touched
/// it. Unknown keys from older datasets are preserved via `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_instance_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_thread_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalization_reasoning: Option<String>,
    /// Always refreshed on create and update.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_reconciled: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_source_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_normalization: Option<LatestNormalization>,
    /// Most recent evidence snapshot (at most 3 entries).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub latest_evidence: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Snapshot of the observation that triggered the latest update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LatestNormalization {
    pub phase_id: String,
    pub step_id: Option<String>,
    pub step_status: String,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

// ── Dataset document ────────────────────────────────────────────────

/// The persisted dataset document. Everything outside `instances` is
/// preserved verbatim across a reconciliation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetDocument {
    #[serde(default)]
    pub instances: Vec<Instance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
