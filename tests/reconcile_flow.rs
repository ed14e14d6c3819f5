//! Integration tests for the full reconciliation flow.
//!
//! Each test drives the real driver (matcher + transformer + id allocation)
//! against an in-memory dataset, with a fixed clock for deterministic ids
//! and timestamps. Persistence tests go through the real store.

use chrono::{DateTime, TimeZone, Utc};
use tempfile::tempdir;

use procsight::catalog::{ProcessDefinition, ProcessIndex};
use procsight::config::ReconcileOptions;
use procsight::model::{
    DatasetDocument, Instance, NormalizedStep, Observation, ObservationState, STATUS_COMPLETED,
    STATUS_IN_PROGRESS, STATUS_PENDING,
};
use procsight::reconcile::Reconciler;
use procsight::store;

fn index() -> ProcessIndex {
    let definition: ProcessDefinition = serde_yaml::from_str(
        r#"
process:
  - id: hiring
    phases:
      - id: sourcing
        steps:
          - {id: intake, name: Intake call}
          - {id: screening, name: Screening}
      - id: interviews
        steps:
          - {id: phone, name: Phone screen}
          - {id: onsite, name: Onsite loop}
      - id: close
        steps:
          - {id: offer, name: Offer}
"#,
    )
    .unwrap();
    definition.validate().unwrap();
    ProcessIndex::new(&definition)
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap()
}

fn observation(
    key: &str,
    client: &str,
    role: &str,
    phase: &str,
    step: &str,
    status: &str,
    confidence: f64,
    updated_at: &str,
) -> Observation {
    Observation {
        instance_key: key.into(),
        candidate_client: Some(client.into()),
        candidate_role: Some(role.into()),
        normalized_step: NormalizedStep {
            process_id: "hiring".into(),
            phase_id: phase.into(),
            step_id: Some(step.into()),
            step_status: status.into(),
            confidence,
            reasoning: Some("seen in thread".into()),
        },
        state: ObservationState {
            last_updated_at: Some(updated_at.parse().unwrap()),
            confidence: Some(0.8),
        },
        evidence: vec![],
        thread_ids: vec![key.into()],
    }
}

fn reconcile(
    observations: Vec<Observation>,
    existing: Vec<Instance>,
) -> (Vec<Instance>, procsight::reconcile::ReconcileReport) {
    Reconciler::new(ReconcileOptions::default()).reconcile_at(observations, existing, &index(), now())
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn scenario_create_from_empty_dataset() {
    let obs = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_COMPLETED,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    let (instances, report) = reconcile(vec![obs], vec![]);

    assert_eq!(instances.len(), 1);
    assert_eq!(report.created_count(), 1);
    let created = &instances[0];
    assert_eq!(created.instance_name, "AI Engineer - Altum");
    assert_eq!(created.instance_id, "20260120_001");
    assert_eq!(created.phase_id, "sourcing");
    assert_eq!(created.steps[0].step_id, "intake");
    assert_eq!(created.steps[0].status, STATUS_COMPLETED);
}

#[test]
fn scenario_update_same_phase_completes_step() {
    let seed = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-18T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![seed], vec![]);
    let steps_before = instances[0].steps.len();

    let follow_up = observation(
        "thread:2",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_COMPLETED,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    let (instances, report) = reconcile(vec![follow_up], instances);

    assert_eq!(report.updated_count(), 1);
    assert_eq!(instances.len(), 1);
    let updated = &instances[0];
    assert_eq!(updated.phase_id, "sourcing");
    assert_eq!(updated.steps.len(), steps_before);
    let intake = updated.steps.iter().find(|s| s.step_id == "intake").unwrap();
    assert_eq!(intake.status, STATUS_COMPLETED);
    assert_eq!(
        intake.timing.completed_at,
        Some("2026-01-19T00:00:00Z".parse().unwrap())
    );
}

#[test]
fn scenario_phase_advance_completes_history_and_appends() {
    let seed = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "screening",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-18T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![seed], vec![]);
    assert_eq!(instances[0].steps.len(), 2);

    let advance = observation(
        "thread:2",
        "Altum",
        "AI Engineer",
        "interviews",
        "onsite",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![advance], instances);

    let updated = &instances[0];
    assert_eq!(updated.phase_id, "interviews");
    assert_eq!(updated.steps.len(), 4);
    assert!(updated.steps[..2].iter().all(|s| s.status == STATUS_COMPLETED));
    assert_eq!(updated.steps[2].step_id, "phone");
    assert_eq!(updated.steps[3].step_id, "onsite");
    assert_eq!(updated.steps[3].status, STATUS_IN_PROGRESS);
    assert_eq!(
        updated.steps.iter().map(|s| s.step_number).collect::<Vec<_>>(),
        [1, 2, 3, 4]
    );
}

#[test]
fn scenario_low_confidence_is_skipped() {
    let obs = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_COMPLETED,
        0.4,
        "2026-01-19T00:00:00Z",
    );
    let (instances, report) = reconcile(vec![obs], vec![]);

    assert!(instances.is_empty());
    assert_eq!(report.created_count(), 0);
    assert_eq!(report.updated_count(), 0);
    assert_eq!(report.skipped_count(), 1);
    assert!(report.skipped[0].reason.contains("confidence"));
}

#[test]
fn scenario_no_match_create_disabled_leaves_dataset_unchanged() {
    let seed = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-18T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![seed], vec![]);
    let snapshot = serde_json::to_value(&instances).unwrap();

    let unmatched = observation(
        "thread:2",
        "Completely Different Co",
        "Designer",
        "sourcing",
        "intake",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    let options = ReconcileOptions {
        create_new_instances: false,
        ..Default::default()
    };
    let (instances, report) =
        Reconciler::new(options).reconcile_at(vec![unmatched], instances, &index(), now());

    assert_eq!(report.skipped[0].reason, "no match and create disabled");
    assert_eq!(serde_json::to_value(&instances).unwrap(), snapshot);
}

// ── Properties ──────────────────────────────────────────────────────

#[test]
fn reprocessing_the_same_batch_is_idempotent() {
    let batch = vec![
        observation(
            "thread:1",
            "Altum",
            "AI Engineer",
            "sourcing",
            "intake",
            STATUS_COMPLETED,
            0.9,
            "2026-01-18T00:00:00Z",
        ),
        observation(
            "thread:2",
            "Altum",
            "AI Engineer",
            "interviews",
            "phone",
            STATUS_IN_PROGRESS,
            0.9,
            "2026-01-19T00:00:00Z",
        ),
    ];

    let (first, _) = reconcile(batch.clone(), vec![]);
    let (second, report) = reconcile(batch, first.clone());

    // Same batch again: everything matches, nothing new is created.
    assert_eq!(report.created_count(), 0);
    assert_eq!(report.updated_count(), 2);
    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.instance_id, b.instance_id);
        assert_eq!(a.phase_id, b.phase_id);
        assert_eq!(a.steps.len(), b.steps.len());
        for (sa, sb) in a.steps.iter().zip(&b.steps) {
            assert_eq!(sa.status, sb.status);
            assert_eq!(sa.timing.started_at, sb.timing.started_at);
            assert_eq!(sa.timing.completed_at, sb.timing.completed_at);
        }
    }
}

#[test]
fn phase_never_decreases_across_updates() {
    let phases = |instances: &[Instance]| instances[0].phase_id.clone();

    let seed = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "interviews",
        "phone",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-18T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![seed], vec![]);
    assert_eq!(phases(&instances), "interviews");

    // A later observation claiming an earlier phase must not rewind.
    let regression = observation(
        "thread:2",
        "Altum",
        "AI Engineer",
        "sourcing",
        "screening",
        STATUS_COMPLETED,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    let (instances, report) = reconcile(vec![regression], instances);
    assert_eq!(report.updated_count(), 1);
    assert_eq!(phases(&instances), "interviews");

    let advance = observation(
        "thread:3",
        "Altum",
        "AI Engineer",
        "close",
        "offer",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-20T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![advance], instances);
    assert_eq!(phases(&instances), "close");
}

#[test]
fn process_mismatch_creates_a_parallel_instance() {
    let seed = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-18T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![seed], vec![]);

    // Same client and role, different process: must never match.
    let mut other = observation(
        "thread:2",
        "Altum",
        "AI Engineer",
        "kickoff",
        "scope",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    other.normalized_step.process_id = "project-management".into();
    let (instances, report) = reconcile(vec![other], instances);

    assert_eq!(report.updated_count(), 0);
    assert_eq!(report.created_count(), 1);
    assert_eq!(instances.len(), 2);
}

#[test]
fn match_threshold_boundary_accepts_080_rejects_079() {
    let at_boundary = |existing_client: &str, obs_client: &str| {
        let seed = observation(
            "thread:1",
            existing_client,
            "AI Engineer",
            "sourcing",
            "intake",
            STATUS_IN_PROGRESS,
            0.9,
            "2026-01-18T00:00:00Z",
        );
        let (instances, _) = reconcile(vec![seed], vec![]);
        let probe = observation(
            "thread:2",
            obs_client,
            "AI Engineer",
            "sourcing",
            "intake",
            STATUS_COMPLETED,
            0.9,
            "2026-01-19T00:00:00Z",
        );
        let (_, report) = reconcile(vec![probe], instances);
        (report.updated_count(), report.created_count())
    };

    // 2 substitutions over 10 chars: similarity exactly 0.80 — accepted.
    assert_eq!(at_boundary("abcdefghij", "abcdefghxy"), (1, 0));

    // 21 substitutions over 100 chars: similarity exactly 0.79 — rejected.
    let existing = "a".repeat(100);
    let probe = format!("{}{}", "a".repeat(79), "b".repeat(21));
    assert_eq!(at_boundary(&existing, &probe), (0, 1));
}

// ── Persistence ─────────────────────────────────────────────────────

#[tokio::test]
async fn dataset_round_trips_through_the_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dataset.json");

    let obs = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_COMPLETED,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![obs], vec![]);

    let mut document = DatasetDocument::default();
    document
        .extra
        .insert("schema_version".into(), serde_json::json!(2));
    document.instances = instances;

    store::save_dataset(&path, &document).await.unwrap();

    // No temp file is left behind next to the target.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, ["dataset.json"]);

    let loaded = store::load_dataset(&path).await.unwrap();
    assert_eq!(loaded.instances.len(), 1);
    assert_eq!(loaded.instances[0].instance_name, "AI Engineer - Altum");
    assert_eq!(loaded.extra["schema_version"], 2);
    assert_eq!(
        serde_json::to_value(&loaded).unwrap(),
        serde_json::to_value(&document).unwrap()
    );
}

#[tokio::test]
async fn save_overwrites_previous_dataset_atomically() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dataset.json");

    let first = DatasetDocument::default();
    store::save_dataset(&path, &first).await.unwrap();

    let obs = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_COMPLETED,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![obs], vec![]);
    let second = DatasetDocument {
        instances,
        ..Default::default()
    };
    store::save_dataset(&path, &second).await.unwrap();

    let loaded = store::load_dataset(&path).await.unwrap();
    assert_eq!(loaded.instances.len(), 1);
}

#[tokio::test]
async fn observations_load_from_disk_and_reconcile() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("instances.normalized.json");
    std::fs::write(
        &path,
        r#"{
            "instances": [
                {
                    "instance_key": "thread:1",
                    "candidate_client": "Altum",
                    "candidate_role": "AI Engineer",
                    "normalized_step": {
                        "process_id": "hiring",
                        "phase_id": "sourcing",
                        "step_id": "intake",
                        "step_status": "completed",
                        "confidence": 0.9,
                        "reasoning": "intake confirmed"
                    },
                    "state": {
                        "last_updated_at": "2026-01-19T00:00:00Z",
                        "confidence": 0.8
                    },
                    "evidence": []
                }
            ]
        }"#,
    )
    .unwrap();

    let batch = store::load_observations(&path).await.unwrap();
    assert_eq!(batch.instances.len(), 1);

    let (instances, report) = reconcile(batch.instances, vec![]);
    assert_eq!(report.created_count(), 1);
    assert_eq!(instances[0].instance_name, "AI Engineer - Altum");
}

#[tokio::test]
async fn loading_missing_documents_reports_not_found() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("nope.json");
    let err = store::load_dataset(&missing).await.unwrap_err();
    assert!(matches!(err, procsight::error::DatasetError::NotFound(_)));
}

#[tokio::test]
async fn invalid_process_definition_fails_at_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("process_definition.yml");
    std::fs::write(
        &path,
        r#"
process:
  - id: hiring
    phases:
      - id: sourcing
        steps: []
"#,
    )
    .unwrap();

    let err = store::load_process_definition(&path).await.unwrap_err();
    assert!(matches!(err, procsight::error::CatalogError::Invalid { .. }));
}

#[test]
fn pending_steps_stay_pending_until_observed() {
    let obs = observation(
        "thread:1",
        "Altum",
        "AI Engineer",
        "sourcing",
        "intake",
        STATUS_IN_PROGRESS,
        0.9,
        "2026-01-19T00:00:00Z",
    );
    let (instances, _) = reconcile(vec![obs], vec![]);
    let screening = instances[0]
        .steps
        .iter()
        .find(|s| s.step_id == "screening")
        .unwrap();
    assert_eq!(screening.status, STATUS_PENDING);
    assert!(screening.timing.started_at.is_none());
}
