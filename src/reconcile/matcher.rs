//! Fuzzy matching of observations onto existing dataset instances.
//!
//! Process id must match exactly; client similarity is mandatory; role
//! similarity is optional reinforcement. There is no unique key — the client
//! name is the anchor, which is why an observation without one never matches.

use tracing::debug;

use crate::model::{Instance, Observation};

use super::text::{normalize, normalize_client_name, similarity};

/// Weighting of client vs role similarity in the combined ranking score.
const CLIENT_WEIGHT: f64 = 0.6;
const ROLE_WEIGHT: f64 = 0.4;

/// Per-candidate similarity scores that survived the threshold filters.
struct CandidateScores {
    client: f64,
    role: f64,
}

/// Find the single best-scoring existing instance for an observation.
///
/// Returns `None` when the observation has no client name, or when no
/// candidate survives the per-field thresholds. Ties keep the first-seen
/// candidate (input order is stable).
pub fn find_best_match<'a>(
    observation: &Observation,
    instances: &'a [Instance],
    threshold: f64,
) -> Option<&'a Instance> {
    let obs_client = normalize_client_name(observation.candidate_client.as_deref().unwrap_or(""));
    if obs_client.is_empty() {
        return None;
    }
    let obs_process = observation.normalized_step.process_id.as_str();
    let obs_role = normalize(observation.candidate_role.as_deref().unwrap_or(""));

    let mut best: Option<&Instance> = None;
    let mut best_score = 0.0;

    for existing in instances {
        let Some(scores) = candidate_scores(existing, obs_process, &obs_client, &obs_role, threshold)
        else {
            continue;
        };
        let combined = scores.client * CLIENT_WEIGHT + scores.role * ROLE_WEIGHT;
        if combined > best_score {
            best_score = combined;
            best = Some(existing);
        }
    }

    if let Some(matched) = best {
        debug!(
            instance_key = %observation.instance_key,
            instance_id = %matched.instance_id,
            score = best_score,
            "Matched observation to existing instance"
        );
    }
    best
}

/// Find every existing instance that survives the same per-field filters.
///
/// Used for duplicate detection; no ranking, no combined score.
pub fn find_all_matches<'a>(
    observation: &Observation,
    instances: &'a [Instance],
    threshold: f64,
) -> Vec<&'a Instance> {
    let obs_client = normalize_client_name(observation.candidate_client.as_deref().unwrap_or(""));
    if obs_client.is_empty() {
        return Vec::new();
    }
    let obs_process = observation.normalized_step.process_id.as_str();
    let obs_role = normalize(observation.candidate_role.as_deref().unwrap_or(""));

    instances
        .iter()
        .filter(|existing| {
            candidate_scores(existing, obs_process, &obs_client, &obs_role, threshold).is_some()
        })
        .collect()
}

/// Apply the candidate filters: exact process, client similarity over
/// threshold, role similarity over threshold when both sides have one.
/// Missing role on either side scores full credit — no penalty for missing
/// data.
fn candidate_scores(
    existing: &Instance,
    obs_process: &str,
    obs_client: &str,
    obs_role: &str,
    threshold: f64,
) -> Option<CandidateScores> {
    if existing.process_id != obs_process {
        return None;
    }

    let existing_client = normalize_client_name(existing.context.client_company().unwrap_or(""));
    if existing_client.is_empty() {
        return None;
    }
    let client = similarity(obs_client, &existing_client);
    if client < threshold {
        return None;
    }

    let existing_role = normalize(existing.context.role_text().unwrap_or(""));
    let mut role = 1.0;
    if !obs_role.is_empty() && !existing_role.is_empty() {
        role = similarity(obs_role, &existing_role);
        if role < threshold {
            return None;
        }
    }

    Some(CandidateScores { client, role })
}
