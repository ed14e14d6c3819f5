//! Reconciliation report — statistics plus bounded human-review previews.
//!
//! The driver fills the report; rendering is pure string assembly so the
//! binary (or a test) decides where it goes.

use std::fmt::Write;

use serde::Serialize;

/// How many update/creation entries the rendered report previews.
const PREVIEW_CHANGES: usize = 10;
/// How many skip entries the rendered report previews.
const PREVIEW_SKIPS: usize = 5;
/// Reasoning text is clipped to this many characters in previews.
const REASONING_CLIP: usize = 60;

/// Outcome of one reconciliation batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReconcileReport {
    /// Observations fed into the batch (including skipped ones).
    pub total_processed: usize,
    pub updates: Vec<UpdateEntry>,
    pub new_instances: Vec<CreatedEntry>,
    pub skipped: Vec<SkipEntry>,
}

impl ReconcileReport {
    pub fn updated_count(&self) -> usize {
        self.updates.len()
    }

    pub fn created_count(&self) -> usize {
        self.new_instances.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// One matched-and-updated instance.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateEntry {
    pub instance_id: String,
    pub instance_name: String,
    pub before_phase: String,
    pub after_phase: String,
    pub step_id: Option<String>,
    pub step_status: String,
    pub confidence: f64,
}

/// One newly created instance.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedEntry {
    pub instance_id: String,
    pub instance_name: String,
    pub process_id: String,
    pub phase_id: String,
    pub step_id: Option<String>,
    pub step_status: String,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

/// One skipped observation with its gate reason.
#[derive(Debug, Clone, Serialize)]
pub struct SkipEntry {
    pub instance_key: String,
    pub reason: String,
}

/// Render the report for human review.
pub fn render_report(report: &ReconcileReport, dry_run: bool) -> String {
    let mut out = String::new();
    let rule = "=".repeat(60);
    let dash = "-".repeat(60);

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "              RECONCILIATION REPORT");
    if dry_run {
        let _ = writeln!(out, "                  [DRY RUN MODE]");
    }
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out);
    let _ = writeln!(out, "Total processed:    {}", report.total_processed);
    let _ = writeln!(out, "Matched & updated:  {}", report.updated_count());
    let _ = writeln!(out, "New created:        {}", report.created_count());
    let _ = writeln!(out, "Skipped:            {}", report.skipped_count());
    let _ = writeln!(out);

    if !report.updates.is_empty() {
        let _ = writeln!(out, "{dash}");
        let _ = writeln!(out, "UPDATES ({}):", report.updates.len());
        let _ = writeln!(out, "{dash}");
        for (i, update) in report.updates.iter().take(PREVIEW_CHANGES).enumerate() {
            let _ = writeln!(
                out,
                "  [{}] {} ({})",
                i + 1,
                update.instance_name,
                update.instance_id
            );
            let _ = writeln!(
                out,
                "      Phase: {} -> {}",
                update.before_phase, update.after_phase
            );
            let _ = writeln!(
                out,
                "      Step: {} ({})",
                update.step_id.as_deref().unwrap_or("-"),
                update.step_status
            );
            let _ = writeln!(out, "      Confidence: {:.2}", update.confidence);
        }
        overflow(&mut out, report.updates.len(), PREVIEW_CHANGES);
        let _ = writeln!(out);
    }

    if !report.new_instances.is_empty() {
        let _ = writeln!(out, "{dash}");
        let _ = writeln!(out, "NEW INSTANCES ({}):", report.new_instances.len());
        let _ = writeln!(out, "{dash}");
        for (i, created) in report.new_instances.iter().take(PREVIEW_CHANGES).enumerate() {
            let _ = writeln!(out, "  [{}] {}", i + 1, created.instance_name);
            let _ = writeln!(out, "      ID: {}", created.instance_id);
            let _ = writeln!(out, "      Process: {}", created.process_id);
            let _ = writeln!(out, "      Phase: {}", created.phase_id);
            let _ = writeln!(
                out,
                "      Step: {} ({})",
                created.step_id.as_deref().unwrap_or("-"),
                created.step_status
            );
            let _ = writeln!(out, "      Confidence: {:.2}", created.confidence);
            if let Some(reasoning) = created.reasoning.as_deref()
                && !reasoning.is_empty()
            {
                let clipped: String = reasoning.chars().take(REASONING_CLIP).collect();
                let _ = writeln!(out, "      Reasoning: {clipped}...");
            }
        }
        overflow(&mut out, report.new_instances.len(), PREVIEW_CHANGES);
        let _ = writeln!(out);
    }

    if !report.skipped.is_empty() {
        let _ = writeln!(out, "{dash}");
        let _ = writeln!(out, "SKIPPED ({}):", report.skipped.len());
        let _ = writeln!(out, "{dash}");
        for skip in report.skipped.iter().take(PREVIEW_SKIPS) {
            let _ = writeln!(out, "  - {}: {}", skip.instance_key, skip.reason);
        }
        overflow(&mut out, report.skipped.len(), PREVIEW_SKIPS);
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "{rule}");
    out
}

fn overflow(out: &mut String, total: usize, shown: usize) {
    if total > shown {
        let _ = writeln!(out, "  ... and {} more", total - shown);
    }
}
