//! The reconciliation core.
//!
//! One batch flows: gating filters → chronological sort → per observation:
//! `matcher::find_best_match` → `transformer::create`/`update` → accumulate
//! into the instance collection. The core performs no I/O; loading and
//! persistence live in `store`.

pub mod driver;
pub mod matcher;
pub mod report;
pub mod text;
pub mod transformer;

pub use driver::Reconciler;
pub use report::{render_report, CreatedEntry, ReconcileReport, SkipEntry, UpdateEntry};
