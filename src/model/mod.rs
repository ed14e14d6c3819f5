//! Boundary-validated record types for the reconciliation pipeline.
//!
//! Upstream documents are deserialized into these types once, at load time;
//! the reconcile core never touches untyped JSON.

pub mod instance;
pub mod observation;

pub use instance::{
    DatasetDocument, GenericContext, Instance, InstanceContext, InstanceMetadata,
    LatestNormalization, ProjectContext, RecruitingContext, StepRecord, StepTiming,
    STATUS_COMPLETED, STATUS_IN_PROGRESS, STATUS_PENDING,
};
pub use observation::{NormalizedStep, Observation, ObservationBatch, ObservationState};
