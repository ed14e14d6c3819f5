//! Declarative process catalog — definition model and read-only index.

pub mod index;
pub mod model;

pub use index::ProcessIndex;
pub use model::{PhaseSpec, ProcessDefinition, ProcessSpec, StepSpec};
