//! Document I/O — observation batches, dataset documents, process
//! definitions, and durable persistence of the reconciled result.

pub mod dataset;

pub use dataset::{load_dataset, load_observations, load_process_definition, save_dataset};
