//! Shared data models for the Facelift face-restoration worker.

mod job;

pub use job::{Job, JobId, JobResponse, MISSING_INPUT_URL};
