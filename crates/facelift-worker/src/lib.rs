//! Face-restoration video worker.
//!
//! One job in, one enhanced video out: download the source, restore every
//! frame through the engine, re-mux with the original audio, upload the
//! result. The serving surface is a small HTTP endpoint the job server posts
//! jobs to.

pub mod config;
pub mod error;
pub mod handler;
pub mod pipeline;
pub mod server;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use handler::{Enhance, JobHandler};
pub use pipeline::VideoPipeline;
