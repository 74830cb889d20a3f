#![deny(unreachable_patterns)]
//! S3-compatible object storage client.
//!
//! Enhanced videos are uploaded to a single configured bucket and addressed
//! by a publicly resolvable URL.

pub mod client;
pub mod error;

pub use client::{StorageClient, StorageConfig};
pub use error::{StorageError, StorageResult};
