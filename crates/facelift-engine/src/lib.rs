#![deny(unreachable_patterns)]
//! Face-restoration engine for the Facelift worker.
//!
//! The model itself is a black box: a pretrained GFPGAN network exported to
//! ONNX, run per frame through ONNX Runtime. This crate provides:
//! - the [`FaceRestorer`] trait the pipeline programs against
//! - [`GfpganRestorer`], the ort-backed implementation
//! - compute device selection (CUDA when compiled in, CPU fallback)
//! - checkpoint provisioning: weight download-if-missing and network-volume
//!   mapping performed once at process start

pub mod device;
pub mod error;
pub mod restorer;
pub mod weights;

pub use device::Device;
pub use error::{EngineError, EngineResult};
pub use restorer::{FaceRestorer, GfpganRestorer, NetworkVariant, RestorerOptions};
pub use weights::{map_network_volume, sync_checkpoints, WeightsConfig};
