//! Compute device selection.

use std::fmt;

use tracing::info;

/// Compute device used for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// NVIDIA GPU via the CUDA execution provider.
    Cuda,
    /// General-purpose CPU fallback.
    Cpu,
}

impl Device {
    /// Pick the accelerated device when available, else CPU.
    ///
    /// Called once per job invocation; the choice is not cached across jobs.
    pub fn detect() -> Self {
        let device = if cuda_available() {
            Device::Cuda
        } else {
            Device::Cpu
        };
        info!("Selected compute device: {}", device);
        device
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cuda => write!(f, "cuda"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

#[cfg(feature = "cuda")]
fn cuda_available() -> bool {
    // The CUDA EP is compiled in; probe for a visible device. nvidia-smi is
    // present wherever the container has the driver mounted.
    std::process::Command::new("nvidia-smi")
        .arg("-L")
        .output()
        .map(|o| o.status.success() && !o.stdout.is_empty())
        .unwrap_or(false)
}

#[cfg(not(feature = "cuda"))]
fn cuda_available() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_returns_some_device() {
        let device = Device::detect();
        assert!(matches!(device, Device::Cuda | Device::Cpu));
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_cpu_fallback_without_cuda_feature() {
        assert_eq!(Device::detect(), Device::Cpu);
    }

    #[test]
    fn test_display() {
        assert_eq!(Device::Cpu.to_string(), "cpu");
        assert_eq!(Device::Cuda.to_string(), "cuda");
    }
}
