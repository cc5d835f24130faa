//! # Device Detection
//!
//! Picks the compute device the Whisper model runs on (CPU/CUDA/Metal), with
//! automatic detection and CPU fallback.

use candle_core::Device;
use std::sync::OnceLock;
use tracing::{debug, info, warn};

/// Cached auto-detected device so detection runs at most once.
static BEST_DEVICE: OnceLock<Device> = OnceLock::new();

/// Device preference from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Automatically select the best available device
    #[default]
    Auto,
    /// Force CPU usage
    Cpu,
    /// CUDA GPU, falling back to CPU if unavailable
    Cuda,
    /// Metal GPU, falling back to CPU if unavailable
    Metal,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" | "automatic" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            "metal" => Ok(DevicePreference::Metal),
            _ => Err(format!("Unknown device preference: {}", s)),
        }
    }
}

/// Resolve a configured preference string to a concrete device.
///
/// Invalid strings fall back to auto-detection with a warning rather than
/// failing startup over a typo.
pub fn select_device(preference: &str) -> Device {
    let preference = match preference.parse::<DevicePreference>() {
        Ok(p) => p,
        Err(_) => {
            warn!("Invalid device preference '{}', using auto", preference);
            DevicePreference::Auto
        }
    };

    match preference {
        DevicePreference::Auto => best_device(),
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => cuda_device().unwrap_or(Device::Cpu),
        DevicePreference::Metal => metal_device().unwrap_or(Device::Cpu),
    }
}

/// Human-readable device name for startup logging.
pub fn device_name(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "CPU",
        Device::Cuda(_) => "CUDA GPU",
        Device::Metal(_) => "Metal GPU",
    }
}

fn best_device() -> Device {
    BEST_DEVICE
        .get_or_init(|| {
            if let Some(cuda) = cuda_device() {
                info!("Selected CUDA GPU for model inference");
                return cuda;
            }
            if let Some(metal) = metal_device() {
                info!("Selected Metal GPU for model inference");
                return metal;
            }
            info!("Using CPU for model inference (no GPU acceleration available)");
            Device::Cpu
        })
        .clone()
}

fn cuda_device() -> Option<Device> {
    match Device::new_cuda(0) {
        Ok(device) => Some(device),
        Err(e) => {
            debug!("CUDA not available: {}", e);
            None
        }
    }
}

fn metal_device() -> Option<Device> {
    match Device::new_metal(0) {
        Ok(device) => Some(device),
        Err(e) => {
            debug!("Metal not available: {}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_parsing() {
        assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert_eq!("cpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
        assert_eq!("gpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert_eq!("METAL".parse::<DevicePreference>().unwrap(), DevicePreference::Metal);
        assert!("quantum".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_cpu_selection_always_works() {
        let device = select_device("cpu");
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn test_invalid_preference_falls_back() {
        // Must not panic; returns whatever auto-detection finds
        let device = select_device("not-a-device");
        let _ = device_name(&device);
    }
}
