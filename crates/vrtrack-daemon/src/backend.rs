//! Tracking runtime selection

use anyhow::Result;
use tracing::info;

use vrtrack_core::{RawPose, TrackingResult};
use vrtrack_runtime::{SimulatedDevice, SimulatedRuntime, TrackingRuntime};

use crate::config::{RuntimeBackend, RuntimeConfig, SimulatedDeviceConfig};

/// Build the runtime loader selected in the configuration
pub fn build_runtime(config: &RuntimeConfig) -> Result<Box<dyn TrackingRuntime>> {
    match config.backend {
        RuntimeBackend::Simulated => {
            let runtime = SimulatedRuntime::new();
            let controller = runtime.controller();
            for device in &config.devices {
                controller.attach(device.index, simulated_device(device));
            }
            info!(
                devices = config.devices.len(),
                "Using simulated tracking runtime"
            );
            Ok(Box::new(runtime))
        }
        RuntimeBackend::OpenVr => openvr_runtime(config),
    }
}

#[cfg(feature = "openvr")]
fn openvr_runtime(config: &RuntimeConfig) -> Result<Box<dyn TrackingRuntime>> {
    use vrtrack_runtime::OpenVrRuntime;

    let runtime = match &config.library_path {
        Some(path) => {
            info!(path = %path.display(), "Using OpenVR runtime");
            OpenVrRuntime::with_library_path(path)
        }
        None => {
            info!("Using OpenVR runtime");
            OpenVrRuntime::new()
        }
    };
    Ok(Box::new(runtime))
}

#[cfg(not(feature = "openvr"))]
fn openvr_runtime(_config: &RuntimeConfig) -> Result<Box<dyn TrackingRuntime>> {
    anyhow::bail!("vrtrackd was built without OpenVR support, rebuild with `--features openvr`")
}

fn simulated_device(config: &SimulatedDeviceConfig) -> SimulatedDevice {
    let [x, y, z] = config.position;
    let pose = RawPose {
        device_to_absolute: [
            [1.0, 0.0, 0.0, x],
            [0.0, 1.0, 0.0, y],
            [0.0, 0.0, 1.0, z],
        ],
        valid: true,
        device_connected: true,
        result: TrackingResult::RunningOk,
    };

    let device = SimulatedDevice::new(config.serial.clone(), config.class);
    let device = device.with_pose(pose);
    match &config.model {
        Some(model) => device.with_model(model.clone()),
        None => device,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrtrack_core::{DeviceProperty, TrackedDeviceType};

    #[test]
    fn test_simulated_backend_seeds_devices() {
        let config = RuntimeConfig {
            backend: RuntimeBackend::Simulated,
            library_path: None,
            devices: vec![SimulatedDeviceConfig {
                index: 4,
                serial: "LHR-4".to_string(),
                class: TrackedDeviceType::GenericTracker,
                model: Some("Tracker".to_string()),
                position: [0.1, 0.2, 0.3],
            }],
        };

        let mut runtime = build_runtime(&config).unwrap();
        let mut session = runtime.start().unwrap();
        assert!(session.is_connected(4));
        assert_eq!(
            session
                .string_property(4, DeviceProperty::ModelNumber)
                .unwrap(),
            "Tracker"
        );

        let poses = session.compute_poses(Default::default(), 5);
        assert!(poses[4].is_usable());
        assert_eq!(poses[4].device_to_absolute[2][3], 0.3);
        session.stop();
    }

    #[cfg(not(feature = "openvr"))]
    #[test]
    fn test_openvr_backend_requires_feature() {
        let config = RuntimeConfig {
            backend: RuntimeBackend::OpenVr,
            ..RuntimeConfig::default()
        };

        let err = build_runtime(&config).err().unwrap();
        assert!(err.to_string().contains("--features openvr"));
    }

    #[cfg(feature = "openvr")]
    #[test]
    fn test_openvr_backend_reports_missing_library() {
        let config = RuntimeConfig {
            backend: RuntimeBackend::OpenVr,
            library_path: Some("/nonexistent/libopenvr_api.so".into()),
            devices: Vec::new(),
        };

        let mut runtime = build_runtime(&config).unwrap();
        assert!(runtime.start().is_err());
    }
}
