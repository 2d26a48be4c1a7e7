//! Configuration loading and validation

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use vrtrack_core::{TrackedDeviceType, TrackingOrigin};
use vrtrack_manager::ManagerConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Origin poses are expressed in
    #[serde(default)]
    pub origin: TrackingOrigin,
    /// Interval between two runtime event drain passes
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            origin: TrackingOrigin::default(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_poll_interval() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Parent frame of every published transform
    #[serde(default = "default_base_frame")]
    pub base_frame: String,
    /// Prepended to the serial number to form the child frame name
    #[serde(default)]
    pub frame_prefix: String,
    /// Publishing period in seconds
    #[serde(default = "default_period")]
    pub period_secs: f64,
    /// Where transforms are written
    #[serde(default)]
    pub sink: SinkKind,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            base_frame: default_base_frame(),
            frame_prefix: String::new(),
            period_secs: default_period(),
            sink: SinkKind::default(),
        }
    }
}

fn default_base_frame() -> String {
    "openVR_origin".to_string()
}

fn default_period() -> f64 {
    0.01
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Transforms go to the log at debug level
    #[default]
    Log,
    /// One JSON object per line on stdout
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeBackend {
    /// Devices declared in `[[runtime.device]]`
    #[default]
    Simulated,
    /// Running SteamVR server, requires the `openvr` feature
    OpenVr,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub backend: RuntimeBackend,
    /// Location of `openvr_api`, searched in the library path when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,
    /// Devices plugged into the simulated runtime at startup
    #[serde(default, rename = "device")]
    pub devices: Vec<SimulatedDeviceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedDeviceConfig {
    /// Hardware slot
    pub index: u32,
    /// Serial number
    pub serial: String,
    /// Device class
    pub class: TrackedDeviceType,
    /// Model number reported by the device
    pub model: Option<String>,
    /// Position in meters relative to the origin
    #[serde(default)]
    pub position: [f32; 3],
}

impl Config {
    /// Convert to ManagerConfig
    pub fn to_manager_config(&self) -> ManagerConfig {
        ManagerConfig {
            origin: self.tracking.origin,
            poll_interval: Duration::from_millis(self.tracking.poll_interval_ms),
        }
    }

    pub fn publish_period(&self) -> Duration {
        Duration::from_secs_f64(self.publisher.period_secs)
    }

    /// Reject values the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        if !(self.publisher.period_secs.is_finite() && self.publisher.period_secs > 0.0) {
            bail!(
                "publisher.period_secs must be positive, got {}",
                self.publisher.period_secs
            );
        }
        if self.tracking.poll_interval_ms == 0 {
            bail!("tracking.poll_interval_ms must be positive");
        }

        let mut indices: Vec<u32> = self.runtime.devices.iter().map(|d| d.index).collect();
        indices.sort_unstable();
        if let Some(pair) = indices.windows(2).find(|w| w[0] == w[1]) {
            bail!("Two simulated devices share index {}", pair[0]);
        }
        if let Some(device) = self
            .runtime
            .devices
            .iter()
            .find(|d| d.index >= vrtrack_core::MAX_TRACKED_DEVICE_COUNT)
        {
            bail!(
                "Simulated device {} has out of range index {}",
                device.serial,
                device.index
            );
        }
        Ok(())
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        config
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Config::default()
    };

    config.validate()?;
    Ok(config)
}

/// Save an example configuration to file
pub fn save_default_config(path: &Path) -> Result<()> {
    let config = Config {
        runtime: RuntimeConfig {
            backend: RuntimeBackend::Simulated,
            library_path: None,
            devices: vec![
                SimulatedDeviceConfig {
                    index: 0,
                    serial: "LHR-HMD00001".to_string(),
                    class: TrackedDeviceType::Hmd,
                    model: Some("Index".to_string()),
                    position: [0.0, 1.6, 0.0],
                },
                SimulatedDeviceConfig {
                    index: 3,
                    serial: "LHR-TRK00001".to_string(),
                    class: TrackedDeviceType::GenericTracker,
                    model: Some("VIVE Tracker 3.0".to_string()),
                    position: [0.3, 1.0, -0.2],
                },
            ],
        },
        ..Config::default()
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.tracking.origin, TrackingOrigin::Seated);
        assert_eq!(config.publisher.base_frame, "openVR_origin");
        assert_eq!(config.publish_period(), Duration::from_millis(10));
        assert_eq!(
            config.to_manager_config().poll_interval,
            Duration::from_secs(1)
        );
        assert!(config.runtime.devices.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vrtrack.toml");
        std::fs::write(
            &path,
            r#"
[tracking]
origin = "standing"
poll_interval_ms = 250

[publisher]
base_frame = "world"
sink = "json"

[[runtime.device]]
index = 1
serial = "LHR-1"
class = "controller"
position = [1.0, 2.0, 3.0]
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.tracking.origin, TrackingOrigin::Standing);
        assert_eq!(
            config.to_manager_config().poll_interval,
            Duration::from_millis(250)
        );
        assert_eq!(config.publisher.base_frame, "world");
        assert_eq!(config.publisher.sink, SinkKind::Json);
        assert_eq!(config.publisher.period_secs, 0.01);
        assert_eq!(config.runtime.devices.len(), 1);
        assert_eq!(
            config.runtime.devices[0].class,
            TrackedDeviceType::Controller
        );
        assert!(config.runtime.devices[0].model.is_none());
    }

    #[test]
    fn test_parse_openvr_backend() {
        let config: Config = toml::from_str(
            r#"
[runtime]
backend = "openvr"
library_path = "/opt/steamvr/libopenvr_api.so"
"#,
        )
        .unwrap();

        assert_eq!(config.runtime.backend, RuntimeBackend::OpenVr);
        assert_eq!(
            config.runtime.library_path.as_deref(),
            Some(Path::new("/opt/steamvr/libopenvr_api.so"))
        );
        assert!(config.runtime.devices.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_indices_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vrtrack.toml");
        std::fs::write(
            &path,
            r#"
[[runtime.device]]
index = 2
serial = "A"
class = "hmd"

[[runtime.device]]
index = 2
serial = "B"
class = "controller"
"#,
        )
        .unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_non_positive_period_rejected() {
        let mut config = Config::default();
        config.publisher.period_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_config_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("vrtrack.toml");
        save_default_config(&path).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.runtime.devices.len(), 2);
        assert_eq!(config.runtime.devices[0].class, TrackedDeviceType::Hmd);
    }
}
