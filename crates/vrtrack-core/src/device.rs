//! Device types for tracking hardware exposed by the tracking runtime

use serde::{Deserialize, Serialize};

/// Number of hardware slots the runtime can expose at once
pub const MAX_TRACKED_DEVICE_COUNT: u32 = 64;

/// Hardware slot assigned by the runtime. Slots are reused once a device
/// disconnects, so they identify a device only while it is connected.
pub type DeviceIndex = u32;

/// Class of a tracked device, as reported by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackedDeviceType {
    /// Slot is empty or the class is unknown
    Invalid,
    /// Head-mounted display
    Hmd,
    /// Hand controller
    Controller,
    /// Generic tracker (puck)
    GenericTracker,
    /// Base station / camera
    TrackingReference,
    /// Display redirect (virtual display)
    DisplayRedirect,
}

impl TrackedDeviceType {
    /// Whether devices of this class are kept in the registry
    pub fn is_supported(self) -> bool {
        matches!(self, Self::Hmd | Self::Controller | Self::GenericTracker)
    }

    /// Runtime class code
    pub fn code(self) -> u32 {
        match self {
            Self::Invalid => 0,
            Self::Hmd => 1,
            Self::Controller => 2,
            Self::GenericTracker => 3,
            Self::TrackingReference => 4,
            Self::DisplayRedirect => 5,
        }
    }
}

impl Default for TrackedDeviceType {
    fn default() -> Self {
        Self::Invalid
    }
}

impl From<u32> for TrackedDeviceType {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::Hmd,
            2 => Self::Controller,
            3 => Self::GenericTracker,
            4 => Self::TrackingReference,
            5 => Self::DisplayRedirect,
            _ => Self::Invalid,
        }
    }
}

impl std::fmt::Display for TrackedDeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Invalid => "invalid",
            Self::Hmd => "hmd",
            Self::Controller => "controller",
            Self::GenericTracker => "generic_tracker",
            Self::TrackingReference => "tracking_reference",
            Self::DisplayRedirect => "display_redirect",
        };
        f.write_str(name)
    }
}

/// String properties that can be read from a connected device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceProperty {
    TrackingSystemName,
    ModelNumber,
    SerialNumber,
    ManufacturerName,
}

impl DeviceProperty {
    /// Runtime property identifier
    pub fn id(self) -> u32 {
        match self {
            Self::TrackingSystemName => 1000,
            Self::ModelNumber => 1001,
            Self::SerialNumber => 1002,
            Self::ManufacturerName => 1005,
        }
    }
}

/// A device kept in the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedDevice {
    /// Hardware slot currently occupied by the device
    pub index: DeviceIndex,
    /// Serial number, stable while the device is connected
    pub serial_number: String,
    /// Device class
    pub device_type: TrackedDeviceType,
}

impl TrackedDevice {
    pub fn new(
        index: DeviceIndex,
        serial_number: impl Into<String>,
        device_type: TrackedDeviceType,
    ) -> Self {
        Self {
            index,
            serial_number: serial_number.into(),
            device_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_from_code() {
        assert_eq!(TrackedDeviceType::from(1), TrackedDeviceType::Hmd);
        assert_eq!(
            TrackedDeviceType::from(3),
            TrackedDeviceType::GenericTracker
        );
        assert_eq!(TrackedDeviceType::from(42), TrackedDeviceType::Invalid);

        for code in 0..=5 {
            assert_eq!(TrackedDeviceType::from(code).code(), code);
        }
    }

    #[test]
    fn test_supported_types() {
        assert!(TrackedDeviceType::Hmd.is_supported());
        assert!(TrackedDeviceType::Controller.is_supported());
        assert!(TrackedDeviceType::GenericTracker.is_supported());
        assert!(!TrackedDeviceType::TrackingReference.is_supported());
        assert!(!TrackedDeviceType::DisplayRedirect.is_supported());
        assert!(!TrackedDeviceType::Invalid.is_supported());
    }

    #[test]
    fn test_device_type_serde_names() {
        let json = serde_json::to_string(&TrackedDeviceType::GenericTracker).unwrap();
        assert_eq!(json, "\"generic_tracker\"");
        assert_eq!(
            TrackedDeviceType::GenericTracker.to_string(),
            "generic_tracker"
        );
    }
}
