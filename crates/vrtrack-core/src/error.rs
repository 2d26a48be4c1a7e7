//! Error types shared by the runtime adapter and the devices manager

use thiserror::Error;

use crate::device::DeviceIndex;

/// Failures reported by the tracking runtime
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Runtime failed to start (code {code}): {description}")]
    StartFailed { code: i32, description: String },
    #[error("Property {property} unavailable on device {index}")]
    PropertyUnavailable { index: DeviceIndex, property: u32 },
    #[error("Runtime session is closed")]
    SessionClosed,
}

/// Failures of the devices manager lifecycle operations
#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("Devices manager is already initialized")]
    AlreadyInitialized,
    #[error("Devices manager is not initialized")]
    NotInitialized,
    #[error("Failed to start tracking runtime: {0}")]
    Runtime(#[from] RuntimeError),
    #[error("Failed to spawn event processor: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("Device with index {0} is not connected")]
    DeviceNotConnected(DeviceIndex),
    #[error("Device {0} is already managed")]
    DuplicateDevice(String),
    #[error("Device {0} not found")]
    DeviceNotFound(String),
}
