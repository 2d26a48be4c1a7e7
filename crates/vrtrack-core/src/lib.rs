//! vrtrack Core - Core types for tracked VR devices
//!
//! This crate provides the foundational types shared by the vrtrack crates:
//! - Device classes, indices and string properties
//! - Raw runtime poses and the validated poses handed to consumers
//! - Runtime events
//! - Error taxonomy

pub mod device;
pub mod error;
pub mod event;
pub mod pose;

pub use device::{
    DeviceIndex, DeviceProperty, TrackedDevice, TrackedDeviceType, MAX_TRACKED_DEVICE_COUNT,
};
pub use error::{RuntimeError, TrackingError};
pub use event::RuntimeEvent;
pub use pose::{Pose, RawPose, TrackingOrigin, TrackingResult};

pub type Result<T, E = TrackingError> = std::result::Result<T, E>;
