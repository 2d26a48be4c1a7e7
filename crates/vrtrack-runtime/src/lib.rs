//! vrtrack Runtime - Capability interface over the tracking runtime
//!
//! The devices manager talks to the vendor runtime only through the two
//! traits defined here:
//! - [`TrackingRuntime`] starts a session
//! - [`RuntimeSession`] is the owned handle used for every query until it is stopped
//!
//! [`SimulatedRuntime`] implements both without hardware and is used by the
//! daemon's simulated backend and by tests. With the `openvr` feature,
//! `OpenVrRuntime` connects to a running SteamVR server.

#[cfg(feature = "openvr")]
pub mod openvr;
pub mod simulated;

#[cfg(feature = "openvr")]
pub use openvr::{OpenVrRuntime, OpenVrSession};
pub use simulated::{SimulatedController, SimulatedDevice, SimulatedRuntime};
pub use vrtrack_core::RuntimeError;

use vrtrack_core::{
    DeviceIndex, DeviceProperty, RawPose, RuntimeEvent, TrackedDeviceType, TrackingOrigin,
};

/// Loader able to start a session with the tracking runtime
pub trait TrackingRuntime: Send {
    /// Connect to the runtime. The runtime must already be running; this
    /// never launches it.
    fn start(&mut self) -> Result<Box<dyn RuntimeSession>, RuntimeError>;
}

/// Live connection to the tracking runtime
pub trait RuntimeSession: Send {
    /// Version string of the runtime, empty once the runtime went away
    fn runtime_version(&self) -> String;

    fn is_connected(&self, index: DeviceIndex) -> bool;

    fn string_property(
        &self,
        index: DeviceIndex,
        property: DeviceProperty,
    ) -> Result<String, RuntimeError>;

    fn device_class(&self, index: DeviceIndex) -> TrackedDeviceType;

    /// Next queued event, `None` when the queue is empty. Never blocks.
    fn poll_next_event(&mut self) -> Option<RuntimeEvent>;

    /// Poses of slots `0..count` expressed in `origin`
    fn compute_poses(&mut self, origin: TrackingOrigin, count: u32) -> Vec<RawPose>;

    /// Make the current head pose the seated zero pose
    fn reset_seated_origin(&mut self);

    /// Tell the runtime the application is handling its quit request
    fn acknowledge_quit(&mut self);

    /// Close the session
    fn stop(self: Box<Self>);
}
