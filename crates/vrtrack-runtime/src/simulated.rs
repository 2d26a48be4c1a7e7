//! Simulated tracking runtime
//!
//! Devices, poses and events are scripted through a [`SimulatedController`]
//! that shares state with the runtime and its sessions.

use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

use vrtrack_core::{
    DeviceIndex, DeviceProperty, RawPose, RuntimeError, RuntimeEvent, TrackedDeviceType,
    TrackingOrigin,
};

use crate::{RuntimeSession, TrackingRuntime};

const SIMULATED_VERSION: &str = "vrtrack-simulated-1.0";

/// A device plugged into the simulated runtime
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    pub serial_number: String,
    pub device_type: TrackedDeviceType,
    pub model_number: String,
    pub pose: RawPose,
}

impl SimulatedDevice {
    pub fn new(serial_number: impl Into<String>, device_type: TrackedDeviceType) -> Self {
        Self {
            serial_number: serial_number.into(),
            device_type,
            model_number: format!("Simulated {}", device_type),
            pose: RawPose::invalid(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_number = model.into();
        self
    }

    pub fn with_pose(mut self, pose: RawPose) -> Self {
        self.pose = pose;
        self
    }
}

#[derive(Debug, Default)]
struct SimState {
    /// Incremented on every start; sessions from older generations are closed
    generation: u64,
    running: bool,
    devices: BTreeMap<DeviceIndex, SimulatedDevice>,
    events: VecDeque<RuntimeEvent>,
    fail_next_start: Option<RuntimeError>,
    starts: usize,
    stops: usize,
    resets: usize,
    quit_acks: usize,
    polls: usize,
    pose_batches: usize,
    last_origin: Option<TrackingOrigin>,
}

/// Handle for scripting the simulated runtime
#[derive(Debug, Clone, Default)]
pub struct SimulatedController {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedController {
    /// Plug a device into `index` without queuing an event, as if it was
    /// already connected before the session started
    pub fn attach(&self, index: DeviceIndex, device: SimulatedDevice) {
        self.state.lock().devices.insert(index, device);
    }

    /// Plug a device into `index` and queue its activation event
    pub fn connect(&self, index: DeviceIndex, device: SimulatedDevice) {
        let mut state = self.state.lock();
        debug!(index, serial = %device.serial_number, "Simulated device connected");
        state.devices.insert(index, device);
        state.events.push_back(RuntimeEvent::DeviceActivated(index));
    }

    /// Unplug the device at `index` and queue its deactivation event
    pub fn disconnect(&self, index: DeviceIndex) -> Option<SimulatedDevice> {
        let mut state = self.state.lock();
        let removed = state.devices.remove(&index);
        if removed.is_some() {
            debug!(index, "Simulated device disconnected");
            state.events.push_back(RuntimeEvent::DeviceDeactivated(index));
        }
        removed
    }

    /// Replace the raw pose reported for `index`
    pub fn set_pose(&self, index: DeviceIndex, pose: RawPose) {
        if let Some(device) = self.state.lock().devices.get_mut(&index) {
            device.pose = pose;
        }
    }

    pub fn push_event(&self, event: RuntimeEvent) {
        self.state.lock().events.push_back(event);
    }

    /// Queue a quit request, as sent when the runtime is closed by the user
    pub fn request_quit(&self) {
        self.push_event(RuntimeEvent::Quit);
    }

    /// Stop answering without sending a quit request, as when the server
    /// process dies. Open sessions read as closed from now on.
    pub fn crash(&self) {
        let mut state = self.state.lock();
        state.running = false;
        state.events.clear();
        debug!("Simulated runtime crashed");
    }

    /// Make the next start fail with `error`
    pub fn fail_next_start(&self, error: RuntimeError) {
        self.state.lock().fail_next_start = Some(error);
    }

    pub fn pending_events(&self) -> usize {
        self.state.lock().events.len()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    pub fn start_count(&self) -> usize {
        self.state.lock().starts
    }

    pub fn stop_count(&self) -> usize {
        self.state.lock().stops
    }

    pub fn reset_count(&self) -> usize {
        self.state.lock().resets
    }

    pub fn quit_ack_count(&self) -> usize {
        self.state.lock().quit_acks
    }

    /// Number of event polls answered by an open session
    pub fn poll_count(&self) -> usize {
        self.state.lock().polls
    }

    pub fn pose_batch_count(&self) -> usize {
        self.state.lock().pose_batches
    }

    pub fn last_origin(&self) -> Option<TrackingOrigin> {
        self.state.lock().last_origin
    }
}

/// Tracking runtime backed by scripted state
#[derive(Debug, Default)]
pub struct SimulatedRuntime {
    controller: SimulatedController,
}

impl SimulatedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Controller sharing state with this runtime
    pub fn controller(&self) -> SimulatedController {
        self.controller.clone()
    }
}

impl TrackingRuntime for SimulatedRuntime {
    fn start(&mut self) -> Result<Box<dyn RuntimeSession>, RuntimeError> {
        let mut state = self.controller.state.lock();
        if let Some(error) = state.fail_next_start.take() {
            return Err(error);
        }

        state.generation += 1;
        state.running = true;
        state.starts += 1;
        info!(devices = state.devices.len(), "Simulated runtime started");

        Ok(Box::new(SimulatedSession {
            state: self.controller.state.clone(),
            generation: state.generation,
        }))
    }
}

struct SimulatedSession {
    state: Arc<Mutex<SimState>>,
    generation: u64,
}

impl SimulatedSession {
    fn with_state<T>(&self, closed: T, f: impl FnOnce(&mut SimState) -> T) -> T {
        let mut state = self.state.lock();
        if !state.running || state.generation != self.generation {
            return closed;
        }
        f(&mut state)
    }
}

impl RuntimeSession for SimulatedSession {
    fn runtime_version(&self) -> String {
        self.with_state(String::new(), |_| SIMULATED_VERSION.to_string())
    }

    fn is_connected(&self, index: DeviceIndex) -> bool {
        self.with_state(false, |state| state.devices.contains_key(&index))
    }

    fn string_property(
        &self,
        index: DeviceIndex,
        property: DeviceProperty,
    ) -> Result<String, RuntimeError> {
        self.with_state(Err(RuntimeError::SessionClosed), |state| {
            let device = state
                .devices
                .get(&index)
                .ok_or(RuntimeError::PropertyUnavailable {
                    index,
                    property: property.id(),
                })?;
            Ok(match property {
                DeviceProperty::SerialNumber => device.serial_number.clone(),
                DeviceProperty::ModelNumber => device.model_number.clone(),
                DeviceProperty::ManufacturerName => "vrtrack".to_string(),
                DeviceProperty::TrackingSystemName => "simulated".to_string(),
            })
        })
    }

    fn device_class(&self, index: DeviceIndex) -> TrackedDeviceType {
        self.with_state(TrackedDeviceType::Invalid, |state| {
            state
                .devices
                .get(&index)
                .map(|d| d.device_type)
                .unwrap_or_default()
        })
    }

    fn poll_next_event(&mut self) -> Option<RuntimeEvent> {
        self.with_state(None, |state| {
            state.polls += 1;
            state.events.pop_front()
        })
    }

    fn compute_poses(&mut self, origin: TrackingOrigin, count: u32) -> Vec<RawPose> {
        self.with_state(Vec::new(), |state| {
            state.pose_batches += 1;
            state.last_origin = Some(origin);
            (0..count)
                .map(|index| match state.devices.get(&index) {
                    Some(device) => RawPose {
                        device_connected: true,
                        ..device.pose
                    },
                    None => RawPose::invalid(),
                })
                .collect()
        })
    }

    fn reset_seated_origin(&mut self) {
        self.with_state((), |state| state.resets += 1)
    }

    fn acknowledge_quit(&mut self) {
        self.with_state((), |state| state.quit_acks += 1)
    }

    fn stop(self: Box<Self>) {
        let mut state = self.state.lock();
        if state.generation == self.generation && state.running {
            state.running = false;
            state.stops += 1;
            info!("Simulated runtime session stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrtrack_core::TrackingResult;

    fn tracked_pose(x: f32) -> RawPose {
        RawPose {
            device_to_absolute: [
                [1.0, 0.0, 0.0, x],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            valid: true,
            device_connected: true,
            result: TrackingResult::RunningOk,
        }
    }

    #[test]
    fn test_session_reports_attached_devices() {
        let mut runtime = SimulatedRuntime::new();
        let controller = runtime.controller();
        controller.attach(
            2,
            SimulatedDevice::new("LHR-1", TrackedDeviceType::Controller)
                .with_model("Knuckles"),
        );

        let session = runtime.start().unwrap();
        assert!(!session.runtime_version().is_empty());
        assert!(session.is_connected(2));
        assert!(!session.is_connected(0));
        assert_eq!(session.device_class(2), TrackedDeviceType::Controller);
        assert_eq!(
            session.string_property(2, DeviceProperty::SerialNumber).unwrap(),
            "LHR-1"
        );
        assert_eq!(
            session.string_property(2, DeviceProperty::ModelNumber).unwrap(),
            "Knuckles"
        );
        assert!(session
            .string_property(0, DeviceProperty::SerialNumber)
            .is_err());
    }

    #[test]
    fn test_crash_closes_session_without_quit() {
        let mut runtime = SimulatedRuntime::new();
        let controller = runtime.controller();
        controller.attach(0, SimulatedDevice::new("A", TrackedDeviceType::Hmd));
        let mut session = runtime.start().unwrap();

        controller.crash();
        assert!(session.runtime_version().is_empty());
        assert!(!session.is_connected(0));
        assert_eq!(session.poll_next_event(), None);

        session.stop();
        assert_eq!(controller.stop_count(), 0);
    }

    #[test]
    fn test_events_are_fifo() {
        let mut runtime = SimulatedRuntime::new();
        let controller = runtime.controller();
        let mut session = runtime.start().unwrap();

        controller.connect(
            1,
            SimulatedDevice::new("A", TrackedDeviceType::GenericTracker),
        );
        controller.disconnect(1);
        controller.request_quit();

        assert_eq!(
            session.poll_next_event(),
            Some(RuntimeEvent::DeviceActivated(1))
        );
        assert_eq!(
            session.poll_next_event(),
            Some(RuntimeEvent::DeviceDeactivated(1))
        );
        assert_eq!(session.poll_next_event(), Some(RuntimeEvent::Quit));
        assert_eq!(session.poll_next_event(), None);
    }

    #[test]
    fn test_compute_poses_fills_every_slot() {
        let mut runtime = SimulatedRuntime::new();
        let controller = runtime.controller();
        controller.attach(
            1,
            SimulatedDevice::new("A", TrackedDeviceType::Hmd)
                .with_pose(tracked_pose(0.5)),
        );

        let mut session = runtime.start().unwrap();
        let poses = session.compute_poses(TrackingOrigin::Standing, 3);

        assert_eq!(poses.len(), 3);
        assert!(!poses[0].valid);
        assert!(poses[1].is_usable());
        assert_eq!(poses[1].device_to_absolute[0][3], 0.5);
        assert_eq!(controller.last_origin(), Some(TrackingOrigin::Standing));
        assert_eq!(controller.pose_batch_count(), 1);
    }

    #[test]
    fn test_stopped_session_is_closed() {
        let mut runtime = SimulatedRuntime::new();
        let controller = runtime.controller();
        controller.attach(0, SimulatedDevice::new("A", TrackedDeviceType::Hmd));

        let session = runtime.start().unwrap();
        session.stop();

        assert!(!controller.is_running());
        assert_eq!(controller.stop_count(), 1);

        // A new session does not revive handles from the previous one
        let stale = {
            let first = runtime.start().unwrap();
            let second = runtime.start().unwrap();
            (first, second)
        };
        assert!(stale.0.runtime_version().is_empty());
        assert!(!stale.1.runtime_version().is_empty());
    }

    #[test]
    fn test_fail_next_start() {
        let mut runtime = SimulatedRuntime::new();
        let controller = runtime.controller();
        controller.fail_next_start(RuntimeError::StartFailed {
            code: 100,
            description: "No server for background app".to_string(),
        });

        assert!(runtime.start().is_err());
        assert!(runtime.start().is_ok());
        assert_eq!(controller.start_count(), 1);
    }
}
