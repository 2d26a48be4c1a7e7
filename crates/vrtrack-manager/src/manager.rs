//! Devices manager: session lifecycle, device registry and pose queries
//!
//! All shared state (runtime session, registry, pose snapshot) sits behind a
//! single lock. Public methods take the lock once and call the unlocked
//! variants on [`Inner`]; the event processor holds the lock for a whole
//! drain pass and calls the same variants directly.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use vrtrack_core::{
    DeviceIndex, DeviceProperty, Pose, Result, RuntimeEvent, TrackedDevice, TrackedDeviceType,
    TrackingError, TrackingOrigin, MAX_TRACKED_DEVICE_COUNT,
};
use vrtrack_runtime::{RuntimeSession, TrackingRuntime};

use crate::cache::PoseCache;
use crate::processor::{drain_events, EventProcessor};
use crate::registry::{DeviceRegistry, Insertion};

/// Interval between two event drain passes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// State of the connection to the tracking runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingSession {
    Uninitialized,
    Initializing,
    Running,
    ShuttingDown,
}

/// Manager configuration
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Origin every pose batch is expressed in
    pub origin: TrackingOrigin,
    /// Sleep between two event drain passes
    pub poll_interval: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            origin: TrackingOrigin::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// State guarded by the manager lock
pub(crate) struct Inner {
    runtime: Box<dyn TrackingRuntime>,
    session: Option<Box<dyn RuntimeSession>>,
    state: TrackingSession,
    registry: DeviceRegistry,
    cache: PoseCache,
    origin: TrackingOrigin,
}

impl Inner {
    pub(crate) fn initialized(&self) -> bool {
        self.state == TrackingSession::Running
            && self
                .session
                .as_ref()
                .is_some_and(|s| !s.runtime_version().is_empty())
    }

    /// Start the runtime and register every device already connected
    fn start(&mut self) -> Result<()> {
        debug!("Initializing devices manager");

        let session = self.runtime.start().map_err(|e| {
            error!(error = %e, "Failed to initialize tracking runtime");
            e
        })?;
        self.session = Some(session);
        debug!("Tracking runtime started, scanning for existing devices");

        let connected: Vec<DeviceIndex> = (0..MAX_TRACKED_DEVICE_COUNT)
            .filter(|&index| self.is_connected(index))
            .collect();
        debug!(count = connected.len(), "Found connected devices");

        for index in connected {
            debug!(index, "Inserting device");
            if let Err(e) = self.add_device(index) {
                error!(index, error = %e, "Failed to add device");
                return Err(e);
            }
        }

        Ok(())
    }

    fn is_connected(&self, index: DeviceIndex) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.is_connected(index))
    }

    pub(crate) fn poll_event(&mut self) -> Option<RuntimeEvent> {
        self.session.as_mut()?.poll_next_event()
    }

    pub(crate) fn add_device(&mut self, index: DeviceIndex) -> Result<()> {
        let session = self.session.as_ref().ok_or(TrackingError::NotInitialized)?;

        if !session.is_connected(index) {
            error!(index, "Failed to add unconnected device");
            return Err(TrackingError::DeviceNotConnected(index));
        }

        let serial = session.string_property(index, DeviceProperty::SerialNumber)?;
        let device_type = session.device_class(index);

        match self.registry.insert(TrackedDevice::new(index, serial.clone(), device_type)) {
            Ok(Insertion::Inserted { .. }) => {
                info!(serial = %serial, index, device_type = %device_type, "Device inserted");
                Ok(())
            }
            Ok(Insertion::Unsupported) => {
                info!(serial = %serial, device_type = %device_type, "Device has unsupported type");
                Ok(())
            }
            Err(e) => {
                error!(
                    serial = %serial,
                    index,
                    "Failed to insert device, it was already inserted previously"
                );
                Err(e)
            }
        }
    }

    pub(crate) fn remove_device(&mut self, serial: &str) -> Result<TrackedDevice> {
        match self.registry.remove(serial) {
            Some(device) => {
                debug!(serial = %serial, "Removed device");
                Ok(device)
            }
            None => {
                error!(serial = %serial, "Device not found");
                Err(TrackingError::DeviceNotFound(serial.to_string()))
            }
        }
    }

    pub(crate) fn remove_by_index(&mut self, index: DeviceIndex) -> Option<TrackedDevice> {
        self.registry.remove_by_index(index)
    }

    /// Handle a quit request coming from the runtime
    pub(crate) fn handle_quit(&mut self) {
        info!("Tracking runtime is quitting");

        if let Some(session) = self.session.as_mut() {
            session.acknowledge_quit();
        }

        for serial in self.registry.serials() {
            if let Err(e) = self.remove_device(&serial) {
                warn!(serial = %serial, error = %e, "Failed to remove device");
            }
        }

        self.teardown();
    }

    /// Drop every device, close the session and go back to `Uninitialized`
    fn teardown(&mut self) {
        if self.state == TrackingSession::Uninitialized && self.session.is_none() {
            return;
        }

        self.state = TrackingSession::ShuttingDown;
        self.registry.clear();
        self.cache.clear();

        if let Some(session) = self.session.take() {
            session.stop();
        }

        self.state = TrackingSession::Uninitialized;
        info!("Tracking runtime shut down");
    }
}

/// Tracks the devices exposed by the runtime and serves their poses.
///
/// Poses are read in two steps: [`compute_poses`](Self::compute_poses)
/// refreshes a snapshot with one batched runtime call, then
/// [`pose`](Self::pose) reads single devices out of that snapshot.
pub struct DevicesManager {
    inner: Arc<Mutex<Inner>>,
    poll_interval: Duration,
    /// Set only while a processor thread may still be running
    processor: Mutex<Option<EventProcessor>>,
}

impl DevicesManager {
    pub fn new(runtime: Box<dyn TrackingRuntime>, config: ManagerConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                runtime,
                session: None,
                state: TrackingSession::Uninitialized,
                registry: DeviceRegistry::new(),
                cache: PoseCache::new(),
                origin: config.origin,
            })),
            poll_interval: config.poll_interval,
            processor: Mutex::new(None),
        }
    }

    /// Start the runtime, register connected devices and spawn the event
    /// processor. On failure nothing is left running.
    ///
    /// A session whose runtime stopped answering is closed and replaced.
    pub fn initialize(&self) -> Result<()> {
        let mut processor = self.processor.lock();

        if self.initialized() {
            error!("Already initialized");
            return Err(TrackingError::AlreadyInitialized);
        }

        // A previous session ended by a quit request leaves a finished thread behind
        if let Some(previous) = processor.take() {
            previous.stop_and_join();
        }

        let mut inner = self.inner.lock();
        match inner.state {
            TrackingSession::Uninitialized => {}
            // The runtime stopped answering without a quit request
            TrackingSession::Running if !inner.initialized() => {
                warn!("Tracking runtime is unresponsive, closing the stale session");
                inner.teardown();
            }
            state => {
                error!(state = ?state, "Cannot initialize from current state");
                return Err(TrackingError::AlreadyInitialized);
            }
        }

        inner.state = TrackingSession::Initializing;

        if let Err(e) = inner.start() {
            inner.teardown();
            return Err(e);
        }

        // The thread blocks on the lock until the session is marked running
        match EventProcessor::spawn(self.inner.clone(), self.poll_interval) {
            Ok(spawned) => *processor = Some(spawned),
            Err(e) => {
                error!(error = %e, "Failed to spawn event processor");
                inner.teardown();
                return Err(TrackingError::Spawn(e));
            }
        }

        inner.state = TrackingSession::Running;
        info!(
            devices = inner.registry.len(),
            origin = %inner.origin,
            "VR runtime successfully initialized"
        );
        Ok(())
    }

    /// Whether the session is running and the runtime still answers
    pub fn initialized(&self) -> bool {
        self.inner.lock().initialized()
    }

    pub fn session_state(&self) -> TrackingSession {
        self.inner.lock().state
    }

    /// Register the device connected at `index`
    pub fn add_device(&self, index: DeviceIndex) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.initialized() {
            error!(index, "Cannot add device, the manager is not initialized");
            return Err(TrackingError::NotInitialized);
        }
        inner.add_device(index)
    }

    pub fn remove_device(&self, serial: &str) -> Result<()> {
        self.inner.lock().remove_device(serial).map(|_| ())
    }

    /// Serial numbers of all managed devices
    pub fn managed_devices(&self) -> Vec<String> {
        self.inner.lock().registry.serials()
    }

    pub fn device(&self, serial: &str) -> Option<TrackedDevice> {
        let inner = self.inner.lock();
        if !inner.initialized() {
            return None;
        }
        inner.registry.get(serial).cloned()
    }

    /// Class of a managed device, `Invalid` if unknown or not initialized
    pub fn device_type(&self, serial: &str) -> TrackedDeviceType {
        self.device(serial)
            .map(|d| d.device_type)
            .unwrap_or(TrackedDeviceType::Invalid)
    }

    /// Read a string property of a managed device from the runtime
    pub fn device_property(&self, serial: &str, property: DeviceProperty) -> Option<String> {
        let inner = self.inner.lock();
        if !inner.initialized() {
            return None;
        }
        let index = inner.registry.get(serial)?.index;
        let session = inner.session.as_ref()?;

        match session.string_property(index, property) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(serial = %serial, error = %e, "Property unavailable");
                None
            }
        }
    }

    /// Refresh the pose snapshot with a single batched runtime query
    pub fn compute_poses(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.initialized() {
            error!("Failed to compute poses, the manager is not initialized");
            return Err(TrackingError::NotInitialized);
        }

        let count = inner.registry.max_index().map_or(0, |i| i + 1);
        let origin = inner.origin;
        let batch = match inner.session.as_mut() {
            Some(session) => session.compute_poses(origin, count),
            None => return Err(TrackingError::NotInitialized),
        };
        inner.cache.replace(batch);

        Ok(())
    }

    /// Pose of a device from the last snapshot. Absent if the device is
    /// unknown or disconnected, or if its cached pose is not valid and
    /// running OK.
    pub fn pose(&self, serial: &str) -> Option<Pose> {
        let inner = self.inner.lock();
        if !inner.initialized() {
            warn!("Failed to read pose, the manager is not initialized");
            return None;
        }

        let Some(device) = inner.registry.get(serial) else {
            debug!(serial = %serial, "Pose requested for unknown device");
            return None;
        };

        if !inner.is_connected(device.index) {
            debug!(serial = %serial, index = device.index, "Device is not connected");
            return None;
        }

        let pose = inner.cache.pose(device.index);
        if pose.is_none() {
            debug!(serial = %serial, "Pose not available");
        }
        pose
    }

    /// Make the current head pose the seated zero pose
    pub fn reset_seated_position(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.initialized() {
            error!("Cannot reset seated position, the manager is not initialized");
            return Err(TrackingError::NotInitialized);
        }

        if let Some(session) = inner.session.as_mut() {
            session.reset_seated_origin();
            info!("Seated zero pose reset");
        }
        Ok(())
    }

    /// Run one drain pass on the caller's thread. Returns the number of
    /// events consumed.
    pub fn process_events(&self) -> usize {
        let mut inner = self.inner.lock();
        if !inner.initialized() {
            return 0;
        }
        drain_events(&mut inner)
    }

    /// Discard all queued events without applying them
    pub fn clear_events(&self) -> usize {
        let mut inner = self.inner.lock();
        let mut cleared = 0;
        while inner.poll_event().is_some() {
            cleared += 1;
        }
        debug!(count = cleared, "Cleared events");
        cleared
    }

    /// Close the runtime session and stop the event processor. Safe to call
    /// more than once and on a manager that was never initialized.
    pub fn shutdown(&self) {
        let mut processor = self.processor.lock();

        self.inner.lock().teardown();

        if let Some(running) = processor.take() {
            running.stop_and_join();
        }
    }
}

impl Drop for DevicesManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}
