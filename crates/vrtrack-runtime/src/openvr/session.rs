use openvr_sys as sys;
use std::ffi::{c_char, CStr, CString};
use std::mem;
use std::path::PathBuf;
use tracing::{debug, info};

use vrtrack_core::{
    DeviceIndex, DeviceProperty, RawPose, RuntimeEvent, TrackedDeviceType, TrackingOrigin,
    TrackingResult,
};

use super::library::OpenVrLibrary;
use crate::{RuntimeError, RuntimeSession, TrackingRuntime};

/// Error code reported when the client library itself cannot be loaded
const LIBRARY_LOAD_FAILED: i32 = -1;

/// Starts background sessions with the OpenVR server
#[derive(Debug, Default)]
pub struct OpenVrRuntime {
    library_path: Option<PathBuf>,
}

impl OpenVrRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `openvr_api` from an explicit path instead of the search path
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }
}

impl TrackingRuntime for OpenVrRuntime {
    fn start(&mut self) -> Result<Box<dyn RuntimeSession>, RuntimeError> {
        let library = OpenVrLibrary::load(self.library_path.as_deref()).map_err(|e| {
            RuntimeError::StartFailed {
                code: LIBRARY_LOAD_FAILED,
                description: format!("Failed to load the OpenVR client library: {}", e),
            }
        })?;

        let mut error = sys::EVRInitError_VRInitError_None;
        let application_type = sys::EVRApplicationType_VRApplication_Background;
        unsafe {
            (library.init_internal)(&mut error, application_type);
        }
        if error != sys::EVRInitError_VRInitError_None {
            return Err(init_failed(&library, error));
        }

        let system = match system_table(&library) {
            Ok(system) => system,
            Err(e) => {
                unsafe { (library.shutdown_internal)() };
                return Err(e);
            }
        };

        let session = OpenVrSession { system, library };
        info!(version = %session.runtime_version(), "OpenVR runtime started");
        Ok(Box::new(session))
    }
}

fn init_failed(library: &OpenVrLibrary, error: sys::EVRInitError) -> RuntimeError {
    RuntimeError::StartFailed {
        code: error as i32,
        description: library.describe_init_error(error),
    }
}

fn system_table(
    library: &OpenVrLibrary,
) -> Result<*const sys::VR_IVRSystem_FnTable, RuntimeError> {
    let mut name = b"FnTable:".to_vec();
    name.extend(sys::IVRSystem_Version.iter().take_while(|&&b| b != 0));
    let name = CString::new(name).map_err(|e| RuntimeError::StartFailed {
        code: LIBRARY_LOAD_FAILED,
        description: e.to_string(),
    })?;

    let mut error = sys::EVRInitError_VRInitError_None;
    let table = unsafe { (library.get_interface)(name.as_ptr(), &mut error) }
        as *const sys::VR_IVRSystem_FnTable;

    if error != sys::EVRInitError_VRInitError_None || table.is_null() {
        return Err(init_failed(library, error));
    }
    Ok(table)
}

/// Open connection to the OpenVR server
pub struct OpenVrSession {
    system: *const sys::VR_IVRSystem_FnTable,
    library: OpenVrLibrary,
}

// The function table is process-wide and stays valid until `stop` shuts
// the client down; every call goes through `&self`/`&mut self` of the owner.
unsafe impl Send for OpenVrSession {}

impl OpenVrSession {
    fn system(&self) -> &sys::VR_IVRSystem_FnTable {
        unsafe { &*self.system }
    }
}

impl RuntimeSession for OpenVrSession {
    fn runtime_version(&self) -> String {
        let Some(get_version) = self.system().GetRuntimeVersion else {
            return String::new();
        };
        let version = unsafe { get_version() };
        if version.is_null() {
            return String::new();
        }
        unsafe { CStr::from_ptr(version) }
            .to_string_lossy()
            .into_owned()
    }

    fn is_connected(&self, index: DeviceIndex) -> bool {
        match self.system().IsTrackedDeviceConnected {
            Some(is_connected) => unsafe { is_connected(index) },
            None => false,
        }
    }

    fn string_property(
        &self,
        index: DeviceIndex,
        property: DeviceProperty,
    ) -> Result<String, RuntimeError> {
        let unavailable = RuntimeError::PropertyUnavailable {
            index,
            property: property.id(),
        };
        let Some(get_property) = self.system().GetStringTrackedDeviceProperty else {
            return Err(unavailable);
        };

        let mut buffer = vec![0u8; sys::k_unMaxPropertyStringSize as usize];
        let mut error = sys::ETrackedPropertyError_TrackedProp_Success;
        let len = unsafe {
            get_property(
                index,
                property.id() as sys::ETrackedDeviceProperty,
                buffer.as_mut_ptr() as *mut c_char,
                buffer.len() as u32,
                &mut error,
            )
        };

        if error != sys::ETrackedPropertyError_TrackedProp_Success || len == 0 {
            return Err(unavailable);
        }

        // `len` counts the terminating nul
        let len = (len as usize - 1).min(buffer.len());
        Ok(String::from_utf8_lossy(&buffer[..len]).into_owned())
    }

    fn device_class(&self, index: DeviceIndex) -> TrackedDeviceType {
        let Some(device_class) = self.system().GetTrackedDeviceClass else {
            return TrackedDeviceType::Invalid;
        };
        let class = unsafe { device_class(index) };
        TrackedDeviceType::from(class as u32)
    }

    fn poll_next_event(&mut self) -> Option<RuntimeEvent> {
        let poll = self.system().PollNextEvent?;

        let mut event: sys::VREvent_t = unsafe { mem::zeroed() };
        let size = mem::size_of::<sys::VREvent_t>() as u32;
        if !unsafe { poll(&mut event, size) } {
            return None;
        }

        let code = event.eventType;
        let index = event.trackedDeviceIndex;
        Some(RuntimeEvent::from_raw(code as u32, index))
    }

    fn compute_poses(&mut self, origin: TrackingOrigin, count: u32) -> Vec<RawPose> {
        let mut poses: Vec<sys::TrackedDevicePose_t> =
            (0..count).map(|_| unsafe { mem::zeroed() }).collect();

        match self.system().GetDeviceToAbsoluteTrackingPose {
            Some(get_poses) => unsafe {
                get_poses(universe_origin(origin), 0.0, poses.as_mut_ptr(), count);
            },
            None => debug!("Runtime exposes no pose query"),
        }

        poses.iter().map(raw_pose).collect()
    }

    fn reset_seated_origin(&mut self) {
        if let Some(reset) = self.system().ResetSeatedZeroPose {
            unsafe { reset() };
        }
    }

    fn acknowledge_quit(&mut self) {
        if let Some(acknowledge) = self.system().AcknowledgeQuit_Exiting {
            unsafe { acknowledge() };
        }
    }

    fn stop(self: Box<Self>) {
        unsafe { (self.library.shutdown_internal)() };
        info!("OpenVR runtime session stopped");
    }
}

fn universe_origin(origin: TrackingOrigin) -> sys::ETrackingUniverseOrigin {
    match origin {
        TrackingOrigin::Seated => sys::ETrackingUniverseOrigin_TrackingUniverseSeated,
        TrackingOrigin::Standing => sys::ETrackingUniverseOrigin_TrackingUniverseStanding,
        TrackingOrigin::Raw => sys::ETrackingUniverseOrigin_TrackingUniverseRawAndUncalibrated,
    }
}

fn raw_pose(pose: &sys::TrackedDevicePose_t) -> RawPose {
    RawPose {
        device_to_absolute: pose.mDeviceToAbsoluteTracking.m,
        valid: pose.bPoseIsValid,
        device_connected: pose.bDeviceIsConnected,
        result: TrackingResult::from(pose.eTrackingResult as u32),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_universe_origin_codes() {
        for origin in [
            TrackingOrigin::Seated,
            TrackingOrigin::Standing,
            TrackingOrigin::Raw,
        ] {
            assert_eq!(universe_origin(origin) as u32, origin.code());
        }
    }

    #[test]
    fn test_raw_pose_from_runtime_pose() {
        let mut pose: sys::TrackedDevicePose_t = unsafe { mem::zeroed() };
        pose.mDeviceToAbsoluteTracking.m = [
            [1.0, 0.0, 0.0, 0.5],
            [0.0, 1.0, 0.0, 1.5],
            [0.0, 0.0, 1.0, -0.5],
        ];
        pose.bPoseIsValid = true;
        pose.bDeviceIsConnected = true;
        pose.eTrackingResult = sys::ETrackingResult_TrackingResult_Running_OK;

        let raw = raw_pose(&pose);
        assert!(raw.is_usable());
        assert_eq!(raw.device_to_absolute[1][3], 1.5);
    }

    #[test]
    fn test_zeroed_runtime_pose_is_not_usable() {
        let pose: sys::TrackedDevicePose_t = unsafe { mem::zeroed() };
        assert!(!raw_pose(&pose).is_usable());
    }

    #[test]
    fn test_missing_library_fails_to_start() {
        let mut runtime = OpenVrRuntime::with_library_path("/nonexistent/libopenvr_api.so");
        match runtime.start() {
            Err(RuntimeError::StartFailed { code, .. }) => assert_eq!(code, LIBRARY_LOAD_FAILED),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("session started without a client library"),
        }
    }
}
