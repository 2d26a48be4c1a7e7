//! OpenVR client library entry points, resolved when a session starts

use libloading::Library;
use openvr_sys as sys;
use std::ffi::{c_char, CStr};
use std::path::Path;

// openvr_api entry points
type VrInitInternal =
    unsafe extern "C" fn(*mut sys::EVRInitError, sys::EVRApplicationType) -> isize;
type VrShutdownInternal = unsafe extern "C" fn();
type VrGetGenericInterface =
    unsafe extern "C" fn(*const c_char, *mut sys::EVRInitError) -> isize;
type VrGetInitErrorDescription = unsafe extern "C" fn(sys::EVRInitError) -> *const c_char;

pub struct OpenVrLibrary {
    pub init_internal: VrInitInternal,
    pub shutdown_internal: VrShutdownInternal,
    pub get_interface: VrGetGenericInterface,
    describe_init_error: VrGetInitErrorDescription,
    // Keeps the entry points above mapped
    _lib: Library,
}

impl OpenVrLibrary {
    /// Load `openvr_api` from `path`, or from the platform search path
    pub fn load(path: Option<&Path>) -> Result<Self, libloading::Error> {
        unsafe {
            let lib = match path {
                Some(path) => Library::new(path)?,
                None => Library::new(libloading::library_filename("openvr_api"))?,
            };

            let init_internal = *lib.get::<VrInitInternal>(b"VR_InitInternal\0")?;
            let shutdown_internal = *lib.get::<VrShutdownInternal>(b"VR_ShutdownInternal\0")?;
            let get_interface = *lib.get::<VrGetGenericInterface>(b"VR_GetGenericInterface\0")?;
            let describe_init_error = *lib
                .get::<VrGetInitErrorDescription>(b"VR_GetVRInitErrorAsEnglishDescription\0")?;

            Ok(Self {
                init_internal,
                shutdown_internal,
                get_interface,
                describe_init_error,
                _lib: lib,
            })
        }
    }

    /// English description of an initialization error
    pub fn describe_init_error(&self, error: sys::EVRInitError) -> String {
        let description = unsafe { (self.describe_init_error)(error) };
        if description.is_null() {
            return format!("OpenVR initialization error {}", error as u32);
        }
        unsafe { CStr::from_ptr(description) }
            .to_string_lossy()
            .into_owned()
    }
}
