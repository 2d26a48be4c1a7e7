//! Backend connected to a running SteamVR/OpenVR server
//!
//! The session is opened as a background application: it never launches
//! SteamVR, and starting fails when no server is running.

mod library;
mod session;

pub use session::{OpenVrRuntime, OpenVrSession};
