//! vrtrack Manager - Device tracking on top of the tracking runtime
//!
//! This crate keeps a registry of tracked devices in sync with hot-plug
//! events and serves their poses:
//! - [`DevicesManager`] owns the runtime session, registry and pose snapshot
//! - A background thread drains runtime events once per cycle
//! - Poses are refreshed in one batched call and read per device

pub mod cache;
pub mod manager;
mod processor;
pub mod registry;

pub use cache::PoseCache;
pub use manager::{DevicesManager, ManagerConfig, TrackingSession, DEFAULT_POLL_INTERVAL};
pub use registry::{DeviceRegistry, Insertion};
