//! Snapshot of the last batched pose query

use vrtrack_core::{DeviceIndex, Pose, RawPose};

/// Raw poses indexed by hardware slot, replaced wholesale on every refresh
#[derive(Debug, Default)]
pub struct PoseCache {
    snapshot: Vec<RawPose>,
}

impl PoseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with a new batch
    pub fn replace(&mut self, batch: Vec<RawPose>) {
        self.snapshot = batch;
    }

    pub fn raw(&self, index: DeviceIndex) -> Option<&RawPose> {
        self.snapshot.get(index as usize)
    }

    /// Validated pose of `index`; absent unless the cached pose is valid
    /// and tracking is running OK
    pub fn pose(&self, index: DeviceIndex) -> Option<Pose> {
        self.raw(index)
            .filter(|raw| raw.is_usable())
            .map(Pose::from)
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    pub fn clear(&mut self) {
        self.snapshot.clear();
    }
}
