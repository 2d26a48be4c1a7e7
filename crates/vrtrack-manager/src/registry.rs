//! Registry of managed devices keyed by serial number

use std::collections::BTreeMap;
use tracing::warn;

use vrtrack_core::{DeviceIndex, TrackedDevice, TrackingError};

/// Outcome of a successful insertion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// The device is now managed. `evicted` holds a stale entry that was
    /// still registered on the same slot.
    Inserted { evicted: Option<TrackedDevice> },
    /// The device class is not tracked; nothing was inserted
    Unsupported,
}

/// Serial number -> device mapping.
///
/// Serials are unique, no two entries share a slot index, and only
/// supported device classes are stored.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: BTreeMap<String, TrackedDevice>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a device, refusing serials that are already managed
    pub fn insert(&mut self, device: TrackedDevice) -> Result<Insertion, TrackingError> {
        if !device.device_type.is_supported() {
            return Ok(Insertion::Unsupported);
        }

        if self.devices.contains_key(&device.serial_number) {
            return Err(TrackingError::DuplicateDevice(device.serial_number));
        }

        // A slot holds one live device; an old entry on the same slot means
        // its deactivation was missed
        let evicted = self.remove_by_index(device.index);

        if let Some(ref stale) = evicted {
            warn!(
                stale = %stale.serial_number,
                serial = %device.serial_number,
                index = device.index,
                "Slot reassigned, dropping stale device"
            );
        }

        self.devices.insert(device.serial_number.clone(), device);
        Ok(Insertion::Inserted { evicted })
    }

    pub fn remove(&mut self, serial: &str) -> Option<TrackedDevice> {
        self.devices.remove(serial)
    }

    /// Remove whichever device occupies `index`
    pub fn remove_by_index(&mut self, index: DeviceIndex) -> Option<TrackedDevice> {
        let serial = self.find_by_index(index)?.serial_number.clone();
        self.devices.remove(&serial)
    }

    pub fn get(&self, serial: &str) -> Option<&TrackedDevice> {
        self.devices.get(serial)
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.devices.contains_key(serial)
    }

    pub fn find_by_index(&self, index: DeviceIndex) -> Option<&TrackedDevice> {
        self.devices.values().find(|d| d.index == index)
    }

    /// Serial numbers in ascending order
    pub fn serials(&self) -> Vec<String> {
        self.devices.keys().cloned().collect()
    }

    /// Highest slot index in use
    pub fn max_index(&self) -> Option<DeviceIndex> {
        self.devices.values().map(|d| d.index).max()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn clear(&mut self) {
        self.devices.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrtrack_core::TrackedDeviceType;

    fn tracker(index: DeviceIndex, serial: &str) -> TrackedDevice {
        TrackedDevice::new(index, serial, TrackedDeviceType::GenericTracker)
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = DeviceRegistry::new();
        let outcome = registry.insert(tracker(3, "LHR-A")).unwrap();

        assert_eq!(outcome, Insertion::Inserted { evicted: None });
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("LHR-A").unwrap().index, 3);
        assert_eq!(registry.find_by_index(3).unwrap().serial_number, "LHR-A");
        assert_eq!(registry.max_index(), Some(3));
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let mut registry = DeviceRegistry::new();
        registry.insert(tracker(0, "LHR-A")).unwrap();

        let err = registry.insert(tracker(5, "LHR-A")).unwrap_err();
        assert!(matches!(
            err,
            TrackingError::DuplicateDevice(ref s) if s == "LHR-A"
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("LHR-A").unwrap().index, 0);
    }

    #[test]
    fn test_unsupported_type_not_stored() {
        let mut registry = DeviceRegistry::new();
        let base = TrackedDevice::new(0, "LHB-1", TrackedDeviceType::TrackingReference);

        assert_eq!(registry.insert(base).unwrap(), Insertion::Unsupported);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_slot_reuse_evicts_stale_entry() {
        let mut registry = DeviceRegistry::new();
        registry.insert(tracker(1, "OLD")).unwrap();

        let outcome = registry.insert(tracker(1, "NEW")).unwrap();
        assert_eq!(
            outcome,
            Insertion::Inserted {
                evicted: Some(tracker(1, "OLD"))
            }
        );
        assert_eq!(registry.serials(), vec!["NEW".to_string()]);
    }

    #[test]
    fn test_remove_by_index() {
        let mut registry = DeviceRegistry::new();
        registry.insert(tracker(0, "A")).unwrap();
        registry.insert(tracker(1, "B")).unwrap();

        assert_eq!(registry.remove_by_index(0).unwrap().serial_number, "A");
        assert!(registry.remove_by_index(0).is_none());
        assert_eq!(registry.serials(), vec!["B".to_string()]);
    }
}
