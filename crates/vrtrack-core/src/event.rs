//! Events delivered by the tracking runtime

use crate::device::DeviceIndex;

/// A runtime event, tagged by kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A device was connected and assigned a slot
    DeviceActivated(DeviceIndex),
    /// The device occupying a slot disconnected
    DeviceDeactivated(DeviceIndex),
    /// Properties of a device changed
    DeviceUpdated(DeviceIndex),
    /// A controller switched hand role
    DeviceRoleChanged(DeviceIndex),
    /// The user started interacting with a device (e.g. put the HMD on)
    UserInteractionStarted(DeviceIndex),
    /// The user stopped interacting with a device
    UserInteractionEnded(DeviceIndex),
    /// The runtime is exiting
    Quit,
    /// Any event kind not handled here
    Other { code: u32, index: DeviceIndex },
}

impl RuntimeEvent {
    pub const DEVICE_ACTIVATED: u32 = 100;
    pub const DEVICE_DEACTIVATED: u32 = 101;
    pub const DEVICE_UPDATED: u32 = 102;
    pub const USER_INTERACTION_STARTED: u32 = 103;
    pub const USER_INTERACTION_ENDED: u32 = 104;
    pub const DEVICE_ROLE_CHANGED: u32 = 108;
    pub const QUIT: u32 = 700;

    /// Decode an event from the runtime's type code and device slot
    pub fn from_raw(code: u32, index: DeviceIndex) -> Self {
        match code {
            Self::DEVICE_ACTIVATED => Self::DeviceActivated(index),
            Self::DEVICE_DEACTIVATED => Self::DeviceDeactivated(index),
            Self::DEVICE_UPDATED => Self::DeviceUpdated(index),
            Self::USER_INTERACTION_STARTED => Self::UserInteractionStarted(index),
            Self::USER_INTERACTION_ENDED => Self::UserInteractionEnded(index),
            Self::DEVICE_ROLE_CHANGED => Self::DeviceRoleChanged(index),
            Self::QUIT => Self::Quit,
            code => Self::Other { code, index },
        }
    }

    /// Runtime type code
    pub fn code(&self) -> u32 {
        match self {
            Self::DeviceActivated(_) => Self::DEVICE_ACTIVATED,
            Self::DeviceDeactivated(_) => Self::DEVICE_DEACTIVATED,
            Self::DeviceUpdated(_) => Self::DEVICE_UPDATED,
            Self::DeviceRoleChanged(_) => Self::DEVICE_ROLE_CHANGED,
            Self::UserInteractionStarted(_) => Self::USER_INTERACTION_STARTED,
            Self::UserInteractionEnded(_) => Self::USER_INTERACTION_ENDED,
            Self::Quit => Self::QUIT,
            Self::Other { code, .. } => *code,
        }
    }

    /// Name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::DeviceActivated(_) => "TrackedDeviceActivated",
            Self::DeviceDeactivated(_) => "TrackedDeviceDeactivated",
            Self::DeviceUpdated(_) => "TrackedDeviceUpdated",
            Self::DeviceRoleChanged(_) => "TrackedDeviceRoleChanged",
            Self::UserInteractionStarted(_) => "TrackedDeviceUserInteractionStarted",
            Self::UserInteractionEnded(_) => "TrackedDeviceUserInteractionEnded",
            Self::Quit => "Quit",
            Self::Other { .. } => "Other",
        }
    }

    /// Device slot the event refers to, if any
    pub fn device_index(&self) -> Option<DeviceIndex> {
        match self {
            Self::DeviceActivated(i)
            | Self::DeviceDeactivated(i)
            | Self::DeviceUpdated(i)
            | Self::DeviceRoleChanged(i)
            | Self::UserInteractionStarted(i)
            | Self::UserInteractionEnded(i) => Some(*i),
            Self::Other { index, .. } => Some(*index),
            Self::Quit => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_known_codes() {
        assert_eq!(
            RuntimeEvent::from_raw(100, 3),
            RuntimeEvent::DeviceActivated(3)
        );
        assert_eq!(
            RuntimeEvent::from_raw(101, 3),
            RuntimeEvent::DeviceDeactivated(3)
        );
        assert_eq!(
            RuntimeEvent::from_raw(108, 1),
            RuntimeEvent::DeviceRoleChanged(1)
        );
        assert_eq!(RuntimeEvent::from_raw(700, 0), RuntimeEvent::Quit);
    }

    #[test]
    fn test_from_raw_unknown_code() {
        let event = RuntimeEvent::from_raw(410, 2);
        assert_eq!(event, RuntimeEvent::Other { code: 410, index: 2 });
        assert_eq!(event.code(), 410);
        assert_eq!(event.device_index(), Some(2));
    }

    #[test]
    fn test_quit_has_no_device() {
        assert_eq!(RuntimeEvent::Quit.device_index(), None);
        assert_eq!(RuntimeEvent::Quit.name(), "Quit");
    }
}
