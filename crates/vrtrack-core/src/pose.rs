//! Poses as produced by the tracking runtime and as handed to consumers

use serde::{Deserialize, Serialize};

/// Reference frame in which the runtime expresses poses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingOrigin {
    /// Origin at the seated zero pose, resettable at runtime
    Seated,
    /// Origin on the floor of the calibrated play area
    Standing,
    /// Uncalibrated tracking space
    Raw,
}

impl TrackingOrigin {
    pub fn code(self) -> u32 {
        match self {
            Self::Seated => 0,
            Self::Standing => 1,
            Self::Raw => 2,
        }
    }
}

impl Default for TrackingOrigin {
    fn default() -> Self {
        Self::Seated
    }
}

impl std::fmt::Display for TrackingOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Seated => "seated",
            Self::Standing => "standing",
            Self::Raw => "raw",
        };
        f.write_str(name)
    }
}

/// Tracking state attached by the runtime to every raw pose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingResult {
    Uninitialized,
    CalibratingInProgress,
    CalibratingOutOfRange,
    RunningOk,
    RunningOutOfRange,
    FallbackRotationOnly,
    Unknown(u32),
}

impl TrackingResult {
    pub fn code(self) -> u32 {
        match self {
            Self::Uninitialized => 1,
            Self::CalibratingInProgress => 100,
            Self::CalibratingOutOfRange => 101,
            Self::RunningOk => 200,
            Self::RunningOutOfRange => 201,
            Self::FallbackRotationOnly => 300,
            Self::Unknown(code) => code,
        }
    }
}

impl From<u32> for TrackingResult {
    fn from(value: u32) -> Self {
        match value {
            1 => Self::Uninitialized,
            100 => Self::CalibratingInProgress,
            101 => Self::CalibratingOutOfRange,
            200 => Self::RunningOk,
            201 => Self::RunningOutOfRange,
            300 => Self::FallbackRotationOnly,
            other => Self::Unknown(other),
        }
    }
}

/// Pose of one hardware slot as returned by a batched runtime query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPose {
    /// Device-to-origin transform, 3 rows by 4 columns, row-major
    pub device_to_absolute: [[f32; 4]; 3],
    /// Validity flag set by the runtime
    pub valid: bool,
    /// Whether the slot held a connected device when the batch was computed
    pub device_connected: bool,
    /// Tracking state of the slot
    pub result: TrackingResult,
}

impl RawPose {
    /// Raw pose from a homogeneous 4x4 transform. The last row is dropped.
    pub fn from_homogeneous(matrix: [[f32; 4]; 4], valid: bool, result: TrackingResult) -> Self {
        Self {
            device_to_absolute: [matrix[0], matrix[1], matrix[2]],
            valid,
            device_connected: true,
            result,
        }
    }

    /// Empty slot: identity transform, invalid, uninitialized
    pub fn invalid() -> Self {
        Self {
            device_to_absolute: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
            ],
            valid: false,
            device_connected: false,
            result: TrackingResult::Uninitialized,
        }
    }

    /// Whether the pose can be handed to consumers
    pub fn is_usable(&self) -> bool {
        self.valid && self.result == TrackingResult::RunningOk
    }
}

impl Default for RawPose {
    fn default() -> Self {
        Self::invalid()
    }
}

/// Device transform relative to the active tracking origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Translation in meters
    pub position: [f64; 3],
    /// 3x3 rotation matrix, row-major
    pub rotation: [f64; 9],
}

impl Pose {
    pub fn identity() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        }
    }

    /// Compose the 4x4 homogeneous transform
    pub fn to_homogeneous(&self) -> [[f64; 4]; 4] {
        let r = &self.rotation;
        let p = &self.position;
        [
            [r[0], r[1], r[2], p[0]],
            [r[3], r[4], r[5], p[1]],
            [r[6], r[7], r[8], p[2]],
            [0.0, 0.0, 0.0, 1.0],
        ]
    }
}

impl From<&RawPose> for Pose {
    fn from(raw: &RawPose) -> Self {
        let m = &raw.device_to_absolute;
        let mut rotation = [0.0; 9];
        for (row, values) in m.iter().enumerate() {
            for (col, value) in values[..3].iter().enumerate() {
                rotation[row * 3 + col] = *value as f64;
            }
        }

        Self {
            position: [m[0][3] as f64, m[1][3] as f64, m[2][3] as f64],
            rotation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_raw() -> RawPose {
        RawPose {
            device_to_absolute: [
                [0.0, -1.0, 0.0, 1.5],
                [1.0, 0.0, 0.0, -0.25],
                [0.0, 0.0, 1.0, 2.0],
            ],
            valid: true,
            device_connected: true,
            result: TrackingResult::RunningOk,
        }
    }

    #[test]
    fn test_pose_from_raw() {
        let pose = Pose::from(&sample_raw());
        assert_eq!(pose.position, [1.5, -0.25, 2.0]);
        assert_eq!(
            pose.rotation,
            [0.0, -1.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
    }

    #[test]
    fn test_pose_to_homogeneous() {
        let matrix = Pose::from(&sample_raw()).to_homogeneous();
        assert_eq!(matrix[0], [0.0, -1.0, 0.0, 1.5]);
        assert_eq!(matrix[2], [0.0, 0.0, 1.0, 2.0]);
        assert_eq!(matrix[3], [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_raw_pose_from_homogeneous_drops_last_row() {
        let raw = RawPose::from_homogeneous(
            [
                [1.0, 0.0, 0.0, 3.0],
                [0.0, 1.0, 0.0, 4.0],
                [0.0, 0.0, 1.0, 5.0],
                [9.0, 9.0, 9.0, 9.0],
            ],
            true,
            TrackingResult::RunningOk,
        );
        assert_eq!(Pose::from(&raw).position, [3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_usable_requires_valid_and_running_ok() {
        let mut raw = sample_raw();
        assert!(raw.is_usable());

        raw.result = TrackingResult::RunningOutOfRange;
        assert!(!raw.is_usable());

        raw.result = TrackingResult::RunningOk;
        raw.valid = false;
        assert!(!raw.is_usable());

        assert!(!RawPose::invalid().is_usable());
    }

    #[test]
    fn test_tracking_result_codes() {
        assert_eq!(TrackingResult::from(200), TrackingResult::RunningOk);
        assert_eq!(TrackingResult::from(7), TrackingResult::Unknown(7));
        assert_eq!(TrackingResult::FallbackRotationOnly.code(), 300);
    }
}
