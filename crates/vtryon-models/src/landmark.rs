//! Pose landmarks and detection results.

use std::collections::BTreeMap;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Anatomical keypoints in COCO order (the layout MoveNet emits).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum LandmarkName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl LandmarkName {
    /// Number of keypoints in the COCO layout.
    pub const COUNT: usize = 17;

    /// All keypoints, indexed by their model output position.
    pub const ALL: [LandmarkName; Self::COUNT] = [
        LandmarkName::Nose,
        LandmarkName::LeftEye,
        LandmarkName::RightEye,
        LandmarkName::LeftEar,
        LandmarkName::RightEar,
        LandmarkName::LeftShoulder,
        LandmarkName::RightShoulder,
        LandmarkName::LeftElbow,
        LandmarkName::RightElbow,
        LandmarkName::LeftWrist,
        LandmarkName::RightWrist,
        LandmarkName::LeftHip,
        LandmarkName::RightHip,
        LandmarkName::LeftKnee,
        LandmarkName::RightKnee,
        LandmarkName::LeftAnkle,
        LandmarkName::RightAnkle,
    ];

    /// Landmarks that must all be present for a garment to be placed.
    pub const TORSO: [LandmarkName; 4] = [
        LandmarkName::LeftShoulder,
        LandmarkName::RightShoulder,
        LandmarkName::LeftHip,
        LandmarkName::RightHip,
    ];

    /// Look up a keypoint by its model output index.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LandmarkName::Nose => "nose",
            LandmarkName::LeftEye => "left_eye",
            LandmarkName::RightEye => "right_eye",
            LandmarkName::LeftEar => "left_ear",
            LandmarkName::RightEar => "right_ear",
            LandmarkName::LeftShoulder => "left_shoulder",
            LandmarkName::RightShoulder => "right_shoulder",
            LandmarkName::LeftElbow => "left_elbow",
            LandmarkName::RightElbow => "right_elbow",
            LandmarkName::LeftWrist => "left_wrist",
            LandmarkName::RightWrist => "right_wrist",
            LandmarkName::LeftHip => "left_hip",
            LandmarkName::RightHip => "right_hip",
            LandmarkName::LeftKnee => "left_knee",
            LandmarkName::RightKnee => "right_knee",
            LandmarkName::LeftAnkle => "left_ankle",
            LandmarkName::RightAnkle => "right_ankle",
        }
    }
}

impl fmt::Display for LandmarkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected keypoint in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Landmark {
    /// Horizontal position (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Vertical position (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Model confidence (0.0 to 1.0)
    pub confidence: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Convert to pixel coordinates for an image of the given size.
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

/// The four torso keypoints used for garment placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TorsoLandmarks {
    pub left_shoulder: Landmark,
    pub right_shoulder: Landmark,
    pub left_hip: Landmark,
    pub right_hip: Landmark,
}

/// Result of a pose estimation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PoseResult {
    /// A person was found; only landmarks above the confidence threshold are kept.
    Detected {
        landmarks: BTreeMap<LandmarkName, Landmark>,
    },
    /// No usable person in the frame.
    NotDetected,
}

impl PoseResult {
    /// Build a result from detected landmarks.
    ///
    /// Collapses to `NotDetected` when any torso landmark is missing.
    pub fn from_landmarks(landmarks: BTreeMap<LandmarkName, Landmark>) -> Self {
        if LandmarkName::TORSO.iter().all(|name| landmarks.contains_key(name)) {
            PoseResult::Detected { landmarks }
        } else {
            PoseResult::NotDetected
        }
    }

    pub fn is_detected(&self) -> bool {
        matches!(self, PoseResult::Detected { .. })
    }

    pub fn landmark(&self, name: LandmarkName) -> Option<&Landmark> {
        match self {
            PoseResult::Detected { landmarks } => landmarks.get(&name),
            PoseResult::NotDetected => None,
        }
    }

    /// Extract the torso keypoints, or `None` if any is absent.
    pub fn torso(&self) -> Option<TorsoLandmarks> {
        Some(TorsoLandmarks {
            left_shoulder: *self.landmark(LandmarkName::LeftShoulder)?,
            right_shoulder: *self.landmark(LandmarkName::RightShoulder)?,
            left_hip: *self.landmark(LandmarkName::LeftHip)?,
            right_hip: *self.landmark(LandmarkName::RightHip)?,
        })
    }
}
