use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

bitflags::bitflags! {
    /// Number of hands a manipulator responds to.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ManipulationModes: u8 {
        const ONE_HANDED = 0b0000_0001;
        const TWO_HANDED = 0b0000_0010;
    }
}

impl Default for ManipulationModes {
    fn default() -> Self {
        Self::ONE_HANDED | Self::TWO_HANDED
    }
}

bitflags::bitflags! {
    /// Parts of the transform driven by a two-hand manipulation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TransformModes: u8 {
        const MOVE   = 0b0000_0001;
        const ROTATE = 0b0000_0010;
        const SCALE  = 0b0000_0100;
    }
}

impl Default for TransformModes {
    fn default() -> Self {
        Self::all()
    }
}

bitflags::bitflags! {
    /// Physics state carried over when the last pointer lets go.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ReleaseBehavior: u8 {
        const KEEP_VELOCITY         = 0b0000_0001;
        const KEEP_ANGULAR_VELOCITY = 0b0000_0010;
    }
}

impl Default for ReleaseBehavior {
    fn default() -> Self {
        Self::KEEP_VELOCITY | Self::KEEP_ANGULAR_VELOCITY
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct AxisFlags: u8 {
        const X = 0b0000_0001;
        const Y = 0b0000_0010;
        const Z = 0b0000_0100;
    }
}

impl Default for AxisFlags {
    fn default() -> Self {
        Self::all()
    }
}

impl AxisFlags {
    /// Per-axis factor: `value` on the selected axes, 1 elsewhere.
    pub fn select(self, value: f32) -> glam::Vec3 {
        let pick = |axis: AxisFlags| if self.contains(axis) { value } else { 1.0 };
        glam::Vec3::new(pick(AxisFlags::X), pick(AxisFlags::Y), pick(AxisFlags::Z))
    }
}

/// How a single grabbing hand rotates the object.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OneHandRotationMode {
    /// Only translate; the rotation from grab start is kept.
    MaintainOriginalRotation,
    /// Rotate with the hand, pivoting on the object's center.
    RotateAboutObjectCenter,
    /// Rigidly follow the hand, pivoting on the grab point.
    #[default]
    RotateAboutGrabPoint,
    /// Keep the rotation relative to the viewer that the object had at grab start.
    MaintainRotationToUser,
    /// Like `MaintainRotationToUser`, but only around world up.
    GravityAlignedMaintainRotationToUser,
    /// Turn the object's +Z toward the viewer.
    FaceUser,
    /// Turn the object's +Z away from the viewer.
    FaceAwayFromUser,
}
