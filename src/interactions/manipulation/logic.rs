use glam::{Affine3A, Quat, Vec3, Vec3A};

use crate::{
    interactions::grab::GrabPointerData,
    math::{find_between, look_rotation},
};

use super::flags::{AxisFlags, OneHandRotationMode};

/// Vector from the primary to the secondary pointer, zero with fewer than two.
pub fn handle_bar(pointers: &[GrabPointerData]) -> Vec3A {
    match pointers {
        [first, second, ..] => second.target_location() - first.target_location(),
        _ => Vec3A::ZERO,
    }
}

fn centroid(pointers: &[GrabPointerData]) -> Vec3A {
    if pointers.is_empty() {
        return Vec3A::ZERO;
    }
    pointers.iter().map(GrabPointerData::target_location).sum::<Vec3A>() / pointers.len() as f32
}

/// Rotation of a frame looking from the viewer at `position`.
fn view_rotation(viewer: &Affine3A, position: Vec3A, gravity_aligned: bool) -> Option<Quat> {
    let mut forward = position - viewer.translation;
    if gravity_aligned {
        forward.y = 0.0;
    }
    look_rotation(forward, Vec3A::Y)
}

/// Single pointer manipulation.
#[derive(Debug, Clone, Copy)]
pub struct OneHandLogic {
    mode: OneHandRotationMode,
    start_scale: Vec3,
    start_rotation: Quat,
    start_pointer_rotation: Quat,
    /// Object pose relative to the pointer.
    object_in_pointer: Affine3A,
    /// World-space offset from the pointer to the object center.
    center_offset: Vec3A,
    /// Object rotation relative to the viewer's look frame.
    rotation_in_view: Quat,
    gravity_rotation_in_view: Quat,
}

impl OneHandLogic {
    pub fn new(mode: OneHandRotationMode) -> Self {
        Self {
            mode,
            start_scale: Vec3::ONE,
            start_rotation: Quat::IDENTITY,
            start_pointer_rotation: Quat::IDENTITY,
            object_in_pointer: Affine3A::IDENTITY,
            center_offset: Vec3A::ZERO,
            rotation_in_view: Quat::IDENTITY,
            gravity_rotation_in_view: Quat::IDENTITY,
        }
    }

    pub fn mode(&self) -> OneHandRotationMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: OneHandRotationMode) {
        self.mode = mode;
    }

    pub fn setup(&mut self, pointer: &GrabPointerData, object: &Affine3A, viewer: &Affine3A) {
        let (scale, rotation, position) = object.to_scale_rotation_translation();
        let anchor = pointer.target_transform();
        let (_, pointer_rotation, _) = anchor.to_scale_rotation_translation();
        let position = Vec3A::from(position);

        self.start_scale = scale;
        self.start_rotation = rotation;
        self.start_pointer_rotation = pointer_rotation;
        self.object_in_pointer = anchor.inverse() * *object;
        self.center_offset = position - anchor.translation;

        self.rotation_in_view = view_rotation(viewer, position, false)
            .map_or(rotation, |view| view.inverse() * rotation);
        self.gravity_rotation_in_view = view_rotation(viewer, position, true)
            .map_or(rotation, |view| view.inverse() * rotation);
    }

    pub fn update(&self, pointer: &GrabPointerData, viewer: &Affine3A) -> Affine3A {
        let anchor = pointer.target_transform();
        let (_, pointer_rotation, _) = anchor.to_scale_rotation_translation();
        let position = anchor.translation + self.center_offset;

        let rotation = match self.mode {
            OneHandRotationMode::RotateAboutGrabPoint => {
                let follow = anchor * self.object_in_pointer;
                let (_, rotation, translation) = follow.to_scale_rotation_translation();
                return Affine3A::from_scale_rotation_translation(
                    self.start_scale,
                    rotation.normalize(),
                    translation,
                );
            }
            OneHandRotationMode::MaintainOriginalRotation => self.start_rotation,
            OneHandRotationMode::RotateAboutObjectCenter => {
                (pointer_rotation * self.start_pointer_rotation.inverse()).normalize()
                    * self.start_rotation
            }
            OneHandRotationMode::MaintainRotationToUser => view_rotation(viewer, position, false)
                .map_or(self.start_rotation, |view| view * self.rotation_in_view),
            OneHandRotationMode::GravityAlignedMaintainRotationToUser => {
                view_rotation(viewer, position, true)
                    .map_or(self.start_rotation, |view| view * self.gravity_rotation_in_view)
            }
            OneHandRotationMode::FaceUser => {
                look_rotation(viewer.translation - position, Vec3A::Y)
                    .unwrap_or(self.start_rotation)
            }
            OneHandRotationMode::FaceAwayFromUser => {
                look_rotation(position - viewer.translation, Vec3A::Y)
                    .unwrap_or(self.start_rotation)
            }
        };

        Affine3A::from_scale_rotation_translation(
            self.start_scale,
            rotation.normalize(),
            position.into(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TwoHandRotateLogic {
    start_handle_bar: Vec3A,
    start_rotation: Quat,
}

impl Default for TwoHandRotateLogic {
    fn default() -> Self {
        Self {
            start_handle_bar: Vec3A::ZERO,
            start_rotation: Quat::IDENTITY,
        }
    }
}

impl TwoHandRotateLogic {
    pub fn setup(&mut self, pointers: &[GrabPointerData], rotation: Quat) {
        self.start_handle_bar = handle_bar(pointers);
        self.start_rotation = rotation;
    }

    pub fn update(&self, pointers: &[GrabPointerData]) -> Quat {
        let delta = find_between(self.start_handle_bar, handle_bar(pointers)).normalize();
        delta * self.start_rotation
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TwoHandScaleLogic {
    axes: AxisFlags,
    start_length: f32,
    start_scale: Vec3,
}

impl TwoHandScaleLogic {
    pub fn new(axes: AxisFlags) -> Self {
        Self {
            axes,
            start_length: 0.0,
            start_scale: Vec3::ONE,
        }
    }

    pub fn setup(&mut self, pointers: &[GrabPointerData], scale: Vec3) {
        self.start_length = handle_bar(pointers).length();
        self.start_scale = scale;
    }

    /// Current handle bar length over the one at setup; 1 if that was degenerate.
    pub fn ratio(&self, pointers: &[GrabPointerData]) -> f32 {
        if self.start_length <= f32::EPSILON {
            return 1.0;
        }
        handle_bar(pointers).length() / self.start_length
    }

    pub fn update(&self, pointers: &[GrabPointerData]) -> Vec3 {
        self.start_scale * self.axes.select(self.ratio(pointers))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TwoHandMoveLogic {
    /// Object position relative to the pointer centroid.
    start_offset: Vec3A,
}

impl Default for TwoHandMoveLogic {
    fn default() -> Self {
        Self {
            start_offset: Vec3A::ZERO,
        }
    }
}

impl TwoHandMoveLogic {
    pub fn setup(&mut self, pointers: &[GrabPointerData], position: Vec3A) {
        self.start_offset = position - centroid(pointers);
    }

    /// `delta_rotation` and `scale` carry the offset along with the rotation and
    /// scaling applied in the same update.
    pub fn update(&self, pointers: &[GrabPointerData], delta_rotation: Quat, scale: Vec3) -> Vec3A {
        centroid(pointers) + delta_rotation * (self.start_offset * Vec3A::from(scale))
    }
}
