use glam::{Affine3A, Quat, Vec3A};

use crate::math::lerp_transform;

/// Exponential smoothing of the applied transform.
///
/// The gap to `raw` shrinks by `exp(-factor * delta_time)` per call, so the
/// result does not depend on how a time span is split into frames.
/// A `factor` of zero (or less) returns `raw` untouched.
pub fn smooth_transform(
    previous: &Affine3A,
    raw: &Affine3A,
    factor: f32,
    delta_time: f32,
) -> Affine3A {
    if factor <= 0.0 {
        return *raw;
    }
    let remaining = (-factor * delta_time.max(0.0)).exp();
    lerp_transform(previous, raw, 1.0 - remaining)
}

/// Rigid body velocities estimated from consecutive transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Velocity {
    pub linear: Vec3A,
    /// Axis scaled by radians per second.
    pub angular: Vec3A,
}

impl Default for Velocity {
    fn default() -> Self {
        Self {
            linear: Vec3A::ZERO,
            angular: Vec3A::ZERO,
        }
    }
}

impl Velocity {
    pub fn between(previous: &Affine3A, current: &Affine3A, delta_time: f32) -> Self {
        if delta_time <= f32::EPSILON {
            return Self::default();
        }
        let (_, prev_rot, _) = previous.to_scale_rotation_translation();
        let (_, cur_rot, _) = current.to_scale_rotation_translation();

        let mut delta: Quat = (cur_rot * prev_rot.inverse()).normalize();
        // shortest arc
        if delta.w < 0.0 {
            delta = -delta;
        }
        let (axis, angle) = delta.to_axis_angle();

        Self {
            linear: (current.translation - previous.translation) / delta_time,
            angular: Vec3A::from(axis) * (angle / delta_time),
        }
    }
}
