use glam::{Affine3A, Quat, Vec3, Vec3A};

use crate::interaction::InteractionContext;

use super::flags::AxisFlags;

/// Adjusts the transform a manipulator is about to apply.
pub trait TransformConstraint {
    /// Called when a manipulation (re)starts with the object's current transform.
    fn setup(&mut self, _start: &Affine3A, _ctx: &InteractionContext) {}

    fn apply(&self, transform: &mut Affine3A, ctx: &InteractionContext);
}

fn split(transform: &Affine3A) -> (Vec3, Quat, Vec3) {
    transform.to_scale_rotation_translation()
}

/// Keeps the rotation relative to the viewer that the object had when the
/// manipulation started.
#[derive(Debug, Clone, Copy)]
pub struct FixedRotationToUserConstraint {
    rotation_in_view: Quat,
}

impl Default for FixedRotationToUserConstraint {
    fn default() -> Self {
        Self {
            rotation_in_view: Quat::IDENTITY,
        }
    }
}

impl TransformConstraint for FixedRotationToUserConstraint {
    fn setup(&mut self, start: &Affine3A, ctx: &InteractionContext) {
        let (_, rotation, _) = split(start);
        let (_, view, _) = split(&ctx.viewer);
        self.rotation_in_view = view.inverse() * rotation;
    }

    fn apply(&self, transform: &mut Affine3A, ctx: &InteractionContext) {
        let (scale, _, translation) = split(transform);
        let (_, view, _) = split(&ctx.viewer);
        *transform = Affine3A::from_scale_rotation_translation(
            scale,
            (view * self.rotation_in_view).normalize(),
            translation,
        );
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedRotationToWorldConstraint {
    rotation: Quat,
}

impl Default for FixedRotationToWorldConstraint {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
        }
    }
}

impl TransformConstraint for FixedRotationToWorldConstraint {
    fn setup(&mut self, start: &Affine3A, _ctx: &InteractionContext) {
        let (_, rotation, _) = split(start);
        self.rotation = rotation;
    }

    fn apply(&self, transform: &mut Affine3A, _ctx: &InteractionContext) {
        let (scale, _, translation) = split(transform);
        *transform = Affine3A::from_scale_rotation_translation(scale, self.rotation, translation);
    }
}

/// Clamps the scale per axis, either absolutely or relative to the scale at
/// manipulation start.
#[derive(Debug, Clone, Copy)]
pub struct ScaleClampConstraint {
    pub min: f32,
    pub max: f32,
    pub relative_to_initial: bool,
    initial_scale: Vec3,
}

impl ScaleClampConstraint {
    pub fn new(min: f32, max: f32, relative_to_initial: bool) -> Self {
        Self {
            min: min.min(max),
            max: min.max(max),
            relative_to_initial,
            initial_scale: Vec3::ONE,
        }
    }
}

impl Default for ScaleClampConstraint {
    fn default() -> Self {
        Self::new(0.2, 2.0, true)
    }
}

impl TransformConstraint for ScaleClampConstraint {
    fn setup(&mut self, start: &Affine3A, _ctx: &InteractionContext) {
        let (scale, _, _) = split(start);
        self.initial_scale = scale;
    }

    fn apply(&self, transform: &mut Affine3A, _ctx: &InteractionContext) {
        let (scale, rotation, translation) = split(transform);
        let (min, max) = if self.relative_to_initial {
            (self.initial_scale * self.min, self.initial_scale * self.max)
        } else {
            (Vec3::splat(self.min), Vec3::splat(self.max))
        };
        *transform =
            Affine3A::from_scale_rotation_translation(scale.clamp(min, max), rotation, translation);
    }
}

/// Stops movement along the selected world axes.
#[derive(Debug, Clone, Copy)]
pub struct MoveAxisConstraint {
    pub locked_axes: AxisFlags,
    start: Vec3A,
}

impl MoveAxisConstraint {
    pub fn new(locked_axes: AxisFlags) -> Self {
        Self {
            locked_axes,
            start: Vec3A::ZERO,
        }
    }
}

impl TransformConstraint for MoveAxisConstraint {
    fn setup(&mut self, start: &Affine3A, _ctx: &InteractionContext) {
        self.start = start.translation;
    }

    fn apply(&self, transform: &mut Affine3A, _ctx: &InteractionContext) {
        let t = &mut transform.translation;
        if self.locked_axes.contains(AxisFlags::X) {
            t.x = self.start.x;
        }
        if self.locked_axes.contains(AxisFlags::Y) {
            t.y = self.start.y;
        }
        if self.locked_axes.contains(AxisFlags::Z) {
            t.z = self.start.z;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_to_user_follows_viewer() {
        let mut ctx = InteractionContext::default();
        let mut constraint = FixedRotationToUserConstraint::default();
        constraint.setup(&Affine3A::IDENTITY, &ctx);

        ctx.viewer = Affine3A::from_rotation_y(0.5);
        let mut transform =
            Affine3A::from_rotation_translation(Quat::from_rotation_x(1.0), Vec3::ONE);
        constraint.apply(&mut transform, &ctx);

        let (_, rotation, translation) = transform.to_scale_rotation_translation();
        assert!(rotation.dot(Quat::from_rotation_y(0.5)).abs() > 1.0 - 1e-5);
        assert!(translation.abs_diff_eq(Vec3::ONE, 1e-5));
    }

    #[test]
    fn rotation_to_world_keeps_start_rotation() {
        let mut ctx = InteractionContext::default();
        let start = Quat::from_rotation_z(0.7);
        let mut constraint = FixedRotationToWorldConstraint::default();
        constraint.setup(&Affine3A::from_rotation_translation(start, Vec3::ZERO), &ctx);

        // unlike the user-relative constraint, turning the viewer changes nothing
        ctx.viewer = Affine3A::from_rotation_y(1.2);
        let mut transform = Affine3A::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_x(1.0),
            Vec3::new(0.5, 1.0, -1.0),
        );
        constraint.apply(&mut transform, &ctx);

        let (scale, rotation, translation) = transform.to_scale_rotation_translation();
        assert!(rotation.dot(start).abs() > 1.0 - 1e-5);
        assert!(scale.abs_diff_eq(Vec3::splat(2.0), 1e-5));
        assert!(translation.abs_diff_eq(Vec3::new(0.5, 1.0, -1.0), 1e-5));
    }

    #[test]
    fn scale_clamp_relative() {
        let ctx = InteractionContext::default();
        let mut constraint = ScaleClampConstraint::new(0.5, 2.0, true);
        constraint.setup(&Affine3A::from_scale(Vec3::splat(2.0)), &ctx);

        let mut transform = Affine3A::from_scale(Vec3::new(10.0, 0.1, 3.0));
        constraint.apply(&mut transform, &ctx);
        let (scale, _, _) = transform.to_scale_rotation_translation();
        assert!(scale.abs_diff_eq(Vec3::new(4.0, 1.0, 3.0), 1e-5));
    }

    #[test]
    fn scale_clamp_absolute() {
        let ctx = InteractionContext::default();
        let constraint = ScaleClampConstraint::new(2.0, 0.5, false);
        let mut transform = Affine3A::from_scale(Vec3::new(10.0, 0.1, 1.0));
        constraint.apply(&mut transform, &ctx);
        let (scale, _, _) = transform.to_scale_rotation_translation();
        assert!(scale.abs_diff_eq(Vec3::new(2.0, 0.5, 1.0), 1e-5));
    }

    #[test]
    fn move_axis_locks_height() {
        let ctx = InteractionContext::default();
        let mut constraint = MoveAxisConstraint::new(AxisFlags::Y);
        constraint.setup(&Affine3A::from_translation(Vec3::new(0.0, 1.0, 0.0)), &ctx);

        let mut transform = Affine3A::from_translation(Vec3::new(2.0, 3.0, 4.0));
        constraint.apply(&mut transform, &ctx);
        assert!(transform
            .translation
            .abs_diff_eq(Vec3A::new(2.0, 1.0, 4.0), 1e-6));
    }
}
