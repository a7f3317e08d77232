//! Turns the pointers grabbing an object into transform updates.
//!
//! [`GenericManipulator`] wraps a [`GrabTargetComponent`] and, every tick it is
//! grabbed, computes a raw transform from one or two hands, runs it through the
//! configured [`TransformConstraint`]s and smoothing, and stores the result.
//! The host copies [`GenericManipulator::transform`] onto its object.

pub mod constraints;
pub mod flags;
pub mod logic;
pub mod smoothing;

use glam::{Affine3A, Vec3, Vec3A};

pub use constraints::{
    FixedRotationToUserConstraint, FixedRotationToWorldConstraint, MoveAxisConstraint,
    ScaleClampConstraint, TransformConstraint,
};
pub use flags::{AxisFlags, ManipulationModes, OneHandRotationMode, ReleaseBehavior, TransformModes};
pub use logic::{OneHandLogic, TwoHandMoveLogic, TwoHandRotateLogic, TwoHandScaleLogic};
pub use smoothing::{smooth_transform, Velocity};

use crate::{
    config::ManipulatorConfig,
    event::EventListeners,
    input::Pointers,
    interaction::InteractionContext,
};

use super::{
    grab::GrabTargetComponent,
    target::{FarTarget, GrabTarget, Interactable},
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManipulationEvent {
    Started(Affine3A),
    Updated(Affine3A),
    /// Velocity handed back to physics.
    Ended(Velocity),
}

/// Rigid body state the host mirrors into its physics engine.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhysicsState {
    pub simulating: bool,
    pub velocity: Velocity,
}

pub struct GenericManipulator {
    grab: GrabTargetComponent,
    config: ManipulatorConfig,
    one_hand: OneHandLogic,
    rotate: TwoHandRotateLogic,
    scale: TwoHandScaleLogic,
    translate: TwoHandMoveLogic,
    constraints: Vec<Box<dyn TransformConstraint>>,
    /// Transform when the current pointer set took over.
    start: Affine3A,
    active_pointers: usize,
    needs_setup: bool,
    physics: PhysicsState,
    was_simulating: bool,
    pub events: EventListeners<ManipulationEvent>,
}

impl GenericManipulator {
    pub fn new(transform: Affine3A, config: ManipulatorConfig) -> Self {
        Self {
            grab: GrabTargetComponent::new(transform),
            config,
            one_hand: OneHandLogic::new(config.one_hand_rotation_mode),
            rotate: TwoHandRotateLogic::default(),
            scale: TwoHandScaleLogic::new(config.scale_axes),
            translate: TwoHandMoveLogic::default(),
            constraints: Vec::new(),
            start: transform,
            active_pointers: 0,
            needs_setup: false,
            physics: PhysicsState::default(),
            was_simulating: false,
            events: EventListeners::default(),
        }
    }

    pub fn config(&self) -> &ManipulatorConfig {
        &self.config
    }

    /// An active manipulation is rebased on the next tick.
    pub fn set_config(&mut self, config: ManipulatorConfig) {
        self.config = config;
        self.one_hand.set_mode(config.one_hand_rotation_mode);
        self.scale = TwoHandScaleLogic::new(config.scale_axes);
        self.needs_setup = true;
    }

    pub fn transform(&self) -> Affine3A {
        self.grab.transform
    }

    pub fn set_transform(&mut self, transform: Affine3A) {
        self.grab.transform = transform;
        if self.grab.is_grabbed() {
            // rebase the active manipulation on the new pose
            self.needs_setup = true;
        }
    }

    pub fn grab(&self) -> &GrabTargetComponent {
        &self.grab
    }

    pub fn grab_mut(&mut self) -> &mut GrabTargetComponent {
        &mut self.grab
    }

    pub fn physics(&self) -> &PhysicsState {
        &self.physics
    }

    pub fn set_simulating_physics(&mut self, simulating: bool) {
        if self.grab.is_grabbed() {
            self.was_simulating = simulating;
        } else {
            self.physics.simulating = simulating;
        }
    }

    pub fn add_constraint(&mut self, constraint: impl TransformConstraint + 'static) {
        self.constraints.push(Box::new(constraint));
    }

    pub fn clear_constraints(&mut self) {
        self.constraints.clear();
    }

    fn setup(&mut self, ctx: &InteractionContext) {
        self.needs_setup = false;
        let transform = self.grab.transform;
        self.start = transform;
        let pointers = self.grab.grab_pointers();
        if let Some(primary) = pointers.first() {
            self.one_hand.setup(primary, &transform, &ctx.viewer);
        }
        if pointers.len() >= 2 {
            let (scale, rotation, position) = transform.to_scale_rotation_translation();
            self.rotate.setup(pointers, rotation);
            self.scale.setup(pointers, scale);
            self.translate.setup(pointers, Vec3A::from(position));
        }
        for constraint in &mut self.constraints {
            constraint.setup(&transform, ctx);
        }
    }

    fn on_pointers_changed(&mut self, count: usize, ctx: &InteractionContext) {
        let previous = self.active_pointers;
        self.active_pointers = count;

        if count == 0 {
            self.end_manipulation();
            return;
        }

        if previous == 0 {
            self.was_simulating = self.physics.simulating;
            self.physics.simulating = false;
            log::debug!("Manipulation started with {} pointer(s)", count);
            self.events.emit(ManipulationEvent::Started(self.grab.transform));
        }
        self.setup(ctx);
    }

    fn end_manipulation(&mut self) {
        let behavior = self.config.release_behavior;
        let mut velocity = self.physics.velocity;
        if !behavior.contains(ReleaseBehavior::KEEP_VELOCITY) {
            velocity.linear = Vec3A::ZERO;
        }
        if !behavior.contains(ReleaseBehavior::KEEP_ANGULAR_VELOCITY) {
            velocity.angular = Vec3A::ZERO;
        }
        self.physics = PhysicsState {
            simulating: self.was_simulating,
            velocity,
        };
        log::debug!("Manipulation ended");
        self.events.emit(ManipulationEvent::Ended(velocity));
    }

    fn one_hand_transform(&self, ctx: &InteractionContext) -> Option<Affine3A> {
        let primary = self.grab.primary_grab_pointer()?;
        Some(self.one_hand.update(primary, &ctx.viewer))
    }

    fn two_hand_transform(&self) -> Affine3A {
        let pointers = self.grab.grab_pointers();
        let modes = self.config.two_hand_transform_modes;
        let (start_scale, start_rotation, start_position) =
            self.start.to_scale_rotation_translation();

        let rotation = if modes.contains(TransformModes::ROTATE) {
            self.rotate.update(pointers)
        } else {
            start_rotation
        };
        let (scale, scale_delta) = if modes.contains(TransformModes::SCALE) {
            (
                self.scale.update(pointers),
                self.config.scale_axes.select(self.scale.ratio(pointers)),
            )
        } else {
            (start_scale, Vec3::ONE)
        };
        let position = if modes.contains(TransformModes::MOVE) {
            let delta_rotation = rotation * start_rotation.inverse();
            self.translate.update(pointers, delta_rotation, scale_delta).into()
        } else {
            start_position
        };

        Affine3A::from_scale_rotation_translation(scale, rotation.normalize(), position)
    }

    fn raw_transform(&self, ctx: &InteractionContext) -> Option<Affine3A> {
        let modes = self.config.manipulation_modes;
        match self.grab.grab_pointers().len() {
            0 => None,
            1 if modes.contains(ManipulationModes::ONE_HANDED) => self.one_hand_transform(ctx),
            1 => None,
            _ if modes.contains(ManipulationModes::TWO_HANDED) => Some(self.two_hand_transform()),
            _ if modes.contains(ManipulationModes::ONE_HANDED) => self.one_hand_transform(ctx),
            _ => None,
        }
    }
}

impl Interactable for GenericManipulator {
    fn as_grab_target(&mut self) -> Option<&mut dyn GrabTarget> {
        Some(&mut self.grab)
    }

    fn as_far_target(&mut self) -> Option<&mut dyn FarTarget> {
        Some(&mut self.grab)
    }

    fn wants_tick(&self) -> bool {
        !self.grab.tick_only_while_grabbed
            || self.grab.is_grabbed()
            || self.active_pointers != 0
    }

    fn tick(&mut self, _pointers: &Pointers, ctx: &mut InteractionContext) {
        let count = self.grab.grab_pointers().len();
        if count != self.active_pointers {
            self.on_pointers_changed(count, ctx);
        } else if self.needs_setup && count > 0 {
            self.setup(ctx);
        }

        let Some(mut next) = self.raw_transform(ctx) else {
            return;
        };
        for constraint in &self.constraints {
            constraint.apply(&mut next, ctx);
        }

        let previous = self.grab.transform;
        let next = smooth_transform(
            &previous,
            &next,
            self.config.smoothing_factor,
            ctx.delta_time,
        );
        self.physics.velocity = Velocity::between(&previous, &next, ctx.delta_time);
        self.grab.transform = next;
        self.events.emit(ManipulationEvent::Updated(next));
    }
}

#[cfg(test)]
mod tests {
    use glam::{Quat, Vec3};
    use slotmap::SlotMap;

    use super::*;
    use crate::{
        event::testing::record,
        input::{PointerId, PointerInfo, PointerKind},
    };

    fn ids(n: usize) -> Vec<PointerId> {
        let mut map: SlotMap<PointerId, ()> = SlotMap::with_key();
        (0..n).map(|_| map.insert(())).collect()
    }

    fn hand(id: PointerId, pos: Vec3) -> PointerInfo {
        PointerInfo {
            id,
            kind: PointerKind::Grab,
            hand: None,
            transform: Affine3A::from_translation(pos),
            radius: 0.0,
            hit: None,
        }
    }

    fn frame(manipulator: &mut GenericManipulator, dt: f32) {
        let mut ctx = InteractionContext::new(0.0, dt, Affine3A::IDENTITY);
        if manipulator.wants_tick() {
            manipulator.tick(&Pointers::new(), &mut ctx);
        }
    }

    fn grab(manipulator: &mut GenericManipulator, pointer: &PointerInfo) {
        let mut ctx = InteractionContext::default();
        manipulator
            .as_grab_target()
            .unwrap()
            .on_begin_grab(pointer, &mut ctx);
    }

    fn drag(manipulator: &mut GenericManipulator, pointer: &PointerInfo) {
        let mut ctx = InteractionContext::default();
        manipulator
            .as_grab_target()
            .unwrap()
            .on_update_grab(pointer, &mut ctx);
    }

    fn release(manipulator: &mut GenericManipulator, pointer: &PointerInfo) {
        let mut ctx = InteractionContext::default();
        manipulator
            .as_grab_target()
            .unwrap()
            .on_end_grab(pointer, &mut ctx);
    }

    #[test]
    fn idle_manipulator_does_not_tick() {
        let manipulator = GenericManipulator::new(Affine3A::IDENTITY, ManipulatorConfig::default());
        assert!(!manipulator.wants_tick());
    }

    #[test]
    fn one_hand_move_and_release() {
        let mut manipulator =
            GenericManipulator::new(Affine3A::IDENTITY, ManipulatorConfig::default());
        manipulator.set_simulating_physics(true);
        let log = record(&mut manipulator.events);
        let id = ids(1)[0];

        grab(&mut manipulator, &hand(id, Vec3::new(0.1, 0.0, 0.0)));
        frame(&mut manipulator, 0.1);
        assert!(!manipulator.physics().simulating);
        assert!(matches!(log.borrow()[0], ManipulationEvent::Started(_)));

        drag(&mut manipulator, &hand(id, Vec3::new(0.1, 0.1, 0.0)));
        frame(&mut manipulator, 0.1);
        assert!(manipulator
            .transform()
            .translation
            .abs_diff_eq(Vec3A::new(0.0, 0.1, 0.0), 1e-5));

        release(&mut manipulator, &hand(id, Vec3::ZERO));
        assert!(manipulator.wants_tick());
        frame(&mut manipulator, 0.1);
        assert!(!manipulator.wants_tick());

        let physics = manipulator.physics();
        assert!(physics.simulating);
        assert!(physics
            .velocity
            .linear
            .abs_diff_eq(Vec3A::new(0.0, 1.0, 0.0), 1e-4));
        assert!(matches!(log.borrow().last(), Some(ManipulationEvent::Ended(_))));
    }

    #[test]
    fn release_can_drop_velocity() {
        let config = ManipulatorConfig {
            release_behavior: ReleaseBehavior::empty(),
            ..Default::default()
        };
        let mut manipulator = GenericManipulator::new(Affine3A::IDENTITY, config);
        let id = ids(1)[0];
        grab(&mut manipulator, &hand(id, Vec3::ZERO));
        frame(&mut manipulator, 0.1);
        drag(&mut manipulator, &hand(id, Vec3::X));
        frame(&mut manipulator, 0.1);
        release(&mut manipulator, &hand(id, Vec3::X));
        frame(&mut manipulator, 0.1);
        assert_eq!(manipulator.physics().velocity, Velocity::default());
    }

    #[test]
    fn one_handed_disabled_ignores_single_pointer() {
        let config = ManipulatorConfig {
            manipulation_modes: ManipulationModes::TWO_HANDED,
            ..Default::default()
        };
        let mut manipulator = GenericManipulator::new(Affine3A::IDENTITY, config);
        let id = ids(1)[0];
        grab(&mut manipulator, &hand(id, Vec3::ZERO));
        frame(&mut manipulator, 0.1);
        drag(&mut manipulator, &hand(id, Vec3::ONE));
        frame(&mut manipulator, 0.1);
        assert_eq!(manipulator.transform(), Affine3A::IDENTITY);
    }

    #[test]
    fn two_hand_rotate_and_scale() {
        let start_rotation = Quat::from_rotation_x(0.4);
        let mut manipulator = GenericManipulator::new(
            Affine3A::from_rotation_translation(start_rotation, Vec3::ZERO),
            ManipulatorConfig::default(),
        );
        let p = ids(2);
        grab(&mut manipulator, &hand(p[0], Vec3::new(-0.5, 0.0, 0.0)));
        grab(&mut manipulator, &hand(p[1], Vec3::new(0.5, 0.0, 0.0)));
        frame(&mut manipulator, 0.1);

        let (scale, rotation, translation) =
            manipulator.transform().to_scale_rotation_translation();
        assert!(rotation.dot(start_rotation).abs() > 1.0 - 1e-5);
        assert!(scale.abs_diff_eq(Vec3::ONE, 1e-5));
        assert!(translation.abs_diff_eq(Vec3::ZERO, 1e-5));

        // pull the hands apart and swing the bar a quarter turn around Y
        drag(&mut manipulator, &hand(p[0], Vec3::new(0.0, 0.0, 1.0)));
        drag(&mut manipulator, &hand(p[1], Vec3::new(0.0, 0.0, -1.0)));
        frame(&mut manipulator, 0.1);

        let (scale, rotation, translation) =
            manipulator.transform().to_scale_rotation_translation();
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2) * start_rotation;
        assert!(rotation.dot(expected).abs() > 1.0 - 1e-4);
        assert!(scale.abs_diff_eq(Vec3::splat(2.0), 1e-4));
        assert!(translation.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn second_hand_leaving_hands_back_to_one_hand() {
        let mut manipulator =
            GenericManipulator::new(Affine3A::IDENTITY, ManipulatorConfig::default());
        let p = ids(2);
        grab(&mut manipulator, &hand(p[0], Vec3::new(-0.5, 0.0, 0.0)));
        grab(&mut manipulator, &hand(p[1], Vec3::new(0.5, 0.0, 0.0)));
        frame(&mut manipulator, 0.1);

        release(&mut manipulator, &hand(p[1], Vec3::ZERO));
        frame(&mut manipulator, 0.1);
        assert!(manipulator.transform().translation.abs_diff_eq(Vec3A::ZERO, 1e-5));

        drag(&mut manipulator, &hand(p[0], Vec3::new(-0.5, 1.0, 0.0)));
        frame(&mut manipulator, 0.1);
        assert!(manipulator
            .transform()
            .translation
            .abs_diff_eq(Vec3A::new(0.0, 1.0, 0.0), 1e-5));
    }

    #[test]
    fn smoothing_lags_behind_pointer() {
        let config = ManipulatorConfig {
            smoothing_factor: 10.0,
            ..Default::default()
        };
        let mut manipulator = GenericManipulator::new(Affine3A::IDENTITY, config);
        let id = ids(1)[0];
        grab(&mut manipulator, &hand(id, Vec3::ZERO));
        frame(&mut manipulator, 0.1);
        drag(&mut manipulator, &hand(id, Vec3::X));
        frame(&mut manipulator, 0.1);

        let x = manipulator.transform().translation.x;
        assert!((x - (1.0 - (-1.0f32).exp())).abs() < 1e-4);
    }

    #[test]
    fn constraints_apply_to_result() {
        let mut manipulator =
            GenericManipulator::new(Affine3A::IDENTITY, ManipulatorConfig::default());
        manipulator.add_constraint(MoveAxisConstraint::new(AxisFlags::Y));
        let id = ids(1)[0];
        grab(&mut manipulator, &hand(id, Vec3::ZERO));
        frame(&mut manipulator, 0.1);
        drag(&mut manipulator, &hand(id, Vec3::new(1.0, 1.0, 0.0)));
        frame(&mut manipulator, 0.1);
        assert!(manipulator
            .transform()
            .translation
            .abs_diff_eq(Vec3A::new(1.0, 0.0, 0.0), 1e-5));
    }
}
