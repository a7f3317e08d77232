use glam::{Affine3A, Quat, Vec3, Vec3A};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{Display, EnumString};

use crate::{
    config::ButtonConfig,
    error::ConfigError,
    event::EventListeners,
    input::{PointerId, PointerInfo, Pointers},
    interaction::InteractionContext,
    interactions::{FarTarget, Interactable, PokeTarget},
    math::{hierarchy_bounds, Aabb, Shape},
    scene::{ActorId, Primitive, PrimitiveId, Scene},
};

use super::{PressArbiter, PressOwner};

/// How the visuals react to the push distance.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PushBehavior {
    /// Move the visuals back along the press axis.
    #[default]
    Translate,
    /// Squash the visuals along the press axis.
    Compress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ButtonState {
    Default,
    Focused,
    Pressed,
    Disabled,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ButtonEvent {
    /// `None` when the pointer that pushed it is gone.
    Pressed(Option<PointerId>),
    Released(Option<PointerId>),
    BeginFocus { pointer: PointerId, was_focused: bool },
    UpdateFocus(PointerId),
    EndFocus { pointer: PointerId, still_focused: bool },
    BeginPoke(PointerId),
    UpdatePoke(PointerId),
    EndPoke(PointerId),
    Enabled,
    Disabled,
}

/// A button pressed by poking its front face or clicking it with a far pointer.
///
/// The button frame pushes along its local -Z; the front face looks down +Z.
/// Distances are measured in the button's local space.
pub struct PressableButton {
    config: ButtonConfig,
    /// World transform of the button frame.
    pub transform: Affine3A,
    state: ButtonState,
    max_push_distance: f32,
    current_push_distance: f32,
    num_pointers_focusing: u32,
    poke_pointers: SmallVec<[PointerId; 2]>,
    press: PressArbiter,
    box_primitive: Option<PrimitiveId>,
    rest_position_local: Vec3A,
    visuals_offset_local: Vec3A,
    visuals_scale: Vec3,
    visuals_rotation: Quat,
    pub events: EventListeners<ButtonEvent>,
}

impl PressableButton {
    pub fn new(transform: Affine3A, config: ButtonConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            transform,
            state: ButtonState::Default,
            max_push_distance: config.max_push_distance,
            current_push_distance: 0.0,
            num_pointers_focusing: 0,
            poke_pointers: SmallVec::new(),
            press: PressArbiter::default(),
            box_primitive: None,
            rest_position_local: Vec3A::ZERO,
            visuals_offset_local: Vec3A::ZERO,
            visuals_scale: Vec3::ONE,
            visuals_rotation: Quat::IDENTITY,
            events: EventListeners::default(),
        })
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state != ButtonState::Disabled
    }

    pub fn is_pressed(&self) -> bool {
        self.state == ButtonState::Pressed
    }

    pub fn is_focused(&self) -> bool {
        self.num_pointers_focusing > 0
    }

    pub fn config(&self) -> &ButtonConfig {
        &self.config
    }

    pub fn push_behavior(&self) -> PushBehavior {
        self.config.push_behavior
    }

    pub fn current_push_distance(&self) -> f32 {
        self.current_push_distance
    }

    pub fn max_push_distance(&self) -> f32 {
        self.max_push_distance
    }

    /// Ignored in compress mode, where the travel is derived from the visuals.
    pub fn set_max_push_distance(&mut self, distance: f32) {
        if self.config.push_behavior == PushBehavior::Compress {
            log::warn!("Max push distance is derived from the visuals in compress mode");
            return;
        }
        self.max_push_distance = distance.max(0.0);
        self.current_push_distance = self.current_push_distance.min(self.max_push_distance);
    }

    pub fn pressed_distance(&self) -> f32 {
        self.max_push_distance * self.config.pressed_fraction
    }

    pub fn released_distance(&self) -> f32 {
        self.max_push_distance * self.config.released_fraction
    }

    pub fn box_primitive(&self) -> Option<PrimitiveId> {
        self.box_primitive
    }

    pub fn press_owner(&self) -> Option<PressOwner> {
        self.press.owner()
    }

    pub fn poke_pointers(&self) -> &[PointerId] {
        &self.poke_pointers
    }

    pub fn rest_position(&self) -> Vec3A {
        self.transform.transform_point3a(self.rest_position_local)
    }

    /// Front face position for the current push distance.
    pub fn current_button_location(&self) -> Vec3A {
        self.transform
            .transform_point3a(self.rest_position_local - Vec3A::Z * self.current_push_distance)
    }

    fn settled_state(&self) -> ButtonState {
        if self.is_focused() {
            ButtonState::Focused
        } else {
            ButtonState::Default
        }
    }

    pub fn set_enabled(&mut self, enabled: bool, ctx: &mut InteractionContext) {
        if enabled && self.state == ButtonState::Disabled {
            self.state = self.settled_state();
            log::debug!("Button enabled");
            self.events.emit(ButtonEvent::Enabled);
        } else if !enabled && self.state != ButtonState::Disabled {
            if let Some(PressOwner::Far(pointer)) = self.press.clear() {
                ctx.set_focus_locked(pointer, false);
            }
            self.poke_pointers.clear();
            self.current_push_distance = 0.0;
            self.state = ButtonState::Disabled;
            log::debug!("Button disabled");
            self.events.emit(ButtonEvent::Disabled);
        }
    }

    /// Sets up the collision box from the visuals' bounds in button space.
    ///
    /// Returns the box shape and its world transform.
    pub fn configure_from_bounds(&mut self, bounds: Aabb, visuals: &Affine3A) -> (Shape, Affine3A) {
        let margin = self.config.front_face_margin.max(0.0);
        let bounds = Aabb::new(bounds.min, bounds.max + Vec3A::Z * margin);
        let center = bounds.center();
        let extents = bounds.extents();

        self.rest_position_local = center + Vec3A::Z * extents.z;

        let (scale, rotation, position) = visuals.to_scale_rotation_translation();
        let offset = Vec3A::from(position) - self.rest_position();
        self.visuals_offset_local = self.transform.inverse().transform_vector3a(offset);
        self.visuals_scale = scale;
        self.visuals_rotation = rotation;

        if self.config.push_behavior == PushBehavior::Compress {
            self.max_push_distance = extents.z * 2.0;
        }
        self.current_push_distance = self.current_push_distance.min(self.max_push_distance);

        let box_transform = self.transform * Affine3A::from_translation(center.into());
        (Shape::Box { half_extents: extents }, box_transform)
    }

    /// Builds the button's collision box on `owner` around the primitives of
    /// `visuals`, whose own collision is switched off.
    pub fn attach(
        &mut self,
        scene: &mut Scene,
        owner: ActorId,
        visuals: ActorId,
    ) -> Option<PrimitiveId> {
        let visuals_transform = scene.actor(visuals)?.transform;
        let visual_prims: SmallVec<[PrimitiveId; 4]> =
            scene.primitives_of(visuals).map(|(id, _)| id).collect();
        for id in &visual_prims {
            if let Some(prim) = scene.primitive_mut(*id) {
                prim.collision_enabled = false;
            }
        }

        let world_to_button = self.transform.inverse();
        let Some(bounds) = hierarchy_bounds(
            scene.primitives_of(visuals).map(|(_, p)| (&p.shape, &p.transform)),
            &world_to_button,
        ) else {
            log::warn!("Button visuals have no primitives to measure");
            return None;
        };

        let (shape, box_transform) = self.configure_from_bounds(bounds, &visuals_transform);
        if let Some(old) = self.box_primitive.take() {
            scene.remove_primitive(old);
        }
        self.box_primitive = scene.add_primitive(owner, shape, box_transform);
        self.box_primitive
    }

    /// World transform for the visuals at the current push distance.
    pub fn visuals_transform(&self) -> Affine3A {
        match self.config.push_behavior {
            PushBehavior::Translate => {
                let offset = self.transform.transform_vector3a(self.visuals_offset_local);
                Affine3A::from_scale_rotation_translation(
                    self.visuals_scale,
                    self.visuals_rotation,
                    (offset + self.current_button_location()).into(),
                )
            }
            PushBehavior::Compress => {
                let compression = if self.max_push_distance != 0.0 {
                    1.0 - self.current_push_distance / self.max_push_distance
                } else {
                    1.0
                };
                let compression = compression.clamp(self.config.pressed_fraction, 1.0);
                let position = self.transform.transform_vector3a(self.visuals_offset_local)
                    + self.rest_position();
                Affine3A::from_scale_rotation_translation(
                    self.visuals_scale * Vec3::new(1.0, 1.0, compression),
                    self.visuals_rotation,
                    position.into(),
                )
            }
        }
    }

    fn push_distance(&self, position: Vec3A, radius: f32) -> f32 {
        let to_local = self.transform.inverse();
        let local = to_local.transform_point3a(position);
        let local_radius = to_local.transform_vector3a(Vec3A::Z * radius).length();
        let distance = self.rest_position_local.z - local.z - local_radius;
        distance.clamp(0.0, self.max_push_distance)
    }

    fn update_push(&mut self, pointers: &Pointers, delta_time: f32) {
        let mut target = 0.0;
        let mut poking = None;
        for &id in &self.poke_pointers {
            let Some(pointer) = pointers.near(id) else {
                continue;
            };
            let distance = self.push_distance(pointer.poke_position(), pointer.poke_radius());
            if distance > target {
                target = distance;
                poking = Some(id);
            }
        }

        let previous = self.current_push_distance;
        if target > self.current_push_distance {
            self.current_push_distance = target;
            let pressed = self.pressed_distance();
            if self.state != ButtonState::Pressed
                && self.state != ButtonState::Disabled
                && self.current_push_distance >= pressed
                && previous < pressed
            {
                if let Some(id) = poking {
                    self.press.try_acquire(PressOwner::Near(id));
                }
                self.state = ButtonState::Pressed;
                log::debug!("Button pressed at {:.4}", self.current_push_distance);
                self.events.emit(ButtonEvent::Pressed(poking));
            }
        } else {
            self.current_push_distance = target
                .max(self.current_push_distance - delta_time * self.config.recovery_speed);
            let released = self.released_distance();
            if self.state == ButtonState::Pressed
                && self.current_push_distance <= released
                && previous > released
            {
                self.release_near_press();
                log::debug!("Button released at {:.4}", self.current_push_distance);
                self.events.emit(ButtonEvent::Released(poking));
            }
        }
    }

    fn release_near_press(&mut self) {
        if self.press.is_near_owned() {
            self.press.clear();
        }
        self.state = self.settled_state();
    }

    fn on_enter_focus(&mut self, pointer: PointerId) {
        self.num_pointers_focusing += 1;
        let was_focused = self.num_pointers_focusing > 1;
        if self.state == ButtonState::Default {
            self.state = ButtonState::Focused;
        }
        self.events.emit(ButtonEvent::BeginFocus {
            pointer,
            was_focused,
        });
    }

    fn on_exit_focus(&mut self, pointer: PointerId, ctx: &mut InteractionContext) {
        self.num_pointers_focusing = self.num_pointers_focusing.saturating_sub(1);
        let still_focused = self.is_focused();
        if !still_focused {
            match self.state {
                ButtonState::Pressed => {
                    if let Some(PressOwner::Far(owner)) = self.press.clear() {
                        self.current_push_distance = 0.0;
                        ctx.set_focus_locked(owner, false);
                    }
                    self.state = self.settled_state();
                    self.events.emit(ButtonEvent::Released(Some(pointer)));
                }
                ButtonState::Focused => self.state = ButtonState::Default,
                _ => {}
            }
        }
        self.events.emit(ButtonEvent::EndFocus {
            pointer,
            still_focused,
        });
    }
}

impl Interactable for PressableButton {
    fn as_poke_target(&mut self) -> Option<&mut dyn PokeTarget> {
        Some(self)
    }

    fn as_far_target(&mut self) -> Option<&mut dyn FarTarget> {
        Some(self)
    }

    fn wants_tick(&self) -> bool {
        !self.poke_pointers.is_empty() || self.current_push_distance > 0.0
    }

    fn tick(&mut self, pointers: &Pointers, ctx: &mut InteractionContext) {
        // a far press holds the button at the pressed distance
        if self.press.is_far_owned() {
            return;
        }
        self.update_push(pointers, ctx.delta_time);
    }
}

impl PokeTarget for PressableButton {
    fn is_poke_focusable(&self, primitive: PrimitiveId) -> bool {
        self.box_primitive == Some(primitive)
    }

    /// Projection onto the front face rectangle of the collision box.
    fn closest_point(&self, primitive: &Primitive, point: Vec3A) -> Option<(Vec3A, Vec3A)> {
        let Shape::Box { half_extents } = primitive.shape else {
            return None;
        };
        let local = primitive.transform.inverse().transform_point3a(point);
        let on_face = Vec3A::new(
            local.x.clamp(-half_extents.x, half_extents.x),
            local.y.clamp(-half_extents.y, half_extents.y),
            half_extents.z,
        );
        let normal = primitive
            .transform
            .transform_vector3a(Vec3A::Z)
            .try_normalize()?;
        Some((primitive.transform.transform_point3a(on_face), normal))
    }

    fn on_enter_poke_focus(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.on_enter_focus(pointer.id);
    }

    fn on_update_poke_focus(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.events.emit(ButtonEvent::UpdateFocus(pointer.id));
    }

    fn on_exit_poke_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        self.on_exit_focus(pointer.id, ctx);
    }

    fn on_begin_poke(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        if self.state == ButtonState::Disabled {
            return;
        }
        // stay focused while the finger travels through the button
        ctx.set_focus_locked(pointer.id, true);
        if !self.poke_pointers.contains(&pointer.id) {
            self.poke_pointers.push(pointer.id);
        }
        self.events.emit(ButtonEvent::BeginPoke(pointer.id));
    }

    fn on_update_poke(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        if self.state != ButtonState::Disabled {
            self.events.emit(ButtonEvent::UpdatePoke(pointer.id));
        }
    }

    fn on_end_poke(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        if self.state == ButtonState::Pressed && !self.is_focused() {
            self.release_near_press();
            self.events.emit(ButtonEvent::Released(Some(pointer.id)));
        }
        ctx.set_focus_locked(pointer.id, false);
        self.poke_pointers.retain(|p| *p != pointer.id);
        if self.state != ButtonState::Disabled {
            self.events.emit(ButtonEvent::EndPoke(pointer.id));
        }
    }
}

impl FarTarget for PressableButton {
    fn is_far_focusable(&self, primitive: PrimitiveId) -> bool {
        self.box_primitive == Some(primitive)
    }

    fn on_enter_far_focus(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.on_enter_focus(pointer.id);
    }

    fn on_update_far_focus(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.events.emit(ButtonEvent::UpdateFocus(pointer.id));
    }

    fn on_exit_far_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        self.on_exit_focus(pointer.id, ctx);
    }

    fn on_far_pressed(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        if self.state == ButtonState::Disabled || self.state == ButtonState::Pressed {
            log::debug!("Far press ignored in state {}", self.state);
            return;
        }
        if !self.press.try_acquire(PressOwner::Far(pointer.id)) {
            log::debug!("Far press ignored, button is held by {:?}", self.press.owner());
            return;
        }
        self.current_push_distance = self.pressed_distance();
        self.state = ButtonState::Pressed;
        ctx.set_focus_locked(pointer.id, true);
        self.events.emit(ButtonEvent::Pressed(Some(pointer.id)));
    }

    fn on_far_released(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        if !self.press.release(PressOwner::Far(pointer.id)) {
            return;
        }
        self.current_push_distance = 0.0;
        ctx.set_focus_locked(pointer.id, false);
        if self.state != ButtonState::Disabled {
            self.state = self.settled_state();
            self.events.emit(ButtonEvent::Released(Some(pointer.id)));
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::{
        config::{FarPointerConfig, NearPointerConfig},
        event::testing::record,
        input::{FarPointer, Hand, NearPointer, PointerKind},
    };

    fn scenario_button() -> PressableButton {
        let config = ButtonConfig {
            max_push_distance: 10.0,
            pressed_fraction: 0.5,
            released_fraction: 0.2,
            recovery_speed: 1.0,
            ..Default::default()
        };
        let mut button = PressableButton::new(Affine3A::IDENTITY, config).unwrap();
        button.configure_from_bounds(
            Aabb::new(Vec3A::new(-1.0, -1.0, -1.0), Vec3A::new(1.0, 1.0, 0.0)),
            &Affine3A::IDENTITY,
        );
        button
    }

    struct Rig {
        pointers: Pointers,
        finger: PointerId,
        ctx: InteractionContext,
    }

    impl Rig {
        fn new() -> Self {
            let mut pointers = Pointers::new();
            let config = NearPointerConfig {
                poke_radius: 0.0,
                ..Default::default()
            };
            let finger = pointers.add_near(NearPointer::new(Hand::Right, config));
            Self {
                pointers,
                finger,
                ctx: InteractionContext::new(0.0, 1.0, Affine3A::IDENTITY),
            }
        }

        fn info(&self) -> PointerInfo {
            self.pointers
                .near(self.finger)
                .unwrap()
                .info(self.finger, PointerKind::Poke)
        }

        fn move_to(&mut self, z: f32) {
            let pointer = self.pointers.near_mut(self.finger).unwrap();
            pointer.set_poke_pose(Affine3A::from_translation(Vec3::new(0.0, 0.0, z)), 0.0);
        }

        fn begin(&mut self, button: &mut PressableButton) {
            let info = self.info();
            button.on_enter_poke_focus(&info, &mut self.ctx);
            button.on_begin_poke(&info, &mut self.ctx);
        }

        fn push(&mut self, button: &mut PressableButton, z: f32) {
            self.move_to(z);
            button.tick(&self.pointers, &mut self.ctx);
        }
    }

    fn presses(log: &[ButtonEvent]) -> usize {
        log.iter()
            .filter(|e| matches!(e, ButtonEvent::Pressed(_)))
            .count()
    }

    fn releases(log: &[ButtonEvent]) -> usize {
        log.iter()
            .filter(|e| matches!(e, ButtonEvent::Released(_)))
            .count()
    }

    #[test]
    fn bounds_configure_rest_plane() {
        let button = scenario_button();
        assert!(button.rest_position().abs_diff_eq(Vec3A::ZERO, 1e-6));
        assert_eq!(button.pressed_distance(), 5.0);
        assert_eq!(button.released_distance(), 2.0);
    }

    #[test]
    fn press_then_release_scenario() {
        let mut button = scenario_button();
        let log = record(&mut button.events);
        let mut rig = Rig::new();
        rig.move_to(0.5);
        rig.begin(&mut button);

        rig.push(&mut button, -6.0);
        assert_eq!(button.current_push_distance(), 6.0);
        assert!(button.is_pressed());
        assert_eq!(presses(&log.borrow()), 1);
        assert_eq!(button.press_owner(), Some(PressOwner::Near(rig.finger)));

        // finger backs off to 1, distance recovers at 1 per second
        for expected in [5.0, 4.0, 3.0] {
            rig.push(&mut button, -1.0);
            assert!((button.current_push_distance() - expected).abs() < 1e-5);
            assert!(button.is_pressed());
        }
        rig.push(&mut button, -1.0);
        assert!((button.current_push_distance() - 2.0).abs() < 1e-5);
        assert!(!button.is_pressed());
        assert_eq!(button.state(), ButtonState::Focused);
        assert_eq!(releases(&log.borrow()), 1);
        assert!(button.press_owner().is_none());

        rig.push(&mut button, -1.0);
        assert!((button.current_push_distance() - 1.0).abs() < 1e-5);
        assert_eq!(releases(&log.borrow()), 1);
    }

    #[test]
    fn push_distance_is_clamped() {
        let mut button = scenario_button();
        let mut rig = Rig::new();
        rig.begin(&mut button);

        rig.push(&mut button, -100.0);
        assert_eq!(button.current_push_distance(), 10.0);

        rig.ctx.delta_time = 100.0;
        rig.push(&mut button, 5.0);
        assert_eq!(button.current_push_distance(), 0.0);
    }

    #[test]
    fn hysteresis_prevents_chatter() {
        let mut button = scenario_button();
        let log = record(&mut button.events);
        let mut rig = Rig::new();
        rig.begin(&mut button);

        rig.push(&mut button, -6.0);
        rig.ctx.delta_time = 10.0;
        rig.push(&mut button, -1.0);
        assert_eq!(releases(&log.borrow()), 1);

        rig.ctx.delta_time = 0.5;
        for _ in 0..10 {
            rig.push(&mut button, -4.9);
            rig.push(&mut button, -2.5);
        }
        assert_eq!(presses(&log.borrow()), 1);

        rig.push(&mut button, -5.0);
        assert_eq!(presses(&log.borrow()), 2);
    }

    #[test]
    fn focus_loss_releases_immediately() {
        let mut button = scenario_button();
        let log = record(&mut button.events);
        let mut rig = Rig::new();
        rig.begin(&mut button);
        rig.push(&mut button, -6.0);
        assert!(button.is_pressed());

        let info = rig.info();
        button.on_exit_poke_focus(&info, &mut rig.ctx);
        assert!(!button.is_pressed());
        assert_eq!(button.state(), ButtonState::Default);
        assert_eq!(releases(&log.borrow()), 1);
        assert!(matches!(
            log.borrow().last(),
            Some(ButtonEvent::EndFocus {
                still_focused: false,
                ..
            })
        ));
    }

    #[test]
    fn far_focus_loss_frees_press_once() {
        let mut button = scenario_button();
        let log = record(&mut button.events);
        let mut pointers = Pointers::new();
        let ray = pointers.add_far(FarPointer::new(None, FarPointerConfig::default()));
        let info = far_info(&pointers, ray);
        let mut ctx = InteractionContext::default();

        button.on_enter_far_focus(&info, &mut ctx);
        button.on_far_pressed(&info, &mut ctx);
        assert_eq!(button.press_owner(), Some(PressOwner::Far(ray)));
        ctx.take_focus_lock_requests();

        button.on_exit_far_focus(&info, &mut ctx);
        assert!(button.press_owner().is_none());
        assert_eq!(button.current_push_distance(), 0.0);
        assert_eq!(button.state(), ButtonState::Default);
        assert_eq!(
            ctx.take_focus_lock_requests().as_slice(),
            &[(ray, false)]
        );

        button.on_far_released(&info, &mut ctx);
        assert_eq!(releases(&log.borrow()), 1);
    }

    #[test]
    fn poke_locks_and_unlocks_focus() {
        let mut button = scenario_button();
        let mut rig = Rig::new();
        rig.begin(&mut button);
        assert_eq!(
            rig.ctx.take_focus_lock_requests().as_slice(),
            &[(rig.finger, true)]
        );

        let info = rig.info();
        button.on_end_poke(&info, &mut rig.ctx);
        assert!(button.poke_pointers().is_empty());
        assert_eq!(
            rig.ctx.take_focus_lock_requests().as_slice(),
            &[(rig.finger, false)]
        );
    }

    fn far_info(pointers: &Pointers, id: PointerId) -> PointerInfo {
        pointers.far(id).unwrap().info(id)
    }

    #[test]
    fn second_far_press_is_rejected() {
        let mut button = scenario_button();
        let log = record(&mut button.events);
        let mut pointers = Pointers::new();
        let a = pointers.add_far(FarPointer::new(None, FarPointerConfig::default()));
        let b = pointers.add_far(FarPointer::new(None, FarPointerConfig::default()));
        let mut ctx = InteractionContext::default();

        button.on_far_pressed(&far_info(&pointers, a), &mut ctx);
        assert!(button.is_pressed());
        assert_eq!(button.current_push_distance(), 5.0);
        let events = log.borrow().len();

        button.on_far_pressed(&far_info(&pointers, b), &mut ctx);
        button.on_far_released(&far_info(&pointers, b), &mut ctx);
        assert_eq!(log.borrow().len(), events);
        assert_eq!(button.press_owner(), Some(PressOwner::Far(a)));
        assert!(button.is_pressed());

        // a far press also suspends the poke path
        button.tick(&pointers, &mut ctx);
        assert_eq!(button.current_push_distance(), 5.0);

        button.on_far_released(&far_info(&pointers, a), &mut ctx);
        assert!(!button.is_pressed());
        assert_eq!(button.current_push_distance(), 0.0);
        assert_eq!(
            ctx.take_focus_lock_requests().as_slice(),
            &[(a, true), (a, false)]
        );
    }

    #[test]
    fn far_press_rejected_while_poked_down() {
        let mut button = scenario_button();
        let mut rig = Rig::new();
        let far = rig
            .pointers
            .add_far(FarPointer::new(None, FarPointerConfig::default()));
        rig.begin(&mut button);
        rig.push(&mut button, -6.0);

        let info = far_info(&rig.pointers, far);
        button.on_far_pressed(&info, &mut rig.ctx);
        assert_eq!(button.press_owner(), Some(PressOwner::Near(rig.finger)));
    }

    #[test]
    fn disabling_resets_everything() {
        let mut button = scenario_button();
        let log = record(&mut button.events);
        let mut rig = Rig::new();
        let far = rig
            .pointers
            .add_far(FarPointer::new(None, FarPointerConfig::default()));

        button.on_far_pressed(&far_info(&rig.pointers, far), &mut rig.ctx);
        rig.ctx.take_focus_lock_requests();
        rig.begin(&mut button);
        rig.ctx.take_focus_lock_requests();

        button.set_enabled(false, &mut rig.ctx);
        assert_eq!(button.state(), ButtonState::Disabled);
        assert_eq!(button.current_push_distance(), 0.0);
        assert!(button.poke_pointers().is_empty());
        assert!(button.press_owner().is_none());
        assert_eq!(
            rig.ctx.take_focus_lock_requests().as_slice(),
            &[(far, false)]
        );

        // nothing pokes or presses a disabled button
        let info = rig.info();
        button.on_begin_poke(&info, &mut rig.ctx);
        button.on_far_pressed(&far_info(&rig.pointers, far), &mut rig.ctx);
        assert!(button.poke_pointers().is_empty());
        assert!(matches!(log.borrow().last(), Some(ButtonEvent::Disabled)));

        button.set_enabled(true, &mut rig.ctx);
        assert!(button.is_enabled());
        assert!(matches!(log.borrow().last(), Some(ButtonEvent::Enabled)));
        button.set_enabled(true, &mut rig.ctx);
        assert_eq!(
            log.borrow()
                .iter()
                .filter(|e| matches!(e, ButtonEvent::Enabled))
                .count(),
            1
        );
    }

    #[test]
    fn visuals_follow_push_distance() {
        let mut button = scenario_button();
        let mut rig = Rig::new();
        rig.begin(&mut button);
        rig.push(&mut button, -3.0);
        assert!(button
            .visuals_transform()
            .translation
            .abs_diff_eq(Vec3A::new(0.0, 0.0, -3.0), 1e-5));

        let config = ButtonConfig {
            push_behavior: PushBehavior::Compress,
            ..Default::default()
        };
        let mut squash = PressableButton::new(Affine3A::IDENTITY, config).unwrap();
        squash.configure_from_bounds(
            Aabb::new(Vec3A::new(-0.02, -0.02, -0.01), Vec3A::new(0.02, 0.02, 0.0)),
            &Affine3A::from_translation(Vec3::new(0.0, 0.0, -0.005)),
        );
        assert!((squash.max_push_distance() - 0.01).abs() < 1e-6);
        let (scale, _, _) = squash.visuals_transform().to_scale_rotation_translation();
        assert!(scale.abs_diff_eq(Vec3::ONE, 1e-6));

        squash.current_push_distance = 0.009;
        let (scale, _, _) = squash.visuals_transform().to_scale_rotation_translation();
        assert!(scale.abs_diff_eq(Vec3::new(1.0, 1.0, 0.5), 1e-5));
    }

    #[test]
    fn front_face_margin_moves_rest_plane() {
        let config = ButtonConfig {
            front_face_margin: 0.005,
            ..Default::default()
        };
        let mut button = PressableButton::new(Affine3A::IDENTITY, config).unwrap();
        let (shape, transform) = button.configure_from_bounds(
            Aabb::new(Vec3A::new(-0.02, -0.02, -0.01), Vec3A::new(0.02, 0.02, 0.0)),
            &Affine3A::IDENTITY,
        );
        assert!(button
            .rest_position()
            .abs_diff_eq(Vec3A::new(0.0, 0.0, 0.005), 1e-6));
        assert!(transform
            .translation
            .abs_diff_eq(Vec3A::new(0.0, 0.0, -0.0025), 1e-6));
        assert!(matches!(
            shape,
            Shape::Box { half_extents } if (half_extents.z - 0.0075).abs() < 1e-6
        ));
    }

    #[test]
    fn attach_builds_box_from_visuals() {
        let mut scene = Scene::new();
        let actor = scene.add_actor("button", Affine3A::IDENTITY);
        let visuals = scene.add_actor("button_visuals", Affine3A::IDENTITY);
        let mesh = scene
            .add_primitive(
                visuals,
                Shape::Box {
                    half_extents: Vec3A::new(0.02, 0.02, 0.005),
                },
                Affine3A::from_translation(Vec3::new(0.0, 0.0, -0.005)),
            )
            .unwrap();

        let mut button = PressableButton::new(Affine3A::IDENTITY, ButtonConfig::default()).unwrap();
        let prim = button.attach(&mut scene, actor, visuals).unwrap();
        assert!(!scene.primitive(mesh).unwrap().collision_enabled);
        assert_eq!(scene.primitive(prim).unwrap().owner, actor);
        assert!(button.is_poke_focusable(prim));
        assert!(!button.is_poke_focusable(mesh));

        let primitive = scene.primitive(prim).unwrap().clone();
        let (point, normal) = button
            .closest_point(&primitive, Vec3A::new(0.5, 0.0, 0.1))
            .unwrap();
        assert!(point.abs_diff_eq(Vec3A::new(0.02, 0.0, 0.0), 1e-6));
        assert!(normal.abs_diff_eq(Vec3A::Z, 1e-6));
    }
}
