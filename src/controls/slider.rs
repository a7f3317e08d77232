use glam::{Affine3A, Vec3A};
use strum::Display;

use crate::{
    config::SliderConfig,
    error::ConfigError,
    event::EventListeners,
    input::{PointerId, PointerInfo},
    interaction::InteractionContext,
    interactions::{FarTarget, GrabTarget, Interactable},
    math::Shape,
    scene::{ActorId, PrimitiveId, Scene},
};

use super::{PressArbiter, PressOwner};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SliderState {
    Default,
    Focus,
    Grab,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SliderEvent {
    ValueUpdated(f32),
    InteractionStarted(PointerId),
    InteractionEnded(PointerId),
    FocusEntered(PointerId),
    FocusExited(PointerId),
    StateUpdated(SliderState),
}

/// A thumb dragged along the local X axis of the slider frame.
///
/// The value maps `start_distance..end_distance` on that axis onto `0..1`.
pub struct PinchSlider {
    config: SliderConfig,
    /// World transform of the slider frame.
    pub transform: Affine3A,
    value: f32,
    state: SliderState,
    num_pointers_focusing: u32,
    press: PressArbiter,
    thumb_primitive: Option<PrimitiveId>,
    /// Ray hit when a far pointer took the thumb.
    far_grab_start: Vec3A,
    /// Thumb position on the track at that moment.
    far_thumb_start: f32,
    pub events: EventListeners<SliderEvent>,
}

impl PinchSlider {
    pub fn new(transform: Affine3A, config: SliderConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            transform,
            value: config.initial_value,
            state: SliderState::Default,
            num_pointers_focusing: 0,
            press: PressArbiter::default(),
            thumb_primitive: None,
            far_grab_start: Vec3A::ZERO,
            far_thumb_start: 0.0,
            events: EventListeners::default(),
        })
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn state(&self) -> SliderState {
        self.state
    }

    pub fn is_grabbed(&self) -> bool {
        self.state == SliderState::Grab
    }

    /// True while a pointer hovers or holds the slider.
    pub fn is_focused(&self) -> bool {
        matches!(self.state, SliderState::Focus | SliderState::Grab)
    }

    pub fn start_distance(&self) -> f32 {
        self.config.start_distance
    }

    pub fn end_distance(&self) -> f32 {
        self.config.end_distance
    }

    pub fn set_track(&mut self, start_distance: f32, end_distance: f32) {
        self.config.start_distance = start_distance;
        self.config.end_distance = end_distance;
    }

    pub fn num_tick_marks(&self) -> u32 {
        self.config.num_tick_marks
    }

    pub fn set_num_tick_marks(&mut self, count: u32) {
        self.config.num_tick_marks = count;
    }

    pub fn thumb_primitive(&self) -> Option<PrimitiveId> {
        self.thumb_primitive
    }

    pub fn press_owner(&self) -> Option<PressOwner> {
        self.press.owner()
    }

    /// Clamps to `0..1`; only a changed value is reported.
    pub fn set_value(&mut self, value: f32) {
        let value = value.clamp(0.0, 1.0);
        if value != self.value {
            self.value = value;
            self.events.emit(SliderEvent::ValueUpdated(value));
        }
    }

    fn track_length(&self) -> f32 {
        self.config.end_distance - self.config.start_distance
    }

    /// Moves the value to a position along the local track axis.
    pub fn set_value_from_local_position(&mut self, local: f32) {
        let length = self.track_length();
        if length.abs() <= f32::EPSILON {
            log::warn!("Slider track has no length, keeping value {}", self.value);
            return;
        }
        self.set_value((local - self.config.start_distance) / length);
    }

    fn thumb_distance(&self) -> f32 {
        self.config.start_distance + self.value * self.track_length()
    }

    pub fn thumb_local_position(&self) -> Vec3A {
        Vec3A::X * self.thumb_distance()
    }

    pub fn thumb_transform(&self) -> Affine3A {
        self.transform * Affine3A::from_translation(self.thumb_local_position().into())
    }

    /// Evenly spaced from track start to track end, in slider space.
    pub fn tick_mark_positions(&self) -> Vec<Vec3A> {
        let start = self.config.start_distance;
        match self.config.num_tick_marks {
            0 => Vec::new(),
            1 => vec![Vec3A::X * (start + self.track_length() * 0.5)],
            n => {
                let step = self.track_length() / (n - 1) as f32;
                (0..n).map(|i| Vec3A::X * (start + step * i as f32)).collect()
            }
        }
    }

    /// Creates the grabbable thumb on `owner` at the current value.
    pub fn attach(
        &mut self,
        scene: &mut Scene,
        owner: ActorId,
        thumb: Shape,
    ) -> Option<PrimitiveId> {
        if let Some(old) = self.thumb_primitive.take() {
            scene.remove_primitive(old);
        }
        self.thumb_primitive = scene.add_primitive(owner, thumb, self.thumb_transform());
        self.thumb_primitive
    }

    /// Moves the thumb primitive to the current value.
    pub fn sync_thumb(&self, scene: &mut Scene) {
        let Some(id) = self.thumb_primitive else {
            return;
        };
        if let Some(prim) = scene.primitive_mut(id) {
            prim.transform = self.thumb_transform();
        }
    }

    fn set_state(&mut self, state: SliderState) {
        if self.state != state {
            self.state = state;
            self.events.emit(SliderEvent::StateUpdated(state));
        }
    }

    fn settled_state(&self) -> SliderState {
        if self.num_pointers_focusing > 0 {
            SliderState::Focus
        } else {
            SliderState::Default
        }
    }

    fn enter_focus(&mut self, pointer: PointerId) {
        self.num_pointers_focusing += 1;
        self.events.emit(SliderEvent::FocusEntered(pointer));
        if self.state == SliderState::Default {
            self.set_state(SliderState::Focus);
        }
    }

    fn exit_focus(&mut self, pointer: PointerId) {
        self.num_pointers_focusing = self.num_pointers_focusing.saturating_sub(1);
        self.events.emit(SliderEvent::FocusExited(pointer));
        if self.state == SliderState::Focus {
            self.set_state(self.settled_state());
        }
    }

    fn begin_interaction(&mut self, owner: PressOwner) -> bool {
        if !self.press.try_acquire(owner) {
            log::debug!("Slider already held by {:?}", self.press.owner());
            return false;
        }
        self.set_state(SliderState::Grab);
        self.events
            .emit(SliderEvent::InteractionStarted(owner.pointer()));
        true
    }

    fn end_interaction(&mut self, owner: PressOwner) -> bool {
        if !self.press.release(owner) {
            return false;
        }
        self.set_state(self.settled_state());
        self.events
            .emit(SliderEvent::InteractionEnded(owner.pointer()));
        true
    }

    fn local_x(&self, world: Vec3A) -> f32 {
        self.transform.inverse().transform_point3a(world).x
    }
}

impl Interactable for PinchSlider {
    fn as_grab_target(&mut self) -> Option<&mut dyn GrabTarget> {
        Some(self)
    }

    fn as_far_target(&mut self) -> Option<&mut dyn FarTarget> {
        Some(self)
    }
}

impl GrabTarget for PinchSlider {
    fn is_grab_focusable(&self, primitive: PrimitiveId) -> bool {
        self.thumb_primitive == Some(primitive)
    }

    fn on_enter_grab_focus(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.enter_focus(pointer.id);
    }

    fn on_exit_grab_focus(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.exit_focus(pointer.id);
    }

    fn on_begin_grab(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        if self.begin_interaction(PressOwner::Near(pointer.id)) {
            self.set_value_from_local_position(self.local_x(pointer.position()));
        }
    }

    fn on_update_grab(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        if self.press.owner() == Some(PressOwner::Near(pointer.id)) {
            self.set_value_from_local_position(self.local_x(pointer.position()));
        }
    }

    fn on_end_grab(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.end_interaction(PressOwner::Near(pointer.id));
    }
}

impl FarTarget for PinchSlider {
    fn is_far_focusable(&self, primitive: PrimitiveId) -> bool {
        self.thumb_primitive == Some(primitive)
    }

    fn on_enter_far_focus(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.enter_focus(pointer.id);
    }

    fn on_exit_far_focus(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.exit_focus(pointer.id);
    }

    fn on_far_pressed(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        if self.begin_interaction(PressOwner::Far(pointer.id)) {
            self.far_grab_start = pointer.target_location();
            self.far_thumb_start = self.thumb_distance();
            ctx.set_focus_locked(pointer.id, true);
        }
    }

    fn on_far_dragged(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        if self.press.owner() != Some(PressOwner::Far(pointer.id)) {
            return;
        }
        let delta = pointer.target_location() - self.far_grab_start;
        let along_track = self.transform.inverse().transform_vector3a(delta).x;
        self.set_value_from_local_position(self.far_thumb_start + along_track);
    }

    fn on_far_released(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        if self.end_interaction(PressOwner::Far(pointer.id)) {
            ctx.set_focus_locked(pointer.id, false);
        }
    }
}
