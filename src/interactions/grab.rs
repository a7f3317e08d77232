use glam::{Affine3A, Vec3A};
use smallvec::SmallVec;

use crate::{
    event::EventListeners,
    input::{PointerId, PointerInfo, PointerKind},
    interaction::InteractionContext,
    scene::PrimitiveId,
};

use super::target::{FarTarget, GrabTarget, Interactable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabPointerKind {
    Near,
    Far,
}

/// One pointer currently grabbing a target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrabPointerData {
    pub pointer: PointerId,
    pub kind: GrabPointerKind,
    /// Pointer pose as of the last update.
    pub transform: Affine3A,
    pub start_time: f32,
    /// Target transform at grab start, in the space of [`Self::target_transform`].
    pub local_grab_point: Affine3A,
    /// Ray hit relative to the far pointer pose. Identity for near pointers.
    pub far_ray_hit_in_pointer: Affine3A,
}

impl GrabPointerData {
    /// Pose the grab is anchored to: the pointer itself, or the far ray hit
    /// carried along with the pointer.
    pub fn target_transform(&self) -> Affine3A {
        self.transform * self.far_ray_hit_in_pointer
    }

    pub fn target_location(&self) -> Vec3A {
        self.target_transform().translation
    }

    /// The grabbed target's transform if it were rigidly attached to the pointer.
    pub fn grab_transform(&self) -> Affine3A {
        self.target_transform() * self.local_grab_point
    }
}

/// Grab point on the object as it is placed by `transform`.
pub fn grab_location(transform: &Affine3A, data: &GrabPointerData) -> Vec3A {
    (*transform * data.local_grab_point.inverse()).translation
}

/// How far the pointer has moved away from its grab point on the object.
pub fn location_offset(transform: &Affine3A, data: &GrabPointerData) -> Vec3A {
    data.target_location() - grab_location(transform, data)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GrabEvent {
    Begin(GrabPointerData),
    Update(GrabPointerData),
    End(GrabPointerData),
}

/// Keeps the ordered list of pointers grabbing an object.
pub struct GrabTargetComponent {
    /// World transform of the grabbable object.
    pub transform: Affine3A,
    pub tick_only_while_grabbed: bool,
    pub events: EventListeners<GrabEvent>,
    grab_pointers: SmallVec<[GrabPointerData; 2]>,
}

impl GrabTargetComponent {
    pub fn new(transform: Affine3A) -> Self {
        Self {
            transform,
            tick_only_while_grabbed: true,
            events: EventListeners::default(),
            grab_pointers: SmallVec::new(),
        }
    }

    pub fn grab_pointers(&self) -> &[GrabPointerData] {
        &self.grab_pointers
    }

    pub fn is_grabbed(&self) -> bool {
        !self.grab_pointers.is_empty()
    }

    pub fn find_grab_pointer(&self, pointer: PointerId) -> Option<(usize, &GrabPointerData)> {
        self.grab_pointers
            .iter()
            .enumerate()
            .find(|(_, d)| d.pointer == pointer)
    }

    pub fn primary_grab_pointer(&self) -> Option<&GrabPointerData> {
        self.grab_pointers.first()
    }

    pub fn secondary_grab_pointer(&self) -> Option<&GrabPointerData> {
        self.grab_pointers.get(1)
    }

    /// Mean of the pointer-attached target positions. Zero when not grabbed.
    pub fn grab_point_centroid(&self) -> Vec3A {
        self.mean(|d| d.grab_transform().translation)
    }

    /// Mean of the pointer target locations. Zero when not grabbed.
    pub fn target_centroid(&self) -> Vec3A {
        self.mean(GrabPointerData::target_location)
    }

    fn mean(&self, f: impl Fn(&GrabPointerData) -> Vec3A) -> Vec3A {
        if self.grab_pointers.is_empty() {
            log::warn!("Centroid requested with no grab pointers");
            return Vec3A::ZERO;
        }
        let sum: Vec3A = self.grab_pointers.iter().map(f).sum();
        sum / self.grab_pointers.len() as f32
    }

    pub fn begin_grab(&mut self, pointer: &PointerInfo, time: f32) {
        if self.find_grab_pointer(pointer.id).is_some() {
            log::warn!("Pointer is already grabbing; ignoring begin grab");
            return;
        }

        let (kind, far_ray_hit_in_pointer) = match (pointer.kind, pointer.hit) {
            (PointerKind::Far, Some(hit)) => (
                GrabPointerKind::Far,
                pointer.transform.inverse() * Affine3A::from_translation(hit.point.into()),
            ),
            (PointerKind::Far, None) => (GrabPointerKind::Far, Affine3A::IDENTITY),
            _ => (GrabPointerKind::Near, Affine3A::IDENTITY),
        };

        let mut data = GrabPointerData {
            pointer: pointer.id,
            kind,
            transform: pointer.transform,
            start_time: time,
            local_grab_point: Affine3A::IDENTITY,
            far_ray_hit_in_pointer,
        };
        data.local_grab_point = data.target_transform().inverse() * self.transform;

        self.grab_pointers.push(data);
        log::debug!(
            "Grab started: {:?}, {} pointer(s)",
            kind,
            self.grab_pointers.len()
        );
        self.events.emit(GrabEvent::Begin(data));
    }

    pub fn update_grab(&mut self, pointer: &PointerInfo) {
        let Some(data) = self
            .grab_pointers
            .iter_mut()
            .find(|d| d.pointer == pointer.id)
        else {
            return;
        };
        data.transform = pointer.transform;
        let data = *data;
        self.events.emit(GrabEvent::Update(data));
    }

    pub fn end_grab(&mut self, pointer: PointerId) -> Option<GrabPointerData> {
        let (index, _) = self.find_grab_pointer(pointer)?;
        let data = self.grab_pointers.remove(index);
        log::debug!(
            "Grab ended: {:?}, {} pointer(s)",
            data.kind,
            self.grab_pointers.len()
        );
        self.events.emit(GrabEvent::End(data));
        Some(data)
    }

    /// Drops every grab without raising events.
    pub fn clear(&mut self) {
        self.grab_pointers.clear();
    }
}

impl GrabTarget for GrabTargetComponent {
    fn is_grab_focusable(&self, _primitive: PrimitiveId) -> bool {
        true
    }

    fn on_begin_grab(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        self.begin_grab(pointer, ctx.time);
    }

    fn on_update_grab(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.update_grab(pointer);
    }

    fn on_end_grab(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.end_grab(pointer.id);
    }
}

impl FarTarget for GrabTargetComponent {
    fn is_far_focusable(&self, _primitive: PrimitiveId) -> bool {
        true
    }

    fn on_far_pressed(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        self.begin_grab(pointer, ctx.time);
        ctx.set_focus_locked(pointer.id, true);
    }

    fn on_far_dragged(&mut self, pointer: &PointerInfo, _ctx: &mut InteractionContext) {
        self.update_grab(pointer);
    }

    fn on_far_released(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {
        if self.end_grab(pointer.id).is_some() {
            ctx.set_focus_locked(pointer.id, false);
        }
    }
}

impl Interactable for GrabTargetComponent {
    fn as_grab_target(&mut self) -> Option<&mut dyn GrabTarget> {
        Some(self)
    }

    fn as_far_target(&mut self) -> Option<&mut dyn FarTarget> {
        Some(self)
    }
}
