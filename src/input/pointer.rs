use glam::{Affine3A, Vec3A};
use slotmap::{new_key_type, HopSlotMap};

use crate::{
    config::{FarPointerConfig, NearPointerConfig},
    interaction::InteractionContext,
    interactions::{FarTarget, Interactable},
    math::safe_normal,
    scene::{PrimitiveId, Scene, SceneQuery, TargetId},
};

use super::{
    focus::{GrabFocus, PointerFocus, PokeFocus},
    hand::{Hand, HandJoint, HandTracker},
};

new_key_type! {
    pub struct PointerId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Grab,
    Poke,
    Far,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FarHit {
    pub primitive: PrimitiveId,
    pub point: Vec3A,
    pub normal: Vec3A,
    pub distance: f32,
}

/// What a target gets to see of the pointer raising an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInfo {
    pub id: PointerId,
    pub kind: PointerKind,
    pub hand: Option<Hand>,
    pub transform: Affine3A,
    pub radius: f32,
    pub hit: Option<FarHit>,
}

impl PointerInfo {
    pub fn position(&self) -> Vec3A {
        self.transform.translation
    }

    /// Where the pointer is aiming at: the ray hit for far pointers, the pointer itself otherwise.
    pub fn target_location(&self) -> Vec3A {
        match self.hit {
            Some(hit) => hit.point,
            None => self.position(),
        }
    }

    pub fn ray_direction(&self) -> Vec3A {
        safe_normal(self.transform.transform_vector3a(Vec3A::NEG_Z), Vec3A::NEG_Z)
    }
}

/// A hand pointer that grabs with a pinch and pokes with the index tip.
pub struct NearPointer {
    pub hand: Hand,
    pub config: NearPointerConfig,
    grab_focus: PointerFocus<GrabFocus>,
    poke_focus: PointerFocus<PokeFocus>,
    grab_pose: Affine3A,
    poke_pose: Affine3A,
    poke_radius: f32,
    focus_locked: bool,
    grabbing: bool,
    poking: bool,
    was_behind_front_face: bool,
    active: bool,
}

impl NearPointer {
    pub fn new(hand: Hand, config: NearPointerConfig) -> Self {
        let poke_radius = config.poke_radius;
        Self {
            hand,
            config,
            grab_focus: PointerFocus::default(),
            poke_focus: PointerFocus::default(),
            grab_pose: Affine3A::IDENTITY,
            poke_pose: Affine3A::IDENTITY,
            poke_radius,
            focus_locked: false,
            grabbing: false,
            poking: false,
            was_behind_front_face: false,
            active: false,
        }
    }

    pub fn grab_focus(&self) -> &PointerFocus<GrabFocus> {
        &self.grab_focus
    }

    pub fn poke_focus(&self) -> &PointerFocus<PokeFocus> {
        &self.poke_focus
    }

    pub fn grab_pose(&self) -> Affine3A {
        self.grab_pose
    }

    pub fn poke_pose(&self) -> Affine3A {
        self.poke_pose
    }

    pub fn poke_position(&self) -> Vec3A {
        self.poke_pose.translation
    }

    pub fn poke_radius(&self) -> f32 {
        self.poke_radius
    }

    pub fn is_focus_locked(&self) -> bool {
        self.focus_locked
    }

    pub fn set_focus_locked(&mut self, locked: bool) {
        self.focus_locked = locked;
    }

    pub fn is_grabbing(&self) -> bool {
        self.grabbing
    }

    pub fn is_poking(&self) -> bool {
        self.poking
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_grab_pose(&mut self, pose: Affine3A) {
        self.grab_pose = pose;
        self.active = true;
    }

    pub fn set_poke_pose(&mut self, pose: Affine3A, radius: f32) {
        self.poke_pose = pose;
        self.poke_radius = if radius > 0.0 {
            radius
        } else {
            self.config.poke_radius
        };
        self.active = true;
    }

    pub fn info(&self, id: PointerId, kind: PointerKind) -> PointerInfo {
        let (transform, radius) = match kind {
            PointerKind::Poke => (self.poke_pose, self.poke_radius),
            _ => (self.grab_pose, self.config.grab_radius),
        };
        PointerInfo {
            id,
            kind,
            hand: Some(self.hand),
            transform,
            radius,
            hit: None,
        }
    }

    /// Reads the hand joints, then runs focus and gestures.
    pub fn tick(
        &mut self,
        id: PointerId,
        scene: &mut Scene,
        query: &dyn SceneQuery,
        hands: &dyn HandTracker,
        ctx: &mut InteractionContext,
    ) {
        let joints = (
            hands.joint_state(self.hand, HandJoint::IndexTip),
            hands.joint_state(self.hand, HandJoint::ThumbTip),
        );
        let (Some(index), Some(thumb)) = joints else {
            if self.active {
                log::debug!("{} hand lost tracking", self.hand);
                self.deactivate(id, scene, ctx);
            }
            return;
        };

        let pinch_center = index.position.lerp(thumb.position, 0.5);
        self.set_grab_pose(Affine3A::from_rotation_translation(
            index.orientation,
            pinch_center.into(),
        ));
        self.set_poke_pose(index.transform(), index.radius);

        let grab_pressed = hands.is_grabbing(self.hand).unwrap_or(false);
        self.update(id, scene, query, grab_pressed, ctx);
    }

    /// Focus and gesture update from the current poses.
    pub fn update(
        &mut self,
        id: PointerId,
        scene: &mut Scene,
        query: &dyn SceneQuery,
        grab_pressed: bool,
        ctx: &mut InteractionContext,
    ) {
        let grab = self.info(id, PointerKind::Grab);
        let poke = self.info(id, PointerKind::Poke);

        if !self.focus_locked && !self.grabbing && !self.poking {
            let overlaps =
                query.overlap_sphere(scene, grab.position(), self.config.proximity_radius);
            self.grab_focus
                .select_closest_target(&grab, scene, &overlaps, ctx);
            self.poke_focus
                .select_closest_target(&poke, scene, &overlaps, ctx);
        } else {
            self.grab_focus
                .update_closest_target(scene, grab.position());
            self.poke_focus
                .update_closest_target(scene, poke.position());
        }

        self.grab_focus.update_focus(&grab, scene, ctx);
        self.poke_focus.update_focus(&poke, scene, ctx);

        self.update_grab_gesture(&grab, scene, grab_pressed, ctx);
        self.update_poke_gesture(&poke, scene, ctx);
    }

    fn update_grab_gesture(
        &mut self,
        grab: &PointerInfo,
        scene: &mut Scene,
        grab_pressed: bool,
        ctx: &mut InteractionContext,
    ) {
        match (self.grabbing, grab_pressed) {
            (false, true) => {
                self.grabbing = true;
                let in_reach = self.grab_focus.focus().is_some()
                    && grab.position().distance(self.grab_focus.closest_point())
                        <= self.config.grab_radius;
                if in_reach {
                    self.grab_focus.begin_grab(grab, scene, ctx);
                } else {
                    // a pinch started in empty space grabs nothing until released
                    self.grab_focus.clear_focus(grab, scene, ctx);
                }
            }
            (true, true) => self.grab_focus.update_grab(grab, scene, ctx),
            (true, false) => {
                self.grabbing = false;
                self.grab_focus.end_grab(grab, scene, ctx);
            }
            (false, false) => {}
        }
    }

    fn update_poke_gesture(
        &mut self,
        poke: &PointerInfo,
        scene: &mut Scene,
        ctx: &mut InteractionContext,
    ) {
        if self.poke_focus.focus().is_none() {
            self.poking = false;
            self.was_behind_front_face = false;
            return;
        }

        let offset = poke.position() - self.poke_focus.closest_point();
        let distance = offset.length();
        let behind = offset.dot(self.poke_focus.closest_normal()) < 0.0;
        let touching = distance <= self.poke_radius;

        if !self.poking {
            if touching && !self.was_behind_front_face {
                self.poking = true;
                self.poke_focus.begin_poke(poke, scene, ctx);
            }
        } else if touching || (behind && distance <= self.config.poke_depth) {
            self.poke_focus.update_poke(poke, scene, ctx);
        } else {
            self.poking = false;
            self.poke_focus.end_poke(poke, scene, ctx);
        }

        self.was_behind_front_face = behind;
    }

    /// Focuses `target` directly, optionally locking the focus to it.
    pub fn set_focused_grab_target(
        &mut self,
        id: PointerId,
        scene: &mut Scene,
        target: Option<TargetId>,
        lock: bool,
        ctx: &mut InteractionContext,
    ) -> bool {
        if self.grabbing {
            log::warn!("Can't change grab focus while grabbing");
            return false;
        }
        let grab = self.info(id, PointerKind::Grab);
        let ok = self
            .grab_focus
            .select_closest_point_on_target(&grab, scene, target, ctx);
        if ok && lock {
            self.focus_locked = true;
        }
        ok
    }

    pub fn set_focused_poke_target(
        &mut self,
        id: PointerId,
        scene: &mut Scene,
        target: Option<TargetId>,
        lock: bool,
        ctx: &mut InteractionContext,
    ) -> bool {
        if self.poking {
            log::warn!("Can't change poke focus while poking");
            return false;
        }
        let poke = self.info(id, PointerKind::Poke);
        let ok = self
            .poke_focus
            .select_closest_point_on_target(&poke, scene, target, ctx);
        if ok && lock {
            self.focus_locked = true;
        }
        ok
    }

    /// Ends running gestures and clears all focus.
    pub fn deactivate(&mut self, id: PointerId, scene: &mut Scene, ctx: &mut InteractionContext) {
        let grab = self.info(id, PointerKind::Grab);
        let poke = self.info(id, PointerKind::Poke);

        if self.grabbing {
            self.grab_focus.end_grab(&grab, scene, ctx);
            self.grabbing = false;
        }
        if self.poking {
            self.poke_focus.end_poke(&poke, scene, ctx);
            self.poking = false;
        }
        self.grab_focus.clear_focus(&grab, scene, ctx);
        self.poke_focus.clear_focus(&poke, scene, ctx);
        self.was_behind_front_face = false;
        self.active = false;
    }
}

/// A ray pointer, aiming along the local -Z of its pose.
pub struct FarPointer {
    pub hand: Option<Hand>,
    pub config: FarPointerConfig,
    focus: Option<(TargetId, PrimitiveId)>,
    hit: Option<FarHit>,
    pose: Affine3A,
    focus_locked: bool,
    pressed: bool,
    /// Target that took the current press; drags and the release go only here.
    press_target: Option<TargetId>,
    press_input: bool,
    active: bool,
}

impl FarPointer {
    pub fn new(hand: Option<Hand>, config: FarPointerConfig) -> Self {
        Self {
            hand,
            config,
            focus: None,
            hit: None,
            pose: Affine3A::IDENTITY,
            focus_locked: false,
            pressed: false,
            press_target: None,
            press_input: false,
            active: false,
        }
    }

    pub fn focus(&self) -> Option<(TargetId, PrimitiveId)> {
        self.focus
    }

    pub fn focused_target(&self) -> Option<TargetId> {
        self.focus.map(|(t, _)| t)
    }

    pub fn hit(&self) -> Option<FarHit> {
        self.hit
    }

    pub fn pose(&self) -> Affine3A {
        self.pose
    }

    pub fn set_pose(&mut self, pose: Affine3A) {
        self.pose = pose;
        self.active = true;
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// The target holding this pointer's press, if the press began on one.
    pub fn press_target(&self) -> Option<TargetId> {
        self.press_target
    }

    /// Press state for pointers without a tracked hand, read on the next tick.
    pub fn set_pressed(&mut self, pressed: bool) {
        self.press_input = pressed;
    }

    pub fn is_focus_locked(&self) -> bool {
        self.focus_locked
    }

    pub fn set_focus_locked(&mut self, locked: bool) {
        self.focus_locked = locked;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn info(&self, id: PointerId) -> PointerInfo {
        PointerInfo {
            id,
            kind: PointerKind::Far,
            hand: self.hand,
            transform: self.pose,
            radius: 0.0,
            hit: self.hit,
        }
    }

    pub fn tick(
        &mut self,
        id: PointerId,
        scene: &mut Scene,
        query: &dyn SceneQuery,
        hands: &dyn HandTracker,
        ctx: &mut InteractionContext,
    ) {
        let Some(hand) = self.hand else {
            // hand-less pointers are posed by the host
            let pressed = self.press_input;
            self.update(id, scene, query, pressed, ctx);
            return;
        };
        let Some(pose) = hands.pointer_pose(hand) else {
            if self.active {
                self.deactivate(id, scene, ctx);
            }
            return;
        };
        self.set_pose(pose);
        let pressed = hands.is_grabbing(hand).unwrap_or(false);
        self.update(id, scene, query, pressed, ctx);
    }

    pub fn update(
        &mut self,
        id: PointerId,
        scene: &mut Scene,
        query: &dyn SceneQuery,
        pressed: bool,
        ctx: &mut InteractionContext,
    ) {
        let origin = self.pose.translation;
        let dir = safe_normal(self.pose.transform_vector3a(Vec3A::NEG_Z), Vec3A::NEG_Z);

        if self.focus_locked {
            self.follow_locked_focus(scene, origin, dir);
        } else {
            let found = self.find_target(scene, query, origin, dir);
            self.set_focus(id, scene, found, ctx);
        }

        let info = self.info(id);
        if let Some(far) = self
            .focused_target_mut(scene)
            .and_then(|t| t.as_far_target())
        {
            far.on_update_far_focus(&info, ctx);
        }

        let was_pressed = self.pressed;
        self.pressed = pressed;
        match (was_pressed, pressed) {
            (false, true) => {
                let Some((target, _)) = self.focus else {
                    return;
                };
                if let Some(far) = scene.target_mut(target).and_then(|t| t.as_far_target()) {
                    far.on_far_pressed(&info, ctx);
                    self.press_target = Some(target);
                }
            }
            (true, true) => {
                if let Some(far) = self.pressed_far_target(scene) {
                    far.on_far_dragged(&info, ctx);
                }
            }
            (true, false) => {
                if let Some(far) = self.pressed_far_target(scene) {
                    far.on_far_released(&info, ctx);
                }
                self.press_target = None;
            }
            (false, false) => {}
        }
    }

    /// The press holder, while it is still the focused target.
    fn pressed_far_target<'s>(&self, scene: &'s mut Scene) -> Option<&'s mut dyn FarTarget> {
        let target = self.press_target?;
        if self.focused_target() != Some(target) {
            return None;
        }
        scene.target_mut(target)?.as_far_target()
    }

    fn focused_target_mut<'s>(
        &self,
        scene: &'s mut Scene,
    ) -> Option<&'s mut (dyn Interactable + 'static)> {
        let (target, _) = self.focus?;
        scene.target_mut(target)
    }

    fn find_target(
        &self,
        scene: &mut Scene,
        query: &dyn SceneQuery,
        origin: Vec3A,
        dir: Vec3A,
    ) -> Option<(TargetId, FarHit)> {
        let hits = query.raycast(scene, origin, dir, self.config.ray_length);
        for hit in hits {
            for component in scene.components_of(hit.actor) {
                let accepts = scene
                    .target_mut(component)
                    .and_then(|t| t.as_far_target())
                    .is_some_and(|f| f.is_far_focusable(hit.primitive));
                if accepts {
                    return Some((
                        component,
                        FarHit {
                            primitive: hit.primitive,
                            point: hit.point,
                            normal: hit.normal,
                            distance: hit.distance,
                        },
                    ));
                }
            }
        }
        None
    }

    fn set_focus(
        &mut self,
        id: PointerId,
        scene: &mut Scene,
        found: Option<(TargetId, FarHit)>,
        ctx: &mut InteractionContext,
    ) {
        let new_focus = found.map(|(t, hit)| (t, hit.primitive));
        if new_focus == self.focus {
            self.hit = found.map(|(_, hit)| hit);
            return;
        }

        let info = self.info(id);
        let releasing = self.press_target.take().is_some() && self.focused_target().is_some();
        if let Some(far) = self
            .focused_target_mut(scene)
            .and_then(|t| t.as_far_target())
        {
            // focus can only move off the press holder while unlocked
            if releasing {
                far.on_far_released(&info, ctx);
            }
            far.on_exit_far_focus(&info, ctx);
        }

        self.focus = new_focus;
        self.hit = found.map(|(_, hit)| hit);

        let info = self.info(id);
        if let Some(far) = self
            .focused_target_mut(scene)
            .and_then(|t| t.as_far_target())
        {
            far.on_enter_far_focus(&info, ctx);
        }
    }

    /// Keeps the hit on the locked primitive. When the ray no longer touches
    /// it, the hit slides along the ray at its last distance.
    fn follow_locked_focus(&mut self, scene: &Scene, origin: Vec3A, dir: Vec3A) {
        let Some((_, primitive)) = self.focus else {
            return;
        };
        let Some(prim) = scene.primitive(primitive) else {
            log::debug!("Locked far focus vanished, unlocking");
            self.focus = None;
            self.hit = None;
            self.press_target = None;
            self.focus_locked = false;
            return;
        };

        match prim.raycast(origin, dir, self.config.ray_length) {
            Some((distance, point, normal)) => {
                self.hit = Some(FarHit {
                    primitive,
                    point,
                    normal,
                    distance,
                });
            }
            None => {
                if let Some(hit) = &mut self.hit {
                    hit.point = origin + dir * hit.distance;
                }
            }
        }
    }

    pub fn deactivate(&mut self, id: PointerId, scene: &mut Scene, ctx: &mut InteractionContext) {
        let info = self.info(id);
        if let Some(far) = self
            .focused_target_mut(scene)
            .and_then(|t| t.as_far_target())
        {
            if self.press_target.is_some() {
                far.on_far_released(&info, ctx);
            }
            far.on_exit_far_focus(&info, ctx);
        }
        self.focus = None;
        self.hit = None;
        self.pressed = false;
        self.press_target = None;
        self.active = false;
    }
}

pub enum Pointer {
    Near(NearPointer),
    Far(FarPointer),
}

impl Pointer {
    pub fn set_focus_locked(&mut self, locked: bool) {
        match self {
            Pointer::Near(p) => p.set_focus_locked(locked),
            Pointer::Far(p) => p.set_focus_locked(locked),
        }
    }

    pub fn is_focus_locked(&self) -> bool {
        match self {
            Pointer::Near(p) => p.is_focus_locked(),
            Pointer::Far(p) => p.is_focus_locked(),
        }
    }
}

#[derive(Default)]
pub struct Pointers {
    pointers: HopSlotMap<PointerId, Pointer>,
}

impl Pointers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_near(&mut self, pointer: NearPointer) -> PointerId {
        self.pointers.insert(Pointer::Near(pointer))
    }

    pub fn add_far(&mut self, pointer: FarPointer) -> PointerId {
        self.pointers.insert(Pointer::Far(pointer))
    }

    pub fn remove(&mut self, id: PointerId) -> Option<Pointer> {
        self.pointers.remove(id)
    }

    pub fn get(&self, id: PointerId) -> Option<&Pointer> {
        self.pointers.get(id)
    }

    pub fn get_mut(&mut self, id: PointerId) -> Option<&mut Pointer> {
        self.pointers.get_mut(id)
    }

    pub fn near(&self, id: PointerId) -> Option<&NearPointer> {
        match self.pointers.get(id)? {
            Pointer::Near(p) => Some(p),
            Pointer::Far(_) => None,
        }
    }

    pub fn near_mut(&mut self, id: PointerId) -> Option<&mut NearPointer> {
        match self.pointers.get_mut(id)? {
            Pointer::Near(p) => Some(p),
            Pointer::Far(_) => None,
        }
    }

    pub fn far(&self, id: PointerId) -> Option<&FarPointer> {
        match self.pointers.get(id)? {
            Pointer::Far(p) => Some(p),
            Pointer::Near(_) => None,
        }
    }

    pub fn far_mut(&mut self, id: PointerId) -> Option<&mut FarPointer> {
        match self.pointers.get_mut(id)? {
            Pointer::Far(p) => Some(p),
            Pointer::Near(_) => None,
        }
    }

    pub fn set_focus_locked(&mut self, id: PointerId, locked: bool) {
        match self.pointers.get_mut(id) {
            Some(p) => p.set_focus_locked(locked),
            None => log::debug!("Focus lock for a removed pointer ignored"),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = PointerId> + '_ {
        self.pointers.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointerId, &'_ Pointer)> {
        self.pointers.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (PointerId, &'_ mut Pointer)> {
        self.pointers.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }
}
