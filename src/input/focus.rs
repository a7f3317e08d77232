use std::marker::PhantomData;

use glam::Vec3A;

use crate::{
    interaction::InteractionContext,
    interactions::Interactable,
    math::{outward_normal, DISTANCE_EPSILON},
    scene::{Overlap, Primitive, PrimitiveId, Scene, TargetId},
};

use super::PointerInfo;

/// The capability a [`PointerFocus`] tracks, and how its events are raised.
pub trait FocusKind {
    const NAME: &'static str;

    fn implements(target: &mut dyn Interactable) -> bool;

    /// Closest point and normal on the primitive, `None` when the target does
    /// not accept focus on it.
    fn closest_point_on_target(
        target: &mut dyn Interactable,
        primitive_id: PrimitiveId,
        primitive: &Primitive,
        point: Vec3A,
    ) -> Option<(Vec3A, Vec3A)>;

    fn raise_enter_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    );
    fn raise_update_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    );
    fn raise_exit_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    );
}

pub struct GrabFocus;

impl FocusKind for GrabFocus {
    const NAME: &'static str = "grab";

    fn implements(target: &mut dyn Interactable) -> bool {
        target.as_grab_target().is_some()
    }

    fn closest_point_on_target(
        target: &mut dyn Interactable,
        primitive_id: PrimitiveId,
        primitive: &Primitive,
        point: Vec3A,
    ) -> Option<(Vec3A, Vec3A)> {
        let grab = target.as_grab_target()?;
        if !grab.is_grab_focusable(primitive_id) {
            return None;
        }
        let (closest, _) = primitive.closest_point(point);
        Some((closest, outward_normal(point, closest, primitive.location())))
    }

    fn raise_enter_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    ) {
        if let Some(grab) = target.as_grab_target() {
            grab.on_enter_grab_focus(pointer, ctx);
        }
    }

    fn raise_update_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    ) {
        if let Some(grab) = target.as_grab_target() {
            grab.on_update_grab_focus(pointer, ctx);
        }
    }

    fn raise_exit_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    ) {
        if let Some(grab) = target.as_grab_target() {
            grab.on_exit_grab_focus(pointer, ctx);
        }
    }
}

pub struct PokeFocus;

impl FocusKind for PokeFocus {
    const NAME: &'static str = "poke";

    fn implements(target: &mut dyn Interactable) -> bool {
        target.as_poke_target().is_some()
    }

    fn closest_point_on_target(
        target: &mut dyn Interactable,
        primitive_id: PrimitiveId,
        primitive: &Primitive,
        point: Vec3A,
    ) -> Option<(Vec3A, Vec3A)> {
        let poke = target.as_poke_target()?;
        if !poke.is_poke_focusable(primitive_id) {
            return None;
        }
        poke.closest_point(primitive, point)
    }

    fn raise_enter_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    ) {
        if let Some(poke) = target.as_poke_target() {
            poke.on_enter_poke_focus(pointer, ctx);
        }
    }

    fn raise_update_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    ) {
        if let Some(poke) = target.as_poke_target() {
            poke.on_update_poke_focus(pointer, ctx);
        }
    }

    fn raise_exit_focus(
        target: &mut dyn Interactable,
        pointer: &PointerInfo,
        ctx: &mut InteractionContext,
    ) {
        if let Some(poke) = target.as_poke_target() {
            poke.on_exit_poke_focus(pointer, ctx);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FocusSearchResult {
    pub focus: Option<(TargetId, PrimitiveId)>,
    pub closest_point: Vec3A,
    pub normal: Vec3A,
    pub distance_squared: f32,
}

impl Default for FocusSearchResult {
    fn default() -> Self {
        Self {
            focus: None,
            closest_point: Vec3A::ZERO,
            normal: Vec3A::X,
            distance_squared: f32::INFINITY,
        }
    }
}

impl FocusSearchResult {
    pub fn is_valid(&self) -> bool {
        self.focus.is_some()
    }

    pub fn distance(&self) -> f32 {
        self.distance_squared.sqrt()
    }
}

/// Focus of one pointer for one kind of target.
///
/// The focused target and primitive are stored as a pair so one can never be
/// set without the other.
pub struct PointerFocus<K: FocusKind> {
    focused: Option<(TargetId, PrimitiveId)>,
    closest_point: Vec3A,
    closest_normal: Vec3A,
    _kind: PhantomData<K>,
}

impl<K: FocusKind> Default for PointerFocus<K> {
    fn default() -> Self {
        Self {
            focused: None,
            closest_point: Vec3A::ZERO,
            closest_normal: Vec3A::X,
            _kind: PhantomData,
        }
    }
}

impl<K: FocusKind> PointerFocus<K> {
    pub fn focus(&self) -> Option<(TargetId, PrimitiveId)> {
        self.focused
    }

    pub fn focused_target(&self) -> Option<TargetId> {
        self.focused.map(|(t, _)| t)
    }

    pub fn focused_primitive(&self) -> Option<PrimitiveId> {
        self.focused.map(|(_, p)| p)
    }

    pub fn closest_point(&self) -> Vec3A {
        self.closest_point
    }

    pub fn closest_normal(&self) -> Vec3A {
        self.closest_normal
    }

    /// Scans the overlaps for the closest accepting target.
    ///
    /// Each overlapping primitive is claimed by the first component of its
    /// actor that accepts it.
    pub fn find_closest_target(
        scene: &mut Scene,
        overlaps: &[Overlap],
        point: Vec3A,
    ) -> FocusSearchResult {
        let mut result = FocusSearchResult::default();

        for overlap in overlaps {
            for component in scene.components_of(overlap.actor) {
                let Some((target, primitive)) =
                    scene.target_with_primitive(component, overlap.primitive)
                else {
                    continue;
                };
                if !K::implements(target) {
                    continue;
                }
                let Some((closest, normal)) =
                    K::closest_point_on_target(target, overlap.primitive, primitive, point)
                else {
                    continue;
                };

                let distance_squared = point.distance_squared(closest);
                if distance_squared < result.distance_squared {
                    result = FocusSearchResult {
                        focus: Some((component, overlap.primitive)),
                        closest_point: closest,
                        normal,
                        distance_squared,
                    };
                }
                break;
            }
        }

        result
    }

    /// Closest accepting primitive of a single component.
    pub fn find_closest_point_on_component(
        scene: &mut Scene,
        component: TargetId,
        point: Vec3A,
    ) -> FocusSearchResult {
        let mut result = FocusSearchResult::default();
        let Some(actor) = scene.owner_of(component) else {
            return result;
        };
        let primitives: Vec<PrimitiveId> = scene.primitives_of(actor).map(|(id, _)| id).collect();

        for primitive_id in primitives {
            let Some((target, primitive)) = scene.target_with_primitive(component, primitive_id)
            else {
                continue;
            };
            let Some((closest, normal)) =
                K::closest_point_on_target(target, primitive_id, primitive, point)
            else {
                continue;
            };

            let distance_squared = point.distance_squared(closest);
            if distance_squared < result.distance_squared {
                result = FocusSearchResult {
                    focus: Some((component, primitive_id)),
                    closest_point: closest,
                    normal,
                    distance_squared,
                };
                if distance_squared <= DISTANCE_EPSILON * DISTANCE_EPSILON {
                    break;
                }
            }
        }

        result
    }

    pub fn select_closest_target(
        &mut self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        overlaps: &[Overlap],
        ctx: &mut InteractionContext,
    ) {
        let result = Self::find_closest_target(scene, overlaps, pointer.position());
        self.set_focus(pointer, scene, result, ctx);
    }

    /// Focuses `target` explicitly, on its closest accepting primitive.
    /// Passing `None` clears the focus.
    pub fn select_closest_point_on_target(
        &mut self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        target: Option<TargetId>,
        ctx: &mut InteractionContext,
    ) -> bool {
        let Some(target) = target else {
            self.clear_focus(pointer, scene, ctx);
            return true;
        };

        let implements = scene.target_mut(target).is_some_and(|t| K::implements(t));
        if !implements {
            log::warn!("Target does not implement {} focus; ignoring", K::NAME);
            return false;
        }

        let result = Self::find_closest_point_on_component(scene, target, pointer.position());
        if !result.is_valid() {
            return false;
        }
        self.set_focus(pointer, scene, result, ctx);
        true
    }

    pub fn set_focus(
        &mut self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        result: FocusSearchResult,
        ctx: &mut InteractionContext,
    ) {
        if result.focus == self.focused {
            if self.focused.is_some() {
                self.closest_point = result.closest_point;
                self.closest_normal = result.normal;
            }
            return;
        }

        if let Some((old, _)) = self.focused {
            if let Some(target) = scene.target_mut(old) {
                K::raise_exit_focus(target, pointer, ctx);
            }
        }

        self.focused = result.focus;
        if self.focused.is_some() {
            self.closest_point = result.closest_point;
            self.closest_normal = result.normal;
        } else {
            self.reset_point();
        }

        if let Some((new, _)) = self.focused {
            if let Some(target) = scene.target_mut(new) {
                K::raise_enter_focus(target, pointer, ctx);
            }
        }
    }

    /// Refreshes the closest point on the current focus without retargeting.
    /// A focus whose target or primitive has been removed is dropped.
    pub fn update_closest_target(&mut self, scene: &mut Scene, point: Vec3A) {
        let Some((target_id, primitive_id)) = self.focused else {
            return;
        };
        let Some((target, primitive)) = scene.target_with_primitive(target_id, primitive_id) else {
            log::debug!("Focused {} target is gone", K::NAME);
            self.focused = None;
            self.reset_point();
            return;
        };
        if let Some((closest, normal)) =
            K::closest_point_on_target(target, primitive_id, primitive, point)
        {
            self.closest_point = closest;
            self.closest_normal = normal;
        }
    }

    pub fn update_focus(
        &self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        ctx: &mut InteractionContext,
    ) {
        if let Some(target) = self.focused_mut(scene) {
            K::raise_update_focus(target, pointer, ctx);
        }
    }

    pub fn clear_focus(
        &mut self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        ctx: &mut InteractionContext,
    ) {
        if let Some(target) = self.focused_mut(scene) {
            K::raise_exit_focus(target, pointer, ctx);
        }
        self.focused = None;
        self.reset_point();
    }

    fn focused_mut<'s>(
        &self,
        scene: &'s mut Scene,
    ) -> Option<&'s mut (dyn Interactable + 'static)> {
        let (target, _) = self.focused?;
        scene.target_mut(target)
    }

    fn reset_point(&mut self) {
        self.closest_point = Vec3A::ZERO;
        self.closest_normal = Vec3A::X;
    }
}

impl PointerFocus<GrabFocus> {
    /// Returns `false` when nothing is focused.
    pub fn begin_grab(
        &self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        ctx: &mut InteractionContext,
    ) -> bool {
        let Some(target) = self.focused_mut(scene) else {
            return false;
        };
        match target.as_grab_target() {
            Some(grab) => {
                grab.on_begin_grab(pointer, ctx);
                true
            }
            None => false,
        }
    }

    pub fn update_grab(
        &self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        ctx: &mut InteractionContext,
    ) {
        if let Some(grab) = self
            .focused_mut(scene)
            .and_then(|t| t.as_grab_target())
        {
            grab.on_update_grab(pointer, ctx);
        }
    }

    pub fn end_grab(&self, pointer: &PointerInfo, scene: &mut Scene, ctx: &mut InteractionContext) {
        if let Some(grab) = self
            .focused_mut(scene)
            .and_then(|t| t.as_grab_target())
        {
            grab.on_end_grab(pointer, ctx);
        }
    }
}

impl PointerFocus<PokeFocus> {
    pub fn begin_poke(
        &self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        ctx: &mut InteractionContext,
    ) -> bool {
        let Some(target) = self.focused_mut(scene) else {
            return false;
        };
        match target.as_poke_target() {
            Some(poke) => {
                poke.on_begin_poke(pointer, ctx);
                true
            }
            None => false,
        }
    }

    pub fn update_poke(
        &self,
        pointer: &PointerInfo,
        scene: &mut Scene,
        ctx: &mut InteractionContext,
    ) {
        if let Some(poke) = self
            .focused_mut(scene)
            .and_then(|t| t.as_poke_target())
        {
            poke.on_update_poke(pointer, ctx);
        }
    }

    pub fn end_poke(&self, pointer: &PointerInfo, scene: &mut Scene, ctx: &mut InteractionContext) {
        if let Some(poke) = self
            .focused_mut(scene)
            .and_then(|t| t.as_poke_target())
        {
            poke.on_end_poke(pointer, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use glam::{Affine3A, Vec3};

    use super::*;
    use crate::{
        input::{PointerId, PointerKind},
        interactions::GrabTarget,
        math::Shape,
        scene::{ActorId, PrimitiveQuery, SceneQuery},
    };

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Seen {
        Enter,
        Exit,
    }

    struct Probe {
        log: Rc<RefCell<Vec<Seen>>>,
        accepts: bool,
    }

    impl Interactable for Probe {
        fn as_grab_target(&mut self) -> Option<&mut dyn GrabTarget> {
            self.accepts.then_some(self as &mut dyn GrabTarget)
        }
    }

    impl GrabTarget for Probe {
        fn is_grab_focusable(&self, _primitive: PrimitiveId) -> bool {
            true
        }

        fn on_enter_grab_focus(&mut self, _: &PointerInfo, _: &mut InteractionContext) {
            self.log.borrow_mut().push(Seen::Enter);
        }

        fn on_exit_grab_focus(&mut self, _: &PointerInfo, _: &mut InteractionContext) {
            self.log.borrow_mut().push(Seen::Exit);
        }
    }

    fn pointer_at(pos: Vec3) -> PointerInfo {
        PointerInfo {
            id: PointerId::default(),
            kind: PointerKind::Grab,
            hand: None,
            transform: Affine3A::from_translation(pos),
            radius: 0.0,
            hit: None,
        }
    }

    fn probe_actor(
        scene: &mut Scene,
        pos: Vec3,
        accepts: bool,
    ) -> (ActorId, TargetId, Rc<RefCell<Vec<Seen>>>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let actor = scene.add_actor("probe", Affine3A::from_translation(pos));
        scene
            .add_primitive(
                actor,
                Shape::Sphere { radius: 0.01 },
                Affine3A::from_translation(pos),
            )
            .unwrap();
        let target = scene
            .add_component(
                actor,
                Probe {
                    log: log.clone(),
                    accepts,
                },
            )
            .unwrap();
        (actor, target, log)
    }

    fn assert_paired(focus: &PointerFocus<GrabFocus>) {
        assert_eq!(
            focus.focused_target().is_some(),
            focus.focused_primitive().is_some()
        );
    }

    #[test]
    fn closest_target_wins() {
        let mut scene = Scene::new();
        let mut ctx = InteractionContext::default();
        let (_, far, _) = probe_actor(&mut scene, Vec3::new(0.08, 0.0, 0.0), true);
        let (_, near, _) = probe_actor(&mut scene, Vec3::new(0.03, 0.0, 0.0), true);

        let pointer = pointer_at(Vec3::ZERO);
        let overlaps = PrimitiveQuery.overlap_sphere(&scene, Vec3A::ZERO, 0.1);
        let mut focus = PointerFocus::<GrabFocus>::default();
        focus.select_closest_target(&pointer, &mut scene, &overlaps, &mut ctx);

        assert_eq!(focus.focused_target(), Some(near));
        assert_ne!(focus.focused_target(), Some(far));
        assert!(focus
            .closest_point()
            .abs_diff_eq(Vec3A::new(0.02, 0.0, 0.0), 1e-5));
        assert!(focus.closest_normal().abs_diff_eq(Vec3A::NEG_X, 1e-5));
        assert_paired(&focus);
    }

    #[test]
    fn no_matching_target_means_no_focus() {
        let mut scene = Scene::new();
        let (_, _, log) = probe_actor(&mut scene, Vec3::new(0.03, 0.0, 0.0), false);
        let overlaps = PrimitiveQuery.overlap_sphere(&scene, Vec3A::ZERO, 0.1);
        assert_eq!(overlaps.len(), 1);

        let result =
            PointerFocus::<GrabFocus>::find_closest_target(&mut scene, &overlaps, Vec3A::ZERO);
        assert!(!result.is_valid());
        assert_eq!(result.distance(), f32::INFINITY);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn set_focus_same_pair_raises_one_enter() {
        let mut scene = Scene::new();
        let mut ctx = InteractionContext::default();
        let (_, _, log) = probe_actor(&mut scene, Vec3::new(0.03, 0.0, 0.0), true);
        let pointer = pointer_at(Vec3::ZERO);
        let overlaps = PrimitiveQuery.overlap_sphere(&scene, Vec3A::ZERO, 0.1);
        let mut focus = PointerFocus::<GrabFocus>::default();

        for _ in 0..3 {
            let result =
                PointerFocus::<GrabFocus>::find_closest_target(&mut scene, &overlaps, Vec3A::ZERO);
            focus.set_focus(&pointer, &mut scene, result, &mut ctx);
            assert_paired(&focus);
        }
        assert_eq!(*log.borrow(), vec![Seen::Enter]);

        focus.clear_focus(&pointer, &mut scene, &mut ctx);
        assert_eq!(*log.borrow(), vec![Seen::Enter, Seen::Exit]);
        assert_eq!(focus.closest_point(), Vec3A::ZERO);
        assert_eq!(focus.closest_normal(), Vec3A::X);
        assert_paired(&focus);
    }

    #[test]
    fn switching_targets_exits_old_first() {
        let mut scene = Scene::new();
        let mut ctx = InteractionContext::default();
        let (_, a, log_a) = probe_actor(&mut scene, Vec3::new(0.03, 0.0, 0.0), true);
        let (_, b, log_b) = probe_actor(&mut scene, Vec3::new(-0.5, 0.0, 0.0), true);
        let mut focus = PointerFocus::<GrabFocus>::default();

        let pointer = pointer_at(Vec3::ZERO);
        let overlaps = PrimitiveQuery.overlap_sphere(&scene, Vec3A::ZERO, 0.1);
        focus.select_closest_target(&pointer, &mut scene, &overlaps, &mut ctx);
        assert_eq!(focus.focused_target(), Some(a));

        let pointer = pointer_at(Vec3::new(-0.5, 0.0, 0.02));
        let overlaps = PrimitiveQuery.overlap_sphere(&scene, pointer.position(), 0.1);
        focus.select_closest_target(&pointer, &mut scene, &overlaps, &mut ctx);
        assert_eq!(focus.focused_target(), Some(b));
        assert_eq!(*log_a.borrow(), vec![Seen::Enter, Seen::Exit]);
        assert_eq!(*log_b.borrow(), vec![Seen::Enter]);
    }

    #[test]
    fn removed_target_drops_focus() {
        let mut scene = Scene::new();
        let mut ctx = InteractionContext::default();
        let (actor, _, log) = probe_actor(&mut scene, Vec3::new(0.03, 0.0, 0.0), true);
        let pointer = pointer_at(Vec3::ZERO);
        let overlaps = PrimitiveQuery.overlap_sphere(&scene, Vec3A::ZERO, 0.1);
        let mut focus = PointerFocus::<GrabFocus>::default();
        focus.select_closest_target(&pointer, &mut scene, &overlaps, &mut ctx);

        scene.remove_actor(actor);
        focus.update_closest_target(&mut scene, Vec3A::ZERO);
        assert!(focus.focus().is_none());
        assert_paired(&focus);

        // nothing to exit any more
        focus.clear_focus(&pointer, &mut scene, &mut ctx);
        assert_eq!(*log.borrow(), vec![Seen::Enter]);
    }

    #[test]
    fn explicit_focus_on_target() {
        let mut scene = Scene::new();
        let mut ctx = InteractionContext::default();
        let (_, target, log) = probe_actor(&mut scene, Vec3::new(1.0, 0.0, 0.0), true);
        let pointer = pointer_at(Vec3::ZERO);
        let mut focus = PointerFocus::<GrabFocus>::default();

        assert!(focus.select_closest_point_on_target(&pointer, &mut scene, Some(target), &mut ctx));
        assert_eq!(focus.focused_target(), Some(target));
        assert!(focus.select_closest_point_on_target(&pointer, &mut scene, None, &mut ctx));
        assert!(focus.focus().is_none());
        assert_eq!(*log.borrow(), vec![Seen::Enter, Seen::Exit]);
    }
}
