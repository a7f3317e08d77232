use glam::Affine3A;
use smallvec::SmallVec;

use crate::{
    input::{FarPointer, HandTracker, NearPointer, Pointer, PointerId, Pointers},
    interactions::Interactable,
    scene::{Scene, SceneQuery, TargetId},
};

/// Frame-wide state handed to every target callback.
///
/// Targets can't reach the pointers directly while a pointer is calling into
/// them, so pointer changes are queued here and applied between phases.
pub struct InteractionContext {
    pub time: f32,
    pub delta_time: f32,
    /// Head pose of the user.
    pub viewer: Affine3A,
    focus_lock_requests: SmallVec<[(PointerId, bool); 4]>,
}

impl Default for InteractionContext {
    fn default() -> Self {
        Self::new(0.0, 0.0, Affine3A::IDENTITY)
    }
}

impl InteractionContext {
    pub fn new(time: f32, delta_time: f32, viewer: Affine3A) -> Self {
        Self {
            time,
            delta_time,
            viewer,
            focus_lock_requests: SmallVec::new(),
        }
    }

    pub fn set_focus_locked(&mut self, pointer: PointerId, locked: bool) {
        self.focus_lock_requests.push((pointer, locked));
    }

    pub fn take_focus_lock_requests(&mut self) -> SmallVec<[(PointerId, bool); 4]> {
        std::mem::take(&mut self.focus_lock_requests)
    }

    pub fn apply_to(&mut self, pointers: &mut Pointers) {
        for (id, locked) in self.take_focus_lock_requests() {
            pointers.set_focus_locked(id, locked);
        }
    }
}

/// Owns the pointers and drives the per-frame phases over a scene.
pub struct InteractionSystem {
    pub pointers: Pointers,
    pub viewer: Affine3A,
    time: f32,
}

impl Default for InteractionSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionSystem {
    pub fn new() -> Self {
        Self {
            pointers: Pointers::new(),
            viewer: Affine3A::IDENTITY,
            time: 0.0,
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn add_near_pointer(&mut self, pointer: NearPointer) -> PointerId {
        self.pointers.add_near(pointer)
    }

    pub fn add_far_pointer(&mut self, pointer: FarPointer) -> PointerId {
        self.pointers.add_far(pointer)
    }

    /// Ends the pointer's gestures and focus before dropping it.
    pub fn remove_pointer(&mut self, scene: &mut Scene, id: PointerId) -> Option<Pointer> {
        let mut ctx = self.context(0.0);
        match self.pointers.get_mut(id)? {
            Pointer::Near(p) => p.deactivate(id, scene, &mut ctx),
            Pointer::Far(p) => p.deactivate(id, scene, &mut ctx),
        }
        let removed = self.pointers.remove(id);
        ctx.apply_to(&mut self.pointers);
        removed
    }

    pub fn context(&self, delta_time: f32) -> InteractionContext {
        InteractionContext::new(self.time, delta_time, self.viewer)
    }

    /// Runs one frame: pointer focus and gestures first, then the target updates.
    pub fn tick(
        &mut self,
        scene: &mut Scene,
        query: &dyn SceneQuery,
        hands: &dyn HandTracker,
        delta_time: f32,
    ) {
        self.time += delta_time;
        let mut ctx = self.context(delta_time);

        self.update_pointers(scene, query, hands, &mut ctx);
        ctx.apply_to(&mut self.pointers);

        self.update_targets(scene, &mut ctx);
        ctx.apply_to(&mut self.pointers);
    }

    pub fn update_pointers(
        &mut self,
        scene: &mut Scene,
        query: &dyn SceneQuery,
        hands: &dyn HandTracker,
        ctx: &mut InteractionContext,
    ) {
        for (id, pointer) in self.pointers.iter_mut() {
            match pointer {
                Pointer::Near(p) => p.tick(id, scene, query, hands, ctx),
                Pointer::Far(p) => p.tick(id, scene, query, hands, ctx),
            }
        }
    }

    pub fn update_targets(&mut self, scene: &mut Scene, ctx: &mut InteractionContext) {
        scene.tick_targets(&self.pointers, ctx);
    }

    /// Typed access to a component from outside the tick, e.g. to disable a button.
    pub fn with_target<T: Interactable, R>(
        &mut self,
        scene: &mut Scene,
        id: TargetId,
        f: impl FnOnce(&mut T, &mut InteractionContext) -> R,
    ) -> Option<R> {
        let mut ctx = self.context(0.0);
        let target = scene.component_mut::<T>(id)?;
        let result = f(target, &mut ctx);
        ctx.apply_to(&mut self.pointers);
        Some(result)
    }
}
