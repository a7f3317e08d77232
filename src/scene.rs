use std::sync::Arc;

use glam::{Affine3A, Vec3A};
use slotmap::{new_key_type, HopSlotMap};
use smallvec::SmallVec;

use crate::{
    input::Pointers,
    interaction::InteractionContext,
    interactions::Interactable,
    math::{closest_point_on_shape, raycast_shape, Aabb, Shape},
};

new_key_type! {
    pub struct ActorId;
    pub struct PrimitiveId;
    pub struct TargetId;
}

/// A collision shape placed in the world, owned by an actor.
#[derive(Debug, Clone)]
pub struct Primitive {
    pub owner: ActorId,
    pub shape: Shape,
    pub transform: Affine3A,
    pub collision_enabled: bool,
}

impl Primitive {
    pub fn location(&self) -> Vec3A {
        self.transform.translation
    }

    /// Closest surface point to `point` and the distance to it.
    pub fn closest_point(&self, point: Vec3A) -> (Vec3A, f32) {
        closest_point_on_shape(&self.shape, &self.transform, point)
    }

    pub fn raycast(
        &self,
        origin: Vec3A,
        dir: Vec3A,
        max_distance: f32,
    ) -> Option<(f32, Vec3A, Vec3A)> {
        raycast_shape(&self.shape, &self.transform, origin, dir, max_distance)
    }

    pub fn world_bounds(&self) -> Aabb {
        self.shape.local_bounds().transformed(&self.transform)
    }
}

pub struct Actor {
    pub name: Arc<str>,
    pub transform: Affine3A,
    components: SmallVec<[TargetId; 4]>,
    primitives: SmallVec<[PrimitiveId; 4]>,
}

impl Actor {
    pub fn components(&self) -> &[TargetId] {
        &self.components
    }

    pub fn primitives(&self) -> &[PrimitiveId] {
        &self.primitives
    }
}

struct TargetSlot {
    owner: ActorId,
    component: Box<dyn Interactable>,
}

/// Lookup tables for actors, their primitives and their interactable components.
///
/// All cross references are slot map keys; a key whose entry has been removed
/// simply resolves to `None`.
#[derive(Default)]
pub struct Scene {
    actors: HopSlotMap<ActorId, Actor>,
    primitives: HopSlotMap<PrimitiveId, Primitive>,
    targets: HopSlotMap<TargetId, TargetSlot>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_actor(&mut self, name: &str, transform: Affine3A) -> ActorId {
        self.actors.insert(Actor {
            name: name.into(),
            transform,
            components: SmallVec::new(),
            primitives: SmallVec::new(),
        })
    }

    /// Removes an actor together with everything attached to it.
    pub fn remove_actor(&mut self, id: ActorId) -> bool {
        let Some(actor) = self.actors.remove(id) else {
            return false;
        };
        for prim in actor.primitives {
            self.primitives.remove(prim);
        }
        for target in actor.components {
            self.targets.remove(target);
        }
        log::debug!("Removed actor {}", actor.name);
        true
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.actors.get(id)
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.actors.get_mut(id)
    }

    pub fn actor_by_name(&self, name: &str) -> Option<ActorId> {
        self.actors
            .iter()
            .find(|(_, a)| *a.name == *name)
            .map(|(id, _)| id)
    }

    pub fn add_primitive(
        &mut self,
        owner: ActorId,
        shape: Shape,
        transform: Affine3A,
    ) -> Option<PrimitiveId> {
        let actor = self.actors.get_mut(owner)?;
        let id = self.primitives.insert(Primitive {
            owner,
            shape,
            transform,
            collision_enabled: true,
        });
        actor.primitives.push(id);
        Some(id)
    }

    pub fn remove_primitive(&mut self, id: PrimitiveId) -> Option<Primitive> {
        let prim = self.primitives.remove(id)?;
        if let Some(actor) = self.actors.get_mut(prim.owner) {
            actor.primitives.retain(|p| *p != id);
        }
        Some(prim)
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        self.primitives.get(id)
    }

    pub fn primitive_mut(&mut self, id: PrimitiveId) -> Option<&mut Primitive> {
        self.primitives.get_mut(id)
    }

    pub fn primitives(&self) -> impl Iterator<Item = (PrimitiveId, &'_ Primitive)> {
        self.primitives.iter()
    }

    pub fn primitives_of(
        &self,
        actor: ActorId,
    ) -> impl Iterator<Item = (PrimitiveId, &'_ Primitive)> {
        self.actors
            .get(actor)
            .into_iter()
            .flat_map(|a| a.primitives.iter())
            .filter_map(|id| self.primitives.get(*id).map(|p| (*id, p)))
    }

    pub fn add_component<T: Interactable>(
        &mut self,
        owner: ActorId,
        component: T,
    ) -> Option<TargetId> {
        self.add_boxed_component(owner, Box::new(component))
    }

    pub fn add_boxed_component(
        &mut self,
        owner: ActorId,
        component: Box<dyn Interactable>,
    ) -> Option<TargetId> {
        let actor = self.actors.get_mut(owner)?;
        let id = self.targets.insert(TargetSlot { owner, component });
        actor.components.push(id);
        Some(id)
    }

    pub fn remove_component(&mut self, id: TargetId) -> Option<Box<dyn Interactable>> {
        let slot = self.targets.remove(id)?;
        if let Some(actor) = self.actors.get_mut(slot.owner) {
            actor.components.retain(|c| *c != id);
        }
        Some(slot.component)
    }

    pub fn owner_of(&self, target: TargetId) -> Option<ActorId> {
        self.targets.get(target).map(|s| s.owner)
    }

    /// Snapshot of an actor's components, in attachment order.
    pub fn components_of(&self, actor: ActorId) -> SmallVec<[TargetId; 4]> {
        self.actors
            .get(actor)
            .map(|a| a.components.clone())
            .unwrap_or_default()
    }

    pub fn target_ids(&self) -> SmallVec<[TargetId; 16]> {
        self.targets.keys().collect()
    }

    pub fn target_mut(&mut self, id: TargetId) -> Option<&mut (dyn Interactable + 'static)> {
        self.targets.get_mut(id).map(|s| &mut *s.component)
    }

    /// A component together with one of the scene's primitives.
    pub fn target_with_primitive(
        &mut self,
        target: TargetId,
        primitive: PrimitiveId,
    ) -> Option<(&mut (dyn Interactable + 'static), &Primitive)> {
        let prim = self.primitives.get(primitive)?;
        let slot = self.targets.get_mut(target)?;
        Some((&mut *slot.component, prim))
    }

    pub fn component<T: Interactable>(&self, id: TargetId) -> Option<&T> {
        self.targets.get(id)?.component.downcast_ref::<T>()
    }

    pub fn component_mut<T: Interactable>(&mut self, id: TargetId) -> Option<&mut T> {
        self.targets.get_mut(id)?.component.downcast_mut::<T>()
    }

    /// Runs the per-tick update of every component that asks for one.
    pub fn tick_targets(&mut self, pointers: &Pointers, ctx: &mut InteractionContext) {
        for slot in self.targets.values_mut() {
            if slot.component.wants_tick() {
                slot.component.tick(pointers, ctx);
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlap {
    pub primitive: PrimitiveId,
    pub actor: ActorId,
}

#[derive(Debug, Clone, Copy)]
pub struct RayHit {
    pub primitive: PrimitiveId,
    pub actor: ActorId,
    pub point: Vec3A,
    pub normal: Vec3A,
    pub distance: f32,
}

/// Spatial queries the pointers depend on. Hosts with a physics engine
/// implement this on top of it.
pub trait SceneQuery {
    fn overlap_sphere(&self, scene: &Scene, center: Vec3A, radius: f32) -> SmallVec<[Overlap; 8]>;

    /// Hits sorted by increasing distance.
    fn raycast(
        &self,
        scene: &Scene,
        origin: Vec3A,
        dir: Vec3A,
        max_distance: f32,
    ) -> SmallVec<[RayHit; 4]>;
}

/// Brute-force queries over every collision-enabled primitive in the scene.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimitiveQuery;

impl SceneQuery for PrimitiveQuery {
    fn overlap_sphere(&self, scene: &Scene, center: Vec3A, radius: f32) -> SmallVec<[Overlap; 8]> {
        scene
            .primitives()
            .filter(|(_, p)| p.collision_enabled)
            .filter(|(_, p)| p.closest_point(center).1 <= radius)
            .map(|(id, p)| Overlap {
                primitive: id,
                actor: p.owner,
            })
            .collect()
    }

    fn raycast(
        &self,
        scene: &Scene,
        origin: Vec3A,
        dir: Vec3A,
        max_distance: f32,
    ) -> SmallVec<[RayHit; 4]> {
        let mut hits: SmallVec<[RayHit; 4]> = scene
            .primitives()
            .filter(|(_, p)| p.collision_enabled)
            .filter_map(|(id, p)| {
                let (distance, point, normal) = p.raycast(origin, dir, max_distance)?;
                Some(RayHit {
                    primitive: id,
                    actor: p.owner,
                    point,
                    normal,
                    distance,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }
}
