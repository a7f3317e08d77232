use std::any::Any;

use glam::Vec3A;

use crate::{
    input::{PointerInfo, Pointers},
    interaction::InteractionContext,
    scene::{Primitive, PrimitiveId},
};

pub trait AnyTrait: 'static {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> AnyTrait for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A component that can receive pointer focus.
///
/// Capabilities are discovered per call; a component is free to stop
/// exposing one at runtime, pointers then treat it as absent.
pub trait Interactable: AnyTrait {
    fn as_grab_target(&mut self) -> Option<&mut dyn GrabTarget> {
        None
    }

    fn as_poke_target(&mut self) -> Option<&mut dyn PokeTarget> {
        None
    }

    fn as_far_target(&mut self) -> Option<&mut dyn FarTarget> {
        None
    }

    fn wants_tick(&self) -> bool {
        false
    }

    /// Manipulation phase update, after all pointers have raised their events.
    fn tick(&mut self, _pointers: &Pointers, _ctx: &mut InteractionContext) {}
}

impl dyn Interactable {
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

#[allow(unused_variables)]
pub trait GrabTarget {
    fn is_grab_focusable(&self, primitive: PrimitiveId) -> bool;

    fn on_enter_grab_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_update_grab_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_exit_grab_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}

    fn on_begin_grab(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_update_grab(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_end_grab(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
}

#[allow(unused_variables)]
pub trait PokeTarget {
    fn is_poke_focusable(&self, primitive: PrimitiveId) -> bool;

    /// Closest point and surface normal on `primitive`, or `None` to refuse focus.
    fn closest_point(&self, primitive: &Primitive, point: Vec3A) -> Option<(Vec3A, Vec3A)>;

    fn on_enter_poke_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_update_poke_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_exit_poke_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}

    fn on_begin_poke(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_update_poke(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_end_poke(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
}

#[allow(unused_variables)]
pub trait FarTarget {
    fn is_far_focusable(&self, primitive: PrimitiveId) -> bool;

    fn on_enter_far_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_update_far_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_exit_far_focus(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}

    fn on_far_pressed(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_far_dragged(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
    fn on_far_released(&mut self, pointer: &PointerInfo, ctx: &mut InteractionContext) {}
}
