pub mod grab;
pub mod manipulation;
pub mod target;

pub use grab::{GrabEvent, GrabPointerData, GrabPointerKind, GrabTargetComponent};
pub use manipulation::{GenericManipulator, ManipulationEvent};
pub use target::{AnyTrait, FarTarget, GrabTarget, Interactable, PokeTarget};
