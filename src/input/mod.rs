pub mod focus;
pub mod hand;
pub mod pointer;

pub use focus::{FocusKind, FocusSearchResult, GrabFocus, PointerFocus, PokeFocus};
pub use hand::{
    GraspDetector, GraspEvent, Hand, HandJoint, HandTracker, JointPose, SimulatedHandTracker,
};
pub use pointer::{
    FarHit, FarPointer, NearPointer, Pointer, PointerId, PointerInfo, PointerKind, Pointers,
};
