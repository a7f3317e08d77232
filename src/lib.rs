//! Pointer focus, gesture and manipulation core for hand-driven mixed reality UI.
//!
//! One frame is processed in three phases, in this order:
//!
//! 1. focus: every pointer picks its closest eligible target,
//! 2. gesture: grab, poke and far press edges are raised on the focused targets,
//! 3. manipulation: targets integrate what they received (button travel,
//!    slider values, grabbed object transforms).
//!
//! [`InteractionSystem::tick`] runs all three; the individual phases are public
//! for hosts that need to interleave their own work.

pub mod config;
pub mod config_io;
pub mod controls;
pub mod error;
pub mod event;
pub mod input;
pub mod interaction;
pub mod interactions;
pub mod math;
pub mod scene;

pub use config::InteractionConfig;
pub use error::ConfigError;
pub use interaction::{InteractionContext, InteractionSystem};
pub use scene::{ActorId, PrimitiveId, Scene, SceneQuery, TargetId};
