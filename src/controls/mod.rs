//! UI controls driven by pointers: a pressable button and a pinch slider.

pub mod button;
pub mod slider;

pub use button::{ButtonEvent, ButtonState, PressableButton, PushBehavior};
pub use slider::{PinchSlider, SliderEvent, SliderState};

use crate::input::PointerId;

/// The pointer currently holding a control down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressOwner {
    Near(PointerId),
    Far(PointerId),
}

impl PressOwner {
    pub fn pointer(self) -> PointerId {
        match self {
            PressOwner::Near(id) | PressOwner::Far(id) => id,
        }
    }
}

/// At most one pointer, of any kind, can press a control at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PressArbiter {
    owner: Option<PressOwner>,
}

impl PressArbiter {
    /// Succeeds when free or already held by `owner`.
    pub fn try_acquire(&mut self, owner: PressOwner) -> bool {
        match self.owner {
            None => {
                self.owner = Some(owner);
                true
            }
            Some(current) => current == owner,
        }
    }

    /// Frees the press if `owner` holds it.
    pub fn release(&mut self, owner: PressOwner) -> bool {
        if self.owner == Some(owner) {
            self.owner = None;
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) -> Option<PressOwner> {
        self.owner.take()
    }

    pub fn owner(&self) -> Option<PressOwner> {
        self.owner
    }

    pub fn is_free(&self) -> bool {
        self.owner.is_none()
    }

    pub fn is_far_owned(&self) -> bool {
        matches!(self.owner, Some(PressOwner::Far(_)))
    }

    pub fn is_near_owned(&self) -> bool {
        matches!(self.owner, Some(PressOwner::Near(_)))
    }
}
