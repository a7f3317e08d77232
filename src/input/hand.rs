use glam::{Affine3A, Quat, Vec3A};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumCount, EnumIter, EnumString};

use crate::config::GraspConfig;

#[repr(u8)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Hand joints in tracker order.
#[repr(u8)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    AsRefStr,
)]
pub enum HandJoint {
    Palm,
    Wrist,
    ThumbMetacarpal,
    ThumbProximal,
    ThumbDistal,
    ThumbTip,
    IndexMetacarpal,
    IndexProximal,
    IndexIntermediate,
    IndexDistal,
    IndexTip,
    MiddleMetacarpal,
    MiddleProximal,
    MiddleIntermediate,
    MiddleDistal,
    MiddleTip,
    RingMetacarpal,
    RingProximal,
    RingIntermediate,
    RingDistal,
    RingTip,
    LittleMetacarpal,
    LittleProximal,
    LittleIntermediate,
    LittleDistal,
    LittleTip,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub orientation: Quat,
    pub position: Vec3A,
    pub radius: f32,
}

impl JointPose {
    pub fn new(orientation: Quat, position: Vec3A, radius: f32) -> Self {
        Self {
            orientation,
            position,
            radius,
        }
    }

    pub fn transform(&self) -> Affine3A {
        Affine3A::from_rotation_translation(self.orientation, self.position.into())
    }
}

/// Per-frame hand state. Implementations poll the device once at the start
/// of the frame; a hand reported as tracked stays tracked until the next poll.
pub trait HandTracker {
    fn joint_state(&self, hand: Hand, joint: HandJoint) -> Option<JointPose>;

    /// Pose of the far pointer ray, pointing along its local -Z.
    fn pointer_pose(&self, hand: Hand) -> Option<Affine3A>;

    fn is_grabbing(&self, hand: Hand) -> Option<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraspEvent {
    Started,
    Ended,
}

/// Pinch detection on the thumb and index tips, with separate start and
/// end distances.
#[derive(Debug, Clone)]
pub struct GraspDetector {
    pub start_distance: f32,
    pub end_distance: f32,
    grasped: bool,
}

impl GraspDetector {
    pub fn new(config: &GraspConfig) -> Self {
        Self {
            start_distance: config.start_distance,
            end_distance: config.end_distance,
            grasped: false,
        }
    }

    pub fn is_grasped(&self) -> bool {
        self.grasped
    }

    pub fn reset(&mut self) {
        self.grasped = false;
    }

    pub fn update(&mut self, index_tip: Vec3A, thumb_tip: Vec3A) -> Option<GraspEvent> {
        let distance = index_tip.distance(thumb_tip);
        if !self.grasped && distance < self.start_distance {
            self.grasped = true;
            Some(GraspEvent::Started)
        } else if self.grasped && distance > self.end_distance {
            self.grasped = false;
            Some(GraspEvent::Ended)
        } else {
            None
        }
    }
}

#[derive(Clone)]
struct SimulatedHand {
    tracked: bool,
    joints: [JointPose; HandJoint::COUNT],
    pointer_pose: Option<Affine3A>,
    grab_override: Option<bool>,
    grasp: GraspDetector,
}

/// Scripted hand input, for the simulator binary and tests.
pub struct SimulatedHandTracker {
    hands: [SimulatedHand; 2],
}

const DEFAULT_JOINT_RADIUS: f32 = 0.008;

impl SimulatedHandTracker {
    pub fn new(config: &GraspConfig) -> Self {
        let hand = SimulatedHand {
            tracked: false,
            joints: [JointPose::new(Quat::IDENTITY, Vec3A::ZERO, DEFAULT_JOINT_RADIUS);
                HandJoint::COUNT],
            pointer_pose: None,
            grab_override: None,
            grasp: GraspDetector::new(config),
        };
        Self {
            hands: [hand.clone(), hand],
        }
    }

    pub fn set_tracked(&mut self, hand: Hand, tracked: bool) {
        let h = &mut self.hands[hand.index()];
        h.tracked = tracked;
        if !tracked {
            h.grasp.reset();
        }
    }

    pub fn set_joint(&mut self, hand: Hand, joint: HandJoint, pose: JointPose) {
        self.hands[hand.index()].joints[joint as usize] = pose;
    }

    pub fn set_pointer_pose(&mut self, hand: Hand, pose: Option<Affine3A>) {
        self.hands[hand.index()].pointer_pose = pose;
    }

    /// Forces the grab state instead of deriving it from the pinch distance.
    pub fn set_grabbing(&mut self, hand: Hand, grabbing: Option<bool>) {
        self.hands[hand.index()].grab_override = grabbing;
    }

    /// Places index and thumb tips `gap` apart around `center`, both facing `rotation`.
    pub fn place_pinch(&mut self, hand: Hand, center: Vec3A, rotation: Quat, gap: f32) {
        let side = rotation * Vec3A::X * (gap * 0.5);
        self.set_tracked(hand, true);
        self.set_joint(
            hand,
            HandJoint::IndexTip,
            JointPose::new(rotation, center + side, DEFAULT_JOINT_RADIUS),
        );
        self.set_joint(
            hand,
            HandJoint::ThumbTip,
            JointPose::new(rotation, center - side, DEFAULT_JOINT_RADIUS),
        );
    }

    /// Updates derived state; call once per frame after moving the joints.
    pub fn poll(&mut self) -> [Option<GraspEvent>; 2] {
        self.hands.each_mut().map(|h| {
            if !h.tracked {
                return None;
            }
            let index = h.joints[HandJoint::IndexTip as usize].position;
            let thumb = h.joints[HandJoint::ThumbTip as usize].position;
            h.grasp.update(index, thumb)
        })
    }
}

impl HandTracker for SimulatedHandTracker {
    fn joint_state(&self, hand: Hand, joint: HandJoint) -> Option<JointPose> {
        let h = &self.hands[hand.index()];
        h.tracked.then(|| h.joints[joint as usize])
    }

    fn pointer_pose(&self, hand: Hand) -> Option<Affine3A> {
        let h = &self.hands[hand.index()];
        if !h.tracked {
            return None;
        }
        h.pointer_pose
    }

    fn is_grabbing(&self, hand: Hand) -> Option<bool> {
        let h = &self.hands[hand.index()];
        if !h.tracked {
            return None;
        }
        Some(h.grab_override.unwrap_or(h.grasp.is_grasped()))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    fn detector() -> GraspDetector {
        GraspDetector::new(&GraspConfig::default())
    }

    #[test]
    fn grasp_hysteresis() {
        let mut grasp = detector();
        let thumb = Vec3A::ZERO;

        assert_eq!(grasp.update(Vec3A::X * 0.03, thumb), None);
        assert_eq!(grasp.update(Vec3A::X * 0.015, thumb), Some(GraspEvent::Started));
        // in between both thresholds the state holds
        assert_eq!(grasp.update(Vec3A::X * 0.03, thumb), None);
        assert!(grasp.is_grasped());
        assert_eq!(grasp.update(Vec3A::X * 0.05, thumb), Some(GraspEvent::Ended));
        assert_eq!(grasp.update(Vec3A::X * 0.03, thumb), None);
        assert!(!grasp.is_grasped());
    }

    #[test]
    fn joint_names_round_trip() {
        assert_eq!(HandJoint::iter().count(), 26);
        assert_eq!(HandJoint::from_str("IndexTip").unwrap(), HandJoint::IndexTip);
        assert_eq!(HandJoint::LittleTip as usize, HandJoint::COUNT - 1);
    }

    #[test]
    fn untracked_hand_reports_nothing() {
        let mut hands = SimulatedHandTracker::new(&GraspConfig::default());
        assert!(hands.joint_state(Hand::Left, HandJoint::IndexTip).is_none());
        assert!(hands.is_grabbing(Hand::Left).is_none());

        hands.place_pinch(Hand::Left, Vec3A::ZERO, Quat::IDENTITY, 0.01);
        let events = hands.poll();
        assert_eq!(events[Hand::Left.index()], Some(GraspEvent::Started));
        assert_eq!(events[Hand::Right.index()], None);
        assert_eq!(hands.is_grabbing(Hand::Left), Some(true));

        hands.set_tracked(Hand::Left, false);
        assert!(hands.pointer_pose(Hand::Left).is_none());
        assert!(hands.is_grabbing(Hand::Left).is_none());
    }
}
