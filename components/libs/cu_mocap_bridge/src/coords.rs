//! Axis convention change between the capture system (Y up) and the consumers (Z up, x forward,
//! right handed, as in ROS REP-103).
//! The change is a +90° rotation about X: (x, y, z) -> (x, -z, y). Quaternions are rotated the
//! same way on their vector part, the scalar part is unchanged.

use crate::frame::{Quat, Vec3};

/// Position and orientation expressed in the consumer convention.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConsumerPose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl ConsumerPose {
    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

pub fn position_to_consumer(p: Vec3) -> Vec3 {
    Vec3::new(p.x, -p.z, p.y)
}

pub fn orientation_to_consumer(q: Quat) -> Quat {
    Quat::new(q.x, -q.z, q.y, q.w)
}

pub fn to_consumer(position: Vec3, orientation: Quat) -> ConsumerPose {
    ConsumerPose {
        position: position_to_consumer(position),
        orientation: orientation_to_consumer(orientation),
    }
}

pub fn position_to_capture(p: Vec3) -> Vec3 {
    Vec3::new(p.x, p.z, -p.y)
}

pub fn orientation_to_capture(q: Quat) -> Quat {
    Quat::new(q.x, q.z, -q.y, q.w)
}

/// Inverse of [`to_consumer`].
pub fn to_capture(pose: ConsumerPose) -> (Vec3, Quat) {
    (
        position_to_capture(pose.position),
        orientation_to_capture(pose.orientation),
    )
}
