use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::builtin::Header;
use crate::MocapMsgAdapter;

// geometry_msgs/Vector3 like struct
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

// geometry_msgs/Point like struct
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<Point> for Vector3 {
    fn from(p: Point) -> Self {
        Vector3::new(p.x, p.y, p.z)
    }
}

// geometry_msgs/Quaternion like struct
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }
}

/// ROS defaults a missing orientation to identity, so do we.
impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// geometry_msgs/Pose like struct
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Pose {
    pub position: Point,
    pub orientation: Quaternion,
}

/// geometry_msgs/PoseStamped extended with the tracking state of the asset.
/// A pose is still sent when tracking was lost for the frame; consumers decide what to do with it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PoseStamped {
    pub header: Header,
    pub pose: Pose,
    pub tracking_valid: bool,
}

impl MocapMsgAdapter for PoseStamped {
    fn namespace() -> &'static str {
        "geometry_msgs"
    }
}

// geometry_msgs/PointStamped like struct
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PointStamped {
    pub header: Header,
    pub point: Point,
}

impl MocapMsgAdapter for PointStamped {
    fn namespace() -> &'static str {
        "geometry_msgs"
    }
}

// geometry_msgs/Transform like struct
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Transform {
    pub translation: Vector3,
    pub rotation: Quaternion,
}

impl From<&Pose> for Transform {
    fn from(pose: &Pose) -> Self {
        Self {
            translation: pose.position.into(),
            rotation: pose.orientation,
        }
    }
}

// geometry_msgs/TransformStamped like struct
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct TransformStamped {
    /// Parent frame and stamp.
    pub header: Header,
    pub child_frame_id: String,
    pub transform: Transform,
}

impl TransformStamped {
    /// The transform that places `child_frame_id` at the given pose in the header's frame.
    pub fn from_pose(pose: &PoseStamped, child_frame_id: impl Into<String>) -> Self {
        Self {
            header: pose.header.clone(),
            child_frame_id: child_frame_id.into(),
            transform: Transform::from(&pose.pose),
        }
    }
}

impl MocapMsgAdapter for TransformStamped {
    fn namespace() -> &'static str {
        "geometry_msgs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::Time;

    #[test]
    fn test_transform_from_pose_keeps_header_and_values() {
        let pose = PoseStamped {
            header: Header::new(Time::new(3, 5), "world"),
            pose: Pose {
                position: Point::new(1.0, -3.0, 2.0),
                orientation: Quaternion::new(0.0, 0.0, 0.7071, 0.7071),
            },
            tracking_valid: true,
        };
        let tf = TransformStamped::from_pose(&pose, "drone1");
        assert_eq!(tf.header, pose.header);
        assert_eq!(tf.child_frame_id, "drone1");
        assert_eq!(tf.transform.translation, Vector3::new(1.0, -3.0, 2.0));
        assert_eq!(tf.transform.rotation, pose.pose.orientation);
    }

    #[test]
    fn test_default_orientation_is_identity() {
        let pose = Pose::default();
        assert_eq!(pose.orientation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_pose_bincode_encoding() {
        let pose = PoseStamped {
            header: Header::new(Time::new(1, 2), "world"),
            pose: Pose::default(),
            tracking_valid: false,
        };
        let encoded = bincode::encode_to_vec(&pose, bincode::config::standard()).unwrap();
        let (decoded, _): (PoseStamped, usize) =
            bincode::decode_from_slice(&encoded, bincode::config::standard()).unwrap();
        assert_eq!(decoded, pose);
    }
}
