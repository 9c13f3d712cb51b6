//! Outbound message construction. Builders take values already converted to the consumer
//! convention and fail only on values that cannot be published (non-finite coordinates).

use cu_mocap_payloads::{
    Header, Point, Point32, PointCloud, PointStamped, Pose, PoseStamped, Quaternion,
};

use crate::coords::ConsumerPose;
use crate::error::{BridgeError, BridgeResult};
use crate::frame::{Quat, Vec3};
use crate::tracker::TrackKey;

pub const SIZE_CHANNEL: &str = "size";
pub const LABELED_CHANNEL: &str = "labeled";

fn point(p: Vec3) -> Point {
    Point::new(p.x as f64, p.y as f64, p.z as f64)
}

/// Lost bodies come with an all-zero quaternion, which is not a rotation.
fn quaternion(q: Quat) -> Quaternion {
    let norm_squared = q.x * q.x + q.y * q.y + q.z * q.z + q.w * q.w;
    if norm_squared < 1e-12 {
        return Quaternion::IDENTITY;
    }
    Quaternion::new(q.x as f64, q.y as f64, q.z as f64, q.w as f64)
}

pub fn to_pose(p: &ConsumerPose) -> Pose {
    Pose {
        position: point(p.position),
        orientation: quaternion(p.orientation),
    }
}

/// Pose of a registered rigid body.
/// When tracking is lost the message still goes out, flagged, holding the last valid pose if
/// there is one.
pub fn rigid_body_pose(
    header: &Header,
    name: &str,
    current: &ConsumerPose,
    tracking_valid: bool,
    last_valid: Option<&Pose>,
) -> BridgeResult<PoseStamped> {
    let pose = match (tracking_valid, last_valid) {
        (false, Some(held)) => *held,
        _ if current.is_finite() => to_pose(current),
        _ => {
            return Err(BridgeError::NonFinite {
                asset: name.to_string(),
            })
        }
    };
    Ok(PoseStamped {
        header: header.clone(),
        pose,
        tracking_valid,
    })
}

/// Channel of the marker at `index` in the marker list of rigid body `name`.
pub fn marker_channel(name: &str, index: usize) -> String {
    format!("{name}/marker{index}")
}

pub fn rigid_body_marker_point(
    header: &Header,
    name: &str,
    index: usize,
    position: Vec3,
) -> BridgeResult<PointStamped> {
    if !position.is_finite() {
        return Err(BridgeError::NonFinite {
            asset: marker_channel(name, index),
        });
    }
    Ok(PointStamped {
        header: header.clone(),
        point: point(position),
    })
}

/// Pose of a loose marker that kept its track. Markers have no orientation.
pub fn tracked_marker_pose(
    header: &Header,
    key: TrackKey,
    position: Vec3,
) -> BridgeResult<PoseStamped> {
    if !position.is_finite() {
        return Err(BridgeError::NonFinite {
            asset: key.to_string(),
        });
    }
    Ok(PoseStamped {
        header: header.clone(),
        pose: Pose {
            position: point(position),
            orientation: Quaternion::IDENTITY,
        },
        tracking_valid: true,
    })
}

/// Collects every marker of one frame into a single cloud.
/// A new accumulator is started for each frame; nothing carries over.
#[derive(Debug)]
pub struct PointCloudAccumulator {
    cloud: PointCloud,
}

impl PointCloudAccumulator {
    pub fn new(header: Header) -> Self {
        Self {
            cloud: PointCloud::with_channels(header, [SIZE_CHANNEL, LABELED_CHANNEL]),
        }
    }

    /// Non-finite points are kept so the cloud always holds every marker of the frame.
    pub fn append(&mut self, position: Vec3, size: f32, labeled: bool) {
        let labeled = if labeled { 1.0 } else { 0.0 };
        self.cloud.push(
            Point32::new(position.x, position.y, position.z),
            &[size, labeled],
        );
    }

    pub fn len(&self) -> usize {
        self.cloud.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cloud.is_empty()
    }

    pub fn finish(self) -> PointCloud {
        self.cloud
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cu_mocap_payloads::Time;

    fn header() -> Header {
        Header::new(Time::new(10, 0), "world")
    }

    fn consumer(x: f32, y: f32, z: f32) -> ConsumerPose {
        ConsumerPose {
            position: Vec3::new(x, y, z),
            orientation: Quat::IDENTITY,
        }
    }

    #[test]
    fn test_valid_rigid_body_pose() {
        let msg = rigid_body_pose(&header(), "drone1", &consumer(1.0, -3.0, 2.0), true, None)
            .unwrap();
        assert_eq!(msg.header, header());
        assert!(msg.tracking_valid);
        assert_eq!(msg.pose.position, Point::new(1.0, -3.0, 2.0));
        assert_eq!(msg.pose.orientation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_lost_tracking_holds_last_valid_pose() {
        let held = to_pose(&consumer(4.0, 5.0, 6.0));
        let msg = rigid_body_pose(
            &header(),
            "drone1",
            &consumer(0.0, 0.0, 0.0),
            false,
            Some(&held),
        )
        .unwrap();
        assert!(!msg.tracking_valid);
        assert_eq!(msg.pose, held);
    }

    #[test]
    fn test_lost_tracking_without_history_uses_current_values() {
        let msg =
            rigid_body_pose(&header(), "drone1", &consumer(1.0, 1.0, 1.0), false, None).unwrap();
        assert!(!msg.tracking_valid);
        assert_eq!(msg.pose.position, Point::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_lost_tracking_zero_quaternion_becomes_identity() {
        let lost = ConsumerPose {
            position: Vec3::new(1.0, 1.0, 1.0),
            orientation: Quat::new(0.0, 0.0, 0.0, 0.0),
        };
        let msg = rigid_body_pose(&header(), "drone1", &lost, false, None).unwrap();
        assert!(!msg.tracking_valid);
        assert_eq!(msg.pose.orientation, Quaternion::IDENTITY);
    }

    #[test]
    fn test_non_finite_values_fail() {
        let bad = consumer(f32::NAN, 0.0, 0.0);
        assert!(matches!(
            rigid_body_pose(&header(), "drone1", &bad, true, None),
            Err(BridgeError::NonFinite { .. })
        ));
        assert!(rigid_body_marker_point(&header(), "drone1", 0, bad.position).is_err());
        assert!(tracked_marker_pose(&header(), TrackKey::Slot(0), bad.position).is_err());
    }

    #[test]
    fn test_marker_channel() {
        assert_eq!(marker_channel("drone1", 2), "drone1/marker2");
    }

    #[test]
    fn test_accumulator() {
        let mut acc = PointCloudAccumulator::new(header());
        assert!(acc.is_empty());
        acc.append(Vec3::new(1.0, 2.0, 3.0), 0.014, true);
        acc.append(Vec3::new(f32::NAN, 0.0, 0.0), 0.01, false);
        assert_eq!(acc.len(), 2);
        let cloud = acc.finish();
        assert_eq!(cloud.header, header());
        assert_eq!(cloud.channel(LABELED_CHANNEL).unwrap().values, vec![1.0, 0.0]);
        assert_eq!(cloud.channel(SIZE_CHANNEL).unwrap().values, vec![0.014, 0.01]);
    }
}
