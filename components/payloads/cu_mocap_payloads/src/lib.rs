pub mod builtin;
pub mod geometry_msgs;
pub mod sensor_msgs;

pub use builtin::{Header, Time};
pub use geometry_msgs::{
    Point, Pose, PoseStamped, PointStamped, Quaternion, Transform, TransformStamped, Vector3,
};
pub use sensor_msgs::{ChannelFloat32, Point32, PointCloud};

// By default use the Rust type name as the ROS type name
#[macro_export]
macro_rules! mocap_type_name {
    ($t:ty) => {{
        let full = std::any::type_name::<$t>();
        full.rsplit("::").next().unwrap_or(full)
    }};
}

/// Names the ROS message a payload stands for.
/// The namespace relates to the ROS package (such as "geometry_msgs")
/// and the type name is the same as the message filename.
pub trait MocapMsgAdapter {
    /// The namespace of the ROS message, such as "geometry_msgs" or "sensor_msgs".
    fn namespace() -> &'static str;

    /// The type name of the ROS message, such as "PoseStamped" or "PointCloud".
    fn type_name() -> &'static str
    where
        Self: Sized,
    {
        mocap_type_name!(Self)
    }

    /// Fully qualified "namespace/TypeName" form used when advertising a topic.
    fn ros_type() -> String
    where
        Self: Sized,
    {
        format!("{}/{}", Self::namespace(), Self::type_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_type_info() {
        assert_eq!(PoseStamped::namespace(), "geometry_msgs");
        assert_eq!(PoseStamped::type_name(), "PoseStamped");
        assert_eq!(PointCloud::ros_type(), "sensor_msgs/PointCloud");
        assert_eq!(TransformStamped::ros_type(), "geometry_msgs/TransformStamped");
    }
}
