use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::builtin::Header;
use crate::MocapMsgAdapter;

// geometry_msgs/Point32 like struct, the point type of sensor_msgs/PointCloud
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct Point32 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point32 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

// sensor_msgs/ChannelFloat32 like struct
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ChannelFloat32 {
    pub name: String,
    pub values: Vec<f32>,
}

/// sensor_msgs/PointCloud like struct.
/// Every channel holds exactly one value per point, in point order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct PointCloud {
    pub header: Header,
    pub points: Vec<Point32>,
    pub channels: Vec<ChannelFloat32>,
}

impl PointCloud {
    /// Empty cloud with the given per-point channels.
    pub fn with_channels<'a>(header: Header, names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            header,
            points: Vec::new(),
            channels: names
                .into_iter()
                .map(|name| ChannelFloat32 {
                    name: name.to_string(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    /// Appends a point with its channel values, given in channel order.
    /// Missing values are padded with 0.0 and extra ones are ignored so channels stay aligned.
    pub fn push(&mut self, point: Point32, values: &[f32]) {
        self.points.push(point);
        for (index, channel) in self.channels.iter_mut().enumerate() {
            channel.values.push(values.get(index).copied().unwrap_or(0.0));
        }
    }

    pub fn channel(&self, name: &str) -> Option<&ChannelFloat32> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl MocapMsgAdapter for PointCloud {
    fn namespace() -> &'static str {
        "sensor_msgs"
    }
}
