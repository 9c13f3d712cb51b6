//! Outbound side of the bridge: topic to channel routing and the transform broadcast that goes
//! with every pose.

use cu_mocap_payloads::{PointCloud, PointStamped, PoseStamped, TransformStamped};
use log::debug;
use std::collections::HashMap;

use crate::error::PublishError;
use crate::publisher::{MessageKind, OutboundMessage, Publisher};

/// Routes messages to their channels and keeps pose and transform outputs in step.
/// Channels are advertised the first time a topic is used and reused afterwards.
pub struct TransformEmitter<P: Publisher> {
    publisher: P,
    channels: HashMap<String, P::Channel>,
}

impl<P: Publisher> TransformEmitter<P> {
    pub fn new(publisher: P) -> Self {
        Self {
            publisher,
            channels: HashMap::new(),
        }
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        &mut self.publisher
    }

    pub fn into_publisher(self) -> P {
        self.publisher
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn send(
        &mut self,
        topic: &str,
        kind: MessageKind,
        message: OutboundMessage,
    ) -> Result<(), PublishError> {
        if !self.channels.contains_key(topic) {
            let channel = self.publisher.advertise(topic, kind)?;
            debug!("Advertised {} [{}]", topic, kind.ros_type());
            self.channels.insert(topic.to_string(), channel);
        }
        match self.channels.get(topic) {
            Some(channel) => self.publisher.publish(channel, message),
            None => Err(PublishError::Advertise {
                topic: topic.to_string(),
                reason: "channel vanished after advertising".to_string(),
            }),
        }
    }

    /// Publishes the pose on the asset's channel and broadcasts the matching transform, parent
    /// frame from the pose header and child frame = asset name.
    /// Both are attempted even if the first fails; the first error is returned.
    pub fn emit(&mut self, asset_name: &str, pose: PoseStamped) -> Result<(), PublishError> {
        let transform = TransformStamped::from_pose(&pose, asset_name);
        let published = self.send(asset_name, MessageKind::Pose, OutboundMessage::Pose(pose));
        let broadcast = self.publisher.broadcast_transform(transform);
        published.and(broadcast)
    }

    pub fn emit_point(&mut self, topic: &str, point: PointStamped) -> Result<(), PublishError> {
        self.send(topic, MessageKind::Point, OutboundMessage::Point(point))
    }

    pub fn emit_cloud(&mut self, topic: &str, cloud: PointCloud) -> Result<(), PublishError> {
        self.send(topic, MessageKind::PointCloud, OutboundMessage::PointCloud(cloud))
    }
}
