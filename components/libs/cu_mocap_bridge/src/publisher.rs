//! The publish boundary. The bridge only sees this trait; the actual transport (ROS, Zenoh,
//! a log file...) lives on the other side.

use bincode::config::standard;
use bincode::error::DecodeError;
use bincode::{decode_from_std_read, encode_into_std_write, Decode, Encode};
use cu_mocap_payloads::{
    Header, MocapMsgAdapter, PointCloud, PointStamped, PoseStamped, TransformStamped,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{ErrorKind, Read, Write};

use crate::error::{BridgeResult, PublishError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Encode, Decode)]
pub enum MessageKind {
    Pose,
    Point,
    PointCloud,
}

impl MessageKind {
    pub fn ros_type(&self) -> String {
        match self {
            MessageKind::Pose => PoseStamped::ros_type(),
            MessageKind::Point => PointStamped::ros_type(),
            MessageKind::PointCloud => PointCloud::ros_type(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum OutboundMessage {
    Pose(PoseStamped),
    Point(PointStamped),
    PointCloud(PointCloud),
}

impl OutboundMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            OutboundMessage::Pose(_) => MessageKind::Pose,
            OutboundMessage::Point(_) => MessageKind::Point,
            OutboundMessage::PointCloud(_) => MessageKind::PointCloud,
        }
    }

    pub fn header(&self) -> &Header {
        match self {
            OutboundMessage::Pose(msg) => &msg.header,
            OutboundMessage::Point(msg) => &msg.header,
            OutboundMessage::PointCloud(msg) => &msg.header,
        }
    }
}

/// Fire-and-forget sink for the messages produced by the bridge.
/// Implementations must not block: motion data that cannot go out now is worthless later.
pub trait Publisher {
    /// Handle to an advertised channel.
    type Channel;

    /// Declares a channel. Called once per topic, the first time the bridge needs it.
    fn advertise(&mut self, topic: &str, kind: MessageKind) -> Result<Self::Channel, PublishError>;

    fn publish(
        &mut self,
        channel: &Self::Channel,
        message: OutboundMessage,
    ) -> Result<(), PublishError>;

    /// Sends one record to the shared transform broadcast.
    fn broadcast_transform(&mut self, transform: TransformStamped) -> Result<(), PublishError>;
}

/// Everything a publisher was asked to do, in order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub enum PublishedRecord {
    Advertised { topic: String, kind: MessageKind },
    Message { topic: String, message: OutboundMessage },
    Transform(TransformStamped),
}

/// Keeps every record in memory. Used for replays and tests.
/// Topics can be set to reject messages to exercise the failure paths.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    records: Vec<PublishedRecord>,
    rejected_topics: HashSet<String>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages on this topic will fail with [`PublishError::Rejected`].
    pub fn reject(&mut self, topic: impl Into<String>) {
        self.rejected_topics.insert(topic.into());
    }

    pub fn records(&self) -> &[PublishedRecord] {
        &self.records
    }

    pub fn drain(&mut self) -> Vec<PublishedRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn messages_on<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a OutboundMessage> {
        self.records.iter().filter_map(move |record| match record {
            PublishedRecord::Message { topic: t, message } if t == topic => Some(message),
            _ => None,
        })
    }

    pub fn poses_on<'a>(&'a self, topic: &'a str) -> impl Iterator<Item = &'a PoseStamped> {
        self.messages_on(topic).filter_map(|message| match message {
            OutboundMessage::Pose(pose) => Some(pose),
            _ => None,
        })
    }

    pub fn point_clouds(&self) -> impl Iterator<Item = &PointCloud> {
        self.records.iter().filter_map(|record| match record {
            PublishedRecord::Message {
                message: OutboundMessage::PointCloud(cloud),
                ..
            } => Some(cloud),
            _ => None,
        })
    }

    pub fn transforms(&self) -> impl Iterator<Item = &TransformStamped> {
        self.records.iter().filter_map(|record| match record {
            PublishedRecord::Transform(tf) => Some(tf),
            _ => None,
        })
    }

    pub fn advertised_topics(&self) -> impl Iterator<Item = &str> {
        self.records.iter().filter_map(|record| match record {
            PublishedRecord::Advertised { topic, .. } => Some(topic.as_str()),
            _ => None,
        })
    }
}

impl Publisher for MemoryPublisher {
    type Channel = String;

    fn advertise(&mut self, topic: &str, kind: MessageKind) -> Result<Self::Channel, PublishError> {
        self.records.push(PublishedRecord::Advertised {
            topic: topic.to_string(),
            kind,
        });
        Ok(topic.to_string())
    }

    fn publish(
        &mut self,
        channel: &Self::Channel,
        message: OutboundMessage,
    ) -> Result<(), PublishError> {
        if self.rejected_topics.contains(channel) {
            return Err(PublishError::Rejected {
                topic: channel.clone(),
                reason: "topic is set to reject".to_string(),
            });
        }
        self.records.push(PublishedRecord::Message {
            topic: channel.clone(),
            message,
        });
        Ok(())
    }

    fn broadcast_transform(&mut self, transform: TransformStamped) -> Result<(), PublishError> {
        self.records.push(PublishedRecord::Transform(transform));
        Ok(())
    }
}

/// Appends the records to `dst`, one bincode entry each. Returns the number of bytes written.
pub fn write_records(records: &[PublishedRecord], mut dst: impl Write) -> BridgeResult<usize> {
    let mut written = 0;
    for record in records {
        written += encode_into_std_write(record, &mut dst, standard())?;
    }
    dst.flush()?;
    Ok(written)
}

/// Reads back records written by [`write_records`] until the end of `src`.
pub fn read_records(mut src: impl Read) -> BridgeResult<Vec<PublishedRecord>> {
    let mut records = Vec::new();
    loop {
        match decode_from_std_read::<PublishedRecord, _, _>(&mut src, standard()) {
            Ok(record) => records.push(record),
            Err(DecodeError::UnexpectedEnd { .. }) => break,
            Err(DecodeError::Io { inner, .. }) if inner.kind() == ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(records)
}

/// Writes every message to the debug log and drops it.
#[derive(Debug, Default)]
pub struct LogPublisher {
    published: u64,
}

impl LogPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> u64 {
        self.published
    }
}

impl Publisher for LogPublisher {
    type Channel = String;

    fn advertise(&mut self, topic: &str, kind: MessageKind) -> Result<Self::Channel, PublishError> {
        debug!("Advertising {} [{}]", topic, kind.ros_type());
        Ok(topic.to_string())
    }

    fn publish(
        &mut self,
        channel: &Self::Channel,
        message: OutboundMessage,
    ) -> Result<(), PublishError> {
        self.published += 1;
        match &message {
            OutboundMessage::Pose(pose) => debug!(
                "{} @{}: position ({:.4}, {:.4}, {:.4}) valid={}",
                channel,
                pose.header.stamp,
                pose.pose.position.x,
                pose.pose.position.y,
                pose.pose.position.z,
                pose.tracking_valid
            ),
            OutboundMessage::Point(point) => debug!(
                "{} @{}: point ({:.4}, {:.4}, {:.4})",
                channel, point.header.stamp, point.point.x, point.point.y, point.point.z
            ),
            OutboundMessage::PointCloud(cloud) => debug!(
                "{} @{}: {} points",
                channel,
                cloud.header.stamp,
                cloud.len()
            ),
        }
        Ok(())
    }

    fn broadcast_transform(&mut self, transform: TransformStamped) -> Result<(), PublishError> {
        self.published += 1;
        debug!(
            "tf {} -> {} @{}",
            transform.header.frame_id, transform.child_frame_id, transform.header.stamp
        );
        Ok(())
    }
}
