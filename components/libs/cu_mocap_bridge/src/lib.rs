//! Bridge from a motion-capture server to ROS-shaped messages.
//!
//! Every frame delivered by the capture client goes through a [`FrameDispatcher`]: registered
//! rigid bodies become poses and transforms, loose markers are followed from frame to frame by the
//! [`MarkerTrackStore`], and every marker of the frame ends up in one point cloud.
//! What happens to the messages afterwards is up to the [`Publisher`] given to the dispatcher.

pub mod builders;
pub mod clock;
pub mod config;
pub mod coords;
pub mod dispatcher;
pub mod emitter;
pub mod error;
pub mod frame;
pub mod logging;
pub mod publisher;
pub mod registry;
pub mod tracker;

pub use clock::FrameClock;
pub use config::{read_configuration, BridgeConfig};
pub use coords::ConsumerPose;
pub use dispatcher::{BridgeContext, FrameDispatcher, FrameReport};
pub use emitter::TransformEmitter;
pub use error::{BridgeError, BridgeResult, PublishError};
pub use frame::{Frame, FrameLatency, Marker, Quat, RigidBody, RigidBodyId, RigidBodyMarker, Vec3};
pub use publisher::{
    LogPublisher, MemoryPublisher, MessageKind, OutboundMessage, PublishedRecord, Publisher,
};
pub use registry::{AssetDescription, AssetRegistry};
pub use tracker::{Assignment, Continuity, MarkerTrackStore, TrackKey};
