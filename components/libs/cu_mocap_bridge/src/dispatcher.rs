//! Per-frame orchestration.
//!
//! The transport calls [`FrameDispatcher::on_frame`] once per frame, serially, and all the work
//! happens synchronously inside that call: rigid bodies first, then loose markers, then the point
//! cloud. A problem with one asset costs only that asset; a malformed frame costs only that frame.

use cu_mocap_payloads::{Header, Pose, Time};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use uom::si::length::meter;

use crate::builders::{self, PointCloudAccumulator};
use crate::clock::FrameClock;
use crate::config::BridgeConfig;
use crate::coords;
use crate::emitter::TransformEmitter;
use crate::error::{BridgeError, BridgeResult, PublishError};
use crate::frame::{Frame, FrameLatency, Marker, RigidBody, RigidBodyId, Vec3};
use crate::publisher::Publisher;
use crate::registry::AssetRegistry;
use crate::tracker::{Continuity, MarkerTrackStore, TrackKey};

/// State carried from one frame to the next, owned by the host and built once at startup.
pub struct BridgeContext {
    config: BridgeConfig,
    registry: AssetRegistry,
    tracks: MarkerTrackStore,
    /// Last pose of each rigid body seen with valid tracking.
    held_poses: HashMap<RigidBodyId, Pose>,
    clock: FrameClock,
    frames_processed: u64,
}

impl BridgeContext {
    pub fn new(
        config: BridgeConfig,
        registry: AssetRegistry,
        clock: FrameClock,
    ) -> BridgeResult<Self> {
        config.validate()?;
        let tracks = MarkerTrackStore::new(config.max_displacement);
        Ok(Self {
            config,
            registry,
            tracks,
            held_poses: HashMap::new(),
            clock,
            frames_processed: 0,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    pub fn tracks(&self) -> &MarkerTrackStore {
        &self.tracks
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    fn frame_stamp(&mut self, frame: &Frame) -> Time {
        let mut capture = frame.timestamp;
        if self.config.remove_latency {
            if let Some(latency) = &frame.latency {
                capture -= latency.system;
            }
        }
        self.clock.stamp(capture)
    }
}

/// What happened to one frame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub frame_number: u32,
    pub rigid_bodies_published: usize,
    pub rigid_bodies_skipped: usize,
    pub marker_points_published: usize,
    /// Loose markers that kept their track from the previous frame.
    pub markers_tracked: usize,
    pub cloud_points: usize,
    /// Assets dropped because their message could not be built.
    pub asset_failures: usize,
    pub publish_failures: usize,
}

/// Borrowed state for the duration of one frame.
struct FrameScope<'a, P: Publisher> {
    config: &'a BridgeConfig,
    emitter: &'a mut TransformEmitter<P>,
    header: Header,
    cloud: PointCloudAccumulator,
    report: FrameReport,
}

impl<P: Publisher> FrameScope<'_, P> {
    fn rigid_body(
        &mut self,
        registry: &AssetRegistry,
        held_poses: &mut HashMap<RigidBodyId, Pose>,
        body: &RigidBody,
    ) {
        let name = match registry.resolve(body.id) {
            Ok(name) => name,
            Err(e) => {
                warn!("Frame {}: {}, skipped", self.report.frame_number, e);
                self.report.rigid_bodies_skipped += 1;
                // its markers are still part of the frame's cloud
                for marker in &body.markers {
                    let position = coords::position_to_consumer(marker.position);
                    self.cloud.append(position, marker.size, marker.id.is_some());
                }
                return;
            }
        };

        let current = coords::to_consumer(body.position, body.orientation);
        if !body.tracking_valid {
            debug!("{name}: tracking lost, mean error {}", body.mean_error);
        }

        if self.config.publish_rigid_bodies {
            match builders::rigid_body_pose(
                &self.header,
                name,
                &current,
                body.tracking_valid,
                held_poses.get(&body.id),
            ) {
                Ok(pose) => {
                    if body.tracking_valid {
                        held_poses.insert(body.id, pose.pose);
                    }
                    match self.emitter.emit(name, pose) {
                        Ok(()) => self.report.rigid_bodies_published += 1,
                        Err(e) => self.publish_failed(e),
                    }
                }
                Err(e) => self.asset_failed(e),
            }
        }

        for (index, marker) in body.markers.iter().enumerate() {
            let position = coords::position_to_consumer(marker.position);
            if self.config.publish_rigid_body_markers {
                match builders::rigid_body_marker_point(&self.header, name, index, position) {
                    Ok(point) => {
                        let topic = builders::marker_channel(name, index);
                        match self.emitter.emit_point(&topic, point) {
                            Ok(()) => self.report.marker_points_published += 1,
                            Err(e) => self.publish_failed(e),
                        }
                    }
                    Err(e) => self.asset_failed(e),
                }
            }
            self.cloud.append(position, marker.size, marker.id.is_some());
        }
    }

    fn loose_markers(&mut self, tracks: &mut MarkerTrackStore, markers: &[Marker]) {
        let mut next_slot = 0;
        for marker in markers {
            let key = match marker.id {
                Some(id) => TrackKey::Id(id),
                None => {
                    let key = TrackKey::Slot(next_slot);
                    next_slot += 1;
                    key
                }
            };
            let position = coords::position_to_consumer(marker.position);

            if position.is_finite() {
                let assignment = tracks.assign(key, position);
                match (assignment.continuity, assignment.track) {
                    (Continuity::Continuous { distance, .. }, Some(track)) => {
                        debug!(
                            "{key}: {track} moved {distance:.4} m, residual {:.5}",
                            marker.residual
                        );
                        self.report.markers_tracked += 1;
                        if self.config.publish_individual_markers {
                            self.tracked_marker(track, position);
                        }
                    }
                    (Continuity::Jump { distance }, _) => debug!(
                        "{key}: jumped {distance:.4} m, over {:.4} m",
                        tracks.max_displacement().get::<meter>()
                    ),
                    (_, None) => debug!("{key}: no free track"),
                    _ => {}
                }
            } else {
                self.asset_failed(BridgeError::NonFinite {
                    asset: key.to_string(),
                });
            }

            self.cloud.append(position, marker.size, marker.is_labeled());
        }
        tracks.end_frame();
    }

    fn tracked_marker(&mut self, key: TrackKey, position: Vec3) {
        match builders::tracked_marker_pose(&self.header, key, position) {
            Ok(pose) => {
                if let Err(e) = self.emitter.emit(&key.to_string(), pose) {
                    self.publish_failed(e);
                }
            }
            Err(e) => self.asset_failed(e),
        }
    }

    fn finish(mut self) -> FrameReport {
        self.report.cloud_points = self.cloud.len();
        if self.config.publish_pointcloud {
            let cloud = self.cloud.finish();
            if let Err(e) = self.emitter.emit_cloud(&self.config.pointcloud_topic, cloud) {
                warn!("Frame {}: point cloud dropped: {}", self.report.frame_number, e);
                self.report.publish_failures += 1;
            }
        }
        self.report
    }

    fn asset_failed(&mut self, e: BridgeError) {
        warn!("Frame {}: {}, skipped", self.report.frame_number, e);
        self.report.asset_failures += 1;
    }

    fn publish_failed(&mut self, e: PublishError) {
        warn!("Frame {}: {}", self.report.frame_number, e);
        self.report.publish_failures += 1;
    }
}

pub struct FrameDispatcher<P: Publisher> {
    ctx: BridgeContext,
    emitter: TransformEmitter<P>,
}

impl<P: Publisher> FrameDispatcher<P> {
    pub fn new(ctx: BridgeContext, publisher: P) -> Self {
        Self {
            ctx,
            emitter: TransformEmitter::new(publisher),
        }
    }

    pub fn context(&self) -> &BridgeContext {
        &self.ctx
    }

    pub fn publisher(&self) -> &P {
        self.emitter.publisher()
    }

    pub fn publisher_mut(&mut self) -> &mut P {
        self.emitter.publisher_mut()
    }

    pub fn into_parts(self) -> (BridgeContext, P) {
        (self.ctx, self.emitter.into_publisher())
    }

    /// Callback entry point. Never fails: a malformed frame is logged and dropped.
    pub fn on_frame(&mut self, frame: &Frame) -> Option<FrameReport> {
        match self.process(frame) {
            Ok(report) => Some(report),
            Err(e) => {
                error!("{e}");
                None
            }
        }
    }

    /// Processes one frame. Only frame-level problems are returned as errors; per-asset and
    /// publish problems are logged and counted in the report.
    pub fn process(&mut self, frame: &Frame) -> BridgeResult<FrameReport> {
        frame.validate()?;

        if self.ctx.config.log_latencies {
            if let Some(latency) = &frame.latency {
                log_latency(frame.frame_number, latency);
            }
        }

        let stamp = self.ctx.frame_stamp(frame);
        let header = Header::new(stamp, self.ctx.config.global_frame.clone());
        let BridgeContext {
            config,
            registry,
            tracks,
            held_poses,
            ..
        } = &mut self.ctx;

        let mut scope = FrameScope {
            config,
            emitter: &mut self.emitter,
            cloud: PointCloudAccumulator::new(header.clone()),
            header,
            report: FrameReport {
                frame_number: frame.frame_number,
                ..Default::default()
            },
        };

        for body in &frame.rigid_bodies {
            scope.rigid_body(registry, held_poses, body);
        }
        scope.loose_markers(tracks, &frame.markers);
        let report = scope.finish();

        self.ctx.frames_processed += 1;
        if self.ctx.config.log_frames {
            info!(
                "Frame {} @{}: {} rigid bodies ({} skipped), {} tracked markers, {} cloud points, {} skeletons, {} force plates, {} devices",
                frame.frame_number,
                stamp,
                report.rigid_bodies_published,
                report.rigid_bodies_skipped,
                report.markers_tracked,
                report.cloud_points,
                frame.skeletons.len(),
                frame.force_plates.len(),
                frame.devices.len(),
            );
        }
        Ok(report)
    }
}

fn log_latency(frame_number: u32, latency: &FrameLatency) {
    info!(
        "Frame {}: system {:.2} ms, software {:.2} ms, transit {:.2} ms, total {:.2} ms",
        frame_number,
        latency.system * 1e3,
        latency.software * 1e3,
        latency.transit * 1e3,
        latency.total() * 1e3,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Quat, RigidBodyMarker};
    use crate::publisher::MemoryPublisher;
    use crate::registry::AssetDescription;
    use std::time::Duration;

    fn dispatcher(config: BridgeConfig) -> FrameDispatcher<MemoryPublisher> {
        let registry = AssetRegistry::new([AssetDescription::new(7, "drone1")]).unwrap();
        let clock = FrameClock::new(Duration::from_secs(100), 0.0);
        let ctx = BridgeContext::new(config, registry, clock).unwrap();
        FrameDispatcher::new(ctx, MemoryPublisher::new())
    }

    #[test]
    fn test_lost_tracking_publishes_held_pose() {
        let mut dispatcher = dispatcher(BridgeConfig::default());

        let mut frame = Frame::new(1, 0.0);
        frame
            .rigid_bodies
            .push(RigidBody::new(7, Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY));
        dispatcher.process(&frame).unwrap();

        let mut lost = Frame::new(2, 0.01);
        let mut body = RigidBody::new(7, Vec3::default(), Quat::new(0.0, 0.0, 0.0, 0.0));
        body.tracking_valid = false;
        lost.rigid_bodies.push(body);
        let report = dispatcher.process(&lost).unwrap();
        assert_eq!(report.rigid_bodies_published, 1);

        let poses: Vec<_> = dispatcher.publisher().poses_on("drone1").collect();
        assert_eq!(poses.len(), 2);
        assert!(!poses[1].tracking_valid);
        assert_eq!(poses[1].pose, poses[0].pose);
        assert!(poses[1].header.stamp > poses[0].header.stamp);
    }

    #[test]
    fn test_rigid_body_marker_points() {
        let config = BridgeConfig {
            publish_rigid_body_markers: true,
            ..Default::default()
        };
        let mut dispatcher = dispatcher(config);

        let mut frame = Frame::new(1, 0.0);
        let mut body = RigidBody::new(7, Vec3::default(), Quat::IDENTITY);
        body.markers = vec![
            RigidBodyMarker {
                id: Some(1),
                position: Vec3::new(0.0, 1.0, 0.0),
                size: 0.014,
            },
            RigidBodyMarker {
                id: Some(2),
                position: Vec3::new(1.0, 0.0, 0.0),
                size: 0.014,
            },
        ];
        frame.rigid_bodies.push(body);
        let report = dispatcher.process(&frame).unwrap();
        assert_eq!(report.marker_points_published, 2);
        assert_eq!(report.cloud_points, 2);

        let publisher = dispatcher.publisher();
        let first: Vec<_> = publisher.messages_on("drone1/marker0").collect();
        assert_eq!(first.len(), 1);
        match first[0] {
            crate::publisher::OutboundMessage::Point(p) => {
                // capture Y up is consumer Z up
                assert_eq!(p.point.z, 1.0);
                assert_eq!(p.header.frame_id, "world");
            }
            other => panic!("unexpected message {other:?}"),
        }
        assert_eq!(publisher.messages_on("drone1/marker1").count(), 1);
    }

    #[test]
    fn test_latency_removal_moves_stamp_back() {
        let config = BridgeConfig {
            remove_latency: true,
            log_latencies: true,
            ..Default::default()
        };
        let mut dispatcher = dispatcher(config);
        let mut frame = Frame::new(1, 1.0);
        frame.latency = Some(FrameLatency {
            system: 0.004,
            software: 0.001,
            transit: 0.001,
        });
        dispatcher.process(&frame).unwrap();

        let cloud = dispatcher.publisher().point_clouds().next().unwrap();
        let expected = 100.0 + 1.0 - 0.004;
        assert!((cloud.header.stamp.as_secs_f64() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_malformed_frame_is_dropped() {
        let mut dispatcher = dispatcher(BridgeConfig::default());
        let mut frame = Frame::new(9, 0.0);
        frame
            .rigid_bodies
            .push(RigidBody::new(7, Vec3::default(), Quat::IDENTITY));
        frame
            .rigid_bodies
            .push(RigidBody::new(7, Vec3::default(), Quat::IDENTITY));

        assert!(matches!(
            dispatcher.process(&frame),
            Err(BridgeError::MalformedFrame { frame: 9, .. })
        ));
        assert_eq!(dispatcher.on_frame(&frame), None);
        assert!(dispatcher.publisher().records().is_empty());
        assert_eq!(dispatcher.context().frames_processed(), 0);
    }

    #[test]
    fn test_disabled_outputs() {
        let config = BridgeConfig {
            publish_rigid_bodies: false,
            publish_pointcloud: false,
            ..Default::default()
        };
        let mut dispatcher = dispatcher(config);
        let mut frame = Frame::new(1, 0.0);
        frame
            .rigid_bodies
            .push(RigidBody::new(7, Vec3::default(), Quat::IDENTITY));
        frame.markers.push(Marker::unlabeled(Vec3::default()));

        let report = dispatcher.on_frame(&frame).unwrap();
        assert_eq!(report.rigid_bodies_published, 0);
        assert_eq!(report.cloud_points, 1);
        assert!(dispatcher.publisher().records().is_empty());
    }

    #[test]
    fn test_cloud_labels_follow_marker_ids() {
        let mut dispatcher = dispatcher(BridgeConfig::default());
        let mut frame = Frame::new(1, 0.0);
        let mut body = RigidBody::new(7, Vec3::default(), Quat::IDENTITY);
        body.markers = vec![
            RigidBodyMarker {
                id: Some(11),
                position: Vec3::default(),
                size: 0.01,
            },
            RigidBodyMarker {
                id: None,
                position: Vec3::default(),
                size: 0.01,
            },
        ];
        frame.rigid_bodies.push(body);
        let mut stranger = RigidBody::new(42, Vec3::default(), Quat::IDENTITY);
        stranger.markers = vec![RigidBodyMarker::default()];
        frame.rigid_bodies.push(stranger);
        frame.markers.push(Marker::labeled(3, Vec3::default()));

        dispatcher.process(&frame).unwrap();
        let cloud = dispatcher.publisher().point_clouds().next().unwrap();
        assert_eq!(
            cloud.channel(builders::LABELED_CHANNEL).unwrap().values,
            vec![1.0, 0.0, 0.0, 1.0]
        );
    }
}
