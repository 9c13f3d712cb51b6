//! Typed view of one capture-server frame.
//! The transport fills these structs once per callback; the dispatcher validates them at the
//! boundary and never looks at raw SDK data.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{BridgeError, BridgeResult};

pub type RigidBodyId = i32;

/// Position in meters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Orientation quaternion, scalar last.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite() && self.w.is_finite()
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

fn tracking_valid_default() -> bool {
    true
}

/// A marker listed under its rigid body.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RigidBodyMarker {
    #[serde(default)]
    pub id: Option<u32>,
    pub position: Vec3,
    /// Marker diameter in meters.
    #[serde(default)]
    pub size: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidBody {
    pub id: RigidBodyId,
    pub position: Vec3,
    #[serde(default)]
    pub orientation: Quat,
    #[serde(default = "tracking_valid_default")]
    pub tracking_valid: bool,
    #[serde(default)]
    pub mean_error: f32,
    /// Constituent markers, in the order the server lists them.
    #[serde(default)]
    pub markers: Vec<RigidBodyMarker>,
}

impl RigidBody {
    pub fn new(id: RigidBodyId, position: Vec3, orientation: Quat) -> Self {
        Self {
            id,
            position,
            orientation,
            tracking_valid: true,
            mean_error: 0.0,
            markers: Vec::new(),
        }
    }
}

/// A marker that does not belong to any rigid body.
/// Labeled markers carry an id, unlabeled ones do not.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    #[serde(default)]
    pub id: Option<u32>,
    pub position: Vec3,
    #[serde(default)]
    pub size: f32,
    #[serde(default)]
    pub residual: f32,
}

impl Marker {
    pub fn unlabeled(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    pub fn labeled(id: u32, position: Vec3) -> Self {
        Self {
            id: Some(id),
            position,
            ..Default::default()
        }
    }

    pub fn is_labeled(&self) -> bool {
        self.id.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub id: i32,
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBody>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ForcePlate {
    pub id: i32,
    #[serde(default)]
    pub channels: Vec<Vec<f32>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: i32,
    #[serde(default)]
    pub channels: Vec<Vec<f32>>,
}

/// Latency figures reported along with the frame, in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameLatency {
    /// Camera mid-exposure to transmit on the server.
    pub system: f64,
    /// Camera data received to transmit on the server.
    pub software: f64,
    /// Transmit on the server to reception on the client.
    pub transit: f64,
}

impl FrameLatency {
    /// Mid-exposure to reception on the client.
    pub fn total(&self) -> f64 {
        self.system + self.transit
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub frame_number: u32,
    /// Capture clock, in seconds.
    pub timestamp: f64,
    #[serde(default)]
    pub rigid_bodies: Vec<RigidBody>,
    #[serde(default)]
    pub markers: Vec<Marker>,
    #[serde(default)]
    pub skeletons: Vec<Skeleton>,
    #[serde(default)]
    pub force_plates: Vec<ForcePlate>,
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub latency: Option<FrameLatency>,
}

impl Frame {
    pub fn new(frame_number: u32, timestamp: f64) -> Self {
        Self {
            frame_number,
            timestamp,
            ..Default::default()
        }
    }

    /// Rigid-body constituents plus loose markers.
    pub fn marker_count(&self) -> usize {
        self.rigid_bodies
            .iter()
            .map(|body| body.markers.len())
            .sum::<usize>()
            + self.markers.len()
    }

    /// Frame-level checks. Per-asset value problems are left to the builders so that one bad
    /// asset does not cost the whole frame.
    pub fn validate(&self) -> BridgeResult<()> {
        let malformed = |reason: String| BridgeError::MalformedFrame {
            frame: self.frame_number,
            reason,
        };

        if !self.timestamp.is_finite() || self.timestamp < 0.0 {
            return Err(malformed(format!("invalid timestamp {}", self.timestamp)));
        }

        if let Some(latency) = &self.latency {
            if !latency.total().is_finite() {
                return Err(malformed("non-finite latency".to_string()));
            }
        }

        let mut seen = HashSet::with_capacity(self.rigid_bodies.len());
        for body in &self.rigid_bodies {
            if !seen.insert(body.id) {
                return Err(malformed(format!("rigid body {} listed twice", body.id)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_count_includes_constituents() {
        let mut frame = Frame::new(1, 0.5);
        let mut body = RigidBody::new(1, Vec3::default(), Quat::IDENTITY);
        body.markers = vec![RigidBodyMarker::default(); 3];
        frame.rigid_bodies.push(body);
        frame.markers.push(Marker::unlabeled(Vec3::new(1.0, 0.0, 0.0)));
        assert_eq!(frame.marker_count(), 4);
    }

    #[test]
    fn test_validate_rejects_duplicate_rigid_bodies() {
        let mut frame = Frame::new(12, 1.0);
        frame
            .rigid_bodies
            .push(RigidBody::new(3, Vec3::default(), Quat::IDENTITY));
        frame
            .rigid_bodies
            .push(RigidBody::new(3, Vec3::default(), Quat::IDENTITY));
        match frame.validate() {
            Err(BridgeError::MalformedFrame { frame, reason }) => {
                assert_eq!(frame, 12);
                assert!(reason.contains("listed twice"));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_bad_timestamp() {
        assert!(Frame::new(1, f64::NAN).validate().is_err());
        assert!(Frame::new(1, -1.0).validate().is_err());
        assert!(Frame::new(1, 0.0).validate().is_ok());
    }

    #[test]
    fn test_distance() {
        let a = Vec3::new(5.0, 5.0, 5.0);
        let b = Vec3::new(5.01, 5.01, 5.01);
        assert!((a.distance(&b) - 0.017_320_5).abs() < 1e-4);
        assert!(!Vec3::new(f32::NAN, 0.0, 0.0).is_finite());
    }
}
