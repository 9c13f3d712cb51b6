//! Bridge configuration.
//! The configuration is serialized in the RON format, with the same extensions as the Copper
//! runtime configuration, so a bridge section can be written next to a Copper graph.

use ron::extensions::Extensions;
use ron::Options;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::read_to_string;
use std::path::Path;
use uom::si::f32::Length;
use uom::si::length::meter;

use crate::error::{BridgeError, BridgeResult};

pub const DEFAULT_GLOBAL_FRAME: &str = "world";
pub const DEFAULT_POINTCLOUD_TOPIC: &str = "pointcloud";
pub const DEFAULT_MAX_DISPLACEMENT_M: f32 = 0.1;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// Parent frame of every transform and frame id of every message.
    pub global_frame: String,
    /// Largest move between two frames for an unlabeled marker to keep its track, in meters.
    pub max_displacement: Length,
    pub publish_rigid_bodies: bool,
    pub publish_rigid_body_markers: bool,
    pub publish_individual_markers: bool,
    pub publish_pointcloud: bool,
    pub pointcloud_topic: String,
    /// Log a summary line per frame.
    pub log_frames: bool,
    /// Log the latencies reported with each frame.
    pub log_latencies: bool,
    /// Stamp messages at mid-exposure instead of reception.
    pub remove_latency: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            global_frame: DEFAULT_GLOBAL_FRAME.to_string(),
            max_displacement: Length::new::<meter>(DEFAULT_MAX_DISPLACEMENT_M),
            publish_rigid_bodies: true,
            publish_rigid_body_markers: false,
            publish_individual_markers: false,
            publish_pointcloud: true,
            pointcloud_topic: DEFAULT_POINTCLOUD_TOPIC.to_string(),
            log_frames: false,
            log_latencies: false,
            remove_latency: false,
        }
    }
}

impl BridgeConfig {
    pub fn max_displacement_m(&self) -> f32 {
        self.max_displacement.get::<meter>()
    }

    pub fn validate(&self) -> BridgeResult<()> {
        if self.global_frame.is_empty() {
            return Err(BridgeError::Config("global_frame cannot be empty".into()));
        }
        if self.pointcloud_topic.is_empty() {
            return Err(BridgeError::Config("pointcloud_topic cannot be empty".into()));
        }
        let max = self.max_displacement_m();
        if !max.is_finite() || max < 0.0 {
            return Err(BridgeError::Config(format!(
                "max_displacement must be a positive length, got {max} m"
            )));
        }
        Ok(())
    }

    pub fn from_ron_str(ron: &str) -> BridgeResult<Self> {
        let config: Self = parse_ron(ron)?;
        config.validate()?;
        Ok(config)
    }

    pub fn serialize_ron(&self) -> BridgeResult<String> {
        let pretty = ron::ser::PrettyConfig::default();
        ron_options()
            .to_string_pretty(self, pretty)
            .map_err(|e| BridgeError::Config(format!("Failed to serialize configuration: {e}")))
    }
}

fn ron_options() -> Options {
    Options::default()
        .with_default_extension(Extensions::IMPLICIT_SOME)
        .with_default_extension(Extensions::UNWRAP_NEWTYPES)
        .with_default_extension(Extensions::UNWRAP_VARIANT_NEWTYPES)
}

/// Shared RON entry point for configuration, asset lists and recorded frames.
pub fn parse_ron<T: DeserializeOwned>(ron: &str) -> BridgeResult<T> {
    ron_options()
        .from_str(ron)
        .map_err(|e| BridgeError::Config(format!("Syntax error: {e}")))
}

pub fn read_ron_file<T: DeserializeOwned>(path: &Path) -> BridgeResult<T> {
    let content = read_to_string(path).map_err(|e| {
        BridgeError::Config(format!("Failed to read {}: {e}", path.display()))
    })?;
    parse_ron(&content)
}

pub fn read_configuration(config_filename: &Path) -> BridgeResult<BridgeConfig> {
    let config: BridgeConfig = read_ron_file(config_filename)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_from_empty_struct() {
        let config = BridgeConfig::from_ron_str("()").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert_eq!(config.global_frame, "world");
        assert!((config.max_displacement_m() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_partial_override() {
        let config = BridgeConfig::from_ron_str(
            r#"(
                global_frame: "mocap",
                max_displacement: 0.05,
                publish_individual_markers: true,
                log_latencies: true,
            )"#,
        )
        .unwrap();
        assert_eq!(config.global_frame, "mocap");
        assert!((config.max_displacement_m() - 0.05).abs() < 1e-6);
        assert!(config.publish_individual_markers);
        assert!(config.publish_pointcloud);
        assert!(config.log_latencies);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(BridgeConfig::from_ron_str(r#"(global_frame: "")"#).is_err());
        assert!(BridgeConfig::from_ron_str("(max_displacement: -1.0)").is_err());
        assert!(BridgeConfig::from_ron_str("(publish_pointcloud: maybe)").is_err());
    }

    #[test]
    fn test_serialize_then_read_from_file() {
        let config = BridgeConfig {
            global_frame: "optitrack".into(),
            publish_rigid_body_markers: true,
            ..Default::default()
        };
        let serialized = config.serialize_ron().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serialized.as_bytes()).unwrap();
        let read_back = read_configuration(file.path()).unwrap();
        assert_eq!(read_back, config);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_configuration(&dir.path().join("missing.ron"));
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }
}
