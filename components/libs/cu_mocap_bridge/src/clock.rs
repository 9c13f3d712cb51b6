use cu_mocap_payloads::Time;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Wall clock and capture clock read at the same instant.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Anchor {
    wall: Duration,
    capture: f64,
}

/// Maps capture-clock timestamps to the local wall clock, using the offset between the two taken
/// at connection time. The offset is never re-estimated: drift between the clocks shows up in the
/// stamps, which is what consumers comparing against their own wall clock expect.
#[derive(Clone, Debug, Default)]
pub struct FrameClock {
    anchor: Option<Anchor>,
}

impl FrameClock {
    /// Anchored on explicit references, typically read during the connection handshake.
    pub fn new(wall_at_connection: Duration, capture_at_connection: f64) -> Self {
        Self {
            anchor: Some(Anchor {
                wall: wall_at_connection,
                capture: capture_at_connection,
            }),
        }
    }

    /// Anchored on the current wall clock.
    pub fn connected_now(capture_at_connection: f64) -> Self {
        Self::new(wall_now(), capture_at_connection)
    }

    /// Anchors itself on the first frame it stamps.
    pub fn unanchored() -> Self {
        Self::default()
    }

    pub fn is_anchored(&self) -> bool {
        self.anchor.is_some()
    }

    /// Wall-clock stamp of a capture timestamp, in seconds.
    pub fn stamp(&mut self, capture: f64) -> Time {
        let anchor = *self.anchor.get_or_insert_with(|| Anchor {
            wall: wall_now(),
            capture,
        });
        Time::from_secs_f64(anchor.wall.as_secs_f64() + (capture - anchor.capture))
    }
}

fn wall_now() -> Duration {
    // A clock set before 1970 is treated as the epoch itself.
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_is_applied() {
        let mut clock = FrameClock::new(Duration::from_secs(1_000), 20.0);
        assert_eq!(clock.stamp(20.0), Time::new(1_000, 0));
        assert_eq!(clock.stamp(21.5), Time::new(1_001, 500_000_000));
        assert_eq!(clock.stamp(19.0), Time::new(999, 0));
    }

    #[test]
    fn test_unanchored_clock_anchors_on_first_frame() {
        let mut clock = FrameClock::unanchored();
        assert!(!clock.is_anchored());
        let first = clock.stamp(5.0);
        assert!(clock.is_anchored());
        let second = clock.stamp(6.0);
        let delta = second.as_secs_f64() - first.as_secs_f64();
        assert!((delta - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_connected_now_stamps_from_connection_time() {
        let before = wall_now();
        let mut clock = FrameClock::connected_now(100.0);
        let after = wall_now();
        assert!(clock.is_anchored());

        let stamp = clock.stamp(102.0).as_secs_f64();
        assert!(stamp >= before.as_secs_f64() + 2.0 - 1e-6);
        assert!(stamp <= after.as_secs_f64() + 2.0 + 1e-6);
    }
}
