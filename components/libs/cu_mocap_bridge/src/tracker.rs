//! Continuity of loose markers across consecutive frames.
//!
//! The store remembers where each track key was seen in the previous frame and nothing older.
//! A marker is considered the same physical marker as in the previous frame when it moved less
//! than the configured maximum displacement, either under its own key or, failing that, compared
//! to the nearest unlabeled position of the previous frame that nobody claimed yet.
//! Keys always come from the frame itself; the store never makes up identities.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use uom::si::f32::Length;
use uom::si::length::meter;

use crate::frame::Vec3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackKey {
    /// Labeled marker, keyed by the id assigned by the capture server.
    Id(u32),
    /// Unlabeled marker, keyed by its rank among the unlabeled markers of the frame.
    Slot(u32),
}

impl Display for TrackKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKey::Id(id) => write!(f, "marker{id}"),
            TrackKey::Slot(slot) => write!(f, "unlabeled{slot}"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Continuity {
    /// Nothing close enough in the previous frame and no history under this key.
    FirstSighting,
    /// Same marker as `matched` in the previous frame.
    Continuous { matched: TrackKey, distance: f32 },
    /// Seen under this key before, but too far away to be the same marker.
    Jump { distance: f32 },
}

impl Continuity {
    pub fn is_continuous(&self) -> bool {
        matches!(self, Continuity::Continuous { .. })
    }
}

/// Outcome of [`MarkerTrackStore::assign`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Assignment {
    /// Track the marker now belongs to.
    pub track: Option<TrackKey>,
    pub continuity: Continuity,
}

#[derive(Clone, Copy, Debug)]
struct TrackRecord {
    position: Vec3,
    generation: u64,
}

#[derive(Clone, Debug)]
pub struct MarkerTrackStore {
    max_displacement: f32,
    records: BTreeMap<TrackKey, TrackRecord>,
    generation: u64,
}

impl MarkerTrackStore {
    pub fn new(max_displacement: Length) -> Self {
        Self {
            max_displacement: max_displacement.get::<meter>(),
            records: BTreeMap::new(),
            generation: 0,
        }
    }

    pub fn max_displacement(&self) -> Length {
        Length::new::<meter>(self.max_displacement)
    }

    /// Last committed position for this key.
    pub fn update(&self, key: TrackKey) -> Option<Vec3> {
        self.records.get(&key).map(|record| record.position)
    }

    /// Compares `position` with what the previous frame left under `key`, or failing that, for an
    /// unlabeled marker, with the nearest unlabeled record of the previous frame nobody claimed
    /// yet. Labeled markers only ever match their own id.
    pub fn continuity(&self, key: TrackKey, position: Vec3) -> Continuity {
        let keyed = self
            .records
            .get(&key)
            .filter(|record| record.generation < self.generation)
            .map(|record| record.position.distance(&position));
        if let Some(distance) = keyed {
            if distance <= self.max_displacement {
                return Continuity::Continuous {
                    matched: key,
                    distance,
                };
            }
        }

        if let TrackKey::Slot(_) = key {
            if let Some((matched, distance)) = self.nearest(position, key) {
                if distance <= self.max_displacement {
                    return Continuity::Continuous { matched, distance };
                }
            }
        }

        match keyed {
            Some(distance) => Continuity::Jump { distance },
            None => Continuity::FirstSighting,
        }
    }

    /// Nearest unlabeled record of the previous frame, other than `except`, not already committed
    /// during the current one.
    pub fn nearest(&self, position: Vec3, except: TrackKey) -> Option<(TrackKey, f32)> {
        self.records
            .iter()
            .filter(|(key, record)| {
                matches!(key, TrackKey::Slot(_))
                    && **key != except
                    && record.generation < self.generation
            })
            .map(|(key, record)| (*key, record.position.distance(&position)))
            .filter(|(_, distance)| distance.is_finite())
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// True once `key` has been committed during the current frame.
    pub fn is_claimed(&self, key: TrackKey) -> bool {
        self.records
            .get(&key)
            .is_some_and(|record| record.generation == self.generation)
    }

    /// Decides the continuity of a marker seen under `key` and commits its position under the
    /// track it belongs to: the matched track when it kept one, its own key otherwise.
    /// A marker that lost its track while its own key was already claimed in this frame is not
    /// remembered.
    pub fn assign(&mut self, key: TrackKey, position: Vec3) -> Assignment {
        let continuity = self.continuity(key, position);
        let track = match continuity {
            Continuity::Continuous { matched, .. } => Some(matched),
            _ if self.is_claimed(key) => None,
            _ => Some(key),
        };
        if let Some(track) = track {
            self.commit(track, position);
        }
        Assignment { track, continuity }
    }

    /// Overwrites the position of this key, whatever the continuity decision was.
    pub fn commit(&mut self, key: TrackKey, position: Vec3) {
        self.records.insert(
            key,
            TrackRecord {
                position,
                generation: self.generation,
            },
        );
    }

    /// Forgets every key that was not committed during the frame that just ended.
    pub fn end_frame(&mut self) {
        let current = self.generation;
        self.records.retain(|_, record| record.generation == current);
        self.generation += 1;
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
