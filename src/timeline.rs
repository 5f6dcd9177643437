//! The combined multi-camera timeline.
//!
//! Records from every camera are grouped under their normalized capture time.
//! Each time key holds at most one record per camera; same-camera collisions
//! are resolved by nudging records one second at a time, never by dropping.

use std::collections::BTreeMap;

use crate::camera::Camera;
use crate::record::ImageRecord;
use crate::time::{normalize, NormalizedTime, UtcOffset};

/// Step used when moving a colliding record off its time key.
pub const COLLISION_STEP_MS: i64 = 1000;

/// The records captured at one instant, one per camera at most.
pub type TimelineSlot = BTreeMap<Camera, ImageRecord>;

/// How a record ended up where it is.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// The record sits at its own normalized time.
    Direct,
    /// The previous occupant was moved one step back to make room.
    DisplacedOccupant,
    /// The record was pushed forward by this many steps.
    Deferred(u32),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollisionStats {
    pub displaced_back: usize,
    pub deferred_forward: usize,
}

#[derive(Debug, Default)]
pub struct Timeline {
    slots: BTreeMap<NormalizedTime, TimelineSlot>,
    collisions: CollisionStats,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Places `record` at `t` for its camera, resolving collisions:
    ///
    /// 1. `(t, c)` empty: place there.
    /// 2. `(t - 1s, c)` empty: move the occupant of `(t, c)` there, place at `t`.
    /// 3. otherwise retry the same rule at `t + 1s`.
    pub fn insert(&mut self, t: NormalizedTime, record: ImageRecord) -> Placement {
        let camera = record.camera;
        let mut at = t;
        let mut steps = 0u32;
        loop {
            if !self.is_occupied(at, camera) {
                self.slots.entry(at).or_default().insert(camera, record);
                if steps > 0 {
                    self.collisions.deferred_forward += 1;
                    return Placement::Deferred(steps);
                }
                return Placement::Direct;
            }

            // Once deferred, `at - 1s` is the slot just found occupied.
            let earlier = at.offset_by(-COLLISION_STEP_MS);
            if steps == 0 && !self.is_occupied(earlier, camera) {
                let occupant = self
                    .slots
                    .get_mut(&at)
                    .and_then(|slot| slot.insert(camera, record));
                if let Some(occupant) = occupant {
                    self.slots.entry(earlier).or_default().insert(camera, occupant);
                }
                self.collisions.displaced_back += 1;
                return Placement::DisplacedOccupant;
            }

            at = at.offset_by(COLLISION_STEP_MS);
            steps += 1;
        }
    }

    fn is_occupied(&self, t: NormalizedTime, camera: Camera) -> bool {
        self.slots
            .get(&t)
            .map_or(false, |slot| slot.contains_key(&camera))
    }

    /// Distinct time keys in ascending order.
    pub fn keys(&self) -> Vec<NormalizedTime> {
        self.slots.keys().copied().collect()
    }

    pub fn slot(&self, t: NormalizedTime) -> Option<&TimelineSlot> {
        self.slots.get(&t)
    }

    pub fn get(&self, t: NormalizedTime, camera: Camera) -> Option<&ImageRecord> {
        self.slots.get(&t).and_then(|slot| slot.get(&camera))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NormalizedTime, &TimelineSlot)> {
        self.slots.iter().map(|(t, slot)| (*t, slot))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.slots.values().map(|slot| slot.len()).sum()
    }

    /// Cameras with at least one record, in camera order.
    pub fn cameras(&self) -> Vec<Camera> {
        Camera::ALL
            .into_iter()
            .filter(|c| self.slots.values().any(|slot| slot.contains_key(c)))
            .collect()
    }

    pub fn collisions(&self) -> CollisionStats {
        self.collisions
    }
}

/// Normalizes and groups records into a timeline.
///
/// Collisions are resolved in file-path order, so the result depends only on
/// the set of records, not on the order they were extracted in.
pub fn assemble(mut records: Vec<ImageRecord>, offset: UtcOffset) -> Timeline {
    records.sort_by(|a, b| a.path.cmp(&b.path));
    let mut timeline = Timeline::new();
    for record in records {
        let t = normalize(record.raw_capture_time, offset);
        match timeline.insert(t, record) {
            Placement::Direct => {}
            Placement::DisplacedOccupant => {
                log::debug!("duplicate time {}: moved earlier record back 1s", t)
            }
            Placement::Deferred(steps) => {
                log::debug!("duplicate time {}: record deferred {}s", t, steps)
            }
        }
    }
    timeline
}
