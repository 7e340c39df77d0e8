use std::collections::HashMap;

use nalgebra as na;
use serde_derive::Deserialize;

use crate::circular_queue::CircularQueue;

pub const DEFAULT_TRAJECTORY_LEN: usize = 30;

/// What to do with trajectories of identities the tracker stopped reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EvictionPolicy {
    /// Keep every trajectory for the lifetime of the session.
    #[default]
    Never,
    /// Drop a trajectory once it has not been updated for more than this many frames.
    IdleFrames(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub capacity: usize,
    pub max_idle_frames: Option<u64>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_TRAJECTORY_LEN,
            max_idle_frames: None,
        }
    }
}

impl HistoryConfig {
    pub fn eviction(&self) -> EvictionPolicy {
        match self.max_idle_frames {
            Some(frames) => EvictionPolicy::IdleFrames(frames),
            None => EvictionPolicy::Never,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Trajectory {
    points: CircularQueue<na::Point2<f32>>,
    last_seen: u64,
}

impl Trajectory {
    fn new(capacity: usize, frame: u64) -> Self {
        Self {
            points: CircularQueue::with_capacity(capacity),
            last_seen: frame,
        }
    }

    /// Points in arrival order, oldest first.
    #[inline]
    pub fn points(&self) -> impl DoubleEndedIterator<Item = &na::Point2<f32>> + ExactSizeIterator {
        self.points.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn latest(&self) -> Option<&na::Point2<f32>> {
        self.points.latest()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.points.capacity()
    }

    #[inline]
    pub fn last_seen(&self) -> u64 {
        self.last_seen
    }
}

/// Bounded per-identity trajectories keyed by tracker identity.
#[derive(Debug, Clone)]
pub struct TrackHistory {
    capacity: usize,
    eviction: EvictionPolicy,
    frame: u64,
    tracks: HashMap<i32, Trajectory>,
}

impl Default for TrackHistory {
    fn default() -> Self {
        Self::new(DEFAULT_TRAJECTORY_LEN)
    }
}

impl TrackHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            eviction: EvictionPolicy::Never,
            frame: 0,
            tracks: HashMap::new(),
        }
    }

    pub fn from_config(config: &HistoryConfig) -> Self {
        Self::new(config.capacity).with_eviction(config.eviction())
    }

    pub fn with_eviction(mut self, eviction: EvictionPolicy) -> Self {
        self.eviction = eviction;
        self
    }

    #[inline]
    pub fn eviction(&self) -> EvictionPolicy {
        self.eviction
    }

    /// Appends `point` to the trajectory of `track_id`, creating it on first sighting.
    pub fn record(&mut self, track_id: i32, point: na::Point2<f32>) -> &Trajectory {
        let (capacity, frame) = (self.capacity, self.frame);
        let trajectory = self
            .tracks
            .entry(track_id)
            .or_insert_with(|| Trajectory::new(capacity, frame));

        trajectory.points.push(point);
        trajectory.last_seen = frame;

        trajectory
    }

    #[inline]
    pub fn get(&self, track_id: i32) -> Option<&Trajectory> {
        self.tracks.get(&track_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Sets the frame that subsequent [`record`](Self::record) calls are stamped with.
    #[inline]
    pub fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
    }

    /// Applies the eviction policy once the current frame's points are recorded.
    /// Returns the number of trajectories dropped.
    pub fn evict_idle(&mut self) -> usize {
        let frame = self.frame;

        match self.eviction {
            EvictionPolicy::Never => 0,
            EvictionPolicy::IdleFrames(max_idle) => {
                let before = self.tracks.len();
                self.tracks
                    .retain(|_, t| frame.saturating_sub(t.last_seen) <= max_idle);

                let evicted = before - self.tracks.len();
                if evicted > 0 {
                    log::debug!("evicted {} idle trajectories at frame {}", evicted, frame);
                }

                evicted
            }
        }
    }
}
