use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::detection::Detection;
use crate::error::Error;
use crate::history::TrackHistory;
use crate::region::RegionRegistry;

/// How presence inside a region turns into a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountingPolicy {
    /// +1 for every frame an object's center is inside the region.
    #[default]
    PerFrame,
    /// +1 the first time a track identity is seen inside the region.
    OncePerObject,
}

impl FromStr for CountingPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "per_frame" => Ok(CountingPolicy::PerFrame),
            "once_per_object" | "once" => Ok(CountingPolicy::OncePerObject),
            _ => Err(Error::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for CountingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountingPolicy::PerFrame => f.write_str("per_frame"),
            CountingPolicy::OncePerObject => f.write_str("once_per_object"),
        }
    }
}

/// Final count of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionCount {
    pub name: String,
    pub count: u64,
}

impl fmt::Display for RegionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Region: {}, count: {}", self.name, self.count)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub attributed: usize,
    pub unattributed: usize,
    /// `(region index, track id)` for every increment made this frame.
    pub increments: Vec<(usize, i32)>,
}

/// Per-frame reconciliation of tracker output with trajectories and region counts.
#[derive(Debug, Clone)]
pub struct Counter {
    policy: CountingPolicy,
    regions: RegionRegistry,
    history: TrackHistory,
    frame: u64,
}

impl Counter {
    pub fn new(regions: RegionRegistry, history: TrackHistory, policy: CountingPolicy) -> Self {
        Self {
            policy,
            regions,
            history,
            frame: 0,
        }
    }

    #[inline]
    pub fn policy(&self) -> CountingPolicy {
        self.policy
    }

    #[inline]
    pub fn regions(&self) -> &RegionRegistry {
        &self.regions
    }

    #[inline]
    pub fn regions_mut(&mut self) -> &mut RegionRegistry {
        &mut self.regions
    }

    #[inline]
    pub fn history(&self) -> &TrackHistory {
        &self.history
    }

    /// Frames processed so far.
    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn process(&mut self, detections: &[Detection]) -> FrameReport {
        self.frame += 1;
        self.history.begin_frame(self.frame);

        let mut report = FrameReport {
            frame: self.frame,
            ..Default::default()
        };

        for det in detections {
            let (track_id, center) = match det.attributed() {
                Some(attributed) => attributed,
                None => {
                    log::trace!("frame {}: skipping box without track id", self.frame);
                    report.unattributed += 1;
                    continue;
                }
            };

            report.attributed += 1;
            self.history.record(track_id, center);

            for (idx, region) in self.regions.iter_mut().enumerate() {
                if !region.contains(center) {
                    continue;
                }

                let counted = match self.policy {
                    CountingPolicy::PerFrame => true,
                    CountingPolicy::OncePerObject => region.seen_ids.insert(track_id),
                };

                if counted {
                    region.counts += 1;
                    report.increments.push((idx, track_id));

                    log::debug!(
                        "frame {}: track {} counted in {:?} ({})",
                        self.frame,
                        track_id,
                        region.name,
                        region.counts
                    );
                }
            }
        }

        self.history.evict_idle();

        report
    }

    pub fn summary(&self) -> Vec<RegionCount> {
        self.regions
            .iter()
            .map(|r| RegionCount {
                name: r.name.clone(),
                count: r.counts,
            })
            .collect()
    }
}
