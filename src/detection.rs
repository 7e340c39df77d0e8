use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};

/// One box reported by the upstream tracker for a single frame.
///
/// `track_id` is `None` while the tracker has not yet established an identity for the
/// box; such detections are never attributed to a trajectory or a region count.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    #[serde(rename = "box")]
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "c")]
    pub class: i32,
    #[serde(rename = "p", default = "full_confidence")]
    pub confidence: f32,
    #[serde(rename = "id", default)]
    pub track_id: Option<i32>,
}

fn full_confidence() -> f32 {
    1.0
}

impl Detection {
    #[inline]
    pub fn new(bbox: BBox<Ltrb>, class: i32, track_id: Option<i32>) -> Self {
        Self {
            bbox,
            class,
            confidence: 1.0,
            track_id,
        }
    }

    #[inline(always)]
    pub fn center(&self) -> na::Point2<f32> {
        self.bbox.center()
    }

    /// The track identity together with the box center, if the tracker attributed this box.
    #[inline]
    pub fn attributed(&self) -> Option<(i32, na::Point2<f32>)> {
        self.track_id.map(|id| (id, self.center()))
    }
}
