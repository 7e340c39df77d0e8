use std::collections::HashSet;

use nalgebra as na;

use crate::error::Error;
use crate::geometry::Polygon;

/// Blue-green-red, the channel order of the frames we annotate.
pub type Color = [u8; 3];

#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub polygon: Polygon,
    pub color: Color,
    pub text_color: Color,
    pub counts: u64,
    pub seen_ids: HashSet<i32>,
    pub dragging: bool,
}

impl Region {
    pub fn new<S: Into<String>>(
        name: S,
        vertices: &[[f32; 2]],
        color: Color,
        text_color: Color,
    ) -> Result<Self, Error> {
        let name = name.into();
        let polygon = Polygon::from_coords(vertices).map_err(|err| match err {
            Error::DegeneratePolygon(vertices) => Error::InvalidRegion {
                name: name.clone(),
                vertices,
            },
            other => other,
        })?;

        Ok(Self {
            name,
            polygon,
            color,
            text_color,
            counts: 0,
            seen_ids: HashSet::new(),
            dragging: false,
        })
    }

    #[inline]
    pub fn contains(&self, p: na::Point2<f32>) -> bool {
        self.polygon.contains(p)
    }

    /// Overlay text, drawn next to the first vertex.
    pub fn label(&self) -> String {
        format!("{}: {}", self.name, self.counts)
    }

    #[inline]
    pub fn label_anchor(&self) -> na::Point2<f32> {
        self.polygon.first()
    }
}

/// The region being dragged and the pointer position the next delta is measured from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragState {
    pub region: usize,
    pub anchor: na::Point2<f32>,
}

/// Regions in registration order. That order is both the draw order and the priority
/// used when a point falls inside several regions.
#[derive(Debug, Clone, Default)]
pub struct RegionRegistry {
    regions: Vec<Region>,
}

impl RegionRegistry {
    pub fn new(regions: Vec<Region>) -> Result<Self, Error> {
        {
            let mut names = HashSet::new();
            for region in &regions {
                if !names.insert(region.name.as_str()) {
                    return Err(Error::DuplicateRegion(region.name.clone()));
                }
            }
        }

        Ok(Self { regions })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Region> {
        self.regions.get(index)
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Region> {
        self.regions.iter()
    }

    #[inline]
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Region> {
        self.regions.iter_mut()
    }

    /// Index of the first region, in registration order, containing `p`.
    pub fn find_region_at(&self, p: na::Point2<f32>) -> Option<usize> {
        self.regions.iter().position(|r| r.contains(p))
    }

    /// Flags `index` as dragging and anchors the drag at `p`.
    ///
    /// Pressing again on a region that is already dragging just restarts the anchor.
    pub fn begin_drag(&mut self, index: usize, p: na::Point2<f32>) -> Option<DragState> {
        let region = self.regions.get_mut(index)?;
        region.dragging = true;

        log::info!("dragging region {:?} from ({}, {})", region.name, p.x, p.y);

        Some(DragState {
            region: index,
            anchor: p,
        })
    }

    /// Moves the dragged region by the pointer delta since the last anchor, then
    /// re-anchors at `p`. Returns `false` when the region is not flagged as dragging.
    pub fn update_drag(&mut self, drag: &mut DragState, p: na::Point2<f32>) -> bool {
        let region = match self.regions.get_mut(drag.region) {
            Some(region) if region.dragging => region,
            _ => return false,
        };

        let delta = p - drag.anchor;
        region.polygon = region.polygon.translate(delta.x, delta.y);
        drag.anchor = p;

        true
    }

    /// Clears the dragging flag of the active region, if there is one.
    pub fn end_drag(&mut self, drag: &mut Option<DragState>) {
        if let Some(state) = drag.take() {
            if let Some(region) = self.regions.get_mut(state.region) {
                if region.dragging {
                    log::info!("released region {:?}", region.name);
                }

                region.dragging = false;
            }
        }
    }

    /// Number of regions currently flagged as dragging; never more than one.
    pub fn dragging_count(&self) -> usize {
        self.regions.iter().filter(|r| r.dragging).count()
    }
}
