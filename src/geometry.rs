use nalgebra as na;

use crate::error::Error;

const EDGE_EPSILON: f32 = 1e-4;

/// A simple closed polygon stored as an open ring of at least three vertices.
///
/// Behavior on self-intersecting rings is unspecified.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<na::Point2<f32>>,
}

impl Polygon {
    pub fn new(mut vertices: Vec<na::Point2<f32>>) -> Result<Self, Error> {
        // rings given closed (first == last) are stored open
        if vertices.len() > 1 && vertices.first() == vertices.last() {
            vertices.pop();
        }

        if vertices.len() < 3 {
            return Err(Error::DegeneratePolygon(vertices.len()));
        }

        Ok(Self { vertices })
    }

    pub fn from_coords(coords: &[[f32; 2]]) -> Result<Self, Error> {
        Self::new(coords.iter().map(|&[x, y]| na::Point2::new(x, y)).collect())
    }

    #[inline]
    pub fn vertices(&self) -> &[na::Point2<f32>] {
        &self.vertices
    }

    #[inline]
    pub fn first(&self) -> na::Point2<f32> {
        self.vertices[0]
    }

    #[inline]
    pub fn contains(&self, p: na::Point2<f32>) -> bool {
        contains(&self.vertices, p)
    }

    /// Rigid translation, every vertex shifted by `(dx, dy)`.
    pub fn translate(&self, dx: f32, dy: f32) -> Polygon {
        let offset = na::Vector2::new(dx, dy);

        Polygon {
            vertices: self.vertices.iter().map(|v| *v + offset).collect(),
        }
    }

    pub fn approx_eq(&self, other: &Polygon, tolerance: f32) -> bool {
        self.vertices.len() == other.vertices.len()
            && self
                .vertices
                .iter()
                .zip(other.vertices.iter())
                .all(|(a, b)| na::distance(a, b) <= tolerance)
    }
}

fn edges(poly: &[na::Point2<f32>]) -> impl Iterator<Item = (na::Point2<f32>, na::Point2<f32>)> + '_ {
    let n = poly.len();

    (0..n).map(move |i| (poly[i], poly[(i + 1) % n]))
}

fn on_segment(p: na::Point2<f32>, a: na::Point2<f32>, b: na::Point2<f32>) -> bool {
    let ab = b - a;
    let ap = p - a;
    let cross = ab.x * ap.y - ab.y * ap.x;

    if cross.abs() > EDGE_EPSILON * ab.norm().max(1.0) {
        return false;
    }

    p.x >= a.x.min(b.x) - EDGE_EPSILON
        && p.x <= a.x.max(b.x) + EDGE_EPSILON
        && p.y >= a.y.min(b.y) - EDGE_EPSILON
        && p.y <= a.y.max(b.y) + EDGE_EPSILON
}

/// Even-odd containment; points lying on an edge count as inside.
pub fn contains(poly: &[na::Point2<f32>], p: na::Point2<f32>) -> bool {
    if poly.len() < 3 {
        return false;
    }

    if edges(poly).any(|(a, b)| on_segment(p, a, b)) {
        return true;
    }

    let mut inside = false;

    for (p1, p2) in edges(poly) {
        if (p1.y > p.y) != (p2.y > p.y) {
            let xints = (p.y - p1.y) * (p2.x - p1.x) / (p2.y - p1.y) + p1.x;

            if p.x < xints {
                inside = !inside;
            }
        }
    }

    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::from_coords(&[[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0]]).unwrap()
    }

    #[test]
    fn square_containment() {
        let poly = square();

        assert!(poly.contains(na::Point2::new(5.0, 5.0)));
        assert!(!poly.contains(na::Point2::new(15.0, 5.0)));
        assert!(!poly.contains(na::Point2::new(5.0, -0.5)));
    }

    #[test]
    fn boundary_counts_as_inside() {
        let poly = square();

        assert!(poly.contains(na::Point2::new(0.0, 5.0)));
        assert!(poly.contains(na::Point2::new(10.0, 10.0)));
        assert!(poly.contains(na::Point2::new(5.0, 0.0)));
    }

    #[test]
    fn concave_polygon() {
        // U shape opening upwards
        let poly = Polygon::from_coords(&[
            [0.0, 0.0],
            [30.0, 0.0],
            [30.0, 30.0],
            [20.0, 30.0],
            [20.0, 10.0],
            [10.0, 10.0],
            [10.0, 30.0],
            [0.0, 30.0],
        ])
        .unwrap();

        assert!(poly.contains(na::Point2::new(5.0, 20.0)));
        assert!(poly.contains(na::Point2::new(25.0, 20.0)));
        assert!(!poly.contains(na::Point2::new(15.0, 20.0)));
        assert!(poly.contains(na::Point2::new(15.0, 5.0)));
    }

    #[test]
    fn translate_round_trip() {
        let poly = Polygon::from_coords(&[[50.0, 80.0], [250.0, 20.0], [450.0, 80.0], [400.0, 350.0]])
            .unwrap();
        let moved = poly.translate(13.5, -7.25);

        assert!(!moved.approx_eq(&poly, 1e-3));
        assert!(moved.translate(-13.5, 7.25).approx_eq(&poly, 1e-3));
        assert_eq!(moved.first(), na::Point2::new(63.5, 72.75));
    }

    #[test]
    fn rejects_degenerate_rings() {
        assert!(matches!(
            Polygon::from_coords(&[[0.0, 0.0], [1.0, 1.0]]),
            Err(Error::DegeneratePolygon(2))
        ));
        // closing vertex does not count
        assert!(matches!(
            Polygon::from_coords(&[[0.0, 0.0], [1.0, 1.0], [0.0, 0.0]]),
            Err(Error::DegeneratePolygon(2))
        ));
    }

    #[test]
    fn closed_ring_is_stored_open() {
        let poly =
            Polygon::from_coords(&[[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 0.0]]).unwrap();

        assert_eq!(poly.vertices().len(), 3);
    }
}
