//! Planar geometry helpers shared by flattening, validation and layout.

use nalgebra::{Point2, Vector2};

/// Axis-aligned bounding box in the pattern plane (millimeters).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundingBox2 {
    /// Minimum corner.
    pub min: Point2<f64>,
    /// Maximum corner.
    pub max: Point2<f64>,
}

impl BoundingBox2 {
    /// Create a bounding box from two corners, ordering them per axis.
    pub fn new(a: Point2<f64>, b: Point2<f64>) -> Self {
        Self {
            min: Point2::new(a.x.min(b.x), a.y.min(b.y)),
            max: Point2::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Bounding box of a point set, or `None` if it is empty.
    pub fn from_points(points: &[Point2<f64>]) -> Option<Self> {
        let first = points.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self { min, max })
    }

    /// Extent along x.
    #[inline]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Extent along y.
    #[inline]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Width times height.
    #[inline]
    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Whether two boxes share any point (touching counts).
    pub fn intersects(&self, other: &BoundingBox2) -> bool {
        self.min.x <= other.max.x
            && other.min.x <= self.max.x
            && self.min.y <= other.max.y
            && other.min.y <= self.max.y
    }

    /// The box shifted by `(dx, dy)`.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        let offset = Vector2::new(dx, dy);
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }
}

/// Twice the signed area of triangle `(a, b, c)`; positive when counter-clockwise.
#[inline]
pub fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)
}

/// Signed area of triangle `(a, b, c)`.
#[inline]
pub fn triangle_signed_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    0.5 * orient2d(a, b, c)
}

/// Signed area of a closed polygon (shoelace); positive when counter-clockwise.
pub fn polygon_signed_area(polygon: &[Point2<f64>]) -> f64 {
    let n = polygon.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice = 0.0;
    for i in 0..n {
        let p = polygon[i];
        let q = polygon[(i + 1) % n];
        twice += p.x * q.y - q.x * p.y;
    }
    0.5 * twice
}

/// Arithmetic mean of the polygon vertices.
pub fn vertex_centroid(polygon: &[Point2<f64>]) -> Option<Point2<f64>> {
    if polygon.is_empty() {
        return None;
    }
    let sum = polygon
        .iter()
        .fold(Vector2::zeros(), |acc, p| acc + p.coords);
    Some(Point2::from(sum / polygon.len() as f64))
}

/// Segment intersection by the parametric cross-product test.
///
/// Solves `p + t·r = q + u·s`; the segments intersect when both `t` and `u`
/// lie in `[0, 1]`. Parallel segments (including collinear overlap) are
/// reported as not intersecting.
pub fn segments_intersect(
    p1: &Point2<f64>,
    p2: &Point2<f64>,
    q1: &Point2<f64>,
    q2: &Point2<f64>,
) -> bool {
    let r = p2 - p1;
    let s = q2 - q1;
    let denom = r.perp(&s);
    if denom.abs() < 1e-12 {
        return false;
    }
    let qp = q1 - p1;
    let t = qp.perp(&s) / denom;
    let u = qp.perp(&r) / denom;
    (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)
}

/// Point-in-polygon by ray casting along +x.
///
/// Points exactly on the boundary may land on either side.
pub fn point_in_polygon(point: &Point2<f64>, polygon: &[Point2<f64>]) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = polygon[i];
        let b = polygon[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Whether two closed polygons overlap.
///
/// True when any pair of edges crosses, when a vertex of one lies inside the
/// other, or when either vertex centroid lies inside the other polygon (which
/// catches coincident outlines).
pub fn polygons_overlap(a: &[Point2<f64>], b: &[Point2<f64>]) -> bool {
    if a.len() < 3 || b.len() < 3 {
        return false;
    }
    for i in 0..a.len() {
        let a1 = a[i];
        let a2 = a[(i + 1) % a.len()];
        for j in 0..b.len() {
            if segments_intersect(&a1, &a2, &b[j], &b[(j + 1) % b.len()]) {
                return true;
            }
        }
    }
    if a.iter().any(|p| point_in_polygon(p, b)) || b.iter().any(|p| point_in_polygon(p, a)) {
        return true;
    }
    match (vertex_centroid(a), vertex_centroid(b)) {
        (Some(ca), Some(cb)) => point_in_polygon(&ca, b) || point_in_polygon(&cb, a),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Vec<Point2<f64>> {
        vec![
            Point2::new(x, y),
            Point2::new(x + size, y),
            Point2::new(x + size, y + size),
            Point2::new(x, y + size),
        ]
    }

    #[test]
    fn test_bounding_box() {
        let bbox = BoundingBox2::from_points(&square(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(bbox.min, Point2::new(1.0, 2.0));
        assert_eq!(bbox.max, Point2::new(4.0, 5.0));
        assert!((bbox.area() - 9.0).abs() < 1e-12);
        assert!(BoundingBox2::from_points(&[]).is_none());

        let moved = bbox.translated(10.0, 0.0);
        assert!(!bbox.intersects(&moved));
        assert!(bbox.intersects(&bbox.translated(3.0, 0.0)));
    }

    #[test]
    fn test_polygon_area_orientation() {
        let ccw = square(0.0, 0.0, 2.0);
        assert!((polygon_signed_area(&ccw) - 4.0).abs() < 1e-12);
        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert!((polygon_signed_area(&cw) + 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_segments_intersect() {
        let a = Point2::new(0.0, 0.0);
        let b = Point2::new(2.0, 2.0);
        let c = Point2::new(0.0, 2.0);
        let d = Point2::new(2.0, 0.0);
        assert!(segments_intersect(&a, &b, &c, &d));

        // Touching at an endpoint counts.
        assert!(segments_intersect(&a, &b, &b, &Point2::new(3.0, 0.0)));

        // Disjoint and parallel.
        assert!(!segments_intersect(&a, &c, &d, &b));
        assert!(!segments_intersect(
            &a,
            &Point2::new(1.0, 1.0),
            &Point2::new(1.5, 1.5),
            &b
        ));
    }

    #[test]
    fn test_point_in_polygon() {
        let sq = square(0.0, 0.0, 10.0);
        assert!(point_in_polygon(&Point2::new(5.0, 5.0), &sq));
        assert!(!point_in_polygon(&Point2::new(15.0, 5.0), &sq));
        assert!(!point_in_polygon(&Point2::new(5.0, -1.0), &sq));
    }

    #[test]
    fn test_polygons_overlap() {
        let a = square(0.0, 0.0, 10.0);
        assert!(polygons_overlap(&a, &a.clone()));
        assert!(polygons_overlap(&a, &square(5.0, 5.0, 10.0)));
        assert!(polygons_overlap(&a, &square(2.0, 2.0, 2.0)));
        assert!(!polygons_overlap(&a, &square(20.0, 0.0, 10.0)));
    }
}
