//! Planar geometry primitives shared by the distance and free-space code.
//!
//! Coordinates are assumed to be in a projected, metric plane. No geodesic
//! handling happens here.

use geo::{Coord, EuclideanDistance, Line};

/// A 2D point in the planar projection.
pub type Point = Coord<f64>;

/// Tolerance used when classifying a tangent circle/segment intersection.
const FUZZY: f64 = 1e-6;

/// Shorthand constructor for a [`Point`].
#[inline]
pub fn point(x: f64, y: f64) -> Point {
    Coord { x, y }
}

/// Euclidean distance between two points.
#[inline]
pub fn point_distance(a: Point, b: Point) -> f64 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Euclidean distance between point `p` and the closed segment `a`-`b`.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    if a == b {
        return point_distance(p, a);
    }
    geo::Point::from(p).euclidean_distance(&Line::new(a, b))
}

/// Linear interpolation between `a` and `b` at parameter `t` in `[0, 1]`.
#[inline]
pub fn lerp(a: Point, b: Point, t: f64) -> Point {
    point(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

/// Parameters in `[0, 1]` along segment `a`-`b` where it crosses the circle
/// around `center` with the given `radius`, sorted ascending.
///
/// A tangent segment yields a single parameter. Segments that miss the circle,
/// or hit it only outside the segment, yield an empty vector.
pub fn segment_circle_params(a: Point, b: Point, center: Point, radius: f64) -> Vec<f64> {
    let p1 = point(a.x - center.x, a.y - center.y);
    let p2 = point(b.x - center.x, b.y - center.y);

    let qa = (p2.x - p1.x).powi(2) + (p2.y - p1.y).powi(2);
    if qa == 0.0 {
        return Vec::new();
    }
    let qb = 2.0 * (p1.x * p2.x + p1.y * p2.y) - 2.0 * (p1.x * p1.x + p1.y * p1.y);
    let qc = p1.x * p1.x + p1.y * p1.y - radius * radius;

    let discriminant = qb * qb - 4.0 * qa * qc;
    let mut params = if discriminant.abs() <= FUZZY {
        vec![-qb / (2.0 * qa)]
    } else if discriminant < 0.0 {
        Vec::new()
    } else {
        let root = discriminant.sqrt();
        vec![(-qb - root) / (2.0 * qa), (-qb + root) / (2.0 * qa)]
    };

    params.retain(|t| (0.0..=1.0).contains(t));
    params.sort_by(f64::total_cmp);
    params
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_segment_distance_interior() {
        let d = point_segment_distance(point(1.0, 1.0), point(0.0, 0.0), point(2.0, 0.0));
        assert!((d - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_segment_distance_clamps_to_endpoint() {
        let d = point_segment_distance(point(3.0, 4.0), point(-1.0, 0.0), point(0.0, 0.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_segment_distance_degenerate_segment() {
        let d = point_segment_distance(point(0.0, 2.0), point(0.0, 0.0), point(0.0, 0.0));
        assert!((d - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_circle_two_crossings() {
        let params = segment_circle_params(point(-2.0, 0.0), point(2.0, 0.0), point(0.0, 0.0), 1.0);
        assert_eq!(params.len(), 2);
        assert!((params[0] - 0.25).abs() < 1e-9);
        assert!((params[1] - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_segment_circle_tangent() {
        let params = segment_circle_params(point(0.0, 1.0), point(1.0, 1.0), point(1.0, 0.0), 1.0);
        assert_eq!(params.len(), 1);
        assert!(params[0].abs() < 1e-3 || (params[0] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_segment_circle_miss() {
        let params = segment_circle_params(point(0.0, 5.0), point(1.0, 5.0), point(0.0, 0.0), 1.0);
        assert!(params.is_empty());
    }
}
