//! Planar geometry primitives for joints, legs and the jacket layout
//!
//! All functions work in the 2D elevation plane (x horizontal, y up), in mm and
//! degrees. Polygons are stored as unclosed point sequences in `[xs, ys]` form,
//! the shape consumed by the plotting and take-off clients.

use nalgebra::{Point2, Rotation2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::{JacketError, JacketResult};

/// A point in the elevation plane
pub type Point = Point2<f64>;

/// A vector in the elevation plane
pub type Vec2 = Vector2<f64>;

/// Coincidence tolerance for lengths (mm)
pub const LENGTH_TOL: f64 = 1e-9;

/// Tolerance on the cross product of two unit directions below which they are
/// treated as parallel
const PARALLEL_TOL: f64 = 1e-12;

/// A polygon outline as parallel coordinate lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl Polygon {
    /// Build a polygon from an ordered point list
    pub fn from_points(points: &[Point]) -> Self {
        Self {
            xs: points.iter().map(|p| p.x).collect(),
            ys: points.iter().map(|p| p.y).collect(),
        }
    }

    /// Number of vertices
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// True if the polygon has no vertices
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Vertex `i` as a point
    pub fn point(&self, i: usize) -> Point {
        Point::new(self.xs[i], self.ys[i])
    }

    /// Iterate over the vertices
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.xs.iter().zip(&self.ys).map(|(&x, &y)| Point::new(x, y))
    }

    /// Midpoint of vertices `i` and `j`
    pub fn midpoint(&self, i: usize, j: usize) -> Point {
        nalgebra::center(&self.point(i), &self.point(j))
    }

    /// Rotate anticlockwise about the origin by `angle_deg`
    pub fn rotated(&self, angle_deg: f64) -> Self {
        let rot = Rotation2::new(angle_deg.to_radians());
        let points: Vec<Point> = self.points().map(|p| rot * p).collect();
        Self::from_points(&points)
    }

    /// Translate by `by`
    pub fn translated(&self, by: &Vec2) -> Self {
        let points: Vec<Point> = self.points().map(|p| p + by).collect();
        Self::from_points(&points)
    }

    /// Lowest and highest vertex y, `None` when empty
    pub fn y_extent(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        Some(self.ys.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &y| (lo.min(y), hi.max(y))))
    }

    /// Mirror about the x = 0 line
    pub fn mirrored(&self) -> Self {
        Self {
            xs: self.xs.iter().map(|x| -x).collect(),
            ys: self.ys.clone(),
        }
    }
}

/// Mirror a point about the x = 0 line
pub fn mirror_point(p: &Point) -> Point {
    Point::new(-p.x, p.y)
}

/// Unsigned angle at `p2` between the rays to `p1` and `p3`, in degrees (0-180).
///
/// Returns NaN when either ray has zero length.
pub fn calculate_angle_3pts(p1: &Point, p2: &Point, p3: &Point) -> f64 {
    let v1 = p1 - p2;
    let v2 = p3 - p2;
    let cos_angle = v1.dot(&v2) / (v1.norm() * v2.norm());
    // clamp keeps collinear rays from drifting past +-1; NaN passes through
    cos_angle.clamp(-1.0, 1.0).acos().to_degrees()
}

/// Intersection of the infinite lines `a1-a2` and `b1-b2` via slope/intercept.
///
/// Undefined (non-finite) for vertical or parallel lines.
pub fn line_intersection(a1: &Point, a2: &Point, b1: &Point, b2: &Point) -> Point {
    let m1 = (a2.y - a1.y) / (a2.x - a1.x);
    let m2 = (b2.y - b1.y) / (b2.x - b1.x);
    let c1 = a1.y - m1 * a1.x;
    let c2 = b1.y - m2 * b1.x;

    let x = (c2 - c1) / (m1 - m2);
    let y = m1 * x + c1;
    Point::new(x, y)
}

/// Swept outline of constant perpendicular `width` along an ordered polyline.
///
/// Returns one trapezoid per segment with vertices
/// `[start + n, start - n, end - n, end + n]` (n = left normal * width / 2).
/// Interior vertices are the true intersection of the two adjacent offset lines,
/// so neighbouring trapezoids share their kink edge exactly. Where the offset
/// lines are parallel the averaged normal is used instead.
pub fn construct_true_constant_width_path(width: f64, pts: &[Point]) -> JacketResult<Vec<Polygon>> {
    if pts.len() < 2 {
        return Err(JacketError::InvalidGeometry(format!(
            "constant width path needs at least 2 points, got {}",
            pts.len()
        )));
    }
    let half = width / 2.0;

    let mut dirs = Vec::with_capacity(pts.len() - 1);
    for (i, w) in pts.windows(2).enumerate() {
        let d = w[1] - w[0];
        let len = d.norm();
        if len < LENGTH_TOL {
            return Err(JacketError::InvalidGeometry(format!(
                "constant width path segment {} has zero length",
                i + 1
            )));
        }
        dirs.push(d / len);
    }
    let normals: Vec<Vec2> = dirs.iter().map(|u| Vec2::new(-u.y, u.x)).collect();

    let mut left = Vec::with_capacity(pts.len());
    let mut right = Vec::with_capacity(pts.len());
    left.push(pts[0] + normals[0] * half);
    right.push(pts[0] - normals[0] * half);

    for k in 1..dirs.len() {
        for (side, out) in [(1.0, &mut left), (-1.0, &mut right)] {
            let vertex = offset_vertex(&pts[k], (&dirs[k - 1], &normals[k - 1]), (&dirs[k], &normals[k]), side * half)?;
            out.push(vertex);
        }
    }

    let last = pts.len() - 1;
    let n_last = normals[dirs.len() - 1];
    left.push(pts[last] + n_last * half);
    right.push(pts[last] - n_last * half);

    Ok((0..dirs.len())
        .map(|i| Polygon::from_points(&[left[i], right[i], right[i + 1], left[i + 1]]))
        .collect())
}

/// Offset vertex at a polyline kink `p` for a signed offset distance.
fn offset_vertex(p: &Point, before: (&Vec2, &Vec2), after: (&Vec2, &Vec2), offset: f64) -> JacketResult<Point> {
    let (d0, n0) = before;
    let (d1, n1) = after;
    let a = p + n0 * offset;
    let b = p + n1 * offset;

    let cross = d0.perp(d1);
    if cross.abs() < PARALLEL_TOL {
        let m = n0 + n1;
        if m.norm() < LENGTH_TOL {
            return Err(JacketError::InvalidGeometry(
                "constant width path reverses on itself".to_string(),
            ));
        }
        return Ok(p + m.normalize() * offset);
    }

    let s = (b - a).perp(d1) / cross;
    Ok(a + d0 * s)
}

/// Side-view outline of a linear taper from full width `w1` at `pt1` to `w2` at
/// `pt2`. The outline is closed (5 points, first repeated).
pub fn create_2d_cone(pt1: &Point, pt2: &Point, w1: f64, w2: f64) -> Polygon {
    let u = (pt2 - pt1).normalize();
    let n = Vec2::new(-u.y, u.x);
    let corners = [
        pt1 + n * (w1 / 2.0),
        pt1 - n * (w1 / 2.0),
        pt2 - n * (w2 / 2.0),
        pt2 + n * (w2 / 2.0),
        pt1 + n * (w1 / 2.0),
    ];
    Polygon::from_points(&corners)
}

/// One segment of a polyline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub length: f64,
    pub start: Point,
    pub end: Point,
    /// Index of `start` in the source point list
    pub index: usize,
}

/// Longest of the N-1 segments of an ordered point list (first one on ties).
pub fn find_longest_segment(points: &[Point]) -> Option<Segment> {
    points
        .windows(2)
        .enumerate()
        .map(|(index, w)| Segment {
            length: (w[1] - w[0]).norm(),
            start: w[0],
            end: w[1],
            index,
        })
        .fold(None, |best: Option<Segment>, seg| match best {
            Some(b) if b.length >= seg.length => Some(b),
            _ => Some(seg),
        })
}

/// Two points at distances `l1` and `l2` from `pt1` along `pt1 -> pt2`.
pub fn create_points_on_line(pt1: &Point, pt2: &Point, l1: f64, l2: f64) -> JacketResult<(Point, Point)> {
    if l2 <= l1 {
        return Err(JacketError::InvalidGeometry(format!(
            "second split length ({l2}) must exceed the first ({l1})"
        )));
    }
    let d = pt2 - pt1;
    let len = d.norm();
    if len < LENGTH_TOL {
        return Err(JacketError::InvalidGeometry(
            "cannot place points on a zero-length line".to_string(),
        ));
    }
    let u = d / len;
    Ok((pt1 + u * l1, pt1 + u * l2))
}

/// Move vertices 1 and 2 of a 4-point polygon along the edges `0->1` and `3->2`
/// until they reach `target_y`.
pub fn extend_middle_points_to_target_y(poly: &Polygon, target_y: f64) -> JacketResult<Polygon> {
    if poly.len() != 4 {
        return Err(JacketError::InvalidGeometry(format!(
            "expected a 4-point polygon, got {} points",
            poly.len()
        )));
    }
    let mut points: Vec<Point> = poly.points().collect();
    for (anchor, moved) in [(0usize, 1usize), (3, 2)] {
        let a = points[anchor];
        let edge = points[moved] - a;
        if edge.y.abs() < LENGTH_TOL {
            return Err(JacketError::InvalidGeometry(
                "polygon edge is horizontal and cannot reach the target elevation".to_string(),
            ));
        }
        points[moved] = a + edge * ((target_y - a.y) / edge.y);
    }
    Ok(Polygon::from_points(&points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Perpendicular distance from `q` to the infinite line through `a` and `b`
    fn distance_to_line(q: &Point, a: &Point, b: &Point) -> f64 {
        let u = (b - a).normalize();
        (q - a).perp(&u).abs()
    }

    #[test]
    fn test_y_extent() {
        let poly = Polygon::from_points(&[Point::new(0.0, 2.0), Point::new(1.0, -3.5), Point::new(-1.0, 7.0)]);
        assert_eq!(poly.y_extent(), Some((-3.5, 7.0)));
        assert_eq!(Polygon::default().y_extent(), None);
    }

    #[test]
    fn test_angle_3pts() {
        let a = calculate_angle_3pts(&Point::new(0.0, 1.0), &Point::origin(), &Point::new(1.0, 0.0));
        assert_relative_eq!(a, 90.0, epsilon = 1e-12);

        let straight = calculate_angle_3pts(&Point::new(-2.0, 0.0), &Point::origin(), &Point::new(3.0, 0.0));
        assert_relative_eq!(straight, 180.0, epsilon = 1e-9);
    }

    #[test]
    fn test_angle_zero_length_ray_is_nan() {
        let p = Point::new(1.0, 1.0);
        assert!(calculate_angle_3pts(&p, &p, &Point::new(2.0, 3.0)).is_nan());
    }

    #[test]
    fn test_line_intersection() {
        let p = line_intersection(
            &Point::new(-1.0, 1.0),
            &Point::new(1.0, -1.0),
            &Point::new(-1.0, -1.0),
            &Point::new(1.0, 1.0),
        );
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_straight_path_is_rectangle() {
        let polys = construct_true_constant_width_path(2.0, &[Point::new(0.0, 0.0), Point::new(0.0, 10.0)]).unwrap();
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].xs, vec![-1.0, 1.0, 1.0, -1.0]);
        assert_eq!(polys[0].ys, vec![0.0, 0.0, 10.0, 10.0]);
    }

    #[test]
    fn test_kinked_path_keeps_constant_width() {
        let pts = [Point::new(0.0, 0.0), Point::new(1.0, 10.0), Point::new(6.0, 18.0)];
        let w = 3.0;
        let polys = construct_true_constant_width_path(w, &pts).unwrap();
        assert_eq!(polys.len(), 2);

        // shared kink edge
        assert_relative_eq!(polys[0].point(2), polys[1].point(1), epsilon = 1e-12);
        assert_relative_eq!(polys[0].point(3), polys[1].point(0), epsilon = 1e-12);

        // both kink vertices sit at w/2 from both adjacent centrelines
        for vertex in [polys[0].point(2), polys[0].point(3)] {
            assert_relative_eq!(distance_to_line(&vertex, &pts[0], &pts[1]), w / 2.0, epsilon = 1e-9);
            assert_relative_eq!(distance_to_line(&vertex, &pts[1], &pts[2]), w / 2.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_collinear_path_falls_back_to_normal() {
        let pts = [Point::new(0.0, 0.0), Point::new(0.0, 5.0), Point::new(0.0, 9.0)];
        let polys = construct_true_constant_width_path(4.0, &pts).unwrap();
        assert_relative_eq!(polys[0].point(3), Point::new(-2.0, 5.0), epsilon = 1e-12);
        assert_relative_eq!(polys[0].point(2), Point::new(2.0, 5.0), epsilon = 1e-12);
    }

    #[test]
    fn test_path_rejects_degenerate_input() {
        assert!(construct_true_constant_width_path(1.0, &[Point::origin()]).is_err());
        let p = Point::new(1.0, 1.0);
        assert!(construct_true_constant_width_path(1.0, &[p, p]).is_err());
    }

    #[test]
    fn test_cone_outline_closed() {
        let cone = create_2d_cone(&Point::new(0.0, 10.0), &Point::new(0.0, 0.0), 4.0, 2.0);
        assert_eq!(cone.len(), 5);
        assert_eq!(cone.point(0), cone.point(4));
        assert_relative_eq!((cone.point(0) - cone.point(1)).norm(), 4.0, epsilon = 1e-12);
        assert_relative_eq!((cone.point(2) - cone.point(3)).norm(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_longest_segment() {
        let pts = [Point::new(0.0, 0.0), Point::new(0.0, 1.0), Point::new(5.0, 13.0), Point::new(5.0, 14.0)];
        let seg = find_longest_segment(&pts).unwrap();
        assert_eq!(seg.index, 1);
        assert_relative_eq!(seg.length, 13.0, epsilon = 1e-12);
        assert!(find_longest_segment(&pts[..1]).is_none());
    }

    #[test]
    fn test_points_on_line() {
        let (a, b) = create_points_on_line(&Point::new(0.0, 0.0), &Point::new(0.0, -10.0), 2.0, 5.0).unwrap();
        assert_relative_eq!(a, Point::new(0.0, -2.0), epsilon = 1e-12);
        assert_relative_eq!(b, Point::new(0.0, -5.0), epsilon = 1e-12);
        assert!(create_points_on_line(&Point::origin(), &Point::new(1.0, 0.0), 3.0, 3.0).is_err());
    }

    #[test]
    fn test_extend_middle_points() {
        let rect = Polygon::from_points(&[
            Point::new(-1.0, 0.0),
            Point::new(-1.0, 4.0),
            Point::new(1.0, 4.0),
            Point::new(1.0, 0.0),
        ]);
        let ext = extend_middle_points_to_target_y(&rect, 9.0).unwrap();
        assert_eq!(ext.ys, vec![0.0, 9.0, 9.0, 0.0]);
        assert_eq!(ext.xs, rect.xs);
    }
}
