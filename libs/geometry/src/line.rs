//! Directed lines and line segments.

use serde::{Deserialize, Serialize};

use crate::point::Point;
use crate::side::Side;

/// A directed line through two distinct points.
///
/// The direction runs from [`Line::a`] to [`Line::b`]; the *left* side is the
/// half-plane to the left of that direction. The same type doubles as a line
/// segment (border edge) when the endpoints carry meaning.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Line {
    /// The first defining point.
    pub a: Point,
    /// The second defining point.
    pub b: Point,
}

impl Line {
    /// Creates a directed line from `a` to `b`.
    pub const fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    /// The direction vector `b - a`.
    #[inline]
    pub fn direction(&self) -> Point {
        self.b - self.a
    }

    /// The line with reversed direction (left and right sides swap).
    #[inline]
    pub const fn opposite(&self) -> Self {
        Self {
            a: self.b,
            b: self.a,
        }
    }

    /// The side of this directed line on which `p` lies.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let l = Line::new(Point::new(0, 0), Point::new(10, 0));
    /// assert_eq!(l.side_of(Point::new(5, 3)), Side::Left);
    /// assert_eq!(l.side_of(Point::new(5, -3)), Side::Right);
    /// assert_eq!(l.side_of(Point::new(20, 0)), Side::Collinear);
    /// ```
    #[inline]
    pub fn side_of(&self, p: Point) -> Side {
        (p - self.a).side_of(self.direction())
    }

    /// The cross product of the direction with `p - a`.
    ///
    /// Positive on the left side; twice the signed triangle area.
    #[inline]
    pub fn cross_with(&self, p: Point) -> i64 {
        self.direction().cross(p - self.a)
    }

    /// The signed Euclidean distance from `p` to the line; positive on the
    /// left side.
    pub fn signed_distance(&self, p: Point) -> f64 {
        let d = self.direction();
        let len = d.length();
        if len == 0.0 {
            return self.a.distance(p);
        }
        self.cross_with(p) as f64 / len
    }

    /// Returns `true` if the line is horizontal or vertical.
    pub fn is_axis_aligned(&self) -> bool {
        self.a.x == self.b.x || self.a.y == self.b.y
    }

    /// Returns `true` if the direction is a multiple of 45 degrees.
    pub fn is_multiple_of_45_degree(&self) -> bool {
        let d = self.direction();
        d.x == 0 || d.y == 0 || d.x.abs() == d.y.abs()
    }

    /// The intersection point of two lines, rounded to integer coordinates.
    ///
    /// Returns `None` for parallel lines.
    pub fn intersection(&self, other: &Line) -> Option<Point> {
        let d1 = self.direction();
        let d2 = other.direction();
        let denom = d1.cross(d2);
        if denom == 0 {
            return None;
        }
        let t = (other.a - self.a).cross(d2) as f64 / denom as f64;
        let x = self.a.x as f64 + t * d1.x as f64;
        let y = self.a.y as f64 + t * d1.y as f64;
        Some(Point::new(x.round() as i64, y.round() as i64))
    }

    /// The length of the segment from `a` to `b`.
    #[inline]
    pub fn length(&self) -> f64 {
        self.a.distance(self.b)
    }

    /// The midpoint of the segment, rounded down.
    #[inline]
    pub fn midpoint(&self) -> Point {
        Point::new((self.a.x + self.b.x) / 2, (self.a.y + self.b.y) / 2)
    }

    /// The point on the segment `[a, b]` nearest to `p`.
    pub fn nearest_segment_point(&self, p: Point) -> Point {
        let d = self.direction();
        let len2 = d.length_squared();
        if len2 == 0 {
            return self.a;
        }
        let t = (p - self.a).dot(d) as f64 / len2 as f64;
        let t = t.clamp(0.0, 1.0);
        Point::new(
            (self.a.x as f64 + t * d.x as f64).round() as i64,
            (self.a.y as f64 + t * d.y as f64).round() as i64,
        )
    }

    /// Translates the line perpendicular to its direction, moving it
    /// `amount` units toward its left side (negative values move right).
    pub fn shift_left(&self, amount: i64) -> Line {
        let d = self.direction();
        let len = d.length();
        if len == 0.0 {
            return *self;
        }
        // Left normal of (dx, dy) is (-dy, dx).
        let nx = (-d.y as f64 / len * amount as f64).round() as i64;
        let ny = (d.x as f64 / len * amount as f64).round() as i64;
        let v = Point::new(nx, ny);
        Line::new(self.a + v, self.b + v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sides() {
        let l = Line::new(Point::new(0, 0), Point::new(0, 10));
        assert_eq!(l.side_of(Point::new(-1, 5)), Side::Left);
        assert_eq!(l.side_of(Point::new(1, 5)), Side::Right);
    }

    #[test]
    fn intersection_of_crossing_lines() {
        let h = Line::new(Point::new(-10, 3), Point::new(10, 3));
        let v = Line::new(Point::new(4, -10), Point::new(4, 10));
        assert_eq!(h.intersection(&v), Some(Point::new(4, 3)));
        assert_eq!(h.intersection(&h), None);
    }

    #[test]
    fn nearest_point_clamps_to_segment() {
        let l = Line::new(Point::new(0, 0), Point::new(10, 0));
        assert_eq!(l.nearest_segment_point(Point::new(-5, 7)), Point::new(0, 0));
        assert_eq!(l.nearest_segment_point(Point::new(4, 7)), Point::new(4, 0));
        assert_eq!(
            l.nearest_segment_point(Point::new(25, -2)),
            Point::new(10, 0)
        );
    }

    #[test]
    fn signed_distance_sign_and_magnitude() {
        use approx::assert_relative_eq;
        let l = Line::new(Point::new(0, 0), Point::new(10, 0));
        assert_relative_eq!(l.signed_distance(Point::new(3, 5)), 5.0);
        assert_relative_eq!(l.signed_distance(Point::new(3, -5)), -5.0);
        let diag = Line::new(Point::new(0, 0), Point::new(10, 10));
        assert_relative_eq!(
            diag.signed_distance(Point::new(10, 0)),
            -(50.0f64).sqrt()
        );
    }
}
