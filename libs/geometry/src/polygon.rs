//! Convex polygons.

use serde::{Deserialize, Serialize};

use crate::line::Line;
use crate::point::Point;
use crate::rect::Rect;
use crate::side::Side;

/// A convex polygon with vertices in counter-clockwise order.
///
/// Duplicate and collinear vertices are removed on construction. The empty
/// polygon has no vertices; a single vertex is a point, two vertices a
/// segment.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Polygon {
    verts: Vec<Point>,
}

impl Polygon {
    /// The empty polygon.
    pub const fn empty() -> Self {
        Self { verts: Vec::new() }
    }

    /// Creates a convex polygon from a vertex loop.
    ///
    /// The input must describe a convex polygon; its winding may be either
    /// orientation (clockwise input is reversed). Collinear and duplicate
    /// vertices are removed.
    pub fn new(verts: Vec<Point>) -> Self {
        let mut p = Self { verts };
        p.canonicalize();
        p
    }

    fn canonicalize(&mut self) {
        // Drop consecutive duplicates.
        self.verts.dedup();
        if self.verts.len() > 1 && self.verts.first() == self.verts.last() {
            self.verts.pop();
        }
        if self.verts.len() >= 3 {
            // Ensure counter-clockwise winding.
            if self.signed_area2() < 0 {
                self.verts.reverse();
            }
            // Drop collinear vertices.
            let n = self.verts.len();
            let mut keep: Vec<Point> = Vec::with_capacity(n);
            for i in 0..n {
                let prev = self.verts[(i + n - 1) % n];
                let cur = self.verts[i];
                let next = self.verts[(i + 1) % n];
                if (next - cur).cross(cur - prev) != 0 {
                    keep.push(cur);
                }
            }
            if keep.len() >= 2 {
                self.verts = keep;
            } else {
                // Degenerated to a segment: keep the extreme points.
                let min = *self.verts.iter().min().unwrap();
                let max = *self.verts.iter().max().unwrap();
                self.verts = if min == max { vec![min] } else { vec![min, max] };
            }
        }
    }

    /// Twice the signed area (positive for counter-clockwise winding).
    fn signed_area2(&self) -> i128 {
        let n = self.verts.len();
        if n < 3 {
            return 0;
        }
        let mut sum: i128 = 0;
        for i in 0..n {
            let a = self.verts[i];
            let b = self.verts[(i + 1) % n];
            sum += a.x as i128 * b.y as i128 - b.x as i128 * a.y as i128;
        }
        sum
    }

    /// The vertices in counter-clockwise order.
    #[inline]
    pub fn corners(&self) -> &[Point] {
        &self.verts
    }

    /// Returns `true` if the polygon has no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.verts.is_empty()
    }

    /// The dimension: -1 empty, 0 point, 1 segment, 2 area.
    pub fn dimension(&self) -> i8 {
        match self.verts.len() {
            0 => -1,
            1 => 0,
            2 => 1,
            _ => {
                if self.signed_area2() == 0 {
                    1
                } else {
                    2
                }
            }
        }
    }

    /// The bounding box.
    pub fn bbox(&self) -> Rect {
        let mut r = Rect::EMPTY;
        for &p in &self.verts {
            r = r.union(Rect::from_point(p));
        }
        r
    }

    /// The directed border edges in counter-clockwise order (interior on the
    /// left). A segment yields one edge; points and empty polygons none.
    pub fn border_lines(&self) -> Vec<Line> {
        match self.verts.len() {
            0 | 1 => Vec::new(),
            2 => vec![Line::new(self.verts[0], self.verts[1])],
            n => (0..n)
                .map(|i| Line::new(self.verts[i], self.verts[(i + 1) % n]))
                .collect(),
        }
    }

    /// Returns `true` if `p` lies inside or on the boundary.
    pub fn contains(&self, p: Point) -> bool {
        match self.verts.len() {
            0 => false,
            1 => self.verts[0] == p,
            2 => {
                let l = Line::new(self.verts[0], self.verts[1]);
                l.side_of(p) == Side::Collinear
                    && Rect::new(self.verts[0], self.verts[1]).contains(p)
            }
            n => (0..n).all(|i| {
                Line::new(self.verts[i], self.verts[(i + 1) % n]).side_of(p) != Side::Right
            }),
        }
    }

    /// Cuts the polygon with a directed line, keeping the left side
    /// (Sutherland–Hodgman). Intersection vertices are rounded to integer
    /// coordinates.
    pub fn cut(&self, line: Line) -> Polygon {
        if self.is_empty() {
            return Polygon::empty();
        }
        if self.verts.len() == 1 {
            return if line.side_of(self.verts[0]) != Side::Right {
                self.clone()
            } else {
                Polygon::empty()
            };
        }
        let n = self.verts.len();
        let mut out: Vec<Point> = Vec::with_capacity(n + 1);
        // A 2-vertex polygon is an open segment, not a loop.
        let edges: Vec<(Point, Point)> = if n == 2 {
            vec![(self.verts[0], self.verts[1])]
        } else {
            (0..n)
                .map(|i| (self.verts[i], self.verts[(i + 1) % n]))
                .collect()
        };
        if n == 2 {
            let (a, b) = edges[0];
            let sa = line.side_of(a);
            let sb = line.side_of(b);
            if sa != Side::Right {
                out.push(a);
            }
            if (sa == Side::Right) != (sb == Side::Right) {
                if let Some(x) = line.intersection(&Line::new(a, b)) {
                    out.push(x);
                }
            }
            if sb != Side::Right {
                out.push(b);
            }
            return Polygon::new(out);
        }
        for (a, b) in edges {
            let sa = line.side_of(a);
            let sb = line.side_of(b);
            if sa != Side::Right {
                out.push(a);
            }
            let crosses = matches!(
                (sa, sb),
                (Side::Left, Side::Right) | (Side::Right, Side::Left)
            );
            if crosses {
                if let Some(x) = line.intersection(&Line::new(a, b)) {
                    out.push(x);
                }
            }
        }
        Polygon::new(out)
    }

    /// The intersection of two convex polygons, computed by successive
    /// half-plane cuts with the border lines of `other`.
    pub fn intersection(&self, other: &Polygon) -> Polygon {
        if self.is_empty() || other.is_empty() {
            return Polygon::empty();
        }
        if other.verts.len() == 1 {
            return if self.contains(other.verts[0]) {
                other.clone()
            } else {
                Polygon::empty()
            };
        }
        let mut acc = self.clone();
        for edge in other.border_lines() {
            acc = acc.cut(edge);
            if acc.is_empty() {
                break;
            }
        }
        // A segment's single border line cuts only one half-plane; clamp to
        // the carrier line's other side and to the endpoint normals.
        if other.verts.len() == 2 {
            let (a, b) = (other.verts[0], other.verts[1]);
            let d = b - a;
            // Right normal (d.y, -d.x): the left side of a line through `p`
            // with that direction is { x : dot(d, x - p) >= 0 }.
            let n = Point::new(d.y, -d.x);
            acc = acc.cut(Line::new(b, a));
            acc = acc.cut(Line::new(a, a + n));
            acc = acc.cut(Line::new(b + n, b));
        }
        acc
    }

    /// The vertex average, rounded down. For convex polygons this point is
    /// always inside.
    pub fn centroid(&self) -> Point {
        if self.verts.is_empty() {
            return Point::zero();
        }
        let n = self.verts.len() as i64;
        let sx: i64 = self.verts.iter().map(|p| p.x).sum();
        let sy: i64 = self.verts.iter().map(|p| p.y).sum();
        Point::new(sx / n, sy / n)
    }

    /// The Euclidean distance from the boundary-or-interior to `p`
    /// (0 if contained).
    pub fn distance_to_point(&self, p: Point) -> f64 {
        if self.contains(p) {
            return 0.0;
        }
        match self.verts.len() {
            0 => f64::INFINITY,
            1 => self.verts[0].distance(p),
            _ => self
                .border_lines()
                .iter()
                .map(|e| e.nearest_segment_point(p).distance(p))
                .fold(f64::INFINITY, f64::min),
        }
    }
}

impl From<Rect> for Polygon {
    fn from(r: Rect) -> Self {
        if r.is_empty() {
            Polygon::empty()
        } else {
            Polygon::new(r.corners().to_vec())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::from(Rect::from_sides(0, 0, 100, 100))
    }

    #[test]
    fn winding_is_fixed() {
        let cw = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(0, 100),
            Point::new(100, 100),
            Point::new(100, 0),
        ]);
        assert_eq!(cw.dimension(), 2);
        assert!(cw.signed_area2() > 0);
    }

    #[test]
    fn collinear_vertices_removed() {
        let p = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(50, 0),
            Point::new(100, 0),
            Point::new(100, 100),
            Point::new(0, 100),
        ]);
        assert_eq!(p.corners().len(), 4);
    }

    #[test]
    fn halfplane_cut() {
        // Keep the left side of the upward line at x = 40.
        let cut = square().cut(Line::new(Point::new(40, 0), Point::new(40, 100)));
        assert_eq!(cut.bbox(), Rect::from_sides(0, 0, 40, 100));
        assert_eq!(cut.dimension(), 2);
    }

    #[test]
    fn cut_to_nothing() {
        let cut = square().cut(Line::new(Point::new(0, -10), Point::new(100, -10)));
        assert!(cut.is_empty());
    }

    #[test]
    fn intersection_of_offset_squares() {
        let a = square();
        let b = Polygon::from(Rect::from_sides(50, 50, 150, 150));
        let i = a.intersection(&b);
        assert_eq!(i.bbox(), Rect::from_sides(50, 50, 100, 100));
    }

    #[test]
    fn touching_squares_intersect_in_a_segment() {
        let a = square();
        let b = Polygon::from(Rect::from_sides(100, 20, 200, 80));
        let i = a.intersection(&b);
        assert_eq!(i.dimension(), 1);
        assert_eq!(i.bbox(), Rect::from_sides(100, 20, 100, 80));
    }

    #[test]
    fn containment() {
        assert!(square().contains(Point::new(100, 100)));
        assert!(square().contains(Point::new(50, 50)));
        assert!(!square().contains(Point::new(101, 50)));
    }
}
