//! Convex tile shapes.
//!
//! A [`TileShape`] is the convex-polygon abstraction underlying all room and
//! door geometry. It is a tagged variant of the three concrete convex shapes
//! used by the router: axis-aligned boxes (90-degree routing), octagons
//! (45-degree routing) and general convex polygons. Dispatch is by `match`;
//! mixed-variant operations promote to the more general shape.

use serde::{Deserialize, Serialize};

use crate::line::Line;
use crate::octagon::Octagon;
use crate::point::Point;
use crate::polygon::Polygon;
use crate::rect::Rect;
use crate::side::Side;

/// A convex tile: box, octagon or general convex polygon.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileShape {
    /// An axis-aligned box.
    Box(Rect),
    /// An octagon with 45-degree boundary slopes.
    Octagon(Octagon),
    /// A general convex polygon.
    Polygon(Polygon),
}

impl TileShape {
    /// The canonical empty tile.
    pub const fn empty() -> Self {
        Self::Box(Rect::EMPTY)
    }

    /// A tile holding a single point.
    pub const fn from_point(p: Point) -> Self {
        Self::Box(Rect::from_point(p))
    }

    /// The dimension: -1 empty, 0 point, 1 line, 2 area.
    pub fn dimension(&self) -> i8 {
        match self {
            Self::Box(r) => r.dimension(),
            Self::Octagon(o) => o.dimension(),
            Self::Polygon(p) => p.dimension(),
        }
    }

    /// Returns `true` if the tile contains no points.
    pub fn is_empty(&self) -> bool {
        self.dimension() < 0
    }

    /// The bounding box.
    pub fn bbox(&self) -> Rect {
        match self {
            Self::Box(r) => *r,
            Self::Octagon(o) => o.bbox(),
            Self::Polygon(p) => p.bbox(),
        }
    }

    /// A point inside the tile (the center of mass of its corners).
    pub fn center(&self) -> Point {
        match self {
            Self::Box(r) => r.center(),
            Self::Octagon(o) => o.bbox().center(),
            Self::Polygon(p) => p.centroid(),
        }
    }

    /// The boundary corners in counter-clockwise order.
    pub fn corners(&self) -> Vec<Point> {
        match self {
            Self::Box(r) => {
                if r.is_empty() {
                    Vec::new()
                } else {
                    let mut c = r.corners().to_vec();
                    c.dedup();
                    if c.len() > 1 && c.first() == c.last() {
                        c.pop();
                    }
                    c
                }
            }
            Self::Octagon(o) => o.corners(),
            Self::Polygon(p) => p.corners().to_vec(),
        }
    }

    /// The tile as a general convex polygon.
    pub fn to_polygon(&self) -> Polygon {
        match self {
            Self::Box(r) => Polygon::from(*r),
            Self::Octagon(o) => Polygon::new(o.corners()),
            Self::Polygon(p) => p.clone(),
        }
    }

    /// Returns `true` if `p` lies inside or on the boundary.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Self::Box(r) => r.contains(p),
            Self::Octagon(o) => o.contains(p),
            Self::Polygon(poly) => poly.contains(p),
        }
    }

    /// The ordered counter-clockwise list of directed border edges
    /// (interior on the left).
    pub fn border_lines(&self) -> Vec<Line> {
        match self {
            Self::Box(r) => {
                if r.is_empty() {
                    Vec::new()
                } else {
                    self.to_polygon().border_lines()
                }
            }
            Self::Octagon(o) => o.border_lines(),
            Self::Polygon(p) => p.border_lines(),
        }
    }

    /// The intersection of two tiles. The result's dimension is at most the
    /// smaller of the operands' dimensions.
    pub fn intersection(&self, other: &TileShape) -> TileShape {
        match (self, other) {
            (Self::Box(a), Self::Box(b)) => Self::Box(a.intersection(*b)),
            (Self::Box(a), Self::Octagon(b)) | (Self::Octagon(b), Self::Box(a)) => {
                Self::Octagon(Octagon::from_rect(*a).intersection(b))
            }
            (Self::Octagon(a), Self::Octagon(b)) => Self::Octagon(a.intersection(b)),
            _ => {
                let p = self.to_polygon().intersection(&other.to_polygon());
                if p.is_empty() {
                    Self::empty()
                } else {
                    Self::Polygon(p)
                }
            }
        }
    }

    /// Cuts the tile with a directed line, keeping the left half-plane.
    ///
    /// Boxes stay boxes under axis-aligned cuts and octagons stay octagons
    /// under 45-degree cuts; any other cut promotes to a polygon.
    pub fn intersect_halfplane(&self, line: Line) -> TileShape {
        match self {
            Self::Box(r) => {
                if r.is_empty() {
                    return Self::empty();
                }
                if line.is_axis_aligned() {
                    Self::Box(cut_rect_axis_aligned(*r, line))
                } else if line.is_multiple_of_45_degree() {
                    Self::Octagon(cut_octagon_45(Octagon::from_rect(*r), line))
                } else {
                    let p = self.to_polygon().cut(line);
                    if p.is_empty() {
                        Self::empty()
                    } else {
                        Self::Polygon(p)
                    }
                }
            }
            Self::Octagon(o) => {
                if line.is_multiple_of_45_degree() {
                    Self::Octagon(cut_octagon_45(*o, line))
                } else {
                    let p = self.to_polygon().cut(line);
                    if p.is_empty() {
                        Self::empty()
                    } else {
                        Self::Polygon(p)
                    }
                }
            }
            Self::Polygon(p) => {
                let p = p.cut(line);
                if p.is_empty() {
                    Self::empty()
                } else {
                    Self::Polygon(p)
                }
            }
        }
    }

    /// Minkowski expansion by a scalar. Polygons expand via their octagon
    /// hull, which is conservative for oblique edges.
    pub fn expand_all(&self, amount: i64) -> TileShape {
        match self {
            Self::Box(r) => Self::Box(r.expand_all(amount)),
            Self::Octagon(o) => Self::Octagon(o.expand_all(amount)),
            Self::Polygon(p) => {
                let mut hull = Octagon::EMPTY;
                for &c in p.corners() {
                    hull = hull.union(&Octagon::from_point(c));
                }
                Self::Octagon(hull.expand_all(amount))
            }
        }
    }

    /// Translates the tile by the vector `v`.
    pub fn translate(&self, v: Point) -> TileShape {
        match self {
            Self::Box(r) => Self::Box(r.translate(v)),
            Self::Octagon(o) => {
                if o.is_empty() {
                    Self::empty()
                } else {
                    Self::Octagon(Octagon {
                        left: o.left + v.x,
                        bot: o.bot + v.y,
                        right: o.right + v.x,
                        top: o.top + v.y,
                        lsum: o.lsum + v.x + v.y,
                        usum: o.usum + v.x + v.y,
                        ldif: o.ldif + v.x - v.y,
                        udif: o.udif + v.x - v.y,
                    })
                }
            }
            Self::Polygon(p) => {
                Self::Polygon(Polygon::new(p.corners().iter().map(|&c| c + v).collect()))
            }
        }
    }

    /// The indices of this tile's border edges whose interior overlaps the
    /// boundary of `other` in a 1-D segment.
    ///
    /// Non-empty only when the intersection of the tiles is exactly 1-D.
    pub fn touching_sides(&self, other: &TileShape) -> Vec<usize> {
        let cut = self.intersection(other);
        if cut.dimension() != 1 {
            return Vec::new();
        }
        let seg = cut.corners();
        if seg.len() < 2 {
            return Vec::new();
        }
        let (a, b) = (seg[0], *seg.last().unwrap());
        self.border_lines()
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.side_of(a) == Side::Collinear && e.side_of(b) == Side::Collinear
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// The point of the tile nearest to `p` (`p` itself when contained).
    pub fn nearest_point(&self, p: Point) -> Point {
        if self.contains(p) {
            return p;
        }
        if let Self::Box(r) = self {
            if r.is_empty() {
                return p;
            }
            return Point::new(
                p.x.clamp(r.left(), r.right()),
                p.y.clamp(r.bot(), r.top()),
            );
        }
        let edges = self.border_lines();
        if edges.is_empty() {
            return self.center();
        }
        let mut best = self.center();
        let mut best_d = f64::INFINITY;
        for e in &edges {
            let c = e.nearest_segment_point(p);
            let d = c.distance(p);
            if d < best_d {
                best_d = d;
                best = c;
            }
        }
        best
    }

    /// The signed distance of the farthest corner to the left of `line`
    /// (negative when the whole tile lies right of the line).
    pub fn distance_to_left(&self, line: Line) -> f64 {
        self.corners()
            .iter()
            .map(|&c| line.signed_distance(c))
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// The signed distance of the nearest corner to the left of `line`
    /// (non-negative iff the whole tile lies on the closed left side).
    pub fn min_distance_to_left(&self, line: Line) -> f64 {
        self.corners()
            .iter()
            .map(|&c| line.signed_distance(c))
            .fold(f64::INFINITY, f64::min)
    }

    /// The Euclidean distance between two tiles (0 if they touch or
    /// overlap).
    pub fn distance(&self, other: &TileShape) -> f64 {
        if self.is_empty() || other.is_empty() {
            return f64::INFINITY;
        }
        if !self.intersection(other).is_empty() {
            return 0.0;
        }
        let mut best = f64::INFINITY;
        let ea = self.border_lines();
        let eb = other.border_lines();
        for &c in &other.corners() {
            if ea.is_empty() {
                best = best.min(self.center().distance(c));
            }
            for e in &ea {
                best = best.min(e.nearest_segment_point(c).distance(c));
            }
        }
        for &c in &self.corners() {
            if eb.is_empty() {
                best = best.min(other.center().distance(c));
            }
            for e in &eb {
                best = best.min(e.nearest_segment_point(c).distance(c));
            }
        }
        best
    }
}

impl From<Rect> for TileShape {
    fn from(r: Rect) -> Self {
        Self::Box(r)
    }
}

impl From<Octagon> for TileShape {
    fn from(o: Octagon) -> Self {
        Self::Octagon(o)
    }
}

impl From<Polygon> for TileShape {
    fn from(p: Polygon) -> Self {
        Self::Polygon(p)
    }
}

/// Clamps a rectangle with an axis-aligned half-plane.
fn cut_rect_axis_aligned(r: Rect, line: Line) -> Rect {
    let d = line.direction();
    let (mut left, mut bot, mut right, mut top) = (r.left(), r.bot(), r.right(), r.top());
    if d.x > 0 {
        // Left side is above the line.
        bot = bot.max(line.a.y);
    } else if d.x < 0 {
        top = top.min(line.a.y);
    } else if d.y > 0 {
        // Left side is toward -x.
        right = right.min(line.a.x);
    } else if d.y < 0 {
        left = left.max(line.a.x);
    } else {
        return r;
    }
    if left > right || bot > top {
        Rect::EMPTY
    } else {
        Rect::from_sides(left, bot, right, top)
    }
}

/// Clamps an octagon with a 45-degree-multiple half-plane.
fn cut_octagon_45(o: Octagon, line: Line) -> Octagon {
    if o.is_empty() {
        return Octagon::EMPTY;
    }
    let d = line.direction();
    let a = line.a;
    let mut o = o;
    if d.x > 0 && d.y == 0 {
        o.bot = o.bot.max(a.y);
    } else if d.x < 0 && d.y == 0 {
        o.top = o.top.min(a.y);
    } else if d.x == 0 && d.y > 0 {
        o.right = o.right.min(a.x);
    } else if d.x == 0 && d.y < 0 {
        o.left = o.left.max(a.x);
    } else if d.x > 0 && d.y > 0 {
        o.udif = o.udif.min(a.x - a.y);
    } else if d.x < 0 && d.y < 0 {
        o.ldif = o.ldif.max(a.x - a.y);
    } else if d.x > 0 && d.y < 0 {
        o.lsum = o.lsum.max(a.x + a.y);
    } else {
        o.usum = o.usum.min(a.x + a.y);
    }
    o.normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn box_box_intersection_stays_box() {
        let a = TileShape::from(Rect::from_sides(0, 0, 100, 100));
        let b = TileShape::from(Rect::from_sides(50, 50, 150, 150));
        let i = a.intersection(&b);
        assert_eq!(i, TileShape::from(Rect::from_sides(50, 50, 100, 100)));
    }

    #[test]
    fn axis_cut_stays_box() {
        let a = TileShape::from(Rect::from_sides(0, 0, 100, 100));
        // Upward line at x = 30: keep x <= 30.
        let cut = a.intersect_halfplane(Line::new(Point::new(30, 0), Point::new(30, 10)));
        assert_eq!(cut, TileShape::from(Rect::from_sides(0, 0, 30, 100)));
    }

    #[test]
    fn diagonal_cut_promotes_to_octagon() {
        let a = TileShape::from(Rect::from_sides(0, 0, 100, 100));
        // The left side of the rising diagonal is the upper-left triangle.
        let cut = a.intersect_halfplane(Line::new(Point::new(0, 0), Point::new(100, 100)));
        assert!(matches!(cut, TileShape::Octagon(_)));
        assert!(cut.contains(Point::new(10, 90)));
        assert!(!cut.contains(Point::new(90, 10)));
    }

    #[test]
    fn touching_sides_on_edge_contact() {
        let a = TileShape::from(Rect::from_sides(0, 0, 100, 100));
        let b = TileShape::from(Rect::from_sides(100, 20, 200, 80));
        let sides = a.touching_sides(&b);
        // Edge 1 of a counter-clockwise box is the right edge.
        assert_eq!(sides, vec![1]);
        assert!(a.touching_sides(&a).is_empty());
    }

    #[test]
    fn distance_between_disjoint_tiles() {
        let a = TileShape::from(Rect::from_sides(0, 0, 10, 10));
        let b = TileShape::from(Rect::from_sides(30, 0, 40, 10));
        assert_eq!(a.distance(&b), 20.0);
        assert_eq!(a.distance(&a), 0.0);
    }

    #[test]
    fn nearest_point_clamps_into_the_tile() {
        let a = TileShape::from(Rect::from_sides(10, -5, 20, 5));
        assert_eq!(a.nearest_point(Point::new(0, 0)), Point::new(10, 0));
        assert_eq!(a.nearest_point(Point::new(15, 2)), Point::new(15, 2));
        let o = TileShape::Octagon(Octagon::from_point(Point::new(100, 0)).expand_all(10));
        assert_eq!(o.nearest_point(Point::new(0, 0)), Point::new(90, 0));
    }

    #[test]
    fn distance_to_left_of_line() {
        let a = TileShape::from(Rect::from_sides(0, 0, 10, 10));
        let l = Line::new(Point::new(0, -5), Point::new(10, -5));
        assert_eq!(a.distance_to_left(l), 15.0);
        assert_eq!(a.min_distance_to_left(l), 5.0);
    }
}
