//! Octagons with 45-degree boundary slopes.
//!
//! An octagon is the intersection of eight half-planes: four axis-aligned
//! bounds and four diagonal bounds expressed on the rotated coordinates
//! `x + y` and `x - y`. Octagons are closed under intersection and under
//! Minkowski expansion by a scalar, which makes them the workhorse shape of
//! 45-degree routing.

use serde::{Deserialize, Serialize};

use crate::line::Line;
use crate::point::Point;
use crate::rect::Rect;

/// A (possibly degenerate) octagon.
///
/// The interior is
/// `{ left <= x <= right, bot <= y <= top, lsum <= x + y <= usum, ldif <= x - y <= udif }`.
///
/// Octagons are kept *normalized*: every bound is tight against the others,
/// so equality comparisons and corner enumeration are meaningful.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct Octagon {
    /// Lower bound on x.
    pub left: i64,
    /// Lower bound on y.
    pub bot: i64,
    /// Upper bound on x.
    pub right: i64,
    /// Upper bound on y.
    pub top: i64,
    /// Lower bound on `x + y` (the bottom-left diagonal).
    pub lsum: i64,
    /// Upper bound on `x + y` (the top-right diagonal).
    pub usum: i64,
    /// Lower bound on `x - y` (the top-left diagonal).
    pub ldif: i64,
    /// Upper bound on `x - y` (the bottom-right diagonal).
    pub udif: i64,
}

impl Octagon {
    /// The canonical empty octagon.
    pub const EMPTY: Octagon = Octagon {
        left: crate::COORD_LIMIT,
        bot: crate::COORD_LIMIT,
        right: -crate::COORD_LIMIT,
        top: -crate::COORD_LIMIT,
        lsum: 2 * crate::COORD_LIMIT,
        usum: -2 * crate::COORD_LIMIT,
        ldif: 2 * crate::COORD_LIMIT,
        udif: -2 * crate::COORD_LIMIT,
    };

    /// Creates an octagon from the eight bounds and normalizes it.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        left: i64,
        bot: i64,
        right: i64,
        top: i64,
        lsum: i64,
        usum: i64,
        ldif: i64,
        udif: i64,
    ) -> Self {
        Octagon {
            left,
            bot,
            right,
            top,
            lsum,
            usum,
            ldif,
            udif,
        }
        .normalize()
    }

    /// The degenerate octagon holding a single point.
    pub const fn from_point(p: Point) -> Self {
        Octagon {
            left: p.x,
            bot: p.y,
            right: p.x,
            top: p.y,
            lsum: p.x + p.y,
            usum: p.x + p.y,
            ldif: p.x - p.y,
            udif: p.x - p.y,
        }
    }

    /// The octagon equal to an axis-aligned rectangle (diagonal bounds
    /// tight against the corners).
    pub fn from_rect(r: Rect) -> Self {
        if r.is_empty() {
            return Self::EMPTY;
        }
        Octagon {
            left: r.left(),
            bot: r.bot(),
            right: r.right(),
            top: r.top(),
            lsum: r.left() + r.bot(),
            usum: r.right() + r.top(),
            ldif: r.left() - r.top(),
            udif: r.right() - r.bot(),
        }
    }

    /// The smallest octagon containing the line segment from `a` to `b`.
    pub fn from_segment(a: Point, b: Point) -> Self {
        Self::from_point(a).union(&Self::from_point(b))
    }

    /// Returns `true` if this octagon is empty.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.left > self.right
            || self.bot > self.top
            || self.lsum > self.usum
            || self.ldif > self.udif
    }

    /// Tightens every bound against the others.
    ///
    /// Empty octagons collapse to [`Octagon::EMPTY`].
    pub fn normalize(mut self) -> Self {
        if self.is_empty() {
            return Self::EMPTY;
        }
        // Diagonals against axis bounds.
        self.lsum = self.lsum.max(self.left + self.bot);
        self.usum = self.usum.min(self.right + self.top);
        self.ldif = self.ldif.max(self.left - self.top);
        self.udif = self.udif.min(self.right - self.bot);
        // Axis bounds against diagonals.
        self.left = self.left.max(self.lsum - self.top).max(self.ldif + self.bot);
        self.right = self.right.min(self.usum - self.bot).min(self.udif + self.top);
        self.bot = self.bot.max(self.lsum - self.right).max(self.left - self.udif);
        self.top = self.top.min(self.usum - self.left).min(self.right - self.ldif);
        // Diagonals once more with the tightened axis bounds.
        self.lsum = self.lsum.max(self.left + self.bot);
        self.usum = self.usum.min(self.right + self.top);
        self.ldif = self.ldif.max(self.left - self.top);
        self.udif = self.udif.min(self.right - self.bot);
        if self.is_empty() {
            Self::EMPTY
        } else {
            self
        }
    }

    /// The bounding box.
    pub fn bbox(&self) -> Rect {
        if self.is_empty() {
            Rect::EMPTY
        } else {
            Rect::from_sides(self.left, self.bot, self.right, self.top)
        }
    }

    /// The intersection of two octagons.
    pub fn intersection(&self, other: &Octagon) -> Octagon {
        Octagon {
            left: self.left.max(other.left),
            bot: self.bot.max(other.bot),
            right: self.right.min(other.right),
            top: self.top.min(other.top),
            lsum: self.lsum.max(other.lsum),
            usum: self.usum.min(other.usum),
            ldif: self.ldif.max(other.ldif),
            udif: self.udif.min(other.udif),
        }
        .normalize()
    }

    /// The smallest octagon containing both octagons.
    pub fn union(&self, other: &Octagon) -> Octagon {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Octagon {
            left: self.left.min(other.left),
            bot: self.bot.min(other.bot),
            right: self.right.max(other.right),
            top: self.top.max(other.top),
            lsum: self.lsum.min(other.lsum),
            usum: self.usum.max(other.usum),
            ldif: self.ldif.min(other.ldif),
            udif: self.udif.max(other.udif),
        }
    }

    /// Minkowski expansion by `amount`: axis bounds move by `amount`,
    /// diagonal bounds by `round(amount * sqrt(2))`.
    pub fn expand_all(&self, amount: i64) -> Octagon {
        if self.is_empty() {
            return Self::EMPTY;
        }
        let diag = ((amount as f64) * std::f64::consts::SQRT_2).round() as i64;
        Octagon {
            left: self.left - amount,
            bot: self.bot - amount,
            right: self.right + amount,
            top: self.top + amount,
            lsum: self.lsum - diag,
            usum: self.usum + diag,
            ldif: self.ldif - diag,
            udif: self.udif + diag,
        }
        .normalize()
    }

    /// Returns `true` if `p` lies inside or on the boundary.
    pub const fn contains(&self, p: Point) -> bool {
        p.x >= self.left
            && p.x <= self.right
            && p.y >= self.bot
            && p.y <= self.top
            && p.x + p.y >= self.lsum
            && p.x + p.y <= self.usum
            && p.x - p.y >= self.ldif
            && p.x - p.y <= self.udif
    }

    /// The eight boundary corners in counter-clockwise order starting at the
    /// left end of the bottom edge. Degenerate octagons repeat corners.
    pub const fn raw_corners(&self) -> [Point; 8] {
        [
            Point::new(self.lsum - self.bot, self.bot),
            Point::new(self.udif + self.bot, self.bot),
            Point::new(self.right, self.right - self.udif),
            Point::new(self.right, self.usum - self.right),
            Point::new(self.usum - self.top, self.top),
            Point::new(self.ldif + self.top, self.top),
            Point::new(self.left, self.left - self.ldif),
            Point::new(self.left, self.lsum - self.left),
        ]
    }

    /// The distinct boundary corners in counter-clockwise order.
    pub fn corners(&self) -> Vec<Point> {
        if self.is_empty() {
            return Vec::new();
        }
        let raw = self.raw_corners();
        let mut out: Vec<Point> = Vec::with_capacity(8);
        for p in raw {
            if out.last() != Some(&p) {
                out.push(p);
            }
        }
        if out.len() > 1 && out.first() == out.last() {
            out.pop();
        }
        out
    }

    /// The directed border edges in counter-clockwise order (interior on the
    /// left). Degenerate edges are skipped.
    pub fn border_lines(&self) -> Vec<Line> {
        let c = self.corners();
        if c.len() < 2 {
            return Vec::new();
        }
        let n = c.len();
        (0..n).map(|i| Line::new(c[i], c[(i + 1) % n])).collect()
    }

    /// The dimension: -1 empty, 0 point, 1 line, 2 area.
    pub fn dimension(&self) -> i8 {
        if self.is_empty() {
            return -1;
        }
        let c = self.corners();
        match c.len() {
            1 => 0,
            2 => 1,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_point_contains_only_that_point() {
        let o = Octagon::from_point(Point::new(3, 4));
        assert_eq!(o.dimension(), 0);
        assert!(o.contains(Point::new(3, 4)));
        assert!(!o.contains(Point::new(3, 5)));
    }

    #[test]
    fn rect_roundtrip() {
        let r = Rect::from_sides(0, 0, 100, 50);
        let o = Octagon::from_rect(r);
        assert_eq!(o.bbox(), r);
        assert_eq!(o.dimension(), 2);
        assert!(o.contains(Point::new(100, 50)));
    }

    #[test]
    fn expansion_cuts_corners() {
        let o = Octagon::from_point(Point::zero()).expand_all(100);
        assert!(o.contains(Point::new(100, 0)));
        assert!(o.contains(Point::new(70, 70)));
        // The corner of the bounding box is outside the 45-degree cut.
        assert!(!o.contains(Point::new(100, 100)));
    }

    #[test]
    fn intersection_normalizes() {
        let a = Octagon::from_rect(Rect::from_sides(0, 0, 10, 10));
        let b = Octagon::from_rect(Rect::from_sides(10, 0, 20, 10));
        let i = a.intersection(&b);
        assert_eq!(i.dimension(), 1);
        assert_eq!(i.bbox(), Rect::from_sides(10, 0, 10, 10));
    }

    #[test]
    fn disjoint_intersection_is_empty() {
        let a = Octagon::from_point(Point::new(0, 0)).expand_all(10);
        let b = Octagon::from_point(Point::new(100, 100)).expand_all(10);
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn segment_hull() {
        let o = Octagon::from_segment(Point::new(0, 0), Point::new(100, 0)).expand_all(10);
        assert!(o.contains(Point::new(50, 10)));
        assert!(o.contains(Point::new(-10, 0)));
        assert!(!o.contains(Point::new(-10, 10)));
    }
}
