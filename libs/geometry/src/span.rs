//! One-dimensional closed intervals.

use serde::{Deserialize, Serialize};

/// A closed interval `[start, stop]` of coordinates in one dimension.
#[derive(
    Debug, Default, Clone, Copy, Hash, Ord, PartialOrd, Serialize, Deserialize, PartialEq, Eq,
)]
pub struct Span {
    start: i64,
    stop: i64,
}

impl Span {
    /// Creates a new [`Span`] between two integers, sorting them if needed.
    pub fn new(start: i64, stop: i64) -> Self {
        Self {
            start: start.min(stop),
            stop: start.max(stop),
        }
    }

    /// Creates a span of zero length encompassing the given point.
    pub const fn from_point(x: i64) -> Self {
        Self { start: x, stop: x }
    }

    /// The lower endpoint.
    #[inline]
    pub const fn start(&self) -> i64 {
        self.start
    }

    /// The upper endpoint.
    #[inline]
    pub const fn stop(&self) -> i64 {
        self.stop
    }

    /// The length of the span.
    #[inline]
    pub const fn length(&self) -> i64 {
        self.stop - self.start
    }

    /// The midpoint, rounded down.
    #[inline]
    pub const fn center(&self) -> i64 {
        (self.start + self.stop) / 2
    }

    /// Expands the span by `amount` in both directions.
    pub const fn expand_all(self, amount: i64) -> Self {
        Self {
            start: self.start - amount,
            stop: self.stop + amount,
        }
    }

    /// Returns `true` if `point` lies within the closed interval.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// let span = Span::new(10, 20);
    /// assert!(span.contains(10));
    /// assert!(span.contains(15));
    /// assert!(!span.contains(21));
    /// ```
    #[inline]
    pub const fn contains(&self, point: i64) -> bool {
        point >= self.start && point <= self.stop
    }

    /// The shortest distance between this span and a point (0 if inside).
    pub const fn dist_to(&self, point: i64) -> i64 {
        if point < self.start {
            self.start - point
        } else if point > self.stop {
            point - self.stop
        } else {
            0
        }
    }

    /// The intersection of two spans, or `None` if they do not overlap.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(Span::new(0, 10).intersection(Span::new(5, 20)), Some(Span::new(5, 10)));
    /// assert_eq!(Span::new(0, 10).intersection(Span::new(11, 20)), None);
    /// ```
    pub fn intersection(&self, other: Span) -> Option<Span> {
        let start = self.start.max(other.start);
        let stop = self.stop.min(other.stop);
        (start <= stop).then_some(Span { start, stop })
    }

    /// The smallest span containing both spans.
    pub fn union(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            stop: self.stop.max(other.stop),
        }
    }
}
