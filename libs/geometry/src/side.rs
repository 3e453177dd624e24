//! Sidedness of a point relative to a directed line.

use serde::{Deserialize, Serialize};

/// The side of a directed line on which a point lies.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    /// The point is to the left of the directed line.
    Left,
    /// The point is to the right of the directed line.
    Right,
    /// The point lies on the line.
    Collinear,
}

impl Side {
    /// Classifies the sign of a 2-D cross product.
    ///
    /// A positive cross product means [`Side::Left`], a negative one
    /// [`Side::Right`].
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(Side::of_cross(7), Side::Left);
    /// assert_eq!(Side::of_cross(-3), Side::Right);
    /// assert_eq!(Side::of_cross(0), Side::Collinear);
    /// ```
    #[inline]
    pub const fn of_cross(cross: i64) -> Self {
        if cross > 0 {
            Self::Left
        } else if cross < 0 {
            Self::Right
        } else {
            Self::Collinear
        }
    }

    /// Returns the opposite side. [`Side::Collinear`] is its own opposite.
    #[inline]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Collinear => Self::Collinear,
        }
    }
}
