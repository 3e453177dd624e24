//! Axis directions.

use serde::{Deserialize, Serialize};

/// An axis direction in the plane.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dir {
    /// The horizontal (x) axis.
    Horiz,
    /// The vertical (y) axis.
    Vert,
}

impl Dir {
    /// Returns the other direction.
    ///
    /// # Example
    ///
    /// ```
    /// # use geometry::prelude::*;
    /// assert_eq!(Dir::Horiz.other(), Dir::Vert);
    /// assert_eq!(Dir::Vert.other(), Dir::Horiz);
    /// ```
    #[inline]
    pub const fn other(&self) -> Self {
        match self {
            Self::Horiz => Self::Vert,
            Self::Vert => Self::Horiz,
        }
    }
}

impl std::ops::Not for Dir {
    type Output = Self;
    fn not(self) -> Self::Output {
        self.other()
    }
}
