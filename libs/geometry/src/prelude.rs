//! The geometry prelude.
//!
//! Glob-import this module for convenient access to the commonly used types:
//!
//! ```
//! use geometry::prelude::*;
//! ```

pub use crate::dir::Dir;
pub use crate::line::Line;
pub use crate::octagon::Octagon;
pub use crate::point::Point;
pub use crate::polygon::Polygon;
pub use crate::rect::Rect;
pub use crate::side::Side;
pub use crate::span::Span;
pub use crate::tile::TileShape;
pub use crate::{coord_in_range, COORD_LIMIT};
