//! Routing result and error types.

use crate::board::BoardError;
use crate::rules::NetId;

/// The [`RoutingError`] result type.
pub type RoutingResult<T> = Result<T, RoutingError>;

/// A fatal routing error.
///
/// Per-connection conditions (search bound exceeded, un-ripupable obstacle,
/// insert error) are *not* errors: they are reported as attempt states and
/// the batch loop continues. Only conditions that prevent routing entirely
/// surface here.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// The board failed ingest validation.
    #[error("invalid board: {0}")]
    InvalidBoard(#[from] BoardError),
    /// A connection references a net the board does not know.
    #[error("unknown net {0:?}")]
    UnknownNet(NetId),
}
