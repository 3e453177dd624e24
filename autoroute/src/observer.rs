//! Read-only board observers.

use geometry::prelude::*;

use crate::board::item::ItemId;
use crate::rules::NetId;

/// An event emitted by the board or the routing engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    /// A routed trace segment was inserted.
    TraceAdded {
        /// The new item's id.
        id: ItemId,
        /// The routed net.
        net: Option<NetId>,
    },
    /// A via was inserted.
    ViaAdded {
        /// The new item's id.
        id: ItemId,
        /// The routed net.
        net: Option<NetId>,
    },
    /// A connection could not be routed.
    RoutingFailed {
        /// Where the failure was detected.
        location: Point,
        /// The failing net.
        net: NetId,
    },
    /// An incumbent item was ripped up to make room.
    Ripup {
        /// The removed item's location.
        location: Point,
        /// The removed item's net.
        net: Option<NetId>,
    },
}

/// A read-only observer of board mutations and routing progress.
///
/// Observers must not mutate the board.
pub trait BoardObserver {
    /// Called for every emitted event, in board mutation order.
    fn notify(&mut self, event: &BoardEvent);
}

/// An observer that records all events; useful in tests and for driving
/// incremental renderers.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    /// The events seen so far, oldest first.
    pub events: Vec<BoardEvent>,
}

impl BoardObserver for RecordingObserver {
    fn notify(&mut self, event: &BoardEvent) {
        self.events.push(event.clone());
    }
}
