//! An expansion-room autorouter for printed-circuit boards.
//!
//! Given a board with fixed pads, pre-existing traces, keep-out regions, a
//! layer stack and a set of electrical nets, the engine produces trace and
//! via geometry that connects every net while respecting width, clearance
//! and keep-out constraints.
//!
//! # Architecture
//!
//! Routable free space is decomposed lazily into convex *expansion rooms*
//! linked by *doors* (shared edges or regions) and *drills* (layer-change
//! locations). An A* maze search walks this graph from the start items of a
//! connection to its destination items, guided by an admissible
//! destination-distance lower bound; the backtracked door path is
//! materialised as traces and vias. The [`batch::BatchAutorouter`] iterates
//! over all incomplete connections across multiple passes with an
//! escalating rip-up budget, and [`drc::check_board`] validates the result.
//!
//! All coordinates are signed fixed-point integers with 1 mm = 10 000
//! units; see the [`geometry`] crate for the primitives and the coordinate
//! range contract.
//!
//! # Example
//!
//! Route a two-pad net on an otherwise empty two-layer board:
//!
//! ```
//! use autoroute::batch::{BatchAutorouter, BatchOutcome};
//! use autoroute::board::item::{Item, ItemKind};
//! use autoroute::board::layers::LayerStructure;
//! use autoroute::board::RoutingBoard;
//! use autoroute::control::RoutingConfig;
//! use autoroute::rules::*;
//! use autoroute::stop::NeverStop;
//! use geometry::prelude::*;
//! use indexmap::IndexMap;
//!
//! let mut nets = IndexMap::new();
//! nets.insert(
//!     NetId(1),
//!     Net { number: NetId(1), name: "SIG".into(), class: NetClassId(0), contains_plane: false },
//! );
//! let rules = BoardRules {
//!     clearance: ClearanceMatrix::new(1, 2),
//!     nets,
//!     net_classes: vec![NetClass::uniform("default", 2, 500, ViaRuleId(0))],
//!     padstacks: vec![
//!         Padstack::round("pad", 2, [0], 500),
//!         Padstack::round("via", 2, 0..2, 300),
//!     ],
//!     via_rules: vec![ViaRule {
//!         name: "default".into(),
//!         infos: vec![ViaInfo { padstack: PadstackId(1), clearance_class: 0, attach_smd: false }],
//!     }],
//! };
//! let mut board = RoutingBoard::new(LayerStructure::signal_stack(2), rules);
//! for x in [0, 10_000] {
//!     board
//!         .add_item(Item::new(
//!             ItemKind::Pad {
//!                 center: Point::new(x, 0),
//!                 padstack: PadstackId(0),
//!                 pin_name: "1".into(),
//!             },
//!             vec![NetId(1)],
//!         ))
//!         .unwrap();
//! }
//! let result = BatchAutorouter::new(&mut board, RoutingConfig::default())
//!     .run(&NeverStop)
//!     .unwrap();
//! assert_eq!(result.outcome, BatchOutcome::Completed);
//! assert_eq!(board.connected_components(NetId(1)).len(), 1);
//! ```
#![warn(missing_docs)]

pub mod batch;
pub mod board;
pub mod connection;
pub mod control;
pub mod destination;
pub mod drc;
pub mod drills;
pub mod engine;
pub mod error;
pub mod maze;
pub mod observer;
pub mod optimize;
pub mod rooms;
pub mod rules;
pub mod stop;

pub use batch::{BatchAutorouter, BatchOutcome, BatchResult};
pub use board::RoutingBoard;
pub use control::{AngleRestriction, RoutingConfig};
pub use drc::check_board;
pub use error::{RoutingError, RoutingResult};
