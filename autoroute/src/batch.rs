//! The batch autorouter: multi-pass driver with escalating ripup budget.

use geometry::prelude::*;
use tracing::{debug, info};

use crate::board::item::ItemId;
use crate::board::RoutingBoard;
use crate::connection::{autoroute_connection, AttemptState};
use crate::control::{RoutingConfig, RoutingControl};
use crate::drills::DrillPages;
use crate::engine::AutorouteEngine;
use crate::error::RoutingResult;
use crate::observer::BoardEvent;
use crate::optimize::{merge_collinear_traces, remove_tails};
use crate::rooms::RoomGraph;
use crate::rules::NetId;
use crate::stop::{Stoppable, TimeLimit};

/// An unrouted pin-to-pin connection, ordered for routing difficulty.
#[derive(Debug, Clone)]
pub struct IncompleteConnection {
    /// The net to route.
    pub net: NetId,
    /// An item of the start component.
    pub from: ItemId,
    /// An item of the destination component.
    pub to: ItemId,
    /// Straight-line distance between the closest item centers.
    pub airline: f64,
    /// The MST edge count of the net (components - 1).
    pub mst_edges: usize,
    /// The full start component.
    pub from_component: Vec<ItemId>,
    /// The full destination component.
    pub to_component: Vec<ItemId>,
}

/// Statistics of one batch pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassStats {
    /// The 1-based pass number.
    pub pass_no: u32,
    /// Connections queued at the start of the pass.
    pub queued: usize,
    /// Connections routed this pass.
    pub routed: usize,
    /// Connections that failed this pass.
    pub failed: usize,
    /// Connections skipped (already connected, ignored, plane).
    pub skipped: usize,
    /// Items ripped up this pass.
    pub ripped: usize,
}

/// Why the batch loop ended.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Every connection is routed.
    Completed,
    /// The pass limit was reached with connections remaining.
    PassLimit,
    /// An external stop request fired.
    Stopped,
    /// The wall-time budget elapsed.
    TimeLimit,
}

/// The result of a batch run.
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// Why the run ended.
    pub outcome: BatchOutcome,
    /// Per-pass statistics, in pass order.
    pub passes: Vec<PassStats>,
    /// Connections still incomplete when the run ended.
    pub remaining: usize,
}

/// Drives the autoroute engine over all incomplete connections of a board.
pub struct BatchAutorouter<'a> {
    board: &'a mut RoutingBoard,
    config: RoutingConfig,
}

impl<'a> BatchAutorouter<'a> {
    /// Creates a batch driver over `board` with the given options.
    pub fn new(board: &'a mut RoutingBoard, config: RoutingConfig) -> Self {
        Self { board, config }
    }

    /// Runs the batch loop until the board is routed, the pass limit is
    /// reached, or a stop/time-limit fires.
    ///
    /// The board is in a DRC-checkable state whenever this returns: inserted
    /// geometry is committed, ripped items are gone, and no half-finished
    /// trace exists.
    pub fn run(&mut self, stoppable: &dyn Stoppable) -> RoutingResult<BatchResult> {
        self.board.validate()?;
        let time = TimeLimit::new(self.config.time_limit);
        let mut passes: Vec<PassStats> = Vec::new();

        let bounds = self.board.bounding_box();
        if bounds.is_empty() {
            return Ok(BatchResult {
                outcome: BatchOutcome::Completed,
                passes,
                remaining: 0,
            });
        }
        let mut graph = RoomGraph::new();
        let mut pages = DrillPages::new(bounds.expand_all(20_000), self.config.drill_page_size);

        let mut outcome = BatchOutcome::PassLimit;
        let mut current_net: Option<NetId> = None;

        'passes: for pass_no in 1..=self.config.max_passes {
            if stoppable.is_stop_requested() {
                outcome = BatchOutcome::Stopped;
                break;
            }
            if time.is_exceeded() {
                outcome = BatchOutcome::TimeLimit;
                break;
            }

            let mut queue = incomplete_connections(self.board);
            if queue.is_empty() {
                outcome = BatchOutcome::Completed;
                break;
            }
            sort_connections(&mut queue);

            let mut stats = PassStats {
                pass_no,
                queued: queue.len(),
                ..Default::default()
            };
            let pass_watermark = self.board.next_item_id();
            let mut ripped_nets: Vec<NetId> = Vec::new();
            // Bounded re-enqueue rounds for connections undone by ripup.
            let mut rounds = 0;

            loop {
                for conn in &queue {
                    if stoppable.is_stop_requested() {
                        outcome = BatchOutcome::Stopped;
                        passes.push(stats);
                        break 'passes;
                    }
                    if time.is_exceeded() {
                        outcome = BatchOutcome::TimeLimit;
                        passes.push(stats);
                        break 'passes;
                    }
                    // An earlier route this pass may already have joined the
                    // components.
                    if components_joined(self.board, conn) {
                        stats.skipped += 1;
                        continue;
                    }

                    let mut ctrl =
                        RoutingControl::new(self.board, conn.net, &self.config, pass_no)?;
                    ctrl.ripup_watermark = pass_watermark;
                    if current_net != Some(conn.net) {
                        graph.clear_net_dependent();
                        pages.invalidate_all();
                        current_net = Some(conn.net);
                    }
                    let mut engine =
                        AutorouteEngine::new(self.board, &mut graph, &mut pages, ctrl);
                    let result = autoroute_connection(
                        &mut engine,
                        &conn.from_component,
                        &conn.to_component,
                        self.config.angle_restriction,
                        stoppable,
                        &time,
                    );
                    stats.ripped += result.ripped.len();
                    match result.state {
                        AttemptState::Routed => {
                            stats.routed += 1;
                            debug!(net = conn.net.0, pass = pass_no, "connection routed");
                        }
                        AttemptState::Stopped => {
                            outcome = BatchOutcome::Stopped;
                            passes.push(stats);
                            break 'passes;
                        }
                        AttemptState::AlreadyConnected
                        | AttemptState::NoUnconnectedNets
                        | AttemptState::ConnectedToPlane
                        | AttemptState::Skipped => {
                            stats.skipped += 1;
                        }
                        AttemptState::Failed | AttemptState::InsertError => {
                            stats.failed += 1;
                            let location = self
                                .board
                                .item(conn.from)
                                .map(|i| i.center())
                                .unwrap_or(Point::zero());
                            self.board.emit(BoardEvent::RoutingFailed {
                                location,
                                net: conn.net,
                            });
                        }
                    }
                    if !result.ripped.is_empty() {
                        // Ripped incumbents' nets must be re-routed in the
                        // same pass.
                        for net in ripped_item_nets(self.board, conn.net) {
                            if !ripped_nets.contains(&net) {
                                ripped_nets.push(net);
                            }
                        }
                    }
                }

                rounds += 1;
                if ripped_nets.is_empty() || rounds > 4 {
                    break;
                }
                queue = incomplete_connections(self.board)
                    .into_iter()
                    .filter(|c| ripped_nets.contains(&c.net))
                    .collect();
                ripped_nets.clear();
                if queue.is_empty() {
                    break;
                }
                sort_connections(&mut queue);
            }

            // Between passes: drop tails and orphan vias, straighten routed
            // traces, and start the next pass from a clean graph.
            remove_tails(self.board, self.config.remove_unconnected_vias);
            merge_collinear_traces(self.board, self.config.pull_tight_accuracy);
            graph.clear();
            pages.invalidate_all();
            current_net = None;

            info!(
                pass = pass_no,
                queued = stats.queued,
                routed = stats.routed,
                failed = stats.failed,
                skipped = stats.skipped,
                ripped = stats.ripped,
                "batch pass finished"
            );
            let made_progress = stats.routed > 0;
            passes.push(stats);

            if incomplete_connections(self.board).is_empty() {
                outcome = BatchOutcome::Completed;
                break;
            }
            if !made_progress && pass_no > 1 {
                // Escalating the budget further will not help once two
                // consecutive passes route nothing.
                let prior_progress = passes
                    .iter()
                    .rev()
                    .nth(1)
                    .map(|p| p.routed > 0)
                    .unwrap_or(true);
                if !prior_progress {
                    outcome = BatchOutcome::PassLimit;
                    break;
                }
            }
        }

        let remaining = incomplete_connections(self.board).len();
        if remaining == 0 && outcome == BatchOutcome::PassLimit {
            outcome = BatchOutcome::Completed;
        }
        Ok(BatchResult {
            outcome,
            passes,
            remaining,
        })
    }
}

fn components_joined(board: &RoutingBoard, conn: &IncompleteConnection) -> bool {
    let comps = board.connected_components(conn.net);
    comps
        .iter()
        .any(|c| c.contains(&conn.from) && c.contains(&conn.to))
}

/// The nets of the connection's net group that have become unconnected
/// again. After a ripup only the routed net itself and the ripped items'
/// nets can be incomplete; the caller filters by this set.
fn ripped_item_nets(board: &RoutingBoard, routed: NetId) -> Vec<NetId> {
    let mut nets = Vec::new();
    for net in board.rules().nets.keys() {
        if *net == routed {
            continue;
        }
        if board.connected_components(*net).len() > 1 {
            nets.push(*net);
        }
    }
    nets
}

/// Enumerates the incomplete connections of the board: one per missing MST
/// edge of every routable net.
pub fn incomplete_connections(board: &RoutingBoard) -> Vec<IncompleteConnection> {
    let net_ids: Vec<NetId> = board.rules().nets.keys().copied().collect();
    let mut out = Vec::new();
    for net in net_ids {
        let Some(class) = board.rules().net_class_for(net) else {
            continue;
        };
        if class.ignored_by_autorouter {
            continue;
        }
        if board
            .rules()
            .net(net)
            .map(|n| n.contains_plane)
            .unwrap_or(false)
        {
            continue;
        }
        let comps = board.connected_components(net);
        if comps.len() <= 1 {
            continue;
        }
        out.extend(mst_edges(board, net, comps));
    }
    out
}

/// Prim's algorithm over connected components with airline distance between
/// closest item centers; one connection per MST edge.
fn mst_edges(
    board: &RoutingBoard,
    net: NetId,
    comps: Vec<Vec<ItemId>>,
) -> Vec<IncompleteConnection> {
    let mst_edge_count = comps.len() - 1;
    let mut in_tree = vec![false; comps.len()];
    in_tree[0] = true;
    let mut edges = Vec::with_capacity(mst_edge_count);
    for _ in 0..mst_edge_count {
        let mut best: Option<(f64, usize, ItemId, ItemId)> = None;
        for (i, comp) in comps.iter().enumerate() {
            if !in_tree[i] {
                continue;
            }
            for (j, other) in comps.iter().enumerate() {
                if in_tree[j] {
                    continue;
                }
                let Some((d, a, b)) = closest_pair(board, comp, other) else {
                    continue;
                };
                let better = match &best {
                    None => true,
                    Some((bd, _, ba, bb)) => {
                        d < *bd || (d == *bd && (a, b) < (*ba, *bb))
                    }
                };
                if better {
                    best = Some((d, j, a, b));
                }
            }
        }
        let Some((airline, j, from, to)) = best else {
            break;
        };
        in_tree[j] = true;
        let from_component = comps
            .iter()
            .enumerate()
            .filter(|(i, _)| in_tree[*i] && *i != j)
            .flat_map(|(_, c)| c.iter().copied())
            .collect();
        edges.push(IncompleteConnection {
            net,
            from,
            to,
            airline,
            mst_edges: mst_edge_count,
            from_component,
            to_component: comps[j].clone(),
        });
    }
    edges
}

fn closest_pair(
    board: &RoutingBoard,
    a: &[ItemId],
    b: &[ItemId],
) -> Option<(f64, ItemId, ItemId)> {
    let mut best: Option<(f64, ItemId, ItemId)> = None;
    for &ia in a {
        for &ib in b {
            let (Some(item_a), Some(item_b)) = (board.item(ia), board.item(ib)) else {
                continue;
            };
            let d = item_a.center().distance(item_b.center());
            let better = match &best {
                None => true,
                Some((bd, ba, bb)) => d < *bd || (d == *bd && (ia, ib) < (*ba, *bb)),
            };
            if better {
                best = Some((d, ia, ib));
            }
        }
    }
    best
}

/// Sorts connections by difficulty: fewer MST edges first, then shorter
/// airline, then deterministic id order.
fn sort_connections(queue: &mut [IncompleteConnection]) {
    queue.sort_by(|a, b| {
        a.mst_edges
            .cmp(&b.mst_edges)
            .then(a.airline.total_cmp(&b.airline))
            .then(a.net.cmp(&b.net))
            .then(a.from.cmp(&b.from))
            .then(a.to.cmp(&b.to))
    });
}
