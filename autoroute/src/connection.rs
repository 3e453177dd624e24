//! Routing a single connection: prepare rooms, run the maze search,
//! materialise the path as traces and vias, execute ripups.

use geometry::prelude::*;
use tracing::debug;

use crate::board::item::{trace_shape, Item, ItemId, ItemKind};
use crate::control::AngleRestriction;
use crate::engine::AutorouteEngine;
use crate::maze::{MazeOutcome, MazeSearch, PathNode};
use crate::observer::BoardEvent;
use crate::rules::PadstackId;
use crate::stop::{Stoppable, TimeLimit};

/// The per-connection outcome taxonomy.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AttemptState {
    /// The connection was routed and inserted.
    Routed,
    /// Start and destination were already in one connected component.
    AlreadyConnected,
    /// The item has no unconnected nets to route.
    NoUnconnectedNets,
    /// The net is carried by a conduction plane; nothing to route.
    ConnectedToPlane,
    /// The connection was skipped (e.g. net ignored by the autorouter).
    Skipped,
    /// No legal path was found at the current ripup budget.
    Failed,
    /// A found path could not be materialised (e.g. no via in the rule
    /// spans the required layers). The board is left untouched.
    InsertError,
    /// A stop request or the time limit fired mid-search.
    Stopped,
}

/// The result of routing one connection.
#[derive(Debug, Clone)]
pub struct AttemptResult {
    /// The outcome.
    pub state: AttemptState,
    /// Items removed from the board to realise the route.
    pub ripped: Vec<ItemId>,
}

impl AttemptResult {
    fn of(state: AttemptState) -> Self {
        Self {
            state,
            ripped: Vec::new(),
        }
    }
}

/// Routes one connection between two item sets on the engine's net.
///
/// On success the ripped incumbents are removed and the new traces/vias are
/// inserted; on any failure the board is unchanged.
pub fn autoroute_connection(
    engine: &mut AutorouteEngine,
    start: &[ItemId],
    dest: &[ItemId],
    angle: AngleRestriction,
    stoppable: &dyn Stoppable,
    time: &TimeLimit,
) -> AttemptResult {
    if start.is_empty() || dest.is_empty() {
        return AttemptResult::of(AttemptState::NoUnconnectedNets);
    }
    let start_doors = engine.prepare_connection(start, dest);
    if start_doors.is_empty() {
        return AttemptResult::of(AttemptState::Failed);
    }

    let outcome = MazeSearch::new(engine, &start_doors, dest).run(stoppable, time);
    let (path, ripped) = match outcome {
        MazeOutcome::Found { path, ripped } => (path, ripped),
        MazeOutcome::NotRouted | MazeOutcome::IterationLimit => {
            return AttemptResult::of(AttemptState::Failed);
        }
        MazeOutcome::Stopped => return AttemptResult::of(AttemptState::Stopped),
    };

    let path = simplify_path(path);
    let path = snap_path(&path, angle);
    if path.len() < 2 {
        return AttemptResult::of(AttemptState::Failed);
    }

    // Snapping can move segments outside the free-space rooms; re-check the
    // snapped geometry before touching the board.
    if angle != AngleRestriction::None && !path_is_legal(engine, &path, &ripped) {
        debug!("snapped path conflicts with an obstacle; connection fails");
        return AttemptResult::of(AttemptState::Failed);
    }

    // Resolve every via before mutating anything, so an insert error leaves
    // the board untouched.
    let mut vias: Vec<(Point, usize, usize, PadstackId, usize, bool)> = Vec::new();
    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.layer != b.layer {
            let (lo, hi) = (a.layer.min(b.layer), a.layer.max(b.layer));
            let Some(span) = engine
                .ctrl
                .via_spans
                .iter()
                .find(|s| {
                    s.first_layer <= lo
                        && s.last_layer >= hi
                        && (!s.attach_smd || engine.ctrl.attach_smd_allowed)
                })
            else {
                return AttemptResult::of(AttemptState::InsertError);
            };
            vias.push((
                b.point,
                span.first_layer,
                span.last_layer,
                span.padstack,
                span.clearance_class,
                span.attach_smd,
            ));
        }
    }

    // Execute the ripups.
    for &id in &ripped {
        let (location, net) = match engine.board.item(id) {
            Some(item) => (item.center(), item.nets.first().copied()),
            None => continue,
        };
        engine.remove_ripped_item(id);
        engine.board.emit(BoardEvent::Ripup { location, net });
    }

    // Insert the routed geometry.
    let net = engine.ctrl.net;
    let mut via_iter = vias.into_iter();
    let mut insert_failed = false;
    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.layer == b.layer {
            if a.point == b.point {
                continue;
            }
            let item = Item::new(
                ItemKind::Trace {
                    from: a.point,
                    to: b.point,
                    layer: a.layer,
                    half_width: engine.ctrl.trace_half_width[a.layer],
                },
                vec![net],
            )
            .with_clearance_class(engine.ctrl.trace_clearance_class);
            if engine.insert_routed_item(item).is_err() {
                insert_failed = true;
                break;
            }
        } else {
            if a.point != b.point {
                let item = Item::new(
                    ItemKind::Trace {
                        from: a.point,
                        to: b.point,
                        layer: a.layer,
                        half_width: engine.ctrl.trace_half_width[a.layer],
                    },
                    vec![net],
                )
                .with_clearance_class(engine.ctrl.trace_clearance_class);
                if engine.insert_routed_item(item).is_err() {
                    insert_failed = true;
                    break;
                }
            }
            let (_, _, _, padstack, clearance_class, attach_smd) =
                via_iter.next().expect("one resolved via per layer change");
            let item = Item::new(
                ItemKind::Via {
                    center: b.point,
                    padstack,
                    attach_smd,
                },
                vec![net],
            )
            .with_clearance_class(clearance_class);
            if engine.insert_routed_item(item).is_err() {
                insert_failed = true;
                break;
            }
        }
    }
    if insert_failed {
        return AttemptResult {
            state: AttemptState::InsertError,
            ripped,
        };
    }

    AttemptResult {
        state: AttemptState::Routed,
        ripped,
    }
}

/// Drops duplicate consecutive nodes and merges collinear same-layer runs.
fn simplify_path(path: Vec<PathNode>) -> Vec<PathNode> {
    let mut out: Vec<PathNode> = Vec::with_capacity(path.len());
    for node in path {
        if out.last() == Some(&node) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            if a.layer == b.layer
                && b.layer == node.layer
                && (b.point - a.point).cross(node.point - b.point) == 0
                && (b.point - a.point).dot(node.point - b.point) >= 0
            {
                out.pop();
            }
        }
        out.push(node);
    }
    out
}

/// Applies the angle policy: inserts corner points so that every segment
/// direction conforms, leaving the endpoints in place.
fn snap_path(path: &[PathNode], angle: AngleRestriction) -> Vec<PathNode> {
    if angle == AngleRestriction::None || path.len() < 2 {
        return path.to_vec();
    }
    let mut out: Vec<PathNode> = Vec::with_capacity(path.len() * 2);
    out.push(path[0]);
    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.layer != b.layer || a.point == b.point {
            out.push(b);
            continue;
        }
        let d = b.point - a.point;
        match angle {
            AngleRestriction::NinetyDegree => {
                if d.x != 0 && d.y != 0 {
                    out.push(PathNode {
                        point: Point::new(b.point.x, a.point.y),
                        layer: a.layer,
                    });
                }
            }
            AngleRestriction::FortyFiveDegree => {
                if d.x != 0 && d.y != 0 && d.x.abs() != d.y.abs() {
                    let diag = d.x.abs().min(d.y.abs());
                    out.push(PathNode {
                        point: a.point + Point::new(d.x.signum() * diag, d.y.signum() * diag),
                        layer: a.layer,
                    });
                }
            }
            AngleRestriction::None => {}
        }
        out.push(b);
    }
    out
}

/// Checks every segment of a path against the board's obstacles and
/// keep-outs, ignoring items about to be ripped.
fn path_is_legal(engine: &AutorouteEngine, path: &[PathNode], ripped: &[ItemId]) -> bool {
    for pair in path.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a.layer != b.layer || a.point == b.point {
            continue;
        }
        let layer = a.layer;
        let hw = engine.ctrl.trace_half_width[layer];
        let shape = trace_shape(a.point, b.point, hw);
        let clearance_reach = engine
            .board
            .rules()
            .clearance
            .max_value_for_class(engine.ctrl.trace_clearance_class, layer);
        let region = shape.bbox().expand_all(clearance_reach);
        for id in engine
            .board
            .obstacles_for_trace(engine.ctrl.net, region, &[layer])
        {
            if ripped.contains(&id) {
                continue;
            }
            let Some(item) = engine.board.item(id) else {
                continue;
            };
            let Some(ob_shape) = item.shape_on_layer(engine.board.rules(), layer) else {
                continue;
            };
            let conflict = match item.kind {
                ItemKind::Keepout { .. } => shape.distance(&ob_shape) == 0.0,
                ItemKind::Outline { .. } => {
                    // The snapped copper must stay on the board.
                    let b = shape.bbox();
                    !(ob_shape.contains(b.lo()) && ob_shape.contains(b.hi()))
                }
                _ => {
                    let required = engine.board.rules().clearance.value(
                        item.clearance_class,
                        engine.ctrl.trace_clearance_class,
                        layer,
                    );
                    shape.distance(&ob_shape) < required as f64
                }
            };
            if conflict {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: i64, y: i64, layer: usize) -> PathNode {
        PathNode {
            point: Point::new(x, y),
            layer,
        }
    }

    #[test]
    fn simplify_merges_collinear_runs() {
        let path = vec![
            node(0, 0, 0),
            node(5, 0, 0),
            node(5, 0, 0),
            node(10, 0, 0),
            node(10, 5, 0),
        ];
        let s = simplify_path(path);
        assert_eq!(s, vec![node(0, 0, 0), node(10, 0, 0), node(10, 5, 0)]);
    }

    #[test]
    fn ninety_degree_snap_inserts_corner() {
        let path = vec![node(0, 0, 0), node(10, 7, 0)];
        let s = snap_path(&path, AngleRestriction::NinetyDegree);
        assert_eq!(s, vec![node(0, 0, 0), node(10, 0, 0), node(10, 7, 0)]);
    }

    #[test]
    fn forty_five_degree_snap_splits_oblique_segments() {
        let path = vec![node(0, 0, 0), node(10, 4, 0)];
        let s = snap_path(&path, AngleRestriction::FortyFiveDegree);
        assert_eq!(s, vec![node(0, 0, 0), node(4, 4, 0), node(10, 4, 0)]);
        // Already-conforming segments stay untouched.
        let path = vec![node(0, 0, 0), node(6, 6, 0)];
        let s = snap_path(&path, AngleRestriction::FortyFiveDegree);
        assert_eq!(s, vec![node(0, 0, 0), node(6, 6, 0)]);
    }

    #[test]
    fn layer_changes_pass_through_snapping() {
        let path = vec![node(0, 0, 0), node(5, 5, 0), node(5, 5, 1)];
        let s = snap_path(&path, AngleRestriction::NinetyDegree);
        assert_eq!(s.last(), Some(&node(5, 5, 1)));
    }
}
