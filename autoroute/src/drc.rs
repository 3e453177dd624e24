//! The design-rule checker: clearance, net conflicts, keep-out violations
//! and unconnected nets.

use arcstr::ArcStr;
use geometry::prelude::*;
use itertools::Itertools;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::board::item::{Item, ItemId, ItemKind};
use crate::board::RoutingBoard;

/// The kind of a rule violation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrcKind {
    /// Two foreign-net items are closer than their required clearance.
    Clearance,
    /// Two foreign-net items overlap.
    NetConflict,
    /// An item lies inside a keep-out that prohibits its kind.
    Keepout,
    /// An item extends outside the board outline.
    Outline,
    /// A net is split into more than one connected component.
    UnconnectedNet,
}

/// The severity of a violation. Only errors count toward the failed-DRC
/// predicate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// A hard rule violation.
    Error,
    /// Advisory only.
    Warning,
}

/// One rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrcViolation {
    /// The violation kind.
    pub kind: DrcKind,
    /// The severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: ArcStr,
    /// The layer of the violation, if layer-specific.
    pub layer: Option<usize>,
    /// A representative location.
    pub location: Point,
    /// The involved items.
    pub items: Vec<ItemId>,
}

/// The result of a DRC run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DrcReport {
    /// All violations found.
    pub violations: Vec<DrcViolation>,
}

impl DrcReport {
    /// The number of error-severity violations.
    pub fn error_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Error)
            .count()
    }

    /// Whether the board fails DRC (has at least one error).
    pub fn is_failed(&self) -> bool {
        self.error_count() > 0
    }

    /// The violations of one kind.
    pub fn of_kind(&self, kind: DrcKind) -> Vec<&DrcViolation> {
        self.violations.iter().filter(|v| v.kind == kind).collect()
    }
}

/// Runs all checks over the board.
pub fn check_board(board: &RoutingBoard) -> DrcReport {
    let mut report = DrcReport::default();
    check_clearance_and_conflicts(board, &mut report);
    check_keepouts(board, &mut report);
    check_outline(board, &mut report);
    check_unconnected_nets(board, &mut report);
    report
}

fn is_copper(item: &Item) -> bool {
    matches!(
        item.kind,
        ItemKind::Pad { .. }
            | ItemKind::Via { .. }
            | ItemKind::Trace { .. }
            | ItemKind::Pour { .. }
    )
}

/// Spatial-index driven scan: every copper item queries a neighbourhood of
/// its bounding box expanded by the worst-case clearance of its class.
fn check_clearance_and_conflicts(board: &RoutingBoard, report: &mut DrcReport) {
    let lc = board.layer_count();
    let mut reported: FxHashSet<(ItemId, ItemId, DrcKind)> = FxHashSet::default();
    for item in board.items() {
        if !is_copper(item) {
            continue;
        }
        let (first, last) = item.layer_span(board.rules(), lc);
        for layer in first..=last {
            let Some(shape) = item.shape_on_layer(board.rules(), layer) else {
                continue;
            };
            let reach = board
                .rules()
                .clearance
                .max_value_for_class(item.clearance_class, layer);
            let region = shape.bbox().expand_all(reach);
            let mut candidates: Vec<(ItemId, usize)> = Vec::new();
            board.spatial_index().visit_overlapping(region, |id, idx| {
                if id > item.id {
                    candidates.push((id, idx));
                }
            });
            for (other_id, shape_idx) in candidates {
                let Some(other) = board.item(other_id) else {
                    continue;
                };
                // The same predicate the router uses: copper pairs with no
                // shared net on overlapping layers.
                if !item.is_obstacle(other, board.rules(), lc) {
                    continue;
                }
                let other_layer = other.tree_shape_layer(board.rules(), lc, shape_idx);
                if other_layer != layer {
                    continue;
                }
                let Some(other_shape) = other.shape_on_layer(board.rules(), layer) else {
                    continue;
                };
                let distance = shape.distance(&other_shape);
                let required =
                    board.clearance_between(item, other, layer, false) as f64;
                let location = Line::new(shape.center(), other_shape.center()).midpoint();
                if distance == 0.0 {
                    if reported.insert((item.id, other_id, DrcKind::NetConflict)) {
                        report.violations.push(DrcViolation {
                            kind: DrcKind::NetConflict,
                            severity: Severity::Error,
                            message: arcstr::format!(
                                "items {} and {} of different nets overlap on layer {layer}",
                                item.id.0,
                                other_id.0
                            ),
                            layer: Some(layer),
                            location,
                            items: vec![item.id, other_id],
                        });
                    }
                } else if distance < required
                    && reported.insert((item.id, other_id, DrcKind::Clearance))
                {
                    report.violations.push(DrcViolation {
                        kind: DrcKind::Clearance,
                        severity: Severity::Error,
                        message: arcstr::format!(
                            "clearance {distance:.0} < required {required:.0} between items {} and {} on layer {layer}",
                            item.id.0,
                            other_id.0
                        ),
                        layer: Some(layer),
                        location,
                        items: vec![item.id, other_id],
                    });
                }
            }
        }
    }
}

fn check_keepouts(board: &RoutingBoard, report: &mut DrcReport) {
    let lc = board.layer_count();
    for keepout in board.items() {
        let ItemKind::Keepout {
            shape,
            first_layer,
            last_layer,
            ..
        } = &keepout.kind
        else {
            continue;
        };
        for layer in *first_layer..=*last_layer {
            let mut candidates: Vec<ItemId> = Vec::new();
            board
                .spatial_index()
                .visit_overlapping(shape.bbox(), |id, _| {
                    if id != keepout.id && !candidates.contains(&id) {
                        candidates.push(id);
                    }
                });
            for id in candidates {
                let Some(item) = board.item(id) else {
                    continue;
                };
                if !keepout.is_obstacle(item, board.rules(), lc) {
                    continue;
                }
                let Some(item_shape) = item.shape_on_layer(board.rules(), layer) else {
                    continue;
                };
                if shape.intersection(&item_shape).is_empty() {
                    continue;
                }
                report.violations.push(DrcViolation {
                    kind: DrcKind::Keepout,
                    severity: Severity::Error,
                    message: arcstr::format!(
                        "item {} violates keep-out {} on layer {layer}",
                        item.id.0,
                        keepout.id.0
                    ),
                    layer: Some(layer),
                    location: item_shape.center(),
                    items: vec![item.id, keepout.id],
                });
            }
        }
    }
}

/// Every copper item must lie fully inside the board outline, when one was
/// ingested.
fn check_outline(board: &RoutingBoard, report: &mut DrcReport) {
    let lc = board.layer_count();
    let Some(outline) = board
        .items()
        .find(|i| matches!(i.kind, ItemKind::Outline { .. }))
    else {
        return;
    };
    for item in board.items() {
        if !is_copper(item) {
            continue;
        }
        if outline.is_obstacle(item, board.rules(), lc) {
            report.violations.push(DrcViolation {
                kind: DrcKind::Outline,
                severity: Severity::Error,
                message: arcstr::format!(
                    "item {} extends outside the board outline",
                    item.id.0
                ),
                layer: None,
                location: item.center(),
                items: vec![item.id, outline.id],
            });
        }
    }
}

fn check_unconnected_nets(board: &RoutingBoard, report: &mut DrcReport) {
    for net in board.rules().nets.values() {
        let comps = board.connected_components(net.number);
        if comps.len() > 1 {
            let items = comps.iter().flatten().copied().collect_vec();
            let location = items
                .first()
                .and_then(|&id| board.item(id))
                .map(|i| i.center())
                .unwrap_or(Point::zero());
            report.violations.push(DrcViolation {
                kind: DrcKind::UnconnectedNet,
                severity: Severity::Warning,
                message: arcstr::format!(
                    "net {} has {} unconnected components",
                    net.name,
                    comps.len()
                ),
                layer: None,
                location,
                items,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::item::Item;
    use crate::board::layers::LayerStructure;
    use crate::rules::{
        BoardRules, ClearanceMatrix, Net, NetClass, NetClassId, NetId, Padstack, PadstackId,
        ViaInfo, ViaRule, ViaRuleId,
    };
    use indexmap::IndexMap;

    fn board() -> RoutingBoard {
        let mut nets = IndexMap::new();
        for n in 1..=2u32 {
            nets.insert(
                NetId(n),
                Net {
                    number: NetId(n),
                    name: arcstr::format!("N{n}"),
                    class: NetClassId(0),
                    contains_plane: false,
                },
            );
        }
        let mut clearance = ClearanceMatrix::new(1, 2);
        clearance.set_all_layers(0, 0, 2_000);
        let rules = BoardRules {
            clearance,
            nets,
            net_classes: vec![NetClass::uniform("default", 2, 250, ViaRuleId(0))],
            padstacks: vec![Padstack::round("via", 2, 0..2, 300)],
            via_rules: vec![ViaRule {
                name: "default".into(),
                infos: vec![ViaInfo {
                    padstack: PadstackId(0),
                    clearance_class: 0,
                    attach_smd: false,
                }],
            }],
        };
        RoutingBoard::new(LayerStructure::signal_stack(2), rules)
    }

    fn trace(b: &mut RoutingBoard, net: u32, y: i64) -> ItemId {
        b.add_item(Item::new(
            ItemKind::Trace {
                from: Point::new(0, y),
                to: Point::new(10_000, y),
                layer: 0,
                half_width: 250,
            },
            vec![NetId(net)],
        ))
        .unwrap()
    }

    #[test]
    fn clearance_violation_is_reported() {
        let mut b = board();
        trace(&mut b, 1, 0);
        // 1_000 edge-to-edge, below the 2_000 requirement.
        trace(&mut b, 2, 1_500);
        let report = check_board(&b);
        assert_eq!(report.of_kind(DrcKind::Clearance).len(), 1);
        assert!(report.is_failed());
    }

    #[test]
    fn overlap_is_a_net_conflict() {
        let mut b = board();
        trace(&mut b, 1, 0);
        trace(&mut b, 2, 100);
        let report = check_board(&b);
        assert_eq!(report.of_kind(DrcKind::NetConflict).len(), 1);
        assert!(report.of_kind(DrcKind::Clearance).is_empty());
    }

    #[test]
    fn well_spaced_board_passes() {
        let mut b = board();
        trace(&mut b, 1, 0);
        trace(&mut b, 2, 20_000);
        let report = check_board(&b);
        // The two single-trace nets are each one component; only clearance
        // and conflicts are errors.
        assert!(!report.is_failed());
    }

    #[test]
    fn copper_outside_the_outline_is_reported() {
        let mut b = board();
        b.add_item(Item::new(
            ItemKind::Outline {
                shape: Polygon::from(Rect::from_sides(-5_000, -5_000, 5_000, 5_000)),
            },
            vec![],
        ))
        .unwrap();
        // Fully inside: clean.
        b.add_item(Item::new(
            ItemKind::Trace {
                from: Point::new(-2_000, 0),
                to: Point::new(2_000, 0),
                layer: 0,
                half_width: 250,
            },
            vec![NetId(1)],
        ))
        .unwrap();
        assert!(check_board(&b).of_kind(DrcKind::Outline).is_empty());
        // Sticking out on the right: reported.
        let escapee = b
            .add_item(Item::new(
                ItemKind::Trace {
                    from: Point::new(0, 2_000),
                    to: Point::new(8_000, 2_000),
                    layer: 0,
                    half_width: 250,
                },
                vec![NetId(2)],
            ))
            .unwrap();
        let report = check_board(&b);
        let violations = report.of_kind(DrcKind::Outline);
        assert_eq!(violations.len(), 1);
        assert!(violations[0].items.contains(&escapee));
        assert!(report.is_failed());
    }

    #[test]
    fn split_net_is_a_warning() {
        let mut b = board();
        trace(&mut b, 1, 0);
        b.add_item(Item::new(
            ItemKind::Trace {
                from: Point::new(50_000, 0),
                to: Point::new(60_000, 0),
                layer: 0,
                half_width: 250,
            },
            vec![NetId(1)],
        ))
        .unwrap();
        let report = check_board(&b);
        let unconnected = report.of_kind(DrcKind::UnconnectedNet);
        assert_eq!(unconnected.len(), 1);
        assert_eq!(unconnected[0].severity, Severity::Warning);
        assert!(!report.is_failed());
    }
}
