//! Post-route clean-up: trace tail removal, orphan via removal and
//! collinear segment merging.

use geometry::prelude::*;
use tracing::debug;

use crate::board::item::{FixedState, Item, ItemId, ItemKind};
use crate::board::RoutingBoard;

/// Removes trace tails (segments with a dangling endpoint) and, optionally,
/// vias that no longer join copper on at least two layers. Runs to a fixed
/// point; returns the number of removed items.
pub fn remove_tails(board: &mut RoutingBoard, remove_unconnected_vias: bool) -> usize {
    let mut removed = 0;
    loop {
        let mut victims: Vec<ItemId> = Vec::new();
        for item in board.items() {
            if item.fixed != FixedState::NotFixed {
                continue;
            }
            match &item.kind {
                ItemKind::Trace {
                    from, to, layer, ..
                } => {
                    if !endpoint_connected(board, item, *from, *layer)
                        || !endpoint_connected(board, item, *to, *layer)
                    {
                        victims.push(item.id);
                    }
                }
                ItemKind::Via { .. } if remove_unconnected_vias => {
                    if via_connected_layers(board, item) < 2 {
                        victims.push(item.id);
                    }
                }
                _ => {}
            }
        }
        if victims.is_empty() {
            break;
        }
        for id in victims {
            if board.remove_item(id) {
                removed += 1;
            }
        }
    }
    if removed > 0 {
        debug!(removed, "removed trace tails and orphan vias");
    }
    removed
}

/// Whether a trace endpoint touches copper of the same net other than the
/// trace itself.
fn endpoint_connected(board: &RoutingBoard, trace: &Item, endpoint: Point, layer: usize) -> bool {
    let half_width = match trace.kind {
        ItemKind::Trace { half_width, .. } => half_width,
        _ => 0,
    };
    let probe = Rect::from_point(endpoint).expand_all(half_width.max(1));
    let mut connected = false;
    board.spatial_index().visit_overlapping(probe, |id, shape_idx| {
        if connected || id == trace.id {
            return;
        }
        let Some(other) = board.item(id) else {
            return;
        };
        if !other.shares_net(trace) {
            return;
        }
        let (first, last) = other.layer_span(board.rules(), board.layer_count());
        let other_layer = first + shape_idx;
        if other_layer != layer || other_layer > last {
            return;
        }
        if let Some(shape) = other.shape_on_layer(board.rules(), other_layer) {
            if shape.distance(&TileShape::from_point(endpoint)) <= half_width as f64 {
                connected = true;
            }
        }
    });
    connected
}

/// The number of distinct layers of a via's span on which same-net copper
/// touches the via.
fn via_connected_layers(board: &RoutingBoard, via: &Item) -> usize {
    let lc = board.layer_count();
    let (first, last) = via.layer_span(board.rules(), lc);
    let mut layers = 0;
    for layer in first..=last {
        let Some(via_shape) = via.shape_on_layer(board.rules(), layer) else {
            continue;
        };
        let mut touched = false;
        board
            .spatial_index()
            .visit_overlapping(via_shape.bbox(), |id, shape_idx| {
                if touched || id == via.id {
                    return;
                }
                let Some(other) = board.item(id) else {
                    return;
                };
                if !other.shares_net(via)
                    || matches!(other.kind, ItemKind::Via { .. })
                {
                    return;
                }
                let (ofirst, _) = other.layer_span(board.rules(), lc);
                if ofirst + shape_idx != layer {
                    return;
                }
                if let Some(shape) = other.shape_on_layer(board.rules(), layer) {
                    if !shape.intersection(&via_shape).is_empty() {
                        touched = true;
                    }
                }
            });
        if touched {
            layers += 1;
        }
    }
    layers
}

/// Merges chains of collinear (within `accuracy`) same-net traces of equal
/// width and layer that meet at a shared endpoint. Returns the number of
/// merges performed.
pub fn merge_collinear_traces(board: &mut RoutingBoard, accuracy: i64) -> usize {
    let mut merges = 0;
    loop {
        let Some((a, b, merged)) = find_mergeable_pair(board, accuracy) else {
            break;
        };
        board.remove_item(a);
        board.remove_item(b);
        // Merged geometry covers both originals, so connectivity holds.
        if board.add_item(merged).is_ok() {
            merges += 1;
        }
    }
    merges
}

fn find_mergeable_pair(board: &RoutingBoard, accuracy: i64) -> Option<(ItemId, ItemId, Item)> {
    let traces: Vec<&Item> = board
        .items()
        .filter(|i| {
            i.fixed == FixedState::NotFixed && matches!(i.kind, ItemKind::Trace { .. })
        })
        .collect();
    for (ai, a) in traces.iter().enumerate() {
        let ItemKind::Trace {
            from: af,
            to: at,
            layer: al,
            half_width: aw,
        } = a.kind
        else {
            continue;
        };
        for b in traces.iter().skip(ai + 1) {
            let ItemKind::Trace {
                from: bf,
                to: bt,
                layer: bl,
                half_width: bw,
            } = b.kind
            else {
                continue;
            };
            if al != bl || aw != bw || a.nets != b.nets {
                continue;
            }
            // The merged segment runs between the two non-shared endpoints.
            let (shared, far_a, far_b) = if af == bf {
                (af, at, bt)
            } else if af == bt {
                (af, at, bf)
            } else if at == bf {
                (at, af, bt)
            } else if at == bt {
                (at, af, bf)
            } else {
                continue;
            };
            if far_a == far_b {
                continue;
            }
            let carrier = Line::new(far_a, far_b);
            if carrier.signed_distance(shared).abs() > accuracy as f64 {
                continue;
            }
            // The shared point must lie between the far endpoints.
            if (shared - far_a).dot(far_b - far_a) < 0
                || (shared - far_b).dot(far_a - far_b) < 0
            {
                continue;
            }
            let merged = Item::new(
                ItemKind::Trace {
                    from: far_a,
                    to: far_b,
                    layer: al,
                    half_width: aw,
                },
                a.nets.clone(),
            )
            .with_clearance_class(a.clearance_class);
            return Some((a.id, b.id, merged));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::layers::LayerStructure;
    use crate::rules::{
        ClearanceMatrix, BoardRules, Net, NetClass, NetClassId, NetId, Padstack, PadstackId,
        ViaInfo, ViaRule, ViaRuleId,
    };
    use indexmap::IndexMap;

    fn board() -> RoutingBoard {
        let mut nets = IndexMap::new();
        nets.insert(
            NetId(1),
            Net {
                number: NetId(1),
                name: "N1".into(),
                class: NetClassId(0),
                contains_plane: false,
            },
        );
        let rules = BoardRules {
            clearance: ClearanceMatrix::new(1, 2),
            nets,
            net_classes: vec![NetClass::uniform("default", 2, 250, ViaRuleId(0))],
            padstacks: vec![
                Padstack::round("pad", 2, [0], 500),
                Padstack::round("via", 2, 0..2, 300),
            ],
            via_rules: vec![ViaRule {
                name: "default".into(),
                infos: vec![ViaInfo {
                    padstack: PadstackId(1),
                    clearance_class: 0,
                    attach_smd: false,
                }],
            }],
        };
        RoutingBoard::new(LayerStructure::signal_stack(2), rules)
    }

    fn pad(b: &mut RoutingBoard, x: i64, y: i64) -> ItemId {
        b.add_item(Item::new(
            ItemKind::Pad {
                center: Point::new(x, y),
                padstack: PadstackId(0),
                pin_name: "1".into(),
            },
            vec![NetId(1)],
        ))
        .unwrap()
    }

    fn trace(b: &mut RoutingBoard, from: Point, to: Point) -> ItemId {
        b.add_item(Item::new(
            ItemKind::Trace {
                from,
                to,
                layer: 0,
                half_width: 250,
            },
            vec![NetId(1)],
        ))
        .unwrap()
    }

    #[test]
    fn dangling_trace_is_removed() {
        let mut b = board();
        pad(&mut b, 0, 0);
        pad(&mut b, 10_000, 0);
        trace(&mut b, Point::zero(), Point::new(10_000, 0));
        // A stub hanging off the route.
        let stub = trace(&mut b, Point::new(5_000, 0), Point::new(5_000, 4_000));
        let removed = remove_tails(&mut b, true);
        assert_eq!(removed, 1);
        assert!(b.item(stub).is_none());
        assert_eq!(b.connected_components(NetId(1)).len(), 1);
    }

    #[test]
    fn chained_tails_unravel() {
        let mut b = board();
        pad(&mut b, 0, 0);
        trace(&mut b, Point::zero(), Point::new(5_000, 0));
        // Two chained stubs; removing the outer one dangles the inner one.
        trace(&mut b, Point::new(5_000, 0), Point::new(5_000, 5_000));
        let count = b.item_count();
        let removed = remove_tails(&mut b, true);
        assert_eq!(removed, 2);
        assert_eq!(b.item_count(), count - 2);
    }

    #[test]
    fn orphan_via_is_removed() {
        let mut b = board();
        let via = b
            .add_item(Item::new(
                ItemKind::Via {
                    center: Point::new(3_000, 3_000),
                    padstack: PadstackId(1),
                    attach_smd: false,
                },
                vec![NetId(1)],
            ))
            .unwrap();
        assert_eq!(remove_tails(&mut b, true), 1);
        assert!(b.item(via).is_none());
    }

    #[test]
    fn collinear_traces_merge() {
        let mut b = board();
        pad(&mut b, 0, 0);
        pad(&mut b, 10_000, 0);
        trace(&mut b, Point::zero(), Point::new(4_000, 0));
        trace(&mut b, Point::new(4_000, 0), Point::new(10_000, 0));
        assert_eq!(merge_collinear_traces(&mut b, 500), 1);
        let traces: Vec<&Item> = b
            .items()
            .filter(|i| matches!(i.kind, ItemKind::Trace { .. }))
            .collect();
        assert_eq!(traces.len(), 1);
        assert_eq!(b.connected_components(NetId(1)).len(), 1);
    }
}
