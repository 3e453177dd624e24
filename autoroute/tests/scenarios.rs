//! End-to-end routing scenarios on small synthetic boards.
//!
//! Coordinates are internal units (1 mm = 10 000); layer 0 is the front,
//! layer 1 the back; the default clearance is 0.2 mm.

use autoroute::batch::{BatchAutorouter, BatchOutcome};
use autoroute::board::item::{
    FixedState, Item, ItemId, ItemKind, KeepoutRules,
};
use autoroute::board::layers::LayerStructure;
use autoroute::board::RoutingBoard;
use autoroute::control::RoutingConfig;
use autoroute::drc::{check_board, DrcKind};
use autoroute::observer::BoardEvent;
use autoroute::rules::{
    BoardRules, ClearanceMatrix, Net, NetClass, NetClassId, NetId, Padstack, PadstackId,
    ViaInfo, ViaRule, ViaRuleId,
};
use autoroute::stop::NeverStop;
use geometry::prelude::*;
use indexmap::IndexMap;

const HALF_WIDTH: i64 = 400;
const CLEARANCE: i64 = 2_000;

fn make_rules(net_count: u32, active_layers: Vec<bool>) -> BoardRules {
    let mut nets = IndexMap::new();
    for n in 1..=net_count {
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
    clearance.set_all_layers(0, 0, CLEARANCE);
    let mut class = NetClass::uniform("default", 2, HALF_WIDTH, ViaRuleId(0));
    class.active_layers = active_layers;
    BoardRules {
        clearance,
        nets,
        net_classes: vec![class],
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
    }
}

fn two_layer_board(net_count: u32) -> RoutingBoard {
    RoutingBoard::new(
        LayerStructure::signal_stack(2),
        make_rules(net_count, vec![true, true]),
    )
}

fn add_pad(board: &mut RoutingBoard, x: i64, y: i64, net: u32) -> ItemId {
    board
        .add_item(Item::new(
            ItemKind::Pad {
                center: Point::new(x, y),
                padstack: PadstackId(0),
                pin_name: "1".into(),
            },
            vec![NetId(net)],
        ))
        .unwrap()
}

fn add_trace(
    board: &mut RoutingBoard,
    from: Point,
    to: Point,
    net: u32,
    fixed: FixedState,
) -> ItemId {
    board
        .add_item(
            Item::new(
                ItemKind::Trace {
                    from,
                    to,
                    layer: 0,
                    half_width: HALF_WIDTH,
                },
                vec![NetId(net)],
            )
            .with_fixed(fixed),
        )
        .unwrap()
}

fn routed_traces(board: &RoutingBoard, net: u32) -> Vec<(Point, Point, usize)> {
    board
        .items()
        .filter(|i| i.is_on_net(NetId(net)))
        .filter_map(|i| match i.kind {
            ItemKind::Trace {
                from, to, layer, ..
            } => Some((from, to, layer)),
            _ => None,
        })
        .collect()
}

fn via_count(board: &RoutingBoard) -> usize {
    board
        .items()
        .filter(|i| matches!(i.kind, ItemKind::Via { .. }))
        .count()
}

fn assert_drc_clean(board: &RoutingBoard) {
    let report = check_board(board);
    assert!(
        !report.is_failed(),
        "DRC reported errors: {:#?}",
        report.violations
    );
    assert!(
        report.of_kind(DrcKind::UnconnectedNet).is_empty(),
        "nets left unconnected: {:#?}",
        report.of_kind(DrcKind::UnconnectedNet)
    );
}

#[test]
fn single_two_pad_net_obstacle_free() {
    let mut board = two_layer_board(1);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 0, 1);

    let result = BatchAutorouter::new(&mut board, RoutingConfig::default())
        .run(&NeverStop)
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Completed);
    assert_eq!(board.connected_components(NetId(1)).len(), 1);
    assert_eq!(via_count(&board), 0, "a one-layer route needs no via");

    let traces = routed_traces(&board, 1);
    assert_eq!(traces.len(), 1, "collinear segments merge into one trace");
    let (from, to, layer) = traces[0];
    assert_eq!(layer, 0);
    assert_eq!(
        (from.min(to), from.max(to)),
        (Point::new(0, 0), Point::new(10_000, 0))
    );
    assert_drc_clean(&board);
}

#[test]
fn obstacle_between_pads_is_avoided() {
    let mut board = two_layer_board(2);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 0, 1);
    // A user-fixed foreign trace across the direct path.
    add_trace(
        &mut board,
        Point::new(5_000, -1_000),
        Point::new(5_000, 1_000),
        2,
        FixedState::UserFixed,
    );

    let result = BatchAutorouter::new(&mut board, RoutingConfig::default())
        .run(&NeverStop)
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Completed);
    assert_eq!(board.connected_components(NetId(1)).len(), 1);
    // The obstacle is untouched.
    assert_eq!(board.connected_components(NetId(2)).len(), 1);
    assert_eq!(
        routed_traces(&board, 2).len(),
        1,
        "the fixed obstacle must not be ripped"
    );
    assert_drc_clean(&board);
}

#[test]
fn three_pad_star_routes_as_a_tree() {
    let mut board = two_layer_board(1);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 0, 1);
    add_pad(&mut board, 5_000, 10_000, 1);

    let result = BatchAutorouter::new(&mut board, RoutingConfig::default())
        .run(&NeverStop)
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Completed);
    assert_eq!(board.connected_components(NetId(1)).len(), 1);
    assert_eq!(via_count(&board), 0, "everything reachable on layer 0");
    assert!(
        routed_traces(&board, 1).len() >= 2,
        "two MST edges produce at least two traces"
    );
    assert_drc_clean(&board);
}

#[test]
fn keepout_forces_layer_change() {
    let mut board = two_layer_board(1);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 0, 1);
    let keepout_shape = Rect::from_sides(4_000, -50_000, 6_000, 50_000);
    board
        .add_item(Item::new(
            ItemKind::Keepout {
                shape: TileShape::from(keepout_shape),
                first_layer: 0,
                last_layer: 0,
                prohibits: KeepoutRules {
                    traces: true,
                    vias: false,
                    pours: false,
                },
            },
            vec![],
        ))
        .unwrap();

    let result = BatchAutorouter::new(&mut board, RoutingConfig::default())
        .run(&NeverStop)
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Completed);
    assert_eq!(board.connected_components(NetId(1)).len(), 1);
    assert!(via_count(&board) >= 2, "the route must change layers twice");
    assert!(
        routed_traces(&board, 1).iter().any(|(_, _, l)| *l == 1),
        "the crossing runs on layer 1"
    );
    // No routed segment on layer 0 may enter the keep-out.
    for (from, to, layer) in routed_traces(&board, 1) {
        if layer != 0 {
            continue;
        }
        let shape = autoroute::board::item::trace_shape(from, to, HALF_WIDTH);
        assert!(
            shape
                .intersection(&TileShape::from(keepout_shape))
                .is_empty(),
            "layer-0 trace {from:?} -> {to:?} enters the keep-out"
        );
    }
    assert_drc_clean(&board);
}

#[test]
fn blocked_connection_rips_up_an_incumbent() {
    // Single routable layer: the wall cannot be avoided by a layer change.
    let mut board = RoutingBoard::new(
        LayerStructure::signal_stack(2),
        make_rules(2, vec![true, false]),
    );
    board
        .add_item(Item::new(
            ItemKind::Outline {
                shape: Polygon::from(Rect::from_sides(-8_000, -8_000, 20_000, 28_000)),
            },
            vec![],
        ))
        .unwrap();
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 20_000, 1);
    // Net 2: a wall across the full outline width, pads at its ends.
    add_pad(&mut board, -7_000, 10_000, 2);
    add_pad(&mut board, 19_000, 10_000, 2);
    let wall = add_trace(
        &mut board,
        Point::new(-7_000, 10_000),
        Point::new(19_000, 10_000),
        2,
        FixedState::NotFixed,
    );

    let observer_events = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
    struct Forwarder(std::sync::Arc<std::sync::Mutex<Vec<BoardEvent>>>);
    impl autoroute::observer::BoardObserver for Forwarder {
        fn notify(&mut self, event: &BoardEvent) {
            self.0.lock().unwrap().push(event.clone());
        }
    }
    board.add_observer(Box::new(Forwarder(observer_events.clone())));

    let result = BatchAutorouter::new(&mut board, RoutingConfig::default())
        .run(&NeverStop)
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Completed);

    // Pass 1 fails; a later pass rips the wall and routes both nets.
    assert!(result.passes.len() >= 2, "ripup requires budget escalation");
    assert!(result.passes[0].failed >= 1);
    assert!(result.passes.iter().any(|p| p.ripped >= 1));
    assert!(board.item(wall).is_none(), "the wall trace was ripped");
    assert_eq!(board.connected_components(NetId(1)).len(), 1);
    assert_eq!(board.connected_components(NetId(2)).len(), 1);
    assert_drc_clean(&board);

    let events = observer_events.lock().unwrap();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, BoardEvent::Ripup { .. })),
        "observers see the ripup"
    );
    assert!(events
        .iter()
        .any(|e| matches!(e, BoardEvent::TraceAdded { .. })));
}

#[test]
fn zero_passes_leaves_the_board_unchanged() {
    let mut board = two_layer_board(1);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 0, 1);
    let before: Vec<ItemId> = board.items().map(|i| i.id).collect();

    let config = RoutingConfig {
        max_passes: 0,
        ..Default::default()
    };
    let result = BatchAutorouter::new(&mut board, config).run(&NeverStop).unwrap();
    assert!(result.passes.is_empty());
    let after: Vec<ItemId> = board.items().map(|i| i.id).collect();
    assert_eq!(before, after);
    assert_eq!(result.remaining, 1);
}

#[test]
fn zero_time_limit_returns_partial_immediately() {
    let mut board = two_layer_board(1);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 0, 1);
    let config = RoutingConfig {
        time_limit: Some(std::time::Duration::ZERO),
        ..Default::default()
    };
    let result = BatchAutorouter::new(&mut board, config).run(&NeverStop).unwrap();
    assert_eq!(result.outcome, BatchOutcome::TimeLimit);
    assert_eq!(routed_traces(&board, 1).len(), 0);
}

#[test]
fn already_connected_pads_route_without_search() {
    let mut board = two_layer_board(1);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 0, 1);
    add_trace(
        &mut board,
        Point::zero(),
        Point::new(10_000, 0),
        1,
        FixedState::NotFixed,
    );
    let before = board.item_count();
    let result = BatchAutorouter::new(&mut board, RoutingConfig::default())
        .run(&NeverStop)
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Completed);
    assert!(result.passes.is_empty(), "nothing was queued");
    assert_eq!(board.item_count(), before);
}

#[test]
fn ninety_degree_policy_yields_axis_aligned_segments() {
    let mut board = two_layer_board(1);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 7_000, 1);
    let config = RoutingConfig {
        angle_restriction: autoroute::AngleRestriction::NinetyDegree,
        ..Default::default()
    };
    let result = BatchAutorouter::new(&mut board, config).run(&NeverStop).unwrap();
    assert_eq!(result.outcome, BatchOutcome::Completed);
    for (from, to, _) in routed_traces(&board, 1) {
        assert!(
            from.x == to.x || from.y == to.y,
            "segment {from:?} -> {to:?} is not axis-aligned"
        );
    }
    assert_drc_clean(&board);
}

#[test]
fn routed_board_passes_full_drc() {
    let mut board = two_layer_board(2);
    add_pad(&mut board, 0, 0, 1);
    add_pad(&mut board, 10_000, 0, 1);
    add_pad(&mut board, 0, 8_000, 2);
    add_pad(&mut board, 10_000, 8_000, 2);

    let result = BatchAutorouter::new(&mut board, RoutingConfig::default())
        .run(&NeverStop)
        .unwrap();
    assert_eq!(result.outcome, BatchOutcome::Completed);
    assert_drc_clean(&board);
}
