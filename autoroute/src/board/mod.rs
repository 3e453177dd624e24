//! The routing board: item storage, spatial index, obstacle and
//! connectivity queries.

pub mod item;
pub mod layers;

use bboxtree::BboxTree;
use ena::unify::{InPlaceUnificationTable, UnifyKey};
use geometry::prelude::*;
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::observer::{BoardEvent, BoardObserver};
use crate::rules::{BoardRules, NetId, PadstackId};
use self::item::{Item, ItemId, ItemKind};
use self::layers::LayerStructure;

/// Errors raised while mutating or validating a board.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// An item's coordinates exceed the critical integer bound.
    #[error("coordinate out of range (limit {limit})", limit = geometry::COORD_LIMIT)]
    CoordinateOutOfRange,
    /// An item's bounding box is empty.
    #[error("item has an empty bounding box")]
    EmptyShape,
    /// An item references a net the board does not know.
    #[error("unknown net {0:?}")]
    UnknownNet(NetId),
    /// An item references a layer outside the stack.
    #[error("layer {0} outside the layer stack")]
    InvalidLayer(usize),
    /// The clearance matrix holds an odd or negative entry.
    #[error("clearance matrix holds an odd or negative entry")]
    InvalidClearance,
    /// A net references a class or rule outside the rule tables.
    #[error("net {0:?} references an invalid net class")]
    InvalidNetClass(NetId),
}

/// A board under routing.
///
/// The board owns all items and the spatial index. The index always reflects
/// the committed item set immediately after every [`RoutingBoard::add_item`]
/// or [`RoutingBoard::remove_item`]; the id map is injective for the life of
/// the board.
pub struct RoutingBoard {
    layers: LayerStructure,
    rules: BoardRules,
    items: IndexMap<ItemId, Item>,
    tree: BboxTree<ItemId>,
    next_id: u32,
    observers: Vec<Box<dyn BoardObserver>>,
}

impl std::fmt::Debug for RoutingBoard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoutingBoard")
            .field("layers", &self.layers.count())
            .field("items", &self.items.len())
            .finish()
    }
}

impl RoutingBoard {
    /// Creates an empty board with the given layer stack and rules.
    pub fn new(layers: LayerStructure, rules: BoardRules) -> Self {
        Self {
            layers,
            rules,
            items: IndexMap::new(),
            tree: BboxTree::new(),
            next_id: 1,
            observers: Vec::new(),
        }
    }

    /// The layer stack.
    pub fn layers(&self) -> &LayerStructure {
        &self.layers
    }

    /// The rule set.
    pub fn rules(&self) -> &BoardRules {
        &self.rules
    }

    /// The total layer count.
    pub fn layer_count(&self) -> usize {
        self.layers.count()
    }

    /// Registers a read-only observer.
    pub fn add_observer(&mut self, observer: Box<dyn BoardObserver>) {
        self.observers.push(observer);
    }

    /// Emits an event to all observers, in registration order.
    pub fn emit(&mut self, event: BoardEvent) {
        for obs in &mut self.observers {
            obs.notify(&event);
        }
    }

    /// Validates the board for routing: clearance invariants, net
    /// references, coordinate ranges.
    pub fn validate(&self) -> Result<(), BoardError> {
        if !self.rules.clearance.is_valid() {
            return Err(BoardError::InvalidClearance);
        }
        for net in self.rules.nets.values() {
            if net.class.0 >= self.rules.net_classes.len() {
                return Err(BoardError::InvalidNetClass(net.number));
            }
        }
        for item in self.items.values() {
            self.check_item(item)?;
        }
        Ok(())
    }

    fn check_item(&self, item: &Item) -> Result<(), BoardError> {
        for net in &item.nets {
            if !self.rules.nets.contains_key(net) {
                return Err(BoardError::UnknownNet(*net));
            }
        }
        match &item.kind {
            ItemKind::Trace { layer, .. } | ItemKind::Pour { layer, .. } => {
                if *layer >= self.layer_count() {
                    return Err(BoardError::InvalidLayer(*layer));
                }
            }
            ItemKind::Keepout { last_layer, .. } => {
                if *last_layer >= self.layer_count() {
                    return Err(BoardError::InvalidLayer(*last_layer));
                }
            }
            _ => {}
        }
        let bbox = item.bounding_box(&self.rules, self.layer_count());
        if bbox.is_empty() {
            return Err(BoardError::EmptyShape);
        }
        if !(bbox.lo().in_range() && bbox.hi().in_range()) {
            return Err(BoardError::CoordinateOutOfRange);
        }
        Ok(())
    }

    /// Adds an item, assigning it a fresh id and indexing its sub-shapes.
    pub fn add_item(&mut self, mut item: Item) -> Result<ItemId, BoardError> {
        self.check_item(&item)?;
        let id = ItemId(self.next_id);
        self.next_id += 1;
        item.id = id;
        let count = item.tree_shape_count(&self.rules, self.layer_count());
        for i in 0..count {
            let layer = item.tree_shape_layer(&self.rules, self.layer_count(), i);
            if let Some(shape) = item.shape_on_layer(&self.rules, layer) {
                self.tree.insert(id, i, shape.bbox());
            }
        }
        let event = match item.kind {
            ItemKind::Trace { .. } => Some(BoardEvent::TraceAdded {
                id,
                net: item.nets.first().copied(),
            }),
            ItemKind::Via { .. } => Some(BoardEvent::ViaAdded {
                id,
                net: item.nets.first().copied(),
            }),
            _ => None,
        };
        self.items.insert(id, item);
        if let Some(event) = event {
            self.emit(event);
        }
        Ok(id)
    }

    /// Removes an item. Returns `false` for a stale id (no-op).
    pub fn remove_item(&mut self, id: ItemId) -> bool {
        if self.items.shift_remove(&id).is_none() {
            return false;
        }
        self.tree.remove(id);
        true
    }

    /// Looks up an item by id.
    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    /// Iterates over all items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// The number of items on the board.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// The id the next inserted item will receive. Ids are monotonic, so
    /// this doubles as a watermark separating old from new items.
    pub fn next_item_id(&self) -> u32 {
        self.next_id
    }

    /// The spatial index.
    pub fn spatial_index(&self) -> &BboxTree<ItemId> {
        &self.tree
    }

    /// All items belonging to `net`.
    pub fn items_by_net(&self, net: NetId) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|i| i.is_on_net(net))
            .map(|i| i.id)
            .collect()
    }

    /// All items occupying `layer`.
    pub fn items_by_layer(&self, layer: usize) -> Vec<ItemId> {
        self.items
            .values()
            .filter(|i| i.is_on_layer(&self.rules, self.layer_count(), layer))
            .map(|i| i.id)
            .collect()
    }

    /// The bounding box of the board: the outline's box if an outline item
    /// exists, otherwise the union of all item boxes.
    pub fn bounding_box(&self) -> Rect {
        for item in self.items.values() {
            if let ItemKind::Outline { shape } = &item.kind {
                return shape.bbox();
            }
        }
        let mut bbox = Rect::EMPTY;
        for item in self.items.values() {
            bbox = bbox.union(item.bounding_box(&self.rules, self.layer_count()));
        }
        bbox
    }

    /// All keep-out (rule area) items.
    pub fn rule_areas(&self) -> Vec<&Item> {
        self.items
            .values()
            .filter(|i| matches!(i.kind, ItemKind::Keepout { .. }))
            .collect()
    }

    /// The board outline polygon, if one was ingested.
    pub fn outline(&self) -> Option<&Polygon> {
        self.items.values().find_map(|i| match &i.kind {
            ItemKind::Outline { shape } => Some(shape),
            _ => None,
        })
    }

    /// Every item in `region` that occupies one of `layers` and is an
    /// obstacle to a trace of `net`, per [`Item::is_obstacle`] against a
    /// probe trace spanning the region: foreign-net copper, keep-outs
    /// prohibiting traces for that net, and the board outline when the
    /// region is not fully contained in it. The result is complete and
    /// de-duplicated.
    pub fn obstacles_for_trace(
        &self,
        net: NetId,
        region: Rect,
        query_layers: &[usize],
    ) -> Vec<ItemId> {
        if region.is_empty() {
            return Vec::new();
        }
        let lc = self.layer_count();
        // One probe per queried layer; a probe's bounding box is the query
        // region itself.
        let probes: Vec<Item> = query_layers
            .iter()
            .map(|&layer| {
                Item::new(
                    ItemKind::Trace {
                        from: region.lo(),
                        to: region.hi(),
                        layer,
                        half_width: 0,
                    },
                    vec![net],
                )
            })
            .collect();
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        self.tree.visit_overlapping(region, |id, shape_idx| {
            let item = &self.items[&id];
            let layer = item.tree_shape_layer(&self.rules, lc, shape_idx);
            let Some(pos) = query_layers.iter().position(|&l| l == layer) else {
                return;
            };
            if item.is_obstacle(&probes[pos], &self.rules, lc) && seen.insert(id) {
                out.push(id);
            }
        });
        out
    }

    /// Every item in `region` that would block a via with the given
    /// padstack on `net`, per [`Item::is_obstacle`] against a probe via:
    /// foreign-net copper on the padstack's layer span, keep-outs
    /// prohibiting vias for that net, and the board outline when the probe
    /// sticks outside it.
    pub fn obstacles_for_via(
        &self,
        net: NetId,
        region: Rect,
        padstack: PadstackId,
    ) -> Vec<ItemId> {
        if region.is_empty() {
            return Vec::new();
        }
        let lc = self.layer_count();
        let probe = Item::new(
            ItemKind::Via {
                center: region.center(),
                padstack,
                attach_smd: false,
            },
            vec![net],
        );
        let mut seen = FxHashSet::default();
        let mut out = Vec::new();
        self.tree.visit_overlapping(region, |id, _| {
            let item = &self.items[&id];
            if item.is_obstacle(&probe, &self.rules, lc) && seen.insert(id) {
                out.push(id);
            }
        });
        out
    }

    /// Returns `true` iff `point` lies inside a keep-out prohibiting trace
    /// placement for `net` on `layer`, or outside the board outline.
    ///
    /// This is the enforcement hook consulted inside the maze expansion.
    pub fn is_prohibited(&self, point: Point, layer: usize, net: NetId) -> bool {
        if let Some(outline) = self.outline() {
            if !outline.contains(point) {
                return true;
            }
        }
        let mut prohibited = false;
        self.tree
            .visit_overlapping(Rect::from_point(point), |id, shape_idx| {
                if prohibited {
                    return;
                }
                let item = &self.items[&id];
                if let ItemKind::Keepout { shape, prohibits, .. } = &item.kind {
                    let l =
                        item.tree_shape_layer(&self.rules, self.layer_count(), shape_idx);
                    if l == layer
                        && prohibits.traces
                        && item.keepout_applies_to(Some(net))
                        && shape.contains(point)
                    {
                        prohibited = true;
                    }
                }
            });
        prohibited
    }

    /// Returns `true` iff placing a via spanning `[first_layer, last_layer]`
    /// at `point` is prohibited for `net`.
    pub fn is_via_prohibited(
        &self,
        point: Point,
        first_layer: usize,
        last_layer: usize,
        net: NetId,
    ) -> bool {
        if let Some(outline) = self.outline() {
            if !outline.contains(point) {
                return true;
            }
        }
        let mut prohibited = false;
        self.tree
            .visit_overlapping(Rect::from_point(point), |id, shape_idx| {
                if prohibited {
                    return;
                }
                let item = &self.items[&id];
                if let ItemKind::Keepout { shape, prohibits, .. } = &item.kind {
                    let l =
                        item.tree_shape_layer(&self.rules, self.layer_count(), shape_idx);
                    if l >= first_layer
                        && l <= last_layer
                        && prohibits.vias
                        && item.keepout_applies_to(Some(net))
                        && shape.contains(point)
                    {
                        prohibited = true;
                    }
                }
            });
        prohibited
    }

    /// Partitions the items of `net` into physically connected groups.
    ///
    /// Two items are directly connected when their copper shapes overlap on
    /// a common layer; the partition is the transitive closure via
    /// union-find.
    pub fn connected_components(&self, net: NetId) -> Vec<Vec<ItemId>> {
        let ids = self.items_by_net(net);
        if ids.is_empty() {
            return Vec::new();
        }
        let mut table: InPlaceUnificationTable<ConnKey> = InPlaceUnificationTable::new();
        for _ in &ids {
            table.new_key(());
        }
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if self.items_touch(ids[i], ids[j]) {
                    table.union(ConnKey(i as u32), ConnKey(j as u32));
                }
            }
        }
        let mut groups: IndexMap<u32, Vec<ItemId>> = IndexMap::new();
        for (i, &id) in ids.iter().enumerate() {
            let root = table.find(ConnKey(i as u32)).0;
            groups.entry(root).or_default().push(id);
        }
        groups.into_values().collect()
    }

    /// Whether the copper shapes of two items overlap on a common layer.
    pub fn items_touch(&self, a: ItemId, b: ItemId) -> bool {
        let (Some(a), Some(b)) = (self.item(a), self.item(b)) else {
            return false;
        };
        let lc = self.layer_count();
        let (f0, l0) = a.layer_span(&self.rules, lc);
        let (f1, l1) = b.layer_span(&self.rules, lc);
        let (first, last) = (f0.max(f1), l0.min(l1));
        if first > last {
            return false;
        }
        for layer in first..=last {
            if let (Some(sa), Some(sb)) = (
                a.shape_on_layer(&self.rules, layer),
                b.shape_on_layer(&self.rules, layer),
            ) {
                if !sa.intersection(&sb).is_empty() {
                    return true;
                }
            }
        }
        false
    }

    /// The clearance between the classes of two items on `layer`.
    pub fn clearance_between(
        &self,
        a: &Item,
        b: &Item,
        layer: usize,
        with_margin: bool,
    ) -> i64 {
        if with_margin {
            self.rules
                .clearance
                .value_with_margin(a.clearance_class, b.clearance_class, layer)
        } else {
            self.rules
                .clearance
                .value(a.clearance_class, b.clearance_class, layer)
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct ConnKey(u32);

impl UnifyKey for ConnKey {
    type Value = ();
    fn index(&self) -> u32 {
        self.0
    }
    fn from_index(u: u32) -> Self {
        ConnKey(u)
    }
    fn tag() -> &'static str {
        "ConnKey"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{
        ClearanceMatrix, Net, NetClass, NetClassId, Padstack, PadstackId, ViaInfo, ViaRule,
        ViaRuleId,
    };
    use super::item::KeepoutRules;

    fn two_layer_rules(net_count: u32) -> BoardRules {
        let padstacks = vec![
            Padstack::round("pad", 2, [0], 500),
            Padstack::round("via", 2, 0..2, 300),
        ];
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
        clearance.set_all_layers(0, 0, 2000);
        BoardRules {
            clearance,
            nets,
            net_classes: vec![NetClass::uniform("default", 2, 500, ViaRuleId(0))],
            padstacks,
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

    fn board() -> RoutingBoard {
        RoutingBoard::new(LayerStructure::signal_stack(2), two_layer_rules(3))
    }

    fn pad(center: Point, net: u32) -> Item {
        Item::new(
            ItemKind::Pad {
                center,
                padstack: PadstackId(0),
                pin_name: "1".into(),
            },
            vec![NetId(net)],
        )
    }

    #[test]
    fn ids_are_injective_and_fresh() {
        let mut b = board();
        let a = b.add_item(pad(Point::zero(), 1)).unwrap();
        let c = b.add_item(pad(Point::new(10_000, 0), 1)).unwrap();
        assert_ne!(a, c);
        assert!(b.remove_item(a));
        let d = b.add_item(pad(Point::zero(), 1)).unwrap();
        assert_ne!(d, a);
        assert!(!b.remove_item(a), "stale removal is a no-op");
    }

    #[test]
    fn out_of_range_items_are_refused() {
        let mut b = board();
        let err = b
            .add_item(pad(Point::new(geometry::COORD_LIMIT, 0), 1))
            .unwrap_err();
        assert_eq!(err, BoardError::CoordinateOutOfRange);
        let err = b.add_item(pad(Point::zero(), 99)).unwrap_err();
        assert_eq!(err, BoardError::UnknownNet(NetId(99)));
    }

    #[test]
    fn obstacles_for_trace_respects_nets_and_layers() {
        let mut b = board();
        let p1 = b.add_item(pad(Point::zero(), 1)).unwrap();
        let p2 = b.add_item(pad(Point::new(5_000, 0), 2)).unwrap();
        let region = Rect::from_sides(-2_000, -2_000, 8_000, 2_000);
        let obstacles = b.obstacles_for_trace(NetId(1), region, &[0]);
        assert!(!obstacles.contains(&p1), "own net is not an obstacle");
        assert!(obstacles.contains(&p2));
        // Pads only live on layer 0.
        assert!(b.obstacles_for_trace(NetId(1), region, &[1]).is_empty());
    }

    #[test]
    fn outline_obstructs_regions_leaving_it() {
        let mut b = board();
        let outline = b
            .add_item(Item::new(
                ItemKind::Outline {
                    shape: Polygon::from(Rect::from_sides(-20_000, -20_000, 20_000, 20_000)),
                },
                vec![],
            ))
            .unwrap();
        b.add_item(pad(Point::zero(), 1)).unwrap();
        let inside = Rect::from_sides(-5_000, -5_000, 5_000, 5_000);
        assert!(!b.obstacles_for_trace(NetId(2), inside, &[0]).contains(&outline));
        let leaving = Rect::from_sides(15_000, -5_000, 25_000, 5_000);
        assert!(b.obstacles_for_trace(NetId(2), leaving, &[0]).contains(&outline));
        assert!(
            b.obstacles_for_trace(NetId(2), leaving, &[1]).contains(&outline),
            "the outline spans every layer"
        );
    }

    #[test]
    fn keepout_prohibition_is_point_exact() {
        let mut b = board();
        b.add_item(
            Item::new(
                ItemKind::Keepout {
                    shape: TileShape::from(Rect::from_sides(0, 0, 1_000, 1_000)),
                    first_layer: 0,
                    last_layer: 0,
                    prohibits: KeepoutRules {
                        traces: true,
                        vias: false,
                        pours: false,
                    },
                },
                vec![],
            ),
        )
        .unwrap();
        assert!(b.is_prohibited(Point::new(500, 500), 0, NetId(1)));
        assert!(!b.is_prohibited(Point::new(500, 500), 1, NetId(1)));
        assert!(!b.is_prohibited(Point::new(1_500, 500), 0, NetId(1)));
        assert!(!b.is_via_prohibited(Point::new(500, 500), 0, 1, NetId(1)));
    }

    #[test]
    fn connected_components_split_and_join() {
        let mut b = board();
        let p1 = b.add_item(pad(Point::zero(), 1)).unwrap();
        let p2 = b.add_item(pad(Point::new(20_000, 0), 1)).unwrap();
        assert_eq!(b.connected_components(NetId(1)).len(), 2);
        // A trace joining the pads merges the components.
        b.add_item(Item::new(
            ItemKind::Trace {
                from: Point::zero(),
                to: Point::new(20_000, 0),
                layer: 0,
                half_width: 500,
            },
            vec![NetId(1)],
        ))
        .unwrap();
        let comps = b.connected_components(NetId(1));
        assert_eq!(comps.len(), 1);
        assert!(comps[0].contains(&p1) && comps[0].contains(&p2));
    }

    #[test]
    fn index_matches_items_after_mutation() {
        let mut b = board();
        let p1 = b.add_item(pad(Point::zero(), 1)).unwrap();
        let p2 = b.add_item(pad(Point::new(5_000, 0), 2)).unwrap();
        assert_eq!(b.spatial_index().len(), 2);
        b.remove_item(p1);
        assert_eq!(b.spatial_index().len(), 1);
        let hits = b
            .spatial_index()
            .overlapping(Rect::from_sides(-10_000, -10_000, 10_000, 10_000));
        assert_eq!(hits, vec![(p2, 0)]);
    }
}
