//! Board items: pads, vias, traces, keep-outs, the outline and copper
//! pours.
//!
//! All item kinds are collapsed into the single tagged [`ItemKind`] variant;
//! behavior differences are expressed by matching on the tag.

use arcstr::ArcStr;
use geometry::prelude::*;
use serde::{Deserialize, Serialize};

use crate::rules::{BoardRules, NetId, PadstackId};

/// A unique, board-assigned item id. Never reused within a session.
#[derive(
    Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct ItemId(pub u32);

/// The lifecycle fixing tag of an item, totally ordered from movable to
/// immovable.
#[derive(
    Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum FixedState {
    /// The router may move or remove the item.
    #[default]
    NotFixed,
    /// The item may be shoved aside but not removed.
    ShoveFixed,
    /// Fixed by the user; the router must not touch it.
    UserFixed,
    /// Fixed by the system (e.g. the board outline).
    SystemFixed,
}

/// What a keep-out area prohibits.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeepoutRules {
    /// Traces may not enter the area.
    pub traces: bool,
    /// Vias may not be placed in the area.
    pub vias: bool,
    /// Copper pours may not fill the area.
    pub pours: bool,
}

impl KeepoutRules {
    /// A keep-out prohibiting everything.
    pub const ALL: KeepoutRules = KeepoutRules {
        traces: true,
        vias: true,
        pours: true,
    };
}

/// The kind-specific state of an item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ItemKind {
    /// A component pad (or pin). Not routable.
    Pad {
        /// The pad center.
        center: Point,
        /// The per-layer copper shapes.
        padstack: PadstackId,
        /// The pin designator within the component.
        pin_name: ArcStr,
    },
    /// A drilled via.
    Via {
        /// The drill center.
        center: Point,
        /// The per-layer copper shapes.
        padstack: PadstackId,
        /// Whether the via is attached directly to an SMD pad.
        attach_smd: bool,
    },
    /// A straight trace segment.
    Trace {
        /// One endpoint.
        from: Point,
        /// The other endpoint.
        to: Point,
        /// The signal layer the trace runs on.
        layer: usize,
        /// Half of the trace width.
        half_width: i64,
    },
    /// A keep-out (rule) area.
    Keepout {
        /// The prohibited region.
        shape: TileShape,
        /// First layer of the prohibition.
        first_layer: usize,
        /// Last layer of the prohibition.
        last_layer: usize,
        /// What the area prohibits.
        prohibits: KeepoutRules,
    },
    /// The closed board outline. Everything outside it is off-board.
    Outline {
        /// The outline polygon.
        shape: Polygon,
    },
    /// A conduction area (copper pour) on a single layer.
    Pour {
        /// The filled region.
        shape: TileShape,
        /// The layer the pour fills.
        layer: usize,
    },
}

/// A board item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    /// The board-assigned id.
    pub id: ItemId,
    /// The fixing state.
    pub fixed: FixedState,
    /// Index into the clearance matrix.
    pub clearance_class: usize,
    /// The owning component number (0 if standalone).
    pub component: u32,
    /// The nets the item belongs to (empty = no net).
    pub nets: Vec<NetId>,
    /// The kind-specific state.
    pub kind: ItemKind,
}

impl Item {
    /// Creates an item with default fixing and clearance class. The id is
    /// assigned by the board on insertion.
    pub fn new(kind: ItemKind, nets: Vec<NetId>) -> Self {
        Self {
            id: ItemId(0),
            fixed: FixedState::NotFixed,
            clearance_class: 0,
            component: 0,
            nets,
            kind,
        }
    }

    /// Sets the fixing state.
    pub fn with_fixed(mut self, fixed: FixedState) -> Self {
        self.fixed = fixed;
        self
    }

    /// Sets the clearance class.
    pub fn with_clearance_class(mut self, class: usize) -> Self {
        self.clearance_class = class;
        self
    }

    /// Sets the owning component.
    pub fn with_component(mut self, component: u32) -> Self {
        self.component = component;
        self
    }

    /// Returns `true` if the items share at least one net.
    pub fn shares_net(&self, other: &Item) -> bool {
        self.nets.iter().any(|n| other.nets.contains(n))
    }

    /// Returns `true` if the item belongs to `net`.
    pub fn is_on_net(&self, net: NetId) -> bool {
        self.nets.contains(&net)
    }

    /// The layer span `[first, last]` occupied by this item.
    pub fn layer_span(&self, rules: &BoardRules, layer_count: usize) -> (usize, usize) {
        match &self.kind {
            ItemKind::Pad { padstack, .. } | ItemKind::Via { padstack, .. } => {
                let p = rules.padstack(*padstack);
                (
                    p.first_layer().unwrap_or(0),
                    p.last_layer().unwrap_or(layer_count.saturating_sub(1)),
                )
            }
            ItemKind::Trace { layer, .. } | ItemKind::Pour { layer, .. } => (*layer, *layer),
            ItemKind::Keepout {
                first_layer,
                last_layer,
                ..
            } => (*first_layer, *last_layer),
            ItemKind::Outline { .. } => (0, layer_count.saturating_sub(1)),
        }
    }

    /// Returns `true` if the item occupies `layer`.
    pub fn is_on_layer(&self, rules: &BoardRules, layer_count: usize, layer: usize) -> bool {
        let (first, last) = self.layer_span(rules, layer_count);
        layer >= first && layer <= last
    }

    /// The copper (or prohibition) shape of the item on `layer`, if any.
    pub fn shape_on_layer(&self, rules: &BoardRules, layer: usize) -> Option<TileShape> {
        match &self.kind {
            ItemKind::Pad {
                center, padstack, ..
            }
            | ItemKind::Via {
                center, padstack, ..
            } => rules
                .padstack(*padstack)
                .shape(layer)
                .map(|s| s.translate(*center)),
            ItemKind::Trace {
                from,
                to,
                layer: l,
                half_width,
            } => (*l == layer).then(|| trace_shape(*from, *to, *half_width)),
            ItemKind::Keepout {
                shape,
                first_layer,
                last_layer,
                ..
            } => (layer >= *first_layer && layer <= *last_layer).then(|| shape.clone()),
            ItemKind::Outline { shape } => Some(TileShape::Polygon(shape.clone())),
            ItemKind::Pour { shape, layer: l } => (*l == layer).then(|| shape.clone()),
        }
    }

    /// The number of sub-shapes stored in the spatial index, one per
    /// occupied layer.
    pub fn tree_shape_count(&self, rules: &BoardRules, layer_count: usize) -> usize {
        let (first, last) = self.layer_span(rules, layer_count);
        last - first + 1
    }

    /// The layer of the sub-shape with index `i`.
    pub fn tree_shape_layer(&self, rules: &BoardRules, layer_count: usize, i: usize) -> usize {
        self.layer_span(rules, layer_count).0 + i
    }

    /// The bounding box over all layers.
    pub fn bounding_box(&self, rules: &BoardRules, layer_count: usize) -> Rect {
        let (first, last) = self.layer_span(rules, layer_count);
        let mut bbox = Rect::EMPTY;
        for layer in first..=last {
            if let Some(shape) = self.shape_on_layer(rules, layer) {
                bbox = bbox.union(shape.bbox());
            }
        }
        bbox
    }

    /// A representative location for event reporting and ripup ordering.
    pub fn center(&self) -> Point {
        match &self.kind {
            ItemKind::Pad { center, .. } | ItemKind::Via { center, .. } => *center,
            ItemKind::Trace { from, to, .. } => Line::new(*from, *to).midpoint(),
            ItemKind::Keepout { shape, .. } | ItemKind::Pour { shape, .. } => shape.center(),
            ItemKind::Outline { shape } => shape.centroid(),
        }
    }

    /// The routed length of the item (0 for non-traces). Used by the ripup
    /// cost formula.
    pub fn routed_length(&self) -> f64 {
        match &self.kind {
            ItemKind::Trace { from, to, .. } => from.distance(*to),
            _ => 0.0,
        }
    }

    /// Whether the router may in principle remove this item during ripup.
    ///
    /// Pads are never routable; traces and vias are routable unless fixed by
    /// the user or the system.
    pub fn is_routable(&self) -> bool {
        matches!(
            self.kind,
            ItemKind::Trace { .. } | ItemKind::Via { .. }
        ) && self.fixed < FixedState::UserFixed
    }

    /// For keep-outs: whether the prohibition applies to items of `net`.
    /// A net-scoped keep-out exempts its own nets.
    pub fn keepout_applies_to(&self, net: Option<NetId>) -> bool {
        match net {
            Some(n) => !self.nets.contains(&n),
            None => true,
        }
    }

    /// The obstacle predicate: returns `true` if `self` blocks `other`.
    ///
    /// Items sharing a net never obstruct each other. Keep-outs obstruct the
    /// kinds they prohibit; the outline obstructs everything outside it;
    /// everything else obstructs foreign-net copper on a shared layer.
    /// Keep-outs and the outline are never obstructed themselves: the
    /// predicate is directional.
    pub fn is_obstacle(
        &self,
        other: &Item,
        rules: &BoardRules,
        layer_count: usize,
    ) -> bool {
        if self.id == other.id || self.shares_net(other) {
            return false;
        }
        let (f0, l0) = self.layer_span(rules, layer_count);
        let (f1, l1) = other.layer_span(rules, layer_count);
        let layers_overlap = f0 <= l1 && f1 <= l0;
        match &self.kind {
            ItemKind::Keepout { prohibits, .. } => {
                if !layers_overlap || !self.keepout_applies_to(other.nets.first().copied()) {
                    return false;
                }
                match other.kind {
                    ItemKind::Trace { .. } => prohibits.traces,
                    ItemKind::Via { .. } => prohibits.vias,
                    ItemKind::Pour { .. } => prohibits.pours,
                    _ => false,
                }
            }
            ItemKind::Outline { shape } => {
                // The outline obstructs items that stick outside of it.
                let other_bbox = other.bounding_box(rules, layer_count);
                !(shape.contains(other_bbox.lo()) && shape.contains(other_bbox.hi()))
            }
            _ => {
                layers_overlap
                    && !matches!(
                        other.kind,
                        ItemKind::Keepout { .. } | ItemKind::Outline { .. }
                    )
            }
        }
    }
}

/// The copper shape of a straight trace segment: the octagon hull of the two
/// endpoints, expanded by the half-width.
///
/// Exact for segments running at multiples of 45 degrees; a conservative
/// cover for oblique segments.
pub fn trace_shape(from: Point, to: Point, half_width: i64) -> TileShape {
    TileShape::Octagon(Octagon::from_segment(from, to).expand_all(half_width))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{ClearanceMatrix, Net, NetClass, ViaInfo, ViaRule, ViaRuleId};
    use indexmap::IndexMap;

    fn rules() -> BoardRules {
        let padstacks = vec![
            crate::rules::Padstack::round("pad", 2, [0], 500),
            crate::rules::Padstack::round("via", 2, 0..2, 300),
        ];
        let mut nets = IndexMap::new();
        for n in 1..=2u32 {
            nets.insert(
                NetId(n),
                Net {
                    number: NetId(n),
                    name: arcstr::format!("N{n}"),
                    class: crate::rules::NetClassId(0),
                    contains_plane: false,
                },
            );
        }
        BoardRules {
            clearance: ClearanceMatrix::new(1, 2),
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

    #[test]
    fn same_net_items_never_obstruct() {
        let r = rules();
        let mut a = Item::new(
            ItemKind::Pad {
                center: Point::zero(),
                padstack: PadstackId(0),
                pin_name: "1".into(),
            },
            vec![NetId(1)],
        );
        a.id = ItemId(1);
        let mut b = Item::new(
            ItemKind::Trace {
                from: Point::zero(),
                to: Point::new(1000, 0),
                layer: 0,
                half_width: 250,
            },
            vec![NetId(1)],
        );
        b.id = ItemId(2);
        assert!(!a.is_obstacle(&b, &r, 2));
        assert!(!b.is_obstacle(&a, &r, 2));
    }

    #[test]
    fn foreign_net_pad_obstructs_trace_on_shared_layer() {
        let r = rules();
        let mut a = Item::new(
            ItemKind::Pad {
                center: Point::zero(),
                padstack: PadstackId(0),
                pin_name: "1".into(),
            },
            vec![NetId(1)],
        );
        a.id = ItemId(1);
        let mut b = Item::new(
            ItemKind::Trace {
                from: Point::zero(),
                to: Point::new(1000, 0),
                layer: 0,
                half_width: 250,
            },
            vec![NetId(2)],
        );
        b.id = ItemId(2);
        assert!(a.is_obstacle(&b, &r, 2));
        // The pad only exists on layer 0.
        let mut c = b.clone();
        c.id = ItemId(3);
        if let ItemKind::Trace { ref mut layer, .. } = c.kind {
            *layer = 1;
        }
        assert!(!a.is_obstacle(&c, &r, 2));
    }

    #[test]
    fn keepout_obstructs_only_prohibited_kinds() {
        let r = rules();
        let mut k = Item::new(
            ItemKind::Keepout {
                shape: TileShape::from(Rect::from_sides(0, 0, 1000, 1000)),
                first_layer: 0,
                last_layer: 0,
                prohibits: KeepoutRules {
                    traces: true,
                    vias: false,
                    pours: false,
                },
            },
            vec![],
        );
        k.id = ItemId(1);
        let mut t = Item::new(
            ItemKind::Trace {
                from: Point::zero(),
                to: Point::new(500, 0),
                layer: 0,
                half_width: 100,
            },
            vec![NetId(1)],
        );
        t.id = ItemId(2);
        let mut v = Item::new(
            ItemKind::Via {
                center: Point::new(500, 500),
                padstack: PadstackId(1),
                attach_smd: false,
            },
            vec![NetId(1)],
        );
        v.id = ItemId(3);
        assert!(k.is_obstacle(&t, &r, 2));
        assert!(!k.is_obstacle(&v, &r, 2));
    }

    #[test]
    fn trace_shape_is_exact_for_axis_segments() {
        let s = trace_shape(Point::zero(), Point::new(1000, 0), 100);
        assert!(s.contains(Point::new(500, 100)));
        assert!(s.contains(Point::new(-100, 0)));
        assert!(!s.contains(Point::new(500, 101)));
    }

    #[test]
    fn fixed_state_order() {
        assert!(FixedState::NotFixed < FixedState::ShoveFixed);
        assert!(FixedState::ShoveFixed < FixedState::UserFixed);
        assert!(FixedState::UserFixed < FixedState::SystemFixed);
    }
}
