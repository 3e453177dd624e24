//! Routing rules: clearance matrix, nets, net classes, padstacks and via
//! rules.

use arcstr::ArcStr;
use geometry::prelude::*;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A positive electrical net number. Net number 0 ("no net") is represented
/// by an item having no nets at all.
#[derive(
    Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct NetId(pub u32);

/// Index of a net class in [`BoardRules::net_classes`].
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetClassId(pub usize);

/// Index of a padstack in [`BoardRules::padstacks`].
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct PadstackId(pub usize);

/// Index of a via rule in [`BoardRules::via_rules`].
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViaRuleId(pub usize);

/// Fixed safety constant added to clearance values queried during routing
/// (never during reporting).
pub const CLEARANCE_SAFETY_MARGIN: i64 = 2;

/// The minimum edge-to-edge spacing table, indexed by
/// (clearance class, clearance class, layer).
///
/// All stored values are non-negative and even; odd inputs are rounded up at
/// set time. The table is symmetric in its class arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearanceMatrix {
    class_count: usize,
    layer_count: usize,
    values: Vec<i64>,
}

impl ClearanceMatrix {
    /// Creates an all-zero matrix for the given class and layer counts.
    pub fn new(class_count: usize, layer_count: usize) -> Self {
        Self {
            class_count,
            layer_count,
            values: vec![0; class_count * class_count * layer_count],
        }
    }

    /// The number of clearance classes.
    pub fn class_count(&self) -> usize {
        self.class_count
    }

    /// The number of layers.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    fn idx(&self, a: usize, b: usize, layer: usize) -> usize {
        (layer * self.class_count + a) * self.class_count + b
    }

    /// Sets the clearance between classes `a` and `b` on `layer`.
    ///
    /// Negative values clamp to 0; odd values round up to the next even
    /// value. The matrix stays symmetric.
    pub fn set(&mut self, a: usize, b: usize, layer: usize, value: i64) {
        let value = value.max(0);
        let value = value + (value & 1);
        let i = self.idx(a, b, layer);
        self.values[i] = value;
        let j = self.idx(b, a, layer);
        self.values[j] = value;
    }

    /// Sets the clearance between classes `a` and `b` on every layer.
    pub fn set_all_layers(&mut self, a: usize, b: usize, value: i64) {
        for layer in 0..self.layer_count {
            self.set(a, b, layer, value);
        }
    }

    /// The clearance between classes `a` and `b` on `layer`.
    pub fn value(&self, a: usize, b: usize, layer: usize) -> i64 {
        self.values[self.idx(a, b, layer)]
    }

    /// The clearance plus the routing safety margin. Used by the router, not
    /// by DRC reporting.
    pub fn value_with_margin(&self, a: usize, b: usize, layer: usize) -> i64 {
        self.value(a, b, layer) + CLEARANCE_SAFETY_MARGIN
    }

    /// The largest clearance involving class `a` on `layer`; the DRC uses
    /// this as its neighbourhood query radius.
    pub fn max_value_for_class(&self, a: usize, layer: usize) -> i64 {
        (0..self.class_count)
            .map(|b| self.value(a, b, layer))
            .max()
            .unwrap_or(0)
    }

    /// Checks the invariant that every entry is non-negative and even.
    pub fn is_valid(&self) -> bool {
        self.values.iter().all(|&v| v >= 0 && v % 2 == 0)
    }
}

/// An electrical net.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    /// The positive net number.
    pub number: NetId,
    /// The net name.
    pub name: ArcStr,
    /// The net class governing routed geometry for this net.
    pub class: NetClassId,
    /// Whether the net is carried by a conduction plane.
    pub contains_plane: bool,
}

/// Routing policy for a group of nets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetClass {
    /// The class name.
    pub name: ArcStr,
    /// Trace half-width per layer.
    pub trace_half_width: Vec<i64>,
    /// Signal layers usable for routing this class.
    pub active_layers: Vec<bool>,
    /// Clearance class of traces of this class.
    pub trace_clearance_class: usize,
    /// The via rule used for layer changes.
    pub via_rule: ViaRuleId,
    /// Whether traces of this class may be shoved aside.
    pub shove_allowed: bool,
    /// Whether routed traces are pulled tight after routing.
    pub pull_tight: bool,
    /// Minimum routed length (0 = unconstrained).
    pub min_trace_length: i64,
    /// Maximum routed length (0 = unconstrained).
    pub max_trace_length: i64,
    /// Whether the autorouter skips nets of this class entirely.
    pub ignored_by_autorouter: bool,
}

impl NetClass {
    /// A class with uniform half-width and all layers active.
    pub fn uniform(
        name: impl Into<ArcStr>,
        layer_count: usize,
        half_width: i64,
        via_rule: ViaRuleId,
    ) -> Self {
        Self {
            name: name.into(),
            trace_half_width: vec![half_width; layer_count],
            active_layers: vec![true; layer_count],
            trace_clearance_class: 0,
            via_rule,
            shove_allowed: true,
            pull_tight: true,
            min_trace_length: 0,
            max_trace_length: 0,
            ignored_by_autorouter: false,
        }
    }

    /// The trace half-width on `layer`.
    pub fn trace_half_width(&self, layer: usize) -> i64 {
        self.trace_half_width[layer]
    }

    /// Whether `layer` may be used for routing this class.
    pub fn is_active(&self, layer: usize) -> bool {
        self.active_layers.get(layer).copied().unwrap_or(false)
    }
}

/// The per-layer copper shapes of a pad or via, centered at the origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Padstack {
    /// The padstack name.
    pub name: ArcStr,
    /// One optional shape per layer; `None` means no copper on that layer.
    pub shapes: Vec<Option<TileShape>>,
}

impl Padstack {
    /// A circular-ish padstack approximated by an octagon of the given
    /// radius, present on `layers`.
    pub fn round(
        name: impl Into<ArcStr>,
        layer_count: usize,
        layers: impl IntoIterator<Item = usize>,
        radius: i64,
    ) -> Self {
        let mut shapes = vec![None; layer_count];
        let shape = TileShape::from_point(Point::zero()).expand_all(radius);
        for l in layers {
            shapes[l] = Some(shape.clone());
        }
        Self {
            name: name.into(),
            shapes,
        }
    }

    /// The lowest layer carrying copper.
    pub fn first_layer(&self) -> Option<usize> {
        self.shapes.iter().position(|s| s.is_some())
    }

    /// The highest layer carrying copper.
    pub fn last_layer(&self) -> Option<usize> {
        self.shapes.iter().rposition(|s| s.is_some())
    }

    /// Whether the padstack carries copper on every layer in
    /// `[from, to]`.
    pub fn spans(&self, from: usize, to: usize) -> bool {
        let (from, to) = (from.min(to), from.max(to));
        to < self.shapes.len() && (from..=to).all(|l| self.shapes[l].is_some())
    }

    /// The shape on `layer`, if any.
    pub fn shape(&self, layer: usize) -> Option<&TileShape> {
        self.shapes.get(layer).and_then(|s| s.as_ref())
    }
}

/// One entry of a via rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViaInfo {
    /// The padstack drilled for this via.
    pub padstack: PadstackId,
    /// The clearance class of the via.
    pub clearance_class: usize,
    /// Whether this via may land on an SMD pad.
    pub attach_smd: bool,
}

/// An ordered list of via candidates; earlier entries have higher priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViaRule {
    /// The rule name.
    pub name: ArcStr,
    /// Candidate vias in priority order.
    pub infos: Vec<ViaInfo>,
}

impl ViaRule {
    /// Selects the first via whose padstack spans `[from_layer, to_layer]`.
    pub fn select<'a>(
        &'a self,
        padstacks: &[Padstack],
        from_layer: usize,
        to_layer: usize,
    ) -> Option<&'a ViaInfo> {
        self.infos
            .iter()
            .find(|info| padstacks[info.padstack.0].spans(from_layer, to_layer))
    }
}

/// The complete rule set of a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardRules {
    /// The clearance matrix.
    pub clearance: ClearanceMatrix,
    /// All nets, keyed by net number. Iteration order is deterministic.
    pub nets: IndexMap<NetId, Net>,
    /// All net classes.
    pub net_classes: Vec<NetClass>,
    /// All padstacks.
    pub padstacks: Vec<Padstack>,
    /// All via rules.
    pub via_rules: Vec<ViaRule>,
}

impl BoardRules {
    /// Looks up a net by number.
    pub fn net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(&id)
    }

    /// The net class governing `net`.
    pub fn net_class_for(&self, net: NetId) -> Option<&NetClass> {
        self.net(net).map(|n| &self.net_classes[n.class.0])
    }

    /// Looks up a padstack.
    pub fn padstack(&self, id: PadstackId) -> &Padstack {
        &self.padstacks[id.0]
    }

    /// Looks up a via rule.
    pub fn via_rule(&self, id: ViaRuleId) -> &ViaRule {
        &self.via_rules[id.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearance_rounds_up_to_even() {
        let mut m = ClearanceMatrix::new(2, 2);
        m.set(0, 1, 0, 1999);
        assert_eq!(m.value(0, 1, 0), 2000);
        assert_eq!(m.value(1, 0, 0), 2000);
        assert!(m.is_valid());
    }

    #[test]
    fn clearance_margin_only_on_request() {
        let mut m = ClearanceMatrix::new(1, 1);
        m.set(0, 0, 0, 4000);
        assert_eq!(m.value(0, 0, 0), 4000);
        assert_eq!(m.value_with_margin(0, 0, 0), 4000 + CLEARANCE_SAFETY_MARGIN);
    }

    #[test]
    fn via_rule_selects_by_priority() {
        let padstacks = vec![
            Padstack::round("via-outer", 4, [0, 1], 300),
            Padstack::round("via-thru", 4, 0..4, 400),
        ];
        let rule = ViaRule {
            name: "default".into(),
            infos: vec![
                ViaInfo {
                    padstack: PadstackId(0),
                    clearance_class: 0,
                    attach_smd: false,
                },
                ViaInfo {
                    padstack: PadstackId(1),
                    clearance_class: 0,
                    attach_smd: false,
                },
            ],
        };
        // The small via spans layers 0..=1 and wins there.
        let chosen = rule.select(&padstacks, 0, 1).unwrap();
        assert_eq!(chosen.padstack, PadstackId(0));
        // Only the through via spans 0..=3.
        let chosen = rule.select(&padstacks, 0, 3).unwrap();
        assert_eq!(chosen.padstack, PadstackId(1));
        assert!(rule.select(&padstacks, 2, 4).is_none());
    }

    #[test]
    fn padstack_span() {
        let p = Padstack::round("x", 4, [1, 2], 100);
        assert_eq!(p.first_layer(), Some(1));
        assert_eq!(p.last_layer(), Some(2));
        assert!(p.spans(1, 2));
        assert!(!p.spans(0, 2));
    }
}
