//! Routing configuration and the per-net control block.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::board::RoutingBoard;
use crate::error::RoutingError;
use crate::rules::{NetId, PadstackId};

/// The angle policy for routed trace segments.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AngleRestriction {
    /// Any direction is permitted.
    #[default]
    None,
    /// Every segment direction must be a multiple of 45 degrees.
    FortyFiveDegree,
    /// Every segment must be axis-aligned.
    NinetyDegree,
}

/// User-facing routing options. All fields have the documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Upper bound on batch passes.
    pub max_passes: u32,
    /// Base unit for the per-pass ripup budget.
    pub start_ripup_cost: f64,
    /// Use per-layer (h, v) cost asymmetry to bias direction.
    pub with_preferred_directions: bool,
    /// Post-route straightening tolerance, in internal units.
    pub pull_tight_accuracy: i64,
    /// Drop orphan vias between passes.
    pub remove_unconnected_vias: bool,
    /// The angle policy for routed segments.
    pub angle_restriction: AngleRestriction,
    /// Maze-search iteration bound per connection.
    pub max_iterations_per_search: usize,
    /// Total wall-time budget for the session (`None` = unlimited).
    pub time_limit: Option<Duration>,
    /// Allow vias to land on SMD pads.
    pub attach_smd_allowed: bool,
    /// Edge length of a drill page, in internal units.
    pub drill_page_size: i64,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_passes: 100,
            start_ripup_cost: 100.0,
            with_preferred_directions: true,
            pull_tight_accuracy: 500,
            remove_unconnected_vias: true,
            angle_restriction: AngleRestriction::None,
            max_iterations_per_search: 100_000,
            time_limit: None,
            attach_smd_allowed: false,
            drill_page_size: 50_000,
        }
    }
}

/// Horizontal and vertical expansion cost factors for one layer.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpansionCostFactor {
    /// Cost per unit of horizontal travel.
    pub horizontal: f64,
    /// Cost per unit of vertical travel.
    pub vertical: f64,
}

impl ExpansionCostFactor {
    /// The smaller of the two factors.
    pub fn min(&self) -> f64 {
        self.horizontal.min(self.vertical)
    }

    /// The larger of the two factors.
    pub fn max(&self) -> f64 {
        self.horizontal.max(self.vertical)
    }
}

/// The ripup cost parameters. One formula is used throughout:
/// `item_cost = base + multiplier * pass * (item_length / 10_000)`,
/// clamped to `limit` per item.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RipupCosts {
    /// Flat cost of ripping any item.
    pub base: f64,
    /// Scales the length-dependent term per pass.
    pub multiplier: f64,
    /// The most a single item may contribute.
    pub limit: f64,
}

impl Default for RipupCosts {
    fn default() -> Self {
        Self {
            base: 100.0,
            multiplier: 10.0,
            limit: 2_000.0,
        }
    }
}

/// A via candidate resolved against the layer stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViaSpan {
    /// The padstack of the via.
    pub padstack: PadstackId,
    /// First layer reachable through this via.
    pub first_layer: usize,
    /// Last layer reachable through this via.
    pub last_layer: usize,
    /// The clearance class of the via copper.
    pub clearance_class: usize,
    /// Whether the via may land on an SMD pad.
    pub attach_smd: bool,
}

/// The resolved control block for routing one net.
///
/// Derived from the net's class and via rule plus the session
/// [`RoutingConfig`]; every dimension the router draws comes from here.
#[derive(Debug, Clone)]
pub struct RoutingControl {
    /// The net being routed.
    pub net: NetId,
    /// The board layer count.
    pub layer_count: usize,
    /// Per-layer (h, v) trace costs.
    pub trace_costs: Vec<ExpansionCostFactor>,
    /// Which layers the net may route on.
    pub layer_active: Vec<bool>,
    /// Per-layer trace half-width.
    pub trace_half_width: Vec<i64>,
    /// Half-width plus the clearance compensation used to inflate obstacle
    /// shapes during room completion.
    pub compensated_half_width: Vec<i64>,
    /// The clearance class of routed traces.
    pub trace_clearance_class: usize,
    /// Whether layer changes are allowed at all.
    pub vias_allowed: bool,
    /// Whether vias may land on SMD pads.
    pub attach_smd_allowed: bool,
    /// The via candidates in priority order, with resolved layer spans.
    pub via_spans: Vec<ViaSpan>,
    /// The radius used to keep drills clear of obstacles.
    pub via_radius: i64,
    /// The minimum cost of a normal via transition.
    pub min_normal_via_cost: f64,
    /// The minimum cost of a cheap (attach-SMD) via transition.
    pub min_cheap_via_cost: f64,
    /// The ripup cost parameters.
    pub ripup: RipupCosts,
    /// The batch pass this control block was built for (1-based).
    pub pass_no: u32,
    /// The total ripup spend allowed in one search.
    pub ripup_budget: f64,
    /// Items with an id at or above this watermark were inserted in the
    /// current batch pass and may not be ripped again within it; this keeps
    /// two nets from ripping each other's fresh routes back and forth.
    pub ripup_watermark: u32,
    /// The maze-search iteration bound.
    pub max_iterations: usize,
}

impl RoutingControl {
    /// Resolves the control block for `net` at batch pass `pass_no`.
    pub fn new(
        board: &RoutingBoard,
        net: NetId,
        config: &RoutingConfig,
        pass_no: u32,
    ) -> Result<Self, RoutingError> {
        let rules = board.rules();
        let class = rules
            .net_class_for(net)
            .ok_or(RoutingError::UnknownNet(net))?;
        let layer_count = board.layer_count();

        let trace_costs = (0..layer_count)
            .map(|layer| {
                if config.with_preferred_directions {
                    // Even layers prefer horizontal travel, odd layers
                    // vertical.
                    if layer % 2 == 0 {
                        ExpansionCostFactor {
                            horizontal: 1.0,
                            vertical: 2.0,
                        }
                    } else {
                        ExpansionCostFactor {
                            horizontal: 2.0,
                            vertical: 1.0,
                        }
                    }
                } else {
                    ExpansionCostFactor {
                        horizontal: 1.0,
                        vertical: 1.0,
                    }
                }
            })
            .collect::<Vec<_>>();

        let layer_active = (0..layer_count)
            .map(|l| board.layers().is_signal(l) && class.is_active(l))
            .collect::<Vec<_>>();

        let trace_half_width = class.trace_half_width.clone();
        let compensated_half_width = (0..layer_count)
            .map(|l| {
                trace_half_width[l]
                    + rules.clearance.value_with_margin(
                        class.trace_clearance_class,
                        class.trace_clearance_class,
                        l,
                    ) / 2
            })
            .collect::<Vec<_>>();

        let via_rule = rules.via_rule(class.via_rule);
        let mut via_spans = Vec::new();
        let mut via_radius = 0i64;
        for info in &via_rule.infos {
            let padstack = rules.padstack(info.padstack);
            let (Some(first), Some(last)) = (padstack.first_layer(), padstack.last_layer())
            else {
                continue;
            };
            for layer in first..=last {
                if let Some(shape) = padstack.shape(layer) {
                    let b = shape.bbox();
                    via_radius = via_radius.max(b.width().max(b.height()) / 2);
                }
            }
            via_spans.push(ViaSpan {
                padstack: info.padstack,
                first_layer: first,
                last_layer: last,
                clearance_class: info.clearance_class,
                attach_smd: info.attach_smd,
            });
        }

        let active_count = layer_active.iter().filter(|a| **a).count();
        let vias_allowed = active_count > 1 && !via_spans.is_empty();

        Ok(Self {
            net,
            layer_count,
            trace_costs,
            layer_active,
            trace_half_width,
            compensated_half_width,
            trace_clearance_class: class.trace_clearance_class,
            vias_allowed,
            attach_smd_allowed: config.attach_smd_allowed,
            via_spans,
            via_radius,
            min_normal_via_cost: 100.0,
            min_cheap_via_cost: 50.0,
            ripup: RipupCosts::default(),
            pass_no,
            ripup_budget: pass_no as f64 * config.start_ripup_cost,
            ripup_watermark: u32::MAX,
            max_iterations: config.max_iterations_per_search,
        })
    }

    /// The incremental cost of moving from `a` to `b` on `layer`.
    pub fn trace_cost(&self, layer: usize, a: geometry::point::Point, b: geometry::point::Point) -> f64 {
        let c = &self.trace_costs[layer];
        c.horizontal * (a.x - b.x).abs() as f64 + c.vertical * (a.y - b.y).abs() as f64
    }

    /// The cost of a via transition between two layers.
    pub fn via_cost(&self, from_layer: usize, to_layer: usize) -> f64 {
        let hops = from_layer.abs_diff(to_layer).max(1) as f64;
        self.min_normal_via_cost * hops
    }

    /// The ripup cost of removing `item_length` units of routed copper at
    /// the current pass.
    pub fn ripup_cost(&self, item_length: f64) -> f64 {
        let cost = self.ripup.base
            + self.ripup.multiplier * self.pass_no as f64 * (item_length / 10_000.0);
        cost.min(self.ripup.limit)
    }

    /// Whether `layer` may carry routed traces of this net.
    pub fn is_layer_active(&self, layer: usize) -> bool {
        self.layer_active.get(layer).copied().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_match_documentation() {
        let c = RoutingConfig::default();
        assert_eq!(c.max_passes, 100);
        assert_eq!(c.start_ripup_cost, 100.0);
        assert!(c.with_preferred_directions);
        assert_eq!(c.pull_tight_accuracy, 500);
        assert!(c.remove_unconnected_vias);
        assert_eq!(c.angle_restriction, AngleRestriction::None);
        assert_eq!(c.max_iterations_per_search, 100_000);
        assert!(c.time_limit.is_none());
        assert!(!c.attach_smd_allowed);
    }

    #[test]
    fn ripup_cost_is_capped() {
        let ripup = RipupCosts {
            base: 100.0,
            multiplier: 10.0,
            limit: 500.0,
        };
        let ctrl_cost = |pass: u32, len: f64| {
            let cost = ripup.base + ripup.multiplier * pass as f64 * (len / 10_000.0);
            cost.min(ripup.limit)
        };
        assert_eq!(ctrl_cost(1, 10_000.0), 110.0);
        assert_eq!(ctrl_cost(10, 1_000_000.0), 500.0);
    }
}
