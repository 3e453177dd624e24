//! The admissible destination-distance heuristic for the maze search.
//!
//! Destination shapes are tracked as bounding boxes in three layer buckets:
//! component side (layer 0), solder side (last layer) and inner layers. The
//! estimate for a (point, layer) pair is the minimum over one-layer,
//! two-layer and three-layer paths, where each layer change contributes at
//! least the minimum via cost. Every term is a lower bound on the cost an
//! actual path must incur, so A* stays admissible.

use geometry::prelude::*;

use crate::control::ExpansionCostFactor;

/// The component/solder/inner bucket distances for one query box.
#[derive(Debug, Copy, Clone, Default)]
struct Deltas {
    max: f64,
    min: f64,
}

fn deltas(from: &Rect, to: &Rect) -> Deltas {
    let (dx, dy) = from.separation(to);
    let (dx, dy) = (dx as f64, dy as f64);
    if dx > dy {
        Deltas { max: dx, min: dy }
    } else {
        Deltas { max: dy, min: dx }
    }
}

/// Lower-bound distance from a point (or box) on a layer to the destination
/// set.
#[derive(Debug, Clone)]
pub struct DestinationDistance {
    trace_costs: Vec<ExpansionCostFactor>,
    layer_count: usize,
    active_layer_count: usize,
    min_normal_via_cost: f64,
    min_cheap_via_cost: f64,

    min_component_cost: f64,
    min_solder_cost: f64,
    min_component_inner_cost: f64,
    min_solder_inner_cost: f64,
    min_all_cost: f64,

    component_box: Rect,
    solder_box: Rect,
    inner_box: Rect,
}

impl DestinationDistance {
    /// Creates the calculator for the given per-layer trace costs and active
    /// layer mask.
    pub fn new(
        trace_costs: Vec<ExpansionCostFactor>,
        layer_active: &[bool],
        min_normal_via_cost: f64,
        min_cheap_via_cost: f64,
    ) -> Self {
        let layer_count = trace_costs.len();
        let active_layer_count = layer_active.iter().filter(|a| **a).count();

        let min_component_cost = if layer_active.first().copied().unwrap_or(false) {
            trace_costs[0].min()
        } else {
            f64::INFINITY
        };
        let min_solder_cost = if layer_active.last().copied().unwrap_or(false) {
            trace_costs[layer_count - 1].min()
        } else {
            f64::INFINITY
        };
        // For inner layers the cost in the preferred direction is assumed to
        // be 1.
        let mut max_inner_cost = f64::INFINITY;
        for (layer, cost) in trace_costs.iter().enumerate().take(layer_count.saturating_sub(1)).skip(1)
        {
            if layer_active[layer] {
                max_inner_cost = max_inner_cost.min(cost.max());
            }
        }
        let min_component_inner_cost = min_component_cost.min(max_inner_cost);
        let min_solder_inner_cost = min_solder_cost.min(max_inner_cost);
        let min_all_cost = min_component_inner_cost.min(min_solder_inner_cost);

        Self {
            trace_costs,
            layer_count,
            active_layer_count,
            min_normal_via_cost,
            min_cheap_via_cost,
            min_component_cost,
            min_solder_cost,
            min_component_inner_cost,
            min_solder_inner_cost,
            min_all_cost,
            component_box: Rect::EMPTY,
            solder_box: Rect::EMPTY,
            inner_box: Rect::EMPTY,
        }
    }

    /// Joins a destination bounding box on `layer` into the estimate.
    pub fn join(&mut self, bbox: Rect, layer: usize) {
        if layer == 0 {
            self.component_box = self.component_box.union(bbox);
        } else if layer + 1 == self.layer_count {
            self.solder_box = self.solder_box.union(bbox);
        } else {
            self.inner_box = self.inner_box.union(bbox);
        }
    }

    /// Returns `true` if no destination has been joined yet.
    pub fn is_empty(&self) -> bool {
        self.component_box.is_empty()
            && self.solder_box.is_empty()
            && self.inner_box.is_empty()
    }

    /// The lower-bound distance from `point` on `layer` to the destination
    /// set.
    pub fn distance(&self, point: Point, layer: usize) -> f64 {
        self.distance_from_box(Rect::from_point(point), layer)
    }

    /// The estimate with the cheap via cost substituted, used when the
    /// route may finish through an attach-SMD via.
    pub fn cheap_distance(&self, point: Point, layer: usize) -> f64 {
        let mut tmp = self.clone();
        tmp.min_normal_via_cost = self.min_cheap_via_cost;
        tmp.distance_from_box(Rect::from_point(point), layer)
    }

    /// The lower-bound distance from a box on `layer` to the destination
    /// set.
    pub fn distance_from_box(&self, from: Rect, layer: usize) -> f64 {
        if self.is_empty() {
            return f64::INFINITY;
        }
        let component = deltas(&from, &self.component_box);
        let solder = deltas(&from, &self.solder_box);
        let inner = deltas(&from, &self.inner_box);
        let via = self.min_normal_via_cost;

        let mut result = f64::INFINITY;

        if layer == 0 {
            if !self.component_box.is_empty() {
                result = from.weighted_distance(
                    &self.component_box,
                    self.trace_costs[0].horizontal,
                    self.trace_costs[0].vertical,
                );
            }
            if self.active_layer_count <= 1 {
                return result;
            }
            // Two layers: finish on the solder side after one via.
            if !self.solder_box.is_empty() {
                let (lo, hi) = ordered(self.min_solder_cost, self.min_component_cost);
                result = result.min(lo * solder.max + hi * solder.min + via);
            }
            // Two vias out and back to the component side.
            if !self.component_box.is_empty() {
                result = result
                    .min(component.max + component.min * self.min_component_inner_cost + 2.0 * via);
            }
            if self.active_layer_count >= 3 {
                if !self.inner_box.is_empty() {
                    result = result
                        .min(inner.max + inner.min * self.min_component_inner_cost + via);
                }
                // Three layers.
                if !self.solder_box.is_empty() {
                    result =
                        result.min(solder.max + self.min_all_cost * solder.min + 2.0 * via);
                }
                if !self.inner_box.is_empty() {
                    result = result.min(inner.max + inner.min + 2.0 * via);
                }
            }
            return result;
        }

        if layer + 1 == self.layer_count {
            if !self.solder_box.is_empty() {
                result = from.weighted_distance(
                    &self.solder_box,
                    self.trace_costs[layer].horizontal,
                    self.trace_costs[layer].vertical,
                );
            }
            if self.active_layer_count <= 1 {
                return result;
            }
            if !self.component_box.is_empty() {
                let (lo, hi) = ordered(self.min_component_cost, self.min_solder_cost);
                result = result.min(lo * component.max + hi * component.min + via);
            }
            if !self.solder_box.is_empty() {
                result = result
                    .min(solder.max + solder.min * self.min_solder_inner_cost + 2.0 * via);
            }
            if self.active_layer_count >= 3 {
                if !self.inner_box.is_empty() {
                    result =
                        result.min(inner.max + inner.min * self.min_solder_inner_cost + via);
                }
                if !self.component_box.is_empty() {
                    result = result
                        .min(component.max + self.min_all_cost * component.min + 2.0 * via);
                }
                if !self.inner_box.is_empty() {
                    result = result.min(inner.max + inner.min + 2.0 * via);
                }
            }
            return result;
        }

        // Inner layer.
        if !self.inner_box.is_empty() {
            result = from.weighted_distance(
                &self.inner_box,
                self.trace_costs[layer].horizontal,
                self.trace_costs[layer].vertical,
            );
            result = result.min(inner.max + inner.min + via);
        }
        if !self.component_box.is_empty() {
            result = result
                .min(component.max + component.min * self.min_component_inner_cost + via);
            result = result.min(component.max + component.min + 2.0 * via);
        }
        if !self.solder_box.is_empty() {
            result =
                result.min(solder.max + solder.min * self.min_solder_inner_cost + via);
            result = result.min(solder.max + solder.min + 2.0 * via);
        }
        result
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_costs(layers: usize) -> Vec<ExpansionCostFactor> {
        vec![
            ExpansionCostFactor {
                horizontal: 1.0,
                vertical: 1.0,
            };
            layers
        ]
    }

    #[test]
    fn zero_inside_destination_box_on_same_layer() {
        let mut d = DestinationDistance::new(uniform_costs(2), &[true, true], 100.0, 50.0);
        d.join(Rect::from_sides(0, 0, 10_000, 10_000), 0);
        assert_eq!(d.distance(Point::new(5_000, 5_000), 0), 0.0);
    }

    #[test]
    fn same_layer_distance_is_weighted_gap() {
        let costs = vec![
            ExpansionCostFactor {
                horizontal: 1.0,
                vertical: 2.0,
            },
            ExpansionCostFactor {
                horizontal: 2.0,
                vertical: 1.0,
            },
        ];
        let mut d = DestinationDistance::new(costs, &[true, true], 100.0, 50.0);
        d.join(Rect::from_point(Point::new(10_000, 20_000)), 0);
        // dx = 10_000, dy = 20_000 from the origin.
        let est = d.distance(Point::zero(), 0);
        assert!(est <= 10_000.0 + 2.0 * 20_000.0);
        assert!(est > 0.0);
    }

    #[test]
    fn other_layer_pays_at_least_one_via() {
        use approx::assert_relative_eq;
        let mut d = DestinationDistance::new(uniform_costs(2), &[true, true], 100.0, 50.0);
        d.join(Rect::from_point(Point::zero()), 0);
        // Directly above the destination, the only cost is one via.
        assert_relative_eq!(d.distance(Point::zero(), 1), 100.0);
        assert_relative_eq!(d.cheap_distance(Point::zero(), 1), 50.0);
    }

    #[test]
    fn admissible_against_straight_route() {
        let mut d = DestinationDistance::new(uniform_costs(2), &[true, true], 100.0, 50.0);
        d.join(Rect::from_point(Point::new(10_000, 0)), 0);
        // The true cheapest path from the origin on layer 0 is a straight
        // 10_000-unit trace; the estimate may not exceed it.
        assert!(d.distance(Point::zero(), 0) <= 10_000.0);
    }

    #[test]
    fn empty_destination_set_is_unreachable() {
        let d = DestinationDistance::new(uniform_costs(2), &[true, true], 100.0, 50.0);
        assert!(d.is_empty());
        assert_eq!(d.distance(Point::zero(), 0), f64::INFINITY);
    }
}
