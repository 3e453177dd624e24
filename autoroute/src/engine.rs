//! The autoroute session engine: room completion, door generation and
//! drill enumeration.
//!
//! A session owns the room graph for the current connection. Free-space
//! rooms start *incomplete* (a containment region plus a shape the
//! completion must enclose) and are completed by cutting the region with
//! half-planes taken from the border edges of inflated obstacles. Freshly
//! completed rooms generate doors to target items, to neighbouring complete
//! rooms and to obstacle rooms, and spawn new incomplete rooms along
//! uncovered edges so the decomposition grows lazily toward the search
//! frontier.

use geometry::prelude::*;
use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::board::item::{Item, ItemId, ItemKind};
use crate::board::RoutingBoard;
use crate::control::RoutingControl;
use crate::drills::{free_cells, DrillPages};
use crate::rooms::{
    section_lines_for, Door, DoorKey, DoorKind, Drill, DrillKey, ExpandableRef, IncompleteRoom,
    Room, RoomGraph, RoomKey, SectionState,
};

/// Minimum uncovered edge length worth spawning a neighbour room for.
const MIN_UNCOVERED_LENGTH: f64 = 100.0;

/// How far a neighbour room's containment region reaches beyond its seed
/// edge.
const NEIGHBOUR_REGION_DEPTH: i64 = 40_000;

/// The autoroute engine for one session.
///
/// Borrows the board and the (session-owned) room graph; the control block
/// fixes the net, costs and budgets for the current connection.
pub struct AutorouteEngine<'a> {
    /// The board under routing.
    pub board: &'a mut RoutingBoard,
    /// The per-net control block.
    pub ctrl: RoutingControl,
    /// The session room graph.
    pub graph: &'a mut RoomGraph,
    /// The drill page grid.
    pub pages: &'a mut DrillPages,
    /// Start/destination marking of the connection's items
    /// (`true` = destination side).
    pub marks: IndexMap<ItemId, bool>,
    board_bounds: Rect,
}

impl<'a> AutorouteEngine<'a> {
    /// Creates an engine over the given board and session graph.
    pub fn new(
        board: &'a mut RoutingBoard,
        graph: &'a mut RoomGraph,
        pages: &'a mut DrillPages,
        ctrl: RoutingControl,
    ) -> Self {
        let max_hw = ctrl
            .compensated_half_width
            .iter()
            .copied()
            .max()
            .unwrap_or(0);
        let board_bounds = board
            .bounding_box()
            .expand_all(8 * max_hw + ctrl.via_radius + 4_000);
        Self {
            board,
            ctrl,
            graph,
            pages,
            marks: IndexMap::new(),
            board_bounds,
        }
    }

    /// The clamp region for all room shapes.
    pub fn board_bounds(&self) -> Rect {
        self.board_bounds
    }

    /// Prepares the graph for a connection from `start` to `dest` items:
    /// resets search state, marks the items, and completes a seed room
    /// around every item on every active layer it occupies.
    ///
    /// Returns the start-side target doors the maze search begins from.
    pub fn prepare_connection(&mut self, start: &[ItemId], dest: &[ItemId]) -> Vec<DoorKey> {
        self.graph.reset_search_state();
        // Target doors belong to one connection's start/destination marking.
        let stale: Vec<DoorKey> = self
            .graph
            .doors
            .iter()
            .filter(|(_, d)| matches!(d.kind, DoorKind::Target { .. }))
            .map(|(k, _)| k)
            .collect();
        for dk in stale {
            self.graph.remove_door(dk);
        }
        self.marks.clear();
        for &id in start {
            self.marks.insert(id, false);
        }
        for &id in dest {
            self.marks.insert(id, true);
        }

        let lc = self.board.layer_count();
        let mut seeds = Vec::new();
        for &id in start.iter().chain(dest.iter()) {
            let Some(item) = self.board.item(id) else {
                continue;
            };
            let (first, last) = item.layer_span(self.board.rules(), lc);
            for layer in first..=last {
                if !self.ctrl.is_layer_active(layer) {
                    continue;
                }
                let Some(shape) = item.shape_on_layer(self.board.rules(), layer) else {
                    continue;
                };
                seeds.push((layer, shape));
            }
        }
        for (layer, shape) in seeds {
            // Skip seeds already inside a complete room; the target doors
            // were made when that room completed (or will be made below).
            let center = shape.center();
            if self.find_complete_room(center, layer).is_some() {
                continue;
            }
            let hw = self.ctrl.compensated_half_width[layer];
            let region = shape.bbox().expand_all(hw.max(1) * 4).intersection(self.board_bounds);
            let key = self.graph.add_incomplete(IncompleteRoom {
                layer,
                region,
                contained: shape,
            });
            self.complete_room(key);
        }
        // Target doors for already-existing rooms that the marks now touch.
        self.refresh_target_doors();

        self.graph
            .doors
            .iter()
            .filter(|(_, d)| d.is_start_target())
            .map(|(k, _)| k)
            .collect()
    }

    /// Creates missing target doors between marked items and the complete
    /// rooms their shapes overlap.
    fn refresh_target_doors(&mut self) {
        let marks: Vec<(ItemId, bool)> = self.marks.iter().map(|(&k, &v)| (k, v)).collect();
        let lc = self.board.layer_count();
        for (id, is_dest) in marks {
            let Some(item) = self.board.item(id) else {
                continue;
            };
            let (first, last) = item.layer_span(self.board.rules(), lc);
            let shapes: Vec<(usize, TileShape)> = (first..=last)
                .filter_map(|layer| item.shape_on_layer(self.board.rules(), layer).map(|s| (layer, s)))
                .collect();
            for (layer, shape) in shapes {
                let mut rooms_hit: Vec<RoomKey> = Vec::new();
                self.graph.room_tree.visit_overlapping(shape.bbox(), |key, _| {
                    rooms_hit.push(key);
                });
                for room_key in rooms_hit {
                    let Some(room) = self.graph.complete(room_key) else {
                        continue;
                    };
                    if room.layer != layer {
                        continue;
                    }
                    let overlap = room.shape.intersection(&shape);
                    if overlap.is_empty() {
                        continue;
                    }
                    let already = room.target_doors.iter().any(|&d| {
                        matches!(
                            self.graph.doors[d].kind,
                            DoorKind::Target { item, .. } if item == id
                        )
                    });
                    if already {
                        continue;
                    }
                    self.make_target_door(room_key, id, is_dest, overlap);
                }
            }
        }
    }

    fn make_target_door(
        &mut self,
        room: RoomKey,
        item: ItemId,
        is_destination: bool,
        overlap: TileShape,
    ) {
        // Routes aim for the item center when the room reaches it; the
        // overlap center otherwise.
        let center = self
            .board
            .item(item)
            .map(|i| i.center())
            .filter(|&c| overlap.contains(c))
            .unwrap_or_else(|| overlap.center());
        let dim = overlap.dimension().max(0);
        self.graph.link_door(Door {
            kind: DoorKind::Target {
                room,
                item,
                is_destination,
            },
            dimension: dim,
            shape: overlap,
            sections: vec![SectionState::default()],
            section_lines: vec![Line::new(center, center)],
        });
        if let Some(r) = self.graph.complete_mut(room) {
            r.net_dependent = true;
        }
    }

    /// The inflated shape of an obstacle item on `layer`: the copper shape
    /// expanded so that any room cut against it keeps legal trace
    /// centerline positions.
    fn inflated_obstacle_shape(&self, item: &Item, layer: usize) -> Option<TileShape> {
        let shape = item.shape_on_layer(self.board.rules(), layer)?;
        let hw = self.ctrl.trace_half_width[layer];
        let inflation = match item.kind {
            // A trace may not enter a keep-out; no copper clearance applies.
            ItemKind::Keepout { .. } => hw,
            _ => {
                hw + self.board.rules().clearance.value_with_margin(
                    item.clearance_class,
                    self.ctrl.trace_clearance_class,
                    layer,
                )
            }
        };
        Some(shape.expand_all(inflation))
    }

    /// Completes an incomplete room: cuts its region against every obstacle
    /// of the session net, then promotes it and generates its doors.
    ///
    /// Returns the room key on success; on failure (the required contained
    /// shape got cut away) the room is removed and `None` is returned.
    pub fn complete_room(&mut self, key: RoomKey) -> Option<RoomKey> {
        let (layer, region, mut contained) = match &self.graph.rooms[key] {
            Room::Incomplete(r) => (r.layer, r.region, r.contained.clone()),
            _ => return Some(key),
        };
        let region = region.intersection(self.board_bounds);
        if region.dimension() < 2 {
            self.graph.remove_room(key);
            return None;
        }
        let mut shape = TileShape::from(region);

        // Clip to the board outline, pulled in by the half-width so routed
        // copper stays on the board. The outline is handled here rather than
        // by the half-plane cuts below: the forbidden region is the
        // non-convex outside.
        if let Some(outline) = self.board.outline().cloned() {
            let hw = self.ctrl.trace_half_width[layer];
            for edge in outline.border_lines() {
                shape = shape.intersect_halfplane(edge.shift_left(hw));
                if shape.is_empty() {
                    self.graph.remove_room(key);
                    return None;
                }
            }
            let kept = contained.intersection(&shape);
            if kept.is_empty() {
                self.graph.remove_room(key);
                return None;
            }
            contained = kept;
        }

        let obstacle_ids = self
            .board
            .obstacles_for_trace(self.ctrl.net, region, &[layer]);
        let mut net_dependent = false;
        let mut adjacent_obstacles: Vec<(ItemId, TileShape)> = Vec::new();

        for id in obstacle_ids {
            let Some(item) = self.board.item(id) else {
                continue;
            };
            if matches!(item.kind, ItemKind::Outline { .. }) {
                continue;
            }
            if !item.nets.is_empty() {
                net_dependent = true;
            }
            let Some(obstacle) = self.inflated_obstacle_shape(item, layer) else {
                continue;
            };
            if shape.intersection(&obstacle).dimension() < 2 {
                if shape.intersection(&obstacle).dimension() == 1 {
                    adjacent_obstacles.push((id, obstacle));
                }
                continue;
            }
            // Choose the obstacle border whose outside half-plane keeps the
            // contained shape and is maximally distant from it.
            let mut best: Option<(f64, Line)> = None;
            for edge in obstacle.border_lines() {
                let cut = edge.opposite();
                let d = contained.min_distance_to_left(cut);
                if best.as_ref().map(|(bd, _)| d > *bd).unwrap_or(true) {
                    best = Some((d, cut));
                }
            }
            let Some((_, cut)) = best else { continue };
            shape = shape.intersect_halfplane(cut);
            if shape.is_empty() {
                self.graph.remove_room(key);
                return None;
            }
            // Keep the contained shape inside; shrink it if the cut clipped
            // it.
            let kept = contained.intersection(&shape);
            if kept.is_empty() {
                self.graph.remove_room(key);
                return None;
            }
            contained = kept;
            adjacent_obstacles.push((id, obstacle));
        }

        let dim = shape.dimension();
        // Slivers left over from clipping carry no routable space.
        if dim < 2 {
            self.graph.remove_room(key);
            return None;
        }
        self.graph.promote(key, shape, net_dependent);
        if let Some(room) = self.graph.complete(key) {
            trace!(layer, id = room.id, dim, "room completed");
        }
        self.generate_doors(key, &adjacent_obstacles);
        Some(key)
    }

    /// Generates target doors, neighbour doors and obstacle doors for a
    /// freshly completed room.
    fn generate_doors(&mut self, key: RoomKey, obstacles: &[(ItemId, TileShape)]) {
        let (shape, layer) = {
            let room = self.graph.complete(key).expect("room must be complete");
            (room.shape.clone(), room.layer)
        };

        // Target doors for every marked item overlapping the final shape.
        let marks: Vec<(ItemId, bool)> = self.marks.iter().map(|(&k, &v)| (k, v)).collect();
        for (id, is_dest) in marks {
            let Some(item) = self.board.item(id) else {
                continue;
            };
            let Some(item_shape) = item.shape_on_layer(self.board.rules(), layer) else {
                continue;
            };
            let overlap = shape.intersection(&item_shape);
            if !overlap.is_empty() {
                self.make_target_door(key, id, is_dest, overlap);
            }
        }

        // Doors to neighbouring complete rooms: 2-D for overlap, 1-D for
        // edge contact.
        let mut neighbours: Vec<RoomKey> = Vec::new();
        self.graph
            .room_tree
            .visit_overlapping(shape.bbox(), |other, _| {
                if other != key {
                    neighbours.push(other);
                }
            });
        for other in neighbours {
            let Some(other_room) = self.graph.complete(other) else {
                continue;
            };
            if other_room.layer != layer || self.graph.door_exists_between(key, other) {
                continue;
            }
            let overlap = shape.intersection(&other_room.shape);
            let dim = overlap.dimension();
            if dim < 1 {
                continue;
            }
            let section_width = self.ctrl.compensated_half_width[layer];
            let lines = section_lines_for(&overlap, section_width);
            self.graph.link_door(Door {
                kind: DoorKind::Normal {
                    room_a: key,
                    room_b: other,
                },
                dimension: dim,
                shape: overlap,
                sections: vec![SectionState::default(); lines.len()],
                section_lines: lines,
            });
        }

        // Obstacle-room doors along the cut edges, so the maze can pay to
        // traverse (rip up) routable incumbents, and so edge coverage is
        // known.
        for (id, obstacle_shape) in obstacles {
            let overlap = shape.intersection(obstacle_shape);
            if overlap.dimension() < 1 {
                continue;
            }
            let ob_room =
                self.graph
                    .obstacle_room(*id, layer, layer, obstacle_shape.clone());
            if self.graph.door_exists_between(key, ob_room) {
                continue;
            }
            let section_width = self.ctrl.compensated_half_width[layer];
            let lines = section_lines_for(&overlap, section_width);
            self.graph.link_door(Door {
                kind: DoorKind::Normal {
                    room_a: key,
                    room_b: ob_room,
                },
                dimension: overlap.dimension(),
                shape: overlap,
                sections: vec![SectionState::default(); lines.len()],
                section_lines: lines,
            });
        }
    }

    /// Ensures the neighbourhood of a room is complete: every border edge
    /// not yet covered by a door spawns (and completes) a new free-space
    /// room on its outside. Doors therefore do not change while the room is
    /// being expanded through.
    pub fn complete_neighbours(&mut self, key: RoomKey) {
        let (shape, layer, already) = match &self.graph.rooms[key] {
            Room::Complete(r) => (r.shape.clone(), r.layer, r.neighbours_calculated),
            Room::Obstacle(r) => (r.shape.clone(), r.layer, r.neighbours_calculated),
            Room::Incomplete(_) => return,
        };
        if already {
            return;
        }
        match &mut self.graph.rooms[key] {
            Room::Complete(r) => r.neighbours_calculated = true,
            Room::Obstacle(r) => r.neighbours_calculated = true,
            Room::Incomplete(_) => {}
        }

        for edge in shape.border_lines() {
            let length = edge.length();
            if length < MIN_UNCOVERED_LENGTH {
                continue;
            }
            let uncovered = self.uncovered_intervals(key, &edge);
            for (t0, t1) in uncovered {
                if (t1 - t0) * length < MIN_UNCOVERED_LENGTH {
                    continue;
                }
                let p0 = lerp(edge.a, edge.b, t0);
                let p1 = lerp(edge.a, edge.b, t1);
                // Outward is the right side of the edge (interior is left).
                let d = edge.direction();
                let len = d.length();
                if len == 0.0 {
                    continue;
                }
                let out = Point::new(
                    (d.y as f64 / len * NEIGHBOUR_REGION_DEPTH as f64).round() as i64,
                    (-d.x as f64 / len * NEIGHBOUR_REGION_DEPTH as f64).round() as i64,
                );
                let region = Rect::new(p0, p1)
                    .union(Rect::new(p0 + out, p1 + out))
                    .intersection(self.board_bounds);
                if region.is_empty() {
                    continue;
                }
                let contained = TileShape::Polygon(Polygon::new(vec![p0, p1]));
                let new_key = self.graph.add_incomplete(IncompleteRoom {
                    layer,
                    region,
                    contained,
                });
                self.complete_room(new_key);
            }
        }
    }

    /// The parameter intervals of `edge` not covered by any door of the
    /// room, sorted ascending.
    fn uncovered_intervals(&self, key: RoomKey, edge: &Line) -> Vec<(f64, f64)> {
        let d = edge.direction();
        let len2 = d.length_squared() as f64;
        if len2 == 0.0 {
            return Vec::new();
        }
        let edge_tile = TileShape::Polygon(Polygon::new(vec![edge.a, edge.b]));
        let mut covered: Vec<(f64, f64)> = Vec::new();
        let door_keys = self
            .graph
            .rooms
            .get(key)
            .map(|r| r.door_keys())
            .unwrap_or_default();
        for dk in door_keys {
            let door = &self.graph.doors[dk];
            let overlap = door.shape.intersection(&edge_tile);
            let corners = overlap.corners();
            if corners.is_empty() {
                continue;
            }
            let mut lo = f64::INFINITY;
            let mut hi = f64::NEG_INFINITY;
            for c in corners {
                let t = (c - edge.a).dot(d) as f64 / len2;
                lo = lo.min(t);
                hi = hi.max(t);
            }
            covered.push((lo.clamp(0.0, 1.0), hi.clamp(0.0, 1.0)));
        }
        covered.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut uncovered = Vec::new();
        let mut cursor = 0.0;
        for (lo, hi) in covered {
            if lo > cursor {
                uncovered.push((cursor, lo));
            }
            cursor = cursor.max(hi);
        }
        if cursor < 1.0 {
            uncovered.push((cursor, 1.0));
        }
        uncovered
    }

    /// Finds the complete free-space room containing `point` on `layer`.
    pub fn find_complete_room(&self, point: Point, layer: usize) -> Option<RoomKey> {
        let mut found = None;
        self.graph
            .room_tree
            .visit_overlapping(Rect::from_point(point), |key, _| {
                if found.is_some() {
                    return;
                }
                if let Some(room) = self.graph.complete(key) {
                    if room.layer == layer && room.shape.contains(point) {
                        found = Some(key);
                    }
                }
            });
        found
    }

    /// Finds or lazily creates a complete room containing `point` on
    /// `layer`.
    pub fn room_at(&mut self, point: Point, layer: usize) -> Option<RoomKey> {
        if let Some(key) = self.find_complete_room(point, layer) {
            return Some(key);
        }
        let hw = self.ctrl.compensated_half_width.get(layer).copied().unwrap_or(0);
        let region = Rect::from_point(point).expand_all(NEIGHBOUR_REGION_DEPTH.max(hw * 8));
        let key = self.graph.add_incomplete(IncompleteRoom {
            layer,
            region,
            contained: TileShape::from_point(point),
        });
        let key = self.complete_room(key)?;
        let room = self.graph.complete(key)?;
        room.shape.contains(point).then_some(key)
    }

    /// The candidate drills reachable from a room, enumerating drill pages
    /// lazily.
    pub fn drills_for_room(&mut self, key: RoomKey) -> Vec<DrillKey> {
        if !self.ctrl.vias_allowed {
            return Vec::new();
        }
        let Some(room) = self.graph.complete(key) else {
            return Vec::new();
        };
        let bbox = room.shape.bbox();
        let layer = room.layer;
        let pages = self.pages.pages_overlapping(bbox);
        let mut out = Vec::new();
        for idx in pages {
            self.ensure_page_drills(idx);
            if let Some(drills) = &self.pages.page(idx).drills {
                for &dk in drills {
                    let Some(drill) = self.graph.drills.get(dk) else {
                        continue;
                    };
                    if layer >= drill.first_layer
                        && layer <= drill.last_layer
                        && drill.rooms.get(layer - drill.first_layer) == Some(&key)
                    {
                        out.push(dk);
                    }
                }
            }
        }
        out
    }

    /// Computes the candidate drills of one page for the session net.
    fn ensure_page_drills(&mut self, idx: usize) {
        if self.pages.page(idx).drills.is_some() {
            return;
        }
        let page_bbox = self.pages.page(idx).bbox;
        let attach_smd_allowed = self.ctrl.attach_smd_allowed;
        let Some(span) = self
            .ctrl
            .via_spans
            .iter()
            .find(|s| !s.attach_smd || attach_smd_allowed)
            .cloned()
        else {
            self.pages.page_mut(idx).drills = Some(Vec::new());
            return;
        };
        let margin = self.ctrl.via_radius
            + self
                .board
                .rules()
                .clearance
                .value_with_margin(span.clearance_class, span.clearance_class, 0);

        // The free area of the page minus every obstacle on every layer the
        // via participates in. The outline is not subtracted as a box (that
        // would erase the whole page); outside-the-board drills are rejected
        // by the prohibition check and the clipped room lookup below.
        let mut obstacle_boxes: Vec<Rect> = Vec::new();
        for id in self.board.obstacles_for_via(
            self.ctrl.net,
            page_bbox.expand_all(margin),
            span.padstack,
        ) {
            let Some(item) = self.board.item(id) else {
                continue;
            };
            if matches!(item.kind, ItemKind::Outline { .. }) {
                continue;
            }
            for layer in span.first_layer..=span.last_layer {
                if let Some(shape) = item.shape_on_layer(self.board.rules(), layer) {
                    obstacle_boxes.push(shape.bbox().expand_all(margin));
                }
            }
        }
        let min_cell = (2 * self.ctrl.via_radius).max(1_000);
        let cells = free_cells(page_bbox, &obstacle_boxes, min_cell);
        debug!(page = idx, cells = cells.len(), "drill page enumerated");

        let mut keys = Vec::new();
        for cell in cells {
            let location = cell.center();
            if self.board.is_via_prohibited(
                location,
                span.first_layer,
                span.last_layer,
                self.ctrl.net,
            ) {
                continue;
            }
            let mut rooms = Vec::with_capacity(span.last_layer - span.first_layer + 1);
            let mut ok = true;
            for layer in span.first_layer..=span.last_layer {
                if !self.ctrl.is_layer_active(layer) {
                    ok = false;
                    break;
                }
                match self.room_at(location, layer) {
                    Some(r) => rooms.push(r),
                    None => {
                        ok = false;
                        break;
                    }
                }
            }
            if !ok {
                continue;
            }
            let layer_count = span.last_layer - span.first_layer + 1;
            let key = self.graph.drills.insert(Drill {
                location,
                first_layer: span.first_layer,
                last_layer: span.last_layer,
                rooms,
                sections: vec![SectionState::default(); layer_count],
            });
            keys.push(key);
        }
        self.pages.page_mut(idx).drills = Some(keys);
    }

    /// Removes a ripped item from the board, invalidating dependent drill
    /// pages. Rooms only get more space, so they stay valid.
    pub fn remove_ripped_item(&mut self, id: ItemId) -> bool {
        let Some(item) = self.board.item(id) else {
            return false;
        };
        let bbox = item.bounding_box(self.board.rules(), self.board.layer_count());
        if !self.board.remove_item(id) {
            return false;
        }
        for dk in self.pages.invalidate_region(bbox) {
            self.graph.drills.remove(dk);
        }
        // The obstacle room wrapping the ripped item is gone with it.
        let stale: Vec<RoomKey> = self
            .graph
            .rooms
            .iter()
            .filter(|(_, r)| matches!(r, Room::Obstacle(o) if o.item == id))
            .map(|(k, _)| k)
            .collect();
        for k in stale {
            self.graph.remove_room(k);
        }
        true
    }

    /// Inserts a routed item, invalidating rooms and drill pages that the
    /// new copper overlaps.
    pub fn insert_routed_item(
        &mut self,
        item: Item,
    ) -> Result<ItemId, crate::board::BoardError> {
        let lc = self.board.layer_count();
        let (first, last) = item.layer_span(self.board.rules(), lc);
        let bbox = item.bounding_box(self.board.rules(), lc);
        let id = self.board.add_item(item)?;
        let max_hw = self
            .ctrl
            .compensated_half_width
            .iter()
            .copied()
            .max()
            .unwrap_or(0);
        for layer in first..=last {
            self.graph
                .invalidate_region(bbox.expand_all(2 * max_hw), layer);
        }
        for dk in self.pages.invalidate_region(bbox.expand_all(2 * max_hw)) {
            self.graph.drills.remove(dk);
        }
        Ok(id)
    }

    /// The rooms an expandable object is attached to.
    pub fn rooms_of(&self, re: ExpandableRef) -> Vec<RoomKey> {
        match re {
            ExpandableRef::Door(d) => self
                .graph
                .doors
                .get(d)
                .map(|door| door.rooms().to_vec())
                .unwrap_or_default(),
            ExpandableRef::Drill(d) => self
                .graph
                .drills
                .get(d)
                .map(|drill| drill.rooms.clone())
                .unwrap_or_default(),
        }
    }
}

fn lerp(a: Point, b: Point, t: f64) -> Point {
    Point::new(
        (a.x as f64 + (b.x - a.x) as f64 * t).round() as i64,
        (a.y as f64 + (b.y - a.y) as f64 * t).round() as i64,
    )
}
