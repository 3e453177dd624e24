//! The expansion-room graph: rooms, doors, drills and their arena.
//!
//! A door references its two rooms and each room references its doors, so
//! the graph is cyclic. All objects live in slotmap arenas and reference
//! each other by key; destroying a door removes it from both rooms' door
//! lists before the slot is freed, and destroying a room purges its doors
//! first.

use bboxtree::BboxTree;
use geometry::prelude::*;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};

use crate::board::item::ItemId;

new_key_type! {
    /// Arena key of an expansion room.
    pub struct RoomKey;
    /// Arena key of a door.
    pub struct DoorKey;
    /// Arena key of a drill.
    pub struct DrillKey;
}

/// A door or a drill: the two kinds of objects the maze search expands
/// through.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ExpandableRef {
    /// A door (normal or target).
    Door(DoorKey),
    /// A layer-change drill.
    Drill(DrillKey),
}

/// Sideways adjustment of an expansion relative to its door section.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, Default)]
pub enum Adjustment {
    /// No adjustment.
    #[default]
    None,
    /// Shifted toward the left end of the section.
    Left,
    /// Shifted toward the right end of the section.
    Right,
}

/// The per-section maze-search state.
///
/// Back-pointers live here rather than on the queued elements, so a popped
/// element can always be reconstructed from its door and section.
#[derive(Debug, Clone, Default)]
pub struct SectionState {
    /// Whether the maze search has already taken this section.
    pub occupied: bool,
    /// The door and section this section was reached from.
    pub backtrack: Option<(ExpandableRef, usize)>,
    /// Whether reaching this section required ripping the adjacent room.
    pub room_ripped: bool,
    /// The sideways adjustment of the expansion.
    pub adjustment: Adjustment,
    /// The entry point recorded when the section was occupied.
    pub entry: Point,
    /// The layer of the entry point.
    pub layer: usize,
}

impl SectionState {
    /// Resets the section for the next connection.
    pub fn reset(&mut self) {
        *self = SectionState::default();
    }
}

/// The linkage of a door.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DoorKind {
    /// A door between two rooms.
    Normal {
        /// One side.
        room_a: RoomKey,
        /// The other side.
        room_b: RoomKey,
    },
    /// A target door: the "other side" is a board item of the routed net.
    Target {
        /// The room the item protrudes into.
        room: RoomKey,
        /// The start or destination item.
        item: ItemId,
        /// `true` for destination-side doors, `false` for start-side.
        is_destination: bool,
    },
}

/// A shared edge or region between two rooms (or a room and a target item),
/// subdivided into sections that carry independent maze state.
#[derive(Debug, Clone)]
pub struct Door {
    /// What the door connects.
    pub kind: DoorKind,
    /// 1 for shared edges, 2 for overlapping regions.
    pub dimension: i8,
    /// The intersection of the two sides' shapes.
    pub shape: TileShape,
    /// Per-section maze state.
    pub sections: Vec<SectionState>,
    /// The line segment of each section.
    pub section_lines: Vec<Line>,
}

impl Door {
    /// The room on the other side of the door, seen from `from`.
    /// `None` when the other side is a target item.
    pub fn other_room(&self, from: RoomKey) -> Option<RoomKey> {
        match self.kind {
            DoorKind::Normal { room_a, room_b } => {
                if room_a == from {
                    Some(room_b)
                } else if room_b == from {
                    Some(room_a)
                } else {
                    None
                }
            }
            DoorKind::Target { .. } => None,
        }
    }

    /// The rooms this door is attached to.
    pub fn rooms(&self) -> [RoomKey; 2] {
        match self.kind {
            DoorKind::Normal { room_a, room_b } => [room_a, room_b],
            DoorKind::Target { room, .. } => [room, room],
        }
    }

    /// Whether this is a destination-side target door.
    pub fn is_destination_target(&self) -> bool {
        matches!(
            self.kind,
            DoorKind::Target {
                is_destination: true,
                ..
            }
        )
    }

    /// Whether this is a start-side target door.
    pub fn is_start_target(&self) -> bool {
        matches!(
            self.kind,
            DoorKind::Target {
                is_destination: false,
                ..
            }
        )
    }

    /// Resets all section state.
    pub fn reset(&mut self) {
        for s in &mut self.sections {
            s.reset();
        }
    }
}

/// Divides a door shape into equal-length section lines.
///
/// The section count is `ceil(length / (k * (half_width + margin)))` with
/// `k = 10`; target doors always carry exactly one section.
pub fn section_lines_for(shape: &TileShape, section_width: i64) -> Vec<Line> {
    const SECTIONS_PER_WIDTH: f64 = 10.0;
    let corners = shape.corners();
    if corners.is_empty() {
        return Vec::new();
    }
    if corners.len() == 1 {
        return vec![Line::new(corners[0], corners[0])];
    }
    // The longest diameter of the shape carries the sections.
    let mut best = (corners[0], corners[1]);
    let mut best_d = -1.0;
    for i in 0..corners.len() {
        for j in (i + 1)..corners.len() {
            let d = corners[i].distance(corners[j]);
            if d > best_d {
                best_d = d;
                best = (corners[i], corners[j]);
            }
        }
    }
    let (a, b) = best;
    let length = a.distance(b);
    let width = (section_width.max(1)) as f64 * SECTIONS_PER_WIDTH;
    let count = ((length / width).ceil() as usize).max(1);
    let mut lines = Vec::with_capacity(count);
    for i in 0..count {
        let t0 = i as f64 / count as f64;
        let t1 = (i + 1) as f64 / count as f64;
        let p0 = Point::new(
            (a.x as f64 + (b.x - a.x) as f64 * t0).round() as i64,
            (a.y as f64 + (b.y - a.y) as f64 * t0).round() as i64,
        );
        let p1 = Point::new(
            (a.x as f64 + (b.x - a.x) as f64 * t1).round() as i64,
            (a.y as f64 + (b.y - a.y) as f64 * t1).round() as i64,
        );
        lines.push(Line::new(p0, p1));
    }
    lines
}

/// A free-space room whose final shape is not yet known.
#[derive(Debug, Clone)]
pub struct IncompleteRoom {
    /// The layer of the room.
    pub layer: usize,
    /// The region the completed shape must stay inside.
    pub region: Rect,
    /// The shape the completion is required to enclose.
    pub contained: TileShape,
}

/// A free-space room with a fixed convex shape.
#[derive(Debug, Clone)]
pub struct CompleteRoom {
    /// The layer of the room.
    pub layer: usize,
    /// The final convex shape; overlaps no obstacle of the session net.
    pub shape: TileShape,
    /// Doors to neighbouring rooms.
    pub doors: Vec<DoorKey>,
    /// Doors to start/destination items.
    pub target_doors: Vec<DoorKey>,
    /// Monotonically assigned id, for deterministic diagnostics.
    pub id: u32,
    /// `true` iff the room's shape depends on the session net (it touched a
    /// net-specific obstacle or carries target doors) and must be discarded
    /// when the search switches net.
    pub net_dependent: bool,
    /// Whether neighbour rooms along uncovered edges have been spawned.
    pub neighbours_calculated: bool,
}

/// A room wrapping a board item; traversing it means ripping the item.
#[derive(Debug, Clone)]
pub struct ObstacleRoom {
    /// The layer of the room.
    pub layer: usize,
    /// The wrapped item.
    pub item: ItemId,
    /// The sub-shape index of the wrapped item.
    pub shape_index: usize,
    /// The item shape, inflated by half-width and clearance.
    pub shape: TileShape,
    /// Doors to neighbouring rooms.
    pub doors: Vec<DoorKey>,
    /// Whether neighbour rooms have been generated.
    pub neighbours_calculated: bool,
}

/// An expansion room.
#[derive(Debug, Clone)]
pub enum Room {
    /// Not yet completed; shape still unknown.
    Incomplete(IncompleteRoom),
    /// Completed free-space room.
    Complete(CompleteRoom),
    /// Obstacle room.
    Obstacle(ObstacleRoom),
}

impl Room {
    /// The room layer.
    pub fn layer(&self) -> usize {
        match self {
            Room::Incomplete(r) => r.layer,
            Room::Complete(r) => r.layer,
            Room::Obstacle(r) => r.layer,
        }
    }

    /// The room shape, if already fixed.
    pub fn shape(&self) -> Option<&TileShape> {
        match self {
            Room::Incomplete(_) => None,
            Room::Complete(r) => Some(&r.shape),
            Room::Obstacle(r) => Some(&r.shape),
        }
    }

    /// All door keys attached to the room.
    pub fn door_keys(&self) -> Vec<DoorKey> {
        match self {
            Room::Incomplete(_) => Vec::new(),
            Room::Complete(r) => r
                .doors
                .iter()
                .chain(r.target_doors.iter())
                .copied()
                .collect(),
            Room::Obstacle(r) => r.doors.clone(),
        }
    }
}

/// A potential via location: a point with a layer range, one room per
/// layer, and one maze section per layer.
#[derive(Debug, Clone)]
pub struct Drill {
    /// The drill center.
    pub location: Point,
    /// The first layer of the via span.
    pub first_layer: usize,
    /// The last layer of the via span.
    pub last_layer: usize,
    /// The complete room containing the drill on each layer of the span.
    pub rooms: Vec<RoomKey>,
    /// One maze section per layer of the span.
    pub sections: Vec<SectionState>,
}

impl Drill {
    /// Resets all section state.
    pub fn reset(&mut self) {
        for s in &mut self.sections {
            s.reset();
        }
    }
}

/// The arena owning the room graph of an autoroute session.
#[derive(Default)]
pub struct RoomGraph {
    /// All rooms.
    pub rooms: SlotMap<RoomKey, Room>,
    /// All doors.
    pub doors: SlotMap<DoorKey, Door>,
    /// All drills.
    pub drills: SlotMap<DrillKey, Drill>,
    /// Spatial index over complete free-space rooms.
    pub room_tree: BboxTree<RoomKey>,
    /// Obstacle rooms by wrapped (item, sub-shape).
    obstacle_index: FxHashMap<(ItemId, usize), RoomKey>,
    next_room_id: u32,
}

impl std::fmt::Debug for RoomGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomGraph")
            .field("rooms", &self.rooms.len())
            .field("doors", &self.doors.len())
            .field("drills", &self.drills.len())
            .finish()
    }
}

impl RoomGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an incomplete free-space room.
    pub fn add_incomplete(&mut self, room: IncompleteRoom) -> RoomKey {
        self.rooms.insert(Room::Incomplete(room))
    }

    /// Replaces an incomplete room with its completed shape and indexes it.
    pub fn promote(&mut self, key: RoomKey, shape: TileShape, net_dependent: bool) {
        let layer = self.rooms[key].layer();
        let bbox = shape.bbox();
        self.next_room_id += 1;
        self.rooms[key] = Room::Complete(CompleteRoom {
            layer,
            shape,
            doors: Vec::new(),
            target_doors: Vec::new(),
            id: self.next_room_id,
            net_dependent,
            neighbours_calculated: false,
        });
        self.room_tree.insert(key, 0, bbox);
    }

    /// Fetches or creates the obstacle room wrapping `(item, shape_index)`.
    pub fn obstacle_room(
        &mut self,
        item: ItemId,
        shape_index: usize,
        layer: usize,
        shape: TileShape,
    ) -> RoomKey {
        if let Some(&key) = self.obstacle_index.get(&(item, shape_index)) {
            return key;
        }
        let key = self.rooms.insert(Room::Obstacle(ObstacleRoom {
            layer,
            item,
            shape_index,
            shape,
            doors: Vec::new(),
            neighbours_calculated: false,
        }));
        self.obstacle_index.insert((item, shape_index), key);
        key
    }

    /// Creates a door and links it into both rooms' door lists.
    pub fn link_door(&mut self, door: Door) -> DoorKey {
        let kind = door.kind;
        let key = self.doors.insert(door);
        match kind {
            DoorKind::Normal { room_a, room_b } => {
                self.push_door_key(room_a, key, false);
                self.push_door_key(room_b, key, false);
            }
            DoorKind::Target { room, .. } => {
                self.push_door_key(room, key, true);
            }
        }
        key
    }

    fn push_door_key(&mut self, room: RoomKey, door: DoorKey, target: bool) {
        match &mut self.rooms[room] {
            Room::Complete(r) => {
                if target {
                    r.target_doors.push(door);
                } else {
                    r.doors.push(door);
                }
            }
            Room::Obstacle(r) => r.doors.push(door),
            Room::Incomplete(_) => {
                unreachable!("doors may only link complete rooms")
            }
        }
    }

    /// Removes a door, detaching it from both rooms.
    pub fn remove_door(&mut self, key: DoorKey) {
        let Some(door) = self.doors.remove(key) else {
            return;
        };
        for room in door.rooms() {
            if let Some(r) = self.rooms.get_mut(room) {
                match r {
                    Room::Complete(r) => {
                        r.doors.retain(|&d| d != key);
                        r.target_doors.retain(|&d| d != key);
                    }
                    Room::Obstacle(r) => r.doors.retain(|&d| d != key),
                    Room::Incomplete(_) => {}
                }
            }
        }
    }

    /// Removes a room, purging its doors and any drill that references it.
    pub fn remove_room(&mut self, key: RoomKey) {
        let Some(room) = self.rooms.get(key) else {
            return;
        };
        for door in room.door_keys() {
            self.remove_door(door);
        }
        if let Room::Obstacle(r) = &self.rooms[key] {
            self.obstacle_index.remove(&(r.item, r.shape_index));
        }
        self.room_tree.remove(key);
        self.rooms.remove(key);
        let stale: Vec<DrillKey> = self
            .drills
            .iter()
            .filter(|(_, d)| d.rooms.contains(&key))
            .map(|(k, _)| k)
            .collect();
        for d in stale {
            self.drills.remove(d);
        }
    }

    /// Whether a door already links rooms `a` and `b`.
    pub fn door_exists_between(&self, a: RoomKey, b: RoomKey) -> bool {
        self.rooms
            .get(a)
            .map(|room| {
                room.door_keys()
                    .iter()
                    .any(|&d| self.doors[d].other_room(a) == Some(b))
            })
            .unwrap_or(false)
    }

    /// The complete room under `key`, if it is one.
    pub fn complete(&self, key: RoomKey) -> Option<&CompleteRoom> {
        match self.rooms.get(key) {
            Some(Room::Complete(r)) => Some(r),
            _ => None,
        }
    }

    /// Mutable access to the complete room under `key`.
    pub fn complete_mut(&mut self, key: RoomKey) -> Option<&mut CompleteRoom> {
        match self.rooms.get_mut(key) {
            Some(Room::Complete(r)) => Some(r),
            _ => None,
        }
    }

    /// The obstacle room under `key`, if it is one.
    pub fn obstacle(&self, key: RoomKey) -> Option<&ObstacleRoom> {
        match self.rooms.get(key) {
            Some(Room::Obstacle(r)) => Some(r),
            _ => None,
        }
    }

    /// Resets all maze-search state for the next connection.
    pub fn reset_search_state(&mut self) {
        for (_, door) in self.doors.iter_mut() {
            door.reset();
        }
        for (_, drill) in self.drills.iter_mut() {
            drill.reset();
        }
    }

    /// Destroys everything that depends on the session net: target doors,
    /// obstacle rooms, drills and net-dependent free rooms. Net-independent
    /// complete rooms survive.
    pub fn clear_net_dependent(&mut self) {
        let target_doors: Vec<DoorKey> = self
            .doors
            .iter()
            .filter(|(_, d)| matches!(d.kind, DoorKind::Target { .. }))
            .map(|(k, _)| k)
            .collect();
        for d in target_doors {
            self.remove_door(d);
        }
        let dead: Vec<RoomKey> = self
            .rooms
            .iter()
            .filter(|(_, r)| match r {
                Room::Obstacle(_) => true,
                Room::Complete(c) => c.net_dependent,
                Room::Incomplete(_) => true,
            })
            .map(|(k, _)| k)
            .collect();
        for r in dead {
            self.remove_room(r);
        }
        self.drills.clear();
    }

    /// Destroys the entire graph. Called at session end.
    pub fn clear(&mut self) {
        self.rooms.clear();
        self.doors.clear();
        self.drills.clear();
        self.room_tree.clear();
        self.obstacle_index.clear();
    }

    /// Removes complete rooms whose shape's bounding box intersects
    /// `region` on `layer`; their doors go with them. Called after board
    /// mutations so stale rooms cannot violate the free-space invariant.
    pub fn invalidate_region(&mut self, region: Rect, layer: usize) {
        let mut hit: Vec<RoomKey> = Vec::new();
        self.room_tree.visit_overlapping(region, |key, _| {
            hit.push(key);
        });
        for key in hit {
            if self.rooms.get(key).map(|r| r.layer()) == Some(layer) {
                self.remove_room(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn free_room(graph: &mut RoomGraph, layer: usize, rect: Rect) -> RoomKey {
        let key = graph.add_incomplete(IncompleteRoom {
            layer,
            region: rect,
            contained: TileShape::from_point(rect.center()),
        });
        graph.promote(key, TileShape::from(rect), false);
        key
    }

    #[test]
    fn door_links_both_rooms_exactly_once() {
        let mut g = RoomGraph::new();
        let a = free_room(&mut g, 0, Rect::from_sides(0, 0, 100, 100));
        let b = free_room(&mut g, 0, Rect::from_sides(100, 0, 200, 100));
        let shape = TileShape::from(Rect::from_sides(100, 0, 100, 100));
        let lines = section_lines_for(&shape, 10);
        let door = g.link_door(Door {
            kind: DoorKind::Normal {
                room_a: a,
                room_b: b,
            },
            dimension: 1,
            shape,
            sections: vec![SectionState::default(); lines.len()],
            section_lines: lines,
        });
        let ra = g.complete(a).unwrap();
        let rb = g.complete(b).unwrap();
        assert_eq!(ra.doors.iter().filter(|&&d| d == door).count(), 1);
        assert_eq!(rb.doors.iter().filter(|&&d| d == door).count(), 1);
        assert!(g.door_exists_between(a, b));

        g.remove_door(door);
        assert!(g.complete(a).unwrap().doors.is_empty());
        assert!(g.complete(b).unwrap().doors.is_empty());
    }

    #[test]
    fn removing_a_room_purges_its_doors() {
        let mut g = RoomGraph::new();
        let a = free_room(&mut g, 0, Rect::from_sides(0, 0, 100, 100));
        let b = free_room(&mut g, 0, Rect::from_sides(100, 0, 200, 100));
        let shape = TileShape::from(Rect::from_sides(100, 0, 100, 100));
        g.link_door(Door {
            kind: DoorKind::Normal {
                room_a: a,
                room_b: b,
            },
            dimension: 1,
            shape: shape.clone(),
            sections: vec![SectionState::default()],
            section_lines: section_lines_for(&shape, 10),
        });
        g.remove_room(b);
        assert!(g.complete(a).unwrap().doors.is_empty());
        assert!(g.doors.is_empty());
        assert!(!g.door_exists_between(a, b));
    }

    #[test]
    fn section_count_scales_with_length() {
        let long = TileShape::from(Rect::from_sides(0, 0, 10_000, 0));
        // k = 10 sections of width 10 * (hw + margin).
        let lines = section_lines_for(&long, 100);
        assert_eq!(lines.len(), 10);
        let short = TileShape::from(Rect::from_sides(0, 0, 100, 0));
        assert_eq!(section_lines_for(&short, 100).len(), 1);
    }

    #[test]
    fn net_dependent_rooms_die_on_net_switch() {
        let mut g = RoomGraph::new();
        let keep = free_room(&mut g, 0, Rect::from_sides(0, 0, 100, 100));
        let drop_key = {
            let key = g.add_incomplete(IncompleteRoom {
                layer: 0,
                region: Rect::from_sides(200, 0, 300, 100),
                contained: TileShape::from_point(Point::new(250, 50)),
            });
            g.promote(key, TileShape::from(Rect::from_sides(200, 0, 300, 100)), true);
            key
        };
        g.clear_net_dependent();
        assert!(g.complete(keep).is_some());
        assert!(g.rooms.get(drop_key).is_none());
    }
}
