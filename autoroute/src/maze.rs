//! The A* maze search over (door, section) states in the room graph.
//!
//! The search expands from the sections of start-side target doors toward a
//! destination-side target door. Section states (occupied flags and
//! back-pointers) live on the doors themselves; queue elements are small and
//! recycled through a session-local free list capped at a few hundred
//! entries.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use geometry::prelude::*;
use tracing::{debug, trace};

use crate::board::item::ItemId;
use crate::destination::DestinationDistance;
use crate::engine::AutorouteEngine;
use crate::rooms::{Adjustment, DoorKey, DoorKind, ExpandableRef, Room, RoomKey, SectionState};
use crate::stop::{Stoppable, TimeLimit};

/// How often the stop flag and time limit are polled.
const CHECK_INTERVAL: usize = 64;

/// Cap on the recycled-element free list.
const MAX_POOL: usize = 500;

/// One point of a backtracked path, tagged with its layer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PathNode {
    /// The location.
    pub point: Point,
    /// The layer.
    pub layer: usize,
}

/// The result of one maze search.
#[derive(Debug, Clone)]
pub enum MazeOutcome {
    /// A path was found.
    Found {
        /// Entry points from start to destination.
        path: Vec<PathNode>,
        /// Items that must be ripped up to realise the path.
        ripped: Vec<ItemId>,
    },
    /// The search space was exhausted without reaching a destination.
    NotRouted,
    /// The iteration bound was hit.
    IterationLimit,
    /// A stop request or the time limit fired.
    Stopped,
}

/// An element of the maze expansion list.
#[derive(Debug, Clone, Default)]
struct MazeListElement {
    door: Option<ExpandableRef>,
    section: usize,
    backtrack: Option<(ExpandableRef, usize)>,
    /// The weighted distance from the start of the expansion (g).
    expansion_value: f64,
    /// g plus the destination lower bound (f); the queue sorts by this.
    sorting_value: f64,
    next_room: Option<RoomKey>,
    entry: Point,
    layer: usize,
    ripup_spent: f64,
    room_ripped: bool,
    adjustment: Adjustment,
}

/// Heap handle ordered so the smallest sorting value pops first, ties broken
/// by smaller expansion value.
struct HeapEntry {
    sorting: f64,
    expansion: f64,
    slot: usize,
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sorting == other.sorting && self.expansion == other.expansion
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .sorting
            .total_cmp(&self.sorting)
            .then_with(|| other.expansion.total_cmp(&self.expansion))
    }
}

/// Session-local element storage with a capped free list.
#[derive(Default)]
struct ElementPool {
    slots: Vec<MazeListElement>,
    free: Vec<usize>,
}

impl ElementPool {
    fn obtain(&mut self, element: MazeListElement) -> usize {
        if let Some(slot) = self.free.pop() {
            self.slots[slot] = element;
            slot
        } else {
            self.slots.push(element);
            self.slots.len() - 1
        }
    }

    fn recycle(&mut self, slot: usize) {
        if self.free.len() < MAX_POOL {
            self.free.push(slot);
        }
    }
}

/// Runs one maze search on a prepared engine.
pub struct MazeSearch<'e, 'a> {
    engine: &'e mut AutorouteEngine<'a>,
    destination: DestinationDistance,
    heap: BinaryHeap<HeapEntry>,
    pool: ElementPool,
}

impl<'e, 'a> MazeSearch<'e, 'a> {
    /// Builds the search from the start doors returned by
    /// [`AutorouteEngine::prepare_connection`] and the destination item set.
    pub fn new(
        engine: &'e mut AutorouteEngine<'a>,
        start_doors: &[DoorKey],
        dest_items: &[ItemId],
    ) -> Self {
        let mut destination = DestinationDistance::new(
            engine.ctrl.trace_costs.clone(),
            &engine.ctrl.layer_active,
            engine.ctrl.min_normal_via_cost,
            engine.ctrl.min_cheap_via_cost,
        );
        let lc = engine.board.layer_count();
        for &id in dest_items {
            if let Some(item) = engine.board.item(id) {
                let (first, last) = item.layer_span(engine.board.rules(), lc);
                for layer in first..=last {
                    if let Some(shape) = item.shape_on_layer(engine.board.rules(), layer) {
                        destination.join(shape.bbox(), layer);
                    }
                }
            }
        }

        let mut search = Self {
            engine,
            destination,
            heap: BinaryHeap::new(),
            pool: ElementPool::default(),
        };
        for &dk in start_doors {
            search.push_start_door(dk);
        }
        search
    }

    fn push_start_door(&mut self, dk: DoorKey) {
        let Some(door) = self.engine.graph.doors.get(dk) else {
            return;
        };
        let DoorKind::Target { room, .. } = door.kind else {
            return;
        };
        let Some(line) = door.section_lines.first().copied() else {
            return;
        };
        let layer = self
            .engine
            .graph
            .rooms
            .get(room)
            .map(|r| r.layer())
            .unwrap_or(0);
        let entry = line.midpoint();
        let h = self.destination.distance(entry, layer);
        let element = MazeListElement {
            door: Some(ExpandableRef::Door(dk)),
            section: 0,
            backtrack: None,
            expansion_value: 0.0,
            sorting_value: h,
            next_room: Some(room),
            entry,
            layer,
            ripup_spent: 0.0,
            room_ripped: false,
            adjustment: Adjustment::None,
        };
        self.push(element);
    }

    fn push(&mut self, element: MazeListElement) {
        let sorting = element.sorting_value;
        let expansion = element.expansion_value;
        if !sorting.is_finite() {
            return;
        }
        let slot = self.pool.obtain(element);
        self.heap.push(HeapEntry {
            sorting,
            expansion,
            slot,
        });
    }

    /// Runs the search to completion, the iteration bound, or a stop.
    pub fn run(&mut self, stoppable: &dyn Stoppable, time: &TimeLimit) -> MazeOutcome {
        if self.destination.is_empty() {
            return MazeOutcome::NotRouted;
        }
        let max_iterations = self.engine.ctrl.max_iterations;
        let mut iterations = 0usize;

        while let Some(entry) = self.heap.pop() {
            iterations += 1;
            if iterations > max_iterations {
                debug!(iterations, "maze search hit the iteration bound");
                return MazeOutcome::IterationLimit;
            }
            if iterations % CHECK_INTERVAL == 0
                && (stoppable.is_stop_requested() || time.is_exceeded())
            {
                return MazeOutcome::Stopped;
            }

            let element = self.pool.slots[entry.slot].clone();
            self.pool.recycle(entry.slot);
            let Some(door_ref) = element.door else {
                continue;
            };
            if self.section_occupied(door_ref, element.section) {
                continue;
            }
            self.occupy(&element);

            if let ExpandableRef::Door(dk) = door_ref {
                if self
                    .engine
                    .graph
                    .doors
                    .get(dk)
                    .map(|d| d.is_destination_target())
                    .unwrap_or(false)
                {
                    trace!(iterations, "destination reached");
                    let (path, ripped) = self.backtrack(door_ref, element.section);
                    return MazeOutcome::Found { path, ripped };
                }
            }

            self.expand(&element);
        }
        MazeOutcome::NotRouted
    }

    fn section_occupied(&self, re: ExpandableRef, section: usize) -> bool {
        self.section_state(re, section)
            .map(|s| s.occupied)
            .unwrap_or(true)
    }

    fn section_state(&self, re: ExpandableRef, section: usize) -> Option<&SectionState> {
        match re {
            ExpandableRef::Door(d) => {
                self.engine.graph.doors.get(d).and_then(|d| d.sections.get(section))
            }
            ExpandableRef::Drill(d) => self
                .engine
                .graph
                .drills
                .get(d)
                .and_then(|d| d.sections.get(section)),
        }
    }

    fn occupy(&mut self, element: &MazeListElement) {
        let Some(door_ref) = element.door else {
            return;
        };
        let state = match door_ref {
            ExpandableRef::Door(d) => self
                .engine
                .graph
                .doors
                .get_mut(d)
                .and_then(|d| d.sections.get_mut(element.section)),
            ExpandableRef::Drill(d) => self
                .engine
                .graph
                .drills
                .get_mut(d)
                .and_then(|d| d.sections.get_mut(element.section)),
        };
        if let Some(state) = state {
            state.occupied = true;
            state.backtrack = element.backtrack;
            state.room_ripped = element.room_ripped;
            state.adjustment = element.adjustment;
            state.entry = element.entry;
            state.layer = element.layer;
        }
    }

    /// Expands a popped element into the room on the other side of its
    /// door.
    fn expand(&mut self, element: &MazeListElement) {
        let Some(room_key) = element.next_room else {
            return;
        };
        // Neighbour doors must exist before expansion so the door list does
        // not change mid-iteration.
        self.engine.complete_neighbours(room_key);

        let Some(room) = self.engine.graph.rooms.get(room_key) else {
            return;
        };
        let layer = room.layer();
        let door_keys = room.door_keys();

        for dk in door_keys {
            if element.door == Some(ExpandableRef::Door(dk)) {
                continue;
            }
            let Some(door) = self.engine.graph.doors.get(dk) else {
                continue;
            };
            // Start-side target doors are entrances, not goals.
            if door.is_start_target() {
                continue;
            }
            let next_room = door.other_room(room_key);
            let section_lines = door.section_lines.clone();
            // Through an overlap region the entry is the nearest point of
            // the region itself; through a shared edge it is the nearest
            // point on the section line.
            let region_entry = (door.dimension == 2
                && matches!(door.kind, DoorKind::Normal { .. }))
            .then(|| door.shape.nearest_point(element.entry));
            for (section, line) in section_lines.iter().enumerate() {
                if self.section_occupied(ExpandableRef::Door(dk), section) {
                    continue;
                }
                let entry = region_entry.unwrap_or_else(|| line.nearest_segment_point(element.entry));
                if self
                    .engine
                    .board
                    .is_prohibited(entry, layer, self.engine.ctrl.net)
                {
                    continue;
                }
                let mut delta_g = self.engine.ctrl.trace_cost(layer, element.entry, entry);
                let mut ripup_spent = element.ripup_spent;
                let mut room_ripped = false;
                if let Some(next) = next_room {
                    if let Some(ob) = self.engine.graph.obstacle(next) {
                        // Traversing an obstacle room means paying to rip
                        // its item; the pass budget is the only gate.
                        let Some(item) = self.engine.board.item(ob.item) else {
                            continue;
                        };
                        if !item.is_routable()
                            || item.id.0 >= self.engine.ctrl.ripup_watermark
                        {
                            continue;
                        }
                        let cost = self.engine.ctrl.ripup_cost(item.routed_length());
                        if ripup_spent + cost > self.engine.ctrl.ripup_budget {
                            continue;
                        }
                        ripup_spent += cost;
                        delta_g += cost;
                        room_ripped = true;
                    }
                }
                let g = element.expansion_value + delta_g;
                let h = self.destination.distance(entry, layer);
                self.push(MazeListElement {
                    door: Some(ExpandableRef::Door(dk)),
                    section,
                    backtrack: Some((
                        element.door.expect("expanded element has a door"),
                        element.section,
                    )),
                    expansion_value: g,
                    sorting_value: g + h,
                    next_room,
                    entry,
                    layer,
                    ripup_spent,
                    room_ripped,
                    adjustment: Adjustment::None,
                });
            }
        }

        // Layer changes through candidate drills.
        if matches!(self.engine.graph.rooms.get(room_key), Some(Room::Complete(_))) {
            let drills = self.engine.drills_for_room(room_key);
            for drill_key in drills {
                let Some(drill) = self.engine.graph.drills.get(drill_key) else {
                    continue;
                };
                let location = drill.location;
                let first = drill.first_layer;
                let last = drill.last_layer;
                let rooms = drill.rooms.clone();
                for to_layer in first..=last {
                    if to_layer == layer || !self.engine.ctrl.is_layer_active(to_layer) {
                        continue;
                    }
                    let section = to_layer - first;
                    if self.section_occupied(ExpandableRef::Drill(drill_key), section) {
                        continue;
                    }
                    if self
                        .engine
                        .board
                        .is_prohibited(location, to_layer, self.engine.ctrl.net)
                    {
                        continue;
                    }
                    let delta_g = self.engine.ctrl.trace_cost(layer, element.entry, location)
                        + self.engine.ctrl.via_cost(layer, to_layer);
                    let g = element.expansion_value + delta_g;
                    let h = self.destination.distance(location, to_layer);
                    self.push(MazeListElement {
                        door: Some(ExpandableRef::Drill(drill_key)),
                        section,
                        backtrack: Some((
                            element.door.expect("expanded element has a door"),
                            element.section,
                        )),
                        expansion_value: g,
                        sorting_value: g + h,
                        next_room: rooms.get(section).copied(),
                        entry: location,
                        layer: to_layer,
                        ripup_spent: element.ripup_spent,
                        room_ripped: false,
                        adjustment: Adjustment::None,
                    });
                }
            }
        }
    }

    /// Walks the back-pointers from the destination section to the start,
    /// producing the ordered entry-point path and the set of items that must
    /// be ripped.
    fn backtrack(
        &self,
        dest: ExpandableRef,
        dest_section: usize,
    ) -> (Vec<PathNode>, Vec<ItemId>) {
        let mut nodes = Vec::new();
        let mut ripped = Vec::new();
        let mut cursor = Some((dest, dest_section));
        // Back-pointers only ever reference earlier-occupied sections, so
        // the chain is acyclic; the guard bounds it by the section count.
        let mut guard = self
            .engine
            .graph
            .doors
            .iter()
            .map(|(_, d)| d.sections.len())
            .sum::<usize>()
            + self
                .engine
                .graph
                .drills
                .iter()
                .map(|(_, d)| d.sections.len())
                .sum::<usize>()
            + 2;
        while let Some((re, section)) = cursor {
            guard = guard.saturating_sub(1);
            if guard == 0 {
                break;
            }
            let Some(state) = self.section_state(re, section) else {
                break;
            };
            nodes.push(PathNode {
                point: state.entry,
                layer: state.layer,
            });
            if let Some((back, _)) = state.backtrack {
                for item in self.shared_obstacle_items(re, back) {
                    if !ripped.contains(&item) {
                        ripped.push(item);
                    }
                }
            }
            cursor = state.backtrack;
        }
        nodes.reverse();
        (nodes, ripped)
    }

    /// The obstacle items wrapped by rooms shared between two expandable
    /// objects; traversing such a room rips its item.
    fn shared_obstacle_items(&self, a: ExpandableRef, b: ExpandableRef) -> Vec<ItemId> {
        let rooms_a = self.engine.rooms_of(a);
        let rooms_b = self.engine.rooms_of(b);
        let mut out = Vec::new();
        for r in rooms_a {
            if rooms_b.contains(&r) {
                if let Some(ob) = self.engine.graph.obstacle(r) {
                    out.push(ob.item);
                }
            }
        }
        out
    }
}
