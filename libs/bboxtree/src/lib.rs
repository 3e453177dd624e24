//! A binary bounding-box tree over (item, sub-shape) leaves.
//!
//! Every leaf stores an item handle, a sub-shape index and the sub-shape's
//! bounding box; every internal node's box is the union of its two children's
//! boxes. Insertion uses the *minimum-area-increase* heuristic: the tree is
//! descended into whichever child's box would grow less when unioned with the
//! new leaf, and the reached leaf is replaced by an internal node holding the
//! old and the new leaf. Deletion removes a leaf and splices its single-child
//! parent out of the tree.
//!
//! Overlap queries are *complete*: every stored box intersecting the query
//! box is reported.
//!
//! Nodes live in a slab with an internal free list; all references between
//! nodes are indices, never pointers.
#![warn(missing_docs)]

use std::collections::HashMap;
use std::hash::Hash;

use geometry::rect::Rect;

/// A node handle inside the slab.
type NodeIdx = usize;

#[derive(Debug, Clone)]
enum NodeKind<T> {
    Leaf { item: T, shape: usize },
    Inner { children: [NodeIdx; 2] },
}

#[derive(Debug, Clone)]
struct Node<T> {
    bbox: Rect,
    parent: Option<NodeIdx>,
    kind: NodeKind<T>,
}

/// A bounding-box tree keyed by item handles of type `T`.
///
/// An item may own several sub-shapes; each sub-shape is one leaf. Removing
/// an item removes all of its leaves.
#[derive(Debug, Clone, Default)]
pub struct BboxTree<T> {
    nodes: Vec<Option<Node<T>>>,
    free: Vec<NodeIdx>,
    root: Option<NodeIdx>,
    leaves: HashMap<T, Vec<NodeIdx>>,
    len: usize,
}

impl<T: Copy + Eq + Hash> BboxTree<T> {
    /// Creates an empty tree.
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            free: Vec::new(),
            root: None,
            leaves: HashMap::new(),
            len: 0,
        }
    }

    /// The number of leaves stored.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no leaves.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Removes every leaf.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.leaves.clear();
        self.root = None;
        self.len = 0;
    }

    fn alloc(&mut self, node: Node<T>) -> NodeIdx {
        if let Some(idx) = self.free.pop() {
            self.nodes[idx] = Some(node);
            idx
        } else {
            self.nodes.push(Some(node));
            self.nodes.len() - 1
        }
    }

    fn dealloc(&mut self, idx: NodeIdx) {
        self.nodes[idx] = None;
        self.free.push(idx);
    }

    fn node(&self, idx: NodeIdx) -> &Node<T> {
        self.nodes[idx].as_ref().expect("stale node index")
    }

    fn node_mut(&mut self, idx: NodeIdx) -> &mut Node<T> {
        self.nodes[idx].as_mut().expect("stale node index")
    }

    /// Inserts one leaf for `(item, shape)` with the given bounding box.
    ///
    /// An empty box is ignored.
    pub fn insert(&mut self, item: T, shape: usize, bbox: Rect) {
        if bbox.is_empty() {
            return;
        }
        let leaf = self.alloc(Node {
            bbox,
            parent: None,
            kind: NodeKind::Leaf { item, shape },
        });
        self.leaves.entry(item).or_default().push(leaf);
        self.len += 1;

        let Some(root) = self.root else {
            self.root = Some(leaf);
            return;
        };

        // Descend along minimum area increase to the leaf to pair with.
        let mut cur = root;
        loop {
            match self.node(cur).kind {
                NodeKind::Leaf { .. } => break,
                NodeKind::Inner { children } => {
                    let inc0 = area_increase(self.node(children[0]).bbox, bbox);
                    let inc1 = area_increase(self.node(children[1]).bbox, bbox);
                    cur = if inc0 <= inc1 { children[0] } else { children[1] };
                }
            }
        }

        // Replace `cur` with an inner node over { cur, leaf }.
        let parent = self.node(cur).parent;
        let joint = self.node(cur).bbox.union(bbox);
        let inner = self.alloc(Node {
            bbox: joint,
            parent,
            kind: NodeKind::Inner {
                children: [cur, leaf],
            },
        });
        self.node_mut(cur).parent = Some(inner);
        self.node_mut(leaf).parent = Some(inner);
        match parent {
            None => self.root = Some(inner),
            Some(p) => {
                if let NodeKind::Inner { ref mut children } = self.node_mut(p).kind {
                    for c in children.iter_mut() {
                        if *c == cur {
                            *c = inner;
                        }
                    }
                }
                self.refit_upward(p);
            }
        }
    }

    /// Removes every leaf of `item`. Returns `true` if any leaf was removed.
    pub fn remove(&mut self, item: T) -> bool {
        let Some(leaf_list) = self.leaves.remove(&item) else {
            return false;
        };
        for leaf in leaf_list {
            self.remove_leaf(leaf);
        }
        true
    }

    fn remove_leaf(&mut self, leaf: NodeIdx) {
        self.len -= 1;
        let parent = self.node(leaf).parent;
        self.dealloc(leaf);
        match parent {
            None => {
                self.root = None;
            }
            Some(p) => {
                // Splice the now single-child inner node out of the tree.
                let NodeKind::Inner { children } = self.node(p).kind else {
                    unreachable!("leaf parent must be an inner node");
                };
                let sibling = if children[0] == leaf {
                    children[1]
                } else {
                    children[0]
                };
                let grand = self.node(p).parent;
                self.dealloc(p);
                self.node_mut(sibling).parent = grand;
                match grand {
                    None => self.root = Some(sibling),
                    Some(g) => {
                        if let NodeKind::Inner { ref mut children } = self.node_mut(g).kind {
                            for c in children.iter_mut() {
                                if *c == p {
                                    *c = sibling;
                                }
                            }
                        }
                        self.refit_upward(g);
                    }
                }
            }
        }
    }

    /// Recomputes bounding boxes from `from` up to the root.
    fn refit_upward(&mut self, from: NodeIdx) {
        let mut cur = Some(from);
        while let Some(idx) = cur {
            let NodeKind::Inner { children } = self.node(idx).kind else {
                break;
            };
            let joint = self
                .node(children[0])
                .bbox
                .union(self.node(children[1]).bbox);
            let n = self.node_mut(idx);
            if n.bbox == joint {
                break;
            }
            n.bbox = joint;
            cur = n.parent;
        }
    }

    /// Visits every `(item, shape)` whose bounding box intersects `query`.
    ///
    /// A query with an empty box visits nothing.
    pub fn visit_overlapping(&self, query: Rect, mut f: impl FnMut(T, usize)) {
        if query.is_empty() {
            return;
        }
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(idx) = stack.pop() {
            let node = self.node(idx);
            if !node.bbox.intersects(&query) {
                continue;
            }
            match node.kind {
                NodeKind::Leaf { item, shape } => f(item, shape),
                NodeKind::Inner { children } => {
                    stack.push(children[0]);
                    stack.push(children[1]);
                }
            }
        }
    }

    /// Collects every `(item, shape)` whose bounding box intersects `query`.
    pub fn overlapping(&self, query: Rect) -> Vec<(T, usize)> {
        let mut out = Vec::new();
        self.visit_overlapping(query, |item, shape| out.push((item, shape)));
        out
    }
}

/// The growth in area of `base` when unioned with `add`.
fn area_increase(base: Rect, add: Rect) -> i64 {
    base.union(add).area() - base.area()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::prelude::*;

    fn boxes() -> Vec<Rect> {
        vec![
            Rect::from_sides(0, 0, 10, 10),
            Rect::from_sides(20, 0, 30, 10),
            Rect::from_sides(0, 20, 10, 30),
            Rect::from_sides(100, 100, 110, 110),
        ]
    }

    #[test]
    fn insert_and_query() {
        let mut tree = BboxTree::new();
        for (i, b) in boxes().into_iter().enumerate() {
            tree.insert(i as u32, 0, b);
        }
        assert_eq!(tree.len(), 4);

        let mut hits = tree.overlapping(Rect::from_sides(5, 5, 25, 25));
        hits.sort();
        assert_eq!(hits, vec![(0, 0), (1, 0), (2, 0)]);

        assert!(tree.overlapping(Rect::from_sides(40, 40, 50, 50)).is_empty());
        assert!(tree.overlapping(Rect::EMPTY).is_empty());
    }

    #[test]
    fn query_is_complete_on_many_items() {
        let mut tree = BboxTree::new();
        let mut expected = Vec::new();
        for i in 0..20i64 {
            for j in 0..20i64 {
                let b = Rect::from_sides(i * 10, j * 10, i * 10 + 8, j * 10 + 8);
                let id = (i * 20 + j) as u32;
                tree.insert(id, 0, b);
                if b.intersects(&Rect::from_sides(35, 35, 95, 65)) {
                    expected.push((id, 0));
                }
            }
        }
        let mut hits = tree.overlapping(Rect::from_sides(35, 35, 95, 65));
        hits.sort();
        expected.sort();
        assert_eq!(hits, expected);
    }

    #[test]
    fn empty_bbox_is_ignored() {
        let mut tree = BboxTree::new();
        tree.insert(1u32, 0, Rect::EMPTY);
        assert!(tree.is_empty());
    }

    #[test]
    fn remove_restores_queries() {
        let mut tree = BboxTree::new();
        for (i, b) in boxes().into_iter().enumerate() {
            tree.insert(i as u32, 0, b);
        }
        assert!(tree.remove(1));
        assert!(!tree.remove(1));
        assert_eq!(tree.len(), 3);
        let mut hits = tree.overlapping(Rect::from_sides(5, 5, 25, 25));
        hits.sort();
        assert_eq!(hits, vec![(0, 0), (2, 0)]);

        // Re-inserting the original geometry restores the old result.
        tree.insert(1, 0, Rect::from_sides(20, 0, 30, 10));
        let mut hits = tree.overlapping(Rect::from_sides(5, 5, 25, 25));
        hits.sort();
        assert_eq!(hits, vec![(0, 0), (1, 0), (2, 0)]);
    }

    #[test]
    fn multiple_sub_shapes_per_item() {
        let mut tree = BboxTree::new();
        tree.insert(7u32, 0, Rect::from_sides(0, 0, 10, 10));
        tree.insert(7u32, 1, Rect::from_sides(50, 0, 60, 10));
        assert_eq!(tree.len(), 2);
        assert_eq!(
            tree.overlapping(Rect::from_sides(55, 5, 56, 6)),
            vec![(7, 1)]
        );
        tree.remove(7);
        assert!(tree.is_empty());
    }

    #[test]
    fn remove_down_to_single_leaf_and_empty() {
        let mut tree = BboxTree::new();
        tree.insert(1u32, 0, Rect::from_sides(0, 0, 10, 10));
        tree.insert(2u32, 0, Rect::from_sides(20, 20, 30, 30));
        tree.remove(1);
        assert_eq!(
            tree.overlapping(Rect::from_sides(0, 0, 100, 100)),
            vec![(2, 0)]
        );
        tree.remove(2);
        assert!(tree.is_empty());
        assert!(tree.overlapping(Rect::from_sides(0, 0, 100, 100)).is_empty());
    }
}
