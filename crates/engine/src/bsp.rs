//! Binary space partition over the container.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Every internal
//! node is cut by one axis-aligned plane: the left child holds the low side,
//! the right child the high side. Leaves are either free or bound to exactly
//! one partition. Node bounds are only changed through the tree's own
//! operations.

use lanepack_core::geometry::{longest_axis, Axis, Box3, EPS};
use std::collections::HashSet;
use std::fmt;

/// Residual sides thinner than this are folded into the allocation.
const MIN_RESIDUAL: f64 = 1e-6;

/// Stable handle of a node in a [`BspTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Returns the arena index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bsp_{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct BspNode {
    bounds: Box3,
    parent: Option<NodeId>,
    children: Option<(NodeId, NodeId)>,
    split: Option<(Axis, f64)>,
    partition_id: Option<String>,
}

impl BspNode {
    fn leaf(bounds: Box3, parent: Option<NodeId>) -> Self {
        Self {
            bounds,
            parent,
            children: None,
            split: None,
            partition_id: None,
        }
    }
}

/// Outcome of a split: the allocated node and the free residual, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOutcome {
    /// Node sized to the request (the whole leaf when nothing is left over).
    pub allocated: NodeId,
    /// Remaining free node.
    pub residual: Option<NodeId>,
}

/// A boundary plane shared by two leaves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedBoundary {
    /// Internal node whose split separates the two leaves.
    pub node: NodeId,
    /// Split axis.
    pub axis: Axis,
    /// Current split coordinate.
    pub value: f64,
}

/// Arena-backed BSP tree.
#[derive(Debug, Clone)]
pub struct BspTree {
    nodes: Vec<BspNode>,
}

impl BspTree {
    /// Creates a tree whose root covers `bounds`.
    pub fn new(bounds: Box3) -> Self {
        Self {
            nodes: vec![BspNode::leaf(bounds, None)],
        }
    }

    /// Returns the root node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn node(&self, id: NodeId) -> Option<&BspNode> {
        self.nodes.get(id.0)
    }

    /// Returns the bounds of a node.
    pub fn bounds(&self, id: NodeId) -> Option<Box3> {
        self.node(id).map(|n| n.bounds)
    }

    /// Returns the children of an internal node.
    pub fn children(&self, id: NodeId) -> Option<(NodeId, NodeId)> {
        self.node(id).and_then(|n| n.children)
    }

    /// Returns the parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Returns the split of an internal node.
    pub fn split_of(&self, id: NodeId) -> Option<(Axis, f64)> {
        self.node(id).and_then(|n| n.split)
    }

    /// Returns the partition bound to a leaf.
    pub fn partition_of(&self, id: NodeId) -> Option<&str> {
        self.node(id).and_then(|n| n.partition_id.as_deref())
    }

    /// Returns true if `id` is a leaf.
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.node(id).map_or(false, |n| n.children.is_none())
    }

    fn is_free_leaf(&self, id: NodeId) -> bool {
        self.node(id)
            .map_or(false, |n| n.children.is_none() && n.partition_id.is_none())
    }

    fn push(&mut self, bounds: Box3, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(BspNode::leaf(bounds, Some(parent)));
        id
    }

    /// Cuts a free leaf at `value` along `axis`; the low side is allocated.
    fn cut(&mut self, leaf: NodeId, axis: Axis, value: f64) -> SplitOutcome {
        let bounds = self.nodes[leaf.0].bounds;
        let low = bounds.with_max_on(axis, value);
        let high = bounds.with_min_on(axis, value);

        let allocated = self.push(low, leaf);
        let residual = self.push(high, leaf);

        let node = &mut self.nodes[leaf.0];
        node.children = Some((allocated, residual));
        node.split = Some((axis, value));

        SplitOutcome {
            allocated,
            residual: Some(residual),
        }
    }

    /// Splits a free leaf so the allocated side holds `target_volume`.
    ///
    /// The split runs along `preferred_axis` unless it has no extent, in which
    /// case the leaf's longest axis is used. Returns `None` if the leaf is
    /// smaller than the target. If the residual would be degenerate the whole
    /// leaf is allocated and there is no residual.
    pub fn split_by_volume(
        &mut self,
        leaf: NodeId,
        target_volume: f64,
        preferred_axis: Axis,
    ) -> Option<SplitOutcome> {
        if !self.is_free_leaf(leaf) || target_volume <= 0.0 {
            return None;
        }
        let bounds = self.nodes[leaf.0].bounds;
        let volume = bounds.volume();
        if volume < target_volume - EPS {
            return None;
        }

        let axis = if bounds.extent(preferred_axis) > EPS {
            preferred_axis
        } else {
            longest_axis(&bounds)
        };
        let extent = bounds.extent(axis);
        if extent <= EPS {
            return None;
        }

        let value = bounds.min_on(axis) + extent * (target_volume / volume);
        let residual = bounds.with_min_on(axis, value);
        if residual.is_degenerate(MIN_RESIDUAL) {
            return Some(SplitOutcome {
                allocated: leaf,
                residual: None,
            });
        }
        Some(self.cut(leaf, axis, value))
    }

    /// Splits a free leaf so the allocated side is `thickness` thick along `axis`.
    ///
    /// Non-positive thickness allocates nothing. A thickness at least as large
    /// as the leaf's extent allocates the whole leaf with no residual.
    pub fn split_by_thickness(
        &mut self,
        leaf: NodeId,
        axis: Axis,
        thickness: f64,
    ) -> Option<SplitOutcome> {
        if !self.is_free_leaf(leaf) || thickness <= 0.0 {
            return None;
        }
        let bounds = self.nodes[leaf.0].bounds;
        if bounds.extent(axis) - thickness < MIN_RESIDUAL {
            return Some(SplitOutcome {
                allocated: leaf,
                residual: None,
            });
        }
        Some(self.cut(leaf, axis, bounds.min_on(axis) + thickness))
    }

    /// Splits a free leaf so the allocated side takes `ratio` of its extent along `axis`.
    pub fn split_by_ratio(&mut self, leaf: NodeId, axis: Axis, ratio: f64) -> Option<SplitOutcome> {
        let extent = self.bounds(leaf)?.extent(axis);
        self.split_by_thickness(leaf, axis, extent * ratio.clamp(0.0, 1.0))
    }

    /// Moves the split plane of an internal node.
    ///
    /// The value is clamped to the node's bounds and to every same-axis split
    /// inside its subtrees, so no descendant is inverted. Every descendant
    /// face lying on the plane moves with it. Returns the applied value.
    pub fn update_split(&mut self, node: NodeId, new_value: f64) -> Option<f64> {
        let (axis, old) = self.split_of(node)?;
        let (left, right) = self.children(node)?;
        let bounds = self.nodes[node.0].bounds;

        let mut lo = bounds.min_on(axis);
        let mut hi = bounds.max_on(axis);
        for id in self.subtree(left) {
            if let Some((a, v)) = self.nodes[id.0].split {
                if a == axis {
                    lo = lo.max(v);
                }
            }
        }
        for id in self.subtree(right) {
            if let Some((a, v)) = self.nodes[id.0].split {
                if a == axis {
                    hi = hi.min(v);
                }
            }
        }
        let value = new_value.clamp(lo, hi.max(lo));

        self.move_max(left, axis, value);
        self.move_min(right, axis, value);
        self.nodes[node.0].split = Some((axis, value));

        log::debug!("BSP {} split on {} moved {:.4} -> {:.4}", node, axis, old, value);
        Some(value)
    }

    /// Moves the max face of `id` on `axis`, following the children that touch it.
    fn move_max(&mut self, id: NodeId, axis: Axis, value: f64) {
        let node = &mut self.nodes[id.0];
        node.bounds = node.bounds.with_max_on(axis, value);
        match (node.children, node.split) {
            (Some((_, r)), Some((a, _))) if a == axis => self.move_max(r, axis, value),
            (Some((l, r)), _) => {
                self.move_max(l, axis, value);
                self.move_max(r, axis, value);
            }
            _ => {}
        }
    }

    /// Moves the min face of `id` on `axis`, following the children that touch it.
    fn move_min(&mut self, id: NodeId, axis: Axis, value: f64) {
        let node = &mut self.nodes[id.0];
        node.bounds = node.bounds.with_min_on(axis, value);
        match (node.children, node.split) {
            (Some((l, _)), Some((a, _))) if a == axis => self.move_min(l, axis, value),
            (Some((l, r)), _) => {
                self.move_min(l, axis, value);
                self.move_min(r, axis, value);
            }
            _ => {}
        }
    }

    /// Returns `id` and all of its descendants.
    fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            if let Some((l, r)) = self.nodes[current.0].children {
                stack.push(r);
                stack.push(l);
            }
        }
        out
    }

    /// Returns all leaves, low side first.
    pub fn get_leaves(&self) -> Vec<NodeId> {
        self.subtree(self.root())
            .into_iter()
            .filter(|id| self.is_leaf(*id))
            .collect()
    }

    /// Returns the first free leaf holding at least `target_volume`.
    pub fn find_free_leaf(&self, target_volume: f64) -> Option<NodeId> {
        self.get_leaves()
            .into_iter()
            .find(|id| self.is_free_leaf(*id) && self.nodes[id.0].bounds.volume() >= target_volume)
    }

    /// Binds a free leaf to a partition. Returns false if the leaf is not free.
    pub fn bind_partition(&mut self, leaf: NodeId, partition_id: impl Into<String>) -> bool {
        if !self.is_free_leaf(leaf) {
            return false;
        }
        self.nodes[leaf.0].partition_id = Some(partition_id.into());
        true
    }

    /// Returns the leaf bound to `partition_id`.
    pub fn leaf_of_partition(&self, partition_id: &str) -> Option<NodeId> {
        self.get_leaves()
            .into_iter()
            .find(|id| self.partition_of(*id) == Some(partition_id))
    }

    fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = vec![id];
        let mut current = id;
        while let Some(p) = self.parent(current) {
            out.push(p);
            current = p;
        }
        out
    }

    /// Returns the split separating two leaves if both touch its plane.
    pub fn shared_boundary(&self, a: NodeId, b: NodeId) -> Option<SharedBoundary> {
        if a == b {
            return None;
        }
        let seen: HashSet<NodeId> = self.ancestors(a).into_iter().collect();
        let lca = self.ancestors(b).into_iter().find(|id| seen.contains(id))?;
        let (axis, value) = self.split_of(lca)?;

        let ba = self.bounds(a)?;
        let bb = self.bounds(b)?;
        let touches = |x: &Box3| {
            (x.max_on(axis) - value).abs() <= EPS || (x.min_on(axis) - value).abs() <= EPS
        };
        if !touches(&ba) || !touches(&bb) {
            return None;
        }
        Some(SharedBoundary {
            node: lca,
            axis,
            value,
        })
    }

    /// Verifies that every internal node is exactly covered by its children.
    pub fn check_invariants(&self) -> Result<(), String> {
        for (idx, node) in self.nodes.iter().enumerate() {
            let id = NodeId(idx);
            if !node.bounds.is_valid() {
                return Err(format!("{id} has inverted bounds"));
            }
            let (Some((l, r)), Some((axis, value))) = (node.children, node.split) else {
                if node.children.is_some() != node.split.is_some() {
                    return Err(format!("{id} has children without a split"));
                }
                continue;
            };
            if node.partition_id.is_some() {
                return Err(format!("{id} is internal but bound to a partition"));
            }

            let p = node.bounds;
            let lb = self.nodes[l.0].bounds;
            let rb = self.nodes[r.0].bounds;
            if value < p.min_on(axis) - EPS || value > p.max_on(axis) + EPS {
                return Err(format!("{id} split {value} outside its bounds"));
            }

            let expected_left = p.with_max_on(axis, value);
            let expected_right = p.with_min_on(axis, value);
            if !same_box(&lb, &expected_left) {
                return Err(format!("{l} does not match the low side of {id}"));
            }
            if !same_box(&rb, &expected_right) {
                return Err(format!("{r} does not match the high side of {id}"));
            }
            if lb.intersects(&rb, EPS) {
                return Err(format!("children of {id} overlap"));
            }
        }
        Ok(())
    }
}

fn same_box(a: &Box3, b: &Box3) -> bool {
    (a.min - b.min).amax() <= EPS && (a.max - b.max).amax() <= EPS
}
