//! Binary patch tree over an append-only node arena
//!
//! Leaves are the live patches; splitting a leaf retires it into a binary node and
//! appends two new leaves. Nodes are never removed individually, so a [`NodeId`]
//! stays valid until the whole tree is cleared.
//!
//! The tree owns the [`SpatialGridIndex`] but never indexes on its own: callers
//! register new leaves explicitly, which keeps splitting testable without an index.

use std::collections::BTreeSet;

use crate::io::error::{Result, invalid_parameter};
use crate::math::geometry::{Rect, RotationSet};
use crate::spatial::grid::{PatchLookup, Space, SpatialGridIndex};
use crate::spatial::patch::{ImageGeometry, Patch};

/// Stable handle to a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position in the flat node array (also the patch's grid index key)
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Whether a node is live or retired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// No children: an active, assignable patch
    Leaf,
    /// Two children: retained for ancestry, its patch value is stale
    Binary,
}

/// A patch plus its tree linkage
#[derive(Debug, Clone, PartialEq)]
pub struct PatchNode {
    patch: Patch,
    id: NodeId,
    parent: Option<NodeId>,
    children: Option<(NodeId, NodeId)>,
    next: Option<NodeId>,
}

impl PatchNode {
    /// The node's patch (stale for binary nodes)
    pub const fn patch(&self) -> &Patch {
        &self.patch
    }

    /// This node's handle
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Parent node, `None` for the root
    pub const fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Left and right child of a binary node
    pub const fn children(&self) -> Option<(NodeId, NodeId)> {
        self.children
    }

    /// Next sibling (set on left children only)
    pub const fn next(&self) -> Option<NodeId> {
        self.next
    }

    /// Leaf or binary
    pub const fn kind(&self) -> NodeKind {
        if self.children.is_some() {
            NodeKind::Binary
        } else {
            NodeKind::Leaf
        }
    }

    /// Whether the node is a live leaf
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Append-only node storage
///
/// Offers no removal, so handles can only dangle after the whole tree is cleared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeArena {
    nodes: Vec<PatchNode>,
}

impl NodeArena {
    fn push(&mut self, patch: Patch, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(PatchNode {
            patch,
            id,
            parent,
            children: None,
            next: None,
        });
        id
    }

    fn get_mut(&mut self, id: NodeId) -> Option<&mut PatchNode> {
        self.nodes.get_mut(id.0)
    }

    fn reset(&mut self) {
        self.nodes.clear();
    }

    /// Node for a handle
    pub fn get(&self, id: NodeId) -> Option<&PatchNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes ever appended since the last reset
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &PatchNode> {
        self.nodes.iter()
    }
}

/// Which grid spaces (and node storage) a clear affects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearScope {
    /// Empty the source grid only
    Source,
    /// Empty the target grid only
    Target,
    /// Empty both grids and drop every node
    Both,
}

/// Outcome of checking a candidate patch against bounds and live leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Candidate may be committed
    Legal,
    /// A dimension is below the configured minimum
    TooSmall,
    /// Footprint leaves the image in this space
    OutOfBounds(Space),
    /// Footprint overlaps another live leaf in this space
    Overlapping(Space),
}

impl Placement {
    /// Whether the candidate may be committed
    pub const fn is_legal(self) -> bool {
        matches!(self, Self::Legal)
    }
}

/// Binary tree of patches with its dual spatial index
#[derive(Debug, Clone, PartialEq)]
pub struct PatchTree {
    arena: NodeArena,
    index: SpatialGridIndex,
    geometry: ImageGeometry,
}

impl PatchTree {
    /// Create an empty tree with grids of `rows x cols` cells over both images
    ///
    /// # Errors
    ///
    /// Returns an error if the grid resolution is zero
    pub fn new(geometry: ImageGeometry, rows: usize, cols: usize) -> Result<Self> {
        let index = SpatialGridIndex::new(
            rows,
            cols,
            geometry.bounds_mm(Space::Source),
            geometry.bounds_mm(Space::Target),
        )?;
        Ok(Self {
            arena: NodeArena::default(),
            index,
            geometry,
        })
    }

    /// Image extents and rotations the layout lives in
    pub const fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// The dual spatial index
    pub const fn index(&self) -> &SpatialGridIndex {
        &self.index
    }

    /// All nodes, live and retired
    pub const fn nodes(&self) -> &NodeArena {
        &self.arena
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether the tree has no root yet
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// The root node, if seeded
    pub fn root(&self) -> Option<NodeId> {
        (!self.arena.is_empty()).then_some(NodeId(0))
    }

    /// Node for a handle
    pub fn node(&self, id: NodeId) -> Option<&PatchNode> {
        self.arena.get(id)
    }

    /// Patch for a handle
    pub fn patch(&self, id: NodeId) -> Option<&Patch> {
        self.arena.get(id).map(PatchNode::patch)
    }

    /// Whether a handle names a live leaf
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.arena.get(id).is_some_and(PatchNode::is_leaf)
    }

    /// Handles of every live leaf, in arena order
    pub fn leaves(&self) -> Vec<NodeId> {
        self.arena
            .iter()
            .filter(|node| node.is_leaf())
            .map(PatchNode::id)
            .collect()
    }

    /// Every live patch
    pub fn leaf_patches(&self) -> Vec<&Patch> {
        self.arena
            .iter()
            .filter(|node| node.is_leaf())
            .map(PatchNode::patch)
            .collect()
    }

    /// Seed the tree with a single root leaf
    ///
    /// Returns `None` (and changes nothing) if the tree already has nodes.
    pub fn add_root(&mut self, patch: Patch) -> Option<NodeId> {
        if !self.arena.is_empty() {
            return None;
        }
        Some(self.arena.push(patch, None))
    }

    /// Split a leaf into two new leaves
    ///
    /// Returns `None` (and changes nothing) if `parent` is not a live leaf.
    /// The new leaves are not indexed; see [`PatchTree::register`].
    pub fn add(&mut self, parent: NodeId, left: Patch, right: Patch) -> Option<(NodeId, NodeId)> {
        if !self.is_leaf(parent) {
            return None;
        }
        let left_id = self.arena.push(left, Some(parent));
        let right_id = self.arena.push(right, Some(parent));
        if let Some(node) = self.arena.get_mut(left_id) {
            node.next = Some(right_id);
        }
        if let Some(node) = self.arena.get_mut(parent) {
            node.children = Some((left_id, right_id));
        }
        Some((left_id, right_id))
    }

    /// Insert a node's footprint into one space's grid
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown or its patch is malformed
    pub fn register_in(&mut self, id: NodeId, space: Space) -> Result<()> {
        let bounds = self.bounds_of(id, space)?;
        let region = self.index.region(&bounds, space);
        self.index.insert(id.index(), region, space);
        Ok(())
    }

    /// Insert a node's footprints into both grids
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown or its patch is malformed
    pub fn register(&mut self, id: NodeId) -> Result<()> {
        for space in Space::BOTH {
            self.register_in(id, space)?;
        }
        Ok(())
    }

    /// Remove a node's footprints from both grids
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown or its patch is malformed
    pub fn unregister(&mut self, id: NodeId) -> Result<()> {
        for space in Space::BOTH {
            self.unregister_in(id, space)?;
        }
        Ok(())
    }

    /// Remove a node's footprint from one space's grid
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown or its patch is malformed
    pub fn unregister_in(&mut self, id: NodeId, space: Space) -> Result<()> {
        let bounds = self.bounds_of(id, space)?;
        let region = self.index.region(&bounds, space);
        self.index.erase(id.index(), region, space);
        Ok(())
    }

    /// Replace a leaf's patch and move its grid entries accordingly
    ///
    /// A leaf not yet filed in a grid is inserted there.
    ///
    /// # Errors
    ///
    /// Returns an error if `id` is not a live leaf or either patch is malformed
    pub fn commit(&mut self, id: NodeId, patch: Patch) -> Result<()> {
        if !self.is_leaf(id) {
            return Err(invalid_parameter(
                "node",
                &id.index(),
                &"only live leaves can be committed",
            ));
        }
        patch.validate()?;
        let mut moves = Vec::with_capacity(2);
        for space in Space::BOTH {
            let old = self.bounds_of(id, space)?;
            let new = patch.bounds(space, &self.geometry.rotations)?;
            moves.push((space, old, new));
        }
        for (space, old, new) in moves {
            self.index.update(id.index(), &old, &new, space);
        }
        if let Some(node) = self.arena.get_mut(id) {
            node.patch = patch;
        }
        Ok(())
    }

    /// Record an appearance score on a node without moving it
    pub fn set_matching(&mut self, id: NodeId, matching: f64) {
        if let Some(node) = self.arena.get_mut(id) {
            node.patch.matching = Some(matching);
        }
    }

    /// Adopt new image extents and rebuild both grids from the live leaves
    ///
    /// # Errors
    ///
    /// Returns an error if an extent is empty or a leaf patch is malformed
    pub fn reload(
        &mut self,
        source_extent: (usize, usize),
        target_extent: (usize, usize),
    ) -> Result<()> {
        let geometry = ImageGeometry::new(
            source_extent,
            target_extent,
            self.geometry.px_per_mm,
            self.geometry.rotations.clone(),
        )?;
        for space in Space::BOTH {
            self.index.reset(space, geometry.bounds_mm(space))?;
        }
        self.geometry = geometry;
        for id in self.leaves() {
            self.register(id)?;
        }
        Ok(())
    }

    /// Empty grids and, for [`ClearScope::Both`], drop every node
    pub fn clear(&mut self, scope: ClearScope) {
        match scope {
            ClearScope::Source => self.index.clear(Space::Source),
            ClearScope::Target => self.index.clear(Space::Target),
            ClearScope::Both => {
                self.index.clear(Space::Source);
                self.index.clear(Space::Target);
                self.arena.reset();
            }
        }
    }

    /// Indices sharing a grid cell with a node
    ///
    /// # Errors
    ///
    /// Returns an error if the node is unknown or malformed
    pub fn neighbours(
        &self,
        id: NodeId,
        space: Space,
        leaves_only: bool,
    ) -> Result<BTreeSet<usize>> {
        self.index.neighbours(id.index(), space, leaves_only, self)
    }

    /// Nodes whose footprint overlaps `patch` in `space`
    ///
    /// # Errors
    ///
    /// Returns an error if a patch involved is malformed
    pub fn overlaps(
        &self,
        patch: &Patch,
        space: Space,
        leaves_only: bool,
        ignore: &[NodeId],
    ) -> Result<Vec<NodeId>> {
        let ignore: Vec<usize> = ignore.iter().map(|id| id.index()).collect();
        Ok(self
            .index
            .overlaps(patch, space, leaves_only, &ignore, self)?
            .into_iter()
            .map(NodeId)
            .collect())
    }

    /// Check a candidate against the image bounds and every other live leaf
    ///
    /// Nodes in `ignore` (typically the patch being replaced) are not treated as
    /// obstacles.
    ///
    /// # Errors
    ///
    /// Returns an error if the candidate or a stored patch is malformed
    pub fn check_placement(
        &self,
        candidate: &Patch,
        ignore: &[NodeId],
        min_dimension: f64,
    ) -> Result<Placement> {
        candidate.validate()?;
        if candidate.dimension.width < min_dimension || candidate.dimension.height < min_dimension
        {
            return Ok(Placement::TooSmall);
        }
        for space in [Space::Target, Space::Source] {
            if !self.geometry.contains(candidate, space)? {
                return Ok(Placement::OutOfBounds(space));
            }
        }
        for space in [Space::Target, Space::Source] {
            if !self.overlaps(candidate, space, true, ignore)?.is_empty() {
                return Ok(Placement::Overlapping(space));
            }
        }
        Ok(Placement::Legal)
    }

    fn bounds_of(&self, id: NodeId, space: Space) -> Result<Rect> {
        let patch = self
            .patch(id)
            .ok_or_else(|| invalid_parameter("node", &id.index(), &"no such node"))?;
        patch.bounds(space, &self.geometry.rotations)
    }
}

impl PatchLookup for PatchTree {
    fn patch_at(&self, index: usize) -> Option<&Patch> {
        self.arena.get(NodeId(index)).map(PatchNode::patch)
    }

    fn is_leaf_index(&self, index: usize) -> bool {
        self.is_leaf(NodeId(index))
    }

    fn rotations(&self) -> &RotationSet {
        &self.geometry.rotations
    }
}
