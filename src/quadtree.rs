//! Quadtree data model for adaptive hypercube sampling.
//!
//! A [`QuadTree`] is an arena of [`QuadNode`]s keyed by [`QuadNodeId`]. Each node
//! covers a square of the 2D cross-section of the hypercube and stores the CPPN
//! outputs sampled at its center relative to a fixed anchor point. A node has
//! either no children or exactly four.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Unique identifier for a quadtree node.
    pub struct QuadNodeId;
}

/// A substrate coordinate.
///
/// Equality and hashing are exact on the bit pattern, with `-0.0` folded into
/// `0.0` so that both zeros address the same neuron.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate, 0 for planar substrates.
    pub z: f64,
}

impl Point {
    /// A point on the z = 0 plane.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// A point with an explicit z coordinate.
    #[must_use]
    pub const fn with_z(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Whether every coordinate is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    fn key(&self) -> [u64; 3] {
        [canonical_bits(self.x), canonical_bits(self.y), canonical_bits(self.z)]
    }
}

#[inline]
fn canonical_bits(v: f64) -> u64 {
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

impl PartialEq for Point {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Point {}

impl Hash for Point {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.z == 0.0 {
            write!(f, "({}, {})", self.x, self.y)
        } else {
            write!(f, "({}, {}, {})", self.x, self.y, self.z)
        }
    }
}

/// A node of the subdivision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuadNode {
    /// Center of the covered square.
    pub center: Point,
    /// Half-width of the covered square.
    pub width: f64,
    /// Half-height of the covered square.
    pub height: f64,
    /// Subdivision level, 1 at the root.
    pub level: u32,
    /// CPPN outputs at `center`: weight first, then the optional LEO value.
    pub cppn_out: Vec<f64>,
    /// The four quadrants, if this node was subdivided.
    pub children: Option<[QuadNodeId; 4]>,
}

impl QuadNode {
    /// Create an unsampled leaf.
    #[must_use]
    pub const fn new(center: Point, width: f64, height: f64, level: u32) -> Self {
        Self {
            center,
            width,
            height,
            level,
            cppn_out: Vec::new(),
            children: None,
        }
    }

    /// The sampled weight output, 0 if unsampled.
    #[inline]
    #[must_use]
    pub fn weight(&self) -> f64 {
        self.cppn_out.first().copied().unwrap_or(0.0)
    }

    /// The sampled link expression output, 0 if absent.
    #[inline]
    #[must_use]
    pub fn leo(&self) -> f64 {
        self.cppn_out.get(1).copied().unwrap_or(0.0)
    }

    /// Whether the node has no children.
    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// Arena-backed quadtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuadTree {
    /// Arena storage for nodes.
    pub nodes: SlotMap<QuadNodeId, QuadNode>,
    /// The root node.
    pub root: QuadNodeId,
}

impl QuadTree {
    /// Create a tree holding only `root`.
    #[must_use]
    pub fn new(root: QuadNode) -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(root);
        Self { nodes, root }
    }

    /// Access a node.
    #[must_use]
    pub fn get(&self, id: QuadNodeId) -> Option<&QuadNode> {
        self.nodes.get(id)
    }

    /// The root node.
    #[must_use]
    pub fn root_node(&self) -> &QuadNode {
        &self.nodes[self.root]
    }

    /// Children of a node, in quadrant order.
    #[must_use]
    pub fn children(&self, id: QuadNodeId) -> Option<[QuadNodeId; 4]> {
        self.nodes.get(id).and_then(|n| n.children)
    }

    /// Attach four children to `parent` and return their ids.
    pub fn subdivide(&mut self, parent: QuadNodeId, children: [QuadNode; 4]) -> [QuadNodeId; 4] {
        let ids = children.map(|child| self.nodes.insert(child));
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children = Some(ids);
        }
        ids
    }

    /// Population variance of the weights of a node's immediate children; 0 for leaves.
    #[must_use]
    pub fn children_variance(&self, id: QuadNodeId) -> f64 {
        match self.children(id) {
            Some(children) => variance(&children.map(|c| self.nodes[c].weight())),
            None => 0.0,
        }
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty. Never true for a constructed tree.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Deepest level present in the tree.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.nodes.values().map(|n| n.level).max().unwrap_or(0)
    }
}

/// A connection candidate extracted from a quadtree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadPoint {
    /// Source coordinate.
    pub source: Point,
    /// Target coordinate.
    pub target: Point,
    /// Raw CPPN weight output.
    pub weight: f64,
    /// Raw CPPN link expression output, 0 without LEO.
    pub leo: f64,
}

impl QuadPoint {
    /// Build a candidate from the node that produced it.
    #[must_use]
    pub fn from_node(source: Point, target: Point, node: &QuadNode) -> Self {
        Self {
            source,
            target,
            weight: node.weight(),
            leo: node.leo(),
        }
    }

    /// CPPN outputs in channel order.
    #[must_use]
    pub const fn cppn_out(&self) -> [f64; 2] {
        [self.weight, self.leo]
    }
}

/// Population variance of `values`; 0 for an empty slice.
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n
}
