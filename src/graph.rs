//! Graph side channel for inspecting built substrates.
//!
//! Substrate builders report every neuron and link to an optional [`GraphSink`].
//! Attaching a sink never changes the network that is built. [`SubstrateGraph`]
//! is an in-memory sink backed by arenas, serializable for debugging dumps.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};
use thiserror::Error;

use crate::activation::Activation;
use crate::layout::NeuronType;
use crate::quadtree::Point;

new_key_type! {
    /// Arena key of a graph node.
    pub struct GraphNodeId;

    /// Arena key of a graph edge.
    pub struct GraphEdgeId;
}

/// Errors raised by graph sinks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphSinkError {
    /// A node with this id was already added.
    #[error("graph node {id} already exists")]
    DuplicateNode {
        /// Neuron index.
        id: usize,
    },
    /// An edge references a node that was never added.
    #[error("graph node {id} does not exist")]
    UnknownNode {
        /// Neuron index.
        id: usize,
    },
}

/// Receiver of substrate neurons and links, keyed by global neuron index.
pub trait GraphSink {
    /// Record a neuron.
    ///
    /// # Errors
    ///
    /// Implementation specific; [`SubstrateGraph`] rejects duplicate ids.
    fn add_node(
        &mut self,
        id: usize,
        role: NeuronType,
        activation: Activation,
        position: Point,
    ) -> Result<(), GraphSinkError>;

    /// Record a weighted link.
    ///
    /// # Errors
    ///
    /// Implementation specific; [`SubstrateGraph`] rejects unknown endpoints.
    fn add_weighted_edge(
        &mut self,
        source: usize,
        target: usize,
        weight: f64,
    ) -> Result<(), GraphSinkError>;

    /// Number of recorded neurons.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn node_count(&self) -> Result<usize, GraphSinkError>;

    /// Number of recorded links.
    ///
    /// # Errors
    ///
    /// Implementation specific.
    fn edge_count(&self) -> Result<usize, GraphSinkError>;
}

/// A recorded neuron.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Global neuron index.
    pub id: usize,
    /// Neuron role.
    pub role: NeuronType,
    /// Activation function.
    pub activation: Activation,
    /// Substrate coordinate.
    pub position: Point,
}

/// A recorded link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node.
    pub source: GraphNodeId,
    /// Target node.
    pub target: GraphNodeId,
    /// Link weight.
    pub weight: f64,
}

/// In-memory graph of a substrate.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubstrateGraph {
    /// Arena storage for nodes.
    pub nodes: SlotMap<GraphNodeId, GraphNode>,
    /// Arena storage for edges, in insertion order.
    pub edges: SlotMap<GraphEdgeId, GraphEdge>,
    index: HashMap<usize, GraphNodeId>,
}

impl SubstrateGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node by neuron index.
    #[must_use]
    pub fn node(&self, id: usize) -> Option<&GraphNode> {
        self.index.get(&id).and_then(|&key| self.nodes.get(key))
    }

    /// Nodes of the given role.
    pub fn nodes_with_role(&self, role: NeuronType) -> impl Iterator<Item = &GraphNode> + '_ {
        self.nodes.values().filter(move |n| n.role == role)
    }

    /// Weight of the link `source -> target`, if recorded.
    #[must_use]
    pub fn edge_weight(&self, source: usize, target: usize) -> Option<f64> {
        let source = *self.index.get(&source)?;
        let target = *self.index.get(&target)?;
        self.edges
            .values()
            .find(|e| e.source == source && e.target == target)
            .map(|e| e.weight)
    }

    /// Edges as `(source index, target index, weight)`.
    pub fn edge_list(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.edges
            .values()
            .map(|e| (self.nodes[e.source].id, self.nodes[e.target].id, e.weight))
    }

    fn key(&self, id: usize) -> Result<GraphNodeId, GraphSinkError> {
        self.index
            .get(&id)
            .copied()
            .ok_or(GraphSinkError::UnknownNode { id })
    }
}

impl GraphSink for SubstrateGraph {
    fn add_node(
        &mut self,
        id: usize,
        role: NeuronType,
        activation: Activation,
        position: Point,
    ) -> Result<(), GraphSinkError> {
        if self.index.contains_key(&id) {
            return Err(GraphSinkError::DuplicateNode { id });
        }
        let key = self.nodes.insert(GraphNode {
            id,
            role,
            activation,
            position,
        });
        self.index.insert(id, key);
        Ok(())
    }

    fn add_weighted_edge(
        &mut self,
        source: usize,
        target: usize,
        weight: f64,
    ) -> Result<(), GraphSinkError> {
        let source = self.key(source)?;
        let target = self.key(target)?;
        self.edges.insert(GraphEdge {
            source,
            target,
            weight,
        });
        Ok(())
    }

    fn node_count(&self) -> Result<usize, GraphSinkError> {
        Ok(self.nodes.len())
    }

    fn edge_count(&self) -> Result<usize, GraphSinkError> {
        Ok(self.edges.len())
    }
}

/// Forwards to an optional sink; every call is a no-op without one.
pub(crate) struct GraphRecorder<'a> {
    sink: Option<&'a mut dyn GraphSink>,
}

impl<'a> GraphRecorder<'a> {
    pub(crate) fn new(sink: Option<&'a mut dyn GraphSink>) -> Self {
        Self { sink }
    }

    pub(crate) fn node(
        &mut self,
        id: usize,
        role: NeuronType,
        activation: Activation,
        position: Point,
    ) -> Result<(), GraphSinkError> {
        match self.sink.as_deref_mut() {
            Some(sink) => sink.add_node(id, role, activation, position),
            None => Ok(()),
        }
    }

    pub(crate) fn edge(&mut self, source: usize, target: usize, weight: f64) -> Result<(), GraphSinkError> {
        match self.sink.as_deref_mut() {
            Some(sink) => sink.add_weighted_edge(source, target, weight),
            None => Ok(()),
        }
    }
}
