//! Link topology analysis using CSR format.
//!
//! [`LinkTopology`] snapshots a `FastLink` list into Compressed Sparse Row
//! buffers for both directions. The reverse (incoming) side drives recursive
//! activation of a [`FastNetwork`](crate::network::FastNetwork); the forward side
//! is used for cycle detection and activation depths.
//!
//! ## Determinism
//!
//! Within a node, edges keep the order in which they appear in the link list.
//! Summation order during activation is therefore fixed by link insertion order,
//! which substrate assembly keeps deterministic.

use std::collections::VecDeque;

use crate::network::FastLink;

/// CSR-format topology of a fixed-size network.
#[derive(Debug, Clone)]
pub struct LinkTopology {
    /// Number of neurons.
    node_count: usize,
    /// CSR offsets for forward edges (outgoing). Length = node_count + 1.
    fwd_offsets: Vec<usize>,
    /// CSR targets for forward edges.
    fwd_targets: Vec<usize>,
    /// CSR offsets for reverse edges (incoming). Length = node_count + 1.
    rev_offsets: Vec<usize>,
    /// CSR sources for reverse edges.
    rev_sources: Vec<usize>,
    /// Link weights, parallel to `rev_sources`.
    rev_weights: Vec<f64>,
}

impl LinkTopology {
    /// Build the topology for `node_count` neurons from a link list.
    ///
    /// Links referencing neurons outside `0..node_count` are ignored; callers
    /// validate ranges beforehand.
    #[must_use]
    pub fn from_links(node_count: usize, links: &[FastLink]) -> Self {
        let in_range = |l: &&FastLink| l.source < node_count && l.target < node_count;

        let mut fwd_counts = vec![0usize; node_count];
        let mut rev_counts = vec![0usize; node_count];
        for link in links.iter().filter(in_range) {
            fwd_counts[link.source] += 1;
            rev_counts[link.target] += 1;
        }

        let fwd_offsets = prefix_offsets(&fwd_counts);
        let rev_offsets = prefix_offsets(&rev_counts);
        let total_edges = fwd_offsets[node_count];

        let mut fwd_targets = vec![0usize; total_edges];
        let mut rev_sources = vec![0usize; total_edges];
        let mut rev_weights = vec![0.0f64; total_edges];
        let mut fwd_write_pos = fwd_offsets[..node_count].to_vec();
        let mut rev_write_pos = rev_offsets[..node_count].to_vec();

        for link in links.iter().filter(in_range) {
            let pos = fwd_write_pos[link.source];
            fwd_targets[pos] = link.target;
            fwd_write_pos[link.source] += 1;

            let pos = rev_write_pos[link.target];
            rev_sources[pos] = link.source;
            rev_weights[pos] = link.weight;
            rev_write_pos[link.target] += 1;
        }

        Self {
            node_count,
            fwd_offsets,
            fwd_targets,
            rev_offsets,
            rev_sources,
            rev_weights,
        }
    }

    /// Number of neurons in the topology.
    #[inline]
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Iterate over successors of a neuron (forward edges).
    #[inline]
    pub fn successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let start = self.fwd_offsets[idx];
        let end = self.fwd_offsets[idx + 1];
        self.fwd_targets[start..end].iter().copied()
    }

    /// Iterate over `(source, weight)` pairs of the incoming edges of a neuron.
    #[inline]
    pub fn incoming(&self, idx: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let start = self.rev_offsets[idx];
        let end = self.rev_offsets[idx + 1];
        self.rev_sources[start..end]
            .iter()
            .copied()
            .zip(self.rev_weights[start..end].iter().copied())
    }

    /// Number of incoming edges of a neuron.
    #[inline]
    #[must_use]
    pub fn in_degree(&self, idx: usize) -> usize {
        self.rev_offsets[idx + 1] - self.rev_offsets[idx]
    }

    /// The `offset`-th incoming edge of a neuron as `(source, weight)`.
    #[inline]
    pub(crate) fn incoming_at(&self, idx: usize, offset: usize) -> (usize, f64) {
        let pos = self.rev_offsets[idx] + offset;
        (self.rev_sources[pos], self.rev_weights[pos])
    }

    /// Detect if the graph contains any cycle (self-loops included) using Kahn's algorithm.
    #[must_use]
    pub fn has_cycle(&self) -> bool {
        self.compute_depths().is_none()
    }

    /// Compute depths for all neurons using Kahn's algorithm (longest path).
    ///
    /// Returns depths indexed by neuron, or `None` if a cycle is detected.
    #[must_use]
    pub fn compute_depths(&self) -> Option<Vec<u32>> {
        let mut in_degree: Vec<usize> = (0..self.node_count).map(|i| self.in_degree(i)).collect();
        let mut depths = vec![0u32; self.node_count];

        let mut queue: VecDeque<usize> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &deg)| deg == 0)
            .map(|(idx, _)| idx)
            .collect();

        let mut processed = 0;
        while let Some(u) = queue.pop_front() {
            processed += 1;
            for v in self.successors(u) {
                let new_depth = depths[u].saturating_add(1);
                if new_depth > depths[v] {
                    depths[v] = new_depth;
                }

                in_degree[v] -= 1;
                if in_degree[v] == 0 {
                    queue.push_back(v);
                }
            }
        }

        if processed == self.node_count {
            Some(depths)
        } else {
            None
        }
    }
}

/// Exclusive prefix sums with a trailing total.
fn prefix_offsets(counts: &[usize]) -> Vec<usize> {
    let mut offsets = Vec::with_capacity(counts.len() + 1);
    let mut running = 0;
    offsets.push(running);
    for &count in counts {
        running += count;
        offsets.push(running);
    }
    offsets
}
