//! Fixed-topology network solver.
//!
//! [`FastNetwork`] is the activation-ready form of a substrate: a flat neuron
//! array laid out as bias, input, output, hidden blocks, with links stored in
//! Compressed Sparse Row form. The same type doubles as the CPPN evaluator in
//! tests and benches, built from a serializable [`NetworkSpec`].
//!
//! Activation is recursive: each output neuron pulls its inputs through the
//! reverse adjacency, activating predecessors on demand. A predecessor that is
//! still being activated higher up the chain contributes its previous signal,
//! which is how recurrent links are resolved.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::activation::Activation;
use crate::solver::{NetworkSolver, SolverError};
use crate::topology::LinkTopology;

/// Signal emitted by every bias neuron.
pub const BIAS_SIGNAL: f64 = 1.0;

/// Largest signal change still considered settled when relaxing cyclic networks.
pub const RELAX_TOLERANCE: f64 = 1e-9;

/// Default bound on activation passes for cyclic networks.
pub const DEFAULT_MAX_RELAX_STEPS: usize = 64;

/// A directed, weighted link between two neurons, by global index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FastLink {
    /// Source neuron index.
    pub source: usize,
    /// Target neuron index.
    pub target: usize,
    /// Link weight, already normalized and scaled.
    pub weight: f64,
}

impl FastLink {
    /// Create a new link.
    #[must_use]
    pub const fn new(source: usize, target: usize, weight: f64) -> Self {
        Self {
            source,
            target,
            weight,
        }
    }
}

/// Number of neurons per role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeuronCounts {
    /// Bias neurons, placed first.
    pub bias: usize,
    /// Input (sensor) neurons.
    pub input: usize,
    /// Output neurons.
    pub output: usize,
    /// Hidden neurons, placed last.
    pub hidden: usize,
}

impl NeuronCounts {
    /// Create a new count set.
    #[must_use]
    pub const fn new(bias: usize, input: usize, output: usize, hidden: usize) -> Self {
        Self {
            bias,
            input,
            output,
            hidden,
        }
    }

    /// Total number of neurons.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.bias + self.input + self.output + self.hidden
    }

    /// Global index of the first input neuron.
    #[must_use]
    pub const fn input_offset(&self) -> usize {
        self.bias
    }

    /// Global index of the first output neuron.
    #[must_use]
    pub const fn output_offset(&self) -> usize {
        self.bias + self.input
    }

    /// Global index of the first hidden neuron.
    #[must_use]
    pub const fn hidden_offset(&self) -> usize {
        self.bias + self.input + self.output
    }
}

/// Errors raised when a network description is inconsistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NetworkError {
    /// The number of activation functions differs from the neuron count.
    #[error("activation count mismatch: expected {expected}, got {found}")]
    ActivationCountMismatch {
        /// Total neuron count.
        expected: usize,
        /// Activation functions supplied.
        found: usize,
    },
    /// A link references a neuron outside the network.
    #[error("link {source_index} -> {target_index} out of range for {count} neurons")]
    LinkOutOfRange {
        /// Source index of the offending link.
        source_index: usize,
        /// Target index of the offending link.
        target_index: usize,
        /// Total neuron count.
        count: usize,
    },
    /// The number of bias values differs from the neuron count.
    #[error("bias count mismatch: expected {expected}, got {found}")]
    BiasCountMismatch {
        /// Total neuron count.
        expected: usize,
        /// Bias values supplied.
        found: usize,
    },
    /// The network has no neurons at all.
    #[error("network has no neurons")]
    EmptyNetwork,
}

/// Serializable description of a network, from which a [`FastNetwork`] is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Neuron counts per role.
    pub counts: NeuronCounts,
    /// One activation function per neuron, in global index order.
    pub activations: Vec<Activation>,
    /// Links in insertion order.
    pub links: Vec<FastLink>,
    /// Optional per-neuron bias added to the weighted input sum.
    #[serde(default)]
    pub biases: Option<Vec<f64>>,
}

/// An activation-ready network with fixed topology.
#[derive(Debug, Clone)]
pub struct FastNetwork {
    counts: NeuronCounts,
    activation_fns: Vec<Activation>,
    biases: Vec<f64>,
    links: Vec<FastLink>,
    topology: LinkTopology,
    cyclic: bool,
    max_relax_steps: usize,
    /// Current neuron signals.
    signals: Vec<f64>,
    /// Scratch flags reused across activation passes.
    activated: Vec<bool>,
    in_progress: Vec<bool>,
}

impl FastNetwork {
    /// Build a network from counts, activations, links and optional biases.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError`] if the neuron count is zero, if the activation or
    /// bias vectors do not match the neuron count, or if a link is out of range.
    pub fn new(
        counts: NeuronCounts,
        activations: Vec<Activation>,
        links: Vec<FastLink>,
        biases: Option<Vec<f64>>,
    ) -> Result<Self, NetworkError> {
        let total = counts.total();
        if total == 0 {
            return Err(NetworkError::EmptyNetwork);
        }
        if activations.len() != total {
            return Err(NetworkError::ActivationCountMismatch {
                expected: total,
                found: activations.len(),
            });
        }
        if let Some(link) = links.iter().find(|l| l.source >= total || l.target >= total) {
            return Err(NetworkError::LinkOutOfRange {
                source_index: link.source,
                target_index: link.target,
                count: total,
            });
        }
        let biases = match biases {
            Some(values) if values.len() != total => {
                return Err(NetworkError::BiasCountMismatch {
                    expected: total,
                    found: values.len(),
                });
            }
            Some(values) => values,
            None => vec![0.0; total],
        };

        let topology = LinkTopology::from_links(total, &links);
        let cyclic = topology.has_cycle();

        let mut network = Self {
            counts,
            activation_fns: activations,
            biases,
            links,
            topology,
            cyclic,
            max_relax_steps: DEFAULT_MAX_RELAX_STEPS,
            signals: vec![0.0; total],
            activated: vec![false; total],
            in_progress: vec![false; total],
        };
        network.reset_signals();
        Ok(network)
    }

    /// Build a network from its serializable description.
    ///
    /// # Errors
    ///
    /// See [`FastNetwork::new`].
    pub fn from_spec(spec: NetworkSpec) -> Result<Self, NetworkError> {
        Self::new(spec.counts, spec.activations, spec.links, spec.biases)
    }

    /// Describe this network so it can be stored and rebuilt later.
    #[must_use]
    pub fn to_spec(&self) -> NetworkSpec {
        NetworkSpec {
            counts: self.counts,
            activations: self.activation_fns.clone(),
            links: self.links.clone(),
            biases: Some(self.biases.clone()),
        }
    }

    /// Set the bound on activation passes used when relaxing a cyclic network.
    #[must_use]
    pub fn with_max_relax_steps(mut self, steps: usize) -> Self {
        self.max_relax_steps = steps.max(1);
        self
    }

    /// Neuron counts per role.
    #[must_use]
    pub const fn counts(&self) -> NeuronCounts {
        self.counts
    }

    /// Links in insertion order.
    #[must_use]
    pub fn links(&self) -> &[FastLink] {
        &self.links
    }

    /// Per-neuron activation functions.
    #[must_use]
    pub fn activations(&self) -> &[Activation] {
        &self.activation_fns
    }

    /// Per-neuron bias values.
    #[must_use]
    pub fn biases(&self) -> &[f64] {
        &self.biases
    }

    /// Whether the link graph contains a cycle.
    #[must_use]
    pub const fn is_recurrent(&self) -> bool {
        self.cyclic
    }

    /// Longest path length from any source-free neuron, or `None` for cyclic networks.
    #[must_use]
    pub fn max_activation_depth(&self) -> Option<u32> {
        self.topology
            .compute_depths()
            .map(|depths| depths.into_iter().max().unwrap_or(0))
    }

    fn reset_signals(&mut self) {
        self.signals.fill(0.0);
        self.signals[..self.counts.bias].fill(BIAS_SIGNAL);
    }

    /// One recursive activation pass driven from every output neuron.
    fn activation_pass(&mut self) -> Result<(), SolverError> {
        let sensors = self.counts.output_offset();
        self.activated.fill(false);
        self.activated[..sensors].fill(true);
        self.in_progress.fill(false);

        for output in sensors..self.counts.hidden_offset() {
            self.activate(output)?;
        }
        Ok(())
    }

    /// Activate `root`, pulling in its predecessors depth first.
    fn activate(&mut self, root: usize) -> Result<(), SolverError> {
        if self.activated[root] {
            return Ok(());
        }

        // (neuron, next incoming edge, accumulated sum)
        let mut stack: Vec<(usize, usize, f64)> = vec![(root, 0, self.biases[root])];
        self.in_progress[root] = true;

        while let Some(frame) = stack.last_mut() {
            let (neuron, offset, sum) = *frame;
            if offset < self.topology.in_degree(neuron) {
                let (source, weight) = self.topology.incoming_at(neuron, offset);
                if self.activated[source] || self.in_progress[source] {
                    frame.1 += 1;
                    frame.2 = sum + self.signals[source] * weight;
                } else {
                    self.in_progress[source] = true;
                    stack.push((source, 0, self.biases[source]));
                }
                continue;
            }

            let signal = self.activation_fns[neuron].apply(sum);
            if signal.is_nan() {
                return Err(SolverError::ActivationFailed { neuron });
            }
            self.signals[neuron] = signal;
            self.activated[neuron] = true;
            self.in_progress[neuron] = false;
            stack.pop();
        }
        Ok(())
    }

    fn max_signal_change(&self, previous: &[f64]) -> f64 {
        let start = self.counts.output_offset();
        self.signals[start..]
            .iter()
            .zip(&previous[start..])
            .map(|(now, before)| (now - before).abs())
            .fold(0.0, f64::max)
    }
}

impl NetworkSolver for FastNetwork {
    fn flush(&mut self) -> Result<bool, SolverError> {
        self.reset_signals();
        Ok(true)
    }

    fn load_sensors(&mut self, inputs: &[f64]) -> Result<(), SolverError> {
        if inputs.len() != self.counts.input {
            return Err(SolverError::SensorCountMismatch {
                expected: self.counts.input,
                found: inputs.len(),
            });
        }
        let start = self.counts.input_offset();
        self.signals[start..start + inputs.len()].copy_from_slice(inputs);
        Ok(())
    }

    fn relax(&mut self) -> Result<bool, SolverError> {
        if !self.cyclic {
            self.activation_pass()?;
            return Ok(true);
        }

        let mut previous = self.signals.clone();
        for _ in 0..self.max_relax_steps {
            self.activation_pass()?;
            if self.max_signal_change(&previous) <= RELAX_TOLERANCE {
                return Ok(true);
            }
            previous.copy_from_slice(&self.signals);
        }
        Ok(false)
    }

    fn read_outputs(&self) -> Vec<f64> {
        let start = self.counts.output_offset();
        self.signals[start..start + self.counts.output].to_vec()
    }

    fn node_count(&self) -> usize {
        self.counts.total()
    }

    fn link_count(&self) -> usize {
        self.links.len()
    }

    fn output_count(&self) -> usize {
        self.counts.output
    }
}
