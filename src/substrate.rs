//! Fixed-grid substrate assembly (plain HyperNEAT).
//!
//! Every candidate link of the grid is queried once: bias to hidden and output,
//! input to hidden (or straight to output when there is no hidden row), hidden to
//! output. Bias links are folded into the per-neuron bias vector of the network.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::activation::Activation;
use crate::cppn::{CppnQuery, QueryError};
use crate::graph::{GraphRecorder, GraphSink, GraphSinkError};
use crate::layout::{GridLayout, LayoutError, NeuronType, SubstrateLayout};
use crate::network::{FastLink, FastNetwork, NetworkError, NeuronCounts};
use crate::options::{ConfigError, HyperNeatOptions};
use crate::solver::NetworkSolver;
use crate::weights::LinkScheme;

/// Errors raised while assembling a substrate network.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    /// Grid substrates support a single bias neuron.
    #[error("substrate supports at most one bias neuron, got {count}")]
    TooManyBiasNodes {
        /// Configured bias neurons.
        count: usize,
    },
    /// The build produced no neurons, or no links without LEO.
    #[error(
        "degenerate network: {nodes} neurons, {links} links, {activations} activations (leo: {leo})"
    )]
    DegenerateNetwork {
        /// Links produced.
        links: usize,
        /// Neurons in the substrate.
        nodes: usize,
        /// Activation functions assigned.
        activations: usize,
        /// Whether LEO gating was used.
        leo: bool,
    },
    /// The CPPN could not be queried.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// A neuron position could not be resolved.
    #[error(transparent)]
    Layout(#[from] LayoutError),
    /// The graph sink rejected a node or edge.
    #[error(transparent)]
    Graph(#[from] GraphSinkError),
    /// The network description was inconsistent.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// The options are invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Insertion-ordered link list that rejects self-links and duplicate pairs.
#[derive(Debug, Clone, Default)]
pub struct LinkSet {
    links: Vec<FastLink>,
    index: HashMap<(usize, usize), usize>,
}

impl LinkSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `source -> target`. Returns `false` if the link is a self-link or the
    /// pair is already present, in which case nothing changes.
    pub fn insert(&mut self, source: usize, target: usize, weight: f64) -> bool {
        if source == target || self.index.contains_key(&(source, target)) {
            return false;
        }
        self.index.insert((source, target), self.links.len());
        self.links.push(FastLink::new(source, target, weight));
        true
    }

    /// Number of links.
    #[must_use]
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Consume the set, keeping insertion order.
    #[must_use]
    pub fn into_links(self) -> Vec<FastLink> {
        self.links
    }
}

/// Per-neuron activations in bias, input, output, hidden order.
pub(crate) fn assign_activations(counts: NeuronCounts, options: &HyperNeatOptions) -> Vec<Activation> {
    let mut activations = vec![Activation::Null; counts.output_offset()];
    activations.extend(std::iter::repeat(options.output_activation).take(counts.output));
    activations.extend(std::iter::repeat(options.hidden_activation).take(counts.hidden));
    activations
}

pub(crate) fn degenerate(links: usize, nodes: usize, activations: usize, leo: bool) -> AssemblyError {
    warn!(links, nodes, activations, leo, "degenerate substrate network");
    AssemblyError::DegenerateNetwork {
        links,
        nodes,
        activations,
        leo,
    }
}

/// One role's block of neurons in the global index space.
#[derive(Debug, Clone, Copy)]
struct Row {
    role: NeuronType,
    count: usize,
    offset: usize,
}

impl Row {
    const fn new(role: NeuronType, count: usize, offset: usize) -> Self {
        Self { role, count, offset }
    }
}

/// Queries and links every neuron pair between two rows.
struct RowLinker<'l, 'g> {
    layout: &'l GridLayout,
    scheme: LinkScheme,
    links: &'l mut LinkSet,
    recorder: &'l mut GraphRecorder<'g>,
}

impl RowLinker<'_, '_> {
    fn connect<S: NetworkSolver + ?Sized>(
        &mut self,
        query: &mut CppnQuery<'_, S>,
        sources: Row,
        targets: Row,
    ) -> Result<(), AssemblyError> {
        for s in 0..sources.count {
            let source = self.layout.node_position(s, sources.role)?;
            for t in 0..targets.count {
                let target = self.layout.node_position(t, targets.role)?;
                let out = query.query(source, target)?;
                let Some(weight) = self.scheme.weight(&out) else {
                    continue;
                };
                let (from, to) = (sources.offset + s, targets.offset + t);
                if self.links.insert(from, to, weight) {
                    self.recorder.edge(from, to, weight)?;
                }
            }
        }
        Ok(())
    }
}

/// A HyperNEAT substrate with a fixed grid layout.
#[derive(Debug, Clone)]
pub struct Substrate {
    layout: GridLayout,
}

impl Substrate {
    /// Create a substrate over `layout`.
    #[must_use]
    pub const fn new(layout: GridLayout) -> Self {
        Self { layout }
    }

    /// The substrate layout.
    #[must_use]
    pub const fn layout(&self) -> &GridLayout {
        &self.layout
    }

    /// Query `cppn` for every grid link and build the resulting network.
    ///
    /// `use_leo` selects LEO gating over threshold normalization and takes
    /// precedence over `options.leo_enabled`. Every neuron and link is reported
    /// to `graph` when one is attached.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::TooManyBiasNodes`] for more than one bias neuron,
    /// [`AssemblyError::DegenerateNetwork`] when there are no neurons or, without
    /// LEO, no links, and propagates CPPN, layout, graph and option errors.
    pub fn create_network<S: NetworkSolver + ?Sized>(
        &self,
        cppn: &mut S,
        use_leo: bool,
        graph: Option<&mut dyn GraphSink>,
        options: &HyperNeatOptions,
    ) -> Result<FastNetwork, AssemblyError> {
        options.validate()?;
        let layout = &self.layout;
        if layout.bias_count() > 1 {
            return Err(AssemblyError::TooManyBiasNodes {
                count: layout.bias_count(),
            });
        }

        let counts = NeuronCounts::new(
            layout.bias_count(),
            layout.input_count(),
            layout.output_count(),
            layout.hidden_count(),
        );
        let activations = assign_activations(counts, options);
        if counts.total() == 0 {
            return Err(degenerate(0, 0, activations.len(), use_leo));
        }

        let options = HyperNeatOptions {
            leo_enabled: use_leo,
            ..options.clone()
        };
        let scheme = LinkScheme::from_options(&options, use_leo);
        let mut query = CppnQuery::new(cppn, &options);
        let mut recorder = GraphRecorder::new(graph);

        let roles = [
            Row::new(NeuronType::Bias, counts.bias, 0),
            Row::new(NeuronType::Input, counts.input, counts.input_offset()),
            Row::new(NeuronType::Output, counts.output, counts.output_offset()),
            Row::new(NeuronType::Hidden, counts.hidden, counts.hidden_offset()),
        ];
        for row in roles {
            for i in 0..row.count {
                let position = layout.node_position(i, row.role)?;
                recorder.node(row.offset + i, row.role, activations[row.offset + i], position)?;
            }
        }

        let mut biases = vec![0.0; counts.total()];
        if counts.bias == 1 {
            let bias_position = layout.node_position(0, NeuronType::Bias)?;
            let targets = (0..counts.hidden)
                .map(|h| (NeuronType::Hidden, h, counts.hidden_offset() + h))
                .chain((0..counts.output).map(|o| (NeuronType::Output, o, counts.output_offset() + o)));
            for (role, i, target) in targets {
                let out = query.query(bias_position, layout.node_position(i, role)?)?;
                if let Some(weight) = scheme.weight(&out) {
                    biases[target] += weight;
                    recorder.edge(0, target, weight)?;
                }
            }
        }

        let mut links = LinkSet::new();
        let mut rows = RowLinker {
            layout,
            scheme,
            links: &mut links,
            recorder: &mut recorder,
        };
        let [_, inputs, outputs, hidden] = roles;
        if counts.hidden > 0 {
            rows.connect(&mut query, inputs, hidden)?;
            rows.connect(&mut query, hidden, outputs)?;
        } else {
            rows.connect(&mut query, inputs, outputs)?;
        }

        debug!(
            nodes = counts.total(),
            links = links.len(),
            queries = query.query_count(),
            leo = use_leo,
            "grid substrate built"
        );
        if links.is_empty() && !use_leo {
            return Err(degenerate(0, counts.total(), activations.len(), use_leo));
        }

        Ok(FastNetwork::new(counts, activations, links.into_links(), Some(biases))?)
    }
}
