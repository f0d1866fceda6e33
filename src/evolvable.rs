//! Evolvable-substrate assembly (ES-HyperNEAT).
//!
//! Hidden neurons are not laid out up front. Each input neuron anchors a
//! quadtree whose banded points become hidden neurons; every ES iteration then
//! expands the hidden neurons reached by the previous pass the same way. Finally
//! each output neuron anchors an incoming quadtree and links only to hidden
//! neurons that already exist.

use std::collections::HashSet;

use tracing::debug;

use crate::activation::Activation;
use crate::cppn::CppnQuery;
use crate::division::build_quadtree;
use crate::graph::{GraphRecorder, GraphSink};
use crate::layout::{EvolvableLayout, NeuronType, SubstrateLayout};
use crate::network::{FastNetwork, NeuronCounts};
use crate::options::EsHyperNeatOptions;
use crate::pruning::extract_connections;
use crate::quadtree::Point;
use crate::solver::NetworkSolver;
use crate::substrate::{assign_activations, degenerate, AssemblyError, LinkSet};
use crate::weights::LinkScheme;

/// A substrate whose hidden neurons are discovered from the CPPN.
#[derive(Debug, Clone)]
pub struct EvolvableSubstrate {
    layout: EvolvableLayout,
}

/// Outgoing expansion state shared by the input pass and the ES iterations.
struct Discovery<'l, 'g> {
    layout: &'l mut EvolvableLayout,
    links: &'l mut LinkSet,
    recorder: &'l mut GraphRecorder<'g>,
    scheme: LinkScheme,
    first_hidden: usize,
    hidden_activation: Activation,
}

impl Discovery<'_, '_> {
    /// Link `source` at `anchor` to every banded point of its outgoing quadtree,
    /// creating hidden neurons as needed. Reached hidden indices are appended to `reached`.
    fn expand<S: NetworkSolver + ?Sized>(
        &mut self,
        query: &mut CppnQuery<'_, S>,
        source: usize,
        anchor: Point,
        options: &EsHyperNeatOptions,
        reached: &mut Vec<usize>,
    ) -> Result<(), AssemblyError> {
        let tree = build_quadtree(query, anchor, true, options)?;
        for point in extract_connections(query, anchor, &tree, true, options)? {
            let (hidden, created) = self.layout.hidden_index_or_insert(point.target)?;
            let target = self.first_hidden + hidden;
            if created {
                self.recorder
                    .node(target, NeuronType::Hidden, self.hidden_activation, point.target)?;
            }
            reached.push(hidden);

            if let Some(weight) = self.scheme.weight(&point.cppn_out()) {
                if self.links.insert(source, target, weight) {
                    self.recorder.edge(source, target, weight)?;
                }
            }
        }
        Ok(())
    }
}

impl EvolvableSubstrate {
    /// Create a substrate over `layout`.
    #[must_use]
    pub const fn new(layout: EvolvableLayout) -> Self {
        Self { layout }
    }

    /// The layout, including hidden neurons discovered so far.
    #[must_use]
    pub const fn layout(&self) -> &EvolvableLayout {
        &self.layout
    }

    /// Consume the substrate and return its layout.
    #[must_use]
    pub fn into_layout(self) -> EvolvableLayout {
        self.layout
    }

    /// Discover hidden neurons and links from `cppn` and build the network.
    ///
    /// Discovered hidden neurons are appended to the layout once the build
    /// succeeds; a failed build leaves the layout untouched. Building again from
    /// the same CPPN and options reuses them and yields the same network.
    /// `use_leo` takes precedence over `options.hyperneat.leo_enabled`.
    ///
    /// # Errors
    ///
    /// Returns [`AssemblyError::DegenerateNetwork`] if no links were found without
    /// LEO, and propagates CPPN, layout, graph and option errors.
    pub fn create_network<S: NetworkSolver + ?Sized>(
        &mut self,
        cppn: &mut S,
        use_leo: bool,
        graph: Option<&mut dyn GraphSink>,
        options: &EsHyperNeatOptions,
    ) -> Result<FastNetwork, AssemblyError> {
        options.validate()?;
        let mut options = options.clone();
        options.hyperneat.leo_enabled = use_leo;
        let hyper = &options.hyperneat;

        // hidden neurons are discovered into a copy, kept only if the build succeeds
        let mut layout = self.layout.clone();
        let input_count = layout.input_count();
        let output_count = layout.output_count();
        let first_output = input_count;
        let first_hidden = input_count + output_count;

        let mut query = CppnQuery::new(cppn, hyper);
        let mut recorder = GraphRecorder::new(graph);
        let mut links = LinkSet::new();

        for i in 0..input_count {
            let position = layout.node_position(i, NeuronType::Input)?;
            recorder.node(i, NeuronType::Input, Activation::Null, position)?;
        }
        for o in 0..output_count {
            let position = layout.node_position(o, NeuronType::Output)?;
            recorder.node(first_output + o, NeuronType::Output, hyper.output_activation, position)?;
        }
        for (h, &position) in layout.hidden_positions().iter().enumerate() {
            recorder.node(first_hidden + h, NeuronType::Hidden, hyper.hidden_activation, position)?;
        }

        let input_positions = (0..input_count)
            .map(|i| layout.node_position(i, NeuronType::Input))
            .collect::<Result<Vec<_>, _>>()?;
        let output_positions = (0..output_count)
            .map(|o| layout.node_position(o, NeuronType::Output))
            .collect::<Result<Vec<_>, _>>()?;

        let mut discovery = Discovery {
            layout: &mut layout,
            links: &mut links,
            recorder: &mut recorder,
            scheme: LinkScheme::from_options(hyper, use_leo),
            first_hidden,
            hidden_activation: hyper.hidden_activation,
        };

        let mut reached = Vec::new();
        for (i, &anchor) in input_positions.iter().enumerate() {
            discovery.expand(&mut query, i, anchor, &options, &mut reached)?;
        }

        let mut expanded = HashSet::new();
        for step in 0..options.es_iterations {
            let window: Vec<usize> = reached.drain(..).filter(|&h| expanded.insert(h)).collect();
            debug!(step, window = window.len(), "es iteration");
            if window.is_empty() {
                break;
            }
            for hidden in window {
                let anchor = discovery.layout.node_position(hidden, NeuronType::Hidden)?;
                discovery.expand(&mut query, first_hidden + hidden, anchor, &options, &mut reached)?;
            }
        }

        for (o, &anchor) in output_positions.iter().enumerate() {
            let target = first_output + o;
            let tree = build_quadtree(&mut query, anchor, false, &options)?;
            for point in extract_connections(&mut query, anchor, &tree, false, &options)? {
                // outputs only attach to hidden neurons reached from the inputs
                let Some(hidden) = discovery.layout.index_of_hidden(point.source) else {
                    continue;
                };
                let source = first_hidden + hidden;
                if let Some(weight) = discovery.scheme.weight(&point.cppn_out()) {
                    if discovery.links.insert(source, target, weight) {
                        discovery.recorder.edge(source, target, weight)?;
                    }
                }
            }
        }

        let counts = NeuronCounts::new(0, input_count, output_count, layout.hidden_count());
        let activations = assign_activations(counts, &options.hyperneat);
        debug!(
            hidden = counts.hidden,
            links = links.len(),
            queries = query.query_count(),
            leo = use_leo,
            "evolvable substrate built"
        );
        if counts.total() == 0 || (links.is_empty() && !use_leo) {
            return Err(degenerate(links.len(), counts.total(), activations.len(), use_leo));
        }

        let network = FastNetwork::new(counts, activations, links.into_links(), None)?;
        self.layout = layout;
        Ok(network)
    }
}
