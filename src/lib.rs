//! # Symbios HyperNEAT
//!
//! Evolvable-Substrate HyperNEAT: turns a CPPN (Compositional Pattern Producing
//! Network) into an activation-ready substrate network, either over a fixed
//! grid of neurons or by discovering hidden neurons through adaptive quadtree
//! sampling of the CPPN's weight pattern.
//!
//! ## Features
//!
//! - **Grid substrates**: every bias, input, hidden and output link of a fixed
//!   layout is queried once ([`Substrate`])
//! - **Evolvable substrates**: hidden neurons are placed where the CPPN pattern
//!   has high information, found by quadtree division and band pruning
//!   ([`EvolvableSubstrate`])
//! - **Two link schemes**: magnitude threshold with normalization, or LEO gating
//!   through a second CPPN output
//! - **Fast network solver**: CSR adjacency with recursive activation and
//!   recurrent relaxation ([`FastNetwork`])
//! - **Arena storage**: `SlotMap` quadtrees and graph dumps, serializable via Serde
//!
//! ## Quick Start
//!
//! ```rust
//! use symbios_hyperneat::{
//!     Activation, EsHyperNeatOptions, EvolvableLayout, EvolvableSubstrate, FastLink,
//!     FastNetwork, NetworkSolver, NeuronCounts,
//! };
//!
//! // CPPN over (x1, y1, x2, y2) with a weight ridge along x = 0.5
//! let mut activations = vec![Activation::Null; 4];
//! activations.extend([Activation::Identity, Activation::Gaussian, Activation::Gaussian]);
//! let links = vec![
//!     FastLink::new(2, 5, 4.0),
//!     FastLink::new(0, 6, 4.0),
//!     FastLink::new(5, 4, 0.5),
//!     FastLink::new(6, 4, 0.5),
//! ];
//! let biases = vec![0.0, 0.0, 0.0, 0.0, 0.0, -2.0, -2.0];
//! let mut cppn = FastNetwork::new(NeuronCounts::new(0, 4, 1, 2), activations, links, Some(biases))?;
//!
//! let mut substrate = EvolvableSubstrate::new(EvolvableLayout::new(4, 2)?);
//! let mut network =
//!     substrate.create_network(&mut cppn, false, None, &EsHyperNeatOptions::default())?;
//! assert_eq!(network.counts().hidden, 2);
//!
//! network.load_sensors(&[0.9, 5.2, 1.2, 0.6])?;
//! network.relax()?;
//! println!("Outputs: {:?}", network.read_outputs());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! ### Quadtree sampling
//!
//! For an anchor neuron the CPPN is sampled over the square `[-1, 1]²`. Every
//! node is split into four children down to `initial_depth`; deeper nodes are
//! split only while their children's weights vary by more than
//! `division_threshold`, up to `maximal_depth`. Pruning then walks the tree and
//! keeps points that sit on a band: a spot whose weight differs from its
//! neighbours on both sides of one axis by more than `banding_threshold`.
//!
//! ### Neuron order
//!
//! Built networks lay neurons out as bias, input, output, hidden. Hidden neurons
//! of an evolvable layout keep their discovery order, so their indices are
//! stable across rebuilds.

pub mod activation;
pub mod cppn;
pub mod division;
pub mod evolvable;
pub mod graph;
pub mod layout;
pub mod network;
pub mod options;
pub mod pruning;
pub mod quadtree;
pub mod solver;
pub mod substrate;
pub mod topology;
pub mod weights;

// Re-exports for convenience
pub use activation::Activation;
pub use cppn::{query_cppn, CppnQuery, QueryError};
pub use division::build_quadtree;
pub use evolvable::EvolvableSubstrate;
pub use graph::{GraphSink, GraphSinkError, SubstrateGraph};
pub use layout::{EvolvableLayout, GridLayout, LayoutError, NeuronType, SubstrateLayout};
pub use network::{FastLink, FastNetwork, NetworkError, NetworkSpec, NeuronCounts};
pub use options::{ConfigError, CoordinateSpace, EsHyperNeatOptions, HyperNeatOptions};
pub use pruning::extract_connections;
pub use quadtree::{variance, Point, QuadNode, QuadNodeId, QuadPoint, QuadTree};
pub use solver::{NetworkSolver, SolverError};
pub use substrate::{AssemblyError, LinkSet, Substrate};
pub use topology::LinkTopology;
pub use weights::LinkScheme;
