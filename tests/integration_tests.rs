//! Integration tests for symbios-hyperneat.

use std::collections::HashSet;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use symbios_hyperneat::{
    build_quadtree, Activation, AssemblyError, CppnQuery, EsHyperNeatOptions, EvolvableLayout,
    EvolvableSubstrate, FastLink, FastNetwork, GridLayout, GraphSink, HyperNeatOptions,
    NetworkSolver, NetworkSpec, NeuronCounts, NeuronType, Point, Substrate, SubstrateGraph,
    SubstrateLayout,
};

const SENSORS: [f64; 4] = [0.9, 5.2, 1.2, 0.6];

fn load_cppn(json: &str) -> FastNetwork {
    let spec: NetworkSpec = serde_json::from_str(json).expect("invalid CPPN description");
    FastNetwork::from_spec(spec).unwrap()
}

fn ridge_cppn() -> FastNetwork {
    load_cppn(include_str!("data/ridge_cppn.json"))
}

fn ridge_leo_cppn() -> FastNetwork {
    load_cppn(include_str!("data/ridge_leo_cppn.json"))
}

fn run(network: &mut FastNetwork) -> Vec<f64> {
    network.flush().unwrap();
    network.load_sensors(&SENSORS).unwrap();
    assert!(network.relax().unwrap());
    network.read_outputs()
}

fn assert_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len());
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < 1e-8, "{actual:?} != {expected:?}");
    }
}

/// A random feed-forward CPPN over `(x1, y1, x2, y2)`.
fn random_cppn(rng: &mut ChaCha8Rng, outputs: usize) -> FastNetwork {
    let hidden = rng.random_range(1..5);
    let counts = NeuronCounts::new(0, 4, outputs, hidden);
    let first_hidden = counts.hidden_offset();

    let mut activations = vec![Activation::Null; 4];
    for _ in 0..outputs + hidden {
        activations.push(Activation::CPPN[rng.random_range(0..Activation::CPPN.len())]);
    }

    let mut links = Vec::new();
    for h in 0..hidden {
        let target = first_hidden + h;
        for source in (0..4).chain(first_hidden..target) {
            if rng.random_bool(0.6) {
                links.push(FastLink::new(source, target, rng.random_range(-3.0..3.0)));
            }
        }
    }
    for o in 0..outputs {
        let target = counts.output_offset() + o;
        for source in (0..4).chain(first_hidden..first_hidden + hidden) {
            if rng.random_bool(0.6) {
                links.push(FastLink::new(source, target, rng.random_range(-3.0..3.0)));
            }
        }
    }
    let biases = (0..counts.total())
        .map(|i| if i < 4 { 0.0 } else { rng.random_range(-1.0..1.0) })
        .collect();

    FastNetwork::new(counts, activations, links, Some(biases)).unwrap()
}

fn assert_well_formed(network: &FastNetwork, weight_range: f64) {
    let mut pairs = HashSet::new();
    for link in network.links() {
        assert_ne!(link.source, link.target, "self-link at {}", link.source);
        assert!(pairs.insert((link.source, link.target)), "duplicate link {link:?}");
        assert!(link.weight.abs() <= weight_range + 1e-12, "weight out of range: {link:?}");
    }
}

#[test]
fn test_grid_substrate_end_to_end() {
    let substrate = Substrate::new(GridLayout::new(1, 4, 2, 2));
    let options = HyperNeatOptions::default();

    let mut network = substrate.create_network(&mut ridge_cppn(), false, None, &options).unwrap();
    assert_eq!(network.node_count(), 1 + 4 + 2 + 2);
    assert_eq!(network.link_count(), 7);
    assert!(!network.is_recurrent());
    assert_eq!(network.max_activation_depth(), Some(2));

    let outputs = run(&mut network);
    assert_close(&outputs, &[0.996_088_083_034_274_2, 0.999_999_999_920_211_2]);

    let mut again = substrate.create_network(&mut ridge_cppn(), false, None, &options).unwrap();
    assert_close(&run(&mut again), &outputs);
}

#[test]
fn test_grid_substrate_with_leo() {
    let substrate = Substrate::new(GridLayout::new(1, 4, 2, 2));
    let options = HyperNeatOptions::leo();

    let network = substrate
        .create_network(&mut ridge_leo_cppn(), true, None, &options)
        .unwrap();
    // step(y2) is closed on the hidden row at y = 0, so only hidden -> output links remain
    assert_eq!(network.link_count(), 4);
    assert!(network.links().iter().all(|l| (7..9).contains(&l.source) && (5..7).contains(&l.target)));
    assert_well_formed(&network, options.weight_range);
}

#[test]
fn test_evolvable_substrate_end_to_end() {
    let options = EsHyperNeatOptions::default();
    let mut substrate = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap());

    let mut network = substrate
        .create_network(&mut ridge_cppn(), false, None, &options)
        .unwrap();
    assert_eq!(substrate.layout().hidden_count(), 2);
    assert_eq!(network.node_count(), 4 + 2 + 2);
    assert_eq!(network.link_count(), 14);
    assert!(network.is_recurrent());
    assert_well_formed(&network, options.hyperneat.weight_range);

    let outputs = run(&mut network);
    assert_close(&outputs, &[0.999_984_576_708_429_6, 0.999_999_999_999_852_6]);

    // flush clears state, so a second run reproduces the first
    assert_close(&run(&mut network), &outputs);

    // small signals keep the recurrent hidden pair off saturation
    network.flush().unwrap();
    network.load_sensors(&[-0.9, 0.0, -0.6, -0.5]).unwrap();
    assert!(network.relax().unwrap());
    assert_close(&network.read_outputs(), &[0.500_001_018_585_898_1, 0.500_002_716_228_552_1]);
}

#[test]
fn test_evolvable_substrate_with_leo() {
    let options = EsHyperNeatOptions {
        hyperneat: HyperNeatOptions::leo(),
        ..Default::default()
    };
    let mut substrate = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap());
    let mut network = substrate
        .create_network(&mut ridge_leo_cppn(), true, None, &options)
        .unwrap();

    assert_eq!(substrate.layout().hidden_positions(), &[Point::new(0.5, 0.5)]);
    assert_eq!(network.link_count(), 6);
    assert_well_formed(&network, options.hyperneat.weight_range);
    assert_eq!(run(&mut network).len(), 2);
}

#[test]
fn test_evolvable_substrate_is_idempotent() {
    let options = EsHyperNeatOptions::default();

    let mut reused = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap());
    let first = reused.create_network(&mut ridge_cppn(), false, None, &options).unwrap();
    let second = reused.create_network(&mut ridge_cppn(), false, None, &options).unwrap();
    let fresh = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap())
        .create_network(&mut ridge_cppn(), false, None, &options)
        .unwrap();

    for other in [&second, &fresh] {
        assert_eq!(first.counts(), other.counts());
        assert_eq!(first.links(), other.links());
        assert_eq!(first.activations(), other.activations());
    }
}

#[test]
fn test_graph_sink_does_not_change_result() {
    let options = EsHyperNeatOptions::default();
    let mut graph = SubstrateGraph::new();

    let mut with_graph = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap())
        .create_network(&mut ridge_cppn(), false, Some(&mut graph), &options)
        .unwrap();
    let mut without = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap())
        .create_network(&mut ridge_cppn(), false, None, &options)
        .unwrap();

    assert_eq!(with_graph.links(), without.links());
    assert_close(&run(&mut with_graph), &run(&mut without));

    assert_eq!(graph.node_count(), Ok(with_graph.node_count()));
    assert_eq!(graph.edge_count(), Ok(with_graph.link_count()));
    let mut edges: Vec<_> = graph.edge_list().collect();
    let mut links: Vec<_> = with_graph
        .links()
        .iter()
        .map(|l| (l.source, l.target, l.weight))
        .collect();
    edges.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    links.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
    assert_eq!(edges, links);
    assert_eq!(graph.nodes_with_role(NeuronType::Output).count(), 2);
}

#[test]
fn test_flat_cppn_is_degenerate() {
    let mut flat = FastNetwork::new(
        NeuronCounts::new(0, 4, 1, 0),
        vec![Activation::Null; 5],
        vec![],
        None,
    )
    .unwrap();
    let result = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap()).create_network(
        &mut flat,
        false,
        None,
        &EsHyperNeatOptions::default(),
    );
    assert!(matches!(result, Err(AssemblyError::DegenerateNetwork { links: 0, .. })));

    // under LEO an empty network is a valid result
    let mut flat_leo = FastNetwork::new(
        NeuronCounts::new(0, 4, 2, 0),
        vec![Activation::Null; 6],
        vec![],
        None,
    )
    .unwrap();
    let network = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap())
        .create_network(&mut flat_leo, true, None, &EsHyperNeatOptions::default())
        .unwrap();
    assert_eq!(network.link_count(), 0);
}

#[test]
fn test_random_cppns_build_well_formed_networks() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let grid = Substrate::new(GridLayout::new(1, 4, 2, 3));

    for round in 0..12 {
        let use_leo = round % 3 == 0;
        let outputs = if use_leo { 2 } else { 1 };
        let mut cppn = random_cppn(&mut rng, outputs);

        let options = EsHyperNeatOptions {
            maximal_depth: 4,
            es_iterations: 2,
            ..Default::default()
        };
        let range = options.hyperneat.weight_range;

        match grid.create_network(&mut cppn, use_leo, None, &options.hyperneat) {
            Ok(network) => assert_well_formed(&network, range),
            Err(AssemblyError::DegenerateNetwork { .. }) => {}
            Err(e) => panic!("grid build failed: {e}"),
        }

        let mut substrate = EvolvableSubstrate::new(EvolvableLayout::new(4, 2).unwrap());
        let first = substrate.create_network(&mut cppn, use_leo, None, &options);
        let second = substrate.create_network(&mut cppn, use_leo, None, &options);
        match (first, second) {
            (Ok(a), Ok(b)) => {
                assert_well_formed(&a, range);
                assert_eq!(a.links(), b.links());
                assert_eq!(a.node_count(), 6 + substrate.layout().hidden_count());
            }
            (Err(AssemblyError::DegenerateNetwork { .. }), Err(AssemblyError::DegenerateNetwork { .. })) => {}
            (a, b) => panic!("inconsistent rebuild: {:?} vs {:?}", a.err(), b.err()),
        }
    }
}

#[test]
fn test_initial_depth_is_always_subdivided() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let hyper = HyperNeatOptions::default();

    for _ in 0..8 {
        let mut cppn = random_cppn(&mut rng, 1);
        let mut query = CppnQuery::new(&mut cppn, &hyper);
        let depth = rng.random_range(1..4);
        let options = EsHyperNeatOptions {
            initial_depth: depth,
            maximal_depth: depth + 1,
            ..Default::default()
        };
        let anchor = Point::new(rng.random_range(-1.0..1.0), -1.0);

        let tree = build_quadtree(&mut query, anchor, true, &options).unwrap();
        for node in tree.nodes.values().filter(|n| n.level <= depth) {
            assert!(node.children.is_some(), "level {} leaf at depth {depth}", node.level);
        }
        assert!(tree.depth() <= depth + 2);
    }
}

#[test]
fn test_hidden_coordinates_are_deduplicated() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut layout = EvolvableLayout::new(4, 2).unwrap();
    let mut distinct = HashSet::new();

    for _ in 0..500 {
        // coarse lattice so coordinates repeat
        let point = Point::new(
            f64::from(rng.random_range(-4..=4)) / 4.0,
            f64::from(rng.random_range(-4..=4)) / 4.0,
        );
        let before = layout.hidden_count();
        let (index, created) = layout.hidden_index_or_insert(point).unwrap();
        assert_eq!(created, distinct.insert(point));
        assert_eq!(layout.hidden_count(), before + usize::from(created));
        assert_eq!(layout.node_position(index, NeuronType::Hidden).unwrap(), point);
    }
    assert_eq!(layout.hidden_count(), distinct.len());
}
