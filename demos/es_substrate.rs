//! Evolvable-substrate example.
//!
//! Builds a grid substrate and an evolvable substrate from the same CPPN and
//! prints the discovered hidden neurons, links and outputs.
//!
//! Run with: `RUST_LOG=debug cargo run --example es_substrate`

use symbios_hyperneat::{
    EsHyperNeatOptions, EvolvableLayout, EvolvableSubstrate, FastNetwork, GraphSink, GridLayout,
    NetworkSolver, NetworkSpec, Substrate, SubstrateGraph,
};
use tracing_subscriber::EnvFilter;

const SENSORS: [f64; 4] = [0.9, 5.2, 1.2, 0.6];

fn print_network(network: &mut FastNetwork) -> Result<(), Box<dyn std::error::Error>> {
    println!(
        "Neurons: {}, links: {}, recurrent: {}",
        network.node_count(),
        network.link_count(),
        network.is_recurrent()
    );
    for link in network.links() {
        println!("  {:2} -> {:2}  {:+.4}", link.source, link.target, link.weight);
    }

    network.flush()?;
    network.load_sensors(&SENSORS)?;
    let settled = network.relax()?;
    println!("Outputs for {SENSORS:?}: {:.6?} (settled: {settled})", network.read_outputs());
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("ES-HyperNEAT Substrate Example");
    println!("==============================\n");

    let spec: NetworkSpec = serde_json::from_str(include_str!("../tests/data/ridge_cppn.json"))?;
    let mut cppn = FastNetwork::from_spec(spec)?;
    let options = EsHyperNeatOptions::default();

    println!("Grid substrate (1 bias, 4 inputs, 2 hidden, 2 outputs)");
    let grid = Substrate::new(GridLayout::new(1, 4, 2, 2));
    let mut network = grid.create_network(&mut cppn, false, None, &options.hyperneat)?;
    print_network(&mut network)?;
    println!();

    println!("Evolvable substrate (4 inputs, 2 outputs)");
    let mut substrate = EvolvableSubstrate::new(EvolvableLayout::new(4, 2)?);
    let mut graph = SubstrateGraph::new();
    let mut network = substrate.create_network(&mut cppn, false, Some(&mut graph), &options)?;

    println!("Hidden neurons:");
    for (i, position) in substrate.layout().hidden_positions().iter().enumerate() {
        println!("  {i}: {position}");
    }
    print_network(&mut network)?;
    println!(
        "\nGraph dump: {} nodes, {} edges",
        graph.node_count()?,
        graph.edge_count()?
    );
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}
