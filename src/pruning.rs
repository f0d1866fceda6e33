//! Depth-first pruning and band extraction.
//!
//! Walks a quadtree built by [`build_quadtree`](crate::division::build_quadtree)
//! and keeps only the points that sit on a band: a spot where the CPPN weight
//! differs sharply from both neighbours along at least one axis. Regions whose
//! children still vary are descended into instead of connected.

use crate::cppn::{CppnQuery, QueryError};
use crate::options::EsHyperNeatOptions;
use crate::quadtree::{Point, QuadNodeId, QuadPoint, QuadTree};
use crate::solver::NetworkSolver;

/// Extract the connection candidates of a quadtree built around `anchor`.
///
/// Points are returned in depth-first quadrant order. With `outgoing` the anchor
/// is the source of every candidate, otherwise the target.
///
/// # Errors
///
/// Propagates any [`QueryError`] from the neighbour queries.
pub fn extract_connections<S: NetworkSolver + ?Sized>(
    query: &mut CppnQuery<'_, S>,
    anchor: Point,
    tree: &QuadTree,
    outgoing: bool,
    options: &EsHyperNeatOptions,
) -> Result<Vec<QuadPoint>, QueryError> {
    let mut points = Vec::new();
    prune_and_express(query, anchor, tree, tree.root, outgoing, options, &mut points)?;
    Ok(points)
}

fn prune_and_express<S: NetworkSolver + ?Sized>(
    query: &mut CppnQuery<'_, S>,
    anchor: Point,
    tree: &QuadTree,
    node_id: QuadNodeId,
    outgoing: bool,
    options: &EsHyperNeatOptions,
    points: &mut Vec<QuadPoint>,
) -> Result<(), QueryError> {
    let Some(children) = tree.children(node_id) else {
        return Ok(());
    };
    let parent = &tree.nodes[node_id];

    for child_id in children {
        if tree.children_variance(child_id) >= options.variance_threshold {
            prune_and_express(query, anchor, tree, child_id, outgoing, options, points)?;
            continue;
        }

        let child = &tree.nodes[child_id];
        if options.hyperneat.leo_enabled && child.leo() <= 0.0 {
            continue;
        }

        let c = child.center;
        let neighbours = [
            Point::with_z(c.x - parent.width, c.y, c.z),
            Point::with_z(c.x + parent.width, c.y, c.z),
            Point::with_z(c.x, c.y - parent.height, c.z),
            Point::with_z(c.x, c.y + parent.height, c.z),
        ];
        let mut diffs = [0.0; 4];
        for (diff, neighbour) in diffs.iter_mut().zip(neighbours) {
            let out = if outgoing {
                query.query(anchor, neighbour)?
            } else {
                query.query(neighbour, anchor)?
            };
            *diff = (child.weight() - out[0]).abs();
        }
        let [left, right, top, bottom] = diffs;

        if top.min(bottom).max(left.min(right)) > options.banding_threshold {
            let (source, target) = if outgoing { (anchor, c) } else { (c, anchor) };
            points.push(QuadPoint::from_node(source, target, child));
        }
    }
    Ok(())
}
