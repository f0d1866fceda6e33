//! Breadth-first quadtree subdivision.
//!
//! The tree is grown from a FIFO queue so CPPN queries are issued level by
//! level and the stack depth stays flat regardless of `maximal_depth`.

use std::collections::VecDeque;

use tracing::trace;

use crate::cppn::{CppnQuery, QueryError};
use crate::options::EsHyperNeatOptions;
use crate::quadtree::{variance, Point, QuadNode, QuadTree};
use crate::solver::NetworkSolver;

/// Quadrant signs in child order.
pub const QUADRANTS: [(f64, f64); 4] = [(-1.0, -1.0), (-1.0, 1.0), (1.0, -1.0), (1.0, 1.0)];

/// Build the quadtree sampling the CPPN around `anchor`.
///
/// With `outgoing` the anchor is the link source and each sampled point the
/// target; otherwise the sampled point is the source and the anchor the target.
/// Every node up to `initial_depth` is subdivided. Deeper nodes are subdivided
/// while the variance of their children's weights exceeds `division_threshold`,
/// up to `maximal_depth`.
///
/// # Errors
///
/// Propagates any [`QueryError`] from the CPPN.
pub fn build_quadtree<S: NetworkSolver + ?Sized>(
    query: &mut CppnQuery<'_, S>,
    anchor: Point,
    outgoing: bool,
    options: &EsHyperNeatOptions,
) -> Result<QuadTree, QueryError> {
    let queries_before = query.query_count();
    let mut tree = QuadTree::new(QuadNode::new(
        Point::default(),
        options.initial_width,
        options.initial_height,
        1,
    ));

    let mut queue = VecDeque::from([tree.root]);
    while let Some(parent_id) = queue.pop_front() {
        let parent = &tree.nodes[parent_id];
        let (center, width, height, level) = (parent.center, parent.width, parent.height, parent.level);

        let mut children = QUADRANTS.map(|(sx, sy)| {
            QuadNode::new(
                Point::with_z(center.x + sx * width / 2.0, center.y + sy * height / 2.0, center.z),
                width / 2.0,
                height / 2.0,
                level + 1,
            )
        });
        for child in &mut children {
            child.cppn_out = if outgoing {
                query.query(anchor, child.center)?
            } else {
                query.query(child.center, anchor)?
            };
        }

        let spread = variance(&children.each_ref().map(|c| c.weight()));
        let ids = tree.subdivide(parent_id, children);
        if level < options.initial_depth
            || (level < options.maximal_depth && spread > options.division_threshold)
        {
            queue.extend(ids);
        }
    }

    trace!(
        anchor = %anchor,
        outgoing,
        nodes = tree.len(),
        depth = tree.depth(),
        queries = query.query_count() - queries_before,
        "quadtree built"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;
    use crate::network::{FastLink, FastNetwork, NeuronCounts};
    use crate::options::HyperNeatOptions;

    /// CPPN whose single output equals sensor `input`.
    fn coordinate_cppn(input: usize) -> FastNetwork {
        let mut activations = vec![Activation::Null; 4];
        activations.push(Activation::Identity);
        FastNetwork::new(
            NeuronCounts::new(0, 4, 1, 0),
            activations,
            vec![FastLink::new(input, 4, 1.0)],
            None,
        )
        .unwrap()
    }

    fn es_options(initial_depth: u32, maximal_depth: u32) -> EsHyperNeatOptions {
        EsHyperNeatOptions {
            initial_depth,
            maximal_depth,
            ..Default::default()
        }
    }

    fn full_tree_size(levels: u32) -> usize {
        (0..levels).map(|l| 4usize.pow(l)).sum()
    }

    #[test]
    fn test_flat_cppn_stops_at_initial_depth() {
        let mut cppn = coordinate_cppn(0);
        let hyper = HyperNeatOptions::default();
        let mut query = CppnQuery::new(&mut cppn, &hyper);

        // outgoing from a fixed source: x1 never changes, weights are flat
        let tree = build_quadtree(&mut query, Point::new(0.3, -1.0), true, &es_options(3, 5)).unwrap();
        assert_eq!(tree.len(), full_tree_size(4));
        assert_eq!(tree.depth(), 4);
        assert_eq!(query.query_count(), 4 + 16 + 64);

        for node in tree.nodes.values().filter(|n| n.level > 1) {
            assert_eq!(node.weight(), 0.3);
        }
    }

    #[test]
    fn test_initial_depth_always_subdivided() {
        let mut cppn = coordinate_cppn(2);
        let hyper = HyperNeatOptions::default();
        let mut query = CppnQuery::new(&mut cppn, &hyper);

        for depth in 1..=4 {
            let tree = build_quadtree(&mut query, Point::default(), true, &es_options(depth, depth)).unwrap();
            for node in tree.nodes.values() {
                if node.level <= depth {
                    assert!(node.children.is_some(), "level {} not subdivided", node.level);
                } else {
                    assert!(node.is_leaf());
                }
            }
        }
    }

    #[test]
    fn test_variance_drives_deeper_division() {
        let mut cppn = coordinate_cppn(2);
        let hyper = HyperNeatOptions::default();
        let mut query = CppnQuery::new(&mut cppn, &hyper);

        // weight = x2: child variance is 0.25 at the root and quarters per level,
        // 0.0625 at level 2 and 0.015625 at level 3, all above 0.01
        let tree = build_quadtree(&mut query, Point::default(), true, &es_options(1, 3)).unwrap();
        assert_eq!(tree.len(), full_tree_size(4));

        let tree = build_quadtree(&mut query, Point::default(), true, &es_options(1, 2)).unwrap();
        assert_eq!(tree.len(), full_tree_size(3));

        let strict = EsHyperNeatOptions {
            division_threshold: 0.1,
            ..es_options(1, 5)
        };
        let tree = build_quadtree(&mut query, Point::default(), true, &strict).unwrap();
        assert_eq!(tree.len(), full_tree_size(3));
    }

    #[test]
    fn test_incoming_samples_source() {
        let mut cppn = coordinate_cppn(0);
        let hyper = HyperNeatOptions::default();
        let mut query = CppnQuery::new(&mut cppn, &hyper);

        // incoming: the sampled point is the source, so x1 varies
        let tree = build_quadtree(&mut query, Point::new(0.3, 1.0), false, &es_options(1, 2)).unwrap();
        assert_eq!(tree.len(), full_tree_size(3));
        let root_children = tree.children(tree.root).unwrap();
        assert_eq!(tree.nodes[root_children[0]].weight(), -0.5);
        assert_eq!(tree.nodes[root_children[3]].weight(), 0.5);
    }

    #[test]
    fn test_child_geometry() {
        let mut cppn = coordinate_cppn(0);
        let hyper = HyperNeatOptions::default();
        let mut query = CppnQuery::new(&mut cppn, &hyper);

        let tree = build_quadtree(&mut query, Point::default(), true, &es_options(1, 1)).unwrap();
        let ids = tree.children(tree.root).unwrap();
        let centers: Vec<Point> = ids.iter().map(|&id| tree.nodes[id].center).collect();
        assert_eq!(
            centers,
            vec![
                Point::new(-0.5, -0.5),
                Point::new(-0.5, 0.5),
                Point::new(0.5, -0.5),
                Point::new(0.5, 0.5),
            ]
        );
        for &id in &ids {
            let node = &tree.nodes[id];
            assert_eq!((node.width, node.height, node.level), (0.5, 0.5, 2));
        }
    }

    #[test]
    fn test_query_error_propagates() {
        // 3-input CPPN cannot take planar queries
        let mut cppn = FastNetwork::new(
            NeuronCounts::new(0, 3, 1, 0),
            vec![Activation::Null; 4],
            vec![],
            None,
        )
        .unwrap();
        let hyper = HyperNeatOptions::default();
        let mut query = CppnQuery::new(&mut cppn, &hyper);
        assert!(matches!(
            build_quadtree(&mut query, Point::default(), true, &es_options(2, 2)),
            Err(QueryError::Solver(_))
        ));
    }
}
