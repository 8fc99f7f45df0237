//! Choosing among the minimum cuts left by a max-flow computation.
//!
//! After max-flow, the canonical source-side cut is only one of possibly
//! many minimum cuts. The nodes between the source-reachable set and the
//! sink-coreachable set are condensed into strongly connected components of
//! the residual graph; every successor-closed union of those components
//! yields another minimum cut. Components are considered in the order their
//! SCCs are emitted (all residual successors of a component precede it), so
//! every prefix is successor-closed, and the prefix with the best resulting
//! block balance wins.

use crate::hypergraph::{BlockId, Hypergraph, VertexWeight};
use crate::refinement::flow::network::{FlowNetwork, FlowProblem};

/// Returns, per region vertex, whether it belongs to `b0` after the cut.
pub(crate) fn assign_region(
    network: &FlowNetwork,
    problem: &FlowProblem,
    hg: &Hypergraph,
    b0: BlockId,
    b1: BlockId,
    bounds: [VertexWeight; 2],
    use_most_balanced: bool,
) -> Vec<bool> {
    let num_region = problem.vertices.len();
    let s_side = network.residual_reachable(network.source);

    if !use_most_balanced {
        return (0..num_region).map(|i| s_side[i]).collect();
    }

    let t_side = network.residual_coreachable(network.sink);
    let middle: Vec<bool> = (0..network.num_nodes())
        .map(|i| {
            !s_side[i]
                && !t_side[i]
                && i != network.source as usize
                && i != network.sink as usize
        })
        .collect();

    let components = condense(network, &middle);

    // block weights with the region vertices taken out
    let mut outside = [hg.block_weight(b0), hg.block_weight(b1)];
    for &v in &problem.vertices {
        let side = if hg.block(v) == b0 { 0 } else { 1 };
        outside[side] -= hg.vertex_weight(v);
    }
    let region_total: VertexWeight = problem
        .vertices
        .iter()
        .map(|&v| hg.vertex_weight(v))
        .sum();
    let source_weight: VertexWeight = (0..num_region)
        .filter(|&i| s_side[i])
        .map(|i| hg.vertex_weight(problem.vertices[i]))
        .sum();

    // evaluate every successor-closed prefix of the component order
    let mut w0 = outside[0] + source_weight;
    let mut moved_distance: u64 = 0;
    let mut best = (0usize, w0, moved_distance);
    let mut best_key =
        candidate_key(w0, outside[1] + region_total - source_weight, bounds, 0);
    for (j, component) in components.iter().enumerate() {
        let mut weight = 0;
        let mut distance = 0u64;
        for &node in component {
            if (node as usize) < num_region {
                weight += hg.vertex_weight(problem.vertices[node as usize]);
                distance += problem.distance[node as usize] as u64;
            }
        }
        w0 += weight;
        moved_distance += distance;
        let w1 = outside[1] + region_total - (w0 - outside[0]);
        let key = candidate_key(w0, w1, bounds, moved_distance);
        if key < best_key {
            best_key = key;
            best = (j + 1, w0, moved_distance);
        }
    }

    let prefix = best.0;
    let mut to_b0: Vec<bool> = (0..num_region).map(|i| s_side[i]).collect();
    for component in &components[..prefix] {
        for &node in component {
            if (node as usize) < num_region {
                to_b0[node as usize] = true;
            }
        }
    }
    to_b0
}

/// Smaller is better: infeasibility first, then the heavier block, then the
/// total BFS distance of the reassigned vertices (keeps the chosen cut close
/// to the original one).
fn candidate_key(
    w0: VertexWeight,
    w1: VertexWeight,
    bounds: [VertexWeight; 2],
    moved_distance: u64,
) -> (bool, VertexWeight, u64) {
    let infeasible = w0 > bounds[0] || w1 > bounds[1];
    (infeasible, w0.max(w1), moved_distance)
}

/// Iterative Tarjan over the residual graph restricted to `middle`;
/// components are emitted with successors first.
fn condense(network: &FlowNetwork, middle: &[bool]) -> Vec<Vec<u32>> {
    let n = network.num_nodes();
    const UNVISITED: u32 = u32::MAX;
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0u32; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<u32> = Vec::new();
    let mut next_index = 0u32;
    let mut components = Vec::new();

    // explicit DFS frames: (node, adjacency cursor)
    let mut frames: Vec<(u32, usize)> = Vec::new();
    for start in 0..n as u32 {
        if !middle[start as usize] || index[start as usize] != UNVISITED {
            continue;
        }
        frames.push((start, 0));
        index[start as usize] = next_index;
        lowlink[start as usize] = next_index;
        next_index += 1;
        stack.push(start);
        on_stack[start as usize] = true;

        while let Some(&(node, cursor)) = frames.last() {
            if cursor < network.adjacency[node as usize].len() {
                frames.last_mut().unwrap().1 += 1;
                let id = network.adjacency[node as usize][cursor];
                let edge = network.edges[id as usize];
                let next = edge.target;
                if edge.residual() <= 0 || !middle[next as usize] {
                    continue;
                }
                if index[next as usize] == UNVISITED {
                    index[next as usize] = next_index;
                    lowlink[next as usize] = next_index;
                    next_index += 1;
                    stack.push(next);
                    on_stack[next as usize] = true;
                    frames.push((next, 0));
                } else if on_stack[next as usize] {
                    lowlink[node as usize] =
                        lowlink[node as usize].min(index[next as usize]);
                }
                continue;
            }
            frames.pop();
            if let Some(&(parent, _)) = frames.last() {
                lowlink[parent as usize] =
                    lowlink[parent as usize].min(lowlink[node as usize]);
            }
            if lowlink[node as usize] == index[node as usize] {
                let mut component = Vec::new();
                loop {
                    let w = stack.pop().unwrap();
                    on_stack[w as usize] = false;
                    component.push(w);
                    if w == node {
                        break;
                    }
                }
                components.push(component);
            }
        }
    }
    components
}

#[cfg(test)]
mod tests {
    use super::*;

    /// s → a → b → t with unit capacities: both {a,b} assignments between
    /// the two saturated arcs are minimum cuts.
    fn chain_network() -> FlowNetwork {
        let mut network = FlowNetwork::with_nodes(2);
        let (s, t) = (network.source, network.sink);
        network.add_edge(s, 0, 1, 0);
        network.add_edge(0, 1, 1, 0);
        network.add_edge(1, t, 1, 0);
        network
    }

    #[test]
    fn condensation_emits_successors_first() {
        let mut network = chain_network();
        crate::refinement::flow::maximum_flow::maximum_flow(
            crate::context::FlowAlgorithm::EdmondsKarp,
            &mut network,
        );
        // with every arc saturated both inner nodes are middle singletons
        let middle = vec![true, true, false, false];
        let components = condense(&network, &middle);
        assert_eq!(components.len(), 2);
        // node 1's only residual successors lie outside the middle, so it
        // must not come after a component that can reach it
        let pos_of = |node: u32| {
            components
                .iter()
                .position(|c| c.contains(&node))
                .unwrap()
        };
        // 0 → 1 is saturated; residual arc runs 1 → 0, so 0 precedes 1
        assert!(pos_of(0) <= pos_of(1));
    }
}
