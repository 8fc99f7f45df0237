//! Maximum-flow solvers over the extracted [`FlowNetwork`].
//!
//! All four compute the same flow value; they differ in how augmenting work
//! is organised. Only `maximum_flow` and the residual state left in the
//! network are observable from the outside.

use std::collections::VecDeque;

use crate::context::FlowAlgorithm;
use crate::refinement::flow::network::FlowNetwork;

pub(crate) fn maximum_flow(algorithm: FlowAlgorithm, network: &mut FlowNetwork) -> i64 {
    match algorithm {
        FlowAlgorithm::EdmondsKarp => edmonds_karp(network),
        FlowAlgorithm::GoldbergTarjan => goldberg_tarjan(network),
        FlowAlgorithm::BoykovKolmogorov => boykov_kolmogorov(network),
        FlowAlgorithm::Ibfs => ibfs(network),
    }
}

const NO_EDGE: u32 = u32::MAX;

/// Shortest augmenting paths by plain breadth-first search.
fn edmonds_karp(network: &mut FlowNetwork) -> i64 {
    let mut total = 0;
    let mut parent = vec![NO_EDGE; network.num_nodes()];
    loop {
        parent.fill(NO_EDGE);
        let mut queue = VecDeque::new();
        queue.push_back(network.source);
        parent[network.source as usize] = NO_EDGE - 1;
        let mut found = false;
        'bfs: while let Some(u) = queue.pop_front() {
            for &id in &network.adjacency[u as usize] {
                let edge = network.edges[id as usize];
                if edge.residual() > 0 && parent[edge.target as usize] == NO_EDGE {
                    parent[edge.target as usize] = id;
                    if edge.target == network.sink {
                        found = true;
                        break 'bfs;
                    }
                    queue.push_back(edge.target);
                }
            }
        }
        if !found {
            return total;
        }
        // bottleneck along the recorded path
        let mut bottleneck = i64::MAX;
        let mut node = network.sink;
        while node != network.source {
            let id = parent[node as usize];
            bottleneck = bottleneck.min(network.edges[id as usize].residual());
            node = network.edges[(id ^ 1) as usize].target;
        }
        let mut node = network.sink;
        while node != network.source {
            let id = parent[node as usize];
            network.push_flow(id, bottleneck);
            node = network.edges[(id ^ 1) as usize].target;
        }
        total += bottleneck;
    }
}

/// FIFO push-relabel with the gap heuristic.
fn goldberg_tarjan(network: &mut FlowNetwork) -> i64 {
    let n = network.num_nodes();
    let source = network.source as usize;
    let sink = network.sink as usize;
    let mut excess = vec![0i64; n];
    let mut label = vec![0usize; n];
    let mut count = vec![0usize; 2 * n];
    let mut active = vec![false; n];
    let mut queue = VecDeque::new();

    label[source] = n;
    count[0] = n - 1;
    count[n] = 1;

    for &id in network.adjacency[source].clone().iter() {
        let amount = network.edges[id as usize].residual();
        if amount > 0 {
            let v = network.edges[id as usize].target as usize;
            network.push_flow(id, amount);
            excess[v] += amount;
            excess[source] -= amount;
            if v != sink && v != source && !active[v] {
                active[v] = true;
                queue.push_back(v);
            }
        }
    }

    while let Some(u) = queue.pop_front() {
        active[u] = false;
        while excess[u] > 0 {
            let mut lowest = usize::MAX;
            let mut pushed = false;
            for &id in network.adjacency[u].clone().iter() {
                let edge = network.edges[id as usize];
                if edge.residual() <= 0 {
                    continue;
                }
                let v = edge.target as usize;
                if label[u] == label[v] + 1 {
                    let amount = excess[u].min(edge.residual());
                    network.push_flow(id, amount);
                    excess[u] -= amount;
                    excess[v] += amount;
                    if v != source && v != sink && !active[v] {
                        active[v] = true;
                        queue.push_back(v);
                    }
                    pushed = true;
                    if excess[u] == 0 {
                        break;
                    }
                } else {
                    lowest = lowest.min(label[v] + 1);
                }
            }
            if excess[u] > 0 && !pushed {
                if lowest == usize::MAX {
                    // nothing admissible and nothing to relabel towards
                    break;
                }
                let old = label[u];
                if old < n && count[old] == 1 {
                    // gap: every label in (old, n) is unreachable from the
                    // sink side, lift those nodes above the source
                    for w in 0..n {
                        if label[w] > old && label[w] < n {
                            count[label[w]] -= 1;
                            label[w] = n + 1;
                            count[(n + 1).min(2 * n - 1)] += 1;
                        }
                    }
                }
                count[old] -= 1;
                label[u] = lowest.min(2 * n - 1);
                count[label[u]] += 1;
            }
        }
    }
    excess[sink]
}

/// Search-tree state of the Boykov–Kolmogorov solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tree {
    None,
    Source,
    Sink,
}

/// Boykov–Kolmogorov augmenting trees: grow a source tree and a sink tree
/// until they touch, augment along the joined path, then adopt orphans.
fn boykov_kolmogorov(network: &mut FlowNetwork) -> i64 {
    let n = network.num_nodes();
    let source = network.source;
    let sink = network.sink;
    let mut tree = vec![Tree::None; n];
    let mut parent = vec![NO_EDGE; n];
    let mut total = 0;

    tree[source as usize] = Tree::Source;
    tree[sink as usize] = Tree::Sink;
    let mut active: VecDeque<u32> = VecDeque::from([source, sink]);
    let mut orphans: VecDeque<u32> = VecDeque::new();

    // residual capacity from the perspective of a tree: source-tree edges
    // point away from the source, sink-tree edges point towards the sink
    let tree_residual = |network: &FlowNetwork, id: u32, t: Tree| -> i64 {
        match t {
            Tree::Source => network.edges[id as usize].residual(),
            Tree::Sink => network.edges[(id ^ 1) as usize].residual(),
            Tree::None => 0,
        }
    };

    loop {
        // growth: expand active nodes until the trees meet
        let mut contact: Option<(u32, u32)> = None; // (edge from source tree, meeting node)
        'grow: while let Some(u) = active.pop_front() {
            if tree[u as usize] == Tree::None {
                continue;
            }
            let t = tree[u as usize];
            for &id in &network.adjacency[u as usize] {
                if tree_residual(network, id, t) <= 0 {
                    continue;
                }
                let v = network.edges[id as usize].target;
                match tree[v as usize] {
                    Tree::None => {
                        tree[v as usize] = t;
                        parent[v as usize] = id ^ 1; // edge towards the parent
                        active.push_back(v);
                    }
                    other if other != t => {
                        // the trees touch through this edge
                        let bridge = if t == Tree::Source { id } else { id ^ 1 };
                        active.push_front(u);
                        contact = Some((bridge, v));
                        break 'grow;
                    }
                    _ => {}
                }
            }
        }
        let Some((bridge, _)) = contact else {
            return total;
        };

        // augmentation: walk both trees to the terminals
        let mut bottleneck = network.edges[bridge as usize].residual();
        let mut walk = network.edges[(bridge ^ 1) as usize].target;
        while walk != source {
            let up = parent[walk as usize];
            bottleneck = bottleneck.min(network.edges[(up ^ 1) as usize].residual());
            walk = network.edges[up as usize].target;
        }
        let mut walk = network.edges[bridge as usize].target;
        while walk != sink {
            let up = parent[walk as usize];
            bottleneck = bottleneck.min(network.edges[up as usize].residual());
            walk = network.edges[up as usize].target;
        }

        network.push_flow(bridge, bottleneck);
        let mut walk = network.edges[(bridge ^ 1) as usize].target;
        while walk != source {
            let up = parent[walk as usize];
            network.push_flow(up ^ 1, bottleneck);
            if network.edges[(up ^ 1) as usize].residual() == 0 {
                orphans.push_back(walk);
            }
            walk = network.edges[up as usize].target;
        }
        let mut walk = network.edges[bridge as usize].target;
        while walk != sink {
            let up = parent[walk as usize];
            network.push_flow(up, bottleneck);
            if network.edges[up as usize].residual() == 0 {
                orphans.push_back(walk);
            }
            walk = network.edges[up as usize].target;
        }
        total += bottleneck;

        // adoption: reattach or free every orphan
        while let Some(orphan) = orphans.pop_front() {
            let t = tree[orphan as usize];
            if t == Tree::None {
                continue;
            }
            // cut the stale parent link so the root-path check cannot run
            // through the orphan and adopt one of its own descendants
            parent[orphan as usize] = NO_EDGE;
            let mut adopted = false;
            for &id in &network.adjacency[orphan as usize] {
                let candidate = network.edges[id as usize].target;
                if tree[candidate as usize] != t {
                    continue;
                }
                // candidate must have tree-residual capacity towards the
                // orphan and a valid root path
                if tree_residual(network, id ^ 1, t) <= 0 {
                    continue;
                }
                if has_root_path(network, &parent, &tree, candidate, source, sink) {
                    parent[orphan as usize] = id;
                    adopted = true;
                    break;
                }
            }
            if !adopted {
                for &id in &network.adjacency[orphan as usize] {
                    let v = network.edges[id as usize].target;
                    if tree[v as usize] != Tree::None {
                        // any tree neighbour may later re-acquire this node
                        active.push_back(v);
                    }
                    if tree[v as usize] == t
                        && parent[v as usize] != NO_EDGE
                        && network.edges[parent[v as usize] as usize].target == orphan
                    {
                        orphans.push_back(v);
                    }
                }
                tree[orphan as usize] = Tree::None;
            }
        }
    }
}

fn has_root_path(
    network: &FlowNetwork,
    parent: &[u32],
    tree: &[Tree],
    mut node: u32,
    source: u32,
    sink: u32,
) -> bool {
    let mut steps = 0;
    loop {
        if node == source || node == sink {
            return true;
        }
        let up = parent[node as usize];
        if up == NO_EDGE || tree[node as usize] == Tree::None {
            return false;
        }
        node = network.edges[up as usize].target;
        steps += 1;
        if steps > network.num_nodes() {
            return false;
        }
    }
}

/// Level-based augmentation: labels are rebuilt by a backward BFS from the
/// sink, then flow is pushed along label-decreasing paths until the level
/// graph is exhausted, and the labels are rebuilt one level deeper.
fn ibfs(network: &mut FlowNetwork) -> i64 {
    let n = network.num_nodes();
    let source = network.source as usize;
    let sink = network.sink as usize;
    let mut level = vec![u32::MAX; n];
    let mut cursor = vec![0usize; n];
    let mut total = 0;

    loop {
        // backward BFS from the sink over residual arcs
        level.fill(u32::MAX);
        level[sink] = 0;
        let mut queue = VecDeque::new();
        queue.push_back(network.sink);
        while let Some(v) = queue.pop_front() {
            for &id in &network.adjacency[v as usize] {
                let u = network.edges[id as usize].target;
                if network.edges[(id ^ 1) as usize].residual() > 0
                    && level[u as usize] == u32::MAX
                {
                    level[u as usize] = level[v as usize] + 1;
                    queue.push_back(u);
                }
            }
        }
        if level[source] == u32::MAX {
            return total;
        }

        // depth-first augmentation within the level graph
        cursor.fill(0);
        let mut path: Vec<u32> = Vec::new();
        let mut node = source;
        loop {
            if node == sink {
                let mut bottleneck = i64::MAX;
                for &id in &path {
                    bottleneck = bottleneck.min(network.edges[id as usize].residual());
                }
                for &id in &path {
                    network.push_flow(id, bottleneck);
                }
                total += bottleneck;
                // backtrack to the lowest saturated edge
                let mut keep = 0;
                while keep < path.len()
                    && network.edges[path[keep] as usize].residual() > 0
                {
                    keep += 1;
                }
                path.truncate(keep);
                node = match path.last() {
                    Some(&id) => network.edges[id as usize].target as usize,
                    None => source,
                };
                continue;
            }
            let mut advanced = false;
            while cursor[node] < network.adjacency[node].len() {
                let id = network.adjacency[node][cursor[node]];
                let edge = network.edges[id as usize];
                if edge.residual() > 0
                    && level[edge.target as usize] != u32::MAX
                    && level[edge.target as usize] + 1 == level[node]
                {
                    path.push(id);
                    node = edge.target as usize;
                    advanced = true;
                    break;
                }
                cursor[node] += 1;
            }
            if !advanced {
                if node == source {
                    break;
                }
                level[node] = u32::MAX; // dead end in this phase
                let id = path.pop().unwrap();
                node = network.edges[(id ^ 1) as usize].target as usize;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refinement::flow::network::INFINITE;

    const ALL: [FlowAlgorithm; 4] = [
        FlowAlgorithm::EdmondsKarp,
        FlowAlgorithm::GoldbergTarjan,
        FlowAlgorithm::BoykovKolmogorov,
        FlowAlgorithm::Ibfs,
    ];

    /// Classic two-path network with a cross edge; max flow 23.
    fn diamond() -> FlowNetwork {
        let mut network = FlowNetwork::with_nodes(2);
        let (s, t) = (network.source, network.sink);
        network.add_edge(s, 0, 16, 0);
        network.add_edge(s, 1, 13, 0);
        network.add_edge(0, 1, 10, 4);
        network.add_edge(0, t, 12, 0);
        network.add_edge(1, t, 14, 0);
        network
    }

    #[test]
    fn all_solvers_agree_on_the_diamond() {
        for algorithm in ALL {
            let mut network = diamond();
            assert_eq!(maximum_flow(algorithm, &mut network), 23, "{:?}", algorithm);
        }
    }

    #[test]
    fn saturated_cut_separates_source_from_sink() {
        for algorithm in ALL {
            let mut network = diamond();
            maximum_flow(algorithm, &mut network);
            let reachable = network.residual_reachable(network.source);
            assert!(!reachable[network.sink as usize], "{:?}", algorithm);
        }
    }

    #[test]
    fn infinite_arcs_are_never_cut() {
        for algorithm in ALL {
            // s -∞- 0 -5- 1 -∞- t
            let mut network = FlowNetwork::with_nodes(2);
            let (s, t) = (network.source, network.sink);
            network.add_edge(s, 0, INFINITE, 0);
            network.add_edge(0, 1, 5, 0);
            network.add_edge(1, t, INFINITE, 0);
            assert_eq!(maximum_flow(algorithm, &mut network), 5, "{:?}", algorithm);
        }
    }

    #[test]
    fn disconnected_sink_means_zero_flow() {
        for algorithm in ALL {
            let mut network = FlowNetwork::with_nodes(2);
            let s = network.source;
            network.add_edge(s, 0, 7, 0);
            network.add_edge(0, 1, 3, 0);
            assert_eq!(maximum_flow(algorithm, &mut network), 0, "{:?}", algorithm);
        }
    }

    #[test]
    fn solvers_agree_on_random_networks() {
        use crate::randomize::Randomize;
        for seed in 0..12 {
            let mut rng = Randomize::with_seed(seed);
            let nodes = 8;
            let mut edges = Vec::new();
            for u in 0..nodes {
                for v in 0..nodes {
                    if u != v && rng.index(3) == 0 {
                        edges.push((u as u32, v as u32, (rng.index(20) + 1) as i64));
                    }
                }
            }
            let mut flows = Vec::new();
            for algorithm in ALL {
                let mut network = FlowNetwork::with_nodes(nodes);
                let (s, t) = (network.source, network.sink);
                network.add_edge(s, 0, (seed as i64 % 17) + 10, 0);
                network.add_edge(s, 1, 12, 0);
                network.add_edge(nodes as u32 - 1, t, 15, 0);
                network.add_edge(nodes as u32 - 2, t, 9, 0);
                for &(u, v, c) in &edges {
                    network.add_edge(u, v, c, 0);
                }
                flows.push(maximum_flow(algorithm, &mut network));
            }
            assert!(
                flows.windows(2).all(|w| w[0] == w[1]),
                "seed {}: {:?}",
                seed,
                flows
            );
        }
    }
}
