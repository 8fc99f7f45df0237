//! Flow-network extraction around the cut of a block pair.
//!
//! Every net inside the region becomes a pair of nodes joined by an arc of
//! capacity ω(e); region pins attach to both net nodes with infinite arcs.
//! Pins beyond the BFS frontier collapse into the super-source (outside of
//! b0) or super-sink (outside of b1). The hybrid variant shortcuts size-2
//! nets whose pins both lie in the region to a direct arc pair.

use std::collections::VecDeque;

use crate::context::{Context, FlowNetworkKind, Objective};
use crate::hypergraph::{BlockId, Hypergraph, NetId, NetWeight, VertexId};

pub(crate) const INFINITE: i64 = i64::MAX / 4;

#[derive(Debug, Clone, Copy)]
pub(crate) struct FlowEdge {
    pub target: u32,
    pub capacity: i64,
    pub flow: i64,
}

impl FlowEdge {
    #[inline]
    pub fn residual(&self) -> i64 {
        self.capacity - self.flow
    }
}

/// Residual graph with paired edges: edge `2i` and `2i+1` are reverses of
/// each other.
#[derive(Debug)]
pub(crate) struct FlowNetwork {
    pub edges: Vec<FlowEdge>,
    pub adjacency: Vec<Vec<u32>>,
    pub source: u32,
    pub sink: u32,
}

impl FlowNetwork {
    pub fn with_nodes(num_nodes: usize) -> Self {
        // source and sink are the last two nodes
        FlowNetwork {
            edges: Vec::new(),
            adjacency: vec![Vec::new(); num_nodes + 2],
            source: num_nodes as u32,
            sink: num_nodes as u32 + 1,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    pub fn add_edge(&mut self, from: u32, to: u32, capacity: i64, reverse_capacity: i64) {
        let id = self.edges.len() as u32;
        self.edges.push(FlowEdge {
            target: to,
            capacity,
            flow: 0,
        });
        self.edges.push(FlowEdge {
            target: from,
            capacity: reverse_capacity,
            flow: 0,
        });
        self.adjacency[from as usize].push(id);
        self.adjacency[to as usize].push(id + 1);
    }

    #[inline]
    pub fn push_flow(&mut self, edge: u32, amount: i64) {
        self.edges[edge as usize].flow += amount;
        self.edges[(edge ^ 1) as usize].flow -= amount;
    }

    /// Nodes reachable from `start` through positive-residual edges.
    pub fn residual_reachable(&self, start: u32) -> Vec<bool> {
        let mut seen = vec![false; self.num_nodes()];
        let mut queue = VecDeque::new();
        seen[start as usize] = true;
        queue.push_back(start);
        while let Some(u) = queue.pop_front() {
            for &id in &self.adjacency[u as usize] {
                let edge = self.edges[id as usize];
                if edge.residual() > 0 && !seen[edge.target as usize] {
                    seen[edge.target as usize] = true;
                    queue.push_back(edge.target);
                }
            }
        }
        seen
    }

    /// Nodes that can reach `end` through positive-residual edges.
    pub fn residual_coreachable(&self, end: u32) -> Vec<bool> {
        let mut seen = vec![false; self.num_nodes()];
        let mut queue = VecDeque::new();
        seen[end as usize] = true;
        queue.push_back(end);
        while let Some(v) = queue.pop_front() {
            // an edge u→v with residual capacity lets u reach v; its pair
            // edge stored at v points back at u
            for &id in &self.adjacency[v as usize] {
                let u = self.edges[id as usize].target;
                if self.edges[(id ^ 1) as usize].residual() > 0 && !seen[u as usize] {
                    seen[u as usize] = true;
                    queue.push_back(u);
                }
            }
        }
        seen
    }
}

/// The extracted subproblem: node ids of the region vertices, their BFS
/// distance from the cut, and the flow network itself.
#[derive(Debug)]
pub(crate) struct FlowProblem {
    pub network: FlowNetwork,
    /// Region vertices, indexed by their node id in the network.
    pub vertices: Vec<VertexId>,
    /// BFS distance from the cut, parallel to `vertices`.
    pub distance: Vec<u32>,
    /// Weight of the nets in the network currently spanning `b0`/`b1`.
    pub cut_before: NetWeight,
}

/// Grows a bounded region around the cut between `b0` and `b1` and builds
/// the flow network over it. Returns `None` when the region is empty.
pub(crate) fn build_flow_problem(
    hg: &Hypergraph,
    ctx: &Context,
    b0: BlockId,
    b1: BlockId,
    cut_nets: &[NetId],
    alpha: f64,
) -> Option<FlowProblem> {
    let average = ctx.average_block_weight(hg.total_weight());
    let slack = ctx.max_block_weight(hg.total_weight()) - average;
    let side_bound = ((alpha * slack.max(1) as f64) as i64).max(1);

    // bounded BFS outward from the cut, one weight budget per side
    let n = hg.initial_num_vertices();
    let mut in_region = vec![false; n];
    let mut distance_of = vec![0u32; n];
    let mut side_weight = [0i64, 0i64];
    let mut queue = VecDeque::new();

    let try_add = |hg: &Hypergraph,
                       v: VertexId,
                       dist: u32,
                       in_region: &mut Vec<bool>,
                       distance_of: &mut Vec<u32>,
                       side_weight: &mut [i64; 2],
                       queue: &mut VecDeque<VertexId>| {
        if in_region[v as usize] || hg.is_fixed(v) {
            return;
        }
        let block = hg.block(v);
        let side = if block == b0 {
            0
        } else if block == b1 {
            1
        } else {
            return;
        };
        if side_weight[side] + hg.vertex_weight(v) > side_bound {
            return;
        }
        side_weight[side] += hg.vertex_weight(v);
        in_region[v as usize] = true;
        distance_of[v as usize] = dist;
        queue.push_back(v);
    };

    for &e in cut_nets {
        for &p in hg.pins(e) {
            try_add(
                hg,
                p,
                0,
                &mut in_region,
                &mut distance_of,
                &mut side_weight,
                &mut queue,
            );
        }
    }
    while let Some(v) = queue.pop_front() {
        let dist = distance_of[v as usize];
        for &e in hg.incident_nets(v) {
            for &p in hg.pins(e) {
                try_add(
                    hg,
                    p,
                    dist + 1,
                    &mut in_region,
                    &mut distance_of,
                    &mut side_weight,
                    &mut queue,
                );
            }
        }
    }

    let vertices: Vec<VertexId> = (0..n as u32).filter(|&v| in_region[v as usize]).collect();
    if vertices.is_empty() {
        return None;
    }
    let mut node_of = vec![u32::MAX; n];
    for (id, &v) in vertices.iter().enumerate() {
        node_of[v as usize] = id as u32;
    }

    // collect the nets with at least one region pin
    let mut relevant: Vec<NetId> = Vec::new();
    let mut net_seen = vec![false; hg.num_nets()];
    for &v in &vertices {
        for &e in hg.incident_nets(v) {
            if !net_seen[e as usize] {
                net_seen[e as usize] = true;
                relevant.push(e);
            }
        }
    }

    let mut cut_before = 0;
    let mut builder = NetworkBuilder::new(vertices.len(), relevant.len());
    for &e in &relevant {
        let spans_other_block = hg
            .connectivity_set(e)
            .any(|b| b != b0 && b != b1);
        if spans_other_block && ctx.partition.objective == Objective::Cut {
            continue;
        }
        if hg.pins_in_block(e, b0) > 0 && hg.pins_in_block(e, b1) > 0 {
            cut_before += hg.net_weight(e);
        }

        let mut outside_b0 = false;
        let mut outside_b1 = false;
        let mut region_pins: Vec<u32> = Vec::new();
        for &p in hg.pins(e) {
            if node_of[p as usize] != u32::MAX {
                region_pins.push(node_of[p as usize]);
            } else if hg.block(p) == b0 {
                outside_b0 = true;
            } else if hg.block(p) == b1 {
                outside_b1 = true;
            }
        }
        if region_pins.is_empty() {
            continue;
        }
        builder.add_net(
            ctx.local_search.flow.network,
            hg.net_weight(e),
            &region_pins,
            outside_b0,
            outside_b1,
        );
    }

    if builder.is_trivial() {
        // a side entirely inside the region has no terminal: any "cut"
        // would just empty that block
        return None;
    }
    let network = builder.finish();
    Some(FlowProblem {
        network,
        vertices,
        distance: (0..n)
            .filter(|&v| in_region[v])
            .map(|v| distance_of[v])
            .collect(),
        cut_before,
    })
}

/// Assembles the network once the number of net nodes is known.
struct NetworkBuilder {
    edges: Vec<(u32, u32, i64, i64)>,
    next_net_node: u32,
    sources: Vec<u32>,
    sinks: Vec<u32>,
}

impl NetworkBuilder {
    fn new(num_vertices: usize, max_nets: usize) -> Self {
        NetworkBuilder {
            edges: Vec::with_capacity(4 * max_nets),
            next_net_node: num_vertices as u32,
            sources: Vec::new(),
            sinks: Vec::new(),
        }
    }

    fn add_net(
        &mut self,
        kind: FlowNetworkKind,
        weight: i64,
        region_pins: &[u32],
        outside_b0: bool,
        outside_b1: bool,
    ) {
        if kind == FlowNetworkKind::Hybrid
            && region_pins.len() == 2
            && !outside_b0
            && !outside_b1
        {
            let (a, b) = (region_pins[0], region_pins[1]);
            self.edges.push((a, b, weight, weight));
            return;
        }
        let e_in = self.next_net_node;
        let e_out = self.next_net_node + 1;
        self.next_net_node += 2;
        self.edges.push((e_in, e_out, weight, 0));
        for &p in region_pins {
            self.edges.push((p, e_in, INFINITE, 0));
            self.edges.push((e_out, p, INFINITE, 0));
        }
        if outside_b0 {
            self.sources.push(e_in);
        }
        if outside_b1 {
            self.sinks.push(e_out);
        }
    }

    fn is_trivial(&self) -> bool {
        self.sources.is_empty() || self.sinks.is_empty()
    }

    fn finish(self) -> FlowNetwork {
        let num_nodes = self.next_net_node as usize;
        let mut network = FlowNetwork::with_nodes(num_nodes);
        for (from, to, cap, rev_cap) in self.edges {
            network.add_edge(from, to, cap, rev_cap);
        }
        let source = network.source;
        let sink = network.sink;
        for s in self.sources {
            network.add_edge(source, s, INFINITE, 0);
        }
        for t in self.sinks {
            network.add_edge(t, sink, INFINITE, 0);
        }
        network
    }
}
