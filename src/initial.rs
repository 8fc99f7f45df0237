//! Initial partitioning of the coarsest hypergraph.
//!
//! A pool of flat heuristics is run `i-runs` times; every trial is polished
//! by one FM pass (configured by the `i-r-*` options) and the best feasible
//! result is kept (an infeasible one only survives if no trial was
//! feasible). Fixed vertices are assigned before any heuristic runs and no
//! heuristic touches them afterwards. Should the main coarsener have
//! stalled above the pool's own contraction limit (`i-c-t·k`), the pool
//! first contracts further with its own coarsening settings and unwinds
//! those contractions before returning.

use std::collections::VecDeque;

use bitvec::prelude::*;

use crate::coarsening;
use crate::context::{Context, InitialAlgorithm};
use crate::error::{Error, Result};
use crate::hypergraph::{BlockId, Hypergraph, VertexId, VertexWeight};
use crate::metrics::Metrics;
use crate::randomize::Randomize;
use crate::refinement::fm_k_way::KWayFm;
use crate::refinement::fm_two_way::TwoWayFm;
use crate::refinement::Refiner;

const POOL: [InitialAlgorithm; 4] = [
    InitialAlgorithm::Random,
    InitialAlgorithm::Bfs,
    InitialAlgorithm::GreedyNet,
    InitialAlgorithm::LabelPropagation,
];

/// Partitions the (coarse) hypergraph into `ctx.partition.k` blocks.
pub fn initial_partition(hg: &mut Hypergraph, ctx: &Context, rng: &mut Randomize) -> Result<()> {
    // second-chance coarsening with the pool's own settings
    let pool_limit = ctx.initial.coarsening.contraction_limit_multiplier * ctx.partition.k;
    let mementos = if hg.num_active_vertices() > pool_limit {
        let mut pool_ctx = ctx.clone();
        pool_ctx.coarsening = ctx.initial.coarsening.clone();
        coarsening::coarsen(hg, &pool_ctx, rng)
    } else {
        Vec::new()
    };

    let bounds = ctx.block_weight_bounds(hg.total_weight());
    let mut fm: Box<dyn Refiner> = if ctx.partition.k == 2 {
        Box::new(TwoWayFm::new(
            ctx.initial.fm.clone(),
            bounds.clone(),
            hg.initial_num_vertices(),
        ))
    } else {
        Box::new(KWayFm::new(
            ctx.initial.fm.clone(),
            ctx.partition.objective,
            bounds.clone(),
            hg.initial_num_vertices(),
        ))
    };

    let mut best: Option<(Vec<BlockId>, Metrics, bool)> = None;
    for run in 0..ctx.initial.runs {
        let algorithm = match ctx.initial.algorithm {
            InitialAlgorithm::Pool => POOL[run % POOL.len()],
            fixed_choice => fixed_choice,
        };
        hg.reset_partition();
        assign_fixed_vertices(hg);
        match algorithm {
            InitialAlgorithm::Random => random(hg, &bounds, rng),
            InitialAlgorithm::Bfs => bfs_growing(hg, &bounds, rng),
            InitialAlgorithm::GreedyNet => greedy_net(hg, &bounds, rng),
            InitialAlgorithm::LabelPropagation => label_propagation(hg, &bounds, rng),
            InitialAlgorithm::Pool => unreachable!(),
        }
        debug_assert!(hg.active_vertices().all(|v| hg.has_block(v)));

        let mut metrics = Metrics::read(hg, ctx.partition.objective);
        fm.refine(hg, &mut metrics, rng);
        let feasible =
            (0..hg.k() as BlockId).all(|b| hg.block_weight(b) <= bounds[b as usize]);
        let better = match &best {
            None => true,
            Some((_, best_metrics, best_feasible)) => {
                (feasible && !best_feasible)
                    || (feasible == *best_feasible
                        && (metrics.objective, metrics.imbalance)
                            < (best_metrics.objective, best_metrics.imbalance))
            }
        };
        if better {
            best = Some((hg.partition(), metrics, feasible));
        }
    }

    let (partition, metrics, _) = best.ok_or_else(|| {
        Error::Internal("initial partitioning produced no candidate".into())
    })?;
    tracing::debug!(
        objective = metrics.objective,
        imbalance = metrics.imbalance,
        "initial partition chosen"
    );
    hg.apply_partition(&partition);
    for memento in mementos.into_iter().rev() {
        hg.uncontract(memento);
    }
    Ok(())
}

fn assign_fixed_vertices(hg: &mut Hypergraph) {
    for v in hg.active_vertices().collect::<Vec<_>>() {
        if let Some(b) = hg.fixed_block(v) {
            hg.set_block(v, b);
        }
    }
}

/// The lightest block that still takes `v`, falling back to the globally
/// lightest one when nothing fits.
fn lightest_feasible(hg: &Hypergraph, weight: VertexWeight, bounds: &[VertexWeight]) -> BlockId {
    let k = hg.k() as BlockId;
    (0..k)
        .filter(|&b| hg.block_weight(b) + weight <= bounds[b as usize])
        .min_by_key(|&b| hg.block_weight(b))
        .unwrap_or_else(|| (0..k).min_by_key(|&b| hg.block_weight(b)).unwrap())
}

fn unassigned_vertices(hg: &Hypergraph, rng: &mut Randomize) -> Vec<VertexId> {
    let mut vertices: Vec<VertexId> =
        hg.active_vertices().filter(|&v| !hg.has_block(v)).collect();
    rng.shuffle(&mut vertices);
    vertices
}

/// Random feasible assignment in shuffled vertex order.
fn random(hg: &mut Hypergraph, bounds: &[VertexWeight], rng: &mut Randomize) {
    let k = hg.k() as BlockId;
    for v in unassigned_vertices(hg, rng) {
        let weight = hg.vertex_weight(v);
        let start = rng.index(k as usize) as BlockId;
        let choice = (0..k)
            .map(|offset| (start + offset) % k)
            .find(|&b| hg.block_weight(b) + weight <= bounds[b as usize])
            .unwrap_or_else(|| lightest_feasible(hg, weight, bounds));
        hg.set_block(v, choice);
    }
}

/// Grows the lightest block breadth-first from random seeds.
fn bfs_growing(hg: &mut Hypergraph, bounds: &[VertexWeight], rng: &mut Randomize) {
    let k = hg.k();
    let n = hg.initial_num_vertices();
    let mut queues: Vec<VecDeque<VertexId>> = vec![VecDeque::new(); k];
    let mut queued = bitvec![0; n];

    let seeds = unassigned_vertices(hg, rng);
    for (b, &seed) in seeds.iter().take(k).enumerate() {
        queues[b].push_back(seed);
        queued.set(seed as usize, true);
    }

    let mut remaining: usize = hg.active_vertices().filter(|&v| !hg.has_block(v)).count();
    while remaining > 0 {
        // always extend the currently lightest block
        let b = (0..k)
            .min_by_key(|&b| hg.block_weight(b as BlockId))
            .unwrap();
        let v = loop {
            match queues[b].pop_front() {
                Some(v) if hg.has_block(v) => continue,
                Some(v) => break Some(v),
                None => break None,
            }
        };
        let v = match v {
            Some(v) => v,
            None => {
                // exhausted frontier: restart from a random unassigned vertex
                let rest = unassigned_vertices(hg, rng);
                let seed = rest[0];
                queues[b].push_back(seed);
                queued.set(seed as usize, true);
                continue;
            }
        };
        let weight = hg.vertex_weight(v);
        let target = if hg.block_weight(b as BlockId) + weight <= bounds[b] {
            b as BlockId
        } else {
            lightest_feasible(hg, weight, bounds)
        };
        hg.set_block(v, target);
        remaining -= 1;
        for u in hg.neighbors(v).collect::<Vec<_>>() {
            if !hg.has_block(u) && !queued[u as usize] {
                queued.set(u as usize, true);
                queues[target as usize].push_back(u);
            }
        }
    }
}

/// Grows blocks by absorbing whole nets off the block frontier.
fn greedy_net(hg: &mut Hypergraph, bounds: &[VertexWeight], rng: &mut Randomize) {
    let k = hg.k();
    let m = hg.num_nets();
    let mut frontiers: Vec<VecDeque<u32>> = vec![VecDeque::new(); k];
    let mut seen = vec![bitvec![0; m]; k];

    let push_nets = |hg: &Hypergraph,
                     v: VertexId,
                     b: usize,
                     frontiers: &mut Vec<VecDeque<u32>>,
                     seen: &mut Vec<BitVec>| {
        for &e in hg.incident_nets(v) {
            if !seen[b][e as usize] {
                seen[b].set(e as usize, true);
                frontiers[b].push_back(e);
            }
        }
    };

    let seeds = unassigned_vertices(hg, rng);
    for (b, &seed) in seeds.iter().take(k).enumerate() {
        if !hg.has_block(seed) {
            hg.set_block(seed, b as BlockId);
            push_nets(hg, seed, b, &mut frontiers, &mut seen);
        }
    }

    loop {
        let Some(b) = (0..k)
            .filter(|&b| !frontiers[b].is_empty())
            .min_by_key(|&b| hg.block_weight(b as BlockId))
        else {
            break;
        };
        let e = frontiers[b].pop_front().unwrap();
        for v in hg.pins(e).to_vec() {
            if hg.has_block(v) {
                continue;
            }
            if hg.block_weight(b as BlockId) + hg.vertex_weight(v) <= bounds[b] {
                hg.set_block(v, b as BlockId);
                push_nets(hg, v, b, &mut frontiers, &mut seen);
            }
        }
    }
    // pins cut off by the weight bound
    for v in unassigned_vertices(hg, rng) {
        let b = lightest_feasible(hg, hg.vertex_weight(v), bounds);
        hg.set_block(v, b);
    }
}

/// Size-constrained label propagation from random seeds: every unassigned
/// vertex joins the feasible block it is most strongly connected to.
fn label_propagation(hg: &mut Hypergraph, bounds: &[VertexWeight], rng: &mut Randomize) {
    let k = hg.k();
    let seeds = unassigned_vertices(hg, rng);
    for (b, &seed) in seeds.iter().take(k).enumerate() {
        if !hg.has_block(seed) {
            hg.set_block(seed, b as BlockId);
        }
    }

    let mut connection = vec![0i64; k];
    loop {
        let order = unassigned_vertices(hg, rng);
        if order.is_empty() {
            break;
        }
        let mut assigned_any = false;
        for v in order {
            if hg.has_block(v) {
                continue;
            }
            connection.fill(0);
            let mut touches_label = false;
            for &e in hg.incident_nets(v) {
                for b in 0..k {
                    if hg.pins_in_block(e, b as BlockId) > 0 {
                        connection[b] += hg.net_weight(e);
                        touches_label = true;
                    }
                }
            }
            if !touches_label {
                continue;
            }
            let weight = hg.vertex_weight(v);
            let choice = (0..k)
                .filter(|&b| hg.block_weight(b as BlockId) + weight <= bounds[b])
                .max_by_key(|&b| connection[b]);
            let b = choice.unwrap_or_else(|| lightest_feasible(hg, weight, bounds) as usize);
            hg.set_block(v, b as BlockId);
            assigned_any = true;
        }
        if !assigned_any {
            // isolated remainder: place it by weight only
            for v in unassigned_vertices(hg, rng) {
                let b = lightest_feasible(hg, hg.vertex_weight(v), bounds);
                hg.set_block(v, b);
            }
        }
    }
}
