//! Multilevel coarsening: contract rated vertex pairs until the hypergraph
//! is small enough for initial partitioning.
//!
//! All schemes share the rating machinery of [`rating::Rater`] and the
//! maximum vertex weight `s·W(V)/(t·k)`; they differ in how candidate pairs
//! are scheduled. The produced contraction stack is replayed in reverse by
//! the uncoarsening phase.

pub(crate) mod rating;

use std::collections::BinaryHeap;

use bitvec::prelude::*;
use ordered_float::OrderedFloat;

use crate::context::{CoarseningScheme, Context};
use crate::hypergraph::{Hypergraph, Memento, VertexId, VertexWeight};
use crate::randomize::Randomize;
use rating::Rater;

/// `t·k`: coarsening stops at this many active vertices.
pub fn contraction_limit(ctx: &Context) -> usize {
    ctx.coarsening.contraction_limit_multiplier * ctx.partition.k
}

/// `s·W(V)/(t·k)`, the heaviest vertex any contraction may produce.
pub fn max_allowed_vertex_weight(ctx: &Context, total_weight: VertexWeight) -> VertexWeight {
    let limit = contraction_limit(ctx) as f64;
    let bound = ctx.coarsening.max_allowed_weight_multiplier * total_weight as f64 / limit;
    (bound.ceil() as VertexWeight).max(1)
}

/// Runs the configured coarsening scheme and returns the contraction stack.
pub fn coarsen(hg: &mut Hypergraph, ctx: &Context, rng: &mut Randomize) -> Vec<Memento> {
    let limit = contraction_limit(ctx);
    let max_weight = max_allowed_vertex_weight(ctx, hg.total_weight());
    let before = hg.num_active_vertices();
    let mementos = match ctx.coarsening.scheme {
        CoarseningScheme::MlStyle => ml_style(hg, ctx, limit, max_weight, rng),
        CoarseningScheme::HeavyLazy => heavy_lazy(hg, ctx, limit, max_weight, rng),
        CoarseningScheme::HeavyFull => heavy_full(hg, ctx, limit, max_weight, rng),
    };
    tracing::debug!(
        scheme = %ctx.coarsening.scheme,
        from = before,
        to = hg.num_active_vertices(),
        "coarsening done"
    );
    mementos
}

/// Orients a contraction so the store's fixed-vertex invariant holds: a
/// fixed representative may absorb a free vertex, never the other way round.
fn contract_oriented(
    hg: &mut Hypergraph,
    u: VertexId,
    v: VertexId,
    mementos: &mut Vec<Memento>,
) {
    if hg.is_fixed(v) && !hg.is_fixed(u) {
        mementos.push(hg.contract(v, u));
    } else {
        mementos.push(hg.contract(u, v));
    }
}

/// Visits the active vertices in pseudorandom order and contracts each with
/// its best-rated neighbour; repeats passes until the contraction limit is
/// reached or a pass finds no eligible pair.
fn ml_style(
    hg: &mut Hypergraph,
    ctx: &Context,
    limit: usize,
    max_weight: VertexWeight,
    rng: &mut Randomize,
) -> Vec<Memento> {
    let n = hg.initial_num_vertices();
    let mut rater = Rater::new(n);
    let mut mementos = Vec::new();
    let mut order: Vec<VertexId> = Vec::with_capacity(n);

    while hg.num_active_vertices() > limit {
        order.clear();
        order.extend(hg.active_vertices());
        rng.shuffle(&mut order);
        let mut matched = bitvec![0; n];
        let mut contracted = false;

        for i in 0..order.len() {
            if hg.num_active_vertices() <= limit {
                break;
            }
            let u = order[i];
            if !hg.is_enabled(u) || matched[u as usize] {
                continue;
            }
            if let Some(v) = rater.best_partner(hg, ctx, u, max_weight, &matched, rng) {
                matched.set(u as usize, true);
                matched.set(v as usize, true);
                contract_oriented(hg, u, v, &mut mementos);
                contracted = true;
            }
        }
        if !contracted {
            break;
        }
    }
    mementos
}

/// Priority-queue driven coarsening; entries are rescored only once they are
/// popped stale.
fn heavy_lazy(
    hg: &mut Hypergraph,
    ctx: &Context,
    limit: usize,
    max_weight: VertexWeight,
    rng: &mut Randomize,
) -> Vec<Memento> {
    let n = hg.initial_num_vertices();
    let mut rater = Rater::new(n);
    let matched = bitvec![0; n];
    let mut pq: BinaryHeap<(OrderedFloat<f64>, (VertexId, VertexId))> = BinaryHeap::new();

    for u in hg.active_vertices().collect::<Vec<_>>() {
        if let Some(v) = rater.best_partner(hg, ctx, u, max_weight, &matched, rng) {
            pq.push((OrderedFloat(pair_score(hg, ctx, u, v)), (u, v)));
        }
    }

    let mut stale = bitvec![0; n];
    let mut mementos = Vec::new();
    while hg.num_active_vertices() > limit {
        let Some((_, (u, v))) = pq.pop() else {
            break;
        };
        if !hg.is_enabled(u) {
            continue;
        }
        if stale[u as usize] || !hg.is_enabled(v) {
            stale.set(u as usize, false);
            if let Some(v) = rater.best_partner(hg, ctx, u, max_weight, &matched, rng) {
                pq.push((OrderedFloat(pair_score(hg, ctx, u, v)), (u, v)));
            }
            continue;
        }
        contract_oriented(hg, u, v, &mut mementos);
        for w in hg.neighbors(u).collect::<Vec<_>>() {
            stale.set(w as usize, true);
        }
        if let Some(v) = rater.best_partner(hg, ctx, u, max_weight, &matched, rng) {
            pq.push((OrderedFloat(pair_score(hg, ctx, u, v)), (u, v)));
        }
    }
    mementos
}

/// Rescans every active vertex after each contraction and contracts the
/// globally best-rated pair.
fn heavy_full(
    hg: &mut Hypergraph,
    ctx: &Context,
    limit: usize,
    max_weight: VertexWeight,
    rng: &mut Randomize,
) -> Vec<Memento> {
    let n = hg.initial_num_vertices();
    let mut rater = Rater::new(n);
    let matched = bitvec![0; n];
    let mut mementos = Vec::new();

    while hg.num_active_vertices() > limit {
        let mut best: Option<(f64, VertexId, VertexId)> = None;
        for u in hg.active_vertices().collect::<Vec<_>>() {
            if let Some(v) = rater.best_partner(hg, ctx, u, max_weight, &matched, rng) {
                let score = pair_score(hg, ctx, u, v);
                if best.map_or(true, |(s, _, _)| score > s) {
                    best = Some((score, u, v));
                }
            }
        }
        let Some((_, u, v)) = best else {
            break;
        };
        contract_oriented(hg, u, v, &mut mementos);
    }
    mementos
}

/// Score of a concrete pair, used to key the heavy-lazy/heavy-full queues.
fn pair_score(hg: &Hypergraph, ctx: &Context, u: VertexId, v: VertexId) -> f64 {
    use crate::context::{HeavyVertexPenalty, RatingScore};
    let mut score = 0.0;
    for &e in hg.incident_nets(u) {
        let size = hg.net_size(e);
        if size < 2 {
            continue;
        }
        if let Some(max) = ctx.partition.max_net_size {
            if size > max {
                continue;
            }
        }
        if hg.pins(e).contains(&v) {
            let mut term = hg.net_weight(e) as f64 / (size - 1) as f64;
            if ctx.coarsening.rating.score == RatingScore::EdgeFrequency {
                if let Some(freq) = ctx.edge_frequencies.get(e as usize) {
                    term *= 1.0 + freq;
                }
            }
            score += term;
        }
    }
    if ctx.coarsening.rating.penalty == HeavyVertexPenalty::Multiplicative {
        score /= (hg.vertex_weight(u) as f64 * hg.vertex_weight(v) as f64).sqrt();
    }
    score
}
