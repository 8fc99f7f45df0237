//! The multilevel driver: coarsen, partition the coarsest hypergraph,
//! uncoarsen with local refinement.

use crate::coarsening::coarsen;
use crate::context::{Context, Mode, RefinementScheme};
use crate::error::{Error, Result};
use crate::hypergraph::{BlockId, Hypergraph, VertexId};
use crate::initial::initial_partition;
use crate::metrics::Metrics;
use crate::randomize::Randomize;
use crate::refinement::flow::FlowRefiner;
use crate::refinement::fm_k_way::KWayFm;
use crate::refinement::fm_two_way::TwoWayFm;
use crate::refinement::Refiner;

/// Phases of one multilevel run. Transitions are strictly forward; a failed
/// transition propagates its error and leaves the hypergraph in the state
/// of the preceding phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Built,
    Coarsening,
    InitialPartitioning,
    Uncoarsening,
    Done,
}

/// Computes a balanced k-way partition of a hypergraph.
///
/// The same context, hypergraph and seed always produce the same partition.
#[derive(Debug)]
pub struct Partitioner {
    ctx: Context,
}

impl Partitioner {
    pub fn new(ctx: Context) -> Result<Self> {
        ctx.validate()?;
        Ok(Partitioner { ctx })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// Partitions `hg` in place and returns the final metrics. When no
    /// partition within the balance bound is found, the best one found is
    /// left in the hypergraph and [`Error::Infeasible`] is returned.
    pub fn partition(&self, hg: &mut Hypergraph) -> Result<Metrics> {
        if hg.k() != self.ctx.partition.k {
            return Err(Error::InvalidConfiguration(format!(
                "hypergraph was built for k = {}, context asks for k = {}",
                hg.k(),
                self.ctx.partition.k
            )));
        }
        for v in hg.active_vertices() {
            if let Some(f) = hg.fixed_block(v) {
                if f as usize >= self.ctx.partition.k {
                    return Err(Error::InvalidInput(format!(
                        "vertex {} is fixed to block {} but k = {}",
                        v, f, self.ctx.partition.k
                    )));
                }
            }
        }

        let mut rng = Randomize::with_seed(self.ctx.partition.seed);
        match self.ctx.partition.mode {
            Mode::Direct => {
                multilevel(hg, &self.ctx, &mut rng)?;
                for cycle in 0..self.ctx.partition.vcycles {
                    tracing::info!(cycle, "starting v-cycle");
                    multilevel(hg, &self.ctx, &mut rng)?;
                }
            }
            Mode::RecursiveBisection => recursive_bisection(hg, &self.ctx, &mut rng)?,
        }

        let metrics = Metrics::read(hg, self.ctx.partition.objective);
        let bounds = self.ctx.block_weight_bounds(hg.total_weight());
        let feasible = (0..hg.k()).all(|b| hg.block_weight(b as BlockId) <= bounds[b]);
        tracing::info!(
            objective = metrics.objective,
            imbalance = metrics.imbalance,
            feasible,
            "partitioning finished"
        );
        if !feasible {
            return Err(Error::Infeasible {
                imbalance: metrics.imbalance,
            });
        }
        Ok(metrics)
    }
}

/// One coarsen → initial → uncoarsen pass. A hypergraph entering with a
/// complete partition (v-cycle) keeps it as the starting point and skips
/// initial partitioning.
fn multilevel(hg: &mut Hypergraph, ctx: &Context, rng: &mut Randomize) -> Result<()> {
    let mut mementos = Vec::new();
    let mut phase = Phase::Built;
    while phase != Phase::Done {
        phase = match phase {
            Phase::Built => Phase::Coarsening,
            Phase::Coarsening => {
                mementos = coarsen(hg, ctx, rng);
                Phase::InitialPartitioning
            }
            Phase::InitialPartitioning => {
                let already_partitioned = hg.active_vertices().all(|v| hg.has_block(v));
                if !already_partitioned {
                    initial_partition(hg, ctx, rng)?;
                }
                Phase::Uncoarsening
            }
            Phase::Uncoarsening => {
                uncoarsen(hg, ctx, std::mem::take(&mut mementos), rng);
                Phase::Done
            }
            Phase::Done => unreachable!(),
        };
    }
    Ok(())
}

fn uncoarsen(
    hg: &mut Hypergraph,
    ctx: &Context,
    mementos: Vec<crate::hypergraph::Memento>,
    rng: &mut Randomize,
) {
    let bounds = ctx.block_weight_bounds(hg.total_weight());
    let num_vertices = hg.initial_num_vertices();
    let mut fm: Box<dyn Refiner> = if ctx.partition.k == 2 {
        Box::new(TwoWayFm::new(
            ctx.local_search.fm.clone(),
            bounds,
            num_vertices,
        ))
    } else {
        Box::new(KWayFm::new(
            ctx.local_search.fm.clone(),
            ctx.partition.objective,
            bounds,
            num_vertices,
        ))
    };
    let mut flow = FlowRefiner::new(ctx);
    flow.initialize(hg);

    let mut best = Metrics::read(hg, ctx.partition.objective);
    refine_level(hg, ctx, fm.as_mut(), &mut flow, &mut best, rng);
    for memento in mementos.into_iter().rev() {
        hg.uncontract(memento);
        refine_level(hg, ctx, fm.as_mut(), &mut flow, &mut best, rng);
    }
    debug_assert!(hg.check_pin_counts());
    debug_assert!(hg.check_block_weights());
}

/// Runs the configured refiners on the current level; the combined scheme
/// alternates FM and flow until neither improves.
fn refine_level(
    hg: &mut Hypergraph,
    ctx: &Context,
    fm: &mut dyn Refiner,
    flow: &mut FlowRefiner,
    best: &mut Metrics,
    rng: &mut Randomize,
) {
    match ctx.local_search.scheme {
        RefinementScheme::Fm => {
            for _ in 0..ctx.local_search.runs.max(1) {
                if !fm.refine(hg, best, rng) {
                    break;
                }
            }
        }
        RefinementScheme::Flow => {
            flow.refine(hg, best, rng);
        }
        RefinementScheme::FmFlow => {
            let run_flow = flow.plan_level(hg);
            loop {
                let mut fm_improved = false;
                for _ in 0..ctx.local_search.runs.max(1) {
                    if fm.refine(hg, best, rng) {
                        fm_improved = true;
                    } else {
                        break;
                    }
                }
                let flow_improved =
                    run_flow && flow.refine_ignoring_policy(hg, best, rng);
                if !fm_improved && !flow_improved {
                    break;
                }
            }
        }
    }
}

/// Splits k into ⌈k/2⌉ and ⌊k/2⌋, bisects, extracts both sides and
/// recurses; leaf calls write the final block into `assignment`.
fn recursive_bisection(hg: &mut Hypergraph, ctx: &Context, rng: &mut Randomize) -> Result<()> {
    let n = hg.initial_num_vertices();
    let mut assignment: Vec<BlockId> = vec![0; n];
    let (mut top, identity) = reshape_for_bisection(hg)?;
    bisect(
        &mut top,
        &identity,
        hg,
        ctx,
        0,
        ctx.partition.k,
        rng,
        &mut assignment,
    )?;

    hg.reset_partition();
    for v in hg.active_vertices().collect::<Vec<_>>() {
        hg.set_block(v, assignment[v as usize]);
    }
    Ok(())
}

/// A structural copy of the hypergraph with two blocks and no partition.
fn reshape_for_bisection(hg: &Hypergraph) -> Result<(Hypergraph, Vec<VertexId>)> {
    let n = hg.initial_num_vertices();
    let pin_lists: Vec<Vec<VertexId>> = hg.nets_iter().map(|e| hg.pins(e).to_vec()).collect();
    let vertex_weights = (0..n as u32).map(|v| hg.vertex_weight(v)).collect();
    let net_weights = hg.nets_iter().map(|e| hg.net_weight(e)).collect();
    let mut copy = Hypergraph::new(2, vertex_weights, net_weights, &pin_lists)?;
    copy.assign_communities((0..n as u32).map(|v| hg.community(v)).collect());
    Ok((copy, (0..n as u32).collect()))
}

#[allow(clippy::too_many_arguments)]
fn bisect(
    sub: &mut Hypergraph,
    to_original: &[VertexId],
    original: &Hypergraph,
    ctx: &Context,
    offset: usize,
    k: usize,
    rng: &mut Randomize,
    assignment: &mut [BlockId],
) -> Result<()> {
    if sub.num_active_vertices() == 0 {
        return Ok(());
    }
    if k == 1 {
        for v in sub.active_vertices() {
            assignment[to_original[v as usize] as usize] = offset as BlockId;
        }
        return Ok(());
    }
    let k0 = k.div_ceil(2);
    let k1 = k - k0;

    // route declared blocks to the side that will contain them
    for v in sub.active_vertices().collect::<Vec<_>>() {
        if let Some(f) = original.fixed_block(to_original[v as usize]) {
            let side = if (f as usize) < offset + k0 { 0 } else { 1 };
            sub.fix_vertex(v, side);
        }
    }

    let bisection_ctx = bisection_context(ctx, sub.total_weight(), k, k0, k1);
    multilevel(sub, &bisection_ctx, rng)?;

    for (side, (side_k, side_offset)) in [(0u32, (k0, offset)), (1u32, (k1, offset + k0))] {
        if side_k == 1 {
            for v in sub.active_vertices() {
                if sub.block(v) == side {
                    assignment[to_original[v as usize] as usize] = side_offset as BlockId;
                }
            }
        } else {
            let (mut half, half_map) = sub.extract_block(side, 2)?;
            let half_to_original: Vec<VertexId> = half_map
                .iter()
                .map(|&v| to_original[v as usize])
                .collect();
            bisect(
                &mut half,
                &half_to_original,
                original,
                ctx,
                side_offset,
                side_k,
                rng,
                assignment,
            )?;
        }
    }
    Ok(())
}

/// Context of one bisection: two blocks with weight targets proportional to
/// the block counts of each side and ε reduced so the slack does not
/// compound over the recursion depth.
fn bisection_context(ctx: &Context, total: i64, k: usize, k0: usize, k1: usize) -> Context {
    let mut c = ctx.clone();
    c.partition.k = 2;
    c.partition.mode = Mode::Direct;
    c.partition.vcycles = 0;
    let depth = (ctx.partition.k as f64).log2().ceil().max(1.0);
    let epsilon = (1.0 + ctx.partition.epsilon).powf(1.0 / depth) - 1.0;
    c.partition.epsilon = epsilon;
    let target = |count: usize| (total * count as i64 + k as i64 - 1) / k as i64;
    let bound = |t: i64| (((1.0 + epsilon) * t as f64) as i64).max(t);
    c.partition.individual_block_weights = vec![bound(target(k0)), bound(target(k1))];
    c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Mode, Objective};
    use crate::metrics::{hyperedge_cut, imbalance};

    /// The hypergraph from the hMetis manual: weights force nets 1 and 3 to
    /// stay uncut.
    fn hmetis_example() -> Hypergraph {
        let pins = vec![vec![0, 2], vec![0, 1, 3, 4], vec![3, 4, 6], vec![2, 5, 6]];
        Hypergraph::new(2, vec![1; 7], vec![1, 1000, 1, 1000], &pins).unwrap()
    }

    #[test]
    fn partitions_the_hmetis_example_optimally() {
        let mut ctx = Context::new(2, 0.03, Objective::Cut, Mode::Direct);
        ctx.partition.seed = 42;
        let partitioner = Partitioner::new(ctx).unwrap();
        let mut hg = hmetis_example();
        let metrics = partitioner.partition(&mut hg).unwrap();
        assert_eq!(metrics.objective, 2);
        assert_eq!(hyperedge_cut(&hg), 2);
        // the heavy nets group {0,1,3,4} and {2,5,6}
        let b = hg.block(0);
        for v in [1, 3, 4] {
            assert_eq!(hg.block(v), b);
        }
        let other = hg.block(2);
        assert_ne!(other, b);
        for v in [5, 6] {
            assert_eq!(hg.block(v), other);
        }
    }

    #[test]
    fn same_seed_reproduces_the_partition() {
        for mode in [Mode::Direct, Mode::RecursiveBisection] {
            let mut ctx = Context::new(2, 0.1, Objective::Cut, mode);
            ctx.partition.seed = 7;
            let partitioner = Partitioner::new(ctx).unwrap();
            let mut first = hmetis_example();
            let mut second = hmetis_example();
            partitioner.partition(&mut first).unwrap();
            partitioner.partition(&mut second).unwrap();
            assert_eq!(first.partition(), second.partition(), "{:?}", mode);
        }
    }

    fn random_hypergraph(seed: u64, n: usize, m: usize, k: usize) -> Hypergraph {
        let mut rng = Randomize::with_seed(seed);
        let pins: Vec<Vec<VertexId>> = (0..m)
            .map(|_| {
                let size = 2 + rng.index(3);
                let mut net: Vec<VertexId> = Vec::new();
                while net.len() < size {
                    let v = rng.index(n) as VertexId;
                    if !net.contains(&v) {
                        net.push(v);
                    }
                }
                net
            })
            .collect();
        Hypergraph::unweighted(k, n, &pins).unwrap()
    }

    #[test]
    fn direct_mode_respects_the_balance_bound() {
        for seed in 0..4 {
            let mut ctx = Context::new(4, 0.1, Objective::Km1, Mode::Direct);
            ctx.partition.seed = seed;
            ctx.coarsening.contraction_limit_multiplier = 4;
            ctx.initial.runs = 8;
            let partitioner = Partitioner::new(ctx).unwrap();
            let mut hg = random_hypergraph(seed, 64, 96, 4);
            match partitioner.partition(&mut hg) {
                Ok(metrics) => {
                    let max = partitioner.ctx.max_block_weight(hg.total_weight());
                    for b in 0..4 {
                        assert!(hg.block_weight(b) <= max);
                    }
                    assert!(metrics.imbalance <= partitioner.ctx.partition.epsilon + 1e-9);
                }
                Err(Error::Infeasible { imbalance }) => {
                    // reported with the best partition left in place
                    assert!(imbalance > partitioner.ctx.partition.epsilon);
                }
                Err(err) => panic!("unexpected error: {}", err),
            }
            assert!(hg.check_pin_counts());
            assert!(hg.check_block_weights());
        }
    }

    #[test]
    fn recursive_mode_covers_all_blocks() {
        let mut ctx = Context::new(3, 0.2, Objective::Cut, Mode::RecursiveBisection);
        ctx.partition.seed = 3;
        ctx.coarsening.contraction_limit_multiplier = 4;
        ctx.initial.runs = 8;
        let partitioner = Partitioner::new(ctx).unwrap();
        let mut hg = random_hypergraph(11, 48, 72, 3);
        partitioner.partition(&mut hg).unwrap();
        for v in hg.active_vertices() {
            assert!((hg.block(v) as usize) < 3);
        }
        let bounds = partitioner.ctx.block_weight_bounds(hg.total_weight());
        for b in 0..3u32 {
            assert!(hg.block_weight(b) <= bounds[b as usize]);
        }
    }

    #[test]
    fn fixed_vertices_end_up_in_their_blocks() {
        for mode in [Mode::Direct, Mode::RecursiveBisection] {
            let mut ctx = Context::new(3, 0.3, Objective::Km1, mode);
            ctx.partition.seed = 5;
            ctx.coarsening.contraction_limit_multiplier = 4;
            let partitioner = Partitioner::new(ctx).unwrap();
            let mut hg = random_hypergraph(2, 32, 48, 3);
            hg.fix_vertex(0, 2);
            hg.fix_vertex(7, 0);
            hg.fix_vertex(21, 1);
            match partitioner.partition(&mut hg) {
                Ok(_) | Err(Error::Infeasible { .. }) => {}
                Err(err) => panic!("unexpected error: {}", err),
            }
            assert_eq!(hg.block(0), 2, "{:?}", mode);
            assert_eq!(hg.block(7), 0, "{:?}", mode);
            assert_eq!(hg.block(21), 1, "{:?}", mode);
        }
    }

    #[test]
    fn v_cycles_never_worsen_the_objective() {
        // the first multilevel pass of both runs is identical (same seed),
        // every later cycle starts from its result and only improves
        let finished = |outcome: Result<Metrics>, hg: &Hypergraph| match outcome {
            Ok(metrics) => metrics.objective,
            Err(Error::Infeasible { .. }) => crate::metrics::hyperedge_cut(hg),
            Err(err) => panic!("unexpected error: {}", err),
        };

        let mut base = Context::new(2, 0.1, Objective::Cut, Mode::Direct);
        base.partition.seed = 9;
        base.coarsening.contraction_limit_multiplier = 4;
        let mut plain_hg = random_hypergraph(4, 40, 60, 2);
        let plain = Partitioner::new(base.clone()).unwrap();
        let plain_cut = finished(plain.partition(&mut plain_hg), &plain_hg);

        let mut cycled = base;
        cycled.partition.vcycles = 2;
        let mut cycled_hg = random_hypergraph(4, 40, 60, 2);
        let cycled_cut = finished(
            Partitioner::new(cycled).unwrap().partition(&mut cycled_hg),
            &cycled_hg,
        );
        assert!(cycled_cut <= plain_cut);
        assert!(cycled_hg.check_pin_counts());
        assert!(cycled_hg.check_block_weights());
    }

    #[test]
    fn combined_fm_flow_produces_a_feasible_partition() {
        for scheme in [RefinementScheme::Flow, RefinementScheme::FmFlow] {
            let mut ctx = Context::new(2, 0.2, Objective::Cut, Mode::Direct);
            ctx.partition.seed = 13;
            ctx.coarsening.contraction_limit_multiplier = 4;
            ctx.local_search.scheme = scheme;
            let mut hg = random_hypergraph(8, 40, 60, 2);
            match Partitioner::new(ctx).unwrap().partition(&mut hg) {
                Ok(metrics) => {
                    assert_eq!(metrics.objective, hyperedge_cut(&hg), "{:?}", scheme)
                }
                Err(Error::Infeasible { .. }) => {}
                Err(err) => panic!("unexpected error: {}", err),
            }
            assert!(hg.check_pin_counts());
            assert!(hg.check_block_weights());
        }
    }

    #[test]
    fn imbalance_stays_within_epsilon_for_small_epsilon() {
        let mut ctx = Context::new(2, 0.03, Objective::Cut, Mode::Direct);
        ctx.partition.seed = 1;
        ctx.coarsening.contraction_limit_multiplier = 8;
        let partitioner = Partitioner::new(ctx).unwrap();
        let mut hg = random_hypergraph(6, 50, 80, 2);
        match partitioner.partition(&mut hg) {
            Ok(metrics) => {
                assert!(metrics.imbalance <= 0.03 + 1e-9);
                assert!((imbalance(&hg) - metrics.imbalance).abs() < 1e-12);
            }
            Err(Error::Infeasible { .. }) => {
                // reported, with the best attempt left in place
                assert!(hg.active_vertices().all(|v| hg.has_block(v)));
            }
            Err(err) => panic!("unexpected error: {}", err),
        }
    }
}
