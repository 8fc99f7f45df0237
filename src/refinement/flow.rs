//! Max-flow/min-cut refinement of block pairs.
//!
//! For a scheduled block pair, a bounded region around the cut is extracted
//! into a flow network, a maximum flow is computed, and the induced
//! bipartition replaces the current one when it improves the objective (or
//! matches it while improving the imbalance). Pairs are scheduled
//! round-robin over the quotient graph until a full pass brings no
//! improvement.

pub(crate) mod maximum_flow;
pub(crate) mod most_balanced;
pub(crate) mod network;
pub(crate) mod quotient_graph;

use crate::context::{Context, FlowExecution};
use crate::hypergraph::{BlockId, Hypergraph, NetId, VertexId};
use crate::metrics::Metrics;
use crate::randomize::Randomize;
use crate::refinement::Refiner;
use network::build_flow_problem;
use quotient_graph::QuotientGraph;

/// Cut weight below which a pair is skipped on non-final levels.
const SMALL_CUT: i64 = 10;

#[derive(Debug)]
pub struct FlowRefiner {
    ctx: Context,
    /// Vertex counts at which a refinement pass runs, largest last; popped
    /// as uncoarsening proceeds.
    execution_levels: Vec<usize>,
    /// Bypass the execution policy (used by the combined FM+flow schedule).
    ignore_execution_policy: bool,
}

impl FlowRefiner {
    pub fn new(ctx: &Context) -> Self {
        FlowRefiner {
            ctx: ctx.clone(),
            execution_levels: Vec::new(),
            ignore_execution_policy: false,
        }
    }

    /// Plans the uncoarsening levels at which flow refinement runs, from
    /// the current (coarse) vertex count up to the initial one.
    pub fn initialize(&mut self, hg: &Hypergraph) {
        let current = hg.num_active_vertices();
        let initial = hg.initial_num_vertices();
        let mut levels = Vec::new();
        match self.ctx.local_search.flow.execution {
            FlowExecution::Constant => {
                let beta = self.ctx.local_search.flow.beta.max(1);
                let mut level = current + 1;
                while level < initial {
                    levels.push(level);
                    level += beta;
                }
                levels.push(initial);
            }
            FlowExecution::Exponential => {
                let mut step = 1;
                while current + step < initial {
                    levels.push(current + step);
                    step *= 2;
                }
                levels.push(initial);
            }
            FlowExecution::Multilevel => {
                let mut level = initial;
                while level >= current.max(1) {
                    levels.push(level);
                    if level == 0 {
                        break;
                    }
                    level /= 2;
                }
            }
        }
        levels.sort_unstable();
        levels.dedup();
        self.execution_levels = levels;
    }

    /// Consults (and consumes) the execution plan for the current level.
    pub fn plan_level(&mut self, hg: &Hypergraph) -> bool {
        if self.ignore_execution_policy {
            return true;
        }
        match self.execution_levels.first() {
            None => false,
            Some(&level) => {
                if hg.num_active_vertices() >= level {
                    self.execution_levels.remove(0);
                    true
                } else {
                    false
                }
            }
        }
    }

    /// One full scheduling round regardless of the execution policy; used
    /// by the combined FM+flow schedule once the policy has fired.
    pub fn refine_ignoring_policy(
        &mut self,
        hg: &mut Hypergraph,
        best: &mut Metrics,
        rng: &mut Randomize,
    ) -> bool {
        let before = self.ignore_execution_policy;
        self.ignore_execution_policy = true;
        let improved = self.refine(hg, best, rng);
        self.ignore_execution_policy = before;
        improved
    }

    fn is_top_level(&self, hg: &Hypergraph) -> bool {
        hg.num_active_vertices() == hg.initial_num_vertices()
    }

    /// Adaptive-α refinement of one block pair. Returns whether any pass
    /// was committed.
    fn refine_pair(
        &mut self,
        hg: &mut Hypergraph,
        qg: &mut QuotientGraph,
        b0: BlockId,
        b1: BlockId,
        best: &mut Metrics,
        rng: &mut Randomize,
    ) -> bool {
        let flow_config = self.ctx.local_search.flow.clone();
        let objective = self.ctx.partition.objective;
        let bounds = self.ctx.block_weight_bounds(hg.total_weight());
        let pair_bounds = [bounds[b0 as usize], bounds[b1 as usize]];
        let alpha_cap = flow_config.alpha * 16.0;
        let mut alpha = flow_config.alpha;
        let mut improvement = false;

        loop {
            let mut cut_nets: Vec<NetId> = qg.cut_nets(b0, b1).iter().copied().collect();
            if cut_nets.is_empty() {
                break;
            }
            let cut_weight: i64 = cut_nets.iter().map(|&e| hg.net_weight(e)).sum();
            if flow_config.ignore_small_net_cut
                && cut_weight <= SMALL_CUT
                && !self.is_top_level(hg)
            {
                return false;
            }
            cut_nets.sort_unstable();
            rng.shuffle(&mut cut_nets);

            let Some(mut problem) = build_flow_problem(hg, &self.ctx, b0, b1, &cut_nets, alpha)
            else {
                break;
            };
            let flow = maximum_flow::maximum_flow(flow_config.algorithm, &mut problem.network);
            debug_assert!(flow <= problem.cut_before);

            let to_b0 = most_balanced::assign_region(
                &problem.network,
                &problem,
                hg,
                b0,
                b1,
                pair_bounds,
                flow_config.use_most_balanced_minimum_cut,
            );

            let mut moved: Vec<(VertexId, BlockId, BlockId)> = Vec::new();
            for (i, &v) in problem.vertices.iter().enumerate() {
                let target = if to_b0[i] { b0 } else { b1 };
                let from = hg.block(v);
                if from != target {
                    qg.change_block(hg, v, from, target);
                    moved.push((v, from, target));
                }
            }

            let current = Metrics::read(hg, objective);
            let feasible = (0..hg.k())
                .all(|b| hg.block_weight(b as BlockId) <= bounds[b]);
            let improved_metric = current.objective < best.objective;
            let equal_metric = current.objective == best.objective;
            let improved_imbalance = current.imbalance < best.imbalance;
            let accept = (improved_metric && (feasible || improved_imbalance))
                || (equal_metric && improved_imbalance);

            if accept {
                tracing::debug!(
                    b0,
                    b1,
                    alpha,
                    objective = current.objective,
                    "flow refinement committed"
                );
                *best = current;
                improvement = true;
                if alpha >= alpha_cap {
                    break;
                }
                alpha *= 2.0;
                continue;
            }

            for &(v, from, target) in moved.iter().rev() {
                qg.change_block(hg, v, target, from);
            }
            if flow_config.use_adaptive_alpha_stopping_rule
                && !improvement
                && flow == problem.cut_before
            {
                break;
            }
            if alpha >= alpha_cap {
                break;
            }
            alpha *= 2.0;
        }
        improvement
    }
}

impl Refiner for FlowRefiner {
    fn refine(&mut self, hg: &mut Hypergraph, best: &mut Metrics, rng: &mut Randomize) -> bool {
        if !self.plan_level(hg) {
            return false;
        }
        let mut qg = QuotientGraph::new(hg);
        let mut improved = false;
        loop {
            let mut pass_improved = false;
            for (b0, b1) in qg.active_pairs() {
                if self.refine_pair(hg, &mut qg, b0, b1, best, rng) {
                    pass_improved = true;
                }
            }
            if !pass_improved {
                break;
            }
            improved = true;
        }
        debug_assert!(hg.check_pin_counts());
        improved
    }
}
