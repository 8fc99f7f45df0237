use bitvec::prelude::*;
use ordered_float::OrderedFloat;

use crate::context::{
    AcceptancePolicy, Context, FixedVertexAcceptance, HeavyVertexPenalty, RatingScore,
};
use crate::hypergraph::{Hypergraph, VertexId, VertexWeight};
use crate::randomize::Randomize;

/// Scores contraction partners of a vertex under the configured policies.
///
/// Holds reusable scratch so rating a vertex allocates nothing: net
/// contributions are accumulated per candidate in a dense array whose
/// touched entries are reset afterwards.
pub(crate) struct Rater {
    scores: Vec<f64>,
    touched: Vec<VertexId>,
    ties: Vec<VertexId>,
}

impl Rater {
    pub fn new(num_vertices: usize) -> Self {
        Rater {
            scores: vec![0.0; num_vertices],
            touched: Vec::new(),
            ties: Vec::new(),
        }
    }

    /// Returns the best-rated eligible partner of `u`, or `None` if no
    /// neighbour may be contracted with it.
    pub fn best_partner(
        &mut self,
        hg: &Hypergraph,
        ctx: &Context,
        u: VertexId,
        max_weight: VertexWeight,
        matched: &BitVec,
        rng: &mut Randomize,
    ) -> Option<VertexId> {
        let rating = &ctx.coarsening.rating;
        for &e in hg.incident_nets(u) {
            let size = hg.net_size(e);
            if size < 2 {
                continue;
            }
            if let Some(limit) = ctx.partition.max_net_size {
                if size > limit {
                    continue;
                }
            }
            let mut term = hg.net_weight(e) as f64 / (size - 1) as f64;
            if rating.score == RatingScore::EdgeFrequency {
                if let Some(freq) = ctx.edge_frequencies.get(e as usize) {
                    term *= 1.0 + freq;
                }
            }
            for &p in hg.pins(e) {
                if p == u {
                    continue;
                }
                if self.scores[p as usize] == 0.0 {
                    self.touched.push(p);
                }
                self.scores[p as usize] += term;
            }
        }

        let mut best = f64::NEG_INFINITY;
        let mut best_unmatched = false;
        self.ties.clear();
        for i in 0..self.touched.len() {
            let v = self.touched[i];
            if !eligible(hg, ctx, u, v, max_weight) {
                continue;
            }
            let mut score = self.scores[v as usize];
            if rating.penalty == HeavyVertexPenalty::Multiplicative {
                score /= (hg.vertex_weight(u) as f64 * hg.vertex_weight(v) as f64).sqrt();
            }
            let unmatched = !matched[v as usize];
            // prefer-unmatched only breaks exact score ties
            let wins = OrderedFloat(score) > OrderedFloat(best)
                || (score == best
                    && rating.acceptance == AcceptancePolicy::BestPreferUnmatched
                    && unmatched
                    && !best_unmatched);
            let ties = score == best
                && match rating.acceptance {
                    AcceptancePolicy::BestChoice => true,
                    AcceptancePolicy::BestPreferUnmatched => unmatched == best_unmatched,
                };
            if wins {
                best = score;
                best_unmatched = unmatched;
                self.ties.clear();
                self.ties.push(v);
            } else if ties {
                self.ties.push(v);
            }
        }

        for &v in &self.touched {
            self.scores[v as usize] = 0.0;
        }
        self.touched.clear();

        if self.ties.is_empty() {
            None
        } else {
            Some(self.ties[rng.index(self.ties.len())])
        }
    }
}

fn eligible(
    hg: &Hypergraph,
    ctx: &Context,
    u: VertexId,
    v: VertexId,
    max_weight: VertexWeight,
) -> bool {
    if hg.vertex_weight(u) + hg.vertex_weight(v) > max_weight {
        return false;
    }
    if ctx.coarsening.rating.use_communities && hg.community(u) != hg.community(v) {
        return false;
    }
    // inside a v-cycle both endpoints carry blocks and must agree
    if hg.has_block(u) && hg.has_block(v) && hg.block(u) != hg.block(v) {
        return false;
    }
    match ctx.coarsening.rating.fixed_vertex_acceptance {
        FixedVertexAcceptance::FreeOnly => !hg.is_fixed(u) && !hg.is_fixed(v),
        FixedVertexAcceptance::FixedAndFree => match (hg.fixed_block(u), hg.fixed_block(v)) {
            (Some(a), Some(b)) => a == b,
            _ => true,
        },
        FixedVertexAcceptance::EquivalentOnly => match (hg.fixed_block(u), hg.fixed_block(v)) {
            (Some(a), Some(b)) => a == b,
            (None, None) => true,
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Mode, Objective};

    fn ctx() -> Context {
        Context::new(2, 0.03, Objective::Cut, Mode::Direct)
    }

    fn rng() -> Randomize {
        Randomize::with_seed(3)
    }

    #[test]
    fn prefers_partner_behind_heavier_nets() {
        // {0,1} of weight 10 and {0,2} of weight 1
        let hg =
            Hypergraph::new(2, vec![1, 1, 1], vec![10, 1], &[vec![0, 1], vec![0, 2]]).unwrap();
        let mut rater = Rater::new(3);
        let matched = bitvec![0; 3];
        let v = rater
            .best_partner(&hg, &ctx(), 0, i64::MAX, &matched, &mut rng())
            .unwrap();
        assert_eq!(v, 1);
    }

    #[test]
    fn heavy_vertex_penalty_steers_to_light_partner() {
        // same net weights, but vertex 1 is much heavier than vertex 2
        let hg = Hypergraph::new(
            2,
            vec![1, 100, 1],
            vec![1, 1],
            &[vec![0, 1], vec![0, 2]],
        )
        .unwrap();
        let mut rater = Rater::new(3);
        let matched = bitvec![0; 3];
        let v = rater
            .best_partner(&hg, &ctx(), 0, i64::MAX, &matched, &mut rng())
            .unwrap();
        assert_eq!(v, 2);
    }

    #[test]
    fn respects_weight_bound() {
        let hg = Hypergraph::new(2, vec![3, 3], vec![1], &[vec![0, 1]]).unwrap();
        let mut rater = Rater::new(2);
        let matched = bitvec![0; 2];
        assert!(rater
            .best_partner(&hg, &ctx(), 0, 5, &matched, &mut rng())
            .is_none());
        assert!(rater
            .best_partner(&hg, &ctx(), 0, 6, &matched, &mut rng())
            .is_some());
    }

    #[test]
    fn community_policy_restricts_partners() {
        let mut c = ctx();
        c.coarsening.rating.use_communities = true;
        let mut hg = Hypergraph::unweighted(2, 3, &[vec![0, 1], vec![0, 2]]).unwrap();
        hg.assign_communities(vec![7, 7, 9]);
        let mut rater = Rater::new(3);
        let matched = bitvec![0; 3];
        let v = rater
            .best_partner(&hg, &c, 0, i64::MAX, &matched, &mut rng())
            .unwrap();
        assert_eq!(v, 1);
    }

    #[test]
    fn free_only_policy_skips_fixed_vertices() {
        let mut hg = Hypergraph::unweighted(2, 3, &[vec![0, 1], vec![0, 2]]).unwrap();
        hg.fix_vertex(1, 0);
        let mut rater = Rater::new(3);
        let matched = bitvec![0; 3];
        let v = rater
            .best_partner(&hg, &ctx(), 0, i64::MAX, &matched, &mut rng())
            .unwrap();
        assert_eq!(v, 2);
    }

    #[test]
    fn equivalent_policy_pairs_same_target_block() {
        let mut c = ctx();
        c.coarsening.rating.fixed_vertex_acceptance = FixedVertexAcceptance::EquivalentOnly;
        let mut hg = Hypergraph::unweighted(2, 3, &[vec![0, 1], vec![0, 2]]).unwrap();
        hg.fix_vertex(0, 1);
        hg.fix_vertex(1, 0);
        hg.fix_vertex(2, 1);
        let mut rater = Rater::new(3);
        let matched = bitvec![0; 3];
        let v = rater
            .best_partner(&hg, &c, 0, i64::MAX, &matched, &mut rng())
            .unwrap();
        assert_eq!(v, 2);
    }
}
