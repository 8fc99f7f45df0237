//! k-way Fiduccia–Mattheyses refinement.
//!
//! Each border vertex carries one queue entry per adjacent block (at most
//! k−1). Gains are kept exact through the same pin-count transition rules
//! as the 2-way refiner, generalised to per-target entries: a transition on
//! the source block of a move touches either the single pin left behind or
//! every pin's entry towards that block, symmetrically for the target
//! block.

use crate::context::{FmConfig, Objective};
use crate::datastructure::{FastResetBitset, KWayGainQueue};
use crate::hypergraph::{BlockId, Gain, Hypergraph, VertexId, VertexWeight};
use crate::metrics::{imbalance, Metrics};
use crate::randomize::Randomize;
use crate::refinement::stopping::StoppingRule;
use crate::refinement::{rollback, Move, Refiner};

#[derive(Debug)]
pub struct KWayFm {
    config: FmConfig,
    objective: Objective,
    max_block_weights: Vec<VertexWeight>,
    pq: KWayGainQueue,
    marked: FastResetBitset,
    active: FastResetBitset,
    just_activated: FastResetBitset,
    adjacent: FastResetBitset,
    /// Entries inserted during the current update sweep; their gains are
    /// already post-move and must not receive further deltas this sweep.
    fresh_entries: Vec<(VertexId, BlockId)>,
    moves: Vec<Move>,
}

impl KWayFm {
    pub fn new(
        config: FmConfig,
        objective: Objective,
        max_block_weights: Vec<VertexWeight>,
        num_vertices: usize,
    ) -> Self {
        let k = max_block_weights.len();
        KWayFm {
            config,
            objective,
            max_block_weights,
            pq: KWayGainQueue::new(k, num_vertices),
            marked: FastResetBitset::new(num_vertices),
            active: FastResetBitset::new(num_vertices),
            just_activated: FastResetBitset::new(num_vertices),
            adjacent: FastResetBitset::new(k),
            fresh_entries: Vec::new(),
            moves: Vec::new(),
        }
    }

    /// Gain of moving `v` to block `to` under the configured objective.
    pub(crate) fn compute_gain(
        hg: &Hypergraph,
        objective: Objective,
        v: VertexId,
        to: BlockId,
    ) -> Gain {
        let from = hg.block(v);
        let mut gain = 0;
        for &e in hg.incident_nets(v) {
            let w = hg.net_weight(e);
            match objective {
                Objective::Km1 => {
                    if hg.pins_in_block(e, from) == 1 {
                        gain += w;
                    }
                    if hg.pins_in_block(e, to) == 0 {
                        gain -= w;
                    }
                }
                Objective::Cut => {
                    let size = hg.net_size(e) as i32;
                    if hg.pins_in_block(e, to) == size - 1 {
                        gain += w;
                    }
                    if hg.pins_in_block(e, from) == size {
                        gain -= w;
                    }
                }
            }
        }
        gain
    }

    /// Inserts entries for every block adjacent to `v` through one of its
    /// nets.
    fn activate(&mut self, hg: &Hypergraph, v: VertexId) {
        if hg.is_fixed(v) || self.marked.contains(v as usize) {
            return;
        }
        debug_assert!(!self.active.contains(v as usize));
        let from = hg.block(v);
        self.adjacent.reset();
        for &e in hg.incident_nets(v) {
            for b in hg.connectivity_set(e) {
                if b != from {
                    self.adjacent.set(b as usize);
                }
            }
        }
        let mut any = false;
        for b in 0..hg.k() as BlockId {
            if self.adjacent.contains(b as usize) {
                self.pq
                    .insert(v, b, Self::compute_gain(hg, self.objective, v, b));
                self.pq.enable_block(b);
                any = true;
            }
        }
        if any {
            self.active.set(v as usize);
            self.just_activated.set(v as usize);
        }
    }

    fn deactivate(&mut self, hg: &Hypergraph, v: VertexId) {
        for b in 0..hg.k() as BlockId {
            if self.pq.contains(v, b) {
                self.pq.remove(v, b);
            }
        }
        self.active.unset(v as usize);
    }

    /// ±w on every entry of `u`.
    fn adjust_all_entries(&mut self, hg: &Hypergraph, u: VertexId, delta: Gain) {
        for b in 0..hg.k() as BlockId {
            if self.pq.contains(u, b) && !self.fresh_entries.contains(&(u, b)) {
                self.pq.update_key_by(u, b, delta);
            }
        }
    }

    /// ±w on the entry of `u` towards `block`, inserting it freshly when the
    /// move just created the adjacency.
    fn adjust_entry_towards(&mut self, hg: &Hypergraph, u: VertexId, block: BlockId, delta: Gain) {
        if hg.block(u) == block {
            return;
        }
        if self.pq.contains(u, block) {
            if !self.fresh_entries.contains(&(u, block)) {
                self.pq.update_key_by(u, block, delta);
            }
        } else if self.active.contains(u as usize) {
            self.pq
                .insert(u, block, Self::compute_gain(hg, self.objective, u, block));
            self.pq.enable_block(block);
            self.fresh_entries.push((u, block));
        }
    }

    fn updatable(&self, hg: &Hypergraph, u: VertexId) -> bool {
        !self.marked.contains(u as usize)
            && !self.just_activated.contains(u as usize)
            && !hg.is_fixed(u)
    }

    fn update_neighbours(&mut self, hg: &Hypergraph, v: VertexId, from: BlockId, to: BlockId) {
        self.just_activated.reset();
        self.fresh_entries.clear();
        for &e in hg.incident_nets(v) {
            let size = hg.net_size(e);
            if size > 1 {
                match self.objective {
                    Objective::Km1 => self.km1_delta(hg, e, v, from, to),
                    Objective::Cut => self.cut_delta(hg, e, v, from, to),
                }
            }
            // border membership changed for pins of this net
            for &u in hg.pins(e) {
                if u == v || self.marked.contains(u as usize) || hg.is_fixed(u) {
                    continue;
                }
                match (hg.is_border(u), self.active.contains(u as usize)) {
                    (true, false) => self.activate(hg, u),
                    (false, true) => self.deactivate(hg, u),
                    _ => {}
                }
            }
        }
    }

    fn km1_delta(
        &mut self,
        hg: &Hypergraph,
        e: u32,
        v: VertexId,
        from: BlockId,
        to: BlockId,
    ) {
        let w = hg.net_weight(e);
        let in_from = hg.pins_in_block(e, from);
        let in_to = hg.pins_in_block(e, to);

        if in_from == 1 {
            let u = *hg.pins(e).iter().find(|&&p| hg.block(p) == from).unwrap();
            if self.updatable(hg, u) {
                self.adjust_all_entries(hg, u, w);
            }
        }
        if in_to == 2 {
            let u = *hg
                .pins(e)
                .iter()
                .find(|&&p| p != v && hg.block(p) == to)
                .unwrap();
            if self.updatable(hg, u) {
                self.adjust_all_entries(hg, u, -w);
            }
        }
        if in_from == 0 {
            for &u in hg.pins(e) {
                if u != v && self.updatable(hg, u) {
                    self.adjust_entry_towards(hg, u, from, -w);
                }
            }
        }
        if in_to == 1 {
            for &u in hg.pins(e) {
                if u != v && self.updatable(hg, u) {
                    self.adjust_entry_towards(hg, u, to, w);
                }
            }
        }
    }

    fn cut_delta(
        &mut self,
        hg: &Hypergraph,
        e: u32,
        v: VertexId,
        from: BlockId,
        to: BlockId,
    ) {
        let w = hg.net_weight(e);
        let size = hg.net_size(e) as i32;
        let in_from = hg.pins_in_block(e, from);
        let in_to = hg.pins_in_block(e, to);

        if in_from == size - 1 {
            // the net was internal to `from`
            for &u in hg.pins(e) {
                if u != v && self.updatable(hg, u) {
                    self.adjust_all_entries(hg, u, w);
                }
            }
        }
        if in_to == size {
            // the net just became internal to `to`
            for &u in hg.pins(e) {
                if u != v && self.updatable(hg, u) {
                    self.adjust_all_entries(hg, u, -w);
                }
            }
        }
        if in_to == size - 1 {
            for &u in hg.pins(e) {
                if u != v && hg.block(u) != to && self.updatable(hg, u) {
                    self.adjust_entry_towards(hg, u, to, w);
                }
            }
        }
        if in_from == size - 2 {
            for &u in hg.pins(e) {
                if u != v && hg.block(u) != from && self.updatable(hg, u) {
                    self.adjust_entry_towards(hg, u, from, -w);
                }
            }
        }
    }
}

impl Refiner for KWayFm {
    fn refine(&mut self, hg: &mut Hypergraph, best: &mut Metrics, rng: &mut Randomize) -> bool {
        self.pq.clear();
        self.marked.reset();
        self.active.reset();
        self.moves.clear();

        for v in hg.active_vertices().collect::<Vec<_>>() {
            if hg.is_border(v) {
                self.activate(hg, v);
            }
        }
        self.just_activated.reset();

        let start = *best;
        let mut current = start;
        let mut best_seen = start;
        let mut best_prefix = 0;
        let mut stopping = StoppingRule::new(&self.config, hg.num_active_vertices());

        while !self.pq.is_empty() && !stopping.should_stop() {
            let (v, gain, to) = self.pq.delete_max(rng);
            let from = hg.block(v);
            debug_assert_eq!(gain, Self::compute_gain(hg, self.objective, v, to));

            if hg.block_weight(to) + hg.vertex_weight(v) > self.max_block_weights[to as usize] {
                // the entry is consumed; other targets of v stay available
                if !self.pq.contains_any(v) {
                    self.active.unset(v as usize);
                }
                continue;
            }

            self.deactivate(hg, v);
            hg.change_block(v, from, to);
            self.marked.set(v as usize);
            current.objective -= gain;
            current.imbalance = imbalance(hg);
            self.moves.push(Move { vertex: v, from, to });
            stopping.record(gain);
            self.update_neighbours(hg, v, from, to);

            if (current.objective, current.imbalance) < (best_seen.objective, best_seen.imbalance)
            {
                best_seen = current;
                best_prefix = self.moves.len();
                stopping.improved();
            }
        }

        tracing::debug!(
            moves = self.moves.len(),
            kept = best_prefix,
            objective = best_seen.objective,
            "k-way FM pass"
        );
        rollback(hg, &self.moves, best_prefix);
        debug_assert!(hg.check_pin_counts());
        debug_assert_eq!(
            best_seen.objective,
            crate::metrics::objective(hg, self.objective)
        );

        let improved = (best_seen.objective, best_seen.imbalance)
            < (start.objective, start.imbalance);
        *best = best_seen;
        improved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Context, FmStop, Mode};
    use crate::metrics::{km1, objective};

    fn fm_config() -> FmConfig {
        FmConfig {
            stop: FmStop::Simple,
            max_fruitless_moves: 50,
            adaptive_alpha: 1.0,
        }
    }

    fn three_block_hypergraph() -> Hypergraph {
        // net 0 spans all three blocks; net 1 is internal to block 2
        let pins = vec![vec![0, 1, 2], vec![3, 4], vec![2, 3]];
        let mut hg = Hypergraph::unweighted(3, 5, &pins).unwrap();
        for (v, b) in [0u32, 1, 2, 2, 2].iter().copied().enumerate() {
            hg.set_block(v as u32, b);
        }
        hg
    }

    #[test]
    fn km1_gain_counts_connectivity_changes() {
        let hg = three_block_hypergraph();
        // moving 0 to block 1 removes block 0 from net 0: λ 3→2
        assert_eq!(KWayFm::compute_gain(&hg, Objective::Km1, 0, 1), 1);
        assert_eq!(KWayFm::compute_gain(&hg, Objective::Km1, 0, 2), 1);
        // moving 2 to block 0 keeps net 0 spanning and cuts net 2 open
        assert_eq!(KWayFm::compute_gain(&hg, Objective::Km1, 2, 0), 1 - 1);
    }

    #[test]
    fn cut_gain_counts_spanning_transitions() {
        let hg = three_block_hypergraph();
        // net 0 stays cut wherever 0 goes
        assert_eq!(KWayFm::compute_gain(&hg, Objective::Cut, 0, 1), 0);
        // moving 3 to block 2 is free; net 1 is already internal to 2
        assert_eq!(KWayFm::compute_gain(&hg, Objective::Cut, 4, 0), -1);
    }

    #[test]
    fn delta_updates_match_recomputation_on_random_moves() {
        for objective_kind in [Objective::Km1, Objective::Cut] {
            let pins = vec![
                vec![0, 1, 2, 3],
                vec![2, 3, 4],
                vec![4, 5, 6],
                vec![0, 6, 7],
                vec![1, 5, 7],
            ];
            let mut hg = Hypergraph::unweighted(3, 8, &pins).unwrap();
            for v in 0..8u32 {
                hg.set_block(v, v % 3);
            }
            let mut fm = KWayFm::new(fm_config(), objective_kind, vec![i64::MAX; 3], 8);
            for v in 0..8u32 {
                if hg.is_border(v) {
                    fm.activate(&hg, v);
                }
            }
            fm.just_activated.reset();

            let mut rng = Randomize::with_seed(23);
            for _ in 0..6 {
                let candidates: Vec<u32> =
                    (0..8u32).filter(|&v| fm.pq.contains_any(v)).collect();
                if candidates.is_empty() {
                    break;
                }
                let v = candidates[rng.index(candidates.len())];
                let from = hg.block(v);
                let to = (0..3u32).find(|&b| fm.pq.contains(v, b)).unwrap();
                fm.deactivate(&hg, v);
                hg.change_block(v, from, to);
                fm.marked.set(v as usize);
                fm.update_neighbours(&hg, v, from, to);

                // every remaining entry must equal a fresh gain computation
                for u in 0..8u32 {
                    for b in 0..3u32 {
                        if fm.pq.contains(u, b) {
                            assert_eq!(
                                fm.pq.key(u, b),
                                KWayFm::compute_gain(&hg, objective_kind, u, b),
                                "stale gain for ({}, {}) after moving {} ({:?})",
                                u,
                                b,
                                v,
                                objective_kind
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn refine_improves_a_bad_three_way_partition() {
        // three triangles, one vertex seeded in the wrong block
        let pins = vec![
            vec![0, 1, 2],
            vec![0, 1, 2],
            vec![3, 4, 5],
            vec![3, 4, 5],
            vec![6, 7, 8],
            vec![6, 7, 8],
            vec![2, 3],
            vec![5, 6],
        ];
        let mut hg = Hypergraph::unweighted(3, 9, &pins).unwrap();
        for (v, b) in [0u32, 0, 1, 1, 1, 1, 2, 2, 2].iter().copied().enumerate() {
            hg.set_block(v as u32, b);
        }
        let ctx = Context::new(3, 0.34, Objective::Km1, Mode::Direct);
        let max = ctx.max_block_weight(hg.total_weight());
        let mut fm = KWayFm::new(fm_config(), Objective::Km1, vec![max; 3], 9);
        let mut best = Metrics::read(&hg, Objective::Km1);
        let before = best.objective;
        let mut rng = Randomize::with_seed(31);
        let improved = fm.refine(&mut hg, &mut best, &mut rng);
        assert!(improved);
        assert!(best.objective < before);
        assert_eq!(best.objective, km1(&hg));
        // vertex 2 belongs with its triangle
        assert_eq!(hg.block(2), hg.block(0));
    }

    #[test]
    fn never_worsens_under_either_objective() {
        for objective_kind in [Objective::Km1, Objective::Cut] {
            let pins = vec![
                vec![0, 1, 2, 3],
                vec![2, 3, 4],
                vec![4, 5, 6],
                vec![0, 6, 7],
            ];
            for seed in 0..8 {
                let mut hg = Hypergraph::unweighted(4, 8, &pins).unwrap();
                for v in 0..8u32 {
                    hg.set_block(v, (v * 7 + seed as u32) % 4);
                }
                let mut fm = KWayFm::new(fm_config(), objective_kind, vec![3; 4], 8);
                let mut best = Metrics::read(&hg, objective_kind);
                let before = best;
                let mut rng = Randomize::with_seed(seed);
                fm.refine(&mut hg, &mut best, &mut rng);
                assert!(
                    (best.objective, best.imbalance) <= (before.objective, before.imbalance)
                );
                assert_eq!(best.objective, objective(&hg, objective_kind));
            }
        }
    }
}
