//! 2-way Fiduccia–Mattheyses refinement.
//!
//! Border vertices are seeded into a two-block gain queue; the search
//! repeatedly moves the highest-gain vertex whose move respects the block
//! weight bound, locks it, and delta-updates the gains of the pins sharing a
//! net with it. The best `(objective, imbalance)` prefix of the move
//! sequence is kept, everything after it is rolled back.

use crate::context::FmConfig;
use crate::datastructure::{FastResetBitset, KWayGainQueue};
use crate::hypergraph::{BlockId, Gain, Hypergraph, NetId, VertexId, VertexWeight};
use crate::metrics::{imbalance, Metrics};
use crate::randomize::Randomize;
use crate::refinement::stopping::StoppingRule;
use crate::refinement::{rollback, Move, Refiner};

#[derive(Debug)]
pub struct TwoWayFm {
    config: FmConfig,
    max_block_weights: Vec<VertexWeight>,
    pq: KWayGainQueue,
    marked: FastResetBitset,
    just_activated: FastResetBitset,
    moves: Vec<Move>,
}

impl TwoWayFm {
    pub fn new(config: FmConfig, max_block_weights: Vec<VertexWeight>, num_vertices: usize) -> Self {
        debug_assert_eq!(max_block_weights.len(), 2);
        TwoWayFm {
            config,
            max_block_weights,
            pq: KWayGainQueue::new(2, num_vertices),
            marked: FastResetBitset::new(num_vertices),
            just_activated: FastResetBitset::new(num_vertices),
            moves: Vec::new(),
        }
    }

    /// Gain of moving `v` to the opposite block: nets it is the last pin of
    /// on its own side minus nets that are entirely on its side.
    pub(crate) fn compute_gain(hg: &Hypergraph, v: VertexId) -> Gain {
        let from = hg.block(v);
        let to = 1 - from;
        let mut gain = 0;
        for &e in hg.incident_nets(v) {
            if hg.pins_in_block(e, from) == 1 {
                gain += hg.net_weight(e);
            }
            if hg.pins_in_block(e, to) == 0 {
                gain -= hg.net_weight(e);
            }
        }
        gain
    }

    fn activate(&mut self, hg: &Hypergraph, v: VertexId) {
        if hg.is_fixed(v) || self.marked.contains(v as usize) {
            return;
        }
        let to = 1 - hg.block(v);
        debug_assert!(!self.pq.contains(v, to));
        self.pq.insert(v, to, Self::compute_gain(hg, v));
        self.pq.enable_block(to);
        self.just_activated.set(v as usize);
    }

    /// Delta-gain updates for every pin sharing a net with the moved vertex,
    /// followed by activation of pins that entered the border and removal of
    /// pins that left it. Pin counts have already been updated, so all
    /// conditions read post-move state.
    fn update_neighbours(&mut self, hg: &Hypergraph, v: VertexId, from: BlockId, to: BlockId) {
        self.just_activated.reset();
        for &e in hg.incident_nets(v) {
            let size = hg.net_size(e);
            if size == 1 {
                continue;
            }
            let w = hg.net_weight(e);
            let in_from = hg.pins_in_block(e, from);
            let in_to = hg.pins_in_block(e, to);

            if size == 2 {
                // a size-2 net flips between internal and cut in one move
                let u = *hg.pins(e).iter().find(|&&p| p != v).unwrap();
                if self.updatable(hg, u) {
                    let target = 1 - hg.block(u);
                    if self.pq.contains(u, target) {
                        if in_to == 1 {
                            self.pq.update_key_by(u, target, 2 * w);
                        } else if in_to == 2 {
                            self.pq.update_key_by(u, target, -2 * w);
                        }
                    }
                }
            } else {
                if in_from == 1 {
                    // the last pin left behind can now pull the net out of
                    // the cut
                    self.adjust_unique_pin(hg, e, from, w);
                }
                if in_to == 2 {
                    let before = *hg
                        .pins(e)
                        .iter()
                        .find(|&&p| p != v && hg.block(p) == to)
                        .unwrap();
                    self.adjust(hg, before, -w);
                }
                if in_from == 0 {
                    for &u in hg.pins(e) {
                        if u != v {
                            self.adjust(hg, u, -w);
                        }
                    }
                }
                if in_to == 1 {
                    for &u in hg.pins(e) {
                        if u != v {
                            self.adjust(hg, u, w);
                        }
                    }
                }
            }

            self.update_border_membership(hg, e, v);
        }
    }

    fn adjust_unique_pin(&mut self, hg: &Hypergraph, e: NetId, block: BlockId, delta: Gain) {
        let u = *hg
            .pins(e)
            .iter()
            .find(|&&p| hg.block(p) == block)
            .unwrap();
        self.adjust(hg, u, delta);
    }

    fn adjust(&mut self, hg: &Hypergraph, u: VertexId, delta: Gain) {
        if !self.updatable(hg, u) {
            return;
        }
        let target = 1 - hg.block(u);
        if self.pq.contains(u, target) {
            self.pq.update_key_by(u, target, delta);
        }
    }

    /// Locked, fixed and just-activated pins keep their keys: a fresh
    /// activation already computed its gain against post-move pin counts.
    fn updatable(&self, hg: &Hypergraph, u: VertexId) -> bool {
        !self.marked.contains(u as usize)
            && !self.just_activated.contains(u as usize)
            && !hg.is_fixed(u)
    }

    fn update_border_membership(&mut self, hg: &Hypergraph, e: NetId, moved: VertexId) {
        for &u in hg.pins(e) {
            if u == moved || self.marked.contains(u as usize) || hg.is_fixed(u) {
                continue;
            }
            let target = 1 - hg.block(u);
            let in_pq = self.pq.contains(u, target);
            match (hg.is_border(u), in_pq) {
                (true, false) => self.activate(hg, u),
                (false, true) => self.pq.remove(u, target),
                _ => {}
            }
        }
    }
}

impl Refiner for TwoWayFm {
    fn refine(&mut self, hg: &mut Hypergraph, best: &mut Metrics, rng: &mut Randomize) -> bool {
        debug_assert_eq!(hg.k(), 2);
        self.pq.clear();
        self.marked.reset();
        self.moves.clear();

        for v in hg.active_vertices() {
            if hg.is_border(v) && !hg.is_fixed(v) {
                let to = 1 - hg.block(v);
                self.pq.insert(v, to, Self::compute_gain(hg, v));
                self.pq.enable_block(to);
            }
        }

        let start = *best;
        let mut current = start;
        let mut best_seen = start;
        let mut best_prefix = 0;
        let mut stopping = StoppingRule::new(&self.config, hg.num_active_vertices());

        while !self.pq.is_empty() && !stopping.should_stop() {
            let (v, gain, to) = self.pq.delete_max(rng);
            let from = hg.block(v);
            debug_assert_eq!(gain, Self::compute_gain(hg, v));

            if hg.block_weight(to) + hg.vertex_weight(v) > self.max_block_weights[to as usize] {
                self.marked.set(v as usize);
                continue;
            }

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
            "2-way FM pass"
        );
        rollback(hg, &self.moves, best_prefix);
        debug_assert!(hg.check_pin_counts());
        debug_assert_eq!(best_seen.objective, crate::metrics::hyperedge_cut(hg));

        let improved = (best_seen.objective, best_seen.imbalance)
            < (start.objective, start.imbalance);
        *best = best_seen;
        improved
    }
}
