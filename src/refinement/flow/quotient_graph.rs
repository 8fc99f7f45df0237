use std::collections::HashSet;

use crate::hypergraph::{BlockId, Hypergraph, NetId, VertexId};

/// Adjacency between blocks, carried as the set of cut nets per block pair.
/// Vertex moves must go through [`QuotientGraph::change_block`] so the pair
/// sets stay current; the flow refiner schedules block pairs off this
/// structure.
#[derive(Debug)]
pub(crate) struct QuotientGraph {
    k: usize,
    cut_nets: Vec<HashSet<NetId>>,
}

impl QuotientGraph {
    pub fn new(hg: &Hypergraph) -> Self {
        let k = hg.k();
        let mut qg = QuotientGraph {
            k,
            cut_nets: vec![HashSet::new(); k * k],
        };
        for e in hg.nets_iter() {
            if hg.connectivity(e) > 1 {
                qg.insert_net(hg, e);
            }
        }
        qg
    }

    fn pair_index(&self, a: BlockId, b: BlockId) -> usize {
        let (lo, hi) = if a < b { (a, b) } else { (b, a) };
        lo as usize * self.k + hi as usize
    }

    fn insert_net(&mut self, hg: &Hypergraph, e: NetId) {
        let blocks: Vec<BlockId> = hg.connectivity_set(e).collect();
        for (i, &a) in blocks.iter().enumerate() {
            for &b in &blocks[i + 1..] {
                let index = self.pair_index(a, b);
                self.cut_nets[index].insert(e);
            }
        }
    }

    fn remove_net(&mut self, hg: &Hypergraph, e: NetId) {
        let blocks: Vec<BlockId> = hg.connectivity_set(e).collect();
        for (i, &a) in blocks.iter().enumerate() {
            for &b in &blocks[i + 1..] {
                let index = self.pair_index(a, b);
                self.cut_nets[index].remove(&e);
            }
        }
    }

    pub fn cut_nets(&self, b0: BlockId, b1: BlockId) -> &HashSet<NetId> {
        &self.cut_nets[self.pair_index(b0, b1)]
    }

    /// Moves a vertex and keeps every affected pair set in sync.
    pub fn change_block(&mut self, hg: &mut Hypergraph, v: VertexId, from: BlockId, to: BlockId) {
        let nets = hg.incident_nets(v).to_vec();
        for &e in &nets {
            self.remove_net(hg, e);
        }
        hg.change_block(v, from, to);
        for &e in &nets {
            if hg.connectivity(e) > 1 {
                self.insert_net(hg, e);
            }
        }
    }

    /// Block pairs with a non-empty cut, in ascending order.
    pub fn active_pairs(&self) -> Vec<(BlockId, BlockId)> {
        let mut pairs = Vec::new();
        for a in 0..self.k as BlockId {
            for b in a + 1..self.k as BlockId {
                if !self.cut_nets[self.pair_index(a, b)].is_empty() {
                    pairs.push((a, b));
                }
            }
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_block_hypergraph() -> Hypergraph {
        let pins = vec![vec![0, 1], vec![1, 2], vec![0, 1, 2]];
        let mut hg = Hypergraph::unweighted(3, 3, &pins).unwrap();
        hg.set_block(0, 0);
        hg.set_block(1, 1);
        hg.set_block(2, 2);
        hg
    }

    #[test]
    fn build_collects_cut_nets_per_pair() {
        let hg = three_block_hypergraph();
        let qg = QuotientGraph::new(&hg);
        assert!(qg.cut_nets(0, 1).contains(&0));
        assert!(qg.cut_nets(0, 1).contains(&2));
        assert!(qg.cut_nets(1, 2).contains(&1));
        assert!(qg.cut_nets(0, 2).contains(&2));
        assert!(!qg.cut_nets(0, 2).contains(&0));
        assert_eq!(qg.active_pairs().len(), 3);
    }

    #[test]
    fn moves_keep_pair_sets_in_sync() {
        let mut hg = three_block_hypergraph();
        let mut qg = QuotientGraph::new(&hg);
        // collapse vertex 2 into block 1: pair (1,2) loses its cut
        qg.change_block(&mut hg, 2, 2, 1);
        assert!(qg.cut_nets(1, 2).is_empty());
        assert!(qg.cut_nets(0, 2).is_empty());
        assert!(qg.cut_nets(0, 1).contains(&0));
        assert!(qg.cut_nets(0, 1).contains(&2));
        assert_eq!(qg.active_pairs(), vec![(0, 1)]);
    }
}
