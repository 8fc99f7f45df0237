//! Partition quality metrics.

use itertools::Itertools;

use crate::context::Objective;
use crate::hypergraph::{Hypergraph, NetWeight};

/// Total weight of nets spanning more than one block.
pub fn hyperedge_cut(hg: &Hypergraph) -> NetWeight {
    hg.nets_iter()
        .filter(|&e| hg.connectivity(e) > 1)
        .map(|e| hg.net_weight(e))
        .sum()
}

/// Σ ω(e)·(λ(e)−1) over all nets.
pub fn km1(hg: &Hypergraph) -> NetWeight {
    hg.nets_iter()
        .map(|e| hg.net_weight(e) * (hg.connectivity(e).saturating_sub(1)) as NetWeight)
        .sum()
}

pub fn objective(hg: &Hypergraph, objective: Objective) -> NetWeight {
    match objective {
        Objective::Cut => hyperedge_cut(hg),
        Objective::Km1 => km1(hg),
    }
}

/// Largest relative overload of a block: `max_b W(b)/⌈W(V)/k⌉ − 1`.
pub fn imbalance(hg: &Hypergraph) -> f64 {
    let k = hg.k();
    let average = (hg.total_weight() + k as i64 - 1) / k as i64;
    if average == 0 {
        return 0.0;
    }
    let max = (0..k as u32)
        .map(|b| hg.block_weight(b))
        .minmax()
        .into_option()
        .map_or(0, |(_, max)| max);
    max as f64 / average as f64 - 1.0
}

/// Running quality of a partition, threaded through the refiners. Refiners
/// must never worsen `(objective, imbalance)` lexicographically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metrics {
    pub objective: NetWeight,
    pub imbalance: f64,
}

impl Metrics {
    pub fn read(hg: &Hypergraph, obj: Objective) -> Self {
        Metrics {
            objective: objective(hg, obj),
            imbalance: imbalance(hg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hypergraph::Hypergraph;

    fn hmetis_example() -> Hypergraph {
        let pins = vec![vec![0, 2], vec![0, 1, 3, 4], vec![3, 4, 6], vec![2, 5, 6]];
        let mut hg =
            Hypergraph::new(2, vec![1; 7], vec![1, 1000, 1, 1000], &pins).unwrap();
        for (v, &b) in [0u32, 0, 1, 0, 0, 1, 1].iter().enumerate() {
            hg.set_block(v as u32, b);
        }
        hg
    }

    #[test]
    fn cut_counts_spanning_nets() {
        let hg = hmetis_example();
        // nets {0,2} and {3,4,6} are cut, both of weight 1
        assert_eq!(hyperedge_cut(&hg), 2);
    }

    #[test]
    fn km1_equals_cut_for_two_blocks() {
        let hg = hmetis_example();
        assert_eq!(km1(&hg), hyperedge_cut(&hg));
    }

    #[test]
    fn imbalance_of_4_3_split_of_7() {
        let hg = hmetis_example();
        // ⌈7/2⌉ = 4, heavier block has weight 4
        assert!((imbalance(&hg) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn km1_counts_each_extra_block() {
        let mut hg = Hypergraph::unweighted(3, 3, &[vec![0, 1, 2]]).unwrap();
        hg.set_block(0, 0);
        hg.set_block(1, 1);
        hg.set_block(2, 2);
        assert_eq!(km1(&hg), 2);
        assert_eq!(hyperedge_cut(&hg), 1);
    }
}
