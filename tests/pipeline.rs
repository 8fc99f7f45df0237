//! End-to-end properties of the partitioning pipeline.

use proptest::collection::vec;
use proptest::prelude::*;
use rayon::prelude::*;

use decoupe::{metrics, Context, Hypergraph, Mode, Objective, Partitioner, VertexId};

/// Strategy for connected-ish random hypergraphs: `n` vertices, nets of 2–4
/// distinct pins plus a spanning chain so no vertex is isolated.
fn arbitrary_hypergraph(
    max_vertices: usize,
    max_nets: usize,
) -> impl Strategy<Value = (usize, Vec<Vec<VertexId>>, Vec<i64>)> {
    (4..max_vertices).prop_flat_map(move |n| {
        let net = vec(0..n as u32, 2..5).prop_map(|mut pins| {
            pins.sort_unstable();
            pins.dedup();
            pins
        });
        (
            Just(n),
            vec(net, 1..max_nets),
            vec(1i64..4, 1..max_nets),
        )
            .prop_map(|(n, mut nets, weights)| {
                nets.retain(|pins| pins.len() >= 2);
                for v in 1..n as u32 {
                    nets.push(vec![v - 1, v]);
                }
                let mut net_weights = vec![1; nets.len()];
                for (slot, w) in net_weights.iter_mut().zip(weights) {
                    *slot = w;
                }
                (n, nets, net_weights)
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn pin_counts_stay_consistent_through_the_pipeline(
        (n, nets, net_weights) in arbitrary_hypergraph(24, 16),
        seed in 0u64..1000,
    ) {
        let mut hg = Hypergraph::new(2, vec![1; n], net_weights, &nets).unwrap();
        let mut ctx = Context::new(2, 0.2, Objective::Cut, Mode::Direct);
        ctx.partition.seed = seed;
        ctx.coarsening.contraction_limit_multiplier = 3;
        ctx.initial.runs = 4;
        let _ = Partitioner::new(ctx).unwrap().partition(&mut hg);
        prop_assert!(hg.check_pin_counts());
        prop_assert!(hg.check_block_weights());
    }

    #[test]
    fn block_weights_sum_to_total_weight(
        (n, nets, net_weights) in arbitrary_hypergraph(24, 16),
        seed in 0u64..1000,
    ) {
        let weights: Vec<i64> = (0..n as i64).map(|v| 1 + v % 3).collect();
        let mut hg = Hypergraph::new(3, weights, net_weights, &nets).unwrap();
        let mut ctx = Context::new(3, 0.5, Objective::Km1, Mode::Direct);
        ctx.partition.seed = seed;
        ctx.coarsening.contraction_limit_multiplier = 2;
        ctx.initial.runs = 4;
        let _ = Partitioner::new(ctx).unwrap().partition(&mut hg);
        let sum: i64 = (0..3).map(|b| hg.block_weight(b)).sum();
        prop_assert_eq!(sum, hg.total_weight());
    }

    #[test]
    fn feasible_results_respect_the_balance_bound(
        (n, nets, net_weights) in arbitrary_hypergraph(24, 16),
        seed in 0u64..1000,
    ) {
        let mut hg = Hypergraph::new(2, vec![1; n], net_weights, &nets).unwrap();
        let mut ctx = Context::new(2, 0.1, Objective::Cut, Mode::Direct);
        ctx.partition.seed = seed;
        ctx.coarsening.contraction_limit_multiplier = 3;
        ctx.initial.runs = 4;
        let max = ctx.max_block_weight(hg.total_weight());
        if Partitioner::new(ctx).unwrap().partition(&mut hg).is_ok() {
            prop_assert!(hg.block_weight(0) <= max);
            prop_assert!(hg.block_weight(1) <= max);
        }
    }
}

#[test]
fn many_seeds_in_parallel_agree_on_an_easy_instance() {
    // two cliques of heavy nets joined by one unit bridge: every seed must
    // find the bridge cut
    let nets: Vec<Vec<VertexId>> = vec![
        vec![0, 1, 2, 3],
        vec![0, 1, 2, 3],
        vec![4, 5, 6, 7],
        vec![4, 5, 6, 7],
        vec![3, 4],
    ];
    let net_weights = vec![10, 10, 10, 10, 1];

    let objectives: Vec<i64> = (0..32u64)
        .into_par_iter()
        .map(|seed| {
            let mut hg = Hypergraph::new(2, vec![1; 8], net_weights.clone(), &nets).unwrap();
            let mut ctx = Context::new(2, 0.1, Objective::Cut, Mode::Direct);
            ctx.partition.seed = seed;
            ctx.coarsening.contraction_limit_multiplier = 2;
            let metrics = Partitioner::new(ctx).unwrap().partition(&mut hg).unwrap();
            assert_eq!(metrics.objective, metrics::hyperedge_cut(&hg));
            metrics.objective
        })
        .collect();

    assert!(objectives.iter().all(|&cut| cut == 1), "{:?}", objectives);
}

#[test]
fn deterministic_across_identical_runs() {
    let nets: Vec<Vec<VertexId>> = (0..20)
        .map(|i| vec![i as u32 % 12, (i as u32 * 5 + 3) % 12])
        .filter(|pins| pins[0] != pins[1])
        .collect();
    let run = || {
        let mut hg = Hypergraph::unweighted(3, 12, &nets).unwrap();
        let mut ctx = Context::new(3, 0.3, Objective::Km1, Mode::Direct);
        ctx.partition.seed = 77;
        ctx.coarsening.contraction_limit_multiplier = 2;
        let _ = Partitioner::new(ctx).unwrap().partition(&mut hg);
        hg.partition()
    };
    assert_eq!(run(), run());
}
