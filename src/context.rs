//! Runtime configuration of the partitioning pipeline.
//!
//! Every policy that the pipeline dispatches on is a plain enum parsed from
//! the same strings the command line uses; building a [`Context`] and calling
//! [`Context::validate`] is the only entry point for configuration errors, so
//! the pipeline itself never has to re-check a policy value.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// The minimised quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// Total weight of nets spanning more than one block.
    Cut,
    /// Connectivity minus one: Σ ω(e)·(λ(e)−1).
    Km1,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    RecursiveBisection,
    Direct,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoarseningScheme {
    /// Pseudorandom vertex visit order, one contraction per visited vertex.
    MlStyle,
    /// Priority-queue driven, stale entries are rescored lazily.
    HeavyLazy,
    /// Rescans candidate pairs after every contraction.
    HeavyFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatingScore {
    HeavyEdge,
    /// `heavy_edge` scaled per net by an externally supplied frequency table.
    EdgeFrequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeavyVertexPenalty {
    Multiplicative,
    NoPenalty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptancePolicy {
    /// Equal-score candidates are tie-broken uniformly at random.
    BestChoice,
    /// Prefer partners that were not contracted in the current pass.
    BestPreferUnmatched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixedVertexAcceptance {
    /// Only pairs of free vertices may contract.
    FreeOnly,
    /// A free vertex may be absorbed into a fixed one.
    FixedAndFree,
    /// Fixed vertices contract only with fixed vertices of the same block.
    EquivalentOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementScheme {
    Fm,
    Flow,
    FmFlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmStop {
    /// Stop after a fixed number of fruitless moves.
    Simple,
    /// Random-walk model: stop when further improvement is unlikely.
    AdaptiveOpt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAlgorithm {
    EdmondsKarp,
    GoldbergTarjan,
    BoykovKolmogorov,
    Ibfs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowNetworkKind {
    /// Two nodes per net joined by an arc of capacity ω(e).
    Lawler,
    /// Lawler with size-2 nets shortcut to a direct arc pair.
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowExecution {
    /// Every β uncontractions.
    Constant,
    /// At vertex counts c + 2^j.
    Exponential,
    /// At vertex counts n / 2^j.
    Multilevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialAlgorithm {
    /// Cycle through the whole pool.
    Pool,
    Random,
    Bfs,
    GreedyNet,
    LabelPropagation,
}

macro_rules! impl_from_str {
    ($ty:ident { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Error> {
                match s {
                    $($name => Ok($ty::$variant),)+
                    _ => Err(Error::InvalidConfiguration(format!(
                        concat!("unknown ", stringify!($ty), " {:?}"),
                        s
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => f.write_str($name),)+
                }
            }
        }
    };
}

impl_from_str!(Objective { "cut" => Cut, "km1" => Km1 });
impl_from_str!(Mode { "recursive" => RecursiveBisection, "direct" => Direct });
impl_from_str!(CoarseningScheme {
    "ml_style" => MlStyle,
    "heavy_lazy" => HeavyLazy,
    "heavy_full" => HeavyFull,
});
impl_from_str!(RatingScore { "heavy_edge" => HeavyEdge, "edge_frequency" => EdgeFrequency });
impl_from_str!(HeavyVertexPenalty {
    "multiplicative_penalty" => Multiplicative,
    "no_penalty" => NoPenalty,
});
impl_from_str!(AcceptancePolicy {
    "best" => BestChoice,
    "best_prefer_unmatched" => BestPreferUnmatched,
});
impl_from_str!(FixedVertexAcceptance {
    "free_vertex_only" => FreeOnly,
    "fixed_vertex_allowed" => FixedAndFree,
    "equivalent_vertices" => EquivalentOnly,
});
impl_from_str!(RefinementScheme { "fm" => Fm, "flow" => Flow, "fm_flow" => FmFlow });
impl_from_str!(FmStop { "simple" => Simple, "adaptive_opt" => AdaptiveOpt });
impl_from_str!(FlowAlgorithm {
    "edmond_karp" => EdmondsKarp,
    "goldberg_tarjan" => GoldbergTarjan,
    "boykov_kolmogorov" => BoykovKolmogorov,
    "ibfs" => Ibfs,
});
impl_from_str!(FlowNetworkKind { "lawler" => Lawler, "hybrid" => Hybrid });
impl_from_str!(FlowExecution {
    "constant" => Constant,
    "exponential" => Exponential,
    "multilevel" => Multilevel,
});
impl_from_str!(InitialAlgorithm {
    "pool" => Pool,
    "random" => Random,
    "bfs" => Bfs,
    "greedy_net" => GreedyNet,
    "label_propagation" => LabelPropagation,
});

#[derive(Debug, Clone)]
pub struct PartitionConfig {
    pub k: usize,
    pub epsilon: f64,
    pub objective: Objective,
    pub mode: Mode,
    pub seed: u64,
    pub vcycles: u32,
    /// Nets with more pins are invisible to rating and refinement seeding.
    /// `None` disables the threshold (`cmaxnet = -1`).
    pub max_net_size: Option<usize>,
    /// Per-block weight bounds overriding the uniform `(1+ε)·⌈W/k⌉` bound;
    /// used by recursive bisection to realise uneven split targets. Empty
    /// means uniform.
    pub individual_block_weights: Vec<i64>,
}

#[derive(Debug, Clone)]
pub struct RatingConfig {
    pub score: RatingScore,
    pub use_communities: bool,
    pub penalty: HeavyVertexPenalty,
    pub acceptance: AcceptancePolicy,
    pub fixed_vertex_acceptance: FixedVertexAcceptance,
}

#[derive(Debug, Clone)]
pub struct CoarseningConfig {
    pub scheme: CoarseningScheme,
    /// `s` in the maximum vertex weight `s·W(V)/(t·k)`.
    pub max_allowed_weight_multiplier: f64,
    /// `t`: coarsening stops at `t·k` active vertices.
    pub contraction_limit_multiplier: usize,
    pub rating: RatingConfig,
}

#[derive(Debug, Clone)]
pub struct InitialConfig {
    pub algorithm: InitialAlgorithm,
    /// Trials per call; the best feasible partition is kept.
    pub runs: usize,
    /// The initial partitioner's own coarsening settings, used when the
    /// main coarsener stalls above the pool's contraction limit (the
    /// `i-c-*` option family).
    pub coarsening: CoarseningConfig,
    /// FM settings of the per-trial polish pass (the `i-r-*` family).
    pub fm: FmConfig,
}

#[derive(Debug, Clone)]
pub struct FmConfig {
    pub stop: FmStop,
    /// `i` of the simple stopping rule.
    pub max_fruitless_moves: usize,
    /// `α` of the adaptive rule; infinity disables it.
    pub adaptive_alpha: f64,
}

#[derive(Debug, Clone)]
pub struct FlowConfig {
    pub algorithm: FlowAlgorithm,
    pub network: FlowNetworkKind,
    pub execution: FlowExecution,
    pub alpha: f64,
    pub beta: usize,
    pub use_most_balanced_minimum_cut: bool,
    pub use_adaptive_alpha_stopping_rule: bool,
    pub ignore_small_net_cut: bool,
}

#[derive(Debug, Clone)]
pub struct LocalSearchConfig {
    pub scheme: RefinementScheme,
    /// FM repetitions per uncontraction level; the best outcome is kept.
    pub runs: usize,
    pub fm: FmConfig,
    pub flow: FlowConfig,
}

/// The full configuration handed through the pipeline.
#[derive(Debug, Clone)]
pub struct Context {
    pub partition: PartitionConfig,
    pub coarsening: CoarseningConfig,
    pub initial: InitialConfig,
    pub local_search: LocalSearchConfig,
    /// Per-net frequency table consumed by the `edge_frequency` score.
    /// Empty unless an outer loop supplies one.
    pub edge_frequencies: Vec<f64>,
}

impl Default for RatingConfig {
    fn default() -> Self {
        RatingConfig {
            score: RatingScore::HeavyEdge,
            use_communities: false,
            penalty: HeavyVertexPenalty::Multiplicative,
            acceptance: AcceptancePolicy::BestChoice,
            fixed_vertex_acceptance: FixedVertexAcceptance::FreeOnly,
        }
    }
}

impl Default for CoarseningConfig {
    fn default() -> Self {
        CoarseningConfig {
            scheme: CoarseningScheme::MlStyle,
            max_allowed_weight_multiplier: 3.25,
            contraction_limit_multiplier: 160,
            rating: RatingConfig::default(),
        }
    }
}

impl Default for FmConfig {
    fn default() -> Self {
        FmConfig {
            stop: FmStop::Simple,
            max_fruitless_moves: 350,
            adaptive_alpha: 1.0,
        }
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        FlowConfig {
            algorithm: FlowAlgorithm::Ibfs,
            network: FlowNetworkKind::Hybrid,
            execution: FlowExecution::Exponential,
            alpha: 16.0,
            beta: 128,
            use_most_balanced_minimum_cut: true,
            use_adaptive_alpha_stopping_rule: true,
            ignore_small_net_cut: true,
        }
    }
}

impl Default for InitialConfig {
    fn default() -> Self {
        InitialConfig {
            algorithm: InitialAlgorithm::Pool,
            runs: 20,
            coarsening: CoarseningConfig::default(),
            fm: FmConfig::default(),
        }
    }
}

impl Default for LocalSearchConfig {
    fn default() -> Self {
        LocalSearchConfig {
            scheme: RefinementScheme::Fm,
            runs: 3,
            fm: FmConfig::default(),
            flow: FlowConfig::default(),
        }
    }
}

impl Context {
    pub fn new(k: usize, epsilon: f64, objective: Objective, mode: Mode) -> Self {
        Context {
            partition: PartitionConfig {
                k,
                epsilon,
                objective,
                mode,
                seed: 0,
                vcycles: 0,
                max_net_size: None,
                individual_block_weights: Vec::new(),
            },
            coarsening: CoarseningConfig::default(),
            initial: InitialConfig::default(),
            local_search: LocalSearchConfig::default(),
            edge_frequencies: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.partition.k < 2 {
            return Err(Error::InvalidConfiguration(format!(
                "k must be at least 2, got {}",
                self.partition.k
            )));
        }
        if !(self.partition.epsilon > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "epsilon must be positive, got {}",
                self.partition.epsilon
            )));
        }
        if self.partition.vcycles > 0 && self.partition.mode == Mode::RecursiveBisection {
            return Err(Error::InvalidConfiguration(
                "v-cycles cannot be combined with recursive bisection".into(),
            ));
        }
        if self.coarsening.contraction_limit_multiplier == 0
            || self.initial.coarsening.contraction_limit_multiplier == 0
        {
            return Err(Error::InvalidConfiguration(
                "contraction limit multiplier t must be positive".into(),
            ));
        }
        if self.initial.runs == 0 {
            return Err(Error::InvalidConfiguration(
                "at least one initial partitioning run is required".into(),
            ));
        }
        Ok(())
    }

    /// `⌈W(V)/k⌉`, the perfectly balanced block weight.
    pub fn average_block_weight(&self, total_weight: i64) -> i64 {
        (total_weight + self.partition.k as i64 - 1) / self.partition.k as i64
    }

    /// `(1+ε)·⌈W(V)/k⌉`, the feasibility bound of every block.
    pub fn max_block_weight(&self, total_weight: i64) -> i64 {
        ((1.0 + self.partition.epsilon) * self.average_block_weight(total_weight) as f64) as i64
    }

    /// The weight bound of one block, honouring individual targets.
    pub fn block_weight_bound(&self, block: usize, total_weight: i64) -> i64 {
        match self.partition.individual_block_weights.get(block) {
            Some(&bound) => bound,
            None => self.max_block_weight(total_weight),
        }
    }

    /// Bounds of all blocks.
    pub fn block_weight_bounds(&self, total_weight: i64) -> Vec<i64> {
        (0..self.partition.k)
            .map(|b| self.block_weight_bound(b, total_weight))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_names() {
        assert_eq!("km1".parse::<Objective>().unwrap(), Objective::Km1);
        assert_eq!(
            "heavy_lazy".parse::<CoarseningScheme>().unwrap(),
            CoarseningScheme::HeavyLazy
        );
        assert_eq!(
            "boykov_kolmogorov".parse::<FlowAlgorithm>().unwrap(),
            FlowAlgorithm::BoykovKolmogorov
        );
        assert!("newton_raphson".parse::<FlowAlgorithm>().is_err());
    }

    #[test]
    fn rejects_degenerate_configurations() {
        let ctx = Context::new(1, 0.03, Objective::Cut, Mode::Direct);
        assert!(matches!(ctx.validate(), Err(Error::InvalidConfiguration(_))));

        let ctx = Context::new(2, 0.0, Objective::Cut, Mode::Direct);
        assert!(matches!(ctx.validate(), Err(Error::InvalidConfiguration(_))));

        let mut ctx = Context::new(2, 0.03, Objective::Cut, Mode::RecursiveBisection);
        ctx.partition.vcycles = 2;
        assert!(matches!(ctx.validate(), Err(Error::InvalidConfiguration(_))));
    }

    #[test]
    fn block_weight_bound_rounds_up() {
        let ctx = Context::new(3, 0.0301, Objective::Cut, Mode::Direct);
        assert_eq!(ctx.average_block_weight(7), 3);
        assert_eq!(ctx.max_block_weight(7), 3);
    }
}
