//! A multilevel hypergraph partitioning library.
//!
//! decoupe computes a balanced k-way partition of a hypergraph that
//! minimises either the cut or the connectivity (km1) objective. The
//! pipeline is the classic multilevel scheme:
//!
//! 1. **Coarsening** contracts rated vertex pairs until the hypergraph is
//!    small ([`coarsening`]).
//! 2. **Initial partitioning** runs a pool of flat heuristics on the
//!    coarsest hypergraph ([`initial`]).
//! 3. **Uncoarsening** replays the contractions in reverse and refines the
//!    partition after each step with Fiduccia–Mattheyses local search
//!    and/or max-flow/min-cut refinement on block pairs.
//!
//! # Example
//!
//! ```rust
//! use decoupe::{Context, Hypergraph, Mode, Objective, Partitioner};
//!
//! // the hypergraph from the hMetis manual
//! let pins = vec![vec![0, 2], vec![0, 1, 3, 4], vec![3, 4, 6], vec![2, 5, 6]];
//! let mut hg = Hypergraph::new(2, vec![1; 7], vec![1, 1000, 1, 1000], &pins)?;
//!
//! let mut ctx = Context::new(2, 0.03, Objective::Cut, Mode::Direct);
//! ctx.partition.seed = 42;
//! let metrics = Partitioner::new(ctx)?.partition(&mut hg)?;
//! assert_eq!(metrics.objective, 2);
//! # Ok::<(), decoupe::Error>(())
//! ```

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    rust_2018_idioms
)]

pub mod coarsening;
mod context;
mod datastructure;
mod error;
mod hypergraph;
pub mod initial;
pub mod metrics;
mod partitioner;
mod randomize;
mod refinement;

pub use crate::context::{
    AcceptancePolicy, CoarseningConfig, CoarseningScheme, Context, FixedVertexAcceptance,
    FlowAlgorithm, FlowConfig, FlowExecution, FlowNetworkKind, FmConfig, FmStop,
    HeavyVertexPenalty, InitialAlgorithm, InitialConfig, LocalSearchConfig, Mode, Objective,
    PartitionConfig, RatingConfig, RatingScore, RefinementScheme,
};
pub use crate::error::Error;
pub use crate::hypergraph::{
    BlockId, Gain, Hypergraph, Memento, NetId, NetWeight, VertexId, VertexWeight,
};
pub use crate::metrics::Metrics;
pub use crate::partitioner::Partitioner;
pub use crate::randomize::Randomize;
