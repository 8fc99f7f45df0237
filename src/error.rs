use std::error;
use std::fmt;

/// Errors reported by the partitioning pipeline.
///
/// All input and configuration validation happens before the first
/// contraction; once coarsening has started, the only failure mode left is
/// `Infeasible` (no partition within the balance bound was found) or
/// `Internal` (a broken invariant, which is a bug).
#[derive(Debug)]
pub enum Error {
    /// The hypergraph is malformed: pin ids out of range, empty nets,
    /// non-positive weights or inconsistent counts.
    InvalidInput(String),
    /// The configuration is rejected: unknown policy name, `k < 2`,
    /// `epsilon <= 0`, or v-cycles combined with recursive bisection.
    InvalidConfiguration(String),
    /// No partition satisfying the balance bound was found. The hypergraph
    /// still holds the best partition encountered; `imbalance` is its final
    /// imbalance.
    Infeasible { imbalance: f64 },
    /// An internal invariant was violated.
    Internal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidInput(msg) => write!(f, "invalid hypergraph: {}", msg),
            Error::InvalidConfiguration(msg) => write!(f, "invalid configuration: {}", msg),
            Error::Infeasible { imbalance } => write!(
                f,
                "no feasible partition found (final imbalance {:.4})",
                imbalance
            ),
            Error::Internal(msg) => write!(f, "internal invariant violation: {}", msg),
        }
    }
}

impl error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
