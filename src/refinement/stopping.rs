use crate::context::{FmConfig, FmStop};
use crate::hypergraph::Gain;

/// Decides when an FM search stops expanding its move sequence.
///
/// `simple` counts fruitless moves since the best prefix. `adaptive_opt`
/// models the observed gains as a random walk and stops once
/// `p·μ² > α·σ² + β` where p is the fruitless-move count, μ and σ² the
/// running mean and variance of the gains and β = ln n; `α = ∞` disables
/// the criterion entirely.
#[derive(Debug)]
pub(crate) struct StoppingRule {
    policy: FmStop,
    max_fruitless: usize,
    alpha: f64,
    beta: f64,
    fruitless: usize,
    steps: usize,
    mean: f64,
    m2: f64,
}

impl StoppingRule {
    pub fn new(config: &FmConfig, num_vertices: usize) -> Self {
        StoppingRule {
            policy: config.stop,
            max_fruitless: config.max_fruitless_moves,
            alpha: config.adaptive_alpha,
            beta: (num_vertices.max(2) as f64).ln(),
            fruitless: 0,
            steps: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Accounts one executed move with the given gain.
    pub fn record(&mut self, gain: Gain) {
        self.fruitless += 1;
        self.steps += 1;
        // Welford's update
        let delta = gain as f64 - self.mean;
        self.mean += delta / self.steps as f64;
        self.m2 += delta * (gain as f64 - self.mean);
    }

    /// The search found a new best prefix.
    pub fn improved(&mut self) {
        self.fruitless = 0;
    }

    pub fn should_stop(&self) -> bool {
        match self.policy {
            FmStop::Simple => self.fruitless > self.max_fruitless,
            FmStop::AdaptiveOpt => {
                if self.alpha.is_infinite() || self.steps < 2 {
                    return false;
                }
                let variance = self.m2 / (self.steps - 1) as f64;
                self.fruitless as f64 * self.mean * self.mean
                    > self.alpha * variance + self.beta
            }
        }
    }
}
