use std::sync::Arc;

use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
    error::FolioResult,
    gym::{action::Action, observation::Observation},
};

/// Represents the unique identifier of an agent, used for tracking runs in
/// evaluation reports.
///
/// The `String` variant can carry custom agent names; the unit variants cover
/// the built-in stand-ins.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Display,
    Default,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentIdentifier {
    /// A custom user-defined agent.
    #[strum(to_string = "{0}")]
    Named(Arc<String>),

    /// The zero-action baseline.
    Hold,

    #[default]
    Random,
}

/// The decision-making seam of the simulation.
///
/// The environment never draws randomness itself; anything stochastic lives
/// behind this trait.
pub trait Agent {
    /// Decide on an action based on the current observation.
    fn act(&mut self, obs: &Observation) -> FolioResult<Action>;

    /// Optional agent name for logging/reporting.
    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Named(Arc::new(
            "UnnamedAgent: override Agent::identifier()".to_string(),
        ))
    }

    /// Reset internal state at the end of an episode. Default is no-op.
    fn reset(&mut self) {}
}

impl Agent for Box<dyn Agent> {
    fn act(&mut self, obs: &Observation) -> FolioResult<Action> {
        (**self).act(obs)
    }

    fn identifier(&self) -> AgentIdentifier {
        (**self).identifier()
    }

    fn reset(&mut self) {
        (**self).reset()
    }
}

// ============================================================================
//  Built-in Stand-ins
// ============================================================================

/// Always proposes the zero action, i.e. keeps the current allocation
/// (modulo overlay and re-projection). Useful as a buy-and-hold baseline and
/// as a deterministic test driver.
#[derive(Clone, Debug)]
pub struct HoldAgent {
    n_assets: usize,
}

impl HoldAgent {
    pub fn new(n_assets: usize) -> Self {
        Self { n_assets }
    }
}

impl Agent for HoldAgent {
    fn act(&mut self, _obs: &Observation) -> FolioResult<Action> {
        Ok(Action::zeros(self.n_assets))
    }

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Hold
    }
}

/// Proposes uniform random actions in `[-1, 1]`.
///
/// Seeded explicitly so evaluation runs stay reproducible; the environment
/// itself is deterministic.
#[derive(Clone, Debug)]
pub struct RandomAgent {
    n_assets: usize,
    seed: u64,
    rng: StdRng,
}

impl RandomAgent {
    pub fn new(n_assets: usize, seed: u64) -> Self {
        Self {
            n_assets,
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Agent for RandomAgent {
    fn act(&mut self, _obs: &Observation) -> FolioResult<Action> {
        let values: Array1<f64> = (0..self.n_assets)
            .map(|_| self.rng.random_range(-1.0..=1.0))
            .collect();
        Ok(Action::new(values))
    }

    fn identifier(&self) -> AgentIdentifier {
        AgentIdentifier::Random
    }

    fn reset(&mut self) {
        // Re-seed so every episode sees the same action sequence.
        self.rng = StdRng::seed_from_u64(self.seed);
    }
}
