use serde::{Deserialize, Serialize};

use crate::{
    error::FolioResult,
    gym::{action::Action, env::Transition, observation::Observation},
};

pub mod action;
pub mod config;
pub mod env;
pub mod observation;
pub mod overlay;

/// Represents a per-step reward value.
///
/// The reward is the log net growth factor of the portfolio for the step,
/// minus turnover and deviation penalties. It is a plain `f64` wrapped in a
/// newtype so reward arithmetic cannot be confused with NAV or return values.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Reward(pub f64);

/// Represents the lifecycle status of the rebalancing environment.
///
/// # Lifecycle
///
/// The environment follows a finite state machine (FSM) with the following
/// valid transitions. Stepping in any state other than `Running` returns an
/// error.
///
/// ```md
/// Current State                  | Action  | Next State | Notes
/// -------------------------------|---------|------------|--------------------------
/// `Running` (time axis left)     | step()  | Running    | Continue within episode
/// `Running` (time axis consumed) | step()  | Done       | Episode terminates
/// `Ready` / `Running` / `Done`   | reset() | Running    | (Re)start the episode
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvStatus {
    /// Initial state. The environment is waiting for `reset()` to be called.
    Ready,

    /// The episode is active and the environment is ready for `step()` calls.
    Running,

    /// The time axis is exhausted. A call to `reset()` is required to start over.
    Done,
}

impl EnvStatus {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Outcome of a single `step()` call.
///
/// There is no truncation path: an episode always runs to the end of the
/// time axis, so the only terminal outcome is `Terminated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    InProgress,
    /// The time cursor reached the end of the time axis.
    Terminated,
}

impl StepOutcome {
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }
}

/// The reset/step seam of the simulation core.
///
/// Keeping this behind a trait lets driving loops and tests run against
/// synthetic stand-ins without touching the real environment.
pub trait Env {
    /// Reinitialize the episode and return the initial observation.
    fn reset(&mut self) -> FolioResult<Observation>;

    /// Advance the simulation by one step with the given action.
    fn step(&mut self, action: &Action) -> FolioResult<Transition>;
}
