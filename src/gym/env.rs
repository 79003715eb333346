use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::Array1;
use rayon::iter::ParallelIterator;
use tracing::info;

use crate::{
    agent::{Agent, AgentIdentifier},
    data::market::MarketData,
    error::{EnvError, FolioResult},
    gym::{
        Env, EnvStatus, Reward, StepOutcome,
        action::Action,
        config::EnvConfig,
        observation::{Observation, build_observation},
    },
    math::projection::project_capped_simplex,
    report::journal::Journal,
};

/// Floor on the net growth factor inside the reward logarithm.
///
/// A fixed constant rather than "some small epsilon": rewards must be
/// reproducible bit-for-bit across runs, and the floor is what keeps a
/// catastrophic step from producing `-inf`.
const REWARD_FLOOR: f64 = 1e-8;

/// Per-step diagnostics, returned by value so the caller cannot mutate
/// simulator state through them.
///
/// Shape and presence of every field is part of the contract relied on by
/// downstream reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInfo {
    /// NAV after this step.
    pub nav: f64,

    /// Realized weighted portfolio return for the period just consumed.
    pub period_return: f64,

    /// L1 distance between the previous and the committed allocation.
    pub turnover: f64,

    /// Cost fraction charged this step (rate times turnover).
    pub cost: f64,

    /// The committed weight vector (a copy).
    pub weights: Array1<f64>,
}

/// Everything a single `step()` hands back to the driving loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub observation: Observation,
    pub reward: Reward,
    pub outcome: StepOutcome,
    pub info: StepInfo,
}

/// Result of evaluating one agent over a full episode.
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub uid: u64,
    pub identifier: AgentIdentifier,
    pub journal: Journal,
}

/// The step-driven portfolio rebalancing state machine.
///
/// Owns the mutable episode state (weights, NAV, peak NAV, time cursor,
/// status); `reset()` and `step()` are the only mutators. Market data is
/// shared read-only behind an [`Arc`], so cloning an environment for a
/// concurrent episode is cheap. A single instance is not safe for
/// simultaneous use from multiple callers.
#[derive(Clone, Debug)]
pub struct Environment {
    // === Public (configurable) ===
    cfg: EnvConfig,

    // === Internal only ===
    /// Shared read-only market data backing the environment.
    data: Arc<MarketData>,

    /// Reference allocation; penalized against, never mutated.
    w_ref: Array1<f64>,

    /// Position of the cash asset in the universe, if designated.
    cash_index: Option<usize>,

    /// Current allocation. Feasible at all times between steps.
    weights: Array1<f64>,

    /// Net asset value, a compounding index starting at 1.0.
    nav: f64,

    /// Running maximum of NAV.
    peak_nav: f64,

    /// Time cursor into the aligned time axis.
    t: usize,

    /// Current lifecycle status.
    status: EnvStatus,
}

impl Environment {
    /// Builds an environment over shared market data.
    ///
    /// The reference allocation defaults to the uniform vector; supply an
    /// externally solved one with [`Environment::with_reference_weights`].
    pub fn new(data: Arc<MarketData>, cfg: EnvConfig) -> FolioResult<Self> {
        cfg.validate()?;
        if cfg.window >= data.len() {
            return Err(EnvError::InvalidConfig(format!(
                "window ({}) must be smaller than the time axis ({})",
                cfg.window,
                data.len()
            ))
            .into());
        }

        let n = data.n_assets();
        let cash_index = cfg
            .cash_symbol
            .as_deref()
            .and_then(|sym| data.asset_index(sym));
        let w_ref = Array1::from_elem(n, 1.0 / n as f64);
        let weights = w_ref.clone();

        Ok(Self {
            cfg,
            data,
            w_ref,
            cash_index,
            weights,
            nav: 1.0,
            peak_nav: 1.0,
            t: 0,
            status: EnvStatus::Ready,
        })
    }

    /// Replaces the reference allocation with an externally supplied one
    /// (e.g. from a convex mean-variance solver).
    ///
    /// The vector must be finite, non-negative, of universe length, and is
    /// normalized to sum to 1.
    pub fn with_reference_weights(mut self, w_ref: Array1<f64>) -> FolioResult<Self> {
        if w_ref.len() != self.data.n_assets() {
            return Err(EnvError::InvalidConfig(format!(
                "reference weights have length {}, expected {}",
                w_ref.len(),
                self.data.n_assets()
            ))
            .into());
        }
        if w_ref.iter().any(|&x| !x.is_finite() || x < 0.0) {
            return Err(EnvError::InvalidConfig(
                "reference weights must be finite and non-negative".to_string(),
            )
            .into());
        }
        let total = w_ref.sum();
        if total <= 0.0 {
            return Err(
                EnvError::InvalidConfig("reference weights sum to zero".to_string()).into(),
            );
        }
        self.w_ref = w_ref / total;
        Ok(self)
    }

    pub fn status(&self) -> EnvStatus {
        self.status
    }

    pub fn nav(&self) -> f64 {
        self.nav
    }

    pub fn peak_nav(&self) -> f64 {
        self.peak_nav
    }

    /// Current drawdown, `nav / peak_nav - 1`, always <= 0.
    pub fn drawdown(&self) -> f64 {
        self.nav / self.peak_nav - 1.0
    }

    pub fn weights(&self) -> &Array1<f64> {
        &self.weights
    }

    pub fn reference_weights(&self) -> &Array1<f64> {
        &self.w_ref
    }

    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }

    pub fn market_data(&self) -> &Arc<MarketData> {
        &self.data
    }

    /// Number of steps an episode runs before terminating.
    pub fn episode_len(&self) -> usize {
        self.data.len() - self.cfg.window
    }
}

impl Env for Environment {
    #[tracing::instrument(skip(self))]
    fn reset(&mut self) -> FolioResult<Observation> {
        self.nav = 1.0;
        self.peak_nav = 1.0;
        self.t = self.cfg.window;
        self.weights = self.w_ref.clone();
        self.status = EnvStatus::Running;
        info!(t0 = self.t, episode_len = self.episode_len(), "Environment reset");

        Ok(build_observation(
            &self.data,
            self.t,
            &self.weights,
            self.cfg.include_weights,
        ))
    }

    fn step(&mut self, action: &Action) -> FolioResult<Transition> {
        self.check_step_status()?;
        action.validate(self.data.n_assets())?;

        // 1. Proposal: current weights plus a bounded move. The saturating
        //    nonlinearity keeps single-step moves bounded regardless of the
        //    raw action magnitude.
        let proposal = &self.weights + &action.values().mapv(|a| self.cfg.step_scale * a.tanh());

        // 2. Project onto the feasible set, then apply the defensive overlay.
        let w_target = project_capped_simplex(
            &proposal,
            self.cfg.min_weight,
            self.cfg.max_weight,
            1.0,
        );
        let w_target = self.cfg.overlay.apply(
            &w_target,
            self.nav,
            self.peak_nav,
            self.cash_index,
            self.cfg.min_weight,
            self.cfg.max_weight,
        );

        // 3. Costs on turnover.
        let turnover = (&w_target - &self.weights).mapv(f64::abs).sum();
        let cost = (self.cfg.transaction_cost_bps + self.cfg.slippage_bps) / 1e4 * turnover;

        // 4. NAV update. The new target weights earn the current period's
        //    realized return: no execution lag between deciding and earning.
        let period_return = self.data.returns().row(self.t).dot(&w_target);
        let net_factor = (1.0 + period_return) * (1.0 - cost);
        self.nav *= net_factor;
        self.peak_nav = self.peak_nav.max(self.nav);

        // 5. Reward.
        let deviation = (&w_target - &self.w_ref).mapv(|x| x * x).sum().sqrt();
        let reward = net_factor.max(REWARD_FLOOR).ln()
            - self.cfg.turnover_penalty * turnover
            - self.cfg.deviation_penalty * deviation;

        // 6. Commit and advance.
        self.weights = w_target;
        self.t += 1;
        let outcome = if self.t >= self.data.len() {
            self.status = EnvStatus::Done;
            info!(nav = self.nav, "Episode terminated");
            StepOutcome::Terminated
        } else {
            StepOutcome::InProgress
        };

        let observation = build_observation(
            &self.data,
            self.t,
            &self.weights,
            self.cfg.include_weights,
        );
        let info = StepInfo {
            nav: self.nav,
            period_return,
            turnover,
            cost,
            weights: self.weights.clone(),
        };

        Ok(Transition {
            observation,
            reward: Reward(reward),
            outcome,
            info,
        })
    }
}

// ================================================================================================
// Driving Loops
// ================================================================================================

impl Environment {
    /// Runs one full episode with the given agent and collects the per-step
    /// diagnostics into a [`Journal`], the hand-off artifact for reporting.
    pub fn evaluate_agent<T: Agent>(&mut self, agent: &mut T) -> FolioResult<Journal> {
        let mut journal = Journal::new(self.data.assets().to_vec());
        let mut obs = self.reset()?;

        loop {
            let action = agent.act(&obs)?;
            let transition = self.step(&action)?;
            // The step consumed the period at the previous cursor position.
            journal.record(
                self.data.date_at(self.t - 1),
                transition.reward,
                &transition.info,
            );
            if transition.outcome.is_terminated() {
                break;
            }
            obs = transition.observation;
        }

        agent.reset();
        Ok(journal)
    }

    /// Evaluates a stream of agents in parallel, one cloned environment per
    /// worker, and returns their journals.
    ///
    /// # Arguments
    ///
    /// * `agents` - A parallel iterator yielding `(usize, Agent)`. The
    ///   `usize` is treated as the unique agent UID, typically produced by
    ///   `.enumerate()` before going parallel.
    /// * `stream_len` - The expected number of agents, used solely to size
    ///   the progress bar.
    pub fn evaluate_agents<T>(
        &self,
        agents: impl ParallelIterator<Item = (usize, T)>,
        stream_len: u64,
    ) -> FolioResult<Vec<AgentRun>>
    where
        T: Agent + Send,
    {
        let pb = progress_bar(stream_len)?;
        pb.set_message("Running evaluation...");

        let runs = agents
            .map(|(uid, mut agent)| {
                let mut env = self.clone();
                let journal = env.evaluate_agent(&mut agent)?;
                pb.inc(1);
                Ok(AgentRun {
                    uid: uid as u64,
                    identifier: agent.identifier(),
                    journal,
                })
            })
            .collect::<FolioResult<Vec<_>>>()?;

        pb.finish_with_message("Evaluation complete.");
        Ok(runs)
    }

    fn check_step_status(&self) -> FolioResult<()> {
        use EnvStatus::*;
        match self.status {
            Running => Ok(()),
            Ready => Err(EnvError::InvalidState(
                "Environment is not started. Call `reset()` before stepping.".to_string(),
            )
            .into()),
            Done => Err(EnvError::InvalidState(
                "Episode is done. Call `reset()` before stepping.".to_string(),
            )
            .into()),
        }
    }
}

// ================================================================================================
// Helper Functions
// ================================================================================================

fn progress_bar(capacity: u64) -> FolioResult<ProgressBar> {
    let bar = ProgressBar::new(capacity);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise}) {msg}")
            .map_err(EnvError::ProgressBar)?
            .progress_chars("#>-"));
    Ok(bar)
}
