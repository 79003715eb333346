use chrono::NaiveDate;
use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::gym::{Reward, env::StepInfo};

/// Time-indexed record of one full episode: the hand-off artifact consumed
/// by external reporting layers.
///
/// Each `record()` call appends one row of `{date, nav, return, turnover,
/// cost, reward}` plus the committed weight vector. The journal computes no
/// performance statistics itself; Sharpe ratios and friends belong to the
/// consumer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Journal {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    navs: Vec<f64>,
    returns: Vec<f64>,
    turnovers: Vec<f64>,
    costs: Vec<f64>,
    rewards: Vec<f64>,
    /// One committed weight vector per step, in asset order.
    weights: Vec<Vec<f64>>,
}

impl Journal {
    pub fn new(assets: Vec<String>) -> Self {
        Self {
            assets,
            ..Self::default()
        }
    }

    /// Appends one step's diagnostics.
    pub fn record(&mut self, date: NaiveDate, reward: Reward, info: &StepInfo) {
        self.dates.push(date);
        self.navs.push(info.nav);
        self.returns.push(info.period_return);
        self.turnovers.push(info.turnover);
        self.costs.push(info.cost);
        self.rewards.push(reward.0);
        self.weights.push(info.weights.to_vec());
    }

    pub fn len(&self) -> usize {
        self.navs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.navs.is_empty()
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn navs(&self) -> &[f64] {
        &self.navs
    }

    pub fn returns(&self) -> &[f64] {
        &self.returns
    }

    pub fn turnovers(&self) -> &[f64] {
        &self.turnovers
    }

    pub fn costs(&self) -> &[f64] {
        &self.costs
    }

    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    pub fn weights(&self) -> &[Vec<f64>] {
        &self.weights
    }

    pub fn final_nav(&self) -> Option<f64> {
        self.navs.last().copied()
    }

    /// Cumulative reward over the episode.
    pub fn total_reward(&self) -> Reward {
        Reward(self.rewards.iter().sum())
    }

    /// Replays the NAV recursion `nav_t = nav_{t-1} * (1 + r_t) * (1 - cost_t)`
    /// from the logged returns and costs.
    ///
    /// The result matches `navs()` exactly; consumers can use it to verify a
    /// journal is internally consistent.
    pub fn reconstructed_navs(&self) -> Vec<f64> {
        let mut nav = 1.0;
        izip!(&self.returns, &self.costs)
            .map(|(r, c)| {
                nav *= (1.0 + r) * (1.0 - c);
                nav
            })
            .collect()
    }
}
