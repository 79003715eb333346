use serde::{Deserialize, Serialize};

use crate::{
    error::{EnvError, FolioResult},
    gym::overlay::DrawdownOverlay,
};

/// Configuration blueprint for building an [`Environment`].
///
/// All values are fixed for the lifetime of an episode. Costs are expressed
/// in basis points (1 bps = 0.01%), matching how trading desks quote them;
/// the environment converts to fractions internally.
///
/// # Example
///
/// ```no_run
/// # use folio::prelude::*;
/// let cfg = EnvConfig::default()
///     .with_window(20)
///     .with_weight_bounds(0.0, 0.35)
///     .with_costs_bps(10.0, 5.0)
///     .with_cash_symbol("CASH");
/// ```
///
/// [`Environment`]: crate::gym::env::Environment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Warm-up offset: the time cursor starts here, so the first observation
    /// already has a full feature history behind it.
    pub(crate) window: usize,

    /// Scale applied to the tanh-squashed action; bounds the per-step
    /// allocation move regardless of action magnitude.
    pub(crate) step_scale: f64,

    /// Per-asset weight lower bound.
    pub(crate) min_weight: f64,

    /// Per-asset weight upper bound.
    pub(crate) max_weight: f64,

    /// Transaction cost rate in basis points, charged on turnover.
    pub(crate) transaction_cost_bps: f64,

    /// Slippage rate in basis points, charged on turnover.
    pub(crate) slippage_bps: f64,

    /// Reward penalty coefficient on turnover.
    pub(crate) turnover_penalty: f64,

    /// Reward penalty coefficient on Euclidean deviation from the reference
    /// weights.
    pub(crate) deviation_penalty: f64,

    /// Whether the current weight vector is appended to observations.
    pub(crate) include_weights: bool,

    /// Symbol of the risk-free/cash asset, if the universe has one. A symbol
    /// not present in the universe simply disables the overlay, mirroring a
    /// universe with no cash asset.
    pub(crate) cash_symbol: Option<String>,

    /// Drawdown-triggered defensive overlay parameters.
    pub(crate) overlay: DrawdownOverlay,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            window: 60,
            step_scale: 0.10,
            min_weight: 0.0,
            max_weight: 0.35,
            transaction_cost_bps: 10.0,
            slippage_bps: 5.0,
            turnover_penalty: 0.02,
            deviation_penalty: 0.01,
            include_weights: true,
            cash_symbol: Some("CASH".to_string()),
            overlay: DrawdownOverlay::default(),
        }
    }
}

// ================================================================================================
// Builder Methods
// ================================================================================================

impl EnvConfig {
    pub fn with_window(self, window: usize) -> Self {
        Self { window, ..self }
    }

    pub fn with_step_scale(self, step_scale: f64) -> Self {
        Self { step_scale, ..self }
    }

    /// Sets the per-asset weight box `[min_weight, max_weight]`.
    ///
    /// Degenerate boxes are deliberately not rejected here: the projector
    /// falls back to the uniform allocation instead of aborting a running
    /// episode.
    pub fn with_weight_bounds(self, min_weight: f64, max_weight: f64) -> Self {
        Self {
            min_weight,
            max_weight,
            ..self
        }
    }

    /// Sets transaction cost and slippage rates, both in basis points.
    pub fn with_costs_bps(self, transaction_cost_bps: f64, slippage_bps: f64) -> Self {
        Self {
            transaction_cost_bps,
            slippage_bps,
            ..self
        }
    }

    pub fn with_turnover_penalty(self, turnover_penalty: f64) -> Self {
        Self {
            turnover_penalty,
            ..self
        }
    }

    pub fn with_deviation_penalty(self, deviation_penalty: f64) -> Self {
        Self {
            deviation_penalty,
            ..self
        }
    }

    pub fn with_include_weights(self, include_weights: bool) -> Self {
        Self {
            include_weights,
            ..self
        }
    }

    pub fn with_cash_symbol(self, cash_symbol: impl Into<String>) -> Self {
        Self {
            cash_symbol: Some(cash_symbol.into()),
            ..self
        }
    }

    pub fn without_cash_symbol(self) -> Self {
        Self {
            cash_symbol: None,
            ..self
        }
    }

    pub fn with_overlay(self, overlay: DrawdownOverlay) -> Self {
        Self { overlay, ..self }
    }
}

// ================================================================================================
// Accessors & Validation
// ================================================================================================

impl EnvConfig {
    pub fn window(&self) -> usize {
        self.window
    }

    pub fn weight_bounds(&self) -> (f64, f64) {
        (self.min_weight, self.max_weight)
    }

    pub fn include_weights(&self) -> bool {
        self.include_weights
    }

    pub fn overlay(&self) -> DrawdownOverlay {
        self.overlay
    }

    /// Rejects configurations that cannot produce a well-defined simulation.
    ///
    /// Note that degenerate weight boxes pass validation on purpose (see
    /// [`EnvConfig::with_weight_bounds`]).
    pub fn validate(&self) -> FolioResult<()> {
        if self.window == 0 {
            return Err(EnvError::InvalidConfig("window must be >= 1".to_string()).into());
        }
        if !self.step_scale.is_finite() || self.step_scale <= 0.0 {
            return Err(EnvError::InvalidConfig(format!(
                "step_scale must be positive and finite, got {}",
                self.step_scale
            ))
            .into());
        }
        if self.transaction_cost_bps < 0.0 || self.slippage_bps < 0.0 {
            return Err(
                EnvError::InvalidConfig("cost rates must be non-negative".to_string()).into(),
            );
        }
        if self.turnover_penalty < 0.0 || self.deviation_penalty < 0.0 {
            return Err(EnvError::InvalidConfig(
                "penalty coefficients must be non-negative".to_string(),
            )
            .into());
        }
        if !(0.0..=1.0).contains(&self.overlay.smoothing) {
            return Err(EnvError::InvalidConfig(format!(
                "overlay smoothing must be in [0, 1], got {}",
                self.overlay.smoothing
            ))
            .into());
        }
        if !(0.0..=1.0).contains(&self.overlay.max_cash) {
            return Err(EnvError::InvalidConfig(format!(
                "overlay max_cash must be in [0, 1], got {}",
                self.overlay.max_cash
            ))
            .into());
        }
        if self.overlay.dd_trigger >= 0.0 {
            return Err(EnvError::InvalidConfig(format!(
                "overlay dd_trigger must be negative, got {}",
                self.overlay.dd_trigger
            ))
            .into());
        }
        if self.overlay.dd_hard > self.overlay.dd_trigger {
            return Err(EnvError::InvalidConfig(format!(
                "overlay dd_hard ({}) must be at least as deep as dd_trigger ({})",
                self.overlay.dd_hard, self.overlay.dd_trigger
            ))
            .into());
        }
        Ok(())
    }
}
