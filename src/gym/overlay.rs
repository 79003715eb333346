use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::math::projection::project_capped_simplex;

/// Guards the drawdown ratio against a zero peak.
const PEAK_EPS: f64 = 1e-12;

/// Floor on the trigger-to-hard span so severity stays well defined even
/// when the two thresholds are configured equal.
const SPAN_FLOOR: f64 = 1e-6;

/// Drawdown-triggered defensive overlay.
///
/// Once the current drawdown falls below `dd_trigger`, allocation is shifted
/// toward the designated cash asset in proportion to how far the drawdown
/// has progressed toward `dd_hard`. The shifted vector is blended with the
/// un-overlaid target (exponential smoothing) and re-projected onto the
/// feasible set, so the output is always feasible regardless of intermediate
/// arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DrawdownOverlay {
    /// Drawdown (negative) at which the overlay starts acting.
    pub dd_trigger: f64,

    /// Drawdown (negative, deeper than the trigger) at which the overlay
    /// reaches full severity.
    pub dd_hard: f64,

    /// Cash fraction added at full severity.
    pub max_cash: f64,

    /// Blend factor between the raw target (`smoothing`) and the overlaid
    /// vector (`1 - smoothing`). Avoids single-step allocation jumps.
    pub smoothing: f64,
}

impl Default for DrawdownOverlay {
    fn default() -> Self {
        Self {
            dd_trigger: -0.07,
            dd_hard: -0.20,
            max_cash: 0.6,
            smoothing: 0.3,
        }
    }
}

impl DrawdownOverlay {
    /// Severity in `[0, 1]`: 0 at the trigger, 1 at or beyond the hard
    /// threshold.
    pub fn severity(&self, drawdown: f64) -> f64 {
        let span = (self.dd_hard.abs() - self.dd_trigger.abs()).max(SPAN_FLOOR);
        ((drawdown.abs() - self.dd_trigger.abs()) / span).clamp(0.0, 1.0)
    }

    /// Applies the overlay to a target weight vector.
    ///
    /// Returns `w_target` unchanged (bitwise) when there is no designated
    /// cash asset or the drawdown is shallower than the trigger.
    pub fn apply(
        &self,
        w_target: &Array1<f64>,
        nav: f64,
        peak_nav: f64,
        cash_index: Option<usize>,
        lower: f64,
        upper: f64,
    ) -> Array1<f64> {
        let Some(cash) = cash_index else {
            return w_target.clone();
        };

        let drawdown = nav / (peak_nav + PEAK_EPS) - 1.0;
        if drawdown >= self.dd_trigger {
            return w_target.clone();
        }

        let k = self.severity(drawdown) * self.max_cash;

        // Scale non-cash weights so they sum to (1 - k); cash absorbs the rest.
        let mut w_new = w_target.clone();
        w_new[cash] = 0.0;
        let non_cash_sum = w_new.sum();
        if non_cash_sum > 0.0 {
            let scale = (1.0 - k) / non_cash_sum;
            w_new.mapv_inplace(|x| x * scale);
        }
        w_new[cash] = 1.0 - w_new.sum();

        let blended = w_target.mapv(|x| x * self.smoothing)
            + w_new.mapv(|x| x * (1.0 - self.smoothing));
        project_capped_simplex(&blended, lower, upper, 1.0)
    }
}
