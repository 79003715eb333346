use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, FolioResult};

/// Guards the RSI ratio against division by zero on loss-free windows.
const RSI_EPS: f64 = 1e-12;

/// Per-asset feature recipe applied to a price matrix.
///
/// The derived feature block per asset is laid out in this order:
/// multi-horizon returns, rolling volatilities, then the optional RSI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Horizons (in periods) for simple trailing returns.
    pub return_horizons: Vec<usize>,

    /// Window lengths for the rolling standard deviation of 1-period returns.
    /// Sample standard deviation, so windows must be at least 2.
    pub volatility_windows: Vec<usize>,

    /// Window for the Wilder-smoothed relative strength index, if any.
    pub rsi_window: Option<usize>,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            return_horizons: vec![1, 5, 20],
            volatility_windows: vec![20, 60],
            rsi_window: Some(14),
        }
    }
}

impl FeatureSpec {
    /// Number of features produced per asset.
    pub fn dim(&self) -> usize {
        self.return_horizons.len()
            + self.volatility_windows.len()
            + usize::from(self.rsi_window.is_some())
    }

    /// Number of leading rows on which some feature is not yet defined.
    pub fn warmup(&self) -> usize {
        self.return_horizons
            .iter()
            .chain(self.volatility_windows.iter())
            .copied()
            .chain(self.rsi_window.map(|_| 1))
            .max()
            .unwrap_or(0)
    }

    /// Computes the full feature matrix for `prices` (rows = time,
    /// columns = assets), returning it together with the warm-up length.
    ///
    /// Rows inside the warm-up are zero-filled; callers are expected to trim
    /// them (see `MarketData::from_prices`) so the episode range is fully
    /// populated.
    pub(crate) fn compute(&self, prices: &Array2<f64>) -> FolioResult<(Array2<f64>, usize)> {
        if self.dim() == 0 {
            return Err(DataError::Empty("feature spec produces no features".to_string()).into());
        }
        if self.return_horizons.contains(&0) {
            return Err(
                DataError::ShapeMismatch("return horizon must be >= 1".to_string()).into(),
            );
        }
        if self.volatility_windows.iter().any(|&w| w < 2) {
            return Err(
                DataError::ShapeMismatch("volatility window must be >= 2".to_string()).into(),
            );
        }
        if let Some(w) = self.rsi_window
            && w == 0
        {
            return Err(DataError::ShapeMismatch("RSI window must be >= 1".to_string()).into());
        }

        let t_len = prices.nrows();
        let n = prices.ncols();
        let fdim = self.dim();
        let mut features = Array2::zeros((t_len, n * fdim));

        for a in 0..n {
            let px = prices.column(a);
            let mut col = a * fdim;

            for &h in &self.return_horizons {
                for t in h..t_len {
                    features[[t, col]] = px[t] / px[t - h] - 1.0;
                }
                col += 1;
            }

            // 1-period returns feed both the volatility and RSI features.
            let rets: Vec<f64> = (0..t_len)
                .map(|t| if t == 0 { 0.0 } else { px[t] / px[t - 1] - 1.0 })
                .collect();

            for &w in &self.volatility_windows {
                for t in w..t_len {
                    features[[t, col]] = sample_std(&rets[t + 1 - w..=t]);
                }
                col += 1;
            }

            if let Some(w) = self.rsi_window {
                write_rsi(&px.to_vec(), w, &mut features, t_len, col);
            }
        }

        Ok((features, self.warmup()))
    }
}

/// Sample standard deviation (ddof = 1).
fn sample_std(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

/// Wilder RSI: exponentially smoothed average gains and losses with
/// `alpha = 1 / window`, seeded from the first price delta.
fn write_rsi(px: &[f64], window: usize, features: &mut Array2<f64>, t_len: usize, col: usize) {
    let alpha = 1.0 / window as f64;
    let mut avg_up = 0.0;
    let mut avg_down = 0.0;

    for t in 1..t_len {
        let delta = px[t] - px[t - 1];
        let up = delta.max(0.0);
        let down = (-delta).max(0.0);
        if t == 1 {
            avg_up = up;
            avg_down = down;
        } else {
            avg_up = alpha * up + (1.0 - alpha) * avg_up;
            avg_down = alpha * down + (1.0 - alpha) * avg_down;
        }
        let rs = avg_up / (avg_down + RSI_EPS);
        features[[t, col]] = 100.0 - 100.0 / (1.0 + rs);
    }
}
