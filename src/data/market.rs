use std::sync::Arc;

use chrono::NaiveDate;
use ndarray::{Array2, Axis, s};

use crate::{
    data::features::FeatureSpec,
    error::{DataError, FolioResult},
};

/// Immutable market data backing one or more environment instances.
///
/// Holds the ordered asset universe, a strictly increasing date axis, the
/// price matrix (rows = time, columns = assets), the derived simple-return
/// matrix, and a fully populated feature matrix with `fdim` features per
/// asset laid out asset-major (`[asset 0 features | asset 1 features | ...]`).
///
/// Environments clone cheaply by sharing this behind an [`Arc`]; nothing in
/// here is mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketData {
    assets: Vec<String>,
    dates: Vec<NaiveDate>,
    prices: Array2<f64>,
    returns: Array2<f64>,
    features: Array2<f64>,
    fdim: usize,
}

impl MarketData {
    /// Builds market data from externally supplied, already aligned tables.
    ///
    /// Validates shapes, price positivity, feature finiteness, and date
    /// ordering. The return matrix is derived as the simple percentage
    /// change with the first row defined as zero.
    pub fn new(
        assets: Vec<String>,
        dates: Vec<NaiveDate>,
        prices: Array2<f64>,
        features: Array2<f64>,
        fdim: usize,
    ) -> FolioResult<Arc<Self>> {
        let n = assets.len();
        let t = prices.nrows();

        if n == 0 {
            return Err(DataError::Empty("asset universe is empty".to_string()).into());
        }
        if t < 2 {
            return Err(DataError::Empty(format!(
                "time axis must have at least 2 rows, got {t}"
            ))
            .into());
        }
        if prices.ncols() != n {
            return Err(DataError::ShapeMismatch(format!(
                "price matrix has {} columns for {} assets",
                prices.ncols(),
                n
            ))
            .into());
        }
        if dates.len() != t {
            return Err(DataError::ShapeMismatch(format!(
                "{} dates for {} price rows",
                dates.len(),
                t
            ))
            .into());
        }
        if features.nrows() != t || features.ncols() != n * fdim {
            return Err(DataError::ShapeMismatch(format!(
                "feature matrix is {}x{}, expected {}x{}",
                features.nrows(),
                features.ncols(),
                t,
                n * fdim
            ))
            .into());
        }

        for (row, price_row) in prices.axis_iter(Axis(0)).enumerate() {
            for (col, &p) in price_row.iter().enumerate() {
                if !p.is_finite() || p <= 0.0 {
                    return Err(DataError::NonPositivePrice {
                        asset: assets[col].clone(),
                        row,
                    }
                    .into());
                }
            }
        }
        if features.iter().any(|x| !x.is_finite()) {
            return Err(DataError::NonFinite("feature matrix contains non-finite values".to_string()).into());
        }
        for pair in dates.windows(2) {
            if pair[1] <= pair[0] {
                return Err(DataError::UnorderedDates(format!(
                    "{} followed by {}",
                    pair[0], pair[1]
                ))
                .into());
            }
        }

        let returns = pct_change(&prices);
        Ok(Arc::new(Self {
            assets,
            dates,
            prices,
            returns,
            features,
            fdim,
        }))
    }

    /// Builds market data from prices alone, deriving the feature matrix
    /// with the given [`FeatureSpec`].
    ///
    /// Rows inside the feature warm-up (where some rolling feature is not
    /// yet defined) are trimmed from all tables, so the resulting time axis
    /// starts at the first fully populated row.
    pub fn from_prices(
        assets: Vec<String>,
        dates: Vec<NaiveDate>,
        prices: Array2<f64>,
        spec: &FeatureSpec,
    ) -> FolioResult<Arc<Self>> {
        if dates.len() != prices.nrows() {
            return Err(DataError::ShapeMismatch(format!(
                "{} dates for {} price rows",
                dates.len(),
                prices.nrows()
            ))
            .into());
        }
        let (features, warmup) = spec.compute(&prices)?;
        if prices.nrows() < warmup + 2 {
            return Err(DataError::Empty(format!(
                "{} price rows leave no data after a {warmup}-row feature warm-up",
                prices.nrows()
            ))
            .into());
        }

        let trimmed_prices = prices.slice(s![warmup.., ..]).to_owned();
        let trimmed_features = features.slice(s![warmup.., ..]).to_owned();
        let trimmed_dates = dates[warmup..].to_vec();
        Self::new(
            assets,
            trimmed_dates,
            trimmed_prices,
            trimmed_features,
            spec.dim(),
        )
    }

    /// Number of rows on the time axis.
    pub fn len(&self) -> usize {
        self.prices.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Per-asset feature dimension.
    pub fn fdim(&self) -> usize {
        self.fdim
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    /// Position of `symbol` in the asset universe, if present.
    pub fn asset_index(&self, symbol: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == symbol)
    }

    /// Date at row `t` of the time axis.
    ///
    /// # Panics
    ///
    /// Panics if `t >= self.len()`. The environment only calls this with its
    /// own time cursor, which stays inside the axis by construction.
    pub fn date_at(&self, t: usize) -> NaiveDate {
        self.dates[t]
    }

    pub fn prices(&self) -> &Array2<f64> {
        &self.prices
    }

    /// Simple period returns; the first row is zero by definition.
    pub fn returns(&self) -> &Array2<f64> {
        &self.returns
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }
}

/// Simple percentage change along the time axis, first row zero.
fn pct_change(prices: &Array2<f64>) -> Array2<f64> {
    let mut returns = Array2::zeros(prices.raw_dim());
    for t in 1..prices.nrows() {
        for a in 0..prices.ncols() {
            returns[[t, a]] = prices[[t, a]] / prices[[t - 1, a]] - 1.0;
        }
    }
    returns
}
