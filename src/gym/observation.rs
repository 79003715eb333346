use ndarray::Array1;

use crate::data::market::MarketData;

/// The agent-facing view of the simulation at one time index.
///
/// Concatenates each asset's feature vector (asset order, for the time index
/// just consumed) with the current weight vector when the environment is
/// configured to expose it. The length is fixed at construction and
/// invariant across the episode.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    values: Array1<f64>,
}

impl Observation {
    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Array1<f64>> for Observation {
    fn from(values: Array1<f64>) -> Self {
        Self { values }
    }
}

/// Pure function of (features, time cursor, weights, config flag).
///
/// The feature row is taken at `t - 1`: the cursor points at the period the
/// next step will consume, so the agent only ever sees data that is already
/// realized.
pub(crate) fn build_observation(
    data: &MarketData,
    t: usize,
    weights: &Array1<f64>,
    include_weights: bool,
) -> Observation {
    let row = data.features().row(t - 1);
    let extra = if include_weights { weights.len() } else { 0 };
    let mut values = Vec::with_capacity(row.len() + extra);
    values.extend(row.iter().copied());
    if include_weights {
        values.extend(weights.iter().copied());
    }
    Observation {
        values: Array1::from_vec(values),
    }
}
