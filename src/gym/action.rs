use ndarray::Array1;

use crate::error::{AgentError, FolioResult};

/// An unconstrained real-valued allocation proposal of length `n_assets`.
///
/// The environment squashes each coordinate through `tanh` before scaling,
/// so the domain is genuinely unconstrained. Validation happens at the
/// environment boundary: non-finite or wrongly sized actions are rejected
/// before they can reach the projector and corrupt NAV.
#[derive(Debug, Clone, PartialEq)]
pub struct Action(Array1<f64>);

impl Action {
    pub fn new(values: Array1<f64>) -> Self {
        Self(values)
    }

    /// The zero action: propose no change to the current allocation.
    pub fn zeros(n_assets: usize) -> Self {
        Self(Array1::zeros(n_assets))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.0
    }

    /// Checks dimensionality and finiteness against the environment's
    /// asset universe.
    pub(crate) fn validate(&self, n_assets: usize) -> FolioResult<()> {
        if self.len() != n_assets {
            return Err(AgentError::InvalidInput(format!(
                "action has length {}, expected {}",
                self.len(),
                n_assets
            ))
            .into());
        }
        if let Some((i, &x)) = self.0.iter().enumerate().find(|(_, x)| !x.is_finite()) {
            return Err(AgentError::InvalidInput(format!(
                "action coordinate {i} is not finite ({x})"
            ))
            .into());
        }
        Ok(())
    }
}

impl From<Vec<f64>> for Action {
    fn from(values: Vec<f64>) -> Self {
        Self(Array1::from_vec(values))
    }
}

impl From<Array1<f64>> for Action {
    fn from(values: Array1<f64>) -> Self {
        Self(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_finite_action() {
        let action = Action::from(vec![0.5, -2.0, 10.0]);
        assert!(action.validate(3).is_ok());
    }

    #[test]
    fn test_validate_rejects_wrong_length() {
        let action = Action::zeros(2);
        assert!(action.validate(3).is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        assert!(Action::from(vec![0.0, f64::NAN]).validate(2).is_err());
        assert!(Action::from(vec![f64::INFINITY, 0.0]).validate(2).is_err());
    }
}
