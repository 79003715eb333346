use indicatif::style::TemplateError;
use thiserror::Error;

pub type FolioResult<T> = Result<T, FolioError>;

#[derive(Debug, Error)]
pub enum FolioError {
    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// Errors occurring within agent logic or at the agent/environment boundary.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Extension point for downstream [`Agent`] implementations whose `act()`
    /// can fail internally; the built-in stand-ins never produce it.
    ///
    /// [`Agent`]: crate::agent::Agent
    #[error("Agent logic error: {0}")]
    Logic(String),

    #[error("Invalid input to environment: {0}")]
    InvalidInput(String),
}

/// Errors related to market data shape, alignment, and validity.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Empty data set: {0}")]
    Empty(String),

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Non-positive price for asset '{asset}' at row {row}")]
    NonPositivePrice { asset: String, row: usize },

    #[error("Non-finite value: {0}")]
    NonFinite(String),

    #[error("Time axis is not strictly increasing: {0}")]
    UnorderedDates(String),
}

/// Errors related to the gym environment configuration and execution loop.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("Invalid environment state: {0}")]
    InvalidState(String),

    #[error("Invalid environment configuration: {0}")]
    InvalidConfig(String),

    #[error("Progress bar error")]
    ProgressBar(#[from] TemplateError),
}
