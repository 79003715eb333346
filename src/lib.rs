pub mod agent;
pub mod data;
pub mod error;
pub mod gym;
pub mod math;
pub mod prelude;
pub mod report;

pub use agent::{Agent, AgentIdentifier, HoldAgent, RandomAgent};
pub use data::{features::FeatureSpec, market::MarketData};
pub use error::{FolioError, FolioResult};
pub use gym::{
    Env, EnvStatus, Reward, StepOutcome,
    action::Action,
    config::EnvConfig,
    env::{AgentRun, Environment, StepInfo, Transition},
    observation::Observation,
    overlay::DrawdownOverlay,
};
pub use math::projection::project_capped_simplex;
pub use report::journal::Journal;
