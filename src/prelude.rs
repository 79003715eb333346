// 1. Traits
pub use crate::agent::Agent;
pub use crate::gym::Env;

// 2. The Core "Loop" Types
pub use crate::gym::action::Action;
pub use crate::gym::config::EnvConfig;
pub use crate::gym::env::{AgentRun, Environment, StepInfo, Transition};
pub use crate::gym::observation::Observation;
pub use crate::gym::{EnvStatus, Reward, StepOutcome};

// 3. Data & Risk Types
pub use crate::data::features::FeatureSpec;
pub use crate::data::market::MarketData;
pub use crate::gym::overlay::DrawdownOverlay;

// 4. Agents
pub use crate::agent::{AgentIdentifier, HoldAgent, RandomAgent};

// 5. Errors
pub use crate::error::{AgentError, DataError, EnvError, FolioError, FolioResult};

// 6. Reports & Math
pub use crate::math::projection::project_capped_simplex;
pub use crate::report::journal::Journal;
