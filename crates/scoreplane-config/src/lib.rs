mod cache;
pub mod error;
mod loader;
mod model;
mod raw;

pub use cache::ConfigCache;
pub use error::{ConfigError, ValidationError};
pub use loader::{load_config_from_path, load_config_from_str};
pub use model::{
    Backend, Constraints, Defaults, MatchExpression, MatchOperator, OrchestratorConfig, Profile,
    ProvisionerBinding, ProvisionerConfig, ProvisionerDefaults, ProvisionerStrategy, Selector,
    API_VERSION, KIND,
};
