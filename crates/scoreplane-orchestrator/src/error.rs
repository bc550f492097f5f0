use scoreplane_compose::ComposeError;
use scoreplane_config::ConfigError;
use scoreplane_domain::DomainError;
use scoreplane_provisioner::ProvisionError;
use scoreplane_store::StoreError;
use thiserror::Error;

/// C5's failure mode: no backend in the selected profile survives constraint
/// filtering. Surfaces as `InputsValid=False, reason=PolicyViolation`.
#[derive(Debug, Error)]
pub enum SelectError {
    #[error("no backend in profile '{profile}' matches the workload's constraints")]
    NoBackend { profile: String },

    #[error("profile '{0}' does not exist in the loaded configuration")]
    UnknownProfile(String),
}

/// Top-level reconcile failure, wrapping every stage's error via `#[from]`.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Select(#[from] SelectError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error("workload '{0}' not found")]
    WorkloadNotFound(String),
}
