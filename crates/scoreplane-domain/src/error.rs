use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("workload must declare between 1 and 10 containers, got {0}")]
    InvalidContainerCount(usize),

    #[error("container '{0}' has an empty image")]
    EmptyImage(String),

    #[error("container '{container}' uses image \".\" but no claim of type image|build|buildpack supplies it")]
    MissingBuildClaim { container: String },

    #[error("resource claim outputs must populate at least one of secretRef, configMapRef, uri, image, cert")]
    EmptyClaimOutputs,

    #[error("invalid exposure url: {0}")]
    InvalidExposureUrl(String),

    #[error("invalid workload or resource name: {0}")]
    InvalidName(String),
}
