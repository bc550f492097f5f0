use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("provisioner not configured for resource type '{0}'")]
    NotConfigured(String),

    #[error("provision failed: {0}")]
    ProvisionFailed(String),

    #[error("deprovision failed: {0}")]
    DeprovisionFailed(String),

    #[error("internal provisioner error: {0}")]
    Internal(String),
}
