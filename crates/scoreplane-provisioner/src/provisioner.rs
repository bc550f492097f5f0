use async_trait::async_trait;
use scoreplane_domain::{ClaimOutputs, ClaimPhase, Reason, ResourceClaimSpec};

use crate::error::ProvisionError;

/// Snapshot returned by [`Provisioner::get_status`] for drift/status polling
/// of a claim whose provisioning has already been kicked off.
#[derive(Debug, Clone)]
pub struct ClaimStatusReport {
    pub phase: ClaimPhase,
    pub reason: Option<Reason>,
    pub message: Option<String>,
}

/// Binds a `ResourceClaimSpec.type` to an external (or stubbed) fulfillment
/// strategy. Implementations are expected to be cheap to clone/share and safe
/// to call concurrently across claims — any per-claim serialization is the
/// caller's (claim reconciler's) responsibility, same contract as
/// [`scoreplane_store::DeclarativeStore`].
#[async_trait]
pub trait Provisioner: Send + Sync + 'static {
    fn type_name(&self) -> &str;

    async fn provision(&self, claim: &ResourceClaimSpec) -> Result<ClaimOutputs, ProvisionError>;

    async fn deprovision(&self, claim: &ResourceClaimSpec) -> Result<(), ProvisionError>;

    async fn get_status(&self, claim: &ResourceClaimSpec) -> Result<ClaimStatusReport, ProvisionError>;
}
