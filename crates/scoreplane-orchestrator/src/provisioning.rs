//! Provisioner dispatch (C12 integration): drives each not-yet-bound claim
//! through its registered [`Provisioner`] and persists the resulting status.

use chrono::Utc;
use scoreplane_domain::{ClaimPhase, Reason, ResourceClaim};
use scoreplane_provisioner::ProvisionerRegistry;
use scoreplane_store::DeclarativeStore;
use tracing::{debug, warn};

use crate::error::ReconcileError;

/// For every claim not already `Bound` or `Failed`, calls its provisioner
/// and persists the resulting status. Mutates `claims` in place so the
/// caller's downstream compose/resolve step sees fresh outputs within the
/// same pass.
pub async fn drive_provisioning(
    store: &dyn DeclarativeStore,
    registry: &ProvisionerRegistry,
    claims: &mut [ResourceClaim],
) -> Result<(), ReconcileError> {
    for claim in claims.iter_mut() {
        if matches!(claim.status.phase, Some(ClaimPhase::Bound) | Some(ClaimPhase::Failed)) {
            continue;
        }

        let provisioner = match registry.for_type(&claim.spec.type_) {
            Ok(p) => p,
            Err(err) => {
                warn!(claim = %claim.spec.key, type_ = %claim.spec.type_, error = %err, "no provisioner registered");
                continue;
            }
        };

        match provisioner.provision(&claim.spec).await {
            Ok(outputs) => {
                claim.status.phase = Some(ClaimPhase::Bound);
                claim.status.reason = Some(Reason::Succeeded);
                claim.status.message = None;
                claim.status.outputs_available = true;
                claim.status.outputs = Some(outputs);
                claim.status.observed_generation = claim.meta.generation;
                claim.status.last_transition_time = Some(Utc::now());
                debug!(claim = %claim.spec.key, "claim bound");
            }
            Err(err) => {
                claim.status.phase = Some(ClaimPhase::Failed);
                claim.status.reason = Some(Reason::BindingFailed);
                claim.status.message = Some(err.to_string());
                claim.status.outputs_available = false;
                claim.status.last_transition_time = Some(Utc::now());
                warn!(claim = %claim.spec.key, error = %err, "provisioning failed");
            }
        }
        store.upsert_claim(claim).await?;
    }
    Ok(())
}

/// Fetches the concrete secret data for every bound claim whose outputs carry
/// a `secretRef`, merging it into that claim's `extra` outputs (§3: "For
/// `secretRef`, the concrete secret is fetched and its data exposed as
/// additional outputs"). Mutates `claims` in place; this is not persisted
/// back to the store, it only feeds the outputs table this reconcile pass
/// builds from `claims` downstream — the secret's own data is the source of
/// truth, not a cached copy on the claim.
///
/// Existing `extra` keys win over anything the secret defines, so a
/// provisioner's own synthetic outputs are never clobbered by a same-named
/// secret key.
pub async fn expand_secret_outputs(store: &dyn DeclarativeStore, claims: &mut [ResourceClaim]) -> Result<(), ReconcileError> {
    for claim in claims.iter_mut() {
        let Some(outputs) = claim.status.outputs.as_mut() else { continue };
        let Some(secret_ref) = outputs.secret_ref.clone() else { continue };

        match store.get_secret(&secret_ref).await? {
            Some(data) => {
                for (k, v) in data {
                    outputs.extra.entry(k).or_insert(v);
                }
            }
            None => {
                debug!(claim = %claim.spec.key, secret_ref = %secret_ref, "secretRef has no registered secret data");
            }
        }
    }
    Ok(())
}
