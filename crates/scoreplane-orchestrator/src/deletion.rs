//! Deletion coordinator (C10): finalizer lifecycle and per-claim
//! `DeprovisionPolicy` application when a Workload is marked for deletion.

use scoreplane_domain::{DeprovisionPolicy, ResourceClaim, Workload};
use scoreplane_store::{DeclarativeStore, StoreError};
use tracing::{info, warn};

use crate::error::ReconcileError;

pub const FINALIZER: &str = "workloads.score.dev/finalizer";

/// Outcome of one deletion pass: whether the caller should requeue (claims
/// still pending deprovision) or the finalizer was removed and the Workload
/// can now be garbage-collected by the store.
#[derive(Debug, PartialEq, Eq)]
pub enum DeletionOutcome {
    Requeue { claims_to_wait_for: usize },
    FinalizerRemoved,
}

/// Adds the finalizer at first claim creation — idempotent, called from the
/// claim reconciler's path, not deletion itself.
pub fn ensure_finalizer(workload: &mut Workload) -> bool {
    if workload.meta.has_finalizer(FINALIZER) {
        return false;
    }
    workload.meta.add_finalizer(FINALIZER);
    true
}

/// Applies each owned claim's `DeprovisionPolicy` and decides whether the
/// finalizer can be removed this pass.
pub async fn reconcile_deletion(store: &dyn DeclarativeStore, workload: &mut Workload) -> Result<DeletionOutcome, ReconcileError> {
    let workload_ref = workload.meta.workload_ref();
    let claims = store.list_claims(&workload_ref).await?;

    let mut waiting = 0usize;
    for claim in &claims {
        match apply_policy(store, &workload_ref, claim).await {
            Ok(true) => waiting += 1,
            Ok(false) => {}
            Err(err) => {
                warn!(workload = %workload_ref, claim = %claim.spec.key, error = %err, "deprovision policy application failed, will retry");
                waiting += 1;
            }
        }
    }

    if waiting > 0 {
        return Ok(DeletionOutcome::Requeue { claims_to_wait_for: waiting });
    }

    if workload.meta.has_finalizer(FINALIZER) {
        workload.meta.remove_finalizer(FINALIZER);
        store.upsert_workload(workload).await?;
        info!(workload = %workload_ref, "finalizer removed, workload eligible for gc");
    }
    Ok(DeletionOutcome::FinalizerRemoved)
}

/// Returns `Ok(true)` if this claim should still be waited for (policy is
/// `Delete` and it hasn't disappeared from the store yet).
async fn apply_policy(store: &dyn DeclarativeStore, workload_ref: &scoreplane_domain::WorkloadRef, claim: &ResourceClaim) -> Result<bool, StoreError> {
    match claim.spec.deprovision_policy {
        DeprovisionPolicy::Delete => {
            store.delete_claim(workload_ref, &claim.spec.key).await?;
            Ok(true)
        }
        DeprovisionPolicy::Retain => {
            // Claims carry no owner-reference field — ownership is implicit in
            // `spec.workload_ref` — so "retain" is just leaving the claim as
            // it is; clearing any finalizers is a no-op today but keeps this
            // claim from ever blocking on a finalizer this Workload no longer
            // manages once deleted.
            let mut retained = claim.clone();
            retained.meta.finalizers.clear();
            store.upsert_claim(&retained).await?;
            Ok(false)
        }
        DeprovisionPolicy::Orphan => Ok(false),
    }
}
