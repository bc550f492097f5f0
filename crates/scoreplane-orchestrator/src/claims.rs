//! Claim reconciler (C6): upserts one [`ResourceClaim`] per declared
//! dependency, diffing on semantic equality to avoid update storms.

use chrono::Utc;
use scoreplane_domain::{ObjectMeta, ResourceClaim, ResourceClaimSpec, Workload};
use scoreplane_store::{AuditEvent, DeclarativeStore};
use uuid::Uuid;

use crate::error::ReconcileError;

/// Upserts every claim the Workload currently declares and returns the
/// resulting set. Claims for keys the Workload no longer declares are left
/// untouched here — stale-claim GC is not implemented (see DESIGN.md).
pub async fn reconcile_claims(
    store: &dyn DeclarativeStore,
    workload: &Workload,
) -> Result<Vec<ResourceClaim>, ReconcileError> {
    let workload_ref = workload.meta.workload_ref();
    let mut claims = Vec::with_capacity(workload.spec.resources.len());

    for (key, resource) in &workload.spec.resources {
        let desired = ResourceClaimSpec {
            workload_ref: workload_ref.clone(),
            key: key.clone(),
            type_: resource.type_.clone(),
            class: resource.class.clone(),
            id: None,
            params: resource.params.clone(),
            deprovision_policy: Default::default(),
        };

        let existing = store.get_claim(&workload_ref, key).await?;
        let claim = match existing {
            None => {
                let claim = ResourceClaim::new(ObjectMeta::new(workload_ref.namespace.clone(), desired.derived_name(), Utc::now()), desired);
                store.upsert_claim(&claim).await?;
                store
                    .append_event(&AuditEvent::ClaimUpserted {
                        id: Uuid::new_v4(),
                        at: Utc::now(),
                        workload_ref: workload_ref.clone(),
                        key: key.clone(),
                    })
                    .await?;
                claim
            }
            Some(mut current) => {
                if !current.spec.semantically_eq(&desired) {
                    current.spec = desired;
                    current.meta.resource_version += 1;
                    store.upsert_claim(&current).await?;
                    store
                        .append_event(&AuditEvent::ClaimUpserted {
                            id: Uuid::new_v4(),
                            at: Utc::now(),
                            workload_ref: workload_ref.clone(),
                            key: key.clone(),
                        })
                        .await?;
                }
                current
            }
        };
        claims.push(claim);
    }

    Ok(claims)
}
