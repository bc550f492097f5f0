//! Status aggregator (C9): the single writer of `Workload.status`.

use chrono::Utc;
use scoreplane_domain::{
    BindingSummary, ClaimPhase, Condition, ConditionStatus, ConditionType, PlanPhase, Reason, ResourceClaim,
    Workload, WorkloadPlan, WorkloadStatus,
};
use scoreplane_store::{AuditEvent, DeclarativeStore, StoreError};
use tracing::warn;
use uuid::Uuid;

use crate::error::ReconcileError;

/// Maps a runtime-reported reason string onto the abstract taxonomy.
/// Anything not recognized here is filtered out rather than leaked onto a
/// user-visible condition (§6).
pub fn normalize_runtime_reason(raw: &str) -> Option<Reason> {
    match raw {
        "Succeeded" | "Available" | "MinimumReplicasAvailable" => Some(Reason::Succeeded),
        "Progressing" | "Creating" | "Scaling" => Some(Reason::RuntimeProvisioning),
        "Selecting" | "Scheduling" => Some(Reason::RuntimeSelecting),
        "ImagePullBackOff" | "CrashLoopBackOff" | "Degraded" | "Unavailable" => Some(Reason::RuntimeDegraded),
        "QuotaExceeded" | "ResourceQuotaExceeded" => Some(Reason::QuotaExceeded),
        "Forbidden" | "PermissionDenied" => Some(Reason::PermissionDenied),
        "NetworkUnavailable" | "DNSError" => Some(Reason::NetworkUnavailable),
        _ => None,
    }
}

/// Outcome of validate/select and config availability, the three states
/// `InputsValid` can report. `Unknown` covers "couldn't even tell" — the
/// config loader has nothing cached to fall back on — as distinct from
/// `Invalid`'s "looked at it, it's wrong" (§7, S4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputsValidity {
    Valid,
    Invalid(Reason),
    Unknown(Reason),
}

/// Inputs to status derivation that the reconcile loop has already computed
/// this pass, so this module stays a pure function of its arguments.
pub struct StatusInputs<'a> {
    pub inputs_valid: InputsValidity,
    pub claims: &'a [ResourceClaim],
    pub plan: Option<&'a WorkloadPlan>,
    pub projection_error: bool,
    pub endpoint: Option<String>,
}

pub fn derive_status(generation: u64, inputs: &StatusInputs) -> WorkloadStatus {
    let now = Utc::now();

    let inputs_valid = match inputs.inputs_valid {
        InputsValidity::Valid => Condition::new(ConditionType::InputsValid, ConditionStatus::True, Some(Reason::Succeeded), None, generation, now),
        InputsValidity::Invalid(reason) => Condition::new(ConditionType::InputsValid, ConditionStatus::False, Some(reason), None, generation, now),
        InputsValidity::Unknown(reason) => Condition::new(ConditionType::InputsValid, ConditionStatus::Unknown, Some(reason), None, generation, now),
    };

    let any_failed = inputs.claims.iter().any(|c| c.status.is_failed());
    let all_bound_with_outputs = inputs.claims.iter().all(|c| c.status.is_bound() && c.status.outputs_available);
    let claims_ready = if any_failed {
        Condition::new(ConditionType::ClaimsReady, ConditionStatus::False, Some(Reason::BindingFailed), None, generation, now)
    } else if all_bound_with_outputs {
        Condition::new(ConditionType::ClaimsReady, ConditionStatus::True, Some(Reason::Succeeded), None, generation, now)
    } else {
        Condition::new(ConditionType::ClaimsReady, ConditionStatus::False, Some(Reason::BindingPending), None, generation, now)
    };

    let runtime_ready = if inputs.projection_error {
        Condition::new(ConditionType::RuntimeReady, ConditionStatus::False, Some(Reason::ProjectionError), None, generation, now)
    } else {
        match inputs.plan {
            None => Condition::new(ConditionType::RuntimeReady, ConditionStatus::Unknown, Some(Reason::RuntimeSelecting), None, generation, now),
            Some(plan) => match plan.status.phase {
                Some(PlanPhase::Ready) => Condition::new(ConditionType::RuntimeReady, ConditionStatus::True, Some(Reason::Succeeded), None, generation, now),
                Some(PlanPhase::Failed) => Condition::new(ConditionType::RuntimeReady, ConditionStatus::False, Some(Reason::RuntimeDegraded), plan.status.message.clone(), generation, now),
                Some(PlanPhase::Provisioning) => Condition::new(ConditionType::RuntimeReady, ConditionStatus::False, Some(Reason::RuntimeProvisioning), None, generation, now),
                Some(PlanPhase::Pending) | None => Condition::new(ConditionType::RuntimeReady, ConditionStatus::Unknown, Some(Reason::RuntimeSelecting), None, generation, now),
            },
        }
    };

    let ready_bool = inputs_valid.is_true() && claims_ready.is_true() && runtime_ready.is_true();
    let ready = Condition::new(ConditionType::Ready, ConditionStatus::from(ready_bool), None, None, generation, now);

    let bindings = inputs
        .claims
        .iter()
        .map(|c| BindingSummary {
            key: c.spec.key.clone(),
            phase: c.status.phase.unwrap_or(ClaimPhase::Pending),
            reason: c.status.reason,
            message: c.status.message.clone(),
            outputs_available: c.status.outputs_available,
        })
        .collect();

    WorkloadStatus {
        conditions: vec![inputs_valid, claims_ready, runtime_ready, ready],
        endpoint: inputs.endpoint.clone(),
        bindings,
    }
}

/// Writes `status` with optimistic concurrency, retrying up to `max_retries`
/// times on [`StoreError::Conflict`] by re-reading the current resource
/// version. Every conflict is logged and audited.
pub async fn write_status_with_retry(
    store: &dyn DeclarativeStore,
    workload: &Workload,
    status: WorkloadStatus,
    max_retries: u32,
) -> Result<(), ReconcileError> {
    let workload_ref = workload.meta.workload_ref();
    let mut expected = workload.meta.resource_version;

    for attempt in 0..=max_retries {
        match store.update_workload_status(&workload_ref, expected, status.clone()).await {
            Ok(_) => return Ok(()),
            Err(StoreError::Conflict { workload_ref: wr, expected: exp, actual }) => {
                store.append_event(&AuditEvent::StatusConflict { id: Uuid::new_v4(), at: Utc::now(), workload_ref: workload_ref.clone() }).await?;
                if attempt == max_retries {
                    warn!(workload = %workload_ref, attempt, "status write conflict, giving up after max retries");
                    return Err(StoreError::Conflict { workload_ref: wr, expected: exp, actual }.into());
                }
                warn!(workload = %workload_ref, attempt, "status write conflict, retrying");
                expected = actual;
            }
            Err(other) => return Err(other.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoreplane_domain::{
        ClaimOutputs, Container, DeprovisionPolicy, ObjectMeta, ResourceClaimSpec, ResourceClaimStatus,
        WorkloadRef, WorkloadSpec,
    };
    use scoreplane_store::InMemoryStore;
    use std::collections::HashMap;

    fn bound_claim(key: &str) -> ResourceClaim {
        let mut claim = ResourceClaim::new(
            ObjectMeta::new("default", format!("web-{key}"), Utc::now()),
            ResourceClaimSpec {
                workload_ref: WorkloadRef::new("default", "web"),
                key: key.to_string(),
                type_: "postgres".to_string(),
                class: None,
                id: None,
                params: serde_json::Value::Null,
                deprovision_policy: DeprovisionPolicy::default(),
            },
        );
        claim.status = ResourceClaimStatus {
            phase: Some(ClaimPhase::Bound),
            reason: Some(Reason::Succeeded),
            message: None,
            outputs: Some(ClaimOutputs { uri: Some("postgres://x".to_string()), ..Default::default() }),
            outputs_available: true,
            observed_generation: 1,
            last_transition_time: None,
        };
        claim
    }

    #[test]
    fn normalizes_known_runtime_reasons() {
        assert_eq!(normalize_runtime_reason("ImagePullBackOff"), Some(Reason::RuntimeDegraded));
        assert_eq!(normalize_runtime_reason("Progressing"), Some(Reason::RuntimeProvisioning));
    }

    #[test]
    fn filters_unknown_runtime_reasons() {
        assert_eq!(normalize_runtime_reason("SomeVendorSpecificThing"), None);
    }

    #[test]
    fn ready_true_only_when_all_three_conditions_true() {
        let claims = vec![bound_claim("db")];
        let inputs = StatusInputs {
            inputs_valid: InputsValidity::Valid,
            claims: &claims,
            plan: None,
            projection_error: false,
            endpoint: None,
        };
        let status = derive_status(1, &inputs);
        let ready = status.condition(ConditionType::Ready).unwrap();
        assert!(!ready.is_true(), "RuntimeReady is Unknown with no plan, so Ready must not be True");
    }

    #[test]
    fn failed_claim_forces_claims_ready_false() {
        let mut claim = bound_claim("db");
        claim.status.phase = Some(ClaimPhase::Failed);
        claim.status.outputs_available = false;
        let claims = vec![claim];
        let inputs = StatusInputs { inputs_valid: InputsValidity::Valid, claims: &claims, plan: None, projection_error: false, endpoint: None };
        let status = derive_status(1, &inputs);
        let claims_ready = status.condition(ConditionType::ClaimsReady).unwrap();
        assert_eq!(claims_ready.status, ConditionStatus::False);
        assert_eq!(claims_ready.reason, Some(Reason::BindingFailed));
    }

    #[test]
    fn projection_error_overrides_runtime_ready() {
        let claims = vec![bound_claim("db")];
        let inputs = StatusInputs { inputs_valid: InputsValidity::Valid, claims: &claims, plan: None, projection_error: true, endpoint: None };
        let status = derive_status(1, &inputs);
        let runtime_ready = status.condition(ConditionType::RuntimeReady).unwrap();
        assert_eq!(runtime_ready.status, ConditionStatus::False);
        assert_eq!(runtime_ready.reason, Some(Reason::ProjectionError));
    }

    #[test]
    fn unavailable_config_sets_inputs_valid_unknown() {
        let claims: Vec<ResourceClaim> = vec![];
        let inputs = StatusInputs {
            inputs_valid: InputsValidity::Unknown(Reason::ConfigNotFound),
            claims: &claims,
            plan: None,
            projection_error: false,
            endpoint: None,
        };
        let status = derive_status(1, &inputs);
        let inputs_valid = status.condition(ConditionType::InputsValid).unwrap();
        assert_eq!(inputs_valid.status, ConditionStatus::Unknown);
        assert_eq!(inputs_valid.reason, Some(Reason::ConfigNotFound));
    }

    fn workload() -> Workload {
        let mut containers = HashMap::new();
        containers.insert(
            "main".to_string(),
            Container { image: "nginx".to_string(), command: vec![], args: vec![], env: HashMap::new(), files: vec![], probes: None, resources: None },
        );
        Workload::new(ObjectMeta::new("default", "web", Utc::now()), WorkloadSpec { containers, ..Default::default() })
    }

    #[tokio::test]
    async fn write_status_succeeds_on_matching_version() {
        let store = InMemoryStore::new();
        let wl = workload();
        store.upsert_workload(&wl).await.unwrap();
        let claims = vec![bound_claim("db")];
        let status = derive_status(1, &StatusInputs { inputs_valid: InputsValidity::Valid, claims: &claims, plan: None, projection_error: false, endpoint: None });
        write_status_with_retry(&store, &wl, status, 3).await.unwrap();
    }

    #[tokio::test]
    async fn write_status_retries_after_conflict() {
        let store = InMemoryStore::new();
        let mut wl = workload();
        store.upsert_workload(&wl).await.unwrap();

        // simulate another writer bumping resource_version first.
        let bumped = store.get_workload(&wl.meta.workload_ref()).await.unwrap().unwrap();
        store.update_workload_status(&wl.meta.workload_ref(), bumped.meta.resource_version, WorkloadStatus::default()).await.unwrap();

        let claims = vec![bound_claim("db")];
        let status = derive_status(1, &StatusInputs { inputs_valid: InputsValidity::Valid, claims: &claims, plan: None, projection_error: false, endpoint: None });
        // wl.meta.resource_version is now stale by one, but retry should recover.
        write_status_with_retry(&store, &wl, status, 3).await.unwrap();
        wl.meta.resource_version += 1;
    }
}
