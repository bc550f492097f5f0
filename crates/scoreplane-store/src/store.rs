use std::collections::HashMap;

use async_trait::async_trait;
use scoreplane_domain::{ResourceClaim, Workload, WorkloadExposure, WorkloadPlan, WorkloadRef, WorkloadStatus};

use crate::error::StoreError;
use crate::state::AuditEvent;

/// Storage for the four typed objects exchanged with the orchestrator (§6).
///
/// Implementations are expected to be cheap to clone and safe to share across
/// the worker pool that drives C11 — concurrent reconciles for *different*
/// Workloads may call any method here at once; per-Workload serialization is
/// the orchestrator loop's responsibility, not the store's.
#[async_trait]
pub trait DeclarativeStore: Send + Sync + 'static {
    async fn get_workload(&self, workload_ref: &WorkloadRef) -> Result<Option<Workload>, StoreError>;
    async fn list_workloads(&self) -> Result<Vec<Workload>, StoreError>;
    async fn upsert_workload(&self, workload: &Workload) -> Result<(), StoreError>;
    async fn delete_workload(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError>;

    /// Optimistic-concurrency status write: succeeds only if the stored
    /// `resource_version` still equals `expected_resource_version`, then
    /// returns the bumped version. On mismatch, returns
    /// [`StoreError::Conflict`] — the caller retries after
    /// `ConflictRequeueDelay` (§4.7, §5).
    async fn update_workload_status(
        &self,
        workload_ref: &WorkloadRef,
        expected_resource_version: u64,
        status: WorkloadStatus,
    ) -> Result<u64, StoreError>;

    async fn get_claim(&self, workload_ref: &WorkloadRef, key: &str) -> Result<Option<ResourceClaim>, StoreError>;
    async fn list_claims(&self, workload_ref: &WorkloadRef) -> Result<Vec<ResourceClaim>, StoreError>;
    async fn upsert_claim(&self, claim: &ResourceClaim) -> Result<(), StoreError>;
    async fn delete_claim(&self, workload_ref: &WorkloadRef, key: &str) -> Result<(), StoreError>;

    async fn get_plan(&self, workload_ref: &WorkloadRef) -> Result<Option<WorkloadPlan>, StoreError>;
    async fn upsert_plan(&self, plan: &WorkloadPlan) -> Result<(), StoreError>;
    async fn delete_plan(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError>;

    async fn get_exposure(&self, workload_ref: &WorkloadRef) -> Result<Option<WorkloadExposure>, StoreError>;
    async fn upsert_exposure(&self, exposure: &WorkloadExposure) -> Result<(), StoreError>;
    async fn delete_exposure(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError>;

    async fn append_event(&self, event: &AuditEvent) -> Result<(), StoreError>;
    async fn list_events(&self, workload_ref: Option<&WorkloadRef>, limit: u32) -> Result<Vec<AuditEvent>, StoreError>;

    /// Fetches the decoded key-value data of a secret referenced by a claim's
    /// `outputs.secretRef` (§3's "outputs table" note: "For `secretRef`, the
    /// concrete secret is fetched and its data exposed as additional
    /// outputs"). Values are stored at rest the way a Kubernetes `Secret`'s
    /// `data` map is — base64 — and decoded here so callers never see the
    /// encoding. `None` if no secret is registered under that reference.
    async fn get_secret(&self, secret_ref: &str) -> Result<Option<HashMap<String, String>>, StoreError>;

    /// Registers (or replaces) the data a secret reference resolves to.
    /// Exercised by provisioners that back a claim's outputs with a secret
    /// (e.g. `SecretRefProvisioner`) and by operators seeding credentials out
    /// of band.
    async fn put_secret(&self, secret_ref: &str, data: HashMap<String, String>) -> Result<(), StoreError>;
}
