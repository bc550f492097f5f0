use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use scoreplane_domain::{ResourceClaim, Workload, WorkloadExposure, WorkloadPlan, WorkloadRef, WorkloadStatus};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::state::AuditEvent;
use crate::store::DeclarativeStore;

#[derive(Default)]
struct Record {
    workload: Workload,
    claims: HashMap<String, ResourceClaim>,
    plan: Option<WorkloadPlan>,
    exposure: Option<WorkloadExposure>,
}

#[derive(Default)]
struct Inner {
    workloads: HashMap<WorkloadRef, Record>,
    events: Vec<AuditEvent>,
    /// Secret data keyed by opaque `secretRef`, each value base64-encoded at
    /// rest like a Kubernetes `Secret.data` entry.
    secrets: HashMap<String, HashMap<String, String>>,
}

/// In-memory implementation of [`DeclarativeStore`].
///
/// All data is lost on process exit. Suitable for tests and single-process
/// local runs.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for Record {
    fn default() -> Self {
        unreachable!("Record is only constructed via upsert_workload, never via Default::default()")
    }
}

#[async_trait]
impl DeclarativeStore for InMemoryStore {
    async fn get_workload(&self, workload_ref: &WorkloadRef) -> Result<Option<Workload>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.workloads.get(workload_ref).map(|r| r.workload.clone()))
    }

    async fn list_workloads(&self) -> Result<Vec<Workload>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.workloads.values().map(|r| r.workload.clone()).collect())
    }

    async fn upsert_workload(&self, workload: &Workload) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let key = workload.meta.workload_ref();
        match guard.workloads.get_mut(&key) {
            Some(record) => record.workload = workload.clone(),
            None => {
                guard.workloads.insert(
                    key,
                    Record { workload: workload.clone(), claims: HashMap::new(), plan: None, exposure: None },
                );
            }
        }
        Ok(())
    }

    async fn delete_workload(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.workloads.remove(workload_ref);
        Ok(())
    }

    async fn update_workload_status(
        &self,
        workload_ref: &WorkloadRef,
        expected_resource_version: u64,
        status: WorkloadStatus,
    ) -> Result<u64, StoreError> {
        let mut guard = self.inner.write().await;
        let record = guard
            .workloads
            .get_mut(workload_ref)
            .ok_or_else(|| StoreError::WorkloadNotFound(workload_ref.to_string()))?;
        if record.workload.meta.resource_version != expected_resource_version {
            return Err(StoreError::Conflict {
                workload_ref: workload_ref.to_string(),
                expected: expected_resource_version,
                actual: record.workload.meta.resource_version,
            });
        }
        record.workload.status = status;
        record.workload.meta.resource_version += 1;
        Ok(record.workload.meta.resource_version)
    }

    async fn get_claim(&self, workload_ref: &WorkloadRef, key: &str) -> Result<Option<ResourceClaim>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.workloads.get(workload_ref).and_then(|r| r.claims.get(key).cloned()))
    }

    async fn list_claims(&self, workload_ref: &WorkloadRef) -> Result<Vec<ResourceClaim>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard
            .workloads
            .get(workload_ref)
            .map(|r| r.claims.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn upsert_claim(&self, claim: &ResourceClaim) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let workload_ref = claim.spec.workload_ref.clone();
        let record = guard
            .workloads
            .get_mut(&workload_ref)
            .ok_or_else(|| StoreError::WorkloadNotFound(workload_ref.to_string()))?;
        record.claims.insert(claim.spec.key.clone(), claim.clone());
        Ok(())
    }

    async fn delete_claim(&self, workload_ref: &WorkloadRef, key: &str) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if let Some(record) = guard.workloads.get_mut(workload_ref) {
            record.claims.remove(key);
        }
        Ok(())
    }

    async fn get_plan(&self, workload_ref: &WorkloadRef) -> Result<Option<WorkloadPlan>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.workloads.get(workload_ref).and_then(|r| r.plan.clone()))
    }

    async fn upsert_plan(&self, plan: &WorkloadPlan) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let workload_ref = plan.spec.workload_ref.clone();
        let record = guard
            .workloads
            .get_mut(&workload_ref)
            .ok_or_else(|| StoreError::WorkloadNotFound(workload_ref.to_string()))?;
        record.plan = Some(plan.clone());
        Ok(())
    }

    async fn delete_plan(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if let Some(record) = guard.workloads.get_mut(workload_ref) {
            record.plan = None;
        }
        Ok(())
    }

    async fn get_exposure(&self, workload_ref: &WorkloadRef) -> Result<Option<WorkloadExposure>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.workloads.get(workload_ref).and_then(|r| r.exposure.clone()))
    }

    async fn upsert_exposure(&self, exposure: &WorkloadExposure) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let workload_ref =
            WorkloadRef::new(exposure.spec.workload_ref.namespace.clone(), exposure.spec.workload_ref.name.clone());
        let record = guard
            .workloads
            .get_mut(&workload_ref)
            .ok_or_else(|| StoreError::WorkloadNotFound(workload_ref.to_string()))?;
        record.exposure = Some(exposure.clone());
        Ok(())
    }

    async fn delete_exposure(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        if let Some(record) = guard.workloads.get_mut(workload_ref) {
            record.exposure = None;
        }
        Ok(())
    }

    async fn append_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        guard.events.push(event.clone());
        Ok(())
    }

    async fn list_events(&self, workload_ref: Option<&WorkloadRef>, limit: u32) -> Result<Vec<AuditEvent>, StoreError> {
        let guard = self.inner.read().await;
        let filtered: Vec<AuditEvent> = guard
            .events
            .iter()
            .filter(|ev| workload_ref.map_or(true, |r| ev.workload_ref() == r))
            .cloned()
            .collect();
        let start = filtered.len().saturating_sub(limit as usize);
        Ok(filtered[start..].to_vec())
    }

    async fn get_secret(&self, secret_ref: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        let guard = self.inner.read().await;
        Ok(guard.secrets.get(secret_ref).map(|encoded| {
            encoded
                .iter()
                .map(|(k, v)| (k.clone(), decode_secret_value(v)))
                .collect()
        }))
    }

    async fn put_secret(&self, secret_ref: &str, data: HashMap<String, String>) -> Result<(), StoreError> {
        let mut guard = self.inner.write().await;
        let encoded = data.into_iter().map(|(k, v)| (k, STANDARD.encode(v))).collect();
        guard.secrets.insert(secret_ref.to_string(), encoded);
        Ok(())
    }
}

/// Decodes a stored secret value, falling back to the raw string if it was
/// never valid base64 (e.g. seeded directly by a test or an older record).
fn decode_secret_value(encoded: &str) -> String {
    STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| encoded.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scoreplane_domain::{ObjectMeta, WorkloadSpec};

    fn workload(name: &str) -> Workload {
        Workload::new(ObjectMeta::new("default", name, Utc::now()), WorkloadSpec::default())
    }

    #[tokio::test]
    async fn upsert_and_get() {
        let store = InMemoryStore::new();
        let wl = workload("service-a");
        store.upsert_workload(&wl).await.unwrap();

        let got = store.get_workload(&WorkloadRef::new("default", "service-a")).await.unwrap();
        assert!(got.is_some());
    }

    #[tokio::test]
    async fn status_update_rejects_stale_resource_version() {
        let store = InMemoryStore::new();
        let wl = workload("service-a");
        let r = wl.meta.workload_ref();
        store.upsert_workload(&wl).await.unwrap();

        let result = store.update_workload_status(&r, 999, WorkloadStatus::default()).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn status_update_bumps_resource_version_on_success() {
        let store = InMemoryStore::new();
        let wl = workload("service-a");
        let r = wl.meta.workload_ref();
        let starting_version = wl.meta.resource_version;
        store.upsert_workload(&wl).await.unwrap();

        let new_version =
            store.update_workload_status(&r, starting_version, WorkloadStatus::default()).await.unwrap();
        assert_eq!(new_version, starting_version + 1);
    }

    #[tokio::test]
    async fn claim_upsert_requires_existing_workload() {
        let store = InMemoryStore::new();
        let claim = scoreplane_domain::ResourceClaim::new(
            ObjectMeta::new("default", "service-a-db", Utc::now()),
            scoreplane_domain::ResourceClaimSpec {
                workload_ref: WorkloadRef::new("default", "service-a"),
                key: "db".to_string(),
                type_: "postgres".to_string(),
                class: None,
                id: None,
                params: serde_json::Value::Null,
                deprovision_policy: scoreplane_domain::DeprovisionPolicy::Delete,
            },
        );
        let result = store.upsert_claim(&claim).await;
        assert!(matches!(result, Err(StoreError::WorkloadNotFound(_))));
    }

    #[tokio::test]
    async fn events_filtered_by_workload() {
        use uuid::Uuid;

        let store = InMemoryStore::new();
        let a = WorkloadRef::new("default", "a");
        let b = WorkloadRef::new("default", "b");
        store
            .append_event(&AuditEvent::WorkloadUpserted { id: Uuid::new_v4(), at: Utc::now(), workload_ref: a.clone() })
            .await
            .unwrap();
        store
            .append_event(&AuditEvent::WorkloadUpserted { id: Uuid::new_v4(), at: Utc::now(), workload_ref: b })
            .await
            .unwrap();

        let for_a = store.list_events(Some(&a), 100).await.unwrap();
        assert_eq!(for_a.len(), 1);
    }

    #[tokio::test]
    async fn secret_round_trips_through_base64_at_rest() {
        let store = InMemoryStore::new();
        let mut data = HashMap::new();
        data.insert("username".to_string(), "app".to_string());
        data.insert("password".to_string(), "s3cr3t".to_string());
        store.put_secret("vault://db-creds", data.clone()).await.unwrap();

        let fetched = store.get_secret("vault://db-creds").await.unwrap().unwrap();
        assert_eq!(fetched, data);
    }

    #[tokio::test]
    async fn unknown_secret_ref_returns_none() {
        let store = InMemoryStore::new();
        assert!(store.get_secret("vault://missing").await.unwrap().is_none());
    }
}
