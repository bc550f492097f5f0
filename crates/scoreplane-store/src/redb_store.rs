use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use redb::{Database, ReadableTable, TableDefinition};
use scoreplane_domain::{ResourceClaim, Workload, WorkloadExposure, WorkloadPlan, WorkloadRef, WorkloadStatus};

use crate::error::StoreError;
use crate::state::AuditEvent;
use crate::store::DeclarativeStore;

const WORKLOADS: TableDefinition<&str, &[u8]> = TableDefinition::new("workloads");
const CLAIMS: TableDefinition<&str, &[u8]> = TableDefinition::new("claims");
const PLANS: TableDefinition<&str, &[u8]> = TableDefinition::new("plans");
const EXPOSURES: TableDefinition<&str, &[u8]> = TableDefinition::new("exposures");
const EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("events");
const META: TableDefinition<&str, u64> = TableDefinition::new("meta");
/// Secret data, base64-encoded per value the way a Kubernetes `Secret.data`
/// map is, keyed by opaque `secretRef`.
const SECRETS: TableDefinition<&str, &[u8]> = TableDefinition::new("secrets");

fn workload_key(r: &WorkloadRef) -> String {
    format!("{}/{}", r.namespace, r.name)
}

fn claim_key(r: &WorkloadRef, key: &str) -> String {
    format!("{}/{}/{}", r.namespace, r.name, key)
}

fn claim_prefix(r: &WorkloadRef) -> String {
    format!("{}/{}/", r.namespace, r.name)
}

/// Persistent `DeclarativeStore` backed by a redb database file.
///
/// All four record kinds survive process restarts. Suitable for a
/// single-node local deployment (§4.12).
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open (or create) a redb database at `path`.
    ///
    /// Parent directories are created automatically.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        let db = Database::create(path).map_err(|e| StoreError::Internal(e.to_string()))?;

        {
            let wtxn = db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(WORKLOADS).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(CLAIMS).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(PLANS).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(EXPOSURES).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(EVENTS).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(META).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.open_table(SECRETS).map_err(|e| StoreError::Internal(e.to_string()))?;
            wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        }

        Ok(Self { db: Arc::new(db) })
    }
}

#[async_trait]
impl DeclarativeStore for RedbStore {
    async fn get_workload(&self, workload_ref: &WorkloadRef) -> Result<Option<Workload>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(WORKLOADS).map_err(|e| StoreError::Internal(e.to_string()))?;
        match table.get(workload_key(workload_ref).as_str()).map_err(|e| StoreError::Internal(e.to_string()))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    async fn list_workloads(&self) -> Result<Vec<Workload>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(WORKLOADS).map_err(|e| StoreError::Internal(e.to_string()))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(|e| StoreError::Internal(e.to_string()))? {
            let (_k, v) = entry.map_err(|e| StoreError::Internal(e.to_string()))?;
            results.push(serde_json::from_slice(v.value())?);
        }
        Ok(results)
    }

    async fn upsert_workload(&self, workload: &Workload) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(workload)?;
        let key = workload_key(&workload.meta.workload_ref());
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(WORKLOADS).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete_workload(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(WORKLOADS).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.remove(workload_key(workload_ref).as_str()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn update_workload_status(
        &self,
        workload_ref: &WorkloadRef,
        expected_resource_version: u64,
        status: WorkloadStatus,
    ) -> Result<u64, StoreError> {
        let key = workload_key(workload_ref);
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        let new_version;
        {
            let mut table = wtxn.open_table(WORKLOADS).map_err(|e| StoreError::Internal(e.to_string()))?;
            let mut workload: Workload = match table.get(key.as_str()).map_err(|e| StoreError::Internal(e.to_string()))? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => return Err(StoreError::WorkloadNotFound(workload_ref.to_string())),
            };
            if workload.meta.resource_version != expected_resource_version {
                return Err(StoreError::Conflict {
                    workload_ref: workload_ref.to_string(),
                    expected: expected_resource_version,
                    actual: workload.meta.resource_version,
                });
            }
            workload.status = status;
            workload.meta.resource_version += 1;
            new_version = workload.meta.resource_version;
            let bytes = serde_json::to_vec(&workload)?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(new_version)
    }

    async fn get_claim(&self, workload_ref: &WorkloadRef, key: &str) -> Result<Option<ResourceClaim>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(CLAIMS).map_err(|e| StoreError::Internal(e.to_string()))?;
        match table.get(claim_key(workload_ref, key).as_str()).map_err(|e| StoreError::Internal(e.to_string()))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    async fn list_claims(&self, workload_ref: &WorkloadRef) -> Result<Vec<ResourceClaim>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(CLAIMS).map_err(|e| StoreError::Internal(e.to_string()))?;
        let prefix = claim_prefix(workload_ref);
        let mut results = Vec::new();
        for entry in table.iter().map_err(|e| StoreError::Internal(e.to_string()))? {
            let (k, v) = entry.map_err(|e| StoreError::Internal(e.to_string()))?;
            if k.value().starts_with(&prefix) {
                results.push(serde_json::from_slice(v.value())?);
            }
        }
        Ok(results)
    }

    async fn upsert_claim(&self, claim: &ResourceClaim) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(claim)?;
        let key = claim_key(&claim.spec.workload_ref, &claim.spec.key);
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(CLAIMS).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete_claim(&self, workload_ref: &WorkloadRef, key: &str) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(CLAIMS).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.remove(claim_key(workload_ref, key).as_str()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn get_plan(&self, workload_ref: &WorkloadRef) -> Result<Option<WorkloadPlan>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(PLANS).map_err(|e| StoreError::Internal(e.to_string()))?;
        match table.get(workload_key(workload_ref).as_str()).map_err(|e| StoreError::Internal(e.to_string()))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    async fn upsert_plan(&self, plan: &WorkloadPlan) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(plan)?;
        let key = workload_key(&plan.spec.workload_ref);
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(PLANS).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete_plan(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(PLANS).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.remove(workload_key(workload_ref).as_str()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn get_exposure(&self, workload_ref: &WorkloadRef) -> Result<Option<WorkloadExposure>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(EXPOSURES).map_err(|e| StoreError::Internal(e.to_string()))?;
        match table.get(workload_key(workload_ref).as_str()).map_err(|e| StoreError::Internal(e.to_string()))? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    async fn upsert_exposure(&self, exposure: &WorkloadExposure) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(exposure)?;
        let workload_ref = WorkloadRef::new(
            exposure.spec.workload_ref.namespace.clone(),
            exposure.spec.workload_ref.name.clone(),
        );
        let key = workload_key(&workload_ref);
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(EXPOSURES).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.insert(key.as_str(), bytes.as_slice()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn delete_exposure(&self, workload_ref: &WorkloadRef) -> Result<(), StoreError> {
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(EXPOSURES).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.remove(workload_key(workload_ref).as_str()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn append_event(&self, event: &AuditEvent) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec(event)?;
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut meta = wtxn.open_table(META).map_err(|e| StoreError::Internal(e.to_string()))?;
            let seq = meta
                .get("event_seq")
                .map_err(|e| StoreError::Internal(e.to_string()))?
                .map(|g| g.value())
                .unwrap_or(0);
            let new_seq = seq + 1;
            meta.insert("event_seq", new_seq).map_err(|e| StoreError::Internal(e.to_string()))?;

            let mut events = wtxn.open_table(EVENTS).map_err(|e| StoreError::Internal(e.to_string()))?;
            events.insert(new_seq, bytes.as_slice()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }

    async fn list_events(&self, workload_ref: Option<&WorkloadRef>, limit: u32) -> Result<Vec<AuditEvent>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(EVENTS).map_err(|e| StoreError::Internal(e.to_string()))?;
        let mut all: Vec<AuditEvent> = Vec::new();
        for entry in table.iter().map_err(|e| StoreError::Internal(e.to_string()))? {
            let (_k, v) = entry.map_err(|e| StoreError::Internal(e.to_string()))?;
            let event: AuditEvent = serde_json::from_slice(v.value())?;
            if workload_ref.map_or(true, |r| event.workload_ref() == r) {
                all.push(event);
            }
        }
        let start = all.len().saturating_sub(limit as usize);
        Ok(all[start..].to_vec())
    }

    async fn get_secret(&self, secret_ref: &str) -> Result<Option<HashMap<String, String>>, StoreError> {
        let rtxn = self.db.begin_read().map_err(|e| StoreError::Internal(e.to_string()))?;
        let table = rtxn.open_table(SECRETS).map_err(|e| StoreError::Internal(e.to_string()))?;
        match table.get(secret_ref).map_err(|e| StoreError::Internal(e.to_string()))? {
            Some(guard) => {
                let encoded: HashMap<String, String> = serde_json::from_slice(guard.value())?;
                Ok(Some(
                    encoded
                        .into_iter()
                        .map(|(k, v)| (k, decode_secret_value(&v)))
                        .collect(),
                ))
            }
            None => Ok(None),
        }
    }

    async fn put_secret(&self, secret_ref: &str, data: HashMap<String, String>) -> Result<(), StoreError> {
        let encoded: HashMap<String, String> = data.into_iter().map(|(k, v)| (k, STANDARD.encode(v))).collect();
        let bytes = serde_json::to_vec(&encoded)?;
        let wtxn = self.db.begin_write().map_err(|e| StoreError::Internal(e.to_string()))?;
        {
            let mut table = wtxn.open_table(SECRETS).map_err(|e| StoreError::Internal(e.to_string()))?;
            table.insert(secret_ref, bytes.as_slice()).map_err(|e| StoreError::Internal(e.to_string()))?;
        }
        wtxn.commit().map_err(|e| StoreError::Internal(e.to_string()))?;
        Ok(())
    }
}

fn decode_secret_value(encoded: &str) -> String {
    STANDARD
        .decode(encoded)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| encoded.to_string())
}
