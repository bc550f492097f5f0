use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// `(namespace, name)` — the identity of every top-level object in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkloadRef {
    pub namespace: String,
    pub name: String,
}

impl WorkloadRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        WorkloadRef { namespace: namespace.into(), name: name.into() }
    }
}

impl std::fmt::Display for WorkloadRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A [`WorkloadRef`] plus the Workload's UID, carried on objects (like
/// WorkloadExposure) whose mirror-back logic must confirm it is still
/// talking about the same Workload generation of identity, not just name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkloadRefWithUid {
    pub namespace: String,
    pub name: String,
    pub uid: Uuid,
}

impl WorkloadRefWithUid {
    pub fn matches(&self, workload_ref: &WorkloadRef, uid: Uuid) -> bool {
        self.namespace == workload_ref.namespace && self.name == workload_ref.name && self.uid == uid
    }
}

/// Store-facing envelope carried alongside every typed spec/status pair.
///
/// `resource_version` backs optimistic concurrency (bumped on every write);
/// `generation` only increments when `spec` changes (matched against
/// `observedWorkloadGeneration` fields on dependent objects).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectMeta {
    pub namespace: String,
    pub name: String,
    pub uid: Uuid,
    pub generation: u64,
    pub resource_version: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub finalizers: Vec<String>,
    #[serde(default)]
    pub deletion_requested_at: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        ObjectMeta {
            namespace: namespace.into(),
            name: name.into(),
            uid: Uuid::new_v4(),
            generation: 1,
            resource_version: 1,
            created_at: now,
            finalizers: Vec::new(),
            deletion_requested_at: None,
        }
    }

    pub fn workload_ref(&self) -> WorkloadRef {
        WorkloadRef::new(self.namespace.clone(), self.name.clone())
    }

    pub fn has_finalizer(&self, name: &str) -> bool {
        self.finalizers.iter().any(|f| f == name)
    }

    pub fn add_finalizer(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.has_finalizer(&name) {
            self.finalizers.push(name);
        }
    }

    pub fn remove_finalizer(&mut self, name: &str) {
        self.finalizers.retain(|f| f != name);
    }

    pub fn is_deleting(&self) -> bool {
        self.deletion_requested_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalizer_add_is_idempotent() {
        let mut meta = ObjectMeta::new("default", "service-a", Utc::now());
        meta.add_finalizer("workloads.score.dev/finalizer");
        meta.add_finalizer("workloads.score.dev/finalizer");
        assert_eq!(meta.finalizers.len(), 1);
    }

    #[test]
    fn finalizer_remove_clears_is_deleting_precondition() {
        let mut meta = ObjectMeta::new("default", "service-a", Utc::now());
        meta.add_finalizer("workloads.score.dev/finalizer");
        meta.remove_finalizer("workloads.score.dev/finalizer");
        assert!(!meta.has_finalizer("workloads.score.dev/finalizer"));
    }

    #[test]
    fn workload_ref_display() {
        let r = WorkloadRef::new("default", "service-a");
        assert_eq!(r.to_string(), "default/service-a");
    }
}
