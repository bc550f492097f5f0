use chrono::{DateTime, Utc};
use scoreplane_domain::WorkloadRef;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An append-only record of orchestrator activity, kept for operator
/// visibility and debugging — not consulted by the reconcile logic itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum AuditEvent {
    WorkloadUpserted { id: Uuid, at: DateTime<Utc>, workload_ref: WorkloadRef },
    WorkloadDeleted { id: Uuid, at: DateTime<Utc>, workload_ref: WorkloadRef },
    ClaimUpserted { id: Uuid, at: DateTime<Utc>, workload_ref: WorkloadRef, key: String },
    ClaimDeleted { id: Uuid, at: DateTime<Utc>, workload_ref: WorkloadRef, key: String },
    PlanUpserted { id: Uuid, at: DateTime<Utc>, workload_ref: WorkloadRef },
    ExposureUpserted { id: Uuid, at: DateTime<Utc>, workload_ref: WorkloadRef },
    StatusConflict { id: Uuid, at: DateTime<Utc>, workload_ref: WorkloadRef },
    FinalizerRemoved { id: Uuid, at: DateTime<Utc>, workload_ref: WorkloadRef },
}

impl AuditEvent {
    pub fn workload_ref(&self) -> &WorkloadRef {
        match self {
            AuditEvent::WorkloadUpserted { workload_ref, .. }
            | AuditEvent::WorkloadDeleted { workload_ref, .. }
            | AuditEvent::ClaimUpserted { workload_ref, .. }
            | AuditEvent::ClaimDeleted { workload_ref, .. }
            | AuditEvent::PlanUpserted { workload_ref, .. }
            | AuditEvent::ExposureUpserted { workload_ref, .. }
            | AuditEvent::StatusConflict { workload_ref, .. }
            | AuditEvent::FinalizerRemoved { workload_ref, .. } => workload_ref,
        }
    }
}
