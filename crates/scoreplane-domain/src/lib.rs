mod claim;
mod condition;
mod error;
mod exposure;
mod ids;
mod plan;
mod workload;

pub use claim::{ClaimOutputs, ClaimPhase, DeprovisionPolicy, ResourceClaim, ResourceClaimSpec, ResourceClaimStatus};
pub use condition::{Condition, ConditionStatus, ConditionType, Reason};
pub use error::DomainError;
pub use exposure::{
    ExposureEntry, WorkloadExposure, WorkloadExposureSpec, WorkloadExposureStatus,
};
pub use ids::{ObjectMeta, WorkloadRef, WorkloadRefWithUid};
pub use plan::{
    EnvProjection, FileProjection, PlanClaim, PlanPhase, Projection, TemplateKind, TemplateSpec,
    VolumeProjection, WorkloadPlan, WorkloadPlanSpec, WorkloadPlanStatus,
};
pub use workload::{
    BindingSummary, Container, ContainerFile, ContainerProbes, ResourceSpec, ServicePort,
    ServiceSpec, Workload, WorkloadSpec, WorkloadStatus,
};
