use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::ids::{ObjectMeta, WorkloadRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Manifests,
    Helm,
    Kustomize,
}

impl std::fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TemplateKind::Manifests => "manifests",
            TemplateKind::Helm => "helm",
            TemplateKind::Kustomize => "kustomize",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub kind: TemplateKind,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub default_values: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanClaim {
    pub key: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub class: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvProjection {
    pub name: String,
    pub from_claim_key: String,
    pub from_output_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeProjection {
    pub name: String,
    pub from_claim_key: String,
    pub from_output_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileProjection {
    pub path: String,
    pub from_claim_key: String,
    pub from_output_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Projection {
    #[serde(default)]
    pub env: Vec<EnvProjection>,
    #[serde(default)]
    pub files: Vec<FileProjection>,
    #[serde(default)]
    pub volumes: Vec<VolumeProjection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadPlanSpec {
    pub workload_ref: WorkloadRef,
    pub observed_workload_generation: u64,
    pub runtime_class: String,
    pub template: TemplateSpec,
    /// Opaque tree with no residual `${…}` — invariant 2 of SPEC_FULL.md §8.
    pub resolved_values: serde_json::Value,
    pub claims: Vec<PlanClaim>,
    pub projection: Projection,
}

impl WorkloadPlanSpec {
    /// The coarse diff used by the plan reconciler to avoid update storms
    /// (SPEC_FULL.md §4.5): workloadRef, observedWorkloadGeneration,
    /// runtimeClass, lengths of projection.env and claims, byte-equal
    /// resolvedValues.
    pub fn coarsely_eq(&self, other: &WorkloadPlanSpec) -> bool {
        self.workload_ref == other.workload_ref
            && self.observed_workload_generation == other.observed_workload_generation
            && self.runtime_class == other.runtime_class
            && self.projection.env.len() == other.projection.env.len()
            && self.claims.len() == other.claims.len()
            && self.resolved_values == other.resolved_values
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PlanPhase {
    Pending,
    Provisioning,
    Ready,
    Failed,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadPlanStatus {
    pub phase: Option<PlanPhase>,
    pub message: Option<String>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadPlan {
    pub meta: ObjectMeta,
    pub spec: WorkloadPlanSpec,
    #[serde(default)]
    pub status: WorkloadPlanStatus,
}

impl WorkloadPlan {
    pub fn new(meta: ObjectMeta, spec: WorkloadPlanSpec) -> Self {
        WorkloadPlan { meta, spec, status: WorkloadPlanStatus::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(runtime_class: &str, gen: u64) -> WorkloadPlanSpec {
        WorkloadPlanSpec {
            workload_ref: WorkloadRef::new("default", "service-a"),
            observed_workload_generation: gen,
            runtime_class: runtime_class.to_string(),
            template: TemplateSpec {
                kind: TemplateKind::Manifests,
                ref_: "oci://registry/chart:1.0".to_string(),
                default_values: None,
            },
            resolved_values: serde_json::json!({"name": "service-a"}),
            claims: vec![],
            projection: Projection::default(),
        }
    }

    #[test]
    fn coarsely_eq_ignores_template_but_checks_runtime_class() {
        let a = spec("kubernetes", 1);
        let mut b = spec("kubernetes", 1);
        b.template.ref_ = "oci://registry/chart:2.0".to_string();
        assert!(a.coarsely_eq(&b));

        let c = spec("ecs", 1);
        assert!(!a.coarsely_eq(&c));
    }

    #[test]
    fn coarsely_eq_detects_resolved_values_diff() {
        let a = spec("kubernetes", 1);
        let mut b = spec("kubernetes", 1);
        b.resolved_values = serde_json::json!({"name": "other"});
        assert!(!a.coarsely_eq(&b));
    }
}
