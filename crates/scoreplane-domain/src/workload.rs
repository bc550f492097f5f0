use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::claim::ClaimPhase;
use crate::condition::{Condition, Reason};
use crate::error::DomainError;
use crate::ids::ObjectMeta;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerProbes {
    pub liveness: Option<String>,
    pub readiness: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerFile {
    pub target: String,
    /// `source.uri` — may reference a claim output, e.g. `${resources.db.cert}`.
    pub source_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerResources {
    pub requests: Option<HashMap<String, String>>,
    pub limits: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub image: String,
    #[serde(default)]
    pub command: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub files: Vec<ContainerFile>,
    pub probes: Option<ContainerProbes>,
    pub resources: Option<ContainerResources>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicePort {
    pub name: Option<String>,
    pub port: u16,
    pub target_port: Option<u16>,
    pub protocol: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSpec {
    pub ports: Vec<ServicePort>,
}

/// One entry of `Workload.spec.resources`. `params` is an opaque byte tree —
/// compared for equality byte-wise, never reflectively merged (see §9).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSpec {
    #[serde(rename = "type")]
    pub type_: String,
    pub class: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadSpec {
    pub containers: HashMap<String, Container>,
    pub service: Option<ServiceSpec>,
    #[serde(default)]
    pub resources: HashMap<String, ResourceSpec>,
    /// Opaque abstract backend hint. Never overrides `defaults.selectors[]`
    /// (see SPEC_FULL.md §4.2 and the Open Question resolution in DESIGN.md).
    pub profile_hint: Option<String>,
    #[serde(default)]
    pub labels: HashMap<String, String>,
    #[serde(default)]
    pub annotations: HashMap<String, String>,
}

impl WorkloadSpec {
    /// Invariant: 1-10 containers, each with a non-empty image; `image == "."`
    /// requires an external build claim of type image|build|buildpack.
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.containers.is_empty() || self.containers.len() > 10 {
            return Err(DomainError::InvalidContainerCount(self.containers.len()));
        }
        for (name, c) in &self.containers {
            if c.image.is_empty() {
                return Err(DomainError::EmptyImage(name.clone()));
            }
            if c.image == "." {
                let has_build_claim = self.resources.values().any(|r| {
                    matches!(r.type_.as_str(), "image" | "build" | "buildpack")
                });
                if !has_build_claim {
                    return Err(DomainError::MissingBuildClaim { container: name.clone() });
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindingSummary {
    pub key: String,
    pub phase: ClaimPhase,
    pub reason: Option<Reason>,
    pub message: Option<String>,
    pub outputs_available: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    pub endpoint: Option<String>,
    #[serde(default)]
    pub bindings: Vec<BindingSummary>,
}

impl WorkloadStatus {
    pub fn condition(&self, type_: crate::condition::ConditionType) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workload {
    pub meta: ObjectMeta,
    pub spec: WorkloadSpec,
    #[serde(default)]
    pub status: WorkloadStatus,
}

impl Workload {
    pub fn new(meta: ObjectMeta, spec: WorkloadSpec) -> Self {
        Workload { meta, spec, status: WorkloadStatus::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn container(image: &str) -> Container {
        Container {
            image: image.to_string(),
            command: vec![],
            args: vec![],
            env: HashMap::new(),
            files: vec![],
            probes: None,
            resources: None,
        }
    }

    #[test]
    fn rejects_zero_containers() {
        let spec = WorkloadSpec::default();
        assert!(matches!(spec.validate(), Err(DomainError::InvalidContainerCount(0))));
    }

    #[test]
    fn rejects_more_than_ten_containers() {
        let mut spec = WorkloadSpec::default();
        for i in 0..11 {
            spec.containers.insert(format!("c{i}"), container("nginx:latest"));
        }
        assert!(matches!(spec.validate(), Err(DomainError::InvalidContainerCount(11))));
    }

    #[test]
    fn rejects_empty_image() {
        let mut spec = WorkloadSpec::default();
        spec.containers.insert("main".into(), container(""));
        assert!(matches!(spec.validate(), Err(DomainError::EmptyImage(_))));
    }

    #[test]
    fn dot_image_requires_build_claim() {
        let mut spec = WorkloadSpec::default();
        spec.containers.insert("main".into(), container("."));
        assert!(matches!(spec.validate(), Err(DomainError::MissingBuildClaim { .. })));

        spec.resources.insert(
            "build".into(),
            ResourceSpec { type_: "buildpack".into(), class: None, params: serde_json::Value::Null },
        );
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn valid_single_container_passes() {
        let mut spec = WorkloadSpec::default();
        spec.containers.insert("main".into(), container("nginx:latest"));
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn new_workload_has_empty_status() {
        let meta = ObjectMeta::new("default", "service-a", Utc::now());
        let mut spec = WorkloadSpec::default();
        spec.containers.insert("main".into(), container("nginx:latest"));
        let wl = Workload::new(meta, spec);
        assert!(wl.status.conditions.is_empty());
        assert!(wl.status.endpoint.is_none());
    }
}
