use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::condition::Reason;
use crate::error::DomainError;
use crate::ids::{ObjectMeta, WorkloadRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DeprovisionPolicy {
    Delete,
    Retain,
    Orphan,
}

impl Default for DeprovisionPolicy {
    fn default() -> Self {
        DeprovisionPolicy::Delete
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ClaimPhase {
    Pending,
    Claiming,
    Bound,
    Failed,
}

impl std::fmt::Display for ClaimPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ClaimPhase::Pending => "Pending",
            ClaimPhase::Claiming => "Claiming",
            ClaimPhase::Bound => "Bound",
            ClaimPhase::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// At least one of these must be populated — enforced by [`ClaimOutputs::validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimOutputs {
    pub secret_ref: Option<String>,
    pub config_map_ref: Option<String>,
    pub uri: Option<String>,
    pub image: Option<String>,
    pub cert: Option<String>,
    /// Additional scalar outputs (e.g. a fetched secret's individual keys,
    /// or synthetic username/password/host/port values from a strategy).
    #[serde(default)]
    pub extra: HashMap<String, String>,
}

impl ClaimOutputs {
    pub fn validate(&self) -> Result<(), DomainError> {
        let populated = self.secret_ref.is_some()
            || self.config_map_ref.is_some()
            || self.uri.is_some()
            || self.image.is_some()
            || self.cert.is_some();
        if !populated {
            return Err(DomainError::EmptyClaimOutputs);
        }
        Ok(())
    }

    /// Flatten into a flat key→value map for the outputs table (§3, §4.4).
    /// `uri`/`secretRef`/etc. are exposed under their own key name alongside
    /// `extra`.
    pub fn as_flat_map(&self) -> HashMap<String, String> {
        let mut out = self.extra.clone();
        if let Some(v) = &self.secret_ref {
            out.insert("secretRef".to_string(), v.clone());
        }
        if let Some(v) = &self.config_map_ref {
            out.insert("configMapRef".to_string(), v.clone());
        }
        if let Some(v) = &self.uri {
            out.insert("uri".to_string(), v.clone());
        }
        if let Some(v) = &self.image {
            out.insert("image".to_string(), v.clone());
        }
        if let Some(v) = &self.cert {
            out.insert("cert".to_string(), v.clone());
        }
        out
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceClaimSpec {
    pub workload_ref: WorkloadRef,
    pub key: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub class: Option<String>,
    pub id: Option<String>,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub deprovision_policy: DeprovisionPolicy,
}

impl ResourceClaimSpec {
    /// Name derivation: `{workload}-{key}`.
    pub fn derived_name(&self) -> String {
        format!("{}-{}", self.workload_ref.name, self.key)
    }

    /// Semantic equality used by the claim reconciler to decide whether an
    /// update is needed: pointer-safe compare on class/id, byte equality on
    /// opaque params.
    pub fn semantically_eq(&self, other: &ResourceClaimSpec) -> bool {
        self.workload_ref == other.workload_ref
            && self.key == other.key
            && self.type_ == other.type_
            && self.class == other.class
            && self.id == other.id
            && self.params == other.params
            && self.deprovision_policy == other.deprovision_policy
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceClaimStatus {
    pub phase: Option<ClaimPhase>,
    pub reason: Option<Reason>,
    pub message: Option<String>,
    pub outputs: Option<ClaimOutputs>,
    #[serde(default)]
    pub outputs_available: bool,
    pub observed_generation: u64,
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl ResourceClaimStatus {
    pub fn is_bound(&self) -> bool {
        matches!(self.phase, Some(ClaimPhase::Bound))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.phase, Some(ClaimPhase::Failed))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceClaim {
    pub meta: ObjectMeta,
    pub spec: ResourceClaimSpec,
    #[serde(default)]
    pub status: ResourceClaimStatus,
}

impl ResourceClaim {
    pub fn new(meta: ObjectMeta, spec: ResourceClaimSpec) -> Self {
        ResourceClaim { meta, spec, status: ResourceClaimStatus::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(key: &str, params: serde_json::Value) -> ResourceClaimSpec {
        ResourceClaimSpec {
            workload_ref: WorkloadRef::new("default", "service-a"),
            key: key.to_string(),
            type_: "postgres".to_string(),
            class: None,
            id: None,
            params,
            deprovision_policy: DeprovisionPolicy::default(),
        }
    }

    #[test]
    fn derived_name_is_workload_dash_key() {
        let s = spec("db", serde_json::Value::Null);
        assert_eq!(s.derived_name(), "service-a-db");
    }

    #[test]
    fn default_deprovision_policy_is_delete() {
        assert_eq!(DeprovisionPolicy::default(), DeprovisionPolicy::Delete);
    }

    #[test]
    fn semantic_equality_ignores_nothing_but_tolerates_identical_params() {
        let a = spec("db", serde_json::json!({"size": "small"}));
        let b = spec("db", serde_json::json!({"size": "small"}));
        assert!(a.semantically_eq(&b));
    }

    #[test]
    fn semantic_equality_detects_param_diff() {
        let a = spec("db", serde_json::json!({"size": "small"}));
        let b = spec("db", serde_json::json!({"size": "large"}));
        assert!(!a.semantically_eq(&b));
    }

    #[test]
    fn empty_outputs_rejected() {
        let outputs = ClaimOutputs::default();
        assert!(matches!(outputs.validate(), Err(DomainError::EmptyClaimOutputs)));
    }

    #[test]
    fn outputs_with_uri_accepted() {
        let outputs = ClaimOutputs { uri: Some("postgres://x".into()), ..Default::default() };
        assert!(outputs.validate().is_ok());
    }

    #[test]
    fn flat_map_includes_named_fields_and_extra() {
        let mut outputs = ClaimOutputs { uri: Some("postgres://x".into()), ..Default::default() };
        outputs.extra.insert("username".into(), "admin".into());
        let flat = outputs.as_flat_map();
        assert_eq!(flat.get("uri"), Some(&"postgres://x".to_string()));
        assert_eq!(flat.get("username"), Some(&"admin".to_string()));
    }
}
