use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw YAML representation of an `OrchestratorConfig` document (`config.yaml`).
/// Every field is string-typed or optional; tagged variants and known-set
/// membership are enforced during conversion, not by serde alone.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawOrchestratorConfig {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub profiles: Vec<RawProfile>,
    #[serde(default)]
    pub provisioners: Vec<RawProvisioner>,
    pub defaults: RawDefaults,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawProfile {
    pub name: String,
    #[serde(default)]
    pub backends: Vec<RawBackend>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawBackend {
    pub backend_id: String,
    pub runtime_class: String,
    pub template: RawTemplate,
    #[serde(default)]
    pub priority: i64,
    pub version: String,
    pub constraints: Option<RawConstraints>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawTemplate {
    pub kind: String,
    #[serde(rename = "ref")]
    pub ref_: String,
    pub default_values: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawConstraints {
    #[serde(default)]
    pub match_labels: HashMap<String, String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    /// e.g. `{"cpu": "100-2000", "memoryMb": "256-"}`.
    #[serde(default)]
    pub resource_bounds: HashMap<String, String>,
}

/// The provisioner's binding is either a bare controller id (for a
/// runtime-side controller that owns the whole lifecycle) or a tagged
/// strategy descriptor with its own payload.
#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawProvisionerBinding {
    ControllerId(String),
    Strategy(RawStrategy),
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RawStrategy {
    Helm { chart: String, release_prefix: Option<String> },
    Manifests { path: String },
    ExternalApi { endpoint: String, auth: Option<String> },
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawProvisioner {
    #[serde(rename = "type")]
    pub type_: String,
    pub strategy: RawProvisionerBinding,
    #[serde(default)]
    pub classes: Vec<String>,
    pub defaults: Option<RawProvisionerDefaults>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawProvisionerDefaults {
    pub class: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawDefaults {
    pub profile: String,
    #[serde(default)]
    pub selectors: Vec<RawSelector>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RawSelector {
    pub profile: String,
    pub match_labels: Option<HashMap<String, String>>,
    pub match_expressions: Option<Vec<RawMatchExpression>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RawMatchExpression {
    pub key: String,
    pub operator: String,
    #[serde(default)]
    pub values: Vec<String>,
}
