use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use scoreplane_domain::{TemplateKind, TemplateSpec};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const API_VERSION: &str = "score.dev/v1b1";
pub const KIND: &str = "OrchestratorConfig";

const KNOWN_RUNTIME_CLASSES: &[&str] = &["kubernetes", "ecs", "nomad"];

static DNS_1123_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

/// `[0-9]+[a-zA-Z]*(-[0-9]+[a-zA-Z]*)?` or a one-sided `-N` / `N-` bound,
/// per §4.1.
static RESOURCE_BOUND: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+[a-zA-Z]*)?(-([0-9]+[a-zA-Z]*)?)?$").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default)]
    pub match_labels: HashMap<String, String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    #[serde(default)]
    pub resource_bounds: HashMap<String, String>,
}

impl Constraints {
    /// Does this backend's constraints admit a Workload with the given
    /// labels, feature set, and region? Resource bounds are checked by the
    /// selector against environment facts it is given, not here.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.match_labels.iter().all(|(k, v)| labels.get(k) == Some(v))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Backend {
    pub backend_id: String,
    pub runtime_class: String,
    pub template: TemplateSpec,
    pub priority: i64,
    pub version: String,
    pub constraints: Option<Constraints>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    pub backends: Vec<Backend>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum MatchOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchExpression {
    pub key: String,
    pub operator: MatchOperator,
    #[serde(default)]
    pub values: Vec<String>,
}

impl MatchExpression {
    fn matches(&self, labels: &HashMap<String, String>) -> bool {
        match self.operator {
            MatchOperator::Exists => labels.contains_key(&self.key),
            MatchOperator::DoesNotExist => !labels.contains_key(&self.key),
            MatchOperator::In => labels.get(&self.key).map(|v| self.values.contains(v)).unwrap_or(false),
            MatchOperator::NotIn => labels.get(&self.key).map(|v| !self.values.contains(v)).unwrap_or(true),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Selector {
    /// The profile this selector resolves to when it matches.
    pub profile: String,
    pub match_labels: Option<HashMap<String, String>>,
    pub match_expressions: Option<Vec<MatchExpression>>,
}

impl Selector {
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        let labels_ok = self
            .match_labels
            .as_ref()
            .map(|m| m.iter().all(|(k, v)| labels.get(k) == Some(v)))
            .unwrap_or(true);
        let expr_ok = self
            .match_expressions
            .as_ref()
            .map(|exprs| exprs.iter().all(|e| e.matches(labels)))
            .unwrap_or(true);
        labels_ok && expr_ok
    }

    fn is_empty(&self) -> bool {
        self.match_labels.is_none() && self.match_expressions.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    pub profile: String,
    #[serde(default)]
    pub selectors: Vec<Selector>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProvisionerStrategy {
    Helm { chart: String, release_prefix: Option<String> },
    Manifests { path: String },
    ExternalApi { endpoint: String, auth: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProvisionerBinding {
    ControllerId(String),
    Strategy(ProvisionerStrategy),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerDefaults {
    pub class: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionerConfig {
    #[serde(rename = "type")]
    pub type_: String,
    pub strategy: ProvisionerBinding,
    pub classes: Vec<String>,
    pub defaults: Option<ProvisionerDefaults>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub profiles: Vec<Profile>,
    pub provisioners: Vec<ProvisionerConfig>,
    pub defaults: Defaults,
}

impl OrchestratorConfig {
    /// Aggregates every failure instead of short-circuiting on the first —
    /// §4.1: "Errors are aggregated; the whole document is rejected on any
    /// failure."
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        let err = |field: &str, message: String| ValidationError { field: field.to_string(), message };

        if self.api_version != API_VERSION {
            errors.push(err("apiVersion", format!("expected {API_VERSION}, got {}", self.api_version)));
        }
        if self.kind != KIND {
            errors.push(err("kind", format!("expected {KIND}, got {}", self.kind)));
        }
        if self.name.trim().is_empty() {
            errors.push(err("name", "must not be empty".to_string()));
        }

        let mut seen_profiles = std::collections::HashSet::new();
        let mut seen_backend_ids = std::collections::HashSet::new();
        for profile in &self.profiles {
            if !DNS_1123_LABEL.is_match(&profile.name) || profile.name.len() > 63 {
                errors.push(err("profiles[].name", format!("'{}' is not a valid DNS-1123 label", profile.name)));
            }
            if !seen_profiles.insert(profile.name.clone()) {
                errors.push(err("profiles[].name", format!("duplicate profile name '{}'", profile.name)));
            }
            if profile.backends.is_empty() {
                errors.push(err("profiles[].backends", format!("profile '{}' has no backends", profile.name)));
            }
            for backend in &profile.backends {
                if !seen_backend_ids.insert(backend.backend_id.clone()) {
                    errors.push(err("backends[].backendId", format!("duplicate backendId '{}'", backend.backend_id)));
                }
                if !KNOWN_RUNTIME_CLASSES.contains(&backend.runtime_class.as_str()) {
                    errors.push(err(
                        "backends[].runtimeClass",
                        format!("'{}' is not a known runtime class", backend.runtime_class),
                    ));
                }
                if backend.template.ref_.trim().is_empty() {
                    errors.push(err("backends[].template.ref", "must not be empty".to_string()));
                }
                if backend.priority < 0 {
                    errors.push(err("backends[].priority", format!("must be >= 0, got {}", backend.priority)));
                }
                if semver::Version::parse(&backend.version).is_err() {
                    errors.push(err("backends[].version", format!("'{}' is not valid semver", backend.version)));
                }
                if let Some(constraints) = &backend.constraints {
                    for (k, bound) in &constraints.resource_bounds {
                        if !RESOURCE_BOUND.is_match(bound) {
                            errors.push(err(
                                "backends[].constraints.resourceBounds",
                                format!("bound '{bound}' for '{k}' does not match the expected grammar"),
                            ));
                        }
                    }
                }
            }
        }

        if !seen_profiles.contains(&self.defaults.profile) {
            errors.push(err(
                "defaults.profile",
                format!("'{}' does not refer to an existing profile", self.defaults.profile),
            ));
        }
        for selector in &self.defaults.selectors {
            if selector.is_empty() {
                errors.push(err("defaults.selectors[]", "selector must set matchLabels or matchExpressions".to_string()));
            }
            if !seen_profiles.contains(&selector.profile) {
                errors.push(err(
                    "defaults.selectors[].profile",
                    format!("'{}' does not refer to an existing profile", selector.profile),
                ));
            }
        }

        for provisioner in &self.provisioners {
            if let Some(defaults) = &provisioner.defaults {
                if let Some(class) = &defaults.class {
                    if !provisioner.classes.contains(class) {
                        errors.push(err(
                            "provisioners[].defaults.class",
                            format!("'{class}' is not one of provisioner '{}' classes", provisioner.type_),
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> OrchestratorConfig {
        OrchestratorConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            name: "default".to_string(),
            profiles: vec![Profile {
                name: "web-service".to_string(),
                backends: vec![Backend {
                    backend_id: "k8s-web-1".to_string(),
                    runtime_class: "kubernetes".to_string(),
                    template: TemplateSpec {
                        kind: TemplateKind::Manifests,
                        ref_: "oci://registry/chart:1.0.0".to_string(),
                        default_values: None,
                    },
                    priority: 10,
                    version: "1.0.0".to_string(),
                    constraints: None,
                }],
            }],
            provisioners: vec![],
            defaults: Defaults { profile: "web-service".to_string(), selectors: vec![] },
        }
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn rejects_unknown_api_version() {
        let mut cfg = valid_config();
        cfg.api_version = "v1".to_string();
        let errs = cfg.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "apiVersion"));
    }

    #[test]
    fn rejects_missing_default_profile() {
        let mut cfg = valid_config();
        cfg.defaults.profile = "does-not-exist".to_string();
        let errs = cfg.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "defaults.profile"));
    }

    #[test]
    fn rejects_duplicate_backend_ids() {
        let mut cfg = valid_config();
        let dup = cfg.profiles[0].backends[0].clone();
        cfg.profiles[0].backends.push(dup);
        let errs = cfg.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "backends[].backendId"));
    }

    #[test]
    fn rejects_empty_selector() {
        let mut cfg = valid_config();
        cfg.defaults.selectors.push(Selector::default());
        let errs = cfg.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "defaults.selectors[]"));
    }

    #[test]
    fn rejects_provisioner_default_class_not_in_classes() {
        let mut cfg = valid_config();
        cfg.provisioners.push(ProvisionerConfig {
            type_: "postgres".to_string(),
            strategy: ProvisionerBinding::ControllerId("postgres-operator".to_string()),
            classes: vec!["small".to_string()],
            defaults: Some(ProvisionerDefaults { class: Some("large".to_string()) }),
        });
        let errs = cfg.validate().unwrap_err();
        assert!(errs.iter().any(|e| e.field == "provisioners[].defaults.class"));
    }

    #[test]
    fn accepts_resource_bound_forms() {
        let mut cfg = valid_config();
        cfg.profiles[0].backends[0].constraints = Some(Constraints {
            match_labels: HashMap::new(),
            features: vec![],
            regions: vec![],
            resource_bounds: HashMap::from([
                ("cpu".to_string(), "100m-2000m".to_string()),
                ("memoryMb".to_string(), "256-".to_string()),
                ("gpu".to_string(), "-4".to_string()),
            ]),
        });
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn selector_match_expression_exists() {
        let expr = MatchExpression { key: "tier".to_string(), operator: MatchOperator::Exists, values: vec![] };
        let mut labels = HashMap::new();
        labels.insert("tier".to_string(), "gold".to_string());
        assert!(expr.matches(&labels));
    }
}
