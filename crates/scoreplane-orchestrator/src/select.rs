//! Backend selection (C5): profile resolution, constraint filtering, and a
//! deterministic tie-break sort.

use std::cmp::Ordering;
use std::collections::HashMap;

use scoreplane_config::{Backend, OrchestratorConfig};
use scoreplane_domain::{TemplateSpec, Workload};
use serde_json::Value;

use crate::error::SelectError;

#[derive(Debug, Clone)]
pub struct SelectedBackend {
    pub runtime_class: String,
    pub template: TemplateSpec,
    pub default_values: Option<Value>,
}

/// Chooses a profile, filters its backends by constraints, then sorts the
/// survivors by `(priority DESC, semver(version) DESC, backendId ASC)` and
/// picks the first.
///
/// The profile hint carried on `Workload.spec.profile_hint` is never
/// consulted here: `defaults.selectors[]` is evaluated unconditionally first,
/// and `defaults.profile` is the unconditional fallback otherwise — the
/// config validator guarantees `defaults.profile` always resolves, so the
/// hint never gets a turn to matter.
pub fn select_backend(cfg: &OrchestratorConfig, workload: &Workload) -> Result<SelectedBackend, SelectError> {
    let labels = &workload.spec.labels;
    let profile_name = choose_profile(cfg, labels);
    let profile = cfg
        .profiles
        .iter()
        .find(|p| p.name == profile_name)
        .ok_or_else(|| SelectError::UnknownProfile(profile_name.clone()))?;

    let mut candidates: Vec<&Backend> = profile
        .backends
        .iter()
        .filter(|b| b.constraints.as_ref().map(|c| c.matches(labels)).unwrap_or(true))
        .collect();

    candidates.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| compare_semver_desc(&a.version, &b.version))
            .then_with(|| a.backend_id.cmp(&b.backend_id))
    });

    let chosen = candidates.into_iter().next().ok_or(SelectError::NoBackend { profile: profile_name })?;

    Ok(SelectedBackend {
        runtime_class: chosen.runtime_class.clone(),
        template: chosen.template.clone(),
        default_values: chosen.template.default_values.clone(),
    })
}

fn choose_profile(cfg: &OrchestratorConfig, labels: &HashMap<String, String>) -> String {
    for selector in &cfg.defaults.selectors {
        if selector.matches(labels) {
            return selector.profile.clone();
        }
    }
    cfg.defaults.profile.clone()
}

/// Unparseable versions sort as equal rather than panicking — the config
/// validator already rejects non-semver `version` strings before a backend
/// reaches this path.
fn compare_semver_desc(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(va), Ok(vb)) => vb.cmp(&va),
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scoreplane_config::{Constraints, Defaults, Profile, Selector, API_VERSION, KIND};
    use scoreplane_domain::{Container, ObjectMeta, TemplateKind, WorkloadSpec};

    fn backend(id: &str, runtime_class: &str, priority: i64, version: &str) -> Backend {
        Backend {
            backend_id: id.to_string(),
            runtime_class: runtime_class.to_string(),
            template: TemplateSpec { kind: TemplateKind::Manifests, ref_: format!("oci://{id}"), default_values: None },
            priority,
            version: version.to_string(),
            constraints: None,
        }
    }

    fn config_with(profiles: Vec<Profile>, defaults: Defaults) -> OrchestratorConfig {
        OrchestratorConfig {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            name: "default".to_string(),
            profiles,
            provisioners: vec![],
            defaults,
        }
    }

    fn workload(labels: HashMap<String, String>) -> Workload {
        let mut containers = HashMap::new();
        containers.insert(
            "main".to_string(),
            Container { image: "nginx".to_string(), command: vec![], args: vec![], env: HashMap::new(), files: vec![], probes: None, resources: None },
        );
        Workload::new(
            ObjectMeta::new("default", "web", Utc::now()),
            WorkloadSpec { containers, labels, ..Default::default() },
        )
    }

    #[test]
    fn picks_highest_priority_backend() {
        let cfg = config_with(
            vec![Profile { name: "web-service".to_string(), backends: vec![backend("b-low", "kubernetes", 1, "1.0.0"), backend("b-high", "kubernetes", 10, "1.0.0")] }],
            Defaults { profile: "web-service".to_string(), selectors: vec![] },
        );
        let selected = select_backend(&cfg, &workload(HashMap::new())).unwrap();
        assert_eq!(selected.runtime_class, "kubernetes");
    }

    #[test]
    fn breaks_priority_tie_with_semver_desc() {
        let cfg = config_with(
            vec![Profile { name: "web-service".to_string(), backends: vec![backend("b-old", "ecs", 10, "1.0.0"), backend("b-new", "kubernetes", 10, "2.0.0")] }],
            Defaults { profile: "web-service".to_string(), selectors: vec![] },
        );
        let selected = select_backend(&cfg, &workload(HashMap::new())).unwrap();
        assert_eq!(selected.runtime_class, "kubernetes");
    }

    #[test]
    fn breaks_full_tie_with_backend_id_asc() {
        let cfg = config_with(
            vec![Profile { name: "web-service".to_string(), backends: vec![backend("zzz", "ecs", 10, "1.0.0"), backend("aaa", "kubernetes", 10, "1.0.0")] }],
            Defaults { profile: "web-service".to_string(), selectors: vec![] },
        );
        let selected = select_backend(&cfg, &workload(HashMap::new())).unwrap();
        assert_eq!(selected.runtime_class, "kubernetes");
    }

    #[test]
    fn selector_match_overrides_default_profile() {
        let cfg = config_with(
            vec![
                Profile { name: "web-service".to_string(), backends: vec![backend("web", "kubernetes", 10, "1.0.0")] },
                Profile { name: "worker".to_string(), backends: vec![backend("worker", "ecs", 10, "1.0.0")] },
            ],
            Defaults {
                profile: "web-service".to_string(),
                selectors: vec![Selector { profile: "worker".to_string(), match_labels: Some(HashMap::from([("tier".to_string(), "background".to_string())])), match_expressions: None }],
            },
        );
        let mut labels = HashMap::new();
        labels.insert("tier".to_string(), "background".to_string());
        let selected = select_backend(&cfg, &workload(labels)).unwrap();
        assert_eq!(selected.runtime_class, "ecs");
    }

    #[test]
    fn constraints_exclude_non_matching_backend() {
        let mut web = backend("web", "kubernetes", 10, "1.0.0");
        web.constraints = Some(Constraints { match_labels: HashMap::from([("region".to_string(), "eu".to_string())]), features: vec![], regions: vec![], resource_bounds: HashMap::new() });
        let cfg = config_with(
            vec![Profile { name: "web-service".to_string(), backends: vec![web] }],
            Defaults { profile: "web-service".to_string(), selectors: vec![] },
        );
        let result = select_backend(&cfg, &workload(HashMap::new()));
        assert!(matches!(result, Err(SelectError::NoBackend { .. })));
    }
}
