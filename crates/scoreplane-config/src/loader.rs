use std::path::Path;

use tracing::debug;

use crate::error::ConfigError;
use crate::model::{
    Backend, Constraints, Defaults, MatchExpression, MatchOperator, OrchestratorConfig,
    Profile, ProvisionerBinding, ProvisionerConfig, ProvisionerDefaults, ProvisionerStrategy,
    Selector,
};
use crate::raw::{
    RawBackend, RawConstraints, RawDefaults, RawMatchExpression, RawOrchestratorConfig,
    RawProfile, RawProvisioner, RawProvisionerBinding, RawSelector, RawStrategy, RawTemplate,
};
use scoreplane_domain::{TemplateKind, TemplateSpec};

/// Parse and validate a single `config.yaml` document from a string. This is
/// the unit both the ConfigMap-like store and the OCI artifact transport
/// funnel into after fetching bytes (see `crate::cache::ConfigCache`).
pub fn load_config_from_str(yaml: &str, source: &str) -> Result<OrchestratorConfig, ConfigError> {
    let raw: RawOrchestratorConfig =
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::YamlParse { path: source.to_string(), source: e })?;
    let cfg = convert_config(raw, source)?;
    cfg.validate().map_err(ConfigError::Invalid)?;
    Ok(cfg)
}

pub fn load_config_from_path(path: &Path) -> Result<OrchestratorConfig, ConfigError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(ConfigError::NotFound(display));
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io { path: display.clone(), source: e })?;
    debug!("loading orchestrator config from {display}");
    load_config_from_str(&content, &display)
}

fn convert_config(raw: RawOrchestratorConfig, source: &str) -> Result<OrchestratorConfig, ConfigError> {
    let profiles = raw
        .profiles
        .into_iter()
        .map(|p| convert_profile(p, source))
        .collect::<Result<Vec<_>, _>>()?;
    let provisioners = raw
        .provisioners
        .into_iter()
        .map(|p| convert_provisioner(p, source))
        .collect::<Result<Vec<_>, _>>()?;
    let defaults = convert_defaults(raw.defaults, source)?;

    Ok(OrchestratorConfig {
        api_version: raw.api_version,
        kind: raw.kind,
        name: raw.name,
        profiles,
        provisioners,
        defaults,
    })
}

fn convert_profile(raw: RawProfile, source: &str) -> Result<Profile, ConfigError> {
    let backends = raw
        .backends
        .into_iter()
        .map(|b| convert_backend(b, source))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Profile { name: raw.name, backends })
}

fn convert_backend(raw: RawBackend, source: &str) -> Result<Backend, ConfigError> {
    Ok(Backend {
        backend_id: raw.backend_id,
        runtime_class: raw.runtime_class,
        template: convert_template(raw.template, source)?,
        priority: raw.priority,
        version: raw.version,
        constraints: raw.constraints.map(convert_constraints),
    })
}

fn convert_template(raw: RawTemplate, source: &str) -> Result<TemplateSpec, ConfigError> {
    let kind = match raw.kind.as_str() {
        "manifests" => TemplateKind::Manifests,
        "helm" => TemplateKind::Helm,
        "kustomize" => TemplateKind::Kustomize,
        other => {
            return Err(ConfigError::Conversion {
                path: source.to_string(),
                message: format!("unknown template kind '{other}'"),
            })
        }
    };
    Ok(TemplateSpec { kind, ref_: raw.ref_, default_values: raw.default_values })
}

fn convert_constraints(raw: RawConstraints) -> Constraints {
    Constraints {
        match_labels: raw.match_labels,
        features: raw.features,
        regions: raw.regions,
        resource_bounds: raw.resource_bounds,
    }
}

fn convert_provisioner(raw: RawProvisioner, source: &str) -> Result<ProvisionerConfig, ConfigError> {
    Ok(ProvisionerConfig {
        type_: raw.type_,
        strategy: convert_provisioner_binding(raw.strategy, source)?,
        classes: raw.classes,
        defaults: raw.defaults.map(|d| ProvisionerDefaults { class: d.class }),
    })
}

fn convert_provisioner_binding(
    raw: RawProvisionerBinding,
    source: &str,
) -> Result<ProvisionerBinding, ConfigError> {
    match raw {
        RawProvisionerBinding::ControllerId(id) => Ok(ProvisionerBinding::ControllerId(id)),
        RawProvisionerBinding::Strategy(strategy) => {
            Ok(ProvisionerBinding::Strategy(convert_strategy(strategy, source)?))
        }
    }
}

fn convert_strategy(raw: RawStrategy, _source: &str) -> Result<ProvisionerStrategy, ConfigError> {
    Ok(match raw {
        RawStrategy::Helm { chart, release_prefix } => ProvisionerStrategy::Helm { chart, release_prefix },
        RawStrategy::Manifests { path } => ProvisionerStrategy::Manifests { path },
        RawStrategy::ExternalApi { endpoint, auth } => ProvisionerStrategy::ExternalApi { endpoint, auth },
    })
}

fn convert_defaults(raw: RawDefaults, source: &str) -> Result<Defaults, ConfigError> {
    let selectors = raw
        .selectors
        .into_iter()
        .map(|s| convert_selector(s, source))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Defaults { profile: raw.profile, selectors })
}

fn convert_selector(raw: RawSelector, source: &str) -> Result<Selector, ConfigError> {
    let match_expressions = raw
        .match_expressions
        .map(|exprs| {
            exprs
                .into_iter()
                .map(|e| convert_match_expression(e, source))
                .collect::<Result<Vec<_>, _>>()
        })
        .transpose()?;
    Ok(Selector { profile: raw.profile, match_labels: raw.match_labels, match_expressions })
}

fn convert_match_expression(raw: RawMatchExpression, source: &str) -> Result<MatchExpression, ConfigError> {
    let operator = match raw.operator.as_str() {
        "In" => MatchOperator::In,
        "NotIn" => MatchOperator::NotIn,
        "Exists" => MatchOperator::Exists,
        "DoesNotExist" => MatchOperator::DoesNotExist,
        other => {
            return Err(ConfigError::Conversion {
                path: source.to_string(),
                message: format!("unknown match expression operator '{other}'"),
            })
        }
    };
    Ok(MatchExpression { key: raw.key, operator, values: raw.values })
}
