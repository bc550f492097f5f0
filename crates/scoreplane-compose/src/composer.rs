//! Value composition: `values = deepMerge(defaults, normalize(workload), outputs)`.
//!
//! Merge rule is right-wins on key conflict. Maps merge key-by-key; any other
//! pair of values (including two sequences) is replaced wholesale by the
//! right-hand side — sequences never concatenate.

use std::collections::HashMap;

use scoreplane_domain::{ResourceClaim, Workload};
use serde_json::{json, Map, Value};

use crate::error::ComposeError;

/// Flat per-claim-key -> output-name -> value table, used by the resolver.
///
/// Unlike [`claims_to_outputs_value`], this includes an entry (possibly an
/// empty map) for every claim that currently exists on the workload,
/// regardless of readiness, so the resolver can tell "claim not ready yet"
/// apart from "no such claim at all".
pub type OutputsTable = HashMap<String, HashMap<String, String>>;

pub fn build_outputs_table(claims: &[ResourceClaim]) -> OutputsTable {
    claims
        .iter()
        .map(|c| {
            let outputs = if c.status.outputs_available {
                c.status.outputs.as_ref().map(|o| o.as_flat_map()).unwrap_or_default()
            } else {
                HashMap::new()
            };
            (c.spec.key.clone(), outputs)
        })
        .collect()
}

/// `outputs = { resources: { <key>: { outputs: <map> } } }`, built only from
/// claims whose outputs are currently available. Claims still pending
/// contribute nothing here, so defaults/workload values for that resource key
/// pass through the merge untouched until the claim binds.
pub fn claims_to_outputs_value(claims: &[ResourceClaim]) -> Value {
    let mut resources = Map::new();
    for claim in claims {
        if !claim.status.outputs_available {
            continue;
        }
        let flat = match &claim.status.outputs {
            Some(o) => o.as_flat_map(),
            None => continue,
        };
        if flat.is_empty() {
            continue;
        }
        let outputs: Map<String, Value> = flat.into_iter().map(|(k, v)| (k, json!(v))).collect();
        let mut entry = Map::new();
        entry.insert("outputs".into(), Value::Object(outputs));
        resources.insert(claim.spec.key.clone(), Value::Object(entry));
    }
    let mut root = Map::new();
    root.insert("resources".into(), Value::Object(resources));
    Value::Object(root)
}

/// `normalize(workload)` per the composition rule: a plain tree of the
/// workload's own spec fields, omitting anything the workload left unset so
/// it doesn't clobber a default with an empty value.
pub fn normalize_workload(workload: &Workload) -> Value {
    let mut root = Map::new();
    root.insert("name".into(), json!(workload.meta.name));
    root.insert("namespace".into(), json!(workload.meta.namespace));

    if !workload.spec.labels.is_empty() {
        root.insert("labels".into(), json!(workload.spec.labels));
    }
    if !workload.spec.annotations.is_empty() {
        root.insert("annotations".into(), json!(workload.spec.annotations));
    }

    let mut containers = Map::new();
    for (name, container) in &workload.spec.containers {
        let mut cm = Map::new();
        cm.insert("image".into(), json!(container.image));
        if !container.command.is_empty() {
            cm.insert("command".into(), json!(container.command));
        }
        if !container.args.is_empty() {
            cm.insert("args".into(), json!(container.args));
        }
        if !container.env.is_empty() {
            cm.insert("env".into(), json!(container.env));
        }
        containers.insert(name.clone(), Value::Object(cm));
    }
    root.insert("containers".into(), Value::Object(containers));

    if let Some(service) = &workload.spec.service {
        root.insert("service".into(), json!({ "ports": service.ports }));
    }

    if !workload.spec.resources.is_empty() {
        let mut resources = Map::new();
        for (key, resource) in &workload.spec.resources {
            let mut rm = Map::new();
            rm.insert("type".into(), json!(resource.type_));
            if let Some(class) = &resource.class {
                rm.insert("class".into(), json!(class));
            }
            if !resource.params.is_null() {
                rm.insert("params".into(), resource.params.clone());
            }
            resources.insert(key.clone(), Value::Object(rm));
        }
        root.insert("resources".into(), Value::Object(resources));
    }

    Value::Object(root)
}

/// Right-wins recursive merge. Objects merge key-by-key; anything else
/// (scalars, arrays, type mismatches) is replaced wholesale by `right`.
pub fn deep_merge(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Object(mut l), Value::Object(r)) => {
            for (key, rv) in r {
                let merged = match l.remove(&key) {
                    Some(lv) => deep_merge(lv, rv),
                    None => rv,
                };
                l.insert(key, merged);
            }
            Value::Object(l)
        }
        (_, right) => right,
    }
}

/// Decodes a raw JSON-text `defaultValues` payload. Separate from the
/// already-typed [`scoreplane_domain::TemplateSpec::default_values`] path so
/// that backends sourcing defaults as opaque text (rather than parsed YAML)
/// go through explicit, fallible decoding.
pub fn decode_defaults_str(raw: &str) -> Result<Value, ComposeError> {
    Ok(serde_json::from_str(raw)?)
}

pub fn compose_values(defaults: Value, workload: &Workload, claims: &[ResourceClaim]) -> Value {
    let merged = deep_merge(defaults, normalize_workload(workload));
    deep_merge(merged, claims_to_outputs_value(claims))
}
