//! Reference resolution and unresolved-placeholder detection.
//!
//! Two accepted grammars per occurrence, both textual (not structural):
//! `${resources.<key>.outputs.<out>}` and the shorthand `${resources.<key>.<out>}`.
//! The regex alternation below tries the `.outputs.` form first so the literal
//! segment "outputs" is never mistaken for an output name under the short
//! grammar.

use once_cell::sync::Lazy;
use regex::Regex;
use scoreplane_domain::ResourceClaim;
use serde_json::Value;

use crate::composer::{build_outputs_table, OutputsTable};
use crate::error::ComposeError;

static REF_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\{resources\.([A-Za-z0-9_-]+)\.(?:outputs\.([A-Za-z0-9_-]+)|([A-Za-z0-9_-]+))\}")
        .expect("static regex is valid")
});

static UNRESOLVED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{[^}]+\}").expect("static regex is valid"));

/// Substitutes every reference in `value` against the claims' current
/// outputs. A reference to a resource key with no matching claim at all is a
/// hard error. A reference to a claim that exists but hasn't produced outputs
/// yet is left untouched so [`has_unresolved`] can pick it up — that's a
/// transient "still binding" state, not a mistake.
pub fn resolve_references(value: &Value, claims: &[ResourceClaim]) -> Result<Value, ComposeError> {
    let table = build_outputs_table(claims);
    resolve_value(value, &table)
}

fn resolve_value(value: &Value, table: &OutputsTable) -> Result<Value, ComposeError> {
    match value {
        Value::String(s) => Ok(Value::String(resolve_string(s, table)?)),
        Value::Array(items) => {
            let resolved: Result<Vec<_>, _> = items.iter().map(|v| resolve_value(v, table)).collect();
            Ok(Value::Array(resolved?))
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), resolve_value(v, table)?);
            }
            Ok(Value::Object(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(s: &str, table: &OutputsTable) -> Result<String, ComposeError> {
    let mut result = String::with_capacity(s.len());
    let mut last_end = 0;
    for caps in REF_RE.captures_iter(s) {
        let whole = caps.get(0).expect("group 0 always present");
        result.push_str(&s[last_end..whole.start()]);

        let key = &caps[1];
        let out = caps.get(2).or_else(|| caps.get(3)).expect("one of outputs-form or short-form must match").as_str();

        match table.get(key) {
            None => return Err(ComposeError::Reference(format!("no outputs for resource key '{key}'"))),
            Some(outputs) if outputs.is_empty() => {
                // claim exists but hasn't produced outputs yet — leave as-is.
                result.push_str(whole.as_str());
            }
            Some(outputs) => match outputs.get(out) {
                Some(val) => result.push_str(val),
                None => {
                    return Err(ComposeError::Reference(format!(
                        "resource '{key}' has no output named '{out}'"
                    )))
                }
            },
        }
        last_end = whole.end();
    }
    result.push_str(&s[last_end..]);
    Ok(result)
}

/// Every `(key, out)` reference occurring in `s`, in order, regardless of
/// whether it actually resolves. Used by the plan reconciler to build
/// env/file/volume projections without re-deriving the reference grammar.
pub fn find_references(s: &str) -> Vec<(String, String)> {
    REF_RE
        .captures_iter(s)
        .map(|caps| {
            let key = caps[1].to_string();
            let out = caps.get(2).or_else(|| caps.get(3)).expect("one form must match").as_str().to_string();
            (key, out)
        })
        .collect()
}

/// True if any string leaf still contains a non-empty `${...}` placeholder.
/// `${}` (empty) and bare `$FOO` (no braces) are never flagged.
pub fn has_unresolved(value: &Value) -> bool {
    match value {
        Value::String(s) => UNRESOLVED_RE.is_match(s),
        Value::Array(items) => items.iter().any(has_unresolved),
        Value::Object(map) => map.values().any(has_unresolved),
        _ => false,
    }
}
