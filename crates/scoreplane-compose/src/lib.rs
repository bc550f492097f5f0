//! Value composition and reference resolution (C1, C2, C3).
//!
//! `values = deepMerge(defaults, normalize(workload), outputs)`, followed by
//! textual substitution of `${resources.<key>.<out>}` references against the
//! current claim outputs, followed by a scan for any reference that remains
//! unresolved.

mod composer;
mod error;
mod resolver;

pub use composer::{
    build_outputs_table, claims_to_outputs_value, compose_values, decode_defaults_str, deep_merge,
    normalize_workload, OutputsTable,
};
pub use error::ComposeError;
pub use resolver::{find_references, has_unresolved, resolve_references};

use scoreplane_domain::{ResourceClaim, Workload};
use serde_json::Value;

/// Composed-and-resolved values plus whether any reference is still pending.
#[derive(Debug, Clone)]
pub struct ResolvedValues {
    pub value: Value,
    pub unresolved: bool,
}

/// Runs the full C1/C2/C3 pipeline: compose, resolve, scan.
///
/// Returns `Err` only for a genuine reference mistake (unknown resource key,
/// or a bound claim missing the requested output) — a claim that simply
/// hasn't bound yet produces `unresolved: true` with `Ok`, so callers can
/// requeue instead of failing the plan outright.
pub fn compose(defaults: Value, workload: &Workload, claims: &[ResourceClaim]) -> Result<ResolvedValues, ComposeError> {
    let composed = compose_values(defaults, workload, claims);
    let resolved = resolve_references(&composed, claims)?;
    let unresolved = has_unresolved(&resolved);
    Ok(ResolvedValues { value: resolved, unresolved })
}
