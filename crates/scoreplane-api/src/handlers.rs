use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use scoreplane_config::ConfigCache;
use scoreplane_domain::WorkloadRef;
use scoreplane_orchestrator::{reconcile_one, ReconcileContext};
use scoreplane_store::{AuditEvent, DeclarativeStore, InMemoryStore};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok\n"
}

pub async fn ready(State(state): State<AppState>) -> Result<&'static str, ApiError> {
    state.store.list_workloads().await?;
    Ok("ready\n")
}

fn workload_ref(namespace: String, name: String) -> WorkloadRef {
    WorkloadRef::new(namespace, name)
}

pub async fn post_reconcile(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let workload_ref = workload_ref(namespace, name);
    let ctx = ReconcileContext {
        store: Arc::clone(&state.store),
        config_cache: Arc::clone(&state.config_cache),
        provisioners: Arc::clone(&state.provisioners),
        process_config: state.process_config.clone(),
    };
    reconcile_one(&ctx, &workload_ref).await?;
    let workload = state.store.get_workload(&workload_ref).await?.ok_or_else(|| ApiError::NotFound(workload_ref.to_string()))?;
    Ok(Json(json!({ "workload": workload })))
}

/// Runs the same reconcile pass as [`post_reconcile`], but against a scratch
/// store seeded from the current Workload/claims/plan/exposure so the real
/// store is never written to.
pub async fn post_reconcile_dry_run(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let workload_ref = workload_ref(namespace, name);
    let scratch = snapshot(state.store.as_ref(), &workload_ref).await?;
    let ctx = ReconcileContext {
        store: Arc::new(scratch),
        config_cache: Arc::new(ConfigCache::new(state.config_cache_ttl())),
        provisioners: Arc::clone(&state.provisioners),
        process_config: state.process_config.clone(),
    };
    reconcile_one(&ctx, &workload_ref).await?;
    let workload = ctx.store.get_workload(&workload_ref).await?.ok_or_else(|| ApiError::NotFound(workload_ref.to_string()))?;
    let plan = ctx.store.get_plan(&workload_ref).await?;
    let exposure = ctx.store.get_exposure(&workload_ref).await?;
    Ok(Json(json!({ "workload": workload, "plan": plan, "exposure": exposure, "dry_run": true })))
}

async fn snapshot(store: &dyn DeclarativeStore, workload_ref: &WorkloadRef) -> Result<InMemoryStore, ApiError> {
    let scratch = InMemoryStore::new();
    let workload = store.get_workload(workload_ref).await?.ok_or_else(|| ApiError::NotFound(workload_ref.to_string()))?;
    scratch.upsert_workload(&workload).await?;
    for claim in store.list_claims(workload_ref).await? {
        scratch.upsert_claim(&claim).await?;
    }
    if let Some(plan) = store.get_plan(workload_ref).await? {
        scratch.upsert_plan(&plan).await?;
    }
    if let Some(exposure) = store.get_exposure(workload_ref).await? {
        scratch.upsert_exposure(&exposure).await?;
    }
    Ok(scratch)
}

pub async fn list_workloads(State(state): State<AppState>) -> Result<Json<Vec<scoreplane_domain::Workload>>, ApiError> {
    Ok(Json(state.store.list_workloads().await?))
}

pub async fn get_workload(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<scoreplane_domain::Workload>, ApiError> {
    let workload_ref = workload_ref(namespace, name);
    state.store.get_workload(&workload_ref).await?.map(Json).ok_or_else(|| ApiError::NotFound(workload_ref.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct PutWorkloadBody {
    pub spec: scoreplane_domain::WorkloadSpec,
}

/// Upserts a Workload's spec (creating it at generation 1 if new, bumping
/// generation on a spec change otherwise) without triggering a reconcile —
/// callers that want one call [`post_reconcile`] next, the way `apply` does.
pub async fn put_workload(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(body): Json<PutWorkloadBody>,
) -> Result<Json<scoreplane_domain::Workload>, ApiError> {
    let workload_ref = workload_ref(namespace.clone(), name.clone());
    let workload = match state.store.get_workload(&workload_ref).await? {
        Some(mut existing) => {
            existing.meta.generation += 1;
            existing.spec = body.spec;
            existing
        }
        None => scoreplane_domain::Workload::new(scoreplane_domain::ObjectMeta::new(namespace, name, chrono::Utc::now()), body.spec),
    };
    state.store.upsert_workload(&workload).await?;
    Ok(Json(workload))
}

/// Previews the effect of applying `body.spec` without persisting anything:
/// seeds a scratch store from the real one, upserts the candidate spec there,
/// and runs one reconcile pass against the scratch store.
pub async fn post_workload_diff(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(body): Json<PutWorkloadBody>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let workload_ref = workload_ref(namespace.clone(), name.clone());
    let scratch = InMemoryStore::new();
    let mut workload = match state.store.get_workload(&workload_ref).await? {
        Some(existing) => existing,
        None => scoreplane_domain::Workload::new(scoreplane_domain::ObjectMeta::new(namespace, name, chrono::Utc::now()), body.spec.clone()),
    };
    workload.spec = body.spec;
    scratch.upsert_workload(&workload).await?;
    for claim in state.store.list_claims(&workload_ref).await? {
        scratch.upsert_claim(&claim).await?;
    }

    let ctx = ReconcileContext {
        store: Arc::new(scratch),
        config_cache: Arc::new(ConfigCache::new(state.config_cache_ttl())),
        provisioners: Arc::clone(&state.provisioners),
        process_config: state.process_config.clone(),
    };
    reconcile_one(&ctx, &workload_ref).await?;
    let previewed = ctx.store.get_workload(&workload_ref).await?.ok_or_else(|| ApiError::NotFound(workload_ref.to_string()))?;
    let plan = ctx.store.get_plan(&workload_ref).await?;
    Ok(Json(json!({ "workload": previewed, "plan": plan, "dry_run": true })))
}

/// Marks the Workload for deletion (sets `deletionRequestedAt`) and enqueues
/// an immediate reconcile so the deletion coordinator (C10) picks it up.
pub async fn delete_workload(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<&'static str, ApiError> {
    let workload_ref = workload_ref(namespace, name);
    let mut workload = state.store.get_workload(&workload_ref).await?.ok_or_else(|| ApiError::NotFound(workload_ref.to_string()))?;
    if !workload.meta.is_deleting() {
        workload.meta.deletion_requested_at = Some(chrono::Utc::now());
        state.store.upsert_workload(&workload).await?;
    }
    state.orchestrator.enqueue(workload_ref);
    Ok("accepted\n")
}

pub async fn get_claims(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<Vec<scoreplane_domain::ResourceClaim>>, ApiError> {
    Ok(Json(state.store.list_claims(&workload_ref(namespace, name)).await?))
}

pub async fn get_plan(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<scoreplane_domain::WorkloadPlan>, ApiError> {
    let workload_ref = workload_ref(namespace, name);
    state.store.get_plan(&workload_ref).await?.map(Json).ok_or_else(|| ApiError::NotFound(workload_ref.to_string()))
}

pub async fn get_exposure(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<scoreplane_domain::WorkloadExposure>, ApiError> {
    let workload_ref = workload_ref(namespace, name);
    state.store.get_exposure(&workload_ref).await?.map(Json).ok_or_else(|| ApiError::NotFound(workload_ref.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    namespace: Option<String>,
    name: Option<String>,
    #[serde(default = "default_limit")]
    limit: u32,
}

fn default_limit() -> u32 {
    100
}

pub async fn list_events(State(state): State<AppState>, Query(query): Query<EventsQuery>) -> Result<Json<Vec<AuditEvent>>, ApiError> {
    let filter = match (query.namespace, query.name) {
        (Some(namespace), Some(name)) => Some(WorkloadRef::new(namespace, name)),
        _ => None,
    };
    Ok(Json(state.store.list_events(filter.as_ref(), query.limit).await?))
}

impl AppState {
    fn config_cache_ttl(&self) -> std::time::Duration {
        self.process_config.config_cache_ttl()
    }
}
