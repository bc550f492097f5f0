use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::require_bearer_token;
use crate::handlers;
use crate::state::AppState;

/// Assembles the HTTP admission/inspection surface (§4.13): every route
/// except `/health` sits behind [`require_bearer_token`].
pub fn build_app(state: AppState) -> Router {
    let protected = Router::new()
        .route("/ready", get(handlers::ready))
        .route("/reconcile/:namespace/:name", post(handlers::post_reconcile))
        .route("/reconcile/:namespace/:name/dry-run", post(handlers::post_reconcile_dry_run))
        .route("/workloads", get(handlers::list_workloads))
        .route(
            "/workloads/:namespace/:name",
            get(handlers::get_workload).put(handlers::put_workload).delete(handlers::delete_workload),
        )
        .route("/workloads/:namespace/:name/diff", post(handlers::post_workload_diff))
        .route("/workloads/:namespace/:name/claims", get(handlers::get_claims))
        .route("/workloads/:namespace/:name/plan", get(handlers::get_plan))
        .route("/workloads/:namespace/:name/exposure", get(handlers::get_exposure))
        .route("/events", get(handlers::list_events))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer_token));

    Router::new()
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use scoreplane_config::ConfigCache;
    use scoreplane_domain::{Container, ObjectMeta, Workload, WorkloadSpec};
    use scoreplane_orchestrator::{OrchestratorLoop, ProcessConfig, ReconcileContext};
    use scoreplane_provisioner::ProvisionerRegistry;
    use scoreplane_store::{DeclarativeStore, InMemoryStore};
    use std::collections::HashMap;
    use tower::util::ServiceExt;

    fn process_config() -> ProcessConfig {
        use clap::Parser;
        ProcessConfig::parse_from(["scoreplane-api"])
    }

    fn build_state(auth_token: Option<Arc<String>>) -> AppState {
        let store: Arc<dyn DeclarativeStore> = Arc::new(InMemoryStore::new());
        let config_cache = Arc::new(ConfigCache::default());
        let provisioners = Arc::new(ProvisionerRegistry::new());
        let process_config = process_config();
        let ctx = ReconcileContext {
            store: Arc::clone(&store),
            config_cache: Arc::clone(&config_cache),
            provisioners: Arc::clone(&provisioners),
            process_config: process_config.clone(),
        };
        AppState {
            store,
            orchestrator: Arc::new(OrchestratorLoop::new(ctx)),
            config_cache,
            provisioners,
            process_config,
            auth_token,
        }
    }

    async fn seed_workload(store: &dyn DeclarativeStore) {
        let mut containers = HashMap::new();
        containers.insert(
            "main".to_string(),
            Container { image: "nginx".to_string(), command: vec![], args: vec![], env: HashMap::new(), files: vec![], probes: None, resources: None },
        );
        let wl = Workload::new(ObjectMeta::new("default", "web", Utc::now()), WorkloadSpec { containers, ..Default::default() });
        store.upsert_workload(&wl).await.unwrap();
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = build_app(build_state(Some(Arc::new("secret".to_string()))));
        let resp = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_rejects_missing_token() {
        let app = build_app(build_state(Some(Arc::new("secret".to_string()))));
        let resp = app.oneshot(Request::builder().uri("/workloads").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_rejects_wrong_token() {
        let app = build_app(build_state(Some(Arc::new("secret".to_string()))));
        let req = Request::builder().uri("/workloads").header("Authorization", "Bearer wrong").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn protected_route_accepts_correct_token() {
        let state = build_state(Some(Arc::new("secret".to_string())));
        seed_workload(state.store.as_ref()).await;
        let app = build_app(state);
        let req = Request::builder().uri("/workloads").header("Authorization", "Bearer secret").body(Body::empty()).unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn no_configured_token_leaves_surface_open() {
        let app = build_app(build_state(None));
        let resp = app.oneshot(Request::builder().uri("/workloads").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_workload_is_404() {
        let app = build_app(build_state(None));
        let resp = app.oneshot(Request::builder().uri("/workloads/default/missing").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn known_workload_round_trips() {
        let state = build_state(None);
        seed_workload(state.store.as_ref()).await;
        let app = build_app(state);
        let resp = app.oneshot(Request::builder().uri("/workloads/default/web").body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
