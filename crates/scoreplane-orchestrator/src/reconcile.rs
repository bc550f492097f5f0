//! Orchestrator loop (C11): drives stages (A)-(G) for one Workload, plus the
//! work-queue and worker pool that dispatches reconcile passes concurrently
//! across different Workloads while serializing passes for the same one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use scoreplane_compose::ComposeError;
use scoreplane_config::{load_config_from_path, ConfigCache};
use scoreplane_domain::{Reason, Workload, WorkloadRef};
use scoreplane_provisioner::ProvisionerRegistry;
use scoreplane_store::DeclarativeStore;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinSet;
use tracing::{info, info_span, warn, Instrument};

use crate::deletion::{self, DeletionOutcome};
use crate::error::ReconcileError;
use crate::plan_reconciler;
use crate::process_config::ProcessConfig;
use crate::provisioning;
use crate::select::{select_backend, SelectedBackend};
use crate::status::{derive_status, write_status_with_retry, InputsValidity, StatusInputs};

/// Everything one reconcile pass needs, shared across the worker pool.
pub struct ReconcileContext {
    pub store: Arc<dyn DeclarativeStore>,
    pub config_cache: Arc<ConfigCache>,
    pub provisioners: Arc<ProvisionerRegistry>,
    pub process_config: ProcessConfig,
}

fn validate_and_select(cfg: &scoreplane_config::OrchestratorConfig, workload: &Workload) -> Result<SelectedBackend, Reason> {
    workload.spec.validate().map_err(|_| Reason::SpecInvalid)?;
    select_backend(cfg, workload).map_err(|_| Reason::PolicyViolation)
}

/// Runs stages (A)-(G) once for `workload_ref`. Returns without error when
/// the pass completed (including the no-op "workload already deleted" case);
/// failures that should be retried surface as `Err`.
pub async fn reconcile_one(ctx: &ReconcileContext, workload_ref: &WorkloadRef) -> Result<(), ReconcileError> {
    let Some(mut workload) = ctx.store.get_workload(workload_ref).await? else {
        return Ok(());
    };

    if workload.meta.is_deleting() {
        let outcome = deletion::reconcile_deletion(ctx.store.as_ref(), &mut workload).await?;
        match outcome {
            DeletionOutcome::Requeue { claims_to_wait_for } => {
                info!(claims_to_wait_for, "deletion pass requeued, claims still deprovisioning");
            }
            DeletionOutcome::FinalizerRemoved => {
                info!("deletion complete, finalizer removed");
            }
        }
        return Ok(());
    }

    // (A) validate & select
    let config_path = ctx.process_config.config_path.clone();
    let config = match ctx.config_cache.get_or_reload(|| load_config_from_path(&config_path)) {
        Ok(config) => config,
        Err(err) => {
            warn!(error = %err, "no configuration available (cold cache, loader failing), surfacing InputsValid=Unknown");
            let claims = ctx.store.list_claims(workload_ref).await.unwrap_or_default();
            let status = derive_status(
                workload.meta.generation,
                &StatusInputs {
                    inputs_valid: InputsValidity::Unknown(Reason::ConfigNotFound),
                    claims: &claims,
                    plan: None,
                    projection_error: false,
                    endpoint: None,
                },
            );
            write_status_with_retry(ctx.store.as_ref(), &workload, status, ctx.process_config.max_retries).await?;
            return Ok(());
        }
    };
    let selection = validate_and_select(&config, &workload);

    let selected = match selection {
        Ok(s) => s,
        Err(reason) => {
            warn!(reason = %reason, "workload failed validation/selection, skipping claims/plan/exposure");
            let claims = ctx.store.list_claims(workload_ref).await.unwrap_or_default();
            let status = derive_status(
                workload.meta.generation,
                &StatusInputs { inputs_valid: InputsValidity::Invalid(reason), claims: &claims, plan: None, projection_error: false, endpoint: None },
            );
            write_status_with_retry(ctx.store.as_ref(), &workload, status, ctx.process_config.max_retries).await?;
            return Ok(());
        }
    };

    if !workload.spec.resources.is_empty() && !workload.meta.has_finalizer(deletion::FINALIZER) {
        workload.meta.add_finalizer(deletion::FINALIZER);
        ctx.store.upsert_workload(&workload).await?;
    }

    // (B) reconcile claims, then drive provisioning so outputs are fresh for (C)/(D)
    let mut claims = crate::claims::reconcile_claims(ctx.store.as_ref(), &workload).await?;
    provisioning::drive_provisioning(ctx.store.as_ref(), ctx.provisioners.as_ref(), &mut claims).await?;
    provisioning::expand_secret_outputs(ctx.store.as_ref(), &mut claims).await?;

    // (C)/(D) compose values and resolve references
    let composition = match plan_reconciler::compose_plan(&workload, &selected, &claims) {
        Ok(c) => c,
        Err(ReconcileError::Compose(ComposeError::Reference(msg))) => {
            warn!(error = %msg, "reference resolution failed, treating as projection error");
            plan_reconciler::PlanComposition {
                spec: scoreplane_domain::WorkloadPlanSpec {
                    workload_ref: workload_ref.clone(),
                    observed_workload_generation: workload.meta.generation,
                    runtime_class: selected.runtime_class.clone(),
                    template: selected.template.clone(),
                    resolved_values: serde_json::Value::Null,
                    claims: vec![],
                    projection: scoreplane_domain::Projection::default(),
                },
                unresolved: true,
            }
        }
        Err(other) => return Err(other),
    };

    if !composition.unresolved {
        // (E) upsert plan
        plan_reconciler::upsert_plan_if_changed(ctx.store.as_ref(), &workload, composition.spec).await?;
        // (F) upsert exposure
        crate::exposure_reconciler::upsert_exposure_if_changed(ctx.store.as_ref(), &workload, &selected).await?;
    }

    // (G) aggregate status
    let plan = ctx.store.get_plan(workload_ref).await?;
    let endpoint = crate::exposure_reconciler::mirrored_endpoint(ctx.store.as_ref(), &workload).await?;
    let status = derive_status(
        workload.meta.generation,
        &StatusInputs {
            inputs_valid: InputsValidity::Valid,
            claims: &claims,
            plan: plan.as_ref(),
            projection_error: composition.unresolved,
            endpoint,
        },
    );
    write_status_with_retry(ctx.store.as_ref(), &workload, status, ctx.process_config.max_retries).await?;

    Ok(())
}

/// Work-queue key. `(namespace, name)` — the per-key serialization rule
/// specialized to the one kind this loop drives: Workload.
pub type WorkloadKey = (String, String);

fn key_for(workload_ref: &WorkloadRef) -> WorkloadKey {
    (workload_ref.namespace.clone(), workload_ref.name.clone())
}

/// Bounded worker pool draining a work queue of Workload keys, enforcing one
/// active reconcile per key via a per-key mutex. Requeues are modeled as
/// delayed re-sends on the same channel rather than a persistent timer
/// wheel — acceptable given the in-process scope of this crate.
pub struct OrchestratorLoop {
    ctx: Arc<ReconcileContext>,
    sender: mpsc::UnboundedSender<WorkloadRef>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<WorkloadRef>>>,
    locks: RwLock<HashMap<WorkloadKey, Arc<Mutex<()>>>>,
    /// Consecutive-failure count per key, used to scale the backoff delay.
    /// Cleared on a successful pass.
    attempts: RwLock<HashMap<WorkloadKey, u32>>,
}

/// Picks the requeue delay for a failed pass: `ConflictRequeueDelay` for a
/// status-write race (expected to clear quickly), `DefaultRequeueDelay`
/// otherwise, both scaled by `backoff_multiplier` raised to the
/// (1-indexed) attempt count.
fn requeue_delay(cfg: &ProcessConfig, err: &ReconcileError, attempt: u32) -> Duration {
    let base = match err {
        ReconcileError::Store(scoreplane_store::StoreError::Conflict { .. }) => cfg.conflict_requeue_delay(),
        _ => cfg.default_requeue_delay(),
    };
    let scale = cfg.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
    base.mul_f64(scale.max(1.0))
}

impl OrchestratorLoop {
    pub fn new(ctx: ReconcileContext) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        OrchestratorLoop {
            ctx: Arc::new(ctx),
            sender,
            receiver: Mutex::new(Some(receiver)),
            locks: RwLock::new(HashMap::new()),
            attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Enqueues one reconcile request. Safe to call from any task (HTTP
    /// handlers, the claim-change watcher, tests).
    pub fn enqueue(&self, workload_ref: WorkloadRef) {
        let _ = self.sender.send(workload_ref);
    }

    /// Enqueues `workload_ref` again after `delay` — the requeue mechanism
    /// for `DefaultRequeueDelay`/`ConflictRequeueDelay`/backoff.
    pub fn enqueue_after(self: &Arc<Self>, workload_ref: WorkloadRef, delay: Duration) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.enqueue(workload_ref);
        });
    }

    async fn lock_for(&self, key: &WorkloadKey) -> Arc<Mutex<()>> {
        if let Some(lock) = self.locks.read().await.get(key) {
            return Arc::clone(lock);
        }
        let mut guard = self.locks.write().await;
        Arc::clone(guard.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Runs the worker pool until the queue is closed. Each popped key is
    /// processed under its per-key lock so two passes for the same Workload
    /// never overlap; distinct Workloads run concurrently up to
    /// `worker_pool_size`.
    pub async fn run(self: Arc<Self>) {
        let mut receiver = self.receiver.lock().await.take().expect("OrchestratorLoop::run called more than once");
        let pool_size = self.ctx.process_config.worker_pool_size();
        let mut workers = JoinSet::new();

        loop {
            tokio::select! {
                maybe_ref = receiver.recv() => {
                    let Some(workload_ref) = maybe_ref else { break };
                    while workers.len() >= pool_size {
                        workers.join_next().await;
                    }
                    let this = Arc::clone(&self);
                    workers.spawn(async move {
                        this.process(workload_ref).await;
                    });
                }
                Some(_) = workers.join_next(), if !workers.is_empty() => {}
            }
        }
        while workers.join_next().await.is_some() {}
    }

    async fn process(self: &Arc<Self>, workload_ref: WorkloadRef) {
        let key = key_for(&workload_ref);
        let lock = self.lock_for(&key).await;
        let _guard = lock.lock().await;

        let span = info_span!("reconcile", namespace = %workload_ref.namespace, name = %workload_ref.name);
        let result = async { reconcile_one(&self.ctx, &workload_ref).await }.instrument(span).await;

        match result {
            Ok(()) => {
                self.attempts.write().await.remove(&key);
                info!("reconcile pass complete, requeuing for drift detection");
                self.enqueue_after(workload_ref, self.ctx.process_config.default_requeue_delay());
            }
            Err(err) => {
                let attempt = {
                    let mut attempts = self.attempts.write().await;
                    let count = attempts.entry(key).or_insert(0);
                    *count += 1;
                    *count
                };
                let delay = requeue_delay(&self.ctx.process_config, &err, attempt);
                warn!(error = %err, attempt, delay_secs = delay.as_secs_f64(), "reconcile pass failed, requeuing with backoff");
                self.enqueue_after(workload_ref, delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use scoreplane_config::{API_VERSION, KIND};
    use scoreplane_domain::{Container, ObjectMeta, ResourceSpec, WorkloadSpec};
    use scoreplane_provisioner::StubProvisioner;
    use scoreplane_store::InMemoryStore;
    use std::collections::HashMap as Map;
    use std::io::Write;

    fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
        let path = dir.join("config.yaml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"apiVersion: {api}
kind: {kind}
name: default
profiles:
  - name: web-service
    backends:
      - backendId: k8s-web-1
        runtimeClass: kubernetes
        template:
          kind: manifests
          ref: oci://registry/chart:1.0.0
        priority: 10
        version: 1.0.0
defaults:
  profile: web-service
  selectors: []
provisioners: []
"#,
            api = API_VERSION,
            kind = KIND,
        )
        .unwrap();
        path
    }

    fn workload_with_claim() -> Workload {
        let mut containers = Map::new();
        containers.insert(
            "main".to_string(),
            Container { image: "nginx".to_string(), command: vec![], args: vec![], env: Map::new(), files: vec![], probes: None, resources: None },
        );
        let mut resources = Map::new();
        resources.insert("db".to_string(), ResourceSpec { type_: "postgres".to_string(), class: None, params: serde_json::Value::Null });
        Workload::new(ObjectMeta::new("default", "web", Utc::now()), WorkloadSpec { containers, resources, ..Default::default() })
    }

    fn process_config(path: std::path::PathBuf) -> ProcessConfig {
        use clap::Parser;
        let mut cfg = ProcessConfig::parse_from(["scoreplane-orchestrator"]);
        cfg.config_path = path;
        cfg
    }

    #[tokio::test]
    async fn golden_path_reaches_ready_with_endpoint() {
        let tmp = tempdir();
        let config_path = write_config(tmp.path());

        let store: Arc<dyn DeclarativeStore> = Arc::new(InMemoryStore::new());
        let mut registry = ProvisionerRegistry::new();
        registry.register("postgres", Arc::new(StubProvisioner::new("postgres")));

        let wl = workload_with_claim();
        store.upsert_workload(&wl).await.unwrap();
        let workload_ref = wl.meta.workload_ref();

        let ctx = ReconcileContext {
            store: Arc::clone(&store),
            config_cache: Arc::new(ConfigCache::default()),
            provisioners: Arc::new(registry),
            process_config: process_config(config_path),
        };

        reconcile_one(&ctx, &workload_ref).await.unwrap();

        let plan = store.get_plan(&workload_ref).await.unwrap();
        assert!(plan.is_some(), "plan should have been emitted once the claim is bound");

        let mut exposure = store.get_exposure(&workload_ref).await.unwrap().unwrap();
        exposure.status.exposures = vec![scoreplane_domain::ExposureEntry {
            name: None,
            url: "http://web.default.svc:8000".to_string(),
            type_: None,
            ready: true,
            scope: None,
            scheme_hint: None,
            reachable: None,
        }];
        store.upsert_exposure(&exposure).await.unwrap();

        // another pass mirrors the endpoint now that the runtime has published one
        reconcile_one(&ctx, &workload_ref).await.unwrap();
        let updated = store.get_workload(&workload_ref).await.unwrap().unwrap();
        assert_eq!(updated.status.endpoint.as_deref(), Some("http://web.default.svc:8000"));
    }

    #[tokio::test]
    async fn invalid_spec_sets_inputs_valid_false_and_skips_claims() {
        let tmp = tempdir();
        let config_path = write_config(tmp.path());
        let store: Arc<dyn DeclarativeStore> = Arc::new(InMemoryStore::new());

        let mut wl = workload_with_claim();
        wl.spec.containers.clear();
        store.upsert_workload(&wl).await.unwrap();
        let workload_ref = wl.meta.workload_ref();

        let ctx = ReconcileContext {
            store: Arc::clone(&store),
            config_cache: Arc::new(ConfigCache::default()),
            provisioners: Arc::new(ProvisionerRegistry::new()),
            process_config: process_config(config_path),
        };

        reconcile_one(&ctx, &workload_ref).await.unwrap();
        assert!(store.list_claims(&workload_ref).await.unwrap().is_empty());
        let updated = store.get_workload(&workload_ref).await.unwrap().unwrap();
        let inputs_valid = updated.status.condition(scoreplane_domain::ConditionType::InputsValid).unwrap();
        assert!(!inputs_valid.is_true());
    }

    fn tempdir() -> TempDir {
        let path = std::env::temp_dir().join(format!("scoreplane-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&path).unwrap();
        TempDir(path)
    }

    struct TempDir(std::path::PathBuf);
    impl TempDir {
        fn path(&self) -> &std::path::Path {
            &self.0
        }
    }
    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }
}
