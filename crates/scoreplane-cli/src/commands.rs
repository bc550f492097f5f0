use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use scoreplane_config::ConfigCache;
use scoreplane_domain::WorkloadSpec;
use scoreplane_orchestrator::{OrchestratorLoop, ProcessConfig, ReconcileContext};
use scoreplane_provisioner::{ProvisionerRegistry, SecretRefProvisioner, StubProvisioner};
use scoreplane_store::{DeclarativeStore, InMemoryStore, RedbStore};
use serde::Deserialize;
use uuid::Uuid;

use crate::cli::GraphOutput;
use crate::output;

/// A Workload manifest as read from disk — separates identity (`metadata`)
/// from the abstract `spec` the orchestrator composes and resolves.
#[derive(Debug, Deserialize)]
struct WorkloadManifest {
    metadata: ManifestMetadata,
    spec: WorkloadSpec,
}

#[derive(Debug, Deserialize)]
struct ManifestMetadata {
    namespace: String,
    name: String,
}

fn load_manifest(path: &Path) -> Result<WorkloadManifest> {
    let content = std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&content).with_context(|| format!("failed to parse manifest {}", path.display()))
}

fn parse_workload_ref(input: &str) -> Result<(String, String)> {
    let (namespace, name) = input.split_once('/').context("expected `namespace/name`")?;
    Ok((namespace.to_string(), name.to_string()))
}

// ── Bootstrap ─────────────────────────────────────────────────────────────────

pub async fn bootstrap(
    ephemeral: bool,
    rotate_token: bool,
    store_path: Option<String>,
    no_auth: bool,
    port: u16,
    bind: String,
) -> Result<()> {
    let auth_token = if no_auth {
        println!("Starting without authentication — do not expose this port publicly.");
        None
    } else {
        let token_path = default_token_path();
        Some(Arc::new(resolve_or_generate_token(&token_path, rotate_token)?))
    };

    let store: Arc<dyn DeclarativeStore> = if ephemeral {
        println!("Using in-memory (ephemeral) store — state is lost on shutdown");
        Arc::new(InMemoryStore::new())
    } else {
        let path = resolve_store_path(store_path);
        println!("Using persistent store at {}", path.display());
        Arc::new(RedbStore::open(&path).with_context(|| format!("failed to open store at {}", path.display()))?)
    };

    let mut registry = ProvisionerRegistry::new();
    for type_ in ["postgres", "redis", "bucket", "queue"] {
        registry.register(type_, Arc::new(StubProvisioner::new(type_)));
    }
    registry.register("secret-ref", Arc::new(SecretRefProvisioner::new("secret-ref")));
    let registry = Arc::new(registry);

    let process_config = {
        use clap::Parser;
        let mut cfg = ProcessConfig::parse_from(["workloadctl"]);
        cfg.bind = format!("{bind}:{port}");
        cfg
    };

    let config_cache = Arc::new(ConfigCache::new(process_config.config_cache_ttl()));
    let ctx = ReconcileContext {
        store: Arc::clone(&store),
        config_cache: Arc::clone(&config_cache),
        provisioners: Arc::clone(&registry),
        process_config: process_config.clone(),
    };
    let orchestrator = Arc::new(OrchestratorLoop::new(ctx));
    let loop_handle = tokio::spawn(Arc::clone(&orchestrator).run());

    let state = scoreplane_api::AppState {
        store,
        orchestrator,
        config_cache,
        provisioners: registry,
        process_config: process_config.clone(),
        auth_token,
    };
    let app = scoreplane_api::build_app(state);

    println!("Starting workloadctl server on http://{}", process_config.bind);
    let listener = tokio::net::TcpListener::bind(&process_config.bind)
        .await
        .with_context(|| format!("failed to bind to {}", process_config.bind))?;
    axum::serve(listener, app).await.context("server error")?;

    loop_handle.abort();
    Ok(())
}

// ── Apply / diff ──────────────────────────────────────────────────────────────

pub async fn apply(manifest: PathBuf, remote: String, token: Option<String>) -> Result<()> {
    let manifest = load_manifest(&manifest)?;
    let token = resolve_token(token)?;
    let client = authed_client(&token)?;
    let base = remote.trim_end_matches('/');

    let put_url = format!("{base}/workloads/{}/{}", manifest.metadata.namespace, manifest.metadata.name);
    client
        .put(&put_url)
        .json(&serde_json::json!({ "spec": manifest.spec }))
        .send()
        .await
        .with_context(|| format!("failed to reach server at {remote}"))?
        .error_for_status()
        .context("server rejected the manifest")?;

    let reconcile_url = format!("{base}/reconcile/{}/{}", manifest.metadata.namespace, manifest.metadata.name);
    let report: serde_json::Value = client
        .post(&reconcile_url)
        .send()
        .await
        .with_context(|| format!("failed to reach server at {remote}"))?
        .json()
        .await?;

    println!("{}", output::render_applied(&report));
    Ok(())
}

pub async fn diff(manifest: PathBuf, remote: String, token: Option<String>) -> Result<()> {
    let manifest = load_manifest(&manifest)?;
    let token = resolve_token(token)?;
    let client = authed_client(&token)?;
    let base = remote.trim_end_matches('/');

    let diff_url = format!("{base}/workloads/{}/{}/diff", manifest.metadata.namespace, manifest.metadata.name);
    let report: serde_json::Value = client
        .post(&diff_url)
        .json(&serde_json::json!({ "spec": manifest.spec }))
        .send()
        .await
        .with_context(|| format!("failed to reach server at {remote}"))?
        .json()
        .await?;

    println!("{}", output::render_diff(&report));
    Ok(())
}

// ── Status ────────────────────────────────────────────────────────────────────

pub async fn status(workload: Option<String>, remote: String, token: Option<String>) -> Result<()> {
    let token = resolve_token(token)?;
    let client = authed_client(&token)?;
    let base = remote.trim_end_matches('/');

    match workload {
        Some(wl) => {
            let (namespace, name) = parse_workload_ref(&wl)?;
            let body: serde_json::Value = client
                .get(format!("{base}/workloads/{namespace}/{name}"))
                .send()
                .await
                .with_context(|| format!("failed to reach server at {remote}"))?
                .json()
                .await?;
            println!("{}", output::render_workload_status(&body));
        }
        None => {
            let body: Vec<serde_json::Value> = client
                .get(format!("{base}/workloads"))
                .send()
                .await
                .with_context(|| format!("failed to reach server at {remote}"))?
                .json()
                .await?;
            println!("{}", output::render_status_table(&body));
        }
    }
    Ok(())
}

// ── Graph ─────────────────────────────────────────────────────────────────────

pub async fn graph(output_format: GraphOutput, workload: Option<String>, remote: String, token: Option<String>) -> Result<()> {
    let token = resolve_token(token)?;
    let client = authed_client(&token)?;
    let base = remote.trim_end_matches('/');

    let workloads: Vec<serde_json::Value> = match &workload {
        Some(wl) => {
            let (namespace, name) = parse_workload_ref(wl)?;
            let one: serde_json::Value = client
                .get(format!("{base}/workloads/{namespace}/{name}"))
                .send()
                .await
                .with_context(|| format!("failed to reach server at {remote}"))?
                .json()
                .await?;
            vec![one]
        }
        None => client
            .get(format!("{base}/workloads"))
            .send()
            .await
            .with_context(|| format!("failed to reach server at {remote}"))?
            .json()
            .await?,
    };

    let mut nodes = Vec::new();
    for wl in &workloads {
        let namespace = wl["meta"]["namespace"].as_str().unwrap_or("-").to_string();
        let name = wl["meta"]["name"].as_str().unwrap_or("-").to_string();
        let claims: Vec<serde_json::Value> = client
            .get(format!("{base}/workloads/{namespace}/{name}/claims"))
            .send()
            .await
            .with_context(|| format!("failed to reach server at {remote}"))?
            .json()
            .await
            .unwrap_or_default();
        nodes.push(output::GraphNode { namespace, name, endpoint: wl["status"]["endpoint"].as_str().map(String::from), claims });
    }

    match output_format {
        GraphOutput::Json => println!("{}", serde_json::to_string_pretty(&workloads)?),
        GraphOutput::Text => print!("{}", output::render_graph_text(&nodes)),
        GraphOutput::Dot => println!("{}", output::render_dot(&nodes)),
    }
    Ok(())
}

// ── Token helpers ─────────────────────────────────────────────────────────────

fn generate_token() -> String {
    let a = Uuid::new_v4().to_string().replace('-', "");
    let b = Uuid::new_v4().to_string().replace('-', "");
    format!("{a}{b}")
}

fn resolve_or_generate_token(path: &PathBuf, rotate: bool) -> Result<String> {
    if !rotate {
        if let Ok(existing) = std::fs::read_to_string(path).map(|s| s.trim().to_string()) {
            if !existing.is_empty() {
                println!("Reusing existing token from {}", path.display());
                return Ok(existing);
            }
        }
    }
    let token = generate_token();
    write_token(path, &token)?;
    println!("{} token (written to {})", if rotate { "Rotated" } else { "Generated" }, path.display());
    Ok(token)
}

fn resolve_token(explicit: Option<String>) -> Result<String> {
    if let Some(t) = explicit {
        return Ok(t);
    }
    let path = default_token_path();
    std::fs::read_to_string(&path).map(|s| s.trim().to_string()).with_context(|| {
        format!(
            "no token provided and could not read {}. Use --token, SCOREPLANE_TOKEN, or run `workloadctl bootstrap` first",
            path.display()
        )
    })
}

fn write_token(path: &PathBuf, token: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, token).with_context(|| format!("failed to write token to {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }
    Ok(())
}

fn default_token_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".scoreplane").join("token")
}

fn resolve_store_path(store_path: Option<String>) -> PathBuf {
    if let Some(p) = store_path {
        return PathBuf::from(p);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".scoreplane").join("state.redb")
}

fn authed_client(token: &str) -> Result<reqwest::Client> {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        reqwest::header::HeaderValue::from_str(&format!("Bearer {token}")).context("token contains invalid header characters")?,
    );
    reqwest::Client::builder().default_headers(headers).timeout(Duration::from_secs(30)).build().context("failed to build HTTP client")
}
