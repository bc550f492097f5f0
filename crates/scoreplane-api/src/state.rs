use std::sync::Arc;

use scoreplane_config::ConfigCache;
use scoreplane_orchestrator::{OrchestratorLoop, ProcessConfig};
use scoreplane_provisioner::ProvisionerRegistry;
use scoreplane_store::DeclarativeStore;

/// Shared state threaded through every handler via axum's `State` extractor.
///
/// Cheap to clone — everything inside is already an `Arc`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DeclarativeStore>,
    pub orchestrator: Arc<OrchestratorLoop>,
    pub config_cache: Arc<ConfigCache>,
    pub provisioners: Arc<ProvisionerRegistry>,
    pub process_config: ProcessConfig,
    pub auth_token: Option<Arc<String>>,
}
