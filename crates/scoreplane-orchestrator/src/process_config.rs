//! Process-wide configuration (§6): environment- or CLI-driven knobs for the
//! reconcile loop, parsed once at process start and threaded through the
//! HTTP surface and CLI.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
pub struct ProcessConfig {
    /// Path to the `config.yaml` document (ConfigMap-like store, key
    /// `config.yaml`, per §6).
    #[arg(long, env = "SCOREPLANE_CONFIG_PATH", default_value = "config/config.yaml")]
    pub config_path: PathBuf,

    /// TTL for the in-process configuration cache, in seconds.
    #[arg(long, env = "SCOREPLANE_CONFIG_CACHE_TTL_SECS", default_value_t = 300)]
    pub config_cache_ttl_secs: u64,

    /// Delay before a successfully-reconciled Workload is requeued anyway
    /// (§4.9's `DefaultRequeueDelay`).
    #[arg(long, env = "SCOREPLANE_DEFAULT_REQUEUE_DELAY_SECS", default_value_t = 30)]
    pub default_requeue_delay_secs: u64,

    /// Delay before retrying a status write after an optimistic-concurrency
    /// conflict (`ConflictRequeueDelay`).
    #[arg(long, env = "SCOREPLANE_CONFLICT_REQUEUE_DELAY_SECS", default_value_t = 1)]
    pub conflict_requeue_delay_secs: u64,

    /// Maximum status-write retries before giving up and requeuing normally.
    #[arg(long, env = "SCOREPLANE_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    /// Backoff multiplier applied between successive requeue attempts.
    #[arg(long, env = "SCOREPLANE_BACKOFF_MULTIPLIER", default_value_t = 2.0)]
    pub backoff_multiplier: f64,

    /// Worker pool size for the reconcile loop; defaults to the number of
    /// available CPUs.
    #[arg(long, env = "SCOREPLANE_WORKER_POOL_SIZE")]
    pub worker_pool_size: Option<usize>,

    /// Bearer token required by every HTTP route except `/health`.
    #[arg(long, env = "SCOREPLANE_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    /// Path to the redb-backed store file; when unset, the in-memory store
    /// is used instead.
    #[arg(long, env = "SCOREPLANE_STORE_PATH")]
    pub store_path: Option<PathBuf>,

    /// Bind address for the HTTP admission/inspection surface.
    #[arg(long, env = "SCOREPLANE_BIND", default_value = "0.0.0.0:8080")]
    pub bind: String,
}

impl ProcessConfig {
    pub fn config_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.config_cache_ttl_secs)
    }

    pub fn default_requeue_delay(&self) -> Duration {
        Duration::from_secs(self.default_requeue_delay_secs)
    }

    pub fn conflict_requeue_delay(&self) -> Duration {
        Duration::from_secs(self.conflict_requeue_delay_secs)
    }

    pub fn worker_pool_size(&self) -> usize {
        self.worker_pool_size.unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_match_documented_knobs() {
        let cfg = ProcessConfig::parse_from(["scoreplane-orchestrator"]);
        assert_eq!(cfg.default_requeue_delay_secs, 30);
        assert_eq!(cfg.conflict_requeue_delay_secs, 1);
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.backoff_multiplier, 2.0);
    }

    #[test]
    fn worker_pool_size_falls_back_to_available_parallelism() {
        let cfg = ProcessConfig::parse_from(["scoreplane-orchestrator"]);
        assert!(cfg.worker_pool_size() >= 1);
    }
}
