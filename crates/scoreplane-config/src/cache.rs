use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::error::ConfigError;
use crate::model::OrchestratorConfig;

const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Process-wide configuration cache (§6: "A TTL cache (default 5 min)
/// reduces reads"). Readers get a deep copy; a single writer refreshes on
/// expiry or explicit invalidation — mirrors the guarded-container guidance
/// in SPEC_FULL.md §9 for the config cache's concurrency model.
pub struct ConfigCache {
    ttl: Duration,
    inner: RwLock<Option<Entry>>,
}

struct Entry {
    config: OrchestratorConfig,
    fetched_at: Instant,
}

impl Default for ConfigCache {
    fn default() -> Self {
        ConfigCache::new(DEFAULT_TTL)
    }
}

impl ConfigCache {
    pub fn new(ttl: Duration) -> Self {
        ConfigCache { ttl, inner: RwLock::new(None) }
    }

    /// Returns the cached config if fresh; otherwise calls `reload` and
    /// caches the result. On reload failure, stale-but-cached config is
    /// returned instead of propagating the error (§7: "Use cached config if
    /// fresh; else halt writes with operator alert" — a stale cache is
    /// preferred over no config at all).
    pub fn get_or_reload<F>(&self, reload: F) -> Result<OrchestratorConfig, ConfigError>
    where
        F: FnOnce() -> Result<OrchestratorConfig, ConfigError>,
    {
        if let Some(fresh) = self.fresh_entry() {
            return Ok(fresh);
        }

        match reload() {
            Ok(config) => {
                let mut guard = self.inner.write().expect("config cache lock poisoned");
                *guard = Some(Entry { config: config.clone(), fetched_at: Instant::now() });
                Ok(config)
            }
            Err(e) => {
                let guard = self.inner.read().expect("config cache lock poisoned");
                match guard.as_ref() {
                    Some(entry) => Ok(entry.config.clone()),
                    None => Err(e),
                }
            }
        }
    }

    pub fn invalidate(&self) {
        let mut guard = self.inner.write().expect("config cache lock poisoned");
        *guard = None;
    }

    fn fresh_entry(&self) -> Option<OrchestratorConfig> {
        let guard = self.inner.read().expect("config cache lock poisoned");
        let entry = guard.as_ref()?;
        if entry.fetched_at.elapsed() < self.ttl {
            Some(entry.config.clone())
        } else {
            None
        }
    }
}
