use serde::{Deserialize, Serialize};

use crate::condition::Condition;
use crate::error::DomainError;
use crate::ids::{ObjectMeta, WorkloadRefWithUid};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadExposureSpec {
    pub workload_ref: WorkloadRefWithUid,
    pub observed_workload_generation: u64,
    pub runtime_class: String,
}

/// One exposure entry. `url` must match `^https?://` (validated at the
/// declarative store boundary, re-checked by the mirror step in C8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExposureEntry {
    pub name: Option<String>,
    pub url: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub ready: bool,
    pub scope: Option<String>,
    pub scheme_hint: Option<String>,
    pub reachable: Option<bool>,
}

impl ExposureEntry {
    /// Scheme + host parse, per SPEC_FULL.md §4.6 and §6.
    pub fn parse_url(&self) -> Result<url_lite::ParsedUrl, DomainError> {
        url_lite::parse(&self.url).ok_or_else(|| DomainError::InvalidExposureUrl(self.url.clone()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadExposureStatus {
    /// Ordered by descending priority — `exposures[0]` is the one the
    /// orchestrator mirrors.
    #[serde(default)]
    pub exposures: Vec<ExposureEntry>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkloadExposure {
    pub meta: ObjectMeta,
    pub spec: WorkloadExposureSpec,
    #[serde(default)]
    pub status: WorkloadExposureStatus,
}

impl WorkloadExposure {
    pub fn new(meta: ObjectMeta, spec: WorkloadExposureSpec) -> Self {
        WorkloadExposure { meta, spec, status: WorkloadExposureStatus::default() }
    }
}

/// A tiny dependency-free `scheme://host[:port]` parser. Deliberately not
/// pulling in the full `url` crate for a single-purpose scheme+host check
/// that the mirror step runs on every reconcile.
pub mod url_lite {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ParsedUrl {
        pub scheme: String,
        pub host: String,
        pub port: Option<u16>,
    }

    pub fn parse(s: &str) -> Option<ParsedUrl> {
        let (scheme, rest) = s.split_once("://")?;
        if scheme != "http" && scheme != "https" {
            return None;
        }
        let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
        if authority.is_empty() {
            return None;
        }
        let (host, port) = match authority.rsplit_once(':') {
            Some((h, p)) if !h.is_empty() && p.chars().all(|c| c.is_ascii_digit()) && !p.is_empty() => {
                (h.to_string(), p.parse::<u16>().ok())
            }
            _ => (authority.to_string(), None),
        };
        if host.is_empty() {
            return None;
        }
        Some(ParsedUrl { scheme: scheme.to_string(), host, port })
    }
}
