use async_trait::async_trait;
use scoreplane_domain::{ClaimOutputs, ClaimPhase, Reason, ResourceClaimSpec};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::ProvisionError;
use crate::provisioner::{ClaimStatusReport, Provisioner};

/// Synthesizes deterministic, fake outputs for a resource type without
/// touching any real infrastructure. Useful for local development, tests, and
/// any resource type that has no external strategy configured.
///
/// Output values are derived from the claim's derived name so the same claim
/// always gets the same stub values across repeated provisions (no hidden
/// per-call randomness to chase down in a test failure).
#[derive(Debug, Clone)]
pub struct StubProvisioner {
    type_name: String,
}

impl StubProvisioner {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into() }
    }

    fn fingerprint(claim: &ResourceClaimSpec) -> String {
        let mut hasher = Sha256::new();
        hasher.update(claim.derived_name().as_bytes());
        let digest = hasher.finalize();
        hex_prefix(&digest, 12)
    }

    fn port_from_fingerprint(fp: &str) -> u16 {
        let n = u32::from_str_radix(&fp[..8], 16).unwrap_or(0);
        10000 + (n % 10000) as u16
    }
}

fn hex_prefix(bytes: &[u8], len: usize) -> String {
    bytes.iter().take(len).map(|b| format!("{b:02x}")).collect()
}

#[async_trait]
impl Provisioner for StubProvisioner {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    async fn provision(&self, claim: &ResourceClaimSpec) -> Result<ClaimOutputs, ProvisionError> {
        debug!(key = %claim.key, type_ = %self.type_name, "StubProvisioner: provision");
        let fp = Self::fingerprint(claim);
        let host = format!("{}-{}.stub.internal", self.type_name, claim.key);
        let port = Self::port_from_fingerprint(&fp);
        let username = "app".to_string();
        let password = format!("stub-{fp}");
        let uri = format!("{}://{username}:{password}@{host}:{port}/{}", self.type_name, claim.key);

        let mut outputs = ClaimOutputs { uri: Some(uri), ..Default::default() };
        outputs.extra.insert("host".to_string(), host);
        outputs.extra.insert("port".to_string(), port.to_string());
        outputs.extra.insert("username".to_string(), username);
        outputs.extra.insert("password".to_string(), password);
        Ok(outputs)
    }

    async fn deprovision(&self, claim: &ResourceClaimSpec) -> Result<(), ProvisionError> {
        debug!(key = %claim.key, type_ = %self.type_name, "StubProvisioner: deprovision");
        Ok(())
    }

    async fn get_status(&self, _claim: &ResourceClaimSpec) -> Result<ClaimStatusReport, ProvisionError> {
        Ok(ClaimStatusReport { phase: ClaimPhase::Bound, reason: Some(Reason::Succeeded), message: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scoreplane_domain::{DeprovisionPolicy, WorkloadRef};

    fn claim(key: &str) -> ResourceClaimSpec {
        ResourceClaimSpec {
            workload_ref: WorkloadRef::new("default", "web"),
            key: key.to_string(),
            type_: "postgres".to_string(),
            class: None,
            id: None,
            params: serde_json::Value::Null,
            deprovision_policy: DeprovisionPolicy::default(),
        }
    }

    #[tokio::test]
    async fn provision_is_deterministic_for_the_same_claim() {
        let p = StubProvisioner::new("postgres");
        let a = p.provision(&claim("db")).await.unwrap();
        let b = p.provision(&claim("db")).await.unwrap();
        assert_eq!(a.uri, b.uri);
    }

    #[tokio::test]
    async fn different_keys_get_different_outputs() {
        let p = StubProvisioner::new("postgres");
        let a = p.provision(&claim("db")).await.unwrap();
        let b = p.provision(&claim("cache")).await.unwrap();
        assert_ne!(a.uri, b.uri);
    }

    #[tokio::test]
    async fn get_status_reports_bound_succeeded() {
        let p = StubProvisioner::new("postgres");
        let status = p.get_status(&claim("db")).await.unwrap();
        assert_eq!(status.phase, ClaimPhase::Bound);
    }
}
