use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use scoreplane_domain::{ClaimOutputs, ClaimPhase, Reason, ResourceClaimSpec};

use crate::error::ProvisionError;
use crate::provisioner::{ClaimStatusReport, Provisioner};

/// Fulfills claims by pointing at a pre-populated secret, rather than
/// creating anything. Suited to resource types that are really references to
/// operator-managed credentials (e.g. a shared API key) — `provision` never
/// creates infrastructure, it only looks the claim's derived name up in the
/// table and hands back a `secretRef`.
pub struct SecretRefProvisioner {
    type_name: String,
    secrets: RwLock<HashMap<String, String>>,
}

impl SecretRefProvisioner {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self { type_name: type_name.into(), secrets: RwLock::new(HashMap::new()) }
    }

    /// Seeds (or overwrites) the secret ref a given claim's derived name
    /// resolves to. Operators populate this out of band before a claim that
    /// needs it is reconciled.
    pub fn seed(&self, derived_name: impl Into<String>, secret_ref: impl Into<String>) {
        self.secrets.write().expect("lock poisoned").insert(derived_name.into(), secret_ref.into());
    }
}

#[async_trait]
impl Provisioner for SecretRefProvisioner {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    async fn provision(&self, claim: &ResourceClaimSpec) -> Result<ClaimOutputs, ProvisionError> {
        let name = claim.derived_name();
        let secret_ref = self
            .secrets
            .read()
            .expect("lock poisoned")
            .get(&name)
            .cloned()
            .ok_or_else(|| ProvisionError::ProvisionFailed(format!("no secret seeded for claim '{name}'")))?;
        Ok(ClaimOutputs { secret_ref: Some(secret_ref), ..Default::default() })
    }

    async fn deprovision(&self, claim: &ResourceClaimSpec) -> Result<(), ProvisionError> {
        self.secrets.write().expect("lock poisoned").remove(&claim.derived_name());
        Ok(())
    }

    async fn get_status(&self, claim: &ResourceClaimSpec) -> Result<ClaimStatusReport, ProvisionError> {
        let bound = self.secrets.read().expect("lock poisoned").contains_key(&claim.derived_name());
        if bound {
            Ok(ClaimStatusReport { phase: ClaimPhase::Bound, reason: Some(Reason::Succeeded), message: None })
        } else {
            Ok(ClaimStatusReport {
                phase: ClaimPhase::Pending,
                reason: Some(Reason::BindingPending),
                message: Some("secret not yet seeded".to_string()),
            })
        }
    }
}
