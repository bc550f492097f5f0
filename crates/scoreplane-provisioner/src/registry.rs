use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ProvisionError;
use crate::provisioner::Provisioner;

/// Dispatches a claim's `type` string to the [`Provisioner`] registered for
/// it. Mirrors the cloud-keyed driver registry this crate's sibling crates
/// use for runtime backend selection, but keyed by resource type instead of
/// cloud target.
#[derive(Default)]
pub struct ProvisionerRegistry {
    by_type: HashMap<String, Arc<dyn Provisioner>>,
}

impl ProvisionerRegistry {
    pub fn new() -> Self {
        Self { by_type: HashMap::new() }
    }

    /// Register a provisioner for a resource type. Returns `&mut self` for chaining.
    pub fn register(&mut self, type_name: impl Into<String>, provisioner: Arc<dyn Provisioner>) -> &mut Self {
        self.by_type.insert(type_name.into(), provisioner);
        self
    }

    pub fn for_type(&self, type_name: &str) -> Result<Arc<dyn Provisioner>, ProvisionError> {
        self.by_type
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProvisionError::NotConfigured(type_name.to_string()))
    }

    pub fn registered_types(&self) -> Vec<String> {
        self.by_type.keys().cloned().collect()
    }
}
