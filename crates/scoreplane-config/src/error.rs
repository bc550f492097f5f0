use thiserror::Error;

/// One failed assertion from [`crate::model::OrchestratorConfig::validate`].
/// Validation aggregates every failure rather than stopping at the first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("yaml parse error in {path}: {source}")]
    YamlParse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("conversion error in {path}: {message}")]
    Conversion { path: String, message: String },

    #[error("{} validation error(s): {}", .0.len(), .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Invalid(Vec<ValidationError>),

    #[error("domain error: {0}")]
    Domain(#[from] scoreplane_domain::DomainError),

    /// The loader's source (ConfigMap-like store or OCI artifact) reported
    /// the object missing; callers fall back to built-in defaults or, absent
    /// a cached config, surface `ConfigNotFound` upward.
    #[error("config not found at {0}")]
    NotFound(String),
}
