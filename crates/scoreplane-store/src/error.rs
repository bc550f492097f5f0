use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workload not found: {0}")]
    WorkloadNotFound(String),

    #[error("resource claim not found: {workload_ref}/{key}")]
    ClaimNotFound { workload_ref: String, key: String },

    /// Optimistic-concurrency conflict on a status write (§4.7, §5).
    #[error("resource version conflict on {workload_ref}: expected {expected}, store has {actual}")]
    Conflict { workload_ref: String, expected: u64, actual: u64 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}
