//! The orchestrator loop (C11) and the reconcile stages it drives (C4-C10,
//! C12 integration): backend selection, claim/plan/exposure reconciliation,
//! status aggregation, and deletion.

pub mod claims;
pub mod deletion;
pub mod error;
pub mod exposure_reconciler;
pub mod plan_reconciler;
pub mod process_config;
pub mod provisioning;
pub mod reconcile;
pub mod select;
pub mod status;

pub use error::{ReconcileError, SelectError};
pub use process_config::ProcessConfig;
pub use reconcile::{reconcile_one, OrchestratorLoop, ReconcileContext, WorkloadKey};
pub use select::{select_backend, SelectedBackend};
pub use status::{derive_status, normalize_runtime_reason, write_status_with_retry, StatusInputs};
