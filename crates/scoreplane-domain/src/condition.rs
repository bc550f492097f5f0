use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The four standard condition types carried on `Workload.status.conditions`.
/// Runtime-specific types (`Available`, `Progressing`, `Healthy`, …) are
/// normalized onto this set before they ever reach a Workload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionType {
    InputsValid,
    ClaimsReady,
    RuntimeReady,
    Ready,
}

impl std::fmt::Display for ConditionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConditionType::InputsValid => "InputsValid",
            ConditionType::ClaimsReady => "ClaimsReady",
            ConditionType::RuntimeReady => "RuntimeReady",
            ConditionType::Ready => "Ready",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl From<bool> for ConditionStatus {
    fn from(b: bool) -> Self {
        if b { ConditionStatus::True } else { ConditionStatus::False }
    }
}

/// The abstract, user-facing reason taxonomy. Runtime-reported reasons that
/// do not map onto this set are filtered out rather than leaked verbatim —
/// see `normalize_runtime_reason` in scoreplane-orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Reason {
    Succeeded,
    SpecInvalid,
    PolicyViolation,
    BindingPending,
    BindingFailed,
    ProjectionError,
    RuntimeSelecting,
    RuntimeProvisioning,
    RuntimeDegraded,
    QuotaExceeded,
    PermissionDenied,
    NetworkUnavailable,
    /// No cached configuration is available and the loader failed (§7, S4) —
    /// `InputsValid` goes `Unknown` rather than `False`: the Workload itself
    /// may be perfectly valid, the orchestrator just can't tell yet.
    ConfigNotFound,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: ConditionType,
    pub status: ConditionStatus,
    pub reason: Option<Reason>,
    pub message: Option<String>,
    pub observed_generation: u64,
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    pub fn new(
        type_: ConditionType,
        status: ConditionStatus,
        reason: Option<Reason>,
        message: Option<String>,
        observed_generation: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Condition { type_, status, reason, message, observed_generation, last_transition_time: now }
    }

    pub fn is_true(&self) -> bool {
        matches!(self.status, ConditionStatus::True)
    }
}
