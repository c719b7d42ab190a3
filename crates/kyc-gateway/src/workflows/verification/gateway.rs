use async_trait::async_trait;

use super::domain::{CaseReference, Customer, Evidence};

/// Operations every vendor adapter provides to the verification workflow.
///
/// Implementations own their wire format and transport; the workflow only
/// sees the closed vocabulary below.
#[async_trait]
pub trait VendorGateway: Send + Sync {
    /// Open a case for the customer and return the vendor's reference to it.
    async fn submit_case(&self, customer: &Customer) -> Result<CaseReference, GatewayError>;

    async fn attach_document(
        &self,
        case: &CaseReference,
        evidence: &Evidence,
    ) -> Result<(), GatewayError>;

    /// Ask the vendor to begin the check. `Ok(false)` means the vendor refused
    /// without saying why.
    async fn start_verification(&self, case: &CaseReference) -> Result<bool, GatewayError>;

    async fn fetch_status(&self, case: &CaseReference) -> Result<CaseProgress, GatewayError>;
}

/// Failure reported by a vendor adapter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("vendor transport failed: {0}")]
    Transport(String),
    #[error("vendor rejected request ({code}): {message}")]
    Vendor { code: String, message: String },
    #[error("unable to decode vendor response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Vendor specific error code, surfaced verbatim for diagnostics.
    pub fn code(&self) -> Option<&str> {
        match self {
            GatewayError::Vendor { code, .. } => Some(code.as_str()),
            GatewayError::Transport(_) | GatewayError::Decode(_) => None,
        }
    }
}

/// Result of a single status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseProgress {
    InProgress(CaseStatus),
    Complete(CompletionPayload),
}

/// Non-terminal vendor case states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseStatus {
    Init,
    Pending,
    Queued,
    OnHold,
    Unrecognized(String),
}

impl CaseStatus {
    pub fn label(&self) -> &str {
        match self {
            CaseStatus::Init => "init",
            CaseStatus::Pending => "pending",
            CaseStatus::Queued => "queued",
            CaseStatus::OnHold => "on_hold",
            CaseStatus::Unrecognized(raw) => raw.as_str(),
        }
    }
}

/// Review data delivered by the vendor once the case is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPayload {
    pub score: ReviewScore,
    pub reject_type: Option<RejectType>,
    pub reject_labels: Vec<String>,
    pub moderation_comment: Option<String>,
}

impl CompletionPayload {
    pub fn clean() -> Self {
        Self {
            score: ReviewScore::Clean,
            reject_type: None,
            reject_labels: Vec::new(),
            moderation_comment: None,
        }
    }
}

/// Enumerated review label. Vendors do not expose a numeric scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewScore {
    Clean,
    Rejected,
    NeedsReview,
    Error,
    Ignored,
    Unrecognized(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectType {
    Final,
    Retry,
    Unrecognized(String),
}
