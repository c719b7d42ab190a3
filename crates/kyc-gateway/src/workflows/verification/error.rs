use std::time::Duration;

use super::domain::{CaseReference, CustomerValidationError};
use super::gateway::GatewayError;
use super::result::VerificationResult;

/// Terminal failure of a verification workflow, tagged with the step that failed.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error(transparent)]
    InvalidCustomer(#[from] CustomerValidationError),
    #[error("missing evidence: customer has no usable documents to submit")]
    MissingEvidence,
    #[error("case submission failed: {0}")]
    Submission(#[source] GatewayError),
    #[error("failed to attach document {document} to case {case}: {source}")]
    Attachment {
        case: CaseReference,
        document: String,
        source: GatewayError,
    },
    #[error("failed to start verification for case {case}: {source}")]
    Start {
        case: CaseReference,
        source: GatewayError,
    },
    #[error("vendor could not start verification for case {case} for unknown reason")]
    StartRejected { case: CaseReference },
    #[error("request timed out after {attempts} status checks ({elapsed:?}) for case {case}")]
    TimedOut {
        case: CaseReference,
        attempts: u32,
        elapsed: Duration,
        last_error: Option<GatewayError>,
    },
    #[error("verification of case {case} was cancelled")]
    Cancelled { case: CaseReference },
    #[error("unrecognized vendor review outcome for case {case}: {}", .result.summary())]
    UnrecognizedOutcome {
        case: CaseReference,
        result: VerificationResult,
    },
}

impl VerificationError {
    /// Errors caused by the caller's input rather than the vendor.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            VerificationError::InvalidCustomer(_) | VerificationError::MissingEvidence
        )
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, VerificationError::TimedOut { .. })
    }

    /// Case opened before the failure, if any. Callers keep it for later checks.
    pub fn case(&self) -> Option<&CaseReference> {
        match self {
            VerificationError::InvalidCustomer(_)
            | VerificationError::MissingEvidence
            | VerificationError::Submission(_) => None,
            VerificationError::Attachment { case, .. }
            | VerificationError::Start { case, .. }
            | VerificationError::StartRejected { case }
            | VerificationError::TimedOut { case, .. }
            | VerificationError::Cancelled { case }
            | VerificationError::UnrecognizedOutcome { case, .. } => Some(case),
        }
    }

    pub fn vendor_code(&self) -> Option<&str> {
        match self {
            VerificationError::Submission(source)
            | VerificationError::Attachment { source, .. }
            | VerificationError::Start { source, .. } => source.code(),
            _ => None,
        }
    }

    /// Canonical `Error` result describing this failure.
    pub fn result(&self) -> VerificationResult {
        if let VerificationError::UnrecognizedOutcome { result, .. } = self {
            return result.clone();
        }

        let mut result = VerificationResult::error(self.vendor_code().map(str::to_string));
        result.case_reference = self.case().cloned();
        result
    }
}
