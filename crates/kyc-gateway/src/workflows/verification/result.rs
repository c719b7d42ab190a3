use serde::{Deserialize, Serialize};

use super::domain::CaseReference;

/// Canonical approval state reported to callers regardless of vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    Approved,
    Denied,
    Unclear,
    Error,
}

impl VerificationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            VerificationStatus::Approved => "approved",
            VerificationStatus::Denied => "denied",
            VerificationStatus::Unclear => "unclear",
            VerificationStatus::Error => "error",
        }
    }
}

/// Whether a negative outcome is conclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finality {
    Final,
    NonFinal,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDetails {
    pub finality: Finality,
    pub reasons: Vec<String>,
}

/// Vendor-agnostic verification outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub status: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<VerificationDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_reference: Option<CaseReference>,
}

impl VerificationResult {
    pub fn approved() -> Self {
        Self {
            status: VerificationStatus::Approved,
            details: None,
            error_code: None,
            case_reference: None,
        }
    }

    pub fn error(error_code: Option<String>) -> Self {
        Self {
            status: VerificationStatus::Error,
            details: None,
            error_code,
            case_reference: None,
        }
    }

    pub fn with_case(mut self, case: CaseReference) -> Self {
        self.case_reference = Some(case);
        self
    }

    /// Unclear outcomes are not final; the caller must keep the case reference
    /// and check back out of band.
    pub fn requires_followup(&self) -> bool {
        self.status == VerificationStatus::Unclear
    }

    pub fn summary(&self) -> String {
        match &self.details {
            Some(details) if !details.reasons.is_empty() => {
                format!("{}: {}", self.status.label(), details.reasons.join(", "))
            }
            _ => self.status.label().to_string(),
        }
    }
}
