use super::gateway::{CompletionPayload, RejectType, ReviewScore};
use super::result::{Finality, VerificationDetails, VerificationResult, VerificationStatus};

const VENDOR_ERROR_LABEL: &str = "ERROR";
const VENDOR_IGNORED_LABEL: &str = "IGNORED";

/// Reconcile a vendor review into the canonical result. Pure: the same
/// payload always yields the same result.
pub fn classify(payload: &CompletionPayload) -> VerificationResult {
    match &payload.score {
        ReviewScore::Clean => VerificationResult::approved(),
        ReviewScore::Rejected => VerificationResult {
            status: VerificationStatus::Denied,
            details: Some(rejection_details(payload)),
            error_code: None,
            case_reference: None,
        },
        ReviewScore::NeedsReview => VerificationResult {
            status: VerificationStatus::Unclear,
            details: reported_details(payload),
            error_code: None,
            case_reference: None,
        },
        ReviewScore::Error => vendor_error(payload, VENDOR_ERROR_LABEL),
        ReviewScore::Ignored => vendor_error(payload, VENDOR_IGNORED_LABEL),
        ReviewScore::Unrecognized(label) => vendor_error(payload, label),
    }
}

/// Map the vendor's reject type onto canonical finality.
pub fn finality(reject_type: Option<&RejectType>) -> Finality {
    match reject_type {
        Some(RejectType::Final) => Finality::Final,
        Some(RejectType::Retry) => Finality::NonFinal,
        Some(RejectType::Unrecognized(_)) | None => Finality::Unknown,
    }
}

fn vendor_error(payload: &CompletionPayload, label: &str) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Error,
        details: Some(rejection_details(payload)),
        error_code: Some(label.to_string()),
        case_reference: None,
    }
}

// Denials and vendor errors always carry details. Without reject labels
// finality stays unknown.
fn rejection_details(payload: &CompletionPayload) -> VerificationDetails {
    reported_details(payload).unwrap_or(VerificationDetails {
        finality: Finality::Unknown,
        reasons: Vec::new(),
    })
}

fn reported_details(payload: &CompletionPayload) -> Option<VerificationDetails> {
    if payload.reject_labels.is_empty() {
        return None;
    }

    Some(VerificationDetails {
        finality: finality(payload.reject_type.as_ref()),
        reasons: payload.reject_labels.clone(),
    })
}
