//! SumSub applicant payloads and their mapping onto the workflow vocabulary.

use serde::Deserialize;

use crate::workflows::verification::domain::CaseReference;
use crate::workflows::verification::gateway::{
    CaseProgress, CaseStatus, CompletionPayload, GatewayError, RejectType, ReviewScore,
};

/// Body returned when an applicant is created.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicantCreated {
    pub id: String,
}

/// `GET /resources/applicants/{id}/status` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantStatus {
    pub review_status: String,
    #[serde(default)]
    pub review_result: Option<ReviewResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResult {
    pub review_answer: String,
    #[serde(default)]
    pub reject_labels: Vec<String>,
    #[serde(default)]
    pub review_reject_type: Option<String>,
    #[serde(default)]
    pub moderation_comment: Option<String>,
}

/// Response of the "request check" call.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestCheckResponse {
    #[serde(default)]
    pub ok: u8,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    error_name: Option<String>,
}

pub fn review_score(answer: &str) -> ReviewScore {
    match answer {
        "GREEN" => ReviewScore::Clean,
        "RED" => ReviewScore::Rejected,
        "YELLOW" => ReviewScore::NeedsReview,
        "ERROR" => ReviewScore::Error,
        "IGNORED" => ReviewScore::Ignored,
        other => ReviewScore::Unrecognized(other.to_string()),
    }
}

pub fn reject_type(raw: &str) -> RejectType {
    match raw {
        "FINAL" => RejectType::Final,
        "RETRY" => RejectType::Retry,
        other => RejectType::Unrecognized(other.to_string()),
    }
}

pub fn case_status(raw: &str) -> CaseStatus {
    match raw {
        "init" => CaseStatus::Init,
        "pending" | "prechecked" => CaseStatus::Pending,
        "queued" => CaseStatus::Queued,
        "onHold" => CaseStatus::OnHold,
        other => CaseStatus::Unrecognized(other.to_string()),
    }
}

impl From<ReviewResult> for CompletionPayload {
    fn from(review: ReviewResult) -> Self {
        Self {
            score: review_score(&review.review_answer),
            reject_type: review.review_reject_type.as_deref().map(reject_type),
            reject_labels: review.reject_labels,
            moderation_comment: review.moderation_comment,
        }
    }
}

impl TryFrom<ApplicantStatus> for CaseProgress {
    type Error = GatewayError;

    fn try_from(status: ApplicantStatus) -> Result<Self, Self::Error> {
        if status.review_status != "completed" {
            return Ok(CaseProgress::InProgress(case_status(&status.review_status)));
        }

        status
            .review_result
            .map(|review| CaseProgress::Complete(review.into()))
            .ok_or_else(|| {
                GatewayError::Decode("completed applicant status without reviewResult".to_string())
            })
    }
}

pub fn parse_applicant_created(body: &[u8]) -> Result<CaseReference, GatewayError> {
    let created: ApplicantCreated = decode(body)?;
    if created.id.trim().is_empty() {
        return Err(GatewayError::Decode("applicant id is empty".to_string()));
    }
    Ok(CaseReference(created.id))
}

pub fn parse_applicant_status(body: &[u8]) -> Result<CaseProgress, GatewayError> {
    let status: ApplicantStatus = decode(body)?;
    CaseProgress::try_from(status)
}

/// `Ok(true)` when SumSub acknowledged the check request.
pub fn parse_request_check(body: &[u8]) -> Result<bool, GatewayError> {
    let response: RequestCheckResponse = decode(body)?;
    Ok(response.ok == 1)
}

/// Turn a non-2xx SumSub response into a vendor error, keeping its code verbatim.
pub fn parse_error(http_status: u16, body: &[u8]) -> GatewayError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(error) => {
            let code = error
                .error_code
                .or(error.code)
                .map(|code| code.to_string())
                .unwrap_or_else(|| http_status.to_string());
            let message = error
                .description
                .or(error.error_name)
                .unwrap_or_else(|| format!("http status {http_status}"));
            GatewayError::Vendor { code, message }
        }
        Err(_) => GatewayError::Vendor {
            code: http_status.to_string(),
            message: String::from_utf8_lossy(body).trim().to_string(),
        },
    }
}

fn decode<'a, T: Deserialize<'a>>(body: &'a [u8]) -> Result<T, GatewayError> {
    serde_json::from_slice(body).map_err(|err| GatewayError::Decode(err.to_string()))
}
