use async_trait::async_trait;
use chrono::NaiveDate;
use kyc_gateway::config::SharedConfig;
use kyc_gateway::workflows::verification::vendors::sumsub;
use kyc_gateway::workflows::verification::{
    CaseProgress, CaseReference, Customer, Evidence, GatewayError, VendorGateway,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared handles for the verification endpoints.
#[derive(Clone)]
pub(crate) struct VerificationState {
    pub(crate) gateway: Arc<dyn VendorGateway>,
    pub(crate) config: SharedConfig,
}

static CASE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

const DEFAULT_OPEN_CASE_LIMIT: usize = 1_024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SandboxReview {
    Green,
    Yellow,
    RedFinal,
    RedRetry,
}

impl SandboxReview {
    /// Outcome is steered by the first document number so demos can pick it.
    fn for_customer(customer: &Customer) -> Self {
        let number = customer
            .documents
            .iter()
            .find_map(|document| document.number.as_deref())
            .unwrap_or_default()
            .to_ascii_uppercase();

        if number.starts_with("DENY") {
            Self::RedFinal
        } else if number.starts_with("RETRY") {
            Self::RedRetry
        } else if number.starts_with("REVIEW") {
            Self::Yellow
        } else {
            Self::Green
        }
    }

    fn review_result(self) -> serde_json::Value {
        match self {
            Self::Green => json!({ "reviewAnswer": "GREEN" }),
            Self::Yellow => json!({
                "reviewAnswer": "YELLOW",
                "rejectLabels": ["ADDITIONAL_DOCUMENT_REQUIRED"],
            }),
            Self::RedFinal => json!({
                "reviewAnswer": "RED",
                "reviewRejectType": "FINAL",
                "rejectLabels": ["ID_INVALID"],
            }),
            Self::RedRetry => json!({
                "reviewAnswer": "RED",
                "reviewRejectType": "RETRY",
                "rejectLabels": ["UNSATISFACTORY_PHOTOS"],
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct SandboxCase {
    sequence: u64,
    review: SandboxReview,
    evidence: Vec<String>,
    started: bool,
    polls: u32,
}

/// In-memory vendor used by the demo CLI and local service runs. Responses
/// are rendered as SumSub payloads and decoded through the same mapping a
/// live adapter would use.
///
/// A case is forgotten once its completed review has been handed out. Cases
/// abandoned before completion are evicted oldest first beyond `open_limit`.
#[derive(Debug)]
pub(crate) struct SandboxGateway {
    polls_until_complete: u32,
    open_limit: usize,
    cases: Mutex<HashMap<CaseReference, SandboxCase>>,
}

impl SandboxGateway {
    pub(crate) fn new(polls_until_complete: u32) -> Self {
        Self::with_open_limit(polls_until_complete, DEFAULT_OPEN_CASE_LIMIT)
    }

    pub(crate) fn with_open_limit(polls_until_complete: u32, open_limit: usize) -> Self {
        Self {
            polls_until_complete: polls_until_complete.max(1),
            open_limit: open_limit.max(1),
            cases: Mutex::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    fn open_cases(&self) -> usize {
        self.cases().len()
    }

    #[cfg(test)]
    fn attached(&self, case: &CaseReference) -> Vec<String> {
        self.cases()
            .get(case)
            .map(|record| record.evidence.clone())
            .unwrap_or_default()
    }

    fn cases(&self) -> MutexGuard<'_, HashMap<CaseReference, SandboxCase>> {
        self.cases.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_case<T>(
        &self,
        case: &CaseReference,
        apply: impl FnOnce(&mut SandboxCase) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        match self.cases().get_mut(case) {
            Some(record) => apply(record),
            None => Err(sumsub::parse_error(
                404,
                json!({ "description": format!("Applicant {case} not found"), "code": 404 })
                    .to_string()
                    .as_bytes(),
            )),
        }
    }
}

#[async_trait]
impl VendorGateway for SandboxGateway {
    async fn submit_case(&self, customer: &Customer) -> Result<CaseReference, GatewayError> {
        let sequence = CASE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        let created = json!({ "id": format!("sandbox-{sequence:06}") }).to_string();
        let case = sumsub::parse_applicant_created(created.as_bytes())?;

        let mut cases = self.cases();
        while cases.len() >= self.open_limit {
            let oldest = cases
                .iter()
                .min_by_key(|(_, record)| record.sequence)
                .map(|(case, _)| case.clone());
            match oldest {
                Some(oldest) => {
                    debug!(case = %oldest, "evicting abandoned sandbox case");
                    cases.remove(&oldest);
                }
                None => break,
            }
        }
        cases.insert(
            case.clone(),
            SandboxCase {
                sequence,
                review: SandboxReview::for_customer(customer),
                evidence: Vec::new(),
                started: false,
                polls: 0,
            },
        );
        Ok(case)
    }

    async fn attach_document(
        &self,
        case: &CaseReference,
        evidence: &Evidence,
    ) -> Result<(), GatewayError> {
        let accepted = evidence.mime.type_() == mime::IMAGE
            || evidence.mime.essence_str() == mime::APPLICATION_PDF.essence_str();
        if !accepted {
            return Err(GatewayError::Vendor {
                code: "1004".to_string(),
                message: format!("unsupported document format {}", evidence.mime),
            });
        }

        self.with_case(case, |record| {
            record.evidence.push(evidence.filename.clone());
            Ok(())
        })
    }

    async fn start_verification(&self, case: &CaseReference) -> Result<bool, GatewayError> {
        self.with_case(case, |record| {
            record.started = !record.evidence.is_empty();
            let body = json!({ "ok": u8::from(record.started) }).to_string();
            sumsub::parse_request_check(body.as_bytes())
        })
    }

    async fn fetch_status(&self, case: &CaseReference) -> Result<CaseProgress, GatewayError> {
        let polls_until_complete = self.polls_until_complete;
        let progress = self.with_case(case, |record| {
            let body = if !record.started {
                json!({ "reviewStatus": "init" })
            } else {
                record.polls += 1;
                if record.polls < polls_until_complete {
                    json!({ "reviewStatus": "pending" })
                } else {
                    json!({
                        "reviewStatus": "completed",
                        "reviewResult": record.review.review_result(),
                    })
                }
            };
            sumsub::parse_applicant_status(body.to_string().as_bytes())
        })?;

        if matches!(progress, CaseProgress::Complete(_)) {
            self.cases().remove(case);
        }
        Ok(progress)
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kyc_gateway::workflows::verification::{DocumentImage, DocumentType, IdentityDocument};

    fn sandbox_customer(number: &str) -> Customer {
        Customer {
            first_name: "Alan".to_string(),
            middle_name: None,
            last_name: "Turing".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 6, 23),
            email: None,
            phone: None,
            addresses: Vec::new(),
            documents: vec![IdentityDocument {
                doc_type: DocumentType::IdCard,
                country: "GBR".to_string(),
                number: Some(number.to_string()),
                issued_on: None,
                valid_until: None,
                front: Some(DocumentImage {
                    filename: "id-front.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    data: vec![1, 2, 3],
                }),
                back: None,
            }],
        }
    }

    #[tokio::test]
    async fn sandbox_completes_after_configured_polls() {
        let gateway = SandboxGateway::new(2);
        let customer = sandbox_customer("DENY-001");
        let case = gateway.submit_case(&customer).await.expect("case opens");

        assert_eq!(
            gateway.fetch_status(&case).await.expect("status"),
            CaseProgress::InProgress(kyc_gateway::workflows::verification::CaseStatus::Init)
        );

        for evidence in customer.evidence() {
            gateway
                .attach_document(&case, &evidence)
                .await
                .expect("attach");
        }
        assert!(gateway.start_verification(&case).await.expect("start"));
        assert_eq!(gateway.attached(&case), vec!["id-front.jpg".to_string()]);

        let first = gateway.fetch_status(&case).await.expect("status");
        assert!(matches!(first, CaseProgress::InProgress(_)));
        match gateway.fetch_status(&case).await.expect("status") {
            CaseProgress::Complete(payload) => {
                assert_eq!(payload.reject_labels, vec!["ID_INVALID".to_string()]);
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert_eq!(gateway.open_cases(), 0);
        let err = gateway
            .fetch_status(&case)
            .await
            .expect_err("completed case is forgotten");
        assert_eq!(err.code(), Some("404"));
    }

    #[tokio::test]
    async fn repeated_verifications_do_not_accumulate_cases() {
        let gateway = SandboxGateway::new(1);
        let customer = sandbox_customer("ANY-1");

        for _ in 0..50 {
            let case = gateway.submit_case(&customer).await.expect("case opens");
            for evidence in customer.evidence() {
                gateway
                    .attach_document(&case, &evidence)
                    .await
                    .expect("attach");
            }
            assert!(gateway.start_verification(&case).await.expect("start"));
            let progress = gateway.fetch_status(&case).await.expect("status");
            assert!(matches!(progress, CaseProgress::Complete(_)));
        }

        assert_eq!(gateway.open_cases(), 0);
    }

    #[tokio::test]
    async fn abandoned_cases_are_evicted_oldest_first() {
        let gateway = SandboxGateway::with_open_limit(1, 3);
        let customer = sandbox_customer("ANY-2");

        let mut opened = Vec::new();
        for _ in 0..5 {
            opened.push(gateway.submit_case(&customer).await.expect("case opens"));
        }

        assert_eq!(gateway.open_cases(), 3);
        for evicted in &opened[..2] {
            let err = gateway
                .start_verification(evicted)
                .await
                .expect_err("evicted case is gone");
            assert_eq!(err.code(), Some("404"));
        }
        for kept in &opened[2..] {
            assert!(!gateway.start_verification(kept).await.expect("still open"));
        }
    }

    #[tokio::test]
    async fn sandbox_rejects_unknown_cases_and_formats() {
        let gateway = SandboxGateway::new(1);
        let unknown = CaseReference("sandbox-missing".to_string());

        let err = gateway
            .start_verification(&unknown)
            .await
            .expect_err("unknown case");
        assert_eq!(err.code(), Some("404"));

        let customer = sandbox_customer("X-1");
        let case = gateway.submit_case(&customer).await.expect("case opens");
        let mut evidence = customer.evidence().remove(0);
        evidence.mime = mime::TEXT_PLAIN;
        let err = gateway
            .attach_document(&case, &evidence)
            .await
            .expect_err("text is not evidence");
        assert_eq!(err.code(), Some("1004"));
    }
}
