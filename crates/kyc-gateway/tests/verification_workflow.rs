use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use kyc_gateway::workflows::verification::vendors::sumsub;
use kyc_gateway::workflows::verification::{
    classify, BackoffSchedule, CaseProgress, CaseReference, Customer, DocumentImage, DocumentType,
    Evidence, Finality, GatewayError, IdentityDocument, PollPolicy, VendorGateway,
    VerificationOrchestrator, VerificationStatus,
};

/// Vendor fake that answers with raw SumSub response bodies.
struct SumSubReplay {
    applicant: &'static [u8],
    check: &'static [u8],
    statuses: Mutex<VecDeque<(u16, &'static str)>>,
    attached: Mutex<Vec<String>>,
}

impl SumSubReplay {
    fn new(statuses: Vec<(u16, &'static str)>) -> Self {
        Self {
            applicant: br#"{"id": "63e5bd0a1f1c5e0d3b6f4a21", "createdAt": "2024-05-02 10:11:12"}"#,
            check: br#"{"ok": 1}"#,
            statuses: Mutex::new(statuses.into()),
            attached: Mutex::new(Vec::new()),
        }
    }

    fn attached(&self) -> Vec<String> {
        self.attached.lock().expect("attach mutex").clone()
    }
}

#[async_trait]
impl VendorGateway for SumSubReplay {
    async fn submit_case(&self, _customer: &Customer) -> Result<CaseReference, GatewayError> {
        sumsub::parse_applicant_created(self.applicant)
    }

    async fn attach_document(
        &self,
        _case: &CaseReference,
        evidence: &Evidence,
    ) -> Result<(), GatewayError> {
        self.attached
            .lock()
            .expect("attach mutex")
            .push(evidence.filename.clone());
        Ok(())
    }

    async fn start_verification(&self, _case: &CaseReference) -> Result<bool, GatewayError> {
        sumsub::parse_request_check(self.check)
    }

    async fn fetch_status(&self, _case: &CaseReference) -> Result<CaseProgress, GatewayError> {
        let next = self.statuses.lock().expect("status mutex").pop_front();
        match next {
            Some((200, body)) => sumsub::parse_applicant_status(body.as_bytes()),
            Some((status, body)) => Err(sumsub::parse_error(status, body.as_bytes())),
            None => sumsub::parse_applicant_status(br#"{"reviewStatus": "pending"}"#),
        }
    }
}

fn customer() -> Customer {
    Customer {
        first_name: "Grace".to_string(),
        middle_name: None,
        last_name: "Hopper".to_string(),
        date_of_birth: None,
        email: None,
        phone: None,
        addresses: Vec::new(),
        documents: vec![IdentityDocument {
            doc_type: DocumentType::DrivingLicense,
            country: "USA".to_string(),
            number: Some("D1234567".to_string()),
            issued_on: None,
            valid_until: None,
            front: Some(DocumentImage {
                filename: "license-front.png".to_string(),
                content_type: "image/png".to_string(),
                data: vec![0x89, 0x50, 0x4E, 0x47],
            }),
            back: Some(DocumentImage {
                filename: "license-back.png".to_string(),
                content_type: "image/png".to_string(),
                data: vec![0x89, 0x50, 0x4E, 0x47],
            }),
        }],
    }
}

fn policy(timeout_secs: u64) -> PollPolicy {
    PollPolicy {
        timeout: Duration::from_secs(timeout_secs),
        backoff: BackoffSchedule::new(2, 1, Duration::from_secs(1)),
    }
}

#[tokio::test(start_paused = true)]
async fn sumsub_green_review_is_approved() {
    let vendor = Arc::new(SumSubReplay::new(vec![
        (200, r#"{"reviewStatus": "init"}"#),
        (503, r#"{"description": "Service unavailable", "code": 503}"#),
        (
            200,
            r#"{"reviewStatus": "completed", "reviewResult": {"reviewAnswer": "GREEN"}}"#,
        ),
    ]));
    let orchestrator = VerificationOrchestrator::new(vendor.clone(), policy(300));

    let result = orchestrator.verify(&customer()).await.expect("approved");

    assert_eq!(result.status, VerificationStatus::Approved);
    assert!(result.details.is_none());
    assert_eq!(
        result.case_reference.map(|case| case.0),
        Some("63e5bd0a1f1c5e0d3b6f4a21".to_string())
    );
    assert_eq!(
        vendor.attached(),
        vec!["license-front.png".to_string(), "license-back.png".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn sumsub_red_retry_review_is_non_final_denial() {
    let vendor = Arc::new(SumSubReplay::new(vec![(
        200,
        r#"{
            "reviewStatus": "completed",
            "reviewResult": {
                "reviewAnswer": "RED",
                "reviewRejectType": "RETRY",
                "rejectLabels": ["UNSATISFACTORY_PHOTOS", "SCREENSHOTS"]
            }
        }"#,
    )]));
    let orchestrator = VerificationOrchestrator::new(vendor, policy(300));

    let result = orchestrator.verify(&customer()).await.expect("denied");

    assert_eq!(result.status, VerificationStatus::Denied);
    let details = result.details.expect("denial details");
    assert_eq!(details.finality, Finality::NonFinal);
    assert_eq!(
        details.reasons,
        vec!["UNSATISFACTORY_PHOTOS".to_string(), "SCREENSHOTS".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn completed_status_without_review_is_retried_until_timeout() {
    let vendor = Arc::new(SumSubReplay::new(
        (0..10)
            .map(|_| (200, r#"{"reviewStatus": "completed"}"#))
            .collect(),
    ));
    let orchestrator = VerificationOrchestrator::new(vendor, policy(40));

    let err = orchestrator
        .verify(&customer())
        .await
        .expect_err("malformed completions never classify");

    assert!(err.is_timeout());
    let result = err.result();
    assert_eq!(result.status, VerificationStatus::Error);
    assert!(result.case_reference.is_some());
}

#[test]
fn canonical_result_serializes_in_snake_case() {
    let body = br#"{
        "reviewStatus": "completed",
        "reviewResult": {"reviewAnswer": "RED", "reviewRejectType": "FINAL", "rejectLabels": ["ID_INVALID"]}
    }"#;
    let payload = match sumsub::parse_applicant_status(body).expect("status parses") {
        CaseProgress::Complete(payload) => payload,
        CaseProgress::InProgress(status) => panic!("unexpected status {status:?}"),
    };

    let result = classify(&payload);
    let json = serde_json::to_value(&result).expect("serializes");
    assert_eq!(json["status"], "denied");
    assert_eq!(json["details"]["finality"], "final");
    assert_eq!(json["details"]["reasons"][0], "ID_INVALID");
    assert!(json.get("error_code").is_none());
    assert!(json.get("case_reference").is_none());
}
