use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::time::Instant;

use crate::workflows::verification::domain::{
    Address, CaseReference, Customer, DocumentImage, DocumentType, Evidence, IdentityDocument,
};
use crate::workflows::verification::gateway::{
    CaseProgress, CaseStatus, CompletionPayload, GatewayError, RejectType, ReviewScore,
    VendorGateway,
};
use crate::workflows::verification::poller::{BackoffSchedule, PollPolicy};

pub(super) fn image(filename: &str) -> DocumentImage {
    DocumentImage {
        filename: filename.to_string(),
        content_type: "image/jpeg".to_string(),
        data: vec![0xFF, 0xD8, 0xFF, 0xE0],
    }
}

pub(super) fn passport() -> IdentityDocument {
    IdentityDocument {
        doc_type: DocumentType::Passport,
        country: "GBR".to_string(),
        number: Some("533401372".to_string()),
        issued_on: NaiveDate::from_ymd_opt(2019, 3, 14),
        valid_until: NaiveDate::from_ymd_opt(2029, 3, 14),
        front: Some(image("passport-front.jpg")),
        back: Some(image("passport-back.jpg")),
    }
}

pub(super) fn selfie() -> IdentityDocument {
    IdentityDocument {
        doc_type: DocumentType::Selfie,
        country: "GBR".to_string(),
        number: None,
        issued_on: None,
        valid_until: None,
        front: Some(image("selfie.jpg")),
        back: None,
    }
}

pub(super) fn customer() -> Customer {
    Customer {
        first_name: "Ada".to_string(),
        middle_name: Some("King".to_string()),
        last_name: "Lovelace".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1985, 12, 10),
        email: Some("ada@example.com".to_string()),
        phone: Some("+44 20 7946 0958".to_string()),
        addresses: vec![Address {
            country: "GBR".to_string(),
            state: None,
            town: "London".to_string(),
            postal_code: Some("W1J 7NT".to_string()),
            street: "Piccadilly".to_string(),
            building_number: Some("12".to_string()),
        }],
        documents: vec![passport(), selfie()],
    }
}

pub(super) fn customer_without_documents() -> Customer {
    Customer {
        documents: Vec::new(),
        ..customer()
    }
}

pub(super) fn poll_policy(timeout_secs: u64) -> PollPolicy {
    PollPolicy {
        timeout: Duration::from_secs(timeout_secs),
        backoff: BackoffSchedule::default(),
    }
}

pub(super) fn rejected(labels: &[&str], reject_type: Option<RejectType>) -> CompletionPayload {
    CompletionPayload {
        score: ReviewScore::Rejected,
        reject_type,
        reject_labels: labels.iter().map(|label| label.to_string()).collect(),
        moderation_comment: None,
    }
}

pub(super) fn transport_error() -> GatewayError {
    GatewayError::Transport("connection reset by peer".to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) enum GatewayCall {
    Submit,
    Attach(String),
    Start,
    Fetch,
}

/// Vendor double that replays scripted answers and records every call.
pub(super) struct ScriptedGateway {
    case: CaseReference,
    submit_error: Option<GatewayError>,
    failing_attachment: Option<(String, GatewayError)>,
    start: Result<bool, GatewayError>,
    statuses: Mutex<VecDeque<Result<CaseProgress, GatewayError>>>,
    calls: Mutex<Vec<GatewayCall>>,
    fetched_at: Mutex<Vec<Instant>>,
}

impl ScriptedGateway {
    pub(super) fn new() -> Self {
        Self {
            case: CaseReference("case-0001".to_string()),
            submit_error: None,
            failing_attachment: None,
            start: Ok(true),
            statuses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            fetched_at: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn with_case(mut self, case: &str) -> Self {
        self.case = CaseReference(case.to_string());
        self
    }

    pub(super) fn failing_submit(mut self, error: GatewayError) -> Self {
        self.submit_error = Some(error);
        self
    }

    pub(super) fn failing_attachment(mut self, filename: &str, error: GatewayError) -> Self {
        self.failing_attachment = Some((filename.to_string(), error));
        self
    }

    pub(super) fn start_result(mut self, start: Result<bool, GatewayError>) -> Self {
        self.start = start;
        self
    }

    /// Answers for successive status checks; once exhausted every check
    /// reports the case as pending.
    pub(super) fn with_statuses(self, statuses: Vec<Result<CaseProgress, GatewayError>>) -> Self {
        *self.statuses.lock().expect("status mutex poisoned") = statuses.into();
        self
    }

    pub(super) fn completing_with(self, payload: CompletionPayload) -> Self {
        self.with_statuses(vec![Ok(CaseProgress::Complete(payload))])
    }

    pub(super) fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().expect("call mutex poisoned").clone()
    }

    pub(super) fn count(&self, call: &GatewayCall) -> usize {
        self.calls().iter().filter(|recorded| *recorded == call).count()
    }

    pub(super) fn fetch_times(&self) -> Vec<Instant> {
        self.fetched_at.lock().expect("fetch mutex poisoned").clone()
    }

    fn record(&self, call: GatewayCall) {
        self.calls.lock().expect("call mutex poisoned").push(call);
    }
}

#[async_trait]
impl VendorGateway for ScriptedGateway {
    async fn submit_case(&self, _customer: &Customer) -> Result<CaseReference, GatewayError> {
        self.record(GatewayCall::Submit);
        match &self.submit_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.case.clone()),
        }
    }

    async fn attach_document(
        &self,
        _case: &CaseReference,
        evidence: &Evidence,
    ) -> Result<(), GatewayError> {
        self.record(GatewayCall::Attach(evidence.filename.clone()));
        match &self.failing_attachment {
            Some((filename, error)) if *filename == evidence.filename => Err(error.clone()),
            _ => Ok(()),
        }
    }

    async fn start_verification(&self, _case: &CaseReference) -> Result<bool, GatewayError> {
        self.record(GatewayCall::Start);
        self.start.clone()
    }

    async fn fetch_status(&self, _case: &CaseReference) -> Result<CaseProgress, GatewayError> {
        self.record(GatewayCall::Fetch);
        self.fetched_at
            .lock()
            .expect("fetch mutex poisoned")
            .push(Instant::now());
        self.statuses
            .lock()
            .expect("status mutex poisoned")
            .pop_front()
            .unwrap_or(Ok(CaseProgress::InProgress(CaseStatus::Pending)))
    }
}
