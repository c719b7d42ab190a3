use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument, Span};

use super::classifier::classify;
use super::domain::{CaseReference, Customer, Evidence};
use super::error::VerificationError;
use super::evidence::EvidenceAttacher;
use super::gateway::VendorGateway;
use super::poller::{Cancellation, PollPolicy, VerificationPoller};
use super::result::{VerificationResult, VerificationStatus};
use crate::config::VerificationConfig;

/// Runs the submit, attach, start, poll, classify sequence against one vendor.
pub struct VerificationOrchestrator<G: ?Sized> {
    gateway: Arc<G>,
    poller: VerificationPoller,
}

impl<G> VerificationOrchestrator<G>
where
    G: VendorGateway + ?Sized,
{
    pub fn new(gateway: Arc<G>, policy: PollPolicy) -> Self {
        Self {
            gateway,
            poller: VerificationPoller::new(policy),
        }
    }

    pub fn from_config(gateway: Arc<G>, config: &VerificationConfig) -> Self {
        Self::new(gateway, PollPolicy::from(config))
    }

    pub fn policy(&self) -> &PollPolicy {
        self.poller.policy()
    }

    pub async fn verify(&self, customer: &Customer) -> Result<VerificationResult, VerificationError> {
        self.verify_with_cancellation(customer, Cancellation::never())
            .await
    }

    /// Verify a customer, giving up early if `cancellation` fires while polling.
    ///
    /// Denied and unclear outcomes are successful returns; only failures and
    /// unrecognized vendor outcomes produce an error.
    pub async fn verify_with_cancellation(
        &self,
        customer: &Customer,
        mut cancellation: Cancellation,
    ) -> Result<VerificationResult, VerificationError> {
        customer.validate()?;

        let evidence = customer.evidence();
        if evidence.is_empty() {
            return Err(VerificationError::MissingEvidence);
        }

        let case = self
            .gateway
            .submit_case(customer)
            .await
            .map_err(VerificationError::Submission)?;
        info!(%case, documents = evidence.len(), "verification case submitted");

        let span = case_span(&case);
        self.complete_case(case, &evidence, &mut cancellation)
            .instrument(span)
            .await
    }

    async fn complete_case(
        &self,
        case: CaseReference,
        evidence: &[Evidence],
        cancellation: &mut Cancellation,
    ) -> Result<VerificationResult, VerificationError> {
        EvidenceAttacher::new(self.gateway.as_ref())
            .attach(&case, evidence)
            .await?;

        match self.gateway.start_verification(&case).await {
            Ok(true) => info!(%case, "verification started"),
            Ok(false) => return Err(VerificationError::StartRejected { case }),
            Err(source) => return Err(VerificationError::Start { case, source }),
        }

        let payload = self
            .poller
            .poll(self.gateway.as_ref(), &case, cancellation)
            .await?;

        let result = classify(&payload).with_case(case.clone());
        match result.status {
            VerificationStatus::Error => {
                warn!(%case, outcome = %result.summary(), "vendor returned unrecognized outcome");
                Err(VerificationError::UnrecognizedOutcome { case, result })
            }
            VerificationStatus::Approved
            | VerificationStatus::Denied
            | VerificationStatus::Unclear => {
                info!(%case, status = result.status.label(), "verification classified");
                Ok(result)
            }
        }
    }
}

/// Span covering every step after the vendor has issued a case.
fn case_span(case: &CaseReference) -> Span {
    info_span!("verification_case", case = %case)
}
