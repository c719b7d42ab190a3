//! Asynchronous identity verification against third-party KYC vendors.
//!
//! A workflow submits a case, attaches the customer's evidence, starts the
//! vendor check, polls until the vendor finishes (bounded by a deadline and an
//! exponential backoff), and reconciles the vendor's review vocabulary into a
//! canonical [`VerificationResult`].

pub mod classifier;
pub mod domain;
mod error;
pub mod evidence;
pub mod gateway;
pub mod orchestrator;
pub mod poller;
pub mod result;
pub mod vendors;

#[cfg(test)]
mod tests;

pub use classifier::classify;
pub use domain::{
    Address, CaseReference, Customer, CustomerValidationError, DocumentImage, DocumentSide,
    DocumentType, Evidence, IdentityDocument,
};
pub use error::VerificationError;
pub use evidence::EvidenceAttacher;
pub use gateway::{
    CaseProgress, CaseStatus, CompletionPayload, GatewayError, RejectType, ReviewScore,
    VendorGateway,
};
pub use orchestrator::VerificationOrchestrator;
pub use poller::{
    BackoffSchedule, Cancellation, CancellationHandle, PollPolicy, VerificationPoller,
    DEFAULT_TIMEOUT_THRESHOLD,
};
pub use result::{Finality, VerificationDetails, VerificationResult, VerificationStatus};
