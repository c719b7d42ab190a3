use tracing::{debug, warn};

use super::domain::{CaseReference, Evidence};
use super::error::VerificationError;
use super::gateway::VendorGateway;

/// Attaches evidence to an open case, stopping at the first failure.
pub struct EvidenceAttacher<'a, G: ?Sized> {
    gateway: &'a G,
}

impl<'a, G> EvidenceAttacher<'a, G>
where
    G: VendorGateway + ?Sized,
{
    pub fn new(gateway: &'a G) -> Self {
        Self { gateway }
    }

    /// Attach every item in the order supplied. Items after a failed one are
    /// never sent.
    pub async fn attach(
        &self,
        case: &CaseReference,
        evidence: &[Evidence],
    ) -> Result<(), VerificationError> {
        for (index, item) in evidence.iter().enumerate() {
            if let Err(source) = self.gateway.attach_document(case, item).await {
                warn!(
                    %case,
                    index,
                    document = %item.describe(),
                    error = %source,
                    "evidence attachment failed; aborting verification"
                );
                return Err(VerificationError::Attachment {
                    case: case.clone(),
                    document: item.describe(),
                    source,
                });
            }

            debug!(%case, index, document = %item.describe(), mime = %item.mime, "evidence attached");
        }

        Ok(())
    }
}
