//! Acceptance certificates: the final milestone sign-off artifact

use crate::{CertificateId, WorkItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Certificate lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateStatus {
    /// Generated, awaiting dual-party signatures
    #[default]
    Draft,
    /// Both parties signed; billing may proceed
    ReadyToBill,
}

/// A milestone acceptance certificate
///
/// Generation is gated: a certificate can only be created once every
/// deliverable under the milestone is Delivered. It starts as a Draft
/// with zero signatures and becomes ReadyToBill when its signature
/// record completes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AcceptanceCertificate {
    /// Unique identifier
    pub id: CertificateId,
    /// The milestone being accepted
    pub milestone_id: WorkItemId,
    /// Current lifecycle status
    pub status: CertificateStatus,
    /// When the certificate was generated
    pub generated_at: DateTime<Utc>,
    /// When both parties signed, if they have
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_at: Option<DateTime<Utc>>,
}

impl AcceptanceCertificate {
    /// Generate a draft certificate for a milestone
    pub fn draft(milestone_id: WorkItemId) -> Self {
        Self {
            id: CertificateId::generate(),
            milestone_id,
            status: CertificateStatus::Draft,
            generated_at: Utc::now(),
            accepted_at: None,
        }
    }

    /// Mark the certificate ready to bill (dual sign-off complete)
    pub fn mark_ready_to_bill(&mut self) {
        self.status = CertificateStatus::ReadyToBill;
        self.accepted_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draft_then_ready() {
        let mut cert = AcceptanceCertificate::draft(WorkItemId::new("m-1"));
        assert_eq!(cert.status, CertificateStatus::Draft);
        assert!(cert.accepted_at.is_none());

        cert.mark_ready_to_bill();
        assert_eq!(cert.status, CertificateStatus::ReadyToBill);
        assert!(cert.accepted_at.is_some());
    }
}
