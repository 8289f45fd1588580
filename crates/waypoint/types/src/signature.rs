//! Signature records: the two-party approval ledger
//!
//! Every dual sign-off in Waypoint — deliverable review, baseline
//! commitment, acceptance certificate, variation — is backed by one
//! SignatureRecord with two named party slots. A record is complete
//! iff both slots are signed, and completion is monotonic: a complete
//! record is immutable and can only be superseded by a new record.

use crate::{CertificateId, SignatureRecordId, UserId, VariationId, WorkItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Parties ──────────────────────────────────────────────────────────

/// The two counterparties to every approval
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// The party delivering the work (supplier side)
    Providing,
    /// The party receiving and accepting the work (client side)
    Receiving,
}

impl Party {
    /// The counterparty whose signature is also required
    pub fn other(self) -> Self {
        match self {
            Party::Providing => Party::Receiving,
            Party::Receiving => Party::Providing,
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Party::Providing => "providing",
            Party::Receiving => "receiving",
        };
        write!(f, "{}", s)
    }
}

// ── Approval Kind ────────────────────────────────────────────────────

/// What a signature record approves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalKind {
    /// Deliverable review sign-off (completion delivers the deliverable)
    DeliverableSignoff,
    /// Milestone baseline commitment (completion snapshots a baseline)
    BaselineCommitment,
    /// Milestone acceptance certificate (completion marks ready-to-bill)
    AcceptanceCertificate,
    /// Variation / change request (completion re-baselines and applies ops)
    Variation,
}

impl std::fmt::Display for ApprovalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ApprovalKind::DeliverableSignoff => "deliverable_signoff",
            ApprovalKind::BaselineCommitment => "baseline_commitment",
            ApprovalKind::AcceptanceCertificate => "acceptance_certificate",
            ApprovalKind::Variation => "variation",
        };
        write!(f, "{}", s)
    }
}

/// The concrete entity a signature record approves. The approval kind
/// is a function of the subject, so the two can never disagree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApprovalSubject {
    /// A deliverable awaiting review sign-off
    Deliverable(WorkItemId),
    /// A milestone's baseline commitment
    Milestone(WorkItemId),
    /// An acceptance certificate
    Certificate(CertificateId),
    /// A variation (change request)
    Variation(VariationId),
}

impl ApprovalSubject {
    pub fn kind(&self) -> ApprovalKind {
        match self {
            ApprovalSubject::Deliverable(_) => ApprovalKind::DeliverableSignoff,
            ApprovalSubject::Milestone(_) => ApprovalKind::BaselineCommitment,
            ApprovalSubject::Certificate(_) => ApprovalKind::AcceptanceCertificate,
            ApprovalSubject::Variation(_) => ApprovalKind::Variation,
        }
    }
}

impl std::fmt::Display for ApprovalSubject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApprovalSubject::Deliverable(id) => write!(f, "deliverable {}", id),
            ApprovalSubject::Milestone(id) => write!(f, "milestone {}", id),
            ApprovalSubject::Certificate(id) => write!(f, "certificate {}", id),
            ApprovalSubject::Variation(id) => write!(f, "variation {}", id),
        }
    }
}

// ── Party Slot ───────────────────────────────────────────────────────

/// One party's slot on a signature record
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct PartySlot {
    /// Who signed, once signed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<UserId>,
    /// When the slot was signed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<DateTime<Utc>>,
    /// Whether the slot is signed
    pub signed: bool,
}

impl PartySlot {
    /// An unsigned slot
    pub fn empty() -> Self {
        Self::default()
    }

    fn sign(&mut self, signer: UserId) {
        self.signer = Some(signer);
        self.signed_at = Some(Utc::now());
        self.signed = true;
    }
}

// ── Signature State ──────────────────────────────────────────────────

/// Derived state of a signature record. Computed from the slots,
/// never stored alongside them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureState {
    /// Neither party has signed
    Unsigned,
    /// Exactly one party has signed
    PartiallySigned(Party),
    /// Both parties have signed. Terminal.
    Complete,
}

// ── Signature Record ─────────────────────────────────────────────────

/// A dual-party approval record for one entity
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureRecord {
    /// Unique identifier
    pub id: SignatureRecordId,
    /// The entity being approved
    pub subject: ApprovalSubject,
    /// Providing-party slot
    pub providing: PartySlot,
    /// Receiving-party slot
    pub receiving: PartySlot,
    /// Optimistic-concurrency counter, bumped on every successful sign
    pub version: u64,
    /// Set exactly once, when the second slot signs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// When the record was opened
    pub created_at: DateTime<Utc>,
}

impl SignatureRecord {
    /// Open a fresh, unsigned record for an entity
    pub fn open(subject: ApprovalSubject) -> Self {
        Self {
            id: SignatureRecordId::generate(),
            subject,
            providing: PartySlot::empty(),
            receiving: PartySlot::empty(),
            version: 0,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    /// The approval kind, derived from the subject
    pub fn approval(&self) -> ApprovalKind {
        self.subject.kind()
    }

    pub fn slot(&self, party: Party) -> &PartySlot {
        match party {
            Party::Providing => &self.providing,
            Party::Receiving => &self.receiving,
        }
    }

    fn slot_mut(&mut self, party: Party) -> &mut PartySlot {
        match party {
            Party::Providing => &mut self.providing,
            Party::Receiving => &mut self.receiving,
        }
    }

    /// Both slots signed
    pub fn is_complete(&self) -> bool {
        self.providing.signed && self.receiving.signed
    }

    /// Derived state from the slots
    pub fn state(&self) -> SignatureState {
        match (self.providing.signed, self.receiving.signed) {
            (true, true) => SignatureState::Complete,
            (true, false) => SignatureState::PartiallySigned(Party::Providing),
            (false, true) => SignatureState::PartiallySigned(Party::Receiving),
            (false, false) => SignatureState::Unsigned,
        }
    }

    /// The party whose signature is still missing, if exactly one is
    pub fn missing_party(&self) -> Option<Party> {
        match self.state() {
            SignatureState::PartiallySigned(signed) => Some(signed.other()),
            SignatureState::Unsigned | SignatureState::Complete => None,
        }
    }

    /// Apply a signature to a party slot.
    ///
    /// Returns true when this signature completed the record. The
    /// caller (the sign-off engine) is responsible for eligibility and
    /// version checks; this method only enforces slot monotonicity.
    pub fn apply_signature(&mut self, party: Party, signer: UserId) -> Result<bool, Party> {
        if self.slot(party).signed {
            return Err(party);
        }
        self.slot_mut(party).sign(signer);
        self.version += 1;
        if self.is_complete() {
            self.completed_at = Some(Utc::now());
            Ok(true)
        } else {
            Ok(false)
        }
    }
}
