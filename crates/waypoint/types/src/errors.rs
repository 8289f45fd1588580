//! Error taxonomy for Waypoint operations
//!
//! Every variant is a recoverable, caller-facing business-rule failure
//! with a specific message. `StaleVersion` is the only one a caller
//! should retry (after re-reading current state).

use crate::{ApprovalKind, Party, SignatureRecordId, WorkItemId, WorkItemKind};

/// A hierarchy nesting rule was violated
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("a {kind} cannot be placed under {}", match .parent_kind {
    Some(parent) => format!("a {}", parent),
    None => "the project root".to_string(),
})]
pub struct TypeConstraintError {
    /// The kind being created or moved
    pub kind: WorkItemKind,
    /// The offending parent kind (None = root)
    pub parent_kind: Option<WorkItemKind>,
}

/// Errors that can occur in Waypoint operations
#[derive(Debug, thiserror::Error)]
pub enum WaypointError {
    #[error(transparent)]
    TypeConstraint(#[from] TypeConstraintError),

    #[error("cannot demote milestone {0}: no preceding sibling milestone to receive it")]
    NoValidParent(WorkItemId),

    #[error("cannot promote {0}: it still has child items")]
    PromotionBlocked(WorkItemId),

    #[error("the {party} party has already signed record {record}")]
    AlreadySigned {
        record: SignatureRecordId,
        party: Party,
    },

    #[error("signer {signer} is not eligible to sign as the {party} party for a {approval}")]
    NotEligible {
        signer: String,
        party: Party,
        approval: ApprovalKind,
    },

    #[error(
        "cannot generate a certificate for milestone {milestone}: \
         {undelivered} deliverable(s) are not yet Delivered"
    )]
    CertificateNotReady {
        milestone: WorkItemId,
        undelivered: usize,
    },

    #[error("stale version on {record}: expected {expected}, found {actual}; re-read and retry")]
    StaleVersion {
        record: SignatureRecordId,
        expected: u64,
        actual: u64,
    },

    #[error("work item not found: {0}")]
    ItemNotFound(WorkItemId),

    #[error("signature record not found: {0}")]
    RecordNotFound(SignatureRecordId),

    #[error("deliverable {item} is {status}, but {required} is required for this action")]
    InvalidStatus {
        item: WorkItemId,
        status: String,
        required: String,
    },

    #[error("work item {item} is a {actual}, but this action needs a {expected}")]
    WrongKind {
        item: WorkItemId,
        actual: WorkItemKind,
        expected: WorkItemKind,
    },

    #[error("variation not found: {0}")]
    VariationNotFound(crate::VariationId),

    #[error("certificate not found: {0}")]
    CertificateNotFound(crate::CertificateId),

    #[error("item {0} appears more than once in the requested order")]
    DuplicateChild(WorkItemId),

    #[error("item {0} cannot be its own ancestor")]
    CyclicMove(WorkItemId),

    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Result type alias for Waypoint operations
pub type WaypointResult<T> = Result<T, WaypointError>;
