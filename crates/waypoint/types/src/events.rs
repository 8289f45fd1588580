//! Events emitted by the core, consumed by audit and notification
//! collaborators. The stores keep an append-only record of these;
//! delivery and retry are the collaborators' problem, not ours.

use crate::{ApprovalSubject, Party, SignatureRecordId, UserId, WorkItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A structural or signature event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryEvent {
    /// A work item was created
    ItemCreated { item: WorkItemId },
    /// A work item (and its subtree) moved to a new parent
    ItemMoved {
        item: WorkItemId,
        new_parent: Option<WorkItemId>,
    },
    /// A parent's children were reordered (None = root milestones)
    ItemReordered { parent: Option<WorkItemId> },
    /// A work item was soft-deleted
    ItemDeleted { item: WorkItemId },
    /// One party signed a record
    Signed {
        record: SignatureRecordId,
        subject: ApprovalSubject,
        party: Party,
        signer: UserId,
    },
    /// Both parties have signed; completion side effects ran
    Completed {
        record: SignatureRecordId,
        subject: ApprovalSubject,
    },
}

/// An event with its emission timestamp, as kept in the audit record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RecordedEvent {
    pub event: DeliveryEvent,
    pub recorded_at: DateTime<Utc>,
}

impl RecordedEvent {
    pub fn now(event: DeliveryEvent) -> Self {
        Self {
            event,
            recorded_at: Utc::now(),
        }
    }
}
