//! Variations: formal change requests against a committed milestone
//!
//! A variation declares add/modify/remove operations on a milestone's
//! deliverable set. On dual-party approval the operations are applied
//! to the hierarchy and a new baseline is snapshotted, atomically.

use crate::{VariationId, WorkItemAttrs, WorkItemId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One declared change within a variation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum VariationOp {
    /// Add a new deliverable under the milestone
    AddDeliverable {
        /// Attributes for the new deliverable (name required)
        attrs: WorkItemAttrs,
    },
    /// Modify an existing deliverable's attributes
    ModifyDeliverable {
        id: WorkItemId,
        attrs: WorkItemAttrs,
    },
    /// Remove (soft-delete) a deliverable from scope
    RemoveDeliverable { id: WorkItemId },
}

/// A change request awaiting (or having received) dual-party approval
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Variation {
    /// Unique identifier
    pub id: VariationId,
    /// The milestone whose scope changes
    pub milestone_id: WorkItemId,
    /// Short human-readable title
    pub title: String,
    /// The declared scope delta, applied in order on approval
    pub ops: Vec<VariationOp>,
    /// When the variation was raised
    pub created_at: DateTime<Utc>,
}

impl Variation {
    pub fn new(milestone_id: WorkItemId, title: impl Into<String>) -> Self {
        Self {
            id: VariationId::generate(),
            milestone_id,
            title: title.into(),
            ops: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_op(mut self, op: VariationOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn add_deliverable(self, attrs: WorkItemAttrs) -> Self {
        self.with_op(VariationOp::AddDeliverable { attrs })
    }

    pub fn modify_deliverable(self, id: WorkItemId, attrs: WorkItemAttrs) -> Self {
        self.with_op(VariationOp::ModifyDeliverable { id, attrs })
    }

    pub fn remove_deliverable(self, id: WorkItemId) -> Self {
        self.with_op(VariationOp::RemoveDeliverable { id })
    }
}
