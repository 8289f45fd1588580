//! Baseline versions: immutable snapshots of committed milestone scope
//!
//! A BaselineVersion exists only as the side effect of a completed
//! baseline-commitment or variation approval. Numbers are strictly
//! increasing per milestone, starting at 1. Snapshots are never mutated.

use crate::{VariationId, WorkItemId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// How a baseline came to exist
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BaselineOrigin {
    /// The initial (or explicit re-) baseline commitment sign-off
    Commitment,
    /// An approved variation re-baselined the milestone
    Variation(VariationId),
}

/// An immutable snapshot of a milestone's committed scope
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaselineVersion {
    /// The milestone this baseline belongs to
    pub milestone_id: WorkItemId,
    /// Strictly increasing per milestone, starting at 1
    pub number: u32,
    /// Milestone name at commitment time
    pub name: String,
    /// Committed start date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Committed end date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// The deliverables in scope at commitment time, in sibling order
    pub deliverable_ids: Vec<WorkItemId>,
    /// What produced this baseline
    pub origin: BaselineOrigin,
    /// When the approval completed
    pub created_at: DateTime<Utc>,
}

impl BaselineVersion {
    /// Snapshot a milestone's current scope as the given version number
    pub fn snapshot(
        milestone_id: WorkItemId,
        number: u32,
        name: impl Into<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        deliverable_ids: Vec<WorkItemId>,
        origin: BaselineOrigin,
    ) -> Self {
        Self {
            milestone_id,
            number,
            name: name.into(),
            start_date,
            end_date,
            deliverable_ids,
            origin,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_carries_scope() {
        let baseline = BaselineVersion::snapshot(
            WorkItemId::new("m-1"),
            1,
            "Phase One",
            None,
            None,
            vec![WorkItemId::new("d-1"), WorkItemId::new("d-2")],
            BaselineOrigin::Commitment,
        );
        assert_eq!(baseline.number, 1);
        assert_eq!(baseline.deliverable_ids.len(), 2);
        assert_eq!(baseline.origin, BaselineOrigin::Commitment);
    }
}
