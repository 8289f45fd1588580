//! Deliverable review lifecycle
//!
//! Draft →(work recorded)→ InProgress →(submit)→ SubmittedForReview
//! →(return)→ ReturnedForMoreWork →(resubmit)→ SubmittedForReview;
//! SubmittedForReview →(accept)→ ReviewComplete →(dual sign-off)→
//! Delivered. Delivered is terminal; there is no reopen transition.

use tracing::info;
use waypoint_hierarchy::HierarchyStore;
use waypoint_types::{
    DeliverableStatus, WaypointError, WaypointResult, WorkItem, WorkItemId, WorkItemKind,
};

/// Submit a deliverable for review. Legal from InProgress (first
/// submission) and ReturnedForMoreWork (resubmission).
pub fn submit_for_review(store: &HierarchyStore, id: &WorkItemId) -> WaypointResult<WorkItem> {
    transition(
        store,
        id,
        &[
            DeliverableStatus::InProgress,
            DeliverableStatus::ReturnedForMoreWork,
        ],
        DeliverableStatus::SubmittedForReview,
    )
}

/// Reject a submitted deliverable back to the supplier
pub fn return_for_more_work(store: &HierarchyStore, id: &WorkItemId) -> WaypointResult<WorkItem> {
    transition(
        store,
        id,
        &[DeliverableStatus::SubmittedForReview],
        DeliverableStatus::ReturnedForMoreWork,
    )
}

/// Accept the review, making the deliverable eligible for dual-party
/// sign-off
pub fn accept_review(store: &HierarchyStore, id: &WorkItemId) -> WaypointResult<WorkItem> {
    transition(
        store,
        id,
        &[DeliverableStatus::SubmittedForReview],
        DeliverableStatus::ReviewComplete,
    )
}

fn transition(
    store: &HierarchyStore,
    id: &WorkItemId,
    allowed_from: &[DeliverableStatus],
    to: DeliverableStatus,
) -> WaypointResult<WorkItem> {
    let item = store.get(id)?;
    if item.kind != WorkItemKind::Deliverable {
        return Err(WaypointError::WrongKind {
            item: id.clone(),
            actual: item.kind,
            expected: WorkItemKind::Deliverable,
        });
    }
    if !allowed_from.contains(&item.status) {
        return Err(WaypointError::InvalidStatus {
            item: id.clone(),
            status: item.status.to_string(),
            required: allowed_from
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(" or "),
        });
    }
    let updated = store.set_status(id, to)?;
    info!(deliverable = %id, from = %item.status, to = %to, "review transition");
    Ok(updated)
}
