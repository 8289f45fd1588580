//! Waypoint Aggregation Engine
//!
//! Milestone status and progress are **derived, never stored**. These
//! functions fold a milestone's direct deliverable set into a
//! [`MilestoneRollup`] on every read, so the result cannot drift from
//! the deliverables it summarizes. There is no cache to invalidate and
//! no state to hold; the rest of the system depends on this staying a
//! pure function of the view it is handed.
//!
//! The fold works over any [`HierarchyView`], so the live store and
//! back-compat flat projections produce identical results.

#![deny(unsafe_code)]

use tracing::debug;
use waypoint_types::{
    DeliverableStatus, HierarchyView, MilestoneRollup, MilestoneStatus, WorkItem, WorkItemId,
    WorkItemKind,
};

/// Derived status of a milestone.
///
/// - no deliverables ⇒ `NotStarted`
/// - every deliverable `Delivered` ⇒ `Completed`
/// - every deliverable still a draft with no progress ⇒ `NotStarted`
/// - otherwise ⇒ `InProgress`
pub fn compute_status(view: &dyn HierarchyView, milestone: &WorkItemId) -> MilestoneStatus {
    let deliverables = direct_deliverables(view, milestone);
    if deliverables.is_empty() {
        return MilestoneStatus::NotStarted;
    }
    if deliverables
        .iter()
        .all(|d| d.status == DeliverableStatus::Delivered)
    {
        return MilestoneStatus::Completed;
    }
    if deliverables
        .iter()
        .all(|d| d.status == DeliverableStatus::Draft && d.progress == 0)
    {
        return MilestoneStatus::NotStarted;
    }
    MilestoneStatus::InProgress
}

/// Derived progress of a milestone: the arithmetic mean of its direct
/// deliverables' stored progress, rounded to the nearest integer. A
/// milestone with no deliverables has progress 0.
pub fn compute_progress(view: &dyn HierarchyView, milestone: &WorkItemId) -> u8 {
    let deliverables = direct_deliverables(view, milestone);
    if deliverables.is_empty() {
        return 0;
    }
    let sum: u32 = deliverables.iter().map(|d| d.progress as u32).sum();
    let mean = sum as f64 / deliverables.len() as f64;
    mean.round() as u8
}

/// Both derived values in one read
pub fn rollup(view: &dyn HierarchyView, milestone: &WorkItemId) -> MilestoneRollup {
    let rollup = MilestoneRollup {
        status: compute_status(view, milestone),
        progress: compute_progress(view, milestone),
    };
    debug!(milestone = %milestone, status = ?rollup.status, progress = rollup.progress, "rollup recomputed");
    rollup
}

fn direct_deliverables(view: &dyn HierarchyView, milestone: &WorkItemId) -> Vec<WorkItem> {
    view.children_of(milestone)
        .into_iter()
        .filter(|child| child.kind == WorkItemKind::Deliverable)
        .collect()
}
