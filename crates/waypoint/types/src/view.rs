//! Read seam over any hierarchy representation
//!
//! The aggregation engine and the sign-off preconditions only ever
//! need the `parentId`-reachable child set. Keeping that behind a
//! trait lets the live store and any back-compat projection (flat or
//! unified representation) expose the same shape to readers.

use crate::{WorkItem, WorkItemId};

/// Read-only view of a work-item hierarchy
pub trait HierarchyView {
    /// Fetch one item. Soft-deleted items are not visible.
    fn item(&self, id: &WorkItemId) -> Option<WorkItem>;

    /// Direct children of a parent, in sibling order, excluding
    /// soft-deleted items.
    fn children_of(&self, parent: &WorkItemId) -> Vec<WorkItem>;

    /// Root milestones, in sibling order, excluding soft-deleted items.
    fn roots(&self) -> Vec<WorkItem>;
}
