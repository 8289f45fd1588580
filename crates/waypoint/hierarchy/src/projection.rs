//! Flat-row projection of a hierarchy
//!
//! During migration between the flat and unified representations, list
//! views hold plain row sets rather than the live store. This snapshot
//! exposes the same `parent`-reachable child set through
//! [`HierarchyView`], so the aggregation engine computes identical
//! results against either representation.

use std::collections::HashMap;
use waypoint_types::{HierarchyView, WorkItem, WorkItemId};

/// An immutable set of work-item rows behaving like a hierarchy
#[derive(Clone, Debug, Default)]
pub struct FlatSnapshot {
    rows: HashMap<WorkItemId, WorkItem>,
}

impl FlatSnapshot {
    pub fn from_rows(rows: impl IntoIterator<Item = WorkItem>) -> Self {
        Self {
            rows: rows.into_iter().map(|row| (row.id.clone(), row)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn sorted(&self, parent: Option<&WorkItemId>) -> Vec<WorkItem> {
        let mut children: Vec<WorkItem> = self
            .rows
            .values()
            .filter(|row| !row.deleted && row.parent.as_ref() == parent)
            .cloned()
            .collect();
        children.sort_by_key(|row| row.position);
        children
    }
}

impl HierarchyView for FlatSnapshot {
    fn item(&self, id: &WorkItemId) -> Option<WorkItem> {
        self.rows.get(id).filter(|row| !row.deleted).cloned()
    }

    fn children_of(&self, parent: &WorkItemId) -> Vec<WorkItem> {
        self.sorted(Some(parent))
    }

    fn roots(&self) -> Vec<WorkItem> {
        self.sorted(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::WorkItemKind;

    #[test]
    fn test_snapshot_exposes_child_set() {
        let m = WorkItem::new(WorkItemKind::Milestone, None, "M");
        let mut d1 = WorkItem::new(WorkItemKind::Deliverable, Some(m.id.clone()), "D1");
        d1.position = 1;
        let mut d2 = WorkItem::new(WorkItemKind::Deliverable, Some(m.id.clone()), "D2");
        d2.position = 0;

        let snapshot =
            FlatSnapshot::from_rows(vec![m.clone(), d1.clone(), d2.clone()]);
        let children = snapshot.children_of(&m.id);
        assert_eq!(children.len(), 2);
        // Sibling order respected
        assert_eq!(children[0].id, d2.id);
        assert_eq!(children[1].id, d1.id);
        assert_eq!(snapshot.roots().len(), 1);
    }

    #[test]
    fn test_deleted_rows_invisible() {
        let m = WorkItem::new(WorkItemKind::Milestone, None, "M");
        let mut d = WorkItem::new(WorkItemKind::Deliverable, Some(m.id.clone()), "D");
        d.deleted = true;

        let snapshot = FlatSnapshot::from_rows(vec![m.clone(), d.clone()]);
        assert!(snapshot.item(&d.id).is_none());
        assert!(snapshot.children_of(&m.id).is_empty());
    }
}
