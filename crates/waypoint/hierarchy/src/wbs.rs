//! Work-breakdown path numbering
//!
//! A WBS path is a pure function of sibling order and ancestor paths:
//! roots are "1", "2", ...; a child's path is its parent's path plus
//! "." plus its 1-based position. Soft-deleted items are skipped and
//! do not consume a number.

use std::collections::HashMap;
use waypoint_types::{WorkItem, WorkItemId};

/// Recompute every live item's WBS path and resequence positions.
///
/// Full recompute keeps this trivially correct after any structural
/// change; the store calls it inside the same write lock as the change
/// itself, so readers never observe a half-renumbered tree.
pub(crate) fn renumber(items: &mut HashMap<WorkItemId, WorkItem>) {
    let mut roots = live_children(items, None);
    roots.sort_by_key(|id| items[id].position);

    for (index, root_id) in roots.iter().enumerate() {
        let path = (index + 1).to_string();
        if let Some(root) = items.get_mut(root_id) {
            root.position = index as u32;
            root.wbs_path = path.clone();
        }
        renumber_subtree(items, root_id, &path);
    }
}

fn renumber_subtree(items: &mut HashMap<WorkItemId, WorkItem>, parent_id: &WorkItemId, parent_path: &str) {
    let mut children = live_children(items, Some(parent_id));
    children.sort_by_key(|id| items[id].position);

    for (index, child_id) in children.iter().enumerate() {
        let path = format!("{}.{}", parent_path, index + 1);
        if let Some(child) = items.get_mut(child_id) {
            child.position = index as u32;
            child.wbs_path = path.clone();
        }
        renumber_subtree(items, child_id, &path);
    }
}

/// Live (non-deleted) children of a parent, unsorted
pub(crate) fn live_children(
    items: &HashMap<WorkItemId, WorkItem>,
    parent: Option<&WorkItemId>,
) -> Vec<WorkItemId> {
    items
        .values()
        .filter(|item| !item.deleted && item.parent.as_ref() == parent)
        .map(|item| item.id.clone())
        .collect()
}
