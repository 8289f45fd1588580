//! The Hierarchy Store: create, move, reorder, soft-delete
//!
//! All structural rules live here. Operations validate fully before
//! mutating, so a rejected call leaves the tree untouched. Every
//! mutation renumbers WBS paths inside the same write lock.

use crate::wbs;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, RwLock};
use tracing::info;
use waypoint_types::{
    DeliverableStatus, DeliveryEvent, HierarchyView, RecordedEvent, VariationId, VariationOp,
    WaypointError, WaypointResult, WorkItem, WorkItemAttrs, WorkItemId, WorkItemKind,
};

/// In-memory hierarchy store
///
/// Structural mutations are serialized per root milestone via a lock
/// map; the item map itself sits behind a single RwLock so readers are
/// cheap and writers atomic.
pub struct HierarchyStore {
    items: RwLock<HashMap<WorkItemId, WorkItem>>,
    root_locks: Mutex<HashMap<WorkItemId, Arc<Mutex<()>>>>,
    applied_variations: Mutex<HashSet<VariationId>>,
    events: RwLock<Vec<RecordedEvent>>,
}

impl HierarchyStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(HashMap::new()),
            root_locks: Mutex::new(HashMap::new()),
            applied_variations: Mutex::new(HashSet::new()),
            events: RwLock::new(Vec::new()),
        }
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Fetch an item, including its kind and current WBS path
    pub fn get(&self, id: &WorkItemId) -> WaypointResult<WorkItem> {
        let items = self.items.read().map_err(|_| WaypointError::LockPoisoned)?;
        items
            .get(id)
            .filter(|item| !item.deleted)
            .cloned()
            .ok_or_else(|| WaypointError::ItemNotFound(id.clone()))
    }

    /// Live direct children, in sibling order
    pub fn children(&self, parent: &WorkItemId) -> WaypointResult<Vec<WorkItem>> {
        let items = self.items.read().map_err(|_| WaypointError::LockPoisoned)?;
        Ok(sorted_children(&items, Some(parent)))
    }

    /// Live root milestones, in sibling order
    pub fn root_milestones(&self) -> WaypointResult<Vec<WorkItem>> {
        let items = self.items.read().map_err(|_| WaypointError::LockPoisoned)?;
        Ok(sorted_children(&items, None))
    }

    /// Every live descendant of an item (children first, depth order)
    pub fn descendants(&self, id: &WorkItemId) -> WaypointResult<Vec<WorkItem>> {
        let items = self.items.read().map_err(|_| WaypointError::LockPoisoned)?;
        let mut out = Vec::new();
        collect_descendants(&items, id, &mut out);
        Ok(out)
    }

    /// The audit record of structural events, oldest first
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    // ── Structural mutations ─────────────────────────────────────────

    /// Create a work item under a parent (None = root milestone).
    ///
    /// Fails with a type-constraint error when the parent kind violates
    /// the Milestone → Deliverable → Task chain. The new item is placed
    /// last among its siblings.
    pub fn create_item(
        &self,
        kind: WorkItemKind,
        parent_id: Option<&WorkItemId>,
        attrs: WorkItemAttrs,
    ) -> WaypointResult<WorkItem> {
        let locks = self.lock_scope(parent_id)?;
        let _guards = hold_all(&locks)?;
        let mut items = self.items.write().map_err(|_| WaypointError::LockPoisoned)?;

        let parent_kind = match parent_id {
            Some(pid) => {
                let parent = items
                    .get(pid)
                    .filter(|item| !item.deleted)
                    .ok_or_else(|| WaypointError::ItemNotFound(pid.clone()))?;
                Some(parent.kind)
            }
            None => None,
        };
        kind.check_parent(parent_kind)?;

        let name = attrs
            .name
            .clone()
            .unwrap_or_else(|| format!("New {}", kind));
        let mut item = WorkItem::new(kind, parent_id.cloned(), name);
        item.position = wbs::live_children(&items, parent_id).len() as u32;
        attrs.apply_to(&mut item);

        let id = item.id.clone();
        items.insert(id.clone(), item);
        wbs::renumber(&mut items);

        let created = items[&id].clone();
        drop(items);

        info!(item = %id, kind = %kind, "work item created");
        self.record(DeliveryEvent::ItemCreated { item: id });
        Ok(created)
    }

    /// Update caller-editable attributes (name, dates, progress, links)
    pub fn update_attrs(&self, id: &WorkItemId, attrs: &WorkItemAttrs) -> WaypointResult<WorkItem> {
        let mut items = self.items.write().map_err(|_| WaypointError::LockPoisoned)?;
        let item = items
            .get_mut(id)
            .filter(|item| !item.deleted)
            .ok_or_else(|| WaypointError::ItemNotFound(id.clone()))?;
        attrs.apply_to(item);
        Ok(item.clone())
    }

    /// Set the stored lifecycle status. Transition legality is the
    /// sign-off engine's concern; the store just records the value.
    pub fn set_status(
        &self,
        id: &WorkItemId,
        status: DeliverableStatus,
    ) -> WaypointResult<WorkItem> {
        let mut items = self.items.write().map_err(|_| WaypointError::LockPoisoned)?;
        let item = items
            .get_mut(id)
            .filter(|item| !item.deleted)
            .ok_or_else(|| WaypointError::ItemNotFound(id.clone()))?;
        item.status = status;
        item.updated_at = chrono::Utc::now();
        Ok(item.clone())
    }

    /// Overwrite stored progress (clamped to 100)
    pub fn set_progress(&self, id: &WorkItemId, progress: u8) -> WaypointResult<WorkItem> {
        let mut items = self.items.write().map_err(|_| WaypointError::LockPoisoned)?;
        let item = items
            .get_mut(id)
            .filter(|item| !item.deleted)
            .ok_or_else(|| WaypointError::ItemNotFound(id.clone()))?;
        item.progress = progress.min(100);
        item.updated_at = chrono::Utc::now();
        Ok(item.clone())
    }

    /// Move an item (and its whole subtree) under a new parent at the
    /// given sibling position.
    ///
    /// The item's kind follows its new depth: root ⇒ Milestone, under a
    /// milestone ⇒ Deliverable, deeper ⇒ Task, with descendants re-typed
    /// to keep the chain valid. Promoting an item to root while it still
    /// has children is rejected rather than silently re-typing or
    /// truncating them.
    pub fn move_item(
        &self,
        item_id: &WorkItemId,
        new_parent: Option<&WorkItemId>,
        position: u32,
    ) -> WaypointResult<WorkItem> {
        let locks = self.lock_move_scope(item_id, new_parent)?;
        let _guards = hold_all(&locks)?;
        let mut items = self.items.write().map_err(|_| WaypointError::LockPoisoned)?;

        self.check_move(&items, item_id, new_parent)?;
        apply_move(&mut items, item_id, new_parent, position);
        wbs::renumber(&mut items);

        let moved = items[item_id].clone();
        drop(items);

        info!(item = %item_id, parent = ?new_parent.map(|p| p.to_string()), "work item moved");
        self.record(DeliveryEvent::ItemMoved {
            item: item_id.clone(),
            new_parent: new_parent.cloned(),
        });
        Ok(moved)
    }

    /// Demote a milestone to a deliverable under its preceding sibling
    /// milestone. Fails when no preceding sibling exists to receive it.
    pub fn demote(&self, item_id: &WorkItemId) -> WaypointResult<WorkItem> {
        let receiver = {
            let items = self.items.read().map_err(|_| WaypointError::LockPoisoned)?;
            let item = items
                .get(item_id)
                .filter(|item| !item.deleted)
                .ok_or_else(|| WaypointError::ItemNotFound(item_id.clone()))?;
            if item.kind != WorkItemKind::Milestone {
                return Err(WaypointError::WrongKind {
                    item: item_id.clone(),
                    actual: item.kind,
                    expected: WorkItemKind::Milestone,
                });
            }
            let roots = sorted_children(&items, None);
            let index = roots
                .iter()
                .position(|root| root.id == *item_id)
                .ok_or_else(|| WaypointError::ItemNotFound(item_id.clone()))?;
            if index == 0 {
                return Err(WaypointError::NoValidParent(item_id.clone()));
            }
            roots[index - 1].id.clone()
        };
        let end = self.children(&receiver)?.len() as u32;
        self.move_item(item_id, Some(&receiver), end)
    }

    /// Promote a deliverable to a root milestone. Fails while it still
    /// has task children that promotion would orphan.
    pub fn promote(&self, item_id: &WorkItemId) -> WaypointResult<WorkItem> {
        let end = self.root_milestones()?.len() as u32;
        self.move_item(item_id, None, end)
    }

    /// Reorder the live children of a parent (None = root milestones).
    ///
    /// `ordered` must be exactly the current live child set.
    pub fn reorder(
        &self,
        parent: Option<&WorkItemId>,
        ordered: &[WorkItemId],
    ) -> WaypointResult<()> {
        let locks = self.lock_scope(parent)?;
        let _guards = hold_all(&locks)?;
        let mut items = self.items.write().map_err(|_| WaypointError::LockPoisoned)?;

        // The order must name exactly the current live child set, each
        // child exactly once
        let current = wbs::live_children(&items, parent);
        let mut seen = std::collections::HashSet::new();
        for id in ordered {
            if !current.contains(id) {
                return Err(WaypointError::ItemNotFound(id.clone()));
            }
            if !seen.insert(id) {
                return Err(WaypointError::DuplicateChild(id.clone()));
            }
        }
        if let Some(missing) = current.iter().find(|id| !ordered.contains(id)) {
            return Err(WaypointError::ItemNotFound(missing.clone()));
        }

        for (index, id) in ordered.iter().enumerate() {
            if let Some(item) = items.get_mut(id) {
                item.position = index as u32;
            }
        }
        wbs::renumber(&mut items);
        drop(items);

        self.record(DeliveryEvent::ItemReordered {
            parent: parent.cloned(),
        });
        Ok(())
    }

    /// Soft-delete an item and its whole subtree. Records stay in the
    /// map (commercial references may still point at them) but become
    /// invisible to every read path.
    pub fn soft_delete(&self, item_id: &WorkItemId) -> WaypointResult<()> {
        let locks = self.lock_move_scope(item_id, None)?;
        let _guards = hold_all(&locks)?;
        let mut items = self.items.write().map_err(|_| WaypointError::LockPoisoned)?;

        if !items.contains_key(item_id) || items[item_id].deleted {
            return Err(WaypointError::ItemNotFound(item_id.clone()));
        }

        let mut to_delete = vec![item_id.clone()];
        let mut queue = vec![item_id.clone()];
        while let Some(next) = queue.pop() {
            for child in wbs::live_children(&items, Some(&next)) {
                to_delete.push(child.clone());
                queue.push(child);
            }
        }
        for id in &to_delete {
            if let Some(item) = items.get_mut(id) {
                item.deleted = true;
            }
        }
        wbs::renumber(&mut items);
        drop(items);

        info!(item = %item_id, "work item soft-deleted");
        self.record(DeliveryEvent::ItemDeleted {
            item: item_id.clone(),
        });
        Ok(())
    }

    /// Apply an approved variation's declared operations to a
    /// milestone's deliverable set, all-or-nothing and exactly once
    /// per variation.
    ///
    /// Every operation is validated before any is applied, under one
    /// write lock, so a rejected variation leaves the hierarchy exactly
    /// as it was. A variation already applied is a no-op returning the
    /// current deliverables, so a completion side effect can be re-run
    /// without double-applying. Returns the milestone's live
    /// deliverables after the change, for the caller's baseline
    /// snapshot.
    pub fn apply_variation_ops(
        &self,
        variation_id: &VariationId,
        milestone_id: &WorkItemId,
        ops: &[VariationOp],
    ) -> WaypointResult<Vec<WorkItem>> {
        let locks = self.lock_scope(Some(milestone_id))?;
        let _guards = hold_all(&locks)?;
        let mut items = self.items.write().map_err(|_| WaypointError::LockPoisoned)?;

        // The applied-set guard is taken before any mutation so the ops
        // and the applied marker commit together.
        let mut applied = self
            .applied_variations
            .lock()
            .map_err(|_| WaypointError::LockPoisoned)?;
        if applied.contains(variation_id) {
            return Ok(sorted_children(&items, Some(milestone_id)));
        }

        // Validation pass: no mutation until every op is known-good
        validate_variation_ops(&items, milestone_id, ops)?;

        // Apply pass
        let mut touched = Vec::new();
        for op in ops {
            match op {
                VariationOp::AddDeliverable { attrs } => {
                    let name = attrs
                        .name
                        .clone()
                        .unwrap_or_else(|| "New deliverable".to_string());
                    let mut item =
                        WorkItem::new(WorkItemKind::Deliverable, Some(milestone_id.clone()), name);
                    item.position = wbs::live_children(&items, Some(milestone_id)).len() as u32;
                    attrs.apply_to(&mut item);
                    touched.push(DeliveryEvent::ItemCreated {
                        item: item.id.clone(),
                    });
                    items.insert(item.id.clone(), item);
                }
                VariationOp::ModifyDeliverable { id, attrs } => {
                    if let Some(item) = items.get_mut(id) {
                        attrs.apply_to(item);
                    }
                }
                VariationOp::RemoveDeliverable { id } => {
                    let mut queue = vec![id.clone()];
                    while let Some(next) = queue.pop() {
                        for child in wbs::live_children(&items, Some(&next)) {
                            queue.push(child);
                        }
                        if let Some(item) = items.get_mut(&next) {
                            item.deleted = true;
                        }
                    }
                    touched.push(DeliveryEvent::ItemDeleted { item: id.clone() });
                }
            }
        }
        wbs::renumber(&mut items);
        applied.insert(variation_id.clone());
        let result = sorted_children(&items, Some(milestone_id));
        drop(items);

        info!(milestone = %milestone_id, variation = %variation_id, ops = ops.len(), "variation operations applied");
        for event in touched {
            self.record(event);
        }
        Ok(result)
    }

    /// Whether a variation's operations have already been applied
    pub fn variation_applied(&self, variation_id: &VariationId) -> WaypointResult<bool> {
        let applied = self
            .applied_variations
            .lock()
            .map_err(|_| WaypointError::LockPoisoned)?;
        Ok(applied.contains(variation_id))
    }

    /// Dry-run the validation pass of [`apply_variation_ops`], so a
    /// caller can refuse to commit an approval whose side effect would
    /// fail.
    pub fn check_variation_ops(
        &self,
        milestone_id: &WorkItemId,
        ops: &[VariationOp],
    ) -> WaypointResult<()> {
        let items = self.items.read().map_err(|_| WaypointError::LockPoisoned)?;
        validate_variation_ops(&items, milestone_id, ops)
    }

    // ── Internals ────────────────────────────────────────────────────

    /// Validate a move without mutating anything
    fn check_move(
        &self,
        items: &HashMap<WorkItemId, WorkItem>,
        item_id: &WorkItemId,
        new_parent: Option<&WorkItemId>,
    ) -> WaypointResult<()> {
        let item = items
            .get(item_id)
            .filter(|item| !item.deleted)
            .ok_or_else(|| WaypointError::ItemNotFound(item_id.clone()))?;

        let parent_kind = match new_parent {
            Some(pid) => {
                if pid == item_id || is_descendant(items, item_id, pid) {
                    return Err(WaypointError::CyclicMove(item_id.clone()));
                }
                let parent = items
                    .get(pid)
                    .filter(|p| !p.deleted)
                    .ok_or_else(|| WaypointError::ItemNotFound(pid.clone()))?;
                Some(parent.kind)
            }
            None => None,
        };

        let new_kind = kind_for_depth(parent_kind);
        if new_kind == WorkItemKind::Milestone
            && item.kind != WorkItemKind::Milestone
            && !wbs::live_children(items, Some(item_id)).is_empty()
        {
            return Err(WaypointError::PromotionBlocked(item_id.clone()));
        }
        new_kind.check_parent(parent_kind)?;
        Ok(())
    }

    fn record(&self, event: DeliveryEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(RecordedEvent::now(event));
        }
    }

    /// Lock handle serializing structural work against the root owning
    /// `anchor` (the parent for creates/reorders). Root-level work takes
    /// no per-root lock; the map's write lock already serializes it.
    /// Callers lock the returned handle for the operation's duration.
    fn lock_scope(&self, anchor: Option<&WorkItemId>) -> WaypointResult<Vec<Arc<Mutex<()>>>> {
        match anchor {
            Some(id) => {
                let root = self.root_of(id)?;
                Ok(vec![self.root_lock(root)?])
            }
            None => Ok(Vec::new()),
        }
    }

    /// Lock handles for the source and destination roots of a move, in
    /// id order, so two concurrent reparents cannot deadlock or
    /// interleave their WBS renumbering.
    fn lock_move_scope(
        &self,
        item_id: &WorkItemId,
        new_parent: Option<&WorkItemId>,
    ) -> WaypointResult<Vec<Arc<Mutex<()>>>> {
        let mut roots = vec![self.root_of(item_id)?];
        if let Some(pid) = new_parent {
            let dest = self.root_of(pid)?;
            if !roots.contains(&dest) {
                roots.push(dest);
            }
        }
        roots.sort();
        roots.into_iter().map(|root| self.root_lock(root)).collect()
    }

    fn root_of(&self, id: &WorkItemId) -> WaypointResult<WorkItemId> {
        let items = self.items.read().map_err(|_| WaypointError::LockPoisoned)?;
        let mut current = items
            .get(id)
            .ok_or_else(|| WaypointError::ItemNotFound(id.clone()))?;
        while let Some(parent_id) = &current.parent {
            current = items
                .get(parent_id)
                .ok_or_else(|| WaypointError::ItemNotFound(parent_id.clone()))?;
        }
        Ok(current.id.clone())
    }

    fn root_lock(&self, root: WorkItemId) -> WaypointResult<Arc<Mutex<()>>> {
        let mut locks = self
            .root_locks
            .lock()
            .map_err(|_| WaypointError::LockPoisoned)?;
        Ok(locks.entry(root).or_default().clone())
    }
}

impl Default for HierarchyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HierarchyView for HierarchyStore {
    fn item(&self, id: &WorkItemId) -> Option<WorkItem> {
        self.get(id).ok()
    }

    fn children_of(&self, parent: &WorkItemId) -> Vec<WorkItem> {
        self.children(parent).unwrap_or_default()
    }

    fn roots(&self) -> Vec<WorkItem> {
        self.root_milestones().unwrap_or_default()
    }
}

// ── Pure helpers ─────────────────────────────────────────────────────

/// Every variation op must name a live deliverable directly under the
/// milestone (adds excepted), and the anchor must be a milestone.
fn validate_variation_ops(
    items: &HashMap<WorkItemId, WorkItem>,
    milestone_id: &WorkItemId,
    ops: &[VariationOp],
) -> WaypointResult<()> {
    let milestone = items
        .get(milestone_id)
        .filter(|item| !item.deleted)
        .ok_or_else(|| WaypointError::ItemNotFound(milestone_id.clone()))?;
    WorkItemKind::Deliverable.check_parent(Some(milestone.kind))?;

    for op in ops {
        match op {
            VariationOp::AddDeliverable { .. } => {}
            VariationOp::ModifyDeliverable { id, .. } | VariationOp::RemoveDeliverable { id } => {
                let target = items
                    .get(id)
                    .filter(|item| !item.deleted)
                    .ok_or_else(|| WaypointError::ItemNotFound(id.clone()))?;
                if target.parent.as_ref() != Some(milestone_id) {
                    return Err(WaypointError::ItemNotFound(id.clone()));
                }
            }
        }
    }
    Ok(())
}

/// Lock every handle in order, mapping poison to the domain error
fn hold_all(locks: &[Arc<Mutex<()>>]) -> WaypointResult<Vec<std::sync::MutexGuard<'_, ()>>> {
    locks
        .iter()
        .map(|lock| lock.lock().map_err(|_| WaypointError::LockPoisoned))
        .collect()
}

fn kind_for_depth(parent_kind: Option<WorkItemKind>) -> WorkItemKind {
    match parent_kind {
        None => WorkItemKind::Milestone,
        Some(WorkItemKind::Milestone) => WorkItemKind::Deliverable,
        Some(WorkItemKind::Deliverable) | Some(WorkItemKind::Task) => WorkItemKind::Task,
    }
}

fn sorted_children(
    items: &HashMap<WorkItemId, WorkItem>,
    parent: Option<&WorkItemId>,
) -> Vec<WorkItem> {
    let mut children: Vec<WorkItem> = items
        .values()
        .filter(|item| !item.deleted && item.parent.as_ref() == parent)
        .cloned()
        .collect();
    children.sort_by_key(|item| item.position);
    children
}

fn collect_descendants(
    items: &HashMap<WorkItemId, WorkItem>,
    id: &WorkItemId,
    out: &mut Vec<WorkItem>,
) {
    for child in sorted_children(items, Some(id)) {
        let child_id = child.id.clone();
        out.push(child);
        collect_descendants(items, &child_id, out);
    }
}

fn is_descendant(
    items: &HashMap<WorkItemId, WorkItem>,
    ancestor: &WorkItemId,
    candidate: &WorkItemId,
) -> bool {
    let mut current = candidate;
    while let Some(item) = items.get(current) {
        match &item.parent {
            Some(parent) if parent == ancestor => return true,
            Some(parent) => current = parent,
            None => return false,
        }
    }
    false
}

/// Apply a validated move: detach, re-type for the new depth, attach
fn apply_move(
    items: &mut HashMap<WorkItemId, WorkItem>,
    item_id: &WorkItemId,
    new_parent: Option<&WorkItemId>,
    position: u32,
) {
    let parent_kind = new_parent.and_then(|pid| items.get(pid)).map(|p| p.kind);
    let new_kind = kind_for_depth(parent_kind);

    // Splice into the destination sibling order. Building the list and
    // resequencing avoids ambiguous positions when the item moves
    // within its current parent.
    let mut siblings: Vec<WorkItemId> = {
        let mut live = wbs::live_children(items, new_parent);
        live.sort_by_key(|id| items[id].position);
        live.retain(|id| id != item_id);
        live
    };
    let index = (position as usize).min(siblings.len());
    siblings.insert(index, item_id.clone());
    for (pos, sid) in siblings.iter().enumerate() {
        if let Some(sibling) = items.get_mut(sid) {
            sibling.position = pos as u32;
        }
    }

    if let Some(item) = items.get_mut(item_id) {
        item.parent = new_parent.cloned();
        item.kind = new_kind;
        item.updated_at = chrono::Utc::now();
    }
    retype_subtree(items, item_id, new_kind);
}

/// Re-type descendants to match their new depth after a move
fn retype_subtree(items: &mut HashMap<WorkItemId, WorkItem>, parent_id: &WorkItemId, parent_kind: WorkItemKind) {
    let child_kind = kind_for_depth(Some(parent_kind));
    for child_id in wbs::live_children(items, Some(parent_id)) {
        if let Some(child) = items.get_mut(&child_id) {
            child.kind = child_kind;
        }
        retype_subtree(items, &child_id, child_kind);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::WorkItemAttrs;

    fn make_store() -> HierarchyStore {
        HierarchyStore::new()
    }

    fn make_milestone(store: &HierarchyStore, name: &str) -> WorkItem {
        store
            .create_item(WorkItemKind::Milestone, None, WorkItemAttrs::named(name))
            .unwrap()
    }

    fn make_deliverable(store: &HierarchyStore, parent: &WorkItemId, name: &str) -> WorkItem {
        store
            .create_item(
                WorkItemKind::Deliverable,
                Some(parent),
                WorkItemAttrs::named(name),
            )
            .unwrap()
    }

    #[test]
    fn test_create_enforces_parent_chain() {
        let store = make_store();
        let m = make_milestone(&store, "M1");
        let d = make_deliverable(&store, &m.id, "D1");

        // A task cannot hang off a milestone
        let err = store
            .create_item(WorkItemKind::Task, Some(&m.id), WorkItemAttrs::named("T"))
            .unwrap_err();
        assert!(matches!(err, WaypointError::TypeConstraint(_)));

        // A deliverable cannot be a root
        let err = store
            .create_item(WorkItemKind::Deliverable, None, WorkItemAttrs::named("D"))
            .unwrap_err();
        assert!(matches!(err, WaypointError::TypeConstraint(_)));

        // Tasks nest under deliverables and under tasks
        let t1 = store
            .create_item(WorkItemKind::Task, Some(&d.id), WorkItemAttrs::named("T1"))
            .unwrap();
        let t2 = store
            .create_item(WorkItemKind::Task, Some(&t1.id), WorkItemAttrs::named("T2"))
            .unwrap();
        assert_eq!(t2.wbs_path, "1.1.1.1");
    }

    #[test]
    fn test_wbs_paths_follow_sibling_order() {
        let store = make_store();
        let m1 = make_milestone(&store, "M1");
        let m2 = make_milestone(&store, "M2");
        let d1 = make_deliverable(&store, &m1.id, "D1");
        let d2 = make_deliverable(&store, &m1.id, "D2");

        assert_eq!(store.get(&m1.id).unwrap().wbs_path, "1");
        assert_eq!(store.get(&m2.id).unwrap().wbs_path, "2");
        assert_eq!(store.get(&d1.id).unwrap().wbs_path, "1.1");
        assert_eq!(store.get(&d2.id).unwrap().wbs_path, "1.2");
    }

    #[test]
    fn test_reorder_renumbers() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d1 = make_deliverable(&store, &m.id, "D1");
        let d2 = make_deliverable(&store, &m.id, "D2");
        let d3 = make_deliverable(&store, &m.id, "D3");

        store
            .reorder(Some(&m.id), &[d3.id.clone(), d1.id.clone(), d2.id.clone()])
            .unwrap();

        assert_eq!(store.get(&d3.id).unwrap().wbs_path, "1.1");
        assert_eq!(store.get(&d1.id).unwrap().wbs_path, "1.2");
        assert_eq!(store.get(&d2.id).unwrap().wbs_path, "1.3");
    }

    #[test]
    fn test_reorder_rejects_wrong_child_set() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d1 = make_deliverable(&store, &m.id, "D1");
        let _d2 = make_deliverable(&store, &m.id, "D2");

        let err = store.reorder(Some(&m.id), &[d1.id.clone()]).unwrap_err();
        assert!(matches!(err, WaypointError::ItemNotFound(_)));
    }

    #[test]
    fn test_reorder_rejects_duplicate_ids() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d1 = make_deliverable(&store, &m.id, "D1");
        let d2 = make_deliverable(&store, &m.id, "D2");

        // Every id is a member, but d1 is named twice
        let err = store
            .reorder(Some(&m.id), &[d1.id.clone(), d2.id.clone(), d1.id.clone()])
            .unwrap_err();
        assert!(matches!(err, WaypointError::DuplicateChild(_)));

        // Order unchanged
        assert_eq!(store.get(&d1.id).unwrap().wbs_path, "1.1");
        assert_eq!(store.get(&d2.id).unwrap().wbs_path, "1.2");
    }

    #[test]
    fn test_move_subtree_recomputes_descendant_paths() {
        let store = make_store();
        let m1 = make_milestone(&store, "M1");
        let m2 = make_milestone(&store, "M2");
        let d = make_deliverable(&store, &m1.id, "D");
        let t = store
            .create_item(WorkItemKind::Task, Some(&d.id), WorkItemAttrs::named("T"))
            .unwrap();

        store.move_item(&d.id, Some(&m2.id), 0).unwrap();

        let moved = store.get(&d.id).unwrap();
        assert_eq!(moved.parent, Some(m2.id.clone()));
        assert_eq!(moved.wbs_path, "2.1");
        // The whole subtree moved in the same operation
        assert_eq!(store.get(&t.id).unwrap().wbs_path, "2.1.1");
    }

    #[test]
    fn test_promotion_blocked_with_children() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d = make_deliverable(&store, &m.id, "D");
        store
            .create_item(WorkItemKind::Task, Some(&d.id), WorkItemAttrs::named("T"))
            .unwrap();

        let err = store.promote(&d.id).unwrap_err();
        assert!(matches!(err, WaypointError::PromotionBlocked(_)));
        // Nothing changed
        assert_eq!(store.get(&d.id).unwrap().parent, Some(m.id.clone()));
    }

    #[test]
    fn test_promotion_of_childless_deliverable() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d = make_deliverable(&store, &m.id, "D");

        let promoted = store.promote(&d.id).unwrap();
        assert_eq!(promoted.kind, WorkItemKind::Milestone);
        assert_eq!(promoted.parent, None);
        assert_eq!(promoted.wbs_path, "2");
    }

    #[test]
    fn test_demote_requires_preceding_sibling() {
        let store = make_store();
        let m1 = make_milestone(&store, "M1");
        let err = store.demote(&m1.id).unwrap_err();
        assert!(matches!(err, WaypointError::NoValidParent(_)));

        let m2 = make_milestone(&store, "M2");
        let demoted = store.demote(&m2.id).unwrap();
        assert_eq!(demoted.kind, WorkItemKind::Deliverable);
        assert_eq!(demoted.parent, Some(m1.id.clone()));
        assert_eq!(demoted.wbs_path, "1.1");
    }

    #[test]
    fn test_demote_retypes_subtree() {
        let store = make_store();
        let m1 = make_milestone(&store, "M1");
        let m2 = make_milestone(&store, "M2");
        let d = make_deliverable(&store, &m2.id, "D");

        store.demote(&m2.id).unwrap();

        // M2 became a deliverable under M1; its deliverable became a task
        assert_eq!(store.get(&m2.id).unwrap().kind, WorkItemKind::Deliverable);
        assert_eq!(store.get(&d.id).unwrap().kind, WorkItemKind::Task);
        assert_eq!(store.get(&m1.id).unwrap().kind, WorkItemKind::Milestone);
    }

    #[test]
    fn test_cyclic_move_rejected() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d = make_deliverable(&store, &m.id, "D");
        let t = store
            .create_item(WorkItemKind::Task, Some(&d.id), WorkItemAttrs::named("T"))
            .unwrap();

        let err = store.move_item(&d.id, Some(&t.id), 0).unwrap_err();
        assert!(matches!(err, WaypointError::CyclicMove(_)));
    }

    #[test]
    fn test_soft_delete_hides_subtree() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d1 = make_deliverable(&store, &m.id, "D1");
        let d2 = make_deliverable(&store, &m.id, "D2");
        let t = store
            .create_item(WorkItemKind::Task, Some(&d1.id), WorkItemAttrs::named("T"))
            .unwrap();

        store.soft_delete(&d1.id).unwrap();

        assert!(matches!(
            store.get(&d1.id),
            Err(WaypointError::ItemNotFound(_))
        ));
        assert!(matches!(
            store.get(&t.id),
            Err(WaypointError::ItemNotFound(_))
        ));
        // Remaining sibling renumbered
        assert_eq!(store.get(&d2.id).unwrap().wbs_path, "1.1");
    }

    #[test]
    fn test_events_recorded() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d = make_deliverable(&store, &m.id, "D");
        store.soft_delete(&d.id).unwrap();

        let events: Vec<_> = store.events().into_iter().map(|r| r.event).collect();
        assert!(events.contains(&DeliveryEvent::ItemCreated { item: m.id.clone() }));
        assert!(events.contains(&DeliveryEvent::ItemDeleted { item: d.id.clone() }));
    }

    #[test]
    fn test_variation_ops_all_or_nothing() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d1 = make_deliverable(&store, &m.id, "D1");

        // Second op is invalid (unknown deliverable): nothing applies
        let ops = vec![
            VariationOp::AddDeliverable {
                attrs: WorkItemAttrs::named("Extra"),
            },
            VariationOp::RemoveDeliverable {
                id: WorkItemId::new("no-such-item"),
            },
        ];
        let err = store
            .apply_variation_ops(&VariationId::new("v-1"), &m.id, &ops)
            .unwrap_err();
        assert!(matches!(err, WaypointError::ItemNotFound(_)));
        assert_eq!(store.children(&m.id).unwrap().len(), 1);
        // A rejected variation is not marked applied; it can be retried
        assert!(!store.variation_applied(&VariationId::new("v-1")).unwrap());

        // Valid ops apply together
        let ops = vec![
            VariationOp::AddDeliverable {
                attrs: WorkItemAttrs::named("Extra"),
            },
            VariationOp::RemoveDeliverable { id: d1.id.clone() },
        ];
        let after = store
            .apply_variation_ops(&VariationId::new("v-1"), &m.id, &ops)
            .unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].name, "Extra");
        assert_eq!(after[0].wbs_path, "1.1");
    }

    #[test]
    fn test_variation_ops_apply_exactly_once() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d1 = make_deliverable(&store, &m.id, "D1");
        let vid = VariationId::new("v-1");

        let ops = vec![
            VariationOp::AddDeliverable {
                attrs: WorkItemAttrs::named("Extra"),
            },
            VariationOp::RemoveDeliverable { id: d1.id.clone() },
        ];
        let first = store.apply_variation_ops(&vid, &m.id, &ops).unwrap();
        assert_eq!(first.len(), 1);
        assert!(store.variation_applied(&vid).unwrap());

        // Re-running the same variation neither adds a second copy nor
        // fails on the already-removed deliverable
        let second = store.apply_variation_ops(&vid, &m.id, &ops).unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, first[0].id);
    }

    #[test]
    fn test_variation_ops_reject_foreign_deliverable() {
        let store = make_store();
        let m1 = make_milestone(&store, "M1");
        let m2 = make_milestone(&store, "M2");
        let foreign = make_deliverable(&store, &m2.id, "D");

        let ops = vec![VariationOp::ModifyDeliverable {
            id: foreign.id.clone(),
            attrs: WorkItemAttrs::named("Renamed"),
        }];
        let err = store
            .apply_variation_ops(&VariationId::new("v-1"), &m1.id, &ops)
            .unwrap_err();
        assert!(matches!(err, WaypointError::ItemNotFound(_)));
        assert_eq!(store.get(&foreign.id).unwrap().name, "D");
    }

    #[test]
    fn test_same_parent_reposition() {
        let store = make_store();
        let m = make_milestone(&store, "M");
        let d1 = make_deliverable(&store, &m.id, "D1");
        let d2 = make_deliverable(&store, &m.id, "D2");
        let d3 = make_deliverable(&store, &m.id, "D3");

        store.move_item(&d1.id, Some(&m.id), 2).unwrap();

        assert_eq!(store.get(&d2.id).unwrap().wbs_path, "1.1");
        assert_eq!(store.get(&d3.id).unwrap().wbs_path, "1.2");
        assert_eq!(store.get(&d1.id).unwrap().wbs_path, "1.3");
    }
}
