//! Work items: nodes in the milestone → deliverable → task hierarchy
//!
//! A WorkItem is the stored entity. Milestone status and progress are
//! never fields on it — they live on [`MilestoneRollup`], a read model
//! recomputed from the deliverable set on every read.

use crate::{TypeConstraintError, WorkItemId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Work Item Kind ───────────────────────────────────────────────────

/// The three kinds of work item, ordered by nesting depth
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkItemKind {
    /// Root-level item. Parent is always None.
    Milestone,
    /// Second level. Parent is always a Milestone.
    Deliverable,
    /// Leaf work. Parent is a Deliverable or another Task (any depth).
    Task,
}

impl WorkItemKind {
    /// Whether `parent` is a legal parent kind for this kind.
    ///
    /// Encodes the strict Milestone → Deliverable → Task chain:
    /// milestones are roots, deliverables sit under milestones, and
    /// tasks nest under deliverables or other tasks.
    pub fn accepts_parent(self, parent: Option<WorkItemKind>) -> bool {
        match (self, parent) {
            (WorkItemKind::Milestone, None) => true,
            (WorkItemKind::Deliverable, Some(WorkItemKind::Milestone)) => true,
            (WorkItemKind::Task, Some(WorkItemKind::Deliverable)) => true,
            (WorkItemKind::Task, Some(WorkItemKind::Task)) => true,
            _ => false,
        }
    }

    /// Validate a parent kind, surfacing the violation as an error.
    pub fn check_parent(
        self,
        parent: Option<WorkItemKind>,
    ) -> Result<(), TypeConstraintError> {
        if self.accepts_parent(parent) {
            Ok(())
        } else {
            Err(TypeConstraintError {
                kind: self,
                parent_kind: parent,
            })
        }
    }
}

impl std::fmt::Display for WorkItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            WorkItemKind::Milestone => "milestone",
            WorkItemKind::Deliverable => "deliverable",
            WorkItemKind::Task => "task",
        };
        write!(f, "{}", s)
    }
}

// ── Stored Status ────────────────────────────────────────────────────

/// Stored lifecycle status of a deliverable (and its tasks)
///
/// This is the authoritative, persisted status. Milestones never carry
/// one of these — their status is derived (see [`MilestoneStatus`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeliverableStatus {
    /// Created but no work recorded
    #[default]
    Draft,
    /// Work recorded (progress > 0)
    InProgress,
    /// Submitted to the receiving party for review
    SubmittedForReview,
    /// Review rejected; more work required before resubmission
    ReturnedForMoreWork,
    /// Review accepted; awaiting dual-party sign-off
    ReviewComplete,
    /// Both parties signed. Terminal.
    Delivered,
}

impl DeliverableStatus {
    /// Whether this status is terminal (no further transitions)
    pub fn is_terminal(self) -> bool {
        matches!(self, DeliverableStatus::Delivered)
    }
}

impl std::fmt::Display for DeliverableStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliverableStatus::Draft => "draft",
            DeliverableStatus::InProgress => "in_progress",
            DeliverableStatus::SubmittedForReview => "submitted_for_review",
            DeliverableStatus::ReturnedForMoreWork => "returned_for_more_work",
            DeliverableStatus::ReviewComplete => "review_complete",
            DeliverableStatus::Delivered => "delivered",
        };
        write!(f, "{}", s)
    }
}

// ── Derived Status ───────────────────────────────────────────────────

/// Derived status of a milestone. Never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MilestoneStatus {
    /// No deliverables, or none have recorded progress
    NotStarted,
    /// At least one deliverable has progress; not all Delivered
    InProgress,
    /// Every deliverable is Delivered
    Completed,
}

/// Read model for a milestone's derived state
///
/// Distinct from [`WorkItem`] on purpose: the type system is the guard
/// against caching these values back onto the stored row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneRollup {
    /// Derived status
    pub status: MilestoneStatus,
    /// Mean of direct deliverables' stored progress, rounded (0–100)
    pub progress: u8,
}

// ── Work Item ────────────────────────────────────────────────────────

/// A stored node in the work-item hierarchy
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkItem {
    /// Unique identifier
    pub id: WorkItemId,
    /// Milestone, Deliverable, or Task
    pub kind: WorkItemKind,
    /// Parent item. None iff kind == Milestone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<WorkItemId>,
    /// Human-readable name
    pub name: String,
    /// Planned start date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Planned end date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Stored progress 0–100. Authoritative for deliverables and tasks only.
    pub progress: u8,
    /// Stored lifecycle status (deliverables and tasks)
    pub status: DeliverableStatus,
    /// Ordinal position among siblings (0-based)
    pub position: u32,
    /// Work-breakdown path, e.g. "1.2.3". Recomputed on structural change.
    pub wbs_path: String,
    /// Link to a downstream estimate component, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimate_ref: Option<String>,
    /// Whether this item feeds billing
    pub billable: bool,
    /// Soft-delete flag. Deleted items are invisible to reads but kept
    /// while financial records reference them.
    pub deleted: bool,
    /// When the item was created
    pub created_at: DateTime<Utc>,
    /// When the item was last updated
    pub updated_at: DateTime<Utc>,
}

impl WorkItem {
    /// Create a new work item. Parent-kind validity is the Hierarchy
    /// Store's job; this constructor only shapes the record.
    pub fn new(kind: WorkItemKind, parent: Option<WorkItemId>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkItemId::generate(),
            kind,
            parent,
            name: name.into(),
            start_date: None,
            end_date: None,
            progress: 0,
            status: DeliverableStatus::Draft,
            position: 0,
            wbs_path: String::new(),
            estimate_ref: None,
            billable: false,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: WorkItemId) -> Self {
        self.id = id;
        self
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn with_estimate_ref(mut self, reference: impl Into<String>) -> Self {
        self.estimate_ref = Some(reference.into());
        self
    }

    pub fn billable(mut self) -> Self {
        self.billable = true;
        self
    }

    /// Planned duration in days, when both dates are set
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => Some((end - start).num_days()),
            _ => None,
        }
    }

    /// Whether any downstream commercial record references this item
    pub fn has_commercial_links(&self) -> bool {
        self.estimate_ref.is_some() || self.billable
    }
}

/// Caller-supplied attributes for creating or modifying a work item
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct WorkItemAttrs {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub progress: Option<u8>,
    pub estimate_ref: Option<String>,
    pub billable: Option<bool>,
}

impl WorkItemAttrs {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_dates(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress.min(100));
        self
    }

    /// Apply these attributes onto an existing item
    pub fn apply_to(&self, item: &mut WorkItem) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(start) = self.start_date {
            item.start_date = Some(start);
        }
        if let Some(end) = self.end_date {
            item.end_date = Some(end);
        }
        if let Some(progress) = self.progress {
            item.progress = progress.min(100);
            // Recording progress on a draft moves it into work
            if item.progress > 0 && item.status == DeliverableStatus::Draft {
                item.status = DeliverableStatus::InProgress;
            }
        }
        if let Some(reference) = &self.estimate_ref {
            item.estimate_ref = Some(reference.clone());
        }
        if let Some(billable) = self.billable {
            item.billable = billable;
        }
        item.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_kind_chain() {
        use WorkItemKind::*;
        assert!(Milestone.accepts_parent(None));
        assert!(!Milestone.accepts_parent(Some(Milestone)));
        assert!(Deliverable.accepts_parent(Some(Milestone)));
        assert!(!Deliverable.accepts_parent(None));
        assert!(!Deliverable.accepts_parent(Some(Deliverable)));
        assert!(Task.accepts_parent(Some(Deliverable)));
        assert!(Task.accepts_parent(Some(Task)));
        assert!(!Task.accepts_parent(Some(Milestone)));
        assert!(!Task.accepts_parent(None));
    }

    #[test]
    fn test_check_parent_reports_violation() {
        let err = WorkItemKind::Deliverable
            .check_parent(Some(WorkItemKind::Task))
            .unwrap_err();
        assert_eq!(err.kind, WorkItemKind::Deliverable);
        assert_eq!(err.parent_kind, Some(WorkItemKind::Task));
    }

    #[test]
    fn test_progress_clamped() {
        let item = WorkItem::new(WorkItemKind::Task, None, "t").with_progress(250);
        assert_eq!(item.progress, 100);
    }

    #[test]
    fn test_duration_days() {
        let item = WorkItem::new(WorkItemKind::Milestone, None, "m").with_dates(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        );
        assert_eq!(item.duration_days(), Some(14));
    }

    #[test]
    fn test_attrs_progress_promotes_draft() {
        let mut item = WorkItem::new(WorkItemKind::Deliverable, None, "d");
        assert_eq!(item.status, DeliverableStatus::Draft);
        WorkItemAttrs::default().with_progress(30).apply_to(&mut item);
        assert_eq!(item.status, DeliverableStatus::InProgress);
        assert_eq!(item.progress, 30);
    }

    #[test]
    fn test_delivered_is_terminal() {
        assert!(DeliverableStatus::Delivered.is_terminal());
        assert!(!DeliverableStatus::ReviewComplete.is_terminal());
    }

    #[test]
    fn test_serde_skips_unset_optionals() {
        let item = WorkItem::new(WorkItemKind::Milestone, None, "M");
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("parent").is_none());
        assert!(json.get("start_date").is_none());
        assert!(json.get("estimate_ref").is_none());

        let back: WorkItem = serde_json::from_value(json).unwrap();
        assert_eq!(back.id, item.id);
        assert_eq!(back.status, DeliverableStatus::Draft);
    }
}
