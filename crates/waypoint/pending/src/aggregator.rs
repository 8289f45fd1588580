//! The pending-items projection

use crate::{FeedEntry, StatusFeed};
use std::sync::Arc;
use tracing::warn;
use waypoint_signoff::SignoffEngine;
use waypoint_types::{ApprovalKind, ApprovalSubject, Party, Role, SignatureRecordId, UserId};

/// What the caller is being asked to do
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PendingAction {
    /// First signature on an unsigned record
    Sign,
    /// Second signature on a partially signed record
    Countersign,
}

/// One approval awaiting the caller's signature
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct PendingItem {
    /// The record awaiting a signature
    pub record: SignatureRecordId,
    /// The approval kind
    pub approval: ApprovalKind,
    /// The entity being approved
    pub subject: ApprovalSubject,
    /// Sign or countersign
    pub required_action: PendingAction,
    /// The party slot the caller would fill
    pub required_party: Party,
}

/// Read-only view over open records and external feeds
pub struct PendingBoard {
    engine: Arc<SignoffEngine>,
    feeds: Vec<Arc<dyn StatusFeed>>,
}

impl PendingBoard {
    pub fn new(engine: Arc<SignoffEngine>) -> Self {
        Self {
            engine,
            feeds: Vec::new(),
        }
    }

    /// Register an external feed category
    pub fn with_feed(mut self, feed: Arc<dyn StatusFeed>) -> Self {
        self.feeds.push(feed);
        self
    }

    /// Every open record the caller's role may sign for, one item per
    /// record. A record unsigned on both slots yields at most one item
    /// (the first party the role is eligible for).
    pub fn pending_for(&self, _user: &UserId, role: &Role) -> Vec<PendingItem> {
        let directory = self.engine.directory();
        let mut items = Vec::new();
        for record in self.engine.open_records() {
            let approval = record.approval();
            for party in [Party::Providing, Party::Receiving] {
                if record.slot(party).signed {
                    continue;
                }
                if !directory.is_eligible_signer(role, approval, party) {
                    continue;
                }
                let required_action = if record.version == 0 {
                    PendingAction::Sign
                } else {
                    PendingAction::Countersign
                };
                items.push(PendingItem {
                    record: record.id.clone(),
                    approval,
                    subject: record.subject.clone(),
                    required_action,
                    required_party: party,
                });
                break;
            }
        }
        items.sort_by(|a, b| a.record.cmp(&b.record));
        items
    }

    /// Submitted items from every registered feed. A failing category
    /// is logged and omitted; the remaining categories still answer.
    pub fn submitted_for(&self, user: &UserId) -> Vec<FeedEntry> {
        let mut entries = Vec::new();
        for feed in &self.feeds {
            match feed.submitted(user) {
                Ok(mut batch) => entries.append(&mut batch),
                Err(err) => {
                    warn!(category = feed.category(), error = %err, "status feed unavailable, omitting category");
                }
            }
        }
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FeedError;
    use waypoint_hierarchy::HierarchyStore;
    use waypoint_signoff::{accept_review, submit_for_review, StaticDirectory};
    use waypoint_types::{WorkItemAttrs, WorkItemId, WorkItemKind};

    fn alice() -> UserId {
        UserId::new("alice")
    }

    fn bob() -> UserId {
        UserId::new("bob")
    }

    fn make_board() -> (Arc<HierarchyStore>, Arc<SignoffEngine>, PendingBoard) {
        let store = Arc::new(HierarchyStore::new());
        let directory = StaticDirectory::new()
            .assign(alice(), Role::new("supplier_pm"))
            .assign(bob(), Role::new("client_pm"))
            .permit_all(Party::Providing, Role::new("supplier_pm"))
            .permit_all(Party::Receiving, Role::new("client_pm"));
        let engine = Arc::new(SignoffEngine::new(store.clone(), Arc::new(directory)));
        let board = PendingBoard::new(engine.clone());
        (store, engine, board)
    }

    fn make_reviewed_deliverable(store: &HierarchyStore) -> WorkItemId {
        let m = store
            .create_item(WorkItemKind::Milestone, None, WorkItemAttrs::named("M"))
            .unwrap();
        let d = store
            .create_item(
                WorkItemKind::Deliverable,
                Some(&m.id),
                WorkItemAttrs::named("D").with_progress(80),
            )
            .unwrap();
        submit_for_review(store, &d.id).unwrap();
        accept_review(store, &d.id).unwrap();
        d.id
    }

    #[test]
    fn test_pending_tracks_the_missing_party() {
        let (store, engine, board) = make_board();
        let d = make_reviewed_deliverable(&store);
        let rec = engine.open_deliverable_signoff(&d).unwrap();

        // Unsigned: each side sees its own slot to sign
        let supplier = board.pending_for(&alice(), &Role::new("supplier_pm"));
        assert_eq!(supplier.len(), 1);
        assert_eq!(supplier[0].required_party, Party::Providing);
        assert_eq!(supplier[0].required_action, PendingAction::Sign);

        engine.sign(&rec.id, Party::Providing, alice(), 0).unwrap();

        // Partially signed: only the missing party still sees it
        assert!(board
            .pending_for(&alice(), &Role::new("supplier_pm"))
            .is_empty());
        let client = board.pending_for(&bob(), &Role::new("client_pm"));
        assert_eq!(client.len(), 1);
        assert_eq!(client[0].required_party, Party::Receiving);
        assert_eq!(client[0].required_action, PendingAction::Countersign);

        engine.sign(&rec.id, Party::Receiving, bob(), 1).unwrap();
        assert!(board
            .pending_for(&bob(), &Role::new("client_pm"))
            .is_empty());
    }

    #[test]
    fn test_ineligible_role_sees_nothing() {
        let (store, engine, board) = make_board();
        let d = make_reviewed_deliverable(&store);
        engine.open_deliverable_signoff(&d).unwrap();

        assert!(board
            .pending_for(&UserId::new("carol"), &Role::new("observer"))
            .is_empty());
    }

    struct FixedFeed {
        category: &'static str,
        entries: Vec<FeedEntry>,
    }

    impl StatusFeed for FixedFeed {
        fn category(&self) -> &str {
            self.category
        }

        fn submitted(&self, _user: &UserId) -> Result<Vec<FeedEntry>, FeedError> {
            Ok(self.entries.clone())
        }
    }

    struct BrokenFeed;

    impl StatusFeed for BrokenFeed {
        fn category(&self) -> &str {
            "expenses"
        }

        fn submitted(&self, _user: &UserId) -> Result<Vec<FeedEntry>, FeedError> {
            Err(FeedError::new("expenses", "upstream timeout"))
        }
    }

    #[test]
    fn test_failing_feed_category_is_omitted() {
        let (_store, engine, _) = make_board();
        let entry = FeedEntry {
            category: "timesheets".into(),
            reference: "ts-7".into(),
            summary: "Week 34 timesheet".into(),
        };
        let board = PendingBoard::new(engine)
            .with_feed(Arc::new(FixedFeed {
                category: "timesheets",
                entries: vec![entry.clone()],
            }))
            .with_feed(Arc::new(BrokenFeed));

        let submitted = board.submitted_for(&alice());
        assert_eq!(submitted, vec![entry]);
    }
}
