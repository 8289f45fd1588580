//! The signature record store
//!
//! Holds every SignatureRecord and applies the generic dual-party
//! transition rules: slot monotonicity, optimistic version checks, and
//! one open record per subject. Kind-specific preconditions and side
//! effects live in the engine, not here.

use std::collections::HashMap;
use std::sync::RwLock;
use waypoint_types::{
    ApprovalSubject, Party, SignatureRecord, SignatureRecordId, UserId, WaypointError,
    WaypointResult,
};

/// Outcome of a successful sign transition
#[derive(Clone, Debug)]
pub struct SignOutcome {
    /// The record after the signature was applied
    pub record: SignatureRecord,
    /// Whether this signature completed the record
    pub completed: bool,
}

/// In-memory store of signature records
pub struct SignatureLedger {
    records: RwLock<HashMap<SignatureRecordId, SignatureRecord>>,
}

impl SignatureLedger {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Open a record for a subject, or return the one already open.
    ///
    /// Completed records never block a new opening: superseding an
    /// approval means opening a fresh record, and that is the only way
    /// a completed one is ever "changed".
    pub fn open(&self, subject: ApprovalSubject) -> WaypointResult<SignatureRecord> {
        let mut records = self
            .records
            .write()
            .map_err(|_| WaypointError::LockPoisoned)?;
        if let Some(existing) = records
            .values()
            .find(|rec| rec.subject == subject && !rec.is_complete())
        {
            return Ok(existing.clone());
        }
        let record = SignatureRecord::open(subject);
        records.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    pub fn get(&self, id: &SignatureRecordId) -> WaypointResult<SignatureRecord> {
        let records = self
            .records
            .read()
            .map_err(|_| WaypointError::LockPoisoned)?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| WaypointError::RecordNotFound(id.clone()))
    }

    /// Every record that is not yet complete
    pub fn open_records(&self) -> Vec<SignatureRecord> {
        self.records
            .read()
            .map(|records| {
                records
                    .values()
                    .filter(|rec| !rec.is_complete())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All records for one subject, oldest first (supersession history)
    pub fn history(&self, subject: &ApprovalSubject) -> Vec<SignatureRecord> {
        let mut history: Vec<SignatureRecord> = self
            .records
            .read()
            .map(|records| {
                records
                    .values()
                    .filter(|rec| rec.subject == *subject)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        history.sort_by_key(|rec| rec.created_at);
        history
    }

    /// Apply one party's signature as a conditional update against the
    /// version the caller read.
    pub fn sign(
        &self,
        id: &SignatureRecordId,
        party: Party,
        signer: UserId,
        expected_version: u64,
    ) -> WaypointResult<SignOutcome> {
        let mut records = self
            .records
            .write()
            .map_err(|_| WaypointError::LockPoisoned)?;
        let record = records
            .get_mut(id)
            .ok_or_else(|| WaypointError::RecordNotFound(id.clone()))?;

        if record.version != expected_version {
            return Err(WaypointError::StaleVersion {
                record: id.clone(),
                expected: expected_version,
                actual: record.version,
            });
        }
        let completed = record
            .apply_signature(party, signer)
            .map_err(|party| WaypointError::AlreadySigned {
                record: id.clone(),
                party,
            })?;
        Ok(SignOutcome {
            record: record.clone(),
            completed,
        })
    }
}

impl Default for SignatureLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_types::WorkItemId;

    fn subject() -> ApprovalSubject {
        ApprovalSubject::Deliverable(WorkItemId::new("d-1"))
    }

    #[test]
    fn test_open_is_idempotent_while_incomplete() {
        let ledger = SignatureLedger::new();
        let first = ledger.open(subject()).unwrap();
        let second = ledger.open(subject()).unwrap();
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn test_completed_record_can_be_superseded() {
        let ledger = SignatureLedger::new();
        let rec = ledger.open(subject()).unwrap();
        ledger
            .sign(&rec.id, Party::Providing, UserId::new("a"), 0)
            .unwrap();
        ledger
            .sign(&rec.id, Party::Receiving, UserId::new("b"), 1)
            .unwrap();

        let fresh = ledger.open(subject()).unwrap();
        assert_ne!(fresh.id, rec.id);
        assert_eq!(ledger.history(&subject()).len(), 2);
    }

    #[test]
    fn test_duplicate_sign_fails_and_preserves_record() {
        let ledger = SignatureLedger::new();
        let rec = ledger.open(subject()).unwrap();
        ledger
            .sign(&rec.id, Party::Providing, UserId::new("a"), 0)
            .unwrap();

        let err = ledger
            .sign(&rec.id, Party::Providing, UserId::new("b"), 1)
            .unwrap_err();
        assert!(matches!(err, WaypointError::AlreadySigned { .. }));

        let after = ledger.get(&rec.id).unwrap();
        assert_eq!(after.version, 1);
        assert_eq!(after.providing.signer, Some(UserId::new("a")));
    }

    #[test]
    fn test_stale_version_rejected() {
        let ledger = SignatureLedger::new();
        let rec = ledger.open(subject()).unwrap();
        ledger
            .sign(&rec.id, Party::Providing, UserId::new("a"), 0)
            .unwrap();

        // A concurrent caller still holding version 0 must re-read
        let err = ledger
            .sign(&rec.id, Party::Receiving, UserId::new("b"), 0)
            .unwrap_err();
        assert!(matches!(err, WaypointError::StaleVersion { .. }));

        // Retry with the current version succeeds
        let outcome = ledger
            .sign(&rec.id, Party::Receiving, UserId::new("b"), 1)
            .unwrap();
        assert!(outcome.completed);
    }

    #[test]
    fn test_completion_requires_both_parties() {
        let ledger = SignatureLedger::new();
        let rec = ledger.open(subject()).unwrap();
        let outcome = ledger
            .sign(&rec.id, Party::Receiving, UserId::new("b"), 0)
            .unwrap();
        assert!(!outcome.completed);
        assert!(!outcome.record.is_complete());
    }
}
