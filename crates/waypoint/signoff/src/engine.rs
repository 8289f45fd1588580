//! The sign-off engine: opens approvals, accepts signatures, and runs
//! each approval kind's completion side effect.
//!
//! Side-effect ordering keeps the variation two-step safe: the scope
//! delta is validated before the completing signature is accepted,
//! applied all-or-nothing, and only then is the baseline snapshotted —
//! so a failure can never leave a baseline without its hierarchy
//! change. `retry_completion` recovers the one remaining window (a
//! completed record whose side effect was interrupted), idempotently.

use crate::{SignatureLedger, SignerEligibility};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::info;
use waypoint_hierarchy::HierarchyStore;
use waypoint_types::{
    AcceptanceCertificate, ApprovalSubject, BaselineOrigin, BaselineVersion, CertificateId,
    CertificateStatus, DeliverableStatus, DeliveryEvent, Party, RecordedEvent, SignatureRecord,
    SignatureRecordId, UserId, Variation, VariationId, WaypointError, WaypointResult, WorkItemId,
    WorkItemKind,
};

/// Dual-party approval engine over one project's hierarchy
pub struct SignoffEngine {
    hierarchy: Arc<HierarchyStore>,
    directory: Arc<dyn SignerEligibility>,
    ledger: SignatureLedger,
    baselines: RwLock<HashMap<WorkItemId, Vec<BaselineVersion>>>,
    certificates: RwLock<HashMap<CertificateId, AcceptanceCertificate>>,
    variations: RwLock<HashMap<VariationId, Variation>>,
    events: RwLock<Vec<RecordedEvent>>,
}

impl SignoffEngine {
    pub fn new(hierarchy: Arc<HierarchyStore>, directory: Arc<dyn SignerEligibility>) -> Self {
        Self {
            hierarchy,
            directory,
            ledger: SignatureLedger::new(),
            baselines: RwLock::new(HashMap::new()),
            certificates: RwLock::new(HashMap::new()),
            variations: RwLock::new(HashMap::new()),
            events: RwLock::new(Vec::new()),
        }
    }

    // ── Opening approvals ────────────────────────────────────────────

    /// Open the dual-party sign-off for a deliverable. The deliverable
    /// must already be ReviewComplete.
    pub fn open_deliverable_signoff(
        &self,
        deliverable_id: &WorkItemId,
    ) -> WaypointResult<SignatureRecord> {
        self.check_deliverable_signable(deliverable_id)?;
        self.ledger
            .open(ApprovalSubject::Deliverable(deliverable_id.clone()))
    }

    /// Open a baseline commitment for a milestone
    pub fn open_baseline_commitment(
        &self,
        milestone_id: &WorkItemId,
    ) -> WaypointResult<SignatureRecord> {
        let item = self.hierarchy.get(milestone_id)?;
        if item.kind != WorkItemKind::Milestone {
            return Err(WaypointError::WrongKind {
                item: milestone_id.clone(),
                actual: item.kind,
                expected: WorkItemKind::Milestone,
            });
        }
        self.ledger
            .open(ApprovalSubject::Milestone(milestone_id.clone()))
    }

    /// Register a change request so it can be approved later
    pub fn raise_variation(&self, variation: Variation) -> WaypointResult<Variation> {
        // The milestone must exist; the ops are validated at sign time
        // against the hierarchy as it is then.
        self.hierarchy.get(&variation.milestone_id)?;
        let mut variations = self
            .variations
            .write()
            .map_err(|_| WaypointError::LockPoisoned)?;
        variations.insert(variation.id.clone(), variation.clone());
        Ok(variation)
    }

    /// Open the dual-party approval for a raised variation
    pub fn open_variation_approval(&self, id: &VariationId) -> WaypointResult<SignatureRecord> {
        self.variation(id)?;
        self.ledger.open(ApprovalSubject::Variation(id.clone()))
    }

    // ── Certificates ─────────────────────────────────────────────────

    /// Whether an acceptance certificate may be generated: every
    /// deliverable under the milestone must be Delivered.
    pub fn can_generate_certificate(&self, milestone_id: &WorkItemId) -> WaypointResult<bool> {
        Ok(self.undelivered_count(milestone_id)?.is_none())
    }

    /// Generate the acceptance certificate (status Draft, zero
    /// signatures). Returns the existing draft when one is already
    /// open for the milestone.
    pub fn generate_certificate(
        &self,
        milestone_id: &WorkItemId,
    ) -> WaypointResult<AcceptanceCertificate> {
        if let Some(undelivered) = self.undelivered_count(milestone_id)? {
            return Err(WaypointError::CertificateNotReady {
                milestone: milestone_id.clone(),
                undelivered,
            });
        }
        let mut certificates = self
            .certificates
            .write()
            .map_err(|_| WaypointError::LockPoisoned)?;
        if let Some(existing) = certificates
            .values()
            .find(|cert| cert.milestone_id == *milestone_id && cert.status == CertificateStatus::Draft)
        {
            return Ok(existing.clone());
        }
        let certificate = AcceptanceCertificate::draft(milestone_id.clone());
        certificates.insert(certificate.id.clone(), certificate.clone());
        info!(milestone = %milestone_id, certificate = %certificate.id, "acceptance certificate generated");
        Ok(certificate)
    }

    /// Open the dual-party sign-off for a generated certificate
    pub fn open_certificate_signoff(
        &self,
        certificate_id: &CertificateId,
    ) -> WaypointResult<SignatureRecord> {
        self.certificate(certificate_id)?;
        self.ledger
            .open(ApprovalSubject::Certificate(certificate_id.clone()))
    }

    // ── Signing ──────────────────────────────────────────────────────

    /// Apply one party's signature to an open record.
    ///
    /// `expected_version` is the record version the caller read; a
    /// mismatch fails with `StaleVersion` and must be retried after a
    /// re-read. When the signature completes the record, the approval
    /// kind's side effect runs before this returns.
    pub fn sign(
        &self,
        record_id: &SignatureRecordId,
        party: Party,
        signer: UserId,
        expected_version: u64,
    ) -> WaypointResult<SignatureRecord> {
        let record = self.ledger.get(record_id)?;
        let approval = record.approval();

        let role = self
            .directory
            .role_for(&signer)
            .ok_or_else(|| WaypointError::NotEligible {
                signer: signer.to_string(),
                party,
                approval,
            })?;
        if !self.directory.is_eligible_signer(&role, approval, party) {
            return Err(WaypointError::NotEligible {
                signer: signer.to_string(),
                party,
                approval,
            });
        }

        // Kind preconditions, including refusing to accept a completing
        // signature whose side effect is known to fail.
        self.check_sign_preconditions(&record, party)?;

        let outcome = self
            .ledger
            .sign(record_id, party, signer.clone(), expected_version)?;
        info!(record = %record_id, subject = %outcome.record.subject, party = %party, "record signed");
        self.record(DeliveryEvent::Signed {
            record: record_id.clone(),
            subject: outcome.record.subject.clone(),
            party,
            signer,
        });

        if outcome.completed {
            self.run_completion(&outcome.record)?;
            info!(record = %record_id, subject = %outcome.record.subject, "approval complete");
            self.record(DeliveryEvent::Completed {
                record: record_id.clone(),
                subject: outcome.record.subject.clone(),
            });
        }
        Ok(outcome.record)
    }

    /// Re-run the completion side effect of an already-complete record.
    ///
    /// Side effects are idempotent from their recorded outcomes, so
    /// this is safe to call after an interruption between a record
    /// completing and its side effect committing.
    pub fn retry_completion(&self, record_id: &SignatureRecordId) -> WaypointResult<()> {
        let record = self.ledger.get(record_id)?;
        if !record.is_complete() {
            return Ok(());
        }
        self.run_completion(&record)
    }

    // ── Reads ────────────────────────────────────────────────────────

    pub fn record_by_id(&self, id: &SignatureRecordId) -> WaypointResult<SignatureRecord> {
        self.ledger.get(id)
    }

    /// Every record still awaiting at least one signature
    pub fn open_records(&self) -> Vec<SignatureRecord> {
        self.ledger.open_records()
    }

    /// Supersession history for one subject, oldest first
    pub fn record_history(&self, subject: &ApprovalSubject) -> Vec<SignatureRecord> {
        self.ledger.history(subject)
    }

    /// Baseline versions for a milestone, in version order
    pub fn baselines_for(&self, milestone_id: &WorkItemId) -> Vec<BaselineVersion> {
        self.baselines
            .read()
            .ok()
            .and_then(|map| map.get(milestone_id).cloned())
            .unwrap_or_default()
    }

    pub fn latest_baseline(&self, milestone_id: &WorkItemId) -> Option<BaselineVersion> {
        self.baselines_for(milestone_id).into_iter().last()
    }

    pub fn certificate(&self, id: &CertificateId) -> WaypointResult<AcceptanceCertificate> {
        let certificates = self
            .certificates
            .read()
            .map_err(|_| WaypointError::LockPoisoned)?;
        certificates
            .get(id)
            .cloned()
            .ok_or_else(|| WaypointError::CertificateNotFound(id.clone()))
    }

    pub fn certificate_for_milestone(
        &self,
        milestone_id: &WorkItemId,
    ) -> Option<AcceptanceCertificate> {
        self.certificates
            .read()
            .ok()
            .and_then(|certificates| {
                certificates
                    .values()
                    .find(|cert| cert.milestone_id == *milestone_id)
                    .cloned()
            })
    }

    pub fn variation(&self, id: &VariationId) -> WaypointResult<Variation> {
        let variations = self
            .variations
            .read()
            .map_err(|_| WaypointError::LockPoisoned)?;
        variations
            .get(id)
            .cloned()
            .ok_or_else(|| WaypointError::VariationNotFound(id.clone()))
    }

    /// The audit record of signature events, oldest first
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.read().map(|e| e.clone()).unwrap_or_default()
    }

    /// The permission collaborator this engine consults
    pub fn directory(&self) -> &Arc<dyn SignerEligibility> {
        &self.directory
    }

    // ── Internals ────────────────────────────────────────────────────

    fn check_sign_preconditions(
        &self,
        record: &SignatureRecord,
        party: Party,
    ) -> WaypointResult<()> {
        match &record.subject {
            ApprovalSubject::Deliverable(id) => self.check_deliverable_signable(id),
            ApprovalSubject::Milestone(_) => Ok(()),
            ApprovalSubject::Certificate(id) => {
                self.certificate(id)?;
                Ok(())
            }
            ApprovalSubject::Variation(id) => {
                // If this signature completes the record, its side
                // effect must be applicable right now. Ops already
                // applied (a completion being re-run) need no re-check.
                let completes = record.slot(party.other()).signed;
                if completes {
                    let variation = self.variation(id)?;
                    if !self.hierarchy.variation_applied(id)? {
                        self.hierarchy
                            .check_variation_ops(&variation.milestone_id, &variation.ops)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn check_deliverable_signable(&self, id: &WorkItemId) -> WaypointResult<()> {
        let item = self.hierarchy.get(id)?;
        if item.kind != WorkItemKind::Deliverable {
            return Err(WaypointError::WrongKind {
                item: id.clone(),
                actual: item.kind,
                expected: WorkItemKind::Deliverable,
            });
        }
        if item.status != DeliverableStatus::ReviewComplete {
            return Err(WaypointError::InvalidStatus {
                item: id.clone(),
                status: item.status.to_string(),
                required: DeliverableStatus::ReviewComplete.to_string(),
            });
        }
        Ok(())
    }

    fn run_completion(&self, record: &SignatureRecord) -> WaypointResult<()> {
        match &record.subject {
            ApprovalSubject::Deliverable(id) => {
                // Delivery overrides any stored progress value
                self.hierarchy.set_status(id, DeliverableStatus::Delivered)?;
                self.hierarchy.set_progress(id, 100)?;
                Ok(())
            }
            ApprovalSubject::Milestone(id) => {
                self.create_baseline(id, BaselineOrigin::Commitment)
            }
            ApprovalSubject::Certificate(id) => {
                let mut certificates = self
                    .certificates
                    .write()
                    .map_err(|_| WaypointError::LockPoisoned)?;
                let certificate = certificates
                    .get_mut(id)
                    .ok_or_else(|| WaypointError::CertificateNotFound(id.clone()))?;
                if certificate.status != CertificateStatus::ReadyToBill {
                    certificate.mark_ready_to_bill();
                }
                Ok(())
            }
            ApprovalSubject::Variation(id) => {
                let variation = self.variation(id)?;
                let origin = BaselineOrigin::Variation(id.clone());
                let milestone = self.hierarchy.get(&variation.milestone_id)?;

                // The baselines guard is held across both steps, and
                // the ops apply exactly once per variation, so a re-run
                // of this side effect can neither double-apply the ops
                // nor snapshot a second baseline.
                let mut baselines = self
                    .baselines
                    .write()
                    .map_err(|_| WaypointError::LockPoisoned)?;
                let versions = baselines.entry(variation.milestone_id.clone()).or_default();
                if versions.iter().any(|baseline| baseline.origin == origin) {
                    return Ok(());
                }
                // Ops first (all-or-nothing); nothing fallible remains
                // between their commit and the snapshot below.
                let deliverables = self.hierarchy.apply_variation_ops(
                    &variation.id,
                    &variation.milestone_id,
                    &variation.ops,
                )?;
                let number = versions.len() as u32 + 1;
                versions.push(BaselineVersion::snapshot(
                    variation.milestone_id.clone(),
                    number,
                    milestone.name,
                    milestone.start_date,
                    milestone.end_date,
                    deliverables.into_iter().map(|d| d.id).collect(),
                    origin,
                ));
                info!(milestone = %variation.milestone_id, version = number, "baseline snapshotted");
                Ok(())
            }
        }
    }

    fn create_baseline(
        &self,
        milestone_id: &WorkItemId,
        origin: BaselineOrigin,
    ) -> WaypointResult<()> {
        let milestone = self.hierarchy.get(milestone_id)?;
        let deliverable_ids = self
            .hierarchy
            .children(milestone_id)?
            .into_iter()
            .filter(|child| child.kind == WorkItemKind::Deliverable)
            .map(|child| child.id)
            .collect();

        let mut baselines = self
            .baselines
            .write()
            .map_err(|_| WaypointError::LockPoisoned)?;
        let versions = baselines.entry(milestone_id.clone()).or_default();
        let number = versions.len() as u32 + 1;
        versions.push(BaselineVersion::snapshot(
            milestone_id.clone(),
            number,
            milestone.name,
            milestone.start_date,
            milestone.end_date,
            deliverable_ids,
            origin,
        ));
        info!(milestone = %milestone_id, version = number, "baseline snapshotted");
        Ok(())
    }

    /// None when every deliverable is Delivered and there is at least
    /// one; otherwise the count not yet Delivered.
    fn undelivered_count(&self, milestone_id: &WorkItemId) -> WaypointResult<Option<usize>> {
        let item = self.hierarchy.get(milestone_id)?;
        if item.kind != WorkItemKind::Milestone {
            return Err(WaypointError::WrongKind {
                item: milestone_id.clone(),
                actual: item.kind,
                expected: WorkItemKind::Milestone,
            });
        }
        let deliverables: Vec<_> = self
            .hierarchy
            .children(milestone_id)?
            .into_iter()
            .filter(|child| child.kind == WorkItemKind::Deliverable)
            .collect();
        if deliverables.is_empty() {
            // Nothing to accept; a certificate would bill empty scope
            return Ok(Some(0));
        }
        let undelivered = deliverables
            .iter()
            .filter(|d| d.status != DeliverableStatus::Delivered)
            .count();
        Ok((undelivered > 0).then_some(undelivered))
    }

    fn record(&self, event: DeliveryEvent) {
        if let Ok(mut events) = self.events.write() {
            events.push(RecordedEvent::now(event));
        }
    }
}
