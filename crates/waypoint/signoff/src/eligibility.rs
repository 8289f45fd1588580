//! The permission collaborator seam
//!
//! Role assignment and party eligibility live outside this core. The
//! engine asks two questions, synchronously, before accepting any
//! signature; the pending aggregator asks the same questions to decide
//! whose action an open record awaits.

use std::collections::HashMap;
use waypoint_types::{ApprovalKind, Party, Role, UserId};

/// Answers "who is this user" and "may this role sign here"
pub trait SignerEligibility: Send + Sync {
    /// The caller's role within the project, if any
    fn role_for(&self, user: &UserId) -> Option<Role>;

    /// Whether a role may sign as the given party for the given
    /// approval kind
    fn is_eligible_signer(&self, role: &Role, approval: ApprovalKind, party: Party) -> bool;
}

/// A fixed role directory, sufficient for tests and single-node
/// deployments without an external permission service
#[derive(Clone, Debug, Default)]
pub struct StaticDirectory {
    roles: HashMap<UserId, Role>,
    permits: HashMap<(ApprovalKind, Party), Vec<Role>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a role to a user
    pub fn assign(mut self, user: UserId, role: Role) -> Self {
        self.roles.insert(user, role);
        self
    }

    /// Allow a role to sign as a party for an approval kind
    pub fn permit(mut self, approval: ApprovalKind, party: Party, role: Role) -> Self {
        self.permits.entry((approval, party)).or_default().push(role);
        self
    }

    /// Allow a role to sign as a party for every approval kind
    pub fn permit_all(mut self, party: Party, role: Role) -> Self {
        for approval in [
            ApprovalKind::DeliverableSignoff,
            ApprovalKind::BaselineCommitment,
            ApprovalKind::AcceptanceCertificate,
            ApprovalKind::Variation,
        ] {
            self = self.permit(approval, party, role.clone());
        }
        self
    }
}

impl SignerEligibility for StaticDirectory {
    fn role_for(&self, user: &UserId) -> Option<Role> {
        self.roles.get(user).cloned()
    }

    fn is_eligible_signer(&self, role: &Role, approval: ApprovalKind, party: Party) -> bool {
        self.permits
            .get(&(approval, party))
            .is_some_and(|roles| roles.contains(role))
    }
}
