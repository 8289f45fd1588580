//! Roles: who may sign as which party
//!
//! Role assignment lives in the permission collaborator, not here.
//! This type only names roles so the sign-off engine and the pending
//! aggregator can ask that collaborator the same question.

use serde::{Deserialize, Serialize};

/// A named role within a project (e.g. "project_manager",
/// "client_representative")
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Role(pub String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
