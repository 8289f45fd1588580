//! Identifiers for Waypoint entities
//!
//! All IDs are string newtypes. `generate()` mints a UUID-backed id;
//! `new()` accepts externally assigned ids (imports, fixtures).

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn generate() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The first eight characters, for log-friendly display.
            /// Counts characters, not bytes, so externally assigned
            /// multibyte ids do not split mid-character.
            pub fn short(&self) -> &str {
                match self.0.char_indices().nth(8) {
                    Some((index, _)) => &self.0[..index],
                    None => &self.0,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Unique identifier for a work item (milestone, deliverable, or task)
    WorkItemId
}

string_id! {
    /// Unique identifier for a signature record
    SignatureRecordId
}

string_id! {
    /// Unique identifier for a variation (change request)
    VariationId
}

string_id! {
    /// Unique identifier for an acceptance certificate
    CertificateId
}

string_id! {
    /// Identity of a user acting in the system (signer, initiator)
    UserId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_unique() {
        assert_ne!(WorkItemId::generate(), WorkItemId::generate());
    }

    #[test]
    fn test_short_truncates() {
        let id = WorkItemId::new("abcdefghijkl");
        assert_eq!(id.short(), "abcdefgh");
        let tiny = WorkItemId::new("abc");
        assert_eq!(tiny.short(), "abc");
    }

    #[test]
    fn test_short_respects_char_boundaries() {
        let id = WorkItemId::new("проект-альфа");
        assert_eq!(id.short(), "проект-а");
        let exact = WorkItemId::new("проект-а");
        assert_eq!(exact.short(), "проект-а");
    }

    #[test]
    fn test_display_round_trip() {
        let id = UserId::new("reviewer-1");
        assert_eq!(id.to_string(), "reviewer-1");
    }
}
