//! Waypoint Signature State Machine
//!
//! One generic dual-party approval engine serves every sign-off in the
//! system. The states are derived from the two party slots — Unsigned,
//! PartiallySigned(party), Complete — and each approval kind injects
//! its own completion side effect:
//!
//! - **Deliverable sign-off**: sets the deliverable Delivered with
//!   progress 100 (overriding any stored value).
//! - **Baseline commitment**: snapshots the next BaselineVersion.
//! - **Acceptance certificate**: marks the certificate ready-to-bill.
//! - **Variation**: re-baselines and applies the declared scope delta
//!   to the hierarchy, all-or-nothing.
//!
//! # Guarantees
//!
//! - A duplicate signature for an already-signed party fails with
//!   `AlreadySigned` and changes nothing.
//! - Every `sign` is a conditional update against the record version
//!   the caller read; concurrent writers get `StaleVersion`.
//! - Completion is monotonic: complete records are immutable and can
//!   only be superseded by opening a new record.
//! - Eligibility is checked synchronously against the permission
//!   collaborator before any slot is touched.

#![deny(unsafe_code)]

mod eligibility;
mod engine;
mod ledger;
mod review;

pub use eligibility::*;
pub use engine::*;
pub use ledger::*;
pub use review::*;
