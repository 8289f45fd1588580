//! Waypoint Hierarchy Store
//!
//! Owns work-item records and parent/child links. Enforces the strict
//! Milestone → Deliverable → Task nesting chain in one place and
//! recomputes work-breakdown paths on every structural change.
//!
//! # Guarantees
//!
//! - Parent-kind violations fail with a typed error before any mutation.
//! - A subtree move is atomic: every descendant's WBS path is recomputed
//!   in the same operation.
//! - Structural mutations within one root milestone's subtree are
//!   serialized by a per-root lock. Reads take no such lock.
//! - Items are soft-deleted, never hard-removed, while commercial
//!   records reference them.

#![deny(unsafe_code)]

mod projection;
mod store;
mod wbs;

pub use projection::*;
pub use store::*;
