//! Waypoint Domain Types
//!
//! Waypoint tracks project delivery as a strict hierarchy of work items
//! (milestone → deliverable → task) governed by **dual-party sign-off
//! workflows**. Nothing in a milestone's status is ever stored — it is
//! derived from its deliverables on every read.
//!
//! # Key Concepts
//!
//! - **WorkItem**: A node in the milestone/deliverable/task hierarchy,
//!   carrying a work-breakdown path ("1.2.3") computed from its position.
//! - **SignatureRecord**: The two-party approval ledger underlying every
//!   sign-off in the system. Complete iff both party slots are signed.
//! - **BaselineVersion**: An immutable snapshot of a milestone's committed
//!   scope, created only when a baseline or variation approval completes.
//! - **Variation**: A formal change request that, on approval, mutates
//!   baseline and hierarchy atomically.
//! - **AcceptanceCertificate**: The final milestone sign-off artifact,
//!   generatable only once every deliverable is Delivered.
//!
//! # Design Principles
//!
//! 1. Derived values live on read-model types, never on stored entities.
//! 2. Every status is a closed enum; there are no stringly-typed states.
//! 3. Completed approvals are immutable. Supersede, never un-sign.

#![deny(unsafe_code)]

mod baseline;
mod certificate;
mod errors;
mod events;
mod ids;
mod role;
mod signature;
mod variation;
mod view;
mod work_item;

pub use baseline::*;
pub use certificate::*;
pub use errors::*;
pub use events::*;
pub use ids::*;
pub use role::*;
pub use signature::*;
pub use variation::*;
pub use view::*;
pub use work_item::*;
