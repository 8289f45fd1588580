//! Waypoint Workflow Aggregator
//!
//! A read-side projection answering "what is awaiting my action".
//! Scans the open signature records and emits one pending item per
//! record whose missing party the caller may sign for. Raw submitted
//! statuses from external feeds (timesheets, expenses) are surfaced
//! as-is alongside, and a failing feed category is logged and omitted
//! rather than failing the whole read.
//!
//! This crate never writes: signing still goes through the sign-off
//! engine, which re-checks eligibility itself.

#![deny(unsafe_code)]

mod aggregator;
mod feed;

pub use aggregator::*;
pub use feed::*;
