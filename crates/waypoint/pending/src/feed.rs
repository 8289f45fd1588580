//! External status feeds
//!
//! Timesheets, expenses, and similar satellite systems report their
//! own submitted items. The aggregator surfaces their entries verbatim
//! and never re-derives their state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use waypoint_types::UserId;

/// A feed category failed to answer
#[derive(Debug, Error)]
#[error("status feed '{category}' failed: {reason}")]
pub struct FeedError {
    pub category: String,
    pub reason: String,
}

impl FeedError {
    pub fn new(category: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            reason: reason.into(),
        }
    }
}

/// One submitted item reported by a feed, passed through untouched
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEntry {
    /// The feed category that produced the entry
    pub category: String,
    /// The feed's own identifier for the item
    pub reference: String,
    /// Short human-readable summary
    pub summary: String,
}

/// A source of submitted items awaiting the user's attention
pub trait StatusFeed: Send + Sync {
    /// The category name, used for logging and on each entry
    fn category(&self) -> &str;

    /// Items this feed considers submitted and awaiting the user
    fn submitted(&self, user: &UserId) -> Result<Vec<FeedEntry>, FeedError>;
}
