//! Safety recall entries
//!
//! Attached to a resolved record by the best-effort recall side channel;
//! arrival after the record was first returned to the caller is expected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single product safety recall notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallEntry {
    /// Recall notice title as published
    pub title: String,
    /// Issuing authority (e.g. "FSANZ")
    pub authority: String,
    /// Reason for the recall (e.g. "undeclared allergen: milk")
    pub hazard: Option<String>,
    /// Publication date of the notice
    pub published: Option<DateTime<Utc>>,
    /// Link to the full notice
    pub url: Option<String>,
}
