//! API-compatible types.
//!
//! The types in this module are serialised in an API-friendly way, e.g.:
//!
//! - Keys are serialised as base58 strings, digests as lowercase hex.
//! - Datetimes are serialised as RFC 3339 strings.
//!
//! They are shared by the HTTP routes and the HTTP clients in `pipeline`.

use serde::{Deserialize, Serialize};

pub mod proposal;
pub mod vote;
pub mod wallet;

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorBody {
    /// The most specific text available.
    pub fn message(&self) -> &str {
        self.details.as_deref().unwrap_or(&self.error)
    }
}
