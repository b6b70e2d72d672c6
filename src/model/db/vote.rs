use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::crypto::VerificationDigest;

/// The only server-side evidence that a user voted: which proposal, and the
/// D2 commitment of the artifact they voted with. Never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCommitment {
    pub user_id: u32,
    pub proposal_id: u32,
    pub signature_hash: VerificationDigest,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoteCommitment {
    pub fn new(user_id: u32, proposal_id: u32, signature_hash: VerificationDigest) -> Self {
        Self {
            user_id,
            proposal_id,
            signature_hash,
            created_at: Utc::now(),
        }
    }
}
