use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::crypto::VerificationDigest;
use crate::model::db::VoteCommitment;

/// A partially signed vote handed to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteSubmission {
    /// D2 of the artifact the vote was derived from.
    pub signature_hash: VerificationDigest,
    /// The serialised transaction, signed by the derived voter only.
    pub base64_tx: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteReceipt {
    pub success: bool,
    /// Absent when the vote account already existed.
    pub transaction_signature: Option<String>,
    pub message: String,
}

impl VoteReceipt {
    pub fn submitted(signature: String) -> Self {
        Self {
            success: true,
            transaction_signature: Some(signature),
            message: "Vote submitted successfully".to_string(),
        }
    }

    pub fn resumed() -> Self {
        Self {
            success: true,
            transaction_signature: None,
            message: "Vote account already exists - vote resumed successfully".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitmentView {
    pub signature_hash: VerificationDigest,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteStatus {
    pub has_voted: bool,
    pub vote: Option<CommitmentView>,
}

impl From<Option<VoteCommitment>> for VoteStatus {
    fn from(commitment: Option<VoteCommitment>) -> Self {
        Self {
            has_voted: commitment.is_some(),
            vote: commitment.map(|c| CommitmentView {
                signature_hash: c.signature_hash,
                created_at: c.created_at,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json;

    use crate::crypto::ArtifactDigest;

    #[test]
    fn submission_field_names() {
        let submission = VoteSubmission {
            signature_hash: ArtifactDigest::of(b"png").unwrap().verification_digest(),
            base64_tx: "AQID".to_string(),
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(json["base64Tx"], "AQID");
        assert_eq!(
            json["signatureHash"],
            submission.signature_hash.to_hex().as_str()
        );
    }

    #[test]
    fn status_from_commitment() {
        assert_eq!(
            VoteStatus::from(None),
            VoteStatus {
                has_voted: false,
                vote: None
            }
        );
        let digest = ArtifactDigest::of(b"png").unwrap().verification_digest();
        let status = VoteStatus::from(Some(VoteCommitment::new(42, 1, digest)));
        assert!(status.has_voted);
        assert_eq!(status.vote.unwrap().signature_hash, digest);
    }
}
