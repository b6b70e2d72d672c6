use base64::{engine::general_purpose::STANDARD as B64, Engine};
use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};
use solana_sdk::signer::keypair::keypair_from_seed;
use thiserror::Error;

use crate::chain::{base58, Keypair, Pubkey, Signer};
use crate::crypto::{ProposalContent, ProposalContentDigest};

/// Secret and public halves of an Ed25519 keypair.
pub const KEYPAIR_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayerKeyError {
    #[error("stored payer key is not base64: {0}")]
    Base64(String),
    #[error("stored payer key has {0} bytes, expected {}", KEYPAIR_LENGTH)]
    Length(usize),
    #[error("stored payer key is inconsistent")]
    Inconsistent,
}

/// A proposal as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    #[serde(rename = "_id")]
    pub id: u32,
    pub author_id: u32,
    /// Fee payer keypair, base64 of the 64 keypair bytes. Never leaves the server.
    pub payer: String,
    #[serde(flatten)]
    pub content: ProposalContent,
    /// Content digest at creation time.
    pub hash: ProposalContentDigest,
    /// Address of the anchored on-chain account, once finalized.
    #[serde(default, with = "base58::option")]
    pub pda: Option<Pubkey>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Proposal {
    /// Create a new, unfinalized proposal with a freshly generated fee payer.
    pub fn new(id: u32, author_id: u32, content: ProposalContent) -> Self {
        Self {
            id,
            author_id,
            payer: B64.encode(Keypair::new().to_bytes()),
            hash: content.digest(),
            content,
            pda: None,
            created_at: Utc::now(),
        }
    }

    pub fn payer_keypair(&self) -> Result<Keypair, PayerKeyError> {
        let bytes = B64
            .decode(&self.payer)
            .map_err(|e| PayerKeyError::Base64(e.to_string()))?;
        if bytes.len() != KEYPAIR_LENGTH {
            return Err(PayerKeyError::Length(bytes.len()));
        }
        let (secret, public) = bytes.split_at(KEYPAIR_LENGTH / 2);
        let keypair = keypair_from_seed(secret).map_err(|_| PayerKeyError::Inconsistent)?;
        if keypair.pubkey().as_ref() != public {
            return Err(PayerKeyError::Inconsistent);
        }
        Ok(keypair)
    }

    pub fn payer_pubkey(&self) -> Result<Pubkey, PayerKeyError> {
        self.payer_keypair().map(|key| key.pubkey())
    }

    pub fn is_finalized(&self) -> bool {
        self.pda.is_some()
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Proposal {
        pub fn example() -> Self {
            Self::new(1, 42, ProposalContent::example())
        }
    }
}
