use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chain::{base58, Pubkey};
use crate::crypto::{IntegrityStatus, ProposalContentDigest};
use crate::model::db::{Proposal, User};

/// The public face of a proposal's author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorView {
    pub id: u32,
    pub username: String,
    #[serde(default, with = "base58::option")]
    pub wallet_address: Option<Pubkey>,
}

impl From<User> for AuthorView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            wallet_address: user.wallet_address,
        }
    }
}

/// One entry of the proposal listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalSummary {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub choices: Vec<String>,
    pub hash: ProposalContentDigest,
    #[serde(default, with = "base58::option")]
    pub pda: Option<Pubkey>,
    pub created_at: DateTime<Utc>,
    pub author: AuthorView,
    pub vote_count: u64,
}

impl ProposalSummary {
    pub fn new(proposal: Proposal, author: AuthorView, vote_count: u64) -> Self {
        Self {
            id: proposal.id,
            name: proposal.content.name,
            description: non_empty(proposal.content.description),
            choices: proposal.content.choices,
            hash: proposal.hash,
            pda: proposal.pda,
            created_at: proposal.created_at,
            author,
            vote_count,
        }
    }

    /// Label of the choice at `index`, if the proposal has one.
    pub fn choice_label(&self, index: u8) -> Option<&str> {
        self.choices.get(index as usize).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalList {
    pub success: bool,
    pub proposals: Vec<ProposalSummary>,
}

/// A single proposal, with the key voters must use as fee payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDetail {
    pub id: u32,
    pub name: String,
    pub description: Option<String>,
    pub choices: Vec<String>,
    pub hash: ProposalContentDigest,
    #[serde(rename = "payerPubkey", with = "base58")]
    pub payer_pubkey: Pubkey,
    #[serde(default, with = "base58::option")]
    pub pda: Option<Pubkey>,
    pub author: AuthorView,
}

impl ProposalDetail {
    pub fn new(proposal: Proposal, payer_pubkey: Pubkey, author: AuthorView) -> Self {
        Self {
            id: proposal.id,
            name: proposal.content.name,
            description: non_empty(proposal.content.description),
            choices: proposal.content.choices,
            hash: proposal.hash,
            payer_pubkey,
            pda: proposal.pda,
            author,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedProposal {
    pub success: bool,
    pub proposal: ProposalDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeResponse {
    pub success: bool,
    #[serde(with = "base58")]
    pub pda: Pubkey,
}

/// Result of re-hashing a stored proposal against its anchored account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub status: IntegrityStatus,
    pub stored_hash: ProposalContentDigest,
    pub computed_hash: ProposalContentDigest,
    pub on_chain_hash: ProposalContentDigest,
}

fn non_empty(text: String) -> Option<String> {
    (!text.is_empty()).then_some(text)
}
