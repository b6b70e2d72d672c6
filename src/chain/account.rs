//! Accounts owned by the voting program. Each starts with the anchor
//! discriminator of its type followed by the borsh-encoded fields.

use anchor_lang::solana_program::pubkey::Pubkey;
use anchor_lang::{account, AccountDeserialize, AnchorDeserialize, AnchorSerialize};
use thiserror::Error;

use crate::crypto::ProposalContentDigest;

pub const DISCRIMINATOR_LEN: usize = 8;

/// Offset of the voter key inside a vote account: discriminator, then bump.
pub const VOTER_OFFSET: usize = DISCRIMINATOR_LEN + 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("not a valid {account} account: {reason}")]
pub struct AccountError {
    pub account: &'static str,
    pub reason: String,
}

/// Decode account data, checking the discriminator first. Data past the
/// declared fields is allowed, as accounts may be over-allocated.
fn decode<T: AccountDeserialize>(account: &'static str, data: &[u8]) -> Result<T, AccountError> {
    T::try_deserialize(&mut &data[..]).map_err(|e| AccountError {
        account,
        reason: e.to_string(),
    })
}

/// An anchored proposal.
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Proposal {
    pub bump: u8,
    pub author: Pubkey,
    /// The only key allowed to pay for votes on this proposal.
    pub payer: Pubkey,
    pub uri: String,
    pub hash: [u8; 32],
}

impl Proposal {
    pub fn decode(data: &[u8]) -> Result<Self, AccountError> {
        decode("proposal", data)
    }

    pub fn content_digest(&self) -> ProposalContentDigest {
        ProposalContentDigest::from_bytes(self.hash)
    }
}

/// A cast vote. Created once per (proposal, voter) pair.
#[account]
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Vote {
    pub bump: u8,
    pub voter: Pubkey,
    pub proposal_id: Pubkey,
    /// Index into the proposal's choices.
    pub choice: u8,
}

impl Vote {
    /// Allocated size on chain.
    pub const LEN: usize = DISCRIMINATOR_LEN + 1 + 32 + 32 + 1;

    pub fn decode(data: &[u8]) -> Result<Self, AccountError> {
        decode("vote", data)
    }
}
