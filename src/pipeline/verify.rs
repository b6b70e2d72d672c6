//! Finding the vote a signature artifact cast.
//!
//! Nothing about the vote is stored with the user, so the only way back from
//! an artifact to its vote is to re-derive the voter key and search the
//! program's vote accounts for it.

use thiserror::Error;

use crate::chain::{
    AccountError, ChainClient, ChainError, MemcmpFilter, Pubkey, VoteAccount, VOTER_OFFSET,
};
use crate::crypto::{ArtifactDigest, DerivationError, DerivedVoterIdentity, VerificationDigest};

use super::directory::{DirectoryError, ProposalDirectory};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    /// The ledger could not be searched. Retrying needs no re-derivation.
    #[error(transparent)]
    ChainQueryFailed(#[from] ChainError),
    #[error("no vote was cast with this signature")]
    NoMatchingVote,
    #[error("proposal not found")]
    ProposalNotFound,
    #[error("malformed vote account: {0}")]
    Account(#[from] AccountError),
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

/// A vote traced back from its artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedVote {
    pub vote_account: Pubkey,
    pub voter: Pubkey,
    pub proposal: Pubkey,
    pub proposal_id: u32,
    pub proposal_name: String,
    pub choice_index: u8,
    /// `None` if the proposal has no choice at the recorded index.
    pub choice_label: Option<String>,
    /// D2 of the uploaded artifact. The chain does not store it; the backend
    /// does, as the user's vote commitment, so it links this vote to that record.
    pub verification_digest: VerificationDigest,
}

/// Trace the vote cast by `user_id` with the uploaded artifact.
pub async fn verify_vote(
    user_id: &str,
    upload: &[u8],
    program_id: &Pubkey,
    chain: &dyn ChainClient,
    directory: &dyn ProposalDirectory,
) -> Result<VerifiedVote, VerificationError> {
    let identity = DerivedVoterIdentity::derive(user_id, upload)?;
    let voter = identity.public_key();
    let verification_digest = ArtifactDigest::of(upload)?.verification_digest();
    debug!("Searching for votes by derived voter {voter}");

    let filter = MemcmpFilter::new(VOTER_OFFSET, voter.to_bytes());
    let matches = chain.program_accounts(program_id, &[filter]).await?;
    let Some(found) = matches.into_iter().next() else {
        return Err(VerificationError::NoMatchingVote);
    };
    let vote = VoteAccount::decode(&found.data)?;

    let proposal = directory
        .proposal_by_address(&vote.proposal_id)
        .await?
        .ok_or(VerificationError::ProposalNotFound)?;
    info!("Verified vote {} on proposal {}", found.pubkey, proposal.id);

    Ok(VerifiedVote {
        vote_account: found.pubkey,
        voter,
        proposal: vote.proposal_id,
        proposal_id: proposal.id,
        choice_label: proposal.choice_label(vote.choice).map(str::to_string),
        proposal_name: proposal.name,
        choice_index: vote.choice,
        verification_digest,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VerificationState {
    #[default]
    Idle,
    Processing,
    Verified(VerifiedVote),
    NotFound,
    Error(String),
}

/// Drives one verification at a time against fixed collaborators.
pub struct VerificationSession<'a> {
    program_id: Pubkey,
    chain: &'a dyn ChainClient,
    directory: &'a dyn ProposalDirectory,
    state: VerificationState,
}

impl<'a> VerificationSession<'a> {
    pub fn new(
        program_id: Pubkey,
        chain: &'a dyn ChainClient,
        directory: &'a dyn ProposalDirectory,
    ) -> Self {
        Self {
            program_id,
            chain,
            directory,
            state: VerificationState::Idle,
        }
    }

    pub fn state(&self) -> &VerificationState {
        &self.state
    }

    /// Run a fresh attempt on the supplied file, replacing any previous outcome.
    pub async fn verify(&mut self, user_id: &str, upload: &[u8]) -> &VerificationState {
        self.state = VerificationState::Processing;
        self.state = match verify_vote(user_id, upload, &self.program_id, self.chain, self.directory)
            .await
        {
            Ok(vote) => VerificationState::Verified(vote),
            Err(VerificationError::NoMatchingVote) => {
                info!("No vote matches the uploaded signature");
                VerificationState::NotFound
            }
            Err(e) => {
                warn!("Verification failed: {e}");
                VerificationState::Error(e.to_string())
            }
        };
        &self.state
    }

    pub fn reset(&mut self) {
        self.state = VerificationState::Idle;
    }
}
