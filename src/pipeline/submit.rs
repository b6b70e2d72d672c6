//! Casting a vote from a drawn signature.
//!
//! The drawing is rendered to its artifact, the artifact yields the voter
//! key, and a vote transaction signed by that key alone is handed to the
//! relay, which adds the fee payer's signature and broadcasts it.

use thiserror::Error;

use crate::chain::{
    unsigned_vote, vote_address, vote_instruction, ChainClient, ChainError, Pubkey,
    TransactionError, VoteTransaction,
};
use crate::crypto::{ArtifactDigest, DerivationError, DerivedVoterIdentity, VerificationDigest};
use crate::model::api::vote::VoteSubmission;
use crate::model::auth::SessionUser;
use crate::signature::{render, DraftStore, RenderError, SignatureArtifact};

use super::relay::{RelayError, VoteRelay};

#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Nothing renderable was drawn. No network call has been made.
    #[error("signature artifact is empty")]
    EmptyArtifact,
    #[error(transparent)]
    Render(RenderError),
    #[error(transparent)]
    Derivation(#[from] DerivationError),
    /// Fetching the blockhash failed; nothing was sent.
    #[error(transparent)]
    ChainQueryFailed(#[from] ChainError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

impl From<RenderError> for SubmissionError {
    fn from(e: RenderError) -> Self {
        match e {
            RenderError::EmptyArtifact => Self::EmptyArtifact,
            other => Self::Render(other),
        }
    }
}

/// Who is voting on what.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionContext {
    pub user_id: String,
    pub proposal_id: u32,
}

impl SubmissionContext {
    /// The signed-in user voting on `proposal_id`.
    pub fn new(session: &SessionUser, proposal_id: u32) -> Self {
        Self {
            user_id: session.user_id(),
            proposal_id,
        }
    }
}

/// The on-chain side of the proposal being voted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTarget {
    pub proposal_address: Pubkey,
    /// The proposal's designated fee payer.
    pub payer: Pubkey,
    pub choice: u8,
}

#[derive(Debug)]
pub struct SubmissionReceipt {
    /// The PNG the voter must keep to ever verify this vote.
    pub artifact: SignatureArtifact,
    pub filename: String,
    pub voter: Pubkey,
    pub artifact_digest: ArtifactDigest,
    pub verification_digest: VerificationDigest,
    /// `None` when the vote had already been cast by an earlier attempt.
    pub transaction_signature: Option<String>,
    pub resumed: bool,
}

/// Render the drafted signature and cast a vote with it.
///
/// The draft is discarded once the relay has accepted the vote.
pub async fn submit_vote(
    ctx: &SubmissionContext,
    drafts: &mut DraftStore,
    target: VoteTarget,
    program_id: &Pubkey,
    chain: &dyn ChainClient,
    relay: &dyn VoteRelay,
) -> Result<SubmissionReceipt, SubmissionError> {
    let signature = drafts
        .draft(ctx.proposal_id)
        .filter(|draft| !draft.is_empty())
        .ok_or(SubmissionError::EmptyArtifact)?;
    let artifact = render(signature)?;

    let artifact_digest = ArtifactDigest::of(artifact.as_bytes())?;
    let identity = DerivedVoterIdentity::derive(&ctx.user_id, artifact.as_bytes())?;
    let verification_digest = artifact_digest.verification_digest();
    let voter = identity.public_key();
    debug!("Derived voter {voter} with verification digest {verification_digest}");

    let (vote, _) = vote_address(&target.proposal_address, &voter, program_id);
    let instruction = vote_instruction(
        *program_id,
        vote,
        target.proposal_address,
        voter,
        target.payer,
        target.choice,
    );
    let blockhash = chain.latest_blockhash().await?;
    let mut transaction = unsigned_vote(instruction, &target.payer, blockhash);
    transaction.countersign(identity.signer())?;

    let submission = VoteSubmission {
        signature_hash: verification_digest,
        base64_tx: transaction.to_base64()?,
    };
    let transaction_signature = match relay.submit(ctx.proposal_id, &submission).await {
        Ok(receipt) => receipt.transaction_signature,
        Err(RelayError::TransactionAlreadyExists) => {
            warn!("Vote account {vote} already exists, treating as submitted");
            None
        }
        Err(e) => return Err(e.into()),
    };
    let resumed = transaction_signature.is_none();
    info!(
        "Vote on proposal {} submitted{}",
        ctx.proposal_id,
        if resumed { " (resumed)" } else { "" }
    );

    drafts.discard(ctx.proposal_id);
    Ok(SubmissionReceipt {
        filename: SignatureArtifact::filename(ctx.proposal_id),
        artifact,
        voter,
        artifact_digest,
        verification_digest,
        transaction_signature,
        resumed,
    })
}
