use mongodb::bson::doc;
use mongodb::error::Error as DbError;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::chain::{transaction, ChainClient, ChainHandle, Pubkey, Signer, VoteTransaction};
use crate::config::Config;
use crate::crypto::VerificationDigest;
use crate::error::{Error, Result};
use crate::model::{
    api::vote::{VoteReceipt, VoteSubmission},
    auth::SessionUser,
    db::{Proposal, VoteCommitment},
    mongodb::{is_duplicate_key_error, u32_id_filter, Coll},
};

pub fn routes() -> Vec<Route> {
    routes![relay_vote]
}

/// Countersign a voter's transaction as the proposal's fee payer, broadcast
/// it, and record the voter's commitment.
#[post("/votes/<proposal_id>", data = "<submission>", format = "json")]
async fn relay_vote(
    session: SessionUser,
    proposal_id: u32,
    submission: Json<VoteSubmission>,
    proposals: Coll<Proposal>,
    votes: Coll<VoteCommitment>,
    config: &State<Config>,
    chain: &State<ChainHandle>,
) -> Result<Json<VoteReceipt>> {
    let proposal = proposals
        .find_one(u32_id_filter(proposal_id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Proposal {proposal_id}")))?;

    let commitment_filter = doc! { "proposal_id": proposal_id, "user_id": session.id };
    let existing = votes.find_one(commitment_filter, None).await?;
    if check_commitment(existing.as_ref(), &submission.signature_hash)? {
        debug!("User {} resubmitting their vote on {proposal_id}", session.id);
    }

    let receipt =
        broadcast_vote(&proposal, &submission, config.program_id(), &***chain).await?;

    let commitment = VoteCommitment::new(session.id, proposal_id, submission.signature_hash);
    if !commitment_stored(votes.insert_one(&commitment, None).await)? {
        debug!("Commitment for user {} on {proposal_id} already stored", session.id);
    }
    Ok(Json(receipt))
}

/// A user commits to one signature per proposal. Returns whether `submitted`
/// repeats the stored commitment; a different one is a conflict.
fn check_commitment(
    existing: Option<&VoteCommitment>,
    submitted: &VerificationDigest,
) -> Result<bool> {
    match existing {
        None => Ok(false),
        Some(existing) if existing.signature_hash == *submitted => Ok(true),
        Some(_) => Err(Error::Status(
            Status::Conflict,
            "You have already voted on this proposal".to_string(),
        )),
    }
}

/// Outcome of the commitment insert. `Ok(false)` means an earlier attempt
/// already stored it, which the unique index reports as a duplicate key.
fn commitment_stored<T>(inserted: std::result::Result<T, DbError>) -> Result<bool> {
    match inserted {
        Ok(_) => Ok(true),
        Err(e) if is_duplicate_key_error(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Check that the transaction is a vote on `proposal` paid for by its payer,
/// add the payer's signature and send it.
async fn broadcast_vote(
    proposal: &Proposal,
    submission: &VoteSubmission,
    program_id: &Pubkey,
    chain: &dyn ChainClient,
) -> Result<VoteReceipt> {
    let pda = proposal
        .pda
        .ok_or_else(|| Error::bad_request("Proposal is not finalized"))?;
    let mut transaction = transaction::from_base64(&submission.base64_tx)?;

    let payer = proposal.payer_keypair()?;
    if transaction.fee_payer() != Some(&payer.pubkey()) {
        return Err(Error::bad_request(
            "Transaction fee payer is not the proposal payer",
        ));
    }
    let targets_proposal =
        transaction.program_at(0) == Some(program_id) && transaction.key(0, 1) == Some(&pda);
    if !targets_proposal {
        return Err(Error::bad_request(
            "Transaction does not vote on this proposal",
        ));
    }
    transaction.verify_present_signatures()?;
    transaction.countersign(&payer)?;

    match chain.send_and_confirm(&transaction).await {
        Ok(signature) => {
            info!("Vote on proposal {} confirmed: {signature}", proposal.id);
            Ok(VoteReceipt::submitted(signature))
        }
        Err(e) if e.is_existing_account() => {
            warn!("Vote account already exists, vote on {} resumed", proposal.id);
            Ok(VoteReceipt::resumed())
        }
        Err(e) => Err(Error::Submission(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::chain::pubkey::examples::example_key;
    use crate::chain::transaction::examples::example_vote;
    use crate::chain::{client::mock::MockChain, ChainError};
    use crate::crypto::{ArtifactDigest, DerivedVoterIdentity};
    use crate::model::mongodb::duplicate_key_error;

    /// A finalized proposal and a voter's partially signed transaction for it.
    fn setup() -> (Proposal, VoteSubmission, Pubkey) {
        let mut proposal = Proposal::example();
        proposal.pda = Some(example_key(4));
        let voter = DerivedVoterIdentity::derive("42", b"png").unwrap();
        let mut transaction =
            example_vote(voter.public_key(), proposal.payer_keypair().unwrap().pubkey());
        transaction.countersign(voter.signer()).unwrap();
        let submission = VoteSubmission {
            signature_hash: ArtifactDigest::of(b"png").unwrap().verification_digest(),
            base64_tx: transaction.to_base64().unwrap(),
        };
        (proposal, submission, voter.public_key())
    }

    fn digest(png: &[u8]) -> VerificationDigest {
        ArtifactDigest::of(png).unwrap().verification_digest()
    }

    #[test]
    fn first_commitment() {
        assert!(!check_commitment(None, &digest(b"png")).unwrap());
    }

    #[test]
    fn same_commitment_is_a_resubmission() {
        let stored = VoteCommitment::new(42, 7, digest(b"png"));
        assert!(check_commitment(Some(&stored), &digest(b"png")).unwrap());
    }

    #[test]
    fn different_commitment_conflicts() {
        let stored = VoteCommitment::new(42, 7, digest(b"png"));
        let err = check_commitment(Some(&stored), &digest(b"other png")).unwrap_err();
        assert_eq!(err.status(), Status::Conflict);
        assert_eq!(err.to_string(), "You have already voted on this proposal");
    }

    #[test]
    fn duplicate_commitment_insert_is_success() {
        assert!(commitment_stored(Ok(())).unwrap());
        assert!(!commitment_stored::<()>(Err(duplicate_key_error())).unwrap());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection reset");
        let err = commitment_stored::<()>(Err(DbError::from(io))).unwrap_err();
        assert_eq!(err.status(), Status::InternalServerError);
    }

    #[rocket::async_test]
    async fn countersigns_and_sends() {
        let (proposal, submission, voter) = setup();
        let chain = MockChain::default();
        let receipt = broadcast_vote(&proposal, &submission, &crate::ID, &chain)
            .await
            .unwrap();
        assert!(receipt.success);

        let sent = chain.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_signed());
        assert!(sent[0].is_signed_by(&voter));
        sent[0].verify().unwrap();
        assert_eq!(receipt.transaction_signature, sent[0].id());
    }

    #[rocket::async_test]
    async fn existing_vote_account_is_success() {
        let (proposal, submission, _) = setup();
        let chain = MockChain::default();
        *chain.send_error.lock().unwrap() = Some(ChainError::Rpc {
            code: -32002,
            message: "Transaction simulation failed".to_string(),
            logs: vec!["Allocate: account already in use".to_string()],
        });
        let receipt = broadcast_vote(&proposal, &submission, &crate::ID, &chain)
            .await
            .unwrap();
        assert_eq!(receipt, VoteReceipt::resumed());
    }

    #[rocket::async_test]
    async fn other_failures_are_reported() {
        let (proposal, submission, _) = setup();
        let chain = MockChain::default();
        *chain.send_error.lock().unwrap() = Some(ChainError::TransactionFailed {
            signature: "sig".to_string(),
            reason: "insufficient funds".to_string(),
        });
        let err = broadcast_vote(&proposal, &submission, &crate::ID, &chain)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::InternalServerError);
        let body = err.body();
        assert_eq!(body.error, "Failed to submit vote");
        assert!(body.message().contains("insufficient funds"));
    }

    #[rocket::async_test]
    async fn rejects_foreign_fee_payer() {
        let (mut proposal, submission, _) = setup();
        proposal.payer = Proposal::example().payer;
        let chain = MockChain::default();
        let err = broadcast_vote(&proposal, &submission, &crate::ID, &chain)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(chain.calls(), 0);
    }

    #[rocket::async_test]
    async fn rejects_other_proposal() {
        let (mut proposal, submission, _) = setup();
        proposal.pda = Some(example_key(5));
        let err = broadcast_vote(&proposal, &submission, &crate::ID, &MockChain::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Transaction does not vote on this proposal");
    }

    #[rocket::async_test]
    async fn rejects_unfinalized_and_garbage() {
        let (mut proposal, mut submission, _) = setup();
        let chain = MockChain::default();
        submission.base64_tx = "not a transaction".to_string();
        let err = broadcast_vote(&proposal, &submission, &crate::ID, &chain)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::BadRequest);

        proposal.pda = None;
        let err = broadcast_vote(&proposal, &submission, &crate::ID, &chain)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Proposal is not finalized");
    }
}
