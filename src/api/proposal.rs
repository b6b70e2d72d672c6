use mongodb::{
    bson::{doc, Document},
    options::FindOptions,
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::chain::{proposal_address, ChainClient, ChainHandle, ProposalAccount, Pubkey};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{
    api::{
        proposal::{
            AuthorView, CreatedProposal, FinalizeResponse, IntegrityReport, ProposalDetail,
            ProposalList, ProposalSummary,
        },
        vote::VoteStatus,
    },
    auth::SessionUser,
    db::{Proposal, User, VoteCommitment},
    mongodb::{u32_id_filter, Coll, Counter, PROPOSAL_ID_COUNTER_ID},
};
use crate::crypto::ProposalContent;

pub fn routes() -> Vec<Route> {
    routes![
        list_proposals,
        create_proposal,
        get_proposal,
        finalize_proposal,
        proposal_integrity,
        vote_status,
    ]
}

/// Own proposals when `filter` is the caller, otherwise finalized ones only.
#[get("/proposals?<filter>")]
async fn list_proposals(
    session: Option<SessionUser>,
    filter: Option<u32>,
    proposals: Coll<Proposal>,
    users: Coll<User>,
    votes: Coll<VoteCommitment>,
) -> Result<Json<ProposalList>> {
    let query = listing_filter(filter, session.as_ref());
    let newest_first = FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .build();
    let found: Vec<Proposal> = proposals.find(query, newest_first).await?.try_collect().await?;

    let mut summaries = Vec::with_capacity(found.len());
    for proposal in found {
        let author = author_view(&users, proposal.author_id).await?;
        let vote_count = votes
            .count_documents(doc! { "proposal_id": proposal.id }, None)
            .await?;
        summaries.push(ProposalSummary::new(proposal, author, vote_count));
    }

    Ok(Json(ProposalList {
        success: true,
        proposals: summaries,
    }))
}

#[post("/proposals", data = "<content>", format = "json")]
async fn create_proposal(
    session: SessionUser,
    content: Json<ProposalContent>,
    proposals: Coll<Proposal>,
    users: Coll<User>,
    counters: Coll<Counter>,
) -> Result<Json<CreatedProposal>> {
    let content = validated(content.into_inner())?;

    let author = author_view(&users, session.id).await?;
    let id = Counter::next(&counters, PROPOSAL_ID_COUNTER_ID).await?;
    let proposal = Proposal::new(id, session.id, content);
    let payer = proposal.payer_pubkey()?;
    proposals.insert_one(&proposal, None).await?;
    info!("User {} created proposal {id} with hash {}", session.id, proposal.hash);

    Ok(Json(CreatedProposal {
        success: true,
        proposal: ProposalDetail::new(proposal, payer, author),
    }))
}

#[get("/proposals/<id>")]
async fn get_proposal(
    session: SessionUser,
    id: u32,
    proposals: Coll<Proposal>,
    users: Coll<User>,
) -> Result<Json<ProposalDetail>> {
    let proposal = own_proposal(&proposals, id, &session).await?;
    let payer = proposal.payer_pubkey()?;
    let author = author_view(&users, proposal.author_id).await?;
    Ok(Json(ProposalDetail::new(proposal, payer, author)))
}

/// Record the on-chain account the author created for this proposal.
#[post("/proposals/<id>/finalize")]
async fn finalize_proposal(
    session: SessionUser,
    id: u32,
    proposals: Coll<Proposal>,
    users: Coll<User>,
    config: &State<Config>,
    chain: &State<ChainHandle>,
) -> Result<Json<FinalizeResponse>> {
    let proposal = own_proposal(&proposals, id, &session).await?;
    if proposal.is_finalized() {
        return Err(Error::bad_request("Proposal already finalized"));
    }
    let wallet = users
        .find_one(u32_id_filter(session.id), None)
        .await?
        .and_then(|user| user.wallet_address)
        .ok_or_else(|| Error::bad_request("Author has no linked wallet"))?;

    let pda = anchored_account(&proposal, &wallet, config.program_id(), &***chain).await?;

    proposals
        .update_one(
            u32_id_filter(id),
            doc! { "$set": { "pda": pda.to_string() } },
            None,
        )
        .await?;
    info!("Proposal {id} finalized at {pda}");
    Ok(Json(FinalizeResponse { success: true, pda }))
}

#[get("/proposals/<id>/integrity")]
async fn proposal_integrity(
    id: u32,
    proposals: Coll<Proposal>,
    chain: &State<ChainHandle>,
) -> Result<Json<IntegrityReport>> {
    let proposal = proposals
        .find_one(u32_id_filter(id), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Proposal {id}")))?;
    let pda = proposal
        .pda
        .ok_or_else(|| Error::bad_request("Proposal is not finalized"))?;
    let account = fetch_proposal_account(&***chain, &pda).await?;
    Ok(Json(integrity_report(&proposal, &account)))
}

#[get("/proposals/<id>/vote-status")]
async fn vote_status(
    session: SessionUser,
    id: u32,
    votes: Coll<VoteCommitment>,
) -> Result<Json<VoteStatus>> {
    let commitment = votes
        .find_one(doc! { "proposal_id": id, "user_id": session.id }, None)
        .await?;
    Ok(Json(commitment.into()))
}

/// Authors see their drafts when listing their own proposals. Everyone else
/// only sees proposals that have been anchored on chain.
fn listing_filter(filter: Option<u32>, session: Option<&SessionUser>) -> Document {
    let own = filter.is_some() && filter == session.map(|s| s.id);
    let mut query = match filter {
        Some(author_id) => doc! { "author_id": author_id },
        None => doc! {},
    };
    if !own {
        query.insert("pda", doc! { "$ne": null });
    }
    query
}

/// Reject invalid content before a proposal id is allocated.
fn validated(content: ProposalContent) -> Result<ProposalContent> {
    content.validate()?;
    Ok(content)
}

async fn own_proposal(
    proposals: &Coll<Proposal>,
    id: u32,
    session: &SessionUser,
) -> Result<Proposal> {
    proposals
        .find_one(doc! { "_id": id, "author_id": session.id }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Proposal {id}")))
}

async fn author_view(users: &Coll<User>, id: u32) -> Result<AuthorView> {
    users
        .find_one(u32_id_filter(id), None)
        .await?
        .map(AuthorView::from)
        .ok_or_else(|| Error::not_found(format!("User {id}")))
}

pub(crate) async fn fetch_proposal_account(
    chain: &dyn ChainClient,
    address: &Pubkey,
) -> Result<ProposalAccount> {
    let data = chain
        .account_data(address)
        .await?
        .ok_or_else(|| Error::not_found("Onchain proposal not found"))?;
    Ok(ProposalAccount::decode(&data)?)
}

/// Locate the account `author` created for the proposal's current content,
/// and check that it matches what was stored.
async fn anchored_account(
    proposal: &Proposal,
    author: &Pubkey,
    program_id: &Pubkey,
    chain: &dyn ChainClient,
) -> Result<Pubkey> {
    let digest = proposal.content.digest();
    let (pda, _) = proposal_address(author, &digest, program_id);
    let account = fetch_proposal_account(chain, &pda).await?;

    if account.author != *author {
        return Err(Error::bad_request("Onchain proposal has a different author"));
    }
    if account.payer != proposal.payer_pubkey()? {
        return Err(Error::bad_request("Onchain proposal has a different payer"));
    }
    proposal.content.check_integrity(&account.content_digest())?;
    Ok(pda)
}

fn integrity_report(proposal: &Proposal, account: &ProposalAccount) -> IntegrityReport {
    IntegrityReport {
        status: proposal.content.integrity_status(&account.content_digest()),
        stored_hash: proposal.hash,
        computed_hash: proposal.content.digest(),
        on_chain_hash: account.content_digest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::http::Status;

    use crate::chain::account::examples::account_data;
    use crate::chain::client::mock::MockChain;
    use crate::chain::pubkey::examples::example_key;
    use crate::crypto::{IntegrityStatus, ProposalValidationError};

    /// A proposal anchored by `author`, and a chain holding its account.
    fn anchored(author: Pubkey) -> (Proposal, MockChain, Pubkey) {
        let proposal = Proposal::example();
        let (pda, bump) = proposal_address(&author, &proposal.hash, &crate::ID);
        let account = ProposalAccount {
            bump,
            author,
            payer: proposal.payer_pubkey().unwrap(),
            uri: String::new(),
            hash: *proposal.hash.as_bytes(),
        };
        let chain = MockChain::default().with_account(pda, account_data(&account));
        (proposal, chain, pda)
    }

    #[test]
    fn anonymous_listing_shows_finalized_only() {
        assert_eq!(listing_filter(None, None), doc! { "pda": { "$ne": null } });
        assert_eq!(
            listing_filter(Some(42), None),
            doc! { "author_id": 42_u32, "pda": { "$ne": null } }
        );
    }

    #[test]
    fn authors_see_their_drafts() {
        let session = SessionUser::example();
        assert_eq!(
            listing_filter(Some(session.id), Some(&session)),
            doc! { "author_id": session.id }
        );
        assert_eq!(
            listing_filter(None, Some(&session)),
            doc! { "pda": { "$ne": null } }
        );
    }

    #[test]
    fn other_authors_drafts_stay_hidden() {
        let session = SessionUser::example();
        let other = session.id + 1;
        assert_eq!(
            listing_filter(Some(other), Some(&session)),
            doc! { "author_id": other, "pda": { "$ne": null } }
        );
    }

    #[test]
    fn invalid_content_is_a_bad_request() {
        assert_eq!(
            validated(ProposalContent::example()).unwrap(),
            ProposalContent::example()
        );

        let mut content = ProposalContent::example();
        content.choices.truncate(1);
        let err = validated(content).unwrap_err();
        assert_eq!(err.status(), Status::BadRequest);
        assert_eq!(
            err.to_string(),
            ProposalValidationError::TooFewChoices(1).to_string()
        );

        let mut content = ProposalContent::example();
        content.name = "Vote".to_string();
        assert_eq!(validated(content).unwrap_err().status(), Status::BadRequest);
    }

    #[rocket::async_test]
    async fn finalize_finds_account() {
        let author = example_key(1);
        let (proposal, chain, pda) = anchored(author);
        let found = anchored_account(&proposal, &author, &crate::ID, &chain)
            .await
            .unwrap();
        assert_eq!(found, pda);
    }

    #[rocket::async_test]
    async fn finalize_without_account() {
        let (proposal, _, _) = anchored(example_key(1));
        let err = anchored_account(&proposal, &example_key(1), &crate::ID, &MockChain::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.to_string(), "Onchain proposal not found");
    }

    #[rocket::async_test]
    async fn finalize_after_edit_misses_account() {
        let author = example_key(1);
        let (mut proposal, chain, _) = anchored(author);
        proposal.content.description = "Amended".to_string();
        let err = anchored_account(&proposal, &author, &crate::ID, &chain)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
    }

    #[rocket::async_test]
    async fn finalize_rejects_foreign_payer() {
        let author = example_key(1);
        let (proposal, chain, _) = anchored(author);
        let mut other = proposal.clone();
        other.payer = Proposal::example().payer;
        let err = anchored_account(&other, &author, &crate::ID, &chain)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::BadRequest);
    }

    #[test]
    fn integrity_detects_edits() {
        let mut proposal = Proposal::example();
        let account = ProposalAccount {
            hash: *proposal.hash.as_bytes(),
            ..ProposalAccount::example()
        };
        assert_eq!(integrity_report(&proposal, &account).status, IntegrityStatus::Intact);

        proposal.content.description = "Amended".to_string();
        let report = integrity_report(&proposal, &account);
        assert_eq!(report.status, IntegrityStatus::Tampered);
        assert_eq!(report.on_chain_hash, report.stored_hash);
        assert_ne!(report.computed_hash, report.on_chain_hash);
    }
}
