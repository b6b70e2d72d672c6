use reqwest::{header::COOKIE, Client};
use thiserror::Error;

use crate::chain::Pubkey;
use crate::model::api::proposal::{ProposalList, ProposalSummary};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("proposal directory unavailable: {0}")]
    Unavailable(String),
    #[error("proposal directory answered with status {0}")]
    Status(u16),
}

/// Off-chain lookup of proposal metadata.
#[rocket::async_trait]
pub trait ProposalDirectory: Send + Sync {
    /// The proposal anchored at `address`, if any.
    async fn proposal_by_address(
        &self,
        address: &Pubkey,
    ) -> Result<Option<ProposalSummary>, DirectoryError>;
}

/// Directory backed by the backend's proposal listing.
pub struct HttpProposalDirectory {
    http: Client,
    base_url: String,
    cookie: Option<String>,
}

impl HttpProposalDirectory {
    pub fn new(base_url: impl Into<String>, cookie: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookie,
        }
    }
}

#[rocket::async_trait]
impl ProposalDirectory for HttpProposalDirectory {
    async fn proposal_by_address(
        &self,
        address: &Pubkey,
    ) -> Result<Option<ProposalSummary>, DirectoryError> {
        let mut request = self.http.get(format!("{}/proposals", self.base_url));
        if let Some(ref cookie) = self.cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }
        let list = response
            .json::<ProposalList>()
            .await
            .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;
        Ok(list
            .proposals
            .into_iter()
            .find(|p| p.pda.as_ref() == Some(address)))
    }
}
