use reqwest::{header::COOKIE, Client, StatusCode};
use thiserror::Error;

use crate::chain::mentions_existing_account;
use crate::model::api::{
    vote::{VoteReceipt, VoteSubmission},
    ErrorBody,
};

/// Used when the relay fails without saying why.
const GENERIC_FAILURE: &str = "Failed to submit vote";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// The vote account exists already: the vote was cast by an earlier attempt.
    #[error("vote account already exists")]
    TransactionAlreadyExists,
    #[error("{0}")]
    Conflict(String),
    #[error("relay rejected the vote ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("could not reach the relay: {0}")]
    Transport(String),
}

impl RelayError {
    /// Classify an error response by its status and body text.
    pub fn from_response(status: u16, body: Option<ErrorBody>) -> Self {
        let message = body
            .map(|b| b.message().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| GENERIC_FAILURE.to_string());
        if mentions_existing_account(&message) {
            Self::TransactionAlreadyExists
        } else if status == StatusCode::CONFLICT.as_u16() {
            Self::Conflict(message)
        } else {
            Self::Rejected { status, message }
        }
    }
}

/// The service that countersigns and broadcasts a partially signed vote.
#[rocket::async_trait]
pub trait VoteRelay: Send + Sync {
    async fn submit(
        &self,
        proposal_id: u32,
        submission: &VoteSubmission,
    ) -> Result<VoteReceipt, RelayError>;
}

/// Relay reached over HTTP, authenticated by the user's session cookie.
pub struct HttpVoteRelay {
    http: Client,
    base_url: String,
    cookie: Option<String>,
}

impl HttpVoteRelay {
    pub fn new(base_url: impl Into<String>, cookie: Option<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cookie,
        }
    }
}

#[rocket::async_trait]
impl VoteRelay for HttpVoteRelay {
    async fn submit(
        &self,
        proposal_id: u32,
        submission: &VoteSubmission,
    ) -> Result<VoteReceipt, RelayError> {
        let mut request = self
            .http
            .post(format!("{}/votes/{proposal_id}", self.base_url))
            .json(submission);
        if let Some(ref cookie) = self.cookie {
            request = request.header(COOKIE, cookie);
        }
        let response = request
            .send()
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            response
                .json::<VoteReceipt>()
                .await
                .map_err(|e| RelayError::Transport(e.to_string()))
        } else {
            let body = response.json::<ErrorBody>().await.ok();
            Err(RelayError::from_response(status.as_u16(), body))
        }
    }
}
