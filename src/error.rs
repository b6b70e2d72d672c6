use mongodb::error::Error as DbError;
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use thiserror::Error;

use crate::chain::{AccountError, ChainError, TransactionError};
use crate::crypto::{IntegrityError, ProposalValidationError};
use crate::model::{api::ErrorBody, db::PayerKeyError};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Account(#[from] AccountError),
    /// Broadcasting a vote failed for a reason other than a prior vote.
    #[error("Failed to submit vote: {0}")]
    Submission(ChainError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error(transparent)]
    Validation(#[from] ProposalValidationError),
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
    #[error(transparent)]
    PayerKey(#[from] PayerKeyError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, what.into())
    }

    pub fn bad_request(why: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, why.into())
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Db(_)
            | Self::Chain(_)
            | Self::Account(_)
            | Self::Submission(_)
            | Self::PayerKey(_) => Status::InternalServerError,
            Self::Transaction(_) | Self::Validation(_) => Status::BadRequest,
            Self::Integrity(_) => Status::Conflict,
            Self::Status(status, _) => *status,
        }
    }

    /// The response body. Internal failures get a fixed summary plus the
    /// underlying message as details.
    pub fn body(&self) -> ErrorBody {
        match self {
            Self::Db(_) => ErrorBody {
                error: "Database error".to_string(),
                details: Some(self.to_string()),
            },
            Self::Chain(_) | Self::Account(_) => ErrorBody {
                error: "Chain request failed".to_string(),
                details: Some(self.to_string()),
            },
            Self::Submission(e) => ErrorBody {
                error: "Failed to submit vote".to_string(),
                details: Some(e.to_string()),
            },
            Self::PayerKey(_) => ErrorBody {
                error: "Proposal payer unavailable".to_string(),
                details: Some(self.to_string()),
            },
            _ => ErrorBody {
                error: self.to_string(),
                details: None,
            },
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        if status.class().is_server_error() {
            error!("{self}");
        } else {
            debug!("{self}");
        }
        (status, Json(self.body())).respond_to(req)
    }
}
