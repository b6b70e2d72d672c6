use rocket::{
    http::{Cookie, Status},
    request::{self, FromRequest},
    serde::json::serde_json,
    Request,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the private cookie written by the session provider.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no session cookie")]
    Missing,
    #[error("malformed session cookie: {0}")]
    Malformed(String),
}

/// The signed-in user, as attested by the session provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: u32,
    pub username: String,
}

impl SessionUser {
    /// The user's ID in the text form used for key derivation.
    pub fn user_id(&self) -> String {
        self.id.to_string()
    }

    pub fn from_cookie(cookie: &Cookie<'_>) -> Result<Self, SessionError> {
        serde_json::from_str(cookie.value()).map_err(|e| SessionError::Malformed(e.to_string()))
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for SessionUser {
    type Error = SessionError;

    /// Read the user from the private session cookie; 401 if there is none.
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let Some(cookie) = req.cookies().get_private(SESSION_COOKIE) else {
            return request::Outcome::Failure((Status::Unauthorized, SessionError::Missing));
        };
        match Self::from_cookie(&cookie) {
            Ok(user) => request::Outcome::Success(user),
            Err(e) => request::Outcome::Failure((Status::Unauthorized, e)),
        }
    }
}
