use serde::{Deserialize, Serialize};

use crate::chain::{base58, Pubkey};

/// A registered user. Accounts are created by the session provider; this
/// service only reads them and records linked wallets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: u32,
    pub username: String,
    #[serde(default, with = "base58::option")]
    pub wallet_address: Option<Pubkey>,
}

impl User {
    /// The message a user signs with their wallet to link it.
    pub fn link_message(&self) -> String {
        link_message(self.id, &self.username)
    }
}

pub fn link_message(id: u32, username: &str) -> String {
    format!("Sign this to prove that you own {id} {username}")
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_message_text() {
        assert_eq!(
            User::example().link_message(),
            "Sign this to prove that you own 42 alice"
        );
    }
}
