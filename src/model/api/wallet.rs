use serde::{Deserialize, Serialize};

use crate::chain::{base58, Pubkey, Signature};
use crate::model::db::User;

/// Proof that the user controls a wallet: its signature over the link message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletLinkRequest {
    /// Raw signature bytes, as a JSON array.
    pub signature: Vec<u8>,
    pub message: String,
    #[serde(with = "base58")]
    pub wallet_address: Pubkey,
}

impl WalletLinkRequest {
    /// Whether the signature over `message` verifies against the wallet key.
    pub fn signature_is_valid(&self) -> bool {
        Signature::try_from(self.signature.as_slice()).map_or(false, |signature| {
            signature.verify(self.wallet_address.as_ref(), self.message.as_bytes())
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: u32,
    pub username: String,
    #[serde(default, with = "base58::option")]
    pub wallet_address: Option<Pubkey>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            wallet_address: user.wallet_address,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletLinkResponse {
    pub success: bool,
    pub user: UserView,
}

#[cfg(test)]
mod tests {
    use super::*;

    use rocket::serde::json::serde_json;
    use solana_sdk::signer::keypair::keypair_from_seed;

    use crate::chain::Signer;
    use crate::model::db::user::link_message;

    #[test]
    fn link_signature() {
        let wallet = keypair_from_seed(&[4; 32]).unwrap();
        let message = link_message(42, "alice");
        let mut request = WalletLinkRequest {
            signature: wallet.sign_message(message.as_bytes()).as_ref().to_vec(),
            message,
            wallet_address: wallet.pubkey(),
        };
        assert!(request.signature_is_valid());

        request.message = link_message(43, "alice");
        assert!(!request.signature_is_valid());

        request.signature.truncate(10);
        assert!(!request.signature_is_valid());
    }

    #[test]
    fn wallet_address_is_base58_text() {
        let wallet = keypair_from_seed(&[4; 32]).unwrap();
        let body = serde_json::json!({
            "signature": [1, 2, 3],
            "message": "hello",
            "walletAddress": wallet.pubkey().to_string()
        });
        let request: WalletLinkRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.wallet_address, wallet.pubkey());

        let view = UserView {
            id: 42,
            username: "alice".to_string(),
            wallet_address: Some(wallet.pubkey()),
        };
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["wallet_address"], wallet.pubkey().to_string().as_str());
    }
}
