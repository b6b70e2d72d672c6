use mongodb::{
    bson::doc,
    options::{FindOneAndUpdateOptions, ReturnDocument},
};
use rocket::{http::Status, serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::wallet::{WalletLinkRequest, WalletLinkResponse},
    auth::SessionUser,
    db::{user::link_message, User},
    mongodb::{u32_id_filter, Coll},
};

pub fn routes() -> Vec<Route> {
    routes![link_wallet]
}

#[post("/wallet/link", data = "<request>", format = "json")]
async fn link_wallet(
    session: SessionUser,
    request: Json<WalletLinkRequest>,
    users: Coll<User>,
) -> Result<Json<WalletLinkResponse>> {
    check_link_request(&session, &request)?;

    let options = FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build();
    let user = users
        .find_one_and_update(
            u32_id_filter(session.id),
            doc! { "$set": { "wallet_address": request.wallet_address.to_string() } },
            options,
        )
        .await?
        .ok_or_else(|| Error::not_found(format!("User {}", session.id)))?;
    info!("User {} linked wallet {}", session.id, request.wallet_address);

    Ok(Json(WalletLinkResponse {
        success: true,
        user: user.into(),
    }))
}

/// The request must sign this user's link message with the wallet's key.
fn check_link_request(session: &SessionUser, request: &WalletLinkRequest) -> Result<()> {
    if request.message != link_message(session.id, &session.username) {
        return Err(Error::bad_request("Signed message does not match this user"));
    }
    if !request.signature_is_valid() {
        return Err(Error::Status(
            Status::Unauthorized,
            "Wallet signature is invalid".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use solana_sdk::signer::keypair::keypair_from_seed;

    use crate::chain::{Keypair, Signer};

    fn signed_by(wallet: &Keypair, message: String) -> WalletLinkRequest {
        WalletLinkRequest {
            signature: wallet.sign_message(message.as_bytes()).as_ref().to_vec(),
            message,
            wallet_address: wallet.pubkey(),
        }
    }

    #[test]
    fn link_checks() {
        let session = SessionUser::example();
        let wallet = keypair_from_seed(&[4; 32]).unwrap();

        let good = signed_by(&wallet, link_message(42, "alice"));
        assert!(check_link_request(&session, &good).is_ok());

        let other_user = signed_by(&wallet, link_message(43, "bob"));
        assert_eq!(
            check_link_request(&session, &other_user).unwrap_err().status(),
            Status::BadRequest
        );

        let mut forged = good.clone();
        forged.wallet_address = keypair_from_seed(&[5; 32]).unwrap().pubkey();
        assert_eq!(
            check_link_request(&session, &forged).unwrap_err().status(),
            Status::Unauthorized
        );
    }
}
