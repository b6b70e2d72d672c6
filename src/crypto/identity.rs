use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::signer::keypair::keypair_from_seed;

use super::{digest::sha256, DerivationError};
use crate::chain::Pubkey;

/// The one-vote keypair derived from a user and their signature artifact.
///
/// Deliberately neither `Clone` nor serialisable: the private half only lives
/// for the duration of a single submission or verification.
pub struct DerivedVoterIdentity {
    keypair: Keypair,
}

impl DerivedVoterIdentity {
    /// Derive the identity for `user_id` from the raw artifact bytes.
    ///
    /// The Ed25519 seed is `SHA256(utf8(user_id) || artifact)`, one pass with
    /// no separator and no key stretching. Changing this changes every
    /// voter address ever derived, so it must stay byte-for-byte stable.
    pub fn derive(user_id: &str, artifact: &[u8]) -> Result<Self, DerivationError> {
        if user_id.is_empty() {
            return Err(DerivationError::MissingIdentity);
        }
        if artifact.is_empty() {
            return Err(DerivationError::MissingArtifact);
        }
        let seed = sha256(&[user_id.as_bytes(), artifact]);
        let keypair = keypair_from_seed(&seed).map_err(|_| DerivationError::RejectedSeed)?;
        Ok(Self { keypair })
    }

    pub fn public_key(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign_message(message)
    }

    /// The keypair, for signing the vote transaction.
    pub(crate) fn signer(&self) -> &Keypair {
        &self.keypair
    }
}

impl std::fmt::Debug for DerivedVoterIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedVoterIdentity")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}
