pub use anchor_lang::solana_program::{hash::Hash, pubkey::Pubkey, system_program};

use crate::crypto::ProposalContentDigest;

/// Address of the proposal account anchored by `author` for the given content.
pub fn proposal_address(
    author: &Pubkey,
    content: &ProposalContentDigest,
    program_id: &Pubkey,
) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[author.as_ref(), content.as_bytes().as_slice()], program_id)
}

/// Address of the vote account of `voter` on `proposal`.
pub fn vote_address(proposal: &Pubkey, voter: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[proposal.as_ref(), voter.as_ref()], program_id)
}

/// Keys as base58 text, the form they take in JSON bodies, documents and
/// configuration. Use with `#[serde(with = "base58")]`.
pub mod base58 {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    use super::Pubkey;

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(D::Error::custom)
    }

    /// The same for optional keys; `None` is `null`.
    pub mod option {
        use super::*;

        pub fn serialize<S: Serializer>(
            key: &Option<Pubkey>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match key {
                Some(key) => serializer.serialize_some(&key.to_string()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Pubkey>, D::Error> {
            Option::<String>::deserialize(deserializer)?
                .map(|text| text.parse().map_err(D::Error::custom))
                .transpose()
        }
    }
}
