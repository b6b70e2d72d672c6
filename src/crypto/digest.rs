use std::fmt::{self, Display, Formatter};

use data_encoding::HEXLOWER;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::DerivationError;

/// Size of every digest used here.
pub const DIGEST_LEN: usize = 32;

pub(crate) fn sha256(parts: &[&[u8]]) -> [u8; DIGEST_LEN] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

pub(crate) fn parse_hex(hex: &str) -> Option<[u8; DIGEST_LEN]> {
    HEXLOWER
        .decode(hex.to_ascii_lowercase().as_bytes())
        .ok()?
        .try_into()
        .ok()
}

macro_rules! hex_digest {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name([u8; DIGEST_LEN]);

        impl $name {
            pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
                Self(bytes)
            }

            pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
                &self.0
            }

            /// Lowercase hex representation.
            pub fn to_hex(&self) -> String {
                HEXLOWER.encode(&self.0)
            }

            pub fn from_hex(hex: &str) -> Option<Self> {
                parse_hex(hex).map(Self)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                f.write_str(&self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let hex = String::deserialize(deserializer)?;
                Self::from_hex(&hex).ok_or_else(|| {
                    D::Error::custom(format!("expected {} hex digits, found {:?}", DIGEST_LEN * 2, hex))
                })
            }
        }
    };
}

hex_digest!(
    /// D1: SHA-256 of the exact PNG bytes of a signature artifact.
    ArtifactDigest
);

hex_digest!(
    /// D2: SHA-256 of the hex text of D1; the public commitment stored with a vote.
    VerificationDigest
);

hex_digest!(
    /// SHA-256 over a proposal's name, description and JSON-encoded choices.
    ProposalContentDigest
);

impl ArtifactDigest {
    /// Digest an artifact's bytes.
    pub fn of(artifact: &[u8]) -> Result<Self, DerivationError> {
        if artifact.is_empty() {
            return Err(DerivationError::EmptyArtifact);
        }
        Ok(Self(sha256(&[artifact])))
    }

    /// The second-stage commitment derived from this digest.
    pub fn verification_digest(&self) -> VerificationDigest {
        VerificationDigest(sha256(&[self.to_hex().as_bytes()]))
    }
}

impl VerificationDigest {
    /// Does this commitment correspond to the given artifact digest?
    pub fn commits_to(&self, artifact: &ArtifactDigest) -> bool {
        artifact.verification_digest() == *self
    }
}
