//! Hashing and key derivation for signed votes.
//!
//! The byte-level contracts here are shared with every client that has ever
//! derived a voter key, so none of them may change.

use thiserror::Error;

pub mod digest;
pub mod identity;
pub mod proposal;

pub use digest::{ArtifactDigest, ProposalContentDigest, VerificationDigest, DIGEST_LEN};
pub use identity::DerivedVoterIdentity;
pub use proposal::{IntegrityError, IntegrityStatus, ProposalContent, ProposalValidationError};

/// Failures deriving digests or keys from a signature artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("signature artifact is empty")]
    EmptyArtifact,
    #[error("no user identity supplied")]
    MissingIdentity,
    #[error("no signature artifact supplied")]
    MissingArtifact,
    #[error("derived seed is not a valid Ed25519 secret key")]
    RejectedSeed,
}
