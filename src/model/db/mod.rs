//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - Datetimes are serialised in MongoDB's own format.
//! - Keys and digests are serialised as text (base58 and hex respectively).

pub mod proposal;
pub mod user;
pub mod vote;

pub use proposal::{PayerKeyError, Proposal};
pub use user::User;
pub use vote::VoteCommitment;
