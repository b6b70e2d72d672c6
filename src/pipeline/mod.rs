//! The voter-side flows: casting a vote from a drawing and tracing a vote
//! back from its artifact, plus the HTTP collaborators they talk to.

pub mod directory;
pub mod relay;
pub mod submit;
pub mod verify;

pub use directory::{DirectoryError, HttpProposalDirectory, ProposalDirectory};
pub use relay::{HttpVoteRelay, RelayError, VoteRelay};
pub use submit::{submit_vote, SubmissionContext, SubmissionError, SubmissionReceipt, VoteTarget};
pub use verify::{verify_vote, VerificationError, VerificationSession, VerificationState, VerifiedVote};
