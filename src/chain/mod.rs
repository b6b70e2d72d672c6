//! On-chain side of the voting program: addresses, accounts, transactions
//! and the RPC client.

pub mod account;
pub mod client;
pub mod pubkey;
pub mod transaction;

pub use account::{
    AccountError, Proposal as ProposalAccount, Vote as VoteAccount, VOTER_OFFSET,
};
pub use client::{
    mentions_existing_account, ChainClient, ChainError, ChainHandle, KeyedAccount, MemcmpFilter,
    RpcChainClient,
};
pub use pubkey::{base58, proposal_address, system_program, vote_address, Hash, Pubkey};
pub use solana_sdk::{
    signature::{Keypair, Signature, Signer},
    transaction::Transaction,
};
pub use transaction::{unsigned_vote, vote_instruction, TransactionError, VoteTransaction};
