//! Vote transactions. The voter builds and partially signs one, the relay
//! countersigns it as fee payer. On the wire a transaction is the base64 of
//! its bincode encoding.

use anchor_lang::solana_program::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
};
use base64::{engine::general_purpose::STANDARD as B64, Engine};
use bincode::Options;
use solana_sdk::{
    message::Message,
    packet::PACKET_DATA_SIZE,
    sanitize::Sanitize,
    signature::{Signature, Signer, SignerError},
    transaction::Transaction,
};
use thiserror::Error;

use super::pubkey::{system_program, Hash, Pubkey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    #[error("invalid base64: {0}")]
    Base64(String),
    #[error("malformed transaction: {0}")]
    Malformed(String),
    #[error("{0} is not a required signer")]
    NotASigner(Pubkey),
    #[error("signing failed: {0}")]
    Signing(String),
    #[error("invalid signature for {0}")]
    BadSignature(Pubkey),
}

/// First eight bytes of `SHA256("global:<name>")`, the selector anchor
/// programs dispatch instructions on.
fn instruction_discriminator(name: &str) -> [u8; 8] {
    let mut out = [0; 8];
    out.copy_from_slice(&hash(format!("global:{name}").as_bytes()).to_bytes()[..8]);
    out
}

/// The program's `vote(choice)` instruction. The vote account is created at
/// `vote`, paid for by `payer`, and both `voter` and `payer` must sign.
pub fn vote_instruction(
    program_id: Pubkey,
    vote: Pubkey,
    proposal: Pubkey,
    voter: Pubkey,
    payer: Pubkey,
    choice: u8,
) -> Instruction {
    let mut data = instruction_discriminator("vote").to_vec();
    data.push(choice);
    Instruction::new_with_bytes(
        program_id,
        &data,
        vec![
            AccountMeta::new(vote, false),
            AccountMeta::new(proposal, false),
            AccountMeta::new(voter, true),
            AccountMeta::new(payer, true),
            AccountMeta::new_readonly(system_program::ID, false),
        ],
    )
}

/// An unsigned vote transaction with `payer` as fee payer.
pub fn unsigned_vote(instruction: Instruction, payer: &Pubkey, blockhash: Hash) -> Transaction {
    Transaction::new_unsigned(Message::new_with_blockhash(
        &[instruction],
        Some(payer),
        &blockhash,
    ))
}

pub fn from_base64(text: &str) -> Result<Transaction, TransactionError> {
    let bytes = B64
        .decode(text.trim())
        .map_err(|e| TransactionError::Base64(e.to_string()))?;
    let transaction: Transaction = bincode::options()
        .with_limit(PACKET_DATA_SIZE as u64)
        .with_fixint_encoding()
        .reject_trailing_bytes()
        .deserialize(&bytes)
        .map_err(|e| TransactionError::Malformed(e.to_string()))?;
    transaction
        .sanitize()
        .map_err(|e| TransactionError::Malformed(e.to_string()))?;
    Ok(transaction)
}

/// Queries and signing steps the voting flow performs on a transaction.
pub trait VoteTransaction {
    fn to_base64(&self) -> Result<String, TransactionError>;

    fn fee_payer(&self) -> Option<&Pubkey>;

    /// Program invoked by the instruction at `index`.
    fn program_at(&self, index: usize) -> Option<&Pubkey>;

    /// Whether the slot of `key` holds a signature.
    fn is_signed_by(&self, key: &Pubkey) -> bool;

    /// Check every signature that is present. Empty slots are not an error.
    fn verify_present_signatures(&self) -> Result<(), TransactionError>;

    /// Add `signer`'s signature, leaving the other slots untouched.
    fn countersign(&mut self, signer: &impl Signer) -> Result<(), TransactionError>;

    /// The first signature, which doubles as the transaction id.
    fn id(&self) -> Option<String>;
}

impl VoteTransaction for Transaction {
    fn to_base64(&self) -> Result<String, TransactionError> {
        bincode::serialize(self)
            .map(|bytes| B64.encode(bytes))
            .map_err(|e| TransactionError::Malformed(e.to_string()))
    }

    fn fee_payer(&self) -> Option<&Pubkey> {
        self.message.account_keys.first()
    }

    fn program_at(&self, index: usize) -> Option<&Pubkey> {
        let instruction = self.message.instructions.get(index)?;
        self.message
            .account_keys
            .get(usize::from(instruction.program_id_index))
    }

    fn is_signed_by(&self, key: &Pubkey) -> bool {
        self.message
            .account_keys
            .iter()
            .zip(&self.signatures)
            .any(|(k, sig)| k == key && *sig != Signature::default())
    }

    fn verify_present_signatures(&self) -> Result<(), TransactionError> {
        let message = self.message_data();
        for (key, sig) in self.message.account_keys.iter().zip(&self.signatures) {
            if *sig != Signature::default() && !sig.verify(key.as_ref(), &message) {
                return Err(TransactionError::BadSignature(*key));
            }
        }
        Ok(())
    }

    fn countersign(&mut self, signer: &impl Signer) -> Result<(), TransactionError> {
        let blockhash = self.message.recent_blockhash;
        self.try_partial_sign(&[signer], blockhash)
            .map_err(|e| match e {
                SignerError::KeypairPubkeyMismatch => TransactionError::NotASigner(signer.pubkey()),
                other => TransactionError::Signing(other.to_string()),
            })
    }

    fn id(&self) -> Option<String> {
        self.signatures.first().map(Signature::to_string)
    }
}

#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    use crate::chain::pubkey::{examples::example_key, vote_address};

    /// An unsigned vote on proposal key 4, fee payer from `payer`.
    pub fn example_vote(voter: Pubkey, payer: Pubkey) -> Transaction {
        let proposal = example_key(4);
        let (vote, _) = vote_address(&proposal, &voter, &crate::ID);
        let instruction = vote_instruction(crate::ID, vote, proposal, voter, payer, 1);
        unsigned_vote(instruction, &payer, Hash::new_from_array([5; 32]))
    }
}
