//! Harness errors

use solana_sdk::{
    program_error::ProgramError, pubkey::Pubkey, signature::Signature,
    signer::SignerError, transaction::TransactionError,
};
use thiserror::Error;

/// Errors reported by a [`crate::LedgerClient`]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum LedgerError {
    /// The ledger refused the transaction (preflight or execution failure)
    #[error("Transaction rejected: {0}")]
    Rejected(TransactionError),
    /// Transport or node failure
    #[error("RPC error: {0}")]
    Rpc(String),
    /// The signature did not reach the requested commitment in time
    #[error("Confirmation timed out for {0}")]
    ConfirmationTimeout(Signature),
}

/// Errors that may be returned by the harness
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Transaction must contain at least one instruction")]
    EmptyInstructions,

    #[error("Signing failed: {0}")]
    Signing(#[from] SignerError),

    #[error("Invalid instruction: {0}")]
    InvalidInstruction(#[from] ProgramError),

    #[error("Account not found: {0}")]
    AccountNotFound(Pubkey),

    #[error("Invalid account data: {0}")]
    InvalidAccountData(Pubkey),

    #[error("Authority mismatch: expected {expected}, got {actual}")]
    AuthorityMismatch { expected: Pubkey, actual: Pubkey },

    #[error("Funding {account} failed after {attempts} attempts")]
    FundingExhausted { account: Pubkey, attempts: u32 },

    #[error("Nonce cache error: {0}")]
    Nonce(String),
}

impl HarnessError {
    /// The on-ledger rejection carried by this error, if any
    pub fn transaction_error(&self) -> Option<&TransactionError> {
        match self {
            HarnessError::Ledger(LedgerError::Rejected(err)) => Some(err),
            _ => None,
        }
    }
}

impl From<redis::RedisError> for HarnessError {
    fn from(err: redis::RedisError) -> Self {
        HarnessError::Nonce(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, HarnessError>;
