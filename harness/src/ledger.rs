//! Ledger client seam
//!
//! Everything the harness needs from a validator goes through [`LedgerClient`]. The
//! `rpc` feature provides an implementation over the JSON RPC client, the integration
//! tests provide one over the in-process banks client.

use std::fmt;

use async_trait::async_trait;
use solana_sdk::{
    account::Account, hash::Hash, pubkey::Pubkey, signature::Signature,
    transaction::Transaction,
};

use crate::error::LedgerError;

/// Commitment reached by a submitted transaction, lowest first
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ConfirmationStatus {
    Processed,
    Confirmed,
    Finalized,
}

impl ConfirmationStatus {
    pub fn is_finalized(&self) -> bool {
        matches!(self, ConfirmationStatus::Finalized)
    }
}

impl fmt::Display for ConfirmationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfirmationStatus::Processed => "processed",
            ConfirmationStatus::Confirmed => "confirmed",
            ConfirmationStatus::Finalized => "finalized",
        };
        f.write_str(name)
    }
}

/// Options forwarded to the node with a submission
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SendOptions {
    /// Skip the node side simulation before accepting the transaction
    pub skip_preflight: bool,
}

/// Transactions that landed but failed to execute are reported the same way by
/// [`LedgerClient::wait_for_confirmation`] and [`LedgerClient::signature_status`]:
/// as `Err(LedgerError::Rejected(_))` carrying the execution error.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Blockhash to sign new transactions against
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError>;

    /// Submit a fully signed transaction
    async fn send_transaction(
        &self,
        transaction: &Transaction,
        options: SendOptions,
    ) -> Result<Signature, LedgerError>;

    /// Block until `signature` reaches `level`. Fails on timeout or when the node
    /// has not indexed the signature yet, and with `Rejected` when the transaction
    /// executed with an error.
    async fn wait_for_confirmation(
        &self,
        signature: &Signature,
        level: ConfirmationStatus,
    ) -> Result<(), LedgerError>;

    /// Current status of `signature`, `None` while the node does not know it.
    /// `Rejected` when the transaction executed with an error.
    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<ConfirmationStatus>, LedgerError>;

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, LedgerError>;

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError>;

    async fn minimum_balance_for_rent_exemption(&self, data_len: usize)
        -> Result<u64, LedgerError>;
}
