//! [`LedgerClient`] over the JSON RPC client of a running validator

use async_trait::async_trait;
use solana_client::{
    client_error::ClientError, nonblocking::rpc_client::RpcClient,
    rpc_config::RpcSendTransactionConfig,
};
use solana_sdk::{
    account::Account,
    commitment_config::{CommitmentConfig, CommitmentLevel},
    hash::Hash,
    pubkey::Pubkey,
    signature::Signature,
    transaction::{Transaction, TransactionError},
};
use solana_transaction_status_client_types::TransactionConfirmationStatus;

use crate::error::LedgerError;
use crate::ledger::{ConfirmationStatus, LedgerClient, SendOptions};

pub const LOCALHOST_URL: &str = "http://127.0.0.1:8899";

pub struct RpcLedger {
    client: RpcClient,
}

impl RpcLedger {
    pub fn new(url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            client: RpcClient::new_with_commitment(url.into(), commitment),
        }
    }

    /// Local test validator at finalized commitment
    pub fn localhost() -> Self {
        Self::new(LOCALHOST_URL, CommitmentConfig::finalized())
    }

    pub fn client(&self) -> &RpcClient {
        &self.client
    }
}

fn ledger_error(err: ClientError) -> LedgerError {
    match err.get_transaction_error() {
        Some(transaction_error) => LedgerError::Rejected(transaction_error),
        None => LedgerError::Rpc(err.to_string()),
    }
}

/// Execution outcome of a signature the node reported at the awaited commitment
fn execution_result(
    signature: &Signature,
    status: Option<Result<(), TransactionError>>,
) -> Result<(), LedgerError> {
    match status {
        Some(Ok(())) => Ok(()),
        Some(Err(err)) => Err(LedgerError::Rejected(err)),
        None => Err(LedgerError::ConfirmationTimeout(*signature)),
    }
}

fn commitment_config(level: ConfirmationStatus) -> CommitmentConfig {
    let commitment = match level {
        ConfirmationStatus::Processed => CommitmentLevel::Processed,
        ConfirmationStatus::Confirmed => CommitmentLevel::Confirmed,
        ConfirmationStatus::Finalized => CommitmentLevel::Finalized,
    };
    CommitmentConfig { commitment }
}

#[async_trait]
impl LedgerClient for RpcLedger {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        self.client.get_latest_blockhash().await.map_err(ledger_error)
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        options: SendOptions,
    ) -> Result<Signature, LedgerError> {
        let config = RpcSendTransactionConfig {
            skip_preflight: options.skip_preflight,
            preflight_commitment: Some(self.client.commitment().commitment),
            ..Default::default()
        };
        self.client
            .send_transaction_with_config(transaction, config)
            .await
            .map_err(ledger_error)
    }

    async fn wait_for_confirmation(
        &self,
        signature: &Signature,
        level: ConfirmationStatus,
    ) -> Result<(), LedgerError> {
        let commitment = commitment_config(level);
        // The poll returns once the signature is known, whether or not it executed.
        self.client
            .poll_for_signature_with_commitment(signature, commitment)
            .await
            .map_err(ledger_error)?;
        let status = self
            .client
            .get_signature_status_with_commitment(signature, commitment)
            .await
            .map_err(ledger_error)?;
        execution_result(signature, status)
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<ConfirmationStatus>, LedgerError> {
        let response = self
            .client
            .get_signature_statuses(&[*signature])
            .await
            .map_err(ledger_error)?;

        let status = match response.value.into_iter().next().flatten() {
            Some(status) => status,
            None => return Ok(None),
        };
        if let Some(err) = status.err {
            return Err(LedgerError::Rejected(err));
        }
        Ok(status.confirmation_status.map(|status| match status {
            TransactionConfirmationStatus::Processed => ConfirmationStatus::Processed,
            TransactionConfirmationStatus::Confirmed => ConfirmationStatus::Confirmed,
            TransactionConfirmationStatus::Finalized => ConfirmationStatus::Finalized,
        }))
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, LedgerError> {
        self.client
            .request_airdrop(to, lamports)
            .await
            .map_err(ledger_error)
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        self.client
            .get_account_with_commitment(address, self.client.commitment())
            .await
            .map(|response| response.value)
            .map_err(ledger_error)
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError> {
        self.client
            .get_minimum_balance_for_rent_exemption(data_len)
            .await
            .map_err(ledger_error)
    }
}
