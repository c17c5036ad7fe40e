use std::sync::Arc;

use access_harness::{
    funding::{new_funded_payer, FundingPolicy},
    ConfirmationStatus, HarnessError, LedgerClient, LedgerError, Result as HarnessResult,
    SendOptions,
};
use async_trait::async_trait;
use solana_banks_interface::TransactionConfirmationStatus;
use solana_program_test::{BanksClient, BanksClientError, ProgramTest, ProgramTestContext};
use solana_sdk::{
    account::Account,
    commitment_config::CommitmentLevel,
    hash::Hash,
    instruction::InstructionError,
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use solana_system_interface::instruction as system_instruction;
use spl_token::error::TokenError;
use tokio::sync::Mutex;

/// [`LedgerClient`] over the in-process banks server.
///
/// The test bank has a single fork, so a transaction known to the status cache is
/// treated as confirmed at any level. Airdrops are transfers from the genesis payer.
pub struct BanksLedger {
    banks_client: Mutex<BanksClient>,
    payer: Keypair,
}

impl BanksLedger {
    pub fn new(context: &ProgramTestContext) -> Self {
        Self {
            banks_client: Mutex::new(context.banks_client.clone()),
            payer: context.payer.insecure_clone(),
        }
    }
}

fn ledger_error(err: BanksClientError) -> LedgerError {
    match err {
        BanksClientError::TransactionError(err) => LedgerError::Rejected(err),
        BanksClientError::SimulationError { err, .. } => LedgerError::Rejected(err),
        other => LedgerError::Rpc(other.to_string()),
    }
}

#[async_trait]
impl LedgerClient for BanksLedger {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        let mut banks_client = self.banks_client.lock().await;
        banks_client.get_latest_blockhash().await.map_err(ledger_error)
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        options: SendOptions,
    ) -> Result<Signature, LedgerError> {
        let mut banks_client = self.banks_client.lock().await;
        let result = if options.skip_preflight {
            banks_client
                .process_transaction_with_commitment(transaction.clone(), CommitmentLevel::Confirmed)
                .await
        } else {
            banks_client
                .process_transaction_with_preflight(transaction.clone())
                .await
        };
        result.map_err(ledger_error)?;
        Ok(transaction.signatures[0])
    }

    async fn wait_for_confirmation(
        &self,
        signature: &Signature,
        _level: ConfirmationStatus,
    ) -> Result<(), LedgerError> {
        let mut banks_client = self.banks_client.lock().await;
        let status = banks_client
            .get_transaction_status(*signature)
            .await
            .map_err(ledger_error)?;
        match status {
            Some(status) => match status.err {
                Some(err) => Err(LedgerError::Rejected(err)),
                None => Ok(()),
            },
            None => Err(LedgerError::ConfirmationTimeout(*signature)),
        }
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<ConfirmationStatus>, LedgerError> {
        let mut banks_client = self.banks_client.lock().await;
        let status = banks_client
            .get_transaction_status(*signature)
            .await
            .map_err(ledger_error)?;
        if let Some(err) = status.as_ref().and_then(|status| status.err.clone()) {
            return Err(LedgerError::Rejected(err));
        }
        Ok(status
            .and_then(|status| status.confirmation_status)
            .map(|status| match status {
                TransactionConfirmationStatus::Processed => ConfirmationStatus::Processed,
                TransactionConfirmationStatus::Confirmed => ConfirmationStatus::Confirmed,
                TransactionConfirmationStatus::Finalized => ConfirmationStatus::Finalized,
            }))
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, LedgerError> {
        let mut banks_client = self.banks_client.lock().await;
        let recent_blockhash = banks_client
            .get_latest_blockhash()
            .await
            .map_err(ledger_error)?;
        let transaction = Transaction::new_signed_with_payer(
            &[system_instruction::transfer(
                &self.payer.pubkey(),
                to,
                lamports,
            )],
            Some(&self.payer.pubkey()),
            &[&self.payer],
            recent_blockhash,
        );
        banks_client
            .process_transaction(transaction.clone())
            .await
            .map_err(ledger_error)?;
        Ok(transaction.signatures[0])
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        let mut banks_client = self.banks_client.lock().await;
        banks_client.get_account(*address).await.map_err(ledger_error)
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError> {
        let mut banks_client = self.banks_client.lock().await;
        let rent = banks_client.get_rent().await.map_err(ledger_error)?;
        Ok(rent.minimum_balance(data_len))
    }
}

/// Ledger whose finalize wait always fails, as when the node acknowledges a
/// transaction before indexing it
pub struct RacingLedger {
    pub inner: BanksLedger,
}

#[async_trait]
impl LedgerClient for RacingLedger {
    async fn latest_blockhash(&self) -> Result<Hash, LedgerError> {
        self.inner.latest_blockhash().await
    }

    async fn send_transaction(
        &self,
        transaction: &Transaction,
        options: SendOptions,
    ) -> Result<Signature, LedgerError> {
        self.inner.send_transaction(transaction, options).await
    }

    async fn wait_for_confirmation(
        &self,
        signature: &Signature,
        _level: ConfirmationStatus,
    ) -> Result<(), LedgerError> {
        Err(LedgerError::ConfirmationTimeout(*signature))
    }

    async fn signature_status(
        &self,
        signature: &Signature,
    ) -> Result<Option<ConfirmationStatus>, LedgerError> {
        self.inner.signature_status(signature).await
    }

    async fn request_airdrop(&self, to: &Pubkey, lamports: u64) -> Result<Signature, LedgerError> {
        self.inner.request_airdrop(to, lamports).await
    }

    async fn get_account(&self, address: &Pubkey) -> Result<Option<Account>, LedgerError> {
        self.inner.get_account(address).await
    }

    async fn minimum_balance_for_rent_exemption(
        &self,
        data_len: usize,
    ) -> Result<u64, LedgerError> {
        self.inner.minimum_balance_for_rent_exemption(data_len).await
    }
}

/// Name of the access protocol program binary, `access_protocol.so`
pub const ACCESS_PROGRAM_NAME: &str = "access_protocol";

/// Starts `program_test` and wraps its banks client.
///
/// The context must outlive the ledger: it keeps the bank advancing.
pub async fn start(program_test: ProgramTest) -> (ProgramTestContext, Arc<BanksLedger>) {
    let context = program_test.start_with_context().await;
    let ledger = Arc::new(BanksLedger::new(&context));
    (context, ledger)
}

/// Starts a validator with the SPL token and associated token account programs.
pub async fn start_with_ledger() -> (ProgramTestContext, Arc<BanksLedger>) {
    start(ProgramTest::default()).await
}

/// Starts a validator with `<program_name>.so` deployed at `program_id`.
///
/// The binary is looked up in `BPF_OUT_DIR`, `SBF_OUT_DIR` or `tests/fixtures`.
pub async fn start_with_program(
    program_name: &'static str,
    program_id: Pubkey,
) -> (ProgramTestContext, Arc<BanksLedger>) {
    let mut pt = ProgramTest::new(program_name, program_id, None);
    pt.prefer_bpf(true);
    start(pt).await
}

/// Funded payer from the genesis account
pub async fn funded_payer(ledger: &dyn LedgerClient) -> Arc<Keypair> {
    let policy = FundingPolicy {
        max_attempts: Some(3),
        ..Default::default()
    };
    Arc::new(
        new_funded_payer(ledger, &policy)
            .await
            .expect("funding a payer"),
    )
}

/// Helper function to assert that a transaction failed with a specific token program error
pub fn assert_token_error<T: std::fmt::Debug>(result: HarnessResult<T>, expected_error: TokenError) {
    match result {
        Err(e) => match e.transaction_error() {
            Some(TransactionError::InstructionError(_, InstructionError::Custom(error_code))) => {
                let expected_code = expected_error as u32;
                assert_eq!(
                    *error_code, expected_code,
                    "Expected error code {}, but got error code {}",
                    expected_code, error_code
                );
            }
            Some(other) => panic!("Expected custom instruction error, got: {:?}", other),
            None => panic!("Expected ledger rejection, got: {:?}", e),
        },
        Ok(value) => panic!("Expected transaction to fail, but it succeeded: {:?}", value),
    }
}

pub fn assert_transaction_success<T>(result: HarnessResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!(
            "Expected transaction to succeed, but it failed with: {:?}",
            e
        ),
    }
}

pub fn assert_ledger_rejection<T: std::fmt::Debug>(result: HarnessResult<T>) {
    match result {
        Err(HarnessError::Ledger(LedgerError::Rejected(_))) => {}
        Err(e) => panic!("Expected ledger rejection, got: {:?}", e),
        Ok(value) => panic!("Expected transaction to fail, but it succeeded: {:?}", value),
    }
}
