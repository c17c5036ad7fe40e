//! Transaction submission with bounded confirmation polling
//!
//! A submission is only retried up to the node: once the ledger accepted the
//! transaction the signature is handed back to the caller, whatever the confirmation
//! outcome. Right after submission a finalize wait can fail although the transaction
//! landed, because the node acknowledged it before indexing its status. The submitter
//! then falls back to reading the status a bounded number of times.

use std::time::Duration;

use solana_sdk::{
    instruction::Instruction,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use tracing::{debug, info, warn};

use crate::constants::confirmation::{MAX_POLL_ATTEMPTS, POLL_INTERVAL};
use crate::error::{HarnessError, LedgerError, Result};
use crate::ledger::{ConfirmationStatus, LedgerClient, SendOptions};

/// Status polling applied when the finalize wait fails
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ConfirmationPolicy {
    /// Total number of status reads, the first one is immediate
    pub max_attempts: u32,
    /// Sleep between two reads
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_POLL_ATTEMPTS,
            poll_interval: POLL_INTERVAL,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SubmitOptions {
    /// Skip node side simulation, simulation runs by default
    pub skip_preflight: bool,
    pub confirmation: ConfirmationPolicy,
}

impl SubmitOptions {
    pub fn skip_preflight() -> Self {
        Self {
            skip_preflight: true,
            ..Default::default()
        }
    }
}

/// Outcome of the confirmation protocol
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Confirmation {
    /// The transaction reached finalized commitment
    Finalized,
    /// The transaction landed but its execution failed
    Failed(TransactionError),
    /// Polling gave up before finalization. The transaction may still finalize,
    /// callers needing a guarantee must check the status again.
    UnknownPending {
        last_status: Option<ConfirmationStatus>,
    },
}

impl Confirmation {
    pub fn is_finalized(&self) -> bool {
        matches!(self, Confirmation::Finalized)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmittedTransaction {
    pub signature: Signature,
    pub confirmation: Confirmation,
}

/// Builds a transaction paid by `fee_payer`, signs it with `signers` and the fee payer,
/// submits it and runs the confirmation protocol.
///
/// Submission failures are returned as is. Confirmation failures never are: the
/// signature is returned with [`Confirmation::UnknownPending`] instead, or with
/// [`Confirmation::Failed`] when the ledger reports a failed execution.
pub async fn sign_and_send_transaction_instructions(
    ledger: &dyn LedgerClient,
    signers: &[&Keypair],
    fee_payer: &Keypair,
    instructions: &[Instruction],
    options: &SubmitOptions,
) -> Result<SubmittedTransaction> {
    if instructions.is_empty() {
        return Err(HarnessError::EmptyInstructions);
    }

    info!(fee_payer = %fee_payer.pubkey(), "Fee payer");

    let mut keypairs: Vec<&Keypair> = Vec::with_capacity(signers.len() + 1);
    for keypair in signers.iter().copied().chain(std::iter::once(fee_payer)) {
        if !keypairs.iter().any(|k| k.pubkey() == keypair.pubkey()) {
            keypairs.push(keypair);
        }
    }

    let recent_blockhash = ledger.latest_blockhash().await?;
    let mut transaction = Transaction::new_with_payer(instructions, Some(&fee_payer.pubkey()));
    transaction.try_sign(keypairs.as_slice(), recent_blockhash)?;

    let signature = ledger
        .send_transaction(
            &transaction,
            SendOptions {
                skip_preflight: options.skip_preflight,
            },
        )
        .await?;
    debug!(%signature, instructions = instructions.len(), "Transaction submitted");

    let confirmation = confirm_signature(ledger, &signature, &options.confirmation).await;

    Ok(SubmittedTransaction {
        signature,
        confirmation,
    })
}

/// Waits for finalization once, then polls the status up to `policy.max_attempts` times
pub async fn confirm_signature(
    ledger: &dyn LedgerClient,
    signature: &Signature,
    policy: &ConfirmationPolicy,
) -> Confirmation {
    match ledger
        .wait_for_confirmation(signature, ConfirmationStatus::Finalized)
        .await
    {
        Ok(()) => return Confirmation::Finalized,
        Err(LedgerError::Rejected(err)) => {
            warn!(%signature, error = %err, "Transaction failed on-ledger");
            return Confirmation::Failed(err);
        }
        Err(err) => {
            warn!(%signature, error = %err, "Finalize wait failed, polling signature status");
        }
    }

    let mut last_status = None;
    for attempt in 1..=policy.max_attempts {
        match ledger.signature_status(signature).await {
            Ok(status) => last_status = status,
            Err(LedgerError::Rejected(err)) => {
                warn!(%signature, attempt, error = %err, "Transaction failed on-ledger");
                return Confirmation::Failed(err);
            }
            Err(err) => warn!(%signature, attempt, error = %err, "Signature status read failed"),
        }

        info!(
            %signature,
            attempt,
            status = ?last_status,
            "Waiting for confirmation"
        );

        if last_status.is_some_and(|status| status.is_finalized()) {
            return Confirmation::Finalized;
        }
        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.poll_interval).await;
        }
    }

    warn!(
        %signature,
        attempts = policy.max_attempts,
        status = ?last_status,
        "Signature not finalized, returning unconfirmed"
    );
    Confirmation::UnknownPending { last_status }
}
