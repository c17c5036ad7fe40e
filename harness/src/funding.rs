//! Account funding
//!
//! Test validators reject airdrops until they are ready to serve requests, so
//! funding keeps retrying with a fixed backoff. The retry is unbounded unless the
//! policy caps it.

use std::time::Duration;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
};
use tracing::{info, warn};

use crate::constants::{DEFAULT_AIRDROP_LAMPORTS, FUNDING_RETRY_DELAY};
use crate::error::{HarnessError, LedgerError, Result};
use crate::ledger::{ConfirmationStatus, LedgerClient};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FundingPolicy {
    pub lamports: u64,
    pub retry_delay: Duration,
    /// `None` retries until the validator answers
    pub max_attempts: Option<u32>,
}

impl Default for FundingPolicy {
    fn default() -> Self {
        Self {
            lamports: DEFAULT_AIRDROP_LAMPORTS,
            retry_delay: FUNDING_RETRY_DELAY,
            max_attempts: None,
        }
    }
}

/// Airdrops `policy.lamports` to `account` and waits for the airdrop to finalize
pub async fn airdrop_payer(
    ledger: &dyn LedgerClient,
    account: &Pubkey,
    policy: &FundingPolicy,
) -> Result<Signature> {
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        match request_and_confirm(ledger, account, policy.lamports).await {
            Ok(signature) => {
                info!(%account, %signature, lamports = policy.lamports, "Airdrop signature");
                return Ok(signature);
            }
            Err(err) => warn!(%account, attempts, error = %err, "Error airdropping"),
        }

        if policy.max_attempts.is_some_and(|max| attempts >= max) {
            return Err(HarnessError::FundingExhausted {
                account: *account,
                attempts,
            });
        }
        tokio::time::sleep(policy.retry_delay).await;
    }
}

async fn request_and_confirm(
    ledger: &dyn LedgerClient,
    account: &Pubkey,
    lamports: u64,
) -> std::result::Result<Signature, LedgerError> {
    let signature = ledger.request_airdrop(account, lamports).await?;
    ledger
        .wait_for_confirmation(&signature, ConfirmationStatus::Finalized)
        .await?;
    Ok(signature)
}

/// Fresh keypair funded according to `policy`
pub async fn new_funded_payer(ledger: &dyn LedgerClient, policy: &FundingPolicy) -> Result<Keypair> {
    let payer = Keypair::new();
    airdrop_payer(ledger, &payer.pubkey(), policy).await?;
    Ok(payer)
}
