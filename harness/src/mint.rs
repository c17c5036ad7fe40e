//! Token mint lifecycle
//!
//! A [`TokenMint`] goes `Active` on creation and `AuthorityTransferred` once minting
//! rights are handed to the central state. There is no way back: the previous
//! authority cannot mint anymore once the transfer landed.

use std::sync::Arc;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use spl_token::{instruction::AuthorityType, state::Mint};
use tracing::info;

use crate::constants::MINT_DECIMALS;
use crate::error::{HarnessError, Result};
use crate::ledger::LedgerClient;
use crate::submitter::{sign_and_send_transaction_instructions, SubmitOptions, SubmittedTransaction};
use crate::token::{
    create_mint, get_mint, get_or_create_associated_account, get_token_account, mint_to,
    set_authority_instruction,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MintState {
    /// Minting rights held by the authority the mint was created with
    Active,
    /// Minting rights moved to the central state key
    AuthorityTransferred,
}

/// Handle on one mint created by the harness
pub struct TokenMint {
    token: Arc<Keypair>,
    ledger: Arc<dyn LedgerClient>,
    fee_payer: Arc<Keypair>,
    /// Live mint authority as last set through this handle
    mint_authority: Pubkey,
    /// Signs `mint_into` until a central state authority is recorded
    authority: Arc<Keypair>,
    central_state_authority: Option<Arc<Keypair>>,
    state: MintState,
}

impl TokenMint {
    /// Creates a new mint with [`MINT_DECIMALS`] decimals and no freeze authority.
    ///
    /// Minting rights go to `mint_authority` when given, otherwise to the mint's own
    /// keypair.
    pub async fn init(
        ledger: Arc<dyn LedgerClient>,
        fee_payer: Arc<Keypair>,
        mint_authority: Option<Arc<Keypair>>,
    ) -> Result<Self> {
        let token = Arc::new(Keypair::new());
        let authority = mint_authority.unwrap_or_else(|| token.clone());

        let submitted = create_mint(
            ledger.as_ref(),
            &fee_payer,
            &authority.pubkey(),
            None,
            MINT_DECIMALS,
            &token,
            &SubmitOptions::default(),
        )
        .await?;
        info!(
            mint = %token.pubkey(),
            mint_authority = %authority.pubkey(),
            signature = %submitted.signature,
            "Mint created"
        );

        Ok(Self {
            mint_authority: authority.pubkey(),
            token,
            ledger,
            fee_payer,
            authority,
            central_state_authority: None,
            state: MintState::Active,
        })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.token.pubkey()
    }

    pub fn keypair(&self) -> &Keypair {
        &self.token
    }

    pub fn fee_payer(&self) -> &Keypair {
        &self.fee_payer
    }

    pub fn mint_authority(&self) -> Pubkey {
        self.mint_authority
    }

    pub fn central_state_authority(&self) -> Option<Pubkey> {
        self.central_state_authority.as_ref().map(|k| k.pubkey())
    }

    pub fn state(&self) -> MintState {
        self.state
    }

    pub fn decimals(&self) -> u8 {
        MINT_DECIMALS
    }

    /// Associated token account of `wallet`, created on first use and paid by the
    /// fee payer
    pub async fn get_associated_token_account(&self, wallet: &Pubkey) -> Result<Pubkey> {
        let account = get_or_create_associated_account(
            self.ledger.as_ref(),
            &self.fee_payer,
            &self.pubkey(),
            wallet,
        )
        .await?;
        Ok(account.address)
    }

    /// Mints `amount` base units into `token_account`.
    ///
    /// Signed by the recorded central state authority if any, otherwise by the
    /// authority the mint was created with. Authority freshness is left to the ledger.
    pub async fn mint_into(
        &self,
        token_account: &Pubkey,
        amount: u64,
    ) -> Result<SubmittedTransaction> {
        let authority = self
            .central_state_authority
            .as_ref()
            .unwrap_or(&self.authority);

        mint_to(
            self.ledger.as_ref(),
            &self.fee_payer,
            &self.pubkey(),
            token_account,
            authority,
            amount,
            &[],
            &SubmitOptions {
                skip_preflight: false,
                ..Default::default()
            },
        )
        .await
    }

    /// Hands minting rights over to `central_key`.
    ///
    /// On success the handle records `central_key` as mint authority and moves to
    /// [`MintState::AuthorityTransferred`]. The signing keypair is kept, so
    /// [`Self::mint_into`] keeps failing until the new authority is registered with
    /// [`Self::set_central_state_authority`].
    pub async fn update_authority_to_central_state(
        &mut self,
        mint_authority_keypair: &Keypair,
        fee_payer: &Keypair,
        central_key: &Pubkey,
    ) -> Result<SubmittedTransaction> {
        let instruction = set_authority_instruction(
            &self.pubkey(),
            &mint_authority_keypair.pubkey(),
            AuthorityType::MintTokens,
            Some(central_key),
        )?;

        let submitted = sign_and_send_transaction_instructions(
            self.ledger.as_ref(),
            &[mint_authority_keypair],
            fee_payer,
            &[instruction],
            &SubmitOptions::default(),
        )
        .await?;
        info!(
            mint = %self.pubkey(),
            %central_key,
            signature = %submitted.signature,
            "Move mint authority to central key"
        );

        self.mint_authority = *central_key;
        self.state = MintState::AuthorityTransferred;
        if self.central_state_authority() != Some(*central_key) {
            self.central_state_authority = None;
        }
        Ok(submitted)
    }

    /// Records the keypair of the current mint authority so that it signs
    /// [`Self::mint_into`]
    pub fn set_central_state_authority(&mut self, keypair: Arc<Keypair>) -> Result<()> {
        if keypair.pubkey() != self.mint_authority {
            return Err(HarnessError::AuthorityMismatch {
                expected: self.mint_authority,
                actual: keypair.pubkey(),
            });
        }
        self.central_state_authority = Some(keypair);
        Ok(())
    }

    /// On-ledger mint state
    pub async fn fetch(&self) -> Result<Mint> {
        get_mint(self.ledger.as_ref(), &self.pubkey()).await
    }

    pub async fn supply(&self) -> Result<u64> {
        Ok(self.fetch().await?.supply)
    }

    /// Balance of `token_account` in base units
    pub async fn balance(&self, token_account: &Pubkey) -> Result<u64> {
        let account = get_token_account(self.ledger.as_ref(), token_account).await?;
        if account.state.mint != self.pubkey() {
            return Err(HarnessError::InvalidAccountData(*token_account));
        }
        Ok(account.state.amount)
    }
}
