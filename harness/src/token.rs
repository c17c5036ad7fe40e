//! SPL token primitives
//!
//! Mint creation, associated account provisioning, minting and authority
//! instructions for the classic token program. Every write goes through
//! [`sign_and_send_transaction_instructions`].

use solana_program_pack::Pack;
use solana_sdk::{
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
};
use solana_system_interface::instruction as system_instruction;
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account_idempotent,
};
use spl_token::{
    instruction::{self as token_instruction, AuthorityType},
    state::{Account as SplAccount, Mint},
};
use tracing::debug;

use crate::error::{HarnessError, Result};
use crate::ledger::LedgerClient;
use crate::submitter::{sign_and_send_transaction_instructions, SubmitOptions, SubmittedTransaction};

/// Token account address together with its decoded state
#[derive(Clone, Debug, PartialEq)]
pub struct TokenAccount {
    pub address: Pubkey,
    pub state: SplAccount,
}

/// Allocates `mint_keypair` and initializes it as a mint
pub async fn create_mint(
    ledger: &dyn LedgerClient,
    payer: &Keypair,
    mint_authority: &Pubkey,
    freeze_authority: Option<&Pubkey>,
    decimals: u8,
    mint_keypair: &Keypair,
    options: &SubmitOptions,
) -> Result<SubmittedTransaction> {
    let lamports = ledger.minimum_balance_for_rent_exemption(Mint::LEN).await?;
    let instructions = [
        system_instruction::create_account(
            &payer.pubkey(),
            &mint_keypair.pubkey(),
            lamports,
            Mint::LEN as u64,
            &spl_token::id(),
        ),
        token_instruction::initialize_mint2(
            &spl_token::id(),
            &mint_keypair.pubkey(),
            mint_authority,
            freeze_authority,
            decimals,
        )?,
    ];

    debug!(
        mint = %mint_keypair.pubkey(),
        %mint_authority,
        decimals,
        "Creating mint"
    );
    sign_and_send_transaction_instructions(ledger, &[mint_keypair], payer, &instructions, options)
        .await
}

/// Returns the associated token account of `wallet` for `mint`, creating it first
/// when it does not exist yet
pub async fn get_or_create_associated_account(
    ledger: &dyn LedgerClient,
    payer: &Keypair,
    mint: &Pubkey,
    wallet: &Pubkey,
) -> Result<TokenAccount> {
    let address = get_associated_token_address(wallet, mint);

    if ledger.get_account(&address).await?.is_none() {
        debug!(%address, %wallet, %mint, "Creating associated token account");
        let instruction =
            create_associated_token_account_idempotent(&payer.pubkey(), wallet, mint, &spl_token::id());
        sign_and_send_transaction_instructions(
            ledger,
            &[],
            payer,
            &[instruction],
            &SubmitOptions::default(),
        )
        .await?;
    }

    let account = get_token_account(ledger, &address).await?;
    if account.state.mint != *mint || account.state.owner != *wallet {
        return Err(HarnessError::InvalidAccountData(address));
    }
    Ok(account)
}

/// Mints `amount` base units of `mint` into `destination`
#[allow(clippy::too_many_arguments)]
pub async fn mint_to(
    ledger: &dyn LedgerClient,
    payer: &Keypair,
    mint: &Pubkey,
    destination: &Pubkey,
    authority: &Keypair,
    amount: u64,
    multisigners: &[&Keypair],
    options: &SubmitOptions,
) -> Result<SubmittedTransaction> {
    let signer_pubkeys: Vec<Pubkey> = multisigners.iter().map(|s| s.pubkey()).collect();
    let signer_refs: Vec<&Pubkey> = signer_pubkeys.iter().collect();
    let instruction = token_instruction::mint_to(
        &spl_token::id(),
        mint,
        destination,
        &authority.pubkey(),
        &signer_refs,
        amount,
    )?;

    let mut signers = Vec::with_capacity(multisigners.len() + 1);
    signers.push(authority);
    signers.extend_from_slice(multisigners);

    sign_and_send_transaction_instructions(ledger, &signers, payer, &[instruction], options).await
}

/// `SetAuthority` instruction for `mint`, `None` clears the authority
pub fn set_authority_instruction(
    mint: &Pubkey,
    current_authority: &Pubkey,
    authority_type: AuthorityType,
    new_authority: Option<&Pubkey>,
) -> Result<Instruction> {
    Ok(token_instruction::set_authority(
        &spl_token::id(),
        mint,
        new_authority,
        authority_type,
        current_authority,
        &[],
    )?)
}

pub async fn get_mint(ledger: &dyn LedgerClient, mint: &Pubkey) -> Result<Mint> {
    let account = ledger
        .get_account(mint)
        .await?
        .ok_or(HarnessError::AccountNotFound(*mint))?;
    if account.owner != spl_token::id() {
        return Err(HarnessError::InvalidAccountData(*mint));
    }
    Mint::unpack(&account.data).map_err(|_| HarnessError::InvalidAccountData(*mint))
}

pub async fn get_token_account(ledger: &dyn LedgerClient, address: &Pubkey) -> Result<TokenAccount> {
    let account = ledger
        .get_account(address)
        .await?
        .ok_or(HarnessError::AccountNotFound(*address))?;
    if account.owner != spl_token::id() {
        return Err(HarnessError::InvalidAccountData(*address));
    }
    let state =
        SplAccount::unpack(&account.data).map_err(|_| HarnessError::InvalidAccountData(*address))?;
    Ok(TokenAccount {
        address: *address,
        state,
    })
}
