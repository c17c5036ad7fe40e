//! Access Protocol Test Harness
//!
//! Off-chain helpers used by the Access protocol test suites: a ledger client seam,
//! transaction submission with bounded confirmation polling, SPL token primitives,
//! a mint lifecycle manager, account funding and the login nonce cache.

pub mod constants;
pub mod error;
pub mod funding;
pub mod ledger;
pub mod mint;
pub mod nonce;
pub mod submitter;
pub mod token;

#[cfg(feature = "rpc")]
pub mod rpc;


pub use error::{HarnessError, LedgerError, Result};
pub use ledger::{ConfirmationStatus, LedgerClient, SendOptions};
pub use mint::{MintState, TokenMint};
pub use submitter::{
    sign_and_send_transaction_instructions, Confirmation, ConfirmationPolicy, SubmitOptions,
    SubmittedTransaction,
};

#[cfg(feature = "rpc")]
pub use rpc::RpcLedger;
