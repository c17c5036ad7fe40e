use std::time::Duration;

/// Decimals of every mint created by the harness
pub const MINT_DECIMALS: u8 = 6;

/// Lamports in one SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Amount requested when funding a fresh payer
pub const DEFAULT_AIRDROP_LAMPORTS: u64 = 10 * LAMPORTS_PER_SOL;

/// Confirmation polling
pub mod confirmation {
    use super::Duration;

    /// Total status reads after the initial finalize wait fails
    pub const MAX_POLL_ATTEMPTS: u32 = 5;
    /// Delay between two status reads
    pub const POLL_INTERVAL: Duration = Duration::from_secs(1);
}

/// Backoff between two funding attempts
pub const FUNDING_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Login nonce cache
pub mod nonce {
    use super::Duration;

    /// Key prefix, the user id is appended as is
    pub const KEY_PREFIX: &str = "nonce:";
    /// Lifetime of a stored nonce
    pub const EXPIRY: Duration = Duration::from_secs(10 * 60);
    /// Default Redis endpoint
    pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
}
