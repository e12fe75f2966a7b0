//! Season and quota reads from the vouching contract
//!
//! A season is a time-boxed quota window tracked on-chain. The reader is
//! pure: it derives "remaining vouches" from the current season's per-account
//! limit and the caller's consumed count. Reads reflect the last confirmed
//! block, never pending transactions.
//!
//! Any read failure (contract not deployed, RPC down) yields "unknown"
//! rather than an error or a zero: the UI must treat unknown as unavailable,
//! not as an exhausted quota.

pub mod mock;
pub mod rpc;

pub use mock::MockSeasonContract;
pub use rpc::RpcSeasonContract;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Errors from contract reads
#[derive(Debug, Error)]
pub enum ContractError {
    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("malformed contract response: {0}")]
    Decode(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// One vouching season as stored by the contract. Immutable once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    pub start_timestamp: u64,
    pub end_timestamp: u64,
    pub max_account_vouches: u64,
    pub max_total_vouches: u64,
    pub total_vouches: u64,
}

/// Per-(wallet, season) counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountVouchState {
    pub total_vouches: u64,
    pub last_vouch_timestamp: u64,
}

/// Where a timestamp falls within a season window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonProgress {
    NotStarted,
    /// Percentage of the window elapsed, 0..=100
    Active { percent: u8 },
    Ended,
}

impl Season {
    /// Progress of the season window at `now` (unix seconds)
    pub fn progress(&self, now: u64) -> SeasonProgress {
        if now < self.start_timestamp {
            return SeasonProgress::NotStarted;
        }
        if now >= self.end_timestamp {
            return SeasonProgress::Ended;
        }
        let window = self.end_timestamp - self.start_timestamp;
        let elapsed = now - self.start_timestamp;
        // window > 0 here since start <= now < end
        let percent = (elapsed * 100 / window) as u8;
        SeasonProgress::Active { percent }
    }

    /// Remaining quota for an account in this season, never negative
    pub fn remaining_for(&self, account: &AccountVouchState) -> u64 {
        self.max_account_vouches.saturating_sub(account.total_vouches)
    }
}

/// Contract read seam
#[async_trait]
pub trait SeasonContract: Send + Sync {
    /// Index of the currently active season
    async fn current_season(&self) -> Result<u64, ContractError>;

    /// Window and limits for a season
    async fn vouching_season(&self, season: u64) -> Result<Season, ContractError>;

    /// Consumed-vouch counters for an account within a season
    async fn account_vouches(
        &self,
        address: Address,
        season: u64,
    ) -> Result<AccountVouchState, ContractError>;
}

/// Remaining vouches for `address` in the current season.
///
/// `None` means unknown: some read failed and the value must not be shown
/// as zero. Failures are logged here so callers can stay silent.
pub async fn remaining_vouches(
    contract: &dyn SeasonContract,
    address: Address,
) -> Option<u64> {
    let result = async {
        let current = contract.current_season().await?;
        let season = contract.vouching_season(current).await?;
        let account = contract.account_vouches(address, current).await?;
        Ok::<u64, ContractError>(season.remaining_for(&account))
    }
    .await;

    match result {
        Ok(remaining) => Some(remaining),
        Err(e) => {
            warn!(%address, error = %e, "season quota read failed");
            None
        }
    }
}
