//! Mock season contract for tests

use super::{AccountVouchState, ContractError, Season, SeasonContract};
use alloy::primitives::Address;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// In-memory season contract double
pub struct MockSeasonContract {
    current: u64,
    seasons: Mutex<HashMap<u64, Season>>,
    accounts: Mutex<HashMap<(Address, u64), AccountVouchState>>,
    fail: AtomicBool,
}

impl MockSeasonContract {
    /// A contract with one season at the given index
    pub fn new(current: u64, season: Season) -> Self {
        let mut seasons = HashMap::new();
        seasons.insert(current, season);
        Self {
            current,
            seasons: Mutex::new(seasons),
            accounts: Mutex::new(HashMap::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Set the counters for an account in the current season
    pub fn set_account(&self, address: Address, state: AccountVouchState) {
        self.accounts
            .lock()
            .expect("mock lock poisoned")
            .insert((address, self.current), state);
    }

    /// Make every read fail (RPC outage, undeployed contract)
    pub fn fail(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<(), ContractError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(ContractError::Rpc("mock contract failure".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SeasonContract for MockSeasonContract {
    async fn current_season(&self) -> Result<u64, ContractError> {
        self.check_failure()?;
        Ok(self.current)
    }

    async fn vouching_season(&self, season: u64) -> Result<Season, ContractError> {
        self.check_failure()?;
        self.seasons
            .lock()
            .expect("mock lock poisoned")
            .get(&season)
            .copied()
            .ok_or_else(|| ContractError::Rpc(format!("no season {season}")))
    }

    async fn account_vouches(
        &self,
        address: Address,
        season: u64,
    ) -> Result<AccountVouchState, ContractError> {
        self.check_failure()?;
        Ok(self
            .accounts
            .lock()
            .expect("mock lock poisoned")
            .get(&(address, season))
            .copied()
            .unwrap_or(AccountVouchState {
                total_vouches: 0,
                last_vouch_timestamp: 0,
            }))
    }
}
