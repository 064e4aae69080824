//! Service layer API for the swap marketplace.
//!
//! Every operation that touches more than one record runs in a single sled
//! transaction, so a failed guard leaves nothing behind and two racing
//! requests against the same item serialize.
mod accounts;
mod admin;
mod items;
mod moderation;
mod swaps;

pub use accounts::{NewAccount, UserSummary};
pub use admin::DashboardStats;
pub use items::BrowseQuery;
pub use moderation::Decision;
pub use swaps::SwapDetails;

use super::error::{MarketError, MarketResult};
use super::ledger::Account;
use super::store::Store;
use super::utils;
use std::sync::Arc;

#[derive(Clone)]
pub struct MarketService {
    store: Store,
}

impl MarketService {
    pub fn new(instance: Arc<sled::Db>) -> MarketResult<Self> {
        Ok(Self::with_store(Store::new(instance)?))
    }

    pub fn with_store(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    fn new_id(hrp: &str) -> MarketResult<String> {
        utils::new_uuid_to_bech32(hrp).map_err(|e| MarketError::Encoding(e.to_string()))
    }

    fn require_account(&self, id: &str) -> MarketResult<Account> {
        self.store
            .account(id)?
            .ok_or_else(|| MarketError::NotFound(format!("account {id}")))
    }

    fn require_admin(&self, id: &str) -> MarketResult<Account> {
        let account = self.require_account(id)?;
        account.ensure_admin()?;
        Ok(account)
    }
}
