//! User accounts and the points ledger
use super::error::{MarketError, MarketResult};
use super::types::TimeStamp;
use chrono::Utc;

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct Account {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub username: String,
    #[n(2)]
    pub name: String,
    #[n(3)]
    pub email: String,
    #[n(4)]
    pub password_hash: String,
    #[n(5)]
    pub is_admin: bool,
    #[n(6)]
    pub points_balance: u64,
    #[n(7)]
    pub created_at: TimeStamp<Utc>,
}

/// Why a balance moved. Every entry is attributable to one swap or one grant.
#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub enum LedgerCause {
    #[n(0)]
    Swap(#[n(0)] String),
    #[n(1)]
    Grant(#[n(0)] String),
}

#[derive(minicbor::Encode, minicbor::Decode, Debug, Clone, Eq, PartialEq)]
pub struct LedgerEntry {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub account_id: String,
    #[n(2)]
    pub delta: i64,
    #[n(3)]
    pub balance_after: u64,
    #[n(4)]
    pub cause: LedgerCause,
    #[n(5)]
    pub timestamp: TimeStamp<Utc>,
}

impl Account {
    pub fn new(id: String, username: String, name: String, email: String, password_hash: String) -> Self {
        Self {
            id,
            username,
            name,
            email,
            password_hash,
            is_admin: false,
            points_balance: 0,
            created_at: TimeStamp::new(),
        }
    }

    pub fn ensure_admin(&self) -> MarketResult<()> {
        if !self.is_admin {
            return Err(MarketError::PermissionDenied(format!(
                "{} is not an administrator",
                self.username
            )));
        }
        Ok(())
    }

    pub fn can_afford(&self, amount: u64) -> bool {
        amount <= self.points_balance
    }

    /// Withdraw `amount`; the balance never goes below zero.
    pub fn debit(&mut self, entry_id: String, amount: u64, cause: LedgerCause) -> MarketResult<LedgerEntry> {
        let balance = self
            .points_balance
            .checked_sub(amount)
            .ok_or(MarketError::InsufficientPoints {
                requested: amount,
                balance: self.points_balance,
            })?;
        let delta = signed(amount)?;
        self.points_balance = balance;
        Ok(self.entry(entry_id, -delta, cause))
    }

    pub fn credit(&mut self, entry_id: String, amount: u64, cause: LedgerCause) -> MarketResult<LedgerEntry> {
        let balance = self
            .points_balance
            .checked_add(amount)
            .ok_or_else(|| MarketError::InvalidState(format!("balance of {} would overflow", self.id)))?;
        let delta = signed(amount)?;
        self.points_balance = balance;
        Ok(self.entry(entry_id, delta, cause))
    }

    fn entry(&self, id: String, delta: i64, cause: LedgerCause) -> LedgerEntry {
        LedgerEntry {
            id,
            account_id: self.id.clone(),
            delta,
            balance_after: self.points_balance,
            cause,
            timestamp: TimeStamp::new(),
        }
    }
}

fn signed(amount: u64) -> MarketResult<i64> {
    i64::try_from(amount).map_err(|_| MarketError::Validation(format!("amount {amount} is too large")))
}
