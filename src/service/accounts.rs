use super::MarketService;
use crate::audit::{AuditEvent, AuditRecord};
use crate::auth;
use crate::error::{MarketError, MarketResult};
use crate::ledger::{Account, LedgerCause, LedgerEntry};
use crate::store::{check, fail, tx_audit, tx_ledger, tx_put, tx_require};
use crate::types::{Page, PageRequest};
use crate::utils::{GRANT_HRP, LEDGER_HRP, USER_HRP};
use sled::Transactional;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Account row of the admin user list.
#[derive(Debug, Clone)]
pub struct UserSummary {
    pub account: Account,
    pub items_count: usize,
    pub swaps_count: usize,
}

impl NewAccount {
    fn validate(&self) -> MarketResult<()> {
        for (field, value) in [
            ("username", &self.username),
            ("name", &self.name),
            ("email", &self.email),
            ("password", &self.password),
        ] {
            if value.trim().is_empty() {
                return Err(MarketError::Validation(format!("{field} is required")));
            }
        }
        if !self.email.contains('@') {
            return Err(MarketError::Validation("email is malformed".into()));
        }
        Ok(())
    }
}

impl MarketService {
    /// Register a new account with a zero balance.
    pub fn register(&self, new: NewAccount) -> MarketResult<Account> {
        new.validate()?;

        let id = Self::new_id(USER_HRP)?;
        let username = new.username.trim().to_string();
        let email = new.email.trim().to_lowercase();
        let password_hash = auth::hash_password(&new.password)?;
        let account = Account::new(
            id,
            username.clone(),
            new.name.trim().to_string(),
            email.clone(),
            password_hash,
        );

        let s = &self.store;
        (&s.accounts, &s.usernames, &s.emails).transaction(|(accounts, usernames, emails)| {
            if usernames.get(username.as_bytes())?.is_some() {
                return fail(MarketError::Conflict("username already exists".into()));
            }
            if emails.get(email.as_bytes())?.is_some() {
                return fail(MarketError::Conflict("email already exists".into()));
            }
            usernames.insert(username.as_bytes(), account.id.as_bytes())?;
            emails.insert(email.as_bytes(), account.id.as_bytes())?;
            tx_put(accounts, &account.id, &account)
        })?;

        info!(account_id = %account.id, username = %account.username, "account registered");
        Ok(account)
    }

    /// Check credentials. Unknown email and wrong password are indistinguishable.
    pub fn login(&self, email: &str, password: &str) -> MarketResult<Account> {
        let Some(id) = self.store.account_id_by_email(email.trim())? else {
            return Err(MarketError::Unauthorized);
        };
        let account = self.require_account(&id)?;
        if !auth::verify_password(password, &account.password_hash)? {
            warn!(account_id = %account.id, "failed login");
            return Err(MarketError::Unauthorized);
        }
        Ok(account)
    }

    pub fn account(&self, id: &str) -> MarketResult<Account> {
        self.require_account(id)
    }

    /// Administrative credit. The only way points enter the system.
    pub fn grant_points(&self, admin_id: &str, account_id: &str, amount: u64) -> MarketResult<Account> {
        if amount == 0 {
            return Err(MarketError::Validation("points must be a positive integer".into()));
        }
        let grant_id = Self::new_id(GRANT_HRP)?;
        let entry_id = Self::new_id(LEDGER_HRP)?;

        let s = &self.store;
        let account = (&s.accounts, &s.ledger, &s.audit).transaction(|(accounts, ledger, audit)| {
            let admin: Account = tx_require(accounts, "account", admin_id)?;
            check(admin.ensure_admin())?;

            let mut account: Account = tx_require(accounts, "account", account_id)?;
            let entry = check(account.credit(
                entry_id.clone(),
                amount,
                LedgerCause::Grant(grant_id.clone()),
            ))?;

            tx_put(accounts, &account.id, &account)?;
            tx_ledger(ledger, &entry)?;
            tx_audit(
                audit,
                &AuditRecord::new(&account.id, &admin.id, AuditEvent::PointsGranted { amount }),
            )?;
            Ok(account)
        })?;

        info!(
            account_id = %account.id,
            admin = %admin_id,
            grant_id = %grant_id,
            amount,
            balance = account.points_balance,
            "points granted"
        );
        Ok(account)
    }

    /// Ledger entries for one account, oldest first.
    pub fn ledger_history(&self, account_id: &str) -> MarketResult<Vec<LedgerEntry>> {
        self.require_account(account_id)?;
        let mut entries: Vec<_> = self
            .store
            .ledger_entries()?
            .into_iter()
            .filter(|e| e.account_id == account_id)
            .collect();
        entries.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(entries)
    }

    pub fn toggle_admin(&self, admin_id: &str, account_id: &str) -> MarketResult<Account> {
        if admin_id == account_id {
            return Err(MarketError::Validation(
                "cannot modify your own admin status".into(),
            ));
        }

        let s = &self.store;
        let account = (&s.accounts, &s.audit).transaction(|(accounts, audit)| {
            let admin: Account = tx_require(accounts, "account", admin_id)?;
            check(admin.ensure_admin())?;

            let mut account: Account = tx_require(accounts, "account", account_id)?;
            account.is_admin = !account.is_admin;
            tx_put(accounts, &account.id, &account)?;
            tx_audit(
                audit,
                &AuditRecord::new(
                    &account.id,
                    &admin.id,
                    AuditEvent::AdminToggled {
                        is_admin: account.is_admin,
                    },
                ),
            )?;
            Ok(account)
        })?;

        info!(account_id = %account.id, admin = %admin_id, is_admin = account.is_admin, "admin status changed");
        Ok(account)
    }

    /// Grant admin rights to `username` without an acting admin. Used to seed
    /// the first administrator at start-up; returns `None` if no such account.
    pub fn promote_admin(&self, username: &str) -> MarketResult<Option<Account>> {
        let Some(id) = self.store.account_id_by_username(username)? else {
            return Ok(None);
        };

        let s = &self.store;
        let account = (&s.accounts).transaction(|accounts| {
            let mut account: Account = tx_require(accounts, "account", &id)?;
            account.is_admin = true;
            tx_put(accounts, &account.id, &account)?;
            Ok(account)
        })?;

        info!(account_id = %account.id, "bootstrap admin promoted");
        Ok(Some(account))
    }

    pub fn list_users(&self, admin_id: &str, page: PageRequest) -> MarketResult<Page<UserSummary>> {
        self.require_admin(admin_id)?;

        let items = self.store.items()?;
        let swaps = self.store.swaps()?;
        let mut accounts = self.store.accounts()?;
        accounts.sort_by(|a, b| a.created_at.cmp(&b.created_at));

        let summaries = accounts
            .into_iter()
            .map(|account| UserSummary {
                items_count: items.iter().filter(|i| i.owner == account.id).count(),
                swaps_count: swaps.iter().filter(|s| s.requester == account.id).count(),
                account,
            })
            .collect();

        debug!(admin = %admin_id, "listing users");
        Ok(page.apply(summaries))
    }
}
