use super::MarketService;
use crate::audit::{AuditEvent, AuditRecord};
use crate::error::{MarketError, MarketResult};
use crate::item::{Item, ModerationStatus};
use crate::ledger::Account;
use crate::store::{check, tx_audit, tx_put, tx_require};
use crate::types::{Page, PageRequest};
use sled::Transactional;
use tracing::info;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Decision {
    Approve,
    Reject,
}

impl std::str::FromStr for Decision {
    type Err = MarketError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(Decision::Approve),
            "reject" => Ok(Decision::Reject),
            other => Err(MarketError::Validation(format!("invalid action '{other}'"))),
        }
    }
}

impl MarketService {
    /// Approve or reject a pending item. Decisions are made once; approving
    /// makes the item available for swaps, rejecting is final.
    pub fn moderate(
        &self,
        moderator_id: &str,
        item_id: &str,
        decision: Decision,
        reason: Option<String>,
    ) -> MarketResult<Item> {
        let s = &self.store;
        let item = (&s.accounts, &s.items, &s.audit).transaction(|(accounts, items, audit)| {
            let moderator: Account = tx_require(accounts, "account", moderator_id)?;
            check(moderator.ensure_admin())?;

            let mut item: Item = tx_require(items, "item", item_id)?;
            match decision {
                Decision::Approve => check(item.approve())?,
                Decision::Reject => check(item.reject())?,
            }

            tx_put(items, &item.id, &item)?;
            tx_audit(
                audit,
                &AuditRecord::new(
                    &item.id,
                    &moderator.id,
                    AuditEvent::Moderated {
                        approved: decision == Decision::Approve,
                        reason: reason.clone(),
                    },
                ),
            )?;
            Ok(item)
        })?;

        info!(
            item_id = %item.id,
            moderator = %moderator_id,
            status = item.moderation.as_str(),
            "item moderated"
        );
        Ok(item)
    }

    /// Administrative takedown of any item not held by a pending swap.
    pub fn remove_item(&self, moderator_id: &str, item_id: &str, reason: Option<String>) -> MarketResult<Item> {
        let s = &self.store;
        let item = (&s.accounts, &s.items, &s.audit).transaction(|(accounts, items, audit)| {
            let moderator: Account = tx_require(accounts, "account", moderator_id)?;
            check(moderator.ensure_admin())?;

            let mut item: Item = tx_require(items, "item", item_id)?;
            check(item.remove())?;

            tx_put(items, &item.id, &item)?;
            tx_audit(
                audit,
                &AuditRecord::new(
                    &item.id,
                    &moderator.id,
                    AuditEvent::ItemRemoved {
                        reason: reason.clone(),
                    },
                ),
            )?;
            Ok(item)
        })?;

        info!(item_id = %item.id, moderator = %moderator_id, "item removed");
        Ok(item)
    }

    /// Moderation queue, oldest first.
    pub fn pending_items(&self, admin_id: &str, page: PageRequest) -> MarketResult<Page<Item>> {
        self.require_admin(admin_id)?;

        let mut items: Vec<_> = self
            .store
            .items()?
            .into_iter()
            .filter(|item| item.moderation == ModerationStatus::Pending && !item.removed)
            .collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(page.apply(items))
    }
}
