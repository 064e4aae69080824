use super::MarketService;
use crate::audit::{AuditEvent, AuditRecord};
use crate::error::{MarketError, MarketResult};
use crate::item::{Item, ItemDetails};
use crate::ledger::Account;
use crate::store::{check, fail, tx_audit, tx_put, tx_require};
use crate::types::{Page, PageRequest};
use crate::utils::ITEM_HRP;
use sled::Transactional;
use tracing::{debug, info};

/// Filters for the public item listing.
#[derive(Debug, Clone, Default)]
pub struct BrowseQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

impl MarketService {
    /// Upload a listing. The item enters the moderation gate as pending and
    /// stays out of browse results until approved.
    pub fn list_item(&self, owner_id: &str, details: ItemDetails) -> MarketResult<Item> {
        let item = details.finalise(Self::new_id(ITEM_HRP)?, owner_id.to_string())?;

        let s = &self.store;
        (&s.accounts, &s.items, &s.audit).transaction(|(accounts, items, audit)| {
            let _owner: Account = tx_require(accounts, "account", owner_id)?;
            tx_put(items, &item.id, &item)?;
            tx_audit(audit, &AuditRecord::new(&item.id, owner_id, AuditEvent::ItemListed))
        })?;

        info!(item_id = %item.id, owner = %owner_id, "item submitted for moderation");
        Ok(item)
    }

    pub fn item(&self, id: &str) -> MarketResult<Item> {
        self.store
            .item(id)?
            .ok_or_else(|| MarketError::NotFound(format!("item {id}")))
    }

    /// Approved, non-removed items, newest first.
    pub fn browse(&self, query: &BrowseQuery, page: PageRequest) -> MarketResult<Page<Item>> {
        let search = query.search.as_deref().unwrap_or_default();
        let category = query
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        let mut items: Vec<_> = self
            .store
            .items()?
            .into_iter()
            .filter(Item::is_listed)
            .filter(|item| category.is_none_or(|c| item.category.eq_ignore_ascii_case(c)))
            .filter(|item| item.matches(search))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        debug!(search, ?category, total = items.len(), "browse");
        Ok(page.apply(items))
    }

    /// Everything `owner_id` uploaded, including pending and removed items.
    pub fn my_items(&self, owner_id: &str) -> MarketResult<Vec<Item>> {
        let mut items: Vec<_> = self
            .store
            .items()?
            .into_iter()
            .filter(|item| item.owner == owner_id)
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(items)
    }

    /// Items `account_id` obtained through accepted swaps.
    pub fn acquired_items(&self, account_id: &str) -> MarketResult<Vec<Item>> {
        Ok(self
            .store
            .items()?
            .into_iter()
            .filter(|item| item.acquired_by.as_deref() == Some(account_id))
            .collect())
    }

    /// Owner soft-delete. Refused with `ItemLocked` while a swap is pending on it.
    pub fn delete_item(&self, actor_id: &str, item_id: &str) -> MarketResult<Item> {
        let s = &self.store;
        let item = (&s.items, &s.audit).transaction(|(items, audit)| {
            let mut item: Item = tx_require(items, "item", item_id)?;
            if item.owner != actor_id {
                return fail(MarketError::PermissionDenied(format!(
                    "only the owner can delete item {item_id}"
                )));
            }
            check(item.remove())?;
            tx_put(items, &item.id, &item)?;
            tx_audit(
                audit,
                &AuditRecord::new(&item.id, actor_id, AuditEvent::ItemRemoved { reason: None }),
            )?;
            Ok(item)
        })?;

        info!(item_id = %item.id, actor = %actor_id, "item deleted");
        Ok(item)
    }
}
