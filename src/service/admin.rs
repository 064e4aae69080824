use super::MarketService;
use crate::audit::AuditRecord;
use crate::error::MarketResult;
use crate::item::{Item, ModerationStatus};
use crate::swap::{SwapRequest, SwapStatus};
use std::collections::BTreeMap;

const RECENT: usize = 5;

#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub total_users: usize,
    pub total_items: usize,
    pub pending_items: usize,
    pub total_swaps: usize,
    pub completed_swaps: usize,
    pub recent_items: Vec<Item>,
    pub recent_swaps: Vec<SwapRequest>,
    pub category_counts: BTreeMap<String, usize>,
}

impl MarketService {
    pub fn dashboard(&self, admin_id: &str) -> MarketResult<DashboardStats> {
        self.require_admin(admin_id)?;

        let total_users = self.store.accounts()?.len();
        let mut items = self.store.items()?;
        let mut swaps = self.store.swaps()?;

        let mut category_counts = BTreeMap::new();
        for item in &items {
            *category_counts.entry(item.category.clone()).or_insert(0) += 1;
        }

        let pending_items = items
            .iter()
            .filter(|i| i.moderation == ModerationStatus::Pending)
            .count();
        let completed_swaps = swaps
            .iter()
            .filter(|s| s.status == SwapStatus::Accepted)
            .count();
        let total_items = items.len();
        let total_swaps = swaps.len();

        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items.truncate(RECENT);
        swaps.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        swaps.truncate(RECENT);

        Ok(DashboardStats {
            total_users,
            total_items,
            pending_items,
            total_swaps,
            completed_swaps,
            recent_items: items,
            recent_swaps: swaps,
            category_counts,
        })
    }

    /// Newest moderation actions (approve, reject, remove).
    pub fn recent_actions(&self, admin_id: &str, limit: usize) -> MarketResult<Vec<AuditRecord>> {
        self.require_admin(admin_id)?;

        let mut records: Vec<_> = self
            .store
            .audit_records()?
            .into_iter()
            .filter(|r| r.event.is_moderation())
            .collect();
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        records.truncate(limit);
        Ok(records)
    }
}
