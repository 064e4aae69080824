//! JSON request and response bodies
use crate::audit::AuditRecord;
use crate::error::{MarketError, MarketResult};
use crate::item::Item;
use crate::ledger::{Account, LedgerEntry};
use crate::service::{SwapDetails, UserSummary};
use crate::swap::{SwapKind, SwapRequest};
use crate::types::Page;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// REQUESTS

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadItemRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub condition: String,
    #[serde(default)]
    pub size: String,
    // comma separated, as the upload form sends it
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSwapRequest {
    pub requested_item_id: String,
    pub swap_type: String,
    pub offered_item_id: Option<String>,
    pub points_used: Option<u64>,
}

impl CreateSwapRequest {
    /// Resolve the loosely shaped body into a [`SwapKind`] before it reaches
    /// the engine.
    pub fn kind(&self) -> MarketResult<SwapKind> {
        match self.swap_type.as_str() {
            "direct" => match self.offered_item_id.as_deref().map(str::trim) {
                Some(id) if !id.is_empty() => Ok(SwapKind::Direct {
                    offered_item_id: id.to_string(),
                }),
                _ => Err(MarketError::Validation(
                    "offered_item_id is required for a direct swap".into(),
                )),
            },
            "points" => match self.points_used {
                Some(amount) => Ok(SwapKind::Points { amount }),
                None => Err(MarketError::Validation(
                    "points_used is required for a points swap".into(),
                )),
            },
            other => Err(MarketError::Validation(format!("unknown swap_type '{other}'"))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddPointsRequest {
    pub points: i64,
}

// RESPONSES

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub username: String,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub points_balance: u64,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id.clone(),
            username: account.username.clone(),
            name: account.name.clone(),
            email: account.email.clone(),
            is_admin: account.is_admin,
            points_balance: account.points_balance,
            created_at: account.created_at.to_datetime_utc(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploaderResponse {
    pub id: String,
    pub username: String,
    pub points_balance: u64,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub condition: &'static str,
    pub size: Option<String>,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub main_image: Option<String>,
    pub status: &'static str,
    pub approved: bool,
    pub moderation: &'static str,
    pub removed: bool,
    pub acquired_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub uploader: Option<UploaderResponse>,
}

impl ItemResponse {
    pub fn new(item: &Item, uploader: Option<&Account>) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            item_type: item.item_type.clone(),
            condition: item.condition.as_str(),
            size: item.size.clone(),
            tags: item.tags.clone(),
            images: item.images.clone(),
            main_image: item.main_image().map(str::to_string),
            status: item.availability.as_str(),
            approved: item.is_approved(),
            moderation: item.moderation.as_str(),
            removed: item.removed,
            acquired_by: item.acquired_by.clone(),
            created_at: item.created_at.to_datetime_utc(),
            uploader: uploader.map(|a| UploaderResponse {
                id: a.id.clone(),
                username: a.username.clone(),
                points_balance: a.points_balance,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SwapResponse {
    pub id: String,
    pub swap_type: &'static str,
    pub status: &'static str,
    pub requester_id: String,
    pub requested_item_id: String,
    pub offered_item_id: Option<String>,
    pub points_used: Option<u64>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&SwapRequest> for SwapResponse {
    fn from(swap: &SwapRequest) -> Self {
        Self {
            id: swap.id.clone(),
            swap_type: swap.kind.as_str(),
            status: swap.status.as_str(),
            requester_id: swap.requester.clone(),
            requested_item_id: swap.target_item_id.clone(),
            offered_item_id: swap.kind.offered_item_id().map(str::to_string),
            points_used: swap.kind.points(),
            rejection_reason: swap.rejection_reason.clone(),
            created_at: swap.created_at.to_datetime_utc(),
            updated_at: swap.updated_at.to_datetime_utc(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub condition: &'static str,
    pub status: &'static str,
}

impl From<&Item> for ItemSummary {
    fn from(item: &Item) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            category: item.category.clone(),
            condition: item.condition.as_str(),
            status: item.availability.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PartyResponse {
    pub id: String,
    pub username: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct SwapDetailsResponse {
    #[serde(flatten)]
    pub swap: SwapResponse,
    pub requester: Option<PartyResponse>,
    pub requested_item: Option<ItemSummary>,
    pub offered_item: Option<ItemSummary>,
}

impl From<&SwapDetails> for SwapDetailsResponse {
    fn from(details: &SwapDetails) -> Self {
        Self {
            swap: SwapResponse::from(&details.swap),
            requester: details.requester.as_ref().map(|a| PartyResponse {
                id: a.id.clone(),
                username: a.username.clone(),
                name: a.name.clone(),
            }),
            requested_item: details.requested_item.as_ref().map(ItemSummary::from),
            offered_item: details.offered_item.as_ref().map(ItemSummary::from),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserSummaryResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub stats: UserStats,
}

#[derive(Debug, Serialize)]
pub struct UserStats {
    pub items_count: usize,
    pub swaps_count: usize,
}

impl From<&UserSummary> for UserSummaryResponse {
    fn from(summary: &UserSummary) -> Self {
        Self {
            account: AccountResponse::from(&summary.account),
            stats: UserStats {
                items_count: summary.items_count,
                swaps_count: summary.swaps_count,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AdminActionResponse {
    pub action: &'static str,
    pub reason: Option<String>,
    pub admin_id: String,
    pub item_id: String,
    pub created_at: DateTime<Utc>,
}

impl From<&AuditRecord> for AdminActionResponse {
    fn from(record: &AuditRecord) -> Self {
        Self {
            action: record.event.label(),
            reason: record.event.reason().map(str::to_string),
            admin_id: record.actor_id.clone(),
            item_id: record.subject_id.clone(),
            created_at: record.timestamp.to_datetime_utc(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LedgerEntryResponse {
    pub id: String,
    pub delta: i64,
    pub balance_after: u64,
    pub swap_id: Option<String>,
    pub grant_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&LedgerEntry> for LedgerEntryResponse {
    fn from(entry: &LedgerEntry) -> Self {
        use crate::ledger::LedgerCause;
        let (swap_id, grant_id) = match &entry.cause {
            LedgerCause::Swap(id) => (Some(id.clone()), None),
            LedgerCause::Grant(id) => (None, Some(id.clone())),
        };
        Self {
            id: entry.id.clone(),
            delta: entry.delta,
            balance_after: entry.balance_after,
            swap_id,
            grant_id,
            created_at: entry.timestamp.to_datetime_utc(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub pages: usize,
}

impl<T> From<&Page<T>> for Pagination {
    fn from(page: &Page<T>) -> Self {
        Self {
            page: page.page,
            per_page: page.per_page,
            total: page.total,
            pages: page.pages,
        }
    }
}
