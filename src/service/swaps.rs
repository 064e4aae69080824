use super::MarketService;
use crate::audit::{AuditEvent, AuditRecord};
use crate::error::{MarketError, MarketResult};
use crate::item::Item;
use crate::ledger::{Account, LedgerCause};
use crate::store::{TxResult, check, fail, tx_audit, tx_get, tx_ledger, tx_put, tx_require};
use crate::swap::{SwapAction, SwapKind, SwapRequest, SwapStatus};
use crate::utils::{LEDGER_HRP, SWAP_HRP};
use sled::Transactional;
use sled::transaction::TransactionalTree;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A swap together with the records it references, for listings.
#[derive(Debug, Clone)]
pub struct SwapDetails {
    pub swap: SwapRequest,
    pub requested_item: Option<Item>,
    pub offered_item: Option<Item>,
    pub requester: Option<Account>,
}

enum Resolution {
    Accepted(SwapRequest),
    Rejected(SwapRequest),
    // committed as rejected; reported to the caller as PreconditionChanged
    AutoRejected(SwapRequest, String),
}

impl MarketService {
    /// Propose a swap for `target_item_id`. On success the target is locked
    /// against competing proposals until this one is resolved.
    ///
    /// Guards run in order and the first failure wins: self swap, target
    /// availability, offered item, points balance.
    pub fn create_swap(
        &self,
        requester_id: &str,
        target_item_id: &str,
        kind: SwapKind,
    ) -> MarketResult<SwapRequest> {
        let swap_id = Self::new_id(SWAP_HRP)?;

        let s = &self.store;
        let swap = (&s.accounts, &s.items, &s.swaps, &s.audit).transaction(
            |(accounts, items, swaps, audit)| {
                let requester: Account = tx_require(accounts, "account", requester_id)?;
                let mut target: Item = tx_require(items, "item", target_item_id)?;

                if target.owner == requester.id {
                    return fail(MarketError::SelfSwapForbidden);
                }
                if !target.is_swappable() {
                    return fail(MarketError::ItemNotAvailable(target.id.clone()));
                }
                match &kind {
                    SwapKind::Direct { offered_item_id } => {
                        let offered: Option<Item> = tx_get(items, offered_item_id)?;
                        if let Some(reason) = offered_item_problem(offered.as_ref(), offered_item_id, &requester.id) {
                            return fail(MarketError::InvalidOfferedItem(reason));
                        }
                    }
                    SwapKind::Points { amount } => {
                        if *amount == 0 || !requester.can_afford(*amount) {
                            return fail(MarketError::InsufficientPoints {
                                requested: *amount,
                                balance: requester.points_balance,
                            });
                        }
                    }
                }

                check(target.lock(&swap_id))?;
                let swap = SwapRequest::new(
                    swap_id.clone(),
                    requester.id.clone(),
                    target.id.clone(),
                    kind.clone(),
                );

                tx_put(items, &target.id, &target)?;
                tx_put(swaps, &swap.id, &swap)?;
                tx_audit(
                    audit,
                    &AuditRecord::new(
                        &swap.id,
                        &requester.id,
                        AuditEvent::SwapRequested {
                            target_item_id: target.id.clone(),
                        },
                    ),
                )?;
                Ok(swap)
            },
        )?;

        info!(
            swap_id = %swap.id,
            requester = %requester_id,
            item_id = %target_item_id,
            kind = swap.kind.as_str(),
            "swap requested"
        );
        Ok(swap)
    }

    /// The target item's owner accepts or rejects a pending swap.
    ///
    /// Acceptance re-checks the offered item or the requester's balance. If
    /// either changed since the proposal, the swap is rejected, the target
    /// unlocked, and `PreconditionChanged` returned with the reason.
    pub fn respond_swap(&self, actor_id: &str, swap_id: &str, action: SwapAction) -> MarketResult<SwapRequest> {
        let debit_id = Self::new_id(LEDGER_HRP)?;
        let credit_id = Self::new_id(LEDGER_HRP)?;

        let s = &self.store;
        let resolution = (&s.accounts, &s.items, &s.swaps, &s.ledger, &s.audit).transaction(
            |(accounts, items, swaps, ledger, audit)| {
                let mut swap: SwapRequest = tx_require(swaps, "swap", swap_id)?;
                let mut target: Item = tx_require(items, "item", &swap.target_item_id)?;

                if target.owner != actor_id {
                    return fail(MarketError::PermissionDenied(format!(
                        "only the owner of item {} can respond to swap {}",
                        target.id, swap.id
                    )));
                }
                if !swap.is_pending() {
                    return fail(MarketError::InvalidState(format!(
                        "swap {} was already {}",
                        swap.id,
                        swap.status.as_str()
                    )));
                }

                if action == SwapAction::Reject {
                    check(swap.reject(None))?;
                    check(target.release(&swap.id))?;
                    tx_put(items, &target.id, &target)?;
                    tx_put(swaps, &swap.id, &swap)?;
                    tx_audit(
                        audit,
                        &AuditRecord::new(&swap.id, actor_id, AuditEvent::SwapRejected { reason: None }),
                    )?;
                    return Ok(Resolution::Rejected(swap));
                }

                if let Some(reason) = precondition_failure(&swap, accounts, items)? {
                    check(swap.reject(Some(reason.clone())))?;
                    check(target.release(&swap.id))?;
                    tx_put(items, &target.id, &target)?;
                    tx_put(swaps, &swap.id, &swap)?;
                    tx_audit(
                        audit,
                        &AuditRecord::new(
                            &swap.id,
                            actor_id,
                            AuditEvent::SwapRejected {
                                reason: Some(reason.clone()),
                            },
                        ),
                    )?;
                    return Ok(Resolution::AutoRejected(swap, reason));
                }

                match &swap.kind {
                    SwapKind::Direct { offered_item_id } => {
                        let mut offered: Item = tx_require(items, "item", offered_item_id)?;
                        check(offered.hand_over(&swap.id, &target.owner))?;
                        tx_put(items, &offered.id, &offered)?;
                    }
                    SwapKind::Points { amount } => {
                        let mut requester: Account = tx_require(accounts, "account", &swap.requester)?;
                        let mut owner: Account = tx_require(accounts, "account", &target.owner)?;
                        let cause = LedgerCause::Swap(swap.id.clone());

                        let debit = check(requester.debit(debit_id.clone(), *amount, cause.clone()))?;
                        let credit = check(owner.credit(credit_id.clone(), *amount, cause))?;

                        tx_put(accounts, &requester.id, &requester)?;
                        tx_put(accounts, &owner.id, &owner)?;
                        tx_ledger(ledger, &debit)?;
                        tx_ledger(ledger, &credit)?;
                    }
                }

                check(target.complete_swap(&swap.id, &swap.requester))?;
                check(swap.accept())?;
                tx_put(items, &target.id, &target)?;
                tx_put(swaps, &swap.id, &swap)?;
                tx_audit(audit, &AuditRecord::new(&swap.id, actor_id, AuditEvent::SwapAccepted))?;
                Ok(Resolution::Accepted(swap))
            },
        )?;

        match resolution {
            Resolution::Accepted(swap) => {
                info!(swap_id = %swap.id, owner = %actor_id, kind = swap.kind.as_str(), "swap accepted");
                Ok(swap)
            }
            Resolution::Rejected(swap) => {
                info!(swap_id = %swap.id, owner = %actor_id, "swap rejected");
                Ok(swap)
            }
            Resolution::AutoRejected(swap, reason) => {
                warn!(swap_id = %swap.id, owner = %actor_id, %reason, "swap auto-rejected");
                Err(MarketError::PreconditionChanged(reason))
            }
        }
    }

    /// The requester withdraws a pending swap, unlocking the target item.
    pub fn cancel_swap(&self, actor_id: &str, swap_id: &str) -> MarketResult<SwapRequest> {
        let s = &self.store;
        let swap = (&s.items, &s.swaps, &s.audit).transaction(|(items, swaps, audit)| {
            let mut swap: SwapRequest = tx_require(swaps, "swap", swap_id)?;
            if swap.requester != actor_id {
                return fail(MarketError::PermissionDenied(format!(
                    "only the requester can cancel swap {}",
                    swap.id
                )));
            }
            check(swap.cancel())?;

            let mut target: Item = tx_require(items, "item", &swap.target_item_id)?;
            check(target.release(&swap.id))?;

            tx_put(items, &target.id, &target)?;
            tx_put(swaps, &swap.id, &swap)?;
            tx_audit(audit, &AuditRecord::new(&swap.id, actor_id, AuditEvent::SwapCancelled))?;
            Ok(swap)
        })?;

        info!(swap_id = %swap.id, requester = %actor_id, "swap cancelled");
        Ok(swap)
    }

    pub fn swap(&self, id: &str) -> MarketResult<SwapRequest> {
        self.store
            .swap(id)?
            .ok_or_else(|| MarketError::NotFound(format!("swap {id}")))
    }

    /// Swaps `requester_id` proposed, newest first.
    pub fn my_requests(&self, requester_id: &str) -> MarketResult<Vec<SwapDetails>> {
        let swaps = self
            .store
            .swaps()?
            .into_iter()
            .filter(|swap| swap.requester == requester_id)
            .collect();
        self.details(swaps)
    }

    /// Pending swaps targeting items owned by `owner_id`, newest first.
    pub fn received_requests(&self, owner_id: &str) -> MarketResult<Vec<SwapDetails>> {
        let owned: Vec<String> = self
            .store
            .items()?
            .into_iter()
            .filter(|item| item.owner == owner_id)
            .map(|item| item.id)
            .collect();

        let swaps = self
            .store
            .swaps()?
            .into_iter()
            .filter(|swap| swap.status == SwapStatus::Pending && owned.contains(&swap.target_item_id))
            .collect();
        self.details(swaps)
    }

    fn details(&self, mut swaps: Vec<SwapRequest>) -> MarketResult<Vec<SwapDetails>> {
        swaps.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let items: HashMap<String, Item> = self
            .store
            .items()?
            .into_iter()
            .map(|item| (item.id.clone(), item))
            .collect();
        let accounts: HashMap<String, Account> = self
            .store
            .accounts()?
            .into_iter()
            .map(|account| (account.id.clone(), account))
            .collect();

        debug!(count = swaps.len(), "resolving swap details");
        Ok(swaps
            .into_iter()
            .map(|swap| SwapDetails {
                requested_item: items.get(&swap.target_item_id).cloned(),
                offered_item: swap
                    .kind
                    .offered_item_id()
                    .and_then(|id| items.get(id))
                    .cloned(),
                requester: accounts.get(&swap.requester).cloned(),
                swap,
            })
            .collect())
    }
}

/// Why `offered` may not be put up for a swap by `requester_id`, if anything.
fn offered_item_problem(offered: Option<&Item>, offered_item_id: &str, requester_id: &str) -> Option<String> {
    match offered {
        None => Some(format!("offered item {offered_item_id} does not exist")),
        Some(item) if item.owner != requester_id => {
            Some(format!("offered item {offered_item_id} does not belong to the requester"))
        }
        Some(item) if !item.is_swappable() => {
            Some(format!("offered item {offered_item_id} is not available"))
        }
        Some(_) => None,
    }
}

/// Re-validation at acceptance time. Returns the reason the swap can no
/// longer go through, if any.
fn precondition_failure(
    swap: &SwapRequest,
    accounts: &TransactionalTree,
    items: &TransactionalTree,
) -> TxResult<Option<String>> {
    match &swap.kind {
        SwapKind::Direct { offered_item_id } => {
            let offered: Option<Item> = tx_get(items, offered_item_id)?;
            Ok(offered_item_problem(offered.as_ref(), offered_item_id, &swap.requester))
        }
        SwapKind::Points { amount } => {
            let requester: Account = tx_require(accounts, "account", &swap.requester)?;
            if requester.can_afford(*amount) {
                Ok(None)
            } else {
                Ok(Some(format!(
                    "requester balance {} no longer covers {} points",
                    requester.points_balance, amount
                )))
            }
        }
    }
}
