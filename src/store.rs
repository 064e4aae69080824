//! sled-backed persistence. One tree per record kind, CBOR values.
use super::audit::AuditRecord;
use super::error::{MarketError, MarketResult};
use super::item::Item;
use super::ledger::{Account, LedgerEntry};
use super::swap::SwapRequest;
use sled::Tree;
use sled::transaction::{ConflictableTransactionError, ConflictableTransactionResult, TransactionalTree};
use std::path::Path;
use std::sync::Arc;

const ACCOUNTS: &str = "accounts";
const USERNAMES: &str = "usernames";
const EMAILS: &str = "emails";
const ITEMS: &str = "items";
const SWAPS: &str = "swaps";
const LEDGER: &str = "ledger";
const AUDIT: &str = "audit";

#[derive(Clone)]
pub struct Store {
    instance: Arc<sled::Db>,
    pub(crate) accounts: Tree,
    // username -> account id
    pub(crate) usernames: Tree,
    // lowercased email -> account id
    pub(crate) emails: Tree,
    pub(crate) items: Tree,
    pub(crate) swaps: Tree,
    pub(crate) ledger: Tree,
    pub(crate) audit: Tree,
}

impl Store {
    pub fn new(instance: Arc<sled::Db>) -> MarketResult<Self> {
        Ok(Self {
            accounts: instance.open_tree(ACCOUNTS)?,
            usernames: instance.open_tree(USERNAMES)?,
            emails: instance.open_tree(EMAILS)?,
            items: instance.open_tree(ITEMS)?,
            swaps: instance.open_tree(SWAPS)?,
            ledger: instance.open_tree(LEDGER)?,
            audit: instance.open_tree(AUDIT)?,
            instance,
        })
    }

    pub fn open<P: AsRef<Path>>(path: P) -> MarketResult<Self> {
        Self::new(Arc::new(sled::open(path)?))
    }

    /// In-memory database that is discarded on drop.
    pub fn temporary() -> MarketResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::new(Arc::new(db))
    }

    pub fn flush(&self) -> MarketResult<()> {
        self.instance.flush()?;
        Ok(())
    }

    pub fn account(&self, id: &str) -> MarketResult<Option<Account>> {
        get(&self.accounts, id)
    }

    pub fn account_id_by_email(&self, email: &str) -> MarketResult<Option<String>> {
        index_lookup(&self.emails, &email.to_lowercase())
    }

    pub fn account_id_by_username(&self, username: &str) -> MarketResult<Option<String>> {
        index_lookup(&self.usernames, username)
    }

    pub fn item(&self, id: &str) -> MarketResult<Option<Item>> {
        get(&self.items, id)
    }

    pub fn swap(&self, id: &str) -> MarketResult<Option<SwapRequest>> {
        get(&self.swaps, id)
    }

    pub fn accounts(&self) -> MarketResult<Vec<Account>> {
        scan(&self.accounts)
    }

    pub fn items(&self) -> MarketResult<Vec<Item>> {
        scan(&self.items)
    }

    pub fn swaps(&self) -> MarketResult<Vec<SwapRequest>> {
        scan(&self.swaps)
    }

    pub fn ledger_entries(&self) -> MarketResult<Vec<LedgerEntry>> {
        scan(&self.ledger)
    }

    pub fn audit_records(&self) -> MarketResult<Vec<AuditRecord>> {
        scan(&self.audit)
    }
}

fn get<T>(tree: &Tree, key: &str) -> MarketResult<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    match tree.get(key.as_bytes())? {
        Some(bytes) => Ok(Some(minicbor::decode(&bytes)?)),
        None => Ok(None),
    }
}

fn scan<T>(tree: &Tree) -> MarketResult<Vec<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    tree.iter()
        .values()
        .map(|value| -> MarketResult<T> {
            let bytes = value?;
            Ok(minicbor::decode(&bytes)?)
        })
        .collect()
}

fn index_lookup(tree: &Tree, key: &str) -> MarketResult<Option<String>> {
    match tree.get(key.as_bytes())? {
        Some(bytes) => String::from_utf8(bytes.to_vec())
            .map(Some)
            .map_err(|e| MarketError::Encoding(e.to_string())),
        None => Ok(None),
    }
}

// TRANSACTION HELPERS

pub(crate) type TxResult<T> = ConflictableTransactionResult<T, MarketError>;

/// Abort the surrounding transaction with a domain error.
pub(crate) fn fail<T>(err: MarketError) -> TxResult<T> {
    Err(ConflictableTransactionError::Abort(err))
}

pub(crate) fn tx_get<T>(tree: &TransactionalTree, key: &str) -> TxResult<Option<T>>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    match tree.get(key.as_bytes())? {
        Some(bytes) => minicbor::decode(&bytes)
            .map(Some)
            .map_err(|e| ConflictableTransactionError::Abort(e.into())),
        None => Ok(None),
    }
}

/// Like [`tx_get`] but a missing record aborts with `NotFound`.
pub(crate) fn tx_require<T>(tree: &TransactionalTree, kind: &str, key: &str) -> TxResult<T>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    match tx_get(tree, key)? {
        Some(value) => Ok(value),
        None => fail(MarketError::NotFound(format!("{kind} {key}"))),
    }
}

pub(crate) fn tx_put<T>(tree: &TransactionalTree, key: &str, value: &T) -> TxResult<()>
where
    T: minicbor::Encode<()>,
{
    let bytes = minicbor::to_vec(value).map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
    tree.insert(key.as_bytes(), bytes)?;
    Ok(())
}

pub(crate) fn tx_audit(tree: &TransactionalTree, record: &AuditRecord) -> TxResult<()> {
    let (hash, cbor) = record
        .build()
        .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
    tree.insert(hash.as_bytes(), cbor)?;
    Ok(())
}

pub(crate) fn tx_ledger(tree: &TransactionalTree, entry: &LedgerEntry) -> TxResult<()> {
    tx_put(tree, &entry.id, entry)
}

/// Lift a domain result into the transaction, aborting on error.
pub(crate) fn check<T>(result: MarketResult<T>) -> TxResult<T> {
    result.map_err(ConflictableTransactionError::Abort)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemDetails;
    use crate::types::Condition;
    use sled::Transactional;

    #[test]
    fn items_roundtrip_through_a_transaction() {
        let store = Store::temporary().unwrap();
        let item = ItemDetails::new()
            .set_title("Linen shirt")
            .set_category("Tops")
            .set_type("Shirt")
            .set_condition(Condition::Fair)
            .finalise("item_a".into(), "user_a".into())
            .unwrap();

        (&store.items)
            .transaction(|items| tx_put(items, &item.id, &item))
            .unwrap();

        assert_eq!(store.item("item_a").unwrap(), Some(item));
        assert_eq!(store.items().unwrap().len(), 1);
        assert_eq!(store.item("item_missing").unwrap(), None);
    }

    #[test]
    fn aborts_leave_no_trace() {
        let store = Store::temporary().unwrap();
        let record = AuditRecord::new("item_a", "user_a", crate::audit::AuditEvent::ItemListed);

        let result: Result<(), _> = (&store.audit, &store.items).transaction(|(audit, _items)| {
            tx_audit(audit, &record)?;
            fail(MarketError::SelfSwapForbidden)
        });

        let err: MarketError = result.unwrap_err().into();
        assert!(matches!(err, MarketError::SelfSwapForbidden));
        assert!(store.audit_records().unwrap().is_empty());
    }
}
