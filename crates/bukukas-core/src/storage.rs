use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{
    CatalogEntry, CatalogSide, InventoryItem, JournalEntry, Transaction, TransactionFilter,
};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
    #[error("no active transaction")]
    NoActiveTransaction,
}

pub type StorageTxId = u64;

/// Persistence contract for the four collections the engine owns: the
/// transaction log, the journal, inventory items and the two catalogs.
///
/// The engine wraps every mutating operation in a `begin`/`commit` pair so a
/// failed recording leaves no partial journal or inventory update behind.
/// Backends assume single-writer semantics; two processes sharing one store
/// can race with last-write-wins on inventory quantities.
pub trait StorageBackend: Send + Sync {
    fn append_transaction(&self, txn: &Transaction) -> Result<(), StorageError>;
    fn append_journal_entry(&self, entry: &JournalEntry) -> Result<(), StorageError>;

    /// Adds `delta` to a tracked item's quantity on hand. Returns `false`
    /// without writing when the item is not tracked.
    fn adjust_inventory(&self, item: &str, delta: Decimal) -> Result<bool, StorageError>;
    fn insert_inventory_item(&self, item: &InventoryItem) -> Result<(), StorageError>;
    fn get_inventory_item(&self, item: &str) -> Result<Option<InventoryItem>, StorageError>;

    fn insert_catalog_entry(
        &self,
        side: CatalogSide,
        entry: &CatalogEntry,
    ) -> Result<(), StorageError>;
    fn get_catalog_entry(
        &self,
        side: CatalogSide,
        item: &str,
    ) -> Result<Option<CatalogEntry>, StorageError>;
    fn list_catalog(&self, side: CatalogSide) -> Result<Vec<CatalogEntry>, StorageError>;

    fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StorageError>;
    fn list_journal(&self) -> Result<Vec<JournalEntry>, StorageError>;
    fn list_inventory(&self) -> Result<Vec<InventoryItem>, StorageError>;

    /// Clears transactions and journal, zeroes every inventory quantity.
    /// Catalog definitions survive.
    fn reset_all(&self) -> Result<(), StorageError>;

    fn begin_transaction(&self) -> Result<StorageTxId, StorageError>;
    fn commit_transaction(&self, tx_id: StorageTxId) -> Result<(), StorageError>;
    fn rollback_transaction(&self, tx_id: StorageTxId) -> Result<(), StorageError>;
}
