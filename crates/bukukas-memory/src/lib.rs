//! In-memory storage backend. State lives only as long as the process;
//! rollback is implemented by snapshotting the tables on `begin_transaction`.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicU64, Ordering},
        RwLock,
    },
};

use rust_decimal::Decimal;

use bukukas_core::{
    CatalogEntry, CatalogSide, InventoryItem, JournalEntry, StorageBackend, StorageError,
    StorageTxId, Transaction, TransactionFilter,
};

#[derive(Clone, Default)]
struct Tables {
    transactions: Vec<Transaction>,
    journal: Vec<JournalEntry>,
    inventory: BTreeMap<String, InventoryItem>,
    sale_catalog: BTreeMap<String, CatalogEntry>,
    purchase_catalog: BTreeMap<String, CatalogEntry>,
}

impl Tables {
    fn catalog(&self, side: CatalogSide) -> &BTreeMap<String, CatalogEntry> {
        match side {
            CatalogSide::Sale => &self.sale_catalog,
            CatalogSide::Purchase => &self.purchase_catalog,
        }
    }

    fn catalog_mut(&mut self, side: CatalogSide) -> &mut BTreeMap<String, CatalogEntry> {
        match side {
            CatalogSide::Sale => &mut self.sale_catalog,
            CatalogSide::Purchase => &mut self.purchase_catalog,
        }
    }
}

pub struct InMemoryStorage {
    tables: RwLock<Tables>,
    tx_counter: AtomicU64,
    snapshots: RwLock<HashMap<StorageTxId, Tables>>,
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            tx_counter: AtomicU64::new(1),
            snapshots: RwLock::new(HashMap::new()),
        }
    }
}

impl StorageBackend for InMemoryStorage {
    fn append_transaction(&self, txn: &Transaction) -> Result<(), StorageError> {
        let mut tables = self.tables.write().unwrap();
        tables.transactions.push(txn.clone());
        Ok(())
    }

    fn append_journal_entry(&self, entry: &JournalEntry) -> Result<(), StorageError> {
        let mut tables = self.tables.write().unwrap();
        tables.journal.push(entry.clone());
        Ok(())
    }

    fn adjust_inventory(&self, item: &str, delta: Decimal) -> Result<bool, StorageError> {
        let mut tables = self.tables.write().unwrap();
        match tables.inventory.get_mut(item) {
            Some(entry) => {
                entry.quantity_on_hand += delta;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_inventory_item(&self, item: &InventoryItem) -> Result<(), StorageError> {
        let mut tables = self.tables.write().unwrap();
        tables.inventory.insert(item.item.clone(), item.clone());
        Ok(())
    }

    fn get_inventory_item(&self, item: &str) -> Result<Option<InventoryItem>, StorageError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.inventory.get(item).cloned())
    }

    fn insert_catalog_entry(
        &self,
        side: CatalogSide,
        entry: &CatalogEntry,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().unwrap();
        tables
            .catalog_mut(side)
            .insert(entry.item.clone(), entry.clone());
        Ok(())
    }

    fn get_catalog_entry(
        &self,
        side: CatalogSide,
        item: &str,
    ) -> Result<Option<CatalogEntry>, StorageError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.catalog(side).get(item).cloned())
    }

    fn list_catalog(&self, side: CatalogSide) -> Result<Vec<CatalogEntry>, StorageError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.catalog(side).values().cloned().collect())
    }

    fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StorageError> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .transactions
            .iter()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect())
    }

    fn list_journal(&self) -> Result<Vec<JournalEntry>, StorageError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.journal.clone())
    }

    fn list_inventory(&self) -> Result<Vec<InventoryItem>, StorageError> {
        let tables = self.tables.read().unwrap();
        Ok(tables.inventory.values().cloned().collect())
    }

    fn reset_all(&self) -> Result<(), StorageError> {
        let mut tables = self.tables.write().unwrap();
        tables.transactions.clear();
        tables.journal.clear();
        for entry in tables.inventory.values_mut() {
            entry.quantity_on_hand = Decimal::ZERO;
        }
        Ok(())
    }

    fn begin_transaction(&self) -> Result<StorageTxId, StorageError> {
        let tx_id = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        let snapshot = self.tables.read().unwrap().clone();
        self.snapshots.write().unwrap().insert(tx_id, snapshot);
        tracing::debug!(tx_id, "Transaction started");
        Ok(tx_id)
    }

    fn commit_transaction(&self, tx_id: StorageTxId) -> Result<(), StorageError> {
        self.snapshots
            .write()
            .unwrap()
            .remove(&tx_id)
            .ok_or(StorageError::NoActiveTransaction)?;
        tracing::debug!(tx_id, "Transaction committed");
        Ok(())
    }

    fn rollback_transaction(&self, tx_id: StorageTxId) -> Result<(), StorageError> {
        let snapshot = self
            .snapshots
            .write()
            .unwrap()
            .remove(&tx_id)
            .ok_or(StorageError::NoActiveTransaction)?;
        *self.tables.write().unwrap() = snapshot;
        tracing::debug!(tx_id, "Transaction rolled back");
        Ok(())
    }
}
