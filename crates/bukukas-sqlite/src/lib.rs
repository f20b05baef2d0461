//! SQLite storage backend. Dates are stored as ISO-8601 text and decimals as
//! text to avoid float round-off in money columns.

use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use time::{format_description::well_known::Rfc3339, Date, Month, OffsetDateTime};
use uuid::Uuid;

use bukukas_core::{
    CatalogEntry, CatalogSide, InventoryItem, JournalEntry, PaymentMethod, StorageBackend,
    StorageError, StorageTxId, Transaction, TransactionFilter, TransactionKind,
};

pub struct SqliteStorage {
    conn: Mutex<Connection>,
    tx_counter: AtomicU64,
    active_tx: Mutex<Option<StorageTxId>>,
}

impl SqliteStorage {
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(other)?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(other)?;

        let storage = Self {
            conn: Mutex::new(conn),
            tx_counter: AtomicU64::new(1),
            active_tx: Mutex::new(None),
        };
        storage.init_schema()?;
        Ok(storage)
    }

    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS transactions (
                id TEXT PRIMARY KEY,
                group_id TEXT NOT NULL,
                date TEXT NOT NULL,
                kind TEXT NOT NULL,
                item TEXT NOT NULL,
                quantity TEXT NOT NULL,
                unit_price TEXT NOT NULL,
                total TEXT NOT NULL,
                payment_method TEXT NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS journal_entries (
                id TEXT PRIMARY KEY,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                debit_account TEXT NOT NULL,
                credit_account TEXT NOT NULL,
                amount TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS inventory_items (
                item TEXT PRIMARY KEY,
                quantity_on_hand TEXT NOT NULL,
                unit TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS catalog_entries (
                side TEXT NOT NULL,
                item TEXT NOT NULL,
                unit_price TEXT NOT NULL,
                unit TEXT NOT NULL,
                PRIMARY KEY (side, item)
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_date
                ON transactions(date);

            CREATE INDEX IF NOT EXISTS idx_transactions_kind
                ON transactions(kind);
            ",
        )
        .map_err(other)?;
        Ok(())
    }
}

fn other(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(e.to_string())
}

fn date_to_str(d: Date) -> String {
    format!("{:04}-{:02}-{:02}", d.year(), d.month() as u8, d.day())
}

fn str_to_date(s: &str) -> Result<Date, StorageError> {
    let mut parts = s.splitn(3, '-');
    let (Some(year), Some(month), Some(day)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(StorageError::Other(format!("invalid date: {}", s)));
    };
    let year = year.parse::<i32>().map_err(other)?;
    let month = Month::try_from(month.parse::<u8>().map_err(other)?).map_err(other)?;
    let day = day.parse::<u8>().map_err(other)?;
    Date::from_calendar_date(year, month, day).map_err(other)
}

fn kind_to_str(kind: TransactionKind) -> &'static str {
    match kind {
        TransactionKind::Sale => "SALE",
        TransactionKind::Purchase => "PURCHASE",
    }
}

fn str_to_kind(s: &str) -> Result<TransactionKind, StorageError> {
    match s {
        "SALE" => Ok(TransactionKind::Sale),
        "PURCHASE" => Ok(TransactionKind::Purchase),
        other => Err(StorageError::Other(format!(
            "unknown transaction kind: {}",
            other
        ))),
    }
}

fn payment_to_str(method: PaymentMethod) -> &'static str {
    match method {
        PaymentMethod::Cash => "CASH",
        PaymentMethod::Credit => "CREDIT",
    }
}

fn str_to_payment(s: &str) -> Result<PaymentMethod, StorageError> {
    match s {
        "CASH" => Ok(PaymentMethod::Cash),
        "CREDIT" => Ok(PaymentMethod::Credit),
        other => Err(StorageError::Other(format!(
            "unknown payment method: {}",
            other
        ))),
    }
}

fn decimal_from_str(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap_or(Decimal::ZERO)
}

impl StorageBackend for SqliteStorage {
    fn append_transaction(&self, txn: &Transaction) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO transactions (id, group_id, date, kind, item, quantity, unit_price, total, payment_method, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                txn.id.to_string(),
                txn.group_id.to_string(),
                date_to_str(txn.date),
                kind_to_str(txn.kind),
                txn.item,
                txn.quantity.to_string(),
                txn.unit_price.to_string(),
                txn.total.to_string(),
                payment_to_str(txn.payment_method),
                txn.note,
                txn.created_at.format(&Rfc3339).map_err(other)?,
            ],
        )
        .map_err(other)?;
        Ok(())
    }

    fn append_journal_entry(&self, entry: &JournalEntry) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO journal_entries (id, date, description, debit_account, credit_account, amount, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                date_to_str(entry.date),
                entry.description,
                entry.debit_account,
                entry.credit_account,
                entry.amount.to_string(),
                entry.created_at.format(&Rfc3339).map_err(other)?,
            ],
        )
        .map_err(other)?;
        Ok(())
    }

    fn adjust_inventory(&self, item: &str, delta: Decimal) -> Result<bool, StorageError> {
        let conn = self.conn.lock().unwrap();
        let current: Option<String> = conn
            .query_row(
                "SELECT quantity_on_hand FROM inventory_items WHERE item = ?1",
                params![item],
                |row| row.get(0),
            )
            .optional()
            .map_err(other)?;

        match current {
            Some(qty) => {
                let updated = decimal_from_str(&qty) + delta;
                conn.execute(
                    "UPDATE inventory_items SET quantity_on_hand = ?1 WHERE item = ?2",
                    params![updated.to_string(), item],
                )
                .map_err(other)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn insert_inventory_item(&self, item: &InventoryItem) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO inventory_items (item, quantity_on_hand, unit) VALUES (?1, ?2, ?3)",
            params![item.item, item.quantity_on_hand.to_string(), item.unit],
        )
        .map_err(other)?;
        Ok(())
    }

    fn get_inventory_item(&self, item: &str) -> Result<Option<InventoryItem>, StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT item, quantity_on_hand, unit FROM inventory_items WHERE item = ?1",
            params![item],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()
        .map_err(other)
        .map(|row| {
            row.map(|(item, qty, unit)| InventoryItem {
                item,
                quantity_on_hand: decimal_from_str(&qty),
                unit,
            })
        })
    }

    fn insert_catalog_entry(
        &self,
        side: CatalogSide,
        entry: &CatalogEntry,
    ) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO catalog_entries (side, item, unit_price, unit) VALUES (?1, ?2, ?3, ?4)",
            params![side.as_str(), entry.item, entry.unit_price.to_string(), entry.unit],
        )
        .map_err(other)?;
        Ok(())
    }

    fn get_catalog_entry(
        &self,
        side: CatalogSide,
        item: &str,
    ) -> Result<Option<CatalogEntry>, StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT item, unit_price, unit FROM catalog_entries WHERE side = ?1 AND item = ?2",
            params![side.as_str(), item],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()
        .map_err(other)
        .map(|row| {
            row.map(|(item, price, unit)| CatalogEntry {
                item,
                unit_price: decimal_from_str(&price),
                unit,
            })
        })
    }

    fn list_catalog(&self, side: CatalogSide) -> Result<Vec<CatalogEntry>, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT item, unit_price, unit FROM catalog_entries WHERE side = ?1 ORDER BY item")
            .map_err(other)?;
        let rows = stmt
            .query_map(params![side.as_str()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(other)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(other)?;

        Ok(rows
            .into_iter()
            .map(|(item, price, unit)| CatalogEntry {
                item,
                unit_price: decimal_from_str(&price),
                unit,
            })
            .collect())
    }

    fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, StorageError> {
        let conn = self.conn.lock().unwrap();

        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();
        if let Some(kind) = filter.kind {
            args.push(kind_to_str(kind).to_string());
            clauses.push(format!("kind = ?{}", args.len()));
        }
        if let Some(from) = filter.from {
            args.push(date_to_str(from));
            clauses.push(format!("date >= ?{}", args.len()));
        }
        if let Some(to) = filter.to {
            args.push(date_to_str(to));
            clauses.push(format!("date <= ?{}", args.len()));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let query = format!(
            "SELECT id, group_id, date, kind, item, quantity, unit_price, total, payment_method, note, created_at
             FROM transactions{} ORDER BY rowid",
            where_clause
        );

        let mut stmt = conn.prepare(&query).map_err(other)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args.iter()), |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                    row.get::<_, String>(7)?,
                    row.get::<_, String>(8)?,
                    row.get::<_, Option<String>>(9)?,
                    row.get::<_, String>(10)?,
                ))
            })
            .map_err(other)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(other)?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, group_id, date, kind, item, qty, price, total, payment, note, created_at) in rows {
            result.push(Transaction {
                id: Uuid::parse_str(&id).map_err(other)?,
                group_id: Uuid::parse_str(&group_id).map_err(other)?,
                date: str_to_date(&date)?,
                kind: str_to_kind(&kind)?,
                item,
                quantity: decimal_from_str(&qty),
                unit_price: decimal_from_str(&price),
                total: decimal_from_str(&total),
                payment_method: str_to_payment(&payment)?,
                note,
                created_at: OffsetDateTime::parse(&created_at, &Rfc3339).map_err(other)?,
            });
        }
        Ok(result)
    }

    fn list_journal(&self) -> Result<Vec<JournalEntry>, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT id, date, description, debit_account, credit_account, amount, created_at
                 FROM journal_entries ORDER BY rowid",
            )
            .map_err(other)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .map_err(other)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(other)?;

        let mut result = Vec::with_capacity(rows.len());
        for (id, date, description, debit, credit, amount, created_at) in rows {
            result.push(JournalEntry {
                id: Uuid::parse_str(&id).map_err(other)?,
                date: str_to_date(&date)?,
                description,
                debit_account: debit,
                credit_account: credit,
                amount: decimal_from_str(&amount),
                created_at: OffsetDateTime::parse(&created_at, &Rfc3339).map_err(other)?,
            });
        }
        Ok(result)
    }

    fn list_inventory(&self) -> Result<Vec<InventoryItem>, StorageError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT item, quantity_on_hand, unit FROM inventory_items ORDER BY item")
            .map_err(other)?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(other)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(other)?;

        Ok(rows
            .into_iter()
            .map(|(item, qty, unit)| InventoryItem {
                item,
                quantity_on_hand: decimal_from_str(&qty),
                unit,
            })
            .collect())
    }

    fn reset_all(&self) -> Result<(), StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "DELETE FROM transactions;
             DELETE FROM journal_entries;
             UPDATE inventory_items SET quantity_on_hand = '0';",
        )
        .map_err(other)?;
        Ok(())
    }

    fn begin_transaction(&self) -> Result<StorageTxId, StorageError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("SAVEPOINT bukukas_tx").map_err(other)?;
        let tx_id = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        *self.active_tx.lock().unwrap() = Some(tx_id);
        tracing::debug!(tx_id, "SQLite transaction started");
        Ok(tx_id)
    }

    fn commit_transaction(&self, tx_id: StorageTxId) -> Result<(), StorageError> {
        let mut active = self.active_tx.lock().unwrap();
        if *active != Some(tx_id) {
            return Err(StorageError::NoActiveTransaction);
        }
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("RELEASE SAVEPOINT bukukas_tx")
            .map_err(other)?;
        *active = None;
        tracing::debug!(tx_id, "SQLite transaction committed");
        Ok(())
    }

    fn rollback_transaction(&self, tx_id: StorageTxId) -> Result<(), StorageError> {
        let mut active = self.active_tx.lock().unwrap();
        if *active != Some(tx_id) {
            return Err(StorageError::NoActiveTransaction);
        }
        let conn = self.conn.lock().unwrap();
        conn.execute_batch("ROLLBACK TO SAVEPOINT bukukas_tx; RELEASE SAVEPOINT bukukas_tx")
            .map_err(other)?;
        *active = None;
        tracing::debug!(tx_id, "SQLite transaction rolled back");
        Ok(())
    }
}
