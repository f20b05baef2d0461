//! Core types and traits for bukukas storage backends.
//!
//! This crate defines the transaction, journal, inventory and catalog models,
//! the `StorageBackend` trait, and the derived report structures, enabling
//! pluggable storage implementations in separate crates.

pub mod accounts;
pub mod models;
pub mod reports;
pub mod storage;

// Re-export key types at crate root for convenience
pub use models::{
    CatalogEntry, CatalogSide, CheckoutLine, InventoryItem, JournalEntry, PaymentMethod,
    Transaction, TransactionFilter, TransactionKind,
};
pub use reports::{ExpenseLine, IncomeStatement, TrialBalance, TrialBalanceRow};
pub use storage::{StorageBackend, StorageError, StorageTxId};
