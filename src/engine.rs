//! The ledger engine: turns transaction requests into an append-only
//! transaction log, derived double-entry journal postings and inventory
//! deltas, and computes reports from them.

use std::collections::BTreeMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use bukukas_core::accounts;
use bukukas_core::{
    CatalogEntry, CatalogSide, CheckoutLine, ExpenseLine, IncomeStatement, InventoryItem,
    JournalEntry, PaymentMethod, StorageBackend, StorageError, Transaction, TransactionFilter,
    TransactionKind, TrialBalance, TrialBalanceRow,
};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("item already registered: {0}")]
    DuplicateItem(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Debit and credit account pair for one transaction, per the posting policy
/// table (kind x payment method).
fn posting_accounts(kind: TransactionKind, method: PaymentMethod, item: &str) -> (String, String) {
    match (kind, method) {
        (TransactionKind::Sale, PaymentMethod::Cash) => {
            (accounts::CASH.to_string(), accounts::SALES_REVENUE.to_string())
        }
        (TransactionKind::Sale, PaymentMethod::Credit) => (
            accounts::ACCOUNTS_RECEIVABLE.to_string(),
            accounts::SALES_REVENUE.to_string(),
        ),
        (TransactionKind::Purchase, PaymentMethod::Cash) => {
            (accounts::raw_materials_account(item), accounts::CASH.to_string())
        }
        (TransactionKind::Purchase, PaymentMethod::Credit) => (
            accounts::raw_materials_account(item),
            accounts::ACCOUNTS_PAYABLE.to_string(),
        ),
    }
}

/// Single-writer ledger engine over an injected storage backend. Each
/// recording runs start-to-finish inside one storage transaction; a failure
/// anywhere rolls the whole recording back.
pub struct LedgerEngine {
    storage: Arc<dyn StorageBackend>,
}

impl LedgerEngine {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// Records a single sale or purchase line as its own checkout.
    pub fn record_transaction(
        &self,
        date: Date,
        kind: TransactionKind,
        line: CheckoutLine,
        note: Option<String>,
    ) -> Result<Transaction, LedgerError> {
        let mut created = self.record_checkout(date, kind, vec![line], note)?;
        Ok(created.remove(0))
    }

    /// Records a multi-line checkout. Every created transaction shares one
    /// group id, and journal entries are aggregated per distinct
    /// (debit, credit) account pair, so a checkout mixing cash and credit
    /// items posts one entry per payment method rather than one per line.
    pub fn record_checkout(
        &self,
        date: Date,
        kind: TransactionKind,
        lines: Vec<CheckoutLine>,
        note: Option<String>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        if lines.is_empty() {
            return Err(LedgerError::Validation("checkout has no lines".into()));
        }
        for line in &lines {
            validate_line(line)?;
        }

        let tx_id = self.storage.begin_transaction()?;
        match self.commit_checkout(date, kind, &lines, note) {
            Ok(created) => {
                self.storage.commit_transaction(tx_id)?;
                tracing::info!(
                    kind = %kind,
                    lines = created.len(),
                    group_id = %created[0].group_id,
                    "Checkout recorded"
                );
                Ok(created)
            }
            Err(e) => {
                if let Err(rollback_err) = self.storage.rollback_transaction(tx_id) {
                    tracing::error!(error = %rollback_err, "Rollback failed after checkout error");
                }
                Err(e)
            }
        }
    }

    fn commit_checkout(
        &self,
        date: Date,
        kind: TransactionKind,
        lines: &[CheckoutLine],
        note: Option<String>,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let group_id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();
        let description = note.clone().unwrap_or_else(|| kind.to_string());

        let mut created = Vec::with_capacity(lines.len());
        let mut legs: BTreeMap<(String, String), Decimal> = BTreeMap::new();

        for line in lines {
            let txn = Transaction {
                id: Uuid::new_v4(),
                group_id,
                date,
                kind,
                item: line.item.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                total: line.total(),
                payment_method: line.payment_method,
                note: note.clone(),
                created_at: now,
            };
            self.storage.append_transaction(&txn)?;

            let pair = posting_accounts(kind, line.payment_method, &line.item);
            *legs.entry(pair).or_insert(Decimal::ZERO) += txn.total;

            self.apply_inventory_delta(kind, line)?;
            created.push(txn);
        }

        for ((debit_account, credit_account), amount) in legs {
            // Zero-amount legs are never posted.
            if amount <= Decimal::ZERO {
                continue;
            }
            self.storage.append_journal_entry(&JournalEntry {
                id: Uuid::new_v4(),
                date,
                description: description.clone(),
                debit_account,
                credit_account,
                amount,
                created_at: now,
            })?;
        }

        Ok(created)
    }

    /// Sale decreases a tracked item's stock, purchase increases it. A
    /// purchase of an unknown item registers it (and its purchase price, if
    /// the catalog has none); a sale of an unknown item is a no-op.
    fn apply_inventory_delta(
        &self,
        kind: TransactionKind,
        line: &CheckoutLine,
    ) -> Result<(), LedgerError> {
        if self.storage.get_inventory_item(&line.item)?.is_some() {
            let delta = match kind {
                TransactionKind::Sale => -line.quantity,
                TransactionKind::Purchase => line.quantity,
            };
            self.storage.adjust_inventory(&line.item, delta)?;
            return Ok(());
        }

        match kind {
            TransactionKind::Purchase => {
                let unit = line.unit.clone().ok_or_else(|| {
                    LedgerError::Validation(format!(
                        "unit of measure required to register new item: {}",
                        line.item
                    ))
                })?;
                self.storage.insert_inventory_item(&InventoryItem {
                    item: line.item.clone(),
                    quantity_on_hand: line.quantity,
                    unit: unit.clone(),
                })?;
                if self
                    .storage
                    .get_catalog_entry(CatalogSide::Purchase, &line.item)?
                    .is_none()
                {
                    self.storage.insert_catalog_entry(
                        CatalogSide::Purchase,
                        &CatalogEntry {
                            item: line.item.clone(),
                            unit_price: line.unit_price,
                            unit,
                        },
                    )?;
                }
                tracing::info!(item = %line.item, "Auto-registered purchased item");
                Ok(())
            }
            // Untracked sale items are silently skipped.
            TransactionKind::Sale => Ok(()),
        }
    }

    /// Registers a sale-side price list entry, used to prefill sale entry
    /// forms. Does not touch inventory.
    pub fn register_sale_item(
        &self,
        item: &str,
        standard_price: Decimal,
        unit: &str,
    ) -> Result<(), LedgerError> {
        validate_catalog_item(item, standard_price, unit)?;
        if self
            .storage
            .get_catalog_entry(CatalogSide::Sale, item)?
            .is_some()
        {
            tracing::warn!(item, "Sale item already registered");
            return Err(LedgerError::DuplicateItem(item.to_string()));
        }
        self.storage.insert_catalog_entry(
            CatalogSide::Sale,
            &CatalogEntry {
                item: item.to_string(),
                unit_price: standard_price,
                unit: unit.to_string(),
            },
        )?;
        Ok(())
    }

    /// Registers a purchase-side item ahead of its first purchase. The item
    /// starts with zero stock. Re-registering a known item fails without
    /// touching the catalogs.
    pub fn register_purchase_item(
        &self,
        item: &str,
        standard_price: Decimal,
        unit: &str,
    ) -> Result<(), LedgerError> {
        validate_catalog_item(item, standard_price, unit)?;
        if self
            .storage
            .get_catalog_entry(CatalogSide::Purchase, item)?
            .is_some()
        {
            tracing::warn!(item, "Purchase item already registered");
            return Err(LedgerError::DuplicateItem(item.to_string()));
        }

        let tx_id = self.storage.begin_transaction()?;
        let result = (|| -> Result<(), LedgerError> {
            self.storage.insert_catalog_entry(
                CatalogSide::Purchase,
                &CatalogEntry {
                    item: item.to_string(),
                    unit_price: standard_price,
                    unit: unit.to_string(),
                },
            )?;
            if self.storage.get_inventory_item(item)?.is_none() {
                self.storage.insert_inventory_item(&InventoryItem {
                    item: item.to_string(),
                    quantity_on_hand: Decimal::ZERO,
                    unit: unit.to_string(),
                })?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                self.storage.commit_transaction(tx_id)?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = self.storage.rollback_transaction(tx_id) {
                    tracing::error!(error = %rollback_err, "Rollback failed after registration error");
                }
                Err(e)
            }
        }
    }

    /// Per-account net of debit minus credit legs across the whole journal.
    /// An imbalance is surfaced on the report, never as an error.
    pub fn compute_trial_balance(&self) -> Result<TrialBalance, LedgerError> {
        let mut signed: BTreeMap<String, Decimal> = BTreeMap::new();
        for entry in self.storage.list_journal()? {
            *signed.entry(entry.debit_account).or_insert(Decimal::ZERO) += entry.amount;
            *signed.entry(entry.credit_account).or_insert(Decimal::ZERO) -= entry.amount;
        }

        let rows = signed
            .into_iter()
            .map(|(account, balance)| {
                if balance >= Decimal::ZERO {
                    TrialBalanceRow {
                        account,
                        debit: balance,
                        credit: Decimal::ZERO,
                    }
                } else {
                    TrialBalanceRow {
                        account,
                        debit: Decimal::ZERO,
                        credit: -balance,
                    }
                }
            })
            .collect();

        let report = TrialBalance::from_rows(rows);
        if !report.balanced {
            tracing::warn!(
                total_debit = %report.total_debit,
                total_credit = %report.total_credit,
                "Trial balance does not balance"
            );
        }
        Ok(report)
    }

    /// Revenue and per-item expenses over a date range, from the transaction
    /// log (reports are projections, recomputed on every call).
    pub fn compute_income_statement(
        &self,
        from: Date,
        to: Date,
    ) -> Result<IncomeStatement, LedgerError> {
        let transactions = self.storage.list_transactions(&TransactionFilter {
            kind: None,
            from: Some(from),
            to: Some(to),
        })?;

        let mut revenue = Decimal::ZERO;
        let mut per_item: BTreeMap<String, Decimal> = BTreeMap::new();
        for txn in transactions {
            match txn.kind {
                TransactionKind::Sale => revenue += txn.total,
                TransactionKind::Purchase => {
                    *per_item.entry(txn.item).or_insert(Decimal::ZERO) += txn.total;
                }
            }
        }

        let expenses: Vec<ExpenseLine> = per_item
            .into_iter()
            .filter(|(_, amount)| !amount.is_zero())
            .map(|(item, amount)| ExpenseLine { item, amount })
            .collect();
        let total_expenses: Decimal = expenses.iter().map(|l| l.amount).sum();

        Ok(IncomeStatement {
            from,
            to,
            revenue,
            expenses,
            total_expenses,
            net_income: revenue - total_expenses,
        })
    }

    /// Clears the transaction log and journal and zeroes all stock.
    /// Catalog definitions survive. Irreversible.
    pub fn reset_all(&self) -> Result<(), LedgerError> {
        self.storage.reset_all()?;
        tracing::warn!("Ledger reset: transactions and journal cleared, inventory zeroed");
        Ok(())
    }

    pub fn list_transactions(
        &self,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self.storage.list_transactions(filter)?)
    }

    pub fn list_journal(&self) -> Result<Vec<JournalEntry>, LedgerError> {
        Ok(self.storage.list_journal()?)
    }

    pub fn list_inventory(&self) -> Result<Vec<InventoryItem>, LedgerError> {
        Ok(self.storage.list_inventory()?)
    }

    pub fn list_catalog(&self, side: CatalogSide) -> Result<Vec<CatalogEntry>, LedgerError> {
        Ok(self.storage.list_catalog(side)?)
    }
}

fn validate_catalog_item(item: &str, standard_price: Decimal, unit: &str) -> Result<(), LedgerError> {
    if item.trim().is_empty() {
        return Err(LedgerError::Validation("item name is empty".into()));
    }
    if unit.trim().is_empty() {
        return Err(LedgerError::Validation("unit of measure is empty".into()));
    }
    if standard_price < Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "negative standard price for {}",
            item
        )));
    }
    Ok(())
}

fn validate_line(line: &CheckoutLine) -> Result<(), LedgerError> {
    if line.item.trim().is_empty() {
        return Err(LedgerError::Validation("item name is empty".into()));
    }
    if line.quantity <= Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "non-positive quantity for {}: {}",
            line.item, line.quantity
        )));
    }
    if line.unit_price < Decimal::ZERO {
        return Err(LedgerError::Validation(format!(
            "negative unit price for {}: {}",
            line.item, line.unit_price
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bukukas_memory::InMemoryStorage;
    use rust_decimal_macros::dec;
    use time::Month;

    fn engine() -> LedgerEngine {
        LedgerEngine::new(Arc::new(InMemoryStorage::new()))
    }

    fn date() -> Date {
        Date::from_calendar_date(2024, Month::March, 1).unwrap()
    }

    fn line(item: &str, qty: Decimal, price: Decimal, method: PaymentMethod) -> CheckoutLine {
        CheckoutLine {
            item: item.to_string(),
            quantity: qty,
            unit_price: price,
            payment_method: method,
            unit: Some("bungkus".to_string()),
        }
    }

    #[test]
    fn cash_sale_posts_cash_against_revenue() {
        let engine = engine();
        engine
            .register_purchase_item("Keripik Kenikir", dec!(20000), "bungkus")
            .unwrap();
        // Seed stock so the sale has something to draw down.
        engine
            .record_transaction(
                date(),
                TransactionKind::Purchase,
                line("Keripik Kenikir", dec!(20), dec!(20000), PaymentMethod::Cash),
                None,
            )
            .unwrap();

        let txn = engine
            .record_transaction(
                date(),
                TransactionKind::Sale,
                line("Keripik Kenikir", dec!(5), dec!(25000), PaymentMethod::Cash),
                None,
            )
            .unwrap();
        assert_eq!(txn.total, dec!(125000));

        let journal = engine.list_journal().unwrap();
        let sale_entry = journal
            .iter()
            .find(|e| e.credit_account == accounts::SALES_REVENUE)
            .unwrap();
        assert_eq!(sale_entry.debit_account, accounts::CASH);
        assert_eq!(sale_entry.amount, dec!(125000));

        let inventory = engine.list_inventory().unwrap();
        assert_eq!(inventory[0].quantity_on_hand, dec!(15));
    }

    #[test]
    fn credit_purchase_auto_registers_item() {
        let engine = engine();
        let mut purchase = line("Tepung Terigu", dec!(10), dec!(12000), PaymentMethod::Credit);
        purchase.unit = Some("kg".to_string());

        engine
            .record_transaction(date(), TransactionKind::Purchase, purchase, None)
            .unwrap();

        let inventory = engine.list_inventory().unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].item, "Tepung Terigu");
        assert_eq!(inventory[0].quantity_on_hand, dec!(10));
        assert_eq!(inventory[0].unit, "kg");

        let journal = engine.list_journal().unwrap();
        assert_eq!(journal.len(), 1);
        assert_eq!(journal[0].debit_account, "Raw Materials:Tepung Terigu");
        assert_eq!(journal[0].credit_account, accounts::ACCOUNTS_PAYABLE);
        assert_eq!(journal[0].amount, dec!(120000));

        let catalog = engine.list_catalog(CatalogSide::Purchase).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].unit_price, dec!(12000));
    }

    #[test]
    fn mixed_payment_checkout_posts_one_entry_per_method() {
        let engine = engine();
        let created = engine
            .record_checkout(
                date(),
                TransactionKind::Sale,
                vec![
                    line("Keripik Kenikir", dec!(2), dec!(25000), PaymentMethod::Cash),
                    line("Rempeyek", dec!(3), dec!(10000), PaymentMethod::Credit),
                ],
                Some("warung checkout".to_string()),
            )
            .unwrap();

        assert_eq!(created.len(), 2);
        assert_eq!(created[0].group_id, created[1].group_id);

        let journal = engine.list_journal().unwrap();
        assert_eq!(journal.len(), 2, "one entry per payment method, not per line");

        let cash = journal
            .iter()
            .find(|e| e.debit_account == accounts::CASH)
            .unwrap();
        assert_eq!(cash.amount, dec!(50000));
        let receivable = journal
            .iter()
            .find(|e| e.debit_account == accounts::ACCOUNTS_RECEIVABLE)
            .unwrap();
        assert_eq!(receivable.amount, dec!(30000));
    }

    #[test]
    fn rejected_checkout_leaves_no_partial_state() {
        let engine = engine();
        let result = engine.record_checkout(
            date(),
            TransactionKind::Sale,
            vec![
                line("Keripik Kenikir", dec!(2), dec!(25000), PaymentMethod::Cash),
                line("Rempeyek", dec!(0), dec!(10000), PaymentMethod::Cash),
            ],
            None,
        );
        assert!(matches!(result, Err(LedgerError::Validation(_))));
        assert!(engine
            .list_transactions(&TransactionFilter::default())
            .unwrap()
            .is_empty());
        assert!(engine.list_journal().unwrap().is_empty());
    }

    #[test]
    fn unknown_item_purchase_without_unit_rolls_back() {
        let engine = engine();
        let mut purchase = line("Gula Merah", dec!(4), dec!(15000), PaymentMethod::Cash);
        purchase.unit = None;

        let result = engine.record_transaction(date(), TransactionKind::Purchase, purchase, None);
        assert!(matches!(result, Err(LedgerError::Validation(_))));

        // The append happened before the validation failure; rollback must
        // have removed it along with any journal rows.
        assert!(engine
            .list_transactions(&TransactionFilter::default())
            .unwrap()
            .is_empty());
        assert!(engine.list_journal().unwrap().is_empty());
        assert!(engine.list_inventory().unwrap().is_empty());
    }

    #[test]
    fn untracked_sale_item_is_skipped() {
        let engine = engine();
        engine
            .record_transaction(
                date(),
                TransactionKind::Sale,
                line("Es Teh", dec!(1), dec!(5000), PaymentMethod::Cash),
                None,
            )
            .unwrap();
        assert!(engine.list_inventory().unwrap().is_empty());
        // Journal still gets the sale posting.
        assert_eq!(engine.list_journal().unwrap().len(), 1);
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let engine = engine();
        engine
            .register_purchase_item("Tepung Terigu", dec!(12000), "kg")
            .unwrap();
        let result = engine.register_purchase_item("Tepung Terigu", dec!(13000), "kg");
        assert!(matches!(result, Err(LedgerError::DuplicateItem(_))));

        let catalog = engine.list_catalog(CatalogSide::Purchase).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog[0].unit_price, dec!(12000), "catalog unchanged");
    }

    #[test]
    fn sale_catalog_is_separate_from_purchase_catalog() {
        let engine = engine();
        engine
            .register_sale_item("Keripik Kenikir", dec!(25000), "bungkus")
            .unwrap();
        assert_eq!(engine.list_catalog(CatalogSide::Sale).unwrap().len(), 1);
        assert!(engine.list_catalog(CatalogSide::Purchase).unwrap().is_empty());
        // Sale-side registration does not create inventory.
        assert!(engine.list_inventory().unwrap().is_empty());

        let duplicate = engine.register_sale_item("Keripik Kenikir", dec!(26000), "bungkus");
        assert!(matches!(duplicate, Err(LedgerError::DuplicateItem(_))));
    }

    #[test]
    fn trial_balance_totals_match() {
        let engine = engine();
        engine
            .record_transaction(
                date(),
                TransactionKind::Sale,
                line("Keripik Kenikir", dec!(5), dec!(25000), PaymentMethod::Cash),
                None,
            )
            .unwrap();
        let mut purchase = line("Tepung Terigu", dec!(10), dec!(12000), PaymentMethod::Credit);
        purchase.unit = Some("kg".to_string());
        engine
            .record_transaction(date(), TransactionKind::Purchase, purchase, None)
            .unwrap();
        engine
            .record_checkout(
                date(),
                TransactionKind::Sale,
                vec![
                    line("Keripik Kenikir", dec!(2), dec!(25000), PaymentMethod::Cash),
                    line("Rempeyek", dec!(3), dec!(10000), PaymentMethod::Credit),
                ],
                None,
            )
            .unwrap();

        let tb = engine.compute_trial_balance().unwrap();
        assert!(tb.balanced);
        assert_eq!(tb.total_debit, tb.total_credit);
    }

    #[test]
    fn income_statement_breaks_out_expenses_per_item() {
        let engine = engine();
        engine
            .record_transaction(
                date(),
                TransactionKind::Sale,
                line("Keripik Kenikir", dec!(5), dec!(25000), PaymentMethod::Cash),
                None,
            )
            .unwrap();
        let mut flour = line("Tepung Terigu", dec!(10), dec!(12000), PaymentMethod::Cash);
        flour.unit = Some("kg".to_string());
        engine
            .record_transaction(date(), TransactionKind::Purchase, flour, None)
            .unwrap();

        let report = engine
            .compute_income_statement(
                Date::from_calendar_date(2024, Month::February, 1).unwrap(),
                Date::from_calendar_date(2024, Month::April, 1).unwrap(),
            )
            .unwrap();
        assert_eq!(report.revenue, dec!(125000));
        assert_eq!(report.expenses.len(), 1);
        assert_eq!(report.expenses[0].item, "Tepung Terigu");
        assert_eq!(report.expenses[0].amount, dec!(120000));
        assert_eq!(report.net_income, dec!(5000));
    }

    #[test]
    fn reset_clears_log_but_keeps_catalogs() {
        let engine = engine();
        let mut purchase = line("Tepung Terigu", dec!(10), dec!(12000), PaymentMethod::Cash);
        purchase.unit = Some("kg".to_string());
        engine
            .record_transaction(date(), TransactionKind::Purchase, purchase, None)
            .unwrap();

        engine.reset_all().unwrap();

        assert!(engine
            .list_transactions(&TransactionFilter::default())
            .unwrap()
            .is_empty());
        assert!(engine.list_journal().unwrap().is_empty());
        let inventory = engine.list_inventory().unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory[0].quantity_on_hand, Decimal::ZERO);
        assert_eq!(engine.list_catalog(CatalogSide::Purchase).unwrap().len(), 1);

        let tb = engine.compute_trial_balance().unwrap();
        assert!(tb.rows.is_empty());
        assert!(tb.balanced);
    }
}
