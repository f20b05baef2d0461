use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Sale,
    Purchase,
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionKind::Sale => f.write_str("Sale"),
            TransactionKind::Purchase => f.write_str("Purchase"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Credit,
}

/// One recorded sale or purchase line. Append-only: never mutated after
/// creation, and `total` is always `quantity * unit_price` as computed at
/// creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    /// Shared by every line of one checkout so an invoice can be rebuilt.
    pub group_id: Uuid,
    pub date: Date,
    pub kind: TransactionKind,
    pub item: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub total: Decimal,
    pub payment_method: PaymentMethod,
    pub note: Option<String>,
    pub created_at: OffsetDateTime,
}

/// One debit/credit posting pair derived from a checkout. A single row holds
/// both legs; the amount is always positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub date: Date,
    pub description: String,
    pub debit_account: String,
    pub credit_account: String,
    pub amount: Decimal,
    pub created_at: OffsetDateTime,
}

/// Quantity on hand for a tracked item. Quantities may be fractional for
/// weight-based goods and are allowed to go negative (no stock-out rejection).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub item: String,
    pub quantity_on_hand: Decimal,
    pub unit: String,
}

/// Which catalog an entry belongs to: standard sale prices or purchase costs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSide {
    Sale,
    Purchase,
}

impl CatalogSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogSide::Sale => "sale",
            CatalogSide::Purchase => "purchase",
        }
    }
}

impl std::str::FromStr for CatalogSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sale" => Ok(CatalogSide::Sale),
            "purchase" => Ok(CatalogSide::Purchase),
            other => Err(format!("unknown catalog side: {}", other)),
        }
    }
}

/// Standard unit price and unit of measure for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub item: String,
    pub unit_price: Decimal,
    pub unit: String,
}

/// One line of a checkout as submitted by the caller. `unit` is only required
/// when a purchase line introduces an item the inventory does not know yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub item: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub unit: Option<String>,
}

impl CheckoutLine {
    pub fn total(&self) -> Decimal {
        self.quantity * self.unit_price
    }
}

/// Filter for `list_transactions`. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionFilter {
    #[serde(default)]
    pub kind: Option<TransactionKind>,
    #[serde(default)]
    pub from: Option<Date>,
    #[serde(default)]
    pub to: Option<Date>,
}

impl TransactionFilter {
    pub fn matches(&self, txn: &Transaction) -> bool {
        if let Some(kind) = self.kind {
            if txn.kind != kind {
                return false;
            }
        }
        if let Some(from) = self.from {
            if txn.date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if txn.date > to {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Month;

    fn txn(kind: TransactionKind, date: Date) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            date,
            kind,
            item: "Keripik Kenikir".to_string(),
            quantity: Decimal::from(5),
            unit_price: Decimal::from(25_000),
            total: Decimal::from(125_000),
            payment_method: PaymentMethod::Cash,
            note: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[test]
    fn filter_by_kind_and_range() {
        let d1 = Date::from_calendar_date(2024, Month::March, 1).unwrap();
        let d2 = Date::from_calendar_date(2024, Month::March, 15).unwrap();
        let sale = txn(TransactionKind::Sale, d1);
        let purchase = txn(TransactionKind::Purchase, d2);

        let all = TransactionFilter::default();
        assert!(all.matches(&sale) && all.matches(&purchase));

        let sales_only = TransactionFilter {
            kind: Some(TransactionKind::Sale),
            ..Default::default()
        };
        assert!(sales_only.matches(&sale));
        assert!(!sales_only.matches(&purchase));

        let early = TransactionFilter {
            to: Some(d1),
            ..Default::default()
        };
        assert!(early.matches(&sale));
        assert!(!early.matches(&purchase));
    }

    #[test]
    fn default_payment_method_is_cash() {
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
    }
}
