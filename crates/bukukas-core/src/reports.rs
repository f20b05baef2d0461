//! Derived report projections. Reports are recomputed on demand from the
//! journal and transaction log, never cached as separate mutable state.

use std::fmt::Display;

use prettytable::{row, Table};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

/// Tolerance under which the trial balance counts as balanced.
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    pub account: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

/// Per-account net balances. A signed balance >= 0 shows on the debit side,
/// a negative one as a credit balance of the absolute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub rows: Vec<TrialBalanceRow>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub balanced: bool,
}

impl TrialBalance {
    pub fn from_rows(rows: Vec<TrialBalanceRow>) -> Self {
        let total_debit: Decimal = rows.iter().map(|r| r.debit).sum();
        let total_credit: Decimal = rows.iter().map(|r| r.credit).sum();
        let balanced = (total_debit - total_credit).abs() < BALANCE_TOLERANCE;
        Self {
            rows,
            total_debit,
            total_credit,
            balanced,
        }
    }
}

impl Display for TrialBalance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut table = Table::new();
        table.add_row(row!["Account", "Debit", "Credit"]);
        table.add_empty_row();

        for item in &self.rows {
            table.add_row(row![item.account, item.debit, item.credit]);
        }

        table.add_empty_row();
        table.add_row(row!["TOTAL", self.total_debit, self.total_credit]);

        write!(f, "\n{}", table)?;
        if !self.balanced {
            writeln!(
                f,
                "WARNING: ledger out of balance (debit {} vs credit {})",
                self.total_debit, self.total_credit
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseLine {
    pub item: String,
    pub amount: Decimal,
}

/// Profit and loss over a date range: sale revenue less purchase expenses,
/// expenses broken out per item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeStatement {
    pub from: Date,
    pub to: Date,
    pub revenue: Decimal,
    pub expenses: Vec<ExpenseLine>,
    pub total_expenses: Decimal,
    pub net_income: Decimal,
}

impl Display for IncomeStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut table = Table::new();
        table.add_row(row![format!("Income {} to {}", self.from, self.to), ""]);
        table.add_empty_row();
        table.add_row(row!["Revenue", self.revenue]);

        for line in &self.expenses {
            table.add_row(row![format!("Expense: {}", line.item), line.amount]);
        }

        table.add_empty_row();
        table.add_row(row!["Total Expenses", self.total_expenses]);
        table.add_row(row!["NET INCOME", self.net_income]);

        write!(f, "\n{}", table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_and_balanced_flag() {
        let tb = TrialBalance::from_rows(vec![
            TrialBalanceRow {
                account: "Cash".into(),
                debit: Decimal::from(125_000),
                credit: Decimal::ZERO,
            },
            TrialBalanceRow {
                account: "Sales Revenue".into(),
                debit: Decimal::ZERO,
                credit: Decimal::from(125_000),
            },
        ]);
        assert_eq!(tb.total_debit, tb.total_credit);
        assert!(tb.balanced);
    }

    #[test]
    fn unbalanced_render_carries_warning() {
        let tb = TrialBalance::from_rows(vec![TrialBalanceRow {
            account: "Cash".into(),
            debit: Decimal::from(10),
            credit: Decimal::ZERO,
        }]);
        assert!(!tb.balanced);
        let rendered = tb.to_string();
        assert!(rendered.contains("WARNING"));
        assert!(rendered.contains("TOTAL"));
    }

    #[test]
    fn tolerance_is_one_cent() {
        assert_eq!(BALANCE_TOLERANCE.to_string(), "0.01");
    }
}
