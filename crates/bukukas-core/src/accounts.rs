//! The fixed chart of accounts the posting rules write to.

/// Asset account holding cash takings and cash spent on purchases.
pub const CASH: &str = "Cash";
/// Asset account for credit sales not yet collected.
pub const ACCOUNTS_RECEIVABLE: &str = "Accounts Receivable";
/// Liability account for credit purchases not yet paid.
pub const ACCOUNTS_PAYABLE: &str = "Accounts Payable";
/// Income account credited by every sale.
pub const SALES_REVENUE: &str = "Sales Revenue";
/// Expense account family debited by purchases, one sub-account per item.
pub const RAW_MATERIALS: &str = "Raw Materials";

/// Purchase expense account for a specific item, e.g. `Raw Materials:Tepung Terigu`.
pub fn raw_materials_account(item: &str) -> String {
    format!("{}:{}", RAW_MATERIALS, item)
}

/// The item name back out of a purchase expense account, if it is one.
pub fn raw_materials_item(account: &str) -> Option<&str> {
    account
        .strip_prefix(RAW_MATERIALS)
        .and_then(|rest| rest.strip_prefix(':'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_materials_round_trip() {
        let account = raw_materials_account("Tepung Terigu");
        assert_eq!(account, "Raw Materials:Tepung Terigu");
        assert_eq!(raw_materials_item(&account), Some("Tepung Terigu"));
        assert_eq!(raw_materials_item(CASH), None);
    }
}
