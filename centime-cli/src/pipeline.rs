//! Turn parsed statement rows into categorized, sign-normalized transactions

use centime_classify::{OverrideStore, SmartCategorizer, categorize_with_details};
use centime_core::{
    AccountType, Transaction, canonicalize_category, normalize_transaction_amount,
};
use centime_ingest::RawTransaction;

/// Categorize every parsed row and enforce the stored-amount sign
/// convention. Returns the transactions plus the last running balance the
/// statement reported, if any.
pub fn build_transactions(
    rows: &[RawTransaction],
    account_type: AccountType,
    categorizer: &SmartCategorizer,
    overrides: Option<&OverrideStore>,
) -> (Vec<Transaction>, Option<f64>) {
    let mut transactions = Vec::new();
    let mut last_balance = None;
    for row in rows {
        let description = row.description.trim();
        if description.is_empty() {
            continue;
        }
        let prediction = categorize_with_details(
            categorizer,
            overrides,
            description,
            Some(row.amount),
            Some(row.date),
            Some(account_type.as_str()),
        );
        let category = canonicalize_category(prediction.category.as_deref());
        let amount = normalize_transaction_amount(row.amount, account_type, category.as_deref());
        transactions.push(Transaction::new(row.date, description, amount, category));
        if let Some(balance) = row.balance {
            last_balance = Some(balance);
        }
    }
    (transactions, last_balance)
}
