//! Sign normalization and income/expense/invested/transfer classification

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::account::{AccountFamily, AccountType};
use crate::category::{canonicalize_category, is_investment_category, is_transfer_category};

/// A categorized transaction as handed to classification and aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub description: String,
    /// Signed; see [`normalize_transaction_amount`] for the stored convention.
    pub amount: f64,
    pub category: Option<String>,
}

impl Transaction {
    pub fn new(
        date: NaiveDate,
        description: impl Into<String>,
        amount: f64,
        category: Option<String>,
    ) -> Self {
        Self {
            date,
            description: description.into(),
            amount,
            category,
        }
    }
}

/// Non-exclusive bucket tags for a single transaction.
///
/// Derived on demand, never persisted. `counts_income` and `counts_expense`
/// are mutually exclusive; `is_transfer` excludes every other bucket.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TransactionClassification {
    pub amount: f64,
    pub counts_income: bool,
    pub counts_expense: bool,
    pub counts_invested: bool,
    pub is_transfer: bool,
}

/// Enforce per-account-type sign conventions at write time.
///
/// Credit-family activity is stored negative (an outflow), except
/// transfer-category rows (payments reduce the liability) which stay
/// non-negative. Everything else passes through untouched.
pub fn normalize_transaction_amount(
    amount: f64,
    account_type: AccountType,
    category: Option<&str>,
) -> f64 {
    if account_type.family() != AccountFamily::Credit {
        return amount;
    }
    let canonical = canonicalize_category(category);
    let magnitude = amount.abs();
    if is_transfer_category(canonical.as_deref()) {
        magnitude
    } else {
        -magnitude
    }
}

/// Classify one transaction into reporting buckets.
///
/// The check order is load-bearing: transfer first (neutralized entirely),
/// then investment (by account family or category, amount taken absolute),
/// then family dispatch. Credit-family amounts were sign-normalized at
/// write time, so they always count as expenses here.
pub fn classify_transaction(
    txn: &Transaction,
    account_type: AccountType,
) -> TransactionClassification {
    let amount = txn.amount;
    let category = canonicalize_category(txn.category.as_deref());

    if amount == 0.0 {
        return TransactionClassification::default();
    }

    if is_transfer_category(category.as_deref()) {
        return TransactionClassification {
            amount,
            is_transfer: true,
            ..Default::default()
        };
    }

    if account_type.family() == AccountFamily::Investment
        || is_investment_category(category.as_deref())
    {
        return TransactionClassification {
            amount: amount.abs(),
            counts_invested: true,
            ..Default::default()
        };
    }

    match account_type.family() {
        AccountFamily::Credit => TransactionClassification {
            amount,
            counts_expense: true,
            ..Default::default()
        },
        // Cash accounts and anything else classify by sign.
        AccountFamily::Cash | AccountFamily::Investment => {
            if amount > 0.0 {
                TransactionClassification {
                    amount,
                    counts_income: true,
                    ..Default::default()
                }
            } else {
                TransactionClassification {
                    amount,
                    counts_expense: true,
                    ..Default::default()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn txn(amount: f64, category: Option<&str>) -> Transaction {
        Transaction::new(
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "TEST ROW",
            amount,
            category.map(str::to_string),
        )
    }

    #[test]
    fn test_credit_amounts_forced_negative() {
        let normalized =
            normalize_transaction_amount(42.0, AccountType::Credit, Some("Groceries"));
        assert_eq!(normalized, -42.0);
        let already =
            normalize_transaction_amount(-42.0, AccountType::LineOfCredit, Some("Groceries"));
        assert_eq!(already, -42.0);
    }

    #[test]
    fn test_credit_transfers_stay_positive() {
        let payment =
            normalize_transaction_amount(-300.0, AccountType::Credit, Some("Credit Payment"));
        assert_eq!(payment, 300.0);
    }

    #[test]
    fn test_cash_amounts_pass_through() {
        assert_eq!(
            normalize_transaction_amount(-9.5, AccountType::Chequing, None),
            -9.5
        );
        assert_eq!(
            normalize_transaction_amount(9.5, AccountType::Tfsa, Some("Investment")),
            9.5
        );
    }

    #[test]
    fn test_sign_invariant_over_credit_categories() {
        for category in [None, Some("Groceries"), Some("Shopping"), Some("Rent")] {
            for amount in [-120.0, 0.5, 120.0] {
                let stored = normalize_transaction_amount(amount, AccountType::Credit, category);
                assert!(stored <= 0.0, "{category:?} {amount}");
            }
        }
        for amount in [-120.0, 120.0] {
            let stored =
                normalize_transaction_amount(amount, AccountType::Loan, Some("Account Transfer"));
            assert!(stored >= 0.0);
        }
    }

    #[test]
    fn test_zero_amount_classifies_as_nothing() {
        let c = classify_transaction(&txn(0.0, Some("Groceries")), AccountType::Chequing);
        assert_eq!(c, TransactionClassification::default());
    }

    #[test]
    fn test_transfer_is_neutralized() {
        let c = classify_transaction(&txn(500.0, Some("credit payment")), AccountType::Chequing);
        assert!(c.is_transfer);
        assert!(!c.counts_income && !c.counts_expense && !c.counts_invested);
    }

    #[test]
    fn test_investment_account_activity_is_contribution() {
        let c = classify_transaction(&txn(-250.0, None), AccountType::Rrsp);
        assert!(c.counts_invested);
        assert_eq!(c.amount, 250.0);
        assert!(!c.counts_income && !c.counts_expense);
    }

    #[test]
    fn test_investment_category_on_cash_account() {
        let c = classify_transaction(&txn(-300.0, Some("Investment")), AccountType::Chequing);
        assert!(c.counts_invested);
        assert_eq!(c.amount, 300.0);
    }

    #[test]
    fn test_cash_dispatches_by_sign() {
        let income = classify_transaction(&txn(2000.0, Some("Income")), AccountType::Chequing);
        assert!(income.counts_income && !income.counts_expense);
        let expense = classify_transaction(&txn(-4.5, Some("Restaurants")), AccountType::Savings);
        assert!(expense.counts_expense && !expense.counts_income);
    }

    #[test]
    fn test_credit_is_always_expense() {
        let c = classify_transaction(&txn(-75.0, Some("Shopping")), AccountType::Credit);
        assert!(c.counts_expense);
        assert_eq!(c.amount, -75.0);
    }

    #[test]
    fn test_income_and_expense_never_coincide() {
        for atype in crate::account::ALL_ACCOUNT_TYPES {
            for amount in [-10.0, 0.0, 10.0] {
                for category in [None, Some("Groceries"), Some("Account Transfer"), Some("rrsp")] {
                    let c = classify_transaction(&txn(amount, category), *atype);
                    assert!(
                        !(c.counts_income && c.counts_expense),
                        "{atype:?} {amount} {category:?}"
                    );
                }
            }
        }
    }
}
