//! Monthly totals, category breakdown, and net worth

use std::collections::HashMap;

use chrono::Datelike;
use serde::Serialize;

use crate::account::{AccountFamily, AccountType};
use crate::category::canonicalize_category;
use crate::classify::{Transaction, classify_transaction};

/// Running totals over a set of classified transactions.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AggregateTotals {
    pub income: f64,
    /// Accumulated with a forced <= 0 magnitude convention.
    pub expenses: f64,
    /// Always >= 0.
    pub invested: f64,
}

/// Monthly reporting view derived from [`AggregateTotals`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub total_invested: f64,
    pub net_flow: f64,
    pub savings_rate: f64,
}

/// One expense category and its (negative) total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryExpense {
    pub category: String,
    pub total: f64,
}

/// Which classification bucket a breakdown listing should select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationKind {
    Income,
    Expense,
    Investment,
}

/// Latest known state of one account, for net worth.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountBalance {
    pub account_type: AccountType,
    /// Balance reported by the institution, when we have one.
    pub latest_balance: Option<f64>,
    /// Fallback: sum of the account's transaction amounts.
    pub txn_sum: f64,
}

/// Fold classified transactions into income/expense/invested totals.
pub fn aggregate_transactions<'a, I>(rows: I) -> AggregateTotals
where
    I: IntoIterator<Item = (&'a Transaction, AccountType)>,
{
    let mut totals = AggregateTotals::default();
    for (txn, account_type) in rows {
        let classification = classify_transaction(txn, account_type);
        if classification.counts_income {
            totals.income += classification.amount;
        }
        if classification.counts_expense {
            let mut amount = classification.amount;
            if amount > 0.0 {
                amount = -amount.abs();
            }
            totals.expenses += amount;
        }
        if classification.counts_invested {
            totals.invested += classification.amount;
        }
    }
    totals
}

/// Monthly summary rules:
/// - income only counts inflows on cash accounts
/// - expenses aggregate cash + credit outflows (transfers excluded)
/// - account transfers are neutralized
/// - investment contributions (category or account-type) tracked separately
pub fn monthly_summary<'a, I>(rows: I) -> MonthlySummary
where
    I: IntoIterator<Item = (&'a Transaction, AccountType)>,
{
    let totals = aggregate_transactions(rows);
    let net_flow = totals.income + totals.expenses - totals.invested;
    let savings_rate = if totals.income > 0.0 {
        net_flow / totals.income
    } else {
        0.0
    };
    MonthlySummary {
        total_income: totals.income,
        total_expenses: totals.expenses,
        total_invested: totals.invested,
        net_flow,
        savings_rate,
    }
}

/// Expense totals grouped by canonical category, largest expense first
/// (ascending by signed total).
pub fn category_breakdown<'a, I>(rows: I) -> Vec<CategoryExpense>
where
    I: IntoIterator<Item = (&'a Transaction, AccountType)>,
{
    let mut totals: HashMap<String, f64> = HashMap::new();
    for (txn, account_type) in rows {
        let classification = classify_transaction(txn, account_type);
        if !classification.counts_expense {
            continue;
        }
        let label = canonicalize_category(txn.category.as_deref())
            .unwrap_or_else(|| "Uncategorized".to_string());
        let mut amount = classification.amount;
        if amount > 0.0 {
            amount = -amount.abs();
        }
        *totals.entry(label).or_default() += amount;
    }
    let mut breakdown: Vec<CategoryExpense> = totals
        .into_iter()
        .map(|(category, total)| CategoryExpense { category, total })
        .collect();
    breakdown.sort_by(|a, b| a.total.total_cmp(&b.total));
    breakdown
}

/// Select transactions tagged with one classification bucket.
pub fn filter_transactions_by_kind<'a, I>(rows: I, kind: ClassificationKind) -> Vec<&'a Transaction>
where
    I: IntoIterator<Item = (&'a Transaction, AccountType)>,
{
    rows.into_iter()
        .filter(|(txn, account_type)| {
            let c = classify_transaction(txn, *account_type);
            match kind {
                ClassificationKind::Income => c.counts_income,
                ClassificationKind::Expense => c.counts_expense,
                ClassificationKind::Investment => c.counts_invested,
            }
        })
        .map(|(txn, _)| txn)
        .collect()
}

/// Keep only rows falling in the given calendar month.
pub fn rows_in_month<'a>(
    rows: &'a [(Transaction, AccountType)],
    year: i32,
    month: u32,
) -> impl Iterator<Item = (&'a Transaction, AccountType)> {
    rows.iter()
        .filter(move |(txn, _)| txn.date.year() == year && txn.date.month() == month)
        .map(|(txn, atype)| (txn, *atype))
}

/// Net worth over account balances: stored balance when present, else the
/// transaction sum; credit-family balances subtract.
pub fn net_worth(balances: &[AccountBalance]) -> f64 {
    let mut total = 0.0;
    for balance in balances {
        let value = balance.latest_balance.unwrap_or(balance.txn_sum);
        if balance.account_type.family() == AccountFamily::Credit {
            total -= value;
        } else {
            total += value;
        }
    }
    total
}
