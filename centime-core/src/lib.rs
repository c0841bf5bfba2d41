//! centime-core: account/category domain model, sign normalization,
//! classification, and aggregation for the statement pipeline

pub mod account;
pub mod aggregate;
pub mod category;
pub mod classify;
pub mod text;

pub use account::{ALL_ACCOUNT_TYPES, AccountFamily, AccountType};
pub use aggregate::{
    AccountBalance, AggregateTotals, CategoryExpense, ClassificationKind, MonthlySummary,
    aggregate_transactions, category_breakdown, filter_transactions_by_kind, monthly_summary,
    net_worth, rows_in_month,
};
pub use category::{
    ACCOUNT_TRANSFER_CATEGORY, INVESTMENT_CATEGORY, canonicalize_category, is_investment_category,
    is_transfer_category,
};
pub use classify::{
    Transaction, TransactionClassification, classify_transaction, normalize_transaction_amount,
};
pub use text::normalize_description;
