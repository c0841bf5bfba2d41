//! Account types and the three families used by classification

use serde::{Deserialize, Serialize};

/// Closed set of supported account types.
///
/// Serialized as the lowercase strings banks/API clients send us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    #[serde(rename = "chequing")]
    Chequing,
    #[serde(rename = "savings")]
    Savings,
    #[serde(rename = "cash")]
    Cash,
    #[serde(rename = "credit")]
    Credit,
    #[serde(rename = "line_of_credit")]
    LineOfCredit,
    #[serde(rename = "tfsa")]
    Tfsa,
    #[serde(rename = "rrsp")]
    Rrsp,
    #[serde(rename = "rsp")]
    Rsp,
    #[serde(rename = "resp")]
    Resp,
    #[serde(rename = "brokerage")]
    Brokerage,
    #[serde(rename = "investment")]
    Investment,
    #[serde(rename = "loan")]
    Loan,
    #[serde(rename = "fhsa")]
    Fhsa,
}

/// Family partition driving sign conventions and classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountFamily {
    /// Chequing/savings/cash: positive = income, negative = expense.
    Cash,
    /// Credit card, line of credit, loan: spend is stored negative.
    Credit,
    /// Registered/brokerage accounts: activity counts as contributions.
    Investment,
}

pub const ALL_ACCOUNT_TYPES: &[AccountType] = &[
    AccountType::Chequing,
    AccountType::Savings,
    AccountType::Cash,
    AccountType::Credit,
    AccountType::LineOfCredit,
    AccountType::Tfsa,
    AccountType::Rrsp,
    AccountType::Rsp,
    AccountType::Resp,
    AccountType::Brokerage,
    AccountType::Investment,
    AccountType::Loan,
    AccountType::Fhsa,
];

impl AccountType {
    /// Parse a wire string. Unknown or empty input falls back to chequing
    /// so unparseable metadata never aborts a pipeline run.
    pub fn parse(value: &str) -> AccountType {
        match value.trim().to_lowercase().as_str() {
            "chequing" => AccountType::Chequing,
            "savings" => AccountType::Savings,
            "cash" => AccountType::Cash,
            "credit" => AccountType::Credit,
            "line_of_credit" => AccountType::LineOfCredit,
            "tfsa" => AccountType::Tfsa,
            "rrsp" => AccountType::Rrsp,
            "rsp" => AccountType::Rsp,
            "resp" => AccountType::Resp,
            "brokerage" => AccountType::Brokerage,
            "investment" => AccountType::Investment,
            "loan" => AccountType::Loan,
            "fhsa" => AccountType::Fhsa,
            _ => AccountType::Chequing,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Chequing => "chequing",
            AccountType::Savings => "savings",
            AccountType::Cash => "cash",
            AccountType::Credit => "credit",
            AccountType::LineOfCredit => "line_of_credit",
            AccountType::Tfsa => "tfsa",
            AccountType::Rrsp => "rrsp",
            AccountType::Rsp => "rsp",
            AccountType::Resp => "resp",
            AccountType::Brokerage => "brokerage",
            AccountType::Investment => "investment",
            AccountType::Loan => "loan",
            AccountType::Fhsa => "fhsa",
        }
    }

    /// Every account type belongs to exactly one family.
    pub fn family(&self) -> AccountFamily {
        match self {
            AccountType::Chequing | AccountType::Savings | AccountType::Cash => AccountFamily::Cash,
            AccountType::Credit | AccountType::LineOfCredit | AccountType::Loan => {
                AccountFamily::Credit
            }
            AccountType::Tfsa
            | AccountType::Rrsp
            | AccountType::Rsp
            | AccountType::Resp
            | AccountType::Brokerage
            | AccountType::Investment
            | AccountType::Fhsa => AccountFamily::Investment,
        }
    }
}
