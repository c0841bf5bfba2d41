//! Canonical category labels and alias matching

/// Canonical label for inter-account transfers (incl. credit payments).
pub const ACCOUNT_TRANSFER_CATEGORY: &str = "Account Transfer";

/// Canonical label for investment contributions.
pub const INVESTMENT_CATEGORY: &str = "Investment";

const TRANSFER_ALIASES: &[&str] = &["account transfer", "credit payment"];

const INVESTMENT_ALIASES: &[&str] = &[
    "investment",
    "investments",
    "investment contribution",
    "investment transfer",
    "rrsp",
    "tfsa",
    "rsp",
    "fhsa",
    "retirement contribution",
];

fn normalized(category: Option<&str>) -> String {
    category.unwrap_or("").trim().to_lowercase()
}

/// Normalize a free-form category label to its canonical name.
///
/// Transfer aliases map to [`ACCOUNT_TRANSFER_CATEGORY`]; investment aliases
/// and any label starting with "investment" map to [`INVESTMENT_CATEGORY`];
/// anything else passes through trimmed. Idempotent.
pub fn canonicalize_category(category: Option<&str>) -> Option<String> {
    let trimmed = category?.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();
    if TRANSFER_ALIASES.contains(&lowered.as_str()) {
        return Some(ACCOUNT_TRANSFER_CATEGORY.to_string());
    }
    if INVESTMENT_ALIASES.contains(&lowered.as_str()) || lowered.starts_with("investment") {
        return Some(INVESTMENT_CATEGORY.to_string());
    }
    Some(trimmed.to_string())
}

pub fn is_transfer_category(category: Option<&str>) -> bool {
    TRANSFER_ALIASES.contains(&normalized(category).as_str())
}

pub fn is_investment_category(category: Option<&str>) -> bool {
    let lowered = normalized(category);
    if lowered.is_empty() {
        return false;
    }
    INVESTMENT_ALIASES.contains(&lowered.as_str()) || lowered.starts_with("investment")
}
