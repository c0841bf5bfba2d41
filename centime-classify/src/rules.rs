//! Deterministic keyword rules used when the model is missing or unconfident.
//!
//! No model needed; substring matching covers the common merchant strings.

/// Ordered category → keywords table. Order is significant: the first
/// category with a matching keyword wins.
pub const CATEGORIZATION_RULES: &[(&str, &[&str])] = &[
    ("Groceries", &["supermarket", "grocery", "wal-mart", "costco"]),
    ("Restaurants", &["restaurant", "cafe", "food", "mcdo", "coffee"]),
    ("Transportation", &["uber", "taxi", "gas", "parking", "lyft"]),
    ("Shopping", &["amzn", "store", "shop", "outlet", "mall"]),
    ("Health", &["pharmacy", "doctor", "hospital", "clinic"]),
    ("Entertainment", &["cinema", "movies", "concert", "spotify", "netflix"]),
    ("Utilities", &["electricity", "water", "internet", "phone", "hydro"]),
    ("Rent", &["rent"]),
    ("Income", &["salary", "payroll", "standard aero", "paycheque"]),
    (
        "Investment",
        &["brokerage", "investments", "investment", "inv", "ppp", "tfsa", "rrsp"],
    ),
    ("Credit Payment", &["payment", "thank", "you", "received"]),
];

/// Scan the lowercased raw description against the rules table.
pub fn fallback_category(description: &str) -> Option<&'static str> {
    let lowered = description.to_lowercase();
    for (category, keywords) in CATEGORIZATION_RULES {
        if keywords.iter().any(|kw| lowered.contains(kw)) {
            return Some(category);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_matches() {
        assert_eq!(fallback_category("COSTCO WHOLESALE #123"), Some("Groceries"));
        assert_eq!(fallback_category("UBER *TRIP"), Some("Transportation"));
        assert_eq!(fallback_category("MONTHLY RENT E-TRANSFER"), Some("Rent"));
        assert_eq!(fallback_category("PAYROLL ACME INC"), Some("Income"));
    }

    #[test]
    fn test_table_order_breaks_ties() {
        // "grocery" (Groceries) and "payment" (Credit Payment) both match;
        // the earlier table entry wins.
        assert_eq!(
            fallback_category("grocery store payment"),
            Some("Groceries")
        );
    }

    #[test]
    fn test_no_match_is_uncategorized() {
        assert_eq!(fallback_category("ZZZZZ"), None);
        assert_eq!(fallback_category(""), None);
    }
}
