/// Normalizes a currency code: trims, uppercases, and maps the sentinel
/// strings upstream feeds emit for "unknown" ("NaN", "None", "null", empty)
/// to USD.
pub fn normalize_currency_code(code: &str) -> String {
    let trimmed = code.trim();
    let lowered = trimmed.to_lowercase();
    if trimmed.is_empty() || lowered == "nan" || lowered == "none" || lowered == "null" {
        "USD".to_string()
    } else {
        trimmed.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_currency_code() {
        assert_eq!(normalize_currency_code("usd"), "USD");
        assert_eq!(normalize_currency_code(" cad "), "CAD");
        assert_eq!(normalize_currency_code(""), "USD");
        assert_eq!(normalize_currency_code("NaN"), "USD");
        assert_eq!(normalize_currency_code("None"), "USD");
        assert_eq!(normalize_currency_code("null"), "USD");
    }
}
