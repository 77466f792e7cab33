//! Search input check run before any request is made

use pokedex_core::validation::matches_name_charset;

pub const INVALID_IDENTIFIER_MESSAGE: &str = "Please enter a valid Pokémon name or ID (1-150)";

/// A non-empty name of letters, digits and hyphens, or a number within
/// `1..=max_id`
pub fn is_valid_identifier(value: &str, max_id: u32) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }

    let numeric = value
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'));
    if let Some(number) = numeric.then(|| value.parse::<f64>().ok()).flatten() {
        return number >= 1.0 && number <= f64::from(max_id);
    }

    matches_name_charset(value)
}

/// Trim and lowercase a search term, rejecting it if it is not a valid
/// identifier
pub fn normalize_search(value: &str, max_id: u32) -> Option<String> {
    let value = value.trim().to_lowercase();
    is_valid_identifier(&value, max_id).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_identifiers_use_client_ceiling() {
        assert!(is_valid_identifier("1", 150));
        assert!(is_valid_identifier("150", 150));
        assert!(!is_valid_identifier("0", 150));
        assert!(!is_valid_identifier("151", 150));
    }

    #[test]
    fn test_names_use_charset() {
        assert!(is_valid_identifier("mr-mime", 150));
        assert!(!is_valid_identifier("mr. mime", 150));
        assert!(!is_valid_identifier("   ", 150));
    }

    #[test]
    fn test_normalize_search() {
        assert_eq!(normalize_search("  Pikachu ", 150), Some("pikachu".to_string()));
        assert_eq!(normalize_search("pikachu!!", 150), None);
        assert_eq!(normalize_search("", 150), None);
    }
}
