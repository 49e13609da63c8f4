//! Helper functions and utilities
//!
//! This module contains common helper functions used throughout the application.

use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};

/// Render a money amount with two decimals and the euro sign, e.g. `8.99 €`
pub fn format_price(amount: Decimal) -> String {
    format!("{} €", format_decimal(amount))
}

/// Render a money amount with exactly two decimals
pub fn format_decimal(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}", rounded)
}

/// Validate email format
pub fn is_valid_email(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL
        .get_or_init(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
        })
        .is_match(email)
}

/// Calculate pagination offset for a 1-based page number
///
/// `None` when the offset does not fit in an `i64`.
pub fn calculate_offset(page: i64, page_size: i64) -> Option<i64> {
    page.saturating_sub(1).max(0).checked_mul(page_size.max(0))
}

/// Sanitize filename for safe storage
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let sanitized: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = sanitized.trim_start_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Decimal::new(899, 2)), "8.99 €");
        assert_eq!(format_price(Decimal::new(10, 0)), "10.00 €");
        assert_eq!(format_price(Decimal::new(15, 1)), "1.50 €");
    }

    #[test]
    fn test_is_valid_email() {
        assert!(is_valid_email("admin@digitalletter.com"));
        assert!(!is_valid_email("admin@localhost"));
        assert!(!is_valid_email("not an email"));
    }

    #[test]
    fn test_calculate_offset() {
        assert_eq!(calculate_offset(1, 10), Some(0));
        assert_eq!(calculate_offset(3, 10), Some(20));
        assert_eq!(calculate_offset(0, 10), Some(0));
        assert_eq!(calculate_offset(i64::MAX, 10), None);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("mi foto.jpg"), "mi_foto.jpg");
        assert_eq!(sanitize_filename(".."), "upload");
    }
}
