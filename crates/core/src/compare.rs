//! Ordered comparison with numeric and timestamp promotion.

use std::cmp::Ordering;

use crate::dates::parse_datetime;

/// Parse a finite number, ignoring surrounding whitespace.
pub fn parse_number(s: &str) -> Option<f64> {
    let n = s.trim().parse::<f64>().ok()?;
    n.is_finite().then_some(n)
}

/// Compare two values as numbers when both parse, else as timestamps when
/// both parse, else ordinally as strings.
///
/// The ordinal fallback means mixed inputs such as `"10"` vs `"9x"` order by
/// their text, not their magnitude.
pub fn compare_promoted(left: &str, right: &str) -> Ordering {
    if let (Some(a), Some(b)) = (parse_number(left), parse_number(right)) {
        if let Some(ordering) = a.partial_cmp(&b) {
            return ordering;
        }
    }
    if let (Some(a), Some(b)) = (parse_datetime(left), parse_datetime(right)) {
        return a.cmp(&b);
    }
    left.cmp(right)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_by_magnitude() {
        assert_eq!(compare_promoted("10", "9"), Ordering::Greater);
        assert_eq!(compare_promoted(" 2.50", "2.5"), Ordering::Equal);
    }

    #[test]
    fn dates_compare_chronologically() {
        assert_eq!(compare_promoted("2025/01/02", "2024-12-31"), Ordering::Greater);
    }

    #[test]
    fn mixed_inputs_fall_back_to_ordinal() {
        // "10" is numeric but "9x" is not, so the text order wins.
        assert_eq!(compare_promoted("10", "9x"), Ordering::Less);
        assert_eq!(compare_promoted("", "a"), Ordering::Less);
    }

    #[test]
    fn non_finite_numbers_are_not_promoted() {
        assert!(parse_number("NaN").is_none());
        assert!(parse_number("inf").is_none());
        assert_eq!(parse_number("-3"), Some(-3.0));
    }
}
