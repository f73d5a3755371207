//! Merchant and category extraction from statement description lines.

use khata_core::UNCATEGORIZED;

/// Splits a raw description line into counterparty and category.
///
/// Extraction is bank-format specific: alternate formats implement this
/// trait without touching normalization or aggregation.
pub trait DescriptionParser {
    /// The counterparty named by the description.
    fn merchant(&self, description: &str) -> String;

    /// The spend category, or `Uncategorized` when the line carries none.
    fn category(&self, description: &str) -> String;
}

/// Positional split on `/` for `XX/MERCHANT/.../CATEGORY`-style encodings:
/// merchant is the second segment, category the last. Not a general parser;
/// lines that don't follow the encoding come back uncategorized.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlashDelimited;

impl DescriptionParser for SlashDelimited {
    fn merchant(&self, description: &str) -> String {
        let parts: Vec<&str> = description.split('/').collect();
        if parts.len() >= 2 {
            parts[1].trim().to_string()
        } else {
            description.trim().to_string()
        }
    }

    fn category(&self, description: &str) -> String {
        let parts: Vec<&str> = description.split('/').collect();
        if parts.len() >= 3 {
            parts[parts.len() - 1].trim().to_string()
        } else {
            UNCATEGORIZED.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_encoding() {
        let p = SlashDelimited;
        assert_eq!(p.merchant("POS/AMAZON/4421/Shopping"), "AMAZON");
        assert_eq!(p.category("POS/AMAZON/4421/Shopping"), "Shopping");
    }

    #[test]
    fn test_two_segments_has_merchant_but_no_category() {
        let p = SlashDelimited;
        assert_eq!(p.merchant("UPI/ZOMATO"), "ZOMATO");
        assert_eq!(p.category("UPI/ZOMATO"), UNCATEGORIZED);
    }

    #[test]
    fn test_plain_line_is_its_own_merchant() {
        let p = SlashDelimited;
        assert_eq!(p.merchant("  ATM WITHDRAWAL  "), "ATM WITHDRAWAL");
        assert_eq!(p.category("ATM WITHDRAWAL"), UNCATEGORIZED);
    }

    #[test]
    fn test_segments_are_trimmed() {
        let p = SlashDelimited;
        assert_eq!(p.merchant("POS / BIG BAZAAR / 11 / Groceries"), "BIG BAZAAR");
        assert_eq!(p.category("POS / BIG BAZAAR / 11 / Groceries"), "Groceries");
    }
}
