//! Amount extraction.

use crate::models::same_amount;

use super::patterns::AMOUNT_PATTERNS;

/// Priority tier of an amount pattern, highest priority first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AmountTier {
    /// "amount" keyword followed by a number
    Keyword,
    /// "total" keyword
    Total,
    /// "paid" keyword
    Paid,
    /// Currency symbol or ISO code prefix
    CurrencySymbol,
    /// Any decimal with exactly two fraction digits
    BareDecimal,
}

impl AmountTier {
    /// 1 is the highest priority
    pub fn priority(&self) -> u8 {
        match self {
            Self::Keyword => 1,
            Self::Total => 2,
            Self::Paid => 3,
            Self::CurrencySymbol => 4,
            Self::BareDecimal => 5,
        }
    }
}

/// One amount found in the text
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountMatch {
    pub value: f64,
    pub tier: AmountTier,
    /// Byte offset of the whole match
    pub start: usize,
}

/// Result of scanning a text for amounts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmountExtraction {
    /// Every match, by tier then position
    pub matches: Vec<AmountMatch>,
}

impl AmountExtraction {
    /// First match of the highest-priority tier that fired
    pub fn leading(&self) -> Option<&AmountMatch> {
        self.matches
            .iter()
            .min_by_key(|m| (m.tier.priority(), m.start))
    }

    /// Largest value seen, regardless of tier
    pub fn largest(&self) -> Option<f64> {
        self.matches.iter().map(|m| m.value).reduce(f64::max)
    }

    /// First value of the given tier
    pub fn first_in_tier(&self, tier: AmountTier) -> Option<f64> {
        self.matches
            .iter()
            .filter(|m| m.tier == tier)
            .min_by_key(|m| m.start)
            .map(|m| m.value)
    }

    /// Distinct values, sorted descending
    pub fn values(&self) -> Vec<f64> {
        let mut values: Vec<f64> = Vec::new();
        for m in &self.matches {
            if !values.iter().any(|v| same_amount(*v, m.value)) {
                values.push(m.value);
            }
        }
        values.sort_by(|a, b| b.total_cmp(a));
        values
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// Scan text for amounts using the tiered pattern table
pub fn extract_amounts(text: &str) -> AmountExtraction {
    let mut matches = Vec::new();

    for (tier, pattern) in AMOUNT_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if in_dotted_run(text, number.start(), number.end()) {
                continue;
            }
            if let Some(value) = parse_amount(number.as_str()) {
                matches.push(AmountMatch {
                    value,
                    tier: *tier,
                    start: whole.start(),
                });
            }
        }
    }

    AmountExtraction { matches }
}

/// Whether a number is one segment of a dotted date or version string
/// such as `25.12.2023` or `1.10.2`
fn in_dotted_run(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
    let followed = bytes.get(end) == Some(&b'.') && digit_at(end + 1);
    let preceded = start >= 2 && bytes[start - 1] == b'.' && digit_at(start - 2);
    followed || preceded
}

/// Amount following the literal keyword "amount", if the text has one
pub fn keyword_amount(text: &str) -> Option<f64> {
    if !text.to_lowercase().contains("amount") {
        return None;
    }
    extract_amounts(text).first_in_tier(AmountTier::Keyword)
}

/// Parse a matched number, dropping separators and symbols
pub fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    let value: f64 = cleaned.parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}
