//! Compiled regex tables for field extraction.
//!
//! The amount table is an ordered list of `(tier, pattern)` pairs. Tier
//! order is business priority and overlapping matches across tiers are
//! expected, so the patterns must not be folded into one alternation.

use lazy_static::lazy_static;
use regex::Regex;

use super::amounts::AmountTier;

/// Positive number with optional thousands separators and up to two decimals
const NUMBER: &str = r"(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:\.\d{1,2})?)";

lazy_static! {
    pub static ref AMOUNT_PATTERNS: Vec<(AmountTier, Regex)> = vec![
        (
            AmountTier::Keyword,
            Regex::new(&format!(r"(?i)\bamount\b[^\d\n]{{0,30}}?{}", NUMBER)).unwrap(),
        ),
        (
            AmountTier::Total,
            Regex::new(&format!(r"(?i)\btotal\b[^\d\n]{{0,30}}?{}", NUMBER)).unwrap(),
        ),
        (
            AmountTier::Paid,
            Regex::new(&format!(r"(?i)\bpaid\b[^\d\n]{{0,30}}?{}", NUMBER)).unwrap(),
        ),
        (
            AmountTier::CurrencySymbol,
            Regex::new(&format!(
                r"(?:[$€£¥₹]|\b(?:USD|EUR|GBP|CAD|AUD|INR)\b)\s?{}",
                NUMBER
            ))
            .unwrap(),
        ),
        (
            AmountTier::BareDecimal,
            Regex::new(r"\b(\d{1,3}(?:,\d{3})+\.\d{2}|\d+\.\d{2})\b").unwrap(),
        ),
    ];

    // Dates
    pub static ref DATE_NUMERIC: Regex =
        Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})\b").unwrap();

    pub static ref DATE_ISO: Regex =
        Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})\b").unwrap();

    pub static ref DATE_MONTH_NAME_FIRST: Regex = Regex::new(
        r"(?i)\b(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4})\b"
    ).unwrap();

    pub static ref DATE_DAY_FIRST: Regex = Regex::new(
        r"(?i)\b(\d{1,2})(?:st|nd|rd|th)?\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?,?\s+(\d{4})\b"
    ).unwrap();

    // Vendors
    pub static ref VENDOR_PHRASE: Regex = Regex::new(
        r"\b(?i:from|merchant|vendor|sold by|billed to|payment to)\b[ \t]*:?[ \t]*([A-Z][A-Za-z0-9&'.,\- ]{1,48})"
    ).unwrap();

    pub static ref VENDOR_FILENAME: Regex =
        Regex::new(r"(?i)^([a-z][a-z0-9]*?)[_\-\s.]*(?:receipt|invoice|statement)").unwrap();

    pub static ref LEGAL_SUFFIX: Regex = Regex::new(
        r"(?i)[,\s]+(?:inc|incorporated|llc|l\.l\.c|corp|corporation|ltd|limited|company|co)\.?$"
    ).unwrap();

    pub static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();

    // Metadata
    pub static ref CURRENCY_CODE: Regex =
        Regex::new(r"\b(USD|EUR|GBP|CAD|AUD|INR|JPY|CHF)\b").unwrap();

    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"(?i)\b(?:invoice|inv|receipt|order)\s*(?:#|no\.?|number|num\.?)\s*:?\s*([A-Z0-9][A-Z0-9\-/]{2,})"
    ).unwrap();

    pub static ref PAYMENT_METHOD: Regex = Regex::new(
        r"(?i)\b(visa|master\s?card|amex|american express|discover|paypal|apple pay|google pay|bank transfer|wire transfer|ach|debit card|credit card|cash|cheque|check)\b"
    ).unwrap();
}
