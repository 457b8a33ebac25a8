//! Vendor name extraction and normalization.

use super::patterns::{LEGAL_SUFFIX, VENDOR_FILENAME, VENDOR_PHRASE, WHITESPACE};

/// How many non-blank leading lines are considered for vendor names
const HEADER_LINES: usize = 10;

const MIN_LINE_LEN: usize = 2;
const MAX_LINE_LEN: usize = 50;
const MAX_WORDS: usize = 3;

/// Lines that name the document rather than the vendor
const HEADER_WORDS: &[&str] = &[
    "receipt",
    "sales receipt",
    "payment receipt",
    "invoice",
    "tax invoice",
    "statement",
    "bank statement",
    "account statement",
    "confirmation",
    "payment confirmation",
    "order confirmation",
    "bill",
    "subscription",
    "total",
    "subtotal",
    "amount",
    "date",
    "description",
    "original",
    "copy",
    "paid",
];

/// Known brand spellings, keyed by lowercase cleaned name
const BRAND_ALIASES: &[(&str, &str)] = &[
    ("x", "X"),
    ("x corp", "X"),
    ("x.com", "X"),
    ("twitter", "X"),
    ("twitter.com", "X"),
    ("amazon", "Amazon"),
    ("amazon.com", "Amazon"),
    ("amzn", "Amazon"),
    ("amzn mktp", "Amazon"),
    ("amzn mktp us", "Amazon"),
];

/// Extract cleaned vendor candidates in scan order: header lines, relational
/// phrases, then the filename
pub fn extract_vendors(text: &str, filename: Option<&str>) -> Vec<String> {
    let mut vendors: Vec<String> = Vec::new();
    let mut push = |candidate: Option<String>| {
        if let Some(v) = candidate {
            if !vendors.iter().any(|existing| existing.eq_ignore_ascii_case(&v)) {
                vendors.push(v);
            }
        }
    };

    for line in text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .take(HEADER_LINES)
    {
        if is_vendor_line(line) {
            push(clean_vendor(line));
        }
    }

    for caps in VENDOR_PHRASE.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            push(clean_vendor(m.as_str()));
        }
    }

    if let Some(name) = filename.and_then(vendor_from_filename) {
        push(clean_vendor(&name));
    }

    vendors
}

/// Strip legal suffixes, collapse whitespace, truncate and apply brand aliases
pub fn clean_vendor(raw: &str) -> Option<String> {
    let mut name = WHITESPACE.replace_all(raw.trim(), " ").to_string();
    name = trim_punctuation(&name).to_string();

    loop {
        let stripped = LEGAL_SUFFIX.replace(&name, "").to_string();
        let stripped = trim_punctuation(&stripped).to_string();
        if stripped == name || stripped.is_empty() {
            break;
        }
        name = stripped;
    }

    if let Some(alias) = brand_alias(&name) {
        return Some(alias.to_string());
    }

    let truncated = name
        .split_whitespace()
        .take(MAX_WORDS)
        .collect::<Vec<_>>()
        .join(" ");
    let truncated = trim_punctuation(&truncated);

    if let Some(alias) = brand_alias(truncated) {
        return Some(alias.to_string());
    }

    if truncated.chars().count() < MIN_LINE_LEN {
        return None;
    }
    Some(truncated.to_string())
}

/// Brand rewrite for a cleaned name, if known
pub fn brand_alias(name: &str) -> Option<&'static str> {
    let key = name.trim().to_lowercase();
    BRAND_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, brand)| *brand)
}

fn is_vendor_line(line: &str) -> bool {
    let len = line.chars().count();
    if !(MIN_LINE_LEN..=MAX_LINE_LEN).contains(&len) {
        return false;
    }
    if !line.chars().next().is_some_and(char::is_uppercase) {
        return false;
    }
    if line.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }
    let lower = line.to_lowercase();
    if line.contains(':') || line.contains('@') || lower.contains("http") || lower.contains("www.") {
        return false;
    }
    if lower.starts_with("thank you") || lower.starts_with("page ") {
        return false;
    }
    let bare = lower.trim_end_matches(|c: char| !c.is_alphanumeric());
    !HEADER_WORDS.contains(&bare)
}

fn vendor_from_filename(filename: &str) -> Option<String> {
    let stem = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(filename);
    let caps = VENDOR_FILENAME.captures(stem)?;
    let word = caps.get(1)?.as_str();
    let mut chars = word.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

fn trim_punctuation(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | ':' | '-' | '|'))
        .trim_end_matches('.')
        .trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_normalization() {
        assert_eq!(clean_vendor("X Corp").as_deref(), Some("X"));
        assert_eq!(clean_vendor("X, Corp.").as_deref(), Some("X"));
        assert_eq!(clean_vendor("Twitter").as_deref(), Some("X"));
        assert_eq!(clean_vendor("Twitter, Inc.").as_deref(), Some("X"));
        assert_eq!(clean_vendor("Amazon.com").as_deref(), Some("Amazon"));
    }

    #[test]
    fn test_legal_suffixes_stripped() {
        assert_eq!(clean_vendor("Acme Supplies LLC").as_deref(), Some("Acme Supplies"));
        assert_eq!(clean_vendor("Globex Corporation").as_deref(), Some("Globex"));
        assert_eq!(clean_vendor("Initech Co., Ltd.").as_deref(), Some("Initech"));
        assert_eq!(clean_vendor("Stark Company").as_deref(), Some("Stark"));
    }

    #[test]
    fn test_whitespace_and_truncation() {
        assert_eq!(
            clean_vendor("  The   Very Long Vendor Name  ").as_deref(),
            Some("The Very Long")
        );
    }

    #[test]
    fn test_too_short_rejected() {
        assert_eq!(clean_vendor("A"), None);
        assert_eq!(clean_vendor("   "), None);
    }

    #[test]
    fn test_header_lines() {
        let text = "Receipt\nAcme Supplies\nAmount: $123.45\nDate: 2024-03-01";
        assert_eq!(extract_vendors(text, None), vec!["Acme Supplies"]);
    }

    #[test]
    fn test_header_lines_only_first_ten() {
        let mut text = String::new();
        for _ in 0..10 {
            text.push_str("line with lowercase start\n");
        }
        text.push_str("Late Vendor\n");
        assert!(extract_vendors(&text, None).is_empty());
    }

    #[test]
    fn test_relational_phrases() {
        let text = "your order\n\nsold by Widget Works Inc.\npayment to Globex";
        assert_eq!(extract_vendors(text, None), vec!["Widget Works", "Globex"]);
    }

    #[test]
    fn test_merchant_label() {
        let text = "merchant: Blue Bottle Coffee\n$4.50";
        assert_eq!(extract_vendors(text, None), vec!["Blue Bottle Coffee"]);
    }

    #[test]
    fn test_filename_fallback() {
        assert_eq!(
            extract_vendors("$10.00", Some("uploads/netflix_receipt.pdf")),
            vec!["Netflix"]
        );
        assert!(extract_vendors("$10.00", Some("receipt.pdf")).is_empty());
        assert!(extract_vendors("$10.00", Some("scan001.pdf")).is_empty());
    }

    #[test]
    fn test_lines_with_digits_or_labels_skipped() {
        let text = "Order 12345\nhttps://shop.example\nsupport@shop.example\nTotal: $5.00";
        assert!(extract_vendors(text, None).is_empty());
    }
}
