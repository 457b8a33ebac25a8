//! Secondary document fields: type, currency, invoice number, payment method.

use crate::models::DocumentType;

use super::patterns::{CURRENCY_CODE, INVOICE_NUMBER, PAYMENT_METHOD};

/// Keyword search in fixed order; the first keyword present wins
pub fn detect_document_type(text: &str) -> DocumentType {
    let lower = text.to_lowercase();
    if lower.contains("invoice") {
        DocumentType::Invoice
    } else if lower.contains("receipt") {
        DocumentType::Receipt
    } else if lower.contains("statement") {
        DocumentType::Statement
    } else if lower.contains("confirmation") {
        DocumentType::Confirmation
    } else if lower.contains("subscription") || lower.contains("renewal") {
        DocumentType::Subscription
    } else {
        DocumentType::Unknown
    }
}

/// ISO currency code from an explicit code or the first currency symbol
pub fn detect_currency(text: &str) -> Option<String> {
    if let Some(caps) = CURRENCY_CODE.captures(text) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    text.chars()
        .find_map(|c| match c {
            '€' => Some("EUR"),
            '£' => Some("GBP"),
            '¥' => Some("JPY"),
            '₹' => Some("INR"),
            '$' => Some("USD"),
            _ => None,
        })
        .map(str::to_string)
}

pub fn detect_invoice_number(text: &str) -> Option<String> {
    INVOICE_NUMBER
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(|c: char| c == '-' || c == '/').to_string())
        .find(|n| n.chars().any(|c| c.is_ascii_digit()))
}

pub fn detect_payment_method(text: &str) -> Option<String> {
    let caps = PAYMENT_METHOD.captures(text)?;
    let raw = caps.get(1)?.as_str().to_lowercase();
    let method = match raw.as_str() {
        "visa" => "Visa",
        "mastercard" | "master card" => "Mastercard",
        "amex" | "american express" => "American Express",
        "discover" => "Discover",
        "paypal" => "PayPal",
        "apple pay" => "Apple Pay",
        "google pay" => "Google Pay",
        "bank transfer" | "wire transfer" | "ach" => "Bank Transfer",
        "debit card" => "Debit Card",
        "credit card" => "Credit Card",
        "cash" => "Cash",
        "cheque" | "check" => "Check",
        _ => return None,
    };
    Some(method.to_string())
}
