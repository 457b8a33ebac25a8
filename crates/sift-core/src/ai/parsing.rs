//! JSON parsing and validation for model responses
//!
//! Models are asked for a single JSON object, but some servers wrap it in
//! prose or code fences. The object is cut out, deserialized into the
//! response schema, then validated. Anything that does not fit the schema
//! becomes [`Error::Schema`] so the caller can fall back locally.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::extract::is_valid_iso_date;

use super::types::{EnhancedResponse, V2Response};

const MAX_RAW_IN_ERROR: usize = 200;

/// Slice the outermost JSON object out of a model response
pub fn extract_json_object(response: &str) -> Result<&str> {
    let response = response.trim();
    let start = response.find('{');
    let end = response.rfind('}');

    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(&response[s..=e]),
        _ => Err(Error::Schema(format!(
            "No JSON object in model response | Raw: {}",
            truncate(response)
        ))),
    }
}

/// Parse and validate an enhanced extractor response
pub fn parse_enhanced_response(response: &str) -> Result<EnhancedResponse> {
    let json_str = extract_json_object(response)?;
    let mut parsed: EnhancedResponse = serde_json::from_str(json_str).map_err(|e| {
        Error::Schema(format!(
            "Invalid extraction JSON: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })?;

    parsed.confidence = clamp_confidence(parsed.confidence)?;
    parsed.amount = positive_amount(parsed.amount);
    parsed.date = iso_date(parsed.date)?;
    parsed.description = non_empty(parsed.description);
    parsed.metadata.vendor = non_empty(parsed.metadata.vendor);
    parsed.metadata.invoice_number = non_empty(parsed.metadata.invoice_number);
    parsed.metadata.payment_method = non_empty(parsed.metadata.payment_method);
    parsed.metadata.currency = non_empty(parsed.metadata.currency);
    parsed.metadata.document_type = non_empty(parsed.metadata.document_type);

    Ok(parsed)
}

/// Parse and validate a V2 extractor response
pub fn parse_v2_response(response: &str) -> Result<V2Response> {
    let json_str = extract_json_object(response)?;
    let mut parsed: V2Response = serde_json::from_str(json_str).map_err(|e| {
        Error::Schema(format!(
            "Invalid extraction JSON: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })?;

    parsed.confidence = clamp_confidence(parsed.confidence)?;
    parsed.amount = positive_amount(parsed.amount);
    parsed.date = iso_date(parsed.date)?;
    parsed.vendor = non_empty(parsed.vendor);
    parsed.description = non_empty(parsed.description);
    parsed.invoice_number = non_empty(parsed.invoice_number);
    parsed.payment_method = non_empty(parsed.payment_method);
    parsed.currency = non_empty(parsed.currency);
    parsed.document_type = non_empty(parsed.document_type);

    parsed
        .raw_extraction
        .amounts
        .retain(|a| a.is_finite() && *a > 0.0);
    parsed
        .raw_extraction
        .dates
        .retain(|d| is_valid_iso_date(d));
    parsed.raw_extraction.vendors.retain(|v| !v.trim().is_empty());

    Ok(parsed)
}

fn clamp_confidence(confidence: f64) -> Result<f64> {
    if !confidence.is_finite() {
        return Err(Error::Schema(format!(
            "confidence is not a number: {}",
            confidence
        )));
    }
    Ok(confidence.clamp(0.0, 1.0))
}

fn positive_amount(amount: Option<f64>) -> Option<f64> {
    amount.filter(|a| a.is_finite() && *a > 0.0)
}

/// Malformed dates are schema errors; well-formed but implausible years are dropped
fn iso_date(date: Option<String>) -> Result<Option<String>> {
    let Some(date) = non_empty(date) else {
        return Ok(None);
    };
    let parsed = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| Error::Schema(format!("date is not YYYY-MM-DD: {}", date)))?
        .format("%Y-%m-%d")
        .to_string();
    Ok(is_valid_iso_date(&parsed).then_some(parsed))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("null"))
}

fn truncate(s: &str) -> String {
    if s.chars().count() > MAX_RAW_IN_ERROR {
        let cut: String = s.chars().take(MAX_RAW_IN_ERROR).collect();
        format!("{}...", cut)
    } else {
        s.to_string()
    }
}
