//! Deterministic post-processing of model answers.
//!
//! Model output is never trusted for the success flag or the confidence:
//! both are recomputed from which fields are actually present.

use tracing::debug;

use crate::ai::types::{EnhancedResponse, V2Response};
use crate::extract::{
    clean_vendor, detect_currency, detect_document_type, is_valid_iso_date, keyword_amount,
    most_recent, scan_fields,
};
use crate::models::{
    same_amount, DocumentType, ExtractionCandidate, ExtractionMethod, RawDocument, RawExtraction,
};

/// Confidence floor when amount and label are both present
pub const COMPLETE_FLOOR: f64 = 0.8;
/// Confidence ceiling otherwise
pub const PARTIAL_CEILING: f64 = 0.5;

/// Build a candidate from an enhanced response
pub fn enhanced_candidate(response: EnhancedResponse, doc: &RawDocument) -> ExtractionCandidate {
    let metadata = response.metadata;
    let vendor = metadata.vendor.map(normalize_vendor);
    let description = response.description.or_else(|| vendor.clone());

    let mut candidate = ExtractionCandidate {
        is_financial_document: response.is_ledger_entry,
        amount: response.amount,
        date: response.date.filter(|d| is_valid_iso_date(d)),
        vendor,
        description,
        invoice_number: metadata.invoice_number,
        payment_method: metadata.payment_method,
        currency: metadata
            .currency
            .map(|c| c.to_uppercase())
            .or_else(|| detect_currency(&doc.text)),
        document_type: Some(document_type(metadata.document_type.as_deref(), &doc.text)),
        confidence: response.confidence,
        method: ExtractionMethod::EnhancedAi,
        raw_extraction: RawExtraction::default(),
    };

    apply_keyword_override(&mut candidate, &doc.text);
    recompute_confidence(&mut candidate);
    candidate
}

/// Build a candidate from a V2 response, filling gaps from raw candidates
pub fn v2_candidate(response: V2Response, doc: &RawDocument) -> ExtractionCandidate {
    let model_raw = RawExtraction {
        amounts: response.raw_extraction.amounts,
        dates: response
            .raw_extraction
            .dates
            .into_iter()
            .filter(|d| is_valid_iso_date(d))
            .collect(),
        vendors: response
            .raw_extraction
            .vendors
            .iter()
            .filter_map(|v| clean_vendor(v))
            .collect(),
    };
    let mut raw = RawExtraction::default();
    raw.merge(&model_raw);
    raw.merge(&scan_fields(&doc.text, doc.filename.as_deref()).raw());

    // merge() keeps amounts sorted descending
    let amount = response.amount.or_else(|| raw.amounts.first().copied());
    let date = response
        .date
        .filter(|d| is_valid_iso_date(d))
        .or_else(|| most_recent(&raw.dates));
    let vendor = response
        .vendor
        .map(normalize_vendor)
        .or_else(|| raw.vendors.first().cloned());

    let mut candidate = ExtractionCandidate {
        is_financial_document: response.is_financial_document,
        amount,
        date,
        description: response.description.or_else(|| vendor.clone()),
        vendor,
        invoice_number: response.invoice_number,
        payment_method: response.payment_method,
        currency: response
            .currency
            .map(|c| c.to_uppercase())
            .or_else(|| detect_currency(&doc.text)),
        document_type: Some(document_type(response.document_type.as_deref(), &doc.text)),
        confidence: response.confidence,
        method: ExtractionMethod::V2Ai,
        raw_extraction: raw,
    };

    apply_keyword_override(&mut candidate, &doc.text);
    recompute_confidence(&mut candidate);
    candidate
}

/// When the text mentions "amount", the amount next to that keyword wins
/// over whatever the model picked
pub fn apply_keyword_override(candidate: &mut ExtractionCandidate, text: &str) {
    let Some(nearby) = keyword_amount(text) else {
        return;
    };
    match candidate.amount {
        Some(current) if same_amount(current, nearby) => {}
        previous => {
            debug!(?previous, nearby, "Keyword amount overrides model amount");
            candidate.amount = Some(nearby);
        }
    }
}

/// Recompute the success flag and clamp confidence by completeness
pub fn recompute_confidence(candidate: &mut ExtractionCandidate) {
    let complete = candidate.has_amount() && candidate.label().is_some();
    candidate.is_financial_document = complete;
    candidate.confidence = if complete {
        candidate.confidence.max(COMPLETE_FLOOR)
    } else {
        candidate.confidence.min(PARTIAL_CEILING)
    };
}

/// A declined answer that still carried an amount or a label
pub fn is_partial(candidate: &ExtractionCandidate) -> bool {
    !candidate.is_financial_document && (candidate.has_amount() || candidate.label().is_some())
}

/// Field names missing from a candidate, for the retry hint
pub fn missing_fields(candidate: &ExtractionCandidate) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if !candidate.has_amount() {
        missing.push("amount");
    }
    if candidate.label().is_none() {
        missing.push("description or vendor");
    }
    if candidate.date.is_none() {
        missing.push("date");
    }
    missing
}

fn normalize_vendor(vendor: String) -> String {
    clean_vendor(&vendor).unwrap_or(vendor)
}

fn document_type(reported: Option<&str>, text: &str) -> DocumentType {
    match reported.and_then(|t| t.parse::<DocumentType>().ok()) {
        Some(DocumentType::Unknown) | None => detect_document_type(text),
        Some(t) => t,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{EnhancedMetadata, ModelRawExtraction};

    fn enhanced(amount: Option<f64>, description: Option<&str>, confidence: f64) -> EnhancedResponse {
        EnhancedResponse {
            is_ledger_entry: true,
            amount,
            date: Some("2024-03-01".into()),
            description: description.map(str::to_string),
            confidence,
            metadata: EnhancedMetadata::default(),
        }
    }

    fn v2(amount: Option<f64>, vendor: Option<&str>) -> V2Response {
        V2Response {
            is_financial_document: true,
            amount,
            date: None,
            vendor: vendor.map(str::to_string),
            description: None,
            invoice_number: None,
            payment_method: None,
            currency: None,
            document_type: None,
            confidence: 0.9,
            raw_extraction: ModelRawExtraction::default(),
        }
    }

    #[test]
    fn test_keyword_override_beats_model() {
        let doc = RawDocument::new("Amount: $42.50\nTotal: $999.00");
        let candidate = enhanced_candidate(enhanced(Some(999.0), Some("Chairs"), 0.9), &doc);
        assert_eq!(candidate.amount, Some(42.50));
    }

    #[test]
    fn test_keyword_override_fills_missing_amount() {
        let doc = RawDocument::new("Amount due: 18.00");
        let candidate = enhanced_candidate(enhanced(None, Some("Water bill"), 0.4), &doc);
        assert_eq!(candidate.amount, Some(18.00));
        assert!(candidate.is_financial_document);
    }

    #[test]
    fn test_no_keyword_keeps_model_amount() {
        let doc = RawDocument::new("Total: $999.00");
        let candidate = enhanced_candidate(enhanced(Some(999.0), Some("Desk"), 0.9), &doc);
        assert_eq!(candidate.amount, Some(999.0));
    }

    #[test]
    fn test_complete_raises_confidence() {
        let doc = RawDocument::new("Desk 12.00");
        let candidate = enhanced_candidate(enhanced(Some(12.0), Some("Desk"), 0.3), &doc);
        assert!(candidate.is_financial_document);
        assert_eq!(candidate.confidence, COMPLETE_FLOOR);
    }

    #[test]
    fn test_partial_caps_confidence_and_flag() {
        let doc = RawDocument::new("something");
        let candidate = enhanced_candidate(enhanced(Some(12.0), None, 0.95), &doc);
        assert!(!candidate.is_financial_document);
        assert_eq!(candidate.confidence, PARTIAL_CEILING);
        assert!(is_partial(&candidate));
        assert_eq!(missing_fields(&candidate), vec!["description or vendor"]);
    }

    #[test]
    fn test_enhanced_description_from_vendor() {
        let doc = RawDocument::new("x");
        let mut response = enhanced(Some(5.0), None, 0.9);
        response.metadata.vendor = Some("Twitter, Inc.".into());
        let candidate = enhanced_candidate(response, &doc);
        assert_eq!(candidate.vendor.as_deref(), Some("X"));
        assert_eq!(candidate.description.as_deref(), Some("X"));
        assert!(candidate.is_financial_document);
    }

    #[test]
    fn test_v2_fills_from_raw_candidates() {
        let doc = RawDocument::new("Globex Corporation\nIssued 2024-01-02\nTotal 30.00");
        let mut response = v2(None, None);
        response.raw_extraction = ModelRawExtraction {
            amounts: vec![12.0, 45.0],
            dates: vec!["2024-02-10".into()],
            vendors: vec!["Amazon.com".into()],
        };
        let candidate = v2_candidate(response, &doc);
        assert_eq!(candidate.amount, Some(45.0));
        assert_eq!(candidate.date.as_deref(), Some("2024-02-10"));
        assert_eq!(candidate.vendor.as_deref(), Some("Amazon"));
        assert_eq!(candidate.raw_extraction.amounts, vec![45.0, 30.0, 12.0]);
        assert!(candidate.raw_extraction.vendors.contains(&"Globex".to_string()));
        assert!(candidate.is_financial_document);
    }

    #[test]
    fn test_v2_ignores_implausible_years() {
        let doc = RawDocument::new("Acme Supplies\nTotal 30.00\nIssued 2023-06-01");
        let mut response = v2(None, None);
        response.date = Some("2099-01-01".into());
        response.raw_extraction.dates = vec!["2099-01-01".into(), "1899-05-05".into()];
        let candidate = v2_candidate(response, &doc);
        assert_eq!(candidate.date.as_deref(), Some("2023-06-01"));
        assert_eq!(candidate.raw_extraction.dates, vec!["2023-06-01"]);
    }

    #[test]
    fn test_v2_keeps_model_fields() {
        let doc = RawDocument::new("Initech\nTotal 80.00");
        let candidate = v2_candidate(v2(Some(80.0), Some("Initech LLC")), &doc);
        assert_eq!(candidate.vendor.as_deref(), Some("Initech"));
        assert_eq!(candidate.description.as_deref(), Some("Initech"));
        assert_eq!(candidate.method, ExtractionMethod::V2Ai);
    }

    #[test]
    fn test_document_type_falls_back_to_keywords() {
        assert_eq!(document_type(Some("invoice"), "receipt"), DocumentType::Invoice);
        assert_eq!(document_type(Some("bogus"), "Your receipt"), DocumentType::Receipt);
        assert_eq!(document_type(None, "statement"), DocumentType::Statement);
    }
}
