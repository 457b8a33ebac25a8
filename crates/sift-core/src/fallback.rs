//! Local fallback parser
//!
//! Builds an extraction candidate from the regex field extractors alone,
//! with no network dependency. Used when no AI backend is configured, when
//! the model call fails, or when retries are exhausted.

use tracing::debug;

use crate::extract::{
    detect_currency, detect_document_type, detect_invoice_number, detect_payment_method,
    scan_fields, today,
};
use crate::models::{ExtractionCandidate, ExtractionMethod, RawDocument};

/// Confidence when both amount and vendor were found
pub const COMPLETE_CONFIDENCE: f64 = 0.7;
/// Confidence when either is missing
pub const PARTIAL_CONFIDENCE: f64 = 0.3;

/// How the fallback picks one amount out of many
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountPolicy {
    /// First match of the highest-priority pattern tier
    Priority,
    /// Largest value found anywhere in the text
    Largest,
}

/// Regex-only candidate builder
#[derive(Debug, Clone, Copy)]
pub struct LocalFallbackParser {
    policy: AmountPolicy,
    method: ExtractionMethod,
}

impl LocalFallbackParser {
    pub fn new(policy: AmountPolicy, method: ExtractionMethod) -> Self {
        Self { policy, method }
    }

    pub fn parse(&self, doc: &RawDocument) -> ExtractionCandidate {
        let scan = scan_fields(&doc.text, doc.filename.as_deref());

        let amount = match self.policy {
            AmountPolicy::Priority => scan.amounts.leading().map(|m| m.value),
            AmountPolicy::Largest => scan.amounts.largest(),
        };
        let vendor = scan.vendors.first().cloned();
        let date = scan.dates.first().cloned().unwrap_or_else(today);

        let complete = amount.is_some() && vendor.is_some();
        let confidence = if complete {
            COMPLETE_CONFIDENCE
        } else {
            PARTIAL_CONFIDENCE
        };

        debug!(
            method = %self.method,
            ?amount,
            ?vendor,
            confidence,
            "Local fallback extraction"
        );

        ExtractionCandidate {
            is_financial_document: complete,
            amount,
            date: Some(date),
            description: vendor.clone(),
            vendor,
            invoice_number: detect_invoice_number(&doc.text),
            payment_method: detect_payment_method(&doc.text),
            currency: detect_currency(&doc.text),
            document_type: Some(detect_document_type(&doc.text)),
            confidence,
            method: self.method,
            raw_extraction: scan.raw(),
        }
    }
}
