//! Domain models for Sift

use serde::{Deserialize, Serialize};

/// Hint prefix that names the issuing platform (e.g. `platform:stripe`)
pub const PLATFORM_HINT_PREFIX: &str = "platform:";

/// Decoded text of one uploaded document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawDocument {
    pub text: String,
    pub filename: Option<String>,
    /// Free-form document-type hints supplied by the caller
    pub hints: Vec<String>,
}

impl RawDocument {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            filename: None,
            hints: Vec::new(),
        }
    }

    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_hints<I, S>(mut self, hints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hints = hints.into_iter().map(Into::into).collect();
        self
    }

    /// Platform named by a `platform:<name>` hint, if any
    pub fn platform(&self) -> Option<&str> {
        self.hints.iter().find_map(|h| {
            let rest = h.trim().strip_prefix(PLATFORM_HINT_PREFIX)?.trim();
            (!rest.is_empty()).then_some(rest)
        })
    }

    /// Whether the caller supplied a filename or any hints
    pub fn has_context(&self) -> bool {
        self.filename.as_deref().is_some_and(|f| !f.trim().is_empty())
            || self.hints.iter().any(|h| !h.trim().is_empty())
    }
}

/// Coarse document classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Invoice,
    Receipt,
    Statement,
    Confirmation,
    Subscription,
    Unknown,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
            Self::Statement => "statement",
            Self::Confirmation => "confirmation",
            Self::Subscription => "subscription",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for DocumentType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "invoice" | "bill" => Ok(Self::Invoice),
            "receipt" => Ok(Self::Receipt),
            "statement" | "bank_statement" => Ok(Self::Statement),
            "confirmation" | "payment_confirmation" => Ok(Self::Confirmation),
            "subscription" => Ok(Self::Subscription),
            "unknown" | "other" | "" => Ok(Self::Unknown),
            _ => Err(format!("Unknown document type: {}", s)),
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which extractor path produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Enhanced extractor, model response
    EnhancedAi,
    /// Enhanced extractor, local fallback parser
    EnhancedFallback,
    /// V2 extractor, model response
    V2Ai,
    /// V2 extractor, local fallback parser
    V2Fallback,
    /// Direct regex pass over the raw text
    Aggressive,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EnhancedAi => "enhanced_ai",
            Self::EnhancedFallback => "enhanced_fallback",
            Self::V2Ai => "v2_ai",
            Self::V2Fallback => "v2_fallback",
            Self::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Every amount, date and vendor candidate seen in a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExtraction {
    /// Deduplicated, sorted descending
    pub amounts: Vec<f64>,
    /// ISO dates in scan order
    pub dates: Vec<String>,
    /// Cleaned vendor names in scan order
    pub vendors: Vec<String>,
}

impl RawExtraction {
    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty() && self.dates.is_empty() && self.vendors.is_empty()
    }

    /// Merge another extraction into this one, keeping ordering rules
    pub fn merge(&mut self, other: &RawExtraction) {
        for amount in &other.amounts {
            if !self.amounts.iter().any(|a| same_amount(*a, *amount)) {
                self.amounts.push(*amount);
            }
        }
        self.amounts.sort_by(|a, b| b.total_cmp(a));

        for date in &other.dates {
            if !self.dates.contains(date) {
                self.dates.push(date.clone());
            }
        }
        for vendor in &other.vendors {
            if !self.vendors.iter().any(|v| v.eq_ignore_ascii_case(vendor)) {
                self.vendors.push(vendor.clone());
            }
        }
    }
}

/// Amounts are compared to the cent
pub fn same_amount(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

/// One extractor's opinion about a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionCandidate {
    pub is_financial_document: bool,
    pub amount: Option<f64>,
    pub date: Option<String>,
    pub vendor: Option<String>,
    pub description: Option<String>,
    pub invoice_number: Option<String>,
    pub payment_method: Option<String>,
    pub currency: Option<String>,
    pub document_type: Option<DocumentType>,
    pub confidence: f64,
    pub method: ExtractionMethod,
    pub raw_extraction: RawExtraction,
}

impl ExtractionCandidate {
    /// Empty candidate for the given method
    pub fn empty(method: ExtractionMethod) -> Self {
        Self {
            is_financial_document: false,
            amount: None,
            date: None,
            vendor: None,
            description: None,
            invoice_number: None,
            payment_method: None,
            currency: None,
            document_type: None,
            confidence: 0.0,
            method,
            raw_extraction: RawExtraction::default(),
        }
    }

    pub fn has_amount(&self) -> bool {
        self.amount.is_some_and(|a| a.is_finite() && a > 0.0)
    }

    pub fn has_vendor(&self) -> bool {
        non_blank(self.vendor.as_deref())
    }

    pub fn has_description(&self) -> bool {
        non_blank(self.description.as_deref())
    }

    /// Description, falling back to vendor
    pub fn label(&self) -> Option<&str> {
        [self.description.as_deref(), self.vendor.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

fn non_blank(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Transaction data of a successful parse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTransaction {
    /// Always positive
    pub amount: f64,
    /// ISO `YYYY-MM-DD`
    pub date: String,
    /// Never empty
    pub description: String,
    pub vendor: Option<String>,
    pub invoice_number: Option<String>,
    pub currency: Option<String>,
    pub document_type: Option<DocumentType>,
}

/// Final decision of the strategy orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsingResult {
    pub success: bool,
    pub data: Option<ParsedTransaction>,
    pub confidence: f64,
    /// Winning strategy, or "none"
    pub method: String,
    /// Strategies actually tried
    pub attempts: u32,
    pub errors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_extractions: Option<RawExtraction>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_hint() {
        let doc = RawDocument::new("text").with_hints(["receipt", "platform: Stripe "]);
        assert_eq!(doc.platform(), Some("Stripe"));

        let doc = RawDocument::new("text").with_hints(["platform:"]);
        assert_eq!(doc.platform(), None);
    }

    #[test]
    fn test_has_context() {
        assert!(!RawDocument::new("t").has_context());
        assert!(!RawDocument::new("t").with_filename("  ").has_context());
        assert!(RawDocument::new("t").with_filename("a.pdf").has_context());
        assert!(RawDocument::new("t").with_hints(["invoice"]).has_context());
    }

    #[test]
    fn test_document_type_parse() {
        assert_eq!("Invoice".parse::<DocumentType>(), Ok(DocumentType::Invoice));
        assert_eq!("other".parse::<DocumentType>(), Ok(DocumentType::Unknown));
        assert!("spreadsheet".parse::<DocumentType>().is_err());
    }

    #[test]
    fn test_candidate_label_prefers_description() {
        let mut c = ExtractionCandidate::empty(ExtractionMethod::V2Ai);
        assert_eq!(c.label(), None);
        c.vendor = Some("Acme".into());
        assert_eq!(c.label(), Some("Acme"));
        c.description = Some("Office chairs".into());
        assert_eq!(c.label(), Some("Office chairs"));
        c.description = Some("   ".into());
        assert_eq!(c.label(), Some("Acme"));
    }

    #[test]
    fn test_has_amount_rejects_non_positive() {
        let mut c = ExtractionCandidate::empty(ExtractionMethod::Aggressive);
        c.amount = Some(0.0);
        assert!(!c.has_amount());
        c.amount = Some(-3.0);
        assert!(!c.has_amount());
        c.amount = Some(f64::NAN);
        assert!(!c.has_amount());
        c.amount = Some(0.01);
        assert!(c.has_amount());
    }

    #[test]
    fn test_raw_extraction_merge() {
        let mut a = RawExtraction {
            amounts: vec![10.0, 5.0],
            dates: vec!["2024-01-01".into()],
            vendors: vec!["Acme".into()],
        };
        let b = RawExtraction {
            amounts: vec![20.0, 5.001],
            dates: vec!["2024-01-01".into(), "2024-02-01".into()],
            vendors: vec!["ACME".into(), "Globex".into()],
        };
        a.merge(&b);
        assert_eq!(a.amounts, vec![20.0, 10.0, 5.0]);
        assert_eq!(a.dates, vec!["2024-01-01", "2024-02-01"]);
        assert_eq!(a.vendors, vec!["Acme", "Globex"]);
    }

    #[test]
    fn test_parsing_result_serializes_camel_case() {
        let result = ParsingResult {
            success: false,
            data: None,
            confidence: 0.0,
            method: "none".into(),
            attempts: 2,
            errors: vec!["pattern: missing amount".into()],
            raw_extractions: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["attempts"], 2);
        assert!(json.get("rawExtractions").is_none());
        assert_eq!(json["errors"][0], "pattern: missing amount");
    }
}
