//! Strategy orchestrator
//!
//! [`ReceiptParsingStrategy`] turns raw document text into a
//! [`ParsingResult`] by trying strategies in a fixed order and stopping at
//! the first success:
//!
//! 1. `ai`: enhanced extractor (only with a backend and `use_ai`)
//! 2. `pattern`: V2 extractor (backend if configured, local fallback otherwise)
//! 3. `contextual`: pattern again over text annotated with filename and hints
//! 4. `aggressive`: regex extractors straight over the raw text
//!
//! Parsing never fails. A failed strategy adds a `"<strategy>: <reason>"`
//! line to `errors` and the next one runs. Skipped strategies are not
//! counted in `attempts`.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ai::AIClient;
use crate::extract::{
    detect_currency, detect_document_type, detect_invoice_number, scan_fields, today,
};
use crate::extractor::{ExtractorVariant, LlmExtractor, MAX_ATTEMPTS_CAP};
use crate::model_router::ModelRouter;
use crate::models::{
    ExtractionCandidate, ExtractionMethod, ParsedTransaction, ParsingResult, RawDocument,
};
use crate::prompts::PromptLibrary;

/// Vendor reported by the aggressive strategy when none was found
pub const UNKNOWN_VENDOR: &str = "Unknown Vendor";

/// Failure reason when the aggressive pass finds nothing usable
pub const NO_FINANCIAL_DATA: &str = "No financial data found";

/// Aggressive confidence with amount and vendor
const AGGRESSIVE_CONFIDENCE: f64 = 0.5;
/// Aggressive confidence when only the amount was found
const AGGRESSIVE_PARTIAL_CONFIDENCE: f64 = 0.3;

/// Strategy names as reported in `method` and `errors`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Ai,
    Pattern,
    Contextual,
    Aggressive,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ai => "ai",
            Self::Pattern => "pattern",
            Self::Contextual => "contextual",
            Self::Aggressive => "aggressive",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-call parse options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    pub filename: Option<String>,
    /// Allow the `ai` strategy when a backend is configured
    pub use_ai: bool,
    /// Model attempt budget for the `ai` strategy, capped at 3
    pub max_retries: u32,
    /// Let the aggressive strategy succeed on an amount alone
    pub accept_partial_data: bool,
    pub document_hints: Vec<String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            filename: None,
            use_ai: true,
            max_retries: MAX_ATTEMPTS_CAP,
            accept_partial_data: false,
            document_hints: Vec::new(),
        }
    }
}

impl ParseOptions {
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.document_hints.push(hint.into());
        self
    }

    pub fn without_ai(mut self) -> Self {
        self.use_ai = false;
        self
    }

    pub fn accepting_partial_data(mut self) -> Self {
        self.accept_partial_data = true;
        self
    }
}

/// Result of one strategy run
enum StrategyOutcome {
    Success(ExtractionCandidate),
    Failure(String),
}

/// Multi-strategy document parser
///
/// Holds only immutable, shared configuration; one instance can serve
/// concurrent parses.
#[derive(Clone)]
pub struct ReceiptParsingStrategy {
    ai: Option<AIClient>,
    prompts: Arc<PromptLibrary>,
    router: Arc<ModelRouter>,
}

impl ReceiptParsingStrategy {
    pub fn new(ai: Option<AIClient>, prompts: PromptLibrary, router: ModelRouter) -> Self {
        Self {
            ai,
            prompts: Arc::new(prompts),
            router: Arc::new(router),
        }
    }

    /// Backend from the environment, prompts and router from their default locations
    pub fn from_env() -> Self {
        Self::new(
            AIClient::from_env(),
            PromptLibrary::new(),
            ModelRouter::default(),
        )
    }

    /// Regex-only parser with embedded prompts and config
    pub fn local() -> Self {
        Self::new(
            None,
            PromptLibrary::embedded_only(),
            ModelRouter::embedded().unwrap_or_default(),
        )
    }

    pub fn with_ai(mut self, ai: AIClient) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn ai(&self) -> Option<&AIClient> {
        self.ai.as_ref()
    }

    /// Parse one document. Never fails: `success = false` plus `errors`
    /// is the failure signal.
    pub async fn parse(&self, text: &str, options: &ParseOptions) -> ParsingResult {
        let doc = RawDocument {
            text: text.to_string(),
            filename: options.filename.clone(),
            hints: options.document_hints.clone(),
        };

        let mut plan = Vec::with_capacity(4);
        if self.ai.is_some() && options.use_ai {
            plan.push(StrategyKind::Ai);
        }
        plan.push(StrategyKind::Pattern);
        if doc.has_context() {
            plan.push(StrategyKind::Contextual);
        }
        plan.push(StrategyKind::Aggressive);

        let mut errors = Vec::new();
        let mut attempts = 0;

        for strategy in plan {
            attempts += 1;
            let (outcome, strategy_errors) = self.run(strategy, &doc, options).await;

            match outcome {
                StrategyOutcome::Success(candidate) => match into_transaction(&candidate) {
                    Some(data) => {
                        info!(
                            strategy = %strategy,
                            method = %candidate.method,
                            amount = data.amount,
                            confidence = candidate.confidence,
                            attempts,
                            "Document parsed"
                        );
                        errors.extend(strategy_errors);
                        let raw = candidate.raw_extraction;
                        return ParsingResult {
                            success: true,
                            data: Some(data),
                            confidence: candidate.confidence,
                            method: strategy.to_string(),
                            attempts,
                            errors,
                            raw_extractions: (!raw.is_empty()).then_some(raw),
                        };
                    }
                    None => {
                        warn!(strategy = %strategy, "Candidate failed final validation");
                        errors.extend(strategy_errors);
                        errors.push(format!("{}: invalid amount or description", strategy));
                    }
                },
                StrategyOutcome::Failure(reason) => {
                    debug!(strategy = %strategy, reason = %reason, "Strategy declined");
                    errors.extend(strategy_errors);
                    errors.push(format!("{}: {}", strategy, reason));
                }
            }
        }

        warn!(attempts, errors = errors.len(), "No strategy produced a transaction");
        ParsingResult {
            success: false,
            data: None,
            confidence: 0.0,
            method: "none".to_string(),
            attempts,
            errors,
            raw_extractions: None,
        }
    }

    async fn run(
        &self,
        strategy: StrategyKind,
        doc: &RawDocument,
        options: &ParseOptions,
    ) -> (StrategyOutcome, Vec<String>) {
        match strategy {
            StrategyKind::Ai => {
                let extractor = self
                    .extractor(ExtractorVariant::Enhanced)
                    .with_max_attempts(options.max_retries);
                let outcome = extractor.extract(doc).await;
                (ai_outcome(outcome.candidate), prefixed(strategy, outcome.errors))
            }
            StrategyKind::Pattern => {
                let outcome = self.extractor(ExtractorVariant::V2).extract(doc).await;
                (pattern_outcome(outcome.candidate), prefixed(strategy, outcome.errors))
            }
            StrategyKind::Contextual => {
                let annotated = RawDocument {
                    text: annotate(doc),
                    ..doc.clone()
                };
                let outcome = self.extractor(ExtractorVariant::V2).extract(&annotated).await;
                (pattern_outcome(outcome.candidate), prefixed(strategy, outcome.errors))
            }
            StrategyKind::Aggressive => (
                aggressive_outcome(aggressive(doc), options.accept_partial_data),
                Vec::new(),
            ),
        }
    }

    fn extractor(&self, variant: ExtractorVariant) -> LlmExtractor {
        LlmExtractor::new(
            variant,
            self.ai.clone(),
            Arc::clone(&self.prompts),
            Arc::clone(&self.router),
        )
    }
}

fn prefixed(strategy: StrategyKind, errors: Vec<String>) -> Vec<String> {
    errors
        .into_iter()
        .map(|e| format!("{}: {}", strategy, e))
        .collect()
}

fn ai_outcome(candidate: ExtractionCandidate) -> StrategyOutcome {
    if !candidate.is_financial_document {
        StrategyOutcome::Failure("not a ledger entry".into())
    } else if !candidate.has_amount() {
        StrategyOutcome::Failure("missing amount".into())
    } else if !candidate.has_description() {
        StrategyOutcome::Failure("missing description".into())
    } else {
        StrategyOutcome::Success(candidate)
    }
}

fn pattern_outcome(candidate: ExtractionCandidate) -> StrategyOutcome {
    if !candidate.is_financial_document {
        StrategyOutcome::Failure("not a financial document".into())
    } else if !candidate.has_amount() {
        StrategyOutcome::Failure("missing amount".into())
    } else if !candidate.has_vendor() {
        StrategyOutcome::Failure("missing vendor".into())
    } else {
        StrategyOutcome::Success(candidate)
    }
}

fn aggressive_outcome(candidate: ExtractionCandidate, accept_partial: bool) -> StrategyOutcome {
    let found_vendor = candidate.vendor.as_deref() != Some(UNKNOWN_VENDOR);
    if candidate.has_amount() && (found_vendor || accept_partial) {
        StrategyOutcome::Success(candidate)
    } else {
        StrategyOutcome::Failure(NO_FINANCIAL_DATA.into())
    }
}

/// Prefix the text with filename and hint lines
fn annotate(doc: &RawDocument) -> String {
    let mut text = String::new();
    if let Some(filename) = doc.filename.as_deref().filter(|f| !f.trim().is_empty()) {
        text.push_str(&format!("Filename: {}\n", filename.trim()));
    }
    let hints: Vec<&str> = doc
        .hints
        .iter()
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
        .collect();
    if !hints.is_empty() {
        text.push_str(&format!("Document hints: {}\n", hints.join(", ")));
    }
    text.push('\n');
    text.push_str(&doc.text);
    text
}

/// Largest amount, first date (or today), first vendor (or "Unknown Vendor")
fn aggressive(doc: &RawDocument) -> ExtractionCandidate {
    let scan = scan_fields(&doc.text, doc.filename.as_deref());
    let amount = scan.amounts.largest();
    let found_vendor = scan.vendors.first().cloned();
    let confidence = if amount.is_some() && found_vendor.is_some() {
        AGGRESSIVE_CONFIDENCE
    } else {
        AGGRESSIVE_PARTIAL_CONFIDENCE
    };
    let vendor = found_vendor.unwrap_or_else(|| UNKNOWN_VENDOR.to_string());

    ExtractionCandidate {
        is_financial_document: amount.is_some(),
        amount,
        date: Some(scan.dates.first().cloned().unwrap_or_else(today)),
        description: Some(vendor.clone()),
        vendor: Some(vendor),
        invoice_number: detect_invoice_number(&doc.text),
        payment_method: None,
        currency: detect_currency(&doc.text),
        document_type: Some(detect_document_type(&doc.text)),
        confidence,
        method: ExtractionMethod::Aggressive,
        raw_extraction: scan.raw(),
    }
}

/// Final validation: positive amount and a non-empty description
fn into_transaction(candidate: &ExtractionCandidate) -> Option<ParsedTransaction> {
    if !candidate.has_amount() {
        return None;
    }
    let amount = candidate.amount?;
    let description = candidate.label()?.to_string();
    let date = candidate.date.clone().unwrap_or_else(today);

    Some(ParsedTransaction {
        amount,
        date,
        description,
        vendor: candidate.vendor.clone(),
        invoice_number: candidate.invoice_number.clone(),
        currency: candidate.currency.clone(),
        document_type: candidate.document_type,
    })
}
