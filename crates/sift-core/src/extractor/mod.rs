//! LLM-backed extractors
//!
//! One [`LlmExtractor`] covers both extractor variants. The variant is data:
//! which prompts it uses, which response schema it expects, whether it
//! retries, and which local fallback tie-break policy applies.
//!
//! Flow for one document:
//! 1. No backend configured → local fallback parser.
//! 2. Build the request (prompt, model for this attempt, seed = attempt).
//! 3. Parse and validate the JSON answer, then post-process it.
//! 4. Enhanced only: a partial answer is retried with an in-context example
//!    and a hint listing the missing fields, up to the attempt cap.
//! 5. Transport or schema errors, or an exhausted cap → local fallback.

pub mod postprocess;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::ai::parsing::{parse_enhanced_response, parse_v2_response};
use crate::ai::{AIBackend, AIClient, ChatMessage, CompletionRequest};
use crate::error::Result;
use crate::fallback::{AmountPolicy, LocalFallbackParser};
use crate::model_router::ModelRouter;
use crate::models::{ExtractionCandidate, ExtractionMethod, RawDocument};
use crate::prompts::{PromptId, PromptLibrary};

use postprocess::{enhanced_candidate, is_partial, missing_fields, v2_candidate};

/// Hard upper bound on model attempts per document
pub const MAX_ATTEMPTS_CAP: u32 = 3;

/// Texts shorter than this use the minimal prompt
pub const MINIMAL_TEXT_CHARS: usize = 500;

/// Document text beyond this is not sent to the model
pub const MAX_PROMPT_CHARS: usize = 12_000;

const EXAMPLE_DOCUMENT: &str = "Document:\nStripe\nPayment received\nAmount: $19.00\nPlan: Team (monthly)";

/// Which extractor configuration to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractorVariant {
    /// Ledger-entry prompts with retry; priority tie-break in fallback
    Enhanced,
    /// Raw-candidate prompt, single attempt; largest-value tie-break in fallback
    V2,
}

impl ExtractorVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enhanced => "enhanced",
            Self::V2 => "v2",
        }
    }

    /// Prompt for a document
    pub fn prompt_for(&self, doc: &RawDocument) -> PromptId {
        match self {
            Self::Enhanced if doc.text.chars().count() < MINIMAL_TEXT_CHARS => {
                PromptId::ExtractMinimal
            }
            Self::Enhanced if doc.platform().is_some() => PromptId::ExtractPlatform,
            Self::Enhanced => PromptId::ExtractGeneral,
            Self::V2 => PromptId::ExtractFinancial,
        }
    }

    /// Local parser used when the model path is unavailable or fails
    pub fn fallback(&self) -> LocalFallbackParser {
        match self {
            Self::Enhanced => {
                LocalFallbackParser::new(AmountPolicy::Priority, ExtractionMethod::EnhancedFallback)
            }
            Self::V2 => LocalFallbackParser::new(AmountPolicy::Largest, ExtractionMethod::V2Fallback),
        }
    }

    /// Whether partial answers are retried
    pub fn retries_partial(&self) -> bool {
        matches!(self, Self::Enhanced)
    }
}

impl FromStr for ExtractorVariant {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "enhanced" => Ok(Self::Enhanced),
            "v2" => Ok(Self::V2),
            _ => Err(format!("Unknown extractor variant: {}", s)),
        }
    }
}

impl std::fmt::Display for ExtractorVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Candidate plus the failures caught on the way to it
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub candidate: ExtractionCandidate,
    /// Caught model failures, already formatted for diagnostics
    pub errors: Vec<String>,
    /// Model calls made
    pub model_calls: u32,
}

/// Extractor over an optional AI backend
#[derive(Clone)]
pub struct LlmExtractor {
    variant: ExtractorVariant,
    ai: Option<AIClient>,
    prompts: Arc<PromptLibrary>,
    router: Arc<ModelRouter>,
    max_attempts: u32,
}

impl LlmExtractor {
    pub fn new(
        variant: ExtractorVariant,
        ai: Option<AIClient>,
        prompts: Arc<PromptLibrary>,
        router: Arc<ModelRouter>,
    ) -> Self {
        Self {
            variant,
            ai,
            prompts,
            router,
            max_attempts: MAX_ATTEMPTS_CAP,
        }
    }

    /// Set the attempt budget; clamped to `1..=MAX_ATTEMPTS_CAP`
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.clamp(1, MAX_ATTEMPTS_CAP);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Extract one candidate. Never fails; failures land in `errors`.
    pub async fn extract(&self, doc: &RawDocument) -> ExtractionOutcome {
        let fallback = self.variant.fallback();
        let Some(ai) = self.ai.as_ref() else {
            debug!(variant = %self.variant, "No AI backend, using local fallback");
            return ExtractionOutcome {
                candidate: fallback.parse(doc),
                errors: Vec::new(),
                model_calls: 0,
            };
        };

        let attempts = if self.variant.retries_partial() {
            self.max_attempts
        } else {
            1
        };
        let mut errors = Vec::new();
        let mut missing: Vec<&'static str> = Vec::new();
        let mut model_calls = 0;

        for attempt in 1..=attempts {
            model_calls += 1;
            match self.attempt(ai, doc, attempt, &missing).await {
                Ok(candidate) => {
                    if !self.variant.retries_partial() || !is_partial(&candidate) {
                        info!(
                            variant = %self.variant,
                            attempt,
                            financial = candidate.is_financial_document,
                            confidence = candidate.confidence,
                            "Model extraction complete"
                        );
                        return ExtractionOutcome {
                            candidate,
                            errors,
                            model_calls,
                        };
                    }
                    missing = missing_fields(&candidate);
                    debug!(
                        variant = %self.variant,
                        attempt,
                        ?missing,
                        "Partial model answer"
                    );
                }
                Err(e) => {
                    warn!(
                        variant = %self.variant,
                        attempt,
                        error = %e,
                        "Model extraction failed, using local fallback"
                    );
                    errors.push(format!("{} model call failed: {}", self.variant, e));
                    return ExtractionOutcome {
                        candidate: fallback.parse(doc),
                        errors,
                        model_calls,
                    };
                }
            }
        }

        warn!(
            variant = %self.variant,
            attempts,
            "Model answers stayed partial, using local fallback"
        );
        errors.push(format!(
            "{} model returned partial data after {} attempts",
            self.variant, attempts
        ));
        ExtractionOutcome {
            candidate: fallback.parse(doc),
            errors,
            model_calls,
        }
    }

    async fn attempt(
        &self,
        ai: &AIClient,
        doc: &RawDocument,
        attempt: u32,
        missing: &[&str],
    ) -> Result<ExtractionCandidate> {
        let request = self.build_request(doc, attempt, missing)?;
        debug!(
            variant = %self.variant,
            attempt,
            model = request.model.as_deref().unwrap_or(ai.model()),
            "Requesting extraction"
        );
        let content = ai.complete(&request).await?;
        debug!(variant = %self.variant, attempt, "Raw model response: {}", content);

        match self.variant {
            ExtractorVariant::Enhanced => {
                parse_enhanced_response(&content).map(|r| enhanced_candidate(r, doc))
            }
            ExtractorVariant::V2 => parse_v2_response(&content).map(|r| v2_candidate(r, doc)),
        }
    }

    /// Build the completion request for one attempt
    pub fn build_request(
        &self,
        doc: &RawDocument,
        attempt: u32,
        missing: &[&str],
    ) -> Result<CompletionRequest> {
        let prompt = self.prompts.get(self.variant.prompt_for(doc))?;

        let hints = doc.hints.join(", ");
        let missing = missing.join(", ");
        let mut vars: HashMap<&str, &str> = HashMap::new();
        vars.insert("text", truncate_chars(&doc.text, MAX_PROMPT_CHARS));
        vars.insert("filename", doc.filename.as_deref().unwrap_or(""));
        vars.insert("hints", &hints);
        vars.insert("platform", doc.platform().unwrap_or(""));
        vars.insert("missing", &missing);

        let mut messages = Vec::new();
        if let Some(system) = prompt.system_section() {
            messages.push(ChatMessage::system(system));
        }
        if attempt > 1 {
            messages.push(ChatMessage::user(EXAMPLE_DOCUMENT));
            messages.push(ChatMessage::assistant(example_answer()));
        }
        messages.push(ChatMessage::user(prompt.render_user(&vars)));

        Ok(CompletionRequest::new(messages)
            .with_model(self.router.model_for_attempt(self.variant, attempt))
            .with_temperature(prompt.metadata.temperature)
            .with_seed(i64::from(attempt))
            .with_max_tokens(self.router.max_tokens_for(self.variant))
            .with_timeout(self.router.timeout_for(self.variant)))
    }
}

/// Answer for [`EXAMPLE_DOCUMENT`]: a sparse document is still a ledger entry
fn example_answer() -> String {
    json!({
        "isLedgerEntry": true,
        "amount": 19.00,
        "date": null,
        "description": "Stripe Team plan (monthly)",
        "confidence": 0.85,
        "metadata": {
            "vendor": "Stripe",
            "invoiceNumber": null,
            "paymentMethod": null,
            "currency": "USD",
            "documentType": "receipt"
        }
    })
    .to_string()
}

fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{MockBackend, MockResponse, Role};

    const LONG_PAD: &str = "Line item description for a long invoice body.\n";

    fn extractor(variant: ExtractorVariant, mock: &MockBackend) -> LlmExtractor {
        LlmExtractor::new(
            variant,
            Some(AIClient::Mock(mock.clone())),
            Arc::new(PromptLibrary::embedded_only()),
            Arc::new(ModelRouter::embedded().unwrap()),
        )
    }

    fn long_text(body: &str) -> String {
        let mut text = body.to_string();
        while text.chars().count() < MINIMAL_TEXT_CHARS {
            text.push_str(LONG_PAD);
        }
        text
    }

    #[test]
    fn test_prompt_selection() {
        let short = RawDocument::new("Acme $5.00");
        assert_eq!(
            ExtractorVariant::Enhanced.prompt_for(&short),
            PromptId::ExtractMinimal
        );

        let long = RawDocument::new(long_text("Acme"));
        assert_eq!(
            ExtractorVariant::Enhanced.prompt_for(&long),
            PromptId::ExtractGeneral
        );

        let platform = RawDocument::new(long_text("Acme")).with_hints(["platform:stripe"]);
        assert_eq!(
            ExtractorVariant::Enhanced.prompt_for(&platform),
            PromptId::ExtractPlatform
        );
        assert_eq!(
            ExtractorVariant::V2.prompt_for(&short),
            PromptId::ExtractFinancial
        );
    }

    #[test]
    fn test_variant_from_str() {
        assert_eq!("V2".parse::<ExtractorVariant>(), Ok(ExtractorVariant::V2));
        assert_eq!(
            "enhanced".parse::<ExtractorVariant>(),
            Ok(ExtractorVariant::Enhanced)
        );
        assert!("legacy".parse::<ExtractorVariant>().is_err());
    }

    #[test]
    fn test_build_request_first_attempt() {
        let mock = MockBackend::new();
        let ex = extractor(ExtractorVariant::Enhanced, &mock);
        let doc = RawDocument::new("Acme $5.00").with_filename("acme.pdf");
        let request = ex.build_request(&doc, 1, &[]).unwrap();

        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.seed, Some(1));
        assert!((request.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        let user = request.last_user_message().unwrap();
        assert!(user.contains("Acme $5.00"));
        assert!(user.contains("Filename: acme.pdf"));
        assert!(!user.contains("previous answer"));
    }

    #[test]
    fn test_build_request_retry_adds_example() {
        let mock = MockBackend::new();
        let ex = extractor(ExtractorVariant::Enhanced, &mock);
        let doc = RawDocument::new("Acme $5.00");
        let request = ex.build_request(&doc, 2, &["date"]).unwrap();

        assert_eq!(request.model.as_deref(), Some("gpt-4o"));
        assert_eq!(request.seed, Some(2));
        assert_eq!(request.messages.len(), 4);
        assert_eq!(request.messages[2].role, Role::Assistant);
        assert!(request.messages[2].content.contains("isLedgerEntry"));
        assert!(request.last_user_message().unwrap().contains("Look again for: date"));
    }

    #[test]
    fn test_requests_are_deterministic() {
        let mock = MockBackend::new();
        let ex = extractor(ExtractorVariant::V2, &mock);
        let doc = RawDocument::new("Globex\nTotal $10.00");
        assert_eq!(
            ex.build_request(&doc, 1, &[]).unwrap(),
            ex.build_request(&doc, 1, &[]).unwrap()
        );
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[tokio::test]
    async fn test_no_backend_uses_fallback() {
        let ex = LlmExtractor::new(
            ExtractorVariant::V2,
            None,
            Arc::new(PromptLibrary::embedded_only()),
            Arc::new(ModelRouter::embedded().unwrap()),
        );
        let outcome = ex.extract(&RawDocument::new("Acme\nTotal $10.00\n$3.00")).await;
        assert_eq!(outcome.candidate.method, ExtractionMethod::V2Fallback);
        assert_eq!(outcome.candidate.amount, Some(10.00));
        assert_eq!(outcome.model_calls, 0);
        assert!(outcome.errors.is_empty());
    }

    #[tokio::test]
    async fn test_enhanced_complete_first_attempt() {
        let mock = MockBackend::with_responses([r#"{
            "isLedgerEntry": true, "amount": 42.5, "date": "2024-03-01",
            "description": "Office chairs", "confidence": 0.7,
            "metadata": {"vendor": "Acme Supplies"}
        }"#]);
        let ex = extractor(ExtractorVariant::Enhanced, &mock);
        let outcome = ex.extract(&RawDocument::new("Acme Supplies chairs 42.50")).await;

        assert_eq!(outcome.candidate.method, ExtractionMethod::EnhancedAi);
        assert!(outcome.candidate.is_financial_document);
        assert_eq!(outcome.candidate.confidence, 0.8);
        assert_eq!(outcome.model_calls, 1);
    }

    #[tokio::test]
    async fn test_enhanced_retries_partial_then_succeeds() {
        let mock = MockBackend::with_responses([
            r#"{"isLedgerEntry": false, "amount": 19.0, "confidence": 0.4}"#,
            r#"{"isLedgerEntry": true, "amount": 19.0, "description": "Team plan", "confidence": 0.9}"#,
        ]);
        let ex = extractor(ExtractorVariant::Enhanced, &mock);
        let outcome = ex.extract(&RawDocument::new("Stripe 19.00")).await;

        assert_eq!(outcome.model_calls, 2);
        assert_eq!(outcome.candidate.description.as_deref(), Some("Team plan"));
        let requests = mock.requests();
        assert_eq!(requests[0].seed, Some(1));
        assert_eq!(requests[1].seed, Some(2));
        assert_eq!(requests[1].model.as_deref(), Some("gpt-4o"));
        assert!(requests[1]
            .last_user_message()
            .unwrap()
            .contains("description or vendor"));
    }

    #[tokio::test]
    async fn test_enhanced_retry_cap_then_fallback() {
        let partial = r#"{"isLedgerEntry": false, "amount": 19.0, "confidence": 0.4}"#;
        let mock = MockBackend::with_responses([partial, partial, partial, partial]);
        let ex = extractor(ExtractorVariant::Enhanced, &mock).with_max_attempts(10);
        assert_eq!(ex.max_attempts(), MAX_ATTEMPTS_CAP);

        let outcome = ex.extract(&RawDocument::new("Stripe\nTotal 19.00")).await;
        assert_eq!(mock.call_count(), MAX_ATTEMPTS_CAP as usize);
        assert_eq!(outcome.candidate.method, ExtractionMethod::EnhancedFallback);
        assert_eq!(outcome.candidate.vendor.as_deref(), Some("Stripe"));
        assert_eq!(outcome.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_declined_without_data_is_not_retried() {
        let mock = MockBackend::with_responses([r#"{"isLedgerEntry": false, "confidence": 0.9}"#]);
        let ex = extractor(ExtractorVariant::Enhanced, &mock);
        let outcome = ex.extract(&RawDocument::new("Dear customer, welcome aboard.")).await;

        assert_eq!(outcome.model_calls, 1);
        assert_eq!(outcome.candidate.method, ExtractionMethod::EnhancedAi);
        assert!(!outcome.candidate.is_financial_document);
        assert!(outcome.candidate.confidence <= 0.5);
    }

    #[tokio::test]
    async fn test_schema_violation_falls_back() {
        let mock = MockBackend::with_responses([r#"{"isLedgerEntry": "yes", "confidence": 0.9}"#]);
        let ex = extractor(ExtractorVariant::Enhanced, &mock);
        let outcome = ex.extract(&RawDocument::new("Acme\nAmount: $5.00")).await;

        assert_eq!(outcome.candidate.method, ExtractionMethod::EnhancedFallback);
        assert_eq!(outcome.candidate.amount, Some(5.00));
        assert!(outcome.errors[0].contains("Schema violation"));
    }

    #[tokio::test]
    async fn test_transport_error_falls_back() {
        let mock = MockBackend::new();
        mock.push(MockResponse::Fail("connection refused".into()));
        let ex = extractor(ExtractorVariant::V2, &mock);
        let outcome = ex.extract(&RawDocument::new("Acme\nTotal 5.00\nTip 9.00")).await;

        assert_eq!(outcome.candidate.method, ExtractionMethod::V2Fallback);
        assert_eq!(outcome.candidate.amount, Some(9.00));
        assert!(outcome.errors[0].contains("connection refused"));
    }

    #[tokio::test]
    async fn test_v2_single_attempt() {
        let mock = MockBackend::with_responses([
            r#"{"isFinancialDocument": false, "amount": 5.0, "confidence": 0.3}"#,
        ]);
        let ex = extractor(ExtractorVariant::V2, &mock);
        let outcome = ex.extract(&RawDocument::new("lowercase only 5.00")).await;

        assert_eq!(mock.call_count(), 1);
        assert_eq!(outcome.candidate.method, ExtractionMethod::V2Ai);
        assert!(!outcome.candidate.is_financial_document);
    }
}
