//! Sift Core Library
//!
//! Turns the text of an uploaded receipt, invoice or statement into a
//! structured transaction, or into a documented failure:
//! - Regex field extractors for amounts, dates and vendor names
//! - Local fallback parser for when no model is available
//! - LLM extractors (enhanced and V2) over an OpenAI-compatible backend
//! - Strategy orchestrator that tries strategies in priority order
//! - Prompt library with user overrides
//! - Model router for per-attempt model selection
//! - PDF text layer

pub mod ai;
pub mod error;
pub mod extract;
pub mod extractor;
pub mod fallback;
pub mod model_router;
pub mod models;
pub mod pdf;
pub mod prompts;
pub mod strategy;

/// Test utilities including mock OpenAI-compatible server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, CompletionRequest, MockBackend, MockResponse, OpenAICompatibleBackend};
pub use error::{Error, Result};
pub use extractor::{ExtractionOutcome, ExtractorVariant, LlmExtractor};
pub use fallback::{AmountPolicy, LocalFallbackParser};
pub use model_router::{ExtractorModels, ModelRouter, RouterConfig};
pub use models::{
    DocumentType, ExtractionCandidate, ExtractionMethod, ParsedTransaction, ParsingResult,
    RawDocument, RawExtraction,
};
pub use pdf::{PdfMetadata, PdfText, PDF_EXTRACTION_PLACEHOLDER};
pub use prompts::{Prompt, PromptId, PromptInfo, PromptLibrary};
pub use strategy::{ParseOptions, ReceiptParsingStrategy, StrategyKind};
