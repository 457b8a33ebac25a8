//! Parse and scan command implementations

use std::path::Path;

use anyhow::{Context, Result};
use sift_core::extract::scan_fields;
use sift_core::pdf;
use sift_core::{ParseOptions, ParsingResult, RawExtraction, ReceiptParsingStrategy};
use tracing::{info, warn};

use super::truncate;

/// Text of an input file plus what the PDF layer reported
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub text: String,
    /// Page count for PDFs
    pub num_pages: Option<u32>,
    /// Whether the PDF layer could not read any text
    pub unreadable: bool,
}

/// Read a document: `.pdf` through the PDF layer, anything else as UTF-8
pub fn load_document(path: &Path) -> Result<LoadedDocument> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));

    if is_pdf {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let extracted = pdf::extract_text(&bytes);
        if extracted.is_placeholder() {
            warn!(file = %path.display(), "No readable text in PDF");
        }
        Ok(LoadedDocument {
            unreadable: extracted.is_placeholder(),
            num_pages: Some(extracted.num_pages),
            text: extracted.text,
        })
    } else {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {} as UTF-8 text", path.display()))?;
        Ok(LoadedDocument {
            text,
            num_pages: None,
            unreadable: false,
        })
    }
}

/// Build parse options. Only an explicit `--filename` is passed on, since
/// any filename turns on the contextual strategy.
pub fn parse_options(
    filename: Option<String>,
    hints: Vec<String>,
    accept_partial: bool,
    no_ai: bool,
    max_retries: u32,
) -> ParseOptions {
    ParseOptions {
        filename,
        use_ai: !no_ai,
        max_retries,
        accept_partial_data: accept_partial,
        document_hints: hints,
    }
}

/// Run the strategy pipeline over one file
pub async fn parse_file(
    strategy: &ReceiptParsingStrategy,
    path: &Path,
    options: &ParseOptions,
) -> Result<ParsingResult> {
    let document = load_document(path)?;
    info!(
        file = %path.display(),
        chars = document.text.chars().count(),
        pages = ?document.num_pages,
        "Parsing document"
    );
    Ok(strategy.parse(&document.text, options).await)
}

/// Parse a document and print the result
pub async fn cmd_parse(path: &Path, options: &ParseOptions, json: bool) -> Result<()> {
    let strategy = ReceiptParsingStrategy::from_env();
    match strategy.ai() {
        Some(ai) => info!(backend = ai.kind(), "AI backend configured"),
        None => info!("No AI backend configured, using local extractors"),
    }

    let result = parse_file(&strategy, path, options).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn print_result(result: &ParsingResult) {
    match &result.data {
        Some(data) if result.success => {
            println!("✅ Parsed with {} strategy\n", result.method);
            println!("  Amount:      {:.2}", data.amount);
            if let Some(currency) = &data.currency {
                println!("  Currency:    {}", currency);
            }
            println!("  Date:        {}", data.date);
            println!("  Description: {}", truncate(&data.description, 60));
            if let Some(vendor) = &data.vendor {
                println!("  Vendor:      {}", vendor);
            }
            if let Some(invoice) = &data.invoice_number {
                println!("  Invoice #:   {}", invoice);
            }
            if let Some(doc_type) = &data.document_type {
                println!("  Type:        {}", doc_type);
            }
            println!("  Confidence:  {:.2}", result.confidence);
        }
        _ => println!("❌ No transaction found"),
    }

    println!("  Strategies tried: {}", result.attempts);
    if !result.errors.is_empty() {
        println!("\nDiagnostics:");
        for error in &result.errors {
            println!("  - {}", truncate(error, 120));
        }
    }
}

/// Run the regex extractors over a file
pub fn scan_file(path: &Path) -> Result<RawExtraction> {
    let document = load_document(path)?;
    let filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
    Ok(scan_fields(&document.text, filename.as_deref()).raw())
}

/// Print every amount, date and vendor candidate in a file
pub fn cmd_scan(path: &Path, json: bool) -> Result<()> {
    let raw = scan_file(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&raw)?);
        return Ok(());
    }

    println!("Amounts ({}):", raw.amounts.len());
    for amount in &raw.amounts {
        println!("  {:.2}", amount);
    }
    println!("\nDates ({}):", raw.dates.len());
    for date in &raw.dates {
        println!("  {}", date);
    }
    println!("\nVendors ({}):", raw.vendors.len());
    for vendor in &raw.vendors {
        println!("  {}", vendor);
    }
    Ok(())
}
