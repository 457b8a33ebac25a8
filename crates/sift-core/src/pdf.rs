//! PDF text layer
//!
//! Turns PDF bytes into plain text for the extraction pipeline. Text comes
//! from `pdf-extract`, with lopdf's own extractor as a second try; page
//! count and the Info dictionary come from lopdf.
//!
//! This layer never fails. Unreadable, corrupted or password-protected
//! input yields [`PDF_EXTRACTION_PLACEHOLDER`] as the text, which the
//! pipeline then reports as "No financial data found".

use std::panic::{self, AssertUnwindSafe};

use lopdf::{Document, Object};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Text returned when no text layer could be read
pub const PDF_EXTRACTION_PLACEHOLDER: &str =
    "[PDF text extraction failed: the document is unreadable, encrypted or image-only]";

/// Info dictionary fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
}

/// Decoded PDF
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfText {
    pub text: String,
    pub num_pages: u32,
    pub metadata: PdfMetadata,
}

impl PdfText {
    fn placeholder(num_pages: u32, metadata: PdfMetadata) -> Self {
        Self {
            text: PDF_EXTRACTION_PLACEHOLDER.to_string(),
            num_pages,
            metadata,
        }
    }

    /// Whether text extraction failed
    pub fn is_placeholder(&self) -> bool {
        self.text == PDF_EXTRACTION_PLACEHOLDER
    }
}

/// Extract text, page count and metadata from PDF bytes
pub fn extract_text(bytes: &[u8]) -> PdfText {
    let doc = match load(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "Could not load PDF");
            return PdfText::placeholder(0, PdfMetadata::default());
        }
    };

    let num_pages = doc.get_pages().len() as u32;
    let metadata = read_metadata(&doc);
    debug!(num_pages, title = ?metadata.title, "Loaded PDF");

    match read_text(&doc, bytes) {
        Ok(text) => PdfText {
            text,
            num_pages,
            metadata,
        },
        Err(e) => {
            warn!(error = %e, num_pages, "No text layer in PDF");
            PdfText::placeholder(num_pages, metadata)
        }
    }
}

fn load(bytes: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(bytes).map_err(|e| Error::Pdf(e.to_string()))?;
    if doc.is_encrypted() {
        // Owner-password-only PDFs open with an empty user password
        doc.decrypt("")
            .map_err(|_| Error::Pdf("document is password protected".into()))?;
        debug!("Decrypted PDF with empty password");
    }
    if doc.get_pages().is_empty() {
        return Err(Error::Pdf("document has no pages".into()));
    }
    Ok(doc)
}

fn read_text(doc: &Document, original: &[u8]) -> Result<String> {
    let source = if doc.is_encrypted() || doc.trailer.get(b"Encrypt").is_ok() {
        let mut decrypted = Vec::new();
        doc.clone()
            .save_to(&mut decrypted)
            .map_err(|e| Error::Pdf(format!("Failed to save decrypted PDF: {}", e)))?;
        decrypted
    } else {
        original.to_vec()
    };

    // pdf-extract panics on some malformed font programs
    let extracted = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem(&source)
    }));

    let text = match extracted {
        Ok(Ok(text)) if !text.trim().is_empty() => text,
        Ok(Ok(_)) => lopdf_text(doc)?,
        Ok(Err(e)) => {
            debug!(error = %e, "pdf-extract failed, trying lopdf");
            lopdf_text(doc)?
        }
        Err(_) => {
            debug!("pdf-extract panicked, trying lopdf");
            lopdf_text(doc)?
        }
    };

    let text = clean_text(&text);
    if text.is_empty() {
        return Err(Error::Pdf("no extractable text".into()));
    }
    Ok(text)
}

fn lopdf_text(doc: &Document) -> Result<String> {
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages)
        .map_err(|e| Error::Pdf(format!("lopdf text extraction failed: {}", e)))
}

/// Drop NULs and blank lines, trim each line
fn clean_text(text: &str) -> String {
    text.replace('\0', "")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn read_metadata(doc: &Document) -> PdfMetadata {
    let Some(info) = doc
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|obj| doc.dereference(obj).ok())
        .and_then(|(_, obj)| obj.as_dict().ok())
    else {
        return PdfMetadata::default();
    };

    let field = |key: &[u8]| {
        info.get(key)
            .ok()
            .and_then(|obj| doc.dereference(obj).ok())
            .and_then(|(_, obj)| decode_string(obj))
    };

    PdfMetadata {
        title: field(b"Title"),
        author: field(b"Author"),
        creator: field(b"Creator"),
        producer: field(b"Producer"),
    }
}

/// PDF text strings are UTF-16BE with a BOM, or PDFDocEncoding
fn decode_string(obj: &Object) -> Option<String> {
    let Object::String(bytes, _) = obj else {
        return None;
    };
    let decoded = if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    };
    let trimmed = decoded.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream, StringFormat};

    fn sample_pdf() -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal("Total 12.00")]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(b"Receipt 42".to_vec(), StringFormat::Literal),
            "Producer" => Object::string_literal("sift tests"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_garbage_yields_placeholder() {
        let result = extract_text(b"definitely not a pdf");
        assert!(result.is_placeholder());
        assert_eq!(result.text, PDF_EXTRACTION_PLACEHOLDER);
        assert_eq!(result.num_pages, 0);
    }

    #[test]
    fn test_empty_input_yields_placeholder() {
        assert!(extract_text(&[]).is_placeholder());
    }

    #[test]
    fn test_page_count_and_metadata() {
        let result = extract_text(&sample_pdf());
        assert_eq!(result.num_pages, 1);
        assert_eq!(result.metadata.title.as_deref(), Some("Receipt 42"));
        assert_eq!(result.metadata.producer.as_deref(), Some("sift tests"));
        assert!(result.metadata.author.is_none());
    }

    #[test]
    fn test_decode_utf16_string() {
        let obj = Object::String(vec![0xFE, 0xFF, 0x00, 0x41, 0x00, 0x63], StringFormat::Literal);
        assert_eq!(decode_string(&obj).as_deref(), Some("Ac"));
        assert_eq!(decode_string(&Object::Integer(3)), None);
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n\n\0b\n   \n"), "a\nb");
    }
}
