//! Regex field extractors
//!
//! Pure functions over raw document text. None of them fail: an
//! unparsable document simply yields empty candidate lists.
//!
//! - `amounts`: tiered amount patterns (amount > total > paid > currency > bare decimal)
//! - `dates`: numeric, ISO and month-name dates, bounded to plausible years
//! - `vendors`: header lines, relational phrases, filename, with brand aliases
//! - `metadata`: document type, currency, invoice number, payment method

pub mod amounts;
pub mod dates;
pub mod metadata;
mod patterns;
pub mod vendors;

pub use amounts::{extract_amounts, keyword_amount, AmountExtraction, AmountMatch, AmountTier};
pub use dates::{extract_dates, is_valid_iso_date, most_recent, today};
pub use metadata::{
    detect_currency, detect_document_type, detect_invoice_number, detect_payment_method,
};
pub use vendors::{brand_alias, clean_vendor, extract_vendors};

use crate::models::RawExtraction;

/// Output of running all three field extractors over one text
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldScan {
    pub amounts: AmountExtraction,
    pub dates: Vec<String>,
    pub vendors: Vec<String>,
}

impl FieldScan {
    /// Unfiltered candidate lists for diagnostics
    pub fn raw(&self) -> RawExtraction {
        RawExtraction {
            amounts: self.amounts.values(),
            dates: self.dates.clone(),
            vendors: self.vendors.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty() && self.dates.is_empty() && self.vendors.is_empty()
    }
}

/// Run the amount, date and vendor extractors
pub fn scan_fields(text: &str, filename: Option<&str>) -> FieldScan {
    FieldScan {
        amounts: extract_amounts(text),
        dates: extract_dates(text),
        vendors: extract_vendors(text, filename),
    }
}
