//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `parse` - Document parsing and raw field scanning
//! - `prompts` - Prompt library management commands
//! - `backend` - AI backend inspection

pub mod backend;
pub mod parse;
pub mod prompts;

// Re-export command functions for main.rs
pub use backend::*;
pub use parse::*;
pub use prompts::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
