//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Sift - Turn receipts and statements into transactions
#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Extract transactions from receipts, invoices and statements", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a document into a transaction
    ///
    /// PDF files go through the PDF text layer; anything else is read as
    /// UTF-8 text. The AI backend is configured through AI_BACKEND and
    /// OPENAI_API_KEY.
    Parse {
        /// Document to parse (.pdf or text)
        file: PathBuf,

        /// Filename reported to the extractors; also enables the contextual strategy
        #[arg(long)]
        filename: Option<String>,

        /// Document-type hint, e.g. "invoice" or "platform:stripe" (repeatable)
        #[arg(long = "hint")]
        hints: Vec<String>,

        /// Accept an amount without a vendor in the last-resort pass
        #[arg(long)]
        accept_partial: bool,

        /// Skip the AI strategy even when a backend is configured
        #[arg(long)]
        no_ai: bool,

        /// Model attempts for the AI strategy (capped at 3)
        #[arg(long, default_value = "3")]
        max_retries: u32,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run only the regex field extractors and print every candidate
    Scan {
        /// Document to scan (.pdf or text)
        file: PathBuf,

        /// Print the raw extraction as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage prompt templates
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },

    /// Show the configured AI backend and whether it is reachable
    Backend,
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all available prompts and their override status
    List,

    /// Show the content of a specific prompt
    Show {
        /// Prompt ID (e.g., extract_general, extract_financial)
        prompt_id: String,
    },

    /// Show the path where prompt overrides should be placed
    Path,
}
