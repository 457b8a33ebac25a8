//! Sift CLI - Receipt and statement extraction
//!
//! Usage:
//!   sift parse receipt.pdf        Parse a document into a transaction
//!   sift scan receipt.pdf         Show raw amount/date/vendor candidates
//!   sift prompts list             List prompt templates
//!   sift backend                  Show the configured AI backend

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Parse {
            file,
            filename,
            hints,
            accept_partial,
            no_ai,
            max_retries,
            json,
        } => {
            let options =
                commands::parse_options(filename, hints, accept_partial, no_ai, max_retries);
            commands::cmd_parse(&file, &options, json).await
        }
        Commands::Scan { file, json } => commands::cmd_scan(&file, json),
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id }) => commands::cmd_prompts_show(&prompt_id),
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
        Commands::Backend => commands::cmd_backend().await,
    }
}
