//! AI backend command implementations

use anyhow::Result;
use sift_core::ai::{AIBackend, AIClient};
use sift_core::extractor::ExtractorVariant;
use sift_core::ModelRouter;

/// Show the configured backend, its routing and whether it answers
pub async fn cmd_backend() -> Result<()> {
    let router = ModelRouter::default();

    println!("🔍 Checking AI backend...\n");

    let Some(client) = AIClient::from_env() else {
        println!("  No AI backend configured.");
        println!("  The ai strategy is skipped; pattern extraction uses local parsers.\n");
        println!("To enable the AI strategy:");
        println!("  export OPENAI_API_KEY=...");
        println!("  export OPENAI_BASE_URL=https://api.openai.com   # optional");
        return Ok(());
    };

    println!("  Backend: {}", client.kind());
    println!("  Host:    {}", client.host());
    println!("  Model:   {}", client.model());

    println!("\n  Routing:");
    for variant in [ExtractorVariant::Enhanced, ExtractorVariant::V2] {
        let models = router.config_for(variant);
        println!(
            "    {:<9} first attempt: {}, retries: {}, timeout: {}s",
            variant.as_str(),
            models.fast_model,
            models.strong_model,
            models.timeout.as_secs()
        );
    }
    if let Some(path) = router.config_path().filter(|p| p.exists()) {
        println!("    (override file: {})", path.display());
    }

    print!("\nChecking availability... ");
    if client.health_check().await {
        println!("✅ Connected");
    } else {
        println!("❌ Failed");
        println!("\n⚠️  Could not reach {}", client.host());
    }

    Ok(())
}
