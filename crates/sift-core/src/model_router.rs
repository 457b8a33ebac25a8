//! Model Router for per-attempt model selection
//!
//! Picks the model for each extraction attempt: the first attempt goes to
//! the fast model, retries escalate to the strong model. Each extractor
//! variant may override the defaults.
//!
//! The router is a pure function of its configuration. It keeps no health
//! or failure counters, so one instance can be shared across concurrent
//! parses without locking.
//!
//! ## Configuration Resolution
//!
//! Config is loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/sift/config/models.toml)
//! 2. Fall back to embedded defaults (compiled into binary)

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::extractor::ExtractorVariant;

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/models.toml");

/// Resolved model settings for one extractor variant
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorModels {
    /// Model for the first attempt
    pub fast_model: String,
    /// Model for retries
    pub strong_model: String,
    /// Timeout for API calls
    pub timeout: Duration,
    /// Completion token limit
    pub max_tokens: u32,
}

impl Default for ExtractorModels {
    fn default() -> Self {
        Self {
            fast_model: "gpt-4o-mini".to_string(),
            strong_model: "gpt-4o".to_string(),
            timeout: Duration::from_secs(60),
            max_tokens: 1000,
        }
    }
}

/// Router configuration
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Settings used when a variant has no section of its own
    pub defaults: ExtractorModels,
    /// Per-variant configurations
    pub extractors: HashMap<ExtractorVariant, ExtractorModels>,
}

/// Model Router for per-attempt model selection
#[derive(Debug, Clone)]
pub struct ModelRouter {
    config: RouterConfig,
    config_path: Option<PathBuf>,
}

impl ModelRouter {
    /// Create a new model router, honoring the default override location
    pub fn new() -> Result<Self> {
        let path = default_config_path();
        let config = load_config(path.as_ref())?;
        Ok(Self {
            config,
            config_path: path,
        })
    }

    /// Create with a custom config path
    pub fn with_config_path(path: PathBuf) -> Result<Self> {
        let config = load_config(Some(&path))?;
        Ok(Self {
            config,
            config_path: Some(path),
        })
    }

    /// Create with an explicit configuration (for testing)
    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    /// Router over the embedded configuration only
    pub fn embedded() -> Result<Self> {
        Ok(Self::with_config(parse_config(DEFAULT_CONFIG)?))
    }

    /// Settings for a variant
    pub fn config_for(&self, variant: ExtractorVariant) -> &ExtractorModels {
        self.config
            .extractors
            .get(&variant)
            .unwrap_or(&self.config.defaults)
    }

    /// Model for a 1-based attempt number
    pub fn model_for_attempt(&self, variant: ExtractorVariant, attempt: u32) -> &str {
        let models = self.config_for(variant);
        if attempt <= 1 {
            &models.fast_model
        } else {
            &models.strong_model
        }
    }

    /// Get the timeout for a variant
    pub fn timeout_for(&self, variant: ExtractorVariant) -> Duration {
        self.config_for(variant).timeout
    }

    /// Get the completion token limit for a variant
    pub fn max_tokens_for(&self, variant: ExtractorVariant) -> u32 {
        self.config_for(variant).max_tokens
    }

    /// Get the router configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Get the config path (if using file-based config)
    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }
}

impl Default for ModelRouter {
    fn default() -> Self {
        Self::new()
            .or_else(|_| Self::embedded())
            .unwrap_or_else(|_| Self::with_config(RouterConfig::default()))
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("sift").join("config").join("models.toml"))
}

/// Load configuration (override first, then default)
fn load_config(override_path: Option<&PathBuf>) -> Result<RouterConfig> {
    let content = match override_path {
        Some(path) if path.exists() => fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    defaults: Option<RawModels>,
    extractors: Option<HashMap<String, RawModels>>,
}

#[derive(Debug, Default, Deserialize)]
struct RawModels {
    fast_model: Option<String>,
    strong_model: Option<String>,
    timeout_secs: Option<u64>,
    max_tokens: Option<u32>,
}

impl RawModels {
    fn apply(self, base: &ExtractorModels) -> ExtractorModels {
        ExtractorModels {
            fast_model: self.fast_model.unwrap_or_else(|| base.fast_model.clone()),
            strong_model: self
                .strong_model
                .unwrap_or_else(|| base.strong_model.clone()),
            timeout: self
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(base.timeout),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
        }
    }
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<RouterConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let defaults = raw
        .defaults
        .unwrap_or_default()
        .apply(&ExtractorModels::default());

    let mut extractors = HashMap::new();
    if let Some(sections) = raw.extractors {
        for (name, section) in sections {
            let Ok(variant) = name.parse::<ExtractorVariant>() else {
                tracing::warn!(section = %name, "Skipping unknown extractor in model config");
                continue;
            };
            extractors.insert(variant, section.apply(&defaults));
        }
    }

    if extractors.values().any(|m| m.timeout.is_zero()) || defaults.timeout.is_zero() {
        return Err(Error::Config("timeout_secs must be positive".into()));
    }

    Ok(RouterConfig {
        defaults,
        extractors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_default_config() {
        let config = parse_config(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.defaults.fast_model, "gpt-4o-mini");
        assert_eq!(config.defaults.strong_model, "gpt-4o");
        assert_eq!(config.defaults.timeout, Duration::from_secs(60));
        assert!(config.extractors.contains_key(&ExtractorVariant::Enhanced));
        assert_eq!(
            config.extractors[&ExtractorVariant::V2].max_tokens,
            1500
        );
    }

    #[test]
    fn test_model_escalates_on_retry() {
        let router = ModelRouter::embedded().unwrap();
        assert_eq!(
            router.model_for_attempt(ExtractorVariant::Enhanced, 1),
            "gpt-4o-mini"
        );
        assert_eq!(
            router.model_for_attempt(ExtractorVariant::Enhanced, 2),
            "gpt-4o"
        );
        assert_eq!(
            router.model_for_attempt(ExtractorVariant::Enhanced, 3),
            "gpt-4o"
        );
    }

    #[test]
    fn test_variant_override() {
        let config = parse_config(
            r#"
[defaults]
fast_model = "small"
strong_model = "large"

[extractors.v2]
fast_model = "medium"
timeout_secs = 10
"#,
        )
        .unwrap();
        let router = ModelRouter::with_config(config);

        assert_eq!(router.model_for_attempt(ExtractorVariant::V2, 1), "medium");
        assert_eq!(router.model_for_attempt(ExtractorVariant::V2, 2), "large");
        assert_eq!(router.timeout_for(ExtractorVariant::V2), Duration::from_secs(10));
        assert_eq!(router.model_for_attempt(ExtractorVariant::Enhanced, 1), "small");
        assert_eq!(router.timeout_for(ExtractorVariant::Enhanced), Duration::from_secs(60));
    }

    #[test]
    fn test_unknown_sections_skipped() {
        let config = parse_config("[extractors.legacy]\nfast_model = \"x\"\n").unwrap();
        assert!(config.extractors.is_empty());
    }

    #[test]
    fn test_invalid_config() {
        assert!(parse_config("[defaults\n").is_err());
        assert!(parse_config("[defaults]\ntimeout_secs = 0\n").is_err());
    }

    #[test]
    fn test_with_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models.toml");
        std::fs::write(&path, "[defaults]\nfast_model = \"local-small\"\n").unwrap();

        let router = ModelRouter::with_config_path(path.clone()).unwrap();
        assert_eq!(
            router.model_for_attempt(ExtractorVariant::V2, 1),
            "local-small"
        );
        assert_eq!(router.config_path(), Some(&path));

        // Missing override file falls back to the embedded config
        let missing = ModelRouter::with_config_path(dir.path().join("absent.toml")).unwrap();
        assert_eq!(
            missing.model_for_attempt(ExtractorVariant::V2, 1),
            "gpt-4o-mini"
        );
    }
}
