//! Prompt Library for the extraction prompts
//!
//! Prompts are resolved with a two-layer lookup:
//! 1. Check for override in data dir (~/.local/share/sift/prompts/overrides/)
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Every prompt is resolved once when the library is built. The library is
//! immutable afterwards, so one instance can be shared across concurrent
//! parses. A broken override file is logged and the embedded default used.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Embedded default prompts (compiled into binary)
mod defaults {
    pub const EXTRACT_GENERAL: &str = include_str!("../../../prompts/extract_general.md");
    pub const EXTRACT_MINIMAL: &str = include_str!("../../../prompts/extract_minimal.md");
    pub const EXTRACT_PLATFORM: &str = include_str!("../../../prompts/extract_platform.md");
    pub const EXTRACT_FINANCIAL: &str = include_str!("../../../prompts/extract_financial.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// Enhanced extractor, ordinary documents
    ExtractGeneral,
    /// Enhanced extractor, short snippets
    ExtractMinimal,
    /// Enhanced extractor, documents with a platform hint
    ExtractPlatform,
    /// V2 extractor
    ExtractFinancial,
}

impl PromptId {
    /// Get the string identifier for this prompt
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExtractGeneral => "extract_general",
            Self::ExtractMinimal => "extract_minimal",
            Self::ExtractPlatform => "extract_platform",
            Self::ExtractFinancial => "extract_financial",
        }
    }

    /// Get all known prompt IDs
    pub fn all() -> &'static [PromptId] {
        &[
            Self::ExtractGeneral,
            Self::ExtractMinimal,
            Self::ExtractPlatform,
            Self::ExtractFinancial,
        ]
    }

    /// Look up an ID by its string form
    pub fn parse(s: &str) -> Option<PromptId> {
        Self::all().iter().copied().find(|id| id.as_str() == s)
    }

    /// Get the default embedded content for this prompt
    fn default_content(&self) -> &'static str {
        match self {
            Self::ExtractGeneral => defaults::EXTRACT_GENERAL,
            Self::ExtractMinimal => defaults::EXTRACT_MINIMAL,
            Self::ExtractPlatform => defaults::EXTRACT_PLATFORM,
            Self::ExtractFinancial => defaults::EXTRACT_FINANCIAL,
        }
    }
}

fn default_temperature() -> f32 {
    0.1
}

/// Prompt frontmatter metadata
#[derive(Debug, Clone, Deserialize)]
pub struct PromptMetadata {
    /// Unique identifier
    pub id: String,
    /// Version number for tracking changes
    pub version: u32,
    /// Sampling temperature sent with this prompt
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

/// A loaded prompt with metadata and content
#[derive(Debug, Clone)]
pub struct Prompt {
    /// Metadata from frontmatter
    pub metadata: PromptMetadata,
    /// The prompt content (system + user sections)
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
    /// Path to override file (if any)
    pub override_path: Option<PathBuf>,
}

impl Prompt {
    /// Get the system section of the prompt
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    /// Get the user section of the prompt
    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the whole prompt with template variables replaced
    pub fn render(&self, vars: &HashMap<&str, &str>) -> String {
        render_template(&self.content, vars)
    }

    /// Render just the user section with variables
    pub fn render_user(&self, vars: &HashMap<&str, &str>) -> String {
        match self.user_section() {
            Some(user) => render_template(user, vars),
            None => self.render(vars),
        }
    }
}

/// Immutable set of resolved prompts
#[derive(Debug, Clone)]
pub struct PromptLibrary {
    /// Override directory path
    override_dir: Option<PathBuf>,
    prompts: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Create a new prompt library with default paths
    pub fn new() -> Self {
        Self::resolve(default_prompts_dir())
    }

    /// Create a prompt library with a custom override directory
    pub fn with_override_dir(path: PathBuf) -> Self {
        Self::resolve(Some(path))
    }

    /// Create a prompt library with no override directory (embedded only)
    pub fn embedded_only() -> Self {
        Self::resolve(None)
    }

    fn resolve(override_dir: Option<PathBuf>) -> Self {
        let mut prompts = HashMap::new();
        for &id in PromptId::all() {
            let loaded = override_dir
                .as_deref()
                .and_then(|dir| load_override(dir, id))
                .or_else(|| match load_embedded(id) {
                    Ok(prompt) => Some(prompt),
                    Err(e) => {
                        warn!(prompt = id.as_str(), error = %e, "Embedded prompt failed to parse");
                        None
                    }
                });
            if let Some(prompt) = loaded {
                prompts.insert(id, prompt);
            }
        }
        Self {
            override_dir,
            prompts,
        }
    }

    /// Get a resolved prompt by ID
    pub fn get(&self, id: PromptId) -> Result<&Prompt> {
        self.prompts
            .get(&id)
            .ok_or_else(|| Error::Config(format!("Prompt not available: {}", id.as_str())))
    }

    /// List all prompts with their override status
    pub fn list(&self) -> Vec<PromptInfo> {
        PromptId::all()
            .iter()
            .map(|&id| {
                let prompt = self.prompts.get(&id);
                PromptInfo {
                    id: id.as_str().to_string(),
                    version: prompt.map(|p| p.metadata.version).unwrap_or(0),
                    temperature: prompt
                        .map(|p| p.metadata.temperature)
                        .unwrap_or_else(default_temperature),
                    has_override: prompt.is_some_and(|p| p.is_override),
                    override_path: prompt.and_then(|p| p.override_path.clone()),
                }
            })
            .collect()
    }

    /// Check if a prompt was resolved from an override file
    pub fn has_override(&self, id: PromptId) -> bool {
        self.prompts.get(&id).is_some_and(|p| p.is_override)
    }

    /// Get the override directory path
    pub fn override_dir(&self) -> Option<&PathBuf> {
        self.override_dir.as_ref()
    }
}

impl Default for PromptLibrary {
    fn default() -> Self {
        Self::new()
    }
}

/// Information about a prompt for listing
#[derive(Debug, Clone)]
pub struct PromptInfo {
    /// Prompt identifier
    pub id: String,
    /// Version from metadata
    pub version: u32,
    /// Sampling temperature from metadata
    pub temperature: f32,
    /// Whether an override is in effect
    pub has_override: bool,
    /// Path to override file (if in effect)
    pub override_path: Option<PathBuf>,
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("sift").join("prompts").join("overrides"))
}

fn load_embedded(id: PromptId) -> Result<Prompt> {
    let (metadata, body) = parse_prompt(id.default_content())?;
    Ok(Prompt {
        metadata,
        content: body,
        is_override: false,
        override_path: None,
    })
}

fn load_override(dir: &Path, id: PromptId) -> Option<Prompt> {
    let override_path = dir.join(format!("{}.md", id.as_str()));
    if !override_path.exists() {
        return None;
    }

    let parsed = fs::read_to_string(&override_path)
        .map_err(Error::from)
        .and_then(|content| parse_prompt(&content));

    match parsed {
        Ok((metadata, body)) => Some(Prompt {
            metadata,
            content: body,
            is_override: true,
            override_path: Some(override_path),
        }),
        Err(e) => {
            warn!(
                path = %override_path.display(),
                error = %e,
                "Ignoring unreadable prompt override"
            );
            None
        }
    }
}

/// Parse a prompt file into metadata and body
fn parse_prompt(content: &str) -> Result<(PromptMetadata, String)> {
    let content = content.trim();

    // Check for YAML frontmatter
    if !content.starts_with("---") {
        return Err(Error::InvalidData(
            "Prompt must start with YAML frontmatter (---)".into(),
        ));
    }

    // Find end of frontmatter
    let rest = &content[3..];
    let end = rest.find("---").ok_or_else(|| {
        Error::InvalidData("Prompt frontmatter not closed (missing second ---)".into())
    })?;

    let frontmatter = &rest[..end].trim();
    let body = &rest[end + 3..].trim();

    // Parse frontmatter as YAML
    let metadata: PromptMetadata = serde_yaml::from_str(frontmatter)
        .map_err(|e| Error::InvalidData(format!("Invalid prompt frontmatter: {}", e)))?;

    if !(0.0..=2.0).contains(&metadata.temperature) {
        return Err(Error::InvalidData(format!(
            "Prompt temperature out of range: {}",
            metadata.temperature
        )));
    }

    Ok((metadata, body.to_string()))
}

/// Extract a section from the prompt content
fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];

    // Find the next header or end of content
    let end = after_header.find("\n# ").unwrap_or(after_header.len());

    Some(after_header[..end].trim())
}

/// Resolve conditionals, then substitute `{{var}}` in a single pass so
/// substituted values are never re-expanded
fn render_template(template: &str, vars: &HashMap<&str, &str>) -> String {
    let resolved = remove_unmatched_conditionals(template, vars);

    let mut out = String::with_capacity(resolved.len());
    let mut rest = resolved.as_str();
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        match after.find("}}") {
            Some(close) => {
                let name = after[..close].trim();
                match vars.get(name) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(&after[..close]);
                        out.push_str("}}");
                    }
                }
                rest = &after[close + 2..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Keep or drop `{{#if var}}...{{/if}}` blocks
fn remove_unmatched_conditionals(content: &str, vars: &HashMap<&str, &str>) -> String {
    let mut result = content.to_string();

    loop {
        if let Some(if_start) = result.find("{{#if ") {
            let var_start = if_start + 6;
            if let Some(var_end) = result[var_start..].find("}}") {
                let var_name = &result[var_start..var_start + var_end];
                let block_start = var_start + var_end + 2;

                if let Some(endif_pos) = result[block_start..].find("{{/if}}") {
                    let block_content = &result[block_start..block_start + endif_pos];
                    let full_end = block_start + endif_pos + 7;

                    let should_include = vars.get(var_name).is_some_and(|v| !v.is_empty());

                    result = if should_include {
                        format!(
                            "{}{}{}",
                            &result[..if_start],
                            block_content,
                            &result[full_end..]
                        )
                    } else {
                        format!("{}{}", &result[..if_start], &result[full_end..])
                    };
                    continue;
                }
            }
        }
        break;
    }

    result
}
