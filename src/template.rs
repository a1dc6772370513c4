//! # Prompt templates
//!
//! The adapter sends exactly two kinds of request: a **rewrite** that returns
//! the markdown conformed to a style guide, and an **analyze** that returns a
//! compliance report. Each is described by a [`PromptTemplate`]: a system
//! prompt, a user prompt and the sampling parameters for the call.
//!
//! Two placeholders are substituted by [`PromptTemplate::render`]:
//!
//! - `{style_guide}`: the raw text of the selected style guide.
//! - `{content}`: the markdown submitted by the user.
//!
//! The built-in templates can be overridden per deployment by dropping a YAML
//! file named after the kind into the configured templates directory:
//!
//! ```text
//! <templates_dir>/rewrite.yaml
//! <templates_dir>/analyze.yaml
//! ```
//!
//! ```yaml
//! system_prompt: |
//!   You edit markdown. Follow this guide strictly:
//!   {style_guide}
//! user_prompt: "{content}"
//! ```
//!
//! Only the prompt text can be replaced. Rewrites always run at temperature
//! 0.3 with 4000 tokens and analyses at 0.1 with 2000, so an override that
//! sets any other key is rejected.
//!
//! A missing file falls back to the built-in template. A file that exists but
//! cannot be read or parsed is an error.

use std::{
    fmt,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

const STYLE_GUIDE_PLACEHOLDER: &str = "{style_guide}";
const CONTENT_PLACEHOLDER: &str = "{content}";

/// Which of the two requests a template drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Rewrite,
    Analyze,
}

impl TemplateKind {
    /// File stem used for overrides.
    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::Rewrite => "rewrite",
            TemplateKind::Analyze => "analyze",
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Prompt text plus sampling parameters for one kind of request.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct PromptTemplate {
    /// System message; may contain `{style_guide}`.
    pub system_prompt: String,

    /// User message; may contain `{content}`.
    pub user_prompt: String,

    /// Sampling temperature.
    pub temperature: f32,

    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl PromptTemplate {
    /// Built-in template for `kind`.
    pub fn builtin(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Rewrite => Self::rewrite(),
            TemplateKind::Analyze => Self::analyze(),
        }
    }

    /// Conform markdown to the guide and return only the corrected text.
    pub fn rewrite() -> Self {
        Self {
            system_prompt: "You are a markdown style guide processor. Your task is to analyze and \
improve markdown content according to the provided style guide.

Style Guide:
{style_guide}

Instructions:
1. Review the markdown content for compliance with the style guide
2. Make necessary corrections and improvements
3. Maintain the original meaning and structure
4. Return only the corrected markdown content
5. If no changes are needed, return the original content"
                .to_string(),
            user_prompt: "Please process this markdown content according to the style guide:

{content}"
                .to_string(),
            temperature: 0.3,
            max_tokens: 4000,
        }
    }

    /// Score compliance out of ten and cite every problem it finds.
    pub fn analyze() -> Self {
        Self {
            system_prompt: "You are a markdown style guide analyzer. Review the provided markdown \
content against the style guide and provide a detailed analysis.

Style Guide:
{style_guide}

IMPORTANT INSTRUCTIONS:
- Only flag actual violations of the style guide, not stylistic preferences
- Be conservative - when in doubt, don't flag an issue
- Look at the actual text carefully before making claims about missing punctuation
- Sentence case vs title case is often a matter of preference - only flag if explicitly against the style guide
- Check that Oxford commas are actually missing before claiming they are
- Focus on clear formatting and structural issues, not subjective style choices

Provide your analysis in the following format:
## Compliance Score: X/10

## Issues Found:
- List any style guide violations. Every violation MUST quote the sentence from the content where it occurs, with the problem area in bold. Do not report a problem without citing the sentence where it exists.

## Suggestions:
- Specific recommendations for improvement, each citing the actual text that can be fixed, as with \"Issues Found\".

## Strengths:
- What the content does well according to the style guide"
                .to_string(),
            user_prompt: "Please analyze this markdown content for style guide compliance:

{content}"
                .to_string(),
            temperature: 0.1,
            max_tokens: 2000,
        }
    }

    /// Replace the prompt text, keeping the sampling parameters.
    pub fn with_prompts(self, prompts: PromptText) -> Self {
        Self {
            system_prompt: prompts.system_prompt,
            user_prompt: prompts.user_prompt,
            ..self
        }
    }

    /// Substitute the placeholders, returning `(system, user)` messages.
    pub fn render(&self, style_guide: &str, content: &str) -> (String, String) {
        (
            self.system_prompt
                .replace(STYLE_GUIDE_PLACEHOLDER, style_guide),
            self.user_prompt.replace(CONTENT_PLACEHOLDER, content),
        )
    }
}

/// The overridable part of a template, as read from `<kind>.yaml`.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PromptText {
    pub system_prompt: String,
    pub user_prompt: String,
}

/// Both templates the adapter needs, resolved once at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplates {
    pub rewrite: PromptTemplate,
    pub analyze: PromptTemplate,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            rewrite: PromptTemplate::rewrite(),
            analyze: PromptTemplate::analyze(),
        }
    }
}

impl PromptTemplates {
    /// Resolve both templates, honoring overrides in `dir` when given.
    pub async fn load(dir: Option<&Path>) -> Result<Self, LlmError> {
        match dir {
            Some(dir) => Ok(Self {
                rewrite: load_template(dir, TemplateKind::Rewrite).await?,
                analyze: load_template(dir, TemplateKind::Analyze).await?,
            }),
            None => Ok(Self::default()),
        }
    }

    pub fn get(&self, kind: TemplateKind) -> &PromptTemplate {
        match kind {
            TemplateKind::Rewrite => &self.rewrite,
            TemplateKind::Analyze => &self.analyze,
        }
    }
}

/// Load `<dir>/<kind>.yaml` over the built-in template for `kind`, or the
/// built-in template unchanged if there is no such file.
///
/// ### Errors
/// Returns [`LlmError::Template`] if the file exists but cannot be read, is
/// not valid YAML, or sets keys other than the two prompts.
pub async fn load_template(dir: &Path, kind: TemplateKind) -> Result<PromptTemplate, LlmError> {
    let path: PathBuf = dir.join(format!("{}.yaml", kind.name()));

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("No {} override at {}, using built-in", kind, path.display());
            return Ok(PromptTemplate::builtin(kind));
        }
        Err(e) => {
            return Err(LlmError::Template {
                path: path.display().to_string(),
                message: e.to_string(),
            });
        }
    };

    tracing::info!("Loading {} template: {}", kind, path.display());

    let prompts: PromptText = serde_yaml::from_str(&content).map_err(|e| LlmError::Template {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(PromptTemplate::builtin(kind).with_prompts(prompts))
}
