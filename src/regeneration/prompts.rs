/*!
 * Prompt template for the caption rewrite.
 *
 * The model receives the fixed rules header, the caller's rule text, the
 * auto-generated captions and the reference lyrics with their meaning, then
 * the task list. Sections are numbered so the captions and the reference
 * text stay clearly apart.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::language_utils;

// @const: `{name}` placeholder in a template
static PLACEHOLDER_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([a-z_]+)\}").expect("placeholder regex is valid")
});

/// Rewrite prompt template.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    /// The template string with placeholders
    template: String,
}

impl PromptTemplate {
    /// The default caption rewrite prompt.
    pub const CAPTION_REWRITER: &'static str = r#"You are a subtitle generator. Follow these rules:
{rules}

Inputs:
1. Original auto-generated {caption_language} SRT:
{captions}

2. Lyrics with {translation_language} meaning:
{reference}

Task:
- Create a new SRT file.
- Each block should contain one lyric (merge/split smartly).
- Include IAST transcription + {translation_language} meaning.
- Remove bogus entries like [music], [aaa].
- Output must be valid SRT format."#;

    /// Create a new prompt template.
    pub fn new(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Create the default caption rewrite template.
    pub fn caption_rewriter() -> Self {
        Self::new(Self::CAPTION_REWRITER)
    }

    /// Render the template with the given inputs.
    ///
    /// Placeholders are expanded in one pass over the template, so text
    /// substituted from the inputs is never expanded again. Unknown
    /// placeholders are left as written.
    pub fn render(&self, inputs: &PromptInputs<'_>) -> String {
        PLACEHOLDER_REGEX
            .replace_all(&self.template, |caps: &Captures| match &caps[1] {
                "rules" => inputs.rules.trim().to_string(),
                "captions" => inputs.captions.trim().to_string(),
                "reference" => inputs.reference.trim().to_string(),
                "caption_language" => language_utils::display_name(inputs.caption_language),
                "translation_language" => language_utils::display_name(inputs.translation_language),
                _ => caps[0].to_string(),
            })
            .into_owned()
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::caption_rewriter()
    }
}

/// Values substituted into a `PromptTemplate`
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub rules: &'a str,
    pub captions: &'a str,
    pub reference: &'a str,
    pub caption_language: &'a str,
    pub translation_language: &'a str,
}
