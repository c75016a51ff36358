use log::{info, warn};
use std::sync::Arc;

use crate::errors::PipelineError;
use crate::providers::TextGenerator;
use crate::subtitle_processor::{SrtCanonicalizer, SubtitleDocument};
use super::prompts::{PromptInputs, PromptTemplate};

/// Rewrites an auto-generated caption document with a generative-text service
#[derive(Debug, Clone)]
pub struct RegenerationOrchestrator {
    generator: Arc<dyn TextGenerator>,
    template: PromptTemplate,
    caption_language: String,
    translation_language: String,
}

impl RegenerationOrchestrator {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        caption_language: impl Into<String>,
        translation_language: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            template: PromptTemplate::default(),
            caption_language: caption_language.into(),
            translation_language: translation_language.into(),
        }
    }

    /// Replace the prompt template
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    /// The composite prompt sent to the generator
    pub fn build_prompt(&self, original_text: &str, reference_text: &str, rule_text: &str) -> String {
        self.template.render(&PromptInputs {
            rules: rule_text,
            captions: original_text,
            reference: reference_text,
            caption_language: &self.caption_language,
            translation_language: &self.translation_language,
        })
    }

    /// One generator call, then canonicalization of whatever came back.
    ///
    /// A generator failure is returned as is; there is no retry.
    pub async fn regenerate(
        &self,
        original_text: &str,
        reference_text: &str,
        rule_text: &str,
    ) -> Result<SubtitleDocument, PipelineError> {
        let prompt = self.build_prompt(original_text, reference_text, rule_text);
        info!("Requesting caption rewrite from {} ({} chars)", self.generator.describe(), prompt.len());

        let raw = self.generator.generate(&prompt).await?;

        let report = SrtCanonicalizer::inspect(&raw);
        let rejected = report.rejected().count();
        if rejected > 0 {
            warn!("Dropped {} malformed block(s) from the rewrite", rejected);
        }

        let document = report.into_document();
        let out_of_order = document.out_of_order_count();
        if out_of_order > 0 {
            warn!("{} rewritten cue(s) start before the preceding cue", out_of_order);
        }
        info!("Rewrite produced {} cue(s)", document.len());
        Ok(document)
    }
}
