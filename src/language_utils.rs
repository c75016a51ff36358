use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for platform language tags
///
/// Caption tracks are tagged with BCP-47 style tags (`te`, `en-US`,
/// `pt-BR`). Only the primary subtag is checked against ISO 639; region and
/// script subtags pass through untouched.

/// Primary language subtag, lowercased (`en-US` -> `en`)
pub fn primary_subtag(tag: &str) -> String {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn lookup(tag: &str) -> Option<Language> {
    let primary = primary_subtag(tag);
    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => Language::from_639_3(&primary),
        _ => None,
    }
}

/// Validate that the primary subtag is a known ISO 639-1 or 639-3 code
pub fn validate_language_tag(tag: &str) -> Result<()> {
    lookup(tag)
        .map(|_| ())
        .ok_or_else(|| anyhow!("Invalid language tag: {}", tag))
}

/// English name of the tag's language (`te` -> `Telugu`)
pub fn get_language_name(tag: &str) -> Result<String> {
    lookup(tag)
        .map(|lang| lang.to_name().to_string())
        .ok_or_else(|| anyhow!("Unknown language tag: {}", tag))
}

/// Human label for prompts and track names, falling back to the raw tag
pub fn display_name(tag: &str) -> String {
    get_language_name(tag).unwrap_or_else(|_| tag.trim().to_string())
}

/// Track name for a caption that carries a transliteration plus a translation
pub fn default_track_name(caption_tag: &str, translation_tag: &str) -> String {
    format!("{} + {} Meaning", display_name(caption_tag), display_name(translation_tag))
}
