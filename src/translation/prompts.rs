/*!
 * System prompt builders.
 *
 * Prompts instruct the model to treat chunk payloads as JSON objects keyed
 * by segment number and to answer in the same shape, which is what the
 * reassembly side parses. Content here is deliberately minimal; prompt
 * tuning is not this crate's concern.
 */

use crate::glossary::Glossary;
use crate::language_utils::prompt_language_name;

/// System prompt for translating one chunk payload
pub fn translation_prompt(
    target_language: &str,
    glossary: Option<&Glossary>,
    chunk_text: &str,
    custom_prompt: Option<&str>,
) -> String {
    let language = prompt_language_name(target_language);
    let mut prompt = format!(
        "You are a professional machine translation engine.\n\
         You receive a JSON object whose keys are segment numbers and whose values are source segments.\n\
         Translate every value into {language}.\n\
         Requirements:\n\
         - Keep the keys exactly as they are and translate values only.\n\
         - Preserve formatting, line breaks, markup and placeholders inside each value.\n\
         - If a value is already in {language}, keep it unchanged.\n\
         - Respond with the JSON object only, no explanations and no code fences.\n\
         Example input: {{\"0\":\"hello\",\"1\":\"goodbye\"}}\n\
         Example output for French: {{\"0\":\"bonjour\",\"1\":\"au revoir\"}}",
        language = language
    );
    if let Some(glossary) = glossary {
        if let Some(section) = glossary.prompt_section(chunk_text) {
            prompt.push('\n');
            prompt.push_str(&section);
        }
    }
    if let Some(custom) = custom_prompt {
        prompt.push_str("\nAdditional instructions:\n");
        prompt.push_str(custom);
    }
    prompt
}

/// System prompt for the glossary extraction pre-pass
pub fn glossary_prompt(target_language: &str) -> String {
    let language = prompt_language_name(target_language);
    format!(
        "You are a professional glossary extractor.\n\
         You receive a JSON object whose keys are paragraph numbers and whose values are paragraph contents.\n\
         Extract person names, organization names and location names, and translate each term into {language}.\n\
         Requirements:\n\
         - src must match the original term exactly; dst is its {language} translation.\n\
         - Each src appears at most once.\n\
         - Do not include common nouns.\n\
         Output a plain JSON list: [{{\"src\":\"<original term>\",\"dst\":\"<translated term>\"}}]\n\
         Respond with the JSON list only, no explanations and no code fences.",
        language = language
    )
}
