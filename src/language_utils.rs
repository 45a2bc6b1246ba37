use isolang::Language;

/// Language utilities for target-language handling
///
/// The target language reaches the pipeline as whatever the caller typed: an
/// ISO 639-1 or 639-3 code, an English language name, or a free-form name the
/// model understands directly. Prompts carry a readable English name whenever
/// one can be resolved; unresolvable inputs are passed through verbatim.
/// Resolve a language code or name to an isolang entry
pub fn resolve_language(input: &str) -> Option<Language> {
    let trimmed = input.trim();
    if trimmed.len() == 2 {
        if let Some(lang) = Language::from_639_1(&trimmed.to_lowercase()) {
            return Some(lang);
        }
    }
    if trimmed.len() == 3 {
        if let Some(lang) = Language::from_639_3(&trimmed.to_lowercase()) {
            return Some(lang);
        }
    }
    Language::from_name(trimmed)
}

/// English display name used in translation prompts.
///
/// Falls back to the raw input so names the model understands but isolang
/// does not ("Simplified Chinese") still work.
pub fn prompt_language_name(input: &str) -> String {
    match resolve_language(input) {
        Some(lang) => lang.to_name().to_string(),
        None => input.trim().to_string(),
    }
}

/// Whether two language specifiers denote the same language
pub fn languages_match(a: &str, b: &str) -> bool {
    match (resolve_language(a), resolve_language(b)) {
        (Some(la), Some(lb)) => la == lb,
        _ => a.trim().eq_ignore_ascii_case(b.trim()),
    }
}
