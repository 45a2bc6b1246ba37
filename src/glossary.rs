/*!
 * Glossary model.
 *
 * A glossary maps source terms to their fixed target-language translations.
 * It is assembled once per document — user-supplied, model-extracted, or a
 * merge of both — and shared read-only by every translation job.
 */

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One extracted term alignment, as returned by the glossary agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TermPair {
    /// Term as it appears in the source text
    pub src: String,
    /// Fixed translation in the target language
    pub dst: String,
}

/// Source term to target term mapping
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Glossary {
    terms: BTreeMap<String, String>,
}

impl Glossary {
    /// Create an empty glossary
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a glossary from an existing term table
    pub fn from_terms(terms: BTreeMap<String, String>) -> Self {
        Glossary { terms }
    }

    /// Merge another term table in, keeping existing entries on conflict.
    ///
    /// User-supplied terms are merged after generated ones so an explicit
    /// mapping always wins by being inserted first.
    pub fn merge(&mut self, terms: impl IntoIterator<Item = (String, String)>) {
        for (src, dst) in terms {
            self.terms.entry(src).or_insert(dst);
        }
    }

    /// Number of term mappings
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the glossary holds no terms
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Look up the fixed translation for a source term
    pub fn get(&self, src: &str) -> Option<&str> {
        self.terms.get(src).map(|s| s.as_str())
    }

    /// Iterate over all (source, target) pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms.iter().map(|(s, d)| (s.as_str(), d.as_str()))
    }

    /// Render the prompt section for one chunk.
    ///
    /// Only terms actually occurring in `text` are listed, keeping prompts
    /// small for large glossaries. Returns None when nothing applies.
    pub fn prompt_section(&self, text: &str) -> Option<String> {
        let mut lines: Vec<String> = Vec::new();
        for (src, dst) in self.iter() {
            if text.contains(src) {
                lines.push(format!("{} => {}", src, dst));
            }
        }
        if lines.is_empty() {
            return None;
        }
        Some(format!(
            "Reference glossary (use these fixed translations):\n{}\nEnd of glossary.",
            lines.join("\n")
        ))
    }
}

impl FromIterator<(String, String)> for Glossary {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Glossary {
            terms: iter.into_iter().collect(),
        }
    }
}
