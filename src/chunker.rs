/*!
 * Size-bounded chunking of fragments.
 *
 * Fragments are grouped into chunks by greedy bin-packing in source order:
 * the running character total of a chunk stays within the configured ceiling,
 * and a fragment is never split across chunks. A single fragment larger than
 * the ceiling becomes its own chunk rather than being truncated or dropped.
 */

use crate::document::{Fragment, FragmentId};

/// An ordered group of fragments sent together in one LLM call
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Position of the chunk in dispatch order
    pub index: usize,
    /// Fragment ids and their text, in source order
    pub fragments: Vec<(FragmentId, String)>,
}

impl Chunk {
    /// Total character count of the chunk's fragment text
    pub fn char_count(&self) -> usize {
        self.fragments.iter().map(|(_, t)| t.chars().count()).sum()
    }

    /// Number of fragments in the chunk
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// A chunk is never empty by construction
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Group translatable fragments into chunks of at most `max_size` characters.
///
/// Non-translatable fragments are skipped here; they never reach the model
/// and are restored verbatim at reassembly. Fragment order is preserved
/// within and across chunks.
pub fn chunk_fragments(fragments: &[Fragment], max_size: usize) -> Vec<Chunk> {
    let mut chunks: Vec<Chunk> = Vec::new();
    let mut current: Vec<(FragmentId, String)> = Vec::new();
    let mut current_chars = 0usize;

    for fragment in fragments.iter().filter(|f| f.translatable) {
        let len = fragment.len_chars();
        if !current.is_empty() && current_chars + len > max_size {
            chunks.push(Chunk {
                index: chunks.len(),
                fragments: std::mem::take(&mut current),
            });
            current_chars = 0;
        }
        current.push((fragment.id, fragment.text.clone()));
        current_chars += len;
        // An oversized fragment closes its own singleton chunk immediately
        if current_chars > max_size {
            chunks.push(Chunk {
                index: chunks.len(),
                fragments: std::mem::take(&mut current),
            });
            current_chars = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(Chunk {
            index: chunks.len(),
            fragments: current,
        });
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::FragmentContext;

    fn fragments(texts: &[&str]) -> Vec<Fragment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Fragment::new(i, *t, FragmentContext::Block { index: i }))
            .collect()
    }

    #[test]
    fn test_chunks_should_respect_size_ceiling() {
        let frags = fragments(&["aaaa", "bbbb", "cccc", "dddd"]);
        let chunks = chunk_fragments(&frags, 8);
        assert_eq!(chunks.len(), 2);
        for chunk in &chunks {
            assert!(chunk.char_count() <= 8);
            assert!(!chunk.is_empty());
        }
    }

    #[test]
    fn test_oversized_fragment_should_become_singleton_chunk() {
        let frags = fragments(&["aa", "this fragment is far larger than the ceiling", "bb"]);
        let chunks = chunk_fragments(&frags, 10);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].len(), 1, "oversized fragment travels alone");
        assert!(chunks[1].char_count() > 10);
        assert_eq!(chunks[0].fragments[0].1, "aa");
        assert_eq!(chunks[2].fragments[0].1, "bb");
    }

    #[test]
    fn test_order_should_be_preserved_across_chunks() {
        let frags = fragments(&["one", "two", "three", "four", "five"]);
        let chunks = chunk_fragments(&frags, 7);
        let flattened: Vec<&str> = chunks
            .iter()
            .flat_map(|c| c.fragments.iter().map(|(_, t)| t.as_str()))
            .collect();
        assert_eq!(flattened, vec!["one", "two", "three", "four", "five"]);
        // Chunk indexes are dense and ascending
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
        }
    }

    #[test]
    fn test_non_translatable_fragments_should_be_skipped() {
        let mut frags = fragments(&["keep", "skip", "keep too"]);
        frags[1].translatable = false;
        let chunks = chunk_fragments(&frags, 100);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].len(), 2);
    }

    #[test]
    fn test_empty_input_should_yield_no_chunks() {
        assert!(chunk_fragments(&[], 100).is_empty());
    }
}
