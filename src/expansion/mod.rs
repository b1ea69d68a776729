//! Query expansion with domain synonyms
//!
//! Maps a free-text query to an enlarged term set using the configured
//! synonym table. Matching is exact substring containment of the table term
//! in the lower-cased query; no stemming or fuzzy matching.

use crate::config::Vocabulary;
use std::collections::BTreeSet;

/// Pure query expander over a [`Vocabulary`].
#[derive(Debug, Clone)]
pub struct QueryExpander {
    vocabulary: Vocabulary,
}

impl QueryExpander {
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self { vocabulary }
    }

    /// Lower-case and whitespace-tokenize the query, then union in the
    /// synonym list of every table term contained in the lowered query.
    pub fn expand(&self, query: &str) -> BTreeSet<String> {
        let lowered = query.to_lowercase();
        let mut expanded: BTreeSet<String> =
            lowered.split_whitespace().map(str::to_string).collect();

        for (term, synonyms) in &self.vocabulary.synonyms {
            if lowered.contains(term.as_str()) {
                expanded.extend(synonyms.iter().cloned());
            }
        }

        expanded
    }

    /// Tokens worth sending to the sparse index: important terms are always
    /// kept, stop words are always dropped, everything else must be at
    /// least four characters. Raw BM25 over unfiltered Italian/English
    /// queries is dominated by function words; this concentrates scoring on
    /// domain-salient tokens.
    pub fn sparse_query_tokens(&self, expanded: &BTreeSet<String>) -> Vec<String> {
        expanded
            .iter()
            .filter(|token| {
                if self.vocabulary.important_terms.contains(token.as_str()) {
                    return true;
                }
                if self.vocabulary.stop_words.contains(token.as_str()) {
                    return false;
                }
                token.chars().count() >= 4
            })
            .cloned()
            .collect()
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }
}
