//! Domain vocabulary: synonym table, stop words, important terms
//!
//! Loaded as configuration data so the support-domain vocabulary can grow
//! without touching retrieval logic. The defaults cover the car-detailing
//! corpus, which mixes Italian and English terminology.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Vocabulary used by query expansion, sparse-query token filtering and
/// lexical scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    /// Function words dropped from sparse-query token lists
    #[serde(default)]
    pub stop_words: BTreeSet<String>,

    /// Domain-salient terms: always kept in sparse-query token lists
    /// regardless of length, and worth more in lexical overlap scoring
    #[serde(default)]
    pub important_terms: BTreeSet<String>,

    /// term -> synonyms, unioned into the expanded query when the term
    /// occurs as a substring of the lower-cased query
    #[serde(default)]
    pub synonyms: BTreeMap<String, Vec<String>>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        let synonyms: BTreeMap<String, Vec<String>> = [
            (
                "ppf",
                vec![
                    "pellicola",
                    "film",
                    "protection film",
                    "paint protection",
                    "pellicola protettiva",
                ],
            ),
            (
                "pellicola",
                vec!["ppf", "film", "protection film", "paint protection"],
            ),
            (
                "ingiallita",
                vec!["yellowed", "yellowing", "gialla", "ingiallimento"],
            ),
            (
                "carteggiatura",
                vec!["sanding", "sand", "levigare", "levigatura"],
            ),
            ("bug", vec!["insetto", "insetti", "moscerini", "bug remover"]),
            ("insetti", vec!["bug", "bugs", "moscerini", "insect"]),
            (
                "vetro",
                vec!["vetri", "glass", "windshield", "parabrezza", "cristallo"],
            ),
            (
                "parabrezza",
                vec!["windshield", "vetro", "glass", "windscreen"],
            ),
            ("interni", vec!["interno", "interior", "abitacolo", "cruscotto"]),
            (
                "lucidatura",
                vec!["polish", "polishing", "lucidare", "correzione"],
            ),
        ]
        .into_iter()
        .map(|(term, syns)| {
            (
                term.to_string(),
                syns.into_iter().map(str::to_string).collect(),
            )
        })
        .collect();

        let stop_words: BTreeSet<String> = [
            // Italian function words
            "il", "lo", "la", "le", "gli", "un", "una", "uno", "di", "del", "della", "delle",
            "dei", "da", "in", "con", "su", "per", "tra", "fra", "che", "chi", "cosa", "come",
            "dove", "quando", "quale", "quali", "non", "si", "al", "alla", "alle", "ai", "nel",
            "nella", "sulla", "sul", "ed", "anche", "sono", "essere", "fare", "devo", "posso",
            "vorrei", "mia", "mio", "miei", "mie", "questo", "questa", "ciao", "salve", "grazie",
            // English function words
            "the", "and", "for", "with", "what", "how", "can", "could", "should", "this", "that",
            "from", "have", "does", "are", "you", "your", "about",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        let important_terms: BTreeSet<String> = [
            "ppf",
            "pellicola",
            "ingiallita",
            "carteggiatura",
            "bug",
            "vetro",
            "parabrezza",
        ]
        .into_iter()
        .map(str::to_string)
        .collect();

        Self {
            synonyms,
            stop_words,
            important_terms,
        }
    }
}
