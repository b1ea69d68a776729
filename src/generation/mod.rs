//! Generation collaborator boundary and the multi-draft driver
//!
//! The language model is external; this module pins its contract and
//! drives multi-draft generation. Drafts are generated sequentially, one
//! after another: concurrent calls against a single shared inference
//! backend cause context switching and memory pressure that make parallel
//! drafts slower in aggregate. Diversity comes from a fixed ascending
//! temperature schedule instead. A failed draft records its error text in
//! place and never aborts the remaining drafts.

mod prompt;

pub use prompt::build_prompt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Temperature schedule for draft diversity: conservative first, then
/// progressively more creative.
pub const DRAFT_TEMPERATURES: [f32; 5] = [0.3, 0.5, 0.7, 0.8, 0.9];

/// Temperature for the draft at `index`; the schedule's last entry repeats
/// for any further drafts.
pub fn draft_temperature(index: usize) -> f32 {
    DRAFT_TEMPERATURES[index.min(DRAFT_TEMPERATURES.len() - 1)]
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Generation backend unreachable: {0}")]
    BackendUnavailable(String),

    #[error("Generation failed: {0}")]
    Failed(String),
}

/// Response language. The corpus is Italian-first with English terminology
/// mixed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Italian,
    English,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Italian => "italian",
            Language::English => "english",
        }
    }
}

/// Language-model collaborator contract. Implementations must surface
/// failure distinctly from success so one draft's failure cannot corrupt
/// the others.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<String, GenerationError>;

    fn model_name(&self) -> &str;
}

/// One generated draft. On failure `text` carries the error message and
/// `failed` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Draft {
    pub text: String,
    pub temperature: f32,
    pub draft_number: usize,
    pub failed: bool,
}

/// Generate `num_drafts` drafts sequentially. Never fails as a whole: each
/// draft either succeeds or records its error.
pub fn generate_drafts(
    generator: &dyn Generator,
    prompt: &str,
    num_drafts: usize,
    max_tokens: usize,
) -> Vec<Draft> {
    let num_drafts = num_drafts.max(1);
    let mut drafts = Vec::with_capacity(num_drafts);

    for i in 0..num_drafts {
        let draft_number = i + 1;
        let temperature = draft_temperature(i);
        tracing::info!(
            draft = draft_number,
            total = num_drafts,
            temperature,
            "Generating draft"
        );

        match generator.generate(prompt, temperature, max_tokens) {
            Ok(text) => drafts.push(Draft {
                text,
                temperature,
                draft_number,
                failed: false,
            }),
            Err(e) => {
                tracing::error!(draft = draft_number, error = %e, "Draft generation failed");
                drafts.push(Draft {
                    text: format!("Error generating draft: {e}"),
                    temperature,
                    draft_number,
                    failed: true,
                });
            }
        }
    }

    drafts
}
