//! Configuration validation

use super::Config;
use crate::error::{Result, RispostaError, ValidationError};

pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate a configuration, collecting every failure before reporting.
    pub fn validate(config: &Config) -> Result<()> {
        let mut errors = Vec::new();

        Self::validate_fusion(config, &mut errors);
        Self::validate_retrieval(config, &mut errors);
        Self::validate_context(config, &mut errors);
        Self::validate_cache(config, &mut errors);
        Self::validate_embedding(config, &mut errors);
        Self::validate_generation(config, &mut errors);
        Self::validate_vocabulary(config, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RispostaError::ConfigValidation { errors })
        }
    }

    fn validate_fusion(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.fusion.dense <= 0.0 {
            errors.push(ValidationError::new(
                "fusion.dense",
                "dense weight must be positive",
            ));
        }
        if config.fusion.sparse <= 0.0 {
            errors.push(ValidationError::new(
                "fusion.sparse",
                "sparse weight must be positive",
            ));
        }
        if config.fusion.lexical < 0.0 {
            errors.push(ValidationError::new(
                "fusion.lexical",
                "lexical weight must be non-negative",
            ));
        }
    }

    fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
        let channels = &config.retrieval.channels;
        if channels.dense_multiplier == 0 || channels.dense_floor == 0 {
            errors.push(ValidationError::new(
                "retrieval.channels",
                "dense multiplier and floor must be positive",
            ));
        }
        if channels.sparse_multiplier == 0 || channels.sparse_cap == 0 {
            errors.push(ValidationError::new(
                "retrieval.channels",
                "sparse multiplier and cap must be positive",
            ));
        }
        if channels.fallback_factor == 0 {
            errors.push(ValidationError::new(
                "retrieval.channels.fallback_factor",
                "fallback factor must be positive",
            ));
        }
        if config.retrieval.fused_pool_multiplier == 0 || config.retrieval.rerank_multiplier == 0 {
            errors.push(ValidationError::new(
                "retrieval",
                "fused pool and rerank multipliers must be positive",
            ));
        }
    }

    fn validate_context(config: &Config, errors: &mut Vec<ValidationError>) {
        let context = &config.context;
        if context.max_tickets == 0 && context.max_guides == 0 {
            errors.push(ValidationError::new(
                "context",
                "at least one source type must allow items",
            ));
        }
        if context.max_item_len == 0 || context.max_total_len == 0 {
            errors.push(ValidationError::new(
                "context",
                "item and total length limits must be positive",
            ));
        }
        if context.min_tail_len >= context.max_total_len {
            errors.push(ValidationError::new(
                "context.min_tail_len",
                "minimum tail must be smaller than the total budget",
            ));
        }
    }

    fn validate_cache(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.cache.ttl_secs <= 0 {
            errors.push(ValidationError::new(
                "cache.ttl_secs",
                "TTL must be positive",
            ));
        }
    }

    fn validate_embedding(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.embedding.dimension == 0 {
            errors.push(ValidationError::new(
                "embedding.dimension",
                "dimension must be positive",
            ));
        }
        if config.embedding.batch_size == 0 {
            errors.push(ValidationError::new(
                "embedding.batch_size",
                "batch size must be positive",
            ));
        }
    }

    fn validate_generation(config: &Config, errors: &mut Vec<ValidationError>) {
        if config.generation.max_tokens == 0 {
            errors.push(ValidationError::new(
                "generation.max_tokens",
                "max tokens must be positive",
            ));
        }
        if config.generation.model.is_empty() {
            errors.push(ValidationError::new(
                "generation.model",
                "model must not be empty",
            ));
        }
    }

    fn validate_vocabulary(config: &Config, errors: &mut Vec<ValidationError>) {
        for (term, synonyms) in &config.vocabulary.synonyms {
            if synonyms.is_empty() {
                errors.push(ValidationError::new(
                    format!("vocabulary.synonyms.{term}"),
                    "synonym list must not be empty",
                ));
            }
        }
        for term in &config.vocabulary.important_terms {
            if config.vocabulary.stop_words.contains(term) {
                errors.push(ValidationError::new(
                    format!("vocabulary.important_terms.{term}"),
                    "term cannot be both important and a stop word",
                ));
            }
        }
    }
}
