// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as chunk overlap bounds and threshold ranges.

use crate::diagnostic::ConfigError;
use crate::model::{MAX_CONCURRENT_BATCHES, MemoraConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MemoraConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.agent.log_level.as_str()) {
        fail(format!(
            "agent.log_level `{}` must be one of {}",
            config.agent.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let embedding = &config.embedding;
    if embedding.model.trim().is_empty() {
        fail("embedding.model must not be empty".to_string());
    }
    if embedding.dimensions == Some(0) {
        fail("embedding.dimensions must be at least 1".to_string());
    }
    if embedding.batch_size < 1 {
        fail(format!(
            "embedding.batch_size must be at least 1, got {}",
            embedding.batch_size
        ));
    }
    if !(1..=MAX_CONCURRENT_BATCHES).contains(&embedding.max_concurrent_batches) {
        fail(format!(
            "embedding.max_concurrent_batches must be between 1 and {MAX_CONCURRENT_BATCHES}, got {}",
            embedding.max_concurrent_batches
        ));
    }
    if embedding.queue_capacity < 1 {
        fail(format!(
            "embedding.queue_capacity must be at least 1, got {}",
            embedding.queue_capacity
        ));
    }
    if embedding.await_timeout_ms == 0 {
        fail("embedding.await_timeout_ms must be greater than 0".to_string());
    }

    if config.memory.chunk_size == 0 {
        fail("memory.chunk_size must be greater than 0".to_string());
    } else if config.memory.chunk_overlap >= config.memory.chunk_size {
        fail(format!(
            "memory.chunk_overlap ({}) must be smaller than memory.chunk_size ({})",
            config.memory.chunk_overlap, config.memory.chunk_size
        ));
    }

    let threshold = config.retrieval.similarity_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        fail(format!(
            "retrieval.similarity_threshold must be within [0, 1], got {threshold}"
        ));
    }

    if let Some(provider) = &config.llm.default_provider {
        if provider.trim().is_empty() {
            fail("llm.default_provider must not be empty when set".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
