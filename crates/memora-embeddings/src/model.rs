// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding model to vector dimension lookup.

use memora_config::model::EmbeddingConfig;

/// Dimension assumed for models missing from the table.
pub const DEFAULT_DIMENSION: usize = 1536;

/// Known embedding models and the length of the vectors they produce.
const MODEL_DIMENSIONS: &[(&str, usize)] = &[
    ("text-embedding-3-small", 1536),
    ("text-embedding-3-large", 3072),
    ("text-embedding-ada-002", 1536),
];

/// Vector dimension for `model`, or [`DEFAULT_DIMENSION`] if unrecognized.
pub fn dimension_for_model(model: &str) -> usize {
    MODEL_DIMENSIONS
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, dim)| *dim)
        .unwrap_or(DEFAULT_DIMENSION)
}

/// Whether `model` has an entry in the dimension table.
pub fn is_known_model(model: &str) -> bool {
    MODEL_DIMENSIONS.iter().any(|(name, _)| *name == model)
}

/// The configured dimension override, falling back to the model table.
pub fn resolve_dimension(config: &EmbeddingConfig) -> usize {
    config
        .dimensions
        .unwrap_or_else(|| dimension_for_model(&config.model))
}
