// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Memora configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoraConfig {
    /// Process identity and logging.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding model and batch coordinator settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Memory ingestion settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Retrieval defaults.
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Chat turn defaults.
    #[serde(default)]
    pub chat: ChatConfig,

    /// LLM provider selection.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// Process identity and logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_agent_name() -> String {
    "memora".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("memora").join("memora.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("memora.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Embedding model and batch coordinator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Embedding model name passed to the provider.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Overrides the model's built-in vector dimension.
    #[serde(default)]
    pub dimensions: Option<usize>,

    /// Jobs drained into one batch before it is dispatched early.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// How long the first job of a batch waits for company.
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,

    /// Batches processed concurrently, at most [`MAX_CONCURRENT_BATCHES`].
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Bound on queued jobs; beyond it `enqueue` fails with `Overloaded`.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Default deadline for awaiting an embedding token.
    #[serde(default = "default_await_timeout_ms")]
    pub await_timeout_ms: u64,

    /// Tokens never awaited are dropped after this long.
    #[serde(default = "default_pending_ttl_secs")]
    pub pending_ttl_secs: u64,
}

/// Upper bound on `embedding.max_concurrent_batches`.
pub const MAX_CONCURRENT_BATCHES: usize = 256;

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            dimensions: None,
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            max_concurrent_batches: default_max_concurrent_batches(),
            queue_capacity: default_queue_capacity(),
            await_timeout_ms: default_await_timeout_ms(),
            pending_ttl_secs: default_pending_ttl_secs(),
        }
    }
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_batch_timeout_ms() -> u64 {
    50
}

fn default_max_concurrent_batches() -> usize {
    4
}

fn default_queue_capacity() -> usize {
    1024
}

fn default_await_timeout_ms() -> u64 {
    30_000
}

fn default_pending_ttl_secs() -> u64 {
    300
}

/// Memory ingestion configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Maximum characters per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Persist first with null embeddings and fill them in asynchronously.
    #[serde(default)]
    pub defer_embeddings: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            defer_embeddings: false,
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    100
}

/// Retrieval defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,

    /// Minimum cosine similarity for a chunk to be returned.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f64,

    /// Include global memories in session-scoped queries.
    #[serde(default = "default_true")]
    pub include_global: bool,

    /// Decimal places scores are rounded to.
    #[serde(default = "default_score_precision")]
    pub score_precision: u32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            similarity_threshold: default_similarity_threshold(),
            include_global: true,
            score_precision: default_score_precision(),
        }
    }
}

fn default_k() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.7
}

fn default_true() -> bool {
    true
}

fn default_score_precision() -> u32 {
    3
}

/// Chat turn defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ChatConfig {
    /// Number of prior messages included in each prompt.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Fixed preamble that opens every assembled prompt.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
            system_prompt: default_system_prompt(),
        }
    }
}

fn default_max_history() -> usize {
    10
}

fn default_system_prompt() -> String {
    "You are a helpful assistant with access to a knowledge base. \
     Use the relevant context and conversation history below when they help \
     answer the user's message."
        .to_string()
}

/// LLM provider selection.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LlmConfig {
    /// Provider used when a call names none. `None` means the builtin default.
    #[serde(default)]
    pub default_provider: Option<String>,

    /// Model passed to the provider when a call names none.
    #[serde(default)]
    pub default_model: Option<String>,
}
