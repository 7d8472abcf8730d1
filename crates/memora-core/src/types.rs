// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity and envelope types shared across Memora crates.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

use crate::error::MemoraError;

/// Free-form metadata attached to sessions and memories.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Generates a fresh entity identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC time as an RFC 3339 string with microsecond precision.
///
/// Microseconds keep insertion order stable for rows written within the
/// same millisecond.
pub fn timestamp_now() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.6fZ")
        .to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Embedding,
    Chat,
    Storage,
}

// --- Conversation entities ---

/// A named, persistent conversation context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    /// Unique human-facing name; sessions are resolved by name.
    pub name: String,
    pub metadata: Metadata,
    pub created_at: String,
}

/// Author of a conversation message.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    /// Parses a role name, rejecting anything outside the fixed set.
    pub fn parse(value: &str) -> Result<Self, MemoraError> {
        value.parse().map_err(|_| {
            MemoraError::validation(
                "role",
                format!("`{value}` is not one of system, user, assistant, tool"),
            )
        })
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A single append-only message in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub role: Role,
    /// Structured payload. Plain text turns are stored as `{"text": "..."}`.
    pub content: serde_json::Value,
    pub tool_name: Option<String>,
    pub created_at: String,
}

impl Message {
    /// Builds a plain-text message stamped with a fresh id and the current time.
    pub fn text(session_id: &str, role: Role, text: &str) -> Self {
        Self {
            id: new_id(),
            session_id: session_id.to_string(),
            role,
            content: serde_json::json!({ "text": text }),
            tool_name: None,
            created_at: timestamp_now(),
        }
    }

    /// Returns the primary text of the payload, if it has one.
    pub fn primary_text(&self) -> Option<&str> {
        match &self.content {
            serde_json::Value::String(s) => Some(s.as_str()),
            serde_json::Value::Object(map) => map.get("text").and_then(|v| v.as_str()),
            _ => None,
        }
    }
}

// --- Knowledge entities ---

/// Category of a stored memory.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MemoryKind {
    Note,
    Fact,
    Doc,
    Code,
    Event,
}

impl MemoryKind {
    /// Parses a kind name, rejecting anything outside the fixed set.
    pub fn parse(value: &str) -> Result<Self, MemoraError> {
        value.parse().map_err(|_| {
            MemoraError::validation(
                "kind",
                format!("`{value}` is not one of note, fact, doc, code, event"),
            )
        })
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// A stored unit of knowledge. `session_id = None` means global.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: String,
    pub kind: MemoryKind,
    pub text: String,
    pub metadata: Metadata,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub session_id: Option<String>,
    pub created_at: String,
}

/// An independently embedded segment of a memory's text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryChunk {
    pub id: String,
    pub memory_id: String,
    pub text: String,
    /// Populated by the embedding pipeline; transiently `None` when deferred.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: String,
}

// --- Similarity search ---

/// Which memories a similarity query may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkScope {
    /// Only memories with no session.
    Global,
    /// Only memories owned by the session.
    Session(String),
    /// Global memories plus those owned by the session.
    SessionWithGlobal(String),
}

impl ChunkScope {
    /// Resolves the scope from an optional session and the global toggle.
    pub fn resolve(session_id: Option<&str>, include_global: bool) -> Self {
        match session_id {
            None => ChunkScope::Global,
            Some(id) if include_global => ChunkScope::SessionWithGlobal(id.to_string()),
            Some(id) => ChunkScope::Session(id.to_string()),
        }
    }
}

/// A nearest-neighbor query against stored chunks.
#[derive(Debug, Clone)]
pub struct ChunkSearch {
    pub embedding: Vec<f32>,
    pub scope: ChunkScope,
    /// Minimum cosine similarity (inclusive).
    pub threshold: f64,
    pub limit: usize,
}

/// A ranked chunk returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkMatch {
    pub chunk_id: String,
    pub text: String,
    pub memory_id: String,
    pub kind: MemoryKind,
    pub session_id: Option<String>,
    /// `1 - cosine_distance`; higher is more similar.
    pub score: f64,
}

// --- LLM envelope ---

/// One message sent to a chat-completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call options for chat providers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatOptions {
    /// Explicit provider name; overrides the configured default.
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Token accounting reported by a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single completion alternative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

/// Provider-independent completion envelope. Each provider normalizes its
/// native response into this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEnvelope {
    pub choices: Vec<Choice>,
    pub usage: Usage,
    pub model: String,
}

impl ChatEnvelope {
    /// Builds a single-choice assistant envelope.
    pub fn single(model: impl Into<String>, content: impl Into<String>, usage: Usage) -> Self {
        Self {
            choices: vec![Choice {
                message: ChatMessage::assistant(content),
                finish_reason: Some("stop".to_string()),
            }],
            usage,
            model: model.into(),
        }
    }

    /// Content of the first choice, if any.
    pub fn first_content(&self) -> Option<&str> {
        self.choices.first().map(|c| c.message.content.as_str())
    }
}
