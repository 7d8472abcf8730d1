// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Memora backend.
//!
//! Every component returns [`MemoraError`]. Transport layers should not match
//! on the variants directly; they call [`MemoraError::reason`] and map the
//! resulting [`ErrorReason`] tag onto their own status codes.

use std::time::Duration;

use serde::Serialize;
use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// The primary error type used across all Memora traits and services.
#[derive(Debug, Error)]
pub enum MemoraError {
    /// Configuration errors (invalid TOML, inconsistent values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed attributes: missing field, out-of-enum kind or role.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Storage backend errors (connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The embedding provider failed for a text.
    #[error("embedding failed: {reason}")]
    EmbeddingFailed { reason: String },

    /// The retrieval stage of a chat turn failed.
    #[error("retrieval failed: {reason}")]
    RetrievalFailed { reason: String },

    /// The LLM dispatch stage of a chat turn failed.
    #[error("llm failed: {reason}")]
    LlmFailed { reason: String },

    /// An awaited result did not arrive before its deadline. The outcome is
    /// unknown, not failed.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// No session is registered under the given name.
    #[error("session not found: {name}")]
    SessionNotFound { name: String },

    /// The requested LLM provider is not registered.
    #[error("unknown LLM provider `{name}`; valid providers: {}", valid.join(", "))]
    UnknownProvider { name: String, valid: Vec<String> },

    /// The provider does not implement the requested operation.
    #[error("{operation} is not implemented by provider `{provider}`")]
    NotImplemented {
        provider: String,
        operation: &'static str,
    },

    /// A vector does not have the dimensionality of the configured model.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The embedding queue is full.
    #[error("embedding queue is full (capacity {capacity})")]
    Overloaded { capacity: usize },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Closed set of error tags surfaced to callers.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize,
)]
#[strum(serialize_all = "camelCase")]
#[serde(rename_all = "camelCase")]
pub enum ErrorReason {
    Validation,
    EmbeddingFailed,
    RetrievalFailed,
    LlmFailed,
    Timeout,
    NotFound,
    SessionNotFound,
    UnknownProvider,
    NotImplemented,
    Overloaded,
    Storage,
    Config,
    Internal,
}

impl MemoraError {
    /// Shorthand for a [`MemoraError::Validation`] error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MemoraError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`MemoraError::NotFound`] error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        MemoraError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Wraps any displayable storage failure.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        MemoraError::Storage {
            source: err.to_string().into(),
        }
    }

    /// Returns the tag used by transport adapters for this error.
    pub fn reason(&self) -> ErrorReason {
        match self {
            MemoraError::Config(_) => ErrorReason::Config,
            MemoraError::Validation { .. } => ErrorReason::Validation,
            MemoraError::Storage { .. } => ErrorReason::Storage,
            MemoraError::EmbeddingFailed { .. } => ErrorReason::EmbeddingFailed,
            MemoraError::RetrievalFailed { .. } => ErrorReason::RetrievalFailed,
            MemoraError::LlmFailed { .. } => ErrorReason::LlmFailed,
            MemoraError::Timeout { .. } => ErrorReason::Timeout,
            MemoraError::NotFound { .. } => ErrorReason::NotFound,
            MemoraError::SessionNotFound { .. } => ErrorReason::SessionNotFound,
            MemoraError::UnknownProvider { .. } => ErrorReason::UnknownProvider,
            MemoraError::NotImplemented { .. } => ErrorReason::NotImplemented,
            MemoraError::DimensionMismatch { .. } => ErrorReason::Validation,
            MemoraError::Overloaded { .. } => ErrorReason::Overloaded,
            MemoraError::Internal(_) => ErrorReason::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_tags_render_camel_case() {
        assert_eq!(ErrorReason::EmbeddingFailed.to_string(), "embeddingFailed");
        assert_eq!(ErrorReason::LlmFailed.to_string(), "llmFailed");
        assert_eq!(ErrorReason::SessionNotFound.to_string(), "sessionNotFound");
        let parsed: ErrorReason = "retrievalFailed".parse().unwrap();
        assert_eq!(parsed, ErrorReason::RetrievalFailed);
    }

    #[test]
    fn every_error_maps_to_a_reason() {
        let cases = [
            (MemoraError::validation("kind", "bad"), ErrorReason::Validation),
            (
                MemoraError::EmbeddingFailed { reason: "x".into() },
                ErrorReason::EmbeddingFailed,
            ),
            (
                MemoraError::Timeout {
                    duration: Duration::from_millis(5),
                },
                ErrorReason::Timeout,
            ),
            (MemoraError::not_found("memory", "m1"), ErrorReason::NotFound),
            (
                MemoraError::SessionNotFound { name: "s".into() },
                ErrorReason::SessionNotFound,
            ),
            (MemoraError::storage("disk full"), ErrorReason::Storage),
            (
                MemoraError::DimensionMismatch {
                    expected: 3,
                    actual: 2,
                },
                ErrorReason::Validation,
            ),
        ];
        for (err, reason) in cases {
            assert_eq!(err.reason(), reason, "wrong reason for {err}");
        }
    }

    #[test]
    fn unknown_provider_lists_valid_names() {
        let err = MemoraError::UnknownProvider {
            name: "nope".into(),
            valid: vec!["anthropic".into(), "openai".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("nope"));
        assert!(msg.contains("anthropic, openai"));
    }

    #[test]
    fn timeout_is_distinct_from_provider_failure() {
        let timeout = MemoraError::Timeout {
            duration: Duration::from_secs(1),
        };
        let failed = MemoraError::EmbeddingFailed {
            reason: "500".into(),
        };
        assert_ne!(timeout.reason(), failed.reason());
    }
}
