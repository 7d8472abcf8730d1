// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Memora integration tests.
//!
//! Provides mock adapters and a temp-database fixture for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`HashingEmbedder`] - Deterministic bag-of-words embedding provider
//! - [`MockChatProvider`] - Mock LLM provider with pre-configured responses
//! - [`TempStorage`] - SQLite storage in a temporary directory

pub mod harness;
pub mod mock_embedder;
pub mod mock_provider;

pub use harness::TempStorage;
pub use mock_embedder::HashingEmbedder;
pub use mock_provider::MockChatProvider;

/// Locks a std mutex, recovering the data if a panicking test poisoned it.
pub(crate) fn lock<T>(mutex: &std::sync::Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
