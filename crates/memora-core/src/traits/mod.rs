// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod embedding;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use embedding::EmbeddingProvider;
pub use provider::{ChatProvider, ChatStream};
pub use storage::StorageAdapter;
