// SPDX-FileCopyrightText: 2026 Memora Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM provider routing for the Memora RAG backend.
//!
//! [`LlmRouter`] holds the registry of chat providers and picks one per call:
//! an explicit per-call provider wins, then the configured default, then the
//! builtin default. Unknown names fail immediately with the list of
//! registered providers.

pub mod router;

pub use router::{BUILTIN_DEFAULT_PROVIDER, LlmRouter, RouteSource, RoutingDecision};
